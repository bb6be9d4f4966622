//! Occurrence normalization
//!
//! Turns a raw [`Occurrence`] into a [`NormalizedOccurrence`] following the
//! rules of the field tables. The input is never modified. Missing fields are
//! never an error; a present numeric field that cannot be parsed fails with
//! [`Error::MalformedField`] rather than being coerced into a wrong score.

use crate::schema::{GroupNormalizeRule, NormalizeRule, FIELDS, MULTI_FIELDS};
use ebiodiv_core::{Error, Field, NormalizedOccurrence, Occurrence, Result};
use serde_json::Value;

/// Elevations below this bound are data-entry errors, not real elevations
pub const MIN_ELEVATION: f64 = -6_000_000.0;

/// Normalize a copy of `occurrence`
pub fn normalize(occurrence: &Occurrence) -> Result<NormalizedOccurrence> {
    let mut normalized = NormalizedOccurrence::default();

    for desc in &FIELDS {
        let raw = occurrence.get(desc.field);
        match desc.normalize {
            NormalizeRule::Text => normalized.set_text(desc.field, normalize_text(raw)),
            NormalizeRule::Integer => {
                normalized.set_integer(desc.field, normalize_integer(desc.field, raw)?)
            }
        }
    }

    for group in &MULTI_FIELDS {
        match group.normalize {
            GroupNormalizeRule::ElevationDepth => {
                let (elevation, depth) = normalize_elevation_depth(
                    occurrence.get(Field::Elevation),
                    occurrence.get(Field::Depth),
                )?;
                normalized.elevation = elevation;
                normalized.depth = depth;
            }
            GroupNormalizeRule::YearMonthDay => {
                let (year, month, day) = normalize_year_month_day(
                    occurrence.get(Field::Year),
                    occurrence.get(Field::Month),
                    occurrence.get(Field::Day),
                )?;
                normalized.year = year;
                normalized.month = month;
                normalized.day = day;
            }
            GroupNormalizeRule::LatLon => {
                let (lat, lon) = normalize_lat_lon(
                    occurrence.get(Field::DecimalLatitude),
                    occurrence.get(Field::DecimalLongitude),
                )?;
                normalized.decimal_latitude = lat;
                normalized.decimal_longitude = lon;
            }
        }
    }

    Ok(normalized)
}

/// Trimmed text; empty strings and non-scalar values are absent
pub fn normalize_text(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Integer from a JSON number or a decimal string
pub fn normalize_integer(field: Field, value: Option<&Value>) -> Result<Option<i64>> {
    match value {
        None => Ok(None),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                return Ok(Some(i));
            }
            match n.as_f64() {
                // fractional counts are truncated toward zero
                Some(f) if f.is_finite() && f.abs() < i64::MAX as f64 => Ok(Some(f.trunc() as i64)),
                _ => Err(Error::malformed(field.name(), n)),
            }
        }
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            s.parse().map(Some).map_err(|_| Error::malformed(field.name(), s))
        }
        Some(other) => Err(Error::malformed(field.name(), other)),
    }
}

/// Finite float from a JSON number or a decimal string
pub fn normalize_float(field: Field, value: Option<&Value>) -> Result<Option<f64>> {
    let parsed = match value {
        None => return Ok(None),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            s.parse::<f64>().ok()
        }
        Some(_) => None,
    };
    match parsed {
        Some(f) if f.is_finite() => Ok(Some(f)),
        _ => Err(Error::malformed(field.name(), value.map(Value::to_string).unwrap_or_default())),
    }
}

/// Reconcile elevation and depth so that elevation carries the comparable value
///
/// When both are equal they are left untouched, even when nonzero: the
/// correct reading of such records is unknown.
pub fn normalize_elevation_depth(
    elevation: Option<&Value>,
    depth: Option<&Value>,
) -> Result<(Option<f64>, Option<f64>)> {
    let elevation = match elevation {
        Some(Value::String(s)) => {
            let stripped = Value::String(s.replace("ca.", ""));
            normalize_float(Field::Elevation, Some(&stripped))?
        }
        other => normalize_float(Field::Elevation, other)?,
    };
    let elevation = elevation.filter(|e| *e >= MIN_ELEVATION);
    let depth = normalize_float(Field::Depth, depth)?;

    if depth == elevation {
        return Ok((elevation, depth));
    }
    if let Some(d) = depth {
        if elevation.is_none() || (d != 0.0 && elevation == Some(0.0)) {
            return Ok((Some(-d), depth));
        }
    }
    Ok((elevation, depth))
}

/// Calendar fields with month kept only under a year and day only under a month
pub fn normalize_year_month_day(
    year: Option<&Value>,
    month: Option<&Value>,
    day: Option<&Value>,
) -> Result<(Option<i32>, Option<u32>, Option<u32>)> {
    let year = match normalize_integer(Field::Year, year)? {
        Some(y) => Some(i32::try_from(y).map_err(|_| Error::malformed("year", y))?),
        None => return Ok((None, None, None)),
    };
    let month = match normalize_integer(Field::Month, month)? {
        Some(m) => Some(u32::try_from(m).map_err(|_| Error::malformed("month", m))?),
        None => return Ok((year, None, None)),
    };
    let day = match normalize_integer(Field::Day, day)? {
        Some(d) => Some(u32::try_from(d).map_err(|_| Error::malformed("day", d))?),
        None => None,
    };
    Ok((year, month, day))
}

/// Coordinates, with the (0,0) and (360,360) "unknown" sentinels removed
///
/// Only those exact pairs are sentinels. A single zero coordinate is a real
/// point on the equator or the prime meridian and is kept; a pair missing
/// either side is absent.
pub fn normalize_lat_lon(lat: Option<&Value>, lon: Option<&Value>) -> Result<(Option<f64>, Option<f64>)> {
    let lat = normalize_float(Field::DecimalLatitude, lat)?;
    let lon = normalize_float(Field::DecimalLongitude, lon)?;
    match (lat, lon) {
        (Some(lat), Some(lon)) if is_sentinel(lat, lon) => Ok((None, None)),
        (Some(lat), Some(lon)) => Ok((Some(lat), Some(lon))),
        _ => Ok((None, None)),
    }
}

fn is_sentinel(lat: f64, lon: f64) -> bool {
    (lat == 0.0 && lon == 0.0) || (lat == 360.0 && lon == 360.0)
}

//! Similarity functions for normalized occurrence fields
//!
//! Every function returns `Some(score)` or `None` when the two sides are not
//! comparable (a value is missing, or a numeric edge case produced no finite
//! result). `None` never takes part in the weighted average.

use chrono::{Datelike, NaiveDate};
use ebiodiv_core::NormalizedOccurrence;

/// Days of difference after which a date score has decayed by 1/e
///
/// Tuned so that 30 days score ~0.918, 365 days ~0.352 and 730 days ~0.124.
pub const DATE_DECAY_DAYS: f64 = 350.0;

/// Decay factor applied to the haversine angular distance (radians)
pub const GEO_DECAY: f64 = 100.0;

/// 1 if the strings are equal ignoring case, else 0
pub fn exact_similarity(a: Option<&str>, b: Option<&str>) -> Option<f64> {
    let (a, b) = (a?, b?);
    let equal = a == b || a.to_lowercase() == b.to_lowercase();
    Some(if equal { 1.0 } else { 0.0 })
}

/// Jaro-Winkler similarity, sensitive to a shared prefix
pub fn fuzzy_similarity(a: Option<&str>, b: Option<&str>) -> Option<f64> {
    Some(strsim::jaro_winkler(a?, b?))
}

/// Bounded numeric ratio `1 - |c - r| / max(|r|, |c|)`
///
/// Not clamped: values of opposite sign score below zero.
pub fn ratio_similarity(reference: Option<f64>, candidate: Option<f64>) -> Option<f64> {
    let (r, c) = (reference?, candidate?);
    let max = r.abs().max(c.abs());
    if max == 0.0 {
        return Some(1.0);
    }
    Some(1.0 - (c - r).abs() / max)
}

/// Compare reconciled elevations; depth is already folded into elevation
pub fn elevation_similarity(a: &NormalizedOccurrence, b: &NormalizedOccurrence) -> Option<f64> {
    ratio_similarity(a.elevation, b.elevation)
}

/// Day number counted from 0001-01-01 (day 1), missing month/day taken as 1
///
/// `None` without a year, or when the fields do not form a calendar date.
pub fn ordinal_day(year: Option<i32>, month: Option<u32>, day: Option<u32>) -> Option<i64> {
    let date = NaiveDate::from_ymd_opt(year?, month.unwrap_or(1), day.unwrap_or(1))?;
    Some(i64::from(date.num_days_from_ce()))
}

/// `exp(-|days| / 350)`
pub fn date_decay(days: i64) -> f64 {
    (-(days.unsigned_abs() as f64) / DATE_DECAY_DAYS).exp()
}

pub fn date_similarity(a: &NormalizedOccurrence, b: &NormalizedOccurrence) -> Option<f64> {
    let da = ordinal_day(a.year, a.month, a.day)?;
    let db = ordinal_day(b.year, b.month, b.day)?;
    Some(date_decay(da - db))
}

/// Haversine angular distance between two points given in decimal degrees
///
/// Returns `asin(sqrt(h))`, i.e. half the central angle, so that 0 is the
/// same place and pi/2 the antipode. Round-off pushing `h` outside [0, 1]
/// yields `None`.
pub fn angular_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Option<f64> {
    let (lat1, lon1, lat2, lon2) = (
        lat1.to_radians(),
        lon1.to_radians(),
        lat2.to_radians(),
        lon2.to_radians(),
    );
    let d_lat = lat2 - lat1;
    let d_lon = lon2 - lon1;
    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let distance = h.sqrt().asin();
    distance.is_finite().then_some(distance)
}

/// `exp(-100 * angular distance)`, roughly 1/e at ~100 km
pub fn geo_similarity(a: &NormalizedOccurrence, b: &NormalizedOccurrence) -> Option<f64> {
    let distance = angular_distance(
        a.decimal_latitude?,
        a.decimal_longitude?,
        b.decimal_latitude?,
        b.decimal_longitude?,
    )?;
    Some((-GEO_DECAY * distance).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn located(lat: f64, lon: f64) -> NormalizedOccurrence {
        NormalizedOccurrence {
            decimal_latitude: Some(lat),
            decimal_longitude: Some(lon),
            ..Default::default()
        }
    }

    fn dated(year: i32, month: Option<u32>, day: Option<u32>) -> NormalizedOccurrence {
        NormalizedOccurrence {
            year: Some(year),
            month,
            day,
            ..Default::default()
        }
    }

    #[test]
    fn test_exact_similarity() {
        assert_eq!(exact_similarity(Some("CH"), Some("ch")), Some(1.0));
        assert_eq!(exact_similarity(Some("CH"), Some("FR")), Some(0.0));
        assert_eq!(exact_similarity(Some("CH"), None), None);
        for (x, y) in [("a", "B"), ("Ä", "ä"), ("NHMW", "nhmw")] {
            assert_eq!(exact_similarity(Some(x), Some(y)), exact_similarity(Some(y), Some(x)));
        }
    }

    #[test]
    fn test_fuzzy_similarity() {
        assert_eq!(fuzzy_similarity(Some("Carabus"), Some("Carabus")), Some(1.0));
        let close = fuzzy_similarity(Some("Carabus"), Some("Carabis")).unwrap();
        let far = fuzzy_similarity(Some("Carabus"), Some("Helix")).unwrap();
        assert!(close > 0.9);
        assert!(far < close);
        assert_eq!(fuzzy_similarity(None, Some("Helix")), None);
    }

    #[test]
    fn test_ratio_similarity() {
        assert_eq!(ratio_similarity(Some(5.0), Some(5.0)), Some(1.0));
        assert_eq!(ratio_similarity(Some(0.0), Some(0.0)), Some(1.0));
        assert_eq!(ratio_similarity(Some(10.0), Some(5.0)), Some(0.5));
        assert_eq!(ratio_similarity(Some(10.0), None), None);
        assert_eq!(ratio_similarity(None, Some(0.0)), None);
        // opposite signs are not clamped
        assert_eq!(ratio_similarity(Some(10.0), Some(-10.0)), Some(-1.0));
    }

    #[test]
    fn test_date_decay() {
        let same = date_similarity(&dated(2020, Some(5), Some(1)), &dated(2020, Some(5), None));
        assert_eq!(same, Some(1.0));

        let year = date_similarity(&dated(2021, Some(1), Some(1)), &dated(2020, Some(1), Some(1))).unwrap();
        // 2020 is a leap year: 366 days
        assert!((date_decay(365) - 0.352).abs() < 0.001);
        assert!((year - date_decay(366)).abs() < 1e-12);
        assert!((date_decay(30) - 0.918).abs() < 0.001);
        assert!((date_decay(730) - 0.124).abs() < 0.001);

        assert_eq!(date_similarity(&dated(2020, None, None), &NormalizedOccurrence::default()), None);
        assert_eq!(date_similarity(&dated(2020, Some(13), None), &dated(2020, None, None)), None);
    }

    #[test]
    fn test_ordinal_day_matches_proleptic_calendar() {
        assert_eq!(ordinal_day(Some(1), Some(1), Some(1)), Some(1));
        assert_eq!(ordinal_day(Some(1), None, None), Some(1));
        assert_eq!(ordinal_day(Some(2000), Some(3), Some(1)).unwrap() - ordinal_day(Some(2000), Some(2), Some(1)).unwrap(), 29);
        assert_eq!(ordinal_day(None, Some(3), Some(1)), None);
    }

    #[test]
    fn test_geo_similarity() {
        let here = located(46.2044, 6.1432);
        assert_eq!(geo_similarity(&here, &here), Some(1.0));

        let near = geo_similarity(&here, &located(46.5197, 6.6323)).unwrap();
        let far = geo_similarity(&here, &located(47.3769, 8.5417)).unwrap();
        let farther = geo_similarity(&here, &located(-33.86, 151.2)).unwrap();
        assert!(1.0 > near && near > far && far > farther);

        assert_eq!(geo_similarity(&here, &NormalizedOccurrence::default()), None);
    }

    #[test]
    fn test_angular_distance_antipode() {
        let d = angular_distance(0.0, 0.0, 0.0, 180.0).unwrap();
        assert!((d - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    }
}

//! Occurrence records
//!
//! [`Occurrence`] is the raw, possibly noisy record as it arrives from a
//! dataset. Scored fields are typed loosely (`serde_json::Value`) because the
//! upstream schema is not strict: elevation may be `"ca. 10"`, counts may be
//! strings. Everything else is preserved verbatim in `extra`.
//!
//! [`NormalizedOccurrence`] is the strictly typed copy produced by the
//! normalizer and consumed by the scoring functions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Fields taking part in normalization and scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Family,
    Genus,
    SpecificEpithet,
    Country,
    City,
    Locality,
    RecordedBy,
    CollectionCode,
    CatalogNumber,
    IndividualCount,
    Elevation,
    Depth,
    Year,
    Month,
    Day,
    DecimalLatitude,
    DecimalLongitude,
}

impl Field {
    pub const ALL: [Field; 17] = [
        Field::Family,
        Field::Genus,
        Field::SpecificEpithet,
        Field::Country,
        Field::City,
        Field::Locality,
        Field::RecordedBy,
        Field::CollectionCode,
        Field::CatalogNumber,
        Field::IndividualCount,
        Field::Elevation,
        Field::Depth,
        Field::Year,
        Field::Month,
        Field::Day,
        Field::DecimalLatitude,
        Field::DecimalLongitude,
    ];

    /// Darwin Core name of the field
    pub fn name(self) -> &'static str {
        match self {
            Field::Family => "family",
            Field::Genus => "genus",
            Field::SpecificEpithet => "specificEpithet",
            Field::Country => "country",
            Field::City => "city",
            Field::Locality => "locality",
            Field::RecordedBy => "recordedBy",
            Field::CollectionCode => "collectionCode",
            Field::CatalogNumber => "catalogNumber",
            Field::IndividualCount => "individualCount",
            Field::Elevation => "elevation",
            Field::Depth => "depth",
            Field::Year => "year",
            Field::Month => "month",
            Field::Day => "day",
            Field::DecimalLatitude => "decimalLatitude",
            Field::DecimalLongitude => "decimalLongitude",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A raw occurrence record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genus: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific_epithet: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locality: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_by: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_code: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_number: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub individual_count: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimal_latitude: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimal_longitude: Option<Value>,

    /// Upstream fields that are not scored
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Occurrence {
    /// Raw value of a scored field, `None` when absent or null
    pub fn get(&self, field: Field) -> Option<&Value> {
        self.slot(field).as_ref().filter(|v| !v.is_null())
    }

    pub fn set(&mut self, field: Field, value: Option<Value>) {
        *self.slot_mut(field) = value.filter(|v| !v.is_null());
    }

    fn slot(&self, field: Field) -> &Option<Value> {
        match field {
            Field::Family => &self.family,
            Field::Genus => &self.genus,
            Field::SpecificEpithet => &self.specific_epithet,
            Field::Country => &self.country,
            Field::City => &self.city,
            Field::Locality => &self.locality,
            Field::RecordedBy => &self.recorded_by,
            Field::CollectionCode => &self.collection_code,
            Field::CatalogNumber => &self.catalog_number,
            Field::IndividualCount => &self.individual_count,
            Field::Elevation => &self.elevation,
            Field::Depth => &self.depth,
            Field::Year => &self.year,
            Field::Month => &self.month,
            Field::Day => &self.day,
            Field::DecimalLatitude => &self.decimal_latitude,
            Field::DecimalLongitude => &self.decimal_longitude,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<Value> {
        match field {
            Field::Family => &mut self.family,
            Field::Genus => &mut self.genus,
            Field::SpecificEpithet => &mut self.specific_epithet,
            Field::Country => &mut self.country,
            Field::City => &mut self.city,
            Field::Locality => &mut self.locality,
            Field::RecordedBy => &mut self.recorded_by,
            Field::CollectionCode => &mut self.collection_code,
            Field::CatalogNumber => &mut self.catalog_number,
            Field::IndividualCount => &mut self.individual_count,
            Field::Elevation => &mut self.elevation,
            Field::Depth => &mut self.depth,
            Field::Year => &mut self.year,
            Field::Month => &mut self.month,
            Field::Day => &mut self.day,
            Field::DecimalLatitude => &mut self.decimal_latitude,
            Field::DecimalLongitude => &mut self.decimal_longitude,
        }
    }
}

/// Canonical, strictly typed view of an occurrence
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedOccurrence {
    pub family: Option<String>,
    pub genus: Option<String>,
    pub specific_epithet: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub locality: Option<String>,
    pub recorded_by: Option<String>,
    pub collection_code: Option<String>,
    pub catalog_number: Option<String>,
    pub individual_count: Option<i64>,
    pub elevation: Option<f64>,
    pub depth: Option<f64>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub decimal_latitude: Option<f64>,
    pub decimal_longitude: Option<f64>,
}

impl NormalizedOccurrence {
    /// String value of a text field; `None` for absent or non-text fields
    pub fn text(&self, field: Field) -> Option<&str> {
        let value = match field {
            Field::Family => &self.family,
            Field::Genus => &self.genus,
            Field::SpecificEpithet => &self.specific_epithet,
            Field::Country => &self.country,
            Field::City => &self.city,
            Field::Locality => &self.locality,
            Field::RecordedBy => &self.recorded_by,
            Field::CollectionCode => &self.collection_code,
            Field::CatalogNumber => &self.catalog_number,
            _ => return None,
        };
        value.as_deref()
    }

    pub fn set_text(&mut self, field: Field, value: Option<String>) {
        let slot = match field {
            Field::Family => &mut self.family,
            Field::Genus => &mut self.genus,
            Field::SpecificEpithet => &mut self.specific_epithet,
            Field::Country => &mut self.country,
            Field::City => &mut self.city,
            Field::Locality => &mut self.locality,
            Field::RecordedBy => &mut self.recorded_by,
            Field::CollectionCode => &mut self.collection_code,
            Field::CatalogNumber => &mut self.catalog_number,
            _ => return,
        };
        *slot = value;
    }

    /// Set an integer field; only `individualCount` is integer-typed
    pub fn set_integer(&mut self, field: Field, value: Option<i64>) {
        if field == Field::IndividualCount {
            self.individual_count = value;
        }
    }

    /// Numeric value of a numeric field; `None` for absent or text fields
    pub fn number(&self, field: Field) -> Option<f64> {
        match field {
            Field::IndividualCount => self.individual_count.map(|v| v as f64),
            Field::Elevation => self.elevation,
            Field::Depth => self.depth,
            Field::Year => self.year.map(f64::from),
            Field::Month => self.month.map(f64::from),
            Field::Day => self.day.map(f64::from),
            Field::DecimalLatitude => self.decimal_latitude,
            Field::DecimalLongitude => self.decimal_longitude,
            _ => None,
        }
    }
}

impl From<&NormalizedOccurrence> for Occurrence {
    fn from(normalized: &NormalizedOccurrence) -> Self {
        let mut occurrence = Occurrence::default();
        for field in Field::ALL {
            let value = match field {
                Field::IndividualCount => normalized.individual_count.map(Value::from),
                Field::Year => normalized.year.map(Value::from),
                Field::Month => normalized.month.map(Value::from),
                Field::Day => normalized.day.map(Value::from),
                _ => match normalized.text(field) {
                    Some(text) => Some(Value::from(text)),
                    None => normalized.number(field).map(Value::from),
                },
            };
            occurrence.set(field, value);
        }
        occurrence
    }
}

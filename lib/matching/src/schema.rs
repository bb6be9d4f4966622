//! Field tables for occurrence matching
//!
//! Two process-wide constant tables drive both normalization and scoring:
//! [`FIELDS`] for fields scored on their own and [`MULTI_FIELDS`] for groups
//! of fields that are normalized together and contribute a single score,
//! labelled by the group's first field.

use ebiodiv_core::Field;
use std::collections::BTreeMap;

/// How the raw value of a single field is cleaned up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeRule {
    /// Trimmed string, empty means absent
    Text,
    /// Integer parsed from a number or decimal string
    Integer,
}

/// How the raw values of a field group are cleaned up together
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupNormalizeRule {
    /// Elevation with optional "ca." prefix, reconciled against depth
    ElevationDepth,
    /// Year, month, day with month/day kept only below a known year
    YearMonthDay,
    /// Decimal coordinates with (0,0) and (360,360) mapped to unknown
    LatLon,
}

/// Similarity function used for a field or group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreRule {
    /// Jaro-Winkler similarity
    Fuzzy,
    /// Case-insensitive equality
    Exact,
    /// Bounded numeric ratio: 1 - |c - r| / max(|r|, |c|)
    Ratio,
    /// Bounded numeric ratio on reconciled elevation
    ElevationDepth,
    /// Exponential decay over the difference in days
    DateDecay,
    /// Exponential decay over the haversine angular distance
    Geodesic,
}

/// A field scored on its own
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldDescription {
    pub field: Field,
    pub weight: f64,
    pub normalize: NormalizeRule,
    pub score: ScoreRule,
}

impl FieldDescription {
    pub fn label(&self) -> &'static str {
        self.field.name()
    }
}

/// Fields normalized and scored together under one label
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupDescription {
    pub fields: &'static [Field],
    pub weight: f64,
    pub normalize: GroupNormalizeRule,
    pub score: ScoreRule,
}

impl GroupDescription {
    pub fn label(&self) -> &'static str {
        self.fields[0].name()
    }
}

const fn field(field: Field, weight: f64, normalize: NormalizeRule, score: ScoreRule) -> FieldDescription {
    FieldDescription { field, weight, normalize, score }
}

pub const FIELDS: [FieldDescription; 10] = [
    field(Field::Family, 2.0, NormalizeRule::Text, ScoreRule::Fuzzy),
    field(Field::Genus, 2.0, NormalizeRule::Text, ScoreRule::Fuzzy),
    field(Field::SpecificEpithet, 2.0, NormalizeRule::Text, ScoreRule::Fuzzy),
    // normalized upstream by GBIF, no typos to absorb
    field(Field::Country, 1.0, NormalizeRule::Text, ScoreRule::Exact),
    field(Field::City, 1.0, NormalizeRule::Text, ScoreRule::Fuzzy),
    field(Field::Locality, 0.5, NormalizeRule::Text, ScoreRule::Fuzzy),
    field(Field::RecordedBy, 1.0, NormalizeRule::Text, ScoreRule::Fuzzy),
    field(Field::CollectionCode, 1.0, NormalizeRule::Text, ScoreRule::Exact),
    field(Field::CatalogNumber, 1.0, NormalizeRule::Text, ScoreRule::Exact),
    field(Field::IndividualCount, 1.0, NormalizeRule::Integer, ScoreRule::Ratio),
];

pub const MULTI_FIELDS: [GroupDescription; 3] = [
    GroupDescription {
        fields: &[Field::Elevation, Field::Depth],
        weight: 1.0,
        normalize: GroupNormalizeRule::ElevationDepth,
        score: ScoreRule::ElevationDepth,
    },
    GroupDescription {
        fields: &[Field::Year, Field::Month, Field::Day],
        weight: 1.0,
        normalize: GroupNormalizeRule::YearMonthDay,
        score: ScoreRule::DateDecay,
    },
    GroupDescription {
        fields: &[Field::DecimalLatitude, Field::DecimalLongitude],
        weight: 1.0,
        normalize: GroupNormalizeRule::LatLon,
        score: ScoreRule::Geodesic,
    },
];

/// Score labels in table order: single fields first, then groups
pub fn labels() -> impl Iterator<Item = &'static str> {
    FIELDS
        .iter()
        .map(FieldDescription::label)
        .chain(MULTI_FIELDS.iter().map(GroupDescription::label))
}

/// Score label to the raw field names it covers
pub fn fields() -> BTreeMap<&'static str, Vec<&'static str>> {
    let mut result: BTreeMap<_, _> = FIELDS
        .iter()
        .map(|desc| (desc.label(), vec![desc.field.name()]))
        .collect();
    for group in &MULTI_FIELDS {
        result.insert(group.label(), group.fields.iter().map(|f| f.name()).collect());
    }
    result
}

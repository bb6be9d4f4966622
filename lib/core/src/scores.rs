//! Per-field score records

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label of the weighted aggregate in a [`FieldScores`] map
pub const GLOBAL: &str = "$global";

/// One score per configured field or field group, plus [`GLOBAL`]
///
/// Every configured label is present; `None` marks an incomparable field
/// and serializes as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldScores(BTreeMap<String, Option<f64>>);

impl FieldScores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: impl Into<String>, score: Option<f64>) {
        self.0.insert(label.into(), score);
    }

    /// Score of a label; outer `None` if the label is not configured
    pub fn get(&self, label: &str) -> Option<Option<f64>> {
        self.0.get(label).copied()
    }

    pub fn global(&self) -> Option<f64> {
        self.get(GLOBAL).flatten()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<f64>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

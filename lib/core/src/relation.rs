//! Relations between occurrences
//!
//! A relation is an unordered pair of occurrence keys. Its canonical id is
//! the two keys sorted ascending and joined with a comma (`"20,42"`), so the
//! id of `(a, b)` and `(b, a)` is the same string.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Numeric identifier of an occurrence
pub type OccurrenceKey = u64;

/// Occurrence key as sent by clients: either a JSON number or a decimal string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawOccurrenceKey {
    Number(OccurrenceKey),
    Text(String),
}

impl RawOccurrenceKey {
    pub fn resolve(&self) -> Result<OccurrenceKey> {
        match self {
            RawOccurrenceKey::Number(key) => Ok(*key),
            RawOccurrenceKey::Text(text) => parse_occurrence_key(text),
        }
    }
}

impl From<OccurrenceKey> for RawOccurrenceKey {
    fn from(key: OccurrenceKey) -> Self {
        RawOccurrenceKey::Number(key)
    }
}

/// Parse a decimal occurrence key, surrounding whitespace allowed
pub fn parse_occurrence_key(text: &str) -> Result<OccurrenceKey> {
    text.trim()
        .parse()
        .map_err(|_| Error::InvalidOccurrenceKey(text.to_string()))
}

/// Order-independent identifier of a pair of occurrences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationId {
    low: OccurrenceKey,
    high: OccurrenceKey,
}

impl RelationId {
    pub fn new(a: OccurrenceKey, b: OccurrenceKey) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    pub fn from_raw(a: &RawOccurrenceKey, b: &RawOccurrenceKey) -> Result<Self> {
        Ok(Self::new(a.resolve()?, b.resolve()?))
    }

    /// The two keys, smaller first
    pub fn keys(&self) -> (OccurrenceKey, OccurrenceKey) {
        (self.low, self.high)
    }
}

impl fmt::Display for RelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.low, self.high)
    }
}

impl FromStr for RelationId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (a, b) = s
            .split_once(',')
            .ok_or_else(|| Error::InvalidOccurrenceKey(s.to_string()))?;
        Ok(Self::new(parse_occurrence_key(a)?, parse_occurrence_key(b)?))
    }
}

/// Canonical relation id string for two occurrence keys
pub fn relation_id(a: OccurrenceKey, b: OccurrenceKey) -> String {
    RelationId::new(a, b).to_string()
}

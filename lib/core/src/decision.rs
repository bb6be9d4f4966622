//! Curator match decisions

use crate::relation::RawOccurrenceKey;
use serde::{Deserialize, Serialize};

/// Curator verdict for a relation
///
/// `matched` is `None` while undecided. A stored decision always carries a
/// timestamp (epoch seconds); only the undecided placeholder has none.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchDecision {
    #[serde(rename = "match")]
    pub matched: Option<bool>,
    pub comment: Option<String>,
    pub timestamp: Option<i64>,
}

impl MatchDecision {
    pub fn new(matched: Option<bool>, comment: Option<String>, timestamp: i64) -> Self {
        Self {
            matched,
            comment,
            timestamp: Some(timestamp),
        }
    }

    /// Placeholder returned for relations nobody has reviewed yet
    pub fn undecided() -> Self {
        Self::default()
    }

    pub fn is_undecided(&self) -> bool {
        self.timestamp.is_none()
    }
}

/// One curator action as submitted by a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingInput {
    pub occurrence_key1: RawOccurrenceKey,
    pub occurrence_key2: RawOccurrenceKey,
    #[serde(rename = "match", default)]
    pub matched: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Echo of a curator action merged with the decision that was persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingOutcome {
    pub occurrence_key1: RawOccurrenceKey,
    pub occurrence_key2: RawOccurrenceKey,
    #[serde(flatten)]
    pub decision: MatchDecision,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_undecided_serializes_nulls() {
        let value = serde_json::to_value(MatchDecision::undecided()).unwrap();
        assert_eq!(value, json!({"match": null, "comment": null, "timestamp": null}));
    }

    #[test]
    fn test_decision_roundtrip_field_names() {
        let decision = MatchDecision::new(Some(true), Some("same specimen".into()), 1_700_000_000);
        let value = serde_json::to_value(&decision).unwrap();
        assert_eq!(value["match"], json!(true));
        assert_eq!(value["timestamp"], json!(1_700_000_000));
        assert!(!decision.is_undecided());
        let parsed: MatchDecision = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, decision);
    }

    #[test]
    fn test_matching_input_defaults() {
        let input: MatchingInput =
            serde_json::from_value(json!({"occurrenceKey1": "42", "occurrenceKey2": 20})).unwrap();
        assert!(!input.matched);
        assert_eq!(input.comment, None);
        assert_eq!(input.occurrence_key1, RawOccurrenceKey::Text("42".into()));
        assert_eq!(input.occurrence_key2, RawOccurrenceKey::Number(20));
    }

    #[test]
    fn test_outcome_flattens_decision() {
        let outcome = MatchingOutcome {
            occurrence_key1: 42.into(),
            occurrence_key2: 20.into(),
            decision: MatchDecision::new(Some(false), None, 5),
        };
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({"occurrenceKey1": 42, "occurrenceKey2": 20, "match": false, "comment": null, "timestamp": 5})
        );
    }
}

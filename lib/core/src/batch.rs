//! Occurrence batches as served by the upstream link data source

use crate::decision::MatchDecision;
use crate::occurrence::Occurrence;
use crate::relation::{parse_occurrence_key, OccurrenceKey, RelationId};
use crate::scores::FieldScores;
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A candidate link between a material citation and an institution occurrence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccurrenceRelation {
    pub occurrence_key1: OccurrenceKey,
    pub occurrence_key2: OccurrenceKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores: Option<FieldScores>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matching: Option<MatchDecision>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OccurrenceRelation {
    pub fn new(occurrence_key1: OccurrenceKey, occurrence_key2: OccurrenceKey) -> Self {
        Self {
            occurrence_key1,
            occurrence_key2,
            scores: None,
            matching: None,
            extra: Map::new(),
        }
    }

    pub fn relation_id(&self) -> RelationId {
        RelationId::new(self.occurrence_key1, self.occurrence_key2)
    }
}

/// Occurrences keyed by their decimal key, plus the relations between them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccurrenceBatch {
    #[serde(default)]
    pub occurrences: BTreeMap<String, Occurrence>,
    #[serde(default)]
    pub occurrence_relations: Vec<OccurrenceRelation>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OccurrenceBatch {
    /// Occurrences with their keys parsed
    pub fn keyed_occurrences(&self) -> Result<Vec<(OccurrenceKey, &Occurrence)>> {
        self.occurrences
            .iter()
            .map(|(key, occ)| Ok((parse_occurrence_key(key)?, occ)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_batch_deserialize() {
        let batch: OccurrenceBatch = serde_json::from_value(json!({
            "occurrences": {
                "20": {"genus": "Carabus"},
                "42": {"genus": "Carabus", "year": 1999}
            },
            "occurrenceRelations": [
                {"occurrenceKey1": 42, "occurrenceKey2": 20, "source": "plazi"}
            ],
            "institution": {"key": "abc"}
        }))
        .unwrap();

        assert_eq!(batch.occurrences.len(), 2);
        let relation = &batch.occurrence_relations[0];
        assert_eq!(relation.relation_id().to_string(), "20,42");
        assert_eq!(relation.extra.get("source"), Some(&json!("plazi")));
        assert!(relation.scores.is_none());
        assert!(batch.extra.contains_key("institution"));

        let keys: Vec<_> = batch.keyed_occurrences().unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![20, 42]);
    }

    #[test]
    fn test_bad_occurrence_key() {
        let mut batch = OccurrenceBatch::default();
        batch.occurrences.insert("x1".into(), Occurrence::default());
        assert!(batch.keyed_occurrences().is_err());
    }
}

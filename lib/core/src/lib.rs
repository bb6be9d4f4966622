//! # ebiodiv Core
//!
//! Shared data model for linking material citations to institution
//! occurrences:
//!
//! - [`Occurrence`] - raw occurrence record, noisy fields kept as JSON values
//! - [`NormalizedOccurrence`] - typed copy produced by normalization
//! - [`RelationId`] - order-independent id of a pair of occurrences
//! - [`MatchDecision`] - curator verdict for a relation
//! - [`FieldScores`] - per-field closeness scores with the `$global` aggregate
//! - [`OccurrenceBatch`] - occurrences plus candidate relations

pub mod batch;
pub mod decision;
pub mod error;
pub mod occurrence;
pub mod relation;
pub mod scores;

pub use batch::{OccurrenceBatch, OccurrenceRelation};
pub use decision::{MatchDecision, MatchingInput, MatchingOutcome};
pub use error::{Error, Result};
pub use occurrence::{Field, NormalizedOccurrence, Occurrence};
pub use relation::{parse_occurrence_key, relation_id, OccurrenceKey, RawOccurrenceKey, RelationId};
pub use scores::{FieldScores, GLOBAL};

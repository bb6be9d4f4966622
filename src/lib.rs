//! # ebiodiv
//!
//! Links material citations from the literature to the specimens held by
//! institutions. Candidate pairs of occurrences are scored field by field,
//! and curators' verdicts on those pairs are persisted in an embedded store.
//!
//! ## Quick Start
//!
//! ### From the command line
//!
//! ```bash
//! ebiodiv score batch.json --decisions decisions.lmdb > scored.json
//! ebiodiv dump decisions.lmdb 20,42
//! ```
//!
//! ### As a Library
//!
//! ```rust,no_run
//! use ebiodiv::prelude::*;
//!
//! let text = std::fs::read_to_string("batch.json").unwrap();
//! let mut batch: OccurrenceBatch = serde_json::from_str(&text).unwrap();
//!
//! let scorer = BatchScorer::new(BatchOptions::default()).unwrap();
//! scorer.add_scores(&mut batch).unwrap();
//!
//! let ledger = DecisionLedger::open("decisions.lmdb").unwrap();
//! ledger.record(42, 20, Some(true), Some("same specimen".into())).unwrap();
//! ledger.annotate(&mut batch).unwrap();
//! ```
//!
//! ## Crate Structure
//!
//! - [`ebiodiv-core`](ebiodiv_core) - Occurrences, relations, decisions, errors
//! - [`ebiodiv-matching`](ebiodiv_matching) - Normalization, similarity and score aggregation
//! - [`ebiodiv-storage`](ebiodiv_storage) - LMDB key store and decision ledger

// Re-export core types
pub use ebiodiv_core::{
    parse_occurrence_key, relation_id, Error, Field, FieldScores, MatchDecision, MatchingInput,
    MatchingOutcome, NormalizedOccurrence, Occurrence, OccurrenceBatch, OccurrenceKey,
    OccurrenceRelation, RawOccurrenceKey, RelationId, Result, GLOBAL,
};

// Re-export matching
pub use ebiodiv_matching::{
    fields, labels, normalize, normalize_batch, score, score_occurrences, BatchOptions,
    BatchScorer,
};

// Re-export storage
pub use ebiodiv_storage::{DecisionLedger, KeyStore, Record, StoreOptions};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        normalize, score, score_occurrences, BatchOptions, BatchScorer, DecisionLedger, Error,
        FieldScores, KeyStore, MatchDecision, Occurrence, OccurrenceBatch, RelationId, Result,
        StoreOptions,
    };
}

//! # ebiodiv Matching
//!
//! Deterministic closeness scoring between two biodiversity occurrences.
//!
//! ## Features
//!
//! - **Field tables**: fixed weights and rules per field or field group
//! - **Normalization**: typed, read-only cleanup of noisy upstream values
//! - **Distance functions**: exact, Jaro-Winkler, bounded ratio, date decay, geodesic
//! - **Aggregation**: weighted mean that ignores incomparable fields
//! - **Batch scoring**: chunked scoring on a worker pool
//!
//! ## Example
//!
//! ```rust
//! use ebiodiv_matching::{normalize, score};
//! use ebiodiv_core::Occurrence;
//! use serde_json::json;
//!
//! let citation: Occurrence = serde_json::from_value(json!({
//!     "genus": "Carabus",
//!     "elevation": "ca. 1200",
//!     "year": 1999
//! })).unwrap();
//! let specimen: Occurrence = serde_json::from_value(json!({
//!     "genus": "Carabus",
//!     "elevation": 1150,
//!     "year": 1999
//! })).unwrap();
//!
//! let scores = score(&normalize(&citation).unwrap(), &normalize(&specimen).unwrap());
//! assert_eq!(scores.get("genus"), Some(Some(1.0)));
//! assert!(scores.global().unwrap() > 0.9);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌─────────────┐   ┌────────────┐   ┌─────────────┐
//! │ Occurrence │──>│  normalize  │──>│  distance  │──>│    score    │
//! │   (raw)    │   │ (typed copy)│   │ (per field)│   │ ($global)   │
//! └────────────┘   └─────────────┘   └────────────┘   └─────────────┘
//!                         ^                                  │
//!                   ┌─────┴──────┐                    ┌──────┴──────┐
//!                   │   schema   │                    │    batch    │
//!                   │  (tables)  │                    │(pool, chunk)│
//!                   └────────────┘                    └─────────────┘
//! ```

pub mod batch;
pub mod distance;
pub mod normalize;
pub mod schema;
pub mod score;

pub use batch::{normalize_batch, BatchOptions, BatchScorer, NormalizedTable, DEFAULT_CHUNK_SIZE};
pub use normalize::normalize;
pub use schema::{
    fields, labels, FieldDescription, GroupDescription, GroupNormalizeRule, NormalizeRule,
    ScoreRule, FIELDS, MULTI_FIELDS,
};
pub use score::{score, score_occurrences, weighted_average};

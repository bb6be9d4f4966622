//! # ebiodiv Storage
//!
//! Persistent state on embedded LMDB:
//!
//! - [`KeyStore`] - transactional store of JSON records, field names
//!   compressed through an append-only dictionary, values zstd-compressed
//! - [`DecisionLedger`] - curator decisions keyed by relation id

pub mod codec;
pub mod dictionary;
pub mod keystore;
pub mod ledger;

pub use codec::{Record, MAX_DECOMPRESSED_SIZE};
pub use dictionary::{decode_index, encode_index, KeyDictionary};
pub use keystore::{KeyStore, ReadTxn, StoreOptions, WriteTxn};
pub use ledger::DecisionLedger;

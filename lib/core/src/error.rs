use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A field carried a value that cannot be coerced to its declared type
    #[error("Malformed field {field}: {value}")]
    MalformedField { field: String, value: String },

    #[error("Invalid occurrence key: {0}")]
    InvalidOccurrenceKey(String),

    #[error("Occurrence not found: {0}")]
    OccurrenceNotFound(u64),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// Never retried: the blob is either oversized or the store is damaged
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    #[error("Store not found: {}", .0.display())]
    StoreNotFound(PathBuf),

    #[error("Store is read-only: {}", .0.display())]
    ReadOnly(PathBuf),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}

impl Error {
    pub fn malformed(field: impl Into<String>, value: impl ToString) -> Self {
        Error::MalformedField {
            field: field.into(),
            value: value.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

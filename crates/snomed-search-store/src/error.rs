//! Error types for the terminology store.

use std::path::PathBuf;

use snomed_search::SearchError;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while opening or loading a store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error while reading a snapshot.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Snapshot content could not be decoded.
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(#[from] serde_json::Error),

    /// The store could not be opened.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for SearchError {
    fn from(err: StoreError) -> Self {
        SearchError::Store(err.to_string())
    }
}

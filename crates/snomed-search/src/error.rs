//! Error types for search and hierarchy operations.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while searching or browsing the terminology.
///
/// Invalid input never produces an error: empty queries and out-of-range
/// paging resolve to empty results. Missing concepts resolve to `None`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// The terminology store could not be reached or a query against it failed.
    #[error("Store error: {0}")]
    Store(String),

    /// The operation observed a cancellation signal.
    #[error("Operation cancelled")]
    Cancelled,

    /// A paged operation exceeded its configured deadline.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// The suggestion source could not produce suggestions.
    #[error("Suggestion source unavailable: {0}")]
    SuggestionUnavailable(String),
}

impl SearchError {
    /// Creates a store error from anything displayable.
    pub fn store(message: impl std::fmt::Display) -> Self {
        Self::Store(message.to_string())
    }

    /// Returns true if this error is a cancellation or timeout outcome.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Timeout(_))
    }
}

/// Result type for search operations.
pub type SearchResult<T> = std::result::Result<T, SearchError>;

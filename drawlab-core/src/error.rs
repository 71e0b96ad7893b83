//! Core error types for `Drawlab`.

use thiserror::Error;

/// Core error type for `Drawlab` operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A handle path cannot be split at the given ref index.
    #[error("Invalid handle path '{path}': {reason}")]
    InvalidPath {
        /// The offending handle path.
        path: String,
        /// Why the split failed.
        reason: String,
    },

    /// Invalid data from API response.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

//! GitLab storage errors.

use drawlab_core::CoreError;
use drawlab_fetch::{FetchError, RetryAction};
use thiserror::Error;

/// Errors from decoding or encoding file content.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Content is not valid base64.
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Decoded text is not valid UTF-8.
    #[error("UTF-8 decode error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Malformed PNG stream.
    #[error("Invalid PNG: {0}")]
    Png(String),
}

/// Errors from GitLab storage operations.
#[derive(Debug, Error)]
pub enum GitLabError {
    /// Request pipeline error.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Content codec error.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Invalid handle path.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The user declined to replace an existing file.
    #[error("Cancelled")]
    Cancelled,

    /// A PNG needs to be rendered but no exporter is configured.
    #[error("No PNG exporter available for {0}")]
    ExportUnavailable(String),
}

impl GitLabError {
    /// Returns the recovery step attached to this error, if any.
    pub fn retry_action(&self) -> Option<RetryAction> {
        match self {
            Self::Fetch(e) => e.retry_action(),
            _ => None,
        }
    }

    /// Returns true for 404-class errors.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Fetch(e) if e.is_not_found())
    }
}

impl From<drawlab_fetch::HttpError> for GitLabError {
    fn from(err: drawlab_fetch::HttpError) -> Self {
        Self::Fetch(err.into())
    }
}

impl From<serde_json::Error> for GitLabError {
    fn from(err: serde_json::Error) -> Self {
        Self::Fetch(err.into())
    }
}

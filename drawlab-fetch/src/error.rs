//! Fetch error types.
//!
//! [`FetchError`] is the uniform error surfaced by every authenticated
//! operation. Variants carrying a [`RetryAction`] can be recovered from by
//! signing in again and repeating the operation.

use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Retry Action
// ============================================================================

/// Recovery step a caller can offer the user for a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    /// Run the authorization flow again, then repeat the operation.
    Reauthenticate,
}

// ============================================================================
// Main Fetch Error
// ============================================================================

/// Error type for authenticated GitLab operations.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The user declined or closed the authorization window.
    #[error("Access denied")]
    AuthDenied {
        /// How to recover.
        retry: RetryAction,
    },

    /// Another authorization flow is already in flight.
    #[error("Authorization already in progress")]
    AuthBusy,

    /// The authorization window could not be opened.
    #[error("Authorization window was blocked or the service is unavailable")]
    PopupBlocked {
        /// How to recover.
        retry: RetryAction,
    },

    /// The deadline elapsed before a response arrived.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The token was rejected again after re-authentication.
    #[error("Access denied, please sign in again")]
    AccessDenied {
        /// How to recover.
        retry: RetryAction,
    },

    /// 403 without a size hint.
    #[error("Forbidden")]
    Forbidden,

    /// Payload too large, either rejected locally or by the server.
    #[error("Drawing too large{}", size_detail(.size, .limit))]
    SizeLimitExceeded {
        /// Payload size in bytes, when known.
        size: Option<usize>,
        /// Limit in bytes, when known.
        limit: Option<usize>,
    },

    /// 404, or an ambiguous path that could not be resolved.
    #[error("{0}")]
    NotFound(String),

    /// 400, used by the server to signal an edit conflict.
    #[error("Conflict")]
    Conflict,

    /// Any other non-success status.
    #[error("Error {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Best-effort message from the response body.
        message: String,
    },

    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// Unexpected response shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Keychain error.
    #[error("Keychain error: {0}")]
    Keychain(#[from] KeychainError),

    /// Core error.
    #[error("Core error: {0}")]
    Core(#[from] drawlab_core::CoreError),

    /// The OS random source failed while generating an OAuth state.
    #[error("Failed to generate authorization state")]
    StateGeneration,
}

fn size_detail(size: &Option<usize>, limit: &Option<usize>) -> String {
    match (size, limit) {
        (Some(size), Some(limit)) => format!(" ({size} / {limit} bytes)"),
        (Some(size), None) => format!(" ({size} bytes)"),
        _ => String::new(),
    }
}

impl FetchError {
    /// Message used for every "file not found" outcome.
    pub const FILE_NOT_FOUND: &'static str = "File not found";

    /// Creates the generic "file not found" error.
    pub fn file_not_found() -> Self {
        Self::NotFound(Self::FILE_NOT_FOUND.to_string())
    }

    /// Returns the recovery step attached to this error, if any.
    pub fn retry_action(&self) -> Option<RetryAction> {
        match self {
            Self::AuthDenied { retry }
            | Self::PopupBlocked { retry }
            | Self::AccessDenied { retry } => Some(*retry),
            _ => None,
        }
    }

    /// Returns true for 404-class errors.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true for the edit-conflict signal.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict)
    }
}

// ============================================================================
// HTTP Error
// ============================================================================

/// HTTP-specific error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Request error.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Domain not allowed.
    #[error("Domain not allowed: {0}")]
    DomainNotAllowed(String),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Header value could not be encoded.
    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    /// Timeout.
    #[error("Request timed out")]
    Timeout,
}

impl From<url::ParseError> for HttpError {
    fn from(err: url::ParseError) -> Self {
        HttpError::InvalidUrl(err.to_string())
    }
}

// ============================================================================
// Keychain Error
// ============================================================================

/// Error type for keychain operations.
#[derive(Debug, Error)]
pub enum KeychainError {
    /// Access denied.
    #[error("Access denied to keychain")]
    AccessDenied,

    /// Platform error.
    #[error("Platform error: {0}")]
    Platform(String),

    /// Generic error.
    #[error("Keychain error: {0}")]
    Other(String),
}

impl From<keyring::Error> for KeychainError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::Ambiguous(_) => {
                KeychainError::Other("Ambiguous credential entry".to_string())
            }
            keyring::Error::PlatformFailure(e) => KeychainError::Platform(e.to_string()),
            keyring::Error::NoStorageAccess(_) => KeychainError::AccessDenied,
            _ => KeychainError::Other(err.to_string()),
        }
    }
}

// ============================================================================
// Launch Error
// ============================================================================

/// Error opening the authorization window.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The environment refused to open a window.
    #[error("Authorization window blocked")]
    Blocked,

    /// The opener failed.
    #[error("Failed to open authorization window: {0}")]
    Failed(String),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_action_only_on_auth_errors() {
        let retry = RetryAction::Reauthenticate;
        assert_eq!(FetchError::AccessDenied { retry }.retry_action(), Some(retry));
        assert_eq!(FetchError::AuthDenied { retry }.retry_action(), Some(retry));
        assert_eq!(FetchError::AuthBusy.retry_action(), None);
        assert_eq!(FetchError::Conflict.retry_action(), None);
    }

    #[test]
    fn test_size_limit_message() {
        let err = FetchError::SizeLimitExceeded {
            size: Some(2_000_000),
            limit: Some(1_048_576),
        };
        assert_eq!(err.to_string(), "Drawing too large (2000000 / 1048576 bytes)");

        let err = FetchError::SizeLimitExceeded { size: None, limit: None };
        assert_eq!(err.to_string(), "Drawing too large");
    }

    #[test]
    fn test_not_found_helpers() {
        let err = FetchError::file_not_found();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "File not found");
    }
}

//! Authenticated request execution.
//!
//! [`RequestExecutor::execute`] sends one request under the client deadline:
//!
//! 1. Authorize first if no token is held.
//! 2. Fetch and cache the identity if none is cached.
//! 3. Inject the credentials and dispatch.
//! 4. Classify the status. A 401 triggers one re-authorization and retry.

use std::sync::Arc;
use std::time::Duration;

use drawlab_core::Identity;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderName, HeaderValue};
use tracing::{debug, instrument, warn};

use crate::auth::AuthSession;
use crate::context::{ClientContext, GitLabProfile};
use crate::error::{FetchError, HttpError, RetryAction};
use crate::host::http::{ApiRequest, ApiResponse, HttpTransport};

/// Header carrying the token for GitLab's token authentication.
const PRIVATE_TOKEN: HeaderName = HeaderName::from_static("private-token");

// ============================================================================
// Classification
// ============================================================================

/// Maps a non-401 response to success or a [`FetchError`].
///
/// # Errors
///
/// Returns the error matching the status code.
pub fn classify(response: ApiResponse, ignore_not_found: bool) -> Result<ApiResponse, FetchError> {
    let status = response.status;

    if status.is_success() || (ignore_not_found && status == StatusCode::NOT_FOUND) {
        return Ok(response);
    }

    let err = match status {
        StatusCode::UNAUTHORIZED => FetchError::AccessDenied {
            retry: RetryAction::Reauthenticate,
        },
        StatusCode::FORBIDDEN if is_too_large(&response) => FetchError::SizeLimitExceeded {
            size: None,
            limit: None,
        },
        StatusCode::FORBIDDEN => FetchError::Forbidden,
        StatusCode::NOT_FOUND => FetchError::NotFound(
            response
                .error_message()
                .unwrap_or_else(|| FetchError::FILE_NOT_FOUND.to_string()),
        ),
        StatusCode::BAD_REQUEST => FetchError::Conflict,
        other => FetchError::Status {
            status: other.as_u16(),
            message: response
                .error_message()
                .unwrap_or_else(|| format!("Error {}", other.as_u16())),
        },
    };

    debug!(status = %status, error = %err, "Request failed");
    Err(err)
}

/// True if a 403 body reports `errors[0].code == "too_large"`.
fn is_too_large(response: &ApiResponse) -> bool {
    serde_json::from_str::<serde_json::Value>(&response.body)
        .ok()
        .and_then(|body| {
            body.get("errors")?
                .get(0)?
                .get("code")?
                .as_str()
                .map(|code| code == "too_large")
        })
        .unwrap_or(false)
}

// ============================================================================
// Request Executor
// ============================================================================

/// Sends requests with credentials, deadline and re-authorization.
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn HttpTransport>,
    session: Arc<AuthSession>,
    profile: GitLabProfile,
    timeout: Duration,
}

impl RequestExecutor {
    /// Creates an executor for the context's transport and profile.
    pub fn new(ctx: &ClientContext, session: Arc<AuthSession>) -> Self {
        Self {
            transport: Arc::clone(&ctx.http),
            session,
            profile: ctx.profile.clone(),
            timeout: ctx.timeout(),
        }
    }

    /// The auth session.
    pub fn session(&self) -> &Arc<AuthSession> {
        &self.session
    }

    /// The GitLab instance.
    pub fn profile(&self) -> &GitLabProfile {
        &self.profile
    }

    /// The request deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Executes `request`, treating 404 as success when `ignore_not_found`.
    ///
    /// # Errors
    ///
    /// Authorization errors from the session propagate unchanged. A second
    /// 401 within one call yields [`FetchError::AccessDenied`]. See
    /// [`classify`] for status mapping.
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.url.path()))]
    pub async fn execute(
        &self,
        request: ApiRequest,
        ignore_not_found: bool,
    ) -> Result<ApiResponse, FetchError> {
        let mut reauthenticated = self.ensure_token().await?;

        loop {
            self.ensure_identity(&mut reauthenticated).await?;

            let response = self.dispatch(request.clone()).await?;
            if response.status == StatusCode::UNAUTHORIZED {
                self.reauthenticate(&mut reauthenticated).await?;
                continue;
            }

            return classify(response, ignore_not_found);
        }
    }

    /// Returns the authenticated identity, authorizing first if needed.
    ///
    /// # Errors
    ///
    /// See [`RequestExecutor::execute`].
    pub async fn identity(&self) -> Result<Identity, FetchError> {
        if let Some(identity) = self.session.identity() {
            return Ok(identity);
        }

        let mut reauthenticated = self.ensure_token().await?;
        self.ensure_identity(&mut reauthenticated).await
    }

    /// Authorizes if no token is held. Returns true if it did.
    async fn ensure_token(&self) -> Result<bool, FetchError> {
        if self.session.is_authenticated() {
            return Ok(false);
        }

        debug!("No token, authorizing");
        self.session.authenticate().await?;
        Ok(true)
    }

    async fn ensure_identity(&self, reauthenticated: &mut bool) -> Result<Identity, FetchError> {
        loop {
            if let Some(identity) = self.session.identity() {
                return Ok(identity);
            }

            let request = ApiRequest::get(self.profile.api_url(&["user"])?);
            let response = self.dispatch(request).await?;
            if response.status == StatusCode::UNAUTHORIZED {
                self.reauthenticate(reauthenticated).await?;
                continue;
            }

            let identity: Identity = classify(response, false)?.json()?;
            debug!(user = %identity.username, "Identity cached");
            self.session.set_identity(identity.clone());
            return Ok(identity);
        }
    }

    async fn reauthenticate(&self, reauthenticated: &mut bool) -> Result<(), FetchError> {
        if *reauthenticated {
            warn!("Token rejected after re-authorization");
            return Err(FetchError::AccessDenied {
                retry: RetryAction::Reauthenticate,
            });
        }

        debug!("Token rejected, re-authorizing");
        *reauthenticated = true;
        self.session.authenticate().await
    }

    /// Injects credentials and sends under the deadline.
    async fn dispatch(&self, mut request: ApiRequest) -> Result<ApiResponse, FetchError> {
        let token = self.session.token().ok_or(FetchError::AccessDenied {
            retry: RetryAction::Reauthenticate,
        })?;

        let mut bearer = header_value(&format!("Bearer {token}"))?;
        bearer.set_sensitive(true);
        let mut private = header_value(&token)?;
        private.set_sensitive(true);

        request.headers.insert(AUTHORIZATION, bearer);
        request.headers.insert(PRIVATE_TOKEN, private);
        request
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        match tokio::time::timeout(self.timeout, self.transport.send(request)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(HttpError::Timeout)) | Err(_) => {
                warn!(timeout = ?self.timeout, "Request timed out");
                Err(FetchError::Timeout(self.timeout))
            }
            Ok(Err(e)) => Err(e.into()),
        }
    }
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("profile", &self.profile)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn header_value(value: &str) -> Result<HeaderValue, HttpError> {
    HeaderValue::from_str(value).map_err(|e| HttpError::InvalidHeader(e.to_string()))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> ApiResponse {
        ApiResponse::new(StatusCode::from_u16(status).unwrap(), body)
    }

    #[test]
    fn test_classify_success_and_ignored_404() {
        assert!(classify(response(200, "{}"), false).is_ok());
        assert!(classify(response(201, "{}"), false).is_ok());
        assert!(classify(response(404, "{}"), true).is_ok());
    }

    #[test]
    fn test_classify_not_found_message() {
        let err = classify(response(404, r#"{"message":"404 Project Not Found"}"#), false).unwrap_err();
        assert_eq!(err.to_string(), "404 Project Not Found");

        let err = classify(response(404, ""), false).unwrap_err();
        assert_eq!(err.to_string(), "File not found");
    }

    #[test]
    fn test_classify_forbidden() {
        let err = classify(response(403, r#"{"errors":[{"code":"too_large"}]}"#), false).unwrap_err();
        assert!(matches!(err, FetchError::SizeLimitExceeded { .. }));

        let err = classify(response(403, r#"{"message":"403 Forbidden"}"#), false).unwrap_err();
        assert!(matches!(err, FetchError::Forbidden));
    }

    #[test]
    fn test_classify_conflict_and_other() {
        assert!(classify(response(400, r#"{"message":"x"}"#), false).unwrap_err().is_conflict());

        match classify(response(502, "bad gateway"), false).unwrap_err() {
            FetchError::Status { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "Error 502");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

//! Client context providing access to host APIs and GitLab endpoints.
//!
//! The client context is handed to the request executor and the auth session
//! and bundles the transport, the keychain, the GitLab instance profile and the
//! client settings.

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::error::HttpError;
use crate::host::{
    http::{HttpClient, HttpTransport},
    keychain::{KeychainApi, SystemKeychain},
};

/// Default GitLab instance.
pub const DEFAULT_GITLAB_URL: &str = "https://gitlab.com";

/// Default OAuth scope.
pub const DEFAULT_SCOPE: &str = "api read_repository write_repository";

// ============================================================================
// GitLab Profile
// ============================================================================

/// Endpoints and OAuth application of one GitLab instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitLabProfile {
    /// Instance base URL, e.g. `https://gitlab.com`.
    pub base_url: Url,
    /// OAuth application id.
    pub client_id: String,
    /// Redirect URI registered for the OAuth application.
    pub redirect_uri: String,
    /// Space-separated OAuth scopes.
    pub scope: String,
}

impl GitLabProfile {
    /// Creates a profile for `base_url` with the default scope.
    pub fn new(base_url: Url, client_id: impl Into<String>) -> Self {
        Self {
            base_url,
            client_id: client_id.into(),
            redirect_uri: String::new(),
            scope: DEFAULT_SCOPE.to_string(),
        }
    }

    /// Sets the redirect URI.
    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = redirect_uri.into();
        self
    }

    /// Sets the OAuth scope.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Host name of the instance, used for the domain allowlist.
    pub fn host(&self) -> Option<&str> {
        self.base_url.host_str()
    }

    /// Builds `{base}/{segments…}`. Every segment is percent-encoded, so a
    /// `/` inside a segment becomes `%2F`.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::InvalidUrl`] if the base URL cannot carry a path.
    pub fn web_url(&self, segments: &[&str]) -> Result<Url, HttpError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| HttpError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Builds `{base}/api/v4/{segments…}`.
    ///
    /// # Errors
    ///
    /// See [`GitLabProfile::web_url`].
    pub fn api_url(&self, segments: &[&str]) -> Result<Url, HttpError> {
        let mut all = Vec::with_capacity(segments.len() + 2);
        all.extend(["api", "v4"]);
        all.extend_from_slice(segments);
        self.web_url(&all)
    }

    /// Builds the implicit-flow authorize URL for `state`.
    ///
    /// # Errors
    ///
    /// See [`GitLabProfile::web_url`].
    pub fn authorize_url(&self, state: &str) -> Result<Url, HttpError> {
        let mut url = self.web_url(&["oauth", "authorize"])?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("scope", &self.scope)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("response_type", "token")
            .append_pair("state", state);
        Ok(url)
    }
}

impl Default for GitLabProfile {
    fn default() -> Self {
        // The literal is a valid absolute URL.
        let base_url = Url::parse(DEFAULT_GITLAB_URL).unwrap_or_else(|e| {
            panic!("default GitLab URL is invalid: {e}")
        });
        Self::new(base_url, "")
    }
}

// ============================================================================
// Client Settings
// ============================================================================

/// Settings for GitLab operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// Deadline for a single request.
    pub timeout: Duration,
    /// Largest encoded payload accepted for a write, exclusive.
    pub max_file_size: usize,
    /// Page size for listings.
    pub page_size: usize,
}

impl ClientSettings {
    /// Maximum encoded file size: 1 MiB.
    pub const MAX_FILE_SIZE: usize = 1024 * 1024;

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(25),
            max_file_size: Self::MAX_FILE_SIZE,
            page_size: 100,
        }
    }
}

// ============================================================================
// Client Context
// ============================================================================

/// Host APIs and settings shared by the auth session and the executor.
#[derive(Clone)]
pub struct ClientContext {
    /// Secure credential storage.
    pub keychain: Arc<dyn KeychainApi>,
    /// HTTP transport.
    pub http: Arc<dyn HttpTransport>,
    /// GitLab instance.
    pub profile: GitLabProfile,
    /// Client settings.
    pub settings: ClientSettings,
}

impl ClientContext {
    /// Creates a context for `profile` with default host APIs.
    pub fn new(profile: GitLabProfile) -> Self {
        Self::builder().profile(profile).build()
    }

    /// Creates a builder for customizing the context.
    pub fn builder() -> ClientContextBuilder {
        ClientContextBuilder::new()
    }

    /// Returns the request deadline.
    pub fn timeout(&self) -> Duration {
        self.settings.timeout
    }
}

impl std::fmt::Debug for ClientContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientContext")
            .field("profile", &self.profile)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Client Context Builder
// ============================================================================

/// Builder for constructing a [`ClientContext`].
#[derive(Default)]
pub struct ClientContextBuilder {
    keychain: Option<Arc<dyn KeychainApi>>,
    http: Option<Arc<dyn HttpTransport>>,
    profile: GitLabProfile,
    settings: ClientSettings,
}

impl ClientContextBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the keychain implementation.
    pub fn keychain(mut self, keychain: Arc<dyn KeychainApi>) -> Self {
        self.keychain = Some(keychain);
        self
    }

    /// Sets the HTTP transport.
    pub fn http(mut self, http: Arc<dyn HttpTransport>) -> Self {
        self.http = Some(http);
        self
    }

    /// Sets the GitLab profile.
    pub fn profile(mut self, profile: GitLabProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Sets the client settings.
    pub fn settings(mut self, settings: ClientSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeout = timeout;
        self
    }

    /// Builds the context.
    ///
    /// Without an explicit transport, requests go through an [`HttpClient`]
    /// restricted to the profile's host, using the configured timeout.
    pub fn build(self) -> ClientContext {
        let http = self.http.unwrap_or_else(|| {
            let client = HttpClient::with_timeout(self.settings.timeout);
            let client = match self.profile.host() {
                Some(host) => client.restrict_to(vec![host.to_string()]),
                None => client,
            };
            Arc::new(client)
        });

        ClientContext {
            keychain: self.keychain.unwrap_or_else(|| Arc::new(SystemKeychain::new())),
            http,
            profile: self.profile,
            settings: self.settings,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> GitLabProfile {
        GitLabProfile::new(Url::parse("https://gitlab.example.com").unwrap(), "app-123")
            .with_redirect_uri("https://draw.example.com/gitlab.html")
    }

    #[test]
    fn test_api_url_encodes_project_id() {
        let url = profile()
            .api_url(&["projects", "acme/design/diagrams", "repository", "files", "flows/a.drawio"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://gitlab.example.com/api/v4/projects/acme%2Fdesign%2Fdiagrams/repository/files/flows%2Fa.drawio"
        );
    }

    #[test]
    fn test_api_url_with_base_path() {
        let profile = GitLabProfile::new(Url::parse("https://example.com/gitlab/").unwrap(), "x");
        let url = profile.api_url(&["user"]).unwrap();
        assert_eq!(url.as_str(), "https://example.com/gitlab/api/v4/user");
    }

    #[test]
    fn test_authorize_url() {
        let url = profile().authorize_url("abc123").unwrap();
        assert_eq!(url.path(), "/oauth/authorize");

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("client_id".into(), "app-123".into())));
        assert!(pairs.contains(&("response_type".into(), "token".into())));
        assert!(pairs.contains(&("state".into(), "abc123".into())));
        assert!(pairs.contains(&("scope".into(), DEFAULT_SCOPE.into())));
        assert!(pairs.contains(&(
            "redirect_uri".into(),
            "https://draw.example.com/gitlab.html".into()
        )));
    }

    #[test]
    fn test_default_settings() {
        let settings = ClientSettings::default();
        assert_eq!(settings.timeout, Duration::from_secs(25));
        assert_eq!(settings.max_file_size, 1_048_576);
        assert_eq!(settings.page_size, 100);
    }

    #[test]
    fn test_context_builder() {
        let ctx = ClientContext::builder()
            .profile(profile())
            .timeout(Duration::from_secs(60))
            .build();

        assert_eq!(ctx.timeout(), Duration::from_secs(60));
        assert_eq!(ctx.profile.host(), Some("gitlab.example.com"));
    }
}

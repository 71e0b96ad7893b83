//! Configuration management.
//!
//! The config file is JSON under the platform config directory. A handful of
//! environment variables override it, so a CLI can be pointed at another
//! GitLab instance without editing files.

use std::path::{Path, PathBuf};
use std::time::Duration;

use drawlab_fetch::context::{DEFAULT_GITLAB_URL, DEFAULT_SCOPE};
use drawlab_fetch::{ClientSettings, GitLabProfile};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::error::StoreError;
use crate::persistence::default_config_path;

/// Overrides the GitLab base URL.
pub const ENV_GITLAB_URL: &str = "DRAWLAB_GITLAB_URL";
/// Overrides the OAuth application id.
pub const ENV_CLIENT_ID: &str = "DRAWLAB_GITLAB_CLIENT_ID";
/// Overrides the OAuth redirect URI.
pub const ENV_REDIRECT_URI: &str = "DRAWLAB_GITLAB_REDIRECT_URI";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// GitLab instance and OAuth application.
    #[serde(default)]
    pub gitlab: GitLabConfig,
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
}

/// GitLab instance settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitLabConfig {
    /// Instance base URL.
    #[serde(default = "default_url")]
    pub url: String,
    /// OAuth application id.
    #[serde(default)]
    pub client_id: String,
    /// Redirect URI registered for the application.
    #[serde(default)]
    pub redirect_uri: String,
    /// Space-separated OAuth scopes.
    #[serde(default = "default_scope")]
    pub scope: String,
}

/// General settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Remember the token in the keychain after login unless told otherwise.
    #[serde(default)]
    pub remember_token: bool,
    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_url() -> String {
    DEFAULT_GITLAB_URL.to_string()
}

fn default_scope() -> String {
    DEFAULT_SCOPE.to_string()
}

fn default_timeout_secs() -> u64 {
    25
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for GitLabConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            client_id: String::new(),
            redirect_uri: String::new(),
            scope: default_scope(),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            remember_token: false,
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        default_config_path()
    }

    /// Loads configuration from the default path and applies environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn load() -> Result<Self, StoreError> {
        Ok(Self::load_from(&Self::default_path())?.with_env())
    }

    /// Loads configuration from a specific path.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;

        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Saves configuration to the default path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self) -> Result<(), StoreError> {
        self.save_to(&Self::default_path())
    }

    /// Saves configuration to a specific path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, serde_json::to_string_pretty(self)?)?;

        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Applies overrides from the process environment.
    pub fn with_env(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides looked up through `lookup`. Empty values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_GITLAB_URL) {
            debug!(url = %url, "GitLab URL from environment");
            self.gitlab.url = url;
        }
        if let Some(id) = get(ENV_CLIENT_ID) {
            self.gitlab.client_id = id;
        }
        if let Some(uri) = get(ENV_REDIRECT_URI) {
            self.gitlab.redirect_uri = uri;
        }
        self
    }

    /// Builds the GitLab profile.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the URL is invalid or no client id
    /// is configured.
    pub fn profile(&self) -> Result<GitLabProfile, StoreError> {
        let base_url = Url::parse(&self.gitlab.url)
            .map_err(|e| StoreError::Config(format!("Invalid GitLab URL '{}': {e}", self.gitlab.url)))?;

        if self.gitlab.client_id.is_empty() {
            return Err(StoreError::Config(format!(
                "No OAuth client id configured; set gitlab.client_id or {ENV_CLIENT_ID}"
            )));
        }

        Ok(GitLabProfile::new(base_url, &self.gitlab.client_id)
            .with_redirect_uri(&self.gitlab.redirect_uri)
            .with_scope(&self.gitlab.scope))
    }

    /// Builds the client settings.
    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings::default().with_timeout(Duration::from_secs(self.general.timeout_secs.max(1)))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.gitlab.url, "https://gitlab.com");
        assert_eq!(config.gitlab.scope, "api read_repository write_repository");
        assert_eq!(config.general.timeout_secs, 25);
        assert!(!config.general.remember_token);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"gitlab":{"client_id":"abc"}}"#).unwrap();
        assert_eq!(config.gitlab.client_id, "abc");
        assert_eq!(config.gitlab.url, "https://gitlab.com");
        assert_eq!(config.general, GeneralConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::default().with_overrides(env(&[
            (ENV_GITLAB_URL, "https://git.example.org"),
            (ENV_CLIENT_ID, "xyz"),
            (ENV_REDIRECT_URI, "  "),
        ]));

        assert_eq!(config.gitlab.url, "https://git.example.org");
        assert_eq!(config.gitlab.client_id, "xyz");
        assert_eq!(config.gitlab.redirect_uri, "");
    }

    #[test]
    fn test_profile() {
        let mut config = Config::default();
        config.gitlab.client_id = "app".to_string();
        config.gitlab.redirect_uri = "https://editor.example.com/gitlab".to_string();

        let profile = config.profile().unwrap();
        assert_eq!(profile.host(), Some("gitlab.com"));
        assert_eq!(profile.client_id, "app");
        assert_eq!(profile.redirect_uri, "https://editor.example.com/gitlab");
    }

    #[test]
    fn test_profile_requires_client_id() {
        let err = Config::default().profile().unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn test_profile_rejects_bad_url() {
        let mut config = Config::default();
        config.gitlab.client_id = "app".to_string();
        config.gitlab.url = "not a url".to_string();
        assert!(matches!(config.profile(), Err(StoreError::Config(_))));
    }

    #[test]
    fn test_client_settings() {
        let mut config = Config::default();
        config.general.timeout_secs = 5;

        let settings = config.client_settings();
        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert_eq!(settings.max_file_size, ClientSettings::MAX_FILE_SIZE);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.gitlab.client_id = "app".to_string();
        config.general.remember_token = true;
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_load_missing_uses_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&temp_dir.path().join("none.json")).unwrap();
        assert_eq!(config, Config::default());
    }
}

//! Wiring shared by the network commands.

use std::sync::Arc;

use anyhow::{Context, Result};
use drawlab_core::{FileHandle, RepositoryCoordinate, split_handle_path};
use drawlab_fetch::ClientContext;
use drawlab_gitlab::{Existence, GitLabError, GitLabStorage};
use drawlab_store::{Config, RefIndexCache};
use tracing::{debug, warn};

use crate::launcher::TerminalLauncher;

/// Cached ref positions older than this are dropped on startup.
const CACHE_MAX_AGE_DAYS: i64 = 30;

/// Storage plus the local ref cache.
pub struct App {
    pub storage: GitLabStorage,
    pub cache: RefIndexCache,
}

impl App {
    /// Loads configuration, restores a remembered token and opens the cache.
    ///
    /// `remember` overrides the configured remember-token default.
    pub async fn open(remember: Option<bool>) -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        let profile = config.profile()?;

        let ctx = ClientContext::builder()
            .profile(profile)
            .settings(config.client_settings())
            .build();

        let launcher = TerminalLauncher::new(remember.unwrap_or(config.general.remember_token));
        let storage = GitLabStorage::new(&ctx, Arc::new(launcher));

        match storage.session().restore().await {
            Ok(restored) => debug!(restored, "Session restored"),
            Err(e) => warn!(error = %e, "Could not read remembered token"),
        }

        let cache = RefIndexCache::load_default().await;
        let pruned = cache.prune(chrono::Duration::days(CACHE_MAX_AGE_DAYS)).await;
        if pruned > 0 {
            debug!(pruned, "Dropped stale ref cache entries");
        }

        Ok(Self { storage, cache })
    }

    /// Opens a file, using and refreshing the ref cache.
    pub async fn get_file(&self, path: &str, as_library: bool) -> Result<FileHandle, GitLabError> {
        let known = self.cache.get(path).await;
        let handle = match self.storage.get_file(path, as_library, known).await {
            Err(e) if known.is_some() && e.is_not_found() => {
                debug!(path, "Cached ref index is stale, resolving again");
                self.cache.forget(path).await;
                self.storage.get_file(path, as_library, None).await?
            }
            other => other?,
        };

        self.remember(&handle.meta.coordinate()).await;
        Ok(handle)
    }

    /// Resolves a path, using and refreshing the ref cache.
    pub async fn resolve(&self, path: &str, want_folder: bool) -> Result<RepositoryCoordinate, GitLabError> {
        let known = self.cache.get(path).await;
        let coord = self.storage.resolve(path, want_folder, known).await?;
        self.remember(&coord).await;
        Ok(coord)
    }

    /// Resolves the folder of a file path and returns the file's coordinate.
    ///
    /// Works for files that do not exist yet.
    pub async fn locate(&self, path: &str) -> Result<RepositoryCoordinate> {
        let (folder, name) = split_parent(path)
            .with_context(|| format!("'{path}' is not a file path"))?;
        Ok(self.resolve(&folder, true).await?.child(&name))
    }

    /// Checks whether a file exists.
    pub async fn check_exists(&self, path: &str) -> Result<Existence> {
        let coord = self.locate(path).await?;
        Ok(self.storage.writer().check_exists(&coord).await?)
    }

    /// Remembers a coordinate and writes the cache back.
    pub async fn remember(&self, coord: &RepositoryCoordinate) {
        if self.cache.get(&coord.handle_path()).await == Some(coord.ref_index) {
            return;
        }

        self.cache.remember(coord).await;
        if let Err(e) = self.cache.save().await {
            warn!(error = %e, "Failed to save ref cache");
        }
    }
}

/// Splits a handle path into its folder and file name.
pub fn split_parent(path: &str) -> Option<(String, String)> {
    let mut tokens = split_handle_path(path);
    let name = tokens.pop()?;
    if tokens.len() < 3 {
        return None;
    }
    Some((tokens.join("/"), name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_parent() {
        assert_eq!(
            split_parent("/acme/diagrams/main/docs/a.drawio"),
            Some(("acme/diagrams/main/docs".to_string(), "a.drawio".to_string()))
        );
        assert_eq!(
            split_parent("acme/diagrams/main/a.drawio"),
            Some(("acme/diagrams/main".to_string(), "a.drawio".to_string()))
        );
        assert_eq!(split_parent("acme/diagrams/a.drawio"), None);
        assert_eq!(split_parent(""), None);
    }
}

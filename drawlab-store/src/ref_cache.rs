//! Cache of resolved ref positions.
//!
//! Resolving a handle path costs one probe per candidate position. Once a
//! path has been resolved its ref index is remembered here, so the next open
//! or save can pass it as a known index and skip probing.

use chrono::{DateTime, Duration, Utc};
use drawlab_core::{RepositoryCoordinate, split_handle_path};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::persistence::{default_ref_cache_path, load_json_or_default, save_json};

/// One remembered resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedRef {
    /// Index of the ref token.
    pub ref_index: usize,
    /// When the path was resolved.
    pub resolved_at: DateTime<Utc>,
}

/// Handle path to ref index, persisted as JSON.
#[derive(Debug, Clone)]
pub struct RefIndexCache {
    entries: Arc<RwLock<HashMap<String, CachedRef>>>,
    path: PathBuf,
}

/// Normalizes a handle path the way the resolver tokenizes it.
fn key(path: &str) -> String {
    split_handle_path(path).join("/")
}

impl RefIndexCache {
    /// Creates an empty cache persisted at `path`.
    pub fn new(path: PathBuf) -> Self {
        Self {
            entries: Arc::default(),
            path,
        }
    }

    /// Loads the cache from the default path.
    pub async fn load_default() -> Self {
        Self::load(default_ref_cache_path()).await
    }

    /// Loads the cache from `path`; a missing or corrupt file yields an
    /// empty cache.
    pub async fn load(path: PathBuf) -> Self {
        let entries: HashMap<String, CachedRef> = load_json_or_default(&path).await;
        debug!(path = %path.display(), entries = entries.len(), "Loaded ref cache");

        Self {
            entries: Arc::new(RwLock::new(entries)),
            path,
        }
    }

    /// Returns the cached ref index for a handle path.
    pub async fn get(&self, path: &str) -> Option<usize> {
        self.entries
            .read()
            .await
            .get(&key(path))
            .map(|entry| entry.ref_index)
    }

    /// Remembers a resolved coordinate under its handle path.
    pub async fn remember(&self, coord: &RepositoryCoordinate) {
        self.insert(&coord.handle_path(), coord.ref_index).await;
    }

    /// Remembers `ref_index` for a handle path.
    pub async fn insert(&self, path: &str, ref_index: usize) {
        let entry = CachedRef {
            ref_index,
            resolved_at: Utc::now(),
        };
        self.entries.write().await.insert(key(path), entry);
    }

    /// Forgets a handle path. Returns true if it was cached.
    pub async fn forget(&self, path: &str) -> bool {
        self.entries.write().await.remove(&key(path)).is_some()
    }

    /// Drops entries resolved longer than `max_age` ago. Returns how many
    /// were dropped.
    pub async fn prune(&self, max_age: Duration) -> usize {
        let cutoff = Utc::now() - max_age;
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.resolved_at >= cutoff);
        before - entries.len()
    }

    /// Number of cached paths.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true if nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Saves the cache to disk.
    ///
    /// # Errors
    ///
    /// Returns error if the cache cannot be written.
    pub async fn save(&self) -> Result<(), StoreError> {
        let entries = self.entries.read().await;
        save_json(&self.path, &*entries).await?;
        info!(path = %self.path.display(), entries = entries.len(), "Ref cache saved");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(dir: &tempfile::TempDir) -> RefIndexCache {
        RefIndexCache::new(dir.path().join("ref_index.json"))
    }

    #[tokio::test]
    async fn test_insert_and_get_normalizes_path() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(&dir);

        cache.insert("/acme/diagrams/main/a.drawio", 2).await;

        assert_eq!(cache.get("acme/diagrams/main/a.drawio").await, Some(2));
        assert_eq!(cache.get("acme//diagrams/main/a.drawio/").await, Some(2));
        assert_eq!(cache.get("acme/diagrams/main/b.drawio").await, None);
    }

    #[tokio::test]
    async fn test_remember_coordinate() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(&dir);
        let coord = RepositoryCoordinate::parse("acme/design/diagrams/main/a.drawio", 3).unwrap();

        cache.remember(&coord).await;

        assert_eq!(cache.get("acme/design/diagrams/main/a.drawio").await, Some(3));
    }

    #[tokio::test]
    async fn test_forget() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(&dir);
        cache.insert("acme/diagrams/main/a.drawio", 2).await;

        assert!(cache.forget("acme/diagrams/main/a.drawio").await);
        assert!(!cache.forget("acme/diagrams/main/a.drawio").await);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_prune() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(&dir);
        cache.insert("acme/diagrams/main/new.drawio", 2).await;
        cache.entries.write().await.insert(
            "acme/diagrams/main/old.drawio".to_string(),
            CachedRef {
                ref_index: 2,
                resolved_at: Utc::now() - Duration::days(90),
            },
        );

        assert_eq!(cache.prune(Duration::days(30)).await, 1);
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get("acme/diagrams/main/new.drawio").await, Some(2));
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(&dir);
        cache.insert("acme/diagrams/feature%2Fx/a.drawio", 2).await;
        cache.save().await.unwrap();

        let loaded = RefIndexCache::load(dir.path().join("ref_index.json")).await;
        assert_eq!(loaded.get("acme/diagrams/feature%2Fx/a.drawio").await, Some(2));
    }

    #[tokio::test]
    async fn test_load_missing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = RefIndexCache::load(dir.path().join("nothing.json")).await;
        assert!(loaded.is_empty().await);
    }
}

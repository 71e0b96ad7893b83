//! File handles, revisions and the authenticated identity.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::coordinate::RepositoryCoordinate;

// ============================================================================
// Revision Token
// ============================================================================

/// Opaque identifier of a file's last known committed state.
///
/// Used as an optimistic-concurrency precondition on updates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionToken(String);

impl RevisionToken {
    /// Wraps a commit id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RevisionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RevisionToken {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ============================================================================
// Identity
// ============================================================================

/// The authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable numeric user id.
    pub id: u64,
    /// Login name.
    pub username: String,
}

// ============================================================================
// File Meta
// ============================================================================

/// Metadata describing where a file lives and which revision was last seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    /// Organization (group) path.
    pub org: String,
    /// Project name.
    pub repo: String,
    /// Ref as it appears in the handle path.
    pub reference: String,
    /// File name.
    pub name: String,
    /// In-repository path.
    pub path: String,
    /// Browser URL of the file.
    pub html_url: String,
    /// Raw download URL of the file.
    pub download_url: String,
    /// Last known revision, `None` if the file was never written.
    pub last_revision: Option<RevisionToken>,
    /// Ref index of the handle path, cached so later calls skip resolution.
    pub ref_index: usize,
    /// Set on handles created locally and not saved yet.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_new: bool,
}

impl FileMeta {
    /// Rebuilds the coordinate of this file.
    pub fn coordinate(&self) -> RepositoryCoordinate {
        let organization = if self.org.is_empty() {
            Vec::new()
        } else {
            self.org.split('/').map(str::to_string).collect()
        };

        RepositoryCoordinate {
            organization,
            repository: self.repo.clone(),
            reference: self.reference.clone(),
            ref_index: self.ref_index,
            file_path: self.path.clone(),
        }
    }
}

// ============================================================================
// File Handle
// ============================================================================

/// A decoded file as handed to the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHandle {
    /// Location and revision.
    pub meta: FileMeta,
    /// Decoded content: text, diagram XML or an image data URI.
    pub content: String,
    /// Whether the file is opened as a shape library.
    #[serde(default)]
    pub is_library: bool,
}

impl FileHandle {
    /// Creates a handle.
    pub fn new(meta: FileMeta, content: impl Into<String>) -> Self {
        Self {
            meta,
            content: content.into(),
            is_library: false,
        }
    }

    /// Marks the handle as a library.
    pub fn into_library(mut self) -> Self {
        self.is_library = true;
        self
    }

    /// Returns the handle path of this file.
    pub fn handle_path(&self) -> String {
        self.meta.coordinate().handle_path()
    }

    /// Returns the revision the editor should treat as current.
    pub fn current_revision(&self) -> Option<&RevisionToken> {
        self.meta.last_revision.as_ref()
    }
}

// ============================================================================
// Tests
// ============================================================================

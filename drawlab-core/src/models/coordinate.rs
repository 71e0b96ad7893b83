//! Repository coordinates and handle path tokenization.
//!
//! A handle path is a single slash-separated string that concatenates a group
//! path (possibly nested), a project name, a ref and an in-repository path:
//!
//! ```text
//! acme/design/diagrams/main/flows/a.drawio
//! \_________/ \______/ \__/ \____________/
//!  org path    repo    ref    file path
//! ```
//!
//! The boundaries cannot be derived from the token count alone. The ref index
//! is found by the resolver and carried alongside the coordinate from then on.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// Splits a handle path into its tokens.
///
/// Empty segments (leading, trailing or doubled slashes) are dropped.
pub fn split_handle_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// Repository Coordinate
// ============================================================================

/// A resolved position inside a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryCoordinate {
    /// Group path segments before the project name (may be empty).
    pub organization: Vec<String>,
    /// Project name, the token right before the ref.
    pub repository: String,
    /// Branch, tag or commit, as it appears in the handle path.
    pub reference: String,
    /// Index of the ref in the original token list.
    pub ref_index: usize,
    /// In-repository path, `/`-joined. Empty for the repository root.
    pub file_path: String,
}

impl RepositoryCoordinate {
    /// Builds the coordinate implied by treating `tokens[ref_index]` as the ref.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidPath`] if there is no token left for the
    /// project name or if `ref_index` is past the end of the token list.
    pub fn from_tokens(tokens: &[String], ref_index: usize) -> Result<Self, CoreError> {
        if ref_index == 0 || ref_index >= tokens.len() {
            return Err(CoreError::InvalidPath {
                path: tokens.join("/"),
                reason: format!(
                    "ref index {ref_index} out of range for {} tokens",
                    tokens.len()
                ),
            });
        }

        let repo_index = ref_index - 1;
        Ok(Self {
            organization: tokens[..repo_index].to_vec(),
            repository: tokens[repo_index].clone(),
            reference: tokens[ref_index].clone(),
            ref_index,
            file_path: tokens[ref_index + 1..].join("/"),
        })
    }

    /// Parses a handle path with an already known ref index.
    ///
    /// # Errors
    ///
    /// See [`RepositoryCoordinate::from_tokens`].
    pub fn parse(path: &str, ref_index: usize) -> Result<Self, CoreError> {
        Self::from_tokens(&split_handle_path(path), ref_index)
    }

    /// The organization path joined with `/`.
    pub fn organization_path(&self) -> String {
        self.organization.join("/")
    }

    /// The full project path (`org/sub/repo`) used as the API project id.
    pub fn project_path(&self) -> String {
        if self.organization.is_empty() {
            self.repository.clone()
        } else {
            format!("{}/{}", self.organization_path(), self.repository)
        }
    }

    /// Last segment of the file path.
    pub fn file_name(&self) -> &str {
        self.file_path.rsplit('/').next().unwrap_or(&self.file_path)
    }

    /// Returns the coordinate of `name` inside this (folder) coordinate.
    ///
    /// The ref index is unchanged since only trailing tokens are added.
    pub fn child(&self, name: &str) -> Self {
        let file_path = if self.file_path.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.file_path, name)
        };

        Self {
            file_path,
            ..self.clone()
        }
    }

    /// Reassembles the handle path this coordinate was parsed from.
    pub fn handle_path(&self) -> String {
        let mut path = format!("{}/{}", self.project_path(), self.reference);
        if !self.file_path.is_empty() {
            path.push('/');
            path.push_str(&self.file_path);
        }
        path
    }
}

impl fmt::Display for RepositoryCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.handle_path())
    }
}

// ============================================================================
// Tests
// ============================================================================

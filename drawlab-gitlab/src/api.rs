//! GitLab REST API v4 endpoints and response shapes.
//!
//! Endpoints used:
//!
//! - `GET|HEAD /projects/:id/repository/files/:path?ref=` - Read a file
//! - `POST|PUT /projects/:id/repository/files/:path` - Create or update a file
//! - `HEAD|GET /projects/:id/repository/tree?path=&ref=` - Probe or list a folder
//! - `GET /projects/:id/repository/branches` - List branches
//! - `GET /groups`, `GET /groups/:id/projects`, `GET /users/:id/projects` - Browse

use std::borrow::Cow;

use drawlab_core::RepositoryCoordinate;
use drawlab_fetch::{GitLabProfile, HttpError};
use serde::{Deserialize, Serialize};
use url::Url;

/// Response header carrying the last commit id on file `HEAD` requests.
pub const LAST_COMMIT_HEADER: &str = "x-gitlab-last-commit-id";

// ============================================================================
// Response Types
// ============================================================================

/// Response of `GET /projects/:id/repository/files/:path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileResponse {
    /// File name.
    pub file_name: String,
    /// In-repository path.
    pub file_path: String,
    /// Content encoding, `base64` for the files API.
    #[serde(default)]
    pub encoding: Option<String>,
    /// Encoded content.
    #[serde(default)]
    pub content: String,
    /// Id of the last commit that touched the file.
    #[serde(default)]
    pub last_commit_id: Option<String>,
    /// Ref the file was read from.
    #[serde(default, rename = "ref")]
    pub reference: Option<String>,
}

/// Body of the create and update file requests.
#[derive(Debug, Clone, Serialize)]
pub struct WriteFileBody<'a> {
    /// In-repository path.
    pub path: &'a str,
    /// Target branch, percent-decoded.
    pub branch: String,
    /// Commit message.
    pub commit_message: &'a str,
    /// Base64 content.
    pub content: &'a str,
    /// Always `base64`.
    pub encoding: &'static str,
    /// Revision precondition; present only on updates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_commit_id: Option<&'a str>,
}

/// A group from `GET /groups`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Numeric id.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Full namespace path.
    pub full_path: String,
}

/// A project from the project listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Numeric id.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Project path including its namespace.
    pub path_with_namespace: String,
    /// Default branch, absent for empty repositories.
    #[serde(default)]
    pub default_branch: Option<String>,
}

/// A branch from `GET /projects/:id/repository/branches`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// Branch name.
    pub name: String,
    /// Whether this is the default branch.
    #[serde(default)]
    pub default: bool,
}

/// Kind of a tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeEntryKind {
    /// Folder.
    Tree,
    /// File.
    Blob,
    /// Submodule.
    Commit,
}

/// An entry from `GET /projects/:id/repository/tree`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// Object id.
    pub id: String,
    /// Entry name.
    pub name: String,
    /// Entry kind.
    #[serde(rename = "type")]
    pub kind: TreeEntryKind,
    /// In-repository path.
    pub path: String,
}

impl TreeEntry {
    /// Returns true for folders.
    pub fn is_folder(&self) -> bool {
        self.kind == TreeEntryKind::Tree
    }
}

// ============================================================================
// Endpoints
// ============================================================================

/// Percent-decodes a ref taken from a handle path.
///
/// Refs that do not decode to UTF-8 are used as-is.
pub fn decode_ref(reference: &str) -> String {
    urlencoding::decode(reference).map_or_else(|_| reference.to_string(), Cow::into_owned)
}

/// Builds API and web URLs for one GitLab instance.
#[derive(Debug, Clone)]
pub struct GitLabApi {
    profile: GitLabProfile,
}

impl GitLabApi {
    /// Creates the endpoint builder.
    pub fn new(profile: GitLabProfile) -> Self {
        Self { profile }
    }

    /// The instance profile.
    pub fn profile(&self) -> &GitLabProfile {
        &self.profile
    }

    /// `/projects/:id/repository/files/:path?ref=`
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot carry a path.
    pub fn file_url(&self, coord: &RepositoryCoordinate) -> Result<Url, HttpError> {
        let mut url = self.file_write_url(coord)?;
        url.query_pairs_mut()
            .append_pair("ref", &decode_ref(&coord.reference));
        Ok(url)
    }

    /// `/projects/:id/repository/files/:path`
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot carry a path.
    pub fn file_write_url(&self, coord: &RepositoryCoordinate) -> Result<Url, HttpError> {
        self.profile.api_url(&[
            "projects",
            &coord.project_path(),
            "repository",
            "files",
            &coord.file_path,
        ])
    }

    /// `/projects/:id/repository/tree?path=&ref=`
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot carry a path.
    pub fn tree_url(&self, coord: &RepositoryCoordinate) -> Result<Url, HttpError> {
        let mut url = self
            .profile
            .api_url(&["projects", &coord.project_path(), "repository", "tree"])?;
        url.query_pairs_mut()
            .append_pair("path", &coord.file_path)
            .append_pair("ref", &decode_ref(&coord.reference));
        Ok(url)
    }

    /// `/projects/:id/repository/branches`
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot carry a path.
    pub fn branches_url(&self, project_path: &str) -> Result<Url, HttpError> {
        self.profile
            .api_url(&["projects", project_path, "repository", "branches"])
    }

    /// `/groups`
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot carry a path.
    pub fn groups_url(&self) -> Result<Url, HttpError> {
        self.profile.api_url(&["groups"])
    }

    /// `/groups/:id/projects`
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot carry a path.
    pub fn group_projects_url(&self, group_id: u64) -> Result<Url, HttpError> {
        self.profile
            .api_url(&["groups", &group_id.to_string(), "projects"])
    }

    /// `/users/:id/projects`
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot carry a path.
    pub fn user_projects_url(&self, user_id: u64) -> Result<Url, HttpError> {
        self.profile
            .api_url(&["users", &user_id.to_string(), "projects"])
    }

    /// Browser URL: `{base}/{org}/{repo}/blob/{ref}/{path}`.
    pub fn html_url(&self, coord: &RepositoryCoordinate) -> String {
        self.web_file_url(coord, "blob")
    }

    /// Raw download URL: `{base}/{org}/{repo}/raw/{ref}/{path}?inline=false`.
    pub fn download_url(&self, coord: &RepositoryCoordinate) -> String {
        format!("{}?inline=false", self.web_file_url(coord, "raw"))
    }

    fn web_file_url(&self, coord: &RepositoryCoordinate, kind: &str) -> String {
        format!(
            "{}/{}/{kind}/{}/{}",
            self.profile.base_url.as_str().trim_end_matches('/'),
            coord.project_path(),
            coord.reference,
            coord.file_path
        )
    }
}

/// Appends `per_page` and `page` to a listing URL.
pub fn paginate(mut url: Url, page: u32, per_page: usize) -> Url {
    url.query_pairs_mut()
        .append_pair("per_page", &per_page.to_string())
        .append_pair("page", &page.to_string());
    url
}

// ============================================================================
// Tests
// ============================================================================

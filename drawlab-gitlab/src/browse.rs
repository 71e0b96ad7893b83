//! Listing groups, projects, branches and folders.
//!
//! Backs the file picker. All listings are paged; a page that comes back full
//! is assumed to have a successor.

use drawlab_core::RepositoryCoordinate;
use drawlab_fetch::{ApiRequest, RequestExecutor};
use serde::de::DeserializeOwned;
use tracing::instrument;
use url::Url;

use crate::api::{Branch, GitLabApi, Group, Project, TreeEntry, paginate};
use crate::error::GitLabError;

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Entries on this page.
    pub items: Vec<T>,
    /// 1-based page number.
    pub page: u32,
    /// Whether requesting `page + 1` may return more entries.
    pub has_more: bool,
}

/// Paged listings over the GitLab API.
#[derive(Debug, Clone)]
pub struct RepositoryBrowser {
    executor: RequestExecutor,
    api: GitLabApi,
    page_size: usize,
}

impl RepositoryBrowser {
    /// Creates a browser requesting `page_size` entries per page.
    pub fn new(executor: RequestExecutor, api: GitLabApi, page_size: usize) -> Self {
        Self {
            executor,
            api,
            page_size,
        }
    }

    /// Groups the user is a member of.
    ///
    /// # Errors
    ///
    /// Returns any pipeline error.
    pub async fn groups(&self, page: u32) -> Result<Page<Group>, GitLabError> {
        self.list(self.api.groups_url()?, page).await
    }

    /// Projects of a group.
    ///
    /// # Errors
    ///
    /// Returns any pipeline error.
    pub async fn group_projects(&self, group_id: u64, page: u32) -> Result<Page<Project>, GitLabError> {
        self.list(self.api.group_projects_url(group_id)?, page).await
    }

    /// Projects in the user's personal namespace.
    ///
    /// # Errors
    ///
    /// Returns any pipeline error.
    pub async fn user_projects(&self, page: u32) -> Result<Page<Project>, GitLabError> {
        let identity = self.executor.identity().await?;
        self.list(self.api.user_projects_url(identity.id)?, page).await
    }

    /// Branches of a project given as `group/…/project`.
    ///
    /// # Errors
    ///
    /// Returns any pipeline error.
    pub async fn branches(&self, project_path: &str, page: u32) -> Result<Page<Branch>, GitLabError> {
        self.list(self.api.branches_url(project_path)?, page).await
    }

    /// Entries of a folder at a resolved coordinate.
    ///
    /// # Errors
    ///
    /// Returns any pipeline error.
    pub async fn tree(
        &self,
        folder: &RepositoryCoordinate,
        page: u32,
    ) -> Result<Page<TreeEntry>, GitLabError> {
        self.list(self.api.tree_url(folder)?, page).await
    }

    #[instrument(skip(self, url), fields(path = %url.path()))]
    async fn list<T: DeserializeOwned>(&self, url: Url, page: u32) -> Result<Page<T>, GitLabError> {
        let page = page.max(1);
        let request = ApiRequest::get(paginate(url, page, self.page_size));
        let items: Vec<T> = self.executor.execute(request, false).await?.json()?;

        Ok(Page {
            has_more: items.len() >= self.page_size,
            items,
            page,
        })
    }
}

//! Handle path resolution.
//!
//! A handle path does not say where the project name ends and the ref
//! begins, since groups nest arbitrarily. The resolver tries ref positions
//! from right to left and asks the server whether the implied file (or
//! folder) exists. The first hit wins; the result is the ref index, which
//! callers carry along so later calls skip probing.

use async_trait::async_trait;
use drawlab_core::{RepositoryCoordinate, split_handle_path};
use drawlab_fetch::{ApiRequest, FetchError, RequestExecutor, StatusCode};
use tracing::{debug, instrument};

use crate::api::GitLabApi;
use crate::error::GitLabError;

/// Smallest ref index that leaves room for a group and a project.
const MIN_REF_INDEX: usize = 2;

// ============================================================================
// Probe
// ============================================================================

/// Result of one existence probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The server answered 200.
    Found,
    /// The server answered 404.
    NotFound,
}

/// Asks whether a candidate coordinate exists.
#[async_trait]
pub trait RefProbe: Send + Sync {
    /// Probes `candidate` as a file, or as a folder if `want_folder`.
    ///
    /// # Errors
    ///
    /// Any error aborts resolution.
    async fn probe(
        &self,
        candidate: &RepositoryCoordinate,
        want_folder: bool,
    ) -> Result<ProbeOutcome, FetchError>;
}

/// Probes with `HEAD` requests through the executor.
#[derive(Debug, Clone)]
pub struct ApiProbe {
    executor: RequestExecutor,
    api: GitLabApi,
}

impl ApiProbe {
    /// Creates a probe.
    pub fn new(executor: RequestExecutor, api: GitLabApi) -> Self {
        Self { executor, api }
    }
}

#[async_trait]
impl RefProbe for ApiProbe {
    async fn probe(
        &self,
        candidate: &RepositoryCoordinate,
        want_folder: bool,
    ) -> Result<ProbeOutcome, FetchError> {
        let url = if want_folder {
            self.api.tree_url(candidate)?
        } else {
            self.api.file_url(candidate)?
        };

        let response = self.executor.execute(ApiRequest::head(url), true).await?;
        match response.status {
            StatusCode::OK => Ok(ProbeOutcome::Found),
            StatusCode::NOT_FOUND => Ok(ProbeOutcome::NotFound),
            other => Err(FetchError::Status {
                status: other.as_u16(),
                message: format!("Unexpected probe status {other}"),
            }),
        }
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Finds the ref index of handle paths.
#[derive(Debug, Clone)]
pub struct PathResolver<P> {
    probe: P,
}

impl<P: RefProbe> PathResolver<P> {
    /// Creates a resolver.
    pub fn new(probe: P) -> Self {
        Self { probe }
    }

    /// The underlying probe.
    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// Resolves a handle path string. See [`PathResolver::resolve`].
    ///
    /// # Errors
    ///
    /// See [`PathResolver::resolve`].
    pub async fn resolve_path(
        &self,
        path: &str,
        want_folder: bool,
        known_index: Option<usize>,
    ) -> Result<RepositoryCoordinate, GitLabError> {
        self.resolve(&split_handle_path(path), want_folder, known_index)
            .await
    }

    /// Resolves `tokens` into a coordinate.
    ///
    /// A `known_index` is trusted without probing. Otherwise candidates run
    /// from `len - 2` (files) or `len - 1` (folders) down to 2; a 404 moves
    /// one position left, a 200 accepts.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when every candidate was rejected or a probe
    /// failed with anything other than a 404, and an invalid-path error for
    /// a `known_index` out of range.
    #[instrument(skip(self, tokens), fields(path = %tokens.join("/")))]
    pub async fn resolve(
        &self,
        tokens: &[String],
        want_folder: bool,
        known_index: Option<usize>,
    ) -> Result<RepositoryCoordinate, GitLabError> {
        if let Some(index) = known_index {
            return Ok(RepositoryCoordinate::from_tokens(tokens, index)?);
        }

        let start = if want_folder {
            tokens.len().checked_sub(1)
        } else {
            tokens.len().checked_sub(2)
        };
        let Some(mut candidate) = start else {
            return Err(FetchError::file_not_found().into());
        };

        while candidate >= MIN_REF_INDEX {
            let coord = RepositoryCoordinate::from_tokens(tokens, candidate)?;

            match self.probe.probe(&coord, want_folder).await {
                Ok(ProbeOutcome::Found) => {
                    debug!(ref_index = candidate, "Resolved");
                    return Ok(coord);
                }
                Ok(ProbeOutcome::NotFound) => {
                    debug!(ref_index = candidate, "Not found, moving left");
                    candidate -= 1;
                }
                Err(e) => {
                    debug!(ref_index = candidate, error = %e, "Probe failed");
                    return Err(FetchError::file_not_found().into());
                }
            }
        }

        Err(FetchError::file_not_found().into())
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Conflict-aware writes.
//!
//! The files API accepts a `last_commit_id` precondition on updates but does
//! not reliably reject stale ones. Every write is therefore followed by a
//! re-read of the same path; if the stored bytes differ from what was sent,
//! the write is reported as [`WriteOutcome::WrittenButDiverged`] so the
//! caller can surface the conflict instead of silently losing an edit.

use std::sync::Arc;

use async_trait::async_trait;
use drawlab_core::{FileHandle, RepositoryCoordinate, RevisionToken};
use drawlab_fetch::{ApiRequest, FetchError, Method, RequestExecutor, StatusCode};
use tracing::{debug, info, instrument, warn};

use crate::api::{FileResponse, GitLabApi, LAST_COMMIT_HEADER, WriteFileBody, decode_ref};
use crate::codec::{self, FileKind};
use crate::error::GitLabError;
use crate::png::PngExporter;

// ============================================================================
// Results
// ============================================================================

/// Result of a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The stored content matches what was sent.
    Written {
        /// Revision after the write.
        revision: RevisionToken,
    },
    /// The write went through but the stored content differs, typically
    /// because a concurrent edit landed in between.
    WrittenButDiverged {
        /// Revision the write was based on.
        local_revision: Option<RevisionToken>,
        /// Revision currently stored.
        remote_revision: RevisionToken,
    },
}

/// A write outcome together with the reconciliation read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReceipt {
    /// Whether the stored content matched.
    pub outcome: WriteOutcome,
    /// The file as re-read after the write.
    pub remote: FileResponse,
}

impl WriteReceipt {
    /// Returns true for a soft conflict.
    pub fn is_diverged(&self) -> bool {
        matches!(self.outcome, WriteOutcome::WrittenButDiverged { .. })
    }

    /// Revision currently stored remotely.
    pub fn remote_revision(&self) -> &RevisionToken {
        match &self.outcome {
            WriteOutcome::Written { revision } => revision,
            WriteOutcome::WrittenButDiverged {
                remote_revision, ..
            } => remote_revision,
        }
    }
}

/// Whether a file exists remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Existence {
    /// The file exists.
    Exists {
        /// Its last commit id, when reported.
        revision: Option<RevisionToken>,
    },
    /// No file at that path.
    Missing,
}

// ============================================================================
// Replace Prompt
// ============================================================================

/// Asks the user whether an existing file may be replaced.
#[async_trait]
pub trait ReplacePrompt: Send + Sync {
    /// Returns true to replace `path`.
    async fn confirm_replace(&self, path: &str) -> bool;
}

/// Replaces without asking.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysReplace;

#[async_trait]
impl ReplacePrompt for AlwaysReplace {
    async fn confirm_replace(&self, _path: &str) -> bool {
        true
    }
}

// ============================================================================
// Writer
// ============================================================================

/// Creates and updates files with reconciliation.
#[derive(Clone)]
pub struct ConflictAwareWriter {
    executor: RequestExecutor,
    api: GitLabApi,
    max_file_size: usize,
    exporter: Option<Arc<dyn PngExporter>>,
}

impl ConflictAwareWriter {
    /// Creates a writer rejecting payloads of `max_file_size` bytes or more.
    pub fn new(executor: RequestExecutor, api: GitLabApi, max_file_size: usize) -> Self {
        Self {
            executor,
            api,
            max_file_size,
            exporter: None,
        }
    }

    /// Sets the exporter used to save PNG handles holding diagram XML.
    pub fn with_exporter(mut self, exporter: Arc<dyn PngExporter>) -> Self {
        self.exporter = Some(exporter);
        self
    }

    /// Reads a file at a resolved coordinate.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the file does not exist, or any pipeline error.
    #[instrument(skip(self, coord), fields(path = %coord))]
    pub async fn read(&self, coord: &RepositoryCoordinate) -> Result<FileResponse, GitLabError> {
        let request = ApiRequest::get(self.api.file_url(coord)?);
        let response = self.executor.execute(request, false).await?;
        Ok(response.json()?)
    }

    /// Writes base64 `encoded` content.
    ///
    /// Creates the file when `previous` is `None`, otherwise updates it with
    /// `previous` as precondition. The file is re-read afterwards.
    ///
    /// # Errors
    ///
    /// - [`FetchError::SizeLimitExceeded`] if `encoded` is too large; nothing is sent
    /// - [`FetchError::Conflict`] if the server rejects the precondition
    /// - any pipeline or codec error
    #[instrument(skip(self, coord, message, encoded, previous), fields(path = %coord, size = encoded.len()))]
    pub async fn write(
        &self,
        coord: &RepositoryCoordinate,
        message: &str,
        encoded: &str,
        previous: Option<&RevisionToken>,
    ) -> Result<WriteReceipt, GitLabError> {
        let size = encoded.len();
        if size >= self.max_file_size {
            warn!(size, limit = self.max_file_size, "Payload too large");
            return Err(FetchError::SizeLimitExceeded {
                size: Some(size),
                limit: Some(self.max_file_size),
            }
            .into());
        }

        let sent = codec::decode_bytes(encoded)?;

        let body = WriteFileBody {
            path: &coord.file_path,
            branch: decode_ref(&coord.reference),
            commit_message: message,
            content: encoded,
            encoding: codec::BASE64,
            last_commit_id: previous.map(RevisionToken::as_str),
        };
        let method = if previous.is_some() {
            Method::PUT
        } else {
            Method::POST
        };

        let request = ApiRequest::new(method, self.api.file_write_url(coord)?).with_json(&body)?;
        self.executor.execute(request, false).await?;

        // The write response carries no commit id; re-read to learn it.
        let remote = self.read(coord).await?;
        let remote_revision = remote
            .last_commit_id
            .clone()
            .map(RevisionToken::new)
            .ok_or_else(|| FetchError::InvalidResponse("missing last_commit_id".to_string()))?;

        let stored = if remote.encoding.as_deref() == Some(codec::BASE64) {
            codec::decode_bytes(&remote.content)?
        } else {
            remote.content.clone().into_bytes()
        };

        let outcome = if stored == sent {
            info!(revision = %remote_revision, "Written");
            WriteOutcome::Written {
                revision: remote_revision,
            }
        } else {
            warn!(remote = %remote_revision, "Stored content differs from written content");
            WriteOutcome::WrittenButDiverged {
                local_revision: previous.cloned(),
                remote_revision,
            }
        };

        Ok(WriteReceipt { outcome, remote })
    }

    /// Saves a handle.
    ///
    /// With `overwrite`, the current remote revision is fetched first so the
    /// update is based on it. On success `is_new` is cleared; on a clean
    /// write the handle also takes the new revision.
    ///
    /// # Errors
    ///
    /// See [`ConflictAwareWriter::write`]. PNG handles holding diagram XML
    /// fail with [`GitLabError::ExportUnavailable`] without an exporter.
    #[instrument(skip(self, handle, message), fields(path = %handle.handle_path()))]
    pub async fn save(
        &self,
        handle: &mut FileHandle,
        overwrite: bool,
        message: &str,
    ) -> Result<WriteReceipt, GitLabError> {
        let coord = handle.meta.coordinate();

        if overwrite {
            let current = self.read(&coord).await?;
            debug!(revision = ?current.last_commit_id, "Refreshed revision before overwrite");
            handle.meta.last_revision = current.last_commit_id.map(RevisionToken::new);
        }

        let encoded = self.encode_for_save(handle)?;
        let receipt = self
            .write(&coord, message, &encoded, handle.meta.last_revision.as_ref())
            .await?;

        handle.meta.is_new = false;
        if let WriteOutcome::Written { revision } = &receipt.outcome {
            handle.meta.last_revision = Some(revision.clone());
        }

        Ok(receipt)
    }

    /// Encodes a handle's content for a write.
    ///
    /// # Errors
    ///
    /// Returns [`GitLabError::ExportUnavailable`] for PNG handles holding
    /// diagram XML when no exporter is set, or the exporter's error.
    pub fn encode_for_save(&self, handle: &FileHandle) -> Result<String, GitLabError> {
        if let Some(payload) = codec::data_uri_payload(&handle.content) {
            return Ok(payload.to_string());
        }

        if FileKind::from_name(&handle.meta.name) == FileKind::Png {
            let exporter = self
                .exporter
                .as_ref()
                .ok_or_else(|| GitLabError::ExportUnavailable(handle.meta.name.clone()))?;
            let png = exporter.export_png(&handle.content)?;
            return Ok(codec::encode_bytes(&png));
        }

        Ok(codec::encode(&handle.content, false))
    }

    /// Checks whether a file exists and returns its revision.
    ///
    /// Uses `HEAD` and its last-commit header; falls back to a full read when
    /// the header is absent.
    ///
    /// # Errors
    ///
    /// Any pipeline error other than a 404.
    #[instrument(skip(self, coord), fields(path = %coord))]
    pub async fn check_exists(&self, coord: &RepositoryCoordinate) -> Result<Existence, GitLabError> {
        let request = ApiRequest::head(self.api.file_url(coord)?);
        let response = self.executor.execute(request, true).await?;

        if response.status == StatusCode::NOT_FOUND {
            return Ok(Existence::Missing);
        }

        if let Some(id) = response.header(LAST_COMMIT_HEADER) {
            return Ok(Existence::Exists {
                revision: Some(RevisionToken::new(id)),
            });
        }

        match self.read(coord).await {
            Ok(file) => Ok(Existence::Exists {
                revision: file.last_commit_id.map(RevisionToken::new),
            }),
            Err(e) if e.is_not_found() => Ok(Existence::Missing),
            Err(e) => Err(e),
        }
    }

    /// Checks for an existing file and asks before replacing it.
    ///
    /// Returns the revision to write against: `None` for a new file, the
    /// existing revision once the user agreed to replace.
    ///
    /// # Errors
    ///
    /// Returns [`GitLabError::Cancelled`] if the user declined.
    pub async fn confirm_replace(
        &self,
        coord: &RepositoryCoordinate,
        prompt: &dyn ReplacePrompt,
    ) -> Result<Option<RevisionToken>, GitLabError> {
        match self.check_exists(coord).await? {
            Existence::Missing => Ok(None),
            Existence::Exists { revision } => {
                if prompt.confirm_replace(&coord.handle_path()).await {
                    Ok(revision)
                } else {
                    debug!(path = %coord, "Replace declined");
                    Err(GitLabError::Cancelled)
                }
            }
        }
    }
}

impl std::fmt::Debug for ConflictAwareWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConflictAwareWriter")
            .field("max_file_size", &self.max_file_size)
            .field("exporter", &self.exporter.is_some())
            .finish_non_exhaustive()
    }
}

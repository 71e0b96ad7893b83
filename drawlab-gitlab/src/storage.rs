//! GitLab file storage facade.
//!
//! [`GitLabStorage`] wires the session, executor, resolver, writer and
//! browser together and exposes the operations an editor needs: open a file
//! by handle path, save it back, create a new one in a folder and check for
//! existing files.

use std::sync::Arc;

use drawlab_core::{
    FileHandle, FileMeta, Identity, RepositoryCoordinate, RevisionToken, split_handle_path,
};
use drawlab_fetch::{
    AuthSession, AuthorizationLauncher, ClientContext, FetchError, RequestExecutor,
};
use tracing::{debug, info, instrument};

use crate::api::{FileResponse, GitLabApi};
use crate::browse::RepositoryBrowser;
use crate::codec;
use crate::error::GitLabError;
use crate::png::PngExporter;
use crate::resolver::{ApiProbe, PathResolver};
use crate::writer::{AlwaysReplace, ConflictAwareWriter, Existence, ReplacePrompt, WriteReceipt};

/// Options for [`GitLabStorage::insert_file`].
#[derive(Debug, Clone, Default)]
pub struct InsertOptions {
    /// Create a shape library; libraries are written immediately.
    pub as_library: bool,
    /// The content is already base64.
    pub base64_encoded: bool,
    /// Commit message for immediate writes.
    pub message: String,
    /// Ref index of the folder path, if known.
    pub known_index: Option<usize>,
}

/// File storage backed by one GitLab instance.
pub struct GitLabStorage {
    executor: RequestExecutor,
    api: GitLabApi,
    resolver: PathResolver<ApiProbe>,
    writer: ConflictAwareWriter,
    browser: RepositoryBrowser,
    replace_prompt: Arc<dyn ReplacePrompt>,
}

impl GitLabStorage {
    /// Creates a signed-out storage using `launcher` for authorization.
    pub fn new(ctx: &ClientContext, launcher: Arc<dyn AuthorizationLauncher>) -> Self {
        Self::with_session(ctx, Arc::new(AuthSession::new(ctx, launcher)))
    }

    /// Creates a storage sharing an existing session.
    pub fn with_session(ctx: &ClientContext, session: Arc<AuthSession>) -> Self {
        let executor = RequestExecutor::new(ctx, session);
        let api = GitLabApi::new(ctx.profile.clone());

        Self {
            resolver: PathResolver::new(ApiProbe::new(executor.clone(), api.clone())),
            writer: ConflictAwareWriter::new(
                executor.clone(),
                api.clone(),
                ctx.settings.max_file_size,
            ),
            browser: RepositoryBrowser::new(executor.clone(), api.clone(), ctx.settings.page_size),
            replace_prompt: Arc::new(AlwaysReplace),
            executor,
            api,
        }
    }

    /// Sets the exporter used when saving PNG handles holding diagram XML.
    pub fn with_exporter(mut self, exporter: Arc<dyn PngExporter>) -> Self {
        self.writer = self.writer.with_exporter(exporter);
        self
    }

    /// Sets the prompt asked before replacing an existing file.
    pub fn with_replace_prompt(mut self, prompt: Arc<dyn ReplacePrompt>) -> Self {
        self.replace_prompt = prompt;
        self
    }

    /// The auth session.
    pub fn session(&self) -> &Arc<AuthSession> {
        self.executor.session()
    }

    /// The request executor.
    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    /// Endpoint builder.
    pub fn api(&self) -> &GitLabApi {
        &self.api
    }

    /// The writer.
    pub fn writer(&self) -> &ConflictAwareWriter {
        &self.writer
    }

    /// Paged listings.
    pub fn browser(&self) -> &RepositoryBrowser {
        &self.browser
    }

    /// The authenticated user.
    ///
    /// # Errors
    ///
    /// Returns any authorization or pipeline error.
    pub async fn identity(&self) -> Result<Identity, GitLabError> {
        Ok(self.executor.identity().await?)
    }

    /// Signs out. No network.
    ///
    /// # Errors
    ///
    /// Returns an error if the remembered token could not be removed.
    pub async fn logout(&self) -> Result<(), GitLabError> {
        Ok(self.session().logout().await?)
    }

    /// Resolves a handle path into a coordinate.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no ref position matches.
    pub async fn resolve(
        &self,
        path: &str,
        want_folder: bool,
        known_index: Option<usize>,
    ) -> Result<RepositoryCoordinate, GitLabError> {
        self.resolver
            .resolve_path(path, want_folder, known_index)
            .await
    }

    /// Opens the file at a handle path.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the path does not resolve, or any pipeline or
    /// codec error.
    #[instrument(skip(self))]
    pub async fn get_file(
        &self,
        path: &str,
        as_library: bool,
        known_index: Option<usize>,
    ) -> Result<FileHandle, GitLabError> {
        let coord = self.resolve(path, false, known_index).await?;
        let file = self.writer.read(&coord).await?;
        self.handle_from_response(&coord, &file, as_library)
    }

    /// Saves a handle. See [`ConflictAwareWriter::save`].
    ///
    /// # Errors
    ///
    /// See [`ConflictAwareWriter::save`].
    pub async fn save_file(
        &self,
        handle: &mut FileHandle,
        overwrite: bool,
        message: &str,
    ) -> Result<WriteReceipt, GitLabError> {
        self.writer.save(handle, overwrite, message).await
    }

    /// Checks whether a file exists at a handle path.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the project part of the path does not resolve.
    pub async fn check_exists(
        &self,
        path: &str,
        known_index: Option<usize>,
    ) -> Result<Existence, GitLabError> {
        let coord = match known_index {
            Some(_) => self.resolve(path, false, known_index).await?,
            // A missing file never resolves as a file; locate its folder.
            None => {
                let mut tokens = split_handle_path(path);
                let name = tokens.pop().ok_or_else(FetchError::file_not_found)?;
                self.resolve(&tokens.join("/"), true, None).await?.child(&name)
            }
        };
        self.writer.check_exists(&coord).await
    }

    /// Creates `name` inside the folder at `folder_path`.
    ///
    /// Existing files are only replaced once the replace prompt agrees.
    /// Plain files are returned unsaved with `is_new` set; libraries are
    /// written right away.
    ///
    /// # Errors
    ///
    /// - [`GitLabError::Cancelled`] if replacing was declined
    /// - `NotFound` if the folder path does not resolve
    /// - any write error for libraries
    #[instrument(skip(self, content, options), fields(library = options.as_library))]
    pub async fn insert_file(
        &self,
        folder_path: &str,
        name: &str,
        content: &str,
        options: InsertOptions,
    ) -> Result<FileHandle, GitLabError> {
        let folder = self
            .resolve(folder_path, true, options.known_index)
            .await?;
        let coord = folder.child(name);
        let revision = self
            .writer
            .confirm_replace(&coord, self.replace_prompt.as_ref())
            .await?;

        if !options.as_library {
            debug!(path = %coord, "Created unsaved file");
            let meta = self.meta(&coord, name, &coord.file_path, revision, true);
            return Ok(FileHandle::new(meta, content));
        }

        let encoded = codec::encode(content, options.base64_encoded);
        let receipt = self
            .writer
            .write(&coord, &options.message, &encoded, revision.as_ref())
            .await?;
        info!(path = %coord, "Library created");

        self.handle_from_response(&coord, &receipt.remote, true)
    }

    /// Builds a decoded handle from a files API response.
    ///
    /// # Errors
    ///
    /// Returns a codec error if the content cannot be decoded.
    pub fn handle_from_response(
        &self,
        coord: &RepositoryCoordinate,
        file: &FileResponse,
        as_library: bool,
    ) -> Result<FileHandle, GitLabError> {
        let content = codec::decode(&file.file_name, file.encoding.as_deref(), &file.content)?;
        let revision = file.last_commit_id.clone().map(RevisionToken::new);
        let meta = self.meta(coord, &file.file_name, &file.file_path, revision, false);

        let handle = FileHandle::new(meta, content);
        Ok(if as_library { handle.into_library() } else { handle })
    }

    fn meta(
        &self,
        coord: &RepositoryCoordinate,
        name: &str,
        path: &str,
        last_revision: Option<RevisionToken>,
        is_new: bool,
    ) -> FileMeta {
        FileMeta {
            org: coord.organization_path(),
            repo: coord.repository.clone(),
            reference: coord.reference.clone(),
            name: name.to_string(),
            path: path.to_string(),
            html_url: self.api.html_url(coord),
            download_url: self.api.download_url(coord),
            last_revision,
            ref_index: coord.ref_index,
            is_new,
        }
    }
}

impl std::fmt::Debug for GitLabStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitLabStorage")
            .field("profile", self.api.profile())
            .field("writer", &self.writer)
            .finish_non_exhaustive()
    }
}

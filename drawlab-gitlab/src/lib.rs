// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Drawlab GitLab
//!
//! GitLab-backed file storage for the Drawlab editor.
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`resolver`] | Finds the ref position in ambiguous handle paths |
//! | [`codec`] / [`png`](crate::png) | Base64, data URIs, diagrams embedded in PNGs |
//! | [`writer`] | Create/update with revision precondition and reconciliation |
//! | [`browse`] | Paged groups, projects, branches and folders |
//! | [`storage`] | Facade tying the above to one session |
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use drawlab_fetch::{ClientContext, GitLabProfile};
//! use drawlab_gitlab::GitLabStorage;
//!
//! let ctx = ClientContext::new(GitLabProfile::default());
//! let storage = GitLabStorage::new(&ctx, launcher);
//!
//! let mut file = storage.get_file("acme/design/diagrams/main/a.drawio", false, None).await?;
//! file.content.push_str("<!-- edited -->");
//! let receipt = storage.save_file(&mut file, false, "Update a.drawio").await?;
//! if receipt.is_diverged() {
//!     // Someone else changed the file in between.
//! }
//! ```

pub mod api;
pub mod browse;
pub mod codec;
pub mod error;
pub mod png;
pub mod resolver;
pub mod storage;
pub mod writer;

pub use api::{Branch, FileResponse, GitLabApi, Group, Project, TreeEntry, TreeEntryKind};
pub use browse::{Page, RepositoryBrowser};
pub use codec::FileKind;
pub use error::{CodecError, GitLabError};
pub use crate::png::{EmbeddingExporter, PngExporter};
pub use resolver::{ApiProbe, PathResolver, ProbeOutcome, RefProbe};
pub use storage::{GitLabStorage, InsertOptions};
pub use writer::{
    AlwaysReplace, ConflictAwareWriter, Existence, ReplacePrompt, WriteOutcome, WriteReceipt,
};

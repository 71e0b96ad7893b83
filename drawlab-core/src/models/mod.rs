//! Domain models for Drawlab.
//!
//! ## Submodules
//!
//! - [`coordinate`] - Handle path tokenization and repository coordinates
//! - [`file`] - File handles, revision tokens and identity

mod coordinate;
mod file;

pub use coordinate::{RepositoryCoordinate, split_handle_path};
pub use file::{FileHandle, FileMeta, Identity, RevisionToken};

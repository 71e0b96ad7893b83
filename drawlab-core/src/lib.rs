// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `Drawlab` Core
//!
//! Core types shared by all `Drawlab` crates:
//!
//! - [`RepositoryCoordinate`] - A handle path split into group, project, ref and path
//! - [`FileHandle`] / [`FileMeta`] - Decoded files as handed to the editor
//! - [`RevisionToken`] - Last known commit id used for optimistic concurrency
//! - [`Identity`] - The authenticated user
//! - [`CoreError`] - Core error type

pub mod error;
pub mod models;

pub use error::CoreError;

pub use models::{
    FileHandle, FileMeta, Identity, RepositoryCoordinate, RevisionToken, split_handle_path,
};

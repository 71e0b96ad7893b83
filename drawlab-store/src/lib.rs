// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Drawlab Store
//!
//! Local state for Drawlab clients.
//!
//! This crate provides:
//!
//! - **Config**: GitLab instance, OAuth application and request settings,
//!   with environment overrides
//! - **RefIndexCache**: remembered ref positions of resolved handle paths
//! - **Persistence**: JSON file helpers
//!
//! ## Usage
//!
//! ```ignore
//! use drawlab_store::{Config, RefIndexCache};
//!
//! let config = Config::load()?;
//! let profile = config.profile()?;
//!
//! let cache = RefIndexCache::load_default().await;
//! let known = cache.get("acme/diagrams/main/a.drawio").await;
//! ```

pub mod config;
pub mod error;
pub mod persistence;
pub mod ref_cache;

pub use config::{Config, GeneralConfig, GitLabConfig};
pub use error::StoreError;
pub use persistence::{
    default_cache_dir, default_config_dir, default_config_path, default_ref_cache_path,
    load_json, load_json_or_default, save_json,
};
pub use ref_cache::{CachedRef, RefIndexCache};

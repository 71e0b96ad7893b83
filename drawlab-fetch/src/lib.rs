// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Drawlab Fetch
//!
//! Authenticated request pipeline and host APIs for Drawlab.
//!
//! ## Host APIs
//!
//! The [`host`] module provides abstractions for system interactions:
//!
//! - [`host::http`] - HTTP transport trait and reqwest client with domain allowlist
//! - [`host::keychain`] - Secure credential storage (system keychain)
//! - [`host::browser`] - Opening the authorize page in the system browser
//!
//! ## Request Pipeline
//!
//! - [`auth::AuthSession`] - Token, identity and the single-flight OAuth flow
//! - [`executor::RequestExecutor`] - Deadline, credentials, 401 re-authorization, status mapping
//! - [`context::ClientContext`] - Host APIs, GitLab profile and settings
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use drawlab_fetch::{AuthSession, ClientContext, GitLabProfile, RequestExecutor};
//!
//! // `launcher` shows the authorize page and feeds the redirect back into
//! // `session.callbacks()`.
//! let ctx = ClientContext::new(GitLabProfile::default());
//! let session = Arc::new(AuthSession::new(&ctx, launcher));
//! let executor = RequestExecutor::new(&ctx, session);
//!
//! let me = executor.identity().await?;
//! ```

pub mod auth;
pub mod context;
pub mod error;
pub mod executor;
pub mod host;

// Errors
pub use error::{FetchError, HttpError, KeychainError, LaunchError, RetryAction};

// Host APIs
pub use host::{
    browser::BrowserOpener,
    http::{ApiRequest, ApiResponse, HttpClient, HttpTransport},
    keychain::{KeychainApi, MemoryKeychain, SystemKeychain},
};

// Pipeline
pub use auth::{
    AuthSession, AuthorizationLauncher, AuthorizationRequest, CallbackRouter, RedirectFragment,
    parse_redirect_fragment,
};
pub use context::{ClientContext, ClientContextBuilder, ClientSettings, GitLabProfile};
pub use executor::{RequestExecutor, classify};

// Re-export for transports and tests
pub use reqwest::{Method, StatusCode};

//! Host APIs for system interactions.
//!
//! - [`http`] - HTTP transport trait and reqwest-backed client
//! - [`keychain`] - Secure credential storage
//! - [`browser`] - Opening the authorization URL in a browser

pub mod browser;
pub mod http;
pub mod keychain;

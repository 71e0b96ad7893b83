//! Opening URLs in the user's browser.
//!
//! The authorization flow needs a browser window pointed at the GitLab
//! authorize endpoint. [`BrowserOpener`] locates the platform opener command
//! and spawns it without waiting for the browser to exit. The opener itself
//! hands the URL off and quits; it is reaped on a background thread.

use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;

use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::LaunchError;

/// Opener commands tried in order.
#[cfg(target_os = "macos")]
const OPENERS: &[&str] = &["open"];

/// Opener commands tried in order.
#[cfg(target_os = "windows")]
const OPENERS: &[&str] = &["explorer"];

/// Opener commands tried in order.
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const OPENERS: &[&str] = &["xdg-open", "gio", "wslview"];

// ============================================================================
// Browser Opener
// ============================================================================

/// Spawns the platform URL opener.
#[derive(Debug, Clone, Default)]
pub struct BrowserOpener {
    command: Option<PathBuf>,
}

impl BrowserOpener {
    /// Creates an opener using the platform command.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an opener that runs `command <url>` instead.
    pub fn with_command(command: impl Into<PathBuf>) -> Self {
        Self {
            command: Some(command.into()),
        }
    }

    /// Finds the first available platform opener command.
    pub fn find_command() -> Option<PathBuf> {
        OPENERS.iter().find_map(|name| which::which(name).ok())
    }

    /// Opens `url` in the default browser.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError::Blocked`] if no opener is installed and
    /// [`LaunchError::Failed`] if it could not be spawned.
    #[instrument(skip(self, url))]
    pub fn open(&self, url: &Url) -> Result<(), LaunchError> {
        let Some(command) = self.command.clone().or_else(Self::find_command) else {
            warn!("No browser opener found");
            return Err(LaunchError::Blocked);
        };

        let mut cmd = Command::new(&command);
        // `gio` needs the `open` verb.
        if command.file_name().is_some_and(|n| n == "gio") {
            cmd.arg("open");
        }

        let child = cmd
            .arg(url.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| LaunchError::Failed(e.to_string()))?;

        debug!(opener = %command.display(), "Browser opened");
        if let Err(e) = reap(child) {
            warn!(error = %e, "Could not watch browser opener");
        }
        Ok(())
    }
}

/// Waits for `child` on a background thread so it does not linger as a
/// zombie. The handle yields its exit status.
fn reap(mut child: Child) -> std::io::Result<JoinHandle<std::io::Result<ExitStatus>>> {
    std::thread::Builder::new()
        .name("browser-opener".to_string())
        .spawn(move || {
            let status = child.wait();
            debug!(status = ?status, "Browser opener exited");
            status
        })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("https://gitlab.example.com/oauth/authorize?state=abc").unwrap()
    }

    #[test]
    fn test_reaps_opener() {
        let child = Command::new("true").spawn().unwrap();
        let status = reap(child).unwrap().join().unwrap().unwrap();
        assert!(status.success());
    }

    #[test]
    fn test_open_with_custom_command() {
        let opener = BrowserOpener::with_command("true");
        assert!(opener.open(&url()).is_ok());
    }

    #[test]
    fn test_missing_command_fails() {
        let opener = BrowserOpener::with_command("/nonexistent/drawlab-opener");
        assert!(matches!(opener.open(&url()), Err(LaunchError::Failed(_))));
    }
}

//! Terminal authorization launcher.
//!
//! Opens the authorize page in the browser, or prints it when no browser is
//! available, then waits for the user to paste the URL the browser was
//! redirected to. The pasted URL carries the token in its fragment.

use std::io::BufRead;

use async_trait::async_trait;
use drawlab_fetch::{
    AuthorizationLauncher, AuthorizationRequest, BrowserOpener, CallbackRouter, LaunchError,
};
use tracing::{debug, warn};

/// Launcher driven from a terminal.
#[derive(Debug, Clone, Default)]
pub struct TerminalLauncher {
    opener: BrowserOpener,
    remember: bool,
}

impl TerminalLauncher {
    /// Creates a launcher; `remember` decides whether tokens are persisted.
    pub fn new(remember: bool) -> Self {
        Self {
            opener: BrowserOpener::new(),
            remember,
        }
    }
}

#[async_trait]
impl AuthorizationLauncher for TerminalLauncher {
    async fn prompt(&self) -> Option<bool> {
        Some(self.remember)
    }

    async fn open(
        &self,
        request: &AuthorizationRequest,
        callbacks: CallbackRouter,
    ) -> Result<(), LaunchError> {
        match self.opener.open(&request.url) {
            Ok(()) => eprintln!("Sign in to GitLab in the browser window that just opened."),
            Err(e) => {
                debug!(error = %e, "Browser unavailable, printing URL");
                eprintln!("Open this URL to sign in to GitLab:\n\n  {}\n", request.url);
            }
        }
        eprintln!("Then paste the address of the page you were redirected to and press Enter:");

        let state = request.state.clone();
        tokio::spawn(async move {
            let line = tokio::task::spawn_blocking(read_line).await.ok().flatten();
            deliver(&callbacks, &state, line.as_deref());
        });

        Ok(())
    }
}

fn read_line() -> Option<String> {
    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim().to_string()),
    }
}

/// Hands a pasted redirect URL to the waiting flow. Anything that does not
/// complete the flow ends it as denied.
fn deliver(callbacks: &CallbackRouter, state: &str, pasted: Option<&str>) {
    if let Some(redirect) = pasted.filter(|s| !s.is_empty()) {
        if callbacks.complete_from_redirect(redirect) {
            return;
        }
        warn!("Pasted URL does not belong to this sign-in");
    }
    callbacks.complete(state, None);
}

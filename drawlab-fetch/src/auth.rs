//! OAuth implicit-flow session.
//!
//! [`AuthSession`] owns the bearer token and the cached [`Identity`]. It runs
//! at most one authorization flow at a time: the flow claims a slot in the
//! [`CallbackRouter`] keyed by a random `state`, the launcher shows the
//! authorize page, and whoever receives the redirect hands the token back via
//! [`CallbackRouter::complete`]. The slot is released when the flow ends,
//! whatever the outcome.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use drawlab_core::Identity;
use ring::rand::{SecureRandom, SystemRandom};
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::context::{ClientContext, GitLabProfile};
use crate::error::{FetchError, LaunchError, RetryAction};
use crate::host::keychain::{KeychainApi, accounts, services};

/// Number of random bytes in an OAuth state.
const STATE_BYTES: usize = 16;

// ============================================================================
// Launcher
// ============================================================================

/// What the launcher needs to show the authorize page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    /// Full authorize URL including the state.
    pub url: Url,
    /// State the callback must carry.
    pub state: String,
}

/// Host side of the authorization flow.
#[async_trait]
pub trait AuthorizationLauncher: Send + Sync {
    /// Asks the user whether to sign in.
    ///
    /// Returns `None` if the user dismissed the dialog, otherwise whether the
    /// token should be remembered.
    async fn prompt(&self) -> Option<bool> {
        Some(false)
    }

    /// Opens the authorize page.
    ///
    /// The token is delivered later through `callbacks`; this call returns
    /// as soon as the page is shown.
    async fn open(
        &self,
        request: &AuthorizationRequest,
        callbacks: CallbackRouter,
    ) -> Result<(), LaunchError>;
}

// ============================================================================
// Callback Router
// ============================================================================

type PendingFlows = HashMap<String, Option<oneshot::Sender<Option<String>>>>;

/// Routes authorization callbacks to the flow that is waiting for them.
#[derive(Debug, Clone, Default)]
pub struct CallbackRouter {
    pending: Arc<Mutex<PendingFlows>>,
}

impl CallbackRouter {
    /// Creates an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true while a flow holds the slot.
    pub fn is_busy(&self) -> bool {
        !self.lock().is_empty()
    }

    /// Delivers the result of the flow identified by `state`.
    ///
    /// `None` means the user denied access or closed the window. Returns
    /// false for unknown states and for flows that already got a result;
    /// the host should close the window that sent such a callback.
    pub fn complete(&self, state: &str, token: Option<String>) -> bool {
        let sender = self.lock().get_mut(state).and_then(Option::take);

        match sender {
            Some(sender) => {
                debug!(granted = token.is_some(), "Authorization callback received");
                // The flow may have been abandoned already.
                sender.send(token).is_ok()
            }
            None => {
                warn!("Rejected callback for unknown or finished authorization flow");
                false
            }
        }
    }

    /// Parses an implicit-flow redirect URL and delivers its result.
    ///
    /// Returns false if the URL carries no state or the state is not pending.
    pub fn complete_from_redirect(&self, redirect: &str) -> bool {
        match parse_redirect_fragment(redirect) {
            Some(fragment) => self.complete(&fragment.state, fragment.access_token),
            None => {
                warn!("Redirect URL carries no authorization state");
                false
            }
        }
    }

    fn begin(&self, state: &str) -> Result<(FlowGuard, oneshot::Receiver<Option<String>>), FetchError> {
        let mut pending = self.lock();
        if !pending.is_empty() {
            return Err(FetchError::AuthBusy);
        }

        let (sender, receiver) = oneshot::channel();
        pending.insert(state.to_string(), Some(sender));

        let guard = FlowGuard {
            router: self.clone(),
            state: state.to_string(),
        };
        Ok((guard, receiver))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PendingFlows> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases the flow slot when dropped.
#[derive(Debug)]
struct FlowGuard {
    router: CallbackRouter,
    state: String,
}

impl Drop for FlowGuard {
    fn drop(&mut self) {
        self.router.lock().remove(&self.state);
    }
}

// ============================================================================
// Redirect Parsing
// ============================================================================

/// Parameters carried in the fragment of an implicit-flow redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectFragment {
    /// Granted token, absent when access was denied.
    pub access_token: Option<String>,
    /// Flow state.
    pub state: String,
    /// OAuth error code, if any.
    pub error: Option<String>,
}

/// Extracts `access_token`, `state` and `error` from a redirect URL fragment.
pub fn parse_redirect_fragment(redirect: &str) -> Option<RedirectFragment> {
    let url = Url::parse(redirect.trim()).ok()?;
    let fragment = url.fragment()?;

    let mut access_token = None;
    let mut state = None;
    let mut error = None;

    for (key, value) in url::form_urlencoded::parse(fragment.as_bytes()) {
        match key.as_ref() {
            "access_token" if !value.is_empty() => access_token = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    Some(RedirectFragment {
        access_token: if error.is_some() { None } else { access_token },
        state: state?,
        error,
    })
}

fn generate_state() -> Result<String, FetchError> {
    let mut bytes = [0u8; STATE_BYTES];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| FetchError::StateGeneration)?;
    Ok(bytes.iter().map(|b| format!("{b:02x}")).collect())
}

// ============================================================================
// Auth Session
// ============================================================================

#[derive(Debug, Default)]
struct Credentials {
    token: Option<String>,
    identity: Option<Identity>,
}

/// Token, identity and the single authorization flow of one client.
pub struct AuthSession {
    profile: GitLabProfile,
    keychain: Arc<dyn KeychainApi>,
    launcher: Arc<dyn AuthorizationLauncher>,
    callbacks: CallbackRouter,
    credentials: Mutex<Credentials>,
}

impl AuthSession {
    /// Creates a signed-out session.
    pub fn new(ctx: &ClientContext, launcher: Arc<dyn AuthorizationLauncher>) -> Self {
        Self {
            profile: ctx.profile.clone(),
            keychain: Arc::clone(&ctx.keychain),
            launcher,
            callbacks: CallbackRouter::new(),
            credentials: Mutex::new(Credentials::default()),
        }
    }

    /// The router that delivers callbacks to this session's flows.
    pub fn callbacks(&self) -> &CallbackRouter {
        &self.callbacks
    }

    /// Returns the current token.
    pub fn token(&self) -> Option<String> {
        self.lock().token.clone()
    }

    /// Returns true if a token is held.
    pub fn is_authenticated(&self) -> bool {
        self.lock().token.is_some()
    }

    /// Replaces the token and clears the cached identity.
    pub fn set_token(&self, token: impl Into<String>) {
        let mut credentials = self.lock();
        credentials.token = Some(token.into());
        credentials.identity = None;
    }

    /// Returns the cached identity.
    pub fn identity(&self) -> Option<Identity> {
        self.lock().identity.clone()
    }

    /// Caches the identity.
    pub fn set_identity(&self, identity: Identity) {
        self.lock().identity = Some(identity);
    }

    /// Loads a remembered token from the keychain.
    ///
    /// Returns true if one was found.
    ///
    /// # Errors
    ///
    /// Returns an error if the keychain could not be read.
    #[instrument(skip(self))]
    pub async fn restore(&self) -> Result<bool, FetchError> {
        match self.keychain.get(services::GITLAB, accounts::OAUTH_TOKEN).await? {
            Some(token) => {
                debug!("Restored remembered token");
                self.set_token(token);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Runs the authorization flow.
    ///
    /// # Errors
    ///
    /// - [`FetchError::AuthBusy`] if another flow is in flight
    /// - [`FetchError::AuthDenied`] if the user dismissed, denied or closed the flow
    /// - [`FetchError::PopupBlocked`] if the authorize page could not be opened
    #[instrument(skip(self))]
    pub async fn authenticate(&self) -> Result<(), FetchError> {
        let state = generate_state()?;
        let (_guard, receiver) = self.callbacks.begin(&state)?;
        let retry = RetryAction::Reauthenticate;

        let Some(remember) = self.launcher.prompt().await else {
            debug!("Authorization prompt dismissed");
            return Err(FetchError::AuthDenied { retry });
        };

        let request = AuthorizationRequest {
            url: self.profile.authorize_url(&state)?,
            state,
        };

        if let Err(e) = self.launcher.open(&request, self.callbacks.clone()).await {
            warn!(error = %e, "Could not open authorization window");
            return Err(FetchError::PopupBlocked { retry });
        }

        let Ok(Some(token)) = receiver.await else {
            debug!("Authorization denied");
            return Err(FetchError::AuthDenied { retry });
        };

        self.set_token(token.clone());
        info!(remember, "Authorized");

        if remember {
            if let Err(e) = self
                .keychain
                .set(services::GITLAB, accounts::OAUTH_TOKEN, &token)
                .await
            {
                warn!(error = %e, "Failed to remember token");
            }
        }

        Ok(())
    }

    /// Forgets the token everywhere and clears the identity. No network.
    ///
    /// # Errors
    ///
    /// Returns an error if the remembered token could not be removed. The
    /// in-memory state is cleared in any case.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), FetchError> {
        {
            let mut credentials = self.lock();
            credentials.token = None;
            credentials.identity = None;
        }

        self.keychain
            .delete(services::GITLAB, accounts::OAUTH_TOKEN)
            .await?;
        info!("Signed out");
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Credentials> {
        self.credentials.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("authenticated", &self.is_authenticated())
            .field("busy", &self.callbacks.is_busy())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_redirect_with_token() {
        let fragment = parse_redirect_fragment(
            "https://draw.example.com/gitlab.html#access_token=tok%2B1&token_type=Bearer&state=ab12",
        )
        .unwrap();
        assert_eq!(fragment.access_token.as_deref(), Some("tok+1"));
        assert_eq!(fragment.state, "ab12");
        assert!(fragment.error.is_none());
    }

    #[test]
    fn test_parse_redirect_denied() {
        let fragment = parse_redirect_fragment(
            "https://draw.example.com/gitlab.html#error=access_denied&state=ab12&access_token=x",
        )
        .unwrap();
        assert!(fragment.access_token.is_none());
        assert_eq!(fragment.error.as_deref(), Some("access_denied"));
    }

    #[test]
    fn test_parse_redirect_without_state() {
        assert!(parse_redirect_fragment("https://x.example.com/#access_token=t").is_none());
        assert!(parse_redirect_fragment("https://x.example.com/").is_none());
        assert!(parse_redirect_fragment("not a url").is_none());
    }

    #[test]
    fn test_generate_state_is_hex() {
        let a = generate_state().unwrap();
        let b = generate_state().unwrap();
        assert_eq!(a.len(), STATE_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_router_single_slot() {
        let router = CallbackRouter::new();
        let (guard, receiver) = router.begin("s1").unwrap();
        assert!(router.is_busy());
        assert!(matches!(router.begin("s2"), Err(FetchError::AuthBusy)));

        assert!(!router.complete("other", Some("t".into())));
        assert!(router.complete("s1", Some("t".into())));
        // Duplicate callback for the same flow.
        assert!(!router.complete("s1", Some("t2".into())));
        assert_eq!(receiver.await.unwrap().as_deref(), Some("t"));

        // Still busy until the flow ends.
        assert!(router.is_busy());
        drop(guard);
        assert!(!router.is_busy());
        assert!(!router.complete("s1", None));
    }
}

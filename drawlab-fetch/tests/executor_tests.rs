//! Integration tests for the auth session and request executor.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use drawlab_core::Identity;
use drawlab_fetch::{
    ApiRequest, ApiResponse, AuthSession, AuthorizationLauncher, AuthorizationRequest,
    CallbackRouter, ClientContext, FetchError, GitLabProfile, HttpError, HttpTransport,
    KeychainApi, LaunchError, MemoryKeychain, RequestExecutor, RetryAction, StatusCode,
};
use tokio::sync::Notify;
use url::Url;

// ============================================================================
// Fakes
// ============================================================================

#[derive(Default)]
struct ScriptedTransport {
    responses: Mutex<VecDeque<ApiResponse>>,
    calls: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    fn new(script: Vec<(u16, &str)>) -> Arc<Self> {
        let responses = script
            .into_iter()
            .map(|(status, body)| ApiResponse::new(StatusCode::from_u16(status).unwrap(), body))
            .collect();
        Arc::new(Self {
            responses: Mutex::new(responses),
            calls: Mutex::default(),
        })
    }

    fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, HttpError> {
        self.calls.lock().unwrap().push(request);
        Ok(self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected request"))
    }
}

struct HangingTransport;

#[async_trait]
impl HttpTransport for HangingTransport {
    async fn send(&self, _request: ApiRequest) -> Result<ApiResponse, HttpError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(ApiResponse::new(StatusCode::OK, "{}"))
    }
}

/// Completes every flow immediately with the next scripted token.
#[derive(Default)]
struct InstantLauncher {
    tokens: Mutex<VecDeque<Option<String>>>,
    opens: AtomicUsize,
    remember: bool,
    dismiss: bool,
    blocked: bool,
}

impl InstantLauncher {
    fn granting(tokens: &[&str]) -> Self {
        Self {
            tokens: Mutex::new(tokens.iter().map(|t| Some((*t).to_string())).collect()),
            ..Self::default()
        }
    }

    fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthorizationLauncher for InstantLauncher {
    async fn prompt(&self) -> Option<bool> {
        if self.dismiss { None } else { Some(self.remember) }
    }

    async fn open(
        &self,
        request: &AuthorizationRequest,
        callbacks: CallbackRouter,
    ) -> Result<(), LaunchError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if self.blocked {
            return Err(LaunchError::Blocked);
        }
        let token = self.tokens.lock().unwrap().pop_front().flatten();
        assert!(callbacks.complete(&request.state, token));
        Ok(())
    }
}

/// Parks the flow until the test completes it.
#[derive(Default)]
struct ParkedLauncher {
    parked: Mutex<Option<(CallbackRouter, String)>>,
    opened: Notify,
    opens: AtomicUsize,
}

#[async_trait]
impl AuthorizationLauncher for ParkedLauncher {
    async fn open(
        &self,
        request: &AuthorizationRequest,
        callbacks: CallbackRouter,
    ) -> Result<(), LaunchError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        *self.parked.lock().unwrap() = Some((callbacks, request.state.clone()));
        self.opened.notify_one();
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

const USER: &str = r#"{"id":42,"username":"ada","name":"Ada"}"#;

fn context(transport: Arc<dyn HttpTransport>, keychain: Arc<dyn KeychainApi>) -> ClientContext {
    let profile = GitLabProfile::new(Url::parse("https://gitlab.example.com").unwrap(), "app");
    ClientContext::builder()
        .profile(profile)
        .http(transport)
        .keychain(keychain)
        .build()
}

fn setup(
    transport: Arc<dyn HttpTransport>,
    launcher: Arc<dyn AuthorizationLauncher>,
) -> (Arc<AuthSession>, RequestExecutor) {
    let ctx = context(transport, Arc::new(MemoryKeychain::new()));
    let session = Arc::new(AuthSession::new(&ctx, launcher));
    let executor = RequestExecutor::new(&ctx, Arc::clone(&session));
    (session, executor)
}

fn ada() -> Identity {
    Identity {
        id: 42,
        username: "ada".to_string(),
    }
}

fn file_request() -> ApiRequest {
    ApiRequest::get(Url::parse("https://gitlab.example.com/api/v4/projects/1/repository/files/a").unwrap())
}

fn bearer(request: &ApiRequest) -> &str {
    request.headers.get("authorization").unwrap().to_str().unwrap()
}

// ============================================================================
// Executor
// ============================================================================

#[tokio::test]
async fn test_authorizes_and_fetches_identity_first() {
    let transport = ScriptedTransport::new(vec![(200, USER), (200, "{}")]);
    let launcher = Arc::new(InstantLauncher::granting(&["tok"]));
    let (session, executor) = setup(transport.clone(), launcher.clone());

    executor.execute(file_request(), false).await.unwrap();

    let calls = transport.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].url.path(), "/api/v4/user");
    for call in &calls {
        assert_eq!(bearer(call), "Bearer tok");
        assert_eq!(call.headers.get("private-token").unwrap(), "tok");
        assert_eq!(call.headers.get("content-type").unwrap(), "application/json");
    }
    assert_eq!(session.identity(), Some(ada()));
    assert_eq!(launcher.opens(), 1);
}

#[tokio::test]
async fn test_single_reauthorization_on_401() {
    let transport = ScriptedTransport::new(vec![(401, ""), (200, USER), (200, "{}")]);
    let launcher = Arc::new(InstantLauncher::granting(&["new"]));
    let (session, executor) = setup(transport.clone(), launcher.clone());
    session.set_token("old");
    session.set_identity(ada());

    executor.execute(file_request(), false).await.unwrap();

    let calls = transport.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(bearer(&calls[0]), "Bearer old");
    assert_eq!(calls[1].url.path(), "/api/v4/user");
    assert_eq!(bearer(&calls[2]), "Bearer new");
    assert_eq!(launcher.opens(), 1);
}

#[tokio::test]
async fn test_second_401_is_access_denied() {
    let transport = ScriptedTransport::new(vec![(401, ""), (200, USER), (401, "")]);
    let launcher = Arc::new(InstantLauncher::granting(&["new", "newer"]));
    let (session, executor) = setup(transport.clone(), launcher.clone());
    session.set_token("old");
    session.set_identity(ada());

    let err = executor.execute(file_request(), false).await.unwrap_err();

    assert!(matches!(err, FetchError::AccessDenied { .. }));
    assert_eq!(err.retry_action(), Some(RetryAction::Reauthenticate));
    assert_eq!(launcher.opens(), 1);
    assert_eq!(transport.calls().len(), 3);
}

#[tokio::test]
async fn test_401_after_fresh_authorization_is_access_denied() {
    let transport = ScriptedTransport::new(vec![(200, USER), (401, "")]);
    let launcher = Arc::new(InstantLauncher::granting(&["tok", "again"]));
    let (_session, executor) = setup(transport, launcher.clone());

    let err = executor.execute(file_request(), false).await.unwrap_err();

    assert!(matches!(err, FetchError::AccessDenied { .. }));
    assert_eq!(launcher.opens(), 1);
}

#[tokio::test]
async fn test_identity_401_reauthorizes() {
    let transport = ScriptedTransport::new(vec![(401, ""), (200, USER), (200, "{}")]);
    let launcher = Arc::new(InstantLauncher::granting(&["new"]));
    let (session, executor) = setup(transport.clone(), launcher.clone());
    session.set_token("stale");

    executor.execute(file_request(), false).await.unwrap();

    let calls = transport.calls();
    assert_eq!(calls[0].url.path(), "/api/v4/user");
    assert_eq!(calls[1].url.path(), "/api/v4/user");
    assert_eq!(bearer(&calls[2]), "Bearer new");
}

#[tokio::test]
async fn test_ignored_not_found() {
    let transport = ScriptedTransport::new(vec![(404, r#"{"message":"404 File Not Found"}"#)]);
    let (session, executor) = setup(transport, Arc::new(InstantLauncher::default()));
    session.set_token("tok");
    session.set_identity(ada());

    let response = executor.execute(file_request(), true).await.unwrap();
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_denied_authorization_propagates_without_requests() {
    let transport = ScriptedTransport::new(vec![]);
    let launcher = Arc::new(InstantLauncher {
        tokens: Mutex::new(VecDeque::from([None])),
        ..InstantLauncher::default()
    });
    let (session, executor) = setup(transport.clone(), launcher);

    let err = executor.execute(file_request(), false).await.unwrap_err();

    assert!(matches!(err, FetchError::AuthDenied { .. }));
    assert!(transport.calls().is_empty());
    assert!(!session.callbacks().is_busy());
}

#[tokio::test(start_paused = true)]
async fn test_deadline_reports_timeout() {
    let (session, executor) = setup(Arc::new(HangingTransport), Arc::new(InstantLauncher::default()));
    session.set_token("tok");
    session.set_identity(ada());

    let err = executor.execute(file_request(), false).await.unwrap_err();

    match err {
        FetchError::Timeout(after) => assert_eq!(after, Duration::from_secs(25)),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_default_transport_waits_for_configured_deadline() {
    // Accepts connections into the backlog but never answers.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let base = Url::parse(&format!("http://{}", listener.local_addr().unwrap())).unwrap();

    let ctx = ClientContext::builder()
        .profile(GitLabProfile::new(base.clone(), "app"))
        .keychain(Arc::new(MemoryKeychain::new()))
        .timeout(Duration::from_secs(40))
        .build();
    let session = Arc::new(AuthSession::new(&ctx, Arc::new(InstantLauncher::default())));
    session.set_token("tok");
    session.set_identity(ada());
    let executor = RequestExecutor::new(&ctx, session);

    let started = tokio::time::Instant::now();
    let err = executor
        .execute(ApiRequest::get(base.join("api/v4/user").unwrap()), false)
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Timeout(after) if after == Duration::from_secs(40)));
    assert!(started.elapsed() >= Duration::from_secs(40));
    drop(listener);
}

// ============================================================================
// Auth Session
// ============================================================================

#[tokio::test]
async fn test_dismissed_prompt_is_auth_denied() {
    let launcher = Arc::new(InstantLauncher {
        dismiss: true,
        ..InstantLauncher::default()
    });
    let (session, _) = setup(ScriptedTransport::new(vec![]), launcher.clone());

    let err = session.authenticate().await.unwrap_err();
    assert!(matches!(err, FetchError::AuthDenied { .. }));
    assert_eq!(launcher.opens(), 0);
    assert!(!session.callbacks().is_busy());
}

#[tokio::test]
async fn test_blocked_window_is_retryable() {
    let launcher = Arc::new(InstantLauncher {
        blocked: true,
        ..InstantLauncher::default()
    });
    let (session, _) = setup(ScriptedTransport::new(vec![]), launcher);

    let err = session.authenticate().await.unwrap_err();
    assert!(matches!(err, FetchError::PopupBlocked { .. }));
    assert_eq!(err.retry_action(), Some(RetryAction::Reauthenticate));
    assert!(!session.callbacks().is_busy());
}

#[tokio::test]
async fn test_second_flow_while_busy() {
    let launcher = Arc::new(ParkedLauncher::default());
    let (session, _) = setup(ScriptedTransport::new(vec![]), launcher.clone());

    let first = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.authenticate().await })
    };
    launcher.opened.notified().await;

    let err = session.authenticate().await.unwrap_err();
    assert!(matches!(err, FetchError::AuthBusy));
    assert_eq!(launcher.opens.load(Ordering::SeqCst), 1);

    let (router, state) = launcher.parked.lock().unwrap().take().unwrap();
    assert!(router.complete(&state, Some("tok".to_string())));
    first.await.unwrap().unwrap();

    assert_eq!(session.token().as_deref(), Some("tok"));
    assert!(!session.callbacks().is_busy());
    // Late callback for the finished flow.
    assert!(!router.complete(&state, Some("late".to_string())));
}

#[tokio::test]
async fn test_remembered_token_restore_and_logout() {
    let keychain: Arc<dyn KeychainApi> = Arc::new(MemoryKeychain::new());
    let ctx = context(ScriptedTransport::new(vec![]), Arc::clone(&keychain));
    let launcher = Arc::new(InstantLauncher {
        remember: true,
        ..InstantLauncher::granting(&["kept"])
    });

    let session = AuthSession::new(&ctx, launcher);
    session.authenticate().await.unwrap();
    assert!(keychain.exists("gitlab", "oauth_token").await);

    let restored = AuthSession::new(&ctx, Arc::new(InstantLauncher::default()));
    assert!(restored.restore().await.unwrap());
    assert_eq!(restored.token().as_deref(), Some("kept"));

    restored.set_identity(ada());
    restored.logout().await.unwrap();
    assert!(restored.token().is_none());
    assert!(restored.identity().is_none());
    assert!(!keychain.exists("gitlab", "oauth_token").await);
}

#[tokio::test]
async fn test_token_not_remembered_by_default() {
    let keychain: Arc<dyn KeychainApi> = Arc::new(MemoryKeychain::new());
    let ctx = context(ScriptedTransport::new(vec![]), Arc::clone(&keychain));
    let session = AuthSession::new(&ctx, Arc::new(InstantLauncher::granting(&["t"])));

    session.authenticate().await.unwrap();
    assert!(session.is_authenticated());
    assert!(!keychain.exists("gitlab", "oauth_token").await);
}

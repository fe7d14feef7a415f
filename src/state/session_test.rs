use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::*;
use crate::net::types::Id;

// =============================================================================
// MockSource
// =============================================================================

type Scripted = (u64, Result<LoginUser, ApiError>);

#[derive(Default)]
struct MockSource {
    fetches: Mutex<VecDeque<Scripted>>,
    fetch_calls: AtomicUsize,
    logout_result: Mutex<Option<Result<bool, ApiError>>>,
}

impl MockSource {
    fn scripted(items: Vec<Scripted>) -> Arc<Self> {
        Arc::new(Self { fetches: Mutex::new(items.into()), ..Self::default() })
    }
}

#[async_trait::async_trait]
impl SessionSource for MockSource {
    async fn fetch_login_user(&self) -> Result<LoginUser, ApiError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let (delay_ms, result) = self.fetches.lock().unwrap().pop_front().expect("unexpected fetch");
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
        result
    }

    async fn login(&self, request: &UserLoginRequest) -> Result<LoginUser, ApiError> {
        if request.user_password == "correct-horse" {
            Ok(user(7, "alice", UserRole::User))
        } else {
            Err(ApiError::from_code(40000, "wrong password".to_owned()))
        }
    }

    async fn logout(&self) -> Result<bool, ApiError> {
        self.logout_result.lock().unwrap().take().unwrap_or(Ok(true))
    }
}

fn user(id: i64, name: &str, role: UserRole) -> LoginUser {
    LoginUser { id: Id(id), user_name: name.to_owned(), user_avatar: None, user_profile: None, user_role: role }
}

fn login_request(password: &str) -> UserLoginRequest {
    UserLoginRequest { user_account: "alice".to_owned(), user_password: password.to_owned() }
}

// =============================================================================
// Session
// =============================================================================

#[test]
fn anonymous_session_has_placeholder_name_and_no_roles() {
    let session = Session::default();
    assert!(!session.is_authenticated());
    assert_eq!(session.display_name(), ANONYMOUS_DISPLAY_NAME);
    assert!(!session.has_role(&UserRole::User));
    assert!(session.user().is_none());
}

#[test]
fn authenticated_session_reports_role() {
    let session = Session::Authenticated(user(1, "root", UserRole::Admin));
    assert!(session.has_role(&UserRole::Admin));
    assert!(!session.has_role(&UserRole::User));
    assert_eq!(session.display_name(), "root");
}

#[test]
fn unnamed_user_falls_back_to_placeholder() {
    let session = Session::Authenticated(user(1, "", UserRole::User));
    assert_eq!(session.display_name(), ANONYMOUS_DISPLAY_NAME);
}

// =============================================================================
// SessionStore
// =============================================================================

#[tokio::test]
async fn new_store_starts_anonymous() {
    let store = SessionStore::new(MockSource::scripted(Vec::new()));
    assert_eq!(store.session(), Session::Anonymous);
}

#[tokio::test]
async fn fetch_session_stores_returned_user() {
    let store = SessionStore::new(MockSource::scripted(vec![(0, Ok(user(5, "bob", UserRole::Admin)))]));
    let fetched = store.fetch_session().await;
    assert_eq!(fetched, Session::Authenticated(user(5, "bob", UserRole::Admin)));
    assert_eq!(store.session(), fetched);
}

#[tokio::test]
async fn not_login_code_degrades_to_anonymous() {
    let store = SessionStore::new(MockSource::scripted(vec![
        (0, Ok(user(5, "bob", UserRole::User))),
        (0, Err(ApiError::from_code(40100, "未登录".to_owned()))),
    ]));
    store.fetch_session().await;
    assert!(store.session().is_authenticated());

    assert_eq!(store.fetch_session().await, Session::Anonymous);
    assert_eq!(store.session(), Session::Anonymous);
}

#[tokio::test]
async fn empty_payload_and_transport_like_failures_degrade() {
    let store = SessionStore::new(MockSource::scripted(vec![
        (0, Err(ApiError::EmptyPayload)),
        (0, Err(ApiError::Http { status: 502, body: "bad gateway".to_owned() })),
    ]));
    assert_eq!(store.fetch_session().await, Session::Anonymous);
    assert_eq!(store.fetch_session().await, Session::Anonymous);
}

#[tokio::test]
async fn fetch_always_hits_backend_even_when_authenticated() {
    let source = MockSource::scripted(vec![
        (0, Ok(user(5, "bob", UserRole::User))),
        (0, Ok(user(5, "bob", UserRole::Admin))),
    ]);
    let store = SessionStore::new(source.clone());
    store.fetch_session().await;
    store.fetch_session().await;

    assert_eq!(source.fetch_calls.load(Ordering::SeqCst), 2);
    assert!(store.session().has_role(&UserRole::Admin));
}

#[tokio::test]
async fn overlapping_fetches_last_settled_wins() {
    let source = MockSource::scripted(vec![
        (60, Ok(user(1, "stale", UserRole::User))),
        (0, Err(ApiError::from_code(40100, "未登录".to_owned()))),
    ]);
    let store = SessionStore::new(source);

    let slow = store.clone();
    let first = tokio::spawn(async move { slow.fetch_session().await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(store.fetch_session().await, Session::Anonymous);
    first.await.unwrap();

    assert_eq!(store.session().display_name(), "stale");
}

#[tokio::test]
async fn set_session_overwrites_and_notifies() {
    let store = SessionStore::new(MockSource::scripted(Vec::new()));
    let mut rx = store.subscribe();

    store.set_session(Session::Authenticated(user(9, "carol", UserRole::User)));
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow().display_name(), "carol");

    store.set_session(Session::Anonymous);
    assert_eq!(store.session(), Session::Anonymous);
}

#[tokio::test]
async fn clones_share_one_session() {
    let store = SessionStore::new(MockSource::scripted(Vec::new()));
    let other = store.clone();
    other.set_session(Session::Authenticated(user(2, "dave", UserRole::User)));
    assert_eq!(store.session().display_name(), "dave");
}

#[tokio::test]
async fn login_success_authenticates() {
    let store = SessionStore::new(MockSource::scripted(Vec::new()));
    let session = store.login(&login_request("correct-horse")).await.unwrap();
    assert_eq!(session.user().map(|u| u.id), Some(Id(7)));
    assert_eq!(store.session(), session);
}

#[tokio::test]
async fn login_failure_leaves_session_untouched() {
    let store = SessionStore::new(MockSource::scripted(Vec::new()));
    let err = store.login(&login_request("nope")).await.unwrap_err();
    assert_eq!(err.code(), Some(40000));
    assert_eq!(store.session(), Session::Anonymous);
}

#[tokio::test]
async fn logout_resets_to_anonymous() {
    let store = SessionStore::new(MockSource::scripted(Vec::new()));
    store.set_session(Session::Authenticated(user(2, "dave", UserRole::User)));
    store.logout().await.unwrap();
    assert_eq!(store.session(), Session::Anonymous);
}

#[tokio::test]
async fn failed_logout_keeps_session() {
    let source = MockSource::scripted(Vec::new());
    *source.logout_result.lock().unwrap() = Some(Err(ApiError::from_code(50000, "system error".to_owned())));
    let store = SessionStore::new(source);
    store.set_session(Session::Authenticated(user(2, "dave", UserRole::User)));

    assert!(store.logout().await.is_err());
    assert!(store.session().is_authenticated());
}

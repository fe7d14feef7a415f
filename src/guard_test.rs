use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::error::ApiError;
use crate::net::types::{Id, LoginUser, UserLoginRequest};
use crate::state::session::SessionSource;

// =============================================================================
// MockSource
// =============================================================================

#[derive(Default)]
struct MockSource {
    users: Mutex<VecDeque<Option<LoginUser>>>,
    calls: AtomicUsize,
}

impl MockSource {
    fn returning(users: Vec<Option<LoginUser>>) -> Arc<Self> {
        Arc::new(Self { users: Mutex::new(users.into()), calls: AtomicUsize::new(0) })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SessionSource for MockSource {
    async fn fetch_login_user(&self) -> Result<LoginUser, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.users.lock().unwrap().pop_front().flatten() {
            Some(user) => Ok(user),
            None => Err(ApiError::from_code(40100, "未登录".to_owned())),
        }
    }

    async fn login(&self, _request: &UserLoginRequest) -> Result<LoginUser, ApiError> {
        Err(ApiError::EmptyPayload)
    }

    async fn logout(&self) -> Result<bool, ApiError> {
        Ok(true)
    }
}

fn user(role: UserRole) -> LoginUser {
    LoginUser { id: Id(7), user_name: "u".to_owned(), user_avatar: None, user_profile: None, user_role: role }
}

fn guard_with(source: &Arc<MockSource>) -> NavigationGuard {
    NavigationGuard::new(SessionStore::new(source.clone()), "/user/login")
}

fn redirect_to_login() -> GuardDecision {
    GuardDecision::Redirect("/user/login".to_owned())
}

// =============================================================================
// RouteRule
// =============================================================================

#[test]
fn admin_rule_matches_by_prefix() {
    let rule = RouteRule::admin("/admin");
    assert!(rule.matches("/admin"));
    assert!(rule.matches("/admin/users"));
    assert!(rule.matches("/administrator"));
    assert!(!rule.matches("/app/admin"));
    assert!(!rule.matches("/"));
}

#[test]
fn admin_rule_permits_only_admins() {
    let rule = RouteRule::admin("/admin");
    assert!(rule.permits(&Session::Authenticated(user(UserRole::Admin))));
    assert!(!rule.permits(&Session::Authenticated(user(UserRole::User))));
    assert!(!rule.permits(&Session::Authenticated(user(UserRole::Other("vip".to_owned())))));
    assert!(!rule.permits(&Session::Anonymous));
}

#[test]
fn rules_are_ordered_most_specific_first() {
    let source = MockSource::returning(Vec::new());
    let guard = guard_with(&source).with_rules(vec![
        RouteRule::admin("/admin"),
        RouteRule::new("/admin/public", UserRole::User),
    ]);
    assert_eq!(guard.rules()[0].prefix, "/admin/public");
    assert_eq!(guard.rule_for("/admin/public/x").map(|r| &r.required_role), Some(&UserRole::User));
    assert_eq!(guard.rule_for("/admin/users").map(|r| &r.required_role), Some(&UserRole::Admin));
    assert!(guard.rule_for("/app/1").is_none());
}

// =============================================================================
// before_each
// =============================================================================

#[tokio::test]
async fn unprotected_paths_always_allowed() {
    for session_user in [None, Some(user(UserRole::User)), Some(user(UserRole::Admin))] {
        let source = MockSource::returning(vec![session_user]);
        let guard = guard_with(&source);
        for path in ["/", "/app/chat/3", "/user/login", "/app/admin"] {
            assert_eq!(guard.before_each(path).await, GuardDecision::Allow, "path {path}");
        }
    }
}

#[tokio::test]
async fn anonymous_admin_visit_fetches_then_redirects() {
    let source = MockSource::returning(vec![None]);
    let guard = guard_with(&source);

    assert_eq!(guard.before_each("/admin/users").await, redirect_to_login());
    assert_eq!(source.calls(), 1);
    assert_eq!(guard.store().session(), Session::Anonymous);
}

#[tokio::test]
async fn first_navigation_fetch_lets_admin_through() {
    let source = MockSource::returning(vec![Some(user(UserRole::Admin))]);
    let guard = guard_with(&source);

    assert_eq!(guard.before_each("/admin/users").await, GuardDecision::Allow);
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn populated_admin_session_skips_fetch() {
    let source = MockSource::returning(Vec::new());
    let guard = guard_with(&source);
    guard.store().set_session(Session::Authenticated(user(UserRole::Admin)));

    assert_eq!(guard.before_each("/admin/users").await, GuardDecision::Allow);
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn regular_user_denied_without_refetch() {
    let source = MockSource::returning(Vec::new());
    let guard = guard_with(&source);
    guard.store().set_session(Session::Authenticated(user(UserRole::User)));

    assert_eq!(guard.before_each("/admin/appManage").await, redirect_to_login());
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn anonymous_session_refetched_on_every_navigation() {
    let source = MockSource::returning(vec![None, None, Some(user(UserRole::User))]);
    let guard = guard_with(&source);

    guard.before_each("/").await;
    guard.before_each("/app/1").await;
    guard.before_each("/app/2").await;
    guard.before_each("/app/3").await;

    // The third fetch authenticated the session, so the fourth skipped it.
    assert_eq!(source.calls(), 3);
    assert!(guard.store().session().is_authenticated());
}

#[tokio::test]
async fn denial_drops_intended_destination() {
    let source = MockSource::returning(vec![None]);
    let guard = guard_with(&source);
    match guard.before_each("/admin/users?tab=2").await {
        GuardDecision::Redirect(to) => assert!(!to.contains("redirect=")),
        GuardDecision::Allow => panic!("anonymous user reached admin screen"),
    }
}

// =============================================================================
// resolve
// =============================================================================

#[tokio::test]
async fn resolve_lands_on_login_for_denied_route() {
    let source = MockSource::returning(vec![None, None]);
    let guard = guard_with(&source);
    assert_eq!(guard.resolve("/admin/userManage").await, "/user/login");
}

#[tokio::test]
async fn resolve_keeps_allowed_route() {
    let source = MockSource::returning(vec![Some(user(UserRole::User))]);
    let guard = guard_with(&source);
    assert_eq!(guard.resolve("/app/chat/9").await, "/app/chat/9");
}

#[tokio::test]
async fn resolve_stops_on_self_redirect() {
    let source = MockSource::returning(Vec::new());
    let guard = NavigationGuard::new(SessionStore::new(source.clone()), "/admin/login");
    assert_eq!(guard.resolve("/admin").await, "/admin/login");
}

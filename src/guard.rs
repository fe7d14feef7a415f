//! Navigation guard run before every in-app route transition.
//!
//! SYSTEM CONTEXT
//! ==============
//! Hosts call [`NavigationGuard::before_each`] with the target path and either
//! commit the transition or follow the returned redirect. The guard is the only
//! place that triggers the lazy first-load session fetch.
//!
//! DESIGN
//! ======
//! Each attempt is a two-state machine: checking the session, then allowed or
//! denied. Denial is a decision, never an error, and always lands on the login
//! screen. Unlike the 40100 interceptor path, no `redirect` parameter is
//! attached here, so the intended destination is dropped.

#[cfg(test)]
#[path = "guard_test.rs"]
mod guard_test;

use crate::net::types::UserRole;
use crate::state::session::{Session, SessionStore};

/// Path prefix reserved for administrator screens.
pub const ADMIN_PREFIX: &str = "/admin";

/// Upper bound on redirects followed by [`NavigationGuard::resolve`].
const MAX_REDIRECT_HOPS: usize = 8;

/// Require `required_role` for every path starting with `prefix`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteRule {
    pub prefix: String,
    pub required_role: UserRole,
}

impl RouteRule {
    #[must_use]
    pub fn new(prefix: impl Into<String>, required_role: UserRole) -> Self {
        Self { prefix: prefix.into(), required_role }
    }

    #[must_use]
    pub fn admin(prefix: impl Into<String>) -> Self {
        Self::new(prefix, UserRole::Admin)
    }

    /// Plain string-prefix match, so `/admin` also covers `/administrator`.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }

    #[must_use]
    pub fn permits(&self, session: &Session) -> bool {
        session.has_role(&self.required_role)
    }
}

/// Outcome of one guard evaluation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// Abort the transition and navigate here instead.
    Redirect(String),
}

#[derive(Clone)]
pub struct NavigationGuard {
    store: SessionStore,
    rules: Vec<RouteRule>,
    login_path: String,
}

impl NavigationGuard {
    /// Guard with the single `/admin` rule.
    #[must_use]
    pub fn new(store: SessionStore, login_path: impl Into<String>) -> Self {
        Self { store, rules: vec![RouteRule::admin(ADMIN_PREFIX)], login_path: login_path.into() }
    }

    /// Replace the rule set. Rules are evaluated most-specific-first, i.e. by
    /// descending prefix length.
    #[must_use]
    pub fn with_rules(mut self, mut rules: Vec<RouteRule>) -> Self {
        rules.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
        self.rules = rules;
        self
    }

    #[must_use]
    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Most specific rule covering `path`, if any.
    #[must_use]
    pub fn rule_for(&self, path: &str) -> Option<&RouteRule> {
        self.rules.iter().find(|rule| rule.matches(path))
    }

    /// Evaluate a transition to `to`.
    ///
    /// Fetches the session first when it has no identity, and evaluates the
    /// rule only after that fetch has settled.
    pub async fn before_each(&self, to: &str) -> GuardDecision {
        if !self.store.session().is_authenticated() {
            self.store.fetch_session().await;
        }
        let session = self.store.session();

        match self.rule_for(to) {
            Some(rule) if !rule.permits(&session) => {
                tracing::info!(
                    path = %to,
                    prefix = %rule.prefix,
                    required = %rule.required_role,
                    "navigation denied; redirecting to login"
                );
                GuardDecision::Redirect(self.login_path.clone())
            }
            _ => GuardDecision::Allow,
        }
    }

    /// Run the guard on `to` and on every redirect target it produces,
    /// returning the path the host finally lands on.
    pub async fn resolve(&self, to: &str) -> String {
        let mut target = to.to_owned();
        for _ in 0..MAX_REDIRECT_HOPS {
            match self.before_each(&target).await {
                GuardDecision::Allow => return target,
                GuardDecision::Redirect(next) if next == target => return target,
                GuardDecision::Redirect(next) => target = next,
            }
        }
        tracing::warn!(path = %to, last = %target, "redirect hop limit reached");
        target
    }
}

impl std::fmt::Debug for NavigationGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationGuard").field("rules", &self.rules).field("login_path", &self.login_path).finish()
    }
}


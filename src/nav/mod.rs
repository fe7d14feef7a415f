//! Navigation and user-notification capabilities.
//!
//! SYSTEM CONTEXT
//! ==============
//! The auth-expiry interceptor and the CLI need to read the current location,
//! perform a full navigation, and show a one-line warning. These are injected
//! as traits so tests and headless hosts can supply their own.


use std::sync::Mutex;

/// Read and change the current in-app location.
pub trait Navigator: Send + Sync {
    /// Full current location, including query string.
    fn current_href(&self) -> String;

    /// Path component of the current location.
    fn current_path(&self) -> String {
        path_of(&self.current_href()).to_owned()
    }

    /// Full-page navigation to `href`.
    fn assign(&self, href: &str);
}

/// Surface a short message to the user.
pub trait Notifier: Send + Sync {
    fn warning(&self, message: &str);
}

/// Build the login location that returns the user to `current_href` afterwards.
#[must_use]
pub fn login_redirect_href(login_path: &str, current_href: &str) -> String {
    format!("{login_path}?redirect={}", urlencoding::encode(current_href))
}

/// Strip scheme, authority, query and fragment from an href.
#[must_use]
pub fn path_of(href: &str) -> &str {
    let rest = match href.find("://") {
        Some(idx) => {
            let after_scheme = &href[idx + 3..];
            match after_scheme.find('/') {
                Some(slash) => &after_scheme[slash..],
                None => "/",
            }
        }
        None => href,
    };
    let end = rest.find(['?', '#']).unwrap_or(rest.len());
    &rest[..end]
}

// =============================================================================
// HEADLESS IMPLEMENTATIONS
// =============================================================================

/// In-memory navigator for hosts without a browser location.
///
/// Every `assign` moves the location and is recorded so callers can report it.
#[derive(Debug, Default)]
pub struct HeadlessNavigator {
    inner: Mutex<HeadlessLocation>,
}

#[derive(Debug, Default)]
struct HeadlessLocation {
    href: String,
    history: Vec<String>,
}

impl HeadlessNavigator {
    #[must_use]
    pub fn new(initial_href: &str) -> Self {
        Self { inner: Mutex::new(HeadlessLocation { href: initial_href.to_owned(), history: Vec::new() }) }
    }

    /// Move to `href` without recording it as a forced redirect.
    pub fn visit(&self, href: &str) {
        let mut inner = self.lock();
        inner.href = href.to_owned();
    }

    /// Every href passed to [`Navigator::assign`], oldest first.
    #[must_use]
    pub fn redirects(&self) -> Vec<String> {
        self.lock().history.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HeadlessLocation> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Navigator for HeadlessNavigator {
    fn current_href(&self) -> String {
        self.lock().href.clone()
    }

    fn assign(&self, href: &str) {
        let mut inner = self.lock();
        inner.href = href.to_owned();
        inner.history.push(href.to_owned());
    }
}

/// Notifier that emits warnings through `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn warning(&self, message: &str) {
        tracing::warn!(%message, "user notification");
    }
}

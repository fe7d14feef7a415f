//! Current-user session state.
//!
//! SYSTEM CONTEXT
//! ==============
//! Read by the navigation guard and any UI that renders identity; written only
//! by [`SessionStore::fetch_session`] and the explicit override paths
//! (`set_session`, `login`, `logout`).
//!
//! TRADE-OFFS
//! ==========
//! Overlapping fetches are not ordered: whichever settles last wins. A slow,
//! stale fetch can therefore overwrite a newer one. Each write replaces the
//! whole value, so readers never observe a partial merge.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::ApiError;
use crate::net::types::{LoginUser, UserLoginRequest, UserRole};

pub const ANONYMOUS_DISPLAY_NAME: &str = "Not logged in";

/// Who is using the client right now.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Session {
    #[default]
    Anonymous,
    Authenticated(LoginUser),
}

impl Session {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    #[must_use]
    pub fn user(&self) -> Option<&LoginUser> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::Anonymous => None,
        }
    }

    /// True only for an authenticated user carrying `role`.
    #[must_use]
    pub fn has_role(&self, role: &UserRole) -> bool {
        self.user().is_some_and(|user| &user.user_role == role)
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        match self {
            Self::Authenticated(user) if !user.user_name.is_empty() => &user.user_name,
            Self::Authenticated(_) | Self::Anonymous => ANONYMOUS_DISPLAY_NAME,
        }
    }
}

/// Backend operations the session store depends on. Enables mocking in tests.
#[async_trait::async_trait]
pub trait SessionSource: Send + Sync {
    /// Current user from the session check endpoint.
    async fn fetch_login_user(&self) -> Result<LoginUser, ApiError>;

    async fn login(&self, request: &UserLoginRequest) -> Result<LoginUser, ApiError>;

    async fn logout(&self) -> Result<bool, ApiError>;
}

/// Process-wide holder of the current [`Session`].
///
/// Cloning shares the same underlying value.
#[derive(Clone)]
pub struct SessionStore {
    source: Arc<dyn SessionSource>,
    current: Arc<watch::Sender<Session>>,
}

impl SessionStore {
    #[must_use]
    pub fn new(source: Arc<dyn SessionSource>) -> Self {
        let (current, _) = watch::channel(Session::Anonymous);
        Self { source, current: Arc::new(current) }
    }

    /// Snapshot of the current session.
    #[must_use]
    pub fn session(&self) -> Session {
        self.current.borrow().clone()
    }

    /// Receiver notified on every session change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.current.subscribe()
    }

    /// Unconditionally replace the session.
    pub fn set_session(&self, session: Session) {
        self.current.send_replace(session);
    }

    /// Reconcile the session with the backend.
    ///
    /// Always hits the network, even when a user is already present. Any
    /// failure (non-zero code, empty payload, transport error) degrades to
    /// [`Session::Anonymous`]; no retries.
    pub async fn fetch_session(&self) -> Session {
        let next = match self.source.fetch_login_user().await {
            Ok(user) => {
                tracing::debug!(user_id = %user.id, role = %user.user_role, "login user refreshed");
                Session::Authenticated(user)
            }
            Err(e) => {
                tracing::warn!(error = %e, code = e.error_code(), "login user unavailable; session reset");
                Session::Anonymous
            }
        };
        self.set_session(next.clone());
        next
    }

    /// Log in and store the returned user.
    ///
    /// # Errors
    ///
    /// Returns the backend rejection; the session is left unchanged.
    pub async fn login(&self, request: &UserLoginRequest) -> Result<Session, ApiError> {
        let user = self.source.login(request).await?;
        tracing::info!(user_id = %user.id, "logged in");
        let session = Session::Authenticated(user);
        self.set_session(session.clone());
        Ok(session)
    }

    /// Log out on the backend, then reset to anonymous.
    ///
    /// # Errors
    ///
    /// Returns the backend rejection; the session is left unchanged.
    pub async fn logout(&self) -> Result<(), ApiError> {
        self.source.logout().await?;
        tracing::info!("logged out");
        self.set_session(Session::Anonymous);
        Ok(())
    }
}

//! Request/response interceptors run by [`ApiClient`](super::http::ApiClient).
//!
//! ARCHITECTURE
//! ============
//! Every call is described by a [`PendingRequest`] that lives until its
//! response (or error) is handed back. Interceptors see the request before it
//! is sent, and either the decoded envelope or the failure afterwards, in
//! installation order. They cannot swallow errors: the client always returns
//! the failure to its caller after the hooks have run.

#[cfg(test)]
#[path = "interceptor_test.rs"]
mod interceptor_test;

use std::sync::Arc;

use reqwest::Method;
use reqwest::header::HeaderMap;

use crate::error::ApiError;
use crate::nav::{Navigator, Notifier, login_redirect_href};
use crate::net::api::user::GET_LOGIN_USER_PATH;
use crate::net::envelope::{BaseResponse, NOT_LOGIN_CODE};

/// How the response body should be interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseKind {
    /// `{ code, data, message }` JSON envelope.
    Envelope,
    /// Opaque bytes passed through unchanged.
    Binary,
    /// `text/event-stream` body consumed incrementally.
    EventStream,
}

/// One outstanding HTTP call.
#[derive(Clone, Debug)]
pub struct PendingRequest {
    pub method: Method,
    /// Endpoint path relative to the API base, e.g. `/user/get/login`.
    pub path: String,
    /// Base URL joined with `path`.
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
    pub response_kind: ResponseKind,
}

/// What an interceptor sees once a response arrived.
#[derive(Debug)]
pub struct InterceptedResponse<'a> {
    pub request: &'a PendingRequest,
    pub status: u16,
    /// Decoded envelope; `None` for binary and streaming bodies.
    pub envelope: Option<&'a BaseResponse<serde_json::Value>>,
}

/// Hook invoked around every call made through the client.
pub trait Interceptor: Send + Sync {
    /// Inspect or amend a request before it is sent.
    fn on_request(&self, _request: &mut PendingRequest) {}

    /// Inspect a response that reached the client.
    fn on_response(&self, _response: &InterceptedResponse<'_>) {}

    /// Observe a failed call. The error is still returned to the caller.
    fn on_error(&self, _request: &PendingRequest, _error: &ApiError) {}
}

// =============================================================================
// DIAGNOSTIC LOGGING
// =============================================================================

/// Logs every request and response. Installed only when diagnostics are on.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingInterceptor;

impl Interceptor for LoggingInterceptor {
    fn on_request(&self, request: &mut PendingRequest) {
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            query = ?request.query,
            payload = ?request.body,
            "api request"
        );
    }

    fn on_response(&self, response: &InterceptedResponse<'_>) {
        match response.envelope {
            Some(envelope) => tracing::debug!(
                url = %response.request.url,
                status = response.status,
                code = envelope.code,
                message = %envelope.message,
                data = ?envelope.data,
                "api response"
            ),
            None => tracing::debug!(
                url = %response.request.url,
                status = response.status,
                kind = ?response.request.response_kind,
                "api response"
            ),
        }
    }
}

// =============================================================================
// SESSION EXPIRY
// =============================================================================

pub const LOGIN_REQUIRED_MESSAGE: &str = "Please log in first";

/// Turns a 40100 envelope into one warning plus a full redirect to login.
///
/// The "current user" endpoint is exempt, as is any response that arrives
/// while the user is already on the login screen; either would loop.
pub struct AuthExpiryInterceptor {
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    login_path: String,
}

impl AuthExpiryInterceptor {
    #[must_use]
    pub fn new(navigator: Arc<dyn Navigator>, notifier: Arc<dyn Notifier>, login_path: impl Into<String>) -> Self {
        Self { navigator, notifier, login_path: login_path.into() }
    }

    fn is_session_check(request: &PendingRequest) -> bool {
        request.path.trim_start_matches('/') == GET_LOGIN_USER_PATH.trim_start_matches('/')
    }
}

impl Interceptor for AuthExpiryInterceptor {
    fn on_response(&self, response: &InterceptedResponse<'_>) {
        let Some(envelope) = response.envelope else {
            return;
        };
        if envelope.code != NOT_LOGIN_CODE || Self::is_session_check(response.request) {
            return;
        }
        if self.navigator.current_path().contains(self.login_path.as_str()) {
            return;
        }

        let current = self.navigator.current_href();
        let target = login_redirect_href(&self.login_path, &current);
        tracing::info!(path = %response.request.path, redirect = %target, "session expired; redirecting to login");
        self.notifier.warning(LOGIN_REQUIRED_MESSAGE);
        self.navigator.assign(&target);
    }
}

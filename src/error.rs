//! Error taxonomy for backend calls.
//!
//! DESIGN
//! ======
//! Transport failures and application-level result codes are separate
//! variants so call sites can tell "the backend said no" from "the backend
//! never answered". Session expiry gets its own variant because the response
//! interceptors handle it centrally before the caller ever sees it.

use crate::net::envelope::NOT_LOGIN_CODE;

/// Errors produced by the HTTP wrapper and endpoint bindings.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No response: connection failure, timeout, or body read failure.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status with no decodable envelope.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The envelope carried a non-zero result code.
    #[error("application error {code}: {message}")]
    Application { code: i32, message: String },

    /// The envelope carried the reserved "not logged in" code.
    #[error("not logged in: {message}")]
    AuthExpired { message: String },

    /// The envelope reported success but `data` was empty.
    #[error("response carried no data")]
    EmptyPayload,

    /// The request body could not be serialized.
    #[error("request encode failed: {0}")]
    Encode(String),

    /// The response body did not match the expected shape.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// The base URL or request path could not be turned into a URL.
    #[error("invalid request url: {0}")]
    InvalidUrl(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),
}

impl ApiError {
    /// Classify an envelope result code into the matching error variant.
    #[must_use]
    pub fn from_code(code: i32, message: String) -> Self {
        if code == NOT_LOGIN_CODE {
            Self::AuthExpired { message }
        } else {
            Self::Application { code, message }
        }
    }

    /// Backend result code, when the error came from an envelope.
    #[must_use]
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Application { code, .. } => Some(*code),
            Self::AuthExpired { .. } => Some(NOT_LOGIN_CODE),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthExpired { .. })
    }

    /// True when no usable response reached the client.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Http { .. })
    }

    /// Stable machine-readable code for logs.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "E_TRANSPORT",
            Self::Http { .. } => "E_HTTP",
            Self::Application { .. } => "E_APPLICATION",
            Self::AuthExpired { .. } => "E_AUTH_EXPIRED",
            Self::EmptyPayload => "E_EMPTY_PAYLOAD",
            Self::Encode(_) => "E_ENCODE",
            Self::Decode(_) => "E_DECODE",
            Self::InvalidUrl(_) => "E_INVALID_URL",
            Self::ClientBuild(_) => "E_CLIENT_BUILD",
        }
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

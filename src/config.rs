//! Client configuration parsed from environment variables.

use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8123/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_LOGIN_PATH: &str = "/user/login";
pub const DEFAULT_LOG_FILTER: &str = "info";
pub const DIAGNOSTIC_LOG_FILTER: &str = "zerocode_client=debug,info";

/// Errors produced while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable was present but its value could not be parsed.
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Timeouts {
    #[must_use]
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    #[must_use]
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend API root; every binding path is appended to it.
    pub base_url: String,
    pub timeouts: Timeouts,
    /// In-app path of the login screen.
    pub login_path: String,
    /// Log every outgoing request and incoming response.
    pub diagnostics: bool,
    /// `tracing-subscriber` env-filter directive.
    pub log_filter: String,
    /// `Cookie` header value (`A=1; B=2`) seeded into the cookie store pair by pair.
    pub session_cookie: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_owned(),
            timeouts: Timeouts::default(),
            login_path: DEFAULT_LOGIN_PATH.to_owned(),
            diagnostics: false,
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            session_cookie: None,
        }
    }
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `ZEROCODE_API_BASE_URL`: default `http://localhost:8123/api`
    /// - `ZEROCODE_REQUEST_TIMEOUT_SECS`: default 60
    /// - `ZEROCODE_CONNECT_TIMEOUT_SECS`: default 10
    /// - `ZEROCODE_LOGIN_PATH`: default `/user/login`
    /// - `ZEROCODE_DIAGNOSTICS`: `true`/`false`, default `false`
    /// - `ZEROCODE_LOG`: env-filter directive, default depends on diagnostics
    /// - `ZEROCODE_SESSION_COOKIE`: `Cookie` header value (`A=1; B=2`) to start with
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric or boolean variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    /// Build config from an arbitrary key lookup (the environment, a map in tests).
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric or boolean value cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("ZEROCODE_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();
        let timeouts = Timeouts {
            request_secs: parse_u64(
                "ZEROCODE_REQUEST_TIMEOUT_SECS",
                lookup("ZEROCODE_REQUEST_TIMEOUT_SECS"),
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?,
            connect_secs: parse_u64(
                "ZEROCODE_CONNECT_TIMEOUT_SECS",
                lookup("ZEROCODE_CONNECT_TIMEOUT_SECS"),
                DEFAULT_CONNECT_TIMEOUT_SECS,
            )?,
        };
        let login_path = lookup("ZEROCODE_LOGIN_PATH").unwrap_or_else(|| DEFAULT_LOGIN_PATH.to_owned());
        let diagnostics = parse_bool("ZEROCODE_DIAGNOSTICS", lookup("ZEROCODE_DIAGNOSTICS"))?.unwrap_or(false);
        let log_filter = lookup("ZEROCODE_LOG").unwrap_or_else(|| default_log_filter(diagnostics).to_owned());
        let session_cookie = lookup("ZEROCODE_SESSION_COOKIE").filter(|cookie| !cookie.trim().is_empty());

        Ok(Self { base_url, timeouts, login_path, diagnostics, log_filter, session_cookie })
    }

    /// Resolve an endpoint path against the base URL.
    #[must_use]
    pub fn endpoint_url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }
}

/// Read one environment variable. A value that is not valid unicode is
/// logged and treated as unset.
fn env_lookup(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(value) => Some(value),
        Err(std::env::VarError::NotPresent) => None,
        Err(e @ std::env::VarError::NotUnicode(_)) => {
            tracing::warn!(key, error = %e, "ignoring non-unicode environment variable");
            None
        }
    }
}

pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if path.is_empty() {
        return base.to_owned();
    }
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

fn default_log_filter(diagnostics: bool) -> &'static str {
    if diagnostics { DIAGNOSTIC_LOG_FILTER } else { DEFAULT_LOG_FILTER }
}

fn parse_u64(key: &'static str, raw: Option<String>, default: u64) -> Result<u64, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidValue { key, value }),
    }
}

fn parse_bool(key: &'static str, raw: Option<String>) -> Result<Option<bool>, ConfigError> {
    let Some(value) = raw else {
        return Ok(None);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" | "" => Ok(Some(false)),
        _ => Err(ConfigError::InvalidValue { key, value }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

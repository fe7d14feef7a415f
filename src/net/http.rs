//! Intercepted HTTP client for the backend REST API.
//!
//! ARCHITECTURE
//! ============
//! `ApiClient` owns one `reqwest::Client` with a shared cookie jar, so the
//! session cookie set by `/user/login` rides along on every later call,
//! including the chat event stream. Each call gets a fixed wall-clock timeout
//! except event streams, which stay open until the backend closes them.
//!
//! ERROR HANDLING
//! ==============
//! Transport failures are logged with method, URL and status, handed to the
//! interceptors' `on_error`, then returned unchanged. A non-2xx response whose
//! body still decodes as an envelope is treated as a normal envelope so the
//! 40100 policy applies to it.

#[cfg(test)]
#[path = "http_test.rs"]
mod http_test;

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use reqwest::Method;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{ACCEPT, CONTENT_DISPOSITION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::envelope::BaseResponse;
use super::interceptor::{
    AuthExpiryInterceptor, InterceptedResponse, Interceptor, LoggingInterceptor, PendingRequest, ResponseKind,
};
use super::sse::ChatStream;
use super::types::DownloadedFile;
use crate::config::{ClientConfig, join_url};
use crate::error::ApiError;
use crate::nav::{Navigator, Notifier};

/// HTTP wrapper bound to one backend base URL.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    base: reqwest::Url,
    request_timeout: Duration,
    cookies: Arc<Jar>,
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl ApiClient {
    /// Build a client from config. Installs request/response logging when
    /// `config.diagnostics` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client fails to build.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let base = reqwest::Url::parse(&config.base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {e}", config.base_url)))?;

        let cookies = Arc::new(Jar::default());
        if let Some(header) = &config.session_cookie {
            for pair in cookie_pairs(header) {
                cookies.add_cookie_str(pair, &base);
            }
        }

        let http = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&cookies))
            .connect_timeout(config.timeouts.connect())
            .build()
            .map_err(|e| ApiError::ClientBuild(e.to_string()))?;

        let client = Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            base,
            request_timeout: config.timeouts.request(),
            cookies,
            interceptors: Vec::new(),
        };

        if config.diagnostics {
            Ok(client.with_interceptor(Arc::new(LoggingInterceptor)))
        } else {
            Ok(client)
        }
    }

    /// Append an interceptor; hooks run in installation order.
    #[must_use]
    pub fn with_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Install the 40100 policy: warn once and redirect to `login_path`.
    #[must_use]
    pub fn with_session_expiry(
        self,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
        login_path: impl Into<String>,
    ) -> Self {
        self.with_interceptor(Arc::new(AuthExpiryInterceptor::new(navigator, notifier, login_path)))
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Cookies the jar would send to the API base, as a `Cookie` header value.
    #[must_use]
    pub fn session_cookie(&self) -> Option<String> {
        let value = self.cookies.cookies(&self.base)?;
        match value.to_str() {
            Ok("") => None,
            Ok(text) => Some(text.to_owned()),
            Err(e) => {
                tracing::warn!(error = %e, "stored cookies are not valid header text");
                None
            }
        }
    }

    /// Describe a call to `path` without sending it.
    #[must_use]
    pub fn pending(&self, method: Method, path: &str, response_kind: ResponseKind) -> PendingRequest {
        PendingRequest {
            method,
            path: path.to_owned(),
            url: join_url(&self.base_url, path),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            response_kind,
        }
    }

    // =========================================================================
    // ENVELOPE CALLS
    // =========================================================================

    /// `GET path?query` returning the raw envelope.
    ///
    /// # Errors
    ///
    /// Returns transport, HTTP and decode failures.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(String, String)>,
    ) -> Result<BaseResponse<T>, ApiError> {
        let mut request = self.pending(Method::GET, path, ResponseKind::Envelope);
        request.query = query;
        self.send(request).await
    }

    /// `GET path?query` returning the unwrapped payload.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::call`].
    pub async fn get_data<T: DeserializeOwned>(&self, path: &str, query: Vec<(String, String)>) -> Result<T, ApiError> {
        let mut request = self.pending(Method::GET, path, ResponseKind::Envelope);
        request.query = query;
        self.call(request).await
    }

    /// `POST path` with a JSON body, returning the raw envelope.
    ///
    /// # Errors
    ///
    /// Returns encode, transport, HTTP and decode failures.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<BaseResponse<T>, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.json_post(path, body)?;
        self.send(request).await
    }

    /// `POST path` with a JSON body, returning the unwrapped payload.
    ///
    /// # Errors
    ///
    /// Returns encode failures, otherwise see [`ApiClient::call`].
    pub async fn post_data<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.json_post(path, body)?;
        self.call(request).await
    }

    /// `POST path` without a body, returning the unwrapped payload.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::call`].
    pub async fn post_empty_data<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let request = self.pending(Method::POST, path, ResponseKind::Envelope);
        self.call(request).await
    }

    fn json_post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<PendingRequest, ApiError> {
        let mut request = self.pending(Method::POST, path, ResponseKind::Envelope);
        request.body = Some(serde_json::to_value(body).map_err(|e| ApiError::Encode(e.to_string()))?);
        request.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(request)
    }

    /// Send a prepared request and decode its envelope.
    ///
    /// The envelope is returned even when its code is non-zero; use
    /// [`ApiClient::call`] to turn result codes into errors.
    ///
    /// # Errors
    ///
    /// Returns transport, HTTP and decode failures.
    pub async fn send<T: DeserializeOwned>(&self, request: PendingRequest) -> Result<BaseResponse<T>, ApiError> {
        let (request, response) = self.dispatch(request).await?;
        let status = response.status().as_u16();
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return Err(self.fail(&request, Some(status), ApiError::Transport(e))),
        };

        let envelope = match serde_json::from_slice::<BaseResponse<serde_json::Value>>(&bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                let error = if (200..300).contains(&status) {
                    ApiError::Decode(e.to_string())
                } else {
                    ApiError::Http { status, body: String::from_utf8_lossy(&bytes).into_owned() }
                };
                return Err(self.fail(&request, Some(status), error));
            }
        };

        self.observe(&request, status, Some(&envelope));
        envelope.typed().map_err(|e| self.fail(&request, Some(status), e))
    }

    /// Send a prepared request and unwrap its payload.
    ///
    /// # Errors
    ///
    /// Returns transport failures plus `Application`/`AuthExpired` for
    /// non-zero result codes and `EmptyPayload` when `data` is missing.
    pub async fn call<T: DeserializeOwned>(&self, request: PendingRequest) -> Result<T, ApiError> {
        let method = request.method.clone();
        let path = request.path.clone();
        let result = self.send::<T>(request).await?.into_result();
        if let Err(error @ (ApiError::Application { .. } | ApiError::AuthExpired { .. })) = &result {
            tracing::warn!(%method, %path, code = ?error.code(), error = %error, "api call rejected");
        }
        result
    }

    // =========================================================================
    // BINARY AND STREAMING CALLS
    // =========================================================================

    /// `GET path?query` returning the body bytes untouched.
    ///
    /// A JSON envelope body with a non-zero code is reported as an error
    /// instead of being handed back as file content.
    ///
    /// # Errors
    ///
    /// Returns transport and HTTP failures, or the envelope's result-code error.
    pub async fn download(&self, path: &str, query: Vec<(String, String)>) -> Result<DownloadedFile, ApiError> {
        let mut request = self.pending(Method::GET, path, ResponseKind::Binary);
        request.query = query;

        let (request, response) = self.dispatch(request).await?;
        let status = response.status().as_u16();
        let content_type = header_text(response.headers(), CONTENT_TYPE.as_str());
        let file_name = header_text(response.headers(), CONTENT_DISPOSITION.as_str())
            .as_deref()
            .and_then(content_disposition_file_name);
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return Err(self.fail(&request, Some(status), ApiError::Transport(e))),
        };

        let is_json = content_type.as_deref().is_some_and(|ct| ct.starts_with("application/json"));
        let observed = if is_json || !(200..300).contains(&status) {
            self.reject_envelope_body(&request, status, &bytes)?
        } else {
            false
        };

        if !observed {
            self.observe(&request, status, None);
        }
        Ok(DownloadedFile { bytes: bytes.to_vec(), file_name, content_type })
    }

    /// Open a `text/event-stream` on `path?query`.
    ///
    /// The stream is not retried if it drops; callers open a new one per turn.
    ///
    /// # Errors
    ///
    /// Returns transport and HTTP failures, or a result-code error when the
    /// backend answers with an envelope instead of a stream.
    pub async fn event_stream(&self, path: &str, query: Vec<(String, String)>) -> Result<ChatStream, ApiError> {
        let mut request = self.pending(Method::GET, path, ResponseKind::EventStream);
        request.query = query;
        request.headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));

        let (request, response) = self.dispatch(request).await?;
        let status = response.status().as_u16();
        let content_type = header_text(response.headers(), CONTENT_TYPE.as_str());
        let is_json = content_type.as_deref().is_some_and(|ct| ct.starts_with("application/json"));

        if is_json || !(200..300).contains(&status) {
            let bytes = match response.bytes().await {
                Ok(bytes) => bytes,
                Err(e) => return Err(self.fail(&request, Some(status), ApiError::Transport(e))),
            };
            self.reject_envelope_body(&request, status, &bytes)?;
            return Err(self.fail(&request, Some(status), ApiError::Decode("expected text/event-stream".to_owned())));
        }

        self.observe(&request, status, None);
        let chunks = response.bytes_stream().map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(ApiError::from));
        Ok(ChatStream::new(chunks))
    }

    // =========================================================================
    // PIPELINE
    // =========================================================================

    async fn dispatch(&self, mut request: PendingRequest) -> Result<(PendingRequest, reqwest::Response), ApiError> {
        for interceptor in &self.interceptors {
            interceptor.on_request(&mut request);
        }

        let mut builder = self
            .http
            .request(request.method.clone(), &request.url)
            .headers(request.headers.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if request.response_kind != ResponseKind::EventStream {
            builder = builder.timeout(self.request_timeout);
        }

        match builder.send().await {
            Ok(response) => Ok((request, response)),
            Err(e) => {
                let status = e.status().map(|s| s.as_u16());
                Err(self.fail(&request, status, ApiError::Transport(e)))
            }
        }
    }

    /// Decode a body that may be an error envelope. Success envelopes pass.
    ///
    /// Returns whether the body was an envelope, in which case the
    /// interceptors have already seen the response.
    fn reject_envelope_body(&self, request: &PendingRequest, status: u16, bytes: &[u8]) -> Result<bool, ApiError> {
        match serde_json::from_slice::<BaseResponse<serde_json::Value>>(bytes) {
            Ok(envelope) => {
                self.observe(request, status, Some(&envelope));
                if envelope.is_success() && (200..300).contains(&status) {
                    Ok(true)
                } else if envelope.is_success() {
                    Err(self.fail(request, Some(status), ApiError::Http { status, body: envelope.message }))
                } else {
                    tracing::warn!(path = %request.path, code = envelope.code, message = %envelope.message, "api call rejected");
                    Err(ApiError::from_code(envelope.code, envelope.message))
                }
            }
            Err(e) if (200..300).contains(&status) => {
                tracing::debug!(path = %request.path, error = %e, "JSON body is not an envelope; passing through");
                Ok(false)
            }
            Err(_) => Err(self.fail(
                request,
                Some(status),
                ApiError::Http { status, body: String::from_utf8_lossy(bytes).into_owned() },
            )),
        }
    }

    fn observe(&self, request: &PendingRequest, status: u16, envelope: Option<&BaseResponse<serde_json::Value>>) {
        let response = InterceptedResponse { request, status, envelope };
        for interceptor in &self.interceptors {
            interceptor.on_response(&response);
        }
    }

    fn fail(&self, request: &PendingRequest, status: Option<u16>, error: ApiError) -> ApiError {
        tracing::error!(
            method = %request.method,
            url = %request.url,
            status = ?status,
            code = error.error_code(),
            error = %error,
            "api request failed"
        );
        for interceptor in &self.interceptors {
            interceptor.on_error(request, &error);
        }
        error
    }
}

fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    let value = headers.get(name)?;
    match value.to_str() {
        Ok(text) => Some(text.to_owned()),
        Err(e) => {
            tracing::debug!(header = name, error = %e, "header value is not visible ascii; ignored");
            None
        }
    }
}

/// Split a `Cookie` header value (`A=1; B=2`) into its `name=value` pairs.
pub(crate) fn cookie_pairs(header: &str) -> impl Iterator<Item = &str> {
    header.split(';').map(str::trim).filter(|pair| pair.contains('='))
}

/// Extract the file name from a `Content-Disposition` header value.
///
/// `filename*=UTF-8''...` wins over a plain `filename=`.
pub(crate) fn content_disposition_file_name(value: &str) -> Option<String> {
    let mut plain = None;
    for part in value.split(';').map(str::trim) {
        if let Some(encoded) = part.strip_prefix("filename*=") {
            let encoded = encoded.split_once("''").map_or(encoded, |(_, rest)| rest);
            if let Ok(decoded) = urlencoding::decode(encoded.trim_matches('"')) {
                return Some(decoded.into_owned());
            }
        } else if let Some(raw) = part.strip_prefix("filename=") {
            let name = raw.trim_matches('"');
            if !name.is_empty() {
                plain = Some(name.to_owned());
            }
        }
    }
    plain
}

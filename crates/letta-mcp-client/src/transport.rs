// crates/letta-mcp-client/src/transport.rs
// ============================================================================
// Module: Backend Transport
// Description: Transport seam and the pooled reqwest implementation.
// Purpose: Isolate HTTP I/O so dispatch can run against an in-memory backend.
// Dependencies: async-trait, reqwest, url
// ============================================================================

//! ## Overview
//! [`BackendTransport`] sends one [`BackendRequest`] and returns the raw
//! status and body. It does not retry, classify, or decode; that is the job
//! of [`crate::BackendClient`]. [`ReqwestTransport`] keeps a pooled
//! connection set with separate connect and request timeouts and attaches
//! the bearer credential to every call.
//!
//! Security posture: response bodies are untrusted and read under a hard
//! byte limit; the credential is never logged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use letta_mcp_config::BackendConfig;
use reqwest::Client;
use reqwest::Method;
use reqwest::header::ACCEPT;
use reqwest::header::AUTHORIZATION;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use reqwest::multipart::Form;
use reqwest::multipart::Part;
use reqwest::redirect::Policy;
use thiserror::Error;
use url::Url;

use crate::request::BackendRequest;
use crate::request::HttpMethod;
use crate::request::RequestBody;
use crate::request::ResponseFormat;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum backend response body size.
pub const MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Raw backend response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw body bytes.
    pub body: Vec<u8>,
}

impl BackendResponse {
    /// Builds a response from a status and a JSON value.
    #[must_use]
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self {
            status,
            body: body.to_string().into_bytes(),
        }
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Transport-level failures, before any response status is known.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The deadline passed before a response arrived.
    #[error("request timed out")]
    Timeout,
    /// The connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),
    /// Response body exceeded [`MAX_RESPONSE_BYTES`].
    #[error("response exceeds size limit ({actual} > {limit})")]
    ResponseTooLarge {
        /// Observed size in bytes.
        actual: usize,
        /// Maximum size in bytes.
        limit: usize,
    },
    /// Any other transport failure.
    #[error("transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// Returns true for failures worth retrying on a retry-safe call.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Connect(_))
    }
}

/// Sends backend requests.
#[async_trait]
pub trait BackendTransport: Send + Sync {
    /// Sends one request and returns the raw response.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when no response was received.
    async fn send(&self, request: &BackendRequest) -> Result<BackendResponse, TransportError>;
}

// ============================================================================
// SECTION: Reqwest Transport
// ============================================================================

/// Connection pool settings for [`ReqwestTransport`].
#[derive(Clone)]
pub struct TransportSettings {
    /// Base URL including the API version prefix.
    pub base_url: String,
    /// Optional bearer credential.
    pub bearer_token: Option<String>,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Connection establishment timeout.
    pub connect_timeout: Duration,
    /// Warm connections kept per host.
    pub pool_max_idle_per_host: usize,
    /// Idle connection lifetime.
    pub pool_idle_timeout: Duration,
    /// Outbound user agent.
    pub user_agent: String,
}

impl fmt::Debug for TransportSettings {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TransportSettings")
            .field("base_url", &self.base_url)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .field("request_timeout", &self.request_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("pool_max_idle_per_host", &self.pool_max_idle_per_host)
            .field("pool_idle_timeout", &self.pool_idle_timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl From<&BackendConfig> for TransportSettings {
    fn from(config: &BackendConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            bearer_token: config.password.clone(),
            request_timeout: config.request_timeout(),
            connect_timeout: config.connect_timeout(),
            pool_max_idle_per_host: config.pool_max_idle_per_host,
            pool_idle_timeout: config.pool_idle_timeout(),
            user_agent: config.user_agent.clone(),
        }
    }
}

/// Pooled HTTP transport backed by `reqwest`.
///
/// # Invariants
/// - `base_url` has no trailing slash and is an absolute http(s) URL.
pub struct ReqwestTransport {
    /// Pooled client.
    client: Client,
    /// Parsed base URL.
    base_url: Url,
}

impl ReqwestTransport {
    /// Builds a pooled transport.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Other`] when the base URL, credential, or
    /// client builder is invalid.
    pub fn new(settings: &TransportSettings) -> Result<Self, TransportError> {
        let base_url = Url::parse(settings.base_url.trim_end_matches('/'))
            .map_err(|err| TransportError::Other(format!("invalid base url: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(TransportError::Other("base url cannot carry a path".to_string()));
        }
        let mut headers = HeaderMap::new();
        if let Some(token) = &settings.bearer_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| TransportError::Other("invalid bearer token header".to_string()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        let client = Client::builder()
            .default_headers(headers)
            .user_agent(settings.user_agent.clone())
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .pool_max_idle_per_host(settings.pool_max_idle_per_host)
            .pool_idle_timeout(settings.pool_idle_timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|err| TransportError::Other(err.to_string()))?;
        Ok(Self {
            client,
            base_url,
        })
    }

    /// Resolves a request's path segments and query against the base URL.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Other`] when the base URL cannot carry path
    /// segments or a segment is `.` or `..`.
    pub fn resolve_url(&self, request: &BackendRequest) -> Result<Url, TransportError> {
        if let Some(segment) = request.segments.iter().find(|segment| is_dot_segment(segment)) {
            return Err(TransportError::Other(format!(
                "path segment `{segment}` would escape {}",
                request.path()
            )));
        }
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| TransportError::Other("base url cannot carry a path".to_string()))?;
            segments.pop_if_empty();
            segments.extend(request.segments.iter().map(String::as_str));
        }
        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl BackendTransport for ReqwestTransport {
    async fn send(&self, request: &BackendRequest) -> Result<BackendResponse, TransportError> {
        let url = self.resolve_url(request)?;
        let mut builder = self.client.request(reqwest_method(request.method), url);
        builder = match request.format {
            ResponseFormat::Json => builder.header(ACCEPT, "application/json"),
            ResponseFormat::EventStream => builder.header(ACCEPT, "text/event-stream"),
        };
        builder = match &request.body {
            RequestBody::None => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart {
                file_name,
                content_type,
                bytes,
            } => {
                let part = Part::bytes(bytes.clone())
                    .file_name(file_name.clone())
                    .mime_str(content_type)
                    .map_err(|err| TransportError::Other(format!("invalid content type: {err}")))?;
                builder.multipart(Form::new().part("file", part))
            }
        };
        let response = builder.send().await.map_err(classify_error)?;
        let status = response.status().as_u16();
        let body = read_body_with_limit(response, MAX_RESPONSE_BYTES).await?;
        Ok(BackendResponse {
            status,
            body,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Maps a method to its reqwest counterpart.
fn reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

/// Returns true for segments that URL resolution collapses.
fn is_dot_segment(segment: &str) -> bool {
    matches!(segment, "." | "..")
}

/// Classifies a reqwest error.
fn classify_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}

/// Reads a response body while enforcing a hard byte limit.
async fn read_body_with_limit(
    mut response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, TransportError> {
    let mut body = Vec::new();
    let mut total: usize = 0;
    while let Some(chunk) = response.chunk().await.map_err(classify_error)? {
        let next_total = total.checked_add(chunk.len()).ok_or(TransportError::ResponseTooLarge {
            actual: usize::MAX,
            limit,
        })?;
        if next_total > limit {
            return Err(TransportError::ResponseTooLarge {
                actual: next_total,
                limit,
            });
        }
        body.extend_from_slice(&chunk);
        total = next_total;
    }
    Ok(body)
}

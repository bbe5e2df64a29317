// crates/letta-mcp-client/src/request.rs
// ============================================================================
// Module: Backend Requests
// Description: Transport-neutral description of one Letta REST call.
// Purpose: Let handlers describe calls without depending on an HTTP stack.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! A [`BackendRequest`] names a method, path segments relative to the
//! configured base URL, query pairs, a body, the expected response format,
//! and whether the call is safe to retry. Path segments are kept unescaped
//! here; transports are responsible for percent-encoding.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde_json::Value;

// ============================================================================
// SECTION: Types
// ============================================================================

/// HTTP method of a backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// GET.
    Get,
    /// POST.
    Post,
    /// PUT.
    Put,
    /// PATCH.
    Patch,
    /// DELETE.
    Delete,
}

impl HttpMethod {
    /// Returns the method token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Returns true for methods that are retry-safe without an explicit mark.
    #[must_use]
    pub const fn is_idempotent_read_or_replace(self) -> bool {
        matches!(self, Self::Get | Self::Put)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Retry eligibility of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryClass {
    /// Retry only when the method is GET or PUT.
    #[default]
    ByMethod,
    /// Always eligible for retry on transient failures.
    Retryable,
}

/// Expected response body format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    /// A single JSON document.
    #[default]
    Json,
    /// A server-sent event stream whose `data:` lines are JSON documents.
    EventStream,
}

/// Request body variants.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum RequestBody {
    /// No body.
    #[default]
    None,
    /// JSON body.
    Json(Value),
    /// Single-file multipart upload under the `file` field.
    Multipart {
        /// File name reported to the backend.
        file_name: String,
        /// MIME type of the file.
        content_type: String,
        /// Raw file bytes.
        bytes: Vec<u8>,
    },
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => formatter.write_str("None"),
            Self::Json(_) => formatter.write_str("Json(<payload>)"),
            Self::Multipart {
                file_name,
                content_type,
                bytes,
            } => formatter
                .debug_struct("Multipart")
                .field("file_name", file_name)
                .field("content_type", content_type)
                .field("len", &bytes.len())
                .finish(),
        }
    }
}

/// One Letta REST call relative to the configured base URL.
///
/// # Invariants
/// - `segments` are raw path segments; none contain `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Raw path segments below the base URL.
    pub segments: Vec<String>,
    /// Query pairs in insertion order.
    pub query: Vec<(String, String)>,
    /// Request body.
    pub body: RequestBody,
    /// Expected response format.
    pub format: ResponseFormat,
    /// Retry eligibility.
    pub retry: RetryClass,
}

impl BackendRequest {
    /// Builds a request with no body.
    #[must_use]
    pub fn new<I, S>(method: HttpMethod, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            body: RequestBody::None,
            format: ResponseFormat::Json,
            retry: RetryClass::ByMethod,
        }
    }

    /// Builds a GET request.
    #[must_use]
    pub fn get<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(HttpMethod::Get, segments)
    }

    /// Builds a POST request.
    #[must_use]
    pub fn post<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(HttpMethod::Post, segments)
    }

    /// Builds a PUT request.
    #[must_use]
    pub fn put<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(HttpMethod::Put, segments)
    }

    /// Builds a PATCH request.
    #[must_use]
    pub fn patch<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(HttpMethod::Patch, segments)
    }

    /// Builds a DELETE request.
    #[must_use]
    pub fn delete<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(HttpMethod::Delete, segments)
    }

    /// Attaches a JSON body.
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    /// Attaches a single-file multipart body.
    #[must_use]
    pub fn multipart(mut self, file_name: String, content_type: String, bytes: Vec<u8>) -> Self {
        self.body = RequestBody::Multipart {
            file_name,
            content_type,
            bytes,
        };
        self
    }

    /// Appends a query pair.
    #[must_use]
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Appends a query pair when a value is present.
    #[must_use]
    pub fn query_opt(self, key: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    /// Expects a server-sent event stream in response.
    #[must_use]
    pub const fn event_stream(mut self) -> Self {
        self.format = ResponseFormat::EventStream;
        self
    }

    /// Marks the call as retry-safe regardless of method.
    #[must_use]
    pub const fn retryable(mut self) -> Self {
        self.retry = RetryClass::Retryable;
        self
    }

    /// Returns true when transient failures may be retried.
    #[must_use]
    pub const fn is_retry_safe(&self) -> bool {
        match self.retry {
            RetryClass::ByMethod => self.method.is_idempotent_read_or_replace(),
            RetryClass::Retryable => true,
        }
    }

    /// Returns the slash-joined path for logs.
    #[must_use]
    pub fn path(&self) -> String {
        let mut path = String::new();
        for segment in &self.segments {
            path.push('/');
            path.push_str(segment);
        }
        if path.is_empty() {
            path.push('/');
        }
        path
    }

    /// Returns the value of the first query pair named `key`.
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query.iter().find(|(name, _)| name == key).map(|(_, value)| value.as_str())
    }

    /// Returns the JSON body when present.
    #[must_use]
    pub const fn json_body(&self) -> Option<&Value> {
        match &self.body {
            RequestBody::Json(value) => Some(value),
            RequestBody::None | RequestBody::Multipart { .. } => None,
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

// crates/letta-mcp/src/errors.rs
// ============================================================================
// Module: Error Normalizer
// Description: Tool failures and their normalized, client-facing form.
// Purpose: Map every failure source onto one fixed set of error kinds.
// Dependencies: letta-mcp-client, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Handlers and the dispatcher fail with [`ToolError`]. Before anything
//! reaches a client it passes through [`normalize`], which picks an
//! [`ErrorKind`], prefixes the operation's action label to the message, and
//! collects structured context (remote status and body, field paths).
//!
//! ## Invariants
//! - Every [`ToolError`] maps to exactly one [`ErrorKind`].
//! - Remote 404 is always [`ErrorKind::NotFound`], never an internal error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use letta_mcp_client::BackendFailure;
use letta_mcp_client::FailureKind;
use letta_mcp_client::ShapeError;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

// ============================================================================
// SECTION: Error Kinds
// ============================================================================

/// Normalized error classes exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or invalid arguments.
    InvalidParams,
    /// Tool arguments that are not a JSON object.
    InvalidRequest,
    /// Unknown tool or unknown operation value.
    UnknownOperation,
    /// Remote 401/403.
    Unauthorized,
    /// Remote 404 or a locally missing entity.
    NotFound,
    /// No response within the deadline.
    Timeout,
    /// Remote 429.
    RateLimited,
    /// Everything else.
    InternalError,
}

impl ErrorKind {
    /// Returns a stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidParams => "invalid_params",
            Self::InvalidRequest => "invalid_request",
            Self::UnknownOperation => "unknown_operation",
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::Timeout => "timeout",
            Self::RateLimited => "rate_limited",
            Self::InternalError => "internal_error",
        }
    }

    /// Returns the stable JSON-RPC error code.
    #[must_use]
    pub const fn jsonrpc_code(self) -> i64 {
        match self {
            Self::InvalidParams => -32602,
            Self::InvalidRequest => -32600,
            Self::UnknownOperation => -32601,
            Self::Unauthorized => -32003,
            Self::NotFound => -32004,
            Self::Timeout => -32008,
            Self::RateLimited => -32029,
            Self::InternalError => -32603,
        }
    }
}

/// Classifies a remote HTTP status.
#[must_use]
pub const fn classify_status(status: u16) -> ErrorKind {
    match status {
        404 => ErrorKind::NotFound,
        401 | 403 => ErrorKind::Unauthorized,
        422 => ErrorKind::InvalidParams,
        429 => ErrorKind::RateLimited,
        _ => ErrorKind::InternalError,
    }
}

// ============================================================================
// SECTION: Tool Errors
// ============================================================================

/// One schema violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// JSON pointer to the offending value; `/` for the document root.
    pub path: String,
    /// What was expected versus what was found.
    pub message: String,
}

/// Failures raised while dispatching or handling a tool call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    /// A required field is absent.
    #[error("missing required field: {0}")]
    MissingField(String),
    /// Arguments are present but unusable.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    /// Arguments violate the input schema.
    #[error("invalid arguments: {}", render_violations(.0))]
    InvalidArguments(Vec<Violation>),
    /// The request envelope is malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// No tool or alias has this name.
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    /// The tool has no such operation.
    #[error("unknown operation: {0}")]
    UnknownOperation(String),
    /// An entity was not found without a remote 404.
    #[error("not found: {0}")]
    NotFound(String),
    /// The backend call failed.
    #[error("{}", .0.message)]
    Backend(BackendFailure),
    /// A backend list had an unexpected shape.
    #[error(transparent)]
    Shape(#[from] ShapeError),
    /// A handler result violates the output schema.
    #[error("response violates output schema: {}", render_violations(.0))]
    OutputContract(Vec<Violation>),
    /// Internal invariant failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<BackendFailure> for ToolError {
    fn from(failure: BackendFailure) -> Self {
        Self::Backend(failure)
    }
}

/// Renders violations as `path: message` pairs.
fn render_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|violation| format!("{}: {}", violation.path, violation.message))
        .collect::<Vec<_>>()
        .join("; ")
}

// ============================================================================
// SECTION: Normalized Errors
// ============================================================================

/// Client-facing error.
///
/// # Invariants
/// - `message` starts with the action label of the failing operation.
/// - `context` is a JSON object.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{message}")]
pub struct NormalizedError {
    /// Error class.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
    /// Structured context.
    pub context: Value,
}

impl NormalizedError {
    /// Returns the stable JSON-RPC error code.
    #[must_use]
    pub const fn code(&self) -> i64 {
        self.kind.jsonrpc_code()
    }

    /// Returns the JSON-RPC `error.data` payload.
    #[must_use]
    pub fn data(&self) -> Value {
        json!({ "kind": self.kind.as_str(), "context": self.context })
    }
}

/// Where a failure happened.
#[derive(Debug, Clone, Copy)]
pub struct ErrorContext<'a> {
    /// Action label, such as `"adding MCP server"`.
    pub action: &'a str,
    /// Tool name as invoked.
    pub tool: &'a str,
    /// Operation value when known.
    pub operation: Option<&'a str>,
}

/// Normalizes a tool failure.
#[must_use]
pub fn normalize(error: ToolError, context: &ErrorContext<'_>) -> NormalizedError {
    let mut details = Map::new();
    details.insert("action".to_string(), Value::String(context.action.to_string()));
    details.insert("tool".to_string(), Value::String(context.tool.to_string()));
    if let Some(operation) = context.operation {
        details.insert("operation".to_string(), Value::String(operation.to_string()));
    }
    let detail = error.to_string();
    let (kind, detail) = match error {
        ToolError::MissingField(field) => {
            details.insert("field".to_string(), Value::String(field));
            (ErrorKind::InvalidParams, detail)
        }
        ToolError::InvalidParams(_) => (ErrorKind::InvalidParams, detail),
        ToolError::InvalidArguments(violations) => {
            details.insert("violations".to_string(), json!(violations));
            (ErrorKind::InvalidParams, detail)
        }
        ToolError::InvalidRequest(_) => (ErrorKind::InvalidRequest, detail),
        ToolError::UnknownTool(_) | ToolError::UnknownOperation(_) => {
            (ErrorKind::UnknownOperation, detail)
        }
        ToolError::NotFound(_) => (ErrorKind::NotFound, detail),
        ToolError::Backend(failure) => backend_details(&failure, &mut details),
        ToolError::OutputContract(violations) => {
            details.insert("violations".to_string(), json!(violations));
            (ErrorKind::InternalError, detail)
        }
        ToolError::Shape(_) | ToolError::Internal(_) => (ErrorKind::InternalError, detail),
    };
    NormalizedError {
        kind,
        message: format!("{}: {detail}", context.action),
        context: Value::Object(details),
    }
}

/// Classifies a backend failure and records its status and body.
fn backend_details(
    failure: &BackendFailure,
    details: &mut Map<String, Value>,
) -> (ErrorKind, String) {
    let kind = match failure.kind {
        FailureKind::Status(status) => classify_status(status),
        FailureKind::Timeout => ErrorKind::Timeout,
        FailureKind::Transport | FailureKind::MalformedBody => ErrorKind::InternalError,
    };
    if let Some(status) = failure.status_code() {
        details.insert("status".to_string(), json!(status));
    }
    let mut message = failure.message.clone();
    if let Some(body) = &failure.body {
        message.push_str(": ");
        message.push_str(body);
        let parsed =
            serde_json::from_str::<Value>(body).unwrap_or_else(|_| Value::String(body.clone()));
        details.insert("body".to_string(), parsed);
    }
    (kind, message)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

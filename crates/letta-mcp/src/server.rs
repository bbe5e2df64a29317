// crates/letta-mcp/src/server.rs
// ============================================================================
// Module: MCP Server
// Description: MCP server over stdio and HTTP transports.
// Purpose: Expose the consolidated Letta tools via JSON-RPC 2.0.
// Dependencies: axum, rand, tokio, letta-mcp-config
// ============================================================================

//! ## Overview
//! The server speaks JSON-RPC 2.0 and always routes tool calls through
//! [`crate::router::ToolRouter`]. Over stdio it accepts both `Content-Length`
//! framed messages and newline-delimited JSON, replying in the framing of each
//! request. Requests are handled concurrently; replies go through one writer
//! task so frames never interleave. Over HTTP it serves `POST /mcp` (alias
//! `/rpc`) and assigns an `Mcp-Session-Id` on `initialize`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::post;
use letta_mcp_config::LettaMcpConfig;
use letta_mcp_config::ServerTransport;
use letta_mcp_contract::ToolDefinition;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::sync::mpsc;

use crate::audit::McpAuditEvent;
use crate::audit::McpAuditSink;
use crate::audit::audit_sink_from_config;
use crate::errors::NormalizedError;
use crate::router::ToolRouter;
use crate::telemetry::McpMethod;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Protocol revision announced when the client does not request one.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2025-06-18";

/// HTTP header carrying the session identifier.
pub const SESSION_HEADER: &str = "mcp-session-id";

/// JSON-RPC code for malformed envelopes.
const INVALID_REQUEST: i64 = -32600;

/// JSON-RPC code for unsupported methods.
const METHOD_NOT_FOUND: i64 = -32601;

/// JSON-RPC code for malformed method parameters.
const INVALID_PARAMS: i64 = -32602;

/// JSON-RPC code for server-side faults.
const INTERNAL_ERROR: i64 = -32603;

/// Pending replies buffered for the stdio writer.
const STDIO_REPLY_BUFFER: usize = 64;

// ============================================================================
// SECTION: MCP Server
// ============================================================================

/// MCP server instance.
pub struct McpServer {
    /// Server configuration.
    config: LettaMcpConfig,
    /// Request handling shared by both transports.
    service: RpcService,
}

impl McpServer {
    /// Builds a new MCP server from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when configuration is invalid or the router
    /// or audit sink cannot be built.
    pub fn from_config(mut config: LettaMcpConfig) -> Result<Self, McpServerError> {
        config.validate().map_err(|err| McpServerError::Config(err.to_string()))?;
        let router =
            ToolRouter::from_config(&config).map_err(|err| McpServerError::Init(err.to_string()))?;
        let audit = audit_sink_from_config(&config.server.audit)
            .map_err(|err| McpServerError::Init(format!("audit sink: {err}")))?;
        let service = RpcService::new(
            router,
            audit,
            config.server.transport,
            config.server.max_body_bytes,
        );
        Ok(Self {
            config,
            service,
        })
    }

    /// Serves requests using the configured transport.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when the transport fails.
    pub async fn serve(self) -> Result<(), McpServerError> {
        match self.config.server.transport {
            ServerTransport::Stdio => {
                tracing::info!("serving MCP over stdio");
                serve_stdio(self.service, tokio::io::stdin(), tokio::io::stdout()).await
            }
            ServerTransport::Http => serve_http(&self.config, self.service).await,
        }
    }
}

// ============================================================================
// SECTION: Request Service
// ============================================================================

/// Transport-independent JSON-RPC handling.
#[derive(Clone)]
pub struct RpcService {
    /// Tool router for request dispatch.
    router: ToolRouter,
    /// Request audit sink.
    audit: Arc<dyn McpAuditSink>,
    /// Transport label for audit events.
    transport: ServerTransport,
    /// Maximum allowed request body size.
    max_body_bytes: usize,
}

/// Serialized reply to one JSON-RPC message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcReply {
    /// HTTP status for the HTTP transport.
    pub status: StatusCode,
    /// Method classification of the request.
    pub method: McpMethod,
    /// Response body; `None` for notifications.
    pub payload: Option<Vec<u8>>,
}

/// Per-request facts collected for the audit line.
#[derive(Default)]
struct CallFacts {
    /// Tool name as invoked.
    tool: Option<String>,
    /// Operation value.
    operation: Option<String>,
    /// Whether the name is a deprecated alias.
    legacy_alias: bool,
}

/// One request's audit inputs, gathered while it is handled.
struct Exchange<'a> {
    /// When handling began.
    started: Instant,
    /// Request body size in bytes.
    request_bytes: usize,
    /// HTTP session identifier, when present.
    session_id: Option<&'a str>,
    /// Method classification.
    method: McpMethod,
    /// Tool call facts.
    facts: CallFacts,
}

impl RpcService {
    /// Creates a service over a router and audit sink.
    #[must_use]
    pub fn new(
        router: ToolRouter,
        audit: Arc<dyn McpAuditSink>,
        transport: ServerTransport,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            router,
            audit,
            transport,
            max_body_bytes,
        }
    }

    /// Handles one raw JSON-RPC message and records its audit event.
    pub async fn handle_bytes(&self, bytes: &[u8], session_id: Option<&str>) -> RpcReply {
        let started = Instant::now();
        if bytes.len() > self.max_body_bytes {
            return self.reject_oversize(bytes.len(), session_id);
        }
        let mut facts = CallFacts::default();
        let (status, method, response) = match serde_json::from_slice::<JsonRpcRequest>(bytes) {
            Ok(request) => {
                let method = McpMethod::classify(&request.method);
                let (status, response) = self.handle_request(request, &mut facts).await;
                (status, method, response)
            }
            Err(_) => {
                let error = JsonRpcError::new(INVALID_REQUEST, "invalid json-rpc request");
                (StatusCode::BAD_REQUEST, McpMethod::Invalid, Some(error.response(Value::Null)))
            }
        };
        let exchange = Exchange {
            started,
            request_bytes: bytes.len(),
            session_id,
            method,
            facts,
        };
        self.finish(exchange, status, response)
    }

    /// Replies to a message that exceeded the body limit without parsing it.
    #[must_use]
    pub fn reject_oversize(&self, request_bytes: usize, session_id: Option<&str>) -> RpcReply {
        let error = JsonRpcError::new(INVALID_REQUEST, "request body too large");
        let exchange = Exchange {
            started: Instant::now(),
            request_bytes,
            session_id,
            method: McpMethod::Invalid,
            facts: CallFacts::default(),
        };
        self.finish(exchange, StatusCode::PAYLOAD_TOO_LARGE, Some(error.response(Value::Null)))
    }

    /// Serializes the response and records the audit event.
    fn finish(
        &self,
        exchange: Exchange<'_>,
        status: StatusCode,
        response: Option<JsonRpcResponse>,
    ) -> RpcReply {
        let mut event = McpAuditEvent::new(self.transport, exchange.method);
        if let Some(error) = response.as_ref().and_then(|response| response.error.as_ref()) {
            event = event.failed(error.code, error.kind());
        }
        event.request_id = response
            .as_ref()
            .filter(|response| !response.id.is_null())
            .map(|response| response.id.to_string());
        event.session_id = exchange.session_id.map(str::to_string);
        event.tool = exchange.facts.tool;
        event.operation = exchange.facts.operation;
        event.legacy_alias = exchange.facts.legacy_alias;
        event.request_bytes = exchange.request_bytes;
        event.latency_ms =
            u64::try_from(exchange.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let payload = response.map(|response| encode_response(&response));
        event.response_bytes = payload.as_ref().map_or(0, Vec::len);
        self.audit.record(&event);
        RpcReply {
            status,
            method: exchange.method,
            payload,
        }
    }

    /// Dispatches a parsed request by method.
    async fn handle_request(
        &self,
        request: JsonRpcRequest,
        facts: &mut CallFacts,
    ) -> (StatusCode, Option<JsonRpcResponse>) {
        let Some(id) = request.id else {
            // Notifications never get a reply, including unknown ones.
            return (StatusCode::ACCEPTED, None);
        };
        if request.jsonrpc != "2.0" {
            let error = JsonRpcError::new(INVALID_REQUEST, "invalid json-rpc version");
            return (StatusCode::BAD_REQUEST, Some(error.response(id)));
        }
        let method = McpMethod::classify(&request.method);
        tracing::debug!(method = method.as_str(), "handling json-rpc request");
        let result = match method {
            McpMethod::Initialize => Ok(initialize_result(request.params.as_ref())),
            McpMethod::Ping | McpMethod::Initialized => Ok(json!({})),
            McpMethod::ToolsList => to_value(&ToolListResult {
                tools: self.router.list_tools(),
            }),
            McpMethod::ToolsCall => self.call_tool(request.params, facts).await,
            McpMethod::Invalid | McpMethod::Other => {
                Err(JsonRpcError::new(METHOD_NOT_FOUND, "method not found"))
            }
        };
        let response = match result {
            Ok(result) => JsonRpcResponse {
                jsonrpc: "2.0",
                id,
                result: Some(result),
                error: None,
            },
            Err(error) => error.response(id),
        };
        (StatusCode::OK, Some(response))
    }

    /// Runs `tools/call` through the router.
    async fn call_tool(
        &self,
        params: Option<Value>,
        facts: &mut CallFacts,
    ) -> Result<Value, JsonRpcError> {
        let params: ToolCallParams = serde_json::from_value(params.unwrap_or(Value::Null))
            .map_err(|_| JsonRpcError::new(INVALID_PARAMS, "invalid tool call params"))?;
        facts.tool = Some(params.name.clone());
        facts.operation = self.router.operation_of(&params.name, &params.arguments);
        facts.legacy_alias = self.router.is_legacy_alias(&params.name);
        let result = self
            .router
            .dispatch(&params.name, params.arguments)
            .await
            .map_err(JsonRpcError::from)?;
        let text = serde_json::to_string(&result)
            .map_err(|_| JsonRpcError::new(INTERNAL_ERROR, "result serialization failed"))?;
        to_value(&ToolCallResult {
            content: vec![ToolContent::Text {
                text,
            }],
        })
    }
}

/// Builds the `initialize` result.
fn initialize_result(params: Option<&Value>) -> Value {
    let protocol = params
        .and_then(|params| params.get("protocolVersion"))
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_PROTOCOL_VERSION);
    json!({
        "protocolVersion": protocol,
        "capabilities": { "tools": { "listChanged": false } },
        "serverInfo": { "name": "letta-mcp", "version": env!("CARGO_PKG_VERSION") },
    })
}

/// Serializes a result payload.
fn to_value(value: &impl Serialize) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value)
        .map_err(|_| JsonRpcError::new(INTERNAL_ERROR, "serialization failed"))
}

/// Serializes a response envelope.
fn encode_response(response: &JsonRpcResponse) -> Vec<u8> {
    serde_json::to_vec(response).unwrap_or_else(|_| {
        br#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"serialization failed"}}"#
            .to_vec()
    })
}

// ============================================================================
// SECTION: JSON-RPC Types
// ============================================================================

/// Incoming JSON-RPC request payload.
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    /// JSON-RPC protocol version.
    jsonrpc: String,
    /// Request identifier; absent for notifications, `Some(Null)` for `"id": null`.
    #[serde(default, deserialize_with = "present_id")]
    id: Option<Value>,
    /// Method name.
    method: String,
    /// Optional parameters payload.
    #[serde(default)]
    params: Option<Value>,
}

/// Keeps an explicit `null` id distinct from an absent one.
fn present_id<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// JSON-RPC response envelope.
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    /// JSON-RPC protocol version.
    jsonrpc: &'static str,
    /// Request identifier.
    id: Value,
    /// Successful result payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    /// Error payload when the request fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

/// JSON-RPC error payload.
#[derive(Debug, Serialize)]
struct JsonRpcError {
    /// Error code.
    code: i64,
    /// Human-readable error message.
    message: String,
    /// `{kind, context}` for tool failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    /// Normalized kind label for audit events.
    #[serde(skip)]
    kind: Option<&'static str>,
}

impl JsonRpcError {
    /// Builds an envelope-level error.
    fn new(code: i64, message: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
            data: None,
            kind: None,
        }
    }

    /// Returns the normalized kind label, if any.
    const fn kind(&self) -> Option<&'static str> {
        self.kind
    }

    /// Wraps the error in a response envelope.
    fn response(self, id: Value) -> JsonRpcResponse {
        JsonRpcResponse {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(self),
        }
    }
}

impl From<NormalizedError> for JsonRpcError {
    fn from(error: NormalizedError) -> Self {
        Self {
            code: error.code(),
            data: Some(error.data()),
            kind: Some(error.kind.as_str()),
            message: error.message,
        }
    }
}

/// Tool call parameters for JSON-RPC requests.
#[derive(Debug, Deserialize)]
struct ToolCallParams {
    /// Tool name.
    name: String,
    /// Raw JSON arguments.
    #[serde(default)]
    arguments: Value,
}

/// Tool list response payload.
#[derive(Debug, Serialize)]
struct ToolListResult {
    /// Tool definitions, legacy aliases last.
    tools: Vec<ToolDefinition>,
}

/// Tool call response payload.
#[derive(Debug, Serialize)]
struct ToolCallResult {
    /// Tool output content.
    content: Vec<ToolContent>,
}

/// Tool output payloads for JSON-RPC responses.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ToolContent {
    /// Result object rendered as JSON text.
    Text {
        /// JSON text.
        text: String,
    },
}

// ============================================================================
// SECTION: Stdio Transport
// ============================================================================

/// Framing of one stdio message; replies reuse the request's framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// `Content-Length` header block followed by the body.
    ContentLength,
    /// One JSON document per line.
    Line,
}

/// One message read from stdio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A message within the size limit.
    Message {
        /// Framing used by the sender.
        framing: Framing,
        /// Raw JSON bytes.
        payload: Vec<u8>,
    },
    /// A message over the size limit; its bytes were discarded.
    Oversize {
        /// Framing used by the sender.
        framing: Framing,
    },
}

/// Serves JSON-RPC over the given stdio streams until input closes.
///
/// # Errors
///
/// Returns [`McpServerError::Transport`] when reading or writing fails.
pub async fn serve_stdio<R, W>(
    service: RpcService,
    input: R,
    output: W,
) -> Result<(), McpServerError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut reader = BufReader::new(input);
    let (replies, mut pending) = mpsc::channel::<(Framing, Vec<u8>)>(STDIO_REPLY_BUFFER);
    let writer = tokio::spawn(async move {
        let mut output = output;
        while let Some((framing, payload)) = pending.recv().await {
            write_frame(&mut output, framing, &payload).await?;
        }
        Ok::<(), McpServerError>(())
    });
    let max_body_bytes = service.max_body_bytes;
    while let Some(frame) = read_frame(&mut reader, max_body_bytes).await? {
        let service = service.clone();
        let replies = replies.clone();
        tokio::spawn(async move {
            let (framing, reply) = match frame {
                Frame::Message {
                    framing,
                    payload,
                } => (framing, service.handle_bytes(&payload, None).await),
                Frame::Oversize {
                    framing,
                } => (framing, service.reject_oversize(max_body_bytes.saturating_add(1), None)),
            };
            if let Some(body) = reply.payload {
                let _ = replies.send((framing, body)).await;
            }
        });
    }
    drop(replies);
    writer.await.map_err(|err| McpServerError::Transport(format!("stdio writer: {err}")))?
}

/// Reads one stdio message in either framing; `None` at end of input.
///
/// # Errors
///
/// Returns [`McpServerError::Transport`] on read failures and malformed
/// headers.
pub async fn read_frame<R>(
    reader: &mut R,
    max_body_bytes: usize,
) -> Result<Option<Frame>, McpServerError>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let Some(line) = read_bounded_line(reader, max_body_bytes).await? else {
            return Ok(None);
        };
        let Some(line) = line else {
            return Ok(Some(Frame::Oversize {
                framing: Framing::Line,
            }));
        };
        let text = String::from_utf8_lossy(&line);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if header_value(trimmed, "content-length").is_none() && !is_header(trimmed) {
            return Ok(Some(Frame::Message {
                framing: Framing::Line,
                payload: trimmed.as_bytes().to_vec(),
            }));
        }
        let mut content_length = header_value(trimmed, "content-length").map(str::to_string);
        loop {
            let Some(Some(header)) = read_bounded_line(reader, max_body_bytes).await? else {
                return Err(McpServerError::Transport("stdio header block truncated".to_string()));
            };
            let header = String::from_utf8_lossy(&header);
            let header = header.trim();
            if header.is_empty() {
                break;
            }
            if let Some(value) = header_value(header, "content-length") {
                content_length = Some(value.to_string());
            }
        }
        let len = content_length
            .ok_or_else(|| McpServerError::Transport("missing content length".to_string()))?
            .parse::<usize>()
            .map_err(|_| McpServerError::Transport("invalid content length".to_string()))?;
        if len > max_body_bytes {
            let limit = u64::try_from(len).unwrap_or(u64::MAX);
            tokio::io::copy(&mut (&mut *reader).take(limit), &mut tokio::io::sink())
                .await
                .map_err(|_| McpServerError::Transport("stdio read failed".to_string()))?;
            return Ok(Some(Frame::Oversize {
                framing: Framing::ContentLength,
            }));
        }
        let mut payload = vec![0u8; len];
        reader
            .read_exact(&mut payload)
            .await
            .map_err(|_| McpServerError::Transport("stdio read failed".to_string()))?;
        return Ok(Some(Frame::Message {
            framing: Framing::ContentLength,
            payload,
        }));
    }
}

/// Writes one reply in the given framing.
///
/// # Errors
///
/// Returns [`McpServerError::Transport`] when the write fails.
pub async fn write_frame<W>(
    writer: &mut W,
    framing: Framing,
    payload: &[u8],
) -> Result<(), McpServerError>
where
    W: AsyncWrite + Unpin,
{
    let failed = |_| McpServerError::Transport("stdio write failed".to_string());
    match framing {
        Framing::ContentLength => {
            let header = format!("Content-Length: {}\r\n\r\n", payload.len());
            writer.write_all(header.as_bytes()).await.map_err(failed)?;
            writer.write_all(payload).await.map_err(failed)?;
        }
        Framing::Line => {
            writer.write_all(payload).await.map_err(failed)?;
            writer.write_all(b"\n").await.map_err(failed)?;
        }
    }
    writer.flush().await.map_err(failed)
}

/// Reads one line of at most `limit` bytes.
///
/// Returns `None` at end of input and `Some(None)` when the line was too
/// long; the rest of an overlong line is consumed.
async fn read_bounded_line<R>(
    reader: &mut R,
    limit: usize,
) -> Result<Option<Option<Vec<u8>>>, McpServerError>
where
    R: AsyncBufRead + Unpin,
{
    let failed = |_| McpServerError::Transport("stdio read failed".to_string());
    let mut line = Vec::new();
    let cap = u64::try_from(limit.saturating_add(2)).unwrap_or(u64::MAX);
    let read = (&mut *reader).take(cap).read_until(b'\n', &mut line).await.map_err(failed)?;
    if read == 0 {
        return Ok(None);
    }
    if line.last() == Some(&b'\n') || line.len() <= limit {
        return Ok(Some(Some(line)));
    }
    let mut rest = Vec::new();
    loop {
        rest.clear();
        let read = (&mut *reader).take(cap).read_until(b'\n', &mut rest).await.map_err(failed)?;
        if read == 0 || rest.last() == Some(&b'\n') {
            return Ok(Some(None));
        }
    }
}

/// Returns the value of `name` when `line` is that header.
fn header_value<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let (key, value) = line.split_once(':')?;
    key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
}

/// Returns true for lines that look like a header rather than JSON.
fn is_header(line: &str) -> bool {
    !line.starts_with(['{', '[']) && line.split_once(':').is_some_and(|(key, _)| {
        !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

// ============================================================================
// SECTION: HTTP Transport
// ============================================================================

/// Shared state for HTTP handlers.
#[derive(Clone)]
struct ServerState {
    /// Request handling.
    service: RpcService,
}

/// Builds the axum router for the HTTP transport.
#[must_use]
pub fn http_app(service: RpcService) -> Router {
    let limit = service.max_body_bytes;
    let state = Arc::new(ServerState {
        service,
    });
    Router::new()
        .route("/mcp", post(handle_http))
        .route("/rpc", post(handle_http))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(state)
}

/// Serves JSON-RPC requests over HTTP.
async fn serve_http(config: &LettaMcpConfig, service: RpcService) -> Result<(), McpServerError> {
    let addr = config.server.bind_addr().map_err(|err| McpServerError::Config(err.to_string()))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| McpServerError::Transport(format!("http bind failed: {err}")))?;
    tracing::info!(%addr, "serving MCP over http");
    axum::serve(listener, http_app(service))
        .await
        .map_err(|err| McpServerError::Transport(format!("http server failed: {err}")))
}

/// Handles HTTP JSON-RPC requests.
async fn handle_http(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    bytes: Bytes,
) -> Response {
    let presented =
        headers.get(SESSION_HEADER).and_then(|value| value.to_str().ok()).map(str::to_string);
    let reply = state.service.handle_bytes(&bytes, presented.as_deref()).await;
    let session = if reply.method == McpMethod::Initialize && reply.status == StatusCode::OK {
        Some(new_session_id())
    } else {
        presented
    };
    let mut response = match reply.payload {
        Some(body) => (reply.status, [(CONTENT_TYPE, "application/json")], body).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    };
    if let Some(session) = session
        && let Ok(value) = HeaderValue::from_str(&session)
    {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    response
}

/// Generates an opaque session identifier.
fn new_session_id() -> String {
    format!("{:032x}", rand::random::<u128>())
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// MCP server errors.
#[derive(Debug, thiserror::Error)]
pub enum McpServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only framing assertions."
    )]

    use std::collections::BTreeMap;
    use std::io::Cursor;

    use serde_json::Value;
    use tokio::io::BufReader;

    use super::Frame;
    use super::Framing;
    use super::INTERNAL_ERROR;
    use super::JsonRpcRequest;
    use super::read_frame;
    use super::to_value;
    use super::write_frame;

    const PAYLOAD: &[u8] = br#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#;

    fn framed(payload: &[u8]) -> Vec<u8> {
        let mut bytes = format!("Content-Length: {}\r\n\r\n", payload.len()).into_bytes();
        bytes.extend_from_slice(payload);
        bytes
    }

    #[tokio::test]
    async fn content_length_frame_at_limit_is_read() {
        let mut reader = BufReader::new(Cursor::new(framed(PAYLOAD)));
        let frame = read_frame(&mut reader, PAYLOAD.len()).await.unwrap();
        assert_eq!(
            frame,
            Some(Frame::Message {
                framing: Framing::ContentLength,
                payload: PAYLOAD.to_vec(),
            })
        );
    }

    #[tokio::test]
    async fn content_length_frame_over_limit_is_skipped() {
        let mut input = framed(PAYLOAD);
        input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\n");
        let mut reader = BufReader::new(Cursor::new(input));
        let first = read_frame(&mut reader, PAYLOAD.len() - 1).await.unwrap();
        assert_eq!(
            first,
            Some(Frame::Oversize {
                framing: Framing::ContentLength,
            })
        );
        let second = read_frame(&mut reader, PAYLOAD.len()).await.unwrap().unwrap();
        assert!(matches!(second, Frame::Message { framing: Framing::Line, .. }));
    }

    #[tokio::test]
    async fn newline_delimited_messages_are_read_in_order() {
        let input = b"\n{\"id\":1}\n{\"id\":2}\n".to_vec();
        let mut reader = BufReader::new(Cursor::new(input));
        let first = read_frame(&mut reader, 1024).await.unwrap().unwrap();
        let second = read_frame(&mut reader, 1024).await.unwrap().unwrap();
        assert_eq!(
            first,
            Frame::Message {
                framing: Framing::Line,
                payload: b"{\"id\":1}".to_vec(),
            }
        );
        assert!(matches!(second, Frame::Message { payload, .. } if payload == b"{\"id\":2}"));
        assert_eq!(read_frame(&mut reader, 1024).await.unwrap(), None);
    }

    #[tokio::test]
    async fn overlong_lines_are_discarded() {
        let mut input = vec![b'x'; 64];
        input.extend_from_slice(b"\n{\"id\":3}\n");
        let mut reader = BufReader::new(Cursor::new(input));
        let first = read_frame(&mut reader, 16).await.unwrap();
        assert_eq!(
            first,
            Some(Frame::Oversize {
                framing: Framing::Line,
            })
        );
        let second = read_frame(&mut reader, 16).await.unwrap().unwrap();
        assert!(matches!(second, Frame::Message { payload, .. } if payload == b"{\"id\":3}"));
    }

    #[test]
    fn null_id_is_distinct_from_absent_id() {
        let null: JsonRpcRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#).unwrap();
        assert_eq!(null.id, Some(Value::Null));
        let absent: JsonRpcRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"ping"}"#).unwrap();
        assert_eq!(absent.id, None);
    }

    #[test]
    fn unserializable_results_are_internal_errors() {
        let result = BTreeMap::from([((1_u8, 2_u8), "tuple keys are not json")]);
        let error = to_value(&result).unwrap_err();
        assert_eq!(error.code, INTERNAL_ERROR);
        assert_eq!(error.code, -32603);
    }

    #[tokio::test]
    async fn replies_reuse_request_framing() {
        let mut out = Vec::new();
        write_frame(&mut out, Framing::ContentLength, b"{}").await.unwrap();
        write_frame(&mut out, Framing::Line, b"{}").await.unwrap();
        assert_eq!(out, b"Content-Length: 2\r\n\r\n{}{}\n".to_vec());
    }
}

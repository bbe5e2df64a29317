// crates/letta-mcp/src/audit.rs
// ============================================================================
// Module: MCP Audit Logging
// Description: One structured record per JSON-RPC message.
// Purpose: Track tool usage, alias traffic, and failures without payloads.
// Dependencies: letta-mcp-config, serde, tracing
// ============================================================================

//! ## Overview
//! Every message handled by the service yields one [`McpAuditEvent`]. Events
//! record which tool and operation ran, whether the call arrived through a
//! legacy alias, and how it ended. Arguments and results are never captured,
//! so sinks may write anywhere without redaction.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use letta_mcp_config::AuditConfig;
use letta_mcp_config::ServerTransport;
use serde::Serialize;

use crate::telemetry::McpMethod;
use crate::telemetry::McpOutcome;

/// Event label written on every record.
const REQUEST_EVENT: &str = "letta_mcp_request";

/// Tracing target used by [`McpLogAuditSink`].
pub const AUDIT_LOG_TARGET: &str = "letta_mcp::audit";

// ============================================================================
// SECTION: Event
// ============================================================================

/// Audit record for one JSON-RPC message.
///
/// # Invariants
/// - `tool`, `operation`, and `legacy_alias` are only set for `tools/call`.
#[derive(Debug, Clone, Serialize)]
pub struct McpAuditEvent {
    /// Constant event label.
    pub event: &'static str,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u128,
    /// JSON-RPC id rendered as text.
    pub request_id: Option<String>,
    /// HTTP session identifier.
    pub session_id: Option<String>,
    /// Transport that carried the message.
    pub transport: ServerTransport,
    /// Method classification.
    pub method: McpMethod,
    /// Tool name as invoked, alias or consolidated.
    pub tool: Option<String>,
    /// Resolved operation.
    pub operation: Option<String>,
    /// True when `tool` is a deprecated alias.
    pub legacy_alias: bool,
    /// Success or failure.
    pub outcome: McpOutcome,
    /// JSON-RPC error code.
    pub error_code: Option<i64>,
    /// Normalized error kind.
    pub error_kind: Option<&'static str>,
    /// Request size in bytes.
    pub request_bytes: usize,
    /// Response size in bytes; zero for notifications.
    pub response_bytes: usize,
    /// Handling time in milliseconds.
    pub latency_ms: u64,
}

impl McpAuditEvent {
    /// Starts a successful record stamped with the current time.
    #[must_use]
    pub fn new(transport: ServerTransport, method: McpMethod) -> Self {
        Self {
            event: REQUEST_EVENT,
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis(),
            request_id: None,
            session_id: None,
            transport,
            method,
            tool: None,
            operation: None,
            legacy_alias: false,
            outcome: McpOutcome::Ok,
            error_code: None,
            error_kind: None,
            request_bytes: 0,
            response_bytes: 0,
            latency_ms: 0,
        }
    }

    /// Marks the record as failed with a JSON-RPC error code.
    #[must_use]
    pub fn failed(mut self, code: i64, kind: Option<&'static str>) -> Self {
        self.outcome = McpOutcome::Error;
        self.error_code = Some(code);
        self.error_kind = kind;
        self
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Destination for audit records.
pub trait McpAuditSink: Send + Sync {
    /// Records one event; failures are swallowed.
    fn record(&self, event: &McpAuditEvent);
}

/// Builds the sink selected by `[server.audit]`.
///
/// # Errors
///
/// Returns an error when the audit file cannot be opened.
pub fn audit_sink_from_config(config: &AuditConfig) -> io::Result<Arc<dyn McpAuditSink>> {
    if !config.enabled {
        return Ok(Arc::new(McpNoopAuditSink));
    }
    match &config.path {
        Some(path) => Ok(Arc::new(McpFileAuditSink::new(path)?)),
        None => Ok(Arc::new(McpLogAuditSink)),
    }
}

/// Emits records as JSON through the tracing subscriber.
pub struct McpLogAuditSink;

impl McpAuditSink for McpLogAuditSink {
    fn record(&self, event: &McpAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            tracing::info!(target: AUDIT_LOG_TARGET, "{payload}");
        }
    }
}

/// Appends records as JSON lines to a file.
pub struct McpFileAuditSink {
    /// Append-only handle.
    file: Mutex<File>,
}

impl McpFileAuditSink {
    /// Opens (or creates) the audit file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl McpAuditSink for McpFileAuditSink {
    fn record(&self, event: &McpAuditEvent) {
        let Ok(mut line) = serde_json::to_vec(event) else {
            return;
        };
        line.push(b'\n');
        if let Ok(mut file) = self.file.lock() {
            let _ = file.write_all(&line);
        }
    }
}

/// Discards every record.
pub struct McpNoopAuditSink;

impl McpAuditSink for McpNoopAuditSink {
    fn record(&self, _event: &McpAuditEvent) {}
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions use unwrap/expect for clarity."
    )]

    use letta_mcp_config::AuditConfig;
    use letta_mcp_config::ServerTransport;
    use serde_json::Value;

    use super::McpAuditEvent;
    use super::McpAuditSink;
    use super::McpFileAuditSink;
    use super::audit_sink_from_config;
    use crate::telemetry::McpMethod;

    fn alias_failure() -> McpAuditEvent {
        let mut event = McpAuditEvent::new(ServerTransport::Stdio, McpMethod::ToolsCall);
        event.request_id = Some("7".to_string());
        event.tool = Some("list_agents".to_string());
        event.operation = Some("list".to_string());
        event.legacy_alias = true;
        event.failed(-32004, Some("not_found"))
    }

    #[test]
    fn file_sink_appends_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let sink = McpFileAuditSink::new(&path).unwrap();
        sink.record(&alias_failure());
        sink.record(&McpAuditEvent::new(ServerTransport::Http, McpMethod::Ping));

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<Value> =
            content.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "letta_mcp_request");
        assert_eq!(lines[0]["method"], "tools_call");
        assert_eq!(lines[0]["legacy_alias"], true);
        assert_eq!(lines[0]["outcome"], "error");
        assert_eq!(lines[0]["error_kind"], "not_found");
        assert_eq!(lines[1]["transport"], "http");
        assert_eq!(lines[1]["outcome"], "ok");
    }

    #[test]
    fn disabled_audit_opens_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never.jsonl");
        let config = AuditConfig {
            enabled: false,
            path: Some(path.clone()),
        };
        audit_sink_from_config(&config).unwrap().record(&alias_failure());
        assert!(!path.exists());
    }
}

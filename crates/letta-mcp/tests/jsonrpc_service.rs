// crates/letta-mcp/tests/jsonrpc_service.rs
// ============================================================================
// Module: JSON-RPC Service Tests
// Description: Envelope handling for initialize, tools/list, and tools/call.
// Purpose: Validate status codes, error codes, and audit records per message.
// Dependencies: letta-mcp, letta-mcp-config, axum
// ============================================================================

//! Raw-message tests for the transport-independent JSON-RPC service.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions use unwrap for clarity."
)]

mod common;

use std::sync::Arc;
use std::sync::Mutex;

use axum::http::StatusCode;
use common::FakeLetta;
use common::router;
use letta_mcp::McpAuditEvent;
use letta_mcp::McpAuditSink;
use letta_mcp::McpFileAuditSink;
use letta_mcp::McpMethod;
use letta_mcp::McpNoopAuditSink;
use letta_mcp::RpcService;
use letta_mcp_config::ServerTransport;
use serde_json::Value;
use serde_json::json;

const BODY_LIMIT: usize = 64 * 1024;

/// Audit sink that keeps every event in memory.
#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<McpAuditEvent>>,
}

impl McpAuditSink for RecordingSink {
    fn record(&self, event: &McpAuditEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

fn service(fake: &Arc<FakeLetta>) -> RpcService {
    RpcService::new(router(fake), Arc::new(McpNoopAuditSink), ServerTransport::Stdio, BODY_LIMIT)
}

fn decode(payload: Option<Vec<u8>>) -> Value {
    serde_json::from_slice(&payload.unwrap()).unwrap()
}

async fn send(service: &RpcService, message: &Value) -> (StatusCode, Value) {
    let reply = service.handle_bytes(&serde_json::to_vec(message).unwrap(), None).await;
    (reply.status, decode(reply.payload))
}

// ============================================================================
// SECTION: Protocol Methods
// ============================================================================

#[tokio::test]
async fn initialize_echoes_protocol_version() {
    let fake = FakeLetta::new();
    let service = service(&fake);
    let (status, response) = send(
        &service,
        &json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": { "protocolVersion": "2024-11-05" }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["id"], json!(1));
    assert_eq!(response["result"]["protocolVersion"], json!("2024-11-05"));
    assert_eq!(response["result"]["serverInfo"]["name"], json!("letta-mcp"));
}

#[tokio::test]
async fn tools_list_includes_aliases() {
    let fake = FakeLetta::new();
    let router = router(&fake);
    let expected = router.list_tools().len();
    let service =
        RpcService::new(router, Arc::new(McpNoopAuditSink), ServerTransport::Http, BODY_LIMIT);

    let (status, response) =
        send(&service, &json!({ "jsonrpc": "2.0", "id": "a", "method": "tools/list" })).await;
    assert_eq!(status, StatusCode::OK);
    let tools = response["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), expected);
    assert_eq!(tools[0]["name"], json!("letta_agent_advanced"));
    assert!(tools.iter().all(|tool| tool["inputSchema"].is_object()));
}

#[tokio::test]
async fn tools_call_wraps_result_as_text_content() {
    let fake = FakeLetta::new();
    let service = service(&fake);
    let (status, response) = send(
        &service,
        &json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "tools/call",
            "params": {
                "name": "letta_agent_advanced",
                "arguments": { "operation": "create", "name": "wrapped" }
            }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let content = &response["result"]["content"][0];
    assert_eq!(content["type"], json!("text"));
    let result: Value = serde_json::from_str(content["text"].as_str().unwrap()).unwrap();
    assert_eq!(result["success"], json!(true));
    assert_eq!(result["operation"], json!("create"));
}

#[tokio::test]
async fn tool_failures_carry_normalized_data() {
    let fake = FakeLetta::new();
    let service = service(&fake);
    let (status, response) = send(
        &service,
        &json!({
            "jsonrpc": "2.0",
            "id": 8,
            "method": "tools/call",
            "params": {
                "name": "letta_agent_advanced",
                "arguments": { "operation": "get", "agent_id": "agent-missing" }
            }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["error"]["code"], json!(-32004));
    assert_eq!(response["error"]["data"]["kind"], json!("not_found"));
    assert!(response.get("result").is_none());
}

// ============================================================================
// SECTION: Envelope Errors
// ============================================================================

#[tokio::test]
async fn notifications_are_accepted_without_reply() {
    let fake = FakeLetta::new();
    let service = service(&fake);
    let message = json!({ "jsonrpc": "2.0", "method": "notifications/initialized" });
    let reply = service.handle_bytes(&serde_json::to_vec(&message).unwrap(), None).await;
    assert_eq!(reply.status, StatusCode::ACCEPTED);
    assert_eq!(reply.method, McpMethod::Initialized);
    assert!(reply.payload.is_none());
}

#[tokio::test]
async fn null_id_request_is_answered() {
    let fake = FakeLetta::new();
    let service = service(&fake);
    let (status, response) =
        send(&service, &json!({ "jsonrpc": "2.0", "id": null, "method": "ping" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["id"], Value::Null);
    assert_eq!(response["result"], json!({}));
}

#[tokio::test]
async fn malformed_envelopes_are_rejected() {
    let fake = FakeLetta::new();
    let service = service(&fake);

    let (status, response) =
        send(&service, &json!({ "jsonrpc": "1.0", "id": 1, "method": "ping" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"]["code"], json!(-32600));
    assert_eq!(response["id"], json!(1));

    let reply = service.handle_bytes(b"{not json", None).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.method, McpMethod::Invalid);
    let response = decode(reply.payload);
    assert_eq!(response["error"]["code"], json!(-32600));
    assert_eq!(response["id"], Value::Null);

    let (status, response) =
        send(&service, &json!({ "jsonrpc": "2.0", "id": 2, "method": "resources/list" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["error"]["code"], json!(-32601));
}

#[tokio::test]
async fn oversize_messages_are_rejected_before_parsing() {
    let fake = FakeLetta::new();
    let service =
        RpcService::new(router(&fake), Arc::new(McpNoopAuditSink), ServerTransport::Http, 32);
    let message = json!({ "jsonrpc": "2.0", "id": 1, "method": "tools/list" });
    let reply = service.handle_bytes(&serde_json::to_vec(&message).unwrap(), None).await;
    assert_eq!(reply.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(decode(reply.payload)["error"]["code"], json!(-32600));
}

// ============================================================================
// SECTION: Audit
// ============================================================================

#[tokio::test]
async fn every_message_is_audited_with_call_facts() {
    let fake = FakeLetta::new();
    let sink = Arc::new(RecordingSink::default());
    let audit = Arc::clone(&sink) as Arc<dyn McpAuditSink>;
    let service = RpcService::new(router(&fake), audit, ServerTransport::Http, BODY_LIMIT);

    let message = json!({
        "jsonrpc": "2.0",
        "id": 3,
        "method": "tools/call",
        "params": { "name": "letta_job_monitor", "arguments": { "operation": "list" } }
    });
    service.handle_bytes(&serde_json::to_vec(&message).unwrap(), Some("session-1")).await;
    service.handle_bytes(b"42", None).await;
    let alias = json!({
        "jsonrpc": "2.0",
        "id": 4,
        "method": "tools/call",
        "params": { "name": "list_agents", "arguments": {} }
    });
    service.handle_bytes(&serde_json::to_vec(&alias).unwrap(), None).await;

    let events = sink.events.lock().unwrap();
    assert_eq!(events.len(), 3);
    assert!(!events[0].legacy_alias);
    assert_eq!(events[0].method, McpMethod::ToolsCall);
    assert_eq!(events[0].tool.as_deref(), Some("letta_job_monitor"));
    assert_eq!(events[0].operation.as_deref(), Some("list"));
    assert_eq!(events[0].session_id.as_deref(), Some("session-1"));
    assert_eq!(events[0].outcome.as_str(), "ok");
    assert_eq!(events[1].method, McpMethod::Invalid);
    assert_eq!(events[1].error_code, Some(-32600));
    assert!(events[2].legacy_alias);
    assert_eq!(events[2].operation.as_deref(), Some("list"));
}

#[tokio::test]
async fn file_sink_appends_json_lines() {
    let fake = FakeLetta::new();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let sink = Arc::new(McpFileAuditSink::new(&path).unwrap());
    let service = RpcService::new(router(&fake), sink, ServerTransport::Stdio, BODY_LIMIT);

    let message = json!({ "jsonrpc": "2.0", "id": 1, "method": "ping" });
    service.handle_bytes(&serde_json::to_vec(&message).unwrap(), None).await;

    let contents = std::fs::read_to_string(&path).unwrap();
    let line: Value = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
    assert_eq!(line["method"], json!("ping"));
    assert_eq!(line["outcome"], json!("ok"));
}

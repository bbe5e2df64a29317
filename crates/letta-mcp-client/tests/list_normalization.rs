// crates/letta-mcp-client/tests/list_normalization.rs
// ============================================================================
// Module: List Normalization Tests
// Description: Shape coverage for per-entity list normalization.
// Purpose: Keep backend shape sniffing honest independently of handlers.
// Dependencies: letta-mcp-client, serde_json
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use letta_mcp_client::EntityKind;
use letta_mcp_client::normalize_list;
use serde_json::json;

#[test]
fn bare_arrays_pass_through_in_order() {
    let body = json!([{ "id": "b" }, { "id": "a" }]);
    let items = normalize_list(EntityKind::Agents, body).unwrap();
    assert_eq!(items, vec![json!({ "id": "b" }), json!({ "id": "a" })]);
}

#[test]
fn named_wrapper_fields_are_unwrapped() {
    let body = json!({ "messages": [{ "id": "m1" }], "usage": { "total_tokens": 3 } });
    assert_eq!(normalize_list(EntityKind::Messages, body).unwrap(), vec![json!({ "id": "m1" })]);
    let body = json!({ "tools": [{ "name": "echo" }] });
    assert_eq!(normalize_list(EntityKind::McpTools, body).unwrap(), vec![json!({ "name": "echo" })]);
}

#[test]
fn generic_items_wrapper_is_accepted() {
    let body = json!({ "items": [{ "id": "j1" }], "next_cursor": null });
    assert_eq!(normalize_list(EntityKind::Jobs, body).unwrap().len(), 1);
}

#[test]
fn null_is_an_empty_list() {
    assert!(normalize_list(EntityKind::Sources, serde_json::Value::Null).unwrap().is_empty());
}

#[test]
fn server_map_becomes_named_records() {
    let body = json!({
        "alpha": { "type": "stdio", "command": "node" },
        "beta": { "type": "sse", "server_url": "http://x", "server_name": "beta" },
    });
    let servers = normalize_list(EntityKind::McpServers, body).unwrap();
    assert_eq!(servers.len(), 2);
    assert_eq!(servers[0]["server_name"], "alpha");
    assert_eq!(servers[0]["command"], "node");
    assert_eq!(servers[1]["server_name"], "beta");
}

#[test]
fn server_map_with_scalar_entry_is_rejected() {
    let body = json!({ "alpha": "stdio" });
    let error = normalize_list(EntityKind::McpServers, body).unwrap_err();
    assert!(error.to_string().contains("alpha"));
}

#[test]
fn unknown_object_shapes_are_rejected() {
    let error = normalize_list(EntityKind::Blocks, json!({ "detail": "oops" })).unwrap_err();
    assert_eq!(error.kind, "blocks");
    assert!(error.detail.contains("detail"));
    assert!(normalize_list(EntityKind::Files, json!("files")).is_err());
}

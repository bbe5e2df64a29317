// crates/letta-mcp-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for CLI overrides, tool listing, and log filters.
// Purpose: Ensure command-line overrides are validated before serving.
// Dependencies: letta-mcp-cli main helpers
// ============================================================================

//! ## Overview
//! Exercises the pure helpers behind `serve`, `tools`, and `check-config`.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions use unwrap for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use letta_mcp_config::LettaMcpConfig;
use letta_mcp_config::ServerTransport;
use letta_mcp_contract::ToolName;
use letta_mcp_contract::deprecation::MIGRATION_NOTICE_PREFIX;

use super::ConfigArgs;
use super::ServeCommand;
use super::TransportArg;
use super::apply_serve_overrides;
use super::config_summary;
use super::log_filter;
use super::tool_definitions;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn serve_overrides_replace_transport_and_bind() {
    let command = ServeCommand {
        config: ConfigArgs::default(),
        transport: Some(TransportArg::Http),
        bind: Some("127.0.0.1:4100".to_string()),
    };
    let config = apply_serve_overrides(LettaMcpConfig::default(), &command).unwrap();
    assert_eq!(config.server.transport, ServerTransport::Http);
    assert_eq!(config.server.bind_addr().unwrap().port(), 4100);
}

#[test]
fn invalid_bind_override_is_rejected() {
    let command = ServeCommand {
        config: ConfigArgs::default(),
        transport: Some(TransportArg::Http),
        bind: Some("not-an-address".to_string()),
    };
    let err = apply_serve_overrides(LettaMcpConfig::default(), &command).unwrap_err();
    assert!(err.to_string().contains("server.bind"));
}

#[test]
fn tools_listing_appends_legacy_aliases_only_on_request() {
    let consolidated = tool_definitions(false).unwrap();
    assert_eq!(consolidated.len(), ToolName::all().len());
    assert!(consolidated.iter().all(|tool| !tool.description.starts_with(MIGRATION_NOTICE_PREFIX)));

    let with_legacy = tool_definitions(true).unwrap();
    assert!(with_legacy.len() > consolidated.len());
    let legacy = &with_legacy[consolidated.len() ..];
    assert!(legacy.iter().all(|tool| tool.description.starts_with(MIGRATION_NOTICE_PREFIX)));
}

#[test]
fn config_summary_omits_password() {
    let mut config = LettaMcpConfig::default();
    config.backend.password = Some("hunter2".to_string());
    let summary = config_summary(&config);
    assert!(summary.starts_with("config ok: transport=stdio"));
    assert!(!summary.contains("hunter2"));
}

#[test]
fn log_filter_prefers_flag_then_environment() {
    assert!(log_filter(Some("debug"), Some("warn")).is_ok());
    assert!(log_filter(None, Some("letta_mcp=trace")).is_ok());
    assert!(log_filter(None, Some("  ")).is_ok());
    assert!(log_filter(Some("letta_mcp=notalevel"), None).is_err());
}

// crates/letta-mcp-config/src/lib.rs
// ============================================================================
// Module: Letta MCP Config Library
// Description: Canonical config model and validation for the Letta MCP server.
// Purpose: Single source of truth for letta-mcp.toml semantics.
// Dependencies: serde, toml, url
// ============================================================================

//! ## Overview
//! `letta-mcp-config` loads `letta-mcp.toml`, applies environment overrides
//! (`LETTA_BASE_URL`, `LETTA_PASSWORD`, ...), and validates every knob
//! before the server starts. Invalid configuration fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;

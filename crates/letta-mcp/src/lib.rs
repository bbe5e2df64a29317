// crates/letta-mcp/src/lib.rs
// ============================================================================
// Module: Letta MCP
// Description: Consolidated MCP tools over the Letta REST API.
// Purpose: Dispatch, validate, and serve the consolidated Letta tool surface.
// Dependencies: letta-mcp-client, letta-mcp-config, letta-mcp-contract, axum
// ============================================================================

//! ## Overview
//! Letta MCP exposes a small set of consolidated tools, each selecting one of
//! many operations through an `operation` discriminator. Calls flow through
//! [`ToolRouter`], which validates arguments, runs the typed handler for the
//! tool, checks the result against the tool's output schema, and normalizes
//! failures into stable JSON-RPC errors. [`McpServer`] carries the router over
//! stdio or HTTP.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod errors;
pub mod handlers;
pub mod request;
pub mod response;
pub mod router;
pub mod server;
pub mod telemetry;
pub mod validation;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::McpAuditEvent;
pub use audit::McpAuditSink;
pub use audit::McpFileAuditSink;
pub use audit::McpLogAuditSink;
pub use audit::McpNoopAuditSink;
pub use errors::ErrorKind;
pub use errors::NormalizedError;
pub use errors::ToolError;
pub use handlers::ToolHandler;
pub use router::RouterError;
pub use router::ToolRouter;
pub use router::ToolRouterConfig;
pub use server::McpServer;
pub use server::McpServerError;
pub use server::RpcService;
pub use telemetry::McpMethod;
pub use telemetry::McpOutcome;
pub use validation::SchemaValidator;

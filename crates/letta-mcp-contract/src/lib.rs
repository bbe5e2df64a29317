// crates/letta-mcp-contract/src/lib.rs
// ============================================================================
// Module: Letta MCP Contract Library
// Description: Canonical tool descriptors and schema registry for Letta MCP.
// Purpose: Single source of truth for the consolidated tool surface.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! `letta-mcp-contract` defines the consolidated Letta MCP tools as data: one
//! descriptor per tool with an `operation`-discriminated input schema, an
//! output schema, and the operation catalog each handler must cover. The
//! [`SchemaRegistry`] validates those descriptors once at startup and the
//! [`DeprecationTable`] keeps legacy single-purpose tool names callable.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod deprecation;
pub mod fields;
pub mod operations;
pub mod registry;
pub mod tooling;
pub mod types;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use deprecation::DeprecationEntry;
pub use deprecation::DeprecationTable;
pub use deprecation::FieldRemap;
pub use deprecation::legacy_entries;
pub use operations::AgentOperation;
pub use operations::FileFolderOperation;
pub use operations::JobOperation;
pub use operations::McpOperation;
pub use operations::MemoryOperation;
pub use operations::SourceOperation;
pub use operations::ToolManagerOperation;
pub use registry::RegistryError;
pub use registry::SchemaRegistry;
pub use tooling::tool_descriptors;
pub use types::FieldKind;
pub use types::FieldSpec;
pub use types::OperationSpec;
pub use types::OutputField;
pub use types::OutputKind;
pub use types::ToolDefinition;
pub use types::ToolDescriptor;
pub use types::ToolName;

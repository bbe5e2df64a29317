// crates/letta-mcp-contract/src/types.rs
// ============================================================================
// Module: Contract Types
// Description: Tool names, field specs, operation specs, and descriptors.
// Purpose: Shared vocabulary between the registry, router, and handlers.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Descriptors are plain data: JSON schemas plus a typed operation catalog.
//! They are built once at startup and never mutated afterwards.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Tool Names
// ============================================================================

/// Canonical names of the consolidated Letta MCP tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    /// Agent lifecycle, messaging, import/export.
    LettaAgentAdvanced,
    /// Core memory blocks and archival passages.
    LettaMemoryUnified,
    /// Tool CRUD, attachment, and generation.
    LettaToolManager,
    /// Data sources, uploads, and attachments.
    LettaSourceManager,
    /// Background job inspection.
    LettaJobMonitor,
    /// Agent file windows and folders.
    LettaFileFolderOps,
    /// MCP server registration and tool execution.
    LettaMcpOps,
}

impl ToolName {
    /// Returns the canonical string name for the tool.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LettaAgentAdvanced => "letta_agent_advanced",
            Self::LettaMemoryUnified => "letta_memory_unified",
            Self::LettaToolManager => "letta_tool_manager",
            Self::LettaSourceManager => "letta_source_manager",
            Self::LettaJobMonitor => "letta_job_monitor",
            Self::LettaFileFolderOps => "letta_file_folder_ops",
            Self::LettaMcpOps => "letta_mcp_ops",
        }
    }

    /// Returns all tool names in canonical listing order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::LettaAgentAdvanced,
            Self::LettaMemoryUnified,
            Self::LettaToolManager,
            Self::LettaSourceManager,
            Self::LettaJobMonitor,
            Self::LettaFileFolderOps,
            Self::LettaMcpOps,
        ]
    }

    /// Parses a tool name from its string representation.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "letta_agent_advanced" => Some(Self::LettaAgentAdvanced),
            "letta_memory_unified" => Some(Self::LettaMemoryUnified),
            "letta_tool_manager" => Some(Self::LettaToolManager),
            "letta_source_manager" => Some(Self::LettaSourceManager),
            "letta_job_monitor" => Some(Self::LettaJobMonitor),
            "letta_file_folder_ops" => Some(Self::LettaFileFolderOps),
            "letta_mcp_ops" => Some(Self::LettaMcpOps),
            _ => None,
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Operation Specs
// ============================================================================

/// Static description of one multiplexed operation.
///
/// # Invariants
/// - `name` is unique within its tool.
/// - Every entry in `required` and `optional` is a declared input property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationSpec {
    /// Wire value of the `operation` discriminator.
    pub name: &'static str,
    /// Human action label used as error context (for example "adding MCP server").
    pub label: &'static str,
    /// Payload fields that must be present.
    pub required: &'static [&'static str],
    /// Payload fields the operation reads when present.
    pub optional: &'static [&'static str],
}

impl OperationSpec {
    /// Returns required then optional fields.
    pub fn fields(&self) -> impl Iterator<Item = &'static str> {
        self.required.iter().chain(self.optional.iter()).copied()
    }
}

// ============================================================================
// SECTION: Field Specs
// ============================================================================

/// Value shapes accepted for input fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Plain string.
    String,
    /// Non-empty string identifier.
    Identifier,
    /// Integer with an inclusive lower bound.
    Integer {
        /// Smallest accepted value.
        minimum: i64,
    },
    /// Boolean flag.
    Boolean,
    /// Free-form object forwarded to the backend.
    Object,
    /// Object whose values are strings.
    StringMap,
    /// Array of strings.
    StringArray,
    /// Array of `{role, content}` chat messages.
    Messages,
    /// `{limit, offset}` pagination window.
    Pagination,
    /// Agent selection filters for bulk operations.
    AgentFilters,
    /// Message search filters.
    MessageFilters,
}

impl FieldKind {
    /// Builds the JSON schema for this field kind.
    #[must_use]
    pub fn schema(self, description: &str) -> Value {
        match self {
            Self::String => json!({ "type": "string", "description": description }),
            Self::Identifier => json!({
                "type": "string",
                "minLength": 1,
                "not": { "enum": [".", ".."] },
                "description": description
            }),
            Self::Integer {
                minimum,
            } => json!({ "type": "integer", "minimum": minimum, "description": description }),
            Self::Boolean => json!({ "type": "boolean", "description": description }),
            Self::Object => json!({
                "type": "object",
                "description": description,
                "additionalProperties": true
            }),
            Self::StringMap => json!({
                "type": "object",
                "description": description,
                "additionalProperties": { "type": "string" }
            }),
            Self::StringArray => json!({
                "type": "array",
                "description": description,
                "items": { "type": "string" }
            }),
            Self::Messages => json!({
                "type": "array",
                "description": description,
                "minItems": 1,
                "items": {
                    "type": "object",
                    "properties": {
                        "role": { "type": "string", "enum": ["user", "system", "assistant"] },
                        "content": { "type": "string" }
                    },
                    "required": ["role", "content"],
                    "additionalProperties": false
                }
            }),
            Self::Pagination => json!({
                "type": "object",
                "description": description,
                "properties": {
                    "limit": { "type": "integer", "minimum": 1, "maximum": 1000 },
                    "offset": { "type": "integer", "minimum": 0 }
                },
                "additionalProperties": false
            }),
            Self::AgentFilters => json!({
                "type": "object",
                "description": description,
                "properties": {
                    "agent_name_filter": { "type": "string" },
                    "agent_tag_filter": { "type": "string" },
                    "agent_ids": { "type": "array", "items": { "type": "string" } }
                },
                "additionalProperties": false
            }),
            Self::MessageFilters => json!({
                "type": "object",
                "description": description,
                "properties": {
                    "start_date": { "type": "string" },
                    "end_date": { "type": "string" },
                    "role": { "type": "string" }
                },
                "additionalProperties": false
            }),
        }
    }
}

/// Input field declaration shared by all operations of one tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Property name in the arguments object.
    pub name: &'static str,
    /// Accepted value shape.
    pub kind: FieldKind,
    /// Client-facing description.
    pub description: &'static str,
}

impl FieldSpec {
    /// Creates a field spec.
    #[must_use]
    pub const fn new(name: &'static str, kind: FieldKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
        }
    }
}

/// Value shapes produced in tool outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// String value.
    String,
    /// Non-negative integer.
    Integer,
    /// Boolean flag.
    Boolean,
    /// Raw backend payload of any shape.
    Detail,
    /// Array of strings.
    StringArray,
    /// Array of records projected to the listed fields.
    Records(&'static [&'static str]),
}

impl OutputKind {
    /// Builds the JSON schema for this output kind.
    #[must_use]
    pub fn schema(self, description: &str) -> Value {
        match self {
            Self::String => json!({ "type": "string", "description": description }),
            Self::Integer => json!({ "type": "integer", "minimum": 0, "description": description }),
            Self::Boolean => json!({ "type": "boolean", "description": description }),
            Self::Detail => json!({ "description": description }),
            Self::StringArray => json!({
                "type": "array",
                "description": description,
                "items": { "type": "string" }
            }),
            Self::Records(fields) => {
                let mut properties = serde_json::Map::new();
                for field in fields {
                    let schema =
                        if *field == "id" { json!({ "type": "string" }) } else { json!({}) };
                    properties.insert((*field).to_string(), schema);
                }
                json!({
                    "type": "array",
                    "description": description,
                    "items": {
                        "type": "object",
                        "properties": properties,
                        "additionalProperties": false
                    }
                })
            }
        }
    }
}

/// Output field declaration shared by all operations of one tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputField {
    /// Property name in the result object.
    pub name: &'static str,
    /// Produced value shape.
    pub kind: OutputKind,
    /// Client-facing description.
    pub description: &'static str,
}

impl OutputField {
    /// Creates an output field declaration.
    #[must_use]
    pub const fn new(name: &'static str, kind: OutputKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
        }
    }
}

// ============================================================================
// SECTION: Descriptors
// ============================================================================

/// Full tool descriptor held by the registry.
///
/// # Invariants
/// - For consolidated tools the input schema's `operation` enum lists exactly
///   the names in `operations`.
/// - Legacy alias descriptors carry no operations.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON schema for tool arguments.
    pub input_schema: Value,
    /// JSON schema for tool results.
    pub output_schema: Value,
    /// Operation catalog in enum order.
    pub operations: Vec<OperationSpec>,
}

impl ToolDescriptor {
    /// Looks up an operation by wire name.
    #[must_use]
    pub fn operation(&self, name: &str) -> Option<&OperationSpec> {
        self.operations.iter().find(|spec| spec.name == name)
    }

    /// Returns the operation names in enum order.
    #[must_use]
    pub fn operation_names(&self) -> Vec<&'static str> {
        self.operations.iter().map(|spec| spec.name).collect()
    }

    /// Returns the listing shape exposed through `tools/list`.
    #[must_use]
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
            output_schema: self.output_schema.clone(),
        }
    }
}

/// Tool definition shape used by MCP tool listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// MCP tool name.
    pub name: String,
    /// Tool description for clients.
    pub description: String,
    /// JSON schema for tool input.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
    /// JSON schema for tool output.
    #[serde(rename = "outputSchema")]
    pub output_schema: Value,
}

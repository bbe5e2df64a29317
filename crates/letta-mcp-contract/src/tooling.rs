// crates/letta-mcp-contract/src/tooling.rs
// ============================================================================
// Module: MCP Tool Descriptors
// Description: Canonical consolidated tool descriptors for Letta MCP.
// Purpose: Build input/output schemas from the operation and field catalogs.
// Dependencies: serde_json, crate::fields, crate::operations, crate::types
// ============================================================================

//! ## Overview
//! Every consolidated tool is described by its field catalog, output catalog,
//! and operation enum. Input schemas are closed objects whose `operation`
//! enum is generated from the operation enum; per-operation required fields
//! are expressed as `if`/`then` clauses so a missing field is reported by
//! name. Output schemas are closed objects requiring `success` and
//! `operation`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::fields;
use crate::operations::AgentOperation;
use crate::operations::FileFolderOperation;
use crate::operations::JobOperation;
use crate::operations::McpOperation;
use crate::operations::MemoryOperation;
use crate::operations::SourceOperation;
use crate::operations::ToolManagerOperation;
use crate::types::FieldSpec;
use crate::types::OperationSpec;
use crate::types::OutputField;
use crate::types::ToolDescriptor;
use crate::types::ToolName;

/// JSON Schema dialect declared on every top-level schema.
pub const SCHEMA_DIALECT: &str = "https://json-schema.org/draft/2020-12/schema";

// ============================================================================
// SECTION: Tool Descriptors
// ============================================================================

/// Returns the consolidated tool descriptors in canonical order.
///
/// The order matches [`ToolName::all`] and is preserved in `tools/list`.
#[must_use]
pub fn tool_descriptors() -> Vec<ToolDescriptor> {
    ToolName::all().iter().map(|tool| tool_descriptor(*tool)).collect()
}

/// Builds the descriptor for one consolidated tool.
#[must_use]
pub fn tool_descriptor(tool: ToolName) -> ToolDescriptor {
    match tool {
        ToolName::LettaAgentAdvanced => build_descriptor(
            tool,
            "Manage Letta agents: lifecycle (list, create, get, update, delete, clone, \
             bulk_delete), import/export, messaging (send_message, stream, async_message, \
             cancel_message, preview_payload), history (search_messages, get_message, \
             reset_messages, summarize), and inspection (list_tools, get_config, context, count).",
            fields::AGENT_FIELDS,
            &AgentOperation::specs(),
            fields::AGENT_OUTPUTS,
        ),
        ToolName::LettaMemoryUnified => build_descriptor(
            tool,
            "Manage agent memory: core memory blocks (read, update, attach, detach, create, \
             list) and archival passages (search, list, create, update, delete).",
            fields::MEMORY_FIELDS,
            &MemoryOperation::specs(),
            fields::MEMORY_OUTPUTS,
        ),
        ToolName::LettaToolManager => build_descriptor(
            tool,
            "Manage Letta tools: CRUD and upsert, attach/detach to agents, bulk attach, \
             generation from prompts or source, sandboxed runs, and base tool installation.",
            fields::TOOL_MANAGER_FIELDS,
            &ToolManagerOperation::specs(),
            fields::TOOL_MANAGER_OUTPUTS,
        ),
        ToolName::LettaSourceManager => build_descriptor(
            tool,
            "Manage data sources: CRUD, counting, agent attachment, file upload and deletion, \
             file and folder listings.",
            fields::SOURCE_FIELDS,
            &SourceOperation::specs(),
            fields::SOURCE_OUTPUTS,
        ),
        ToolName::LettaJobMonitor => build_descriptor(
            tool,
            "Inspect and cancel background jobs.",
            fields::JOB_FIELDS,
            &JobOperation::specs(),
            fields::JOB_OUTPUTS,
        ),
        ToolName::LettaFileFolderOps => build_descriptor(
            tool,
            "Manage files in an agent's context window and folder attachments.",
            fields::FILE_FOLDER_FIELDS,
            &FileFolderOperation::specs(),
            fields::FILE_FOLDER_OUTPUTS,
        ),
        ToolName::LettaMcpOps => build_descriptor(
            tool,
            "Manage MCP servers registered with Letta: add, update, delete, test, connect, \
             resync, list servers and their tools, execute server tools, and register them as \
             Letta tools.",
            fields::MCP_FIELDS,
            &McpOperation::specs(),
            fields::MCP_OUTPUTS,
        ),
    }
}

/// Assembles a descriptor from its catalogs.
fn build_descriptor(
    tool: ToolName,
    description: &str,
    input_fields: &[FieldSpec],
    operations: &[OperationSpec],
    output_fields: &[OutputField],
) -> ToolDescriptor {
    ToolDescriptor {
        name: tool.as_str().to_string(),
        description: description.to_string(),
        input_schema: tool_input_schema(input_fields, operations),
        output_schema: tool_output_schema(output_fields, operations),
        operations: operations.to_vec(),
    }
}

// ============================================================================
// SECTION: Schema Builders
// ============================================================================

/// Builds the discriminated input schema for a consolidated tool.
#[must_use]
pub fn tool_input_schema(input_fields: &[FieldSpec], operations: &[OperationSpec]) -> Value {
    let names: Vec<Value> =
        operations.iter().map(|spec| Value::String(spec.name.to_string())).collect();
    let mut properties = Map::new();
    properties.insert(
        String::from("operation"),
        json!({
            "type": "string",
            "enum": names,
            "description": "Operation to perform."
        }),
    );
    for field in input_fields.iter().chain(std::iter::once(&fields::REQUEST_HEARTBEAT)) {
        properties.insert(field.name.to_string(), field.kind.schema(field.description));
    }
    let clauses: Vec<Value> = operations
        .iter()
        .filter(|spec| !spec.required.is_empty())
        .map(|spec| {
            json!({
                "if": {
                    "properties": { "operation": { "const": spec.name } },
                    "required": ["operation"]
                },
                "then": { "required": spec.required }
            })
        })
        .collect();
    let mut schema = object_schema(Value::Object(properties), &["operation"]);
    if !clauses.is_empty()
        && let Value::Object(map) = &mut schema
    {
        map.insert(String::from("allOf"), Value::Array(clauses));
    }
    with_schema(schema)
}

/// Builds the closed output schema for a consolidated tool.
#[must_use]
pub fn tool_output_schema(output_fields: &[OutputField], operations: &[OperationSpec]) -> Value {
    let names: Vec<Value> =
        operations.iter().map(|spec| Value::String(spec.name.to_string())).collect();
    let mut properties = Map::new();
    properties.insert(
        String::from("success"),
        json!({ "type": "boolean", "description": "True when every step succeeded." }),
    );
    properties.insert(
        String::from("operation"),
        json!({ "type": "string", "enum": names, "description": "Executed operation." }),
    );
    properties.insert(
        String::from("message"),
        json!({ "type": "string", "description": "Human-readable summary." }),
    );
    for field in output_fields {
        properties.insert(field.name.to_string(), field.kind.schema(field.description));
    }
    with_schema(object_schema(Value::Object(properties), &["success", "operation"]))
}

/// Builds a closed object schema without the `$schema` annotation.
#[must_use]
pub fn object_schema(properties: Value, required: &[&str]) -> Value {
    let required_values: Vec<Value> =
        required.iter().map(|value| Value::String((*value).to_string())).collect();
    json!({
        "type": "object",
        "required": required_values,
        "properties": properties,
        "additionalProperties": false
    })
}

/// Adds a `$schema` header to a top-level JSON schema.
#[must_use]
pub fn with_schema(schema: Value) -> Value {
    let Value::Object(mut map) = schema else {
        return schema;
    };
    map.insert(String::from("$schema"), Value::String(String::from(SCHEMA_DIALECT)));
    Value::Object(map)
}

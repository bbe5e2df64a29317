// crates/letta-mcp-client/src/normalize.rs
// ============================================================================
// Module: List Normalization
// Description: Per-entity normalization of backend list response shapes.
// Purpose: Keep response shape sniffing in one tested place.
// Dependencies: serde_json, thiserror
// ============================================================================

//! ## Overview
//! Letta list endpoints answer with a bare array, or with an object that
//! wraps the array under an entity-specific field. The MCP server listing may
//! also be an object keyed by server name. [`normalize_list`] reduces all of
//! these to an ordered `Vec<Value>`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Entity kinds with a list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// Agents.
    Agents,
    /// Tools.
    Tools,
    /// Messages.
    Messages,
    /// Memory blocks.
    Blocks,
    /// Archival passages.
    Passages,
    /// Data sources.
    Sources,
    /// Files.
    Files,
    /// Folders.
    Folders,
    /// Jobs.
    Jobs,
    /// MCP servers.
    McpServers,
    /// Tools exposed by one MCP server.
    McpTools,
}

impl EntityKind {
    /// Returns a stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Agents => "agents",
            Self::Tools => "tools",
            Self::Messages => "messages",
            Self::Blocks => "blocks",
            Self::Passages => "passages",
            Self::Sources => "sources",
            Self::Files => "files",
            Self::Folders => "folders",
            Self::Jobs => "jobs",
            Self::McpServers => "mcp servers",
            Self::McpTools => "mcp tools",
        }
    }

    /// Wrapper fields probed, in order, when the body is an object.
    const fn wrapper_fields(self) -> &'static [&'static str] {
        match self {
            Self::Agents => &["agents", "items", "data"],
            Self::Tools | Self::McpTools => &["tools", "items", "data"],
            Self::Messages => &["messages", "items", "data"],
            Self::Blocks => &["blocks", "items", "data"],
            Self::Passages => &["passages", "results", "items", "data"],
            Self::Sources => &["sources", "items", "data"],
            Self::Files => &["files", "items", "data"],
            Self::Folders => &["folders", "sources", "items", "data"],
            Self::Jobs => &["jobs", "items", "data"],
            Self::McpServers => &["servers", "mcp_servers", "items", "data"],
        }
    }
}

/// A list body matched none of the known shapes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unexpected {kind} list shape: {detail}")]
pub struct ShapeError {
    /// Entity label.
    pub kind: &'static str,
    /// What was found instead.
    pub detail: String,
}

// ============================================================================
// SECTION: Normalization
// ============================================================================

/// Reduces a list response to an ordered sequence of records.
///
/// `null` is treated as an empty list.
///
/// # Errors
///
/// Returns [`ShapeError`] when the body is neither an array nor an object
/// carrying one of the entity's wrapper fields.
pub fn normalize_list(kind: EntityKind, body: Value) -> Result<Vec<Value>, ShapeError> {
    match body {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items),
        Value::Object(mut object) => {
            for field in kind.wrapper_fields() {
                if matches!(object.get(*field), Some(Value::Array(_)))
                    && let Some(Value::Array(items)) = object.remove(*field)
                {
                    return Ok(items);
                }
            }
            if kind == EntityKind::McpServers {
                return servers_from_map(object);
            }
            let fields: Vec<&str> = object.keys().map(String::as_str).collect();
            Err(ShapeError {
                kind: kind.as_str(),
                detail: format!("object with fields [{}]", fields.join(", ")),
            })
        }
        other => Err(ShapeError {
            kind: kind.as_str(),
            detail: format!("{} value", json_type_name(&other)),
        }),
    }
}

/// Converts a name-keyed server map into records carrying `server_name`.
fn servers_from_map(object: Map<String, Value>) -> Result<Vec<Value>, ShapeError> {
    let mut records = Vec::with_capacity(object.len());
    for (name, config) in object {
        let Value::Object(mut record) = config else {
            return Err(ShapeError {
                kind: EntityKind::McpServers.as_str(),
                detail: format!("server {name} is not an object"),
            });
        };
        record.entry("server_name").or_insert_with(|| Value::String(name));
        records.push(Value::Object(record));
    }
    Ok(records)
}

/// Returns the JSON type name of a value.
const fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

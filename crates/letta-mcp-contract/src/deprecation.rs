// crates/letta-mcp-contract/src/deprecation.rs
// ============================================================================
// Module: Legacy Tool Aliases
// Description: Deprecation entries mapping legacy tool names to operations.
// Purpose: Keep single-purpose tool names callable while steering clients.
// Dependencies: serde_json, crate::registry, crate::types
// ============================================================================

//! ## Overview
//! Each [`DeprecationEntry`] routes a legacy tool name to one operation of a
//! consolidated tool, with an optional payload remap. The
//! [`DeprecationTable`] is checked against the [`SchemaRegistry`] at startup
//! and derives a closed input schema for every alias from the target
//! operation's field list. [`DeprecationTable::annotate`] is a pure listing
//! transform; dispatch never sees annotated descriptors.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::fields;
use crate::registry::RegistryError;
use crate::registry::SchemaRegistry;
use crate::registry::check_schema_dialect;
use crate::tooling::object_schema;
use crate::tooling::with_schema;
use crate::types::ToolDescriptor;
use crate::types::ToolName;

/// Prefix shared by every migration notice.
pub const MIGRATION_NOTICE_PREFIX: &str = "[DEPRECATED]";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Payload transformation applied to one legacy field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRemap {
    /// Move the value from `legacy` to `target` unchanged.
    Rename {
        /// Field name accepted by the legacy tool.
        legacy: &'static str,
        /// Field name expected by the target operation.
        target: &'static str,
    },
    /// Wrap a plain string as a single user chat message list.
    UserMessage {
        /// Field name accepted by the legacy tool.
        legacy: &'static str,
        /// Field name expected by the target operation.
        target: &'static str,
    },
}

impl FieldRemap {
    /// Returns the legacy field name.
    #[must_use]
    pub const fn legacy(self) -> &'static str {
        match self {
            Self::Rename {
                legacy,
                ..
            }
            | Self::UserMessage {
                legacy,
                ..
            } => legacy,
        }
    }

    /// Returns the target field name.
    #[must_use]
    pub const fn target(self) -> &'static str {
        match self {
            Self::Rename {
                target,
                ..
            }
            | Self::UserMessage {
                target,
                ..
            } => target,
        }
    }
}

/// Legacy tool name routed to a consolidated operation.
///
/// # Invariants
/// - `tool`/`operation` name a registered operation once the entry is
///   accepted by [`DeprecationTable::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeprecationEntry {
    /// Legacy tool name.
    pub legacy_name: &'static str,
    /// Replacement consolidated tool.
    pub tool: ToolName,
    /// Replacement operation.
    pub operation: &'static str,
    /// Human note appended to the migration notice.
    pub note: &'static str,
    /// Field remaps applied before dispatch.
    pub remaps: &'static [FieldRemap],
}

impl DeprecationEntry {
    /// Returns the migration notice prefixed to the legacy description.
    #[must_use]
    pub fn migration_notice(&self) -> String {
        format!(
            "{MIGRATION_NOTICE_PREFIX} Use {} with operation \"{}\" instead. {}",
            self.tool, self.operation, self.note
        )
    }

    /// Converts legacy arguments into consolidated tool arguments.
    #[must_use]
    pub fn remap_arguments(&self, legacy: Map<String, Value>) -> Map<String, Value> {
        let mut out = Map::new();
        for (key, value) in legacy {
            match self.remaps.iter().find(|remap| remap.legacy() == key) {
                Some(FieldRemap::Rename {
                    target,
                    ..
                }) => {
                    out.insert((*target).to_string(), value);
                }
                Some(FieldRemap::UserMessage {
                    target,
                    ..
                }) => {
                    out.insert(
                        (*target).to_string(),
                        json!([{ "role": "user", "content": value }]),
                    );
                }
                None => {
                    out.insert(key, value);
                }
            }
        }
        out.insert(String::from("operation"), Value::String(self.operation.to_string()));
        out
    }

    /// Returns the legacy name for a target field and its remap, if any.
    fn legacy_field(&self, target: &'static str) -> (&'static str, Option<FieldRemap>) {
        self.remaps
            .iter()
            .find(|remap| remap.target() == target)
            .map_or((target, None), |remap| (remap.legacy(), Some(*remap)))
    }
}

// ============================================================================
// SECTION: Table
// ============================================================================

/// Startup-validated legacy alias table.
///
/// # Invariants
/// - Every entry targets a registered tool and operation.
/// - Every derived legacy descriptor has a closed input schema.
#[derive(Debug, Clone, Default)]
pub struct DeprecationTable {
    /// Entries keyed by legacy name.
    entries: BTreeMap<&'static str, DeprecationEntry>,
    /// Derived, unannotated legacy descriptors in entry order.
    descriptors: Vec<ToolDescriptor>,
}

impl DeprecationTable {
    /// Validates entries against the registry and derives their descriptors.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidAlias`] when an entry collides with a
    /// registered tool, repeats a legacy name, or targets an operation or
    /// field the registry does not declare.
    pub fn new(
        entries: Vec<DeprecationEntry>,
        registry: &SchemaRegistry,
    ) -> Result<Self, RegistryError> {
        let mut table = Self::default();
        for entry in entries {
            let invalid = |detail: String| RegistryError::InvalidAlias {
                legacy: entry.legacy_name.to_string(),
                detail,
            };
            if registry.get(entry.legacy_name).is_some() {
                return Err(invalid("collides with a consolidated tool".to_string()));
            }
            if table.entries.contains_key(entry.legacy_name) {
                return Err(invalid("declared more than once".to_string()));
            }
            let target = registry
                .get(entry.tool.as_str())
                .ok_or_else(|| invalid(format!("target tool {} is not registered", entry.tool)))?;
            let spec = target.operation(entry.operation).ok_or_else(|| {
                invalid(format!("{} has no operation {}", entry.tool, entry.operation))
            })?;
            let target_properties = target
                .input_schema
                .get("properties")
                .and_then(Value::as_object)
                .ok_or_else(|| invalid("target input schema has no properties".to_string()))?;
            for remap in entry.remaps {
                if !spec.fields().any(|field| field == remap.target()) {
                    return Err(invalid(format!(
                        "remap target {} is not a field of {}.{}",
                        remap.target(),
                        entry.tool,
                        entry.operation
                    )));
                }
            }
            let mut properties = Map::new();
            let mut required = Vec::new();
            for field in spec.fields() {
                let (legacy, remap) = entry.legacy_field(field);
                let schema = match remap {
                    Some(FieldRemap::UserMessage {
                        ..
                    }) => json!({
                        "type": "string",
                        "description": "Message text sent as a single user message."
                    }),
                    _ => target_properties
                        .get(field)
                        .cloned()
                        .ok_or_else(|| invalid(format!("target field {field} is undeclared")))?,
                };
                properties.insert(legacy.to_string(), schema);
                if spec.required.contains(&field) {
                    required.push(legacy);
                }
            }
            properties.insert(
                fields::REQUEST_HEARTBEAT.name.to_string(),
                fields::REQUEST_HEARTBEAT.kind.schema(fields::REQUEST_HEARTBEAT.description),
            );
            let input_schema = with_schema(object_schema(Value::Object(properties), &required));
            check_schema_dialect(entry.legacy_name, &input_schema)?;
            table.descriptors.push(ToolDescriptor {
                name: entry.legacy_name.to_string(),
                description: format!(
                    "Legacy alias for {} operation \"{}\". {}",
                    entry.tool, entry.operation, entry.note
                ),
                input_schema,
                output_schema: target.output_schema.clone(),
                operations: Vec::new(),
            });
            table.entries.insert(entry.legacy_name, entry);
        }
        Ok(table)
    }

    /// Builds the table of built-in legacy aliases.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when a built-in alias is inconsistent.
    pub fn builtin(registry: &SchemaRegistry) -> Result<Self, RegistryError> {
        Self::new(legacy_entries(), registry)
    }

    /// Looks up an entry by legacy name.
    #[must_use]
    pub fn entry(&self, legacy_name: &str) -> Option<&DeprecationEntry> {
        self.entries.get(legacy_name)
    }

    /// Looks up the derived (unannotated) descriptor of a legacy alias.
    #[must_use]
    pub fn descriptor(&self, legacy_name: &str) -> Option<&ToolDescriptor> {
        self.descriptors.iter().find(|descriptor| descriptor.name == legacy_name)
    }

    /// Returns derived legacy descriptors in entry order.
    #[must_use]
    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    /// Returns the number of aliases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no aliases are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the descriptor with a migration notice when it names an alias.
    #[must_use]
    pub fn annotate(&self, descriptor: &ToolDescriptor) -> ToolDescriptor {
        let mut annotated = descriptor.clone();
        if let Some(entry) = self.entries.get(descriptor.name.as_str()) {
            annotated.description =
                format!("{} {}", entry.migration_notice().trim_end(), descriptor.description);
        }
        annotated
    }
}

// ============================================================================
// SECTION: Built-in Aliases
// ============================================================================

/// Returns the built-in legacy aliases.
#[must_use]
pub fn legacy_entries() -> Vec<DeprecationEntry> {
    vec![
        alias("list_agents", ToolName::LettaAgentAdvanced, "list", "", &[]),
        alias("create_agent", ToolName::LettaAgentAdvanced, "create", "", &[]),
        alias("retrieve_agent", ToolName::LettaAgentAdvanced, "get", "", &[]),
        alias("delete_agent", ToolName::LettaAgentAdvanced, "delete", "", &[]),
        alias(
            "prompt_agent",
            ToolName::LettaAgentAdvanced,
            "send_message",
            "Pass messages as [{role, content}] instead of a single message string.",
            &[FieldRemap::UserMessage {
                legacy: "message",
                target: "messages",
            }],
        ),
        alias("list_agent_tools", ToolName::LettaAgentAdvanced, "list_tools", "", &[]),
        alias("list_memory_blocks", ToolName::LettaMemoryUnified, "list_blocks", "", &[]),
        alias("create_memory_block", ToolName::LettaMemoryUnified, "create_block", "", &[]),
        alias("read_memory_block", ToolName::LettaMemoryUnified, "get_block", "", &[]),
        alias("update_memory_block", ToolName::LettaMemoryUnified, "update_block", "", &[]),
        alias("attach_memory_block", ToolName::LettaMemoryUnified, "attach_block", "", &[]),
        alias("list_passages", ToolName::LettaMemoryUnified, "list_passages", "", &[]),
        alias("create_passage", ToolName::LettaMemoryUnified, "create_passage", "", &[]),
        alias("list_mcp_servers", ToolName::LettaMcpOps, "list_servers", "", &[]),
        alias(
            "list_mcp_tools_by_server",
            ToolName::LettaMcpOps,
            "list_tools",
            "mcp_server_name is now server_name.",
            &[FieldRemap::Rename {
                legacy: "mcp_server_name",
                target: "server_name",
            }],
        ),
        alias(
            "add_mcp_tool_to_letta",
            ToolName::LettaMcpOps,
            "register_tool",
            "mcp_server_name/mcp_tool_name are now server_name/tool_name.",
            &[
                FieldRemap::Rename {
                    legacy: "mcp_server_name",
                    target: "server_name",
                },
                FieldRemap::Rename {
                    legacy: "mcp_tool_name",
                    target: "tool_name",
                },
            ],
        ),
        alias("list_tools", ToolName::LettaToolManager, "list", "", &[]),
        alias("attach_tool", ToolName::LettaToolManager, "attach", "", &[]),
        alias("upload_tool", ToolName::LettaToolManager, "create", "", &[]),
    ]
}

/// Builds one deprecation entry.
const fn alias(
    legacy_name: &'static str,
    tool: ToolName,
    operation: &'static str,
    note: &'static str,
    remaps: &'static [FieldRemap],
) -> DeprecationEntry {
    DeprecationEntry {
        legacy_name,
        tool,
        operation,
        note,
        remaps,
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for alias remapping and annotation.
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions use unwrap/expect for clarity."
    )]

    use serde_json::json;

    use super::DeprecationTable;
    use super::MIGRATION_NOTICE_PREFIX;
    use crate::registry::SchemaRegistry;

    /// Builds the built-in registry and alias table.
    fn builtin() -> (SchemaRegistry, DeprecationTable) {
        let registry = SchemaRegistry::builtin().unwrap();
        let table = DeprecationTable::builtin(&registry).unwrap();
        (registry, table)
    }

    /// Renamed fields move to their target names and the operation is fixed.
    #[test]
    fn remap_renames_fields_and_sets_operation() {
        let (_, table) = builtin();
        let entry = table.entry("add_mcp_tool_to_letta").unwrap();
        let args = json!({ "mcp_server_name": "fs", "mcp_tool_name": "read" });
        let remapped = entry.remap_arguments(args.as_object().unwrap().clone());
        assert_eq!(remapped.get("server_name"), Some(&json!("fs")));
        assert_eq!(remapped.get("tool_name"), Some(&json!("read")));
        assert_eq!(remapped.get("operation"), Some(&json!("register_tool")));
        assert!(!remapped.contains_key("mcp_server_name"));
    }

    /// A single message string becomes a one-element user message list.
    #[test]
    fn remap_wraps_user_message() {
        let (_, table) = builtin();
        let entry = table.entry("prompt_agent").unwrap();
        let args = json!({ "agent_id": "agent-1", "message": "hi" });
        let remapped = entry.remap_arguments(args.as_object().unwrap().clone());
        assert_eq!(remapped.get("messages"), Some(&json!([{ "role": "user", "content": "hi" }])));
    }

    /// Legacy schemas use legacy field names and keep the target requirements.
    #[test]
    fn legacy_schema_uses_legacy_field_names() {
        let (_, table) = builtin();
        let descriptor = table.descriptor("list_mcp_tools_by_server").unwrap();
        assert_eq!(descriptor.input_schema["required"], json!(["mcp_server_name"]));
        assert!(descriptor.input_schema["properties"].get("server_name").is_none());
        assert_eq!(descriptor.input_schema["additionalProperties"], json!(false));
    }

    /// Annotation prefixes aliases and leaves consolidated descriptors untouched.
    #[test]
    fn annotate_is_pure_and_alias_only() {
        let (registry, table) = builtin();
        let legacy = table.descriptor("list_mcp_servers").unwrap();
        let annotated = table.annotate(legacy);
        assert!(annotated.description.starts_with(MIGRATION_NOTICE_PREFIX));
        assert!(annotated.description.contains("letta_mcp_ops"));
        assert!(!legacy.description.starts_with(MIGRATION_NOTICE_PREFIX));
        let consolidated = registry.get("letta_mcp_ops").unwrap();
        assert_eq!(&table.annotate(consolidated), consolidated);
    }
}

// crates/letta-mcp-contract/src/registry.rs
// ============================================================================
// Module: Schema Registry
// Description: Immutable, startup-validated registry of tool descriptors.
// Purpose: Fail fast on schema drift before any request is served.
// Dependencies: serde_json, thiserror, crate::types
// ============================================================================

//! ## Overview
//! The registry is built once from static descriptors and is read-only
//! afterwards. Construction rejects duplicate operation names, operation
//! enums that disagree with the operation catalog, object schemas that leave
//! `additionalProperties` implicit, and list outputs whose records are open.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde_json::Value;
use thiserror::Error;

use crate::tooling::tool_descriptors;
use crate::types::ToolDescriptor;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Startup validation failures for descriptors and legacy aliases.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Two descriptors share a name.
    #[error("duplicate tool name: {0}")]
    DuplicateTool(String),
    /// The input schema has no `operation` enum.
    #[error("tool {0} input schema has no operation enum")]
    MissingOperationEnum(String),
    /// The `operation` enum lists a value twice.
    #[error("tool {tool} lists operation {operation} more than once")]
    DuplicateOperation {
        /// Tool name.
        tool: String,
        /// Repeated operation value.
        operation: String,
    },
    /// The `operation` enum and the operation catalog differ.
    #[error("tool {tool} operation enum does not match its catalog: {detail}")]
    OperationCatalogMismatch {
        /// Tool name.
        tool: String,
        /// Description of the difference.
        detail: String,
    },
    /// An object schema leaves `additionalProperties` implicit.
    #[error("tool {tool} schema at {path} must set additionalProperties explicitly")]
    ImplicitAdditionalProperties {
        /// Tool name.
        tool: String,
        /// JSON pointer to the offending node.
        path: String,
    },
    /// A list output allows undeclared record fields.
    #[error("tool {tool} output records at {path} must set additionalProperties to false")]
    OpenRecordSchema {
        /// Tool name.
        tool: String,
        /// JSON pointer to the offending node.
        path: String,
    },
    /// A required top-level output field is missing.
    #[error("tool {tool} output schema must require {field}")]
    MissingOutputRequirement {
        /// Tool name.
        tool: String,
        /// Missing required field.
        field: String,
    },
    /// An operation references an undeclared input property.
    #[error("tool {tool} operation {operation} references undeclared field {field}")]
    UndeclaredField {
        /// Tool name.
        tool: String,
        /// Operation name.
        operation: String,
        /// Missing property.
        field: String,
    },
    /// A legacy alias is inconsistent with the registry.
    #[error("legacy alias {legacy}: {detail}")]
    InvalidAlias {
        /// Legacy tool name.
        legacy: String,
        /// Description of the inconsistency.
        detail: String,
    },
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Read-only registry of consolidated tool descriptors.
///
/// # Invariants
/// - Every descriptor passed [`check_descriptor`].
/// - Names are unique; listing order is construction order.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    /// Descriptors in listing order.
    descriptors: Vec<ToolDescriptor>,
    /// Name to position in `descriptors`.
    index: BTreeMap<String, usize>,
}

impl SchemaRegistry {
    /// Builds a registry after validating every descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] for the first descriptor that violates a
    /// registry invariant.
    pub fn new(descriptors: Vec<ToolDescriptor>) -> Result<Self, RegistryError> {
        let mut index = BTreeMap::new();
        for (position, descriptor) in descriptors.iter().enumerate() {
            check_descriptor(descriptor)?;
            if index.insert(descriptor.name.clone(), position).is_some() {
                return Err(RegistryError::DuplicateTool(descriptor.name.clone()));
            }
        }
        Ok(Self {
            descriptors,
            index,
        })
    }

    /// Builds the registry of built-in consolidated tools.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when a built-in descriptor is malformed.
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::new(tool_descriptors())
    }

    /// Looks up a descriptor by tool name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).and_then(|position| self.descriptors.get(*position))
    }

    /// Returns descriptors in listing order.
    #[must_use]
    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    /// Returns the number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns true when no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

// ============================================================================
// SECTION: Checks
// ============================================================================

/// Validates one consolidated tool descriptor.
///
/// # Errors
///
/// Returns [`RegistryError`] describing the first violated invariant.
pub fn check_descriptor(descriptor: &ToolDescriptor) -> Result<(), RegistryError> {
    let tool = descriptor.name.as_str();
    let enum_values = operation_enum(&descriptor.input_schema)
        .ok_or_else(|| RegistryError::MissingOperationEnum(tool.to_string()))?;
    let mut seen = BTreeSet::new();
    for value in &enum_values {
        if !seen.insert(value.as_str()) {
            return Err(RegistryError::DuplicateOperation {
                tool: tool.to_string(),
                operation: value.clone(),
            });
        }
    }
    let catalog: BTreeSet<&str> = descriptor.operations.iter().map(|spec| spec.name).collect();
    if catalog.len() != descriptor.operations.len() {
        return Err(RegistryError::OperationCatalogMismatch {
            tool: tool.to_string(),
            detail: "operation catalog contains duplicates".to_string(),
        });
    }
    if catalog != seen {
        let missing: Vec<&str> = catalog.difference(&seen).copied().collect();
        let extra: Vec<&str> = seen.difference(&catalog).copied().collect();
        return Err(RegistryError::OperationCatalogMismatch {
            tool: tool.to_string(),
            detail: format!(
                "not in enum: [{}]; not in catalog: [{}]",
                missing.join(", "),
                extra.join(", ")
            ),
        });
    }
    let properties = descriptor.input_schema.get("properties").and_then(Value::as_object);
    for spec in &descriptor.operations {
        for field in spec.fields() {
            if !properties.is_some_and(|props| props.contains_key(field)) {
                return Err(RegistryError::UndeclaredField {
                    tool: tool.to_string(),
                    operation: spec.name.to_string(),
                    field: field.to_string(),
                });
            }
        }
    }
    check_schema_dialect(tool, &descriptor.input_schema)?;
    check_output_schema(tool, &descriptor.output_schema)
}

/// Validates an output schema: closed objects, closed records, and the
/// `success`/`operation` requirement.
///
/// # Errors
///
/// Returns [`RegistryError`] describing the first violated invariant.
pub fn check_output_schema(tool: &str, schema: &Value) -> Result<(), RegistryError> {
    check_schema_dialect(tool, schema)?;
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|values| values.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    for field in ["success", "operation"] {
        if !required.contains(&field) {
            return Err(RegistryError::MissingOutputRequirement {
                tool: tool.to_string(),
                field: field.to_string(),
            });
        }
    }
    if schema.get("additionalProperties") != Some(&Value::Bool(false)) {
        return Err(RegistryError::OpenRecordSchema {
            tool: tool.to_string(),
            path: String::from("/"),
        });
    }
    match find_open_record(schema, "") {
        Some(path) => Err(RegistryError::OpenRecordSchema {
            tool: tool.to_string(),
            path,
        }),
        None => Ok(()),
    }
}

/// Ensures every object node declares `additionalProperties`.
///
/// # Errors
///
/// Returns [`RegistryError::ImplicitAdditionalProperties`] naming the first
/// offending node.
pub fn check_schema_dialect(tool: &str, schema: &Value) -> Result<(), RegistryError> {
    match find_implicit_object(schema, "") {
        Some(path) => Err(RegistryError::ImplicitAdditionalProperties {
            tool: tool.to_string(),
            path,
        }),
        None => Ok(()),
    }
}

/// Returns the `operation` enum values of an input schema.
fn operation_enum(schema: &Value) -> Option<Vec<String>> {
    let values = schema.pointer("/properties/operation/enum")?.as_array()?;
    if values.is_empty() {
        return None;
    }
    values.iter().map(|value| value.as_str().map(str::to_string)).collect()
}

/// Returns true when a schema node declares an object type.
fn declares_object(node: &serde_json::Map<String, Value>) -> bool {
    match node.get("type") {
        Some(Value::String(kind)) => kind == "object",
        Some(Value::Array(kinds)) => kinds.iter().any(|kind| kind.as_str() == Some("object")),
        _ => false,
    }
}

/// Finds the first object node without explicit `additionalProperties`.
fn find_implicit_object(schema: &Value, path: &str) -> Option<String> {
    let node = schema.as_object()?;
    if declares_object(node) && !node.contains_key("additionalProperties") {
        return Some(if path.is_empty() { String::from("/") } else { path.to_string() });
    }
    children(node, path).into_iter().find_map(|(child, child_path)| {
        find_implicit_object(child, &child_path)
    })
}

/// Finds the first array whose object items allow undeclared properties.
fn find_open_record(schema: &Value, path: &str) -> Option<String> {
    let node = schema.as_object()?;
    if let Some(items) = node.get("items").and_then(Value::as_object)
        && declares_object(items)
        && items.get("additionalProperties") != Some(&Value::Bool(false))
    {
        return Some(format!("{path}/items"));
    }
    children(node, path).into_iter().find_map(|(child, child_path)| {
        find_open_record(child, &child_path)
    })
}

/// Enumerates subschemas of a schema node with their JSON pointers.
fn children<'a>(
    node: &'a serde_json::Map<String, Value>,
    path: &str,
) -> Vec<(&'a Value, String)> {
    let mut out = Vec::new();
    for keyword in ["properties", "patternProperties", "$defs", "definitions"] {
        if let Some(map) = node.get(keyword).and_then(Value::as_object) {
            for (name, child) in map {
                out.push((child, format!("{path}/{keyword}/{name}")));
            }
        }
    }
    for keyword in ["items", "additionalProperties", "if", "then", "else", "not", "contains"] {
        match node.get(keyword) {
            Some(child @ Value::Object(_)) => out.push((child, format!("{path}/{keyword}"))),
            Some(Value::Array(list)) => {
                for (position, child) in list.iter().enumerate() {
                    out.push((child, format!("{path}/{keyword}/{position}")));
                }
            }
            _ => {}
        }
    }
    for keyword in ["allOf", "anyOf", "oneOf", "prefixItems"] {
        if let Some(list) = node.get(keyword).and_then(Value::as_array) {
            for (position, child) in list.iter().enumerate() {
                out.push((child, format!("{path}/{keyword}/{position}")));
            }
        }
    }
    out
}

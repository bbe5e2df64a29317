// crates/letta-mcp/src/request.rs
// ============================================================================
// Module: Operation Requests
// Description: Validated per-call argument view handed to tool handlers.
// Purpose: Typed field access with missing-field errors that name the field.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! An [`OperationRequest`] is built only after input validation succeeded,
//! so accessors fail only when a handler reads a field the schema left
//! optional but the operation needs. Those failures still name the field.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::de::DeserializeOwned;
use serde_json::Map;
use serde_json::Value;

use crate::errors::ToolError;

/// Default page size for list operations without an explicit limit.
pub const DEFAULT_LIST_LIMIT: u64 = 50;

// ============================================================================
// SECTION: Types
// ============================================================================

/// `{limit, offset}` window requested by a list operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Maximum number of items.
    pub limit: u64,
    /// Items to skip.
    pub offset: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
        }
    }
}

/// Validated arguments of one tool call.
///
/// # Invariants
/// - `operation` is a member of the tool's operation enum.
/// - `args` passed the tool's input schema and never contains `operation`.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationRequest {
    /// Consolidated tool name.
    pub tool: String,
    /// Operation wire value.
    pub operation: String,
    /// Payload fields.
    args: Map<String, Value>,
}

impl OperationRequest {
    /// Builds a request from validated arguments.
    #[must_use]
    pub fn new(
        tool: impl Into<String>,
        operation: impl Into<String>,
        mut args: Map<String, Value>,
    ) -> Self {
        args.remove("operation");
        args.remove("request_heartbeat");
        Self {
            tool: tool.into(),
            operation: operation.into(),
            args,
        }
    }

    /// Returns the raw payload fields.
    #[must_use]
    pub const fn args(&self) -> &Map<String, Value> {
        &self.args
    }

    /// Returns true when the field is present and not null.
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.opt_value(field).is_some()
    }

    /// Returns a field value when present and not null.
    #[must_use]
    pub fn opt_value(&self, field: &str) -> Option<&Value> {
        self.args.get(field).filter(|value| !value.is_null())
    }

    /// Returns a required field value.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::MissingField`] when the field is absent or null.
    pub fn value(&self, field: &str) -> Result<&Value, ToolError> {
        self.opt_value(field).ok_or_else(|| ToolError::MissingField(field.to_string()))
    }

    /// Returns a required string field.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::MissingField`] when absent and
    /// [`ToolError::InvalidParams`] when not a string.
    pub fn str(&self, field: &str) -> Result<&str, ToolError> {
        self.value(field)?
            .as_str()
            .ok_or_else(|| ToolError::InvalidParams(format!("{field} must be a string")))
    }

    /// Returns an optional string field.
    #[must_use]
    pub fn opt_str(&self, field: &str) -> Option<&str> {
        self.opt_value(field).and_then(Value::as_str)
    }

    /// Returns an optional unsigned integer field.
    #[must_use]
    pub fn opt_u64(&self, field: &str) -> Option<u64> {
        self.opt_value(field).and_then(Value::as_u64)
    }

    /// Returns an optional boolean field.
    #[must_use]
    pub fn opt_bool(&self, field: &str) -> Option<bool> {
        self.opt_value(field).and_then(Value::as_bool)
    }

    /// Returns a required array of strings.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::MissingField`] when absent and
    /// [`ToolError::InvalidParams`] when an entry is not a string.
    pub fn str_array(&self, field: &str) -> Result<Vec<String>, ToolError> {
        let values = self
            .value(field)?
            .as_array()
            .ok_or_else(|| ToolError::InvalidParams(format!("{field} must be an array")))?;
        values
            .iter()
            .map(|value| {
                value.as_str().map(str::to_string).ok_or_else(|| {
                    ToolError::InvalidParams(format!("{field} entries must be strings"))
                })
            })
            .collect()
    }

    /// Returns an optional array of strings; non-string entries are skipped.
    #[must_use]
    pub fn opt_str_array(&self, field: &str) -> Option<Vec<String>> {
        self.opt_value(field).and_then(Value::as_array).map(|values| {
            values.iter().filter_map(Value::as_str).map(str::to_string).collect()
        })
    }

    /// Returns a required object field.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::MissingField`] when absent and
    /// [`ToolError::InvalidParams`] when not an object.
    pub fn object(&self, field: &str) -> Result<&Map<String, Value>, ToolError> {
        self.value(field)?
            .as_object()
            .ok_or_else(|| ToolError::InvalidParams(format!("{field} must be an object")))
    }

    /// Decodes a required field into a typed value.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidParams`] naming the field when decoding fails.
    pub fn decode<T: DeserializeOwned>(&self, field: &str) -> Result<T, ToolError> {
        let value = self.value(field)?.clone();
        serde_json::from_value(value)
            .map_err(|err| ToolError::InvalidParams(format!("{field}: {err}")))
    }

    /// Returns the `pagination` window, or defaults.
    #[must_use]
    pub fn pagination(&self) -> Pagination {
        let defaults = Pagination::default();
        let Some(window) = self.opt_value("pagination") else {
            return defaults;
        };
        Pagination {
            limit: window.get("limit").and_then(Value::as_u64).unwrap_or(defaults.limit),
            offset: window.get("offset").and_then(Value::as_u64).unwrap_or(defaults.offset),
        }
    }

    /// Returns the `limit` field, or the default page size.
    #[must_use]
    pub fn limit(&self) -> u64 {
        self.opt_u64("limit").unwrap_or(DEFAULT_LIST_LIMIT)
    }

    /// Copies the listed fields, when present, into a new object.
    #[must_use]
    pub fn pick(&self, fields: &[&str]) -> Map<String, Value> {
        fields
            .iter()
            .filter_map(|field| {
                self.opt_value(field).map(|value| ((*field).to_string(), value.clone()))
            })
            .collect()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions use unwrap/expect for clarity."
    )]

    use serde_json::json;

    use super::OperationRequest;
    use super::Pagination;
    use crate::errors::ToolError;

    fn request(args: serde_json::Value) -> OperationRequest {
        let serde_json::Value::Object(map) = args else {
            return OperationRequest::new("letta_agent_advanced", "list", serde_json::Map::new());
        };
        OperationRequest::new("letta_agent_advanced", "list", map)
    }

    #[test]
    fn discriminator_and_heartbeat_are_stripped() {
        let request =
            request(json!({ "operation": "list", "request_heartbeat": true, "query": "a" }));
        assert_eq!(request.args().len(), 1);
        assert_eq!(request.opt_str("query"), Some("a"));
    }

    #[test]
    fn missing_and_null_fields_name_the_field() {
        let request = request(json!({ "agent_id": null }));
        assert_eq!(request.str("agent_id"), Err(ToolError::MissingField("agent_id".to_string())));
        assert!(!request.has("agent_id"));
    }

    #[test]
    fn pagination_fills_defaults() {
        let request = request(json!({ "pagination": { "offset": 10 } }));
        assert_eq!(request.pagination(), Pagination {
            limit: 50,
            offset: 10,
        });
    }

    #[test]
    fn pick_copies_only_present_fields() {
        let request = request(json!({ "name": "a", "tags": ["x"], "system": null }));
        let picked = request.pick(&["name", "system", "description", "tags"]);
        assert_eq!(serde_json::Value::Object(picked), json!({ "name": "a", "tags": ["x"] }));
    }
}

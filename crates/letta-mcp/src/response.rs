// crates/letta-mcp/src/response.rs
// ============================================================================
// Module: Operation Responses
// Description: Result envelope builder and record projection helpers.
// Purpose: Every handler result carries `success` and `operation` and only
//          declared record fields.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Handlers assemble results with [`OperationResponse`]. List fields are
//! projected onto the summary field lists declared in the contract so list
//! outputs always satisfy the closed record schemas.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Response Builder
// ============================================================================

/// Result object under construction.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationResponse {
    /// Fields accumulated so far.
    fields: Map<String, Value>,
}

impl OperationResponse {
    /// Starts a successful result for `operation`.
    #[must_use]
    pub fn ok(operation: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("success".to_string(), Value::Bool(true));
        fields.insert("operation".to_string(), Value::String(operation.to_string()));
        Self {
            fields,
        }
    }

    /// Overrides the success flag.
    #[must_use]
    pub fn success(mut self, success: bool) -> Self {
        self.fields.insert("success".to_string(), Value::Bool(success));
        self
    }

    /// Sets the human-readable summary.
    #[must_use]
    pub fn message(self, message: impl Into<String>) -> Self {
        self.with("message", Value::String(message.into()))
    }

    /// Sets a field.
    #[must_use]
    pub fn with(mut self, field: &str, value: Value) -> Self {
        self.fields.insert(field.to_string(), value);
        self
    }

    /// Sets a string field.
    #[must_use]
    pub fn with_str(self, field: &str, value: impl Into<String>) -> Self {
        self.with(field, Value::String(value.into()))
    }

    /// Sets a string field when a value is available.
    #[must_use]
    pub fn with_opt_str(self, field: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.with_str(field, value),
            None => self,
        }
    }

    /// Sets a list field projected to `record` and its `count`.
    #[must_use]
    pub fn with_records(self, field: &str, items: &[Value], record: &[&str]) -> Self {
        let records = project_all(items, record);
        let count = records.len();
        self.with(field, Value::Array(records)).with("count", Value::from(count))
    }

    /// Sets the raw backend payload.
    #[must_use]
    pub fn data(self, data: Value) -> Self {
        self.with("data", data)
    }

    /// Finishes the result.
    #[must_use]
    pub fn build(self) -> Value {
        Value::Object(self.fields)
    }
}

// ============================================================================
// SECTION: Projection
// ============================================================================

/// Keeps only the declared fields of one backend record.
///
/// Non-object entries project to an empty record.
#[must_use]
pub fn project(item: &Value, record: &[&str]) -> Value {
    let Some(object) = item.as_object() else {
        return Value::Object(Map::new());
    };
    let kept: Map<String, Value> = record
        .iter()
        .filter_map(|field| object.get(*field).map(|value| ((*field).to_string(), value.clone())))
        .collect();
    Value::Object(kept)
}

/// Projects every record in order.
#[must_use]
pub fn project_all(items: &[Value], record: &[&str]) -> Vec<Value> {
    items.iter().map(|item| project(item, record)).collect()
}

/// Reads a string identifier from a backend entity.
#[must_use]
pub fn entity_str<'a>(entity: &'a Value, field: &str) -> Option<&'a str> {
    entity.get(field).and_then(Value::as_str)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::OperationResponse;
    use super::project;

    #[test]
    fn envelope_always_has_success_and_operation() {
        let value = OperationResponse::ok("get").build();
        assert_eq!(value, json!({ "success": true, "operation": "get" }));
    }

    #[test]
    fn records_are_projected_and_counted() {
        let items = vec![json!({ "id": "a", "name": "n", "secret": 1 }), json!("junk")];
        let value =
            OperationResponse::ok("list").with_records("agents", &items, &["id", "name"]).build();
        assert_eq!(value["agents"], json!([{ "id": "a", "name": "n" }, {}]));
        assert_eq!(value["count"], json!(2));
    }

    #[test]
    fn projection_drops_undeclared_fields() {
        let projected = project(&json!({ "id": "x", "extra": true }), &["id", "label"]);
        assert_eq!(projected, json!({ "id": "x" }));
    }
}

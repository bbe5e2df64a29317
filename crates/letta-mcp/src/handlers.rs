// crates/letta-mcp/src/handlers.rs
// ============================================================================
// Module: Tool Handlers
// Description: Handler seam and the built-in handler set.
// Purpose: Bind every consolidated tool to one handler with a typed match.
// Dependencies: async-trait, letta-mcp-client, letta-mcp-contract
// ============================================================================

//! ## Overview
//! Each consolidated tool has one [`ToolHandler`]. Handlers parse the
//! validated operation into the tool's operation enum and match on it
//! exhaustively, so adding an operation without a handler arm fails to
//! compile. Handlers share nothing but the pooled [`BackendClient`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use letta_mcp_client::BackendClient;
use letta_mcp_client::BackendRequest;
use letta_mcp_client::EntityKind;
use letta_mcp_client::normalize_list;
use letta_mcp_contract::ToolName;
use serde_json::Value;

use crate::errors::ToolError;
use crate::request::OperationRequest;

pub mod agents;
pub mod files;
pub mod jobs;
pub mod mcp_ops;
pub mod memory;
pub mod sources;
pub mod tools;

pub use agents::AgentHandler;
pub use files::FileFolderHandler;
pub use jobs::JobHandler;
pub use mcp_ops::McpOpsHandler;
pub use memory::MemoryHandler;
pub use sources::SourceHandler;
pub use tools::ToolManagerHandler;

// ============================================================================
// SECTION: Handler Trait
// ============================================================================

/// Executes the operations of one consolidated tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Tool served by this handler.
    fn tool(&self) -> ToolName;

    /// Operation wire names this handler implements, in enum order.
    fn operations(&self) -> Vec<&'static str>;

    /// Runs one validated operation.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] for missing fields, unknown operations, and
    /// backend failures.
    async fn handle(
        &self,
        client: &BackendClient,
        request: OperationRequest,
    ) -> Result<Value, ToolError>;
}

/// Returns one handler per consolidated tool.
#[must_use]
pub fn builtin_handlers() -> Vec<Arc<dyn ToolHandler>> {
    vec![
        Arc::new(AgentHandler),
        Arc::new(MemoryHandler),
        Arc::new(ToolManagerHandler),
        Arc::new(SourceHandler),
        Arc::new(JobHandler),
        Arc::new(FileFolderHandler),
        Arc::new(McpOpsHandler),
    ]
}

// ============================================================================
// SECTION: Shared Helpers
// ============================================================================

/// Parses an operation value with a tool's operation enum.
pub(crate) fn parse_operation<T>(
    request: &OperationRequest,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, ToolError> {
    parse(&request.operation).ok_or_else(|| ToolError::UnknownOperation(request.operation.clone()))
}

/// Calls the backend and returns the decoded body.
pub(crate) async fn call(
    client: &BackendClient,
    label: &str,
    request: BackendRequest,
) -> Result<Value, ToolError> {
    client.call(label, request).await.map_err(ToolError::from)
}

/// Calls a list endpoint and normalizes the body into ordered entries.
pub(crate) async fn call_list(
    client: &BackendClient,
    label: &str,
    kind: EntityKind,
    request: BackendRequest,
) -> Result<Vec<Value>, ToolError> {
    let body = call(client, label, request).await?;
    Ok(normalize_list(kind, body)?)
}

/// Applies an offset/limit window to an already fetched list.
pub(crate) fn window(items: Vec<Value>, offset: u64, limit: u64) -> Vec<Value> {
    let skip = usize::try_from(offset).unwrap_or(usize::MAX);
    let take = usize::try_from(limit).unwrap_or(usize::MAX);
    items.into_iter().skip(skip).take(take).collect()
}

/// Reads a string array from a backend body, accepting bare strings or
/// records with a `file_name`/`name`/`id` field.
pub(crate) fn name_list(body: &Value) -> Vec<String> {
    body.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    item.as_str()
                        .or_else(|| item.get("file_name").and_then(Value::as_str))
                        .or_else(|| item.get("name").and_then(Value::as_str))
                        .or_else(|| item.get("id").and_then(Value::as_str))
                        .map(str::to_string)
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Turns bare identifier strings into `{id}` records.
pub(crate) fn id_records(items: Vec<Value>) -> Vec<Value> {
    items
        .into_iter()
        .map(|item| match item {
            Value::String(id) => serde_json::json!({ "id": id }),
            other => other,
        })
        .collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use letta_mcp_contract::ToolName;
    use serde_json::json;

    use super::builtin_handlers;
    use super::id_records;
    use super::name_list;
    use super::window;

    #[test]
    fn one_handler_per_tool() {
        let tools: BTreeSet<ToolName> =
            builtin_handlers().iter().map(|handler| handler.tool()).collect();
        assert_eq!(tools.len(), ToolName::all().len());
    }

    #[test]
    fn window_skips_then_takes() {
        let items = vec![json!(1), json!(2), json!(3), json!(4)];
        assert_eq!(window(items, 1, 2), vec![json!(2), json!(3)]);
    }

    #[test]
    fn name_lists_accept_strings_and_records() {
        let body = json!(["a.txt", { "file_name": "b.txt" }, { "id": "c" }, 7]);
        assert_eq!(name_list(&body), vec!["a.txt", "b.txt", "c"]);
        assert!(name_list(&json!(null)).is_empty());
    }

    #[test]
    fn bare_ids_become_records() {
        assert_eq!(id_records(vec![json!("agent-1")]), vec![json!({ "id": "agent-1" })]);
    }
}

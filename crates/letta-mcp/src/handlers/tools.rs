// crates/letta-mcp/src/handlers/tools.rs
// ============================================================================
// Module: Tool Manager Handler
// Description: Operations of `letta_tool_manager`.
// Purpose: Tool CRUD, agent attachment, generation, and sandboxed runs.
// Dependencies: letta-mcp-client, letta-mcp-contract, serde_json
// ============================================================================

//! ## Overview
//! `bulk_attach` attaches one tool to each listed agent in order and reports
//! per-agent failures; the result is unsuccessful when any attach failed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use letta_mcp_client::BackendClient;
use letta_mcp_client::BackendRequest;
use letta_mcp_client::EntityKind;
use letta_mcp_contract::ToolManagerOperation;
use letta_mcp_contract::ToolName;
use letta_mcp_contract::fields::FAILURE_RECORD;
use letta_mcp_contract::fields::TOOL_RECORD;
use serde_json::Value;
use serde_json::json;

use crate::errors::ToolError;
use crate::handlers::ToolHandler;
use crate::handlers::call;
use crate::handlers::call_list;
use crate::handlers::parse_operation;
use crate::request::OperationRequest;
use crate::response::OperationResponse;
use crate::response::entity_str;

/// Tool fields forwarded by `create`, `update`, and `upsert`.
const TOOL_FIELDS: &[&str] = &[
    "source_code",
    "description",
    "tags",
    "source_type",
    "json_schema",
    "args_json_schema",
    "return_char_limit",
];

/// Fields forwarded by `run_from_source`.
const RUN_FIELDS: &[&str] =
    &["source_code", "args", "env_vars", "name", "source_type", "args_json_schema"];

// ============================================================================
// SECTION: Handler
// ============================================================================

/// Handler for `letta_tool_manager`.
pub struct ToolManagerHandler;

#[async_trait]
impl ToolHandler for ToolManagerHandler {
    fn tool(&self) -> ToolName {
        ToolName::LettaToolManager
    }

    fn operations(&self) -> Vec<&'static str> {
        ToolManagerOperation::ALL.iter().map(|operation| operation.as_str()).collect()
    }

    async fn handle(
        &self,
        client: &BackendClient,
        request: OperationRequest,
    ) -> Result<Value, ToolError> {
        let operation = parse_operation(&request, ToolManagerOperation::parse)?;
        let call = ToolCall {
            client,
            request: &request,
            label: operation.spec().label,
            operation: operation.as_str(),
        };
        match operation {
            ToolManagerOperation::List => call.list().await,
            ToolManagerOperation::Get => call.get().await,
            ToolManagerOperation::Create => call.write(BackendRequest::post(["tools"])).await,
            ToolManagerOperation::Update => {
                let tool_id = request.str("tool_id")?;
                call.write(BackendRequest::patch(["tools", tool_id])).await
            }
            ToolManagerOperation::Delete => call.delete().await,
            ToolManagerOperation::Upsert => call.write(BackendRequest::put(["tools"])).await,
            ToolManagerOperation::Attach => call.attach(true).await,
            ToolManagerOperation::Detach => call.attach(false).await,
            ToolManagerOperation::BulkAttach => call.bulk_attach().await,
            ToolManagerOperation::GenerateFromPrompt => call.generate_from_prompt().await,
            ToolManagerOperation::GenerateSchema => call.generate_schema().await,
            ToolManagerOperation::RunFromSource => call.run_from_source().await,
            ToolManagerOperation::AddBaseTools => call.add_base_tools().await,
        }
    }
}

// ============================================================================
// SECTION: Operations
// ============================================================================

/// One tool manager operation in flight.
struct ToolCall<'a> {
    /// Shared backend client.
    client: &'a BackendClient,
    /// Validated arguments.
    request: &'a OperationRequest,
    /// Action label for backend failures.
    label: &'static str,
    /// Operation wire value echoed in the result.
    operation: &'static str,
}

impl ToolCall<'_> {
    /// Starts a successful result.
    fn ok(&self) -> OperationResponse {
        OperationResponse::ok(self.operation)
    }

    async fn list(&self) -> Result<Value, ToolError> {
        let request = BackendRequest::get(["tools"])
            .query("limit", self.request.limit())
            .query_opt("name", self.request.opt_str("name"));
        let tools = call_list(self.client, self.label, EntityKind::Tools, request).await?;
        Ok(self
            .ok()
            .message(format!("Found {} tools", tools.len()))
            .with_records("tools", &tools, TOOL_RECORD)
            .build())
    }

    async fn get(&self) -> Result<Value, ToolError> {
        let tool_id = self.request.str("tool_id")?;
        let tool = call(self.client, self.label, BackendRequest::get(["tools", tool_id])).await?;
        Ok(self.ok().with_str("tool_id", tool_id).data(tool).build())
    }

    /// Sends tool fields to a create, update, or upsert endpoint.
    async fn write(&self, request: BackendRequest) -> Result<Value, ToolError> {
        let body = Value::Object(self.request.pick(TOOL_FIELDS));
        let tool = call(self.client, self.label, request.json(body)).await?;
        let name = entity_str(&tool, "name").unwrap_or("tool");
        let message = format!("Tool {name} saved");
        Ok(self
            .ok()
            .message(message)
            .with_opt_str("tool_id", entity_str(&tool, "id"))
            .data(tool)
            .build())
    }

    async fn delete(&self) -> Result<Value, ToolError> {
        let tool_id = self.request.str("tool_id")?;
        call(self.client, self.label, BackendRequest::delete(["tools", tool_id])).await?;
        Ok(self
            .ok()
            .message(format!("Tool {tool_id} deleted"))
            .with_str("tool_id", tool_id)
            .build())
    }

    async fn attach(&self, attach: bool) -> Result<Value, ToolError> {
        let tool_id = self.request.str("tool_id")?;
        let agent_id = self.request.str("agent_id")?;
        let agent =
            call(self.client, self.label, attach_request(agent_id, tool_id, attach)).await?;
        let verb = if attach { "attached to" } else { "detached from" };
        Ok(self
            .ok()
            .message(format!("Tool {tool_id} {verb} agent {agent_id}"))
            .with_str("tool_id", tool_id)
            .with_str("agent_id", agent_id)
            .data(agent)
            .build())
    }

    async fn bulk_attach(&self) -> Result<Value, ToolError> {
        let tool_id = self.request.str("tool_id")?;
        let agent_ids = self.request.str_array("agent_ids")?;
        let mut attached = Vec::new();
        let mut failures = Vec::new();
        for agent_id in agent_ids {
            match self.client.call(self.label, attach_request(&agent_id, tool_id, true)).await {
                Ok(_) => attached.push(Value::String(agent_id)),
                Err(failure) => {
                    failures.push(json!({ "agent_id": agent_id, "error": failure.to_string() }));
                }
            }
        }
        let failure_count = failures.len();
        Ok(self
            .ok()
            .success(failure_count == 0)
            .message(format!(
                "Tool {tool_id} attached to {} agents, {failure_count} failed",
                attached.len()
            ))
            .with_str("tool_id", tool_id)
            .with_records("failures", &failures, FAILURE_RECORD)
            .with("count", Value::from(attached.len()))
            .with("agent_ids", Value::Array(attached))
            .build())
    }

    async fn generate_from_prompt(&self) -> Result<Value, ToolError> {
        let prompt = self.request.str("prompt")?;
        let mut body = json!({ "prompt": prompt });
        if let Some(name) = self.request.opt_str("name") {
            body["tool_name"] = Value::String(name.to_string());
        }
        let request = BackendRequest::post(["tools", "generate-tool"]).json(body);
        let generated = call(self.client, self.label, request).await?;
        let tool_id = generated
            .get("tool")
            .and_then(|tool| entity_str(tool, "id"))
            .or_else(|| entity_str(&generated, "id"));
        Ok(self
            .ok()
            .message("Tool generated")
            .with_opt_str("tool_id", tool_id)
            .data(generated)
            .build())
    }

    async fn generate_schema(&self) -> Result<Value, ToolError> {
        let body = Value::Object(self.request.pick(&["source_code", "name"]));
        let request = BackendRequest::post(["tools", "generate-schema"]).json(body).retryable();
        let schema = call(self.client, self.label, request).await?;
        Ok(self.ok().message("Schema generated").data(schema).build())
    }

    async fn run_from_source(&self) -> Result<Value, ToolError> {
        let body = Value::Object(self.request.pick(RUN_FIELDS));
        let request = BackendRequest::post(["tools", "run"]).json(body);
        let result = call(self.client, self.label, request).await?;
        let status = entity_str(&result, "status").unwrap_or("completed");
        let message = format!("Tool run {status}");
        Ok(self.ok().success(status != "error").message(message).data(result).build())
    }

    async fn add_base_tools(&self) -> Result<Value, ToolError> {
        let request = BackendRequest::post(["tools", "add-base-tools"]).retryable();
        let tools = call_list(self.client, self.label, EntityKind::Tools, request).await?;
        Ok(self
            .ok()
            .message(format!("Installed {} base tools", tools.len()))
            .with_records("tools", &tools, TOOL_RECORD)
            .build())
    }
}

/// Builds the attach or detach call for a tool.
fn attach_request(agent_id: &str, tool_id: &str, attach: bool) -> BackendRequest {
    let action = if attach { "attach" } else { "detach" };
    BackendRequest::patch(["agents", agent_id, "tools", action, tool_id])
}

// crates/letta-mcp/src/handlers/agents.rs
// ============================================================================
// Module: Agent Handler
// Description: Operations of `letta_agent_advanced`.
// Purpose: Agent lifecycle, messaging, history, and import/export.
// Dependencies: letta-mcp-client, letta-mcp-contract, serde_json
// ============================================================================

//! ## Overview
//! Multi-step operations live here: `clone` exports then re-imports under a
//! new name, and `bulk_delete` resolves its filter to a target list and
//! reports every per-agent failure instead of stopping at the first one.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use letta_mcp_client::BackendClient;
use letta_mcp_client::BackendRequest;
use letta_mcp_client::EntityKind;
use letta_mcp_client::normalize_list;
use letta_mcp_contract::AgentOperation;
use letta_mcp_contract::ToolName;
use letta_mcp_contract::fields::AGENT_RECORD;
use letta_mcp_contract::fields::FAILURE_RECORD;
use letta_mcp_contract::fields::MESSAGE_RECORD;
use letta_mcp_contract::fields::TOOL_RECORD;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::errors::ToolError;
use crate::handlers::ToolHandler;
use crate::handlers::call;
use crate::handlers::call_list;
use crate::handlers::parse_operation;
use crate::handlers::window;
use crate::request::OperationRequest;
use crate::response::OperationResponse;
use crate::response::entity_str;

/// Page size used when an operation scans message history.
const HISTORY_SCAN_LIMIT: u64 = 1000;

/// Agent fields accepted by `create`.
const CREATE_FIELDS: &[&str] =
    &["name", "description", "system", "llm_config", "embedding_config", "tool_ids", "tags"];

/// Agent fields reported by `get_config`.
const CONFIG_FIELDS: &[&str] = &[
    "id",
    "name",
    "description",
    "agent_type",
    "system",
    "llm_config",
    "embedding_config",
    "tags",
];

// ============================================================================
// SECTION: Handler
// ============================================================================

/// Handler for `letta_agent_advanced`.
pub struct AgentHandler;

#[async_trait]
impl ToolHandler for AgentHandler {
    fn tool(&self) -> ToolName {
        ToolName::LettaAgentAdvanced
    }

    fn operations(&self) -> Vec<&'static str> {
        AgentOperation::ALL.iter().map(|operation| operation.as_str()).collect()
    }

    async fn handle(
        &self,
        client: &BackendClient,
        request: OperationRequest,
    ) -> Result<Value, ToolError> {
        let operation = parse_operation(&request, AgentOperation::parse)?;
        let call = AgentCall {
            client,
            request: &request,
            label: operation.spec().label,
            operation: operation.as_str(),
        };
        match operation {
            AgentOperation::List => call.list().await,
            AgentOperation::Create => call.create().await,
            AgentOperation::Get => call.get().await,
            AgentOperation::Update => call.update().await,
            AgentOperation::Delete => call.delete().await,
            AgentOperation::ListTools => call.list_tools().await,
            AgentOperation::SendMessage => call.send_message().await,
            AgentOperation::Export => call.export().await,
            AgentOperation::Import => call.import().await,
            AgentOperation::CloneAgent => call.clone_agent().await,
            AgentOperation::GetConfig => call.get_config().await,
            AgentOperation::BulkDelete => call.bulk_delete().await,
            AgentOperation::Context => call.context().await,
            AgentOperation::ResetMessages => call.reset_messages().await,
            AgentOperation::Summarize => call.summarize().await,
            AgentOperation::Stream => call.stream().await,
            AgentOperation::AsyncMessage => call.async_message().await,
            AgentOperation::CancelMessage => call.cancel_message().await,
            AgentOperation::PreviewPayload => call.preview_payload().await,
            AgentOperation::SearchMessages => call.search_messages().await,
            AgentOperation::GetMessage => call.get_message().await,
            AgentOperation::Count => call.count().await,
        }
    }
}

// ============================================================================
// SECTION: Operations
// ============================================================================

/// One agent operation in flight.
struct AgentCall<'a> {
    /// Shared backend client.
    client: &'a BackendClient,
    /// Validated arguments.
    request: &'a OperationRequest,
    /// Action label for backend failures.
    label: &'static str,
    /// Operation wire value echoed in the result.
    operation: &'static str,
}

impl AgentCall<'_> {
    /// Starts a successful result.
    fn ok(&self) -> OperationResponse {
        OperationResponse::ok(self.operation)
    }

    /// Returns the `agent_id` argument.
    fn agent_id(&self) -> Result<&str, ToolError> {
        self.request.str("agent_id")
    }

    async fn list(&self) -> Result<Value, ToolError> {
        let page = self.request.pagination();
        let mut backend = BackendRequest::get(["agents"])
            .query("limit", page.offset + page.limit)
            .query_opt("query_text", self.request.opt_str("query"));
        for tag in self.request.opt_str_array("tags").unwrap_or_default() {
            backend = backend.query("tags", tag);
        }
        let agents = call_list(self.client, self.label, EntityKind::Agents, backend).await?;
        let agents = window(agents, page.offset, page.limit);
        Ok(self
            .ok()
            .message(format!("Found {} agents", agents.len()))
            .with_records("agents", &agents, AGENT_RECORD)
            .build())
    }

    async fn create(&self) -> Result<Value, ToolError> {
        let body = Value::Object(self.request.pick(CREATE_FIELDS));
        let agent =
            call(self.client, self.label, BackendRequest::post(["agents"]).json(body)).await?;
        Ok(self
            .ok()
            .message("Agent created")
            .with_opt_str("agent_id", entity_str(&agent, "id"))
            .data(agent)
            .build())
    }

    async fn get(&self) -> Result<Value, ToolError> {
        let agent_id = self.agent_id()?;
        let agent = call(self.client, self.label, BackendRequest::get(["agents", agent_id])).await?;
        Ok(self.ok().with_str("agent_id", agent_id).data(agent).build())
    }

    async fn update(&self) -> Result<Value, ToolError> {
        let agent_id = self.agent_id()?;
        let patch = self.request.value("update_data")?.clone();
        let request = BackendRequest::patch(["agents", agent_id]).json(patch);
        let agent = call(self.client, self.label, request).await?;
        Ok(self.ok().message("Agent updated").with_str("agent_id", agent_id).data(agent).build())
    }

    async fn delete(&self) -> Result<Value, ToolError> {
        let agent_id = self.agent_id()?;
        call(self.client, self.label, BackendRequest::delete(["agents", agent_id])).await?;
        Ok(self
            .ok()
            .message(format!("Agent {agent_id} deleted"))
            .with_str("agent_id", agent_id)
            .build())
    }

    async fn list_tools(&self) -> Result<Value, ToolError> {
        let agent_id = self.agent_id()?;
        let request = BackendRequest::get(["agents", agent_id, "tools"]);
        let tools = call_list(self.client, self.label, EntityKind::Tools, request).await?;
        Ok(self
            .ok()
            .message(format!("Agent {agent_id} has {} tools", tools.len()))
            .with_str("agent_id", agent_id)
            .with_records("tools", &tools, TOOL_RECORD)
            .build())
    }

    async fn send_message(&self) -> Result<Value, ToolError> {
        let agent_id = self.agent_id()?;
        let messages = self.request.value("messages")?.clone();
        let request = BackendRequest::post(["agents", agent_id, "messages"])
            .json(json!({ "messages": messages }));
        let body = call(self.client, self.label, request).await?;
        let usage = body.get("usage").cloned();
        let replies = normalize_list(EntityKind::Messages, body)?;
        let mut response = self
            .ok()
            .message(format!("Agent {agent_id} replied with {} messages", replies.len()))
            .with_str("agent_id", agent_id)
            .with_records("messages", &replies, MESSAGE_RECORD);
        if let Some(usage) = usage {
            response = response.data(usage);
        }
        Ok(response.build())
    }

    async fn export(&self) -> Result<Value, ToolError> {
        let agent_id = self.agent_id()?;
        let exported = export_agent(self.client, self.label, agent_id).await?;
        Ok(self
            .ok()
            .message("Agent exported")
            .with_str("agent_id", agent_id)
            .data(exported)
            .build())
    }

    async fn import(&self) -> Result<Value, ToolError> {
        let mut definition = self.request.object("export_data")?.clone();
        if let Some(name) = self.request.opt_str("name") {
            definition.insert("name".to_string(), Value::String(name.to_string()));
        }
        let agent = import_agent(self.client, self.label, definition).await?;
        Ok(self
            .ok()
            .message("Agent imported")
            .with_opt_str("agent_id", entity_str(&agent, "id"))
            .data(agent)
            .build())
    }

    async fn clone_agent(&self) -> Result<Value, ToolError> {
        let agent_id = self.agent_id()?;
        let name = self.request.str("name")?;
        let exported = export_agent(self.client, self.label, agent_id).await?;
        let Value::Object(mut definition) = exported else {
            return Err(ToolError::Internal(format!("export of {agent_id} is not an object")));
        };
        definition.insert("name".to_string(), Value::String(name.to_string()));
        let agent = import_agent(self.client, self.label, definition).await?;
        Ok(self
            .ok()
            .message(format!("Agent {agent_id} cloned as {name}"))
            .with_opt_str("agent_id", entity_str(&agent, "id"))
            .with_str("source_agent_id", agent_id)
            .data(agent)
            .build())
    }

    async fn get_config(&self) -> Result<Value, ToolError> {
        let agent_id = self.agent_id()?;
        let agent = call(self.client, self.label, BackendRequest::get(["agents", agent_id])).await?;
        let mut summary = Map::new();
        for field in CONFIG_FIELDS {
            if let Some(value) = agent.get(*field) {
                summary.insert(field.to_string(), value.clone());
            }
        }
        let tool_names: Vec<Value> = agent
            .get("tools")
            .and_then(Value::as_array)
            .map(|tools| {
                tools.iter().filter_map(|tool| tool.get("name").cloned()).collect()
            })
            .unwrap_or_default();
        summary.insert("tools".to_string(), Value::Array(tool_names));
        Ok(self.ok().with_str("agent_id", agent_id).data(Value::Object(summary)).build())
    }

    async fn bulk_delete(&self) -> Result<Value, ToolError> {
        let filters = self.request.object("filters")?;
        let targets = self.bulk_targets(filters).await?;
        let mut deleted = Vec::new();
        let mut failures = Vec::new();
        for agent_id in targets {
            let request = BackendRequest::delete(["agents", agent_id.as_str()]);
            match self.client.call(self.label, request).await {
                Ok(_) => deleted.push(Value::String(agent_id)),
                Err(failure) => {
                    failures.push(json!({ "agent_id": agent_id, "error": failure.to_string() }));
                }
            }
        }
        let failure_count = failures.len();
        Ok(self
            .ok()
            .success(failure_count == 0)
            .message(format!("Deleted {} agents, {failure_count} failed", deleted.len()))
            .with_records("failures", &failures, FAILURE_RECORD)
            .with("count", Value::from(deleted.len()))
            .with("deleted_ids", Value::Array(deleted))
            .build())
    }

    /// Resolves bulk filters to agent identifiers.
    async fn bulk_targets(&self, filters: &Map<String, Value>) -> Result<Vec<String>, ToolError> {
        if let Some(ids) = filters.get("agent_ids").and_then(Value::as_array) {
            return Ok(ids.iter().filter_map(Value::as_str).map(str::to_string).collect());
        }
        let name_filter = filters.get("agent_name_filter").and_then(Value::as_str);
        let tag_filter = filters.get("agent_tag_filter").and_then(Value::as_str);
        if name_filter.is_none() && tag_filter.is_none() {
            return Err(ToolError::InvalidParams(
                "filters must name agent_ids, agent_name_filter, or agent_tag_filter".to_string(),
            ));
        }
        let request = BackendRequest::get(["agents"])
            .query_opt("name", name_filter)
            .query_opt("tags", tag_filter)
            .query("limit", HISTORY_SCAN_LIMIT);
        let agents = call_list(self.client, self.label, EntityKind::Agents, request).await?;
        Ok(agents
            .iter()
            .filter(|agent| {
                name_filter.is_none_or(|name| {
                    entity_str(agent, "name").is_some_and(|value| value.contains(name))
                })
            })
            .filter(|agent| {
                tag_filter.is_none_or(|tag| {
                    agent
                        .get("tags")
                        .and_then(Value::as_array)
                        .is_some_and(|tags| tags.iter().any(|value| value.as_str() == Some(tag)))
                })
            })
            .filter_map(|agent| entity_str(agent, "id").map(str::to_string))
            .collect())
    }

    async fn context(&self) -> Result<Value, ToolError> {
        let agent_id = self.agent_id()?;
        let request = BackendRequest::get(["agents", agent_id, "context"]);
        let context = call(self.client, self.label, request).await?;
        Ok(self.ok().with_str("agent_id", agent_id).data(context).build())
    }

    async fn reset_messages(&self) -> Result<Value, ToolError> {
        let agent_id = self.agent_id()?;
        let reseed = self.request.opt_bool("add_default_initial_messages").unwrap_or(false);
        let request = BackendRequest::patch(["agents", agent_id, "reset-messages"])
            .json(json!({ "add_default_initial_messages": reseed }));
        let agent = call(self.client, self.label, request).await?;
        Ok(self.ok().message("Messages reset").with_str("agent_id", agent_id).data(agent).build())
    }

    async fn summarize(&self) -> Result<Value, ToolError> {
        let agent_id = self.agent_id()?;
        let request = BackendRequest::post(["agents", agent_id, "summarize"])
            .query_opt("max_message_length", self.request.opt_u64("max_message_length"));
        let summary = call(self.client, self.label, request).await?;
        Ok(self
            .ok()
            .message("Conversation summarized")
            .with_str("agent_id", agent_id)
            .data(summary)
            .build())
    }

    async fn stream(&self) -> Result<Value, ToolError> {
        let agent_id = self.agent_id()?;
        let messages = self.request.value("messages")?.clone();
        let request = BackendRequest::post(["agents", agent_id, "messages", "stream"])
            .json(json!({ "messages": messages, "stream_steps": true }))
            .event_stream();
        let events = call(self.client, self.label, request).await?;
        let count = events.as_array().map_or(0, Vec::len);
        Ok(self
            .ok()
            .message(format!("Received {count} streamed events"))
            .with_str("agent_id", agent_id)
            .with("count", Value::from(count))
            .with("events", events)
            .build())
    }

    async fn async_message(&self) -> Result<Value, ToolError> {
        let agent_id = self.agent_id()?;
        let messages = self.request.value("messages")?.clone();
        let request = BackendRequest::post(["agents", agent_id, "messages", "async"])
            .json(json!({ "messages": messages }));
        let run = call(self.client, self.label, request).await?;
        Ok(self
            .ok()
            .message("Message queued")
            .with_str("agent_id", agent_id)
            .with_opt_str("run_id", entity_str(&run, "id"))
            .data(run)
            .build())
    }

    async fn cancel_message(&self) -> Result<Value, ToolError> {
        let agent_id = self.agent_id()?;
        let body = Value::Object(self.request.pick(&["run_ids"]));
        let request = BackendRequest::post(["agents", agent_id, "messages", "cancel"]).json(body);
        let result = call(self.client, self.label, request).await?;
        Ok(self
            .ok()
            .message("Cancellation requested")
            .with_str("agent_id", agent_id)
            .data(result)
            .build())
    }

    async fn preview_payload(&self) -> Result<Value, ToolError> {
        let agent_id = self.agent_id()?;
        let messages = self.request.value("messages")?.clone();
        let request = BackendRequest::post(["agents", agent_id, "messages", "preview-raw-payload"])
            .json(json!({ "messages": messages }))
            .retryable();
        let payload = call(self.client, self.label, request).await?;
        Ok(self.ok().with_str("agent_id", agent_id).data(payload).build())
    }

    async fn search_messages(&self) -> Result<Value, ToolError> {
        let agent_id = self.agent_id()?;
        let page = self.request.pagination();
        let history = self.history(agent_id).await?;
        let query = self.request.opt_str("query").map(str::to_lowercase);
        let filters = self.request.opt_value("search_filters");
        let start = filter_str(filters, "start_date");
        let end = filter_str(filters, "end_date");
        let role = filter_str(filters, "role");
        let matches: Vec<Value> = history
            .into_iter()
            .filter(|message| {
                query
                    .as_ref()
                    .is_none_or(|text| message_text(message).to_lowercase().contains(text))
            })
            .filter(|message| {
                role.is_none_or(|role| {
                    entity_str(message, "role") == Some(role)
                        || entity_str(message, "message_type") == Some(role)
                })
            })
            .filter(|message| {
                let date =
                    entity_str(message, "date").or_else(|| entity_str(message, "created_at"));
                start.is_none_or(|start| date.is_some_and(|date| date >= start))
                    && end.is_none_or(|end| date.is_some_and(|date| date <= end))
            })
            .collect();
        let matches = window(matches, page.offset, page.limit);
        Ok(self
            .ok()
            .message(format!("Found {} messages", matches.len()))
            .with_str("agent_id", agent_id)
            .with_records("messages", &matches, MESSAGE_RECORD)
            .build())
    }

    async fn get_message(&self) -> Result<Value, ToolError> {
        let agent_id = self.agent_id()?;
        let message_id = self.request.str("message_id")?;
        let message = self
            .history(agent_id)
            .await?
            .into_iter()
            .find(|message| entity_str(message, "id") == Some(message_id))
            .ok_or_else(|| {
                ToolError::NotFound(format!("message {message_id} on agent {agent_id}"))
            })?;
        Ok(self.ok().with_str("agent_id", agent_id).data(message).build())
    }

    async fn count(&self) -> Result<Value, ToolError> {
        let body = call(self.client, self.label, BackendRequest::get(["agents", "count"])).await?;
        let count = body
            .as_u64()
            .ok_or_else(|| ToolError::Internal("agent count is not an integer".to_string()))?;
        Ok(self.ok().message(format!("{count} agents")).with("count", Value::from(count)).build())
    }

    /// Fetches the agent's message history.
    async fn history(&self, agent_id: &str) -> Result<Vec<Value>, ToolError> {
        let request = BackendRequest::get(["agents", agent_id, "messages"])
            .query("limit", HISTORY_SCAN_LIMIT);
        call_list(self.client, self.label, EntityKind::Messages, request).await
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Exports an agent definition.
async fn export_agent(
    client: &BackendClient,
    label: &str,
    agent_id: &str,
) -> Result<Value, ToolError> {
    call(client, label, BackendRequest::get(["agents", agent_id, "export"])).await
}

/// Imports an agent definition as an uploaded JSON file.
async fn import_agent(
    client: &BackendClient,
    label: &str,
    definition: Map<String, Value>,
) -> Result<Value, ToolError> {
    let bytes = serde_json::to_vec(&Value::Object(definition))
        .map_err(|err| ToolError::Internal(format!("agent definition encoding failed: {err}")))?;
    let request = BackendRequest::post(["agents", "import"]).multipart(
        "agent.json".to_string(),
        "application/json".to_string(),
        bytes,
    );
    call(client, label, request).await
}

/// Reads one string filter from an optional filter object.
fn filter_str<'a>(filters: Option<&'a Value>, name: &str) -> Option<&'a str> {
    filters.and_then(|value| value.get(name)).and_then(Value::as_str)
}

/// Flattens message content into searchable text.
fn message_text(message: &Value) -> String {
    match message.get("content") {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Array(parts)) => parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(" "),
        _ => String::new(),
    }
}

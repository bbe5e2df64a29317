// crates/letta-mcp/src/handlers/memory.rs
// ============================================================================
// Module: Memory Handler
// Description: Operations of `letta_memory_unified`.
// Purpose: Core memory blocks and archival passages behind one tool.
// Dependencies: letta-mcp-client, letta-mcp-contract, serde_json
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use letta_mcp_client::BackendClient;
use letta_mcp_client::BackendRequest;
use letta_mcp_client::EntityKind;
use letta_mcp_client::normalize_list;
use letta_mcp_contract::MemoryOperation;
use letta_mcp_contract::ToolName;
use letta_mcp_contract::fields::AGENT_RECORD;
use letta_mcp_contract::fields::BLOCK_RECORD;
use letta_mcp_contract::fields::PASSAGE_RECORD;
use serde_json::Value;
use serde_json::json;

use crate::errors::ToolError;
use crate::handlers::ToolHandler;
use crate::handlers::call;
use crate::handlers::call_list;
use crate::handlers::id_records;
use crate::handlers::parse_operation;
use crate::request::OperationRequest;
use crate::response::OperationResponse;
use crate::response::entity_str;

// ============================================================================
// SECTION: Handler
// ============================================================================

/// Handler for `letta_memory_unified`.
pub struct MemoryHandler;

#[async_trait]
impl ToolHandler for MemoryHandler {
    fn tool(&self) -> ToolName {
        ToolName::LettaMemoryUnified
    }

    fn operations(&self) -> Vec<&'static str> {
        MemoryOperation::ALL.iter().map(|operation| operation.as_str()).collect()
    }

    async fn handle(
        &self,
        client: &BackendClient,
        request: OperationRequest,
    ) -> Result<Value, ToolError> {
        let operation = parse_operation(&request, MemoryOperation::parse)?;
        let call = MemoryCall {
            client,
            request: &request,
            label: operation.spec().label,
            operation: operation.as_str(),
        };
        match operation {
            MemoryOperation::GetCoreMemory => call.get_core_memory().await,
            MemoryOperation::UpdateCoreMemory => call.update_core_memory().await,
            MemoryOperation::GetBlockByLabel => call.get_block_by_label().await,
            MemoryOperation::ListBlocks => call.list_blocks().await,
            MemoryOperation::CreateBlock => call.create_block().await,
            MemoryOperation::GetBlock => call.get_block().await,
            MemoryOperation::UpdateBlock => call.update_block().await,
            MemoryOperation::AttachBlock => call.attach_block(true).await,
            MemoryOperation::DetachBlock => call.attach_block(false).await,
            MemoryOperation::ListAgentsUsingBlock => call.list_agents_using_block().await,
            MemoryOperation::SearchArchival => call.search_archival().await,
            MemoryOperation::ListPassages => call.list_passages().await,
            MemoryOperation::CreatePassage => call.create_passage().await,
            MemoryOperation::UpdatePassage => call.update_passage().await,
            MemoryOperation::DeletePassage => call.delete_passage().await,
        }
    }
}

// ============================================================================
// SECTION: Operations
// ============================================================================

/// One memory operation in flight.
struct MemoryCall<'a> {
    /// Shared backend client.
    client: &'a BackendClient,
    /// Validated arguments.
    request: &'a OperationRequest,
    /// Action label for backend failures.
    label: &'static str,
    /// Operation wire value echoed in the result.
    operation: &'static str,
}

impl MemoryCall<'_> {
    /// Starts a successful result.
    fn ok(&self) -> OperationResponse {
        OperationResponse::ok(self.operation)
    }

    async fn get_core_memory(&self) -> Result<Value, ToolError> {
        let agent_id = self.request.str("agent_id")?;
        let request = BackendRequest::get(["agents", agent_id, "core-memory"]);
        let memory = call(self.client, self.label, request).await?;
        Ok(self.ok().with_str("agent_id", agent_id).with("core_memory", memory).build())
    }

    async fn update_core_memory(&self) -> Result<Value, ToolError> {
        let agent_id = self.request.str("agent_id")?;
        let label = self.request.str("block_label")?;
        let value = self.request.str("value")?;
        let request = BackendRequest::patch(["agents", agent_id, "core-memory", "blocks", label])
            .json(json!({ "value": value }));
        let block = call(self.client, self.label, request).await?;
        Ok(self
            .ok()
            .message(format!("Core memory block {label} updated"))
            .with_str("agent_id", agent_id)
            .with_opt_str("block_id", entity_str(&block, "id"))
            .data(block)
            .build())
    }

    async fn get_block_by_label(&self) -> Result<Value, ToolError> {
        let agent_id = self.request.str("agent_id")?;
        let label = self.request.str("block_label")?;
        let request = BackendRequest::get(["agents", agent_id, "core-memory", "blocks", label]);
        let block = call(self.client, self.label, request).await?;
        Ok(self
            .ok()
            .with_str("agent_id", agent_id)
            .with_opt_str("block_id", entity_str(&block, "id"))
            .data(block)
            .build())
    }

    async fn list_blocks(&self) -> Result<Value, ToolError> {
        let request = match self.request.opt_str("agent_id") {
            Some(agent_id) => BackendRequest::get(["agents", agent_id, "core-memory", "blocks"]),
            None => BackendRequest::get(["blocks"])
                .query_opt("label", self.request.opt_str("label"))
                .query("limit", self.request.limit()),
        };
        let mut blocks = call_list(self.client, self.label, EntityKind::Blocks, request).await?;
        if let Some(label) = self.request.opt_str("label") {
            blocks.retain(|block| entity_str(block, "label") == Some(label));
        }
        if let Some(limit) = self.request.opt_u64("limit") {
            blocks.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        Ok(self
            .ok()
            .message(format!("Found {} memory blocks", blocks.len()))
            .with_opt_str("agent_id", self.request.opt_str("agent_id"))
            .with_records("blocks", &blocks, BLOCK_RECORD)
            .build())
    }

    async fn create_block(&self) -> Result<Value, ToolError> {
        let body =
            Value::Object(self.request.pick(&["label", "value", "description", "is_template"]));
        let request = BackendRequest::post(["blocks"]).json(body);
        let block = call(self.client, self.label, request).await?;
        let block_id = entity_str(&block, "id")
            .ok_or_else(|| ToolError::Internal("created block has no id".to_string()))?
            .to_string();
        let mut response =
            self.ok().message("Memory block created").with_str("block_id", &block_id);
        if let Some(agent_id) = self.request.opt_str("agent_id") {
            let request = attach_request(agent_id, &block_id, true);
            call(self.client, self.label, request).await?;
            response = response
                .message(format!("Memory block created and attached to {agent_id}"))
                .with_str("agent_id", agent_id);
        }
        Ok(response.data(block).build())
    }

    async fn get_block(&self) -> Result<Value, ToolError> {
        let block_id = self.request.str("block_id")?;
        let block = call(self.client, self.label, BackendRequest::get(["blocks", block_id])).await?;
        Ok(self.ok().with_str("block_id", block_id).data(block).build())
    }

    async fn update_block(&self) -> Result<Value, ToolError> {
        let block_id = self.request.str("block_id")?;
        let patch = self.request.pick(&["value", "label", "description"]);
        if patch.is_empty() {
            return Err(ToolError::InvalidParams(
                "update_block needs at least one of value, label, description".to_string(),
            ));
        }
        let request = BackendRequest::patch(["blocks", block_id]).json(Value::Object(patch));
        let block = call(self.client, self.label, request).await?;
        Ok(self
            .ok()
            .message("Memory block updated")
            .with_str("block_id", block_id)
            .data(block)
            .build())
    }

    async fn attach_block(&self, attach: bool) -> Result<Value, ToolError> {
        let agent_id = self.request.str("agent_id")?;
        let block_id = self.request.str("block_id")?;
        let request = attach_request(agent_id, block_id, attach);
        let agent = call(self.client, self.label, request).await?;
        let verb = if attach { "attached to" } else { "detached from" };
        Ok(self
            .ok()
            .message(format!("Block {block_id} {verb} agent {agent_id}"))
            .with_str("agent_id", agent_id)
            .with_str("block_id", block_id)
            .data(agent)
            .build())
    }

    async fn list_agents_using_block(&self) -> Result<Value, ToolError> {
        let block_id = self.request.str("block_id")?;
        let request = BackendRequest::get(["blocks", block_id, "agents"]);
        let agents = call_list(self.client, self.label, EntityKind::Agents, request).await?;
        let agents = id_records(agents);
        Ok(self
            .ok()
            .message(format!("{} agents use block {block_id}", agents.len()))
            .with_str("block_id", block_id)
            .with_records("agents", &agents, AGENT_RECORD)
            .build())
    }

    async fn search_archival(&self) -> Result<Value, ToolError> {
        let agent_id = self.request.str("agent_id")?;
        let query = self.request.str("query")?;
        let request = BackendRequest::get(["agents", agent_id, "archival-memory"])
            .query("search", query)
            .query("limit", self.request.limit());
        let passages = call_list(self.client, self.label, EntityKind::Passages, request).await?;
        Ok(self
            .ok()
            .message(format!("Found {} passages", passages.len()))
            .with_str("agent_id", agent_id)
            .with_records("passages", &passages, PASSAGE_RECORD)
            .build())
    }

    async fn list_passages(&self) -> Result<Value, ToolError> {
        let agent_id = self.request.str("agent_id")?;
        let request = BackendRequest::get(["agents", agent_id, "archival-memory"])
            .query("limit", self.request.limit());
        let passages = call_list(self.client, self.label, EntityKind::Passages, request).await?;
        Ok(self
            .ok()
            .with_str("agent_id", agent_id)
            .with_records("passages", &passages, PASSAGE_RECORD)
            .build())
    }

    async fn create_passage(&self) -> Result<Value, ToolError> {
        let agent_id = self.request.str("agent_id")?;
        let text = self.request.str("text")?;
        let request = BackendRequest::post(["agents", agent_id, "archival-memory"])
            .json(json!({ "text": text }));
        let body = call(self.client, self.label, request).await?;
        let passages = match body {
            Value::Object(_) => vec![body],
            other => normalize_list(EntityKind::Passages, other)?,
        };
        let passage_id = passages.first().and_then(|passage| entity_str(passage, "id"));
        Ok(self
            .ok()
            .message("Passage created")
            .with_str("agent_id", agent_id)
            .with_opt_str("passage_id", passage_id)
            .with_records("passages", &passages, PASSAGE_RECORD)
            .build())
    }

    async fn update_passage(&self) -> Result<Value, ToolError> {
        let agent_id = self.request.str("agent_id")?;
        let passage_id = self.request.str("passage_id")?;
        let text = self.request.str("text")?;
        let request = BackendRequest::patch(["agents", agent_id, "archival-memory", passage_id])
            .json(json!({ "text": text }));
        let passage = call(self.client, self.label, request).await?;
        Ok(self
            .ok()
            .message("Passage updated")
            .with_str("agent_id", agent_id)
            .with_str("passage_id", passage_id)
            .data(passage)
            .build())
    }

    async fn delete_passage(&self) -> Result<Value, ToolError> {
        let agent_id = self.request.str("agent_id")?;
        let passage_id = self.request.str("passage_id")?;
        let request = BackendRequest::delete(["agents", agent_id, "archival-memory", passage_id]);
        call(self.client, self.label, request).await?;
        Ok(self
            .ok()
            .message(format!("Passage {passage_id} deleted"))
            .with_str("agent_id", agent_id)
            .with_str("passage_id", passage_id)
            .build())
    }
}

/// Builds the attach or detach call for a block.
fn attach_request(agent_id: &str, block_id: &str, attach: bool) -> BackendRequest {
    let action = if attach { "attach" } else { "detach" };
    BackendRequest::patch(["agents", agent_id, "core-memory", "blocks", action, block_id])
}

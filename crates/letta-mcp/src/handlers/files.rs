// crates/letta-mcp/src/handlers/files.rs
// ============================================================================
// Module: File and Folder Handler
// Description: Operations of `letta_file_folder_ops`.
// Purpose: Agent context-window files and folder attachments.
// Dependencies: letta-mcp-client, letta-mcp-contract
// ============================================================================

//! ## Overview
//! Opening a file can evict others from a full context window; the backend
//! reports the evicted names, which are surfaced as `evicted_files`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use letta_mcp_client::BackendClient;
use letta_mcp_client::BackendRequest;
use letta_mcp_client::EntityKind;
use letta_mcp_contract::FileFolderOperation;
use letta_mcp_contract::ToolName;
use letta_mcp_contract::fields::AGENT_RECORD;
use letta_mcp_contract::fields::FILE_RECORD;
use letta_mcp_contract::fields::SOURCE_RECORD;
use serde_json::Value;

use crate::errors::ToolError;
use crate::handlers::ToolHandler;
use crate::handlers::call;
use crate::handlers::call_list;
use crate::handlers::id_records;
use crate::handlers::name_list;
use crate::handlers::parse_operation;
use crate::request::OperationRequest;
use crate::response::OperationResponse;

// ============================================================================
// SECTION: Handler
// ============================================================================

/// Handler for `letta_file_folder_ops`.
pub struct FileFolderHandler;

#[async_trait]
impl ToolHandler for FileFolderHandler {
    fn tool(&self) -> ToolName {
        ToolName::LettaFileFolderOps
    }

    fn operations(&self) -> Vec<&'static str> {
        FileFolderOperation::ALL.iter().map(|operation| operation.as_str()).collect()
    }

    async fn handle(
        &self,
        client: &BackendClient,
        request: OperationRequest,
    ) -> Result<Value, ToolError> {
        let operation = parse_operation(&request, FileFolderOperation::parse)?;
        let call = FileCall {
            client,
            request: &request,
            label: operation.spec().label,
            operation: operation.as_str(),
        };
        match operation {
            FileFolderOperation::ListFiles => call.list_files().await,
            FileFolderOperation::OpenFile => call.open_file().await,
            FileFolderOperation::CloseFile => call.close_file().await,
            FileFolderOperation::CloseAllFiles => call.close_all_files().await,
            FileFolderOperation::ListFolders => call.list_folders().await,
            FileFolderOperation::AttachFolder => call.attach_folder(true).await,
            FileFolderOperation::DetachFolder => call.attach_folder(false).await,
            FileFolderOperation::ListAgentsInFolder => call.list_agents_in_folder().await,
        }
    }
}

// ============================================================================
// SECTION: Operations
// ============================================================================

/// One file or folder operation in flight.
struct FileCall<'a> {
    /// Shared backend client.
    client: &'a BackendClient,
    /// Validated arguments.
    request: &'a OperationRequest,
    /// Action label for backend failures.
    label: &'static str,
    /// Operation wire value echoed in the result.
    operation: &'static str,
}

impl FileCall<'_> {
    /// Starts a successful result.
    fn ok(&self) -> OperationResponse {
        OperationResponse::ok(self.operation)
    }

    async fn list_files(&self) -> Result<Value, ToolError> {
        let agent_id = self.request.str("agent_id")?;
        let request =
            BackendRequest::get(["agents", agent_id, "files"]).query("limit", self.request.limit());
        let files = call_list(self.client, self.label, EntityKind::Files, request).await?;
        Ok(self
            .ok()
            .message(format!("Agent {agent_id} has {} files", files.len()))
            .with_str("agent_id", agent_id)
            .with_records("files", &files, FILE_RECORD)
            .build())
    }

    async fn open_file(&self) -> Result<Value, ToolError> {
        let agent_id = self.request.str("agent_id")?;
        let file_id = self.request.str("file_id")?;
        let request = BackendRequest::patch(["agents", agent_id, "files", file_id, "open"]);
        let evicted = name_list(&call(self.client, self.label, request).await?);
        let message = if evicted.is_empty() {
            format!("File {file_id} opened")
        } else {
            format!("File {file_id} opened, {} files closed to make room", evicted.len())
        };
        Ok(self
            .ok()
            .message(message)
            .with_str("agent_id", agent_id)
            .with_str("file_id", file_id)
            .with("evicted_files", strings(evicted))
            .build())
    }

    async fn close_file(&self) -> Result<Value, ToolError> {
        let agent_id = self.request.str("agent_id")?;
        let file_id = self.request.str("file_id")?;
        let request = BackendRequest::patch(["agents", agent_id, "files", file_id, "close"]);
        call(self.client, self.label, request).await?;
        Ok(self
            .ok()
            .message(format!("File {file_id} closed"))
            .with_str("agent_id", agent_id)
            .with_str("file_id", file_id)
            .build())
    }

    async fn close_all_files(&self) -> Result<Value, ToolError> {
        let agent_id = self.request.str("agent_id")?;
        let request = BackendRequest::patch(["agents", agent_id, "files", "close-all"]);
        let closed = name_list(&call(self.client, self.label, request).await?);
        Ok(self
            .ok()
            .message(format!("Closed {} files", closed.len()))
            .with_str("agent_id", agent_id)
            .with("count", Value::from(closed.len()))
            .with("closed_files", strings(closed))
            .build())
    }

    async fn list_folders(&self) -> Result<Value, ToolError> {
        let request = match self.request.opt_str("agent_id") {
            Some(agent_id) => BackendRequest::get(["agents", agent_id, "folders"]),
            None => BackendRequest::get(["folders"]),
        }
        .query("limit", self.request.limit());
        let folders = call_list(self.client, self.label, EntityKind::Folders, request).await?;
        Ok(self
            .ok()
            .message(format!("Found {} folders", folders.len()))
            .with_opt_str("agent_id", self.request.opt_str("agent_id"))
            .with_records("folders", &folders, SOURCE_RECORD)
            .build())
    }

    async fn attach_folder(&self, attach: bool) -> Result<Value, ToolError> {
        let agent_id = self.request.str("agent_id")?;
        let folder_id = self.request.str("folder_id")?;
        let action = if attach { "attach" } else { "detach" };
        let request = BackendRequest::patch(["agents", agent_id, "folders", action, folder_id]);
        let agent = call(self.client, self.label, request).await?;
        Ok(self
            .ok()
            .message(format!("Folder {folder_id} {action}ed for agent {agent_id}"))
            .with_str("agent_id", agent_id)
            .with_str("folder_id", folder_id)
            .data(agent)
            .build())
    }

    async fn list_agents_in_folder(&self) -> Result<Value, ToolError> {
        let folder_id = self.request.str("folder_id")?;
        let request = BackendRequest::get(["folders", folder_id, "agents"]);
        let agents = call_list(self.client, self.label, EntityKind::Agents, request).await?;
        let agents = id_records(agents);
        Ok(self
            .ok()
            .message(format!("{} agents use folder {folder_id}", agents.len()))
            .with_str("folder_id", folder_id)
            .with_records("agents", &agents, AGENT_RECORD)
            .build())
    }
}

/// Wraps names as a JSON string array.
fn strings(names: Vec<String>) -> Value {
    Value::Array(names.into_iter().map(Value::String).collect())
}

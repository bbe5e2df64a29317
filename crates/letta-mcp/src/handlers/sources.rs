// crates/letta-mcp/src/handlers/sources.rs
// ============================================================================
// Module: Source Handler
// Description: Operations of `letta_source_manager`.
// Purpose: Data source CRUD, agent attachment, uploads, and file listings.
// Dependencies: base64, letta-mcp-client, letta-mcp-contract, serde_json
// ============================================================================

//! ## Overview
//! Uploads arrive base64-encoded in the tool arguments and leave as a
//! multipart file part. Decoding failures are argument errors that name
//! `file_data`, not backend failures.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use letta_mcp_client::BackendClient;
use letta_mcp_client::BackendRequest;
use letta_mcp_client::EntityKind;
use letta_mcp_contract::SourceOperation;
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
use crate::handlers::parse_operation;
use crate::request::OperationRequest;
use crate::response::OperationResponse;
use crate::response::entity_str;

// ============================================================================
// SECTION: Handler
// ============================================================================

/// Handler for `letta_source_manager`.
pub struct SourceHandler;

#[async_trait]
impl ToolHandler for SourceHandler {
    fn tool(&self) -> ToolName {
        ToolName::LettaSourceManager
    }

    fn operations(&self) -> Vec<&'static str> {
        SourceOperation::ALL.iter().map(|operation| operation.as_str()).collect()
    }

    async fn handle(
        &self,
        client: &BackendClient,
        request: OperationRequest,
    ) -> Result<Value, ToolError> {
        let operation = parse_operation(&request, SourceOperation::parse)?;
        let call = SourceCall {
            client,
            request: &request,
            label: operation.spec().label,
            operation: operation.as_str(),
        };
        match operation {
            SourceOperation::List => call.list().await,
            SourceOperation::Get => call.get().await,
            SourceOperation::Create => call.create().await,
            SourceOperation::Update => call.update().await,
            SourceOperation::Delete => call.delete().await,
            SourceOperation::Count => call.count().await,
            SourceOperation::Attach => call.attach(true).await,
            SourceOperation::Detach => call.attach(false).await,
            SourceOperation::ListAttached => call.list_attached().await,
            SourceOperation::Upload => call.upload().await,
            SourceOperation::DeleteFiles => call.delete_file().await,
            SourceOperation::ListFiles => call.list_files().await,
            SourceOperation::ListFolders => call.list_folders().await,
            SourceOperation::GetFolderContents => call.get_folder_contents().await,
            SourceOperation::ListAgentsUsing => call.list_agents_using().await,
        }
    }
}

// ============================================================================
// SECTION: Operations
// ============================================================================

/// One source operation in flight.
struct SourceCall<'a> {
    /// Shared backend client.
    client: &'a BackendClient,
    /// Validated arguments.
    request: &'a OperationRequest,
    /// Action label for backend failures.
    label: &'static str,
    /// Operation wire value echoed in the result.
    operation: &'static str,
}

impl SourceCall<'_> {
    /// Starts a successful result.
    fn ok(&self) -> OperationResponse {
        OperationResponse::ok(self.operation)
    }

    /// Returns the `source_id` argument.
    fn source_id(&self) -> Result<&str, ToolError> {
        self.request.str("source_id")
    }

    async fn list(&self) -> Result<Value, ToolError> {
        let request = BackendRequest::get(["sources"]).query("limit", self.request.limit());
        let sources = call_list(self.client, self.label, EntityKind::Sources, request).await?;
        Ok(self
            .ok()
            .message(format!("Found {} sources", sources.len()))
            .with_records("sources", &sources, SOURCE_RECORD)
            .build())
    }

    async fn get(&self) -> Result<Value, ToolError> {
        let source_id = self.source_id()?;
        let request = BackendRequest::get(["sources", source_id]);
        let source = call(self.client, self.label, request).await?;
        Ok(self.ok().with_str("source_id", source_id).data(source).build())
    }

    async fn create(&self) -> Result<Value, ToolError> {
        let body = Value::Object(self.request.pick(&["name", "description", "embedding_config"]));
        let request = BackendRequest::post(["sources"]).json(body);
        let source = call(self.client, self.label, request).await?;
        Ok(self
            .ok()
            .message("Source created")
            .with_opt_str("source_id", entity_str(&source, "id"))
            .data(source)
            .build())
    }

    async fn update(&self) -> Result<Value, ToolError> {
        let source_id = self.source_id()?;
        let patch = self.request.pick(&["name", "description"]);
        if patch.is_empty() {
            return Err(ToolError::InvalidParams(
                "update needs at least one of name, description".to_string(),
            ));
        }
        let request = BackendRequest::patch(["sources", source_id]).json(Value::Object(patch));
        let source = call(self.client, self.label, request).await?;
        Ok(self
            .ok()
            .message("Source updated")
            .with_str("source_id", source_id)
            .data(source)
            .build())
    }

    async fn delete(&self) -> Result<Value, ToolError> {
        let source_id = self.source_id()?;
        call(self.client, self.label, BackendRequest::delete(["sources", source_id])).await?;
        Ok(self
            .ok()
            .message(format!("Source {source_id} deleted"))
            .with_str("source_id", source_id)
            .build())
    }

    async fn count(&self) -> Result<Value, ToolError> {
        let body = call(self.client, self.label, BackendRequest::get(["sources", "count"])).await?;
        let count = body
            .as_u64()
            .ok_or_else(|| ToolError::Internal("source count is not an integer".to_string()))?;
        Ok(self.ok().message(format!("{count} sources")).with("count", Value::from(count)).build())
    }

    async fn attach(&self, attach: bool) -> Result<Value, ToolError> {
        let source_id = self.source_id()?;
        let agent_id = self.request.str("agent_id")?;
        let action = if attach { "attach" } else { "detach" };
        let request = BackendRequest::patch(["agents", agent_id, "sources", action, source_id]);
        let agent = call(self.client, self.label, request).await?;
        Ok(self
            .ok()
            .message(format!("Source {source_id} {action}ed for agent {agent_id}"))
            .with_str("source_id", source_id)
            .with_str("agent_id", agent_id)
            .data(agent)
            .build())
    }

    async fn list_attached(&self) -> Result<Value, ToolError> {
        let agent_id = self.request.str("agent_id")?;
        let request = BackendRequest::get(["agents", agent_id, "sources"]);
        let sources = call_list(self.client, self.label, EntityKind::Sources, request).await?;
        Ok(self
            .ok()
            .message(format!("Agent {agent_id} has {} sources", sources.len()))
            .with_str("agent_id", agent_id)
            .with_records("sources", &sources, SOURCE_RECORD)
            .build())
    }

    async fn upload(&self) -> Result<Value, ToolError> {
        let source_id = self.source_id()?;
        let file_name = self.request.str("file_name")?;
        let encoded = self.request.str("file_data")?;
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|err| ToolError::InvalidParams(format!("file_data is not base64: {err}")))?;
        let content_type = self
            .request
            .opt_str("content_type")
            .map_or_else(|| guess_content_type(file_name).to_string(), str::to_string);
        let request = BackendRequest::post(["sources", source_id, "upload"]).multipart(
            file_name.to_string(),
            content_type,
            bytes,
        );
        let job = call(self.client, self.label, request).await?;
        Ok(self
            .ok()
            .message(format!("Upload of {file_name} started"))
            .with_str("source_id", source_id)
            .with_opt_str("job_id", entity_str(&job, "id"))
            .data(job)
            .build())
    }

    async fn delete_file(&self) -> Result<Value, ToolError> {
        let source_id = self.source_id()?;
        let file_id = self.request.str("file_id")?;
        call(self.client, self.label, BackendRequest::delete(["sources", source_id, file_id]))
            .await?;
        Ok(self
            .ok()
            .message(format!("File {file_id} deleted"))
            .with_str("source_id", source_id)
            .with_str("file_id", file_id)
            .build())
    }

    async fn list_files(&self) -> Result<Value, ToolError> {
        let source_id = self.source_id()?;
        let request = BackendRequest::get(["sources", source_id, "files"])
            .query("limit", self.request.limit())
            .query_opt("include_content", self.request.opt_bool("include_content"));
        let files = call_list(self.client, self.label, EntityKind::Files, request).await?;
        Ok(self
            .ok()
            .message(format!("Source {source_id} has {} files", files.len()))
            .with_str("source_id", source_id)
            .with_records("files", &files, FILE_RECORD)
            .build())
    }

    async fn list_folders(&self) -> Result<Value, ToolError> {
        let request = BackendRequest::get(["folders"]).query("limit", self.request.limit());
        let folders = call_list(self.client, self.label, EntityKind::Folders, request).await?;
        Ok(self
            .ok()
            .message(format!("Found {} folders", folders.len()))
            .with_records("folders", &folders, SOURCE_RECORD)
            .build())
    }

    async fn get_folder_contents(&self) -> Result<Value, ToolError> {
        let source_id = self.source_id()?;
        let request = BackendRequest::get(["folders", source_id, "files"])
            .query("limit", self.request.limit());
        let files = call_list(self.client, self.label, EntityKind::Files, request).await?;
        Ok(self
            .ok()
            .with_str("source_id", source_id)
            .with_records("files", &files, FILE_RECORD)
            .build())
    }

    async fn list_agents_using(&self) -> Result<Value, ToolError> {
        let source_id = self.source_id()?;
        let request = BackendRequest::get(["sources", source_id, "agents"]);
        let agents = call_list(self.client, self.label, EntityKind::Agents, request).await?;
        let agents = id_records(agents);
        Ok(self
            .ok()
            .message(format!("{} agents use source {source_id}", agents.len()))
            .with_str("source_id", source_id)
            .with_records("agents", &agents, AGENT_RECORD)
            .build())
    }
}

/// Picks a MIME type from the file extension.
fn guess_content_type(file_name: &str) -> &'static str {
    let extension = file_name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("txt") => "text/plain",
        Some("md" | "markdown") => "text/markdown",
        Some("json") => "application/json",
        Some("pdf") => "application/pdf",
        Some("csv") => "text/csv",
        Some("html" | "htm") => "text/html",
        _ => "application/octet-stream",
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::guess_content_type;

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(guess_content_type("notes.TXT"), "text/plain");
        assert_eq!(guess_content_type("paper.pdf"), "application/pdf");
        assert_eq!(guess_content_type("blob"), "application/octet-stream");
    }
}

// crates/letta-mcp/src/handlers/jobs.rs
// ============================================================================
// Module: Job Handler
// Description: Operations of `letta_job_monitor`.
// Purpose: Inspect and cancel background jobs.
// Dependencies: letta-mcp-client, letta-mcp-contract
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use letta_mcp_client::BackendClient;
use letta_mcp_client::BackendRequest;
use letta_mcp_client::EntityKind;
use letta_mcp_contract::JobOperation;
use letta_mcp_contract::ToolName;
use letta_mcp_contract::fields::JOB_RECORD;
use serde_json::Value;

use crate::errors::ToolError;
use crate::handlers::ToolHandler;
use crate::handlers::call;
use crate::handlers::call_list;
use crate::handlers::parse_operation;
use crate::request::OperationRequest;
use crate::response::OperationResponse;

// ============================================================================
// SECTION: Handler
// ============================================================================

/// Handler for `letta_job_monitor`.
pub struct JobHandler;

#[async_trait]
impl ToolHandler for JobHandler {
    fn tool(&self) -> ToolName {
        ToolName::LettaJobMonitor
    }

    fn operations(&self) -> Vec<&'static str> {
        JobOperation::ALL.iter().map(|operation| operation.as_str()).collect()
    }

    async fn handle(
        &self,
        client: &BackendClient,
        request: OperationRequest,
    ) -> Result<Value, ToolError> {
        let operation = parse_operation(&request, JobOperation::parse)?;
        let label = operation.spec().label;
        let response = OperationResponse::ok(operation.as_str());
        match operation {
            JobOperation::List | JobOperation::ListActive => {
                let segments: &[&str] =
                    if operation == JobOperation::List { &["jobs"] } else { &["jobs", "active"] };
                let backend =
                    BackendRequest::get(segments.iter().copied()).query("limit", request.limit());
                let jobs = call_list(client, label, EntityKind::Jobs, backend).await?;
                Ok(response
                    .message(format!("Found {} jobs", jobs.len()))
                    .with_records("jobs", &jobs, JOB_RECORD)
                    .build())
            }
            JobOperation::Get => {
                let job_id = request.str("job_id")?;
                let job = call(client, label, BackendRequest::get(["jobs", job_id])).await?;
                Ok(response.with_str("job_id", job_id).data(job).build())
            }
            JobOperation::Cancel => {
                let job_id = request.str("job_id")?;
                let backend = BackendRequest::patch(["jobs", job_id, "cancel"]);
                let job = call(client, label, backend).await?;
                Ok(response
                    .message(format!("Job {job_id} cancelled"))
                    .with_str("job_id", job_id)
                    .data(job)
                    .build())
            }
        }
    }
}

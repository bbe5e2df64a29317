// crates/letta-mcp-contract/src/fields.rs
// ============================================================================
// Module: Field Catalogs
// Description: Input fields, output fields, and record projections per tool.
// Purpose: Keep schema properties and handler projections on one table.
// Dependencies: crate::types
// ============================================================================

//! ## Overview
//! Input fields are declared once per tool and shared by all of its
//! operations. Output record lists double as the projection handlers apply
//! to backend list entries, so list outputs always satisfy the closed
//! record schema.

use crate::types::FieldKind;
use crate::types::FieldSpec;
use crate::types::OutputField;
use crate::types::OutputKind;

// ============================================================================
// SECTION: Shared Fields
// ============================================================================

/// Field accepted by every tool and ignored by handlers.
pub const REQUEST_HEARTBEAT: FieldSpec = FieldSpec::new(
    "request_heartbeat",
    FieldKind::Boolean,
    "Ignored; accepted for MCP client compatibility.",
);

/// Smallest accepted `limit` value.
const MIN_LIMIT: i64 = 1;

// ============================================================================
// SECTION: Record Projections
// ============================================================================

/// Summary fields kept for agent records.
pub const AGENT_RECORD: &[&str] =
    &["id", "name", "description", "agent_type", "tags", "created_at", "updated_at"];
/// Summary fields kept for tool records.
pub const TOOL_RECORD: &[&str] = &["id", "name", "description", "tool_type", "source_type", "tags"];
/// Summary fields kept for message records.
pub const MESSAGE_RECORD: &[&str] =
    &["id", "message_type", "role", "content", "date", "created_at"];
/// Summary fields kept for memory block records.
pub const BLOCK_RECORD: &[&str] =
    &["id", "label", "value", "description", "limit", "is_template"];
/// Summary fields kept for archival passage records.
pub const PASSAGE_RECORD: &[&str] = &["id", "text", "agent_id", "created_at"];
/// Summary fields kept for source and folder records.
pub const SOURCE_RECORD: &[&str] = &["id", "name", "description", "created_at"];
/// Summary fields kept for file records.
pub const FILE_RECORD: &[&str] = &[
    "id",
    "file_name",
    "source_id",
    "file_type",
    "file_size",
    "is_open",
    "processing_status",
    "content",
    "created_at",
];
/// Summary fields kept for job records.
pub const JOB_RECORD: &[&str] =
    &["id", "status", "job_type", "created_at", "completed_at", "metadata"];
/// Summary fields kept for MCP server records.
pub const SERVER_RECORD: &[&str] =
    &["id", "server_name", "type", "command", "args", "server_url"];
/// Summary fields kept for tools exposed by an MCP server.
pub const MCP_TOOL_RECORD: &[&str] = &["name", "description", "inputSchema"];
/// Fields reported for one failed target of a bulk operation.
pub const FAILURE_RECORD: &[&str] = &["agent_id", "error"];

// ============================================================================
// SECTION: Agents
// ============================================================================

/// Input fields for `letta_agent_advanced`.
pub const AGENT_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("agent_id", FieldKind::Identifier, "Agent identifier."),
    FieldSpec::new("name", FieldKind::String, "Agent name (create, import, clone)."),
    FieldSpec::new("description", FieldKind::String, "Agent description."),
    FieldSpec::new("system", FieldKind::String, "System prompt."),
    FieldSpec::new("llm_config", FieldKind::Object, "LLM configuration object."),
    FieldSpec::new("embedding_config", FieldKind::Object, "Embedding configuration object."),
    FieldSpec::new("tool_ids", FieldKind::StringArray, "Tool identifiers to attach on create."),
    FieldSpec::new("tags", FieldKind::StringArray, "Agent tags."),
    FieldSpec::new("pagination", FieldKind::Pagination, "Pagination window."),
    FieldSpec::new("messages", FieldKind::Messages, "Messages to send."),
    FieldSpec::new("filters", FieldKind::AgentFilters, "Agent selection for bulk_delete."),
    FieldSpec::new("query", FieldKind::String, "Search text."),
    FieldSpec::new("search_filters", FieldKind::MessageFilters, "Message search filters."),
    FieldSpec::new("export_data", FieldKind::Object, "Exported agent definition to import."),
    FieldSpec::new("update_data", FieldKind::Object, "Agent fields to patch."),
    FieldSpec::new("message_id", FieldKind::Identifier, "Message identifier."),
    FieldSpec::new("run_ids", FieldKind::StringArray, "Run identifiers to cancel."),
    FieldSpec::new(
        "add_default_initial_messages",
        FieldKind::Boolean,
        "Re-seed the default initial messages after a reset.",
    ),
    FieldSpec::new(
        "max_message_length",
        FieldKind::Integer {
            minimum: MIN_LIMIT,
        },
        "Target message count after summarization.",
    ),
];

/// Output fields for `letta_agent_advanced`.
pub const AGENT_OUTPUTS: &[OutputField] = &[
    OutputField::new("agent_id", OutputKind::String, "Agent identifier."),
    OutputField::new("source_agent_id", OutputKind::String, "Agent a clone was made from."),
    OutputField::new("run_id", OutputKind::String, "Run identifier for async messages."),
    OutputField::new("agents", OutputKind::Records(AGENT_RECORD), "Agent summaries."),
    OutputField::new("tools", OutputKind::Records(TOOL_RECORD), "Attached tool summaries."),
    OutputField::new("messages", OutputKind::Records(MESSAGE_RECORD), "Matching messages."),
    OutputField::new("deleted_ids", OutputKind::StringArray, "Agents deleted by bulk_delete."),
    OutputField::new("failures", OutputKind::Records(FAILURE_RECORD), "Per-agent failures."),
    OutputField::new("events", OutputKind::Detail, "Streamed events."),
    OutputField::new("count", OutputKind::Integer, "Number of returned or counted items."),
    OutputField::new("data", OutputKind::Detail, "Raw backend payload."),
];

// ============================================================================
// SECTION: Memory
// ============================================================================

/// Input fields for `letta_memory_unified`.
pub const MEMORY_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("agent_id", FieldKind::Identifier, "Agent identifier."),
    FieldSpec::new("block_id", FieldKind::Identifier, "Memory block identifier."),
    FieldSpec::new("block_label", FieldKind::Identifier, "Core memory block label."),
    FieldSpec::new("passage_id", FieldKind::Identifier, "Archival passage identifier."),
    FieldSpec::new("label", FieldKind::String, "Block label."),
    FieldSpec::new("value", FieldKind::String, "Block value."),
    FieldSpec::new("description", FieldKind::String, "Block description."),
    FieldSpec::new("text", FieldKind::String, "Passage text."),
    FieldSpec::new("query", FieldKind::String, "Archival search query."),
    FieldSpec::new(
        "limit",
        FieldKind::Integer {
            minimum: MIN_LIMIT,
        },
        "Maximum number of results.",
    ),
    FieldSpec::new("is_template", FieldKind::Boolean, "Create the block as a template."),
];

/// Output fields for `letta_memory_unified`.
pub const MEMORY_OUTPUTS: &[OutputField] = &[
    OutputField::new("agent_id", OutputKind::String, "Agent identifier."),
    OutputField::new("block_id", OutputKind::String, "Memory block identifier."),
    OutputField::new("passage_id", OutputKind::String, "Passage identifier."),
    OutputField::new("blocks", OutputKind::Records(BLOCK_RECORD), "Block summaries."),
    OutputField::new("passages", OutputKind::Records(PASSAGE_RECORD), "Passage summaries."),
    OutputField::new("agents", OutputKind::Records(AGENT_RECORD), "Agent summaries."),
    OutputField::new("core_memory", OutputKind::Detail, "Core memory snapshot."),
    OutputField::new("count", OutputKind::Integer, "Number of returned items."),
    OutputField::new("data", OutputKind::Detail, "Raw backend payload."),
];

// ============================================================================
// SECTION: Tool Manager
// ============================================================================

/// Input fields for `letta_tool_manager`.
pub const TOOL_MANAGER_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("tool_id", FieldKind::Identifier, "Tool identifier."),
    FieldSpec::new("agent_id", FieldKind::Identifier, "Agent identifier."),
    FieldSpec::new("agent_ids", FieldKind::StringArray, "Agent identifiers for bulk_attach."),
    FieldSpec::new("source_code", FieldKind::String, "Tool source code."),
    FieldSpec::new("source_type", FieldKind::String, "Source language (for example python)."),
    FieldSpec::new("tags", FieldKind::StringArray, "Tool tags."),
    FieldSpec::new("description", FieldKind::String, "Tool description."),
    FieldSpec::new("json_schema", FieldKind::Object, "Explicit tool JSON schema."),
    FieldSpec::new("args_json_schema", FieldKind::Object, "Arguments JSON schema."),
    FieldSpec::new(
        "return_char_limit",
        FieldKind::Integer {
            minimum: MIN_LIMIT,
        },
        "Maximum characters returned by the tool.",
    ),
    FieldSpec::new("args", FieldKind::Object, "Arguments for run_from_source."),
    FieldSpec::new("env_vars", FieldKind::StringMap, "Environment for run_from_source."),
    FieldSpec::new("name", FieldKind::String, "Tool name filter or generated tool name."),
    FieldSpec::new("prompt", FieldKind::String, "Natural-language tool description."),
    FieldSpec::new(
        "limit",
        FieldKind::Integer {
            minimum: MIN_LIMIT,
        },
        "Maximum number of results.",
    ),
];

/// Output fields for `letta_tool_manager`.
pub const TOOL_MANAGER_OUTPUTS: &[OutputField] = &[
    OutputField::new("tool_id", OutputKind::String, "Tool identifier."),
    OutputField::new("agent_id", OutputKind::String, "Agent identifier."),
    OutputField::new("agent_ids", OutputKind::StringArray, "Agents the tool was attached to."),
    OutputField::new("tools", OutputKind::Records(TOOL_RECORD), "Tool summaries."),
    OutputField::new("failures", OutputKind::Records(FAILURE_RECORD), "Per-agent failures."),
    OutputField::new("count", OutputKind::Integer, "Number of returned items."),
    OutputField::new("data", OutputKind::Detail, "Raw backend payload."),
];

// ============================================================================
// SECTION: Sources
// ============================================================================

/// Input fields for `letta_source_manager`.
pub const SOURCE_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("source_id", FieldKind::Identifier, "Source identifier."),
    FieldSpec::new("agent_id", FieldKind::Identifier, "Agent identifier."),
    FieldSpec::new("name", FieldKind::String, "Source name."),
    FieldSpec::new("description", FieldKind::String, "Source description."),
    FieldSpec::new("embedding_config", FieldKind::Object, "Embedding configuration object."),
    FieldSpec::new("file_id", FieldKind::Identifier, "File identifier."),
    FieldSpec::new("file_name", FieldKind::Identifier, "Uploaded file name."),
    FieldSpec::new("file_data", FieldKind::String, "Base64-encoded file contents."),
    FieldSpec::new("content_type", FieldKind::String, "MIME type of the upload."),
    FieldSpec::new(
        "limit",
        FieldKind::Integer {
            minimum: MIN_LIMIT,
        },
        "Maximum number of results.",
    ),
    FieldSpec::new("include_content", FieldKind::Boolean, "Include file contents in listings."),
];

/// Output fields for `letta_source_manager`.
pub const SOURCE_OUTPUTS: &[OutputField] = &[
    OutputField::new("source_id", OutputKind::String, "Source identifier."),
    OutputField::new("agent_id", OutputKind::String, "Agent identifier."),
    OutputField::new("file_id", OutputKind::String, "File identifier."),
    OutputField::new("job_id", OutputKind::String, "Upload processing job."),
    OutputField::new("sources", OutputKind::Records(SOURCE_RECORD), "Source summaries."),
    OutputField::new("folders", OutputKind::Records(SOURCE_RECORD), "Folder summaries."),
    OutputField::new("files", OutputKind::Records(FILE_RECORD), "File summaries."),
    OutputField::new("agents", OutputKind::Records(AGENT_RECORD), "Agent summaries."),
    OutputField::new("count", OutputKind::Integer, "Number of returned or counted items."),
    OutputField::new("data", OutputKind::Detail, "Raw backend payload."),
];

// ============================================================================
// SECTION: Jobs
// ============================================================================

/// Input fields for `letta_job_monitor`.
pub const JOB_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("job_id", FieldKind::Identifier, "Job identifier."),
    FieldSpec::new(
        "limit",
        FieldKind::Integer {
            minimum: MIN_LIMIT,
        },
        "Maximum number of results.",
    ),
];

/// Output fields for `letta_job_monitor`.
pub const JOB_OUTPUTS: &[OutputField] = &[
    OutputField::new("job_id", OutputKind::String, "Job identifier."),
    OutputField::new("jobs", OutputKind::Records(JOB_RECORD), "Job summaries."),
    OutputField::new("count", OutputKind::Integer, "Number of returned items."),
    OutputField::new("data", OutputKind::Detail, "Raw backend payload."),
];

// ============================================================================
// SECTION: Files and Folders
// ============================================================================

/// Input fields for `letta_file_folder_ops`.
pub const FILE_FOLDER_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("agent_id", FieldKind::Identifier, "Agent identifier."),
    FieldSpec::new("file_id", FieldKind::Identifier, "File identifier."),
    FieldSpec::new("folder_id", FieldKind::Identifier, "Folder identifier."),
    FieldSpec::new(
        "limit",
        FieldKind::Integer {
            minimum: MIN_LIMIT,
        },
        "Maximum number of results.",
    ),
];

/// Output fields for `letta_file_folder_ops`.
pub const FILE_FOLDER_OUTPUTS: &[OutputField] = &[
    OutputField::new("agent_id", OutputKind::String, "Agent identifier."),
    OutputField::new("file_id", OutputKind::String, "File identifier."),
    OutputField::new("folder_id", OutputKind::String, "Folder identifier."),
    OutputField::new("files", OutputKind::Records(FILE_RECORD), "File summaries."),
    OutputField::new("folders", OutputKind::Records(SOURCE_RECORD), "Folder summaries."),
    OutputField::new("agents", OutputKind::Records(AGENT_RECORD), "Agent summaries."),
    OutputField::new("evicted_files", OutputKind::StringArray, "Files closed to make room."),
    OutputField::new("closed_files", OutputKind::StringArray, "Files closed by close_all_files."),
    OutputField::new("count", OutputKind::Integer, "Number of returned items."),
    OutputField::new("data", OutputKind::Detail, "Raw backend payload."),
];

// ============================================================================
// SECTION: MCP Servers
// ============================================================================

/// Input fields for `letta_mcp_ops`.
pub const MCP_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("server_name", FieldKind::Identifier, "Registered MCP server name."),
    FieldSpec::new(
        "server_config",
        FieldKind::Object,
        "Server configuration: type (stdio, sse, streamable_http) plus command/args or \
         server_url.",
    ),
    FieldSpec::new("oauth_config", FieldKind::Object, "Authentication settings merged into the \
         server configuration."),
    FieldSpec::new("tool_name", FieldKind::Identifier, "Tool exposed by the MCP server."),
    FieldSpec::new("tool_args", FieldKind::Object, "Arguments for execute; defaults to {}."),
    FieldSpec::new("pagination", FieldKind::Pagination, "Pagination window for list_servers."),
];

/// Output fields for `letta_mcp_ops`.
pub const MCP_OUTPUTS: &[OutputField] = &[
    OutputField::new("server_id", OutputKind::String, "Backend-assigned server identifier."),
    OutputField::new("server_name", OutputKind::String, "MCP server name."),
    OutputField::new("tool_name", OutputKind::String, "MCP tool name."),
    OutputField::new("tool_id", OutputKind::String, "Letta tool identifier."),
    OutputField::new("connected", OutputKind::Boolean, "Connectivity test result."),
    OutputField::new("latency_ms", OutputKind::Integer, "Round-trip time of the test call."),
    OutputField::new("servers", OutputKind::Records(SERVER_RECORD), "Server summaries."),
    OutputField::new("tools", OutputKind::Records(MCP_TOOL_RECORD), "Server tool summaries."),
    OutputField::new("events", OutputKind::Detail, "Connection events."),
    OutputField::new("count", OutputKind::Integer, "Number of returned items."),
    OutputField::new("data", OutputKind::Detail, "Raw backend payload."),
];

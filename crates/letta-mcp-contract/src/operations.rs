// crates/letta-mcp-contract/src/operations.rs
// ============================================================================
// Module: Operation Catalogs
// Description: Typed operation enums for every consolidated tool.
// Purpose: Drive schema enums and exhaustive handler dispatch from one table.
// Dependencies: crate::types
// ============================================================================

//! ## Overview
//! Each consolidated tool has one operation enum. A variant's wire name,
//! error-context label, and required/optional payload fields are declared
//! together so the input schema and the dispatch `match` cannot drift apart.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use crate::types::OperationSpec;

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Declares an operation enum with its wire names and payload contracts.
macro_rules! operation_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident => $wire:literal, $label:literal,
                required [$($req:literal),* $(,)?],
                optional [$($opt:literal),* $(,)?];
            )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                $variant,
            )+
        }

        impl $name {
            /// Every operation in canonical enum order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Returns the wire value of the `operation` discriminator.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }

            /// Parses an operation from its wire value.
            #[must_use]
            pub fn parse(value: &str) -> Option<Self> {
                match value {
                    $($wire => Some(Self::$variant),)+
                    _ => None,
                }
            }

            /// Returns the static payload contract for this operation.
            #[must_use]
            pub const fn spec(self) -> OperationSpec {
                match self {
                    $(
                        Self::$variant => OperationSpec {
                            name: $wire,
                            label: $label,
                            required: &[$($req),*],
                            optional: &[$($opt),*],
                        },
                    )+
                }
            }

            /// Returns all operation specs in enum order.
            #[must_use]
            pub fn specs() -> Vec<OperationSpec> {
                Self::ALL.iter().map(|operation| operation.spec()).collect()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str(self.as_str())
            }
        }
    };
}

// ============================================================================
// SECTION: Agents
// ============================================================================

operation_enum! {
    /// Operations multiplexed by `letta_agent_advanced`.
    AgentOperation {
        /// List agents.
        List => "list", "listing agents",
            required [], optional ["pagination", "query", "tags"];
        /// Create an agent.
        Create => "create", "creating agent",
            required ["name"],
            optional [
                "description", "system", "llm_config", "embedding_config", "tool_ids", "tags"
            ];
        /// Retrieve one agent.
        Get => "get", "retrieving agent", required ["agent_id"], optional [];
        /// Patch agent fields.
        Update => "update", "updating agent", required ["agent_id", "update_data"], optional [];
        /// Delete an agent.
        Delete => "delete", "deleting agent", required ["agent_id"], optional [];
        /// List tools attached to an agent.
        ListTools => "list_tools", "listing agent tools", required ["agent_id"], optional [];
        /// Send messages and wait for the reply.
        SendMessage => "send_message", "sending message",
            required ["agent_id", "messages"], optional [];
        /// Export an agent definition.
        Export => "export", "exporting agent", required ["agent_id"], optional [];
        /// Import an exported agent definition.
        Import => "import", "importing agent", required ["export_data"], optional ["name"];
        /// Export then re-import an agent under a new name.
        CloneAgent => "clone", "cloning agent", required ["agent_id", "name"], optional [];
        /// Summarize agent configuration.
        GetConfig => "get_config", "reading agent configuration",
            required ["agent_id"], optional [];
        /// Delete every agent matching a filter.
        BulkDelete => "bulk_delete", "bulk deleting agents", required ["filters"], optional [];
        /// Read the context window overview.
        Context => "context", "reading agent context", required ["agent_id"], optional [];
        /// Reset the message history.
        ResetMessages => "reset_messages", "resetting messages",
            required ["agent_id"], optional ["add_default_initial_messages"];
        /// Summarize the conversation history.
        Summarize => "summarize", "summarizing conversation",
            required ["agent_id"], optional ["max_message_length"];
        /// Send messages and collect the streamed events.
        Stream => "stream", "streaming message", required ["agent_id", "messages"], optional [];
        /// Send messages asynchronously.
        AsyncMessage => "async_message", "sending async message",
            required ["agent_id", "messages"], optional [];
        /// Cancel in-flight runs.
        CancelMessage => "cancel_message", "cancelling message",
            required ["agent_id"], optional ["run_ids"];
        /// Preview the raw LLM request payload.
        PreviewPayload => "preview_payload", "previewing payload",
            required ["agent_id", "messages"], optional [];
        /// Search an agent's message history.
        SearchMessages => "search_messages", "searching messages",
            required ["agent_id"], optional ["query", "search_filters", "pagination"];
        /// Retrieve one message.
        GetMessage => "get_message", "retrieving message",
            required ["agent_id", "message_id"], optional [];
        /// Count agents.
        Count => "count", "counting agents", required [], optional [];
    }
}

// ============================================================================
// SECTION: Memory
// ============================================================================

operation_enum! {
    /// Operations multiplexed by `letta_memory_unified`.
    MemoryOperation {
        /// Read an agent's core memory.
        GetCoreMemory => "get_core_memory", "reading core memory",
            required ["agent_id"], optional [];
        /// Update one core memory block by label.
        UpdateCoreMemory => "update_core_memory", "updating core memory",
            required ["agent_id", "block_label", "value"], optional [];
        /// Read one core memory block by label.
        GetBlockByLabel => "get_block_by_label", "reading memory block",
            required ["agent_id", "block_label"], optional [];
        /// List memory blocks.
        ListBlocks => "list_blocks", "listing memory blocks",
            required [], optional ["agent_id", "label", "limit"];
        /// Create a memory block.
        CreateBlock => "create_block", "creating memory block",
            required ["label", "value"], optional ["description", "is_template", "agent_id"];
        /// Retrieve a memory block.
        GetBlock => "get_block", "retrieving memory block", required ["block_id"], optional [];
        /// Patch a memory block.
        UpdateBlock => "update_block", "updating memory block",
            required ["block_id"], optional ["value", "label", "description"];
        /// Attach a block to an agent.
        AttachBlock => "attach_block", "attaching memory block",
            required ["agent_id", "block_id"], optional [];
        /// Detach a block from an agent.
        DetachBlock => "detach_block", "detaching memory block",
            required ["agent_id", "block_id"], optional [];
        /// List agents that use a block.
        ListAgentsUsingBlock => "list_agents_using_block", "listing agents using block",
            required ["block_id"], optional [];
        /// Search archival memory.
        SearchArchival => "search_archival", "searching archival memory",
            required ["agent_id", "query"], optional ["limit"];
        /// List archival passages.
        ListPassages => "list_passages", "listing passages",
            required ["agent_id"], optional ["limit"];
        /// Insert an archival passage.
        CreatePassage => "create_passage", "creating passage",
            required ["agent_id", "text"], optional [];
        /// Rewrite an archival passage.
        UpdatePassage => "update_passage", "updating passage",
            required ["agent_id", "passage_id", "text"], optional [];
        /// Delete an archival passage.
        DeletePassage => "delete_passage", "deleting passage",
            required ["agent_id", "passage_id"], optional [];
    }
}

// ============================================================================
// SECTION: Tool Manager
// ============================================================================

operation_enum! {
    /// Operations multiplexed by `letta_tool_manager`.
    ToolManagerOperation {
        /// List tools.
        List => "list", "listing tools", required [], optional ["limit", "name"];
        /// Retrieve a tool.
        Get => "get", "retrieving tool", required ["tool_id"], optional [];
        /// Create a tool from source.
        Create => "create", "creating tool",
            required ["source_code"],
            optional [
                "description", "tags", "source_type", "json_schema", "args_json_schema",
                "return_char_limit"
            ];
        /// Patch a tool.
        Update => "update", "updating tool",
            required ["tool_id"],
            optional [
                "source_code", "description", "tags", "source_type", "json_schema",
                "args_json_schema", "return_char_limit"
            ];
        /// Delete a tool.
        Delete => "delete", "deleting tool", required ["tool_id"], optional [];
        /// Create or replace a tool by name.
        Upsert => "upsert", "upserting tool",
            required ["source_code"],
            optional [
                "description", "tags", "source_type", "json_schema", "args_json_schema",
                "return_char_limit"
            ];
        /// Attach a tool to an agent.
        Attach => "attach", "attaching tool", required ["tool_id", "agent_id"], optional [];
        /// Detach a tool from an agent.
        Detach => "detach", "detaching tool", required ["tool_id", "agent_id"], optional [];
        /// Attach a tool to several agents.
        BulkAttach => "bulk_attach", "bulk attaching tool",
            required ["tool_id", "agent_ids"], optional [];
        /// Generate a tool from a natural-language prompt.
        GenerateFromPrompt => "generate_from_prompt", "generating tool",
            required ["prompt"], optional ["name"];
        /// Generate a JSON schema from source code.
        GenerateSchema => "generate_schema", "generating tool schema",
            required ["source_code"], optional ["name"];
        /// Execute tool source without persisting it.
        RunFromSource => "run_from_source", "running tool from source",
            required ["source_code", "args"],
            optional ["env_vars", "name", "source_type", "args_json_schema"];
        /// Install the built-in base tools.
        AddBaseTools => "add_base_tools", "adding base tools", required [], optional [];
    }
}

// ============================================================================
// SECTION: Sources
// ============================================================================

operation_enum! {
    /// Operations multiplexed by `letta_source_manager`.
    SourceOperation {
        /// List sources.
        List => "list", "listing sources", required [], optional ["limit"];
        /// Retrieve a source.
        Get => "get", "retrieving source", required ["source_id"], optional [];
        /// Create a source.
        Create => "create", "creating source",
            required ["name"], optional ["description", "embedding_config"];
        /// Patch a source.
        Update => "update", "updating source",
            required ["source_id"], optional ["name", "description"];
        /// Delete a source.
        Delete => "delete", "deleting source", required ["source_id"], optional [];
        /// Count sources.
        Count => "count", "counting sources", required [], optional [];
        /// Attach a source to an agent.
        Attach => "attach", "attaching source", required ["source_id", "agent_id"], optional [];
        /// Detach a source from an agent.
        Detach => "detach", "detaching source", required ["source_id", "agent_id"], optional [];
        /// List sources attached to an agent.
        ListAttached => "list_attached", "listing attached sources",
            required ["agent_id"], optional [];
        /// Upload a base64-encoded file into a source.
        Upload => "upload", "uploading file",
            required ["source_id", "file_name", "file_data"], optional ["content_type"];
        /// Delete a file from a source.
        DeleteFiles => "delete_files", "deleting source file",
            required ["source_id", "file_id"], optional [];
        /// List files in a source.
        ListFiles => "list_files", "listing source files",
            required ["source_id"], optional ["limit", "include_content"];
        /// List folders.
        ListFolders => "list_folders", "listing folders", required [], optional ["limit"];
        /// List files in a folder-backed source.
        GetFolderContents => "get_folder_contents", "reading folder contents",
            required ["source_id"], optional ["limit"];
        /// List agents that use a source.
        ListAgentsUsing => "list_agents_using", "listing agents using source",
            required ["source_id"], optional [];
    }
}

// ============================================================================
// SECTION: Jobs
// ============================================================================

operation_enum! {
    /// Operations multiplexed by `letta_job_monitor`.
    JobOperation {
        /// List jobs.
        List => "list", "listing jobs", required [], optional ["limit"];
        /// Retrieve a job.
        Get => "get", "retrieving job", required ["job_id"], optional [];
        /// Cancel a job.
        Cancel => "cancel", "cancelling job", required ["job_id"], optional [];
        /// List running jobs.
        ListActive => "list_active", "listing active jobs", required [], optional ["limit"];
    }
}

// ============================================================================
// SECTION: Files and Folders
// ============================================================================

operation_enum! {
    /// Operations multiplexed by `letta_file_folder_ops`.
    FileFolderOperation {
        /// List files visible to an agent.
        ListFiles => "list_files", "listing agent files", required ["agent_id"], optional ["limit"];
        /// Open a file in the agent's context window.
        OpenFile => "open_file", "opening file", required ["agent_id", "file_id"], optional [];
        /// Close a file in the agent's context window.
        CloseFile => "close_file", "closing file", required ["agent_id", "file_id"], optional [];
        /// Close every open file.
        CloseAllFiles => "close_all_files", "closing all files",
            required ["agent_id"], optional [];
        /// List folders.
        ListFolders => "list_folders", "listing folders",
            required [], optional ["agent_id", "limit"];
        /// Attach a folder to an agent.
        AttachFolder => "attach_folder", "attaching folder",
            required ["agent_id", "folder_id"], optional [];
        /// Detach a folder from an agent.
        DetachFolder => "detach_folder", "detaching folder",
            required ["agent_id", "folder_id"], optional [];
        /// List agents attached to a folder.
        ListAgentsInFolder => "list_agents_in_folder", "listing agents in folder",
            required ["folder_id"], optional [];
    }
}

// ============================================================================
// SECTION: MCP Servers
// ============================================================================

operation_enum! {
    /// Operations multiplexed by `letta_mcp_ops`.
    McpOperation {
        /// Register an MCP server.
        Add => "add", "adding MCP server", required ["server_config"], optional ["oauth_config"];
        /// Replace an MCP server configuration.
        Update => "update", "updating MCP server",
            required ["server_name", "server_config"], optional ["oauth_config"];
        /// Remove an MCP server.
        Delete => "delete", "deleting MCP server", required ["server_name"], optional [];
        /// Test connectivity to an MCP server configuration.
        Test => "test", "testing MCP server", required ["server_config"], optional [];
        /// Connect to an MCP server and collect handshake events.
        Connect => "connect", "connecting MCP server",
            required [], optional ["server_config", "server_name"];
        /// Refresh the tool list of a registered server.
        Resync => "resync", "resyncing MCP server", required ["server_name"], optional [];
        /// Execute a server tool.
        Execute => "execute", "executing MCP tool",
            required ["server_name", "tool_name"], optional ["tool_args"];
        /// List registered servers.
        ListServers => "list_servers", "listing MCP servers", required [], optional ["pagination"];
        /// List tools exposed by a server.
        ListTools => "list_tools", "listing MCP tools", required ["server_name"], optional [];
        /// Register a server tool as a Letta tool.
        RegisterTool => "register_tool", "registering MCP tool",
            required ["server_name", "tool_name"], optional [];
    }
}

// crates/letta-mcp/src/handlers/mcp_ops.rs
// ============================================================================
// Module: MCP Server Handler
// Description: Operations of `letta_mcp_ops`.
// Purpose: Register, test, connect, and execute tools on MCP servers.
// Dependencies: letta-mcp-client, letta-mcp-contract, serde_json, url
// ============================================================================

//! ## Overview
//! Server configurations are checked locally before they reach the backend:
//! `type` must be `stdio` (with `command`), `sse`, or `streamable_http`
//! (with `server_url`). `oauth_config` entries are merged over the server
//! configuration. When no `server_name` is given one is derived from the
//! command or the URL host.
//!
//! ## Invariants
//! - `execute` always sends an `args` object; absent `tool_args` is `{}`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Instant;

use async_trait::async_trait;
use letta_mcp_client::BackendClient;
use letta_mcp_client::BackendRequest;
use letta_mcp_client::EntityKind;
use letta_mcp_client::normalize_list;
use letta_mcp_contract::McpOperation;
use letta_mcp_contract::ToolName;
use letta_mcp_contract::fields::MCP_TOOL_RECORD;
use letta_mcp_contract::fields::SERVER_RECORD;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use url::Url;

use crate::errors::ToolError;
use crate::handlers::ToolHandler;
use crate::handlers::call;
use crate::handlers::call_list;
use crate::handlers::parse_operation;
use crate::handlers::window;
use crate::request::OperationRequest;
use crate::response::OperationResponse;
use crate::response::entity_str;

/// Connection event names that mean the handshake failed.
const FAILURE_EVENTS: &[&str] = &["error", "connection_failed"];

// ============================================================================
// SECTION: Server Configuration
// ============================================================================

/// Transport kinds accepted in `server_config.type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerType {
    /// Local process speaking MCP over stdio.
    Stdio,
    /// Remote server using server-sent events.
    Sse,
    /// Remote server using streamable HTTP.
    StreamableHttp,
}

impl ServerType {
    /// Parses the wire value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "stdio" => Some(Self::Stdio),
            "sse" => Some(Self::Sse),
            "streamable_http" => Some(Self::StreamableHttp),
            _ => None,
        }
    }
}

/// Checks a server configuration, merges OAuth settings, and fills in a
/// server name when none was given.
///
/// # Errors
///
/// Returns [`ToolError::MissingField`] naming the absent configuration key
/// and [`ToolError::InvalidParams`] for unusable values.
pub fn prepare_server_config(
    config: &Map<String, Value>,
    oauth: Option<&Map<String, Value>>,
) -> Result<Map<String, Value>, ToolError> {
    let mut prepared = config.clone();
    if let Some(oauth) = oauth {
        for (key, value) in oauth {
            prepared.insert(key.clone(), value.clone());
        }
    }
    let kind = prepared
        .get("type")
        .ok_or_else(|| ToolError::MissingField("server_config.type".to_string()))?
        .as_str()
        .and_then(ServerType::parse)
        .ok_or_else(|| {
            ToolError::InvalidParams(
                "server_config.type must be stdio, sse, or streamable_http".to_string(),
            )
        })?;
    let derived_name = match kind {
        ServerType::Stdio => {
            let command = required_str(&prepared, "command")?;
            if let Some(args) = prepared.get("args")
                && !args.as_array().is_some_and(|args| args.iter().all(Value::is_string))
            {
                return Err(ToolError::InvalidParams(
                    "server_config.args must be an array of strings".to_string(),
                ));
            }
            command.rsplit(['/', '\\']).next().unwrap_or(command).to_string()
        }
        ServerType::Sse | ServerType::StreamableHttp => {
            let raw = required_str(&prepared, "server_url")?;
            let url = Url::parse(raw).map_err(|err| {
                ToolError::InvalidParams(format!("server_config.server_url is invalid: {err}"))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ToolError::InvalidParams(
                    "server_config.server_url must use http or https".to_string(),
                ));
            }
            url.host_str().unwrap_or("mcp-server").to_string()
        }
    };
    let has_name = prepared
        .get("server_name")
        .and_then(Value::as_str)
        .is_some_and(|name| !name.is_empty());
    if !has_name {
        prepared.insert("server_name".to_string(), Value::String(derived_name));
    }
    Ok(prepared)
}

/// Reads a non-empty string from a server configuration.
fn required_str<'a>(config: &'a Map<String, Value>, key: &str) -> Result<&'a str, ToolError> {
    config
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ToolError::MissingField(format!("server_config.{key}")))
}

// ============================================================================
// SECTION: Handler
// ============================================================================

/// Handler for `letta_mcp_ops`.
pub struct McpOpsHandler;

#[async_trait]
impl ToolHandler for McpOpsHandler {
    fn tool(&self) -> ToolName {
        ToolName::LettaMcpOps
    }

    fn operations(&self) -> Vec<&'static str> {
        McpOperation::ALL.iter().map(|operation| operation.as_str()).collect()
    }

    async fn handle(
        &self,
        client: &BackendClient,
        request: OperationRequest,
    ) -> Result<Value, ToolError> {
        let operation = parse_operation(&request, McpOperation::parse)?;
        let call = McpCall {
            client,
            request: &request,
            label: operation.spec().label,
            operation: operation.as_str(),
        };
        match operation {
            McpOperation::Add => call.add().await,
            McpOperation::Update => call.update().await,
            McpOperation::Delete => call.delete().await,
            McpOperation::Test => call.test().await,
            McpOperation::Connect => call.connect().await,
            McpOperation::Resync => call.resync().await,
            McpOperation::Execute => call.execute().await,
            McpOperation::ListServers => call.list_servers().await,
            McpOperation::ListTools => call.list_tools().await,
            McpOperation::RegisterTool => call.register_tool().await,
        }
    }
}

// ============================================================================
// SECTION: Operations
// ============================================================================

/// One MCP operation in flight.
struct McpCall<'a> {
    /// Shared backend client.
    client: &'a BackendClient,
    /// Validated arguments.
    request: &'a OperationRequest,
    /// Action label for backend failures.
    label: &'static str,
    /// Operation wire value echoed in the result.
    operation: &'static str,
}

impl McpCall<'_> {
    /// Starts a successful result.
    fn ok(&self) -> OperationResponse {
        OperationResponse::ok(self.operation)
    }

    /// Returns the prepared `server_config` argument.
    fn server_config(&self) -> Result<Map<String, Value>, ToolError> {
        let config = self.request.object("server_config")?;
        let oauth = match self.request.opt_value("oauth_config") {
            Some(value) => Some(value.as_object().ok_or_else(|| {
                ToolError::InvalidParams("oauth_config must be an object".to_string())
            })?),
            None => None,
        };
        prepare_server_config(config, oauth)
    }

    async fn add(&self) -> Result<Value, ToolError> {
        let config = self.server_config()?;
        let server_name = entity_str_map(&config, "server_name").to_string();
        let request = BackendRequest::put(["tools", "mcp", "servers"]).json(Value::Object(config));
        let body = call(self.client, self.label, request).await?;
        let server_id = registered_id(&body, &server_name);
        Ok(self
            .ok()
            .message(format!("MCP server {server_name} added"))
            .with_str("server_name", server_name.as_str())
            .with_opt_str("server_id", server_id.as_deref())
            .data(body)
            .build())
    }

    async fn update(&self) -> Result<Value, ToolError> {
        let server_name = self.request.str("server_name")?;
        let raw = self.request.object("server_config")?;
        let mut config = if raw.contains_key("type") {
            self.server_config()?
        } else {
            let mut merged = raw.clone();
            if let Some(oauth) = self.request.opt_value("oauth_config").and_then(Value::as_object) {
                merged.extend(oauth.iter().map(|(key, value)| (key.clone(), value.clone())));
            }
            merged
        };
        config.remove("server_name");
        let request = BackendRequest::patch(["tools", "mcp", "servers", server_name])
            .json(Value::Object(config));
        let server = call(self.client, self.label, request).await?;
        Ok(self
            .ok()
            .message(format!("MCP server {server_name} updated"))
            .with_str("server_name", server_name)
            .with_opt_str("server_id", entity_str(&server, "id"))
            .data(server)
            .build())
    }

    async fn delete(&self) -> Result<Value, ToolError> {
        let server_name = self.request.str("server_name")?;
        let request = BackendRequest::delete(["tools", "mcp", "servers", server_name]);
        call(self.client, self.label, request).await?;
        Ok(self
            .ok()
            .message(format!("MCP server {server_name} deleted"))
            .with_str("server_name", server_name)
            .build())
    }

    async fn test(&self) -> Result<Value, ToolError> {
        let config = self.server_config()?;
        let server_name = entity_str_map(&config, "server_name").to_string();
        let request =
            BackendRequest::post(["tools", "mcp", "servers", "test"]).json(Value::Object(config));
        let started = Instant::now();
        let body = call(self.client, self.label, request).await?;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let mut response = self
            .ok()
            .message(format!("MCP server {server_name} is reachable"))
            .with_str("server_name", server_name)
            .with("connected", Value::Bool(true))
            .with("latency_ms", Value::from(latency_ms));
        if let Ok(tools) = normalize_list(EntityKind::McpTools, body.clone()) {
            response = response.with_records("tools", &server_tools(tools), MCP_TOOL_RECORD);
        }
        Ok(response.data(body).build())
    }

    async fn connect(&self) -> Result<Value, ToolError> {
        let config = if self.request.has("server_config") {
            self.server_config()?
        } else if let Some(server_name) = self.request.opt_str("server_name") {
            self.registered_config(server_name).await?
        } else {
            return Err(ToolError::MissingField("server_config".to_string()));
        };
        let server_name = entity_str_map(&config, "server_name").to_string();
        let request = BackendRequest::post(["tools", "mcp", "servers", "connect"])
            .json(Value::Object(config))
            .event_stream();
        let events = call(self.client, self.label, request).await?;
        let failed = events.as_array().is_some_and(|events| {
            events.iter().any(|event| {
                entity_str(event, "event").is_some_and(|name| FAILURE_EVENTS.contains(&name))
            })
        });
        let message = if failed {
            format!("Connection to MCP server {server_name} failed")
        } else {
            format!("Connected to MCP server {server_name}")
        };
        Ok(self
            .ok()
            .success(!failed)
            .message(message)
            .with_str("server_name", server_name)
            .with("connected", Value::Bool(!failed))
            .with("events", events)
            .build())
    }

    /// Looks up the stored configuration of a registered server.
    async fn registered_config(&self, server_name: &str) -> Result<Map<String, Value>, ToolError> {
        let request = BackendRequest::get(["tools", "mcp", "servers"]);
        let servers = call_list(self.client, self.label, EntityKind::McpServers, request).await?;
        servers
            .into_iter()
            .find(|server| entity_str(server, "server_name") == Some(server_name))
            .and_then(|server| match server {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .ok_or_else(|| ToolError::NotFound(format!("MCP server {server_name}")))
    }

    async fn resync(&self) -> Result<Value, ToolError> {
        let server_name = self.request.str("server_name")?;
        let request = BackendRequest::post(["tools", "mcp", "servers", server_name, "resync"])
            .retryable();
        let result = call(self.client, self.label, request).await?;
        Ok(self
            .ok()
            .message(format!("MCP server {server_name} resynced"))
            .with_str("server_name", server_name)
            .data(result)
            .build())
    }

    async fn execute(&self) -> Result<Value, ToolError> {
        let server_name = self.request.str("server_name")?;
        let tool_name = self.request.str("tool_name")?;
        let args = self.request.opt_value("tool_args").cloned().unwrap_or_else(|| json!({}));
        let request = BackendRequest::post([
            "tools",
            "mcp",
            "servers",
            server_name,
            "tools",
            tool_name,
            "execute",
        ])
        .json(json!({ "args": args }));
        let result = call(self.client, self.label, request).await?;
        Ok(self
            .ok()
            .message(format!("Executed {tool_name} on {server_name}"))
            .with_str("server_name", server_name)
            .with_str("tool_name", tool_name)
            .data(result)
            .build())
    }

    async fn list_servers(&self) -> Result<Value, ToolError> {
        let page = self.request.pagination();
        let request = BackendRequest::get(["tools", "mcp", "servers"]);
        let servers = call_list(self.client, self.label, EntityKind::McpServers, request).await?;
        let servers = window(servers, page.offset, page.limit);
        Ok(self
            .ok()
            .message(format!("Found {} MCP servers", servers.len()))
            .with_records("servers", &servers, SERVER_RECORD)
            .build())
    }

    async fn list_tools(&self) -> Result<Value, ToolError> {
        let server_name = self.request.str("server_name")?;
        let request = BackendRequest::get(["tools", "mcp", "servers", server_name, "tools"]);
        let tools = call_list(self.client, self.label, EntityKind::McpTools, request).await?;
        let tools = server_tools(tools);
        Ok(self
            .ok()
            .message(format!("Found {} tools on server {server_name}", tools.len()))
            .with_str("server_name", server_name)
            .with_records("tools", &tools, MCP_TOOL_RECORD)
            .build())
    }

    async fn register_tool(&self) -> Result<Value, ToolError> {
        let server_name = self.request.str("server_name")?;
        let tool_name = self.request.str("tool_name")?;
        let request = BackendRequest::post(["tools", "mcp", "servers", server_name, tool_name]);
        let tool = call(self.client, self.label, request).await?;
        Ok(self
            .ok()
            .message(format!("Tool {tool_name} from {server_name} registered in Letta"))
            .with_str("server_name", server_name)
            .with_str("tool_name", tool_name)
            .with_opt_str("tool_id", entity_str(&tool, "id"))
            .data(tool)
            .build())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads a string known to be present in a prepared configuration.
fn entity_str_map<'a>(config: &'a Map<String, Value>, key: &str) -> &'a str {
    config.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// Finds the identifier assigned to a newly added server.
///
/// The backend answers with the stored server or with the full server list.
fn registered_id(body: &Value, server_name: &str) -> Option<String> {
    if let Some(id) = entity_str(body, "id") {
        return Some(id.to_string());
    }
    normalize_list(EntityKind::McpServers, body.clone())
        .ok()?
        .iter()
        .find(|server| entity_str(server, "server_name") == Some(server_name))
        .and_then(|server| entity_str(server, "id"))
        .map(str::to_string)
}

/// Renames the backend's schema field to `inputSchema`.
fn server_tools(tools: Vec<Value>) -> Vec<Value> {
    tools
        .into_iter()
        .map(|mut tool| {
            if let Some(object) = tool.as_object_mut()
                && !object.contains_key("inputSchema")
            {
                let schema = object
                    .remove("input_schema")
                    .or_else(|| object.remove("json_schema"))
                    .or_else(|| object.remove("schema"));
                if let Some(schema) = schema {
                    object.insert("inputSchema".to_string(), schema);
                }
            }
            tool
        })
        .collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions use unwrap/expect for clarity."
    )]

    use serde_json::Map;
    use serde_json::Value;
    use serde_json::json;

    use super::prepare_server_config;
    use super::registered_id;
    use super::server_tools;
    use crate::errors::ToolError;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn stdio_config_gets_a_derived_name() {
        let config =
            object(json!({ "type": "stdio", "command": "/usr/bin/node", "args": ["s.js"] }));
        let prepared = prepare_server_config(&config, None).unwrap();
        assert_eq!(prepared["server_name"], json!("node"));
    }

    #[test]
    fn explicit_names_are_kept() {
        let config = object(json!({
            "type": "sse",
            "server_url": "https://mcp.example/sse",
            "server_name": "x"
        }));
        assert_eq!(prepare_server_config(&config, None).unwrap()["server_name"], json!("x"));
        let config = object(json!({ "type": "sse", "server_url": "https://mcp.example/sse" }));
        let prepared = prepare_server_config(&config, None).unwrap();
        assert_eq!(prepared["server_name"], json!("mcp.example"));
    }

    #[test]
    fn type_specific_fields_are_required() {
        let stdio = object(json!({ "type": "stdio" }));
        assert_eq!(
            prepare_server_config(&stdio, None),
            Err(ToolError::MissingField("server_config.command".to_string()))
        );
        let http = object(json!({ "type": "streamable_http" }));
        assert_eq!(
            prepare_server_config(&http, None),
            Err(ToolError::MissingField("server_config.server_url".to_string()))
        );
        let untyped = object(json!({ "command": "node" }));
        assert_eq!(
            prepare_server_config(&untyped, None),
            Err(ToolError::MissingField("server_config.type".to_string()))
        );
        let unknown = object(json!({ "type": "websocket" }));
        assert!(matches!(prepare_server_config(&unknown, None), Err(ToolError::InvalidParams(_))));
    }

    #[test]
    fn oauth_settings_are_merged() {
        let config = object(json!({ "type": "sse", "server_url": "https://a.example" }));
        let oauth = object(json!({ "auth_header": "Authorization", "auth_token": "t" }));
        let prepared = prepare_server_config(&config, Some(&oauth)).unwrap();
        assert_eq!(prepared["auth_token"], json!("t"));
    }

    #[test]
    fn registered_id_reads_object_or_list() {
        assert_eq!(registered_id(&json!({ "id": "s-1" }), "x").as_deref(), Some("s-1"));
        let list =
            json!([{ "id": "s-2", "server_name": "a" }, { "id": "s-3", "server_name": "b" }]);
        assert_eq!(registered_id(&list, "b").as_deref(), Some("s-3"));
    }

    #[test]
    fn tool_schemas_are_renamed() {
        let tool = json!({ "name": "echo", "input_schema": { "type": "object" } });
        let tools = server_tools(vec![tool]);
        assert_eq!(tools[0]["inputSchema"], json!({ "type": "object" }));
    }
}

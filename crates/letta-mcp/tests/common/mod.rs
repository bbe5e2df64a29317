// crates/letta-mcp/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: In-memory Letta backend and router builders.
// Purpose: Drive every consolidated operation without a network.
// Dependencies: letta-mcp, letta-mcp-client, letta-mcp-config
// ============================================================================

//! ## Overview
//! [`FakeLetta`] answers the REST paths the handlers call with the body
//! shapes the real backend uses: deletes answer 204 with no body, the
//! streaming endpoints answer `data:` event text, and unknown identifiers
//! answer 404. Every request is logged so tests can assert on the exact
//! wire payload.

#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Shared test helpers may be unused in some cases and unwrap for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use letta_mcp::ToolRouter;
use letta_mcp_client::BackendClient;
use letta_mcp_client::BackendRequest;
use letta_mcp_client::BackendResponse;
use letta_mcp_client::BackendTransport;
use letta_mcp_client::ClientPolicy;
use letta_mcp_client::HttpMethod;
use letta_mcp_client::RequestBody;
use letta_mcp_client::TransportError;
use letta_mcp_config::ValidationConfig;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Router Builders
// ============================================================================

/// Client policy for tests: no retries and a short deadline.
#[must_use]
pub fn test_policy() -> ClientPolicy {
    ClientPolicy {
        max_concurrent_requests: 8,
        request_timeout: Duration::from_millis(500),
        max_retries: 0,
        retry_backoff: Duration::from_millis(1),
    }
}

/// Builds a strict router with legacy aliases over any transport.
#[must_use]
pub fn router_over(transport: Arc<dyn BackendTransport>) -> ToolRouter {
    let client = BackendClient::new(transport, test_policy());
    ToolRouter::builtin(client, ValidationConfig::default(), true).expect("router")
}

/// Builds a strict router with legacy aliases over the fake backend.
#[must_use]
pub fn router(fake: &Arc<FakeLetta>) -> ToolRouter {
    router_over(Arc::clone(fake) as Arc<dyn BackendTransport>)
}

/// Dispatches a call that must succeed and returns its result.
pub async fn call_ok(router: &ToolRouter, tool: &str, arguments: Value) -> Value {
    match router.dispatch(tool, arguments).await {
        Ok(value) => value,
        Err(err) => panic!("{tool} failed: {}", err.message),
    }
}

// ============================================================================
// SECTION: Fake Backend
// ============================================================================

/// Canned reply before it becomes a transport result.
enum Reply {
    /// JSON body with a status.
    Json(u16, Value),
    /// Raw text body with a status.
    Text(u16, String),
    /// Empty body with a status.
    Empty(u16),
    /// Transport-level failure.
    Fail(TransportError),
}

/// In-memory Letta backend.
pub struct FakeLetta {
    /// Mutable backend state.
    state: Mutex<FakeState>,
}

/// Backend collections and bookkeeping.
#[derive(Default)]
struct FakeState {
    next_id: u64,
    agents: Vec<Value>,
    tools: Vec<Value>,
    blocks: Vec<Value>,
    passages: Vec<Value>,
    sources: Vec<Value>,
    files: Vec<Value>,
    jobs: Vec<Value>,
    servers: Vec<Value>,
    messages: BTreeMap<String, Vec<Value>>,
    agent_blocks: BTreeMap<String, Vec<String>>,
    agent_sources: BTreeMap<String, Vec<String>>,
    open_files: BTreeMap<String, Vec<String>>,
    forced_failures: Vec<(u16, Value)>,
    log: Vec<BackendRequest>,
}

impl FakeLetta {
    /// Creates an empty backend with one running job.
    #[must_use]
    pub fn new() -> Arc<Self> {
        let mut state = FakeState::default();
        state.jobs.push(json!({
            "id": "job-seed",
            "status": "running",
            "job_type": "file_processing",
            "created_at": "2026-01-01T00:00:00Z",
            "metadata": {}
        }));
        Arc::new(Self {
            state: Mutex::new(state),
        })
    }

    /// Returns every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<BackendRequest> {
        self.state.lock().unwrap().log.clone()
    }

    /// Returns the most recent request.
    #[must_use]
    pub fn last_request(&self) -> BackendRequest {
        self.requests().pop().expect("at least one request")
    }

    /// Returns the most recent request with the given path.
    #[must_use]
    pub fn last_request_to(&self, path: &str) -> BackendRequest {
        self.requests()
            .into_iter()
            .rev()
            .find(|request| request.path() == path)
            .unwrap_or_else(|| panic!("no request to {path}"))
    }

    /// Answers the next request with a fixed error status and body.
    pub fn fail_next(&self, status: u16, body: Value) {
        self.state.lock().unwrap().forced_failures.push((status, body));
    }

    /// Returns the stored agents.
    #[must_use]
    pub fn agents(&self) -> Vec<Value> {
        self.state.lock().unwrap().agents.clone()
    }
}

#[async_trait]
impl BackendTransport for FakeLetta {
    async fn send(&self, request: &BackendRequest) -> Result<BackendResponse, TransportError> {
        let reply = {
            let mut state = self.state.lock().unwrap();
            state.log.push(request.clone());
            if state.forced_failures.is_empty() {
                state.route(request)
            } else {
                let (status, body) = state.forced_failures.remove(0);
                Reply::Json(status, body)
            }
        };
        match reply {
            Reply::Json(status, body) => Ok(BackendResponse::json(status, &body)),
            Reply::Text(status, text) => Ok(BackendResponse {
                status,
                body: text.into_bytes(),
            }),
            Reply::Empty(status) => Ok(BackendResponse {
                status,
                body: Vec::new(),
            }),
            Reply::Fail(err) => Err(err),
        }
    }
}

/// Transport that never answers.
pub struct StallingTransport;

#[async_trait]
impl BackendTransport for StallingTransport {
    async fn send(&self, _request: &BackendRequest) -> Result<BackendResponse, TransportError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Err(TransportError::Other("stalled".to_string()))
    }
}

// ============================================================================
// SECTION: Routing
// ============================================================================

/// Success reply.
fn ok(body: Value) -> Reply {
    Reply::Json(200, body)
}

/// 404 reply naming the missing entity.
fn missing(what: &str) -> Reply {
    Reply::Json(404, json!({ "detail": format!("{what} not found") }))
}

/// Finds an entity index by identifier.
fn position(items: &[Value], id: &str) -> Option<usize> {
    items.iter().position(|item| item["id"] == id)
}

/// Merges a JSON object into an entity.
fn merge(entity: &mut Value, patch: &Value) {
    if let (Some(target), Some(source)) = (entity.as_object_mut(), patch.as_object()) {
        for (key, value) in source {
            target.insert(key.clone(), value.clone());
        }
    }
}

/// Returns the function name declared in Python tool source.
fn python_name(source: &str) -> Option<String> {
    let rest = source.split("def ").nth(1)?;
    let name: String = rest.chars().take_while(|ch| ch.is_alphanumeric() || *ch == '_').collect();
    (!name.is_empty()).then_some(name)
}

/// Formats a server-sent event body.
fn event_stream(events: &[Value]) -> String {
    let mut text = String::new();
    for event in events {
        text.push_str("data: ");
        text.push_str(&event.to_string());
        text.push_str("\n\n");
    }
    text.push_str("data: [DONE]\n\n");
    text
}

/// Tools every fake MCP server exposes.
fn server_tools() -> Value {
    json!([
        {
            "name": "echo",
            "description": "Echo the input",
            "input_schema": { "type": "object", "properties": { "text": { "type": "string" } } }
        },
        {
            "name": "add",
            "description": "Add two numbers",
            "json_schema": { "type": "object", "properties": { "a": {}, "b": {} } }
        }
    ])
}

impl FakeState {
    /// Allocates an identifier with a prefix.
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    /// Returns a deterministic timestamp for the current counter.
    fn now(&self) -> String {
        format!("2026-01-01T00:{:02}:{:02}Z", (self.next_id / 60) % 60, self.next_id % 60)
    }

    /// Dispatches one request.
    #[allow(clippy::too_many_lines, reason = "One flat route table reads best.")]
    fn route(&mut self, request: &BackendRequest) -> Reply {
        let segments: Vec<&str> = request.segments.iter().map(String::as_str).collect();
        let body = request.json_body().cloned().unwrap_or(Value::Null);
        match (request.method, segments.as_slice()) {
            // Agents.
            (HttpMethod::Get, ["agents"]) => self.list_agents(request),
            (HttpMethod::Post, ["agents"]) => ok(self.create_agent(body)),
            (HttpMethod::Get, ["agents", "count"]) => ok(json!(self.agents.len())),
            (HttpMethod::Post, ["agents", "import"]) => match &request.body {
                RequestBody::Multipart {
                    bytes, ..
                } => match serde_json::from_slice::<Value>(bytes) {
                    Ok(definition) => ok(self.create_agent(definition)),
                    Err(_) => Reply::Json(422, json!({ "detail": "invalid agent file" })),
                },
                _ => Reply::Json(422, json!({ "detail": "expected a file upload" })),
            },
            (HttpMethod::Get, ["agents", id]) => self.agent(id).map_or_else(|| missing(id), ok),
            (HttpMethod::Patch, ["agents", id]) => match position(&self.agents, id) {
                Some(index) => {
                    merge(&mut self.agents[index], &body);
                    ok(self.agents[index].clone())
                }
                None => missing(id),
            },
            (HttpMethod::Delete, ["agents", id]) => match position(&self.agents, id) {
                Some(index) => {
                    self.agents.remove(index);
                    self.messages.remove(*id);
                    Reply::Empty(204)
                }
                None => missing(id),
            },
            (HttpMethod::Get, ["agents", id, "tools"]) => {
                self.agent(id).map_or_else(|| missing(id), |agent| ok(agent["tools"].clone()))
            }
            (HttpMethod::Get, ["agents", id, "export"]) => match self.agent(id) {
                Some(mut agent) => {
                    if let Some(object) = agent.as_object_mut() {
                        object.remove("id");
                    }
                    ok(agent)
                }
                None => missing(id),
            },
            (HttpMethod::Get, ["agents", id, "context"]) => match self.messages.get(*id) {
                Some(history) => ok(json!({
                    "num_messages": history.len(),
                    "context_window_size_max": 8192
                })),
                None => missing(id),
            },
            (HttpMethod::Patch, ["agents", id, "reset-messages"]) => match self.agent(id) {
                Some(agent) => {
                    self.messages.insert((*id).to_string(), Vec::new());
                    ok(agent)
                }
                None => missing(id),
            },
            (HttpMethod::Post, ["agents", id, "summarize"]) => match self.agent(id) {
                Some(_) => ok(json!({
                    "summary": "conversation summarized",
                    "max_message_length": request.query_value("max_message_length")
                })),
                None => missing(id),
            },
            (HttpMethod::Get, ["agents", id, "messages"]) => match self.messages.get(*id) {
                Some(history) => ok(Value::Array(history.clone())),
                None => missing(id),
            },
            (HttpMethod::Post, ["agents", id, "messages"]) => self.send_messages(id, &body),
            (HttpMethod::Post, ["agents", id, "messages", "stream"]) => match self.agent(id) {
                Some(_) => Reply::Text(
                    200,
                    event_stream(&[
                        json!({ "message_type": "reasoning_message", "reasoning": "thinking" }),
                        json!({ "message_type": "assistant_message", "content": "streamed" }),
                    ]),
                ),
                None => missing(id),
            },
            (HttpMethod::Post, ["agents", id, "messages", "async"]) => match self.agent(id) {
                Some(_) => {
                    let run_id = self.id("run");
                    ok(json!({ "id": run_id, "status": "created", "agent_id": id }))
                }
                None => missing(id),
            },
            (HttpMethod::Post, ["agents", id, "messages", "cancel"]) => match self.agent(id) {
                Some(_) => ok(json!({ "cancelled": body.get("run_ids").cloned() })),
                None => missing(id),
            },
            (HttpMethod::Post, ["agents", id, "messages", "preview-raw-payload"]) => {
                match self.agent(id) {
                    Some(_) => ok(json!({ "model": "fake-model", "messages": body["messages"] })),
                    None => missing(id),
                }
            }

            // Core memory and blocks.
            (HttpMethod::Get, ["agents", id, "core-memory"]) => match self.agent(id) {
                Some(_) => ok(json!({ "blocks": self.attached_blocks(id) })),
                None => missing(id),
            },
            (HttpMethod::Get, ["agents", id, "core-memory", "blocks"]) => match self.agent(id) {
                Some(_) => ok(Value::Array(self.attached_blocks(id))),
                None => missing(id),
            },
            (HttpMethod::Get, ["agents", id, "core-memory", "blocks", label]) => self
                .attached_blocks(id)
                .into_iter()
                .find(|block| block["label"] == *label)
                .map_or_else(|| missing(label), ok),
            (HttpMethod::Patch, ["agents", id, "core-memory", "blocks", label]) => {
                let block_id = self
                    .attached_blocks(id)
                    .into_iter()
                    .find(|block| block["label"] == *label)
                    .and_then(|block| block["id"].as_str().map(str::to_string));
                match block_id.and_then(|block_id| position(&self.blocks, &block_id)) {
                    Some(index) => {
                        merge(&mut self.blocks[index], &body);
                        ok(self.blocks[index].clone())
                    }
                    None => missing(label),
                }
            }
            (HttpMethod::Patch, ["agents", id, "core-memory", "blocks", action, block_id]) => {
                if position(&self.blocks, block_id).is_none() {
                    return missing(block_id);
                }
                let attach = *action == "attach";
                self.link(id, block_id, attach, Link::Block)
            }
            (HttpMethod::Get, ["blocks"]) => {
                let label = request.query_value("label");
                ok(Value::Array(
                    self.blocks
                        .iter()
                        .filter(|block| label.is_none_or(|label| block["label"] == label))
                        .cloned()
                        .collect(),
                ))
            }
            (HttpMethod::Post, ["blocks"]) => {
                let mut block = body;
                let id = self.id("block");
                merge(&mut block, &json!({ "id": id, "limit": 5000 }));
                self.blocks.push(block.clone());
                ok(block)
            }
            (HttpMethod::Get, ["blocks", id]) => match position(&self.blocks, id) {
                Some(index) => ok(self.blocks[index].clone()),
                None => missing(id),
            },
            (HttpMethod::Patch, ["blocks", id]) => match position(&self.blocks, id) {
                Some(index) => {
                    merge(&mut self.blocks[index], &body);
                    ok(self.blocks[index].clone())
                }
                None => missing(id),
            },
            (HttpMethod::Get, ["blocks", id, "agents"]) => match position(&self.blocks, id) {
                Some(_) => ok(Value::Array(self.agents_linked(id, &self.agent_blocks))),
                None => missing(id),
            },

            // Archival memory.
            (HttpMethod::Get, ["agents", id, "archival-memory"]) => {
                let search = request.query_value("search").map(str::to_lowercase);
                ok(Value::Array(
                    self.passages
                        .iter()
                        .filter(|passage| passage["agent_id"] == *id)
                        .filter(|passage| {
                            search.as_ref().is_none_or(|search| {
                                passage["text"]
                                    .as_str()
                                    .is_some_and(|text| text.to_lowercase().contains(search))
                            })
                        })
                        .cloned()
                        .collect(),
                ))
            }
            (HttpMethod::Post, ["agents", id, "archival-memory"]) => match self.agent(id) {
                Some(_) => {
                    let passage_id = self.id("passage");
                    let passage = json!({
                        "id": passage_id,
                        "text": body["text"],
                        "agent_id": id,
                        "created_at": self.now()
                    });
                    self.passages.push(passage.clone());
                    ok(json!([passage]))
                }
                None => missing(id),
            },
            (HttpMethod::Patch, ["agents", _, "archival-memory", passage_id]) => {
                match position(&self.passages, passage_id) {
                    Some(index) => {
                        merge(&mut self.passages[index], &body);
                        ok(self.passages[index].clone())
                    }
                    None => missing(passage_id),
                }
            }
            (HttpMethod::Delete, ["agents", _, "archival-memory", passage_id]) => {
                match position(&self.passages, passage_id) {
                    Some(index) => {
                        self.passages.remove(index);
                        Reply::Empty(204)
                    }
                    None => missing(passage_id),
                }
            }

            // MCP servers.
            (HttpMethod::Put, ["tools", "mcp", "servers"]) => self.put_server(body),
            (HttpMethod::Get, ["tools", "mcp", "servers"]) => {
                ok(Value::Array(self.servers.clone()))
            }
            (HttpMethod::Post, ["tools", "mcp", "servers", "test"]) => {
                if body["server_url"].as_str().is_some_and(|url| url.contains("unreachable")) {
                    Reply::Fail(TransportError::Connect("connection refused".to_string()))
                } else {
                    ok(json!({ "tools": server_tools() }))
                }
            }
            (HttpMethod::Post, ["tools", "mcp", "servers", "connect"]) => {
                let unreachable =
                    body["server_url"].as_str().is_some_and(|url| url.contains("unreachable"));
                let last = if unreachable {
                    json!({ "event": "connection_failed", "message": "connection refused" })
                } else {
                    json!({ "event": "success", "tools": server_tools() })
                };
                Reply::Text(200, event_stream(&[json!({ "event": "connection_attempt" }), last]))
            }
            (HttpMethod::Patch, ["tools", "mcp", "servers", name]) => match self.server(name) {
                Some(index) => {
                    merge(&mut self.servers[index], &body);
                    ok(self.servers[index].clone())
                }
                None => missing(name),
            },
            (HttpMethod::Delete, ["tools", "mcp", "servers", name]) => match self.server(name) {
                Some(index) => {
                    self.servers.remove(index);
                    Reply::Empty(204)
                }
                None => missing(name),
            },
            (HttpMethod::Post, ["tools", "mcp", "servers", name, "resync"]) => {
                match self.server(name) {
                    Some(_) => ok(json!({ "server_name": name, "added": [], "removed": [] })),
                    None => missing(name),
                }
            }
            (HttpMethod::Get, ["tools", "mcp", "servers", name, "tools"]) => {
                match self.server(name) {
                    Some(_) => ok(server_tools()),
                    None => missing(name),
                }
            }
            (HttpMethod::Post, ["tools", "mcp", "servers", name, "tools", tool, "execute"]) => {
                match self.server(name) {
                    Some(_) => ok(json!({
                        "status": "success",
                        "tool": tool,
                        "func_return": body.get("args").cloned()
                    })),
                    None => missing(name),
                }
            }
            (HttpMethod::Post, ["tools", "mcp", "servers", name, tool]) => match self.server(name) {
                Some(_) => {
                    let tool = json!({
                        "name": tool,
                        "tool_type": "external_mcp",
                        "tags": [format!("mcp:{name}")]
                    });
                    ok(self.insert_tool(tool))
                }
                None => missing(name),
            },

            // Tools.
            (HttpMethod::Get, ["tools"]) => {
                let name = request.query_value("name");
                ok(Value::Array(
                    self.tools
                        .iter()
                        .filter(|tool| name.is_none_or(|name| tool["name"] == name))
                        .cloned()
                        .collect(),
                ))
            }
            (HttpMethod::Post, ["tools"]) => self.create_tool(body, false),
            (HttpMethod::Put, ["tools"]) => self.create_tool(body, true),
            (HttpMethod::Post, ["tools", "generate-tool"]) => {
                let name = body["tool_name"].as_str().unwrap_or("generated_tool").to_string();
                let tool = self.insert_tool(json!({
                    "name": name,
                    "source_code": format!("def {name}():\n    return None\n"),
                    "tool_type": "custom"
                }));
                ok(json!({ "tool": tool, "sample_args": {}, "response": "generated" }))
            }
            (HttpMethod::Post, ["tools", "generate-schema"]) => ok(json!({
                "name": body["name"].as_str().map_or_else(
                    || python_name(body["source_code"].as_str().unwrap_or_default()),
                    |name| Some(name.to_string()),
                ),
                "parameters": { "type": "object", "properties": {} }
            })),
            (HttpMethod::Post, ["tools", "run"]) => {
                ok(json!({ "status": "success", "tool_return": "ok", "stdout": [], "stderr": [] }))
            }
            (HttpMethod::Post, ["tools", "add-base-tools"]) => {
                let mut installed = Vec::new();
                for name in ["send_message", "conversation_search"] {
                    let existing = self.tools.iter().find(|tool| tool["name"] == name).cloned();
                    let tool = existing.unwrap_or_else(|| {
                        self.insert_tool(json!({ "name": name, "tool_type": "letta_core" }))
                    });
                    installed.push(tool);
                }
                ok(Value::Array(installed))
            }
            (HttpMethod::Get, ["tools", id]) => match position(&self.tools, id) {
                Some(index) => ok(self.tools[index].clone()),
                None => missing(id),
            },
            (HttpMethod::Patch, ["tools", id]) => match position(&self.tools, id) {
                Some(index) => {
                    merge(&mut self.tools[index], &body);
                    ok(self.tools[index].clone())
                }
                None => missing(id),
            },
            (HttpMethod::Delete, ["tools", id]) => match position(&self.tools, id) {
                Some(index) => {
                    self.tools.remove(index);
                    Reply::Empty(204)
                }
                None => missing(id),
            },
            (HttpMethod::Patch, ["agents", agent_id, "tools", action, tool_id]) => {
                self.link_tool(agent_id, tool_id, *action == "attach")
            }

            // Sources and folders.
            (HttpMethod::Get, ["sources" | "folders"]) => ok(Value::Array(self.sources.clone())),
            (HttpMethod::Post, ["sources"]) => {
                let mut source = body;
                let id = self.id("source");
                merge(&mut source, &json!({ "id": id, "created_at": self.now() }));
                self.sources.push(source.clone());
                ok(source)
            }
            (HttpMethod::Get, ["sources", "count"]) => ok(json!(self.sources.len())),
            (HttpMethod::Get, ["sources", id]) => match position(&self.sources, id) {
                Some(index) => ok(self.sources[index].clone()),
                None => missing(id),
            },
            (HttpMethod::Patch, ["sources", id]) => match position(&self.sources, id) {
                Some(index) => {
                    merge(&mut self.sources[index], &body);
                    ok(self.sources[index].clone())
                }
                None => missing(id),
            },
            (HttpMethod::Delete, ["sources", id]) => match position(&self.sources, id) {
                Some(index) => {
                    self.sources.remove(index);
                    self.files.retain(|file| file["source_id"] != *id);
                    Reply::Empty(204)
                }
                None => missing(id),
            },
            (HttpMethod::Post, ["sources", id, "upload"]) => self.upload(id, &request.body),
            (HttpMethod::Get, ["sources" | "folders", id, "files"]) => {
                match position(&self.sources, id) {
                    Some(_) => {
                        let files = self.files.iter().filter(|file| file["source_id"] == *id);
                        ok(Value::Array(files.cloned().collect()))
                    }
                    None => missing(id),
                }
            }
            (HttpMethod::Get, ["sources" | "folders", id, "agents"]) => {
                match position(&self.sources, id) {
                    Some(_) => {
                        let agents = self.agents_linked(id, &self.agent_sources);
                        let ids: Vec<Value> =
                            agents.iter().map(|agent| agent["id"].clone()).collect();
                        ok(Value::Array(ids))
                    }
                    None => missing(id),
                }
            }
            (HttpMethod::Delete, ["sources", source_id, file_id]) => {
                let before = self.files.len();
                self.files
                    .retain(|file| !(file["id"] == *file_id && file["source_id"] == *source_id));
                if self.files.len() == before { missing(file_id) } else { Reply::Empty(204) }
            }
            (HttpMethod::Get, ["agents", id, "sources" | "folders"]) => match self.agent(id) {
                Some(_) => ok(Value::Array(self.attached_sources(id))),
                None => missing(id),
            },
            (HttpMethod::Patch, ["agents", id, "sources" | "folders", action, source_id]) => {
                if position(&self.sources, source_id).is_none() {
                    return missing(source_id);
                }
                let attach = *action == "attach";
                self.link(id, source_id, attach, Link::Source)
            }

            // Agent files.
            (HttpMethod::Get, ["agents", id, "files"]) => match self.agent(id) {
                Some(_) => {
                    let open = self.open_files.get(*id).cloned().unwrap_or_default();
                    let sources = self.agent_sources.get(*id).cloned().unwrap_or_default();
                    let files = self
                        .files
                        .iter()
                        .filter(|file| {
                            file["source_id"].as_str().is_some_and(|source| {
                                sources.iter().any(|attached| attached == source)
                            })
                        })
                        .map(|file| {
                            let mut file = file.clone();
                            let is_open = open.iter().any(|id| file["id"] == id.as_str());
                            merge(&mut file, &json!({ "is_open": is_open }));
                            file
                        })
                        .collect();
                    ok(Value::Array(files))
                }
                None => missing(id),
            },
            (HttpMethod::Patch, ["agents", id, "files", "close-all"]) => match self.agent(id) {
                Some(_) => {
                    let closed = self.open_files.remove(*id).unwrap_or_default();
                    let names: Vec<Value> = closed
                        .iter()
                        .filter_map(|file_id| {
                            position(&self.files, file_id)
                                .map(|index| self.files[index]["file_name"].clone())
                        })
                        .collect();
                    ok(Value::Array(names))
                }
                None => missing(id),
            },
            (HttpMethod::Patch, ["agents", id, "files", file_id, "open" | "close"]) => {
                if self.agent(id).is_none() {
                    return missing(id);
                }
                if position(&self.files, file_id).is_none() {
                    return missing(file_id);
                }
                let open = self.open_files.entry((*id).to_string()).or_default();
                if segments[4] == "open" {
                    if !open.iter().any(|existing| existing == file_id) {
                        open.push((*file_id).to_string());
                    }
                    ok(json!([]))
                } else {
                    open.retain(|existing| existing != file_id);
                    ok(json!({ "closed": file_id }))
                }
            }

            // Jobs.
            (HttpMethod::Get, ["jobs"]) => ok(Value::Array(self.jobs.clone())),
            (HttpMethod::Get, ["jobs", "active"]) => ok(Value::Array(
                self.jobs
                    .iter()
                    .filter(|job| job["status"] == "running" || job["status"] == "created")
                    .cloned()
                    .collect(),
            )),
            (HttpMethod::Get, ["jobs", id]) => match position(&self.jobs, id) {
                Some(index) => ok(self.jobs[index].clone()),
                None => missing(id),
            },
            (HttpMethod::Patch, ["jobs", id, "cancel"]) => match position(&self.jobs, id) {
                Some(index) => {
                    merge(&mut self.jobs[index], &json!({ "status": "cancelled" }));
                    ok(self.jobs[index].clone())
                }
                None => missing(id),
            },

            _ => Reply::Json(404, json!({ "detail": format!("no route for {}", request.path()) })),
        }
    }

    /// Returns a stored agent.
    fn agent(&self, id: &str) -> Option<Value> {
        position(&self.agents, id).map(|index| self.agents[index].clone())
    }

    /// Lists agents, honoring the `tags` filter.
    fn list_agents(&self, request: &BackendRequest) -> Reply {
        let tags: Vec<&str> = request
            .query
            .iter()
            .filter(|(key, _)| key == "tags")
            .map(|(_, value)| value.as_str())
            .collect();
        ok(Value::Array(
            self.agents
                .iter()
                .filter(|agent| {
                    tags.iter().all(|tag| {
                        agent["tags"]
                            .as_array()
                            .is_some_and(|values| values.iter().any(|value| value == *tag))
                    })
                })
                .cloned()
                .collect(),
        ))
    }

    /// Stores a new agent from a create or import body.
    fn create_agent(&mut self, body: Value) -> Value {
        let id = self.id("agent");
        let mut agent = match body {
            Value::Object(object) => object,
            _ => Map::new(),
        };
        let tools: Vec<Value> = agent
            .remove("tool_ids")
            .and_then(|ids| ids.as_array().cloned())
            .unwrap_or_default()
            .iter()
            .filter_map(Value::as_str)
            .filter_map(|tool_id| {
                position(&self.tools, tool_id).map(|index| self.tools[index].clone())
            })
            .collect();
        agent.insert("id".to_string(), Value::String(id.clone()));
        agent.insert("created_at".to_string(), Value::String(self.now()));
        agent.insert("agent_type".to_string(), json!("memgpt_agent"));
        agent.entry("tags".to_string()).or_insert_with(|| json!([]));
        agent.insert("tools".to_string(), Value::Array(tools));
        let agent = Value::Object(agent);
        self.agents.push(agent.clone());
        self.messages.insert(id, Vec::new());
        agent
    }

    /// Records the sent messages and an echoed assistant reply.
    fn send_messages(&mut self, agent_id: &str, body: &Value) -> Reply {
        if self.agent(agent_id).is_none() {
            return missing(agent_id);
        }
        let mut last = String::new();
        let mut recorded = Vec::new();
        for message in body["messages"].as_array().cloned().unwrap_or_default() {
            let id = self.id("message");
            last = message["content"].as_str().unwrap_or_default().to_string();
            recorded.push(json!({
                "id": id,
                "message_type": "user_message",
                "role": message["role"],
                "content": message["content"],
                "date": self.now()
            }));
        }
        let reply_id = self.id("message");
        let reply = json!({
            "id": reply_id,
            "message_type": "assistant_message",
            "role": "assistant",
            "content": format!("echo: {last}"),
            "date": self.now()
        });
        recorded.push(reply.clone());
        self.messages.entry(agent_id.to_string()).or_default().extend(recorded);
        ok(json!({ "messages": [reply], "usage": { "total_tokens": 42 } }))
    }

    /// Stores a tool and returns it.
    fn insert_tool(&mut self, tool: Value) -> Value {
        let mut tool = tool;
        let id = self.id("tool");
        merge(&mut tool, &json!({ "id": id }));
        self.tools.push(tool.clone());
        tool
    }

    /// Creates or upserts a tool from Python source.
    fn create_tool(&mut self, body: Value, upsert: bool) -> Reply {
        let Some(name) = python_name(body["source_code"].as_str().unwrap_or_default()) else {
            return Reply::Json(422, json!({ "detail": "source_code has no function" }));
        };
        if let Some(index) = self.tools.iter().position(|tool| tool["name"] == name.as_str()) {
            if !upsert {
                return Reply::Json(409, json!({ "detail": format!("tool {name} exists") }));
            }
            merge(&mut self.tools[index], &body);
            return ok(self.tools[index].clone());
        }
        let mut tool = body;
        merge(&mut tool, &json!({ "name": name, "tool_type": "custom" }));
        ok(self.insert_tool(tool))
    }

    /// Attaches or detaches a tool on an agent.
    fn link_tool(&mut self, agent_id: &str, tool_id: &str, attach: bool) -> Reply {
        let Some(agent_index) = position(&self.agents, agent_id) else {
            return missing(agent_id);
        };
        let Some(tool_index) = position(&self.tools, tool_id) else {
            return missing(tool_id);
        };
        let tool = self.tools[tool_index].clone();
        let agent = &mut self.agents[agent_index];
        if let Some(tools) = agent["tools"].as_array_mut() {
            tools.retain(|existing| existing["id"] != tool_id);
            if attach {
                tools.push(tool);
            }
        }
        ok(agent.clone())
    }

    /// Attaches or detaches a block or source on an agent.
    fn link(&mut self, agent_id: &str, target: &str, attach: bool, link: Link) -> Reply {
        let Some(agent) = self.agent(agent_id) else {
            return missing(agent_id);
        };
        let table = match link {
            Link::Block => &mut self.agent_blocks,
            Link::Source => &mut self.agent_sources,
        };
        let linked = table.entry(agent_id.to_string()).or_default();
        linked.retain(|existing| existing != target);
        if attach {
            linked.push(target.to_string());
        }
        ok(agent)
    }

    /// Returns the blocks attached to an agent.
    fn attached_blocks(&self, agent_id: &str) -> Vec<Value> {
        self.agent_blocks
            .get(agent_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| position(&self.blocks, id))
                    .map(|index| self.blocks[index].clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the sources attached to an agent.
    fn attached_sources(&self, agent_id: &str) -> Vec<Value> {
        self.agent_sources
            .get(agent_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| {
                        position(&self.sources, id).map(|index| self.sources[index].clone())
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns agents linked to a target through an attachment table.
    fn agents_linked(&self, target: &str, table: &BTreeMap<String, Vec<String>>) -> Vec<Value> {
        self.agents
            .iter()
            .filter(|agent| {
                agent["id"].as_str().is_some_and(|id| {
                    table.get(id).is_some_and(|linked| linked.iter().any(|value| value == target))
                })
            })
            .cloned()
            .collect()
    }

    /// Stores an uploaded file and returns its processing job.
    fn upload(&mut self, source_id: &str, body: &RequestBody) -> Reply {
        if position(&self.sources, source_id).is_none() {
            return missing(source_id);
        }
        let RequestBody::Multipart {
            file_name,
            content_type,
            bytes,
        } = body
        else {
            return Reply::Json(422, json!({ "detail": "expected a file upload" }));
        };
        let file_id = self.id("file");
        self.files.push(json!({
            "id": file_id,
            "file_name": file_name,
            "source_id": source_id,
            "file_type": content_type,
            "file_size": bytes.len(),
            "processing_status": "completed",
            "content": String::from_utf8_lossy(bytes),
            "created_at": self.now()
        }));
        let job_id = self.id("job");
        let job = json!({
            "id": job_id,
            "status": "completed",
            "job_type": "file_processing",
            "created_at": self.now(),
            "metadata": { "file_name": file_name, "file_id": file_id }
        });
        self.jobs.push(job.clone());
        ok(job)
    }

    /// Returns the index of a server by name.
    fn server(&self, name: &str) -> Option<usize> {
        self.servers.iter().position(|server| server["server_name"] == name)
    }

    /// Adds or replaces an MCP server and returns the full server list.
    fn put_server(&mut self, body: Value) -> Reply {
        let Some(name) = body["server_name"].as_str().map(str::to_string) else {
            return Reply::Json(422, json!({ "detail": "server_name is required" }));
        };
        let mut server = body;
        match self.server(&name) {
            Some(index) => {
                let id = self.servers[index]["id"].clone();
                merge(&mut server, &json!({ "id": id }));
                self.servers[index] = server;
            }
            None => {
                let id = self.id("mcp-server");
                merge(&mut server, &json!({ "id": id }));
                self.servers.push(server);
            }
        }
        ok(Value::Array(self.servers.clone()))
    }
}

/// Attachment tables keyed by agent.
#[derive(Clone, Copy)]
enum Link {
    /// Memory blocks.
    Block,
    /// Sources and folders.
    Source,
}

// crates/letta-mcp/src/router.rs
// ============================================================================
// Module: Operation Dispatcher
// Description: Routes tool calls to typed handlers with schema checks.
// Purpose: One entry point from a raw tool call to a normalized result.
// Dependencies: letta-mcp-client, letta-mcp-config, letta-mcp-contract
// ============================================================================

//! ## Overview
//! [`ToolRouter::dispatch`] resolves a tool name (or legacy alias), checks the
//! `operation` discriminator, validates arguments against the input schema,
//! runs the bound handler, and validates the result against the output
//! schema. Every failure leaves through the error normalizer labeled with the
//! operation's action.
//!
//! ## Invariants
//! - Construction fails unless every registered operation has a handler and
//!   every handler operation is registered.
//! - All router state is immutable after construction and shared by `Arc`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use letta_mcp_client::BackendClient;
use letta_mcp_client::TransportError;
use letta_mcp_config::LettaMcpConfig;
use letta_mcp_config::ValidationConfig;
use letta_mcp_contract::DeprecationTable;
use letta_mcp_contract::RegistryError;
use letta_mcp_contract::SchemaRegistry;
use letta_mcp_contract::ToolDefinition;
use letta_mcp_contract::ToolDescriptor;
use letta_mcp_contract::ToolName;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::errors::ErrorContext;
use crate::errors::NormalizedError;
use crate::errors::ToolError;
use crate::errors::normalize;
use crate::handlers::ToolHandler;
use crate::handlers::builtin_handlers;
use crate::request::OperationRequest;
use crate::validation::SchemaValidator;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Inputs for building a [`ToolRouter`].
pub struct ToolRouterConfig {
    /// Consolidated tool descriptors.
    pub registry: Arc<SchemaRegistry>,
    /// Legacy alias table.
    pub deprecations: Arc<DeprecationTable>,
    /// Pooled backend client shared by all handlers.
    pub client: BackendClient,
    /// One handler per registered tool.
    pub handlers: Vec<Arc<dyn ToolHandler>>,
    /// Output strictness policy.
    pub validation: ValidationConfig,
    /// Whether legacy aliases are listed and callable.
    pub legacy_aliases: bool,
}

// ============================================================================
// SECTION: Tool Router
// ============================================================================

/// Dispatcher for consolidated tools and legacy aliases.
#[derive(Clone)]
pub struct ToolRouter {
    /// Consolidated tool descriptors.
    registry: Arc<SchemaRegistry>,
    /// Legacy alias table.
    deprecations: Arc<DeprecationTable>,
    /// Compiled input and output validators.
    validator: Arc<SchemaValidator>,
    /// Handlers keyed by tool.
    handlers: Arc<BTreeMap<ToolName, Arc<dyn ToolHandler>>>,
    /// Pooled backend client.
    client: BackendClient,
    /// Whether legacy aliases are listed and callable.
    legacy_aliases: bool,
}

impl ToolRouter {
    /// Builds a router and checks handler coverage.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError`] when a schema does not compile or the handler
    /// set does not match the registered operations.
    pub fn new(config: ToolRouterConfig) -> Result<Self, RouterError> {
        let validator = SchemaValidator::new(
            config.registry.descriptors().iter().chain(config.deprecations.descriptors()),
            config.validation,
        )
        .map_err(RouterError::Schema)?;
        let handlers = bind_handlers(&config.registry, config.handlers)?;
        Ok(Self {
            registry: config.registry,
            deprecations: config.deprecations,
            validator: Arc::new(validator),
            handlers: Arc::new(handlers),
            client: config.client,
            legacy_aliases: config.legacy_aliases,
        })
    }

    /// Builds the built-in tool surface over the given backend client.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError`] when the built-in catalog is inconsistent.
    pub fn builtin(
        client: BackendClient,
        validation: ValidationConfig,
        legacy_aliases: bool,
    ) -> Result<Self, RouterError> {
        let registry = SchemaRegistry::builtin()?;
        let deprecations = DeprecationTable::builtin(&registry)?;
        Self::new(ToolRouterConfig {
            registry: Arc::new(registry),
            deprecations: Arc::new(deprecations),
            client,
            handlers: builtin_handlers(),
            validation,
            legacy_aliases,
        })
    }

    /// Builds the built-in tool surface from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError`] when the backend client or catalog fails.
    pub fn from_config(config: &LettaMcpConfig) -> Result<Self, RouterError> {
        let client = BackendClient::from_config(&config.backend)?;
        Self::builtin(client, config.validation.clone(), config.deprecation.legacy_aliases)
    }

    /// Lists tool definitions; legacy aliases follow with migration notices.
    #[must_use]
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        let mut tools: Vec<ToolDefinition> =
            self.registry.descriptors().iter().map(ToolDescriptor::definition).collect();
        if self.legacy_aliases {
            tools.extend(
                self.deprecations
                    .descriptors()
                    .iter()
                    .map(|descriptor| self.deprecations.annotate(descriptor).definition()),
            );
        }
        tools
    }

    /// Returns the operation a call targets, for logging.
    #[must_use]
    pub fn operation_of(&self, name: &str, arguments: &Value) -> Option<String> {
        if self.registry.get(name).is_none()
            && let Some(entry) = self.deprecations.entry(name)
        {
            return Some(entry.operation.to_string());
        }
        arguments.get("operation").and_then(Value::as_str).map(str::to_string)
    }

    /// Returns true when `name` is an enabled deprecated alias.
    #[must_use]
    pub fn is_legacy_alias(&self, name: &str) -> bool {
        self.legacy_aliases
            && self.registry.get(name).is_none()
            && self.deprecations.entry(name).is_some()
    }

    /// Dispatches one tool call.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizedError`] for unknown tools and operations, argument
    /// and output schema violations, and backend failures.
    pub async fn dispatch(&self, name: &str, arguments: Value) -> Result<Value, NormalizedError> {
        let fallback = format!("calling {name}");
        let mut label = fallback.as_str();
        let mut operation = None;
        let outcome = match self.prepare(name, arguments) {
            Ok((descriptor, request)) => {
                let spec = descriptor.operation(&request.operation);
                label = spec.map_or(label, |spec| spec.label);
                operation = spec.map(|spec| spec.name);
                self.run(descriptor, request).await
            }
            Err(err) => Err(err),
        };
        outcome.map_err(|err| {
            let context = ErrorContext {
                action: label,
                tool: name,
                operation,
            };
            let normalized = normalize(err, &context);
            tracing::debug!(
                tool = name,
                kind = normalized.kind.as_str(),
                message = %normalized.message,
                "tool call failed"
            );
            normalized
        })
    }

    /// Resolves the tool and validates arguments up to handler invocation.
    fn prepare(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<(&ToolDescriptor, OperationRequest), ToolError> {
        let mut args = match arguments {
            Value::Null => Map::new(),
            Value::Object(map) => map,
            _ => {
                return Err(ToolError::InvalidRequest(
                    "tool arguments must be a JSON object".to_string(),
                ));
            }
        };
        let descriptor = if let Some(descriptor) = self.registry.get(name) {
            descriptor
        } else {
            let entry = self
                .deprecations
                .entry(name)
                .filter(|_| self.legacy_aliases)
                .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
            self.validator.check_input(name, &Value::Object(args.clone()))?;
            args = entry.remap_arguments(args);
            self.registry
                .get(entry.tool.as_str())
                .ok_or_else(|| ToolError::UnknownTool(entry.tool.to_string()))?
        };
        let operation = match args.get("operation") {
            Some(Value::String(operation)) => operation.clone(),
            _ => return Err(ToolError::MissingField("operation".to_string())),
        };
        let spec = descriptor
            .operation(&operation)
            .ok_or_else(|| ToolError::UnknownOperation(operation.clone()))?;
        if let Some(field) =
            spec.required.iter().find(|field| args.get(**field).is_none_or(Value::is_null))
        {
            return Err(ToolError::MissingField((*field).to_string()));
        }
        self.validator.check_input(&descriptor.name, &Value::Object(args.clone()))?;
        Ok((descriptor, OperationRequest::new(descriptor.name.clone(), operation, args)))
    }

    /// Runs the bound handler and checks its result.
    async fn run(
        &self,
        descriptor: &ToolDescriptor,
        request: OperationRequest,
    ) -> Result<Value, ToolError> {
        let handler = ToolName::parse(&descriptor.name)
            .and_then(|tool| self.handlers.get(&tool))
            .ok_or_else(|| ToolError::UnknownOperation(request.operation.clone()))?;
        tracing::debug!(tool = %descriptor.name, operation = %request.operation, "dispatching");
        let result = handler.handle(&self.client, request).await?;
        self.validator.check_output(&descriptor.name, &result)?;
        Ok(result)
    }
}

/// Keys handlers by tool and checks they cover the registry exactly.
fn bind_handlers(
    registry: &SchemaRegistry,
    handlers: Vec<Arc<dyn ToolHandler>>,
) -> Result<BTreeMap<ToolName, Arc<dyn ToolHandler>>, RouterError> {
    let mut bound = BTreeMap::new();
    for handler in handlers {
        let tool = handler.tool();
        if bound.insert(tool, handler).is_some() {
            return Err(RouterError::Handlers(format!("{tool} has two handlers")));
        }
    }
    for descriptor in registry.descriptors() {
        let handler = ToolName::parse(&descriptor.name)
            .and_then(|tool| bound.get(&tool))
            .ok_or_else(|| RouterError::Handlers(format!("{} has no handler", descriptor.name)))?;
        let served: BTreeSet<&str> = handler.operations().into_iter().collect();
        let registered: BTreeSet<&str> = descriptor.operation_names().into_iter().collect();
        if let Some(missing) = registered.difference(&served).next() {
            return Err(RouterError::Handlers(format!(
                "{} operation {missing} has no handler",
                descriptor.name
            )));
        }
        if let Some(extra) = served.difference(&registered).next() {
            return Err(RouterError::Handlers(format!(
                "{} handler serves unregistered operation {extra}",
                descriptor.name
            )));
        }
    }
    if let Some(tool) = bound.keys().find(|tool| registry.get(tool.as_str()).is_none()) {
        return Err(RouterError::Handlers(format!("{tool} is not registered")));
    }
    Ok(bound)
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Router construction failures.
#[derive(Debug, Error)]
pub enum RouterError {
    /// The tool catalog is inconsistent.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// A schema failed to compile.
    #[error("schema error: {0}")]
    Schema(String),
    /// Handlers do not match the registered operations.
    #[error("handler coverage error: {0}")]
    Handlers(String),
    /// The backend client could not be built.
    #[error(transparent)]
    Client(#[from] TransportError),
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

    use std::sync::Arc;

    use async_trait::async_trait;
    use letta_mcp_client::BackendClient;
    use letta_mcp_client::BackendRequest;
    use letta_mcp_client::BackendResponse;
    use letta_mcp_client::BackendTransport;
    use letta_mcp_client::ClientPolicy;
    use letta_mcp_client::TransportError;
    use letta_mcp_config::ValidationConfig;
    use letta_mcp_contract::DeprecationTable;
    use letta_mcp_contract::SchemaRegistry;
    use letta_mcp_contract::ToolName;
    use serde_json::Value;

    use super::RouterError;
    use super::ToolRouter;
    use super::ToolRouterConfig;
    use crate::errors::ToolError;
    use crate::handlers::ToolHandler;
    use crate::handlers::builtin_handlers;
    use crate::request::OperationRequest;

    struct Offline;

    #[async_trait]
    impl BackendTransport for Offline {
        async fn send(&self, _request: &BackendRequest) -> Result<BackendResponse, TransportError> {
            Err(TransportError::Connect("offline".to_string()))
        }
    }

    struct PartialJobs;

    #[async_trait]
    impl ToolHandler for PartialJobs {
        fn tool(&self) -> ToolName {
            ToolName::LettaJobMonitor
        }

        fn operations(&self) -> Vec<&'static str> {
            vec!["list", "get"]
        }

        async fn handle(
            &self,
            _client: &BackendClient,
            _request: OperationRequest,
        ) -> Result<Value, ToolError> {
            Ok(Value::Null)
        }
    }

    fn client() -> BackendClient {
        BackendClient::new(Arc::new(Offline), ClientPolicy::default())
    }

    #[test]
    fn builtin_handlers_cover_every_operation() {
        assert!(ToolRouter::builtin(client(), ValidationConfig::default(), true).is_ok());
    }

    #[test]
    fn missing_operation_handler_fails_startup() {
        let registry = SchemaRegistry::builtin().unwrap();
        let deprecations = DeprecationTable::builtin(&registry).unwrap();
        let mut handlers = builtin_handlers();
        handlers.retain(|handler| handler.tool() != ToolName::LettaJobMonitor);
        handlers.push(Arc::new(PartialJobs));
        let result = ToolRouter::new(ToolRouterConfig {
            registry: Arc::new(registry),
            deprecations: Arc::new(deprecations),
            client: client(),
            handlers,
            validation: ValidationConfig::default(),
            legacy_aliases: false,
        });
        assert!(matches!(
            result,
            Err(RouterError::Handlers(message)) if message.contains("cancel")
        ));
    }

    #[test]
    fn legacy_aliases_follow_configuration() {
        let with = ToolRouter::builtin(client(), ValidationConfig::default(), true).unwrap();
        let without = ToolRouter::builtin(client(), ValidationConfig::default(), false).unwrap();
        assert_eq!(without.list_tools().len(), ToolName::all().len());
        assert!(with.list_tools().len() > without.list_tools().len());
    }
}

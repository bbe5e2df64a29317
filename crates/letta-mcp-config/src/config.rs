// crates/letta-mcp-config/src/config.rs
// ============================================================================
// Module: Letta MCP Configuration
// Description: Configuration loading and validation for the Letta MCP server.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: letta-mcp-contract, serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from an optional TOML file, then environment
//! overrides are applied, then every section is validated. A missing default
//! file is not an error: the server runs on defaults plus environment.
//! An explicitly requested file that cannot be read is an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fmt;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use letta_mcp_contract::ToolName;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "letta-mcp.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "LETTA_MCP_CONFIG";
/// Environment variable overriding the backend base URL.
pub const BASE_URL_ENV_VAR: &str = "LETTA_BASE_URL";
/// Environment variable overriding the backend bearer credential.
pub const PASSWORD_ENV_VAR: &str = "LETTA_PASSWORD";
/// Environment variable overriding the server transport.
pub const TRANSPORT_ENV_VAR: &str = "LETTA_MCP_TRANSPORT";
/// Environment variable overriding the HTTP bind address.
pub const BIND_ENV_VAR: &str = "LETTA_MCP_BIND";
/// Environment variable selecting the HTTP port on all interfaces.
pub const PORT_ENV_VAR: &str = "PORT";
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default Letta REST base URL.
const DEFAULT_BASE_URL: &str = "http://localhost:8283/v1";
/// Default HTTP bind address.
const DEFAULT_BIND: &str = "127.0.0.1:3001";
/// Default maximum JSON-RPC request body size.
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
/// Hard ceiling for the JSON-RPC request body size.
const MAX_BODY_BYTES_LIMIT: usize = 16 * 1024 * 1024;
/// Default per-request timeout.
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
/// Hard ceiling for the per-request timeout.
const MAX_REQUEST_TIMEOUT_MS: u64 = 600_000;
/// Default connection establishment timeout.
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;
/// Default warm connections kept per host.
const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 10;
/// Hard ceiling for warm connections per host.
const MAX_POOL_IDLE_PER_HOST: usize = 1024;
/// Default idle connection lifetime.
const DEFAULT_POOL_IDLE_TIMEOUT_MS: u64 = 90_000;
/// Hard ceiling for idle connection lifetime.
const MAX_POOL_IDLE_TIMEOUT_MS: u64 = 3_600_000;
/// Default bound on concurrent outbound requests.
const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 32;
/// Hard ceiling for concurrent outbound requests.
const MAX_CONCURRENT_REQUESTS_LIMIT: usize = 1024;
/// Default retry count for retry-safe calls.
const DEFAULT_MAX_RETRIES: u32 = 2;
/// Hard ceiling for the retry count.
const MAX_RETRIES_LIMIT: u32 = 5;
/// Default base backoff between retries.
const DEFAULT_RETRY_BACKOFF_MS: u64 = 200;
/// Hard ceiling for the base retry backoff.
const MAX_RETRY_BACKOFF_MS: u64 = 60_000;
/// Default outbound user agent.
const DEFAULT_USER_AGENT: &str = concat!("letta-mcp/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Root configuration for the Letta MCP server.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LettaMcpConfig {
    /// Transport and audit settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Letta REST backend settings.
    #[serde(default)]
    pub backend: BackendConfig,
    /// Output validation policy.
    #[serde(default)]
    pub validation: ValidationConfig,
    /// Legacy alias policy.
    #[serde(default)]
    pub deprecation: DeprecationConfig,
}

impl LettaMcpConfig {
    /// Loads configuration using the default resolution rules and the
    /// process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading, overrides, or validation fail.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |key| env::var(key).ok())
    }

    /// Loads configuration with an explicit environment lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading, overrides, or validation fail.
    pub fn load_with_env(
        path: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = match resolve_path(path, &lookup)? {
            Some(resolved) => Self::read_file(&resolved)?,
            None => Self::default(),
        };
        config.apply_env_overrides(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates configuration from TOML text without overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a config file without validating it.
    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        validate_path(path)?;
        let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Applies environment overrides on top of file values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when an override value is malformed.
    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(base_url) = non_empty(lookup(BASE_URL_ENV_VAR)) {
            self.backend.base_url = base_url;
        }
        if let Some(password) = non_empty(lookup(PASSWORD_ENV_VAR)) {
            self.backend.password = Some(password);
        }
        if let Some(transport) = non_empty(lookup(TRANSPORT_ENV_VAR)) {
            self.server.transport = ServerTransport::parse(&transport).ok_or_else(|| {
                ConfigError::Invalid(format!("{TRANSPORT_ENV_VAR} must be stdio or http"))
            })?;
        }
        if let Some(bind) = non_empty(lookup(BIND_ENV_VAR)) {
            self.server.bind = Some(bind);
        } else if let Some(port) = non_empty(lookup(PORT_ENV_VAR)) {
            let port: u16 = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("{PORT_ENV_VAR} must be a port")))?;
            self.server.bind = Some(format!("0.0.0.0:{port}"));
        }
        Ok(())
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.backend.validate()?;
        self.validation.validate()?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// Transport used to terminate JSON-RPC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerTransport {
    /// Content-Length or newline framed JSON-RPC over stdin/stdout.
    #[default]
    Stdio,
    /// JSON-RPC over HTTP POST.
    Http,
}

impl ServerTransport {
    /// Parses a transport label.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stdio" => Some(Self::Stdio),
            "http" => Some(Self::Http),
            _ => None,
        }
    }

    /// Returns a stable label for the transport.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdio => "stdio",
            Self::Http => "http",
        }
    }
}

/// Server transport configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Transport type.
    #[serde(default)]
    pub transport: ServerTransport,
    /// Bind address for HTTP.
    #[serde(default)]
    pub bind: Option<String>,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Request audit logging.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: ServerTransport::Stdio,
            bind: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            audit: AuditConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Returns the HTTP bind address, falling back to the default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the address does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let bind = self.bind.as_deref().unwrap_or(DEFAULT_BIND);
        bind.trim().parse().map_err(|_| {
            ConfigError::Invalid(format!("server.bind is not a socket address: {bind}"))
        })
    }

    /// Validates server configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_bytes == 0 || self.max_body_bytes > MAX_BODY_BYTES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "server.max_body_bytes must be between 1 and {MAX_BODY_BYTES_LIMIT}"
            )));
        }
        if self.transport == ServerTransport::Http || self.bind.is_some() {
            self.bind_addr()?;
        }
        self.audit.validate()
    }
}

/// Request audit configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Emits one JSON line per request when true.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Append-only audit file; records go to the tracing log when absent.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("server.audit.path", &path.to_string_lossy())?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Backend
// ============================================================================

/// Letta REST backend configuration.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Base URL including the API version prefix.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer credential attached to every call.
    #[serde(default)]
    pub password: Option<String>,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Connection establishment timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Warm connections kept per host.
    #[serde(default = "default_pool_max_idle_per_host")]
    pub pool_max_idle_per_host: usize,
    /// Idle connection lifetime in milliseconds.
    #[serde(default = "default_pool_idle_timeout_ms")]
    pub pool_idle_timeout_ms: u64,
    /// Bound on concurrent outbound requests.
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    /// Retries for retry-safe calls.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base retry backoff in milliseconds, doubled per attempt.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Outbound user agent.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            password: None,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            pool_max_idle_per_host: DEFAULT_POOL_MAX_IDLE_PER_HOST,
            pool_idle_timeout_ms: DEFAULT_POOL_IDLE_TIMEOUT_MS,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            user_agent: default_user_agent(),
        }
    }
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("BackendConfig")
            .field("base_url", &self.base_url)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("pool_max_idle_per_host", &self.pool_max_idle_per_host)
            .field("pool_idle_timeout_ms", &self.pool_idle_timeout_ms)
            .field("max_concurrent_requests", &self.max_concurrent_requests)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl BackendConfig {
    /// Returns the per-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Returns the connection establishment timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Returns the idle connection lifetime.
    #[must_use]
    pub const fn pool_idle_timeout(&self) -> Duration {
        Duration::from_millis(self.pool_idle_timeout_ms)
    }

    /// Returns the base retry backoff.
    #[must_use]
    pub const fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Validates backend configuration and normalizes the base URL.
    fn validate(&mut self) -> Result<(), ConfigError> {
        let trimmed = self.base_url.trim().trim_end_matches('/').to_string();
        let url = Url::parse(&trimmed)
            .map_err(|err| ConfigError::Invalid(format!("backend.base_url is invalid: {err}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid("backend.base_url must use http or https".to_string()));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(ConfigError::Invalid("backend.base_url must include a host".to_string()));
        }
        self.base_url = trimmed;
        if self.password.as_deref().is_some_and(|value| value.trim().is_empty()) {
            self.password = None;
        }
        check_range(
            "backend.request_timeout_ms",
            self.request_timeout_ms,
            1,
            MAX_REQUEST_TIMEOUT_MS,
        )?;
        check_range(
            "backend.connect_timeout_ms",
            self.connect_timeout_ms,
            1,
            self.request_timeout_ms,
        )?;
        check_range(
            "backend.pool_max_idle_per_host",
            self.pool_max_idle_per_host as u64,
            0,
            MAX_POOL_IDLE_PER_HOST as u64,
        )?;
        check_range(
            "backend.pool_idle_timeout_ms",
            self.pool_idle_timeout_ms,
            0,
            MAX_POOL_IDLE_TIMEOUT_MS,
        )?;
        check_range(
            "backend.max_concurrent_requests",
            self.max_concurrent_requests as u64,
            1,
            MAX_CONCURRENT_REQUESTS_LIMIT as u64,
        )?;
        check_range(
            "backend.max_retries",
            u64::from(self.max_retries),
            0,
            u64::from(MAX_RETRIES_LIMIT),
        )?;
        check_range("backend.retry_backoff_ms", self.retry_backoff_ms, 0, MAX_RETRY_BACKOFF_MS)?;
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid("backend.user_agent must be non-empty".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Validation Policy
// ============================================================================

/// Output validation policy.
///
/// Input validation is always strict and has no switch.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidationConfig {
    /// Rejects output schema violations when true.
    #[serde(default = "default_true")]
    pub strict_outputs: bool,
    /// Tools whose output violations are logged instead of rejected.
    #[serde(default)]
    pub lenient_output_tools: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            strict_outputs: true,
            lenient_output_tools: Vec::new(),
        }
    }
}

impl ValidationConfig {
    /// Returns true when output violations for `tool` are hard failures.
    #[must_use]
    pub fn strict_output_for(&self, tool: &str) -> bool {
        self.strict_outputs && !self.lenient_output_tools.iter().any(|name| name == tool)
    }

    /// Validates that lenient tools name consolidated tools.
    fn validate(&self) -> Result<(), ConfigError> {
        for name in &self.lenient_output_tools {
            if ToolName::parse(name).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "validation.lenient_output_tools contains unknown tool {name}"
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Deprecation Policy
// ============================================================================

/// Legacy alias policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeprecationConfig {
    /// Lists and routes legacy single-purpose tool names when true.
    #[serde(default = "default_true")]
    pub legacy_aliases: bool,
}

impl Default for DeprecationConfig {
    fn default() -> Self {
        Self {
            legacy_aliases: true,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the argument, environment, or default file.
///
/// Returns `None` when no path was requested and the default file is absent.
fn resolve_path(
    path: Option<&Path>,
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = path {
        return Ok(Some(path.to_path_buf()));
    }
    if let Some(env_path) = non_empty(lookup(CONFIG_ENV_VAR)) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(Some(PathBuf::from(env_path)));
    }
    let default = PathBuf::from(DEFAULT_CONFIG_NAME);
    Ok(default.is_file().then_some(default))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a configured path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Checks that a numeric knob lies in an inclusive range.
fn check_range(field: &str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::Invalid(format!("{field} must be between {min} and {max}")));
    }
    Ok(())
}

/// Drops empty or whitespace-only environment values.
fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|text| text.trim().to_string()).filter(|text| !text.is_empty())
}

/// Serde default helper returning true.
const fn default_true() -> bool {
    true
}

/// Serde default for `server.max_body_bytes`.
const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Serde default for `backend.base_url`.
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// Serde default for `backend.request_timeout_ms`.
const fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

/// Serde default for `backend.connect_timeout_ms`.
const fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

/// Serde default for `backend.pool_max_idle_per_host`.
const fn default_pool_max_idle_per_host() -> usize {
    DEFAULT_POOL_MAX_IDLE_PER_HOST
}

/// Serde default for `backend.pool_idle_timeout_ms`.
const fn default_pool_idle_timeout_ms() -> u64 {
    DEFAULT_POOL_IDLE_TIMEOUT_MS
}

/// Serde default for `backend.max_concurrent_requests`.
const fn default_max_concurrent_requests() -> usize {
    DEFAULT_MAX_CONCURRENT_REQUESTS
}

/// Serde default for `backend.max_retries`.
const fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

/// Serde default for `backend.retry_backoff_ms`.
const fn default_retry_backoff_ms() -> u64 {
    DEFAULT_RETRY_BACKOFF_MS
}

/// Serde default for `backend.user_agent`.
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

// crates/letta-mcp-cli/src/main.rs
// ============================================================================
// Module: Letta MCP CLI Entry Point
// Description: Command dispatcher for serving and inspecting the Letta tools.
// Purpose: Start the MCP server and expose offline contract/config checks.
// Dependencies: clap, letta-mcp, letta-mcp-config, tokio, tracing-subscriber
// ============================================================================

//! ## Overview
//! The `letta-mcp` binary starts the JSON-RPC server over stdio or HTTP and
//! offers two offline commands: `tools` prints the advertised tool
//! definitions and `check-config` loads and validates a configuration file.
//! Logs always go to stderr so stdio framing on stdout stays clean.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use letta_mcp::McpServer;
use letta_mcp_config::LettaMcpConfig;
use letta_mcp_config::ServerTransport;
use letta_mcp_contract::DeprecationTable;
use letta_mcp_contract::SchemaRegistry;
use letta_mcp_contract::ToolDefinition;
use letta_mcp_contract::ToolDescriptor;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable holding the log filter directives.
const LOG_ENV: &str = "LETTA_MCP_LOG";

/// Filter applied when neither `--log` nor [`LOG_ENV`] is set.
const DEFAULT_LOG_FILTER: &str = "info";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "letta-mcp", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Log filter directives (overrides `LETTA_MCP_LOG`).
    #[arg(long, value_name = "FILTER", global = true)]
    log: Option<String>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Letta MCP server.
    Serve(ServeCommand),
    /// Print the advertised tool definitions as JSON.
    Tools(ToolsCommand),
    /// Load and validate a configuration file.
    CheckConfig(ConfigArgs),
}

/// Configuration file selection shared by commands.
#[derive(Args, Debug, Clone, Default)]
struct ConfigArgs {
    /// Path to the TOML config (defaults to `LETTA_MCP_CONFIG` or `letta-mcp.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for `serve`.
#[derive(Args, Debug, Clone, Default)]
struct ServeCommand {
    /// Config file selection.
    #[command(flatten)]
    config: ConfigArgs,
    /// Transport override.
    #[arg(long, value_enum, value_name = "TRANSPORT")]
    transport: Option<TransportArg>,
    /// HTTP bind address override.
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,
}

/// Arguments for `tools`.
#[derive(Args, Debug, Clone, Default)]
struct ToolsCommand {
    /// Include deprecated single-purpose aliases.
    #[arg(long, action = ArgAction::SetTrue)]
    legacy: bool,
}

/// Transport selection accepted on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum TransportArg {
    /// Framed JSON-RPC over stdin/stdout.
    Stdio,
    /// JSON-RPC over HTTP POST.
    Http,
}

impl From<TransportArg> for ServerTransport {
    fn from(value: TransportArg) -> Self {
        match value {
            TransportArg::Stdio => Self::Stdio,
            TransportArg::Http => Self::Http,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&format!("letta-mcp {version}"))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }
    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };
    init_logging(cli.log.as_deref())?;

    match command {
        Commands::Serve(command) => command_serve(command).await,
        Commands::Tools(command) => command_tools(&command),
        Commands::CheckConfig(command) => command_check_config(&command),
    }
}

/// Installs the stderr log subscriber.
fn init_logging(directives: Option<&str>) -> CliResult<()> {
    let filter = log_filter(directives, std::env::var(LOG_ENV).ok().as_deref())?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|err| CliError::new(format!("logging init failed: {err}")))
}

/// Resolves the log filter: flag first, then environment, then the default.
fn log_filter(flag: Option<&str>, env: Option<&str>) -> CliResult<EnvFilter> {
    let directives = flag
        .or_else(|| env.filter(|value| !value.trim().is_empty()))
        .unwrap_or(DEFAULT_LOG_FILTER);
    EnvFilter::try_new(directives)
        .map_err(|err| CliError::new(format!("invalid log filter {directives}: {err}")))
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.config.as_deref())?;
    let config = apply_serve_overrides(config, &command)?;
    tracing::info!(
        transport = config.server.transport.as_str(),
        backend = %config.backend.base_url,
        legacy_aliases = config.deprecation.legacy_aliases,
        "starting letta-mcp"
    );
    let server = McpServer::from_config(config)
        .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Applies command-line transport and bind overrides, then revalidates.
fn apply_serve_overrides(
    mut config: LettaMcpConfig,
    command: &ServeCommand,
) -> CliResult<LettaMcpConfig> {
    if let Some(transport) = command.transport {
        config.server.transport = transport.into();
    }
    if let Some(bind) = &command.bind {
        config.server.bind = Some(bind.clone());
    }
    config.validate().map_err(|err| CliError::new(err.to_string()))?;
    Ok(config)
}

// ============================================================================
// SECTION: Offline Commands
// ============================================================================

/// Executes the `tools` command.
fn command_tools(command: &ToolsCommand) -> CliResult<ExitCode> {
    let definitions = tool_definitions(command.legacy)?;
    let rendered = serde_json::to_string_pretty(&definitions)
        .map_err(|err| CliError::new(format!("tool rendering failed: {err}")))?;
    write_stdout_line(&rendered).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Builds the advertised definitions, optionally with legacy aliases.
fn tool_definitions(include_legacy: bool) -> CliResult<Vec<ToolDefinition>> {
    let registry = SchemaRegistry::builtin().map_err(|err| CliError::new(err.to_string()))?;
    let mut definitions: Vec<ToolDefinition> =
        registry.descriptors().iter().map(ToolDescriptor::definition).collect();
    if include_legacy {
        let table =
            DeprecationTable::builtin(&registry).map_err(|err| CliError::new(err.to_string()))?;
        definitions.extend(
            table.descriptors().iter().map(|descriptor| table.annotate(descriptor).definition()),
        );
    }
    Ok(definitions)
}

/// Executes the `check-config` command.
fn command_check_config(command: &ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    write_stdout_line(&config_summary(&config))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Renders the effective settings without secrets.
fn config_summary(config: &LettaMcpConfig) -> String {
    let bind = config.server.bind.as_deref().unwrap_or("-");
    format!(
        "config ok: transport={} bind={} backend={} legacy_aliases={} strict_outputs={}",
        config.server.transport.as_str(),
        bind,
        config.backend.base_url,
        config.deprecation.legacy_aliases,
        config.validation.strict_outputs,
    )
}

/// Loads configuration from a path or the default resolution rules.
fn load_config(path: Option<&Path>) -> CliResult<LettaMcpConfig> {
    LettaMcpConfig::load(path).map_err(|err| CliError::new(format!("config load failed: {err}")))
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Emits the top-level help message for the CLI.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(())
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output stream failure.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}

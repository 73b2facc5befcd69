//! Binary entry point for the getterlint CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Report direct field reads on protobuf messages (JSON)
//! getterlint check
//!
//! # Same, as `file:line:col: message` lines
//! getterlint check internal/ --format text
//!
//! # Preview the getter rewrite as a unified diff
//! getterlint fix --dry-run --format diff
//! ```
//!
//! Exit status is 0 when nothing was reported, 1 when findings or
//! diagnostics were reported, and an error code otherwise.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use getterlint::cli::{load_config, run_check, run_fix};
use getterlint_core::error::{LintError, OutputErrorCode};
use getterlint_core::output::{emit_response, emit_text, ErrorResponse};

// ============================================================================
// CLI Structure
// ============================================================================

/// Nil-safe getter enforcement for generated protobuf messages in Go.
#[derive(Parser, Debug)]
#[command(
    name = "getterlint",
    version,
    about = "Rewrite direct protobuf field reads into getter calls"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Workspace root directory (default: current directory).
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Output format for the check command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum CheckFormat {
    /// Full JSON response (default).
    #[default]
    Json,
    /// One `file:line:col: message` line per finding.
    Text,
}

/// Output format for the fix command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum FixFormat {
    /// Full JSON response (default).
    #[default]
    Json,
    /// Unified diff only.
    Diff,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Report direct field reads on protobuf messages.
    Check {
        /// Files or directories to analyze (default: the whole workspace).
        paths: Vec<PathBuf>,

        /// Output format.
        #[arg(long, value_enum, default_value_t = CheckFormat::Json)]
        format: CheckFormat,

        /// Configuration file (default: `.getterlint.toml` in the workspace).
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Rewrite direct field reads into getter calls.
    Fix {
        /// Files or directories to rewrite (default: the whole workspace).
        paths: Vec<PathBuf>,

        /// Compute the rewrite without writing files.
        #[arg(long)]
        dry_run: bool,

        /// Output format.
        #[arg(long, value_enum, default_value_t = FixFormat::Json)]
        format: FixFormat,

        /// Configuration file (default: `.getterlint.toml` in the workspace).
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

// ============================================================================
// Main
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level);

    match execute(cli) {
        Ok(true) => ExitCode::from(1),
        Ok(false) => ExitCode::SUCCESS,
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            let response = ErrorResponse::from_error(&err);

            // Errors go to stdout as JSON, like every other response
            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();

            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Execute the CLI command. Returns whether anything was reported.
fn execute(cli: Cli) -> Result<bool, LintError> {
    let workspace = resolve_workspace(&cli.global)?;
    match cli.command {
        Command::Check {
            paths,
            format,
            config,
        } => execute_check(&workspace, &paths, format, config.as_deref()),
        Command::Fix {
            paths,
            dry_run,
            format,
            config,
        } => execute_fix(&workspace, &paths, dry_run, format, config.as_deref()),
    }
}

fn resolve_workspace(global: &GlobalArgs) -> Result<PathBuf, LintError> {
    let workspace = match &global.workspace {
        Some(path) => path.clone(),
        None => std::env::current_dir().map_err(|e| LintError::io(".", &e))?,
    };
    if !workspace.is_dir() {
        return Err(LintError::invalid_args(format!(
            "workspace '{}' is not a directory",
            workspace.display()
        )));
    }
    Ok(workspace)
}

// ============================================================================
// Command Executors
// ============================================================================

fn execute_check(
    workspace: &Path,
    paths: &[PathBuf],
    format: CheckFormat,
    config: Option<&Path>,
) -> Result<bool, LintError> {
    let config = load_config(workspace, config)?;
    let response = run_check(workspace, paths, &config)?;

    let mut stdout = io::stdout();
    let written = match format {
        CheckFormat::Json => emit_response(&response, &mut stdout),
        CheckFormat::Text => emit_text(&response, &mut stdout),
    };
    written.map_err(|e| LintError::internal(e.to_string()))?;
    let _ = stdout.flush();

    Ok(response.has_findings())
}

fn execute_fix(
    workspace: &Path,
    paths: &[PathBuf],
    dry_run: bool,
    format: FixFormat,
    config: Option<&Path>,
) -> Result<bool, LintError> {
    let config = load_config(workspace, config)?;
    let response = run_fix(workspace, paths, &config, dry_run)?;

    let mut stdout = io::stdout();
    let written = match format {
        FixFormat::Json => emit_response(&response, &mut stdout),
        FixFormat::Diff => write!(stdout, "{}", response.unified_diff),
    };
    written.map_err(|e| LintError::internal(e.to_string()))?;
    let _ = stdout.flush();

    // Fixed reads no longer count; diagnostics still need a human
    Ok(!response.diagnostics.is_empty())
}

// ============================================================================
// Tests
// ============================================================================

//! Binary entry point for the strutsmig CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Preview every migration as a JSON report
//! strutsmig --workspace ./app migrate
//!
//! # Apply only the date tag recipe
//! strutsmig migrate --only date-tag-format --apply
//!
//! # Review changes as a unified diff
//! strutsmig migrate --format diff
//!
//! # Searches
//! strutsmig find call-sites
//! strutsmig find actions
//!
//! # Translate a single date pattern
//! strutsmig translate-date "YYYY-MM-dd"
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use strutsmig::cli::{
    load_config, run_find_actions, run_find_call_sites, run_migrate, run_translate_date,
    MigrateFormat, MigrateOptions,
};
use strutsmig_core::config::{MigrationConfig, Recipe};
use strutsmig_core::error::MigrateError;
use strutsmig_core::output::{emit_response, ErrorResponse};

// ============================================================================
// CLI Structure
// ============================================================================

/// Whole-project migrations for Struts-style web applications.
///
/// All output is JSON on stdout unless a text format is requested; logs go
/// to stderr.
#[derive(Parser, Debug)]
#[command(name = "strutsmig", version, about = "Whole-project migrations for Struts-style web applications")]
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

    /// Configuration file (default: strutsmig.toml in the workspace).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

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

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Run the migration recipes over the workspace.
    Migrate {
        /// Write changes to disk (default: dry-run).
        #[arg(long)]
        apply: bool,

        /// Run only this recipe; may be repeated.
        #[arg(long)]
        only: Vec<Recipe>,

        /// Output format.
        #[arg(long, value_enum, default_value = "json")]
        format: MigrateFormat,
    },
    /// Read-only searches.
    Find {
        #[command(subcommand)]
        target: FindTarget,
    },
    /// Translate one date pattern to the new formatter syntax.
    #[command(name = "translate-date")]
    TranslateDate {
        /// Pattern to translate, e.g. "YYYY-MM-dd".
        pattern: String,
    },
}

/// What `find` searches for.
#[derive(Subcommand, Debug)]
enum FindTarget {
    /// Static method-access call sites in configuration and markup.
    #[command(name = "call-sites")]
    CallSites,
    /// Actions declared by routing documents.
    Actions,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level);

    match execute(cli) {
        Ok(()) => {
            let _ = io::stdout().flush();
            ExitCode::SUCCESS
        }
        Err(err) => {
            let error_code = err.error_code();
            let response = ErrorResponse::from_error(&err);

            // Errors go to stdout as JSON, like every other response.
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

/// Resolve the workspace root and load its configuration.
fn resolve_workspace(global: &GlobalArgs) -> Result<(PathBuf, MigrationConfig), MigrateError> {
    let workspace = match &global.workspace {
        Some(path) => path.clone(),
        None => std::env::current_dir()
            .map_err(|e| MigrateError::internal(format!("cannot read current directory: {e}")))?,
    };
    let config = load_config(&workspace, global.config.as_deref())?;
    Ok((workspace, config))
}

/// Execute the CLI command.
fn execute(cli: Cli) -> Result<(), MigrateError> {
    let mut stdout = io::stdout().lock();
    match cli.command {
        Command::Migrate {
            apply,
            only,
            format,
        } => {
            let (workspace, config) = resolve_workspace(&cli.global)?;
            let options = MigrateOptions {
                apply,
                only,
                format,
            };
            run_migrate(&workspace, config, &options, &mut stdout)
        }
        Command::Find { target } => {
            let (workspace, config) = resolve_workspace(&cli.global)?;
            match target {
                FindTarget::CallSites => run_find_call_sites(&workspace, &config, &mut stdout),
                FindTarget::Actions => run_find_actions(&workspace, &config, &mut stdout),
            }
        }
        Command::TranslateDate { pattern } => run_translate_date(&pattern, &mut stdout),
    }
}

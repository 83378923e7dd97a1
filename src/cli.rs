//! CLI front door.
//!
//! Command executors behind the `strutsmig` binary:
//! - `migrate` - run every enabled recipe; dry-run unless `--apply`
//! - `find call-sites` - report static method-access call sites
//! - `find actions` - report the actions of every routing document
//! - `translate-date` - translate one date pattern
//!
//! Executors write their response to the given writer and return
//! `Result<(), MigrateError>`; the binary turns errors into an
//! `ErrorResponse` and an exit code.

use std::io::Write;
use std::path::Path;

use clap::ValueEnum;

use strutsmig_core::config::{MigrationConfig, Recipe, RecipesConfig};
use strutsmig_core::date_format;
use strutsmig_core::diff::generate_unified_diff;
use strutsmig_core::error::MigrateError;
use strutsmig_core::output::{
    emit_response, FindResponse, MigrateResponse, TranslateDateResponse, Warning,
};
use strutsmig_core::pipeline::{self, MigrationReport};
use strutsmig_core::project::Project;
use strutsmig_core::search;
use strutsmig_core::workspace::{FileFilter, WorkspaceSnapshot};

/// Output format for `migrate`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum MigrateFormat {
    /// Full JSON report (default).
    #[default]
    Json,
    /// Unified diff of every changed file.
    Diff,
    /// Brief text summary.
    Summary,
}

/// Options of `migrate`.
#[derive(Debug, Clone, Default)]
pub struct MigrateOptions {
    /// Write changes to disk.
    pub apply: bool,
    /// Restrict the run to these recipes (all enabled ones when empty).
    pub only: Vec<Recipe>,
    pub format: MigrateFormat,
}

// ============================================================================
// Configuration and Loading
// ============================================================================

/// Load configuration from `config_path`, or `strutsmig.toml` in the workspace.
pub fn load_config(
    workspace: &Path,
    config_path: Option<&Path>,
) -> Result<MigrationConfig, MigrateError> {
    let config = match config_path {
        Some(path) => MigrationConfig::load(path)?,
        None => MigrationConfig::load_from_workspace(workspace)?,
    };
    Ok(config)
}

/// Snapshot the workspace and load every document.
pub fn open_project(
    workspace: &Path,
    config: &MigrationConfig,
) -> Result<(WorkspaceSnapshot, Project), MigrateError> {
    let filter = FileFilter::from_config(&config.files)?;
    let snapshot = WorkspaceSnapshot::create(workspace, &filter)?;
    let project = Project::from_snapshot(&snapshot);
    tracing::info!(
        root = %snapshot.workspace_root().display(),
        documents = project.len(),
        "loaded project"
    );
    Ok((snapshot, project))
}

fn emit<T: serde::Serialize>(response: &T, out: &mut impl Write) -> Result<(), MigrateError> {
    emit_response(response, out).map_err(|e| MigrateError::internal(e.to_string()))
}

fn write_text(text: &str, out: &mut impl Write) -> Result<(), MigrateError> {
    out.write_all(text.as_bytes())
        .map_err(|e| MigrateError::internal(e.to_string()))
}

// ============================================================================
// Command Executors
// ============================================================================

/// Execute `migrate`.
pub fn run_migrate(
    workspace: &Path,
    mut config: MigrationConfig,
    options: &MigrateOptions,
    out: &mut impl Write,
) -> Result<(), MigrateError> {
    if !options.only.is_empty() {
        config.recipes = RecipesConfig::only(&options.only);
    }
    let (snapshot, project) = open_project(workspace, &config)?;
    let report = pipeline::migrate(&project, &config);

    let files_written = if options.apply && report.has_changes() {
        snapshot.write_changes(&report.changes)?
    } else {
        Vec::new()
    };

    match options.format {
        MigrateFormat::Json => {
            let response = MigrateResponse::new(report, options.apply, files_written);
            emit(&response, out)
        }
        MigrateFormat::Diff => write_text(&generate_unified_diff(&report.changes), out),
        MigrateFormat::Summary => write_text(&render_summary(&report, options.apply), out),
    }
}

/// Execute `find call-sites`.
pub fn run_find_call_sites(
    workspace: &Path,
    config: &MigrationConfig,
    out: &mut impl Write,
) -> Result<(), MigrateError> {
    let (_, project) = open_project(workspace, config)?;
    let found = search::find_call_sites(&project);
    let response = FindResponse::new(
        "call-sites",
        found.documents,
        found.touched_nodes,
        found.rows,
        load_warnings(&project),
    );
    emit(&response, out)
}

/// Execute `find actions`.
pub fn run_find_actions(
    workspace: &Path,
    config: &MigrationConfig,
    out: &mut impl Write,
) -> Result<(), MigrateError> {
    let (_, project) = open_project(workspace, config)?;
    let (rows, documents) = search::find_actions(&project, &config.routing);
    let response = FindResponse::new("actions", documents, 0, rows, load_warnings(&project));
    emit(&response, out)
}

/// Execute `translate-date`.
pub fn run_translate_date(pattern: &str, out: &mut impl Write) -> Result<(), MigrateError> {
    if pattern.trim().is_empty() {
        return Err(MigrateError::invalid_args("date pattern must not be empty"));
    }
    let translated = date_format::translate(pattern);
    emit(&TranslateDateResponse::new(pattern, translated), out)
}

// ============================================================================
// Helpers
// ============================================================================

/// Warnings for documents a search could not read as trees.
fn load_warnings(project: &Project) -> Vec<Warning> {
    project
        .issues()
        .iter()
        .map(|issue| {
            Warning::new(
                pipeline::warning_codes::DOCUMENT_KEPT_AS_TEXT,
                format!("{}: {}", issue.path, issue.error),
            )
        })
        .collect()
}

/// Human-readable summary of a run.
fn render_summary(report: &MigrationReport, applied: bool) -> String {
    let summary = &report.summary;
    let mut text = format!(
        "{} of {} file(s) {}\n",
        summary.files_changed,
        summary.documents,
        if applied { "changed" } else { "would change" },
    );
    for file in &report.files {
        let recipes: Vec<&str> = file.recipes.iter().map(|r| r.as_str()).collect();
        text.push_str(&format!("  M {} [{}]\n", file.path, recipes.join(", ")));
    }
    text.push_str(&format!(
        "call sites: {} ({} unresolved), expressions rewritten: {}, accessors added: {}, actions split: {}, date patterns: {}\n",
        summary.call_sites,
        summary.unresolved_call_sites,
        summary.expressions_rewritten,
        summary.accessors_added,
        summary.actions_split,
        summary.date_patterns_translated,
    ));
    if !report.warnings.is_empty() {
        text.push_str(&format!("warnings: {}\n", report.warnings.len()));
        for warning in &report.warnings {
            text.push_str(&format!("  {}: {}\n", warning.code, warning.message));
        }
    }
    text
}

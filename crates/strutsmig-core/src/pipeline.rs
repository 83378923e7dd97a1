//! The two-phase migration run.
//!
//! 1. **Scan.** Every document is visited once. Routing documents contribute
//!    view bindings, configuration and markup documents contribute call
//!    sites. Per-document facts are gathered in parallel and folded into an
//!    [`AccumulatorBuilder`] in path order, then frozen.
//! 2. **Edit.** Only once the frozen [`Accumulator`] exists, every document
//!    is edited independently (in parallel) against it:
//!    - configuration: dynamic-invocation migration of routing documents,
//!      then expression rewriting
//!    - markup: date tag translation, then expression rewriting
//!    - source: wrapper synthesis
//!
//! The result is a [`MigrationReport`] holding one [`FileChange`] per edited
//! file. Nothing is written here; applying the changes is up to the caller.
//!
//! Every step skips input it already migrated, so running the pipeline on
//! its own output reports no changes.

use indexmap::IndexSet;
use rayon::prelude::*;
use serde::Serialize;

use crate::config::{MigrationConfig, Recipe, RoutingConfig};
use crate::date_format::{self, DateFormatChange};
use crate::document::{Document, DocumentBody, DocumentKind};
use crate::facts::{
    collect_call_sites, collect_view_bindings, Accumulator, AccumulatorBuilder, CallSite,
    ViewBinding,
};
use crate::output::{serialize_sorted_warnings, CallSiteRow, DataTable, Location, Warning};
use crate::patch::FileChange;
use crate::project::{Project, ProjectDocument};
use crate::rewriter::{self, ExpressionRewrite};
use crate::splitter::{migrate_dynamic_invocation, SplitRecord};
use crate::synthesizer::{synthesize, SynthesizedAccessor};

/// Warning codes used in migration reports.
pub mod warning_codes {
    pub const UNPARSEABLE_DOCUMENT: &str = "unparseable_document";
    pub const DOCUMENT_KEPT_AS_TEXT: &str = "document_kept_as_text";
    pub const MALFORMED_SOURCE: &str = "malformed_source";
    pub const UNRESOLVED_CALL_SITE: &str = "unresolved_call_site";
    pub const SKIPPED_FILE: &str = "skipped_file";
}

// ============================================================================
// Report
// ============================================================================

/// One changed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub path: String,
    pub kind: DocumentKind,
    /// Recipes that changed the file, in application order.
    pub recipes: Vec<Recipe>,
    pub byte_delta: i64,
}

/// An expression replaced in a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewriteRecord {
    pub file: String,
    #[serde(flatten)]
    pub rewrite: ExpressionRewrite,
}

/// An accessor added to a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessorRecord {
    pub file: String,
    #[serde(flatten)]
    pub accessor: SynthesizedAccessor,
}

/// An action split in a routing document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitEntry {
    pub file: String,
    #[serde(flatten)]
    pub split: SplitRecord,
}

/// A date pattern translated in a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateFormatEntry {
    pub file: String,
    #[serde(flatten)]
    pub change: DateFormatChange,
}

/// Counts over a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationSummary {
    pub documents: usize,
    pub files_changed: usize,
    pub view_bindings: usize,
    pub call_sites: usize,
    pub unresolved_call_sites: usize,
    pub expressions_rewritten: usize,
    pub accessors_added: usize,
    pub accessors_skipped: usize,
    pub imports_added: usize,
    pub actions_split: usize,
    pub date_patterns_translated: usize,
}

/// Everything a migration run found and changed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationReport {
    /// Recipes that were enabled.
    pub recipes: Vec<Recipe>,
    pub files: Vec<FileReport>,
    /// Call sites discovered by the scan pass.
    pub call_sites: DataTable<CallSiteRow>,
    pub rewrites: Vec<RewriteRecord>,
    pub accessors: Vec<AccessorRecord>,
    pub splits: Vec<SplitEntry>,
    pub date_formats: Vec<DateFormatEntry>,
    #[serde(serialize_with = "serialize_sorted_warnings")]
    pub warnings: Vec<Warning>,
    pub summary: MigrationSummary,
    /// Before/after text of every changed file, in path order.
    #[serde(skip)]
    pub changes: Vec<FileChange>,
}

impl MigrationReport {
    /// Whether any file changed.
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}

// ============================================================================
// Scan Pass
// ============================================================================

/// Gather cross-reference facts from every document and freeze them.
pub fn scan(project: &Project, routing: &RoutingConfig) -> Accumulator {
    let span = tracing::info_span!("scan", documents = project.len());
    let _guard = span.enter();

    let gathered: Vec<(Vec<ViewBinding>, Vec<CallSite>)> = project
        .documents()
        .par_iter()
        .map(|entry| {
            let document = &entry.document;
            let bindings = if routing.is_routing(document) {
                collect_view_bindings(document)
            } else {
                Vec::new()
            };
            tracing::debug!(path = %document.path, bindings = bindings.len(), "scanned document");
            (bindings, collect_call_sites(document))
        })
        .collect();

    let mut builder = AccumulatorBuilder::new();
    for (bindings, call_sites) in gathered {
        for binding in bindings {
            builder.record_view_binding(binding);
        }
        for call_site in call_sites {
            builder.record_call_site(call_site);
        }
    }
    let facts = builder.freeze();
    tracing::info!(
        bindings = facts.bindings().len(),
        call_sites = facts.call_sites().len(),
        owners = facts.owners().count(),
        "scan pass complete"
    );
    facts
}

// ============================================================================
// Edit Pass
// ============================================================================

/// What editing one document produced.
#[derive(Debug, Default)]
struct DocumentEdit {
    recipes: Vec<Recipe>,
    rewrites: Vec<ExpressionRewrite>,
    accessors: Vec<SynthesizedAccessor>,
    accessors_skipped: usize,
    imports_added: usize,
    splits: Vec<SplitRecord>,
    date_formats: Vec<DateFormatChange>,
    warnings: Vec<Warning>,
    after: Option<String>,
}

impl DocumentEdit {
    fn rewrite_expressions(&mut self, document: &mut Document) {
        if let Some((rewritten, rewrites)) = rewriter::rewrite_document(document) {
            *document = rewritten;
            self.rewrites = rewrites;
            self.recipes.push(Recipe::StaticMethodAccess);
        }
    }
}

fn edit_structured(entry: &ProjectDocument, config: &MigrationConfig) -> DocumentEdit {
    let mut edit = DocumentEdit::default();
    let mut document = entry.document.clone();
    let recipes = &config.recipes;

    match document.kind {
        DocumentKind::Config => {
            if matches!(document.body, DocumentBody::Text(_)) {
                return edit;
            }
            if recipes.dynamic_method_invocation && config.routing.is_routing(&document) {
                let migration = document.tree().and_then(migrate_dynamic_invocation);
                if let Some(migration) = migration {
                    document = document.with_body(DocumentBody::Tree(migration.tree));
                    edit.splits = migration.splits;
                    edit.recipes.push(Recipe::DynamicMethodInvocation);
                }
            }
        }
        DocumentKind::Markup => {
            if recipes.date_tag_format {
                if let Some((migrated, changes)) = date_format::migrate_document(&document) {
                    document = migrated;
                    edit.date_formats = changes;
                    edit.recipes.push(Recipe::DateTagFormat);
                }
            }
        }
        DocumentKind::Source | DocumentKind::Other => return edit,
    }

    if recipes.static_method_access {
        edit.rewrite_expressions(&mut document);
    }
    if !edit.recipes.is_empty() {
        let after = document.render();
        if after != entry.original {
            edit.after = Some(after);
        }
    }
    edit
}

fn edit_source(entry: &ProjectDocument, facts: &Accumulator, config: &MigrationConfig) -> DocumentEdit {
    let mut edit = DocumentEdit::default();
    if !config.recipes.static_method_access {
        return edit;
    }
    let path = &entry.document.path;
    match synthesize(&entry.original, facts) {
        Ok(synthesis) => {
            edit.accessors_skipped = synthesis.skipped;
            edit.imports_added = synthesis.imports.len();
            edit.accessors = synthesis.accessors;
            if synthesis.text != entry.original {
                edit.recipes.push(Recipe::StaticMethodAccess);
                edit.after = Some(synthesis.text);
            }
        }
        Err(error) => {
            tracing::warn!(path = %path, %error, "source left unchanged");
            edit.warnings.push(
                Warning::new(
                    warning_codes::MALFORMED_SOURCE,
                    format!("{path} is left unchanged: {error}"),
                )
                .suggest("add the accessors by hand"),
            );
        }
    }
    edit
}

fn edit_document(entry: &ProjectDocument, facts: &Accumulator, config: &MigrationConfig) -> DocumentEdit {
    let edit = match entry.document.kind {
        DocumentKind::Source => edit_source(entry, facts, config),
        _ => edit_structured(entry, config),
    };
    if edit.after.is_some() {
        tracing::debug!(path = %entry.document.path, recipes = ?edit.recipes, "edited document");
    }
    edit
}

/// Edit every document against frozen facts.
pub fn edit(project: &Project, facts: &Accumulator, config: &MigrationConfig) -> MigrationReport {
    let span = tracing::info_span!("edit", documents = project.len());
    let _guard = span.enter();

    let outcomes: Vec<DocumentEdit> = project
        .documents()
        .par_iter()
        .map(|entry| edit_document(entry, facts, config))
        .collect();

    let mut report = MigrationReport {
        recipes: config.recipes.enabled(),
        ..Default::default()
    };
    report.warnings.extend(load_warnings(project));
    if config.recipes.static_method_access {
        report.warnings.extend(unresolved_warnings(project, facts));
    }
    report.call_sites = facts
        .call_sites()
        .iter()
        .map(|c| CallSiteRow {
            source_file: c.source_document.clone(),
            expression: c.expression.clone(),
            owner_type: c.owner_type.clone(),
            member_name: c.member_name.clone(),
        })
        .collect();

    let mut summary = MigrationSummary {
        documents: project.len(),
        view_bindings: facts.bindings().len(),
        call_sites: facts.call_sites().len(),
        unresolved_call_sites: facts.unresolved_call_sites().count(),
        ..Default::default()
    };

    for (entry, outcome) in project.documents().iter().zip(outcomes) {
        let path = &entry.document.path;
        summary.accessors_skipped += outcome.accessors_skipped;
        summary.imports_added += outcome.imports_added;
        report.warnings.extend(outcome.warnings);
        report.rewrites.extend(outcome.rewrites.into_iter().map(|rewrite| RewriteRecord {
            file: path.clone(),
            rewrite,
        }));
        report.accessors.extend(outcome.accessors.into_iter().map(|accessor| AccessorRecord {
            file: path.clone(),
            accessor,
        }));
        report.splits.extend(outcome.splits.into_iter().map(|split| SplitEntry {
            file: path.clone(),
            split,
        }));
        report.date_formats.extend(outcome.date_formats.into_iter().map(|change| DateFormatEntry {
            file: path.clone(),
            change,
        }));
        if let Some(after) = outcome.after {
            let change = FileChange::new(path.clone(), entry.original.clone(), after);
            report.files.push(FileReport {
                path: path.clone(),
                kind: entry.document.kind,
                recipes: outcome.recipes,
                byte_delta: change.byte_delta(),
            });
            report.changes.push(change);
        }
    }

    summary.files_changed = report.changes.len();
    summary.expressions_rewritten = report.rewrites.len();
    summary.accessors_added = report.accessors.len();
    summary.actions_split = report.splits.len();
    summary.date_patterns_translated = report.date_formats.len();
    report.summary = summary;

    tracing::info!(
        files_changed = report.summary.files_changed,
        rewrites = report.summary.expressions_rewritten,
        accessors = report.summary.accessors_added,
        splits = report.summary.actions_split,
        date_patterns = report.summary.date_patterns_translated,
        "edit pass complete"
    );
    report
}

/// Scan, freeze, then edit.
pub fn migrate(project: &Project, config: &MigrationConfig) -> MigrationReport {
    let facts = scan(project, &config.routing);
    edit(project, &facts, config)
}

// ============================================================================
// Warnings
// ============================================================================

fn load_warnings(project: &Project) -> Vec<Warning> {
    let mut warnings: Vec<Warning> = project
        .issues()
        .iter()
        .map(|issue| {
            let location = Location::new(issue.path.clone(), issue.error.line, issue.error.col);
            match issue.kind {
                DocumentKind::Config => Warning::with_location(
                    warning_codes::UNPARSEABLE_DOCUMENT,
                    format!("{} is left unchanged: {}", issue.path, issue.error.message),
                    location,
                )
                .suggest("fix the document syntax and run again"),
                _ => Warning::with_location(
                    warning_codes::DOCUMENT_KEPT_AS_TEXT,
                    format!("{} migrated as plain text: {}", issue.path, issue.error.message),
                    location,
                ),
            }
        })
        .collect();
    warnings.extend(project.skipped().iter().map(|skipped| {
        Warning::new(
            warning_codes::SKIPPED_FILE,
            format!("{} skipped: {}", skipped.path, skipped.reason),
        )
    }));
    warnings
}

/// One warning per distinct unresolved expression per document.
fn unresolved_warnings(project: &Project, facts: &Accumulator) -> Vec<Warning> {
    let unresolved: IndexSet<(&str, &str)> = facts
        .unresolved_call_sites()
        .map(|c| (c.source_document.as_str(), c.expression.as_str()))
        .collect();
    unresolved
        .into_iter()
        .map(|(path, expression)| {
            tracing::warn!(path, expression, "no action type renders this view");
            let message = format!("no action type found for {expression}; it is rewritten without a wrapper");
            let located = project.get(path).and_then(|entry| {
                let start = entry.original.find(expression)?;
                Some(Location::from_range(path, &entry.original, start, start + expression.len()))
            });
            let warning = match located {
                Some(location) => {
                    Warning::with_location(warning_codes::UNRESOLVED_CALL_SITE, message, location)
                }
                None => Warning::new(warning_codes::UNRESOLVED_CALL_SITE, message),
            };
            warning.suggest("add the accessor to the action type by hand")
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

//! JSON output types and serialization for CLI responses.
//!
//! These types form the **agent contract** of the `strutsmig` binary.
//!
//! ## Design Principles
//!
//! 1. **Structured JSON:** every response is valid JSON; `migrate --format diff`
//!    prints a plain unified diff instead
//! 2. **Status first:** every response has `status` as its first field
//! 3. **Deterministic:** same input -> same output (field order, array ordering)
//! 4. **Versioned:** the schema version lets consumers detect changes
//!
//! ## Reporting Sink
//!
//! Search hits and discovered call sites are reported as flat rows collected
//! in a [`DataTable`]. Rows are a side channel: nothing in the pipeline reads
//! them back.

use std::io::{self, Write};

use serde::{Deserialize, Serialize, Serializer};

use crate::error::{MigrateError, OutputErrorCode};
use crate::pipeline::MigrationReport;

pub use crate::types::Location;

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

/// Warning information for JSON output.
///
/// - `code`: Stable warning code (required)
/// - `message`: Human-readable message (required)
/// - `location`: Where the warning applies (optional)
/// - `suggestion`: Suggested action (optional)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    /// Stable warning code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Where the warning applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// Suggested action.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Warning {
    /// Create a simple warning without location.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Warning {
            code: code.into(),
            message: message.into(),
            location: None,
            suggestion: None,
        }
    }

    /// Create a warning with location.
    pub fn with_location(
        code: impl Into<String>,
        message: impl Into<String>,
        location: Location,
    ) -> Self {
        Warning {
            code: code.into(),
            message: message.into(),
            location: Some(location),
            suggestion: None,
        }
    }

    /// Attach a suggested action.
    pub fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

// ============================================================================
// Reporting Rows
// ============================================================================

/// Ordered rows of one report table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataTable<R> {
    rows: Vec<R>,
}

impl<R> Default for DataTable<R> {
    fn default() -> Self {
        DataTable { rows: Vec::new() }
    }
}

impl<R> DataTable<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<R> Extend<R> for DataTable<R> {
    fn extend<I: IntoIterator<Item = R>>(&mut self, iter: I) {
        self.rows.extend(iter);
    }
}

impl<R> FromIterator<R> for DataTable<R> {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        DataTable {
            rows: iter.into_iter().collect(),
        }
    }
}

/// A static method-access expression found in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSiteRow {
    pub source_file: String,
    /// The attribute value or text span holding the call.
    pub expression: String,
    pub owner_type: String,
    pub member_name: String,
}

/// An action declared by a routing document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRow {
    pub source_file: String,
    /// Dot-joined names of the enclosing packages.
    pub package: String,
    pub name: String,
    pub class_name: String,
    pub method_name: String,
}

// ============================================================================
// Error Types
// ============================================================================

/// Error information for error responses.
///
/// - `code`: Numeric error code (required)
/// - `message`: Human-readable message (required)
/// - `details`: Error-specific structured data (optional)
/// - `location`: Where the error occurred (optional)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Numeric error code.
    pub code: u8,
    /// Human-readable message.
    pub message: String,
    /// Error-specific structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Where the error occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl ErrorInfo {
    /// Create from a MigrateError.
    pub fn from_error(err: &MigrateError) -> Self {
        let code = OutputErrorCode::from(err).code();
        let message = err.to_string();

        let details = match err {
            MigrateError::FileNotFound { path } => Some(serde_json::json!({ "path": path })),
            MigrateError::ApplyError { file, .. } => {
                file.as_ref().map(|f| serde_json::json!({ "file": f }))
            }
            _ => None,
        };

        ErrorInfo {
            code,
            message,
            details,
            location: None,
        }
    }
}

/// Error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Error information.
    pub error: ErrorInfo,
}

impl ErrorResponse {
    /// Create an error response from a MigrateError.
    pub fn from_error(err: &MigrateError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }

    /// Create an error response with just code and message.
    pub fn new(code: u8, message: impl Into<String>) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo {
                code,
                message: message.into(),
                details: None,
                location: None,
            },
        }
    }
}

// ============================================================================
// Response Structs
// ============================================================================

/// Response for `migrate`.
#[derive(Debug, Clone, Serialize)]
pub struct MigrateResponse {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Whether changes were written to disk.
    pub applied: bool,
    /// Paths written, in order (empty on a dry run).
    pub files_written: Vec<String>,
    #[serde(flatten)]
    pub report: MigrationReport,
}

impl MigrateResponse {
    pub fn new(report: MigrationReport, applied: bool, files_written: Vec<String>) -> Self {
        MigrateResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            applied,
            files_written,
            report,
        }
    }
}

/// Response for `find call-sites` and `find actions`.
#[derive(Debug, Clone, Serialize)]
pub struct FindResponse<R> {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Which search ran.
    pub search: String,
    /// Documents searched.
    pub documents: usize,
    /// Nodes marked as hits.
    pub touched_nodes: usize,
    pub rows: DataTable<R>,
    #[serde(serialize_with = "serialize_sorted_warnings")]
    pub warnings: Vec<Warning>,
}

impl<R> FindResponse<R> {
    pub fn new(
        search: impl Into<String>,
        documents: usize,
        touched_nodes: usize,
        rows: DataTable<R>,
        warnings: Vec<Warning>,
    ) -> Self {
        FindResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            search: search.into(),
            documents,
            touched_nodes,
            rows,
            warnings,
        }
    }
}

/// Response for `translate-date`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateDateResponse {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    pub pattern: String,
    pub translated: String,
    pub changed: bool,
}

impl TranslateDateResponse {
    pub fn new(pattern: impl Into<String>, translated: impl Into<String>) -> Self {
        let pattern = pattern.into();
        let translated = translated.into();
        TranslateDateResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            changed: pattern != translated,
            pattern,
            translated,
        }
    }
}

// ============================================================================
// Deterministic Sorting
// ============================================================================

/// Serialize warnings sorted by location (if present).
pub(crate) fn serialize_sorted_warnings<S>(
    warnings: &[Warning],
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut sorted: Vec<_> = warnings.iter().collect();
    sorted.sort_by(|a, b| match (&a.location, &b.location) {
        (Some(loc_a), Some(loc_b)) => loc_a.cmp(loc_b),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.code.cmp(&b.code).then_with(|| a.message.cmp(&b.message)),
    });
    sorted.serialize(serializer)
}

// ============================================================================
// Response Emission
// ============================================================================

/// Emit a response as pretty-printed JSON to a writer.
///
/// This is the single output path for CLI, ensuring consistency.
/// The output is deterministic: same input produces identical bytes.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

// ============================================================================
// Tests
// ============================================================================

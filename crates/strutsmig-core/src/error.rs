//! Error types and error code constants for strutsmig.
//!
//! This module provides a unified error type (`MigrateError`) that bridges
//! domain-specific errors from different subsystems (config, workspace,
//! patch application) into a common format suitable for JSON output.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments (bad input from caller, bad configuration)
//! - `3`: Resolution errors (workspace or file not found)
//! - `4`: Apply errors (failed to write changes, stale files)
//! - `10`: Internal errors (bugs, unexpected state)
//!
//! Per-document problems (unparseable documents, malformed source) never
//! surface here: they become warnings in the migration report and the
//! document is left unchanged.

use std::fmt;

use thiserror::Error;

use crate::config::ConfigError;
use crate::patch::PatchError;
use crate::workspace::WorkspaceError;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output.
///
/// These codes map to CLI exit codes and appear in JSON error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller (bad input, malformed configuration).
    InvalidArguments = 2,
    /// Resolution errors (workspace or file not found).
    ResolutionError = 3,
    /// Apply errors (failed to write changes, stale file).
    ApplyError = 4,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for CLI output.
///
/// All subsystem errors are converted to this type before being rendered as
/// JSON output.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// Configuration file could not be read or understood.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// File or directory not found.
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    /// Failed to apply changes.
    #[error("apply error: {message}")]
    ApplyError {
        message: String,
        file: Option<String>,
    },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    InternalError { message: String },
}

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&MigrateError> for OutputErrorCode {
    fn from(err: &MigrateError) -> Self {
        match err {
            MigrateError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            MigrateError::InvalidConfig { .. } => OutputErrorCode::InvalidArguments,
            MigrateError::FileNotFound { .. } => OutputErrorCode::ResolutionError,
            MigrateError::ApplyError { .. } => OutputErrorCode::ApplyError,
            MigrateError::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<MigrateError> for OutputErrorCode {
    fn from(err: MigrateError) -> Self {
        OutputErrorCode::from(&err)
    }
}

// ============================================================================
// Bridges: subsystem errors -> MigrateError
// ============================================================================

impl From<ConfigError> for MigrateError {
    fn from(err: ConfigError) -> Self {
        MigrateError::InvalidConfig {
            message: err.to_string(),
        }
    }
}

impl From<WorkspaceError> for MigrateError {
    fn from(err: WorkspaceError) -> Self {
        match err {
            WorkspaceError::RootNotFound { path } => MigrateError::FileNotFound {
                path: path.display().to_string(),
            },
            WorkspaceError::InvalidPattern { pattern, reason } => MigrateError::InvalidConfig {
                message: format!("bad glob pattern '{}': {}", pattern, reason),
            },
            WorkspaceError::Walk { message } => MigrateError::InternalError {
                message: format!("workspace walk failed: {}", message),
            },
            WorkspaceError::Io { path, source } => MigrateError::ApplyError {
                message: source.to_string(),
                file: Some(path),
            },
            WorkspaceError::Patch(patch_err) => MigrateError::from(patch_err),
        }
    }
}

impl From<PatchError> for MigrateError {
    fn from(err: PatchError) -> Self {
        let file = match &err {
            PatchError::StaleFile { path } => Some(path.clone()),
            _ => None,
        };
        MigrateError::ApplyError {
            message: err.to_string(),
            file,
        }
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl MigrateError {
    /// Create an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        MigrateError::InvalidArguments {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        MigrateError::InternalError {
            message: message.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod error_code_mapping {
        use super::*;

        #[test]
        fn invalid_arguments_maps_to_invalid_arguments() {
            let err = MigrateError::invalid_args("unknown recipe");
            assert_eq!(
                OutputErrorCode::from(&err),
                OutputErrorCode::InvalidArguments
            );
            assert_eq!(err.error_code().code(), 2);
        }

        #[test]
        fn config_error_maps_to_invalid_arguments() {
            let err = MigrateError::from(ConfigError::Parse {
                path: "strutsmig.toml".into(),
                message: "expected table".to_string(),
            });
            assert_eq!(err.error_code(), OutputErrorCode::InvalidArguments);
        }

        #[test]
        fn file_not_found_maps_to_resolution_error() {
            let err = MigrateError::FileNotFound {
                path: "missing/".to_string(),
            };
            assert_eq!(err.error_code().code(), 3);
        }

        #[test]
        fn stale_file_maps_to_apply_error_with_file() {
            let err = MigrateError::from(PatchError::StaleFile {
                path: "a.jsp".to_string(),
            });
            assert_eq!(err.error_code().code(), 4);
            match err {
                MigrateError::ApplyError { file, .. } => assert_eq!(file.as_deref(), Some("a.jsp")),
                other => panic!("unexpected error: {other:?}"),
            }
        }

        #[test]
        fn missing_root_maps_to_resolution_error() {
            let err = MigrateError::from(WorkspaceError::RootNotFound {
                path: "/nope".into(),
            });
            assert_eq!(err.error_code(), OutputErrorCode::ResolutionError);
        }

        #[test]
        fn internal_error_maps_to_internal_error() {
            let err = MigrateError::internal("unexpected state");
            assert_eq!(err.error_code().code(), 10);
        }
    }

    mod error_display {
        use super::*;

        #[test]
        fn invalid_arguments_display() {
            let err = MigrateError::invalid_args("missing pattern");
            assert_eq!(err.to_string(), "invalid arguments: missing pattern");
        }

        #[test]
        fn file_not_found_display() {
            let err = MigrateError::FileNotFound {
                path: "web/".to_string(),
            };
            assert_eq!(err.to_string(), "file not found: web/");
        }
    }

    mod output_error_code {
        use super::*;

        #[test]
        fn code_values() {
            assert_eq!(OutputErrorCode::InvalidArguments.code(), 2);
            assert_eq!(OutputErrorCode::ResolutionError.code(), 3);
            assert_eq!(OutputErrorCode::ApplyError.code(), 4);
            assert_eq!(OutputErrorCode::InternalError.code(), 10);
        }

        #[test]
        fn display_shows_code() {
            assert_eq!(format!("{}", OutputErrorCode::ApplyError), "4");
        }
    }
}

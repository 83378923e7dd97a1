//! Workspace snapshot: the files a migration run reads and writes.
//!
//! A snapshot captures, at one point in time:
//! - every migratable file under the workspace root that passes the filter
//! - its text and content hash
//! - a deterministic order (sorted by path)
//!
//! Changes computed from the snapshot are written back only if the file on
//! disk still has the hash it had when the snapshot was taken.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use walkdir::WalkDir;

use crate::config::FilesConfig;
use crate::document::DocumentKind;
use crate::patch::{ContentHash, FileChange, PatchError};

/// Errors raised while reading or writing the workspace.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("workspace root not found: {}", path.display())]
    RootNotFound { path: PathBuf },

    #[error("invalid glob pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("workspace walk failed: {message}")]
    Walk { message: String },

    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Patch(#[from] PatchError),
}

// ============================================================================
// File Filter
// ============================================================================

/// Directory exclusions that always apply.
pub const DEFAULT_EXCLUSIONS: &[&str] = &[
    "**/.git/**",
    "**/target/**",
    "**/build/**",
    "**/node_modules/**",
];

/// Include/exclude globs over workspace-relative paths.
#[derive(Debug)]
pub struct FileFilter {
    /// `None` includes everything not excluded.
    inclusions: Option<GlobSet>,
    exclusions: GlobSet,
    default_exclusions: GlobSet,
}

impl FileFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, WorkspaceError> {
        let inclusions = if include.is_empty() {
            None
        } else {
            Some(build_glob_set(include)?)
        };
        let defaults: Vec<String> = DEFAULT_EXCLUSIONS.iter().map(|s| s.to_string()).collect();
        Ok(FileFilter {
            inclusions,
            exclusions: build_glob_set(exclude)?,
            default_exclusions: build_glob_set(&defaults)?,
        })
    }

    pub fn from_config(files: &FilesConfig) -> Result<Self, WorkspaceError> {
        Self::new(&files.include, &files.exclude)
    }

    /// Whether a workspace-relative path is in scope.
    pub fn matches(&self, path: &Path) -> bool {
        if self.default_exclusions.is_match(path) || self.exclusions.is_match(path) {
            return false;
        }
        match &self.inclusions {
            Some(inclusions) => inclusions.is_match(path),
            None => true,
        }
    }
}

fn build_glob_set(patterns: &[String]) -> Result<GlobSet, WorkspaceError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| WorkspaceError::InvalidPattern {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| WorkspaceError::InvalidPattern {
        pattern: "<combined>".to_string(),
        reason: e.to_string(),
    })
}

// ============================================================================
// File Information
// ============================================================================

/// One file in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Relative path from the workspace root, `/`-separated.
    pub path: String,
    pub content_hash: ContentHash,
    pub size_bytes: u64,
    pub kind: DocumentKind,
}

impl FileInfo {
    pub fn from_content(path: &str, content: &str) -> Self {
        FileInfo {
            path: path.to_string(),
            content_hash: ContentHash::compute(content.as_bytes()),
            size_bytes: content.len() as u64,
            kind: DocumentKind::from_path(Path::new(path)),
        }
    }
}

/// A file that was found but not loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

// ============================================================================
// Workspace Snapshot
// ============================================================================

/// Immutable view of the migratable files under a workspace root.
#[derive(Debug, Clone)]
pub struct WorkspaceSnapshot {
    workspace_root: PathBuf,
    files: Vec<FileInfo>,
    contents: Vec<String>,
    path_to_index: HashMap<String, usize>,
    skipped: Vec<SkippedFile>,
}

impl WorkspaceSnapshot {
    /// Scan `workspace_root` for configuration, markup and source files.
    ///
    /// Files of other kinds are ignored. Files that are not valid UTF-8 are
    /// recorded as skipped.
    pub fn create(workspace_root: &Path, filter: &FileFilter) -> Result<Self, WorkspaceError> {
        if !workspace_root.is_dir() {
            return Err(WorkspaceError::RootNotFound {
                path: workspace_root.to_path_buf(),
            });
        }
        let workspace_root = workspace_root
            .canonicalize()
            .map_err(|source| WorkspaceError::Io {
                path: workspace_root.display().to_string(),
                source,
            })?;

        let mut loaded: Vec<(FileInfo, String)> = Vec::new();
        let mut skipped = Vec::new();

        for entry in WalkDir::new(&workspace_root).follow_links(false) {
            let entry = entry.map_err(|e| WorkspaceError::Walk {
                message: e.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&workspace_root) else {
                continue;
            };
            if !filter.matches(relative) {
                continue;
            }
            if DocumentKind::from_path(relative) == DocumentKind::Other {
                continue;
            }

            let relative_str = relative
                .to_string_lossy()
                .replace(std::path::MAIN_SEPARATOR, "/");
            let bytes = fs::read(entry.path()).map_err(|source| WorkspaceError::Io {
                path: relative_str.clone(),
                source,
            })?;
            match String::from_utf8(bytes) {
                Ok(text) => loaded.push((FileInfo::from_content(&relative_str, &text), text)),
                Err(_) => {
                    tracing::warn!(path = %relative_str, "skipping file that is not UTF-8");
                    skipped.push(SkippedFile {
                        path: relative_str,
                        reason: "not valid UTF-8".to_string(),
                    });
                }
            }
        }

        tracing::debug!(
            root = %workspace_root.display(),
            files = loaded.len(),
            skipped = skipped.len(),
            "workspace snapshot created"
        );
        let mut snapshot = Self::from_files(workspace_root, loaded);
        snapshot.skipped = skipped;
        Ok(snapshot)
    }

    /// Build a snapshot from in-memory files.
    pub fn from_files(workspace_root: PathBuf, files: Vec<(FileInfo, String)>) -> Self {
        let mut files = files;
        files.sort_by(|a, b| a.0.path.cmp(&b.0.path));
        let path_to_index = files
            .iter()
            .enumerate()
            .map(|(idx, (info, _))| (info.path.clone(), idx))
            .collect();
        let (files, contents) = files.into_iter().unzip();
        WorkspaceSnapshot {
            workspace_root,
            files,
            contents,
            path_to_index,
            skipped: Vec::new(),
        }
    }

    /// Snapshot of in-memory `(path, text)` pairs rooted at `workspace_root`.
    pub fn from_texts<P, T>(workspace_root: PathBuf, texts: impl IntoIterator<Item = (P, T)>) -> Self
    where
        P: AsRef<str>,
        T: Into<String>,
    {
        let files = texts
            .into_iter()
            .map(|(path, text)| {
                let text = text.into();
                (FileInfo::from_content(path.as_ref(), &text), text)
            })
            .collect();
        Self::from_files(workspace_root, files)
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// All files, sorted by path.
    pub fn files(&self) -> &[FileInfo] {
        &self.files
    }

    /// `(info, text)` pairs in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&FileInfo, &str)> {
        self.files
            .iter()
            .zip(self.contents.iter().map(String::as_str))
    }

    /// Text of the file at `path`.
    pub fn content(&self, path: &str) -> Option<&str> {
        self.path_to_index
            .get(path)
            .map(|&idx| self.contents[idx].as_str())
    }

    pub fn skipped(&self) -> &[SkippedFile] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Write effective changes to disk.
    ///
    /// Every target is checked against its planned-against hash before any
    /// file is written, so a stale file aborts the whole write. Returns the
    /// paths written, in order.
    pub fn write_changes(&self, changes: &[FileChange]) -> Result<Vec<String>, WorkspaceError> {
        let effective: Vec<&FileChange> = changes.iter().filter(|c| c.is_effective()).collect();

        for change in &effective {
            let full_path = self.workspace_root.join(&change.path);
            let current = fs::read(&full_path).map_err(|source| WorkspaceError::Io {
                path: change.path.clone(),
                source,
            })?;
            change.verify_precondition(&current)?;
        }

        let mut written = Vec::with_capacity(effective.len());
        for change in effective {
            let full_path = self.workspace_root.join(&change.path);
            fs::write(&full_path, &change.after).map_err(|source| WorkspaceError::Io {
                path: change.path.clone(),
                source,
            })?;
            tracing::info!(path = %change.path, delta = change.byte_delta(), "wrote file");
            written.push(change.path.clone());
        }
        Ok(written)
    }
}

// ============================================================================
// Tests
// ============================================================================

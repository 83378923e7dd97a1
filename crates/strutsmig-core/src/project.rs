//! Project: every loaded document of one migration run.
//!
//! Documents are held in path order next to the exact text they were loaded
//! from. Edits never mutate a project; they produce replacement documents
//! that are compared against the original text.

use std::path::PathBuf;

use crate::document::{Document, DocumentKind, ParseError};
use crate::workspace::{SkippedFile, WorkspaceSnapshot};

/// A document that failed to parse as a tree and was kept as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadIssue {
    pub path: String,
    pub kind: DocumentKind,
    pub error: ParseError,
}

/// One loaded document and the text it came from.
#[derive(Debug, Clone)]
pub struct ProjectDocument {
    pub document: Document,
    pub original: String,
}

/// Loaded documents of a workspace, sorted by path.
#[derive(Debug, Clone, Default)]
pub struct Project {
    root: PathBuf,
    documents: Vec<ProjectDocument>,
    issues: Vec<LoadIssue>,
    skipped: Vec<SkippedFile>,
}

impl Project {
    /// Load every file of a snapshot.
    pub fn from_snapshot(snapshot: &WorkspaceSnapshot) -> Self {
        let mut project = Self::from_texts(
            snapshot.workspace_root().to_path_buf(),
            snapshot.iter().map(|(info, text)| (info.path.as_str(), text)),
        );
        project.skipped = snapshot.skipped().to_vec();
        project
    }

    /// Load in-memory `(path, text)` pairs.
    pub fn from_texts<P, T>(root: PathBuf, texts: impl IntoIterator<Item = (P, T)>) -> Self
    where
        P: AsRef<str>,
        T: AsRef<str>,
    {
        let mut documents = Vec::new();
        let mut issues = Vec::new();
        for (path, text) in texts {
            let (path, text) = (path.as_ref(), text.as_ref());
            let (document, error) = Document::load(path, text);
            if let Some(error) = error {
                match document.kind {
                    DocumentKind::Config => {
                        tracing::warn!(path, %error, "configuration document does not parse; leaving it untouched")
                    }
                    _ => tracing::debug!(path, %error, "document kept as text"),
                }
                issues.push(LoadIssue {
                    path: path.to_string(),
                    kind: document.kind,
                    error,
                });
            }
            documents.push(ProjectDocument {
                document,
                original: text.to_string(),
            });
        }
        documents.sort_by(|a, b| a.document.path.cmp(&b.document.path));
        issues.sort_by(|a, b| a.path.cmp(&b.path));
        Project {
            root,
            documents,
            issues,
            skipped: Vec::new(),
        }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    pub fn documents(&self) -> &[ProjectDocument] {
        &self.documents
    }

    /// Documents alone, in path order.
    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.documents.iter().map(|d| &d.document)
    }

    pub fn get(&self, path: &str) -> Option<&ProjectDocument> {
        self.documents
            .binary_search_by(|d| d.document.path.as_str().cmp(path))
            .ok()
            .map(|idx| &self.documents[idx])
    }

    /// Documents that did not parse.
    pub fn issues(&self) -> &[LoadIssue] {
        &self.issues
    }

    /// Files found in the workspace but not loaded.
    pub fn skipped(&self) -> &[SkippedFile] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

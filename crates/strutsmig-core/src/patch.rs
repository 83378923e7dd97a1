//! Patch IR: spans, text edits, and hash-guarded file changes.
//!
//! The edit pass produces whole-document replacements. This module holds the
//! pieces that get those replacements safely onto disk and into reports:
//! - `ContentHash` for detecting files that changed since they were read
//! - `TextEdit` insertions applied end-to-start
//! - `FileChange` pairing a project path with before/after text

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// Hash type for content verification (SHA-256, stored as hex string for JSON compatibility).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
    /// Compute SHA-256 hash of the given bytes, returning hex-encoded string.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let result = hasher.finalize();
        ContentHash(hex::encode(result))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Core Types
// ============================================================================

/// Byte offsets into document text.
///
/// Spans are half-open intervals: `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl Span {
    /// Create a new span. A reversed range collapses to an empty span at `start`.
    pub fn new(start: usize, end: usize) -> Self {
        Span {
            start,
            end: end.max(start),
        }
    }
}

// ============================================================================
// Edit Operations
// ============================================================================

/// Text inserted at a byte offset of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    pub offset: usize,
    pub text: String,
}

impl TextEdit {
    /// Insert `text` at `offset`.
    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        TextEdit {
            offset,
            text: text.into(),
        }
    }
}

/// Errors raised while applying edits or writing changes.
#[derive(Debug, Error)]
pub enum PatchError {
    /// An edit falls outside the document or splits a character.
    #[error("edit offset {offset} is out of bounds for a document of {len} bytes")]
    OffsetOutOfBounds { offset: usize, len: usize },

    /// The file on disk no longer matches the text the change was planned against.
    #[error("{path} changed on disk since it was read")]
    StaleFile { path: String },
}

/// Apply insertions to `text`, returning the new text.
///
/// Edits are sorted by offset (stable, so inserts at the same offset keep
/// their relative order) and applied end-to-start so earlier offsets stay
/// valid. Fails without partial application when an offset is out of bounds.
pub fn apply_edits(text: &str, edits: &[TextEdit]) -> Result<String, PatchError> {
    let mut ordered: Vec<&TextEdit> = edits.iter().collect();
    ordered.sort_by_key(|e| e.offset);

    if let Some(bad) = ordered.iter().find(|e| !text.is_char_boundary(e.offset)) {
        return Err(PatchError::OffsetOutOfBounds {
            offset: bad.offset,
            len: text.len(),
        });
    }

    let mut result = text.to_string();
    for edit in ordered.iter().rev() {
        result.insert_str(edit.offset, &edit.text);
    }
    Ok(result)
}

// ============================================================================
// File Changes
// ============================================================================

/// A planned whole-file change, guarded by the hash of the text it was planned against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    /// Project-relative path.
    pub path: String,
    /// Hash of the text the edit pass read.
    pub before_hash: ContentHash,
    /// Text the edit pass read.
    pub before: String,
    /// Text the edit pass produced.
    pub after: String,
}

impl FileChange {
    /// Create a change from before/after text.
    pub fn new(path: impl Into<String>, before: impl Into<String>, after: impl Into<String>) -> Self {
        let before = before.into();
        FileChange {
            path: path.into(),
            before_hash: ContentHash::compute(before.as_bytes()),
            before,
            after: after.into(),
        }
    }

    /// Whether the change actually alters the file.
    pub fn is_effective(&self) -> bool {
        self.before != self.after
    }

    /// Bytes added and removed, as a coarse size delta.
    pub fn byte_delta(&self) -> i64 {
        self.after.len() as i64 - self.before.len() as i64
    }

    /// Check that `current` is still the text this change was planned against.
    pub fn verify_precondition(&self, current: &[u8]) -> Result<(), PatchError> {
        if ContentHash::compute(current) == self.before_hash {
            Ok(())
        } else {
            Err(PatchError::StaleFile {
                path: self.path.clone(),
            })
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Core infrastructure for strutsmig.
//!
//! This crate provides the migration engine:
//! - Lossless document model with structural path queries
//! - Call-site scanner and cross-reference facts (scan pass)
//! - Wrapper synthesis, expression rewriting, action splitting and date
//!   pattern translation (edit pass)
//! - Two-phase pipeline and read-only searches
//! - Error types and error codes
//! - JSON output types for CLI responses
//! - Configuration, workspace snapshots, text edits and diff generation

pub mod config;
pub mod date_format;
pub mod diff;
pub mod document;
pub mod error;
pub mod facts;
pub mod naming;
pub mod output;
pub mod patch;
pub mod pipeline;
pub mod project;
pub mod rewriter;
pub mod scanner;
pub mod search;
pub mod source;
pub mod splitter;
pub mod synthesizer;
pub mod text;
pub mod types;
pub mod workspace;

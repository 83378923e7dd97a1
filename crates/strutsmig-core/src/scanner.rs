//! Lexical scanner for static method-access expressions.
//!
//! Recognizes `@owner.Type@member(args)` anywhere in a string:
//!
//! - the owner is a dotted identifier: one or more segments joined by `.`,
//!   each a letter or underscore followed by letters, digits or underscores
//! - the member is a bare identifier
//! - optional whitespace, then `(`, then everything up to the **first** `)`
//!
//! Arguments are opaque text and are not parenthesis-balanced:
//! `@a.B@m(f(x))` captures `f(x` as the arguments. Static field access
//! (`@a.B@FIELD`, no parenthesis) never matches.
//!
//! The scanner holds no state; every call is independent and the returned
//! iterator is lazy.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

/// Full call expression: owner, member, arguments.
static CALL_SITE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)*)@([a-zA-Z_][a-zA-Z0-9_]*)\s*\(([^)]*)\)")
        .expect("call-site pattern is valid")
});

/// Call head only (`@owner@member(`), for searches that tolerate a missing `)`.
static CALL_HEAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)*)@([a-zA-Z_][a-zA-Z0-9_]*)\s*\(")
        .expect("call-head pattern is valid")
});

/// One matched expression, borrowing from the scanned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSiteMatch<'t> {
    /// Fully qualified owner type as written.
    pub owner_type: &'t str,
    pub member_name: &'t str,
    /// Raw argument text between the parentheses.
    pub arguments: &'t str,
    /// The whole matched expression.
    pub expression: &'t str,
    /// Byte offset of `expression` in the scanned text.
    pub start: usize,
}

impl CallSiteMatch<'_> {
    /// Byte range of the expression in the scanned text.
    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.expression.len()
    }
}

/// Lazily scan `text` for call expressions, left to right, non-overlapping.
pub fn scan(text: &str) -> impl Iterator<Item = CallSiteMatch<'_>> + '_ {
    CALL_SITE.captures_iter(text).filter_map(|caps| {
        let whole = caps.get(0)?;
        Some(CallSiteMatch {
            owner_type: caps.get(1)?.as_str(),
            member_name: caps.get(2)?.as_str(),
            arguments: caps.get(3)?.as_str(),
            expression: whole.as_str(),
            start: whole.start(),
        })
    })
}

/// Lazily scan `text` for call heads, yielding `(owner_type, member_name)`.
///
/// Unlike [`scan`], a head matches even if its `)` is missing.
pub fn scan_heads(text: &str) -> impl Iterator<Item = (&str, &str)> + '_ {
    CALL_HEAD
        .captures_iter(text)
        .filter_map(|caps| Some((caps.get(1)?.as_str(), caps.get(2)?.as_str())))
}

/// Replace every call expression with `replacement(match)`.
///
/// Returns `None` when `text` holds no call expression; unmatched text is
/// carried over unchanged.
pub fn replace_call_sites<F>(text: &str, mut replacement: F) -> Option<String>
where
    F: FnMut(&CallSiteMatch<'_>) -> String,
{
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut any = false;
    for found in scan(text) {
        any = true;
        out.push_str(&text[last..found.start]);
        out.push_str(&replacement(&found));
        last = found.range().end;
    }
    if !any {
        return None;
    }
    out.push_str(&text[last..]);
    Some(out)
}

// ============================================================================
// Tests
// ============================================================================

//! Date pattern translation for `<s:date>` tags.
//!
//! The date tag moved from `SimpleDateFormat` to `DateTimeFormatter`, which
//! reads two pattern letters differently:
//!
//! - `u` was the day number of the week; it becomes `e` (localized
//!   day-of-week).
//! - `Y` is the week-based year in both, but is mostly used by mistake for
//!   the calendar year. A run of `Y` becomes `y` unless a week-of-year letter
//!   (`w` or `W`) appears anywhere in the rest of the pattern.
//!
//! Text between single quotes is literal and never translated.
//!
//! [`migrate_date_tags`] finds `format` attributes of `<s:date>` (JSP) and
//! `<@s.date>` (FreeMarker) tags in raw template text and translates them in
//! place. Only `.jsp` and `.ftl` documents are considered.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;

use crate::document::{Document, DocumentKind};

/// Translate one `SimpleDateFormat` pattern to `DateTimeFormatter` syntax.
///
/// ```
/// use strutsmig_core::date_format::translate;
///
/// assert_eq!(translate("YYYY-MM-dd"), "yyyy-MM-dd");
/// assert_eq!(translate("YYYY-'W'ww"), "YYYY-'W'ww");
/// assert_eq!(translate("EEEE, u"), "EEEE, e");
/// ```
pub fn translate(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut in_quote = false;
    let mut rest = pattern;

    while let Some(c) = rest.chars().next() {
        if c == '\'' {
            in_quote = !in_quote;
            out.push(c);
            rest = &rest[1..];
            continue;
        }
        if in_quote {
            out.push(c);
            rest = &rest[c.len_utf8()..];
            continue;
        }
        match c {
            'u' => {
                out.push('e');
                rest = &rest[1..];
            }
            'Y' => {
                let run = rest.len() - rest.trim_start_matches('Y').len();
                // The whole remainder counts, including the run itself.
                let week_based = rest.contains(['w', 'W']);
                if week_based {
                    out.push_str(&rest[..run]);
                } else {
                    out.push_str(&"y".repeat(run));
                }
                rest = &rest[run..];
            }
            _ => {
                out.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }
    out
}

// ============================================================================
// Template Front-end
// ============================================================================

static DOUBLE_QUOTED_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(<(?:s:date|@s\.date)\b[^>]*\bformat\s*=\s*)(")((?:[^"]|\\")*)(")"#)
        .expect("double-quoted date tag pattern is valid")
});

static SINGLE_QUOTED_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(<(?:s:date|@s\.date)\b[^>]*\bformat\s*=\s*)(')((?:[^']|\\')*)(')")
        .expect("single-quoted date tag pattern is valid")
});

/// One translated `format` attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateFormatChange {
    pub before: String,
    pub after: String,
}

/// Whether date tags in a document at `path` are migrated.
pub fn applies_to(path: &str) -> bool {
    path.ends_with(".jsp") || path.ends_with(".ftl")
}

/// Translate every date tag `format` value in `text`.
///
/// Double-quoted values are handled first, then single-quoted ones. Returns
/// `None` when no value changed.
pub fn migrate_date_tags(text: &str) -> Option<(String, Vec<DateFormatChange>)> {
    let mut changes = Vec::new();
    let mut content = text.to_string();
    for pattern in [&*DOUBLE_QUOTED_FORMAT, &*SINGLE_QUOTED_FORMAT] {
        let replaced = pattern.replace_all(&content, |caps: &Captures<'_>| {
            let format = &caps[3];
            let translated = translate(format);
            if translated == format {
                return caps[0].to_string();
            }
            changes.push(DateFormatChange {
                before: format.to_string(),
                after: translated.clone(),
            });
            format!("{}{}{}{}", &caps[1], &caps[2], translated, &caps[4])
        });
        content = replaced.into_owned();
    }
    if changes.is_empty() {
        None
    } else {
        Some((content, changes))
    }
}

/// Translate date tags of a markup document, reparsing the result.
pub fn migrate_document(document: &Document) -> Option<(Document, Vec<DateFormatChange>)> {
    if document.kind != DocumentKind::Markup || !applies_to(&document.path) {
        return None;
    }
    let (text, changes) = migrate_date_tags(&document.render())?;
    let (migrated, error) = Document::load(document.path.clone(), text);
    if let Some(error) = error {
        tracing::debug!(path = %document.path, %error, "date migration left document as text");
    }
    Some((migrated, changes))
}

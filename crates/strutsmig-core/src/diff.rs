//! Unified diff generation utilities.
//!
//! Produces standard unified diff text (`--- a/path` / `+++ b/path`) for the
//! file changes of a migration run, one file after another in path order.

use similar::TextDiff;

use crate::patch::FileChange;

/// Lines of context around each hunk.
const CONTEXT_RADIUS: usize = 3;

/// Unified diff of one file change, or an empty string if nothing changed.
pub fn file_diff(change: &FileChange) -> String {
    if !change.is_effective() {
        return String::new();
    }
    let mut diff = TextDiff::from_lines(&change.before, &change.after)
        .unified_diff()
        .context_radius(CONTEXT_RADIUS)
        .header(&format!("a/{}", change.path), &format!("b/{}", change.path))
        .to_string();
    if !diff.ends_with('\n') {
        diff.push('\n');
    }
    diff
}

/// Generate a unified diff over every effective change.
pub fn generate_unified_diff(changes: &[FileChange]) -> String {
    let mut sorted: Vec<&FileChange> = changes.iter().filter(|c| c.is_effective()).collect();
    sorted.sort_by(|a, b| a.path.cmp(&b.path));
    sorted.into_iter().map(file_diff).collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_change() {
        let change = FileChange::new(
            "web/a.jsp",
            "<p>\n%{@com.app.Util@run()}\n</p>\n",
            "<p>\n%{utilRun}\n</p>\n",
        );
        let diff = file_diff(&change);
        assert!(diff.starts_with("--- a/web/a.jsp\n+++ b/web/a.jsp\n"));
        assert!(diff.contains("-%{@com.app.Util@run()}\n"));
        assert!(diff.contains("+%{utilRun}\n"));
        assert!(diff.contains(" <p>\n"));
    }

    #[test]
    fn no_op_changes_produce_nothing() {
        let change = FileChange::new("a.xml", "<a/>", "<a/>");
        assert_eq!(file_diff(&change), "");
        assert_eq!(generate_unified_diff(&[change]), "");
    }

    #[test]
    fn files_in_path_order() {
        let changes = vec![
            FileChange::new("b.jsp", "x\n", "y\n"),
            FileChange::new("a.jsp", "x\n", "z\n"),
        ];
        let diff = generate_unified_diff(&changes);
        let a = diff.find("--- a/a.jsp").unwrap();
        let b = diff.find("--- a/b.jsp").unwrap();
        assert!(a < b);
    }

    #[test]
    fn missing_trailing_newline_is_terminated() {
        let diff = file_diff(&FileChange::new("a.xml", "<a/>", "<b/>"));
        assert!(diff.ends_with('\n'));
    }
}

//! Text positions and line layout.
//!
//! ## Coordinate Conventions
//!
//! - Lines and columns are **1-indexed** (matching editor conventions)
//! - Byte offsets are **0-indexed**
//! - Columns count Unicode scalar values, not bytes
//!
//! The layout helpers (`line_start`, `line_indent`, ...) are what the source
//! synthesizer uses to place generated members with matching indentation.

// ============================================================================
// Position Conversions
// ============================================================================

/// Convert a byte offset to 1-indexed line and column (Unicode-aware).
///
/// Offsets beyond the content clamp to the end of the content.
pub fn byte_offset_to_position_str(content: &str, offset: usize) -> (u32, u32) {
    let mut line = 1u32;
    let mut col = 1u32;
    let mut current_offset = 0usize;

    for ch in content.chars() {
        if current_offset >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
        current_offset += ch.len_utf8();
    }

    (line, col)
}

// ============================================================================
// Line Layout
// ============================================================================

/// Byte offset of the start of the line containing `offset`.
pub fn line_start(content: &str, offset: usize) -> usize {
    let offset = offset.min(content.len());
    content[..offset].rfind('\n').map_or(0, |p| p + 1)
}

/// Byte offset just past the end of the line containing `offset`.
///
/// Includes the terminating newline when there is one.
pub fn line_end(content: &str, offset: usize) -> usize {
    let offset = offset.min(content.len());
    content[offset..]
        .find('\n')
        .map_or(content.len(), |p| offset + p + 1)
}

/// Leading whitespace of the line containing `offset`.
pub fn line_indent(content: &str, offset: usize) -> &str {
    let start = line_start(content, offset);
    let rest = &content[start..];
    let width = rest.len() - rest.trim_start_matches([' ', '\t']).len();
    &rest[..width]
}

/// Whether everything between the line start and `offset` is whitespace.
pub fn is_line_leading(content: &str, offset: usize) -> bool {
    let offset = offset.min(content.len());
    content[line_start(content, offset)..offset]
        .chars()
        .all(|c| c == ' ' || c == '\t')
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod position_tests {
        use super::*;

        #[test]
        fn offset_to_position_simple() {
            let content = "class A {\n    int x;\n}\n";
            assert_eq!(byte_offset_to_position_str(content, 0), (1, 1));
            assert_eq!(byte_offset_to_position_str(content, 6), (1, 7));
            assert_eq!(byte_offset_to_position_str(content, 10), (2, 1));
        }

        #[test]
        fn multibyte_columns_count_chars() {
            let content = "é<b/>";
            assert_eq!(byte_offset_to_position_str(content, 2), (1, 2));
        }

        #[test]
        fn empty_content() {
            assert_eq!(byte_offset_to_position_str("", 0), (1, 1));
            assert_eq!(byte_offset_to_position_str("", 5), (1, 1));
        }
    }

    mod layout_tests {
        use super::*;

        #[test]
        fn line_bounds() {
            let content = "a\n  bc\nd";
            let offset = content.find("bc").unwrap();
            assert_eq!(line_start(content, offset), 2);
            assert_eq!(line_end(content, offset), 7);
            assert_eq!(line_end(content, content.len()), content.len());
        }

        #[test]
        fn indent_of_line() {
            let content = "class A {\n\t  int x;\n}";
            let offset = content.find("int").unwrap();
            assert_eq!(line_indent(content, offset), "\t  ");
            assert_eq!(line_indent(content, 0), "");
        }

        #[test]
        fn leading_position() {
            let content = "class A {\n    }\n";
            let brace = content.rfind('}').unwrap();
            assert!(is_line_leading(content, brace));
            assert!(!is_line_leading(content, content.find('{').unwrap()));
        }
    }
}

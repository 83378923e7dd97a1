//! Structural model of Java source files.
//!
//! This is not a Java parser. A small lexer splits the text into identifiers,
//! punctuation and opaque literals (comments, strings, text blocks and
//! character literals are skipped, so braces inside them never count), and a
//! single pass over the tokens recovers what the synthesizer needs:
//!
//! - the `package` declaration and where it ends
//! - every `import` statement and its byte span
//! - every class, interface, enum and record declaration, with its binary
//!   qualified name (`com.app.Outer$Inner`) and brace offsets
//! - the names of members declared directly in each type body
//!
//! Types declared inside method bodies (local and anonymous classes) are not
//! reported.

use indexmap::IndexSet;
use thiserror::Error;

use crate::patch::Span;
use crate::text::byte_offset_to_position_str;

/// Source text the model could not be built from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("unterminated {what} starting at line {line}")]
    Unterminated { what: &'static str, line: u32 },

    #[error("unbalanced '}}' at line {line}")]
    UnexpectedClose { line: u32 },

    #[error("{open} unclosed brace(s) at end of file")]
    UnclosedBraces { open: usize },
}

// ============================================================================
// Model
// ============================================================================

/// An `import` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDecl {
    /// Imported name without `static` or trailing `.*`.
    pub path: String,
    pub is_static: bool,
    /// `import a.b.*;`
    pub wildcard: bool,
    /// From `import` through `;`.
    pub span: Span,
}

impl ImportDecl {
    /// Whether this import makes `qualified` visible by its simple name.
    pub fn covers(&self, qualified: &str) -> bool {
        if self.is_static {
            return false;
        }
        if self.wildcard {
            return crate::naming::package_of(qualified) == self.path;
        }
        self.path == qualified
    }
}

/// A class, interface, enum or record declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub name: String,
    /// Binary name: package-qualified, `$` between nested types.
    pub qualified_name: String,
    /// Offset of the body's `{`.
    pub open_brace: usize,
    /// Offset of the body's `}`.
    pub close_brace: usize,
    /// Names of members (methods, constructors) declared directly in the body.
    pub members: IndexSet<String>,
}

impl TypeDecl {
    /// Whether a member named `name` is declared directly in the body.
    pub fn declares(&self, name: &str) -> bool {
        self.members.contains(name)
    }
}

/// What the synthesizer knows about one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceModel {
    pub package: Option<String>,
    /// Offset just past the package statement's `;`.
    pub package_end: Option<usize>,
    pub imports: Vec<ImportDecl>,
    /// In order of their opening brace.
    pub types: Vec<TypeDecl>,
}

impl SourceModel {
    /// Simple names of every type declared in the file.
    pub fn declared_simple_names(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(|t| t.name.as_str())
    }

    /// Offset just past the last import's `;`.
    pub fn imports_end(&self) -> Option<usize> {
        self.imports.last().map(|i| i.span.end)
    }
}

// ============================================================================
// Lexer
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Ident,
    Punct(char),
    Literal,
}

#[derive(Debug, Clone, Copy)]
struct Token<'s> {
    kind: TokenKind,
    text: &'s str,
    start: usize,
}

impl Token<'_> {
    fn is_ident(&self, word: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == word
    }

    fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::Punct(c)
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn tokenize(text: &str) -> Result<Vec<Token<'_>>, SourceError> {
    let line_at = |offset: usize| byte_offset_to_position_str(text, offset).0;
    let mut tokens = Vec::new();
    let mut pos = 0;

    while let Some(c) = text[pos..].chars().next() {
        let rest = &text[pos..];
        if c.is_whitespace() {
            pos += c.len_utf8();
        } else if rest.starts_with("//") {
            pos += rest.find('\n').unwrap_or(rest.len());
        } else if rest.starts_with("/*") {
            let end = rest[2..].find("*/").ok_or(SourceError::Unterminated {
                what: "comment",
                line: line_at(pos),
            })?;
            pos += end + 4;
        } else if rest.starts_with("\"\"\"") {
            let end = rest[3..].find("\"\"\"").ok_or(SourceError::Unterminated {
                what: "text block",
                line: line_at(pos),
            })?;
            tokens.push(Token {
                kind: TokenKind::Literal,
                text: &rest[..end + 6],
                start: pos,
            });
            pos += end + 6;
        } else if c == '"' || c == '\'' {
            let len = quoted_len(rest, c).ok_or(SourceError::Unterminated {
                what: if c == '"' { "string" } else { "character literal" },
                line: line_at(pos),
            })?;
            tokens.push(Token {
                kind: TokenKind::Literal,
                text: &rest[..len],
                start: pos,
            });
            pos += len;
        } else if is_ident_start(c) {
            let len = rest.find(|ch: char| !is_ident_char(ch)).unwrap_or(rest.len());
            tokens.push(Token {
                kind: TokenKind::Ident,
                text: &rest[..len],
                start: pos,
            });
            pos += len;
        } else if c.is_ascii_digit() {
            let len = rest
                .find(|ch: char| !(ch.is_alphanumeric() || ch == '_' || ch == '.'))
                .unwrap_or(rest.len());
            tokens.push(Token {
                kind: TokenKind::Literal,
                text: &rest[..len],
                start: pos,
            });
            pos += len;
        } else {
            tokens.push(Token {
                kind: TokenKind::Punct(c),
                text: &rest[..c.len_utf8()],
                start: pos,
            });
            pos += c.len_utf8();
        }
    }
    Ok(tokens)
}

/// Length of a quoted literal starting at `rest[0] == quote`, escapes honored.
/// Literals may not span lines.
fn quoted_len(rest: &str, quote: char) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in rest.char_indices().skip(1) {
        match c {
            '\n' => return None,
            '\\' if !escaped => escaped = true,
            c if c == quote && !escaped => return Some(i + 1),
            _ => escaped = false,
        }
    }
    None
}

// ============================================================================
// Declaration Scan
// ============================================================================

enum Frame {
    /// Body of `types[index]`.
    Type(usize),
    /// Any other brace pair: method bodies, initializers, array literals.
    Block,
}

/// Build the structural model of `text`.
pub fn parse_source(text: &str) -> Result<SourceModel, SourceError> {
    let tokens = tokenize(text)?;
    let line_at = |offset: usize| byte_offset_to_position_str(text, offset).0;

    let mut model = SourceModel::default();
    let mut frames: Vec<Frame> = Vec::new();
    let mut pending_type: Option<String> = None;
    // Member-declaration state for the innermost type body.
    let mut member_named = false;
    let mut member_assigns = false;
    let mut paren_depth = 0usize;

    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i];
        let prev = i.checked_sub(1).map(|p| tokens[p]);
        let next = tokens.get(i + 1).copied();
        let in_type_body = matches!(frames.last(), Some(Frame::Type(_)));

        if frames.is_empty() && token.is_ident("package") && model.package.is_none() {
            let (name, end) = dotted_until_semicolon(&tokens, i + 1);
            model.package = Some(name);
            model.package_end = end;
            i = end_index(&tokens, i + 1);
            continue;
        }
        if frames.is_empty() && token.is_ident("import") {
            let is_static = next.is_some_and(|t| t.is_ident("static"));
            let path_start = if is_static { i + 2 } else { i + 1 };
            let (mut path, end) = dotted_until_semicolon(&tokens, path_start);
            let wildcard = path.ends_with(".*");
            if wildcard {
                path.truncate(path.len() - 2);
            }
            model.imports.push(ImportDecl {
                path,
                is_static,
                wildcard,
                span: Span::new(token.start, end.unwrap_or(text.len())),
            });
            i = end_index(&tokens, path_start);
            continue;
        }

        match token.kind {
            TokenKind::Ident => {
                if starts_type_declaration(&tokens, i) {
                    if let Some(name) = next {
                        pending_type = Some(name.text.to_string());
                    }
                } else if in_type_body
                    && paren_depth == 0
                    && !member_named
                    && !member_assigns
                    && next.is_some_and(|t| t.is_punct('('))
                    && !prev.is_some_and(|p| p.is_punct('@') || p.is_punct('.') || p.is_ident("new"))
                {
                    if let Some(Frame::Type(index)) = frames.last() {
                        model.types[*index].members.insert(token.text.to_string());
                    }
                    member_named = true;
                }
            }
            TokenKind::Punct('{') => {
                let frame = match pending_type.take() {
                    Some(name) if frames.iter().all(|f| matches!(f, Frame::Type(_))) => {
                        let qualified_name = match frames.last() {
                            Some(Frame::Type(outer)) => {
                                format!("{}${}", model.types[*outer].qualified_name, name)
                            }
                            _ => match &model.package {
                                Some(package) => format!("{package}.{name}"),
                                None => name.clone(),
                            },
                        };
                        model.types.push(TypeDecl {
                            name,
                            qualified_name,
                            open_brace: token.start,
                            close_brace: token.start,
                            members: IndexSet::new(),
                        });
                        Frame::Type(model.types.len() - 1)
                    }
                    _ => Frame::Block,
                };
                frames.push(frame);
                member_named = false;
                member_assigns = false;
                paren_depth = 0;
            }
            TokenKind::Punct('}') => {
                match frames.pop() {
                    Some(Frame::Type(index)) => model.types[index].close_brace = token.start,
                    Some(Frame::Block) => {}
                    None => {
                        return Err(SourceError::UnexpectedClose {
                            line: line_at(token.start),
                        })
                    }
                }
                member_named = false;
                member_assigns = false;
                paren_depth = 0;
            }
            TokenKind::Punct(';') => {
                member_named = false;
                member_assigns = false;
                paren_depth = 0;
            }
            TokenKind::Punct('(') if in_type_body => paren_depth += 1,
            TokenKind::Punct(')') if in_type_body => paren_depth = paren_depth.saturating_sub(1),
            TokenKind::Punct('=') if in_type_body && paren_depth == 0 => member_assigns = true,
            _ => {}
        }
        i += 1;
    }

    if !frames.is_empty() {
        return Err(SourceError::UnclosedBraces { open: frames.len() });
    }
    Ok(model)
}

/// `class Name`, `interface Name`, `enum Name`, or `record Name(`/`record Name<`.
fn starts_type_declaration(tokens: &[Token<'_>], i: usize) -> bool {
    let token = tokens[i];
    let Some(name) = tokens.get(i + 1) else {
        return false;
    };
    if name.kind != TokenKind::Ident {
        return false;
    }
    // `Foo.class` literals
    if i > 0 && tokens[i - 1].is_punct('.') {
        return false;
    }
    match token.text {
        "class" | "interface" | "enum" => true,
        "record" => tokens
            .get(i + 2)
            .is_some_and(|t| t.is_punct('(') || t.is_punct('<')),
        _ => false,
    }
}

/// Join identifiers, dots and `*` from `start` up to the next `;`.
/// Returns the joined name and the offset just past the `;`.
fn dotted_until_semicolon(tokens: &[Token<'_>], start: usize) -> (String, Option<usize>) {
    let mut name = String::new();
    for token in &tokens[start.min(tokens.len())..] {
        if token.is_punct(';') {
            return (name, Some(token.start + 1));
        }
        name.push_str(token.text);
    }
    (name, None)
}

/// Index of the token after the next `;` from `start`.
fn end_index(tokens: &[Token<'_>], start: usize) -> usize {
    tokens[start.min(tokens.len())..]
        .iter()
        .position(|t| t.is_punct(';'))
        .map_or(tokens.len(), |p| start + p + 1)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const ACTION: &str = r#"package com.example;

import java.util.List;
import static java.util.Objects.requireNonNull;
import com.app.*;

/** Shows the dashboard. { not a brace } */
public class DashboardAction extends ActionSupport {
    private String name = "}{";
    private char brace = '}';

    @Override
    public String execute() {
        Runnable r = new Runnable() {
            public void run() {}
        };
        Class<?> c = String.class;
        return SUCCESS;
    }

    public String getName() { return name; }

    static class Helper {
        int helper() { return 1; }
    }
}
"#;

    mod tokenize_tests {
        use super::*;

        #[test]
        fn skips_comments_and_literals() {
            let tokens = tokenize("a /* } */ \"{\" 'x' // }\n b").unwrap();
            let idents: Vec<_> = tokens
                .iter()
                .filter(|t| t.kind == TokenKind::Ident)
                .map(|t| t.text)
                .collect();
            assert_eq!(idents, vec!["a", "b"]);
            assert!(!tokens.iter().any(|t| t.is_punct('}')));
        }

        #[test]
        fn escaped_quotes() {
            let tokens = tokenize(r#"s = "a\"}" ;"#).unwrap();
            assert_eq!(tokens[2].kind, TokenKind::Literal);
            assert!(tokens[3].is_punct(';'));
        }

        #[test]
        fn text_block() {
            let tokens = tokenize("x = \"\"\"\n  {\n  \"\"\";").unwrap();
            assert!(!tokens.iter().any(|t| t.is_punct('{')));
        }

        #[test]
        fn unterminated_comment() {
            assert!(matches!(
                tokenize("a /* b"),
                Err(SourceError::Unterminated { what: "comment", .. })
            ));
        }
    }

    mod model_tests {
        use super::*;

        #[test]
        fn package_and_imports() {
            let model = parse_source(ACTION).unwrap();
            assert_eq!(model.package.as_deref(), Some("com.example"));
            assert_eq!(model.package_end, Some(ACTION.find(';').unwrap() + 1));
            assert_eq!(model.imports.len(), 3);
            assert_eq!(model.imports[0].path, "java.util.List");
            assert!(model.imports[1].is_static);
            assert!(model.imports[2].wildcard);
            assert_eq!(model.imports[2].path, "com.app");
            let end = model.imports_end().unwrap();
            assert_eq!(&ACTION[end - 17..end], "import com.app.*;");
        }

        #[test]
        fn import_coverage() {
            let model = parse_source(ACTION).unwrap();
            assert!(model.imports[0].covers("java.util.List"));
            assert!(model.imports[2].covers("com.app.Util"));
            assert!(!model.imports[2].covers("com.app.sub.Util"));
            assert!(!model.imports[1].covers("java.util.Objects"));
        }

        #[test]
        fn types_and_members() {
            let model = parse_source(ACTION).unwrap();
            let names: Vec<_> = model.types.iter().map(|t| t.qualified_name.as_str()).collect();
            assert_eq!(
                names,
                vec!["com.example.DashboardAction", "com.example.DashboardAction$Helper"]
            );
            let action = &model.types[0];
            let members: Vec<_> = action.members.iter().map(String::as_str).collect();
            assert_eq!(members, vec!["execute", "getName"]);
            assert_eq!(&ACTION[action.close_brace..], "}\n");
            assert!(model.types[1].declares("helper"));
        }

        #[test]
        fn annotated_members_and_fields_with_initializers() {
            let text = r#"class A {
    @Size(min = 1) public Object getX() { return x; }
    private int y = compute(3);
    @javax.annotation.Generated("x") String z() { return ""; }
}"#;
            let model = parse_source(text).unwrap();
            let members: Vec<_> = model.types[0].members.iter().map(String::as_str).collect();
            assert_eq!(members, vec!["getX", "z"]);
        }

        #[test]
        fn records_enums_and_interfaces() {
            let text = r#"package p;
interface I { void run(); }
enum E { A("a"), B("b"); E(String s) {} String label() { return ""; } }
record R(int x) { int twice() { return x * 2; } }
"#;
            let model = parse_source(text).unwrap();
            let names: Vec<_> = model.types.iter().map(|t| t.qualified_name.as_str()).collect();
            assert_eq!(names, vec!["p.I", "p.E", "p.R"]);
            assert!(model.types[0].declares("run"));
            assert!(model.types[1].declares("label"));
            assert!(model.types[2].declares("twice"));
        }

        #[test]
        fn default_package() {
            let model = parse_source("class A {}").unwrap();
            assert_eq!(model.types[0].qualified_name, "A");
            assert!(model.package.is_none());
        }

        #[test]
        fn unbalanced_braces() {
            assert!(matches!(
                parse_source("class A {"),
                Err(SourceError::UnclosedBraces { open: 1 })
            ));
            assert!(matches!(
                parse_source("class A {}\n}"),
                Err(SourceError::UnexpectedClose { line: 2 })
            ));
        }
    }
}

//! Lossless parser for configuration and markup documents.
//!
//! The grammar is deliberately forgiving about content (a `<` that does not
//! start a recognizable construct is just text) and strict about structure
//! (every opened node must be closed by a marker with the same name). Markup
//! that cannot satisfy the structural rules is reported with a [`ParseError`]
//! and the caller keeps the document as text.

use std::sync::Arc;

use thiserror::Error;
use winnow::ascii::{multispace0, multispace1};
use winnow::combinator::{alt, delimited, opt, repeat};
use winnow::prelude::*;
use winnow::token::{any, one_of, take_till, take_until, take_while};
use winnow::ModalResult;

use super::{Attribute, Content, Node, Quote, Tree};
use crate::text::byte_offset_to_position_str;

/// Why a document could not be parsed into a tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at line {line}, column {col}")]
pub struct ParseError {
    pub message: String,
    /// Byte offset of the offending construct.
    pub offset: usize,
    pub line: u32,
    pub col: u32,
}

/// Internal failure: how much input was left when parsing failed.
struct Failure {
    remaining: usize,
    message: String,
}

impl Failure {
    fn at(rest: &str, message: impl Into<String>) -> Self {
        Failure {
            remaining: rest.len(),
            message: message.into(),
        }
    }
}

/// Parse `text` into a tree whose rendering reproduces `text` exactly.
pub fn parse_tree(text: &str) -> Result<Tree, ParseError> {
    let mut input = text;
    match parse_content(&mut input, None) {
        Ok(content) => Ok(Tree { content }),
        Err(failure) => {
            let offset = text.len() - failure.remaining;
            let (line, col) = byte_offset_to_position_str(text, offset);
            Err(ParseError {
                message: failure.message,
                offset,
                line,
                col,
            })
        }
    }
}

// ============================================================================
// Content
// ============================================================================

/// Parse content items until end of input (top level) or the parent's closing marker.
fn parse_content(input: &mut &str, parent: Option<&str>) -> Result<Vec<Content>, Failure> {
    let mut content: Vec<Content> = Vec::new();
    loop {
        let start = *input;
        if start.is_empty() {
            return match parent {
                Some(name) => Err(Failure::at(start, format!("unclosed <{name}>"))),
                None => Ok(content),
            };
        }
        if start.starts_with("</") {
            return match parent {
                Some(_) => Ok(content),
                None => Err(Failure::at(start, "closing marker without an open node")),
            };
        }

        let item = if start.starts_with("<!--") {
            comment(input).map_err(|_| Failure::at(start, "unterminated comment"))?
        } else if start.starts_with("<![CDATA[") {
            cdata(input).map_err(|_| Failure::at(start, "unterminated CDATA section"))?
        } else if start.starts_with("<?") {
            processing_instruction(input)
                .map_err(|_| Failure::at(start, "unterminated processing instruction"))?
        } else if start.starts_with("<%") {
            scriptlet(input).map_err(|_| Failure::at(start, "unterminated scriptlet"))?
        } else if start.starts_with("<!") {
            declaration(input).map_err(|_| Failure::at(start, "unterminated declaration"))?
        } else if starts_node(start) {
            Content::Node(Arc::new(node(input)?))
        } else {
            text_run(input).map_err(|_| Failure::at(start, "unreadable text"))?
        };
        push_merged(&mut content, item);
    }
}

/// Append `item`, merging adjacent text runs.
fn push_merged(content: &mut Vec<Content>, item: Content) {
    if let (Some(Content::Text(last)), Content::Text(text)) = (content.last_mut(), &item) {
        last.push_str(text);
        return;
    }
    content.push(item);
}

fn starts_node(input: &str) -> bool {
    let mut chars = input.chars();
    chars.next() == Some('<') && chars.next().is_some_and(is_name_start)
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == ':' || c == '@'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | ':' | '@' | '-' | '.')
}

// ============================================================================
// Nodes
// ============================================================================

fn node(input: &mut &str) -> Result<Node, Failure> {
    let start = *input;
    let (name, attributes, before_end) =
        opening_marker(input).map_err(|_| Failure::at(start, "malformed opening marker"))?;

    if let Some(rest) = input.strip_prefix("/>") {
        *input = rest;
        return Ok(Node {
            name,
            attributes,
            before_end,
            content: None,
            closing_padding: String::new(),
            touched: false,
        });
    }
    let Some(rest) = input.strip_prefix('>') else {
        return Err(Failure::at(
            start,
            format!("malformed opening marker for <{name}>"),
        ));
    };
    *input = rest;

    let content = parse_content(input, Some(&name))?;

    let close = *input;
    let (close_name, closing_padding) =
        closing_marker(input).map_err(|_| Failure::at(close, "malformed closing marker"))?;
    if close_name != name {
        return Err(Failure::at(
            close,
            format!("expected </{name}>, found </{close_name}>"),
        ));
    }

    Ok(Node {
        name,
        attributes,
        before_end,
        content: Some(content),
        closing_padding: closing_padding.to_string(),
        touched: false,
    })
}

/// `<name attr="v" ...` up to (not including) `>` or `/>`.
fn opening_marker(input: &mut &str) -> ModalResult<(String, Vec<Attribute>, String)> {
    let _ = '<'.parse_next(input)?;
    let name = node_name(input)?;
    let attributes: Vec<Attribute> = repeat(0.., attribute).parse_next(input)?;
    let before_end: &str = multispace0.parse_next(input)?;
    Ok((name.to_string(), attributes, before_end.to_string()))
}

fn closing_marker<'s>(input: &mut &'s str) -> ModalResult<(&'s str, &'s str)> {
    let (_, name, padding, _) = ("</", node_name, multispace0, '>').parse_next(input)?;
    Ok((name, padding))
}

fn node_name<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    (one_of(is_name_start), take_while(0.., is_name_char))
        .take()
        .parse_next(input)
}

fn attribute(input: &mut &str) -> ModalResult<Attribute> {
    let (prefix, key, before_eq, _, after_eq, (quote, value)) = (
        multispace1,
        node_name,
        multispace0,
        '=',
        multispace0,
        quoted_value,
    )
        .parse_next(input)?;
    Ok(Attribute {
        prefix: prefix.to_string(),
        key: key.to_string(),
        before_eq: before_eq.to_string(),
        after_eq: after_eq.to_string(),
        quote,
        value: value.to_string(),
    })
}

fn quoted_value<'s>(input: &mut &'s str) -> ModalResult<(Quote, &'s str)> {
    alt((
        delimited('"', take_till(0.., |c: char| c == '"'), '"').map(|v: &'s str| (Quote::Double, v)),
        delimited('\'', take_till(0.., |c: char| c == '\''), '\'')
            .map(|v: &'s str| (Quote::Single, v)),
    ))
    .parse_next(input)
}

// ============================================================================
// Verbatim Constructs
// ============================================================================

fn comment(input: &mut &str) -> ModalResult<Content> {
    delimited("<!--", take_until(0.., "-->"), "-->")
        .map(|s: &str| Content::Comment(s.to_string()))
        .parse_next(input)
}

fn cdata(input: &mut &str) -> ModalResult<Content> {
    delimited("<![CDATA[", take_until(0.., "]]>"), "]]>")
        .map(|s: &str| Content::CData(s.to_string()))
        .parse_next(input)
}

fn processing_instruction(input: &mut &str) -> ModalResult<Content> {
    ("<?", take_until(0.., "?>"), "?>")
        .take()
        .map(|s: &str| Content::Opaque(s.to_string()))
        .parse_next(input)
}

/// JSP directives, scriptlets, expressions and `<%-- --%>` comments.
fn scriptlet(input: &mut &str) -> ModalResult<Content> {
    ("<%", take_until(0.., "%>"), "%>")
        .take()
        .map(|s: &str| Content::Opaque(s.to_string()))
        .parse_next(input)
}

/// `<!DOCTYPE ...>` and friends, including a bracketed internal subset.
fn declaration(input: &mut &str) -> ModalResult<Content> {
    (
        "<!",
        take_till(0.., |c: char| c == '>' || c == '['),
        opt(('[', take_until(0.., "]"), ']')),
        take_till(0.., |c: char| c == '>'),
        '>',
    )
        .take()
        .map(|s: &str| Content::Opaque(s.to_string()))
        .parse_next(input)
}

/// A run of character data. The first character is always consumed, so a
/// `<` that starts nothing recognizable becomes text.
fn text_run(input: &mut &str) -> ModalResult<Content> {
    (any, take_till(0.., |c: char| c == '<'))
        .take()
        .map(|s: &str| Content::Text(s.to_string()))
        .parse_next(input)
}

// ============================================================================
// Tests
// ============================================================================

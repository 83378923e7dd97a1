//! Document model: lossless trees for configuration and markup documents.
//!
//! Every project file becomes a [`Document`]. Configuration (`.xml`) and
//! markup (`.jsp`, `.ftl`, ...) documents are parsed into a [`Tree`] of
//! [`Content`] items; everything else is carried as text.
//!
//! ## Losslessness
//!
//! Rendering an unmodified tree reproduces the input byte for byte. Nodes
//! keep the whitespace around attributes, the quote style of each attribute
//! value, and the padding inside closing markers. Comments, CDATA sections,
//! processing instructions, declarations and JSP scriptlets are carried
//! verbatim.
//!
//! ## Sharing
//!
//! Child nodes are held behind `Arc`, so a transform that rebuilds one node
//! clones only the path from the root to that node; untouched subtrees are
//! shared between the old and new tree.

pub mod parse;
pub mod path;
pub mod visit;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use parse::{parse_tree, ParseError};
pub use path::{PathError, PathMatcher};
pub use visit::{transform, walk, Cursor, TreeTransform, TreeVisitor};

// ============================================================================
// Document Kind
// ============================================================================

/// What a project file is, as far as the migrations care.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Routing and framework configuration (`.xml`).
    Config,
    /// View templates (`.jsp`, `.jspf`, `.tag`, `.html`, `.htm`, `.xhtml`, `.ftl`).
    Markup,
    /// Java source (`.java`).
    Source,
    /// Anything else.
    Other,
}

impl DocumentKind {
    /// Classify a path by its extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("xml") => DocumentKind::Config,
            Some("jsp" | "jspf" | "tag" | "html" | "htm" | "xhtml" | "ftl") => DocumentKind::Markup,
            Some("java") => DocumentKind::Source,
            _ => DocumentKind::Other,
        }
    }

    /// Whether documents of this kind are parsed into trees.
    pub fn is_structured(&self) -> bool {
        matches!(self, DocumentKind::Config | DocumentKind::Markup)
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Config => write!(f, "config"),
            DocumentKind::Markup => write!(f, "markup"),
            DocumentKind::Source => write!(f, "source"),
            DocumentKind::Other => write!(f, "other"),
        }
    }
}

// ============================================================================
// Attributes
// ============================================================================

/// Quote character around an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quote {
    Double,
    Single,
}

impl Quote {
    pub fn as_char(&self) -> char {
        match self {
            Quote::Double => '"',
            Quote::Single => '\'',
        }
    }
}

/// A `key="value"` pair on a node, with its surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribute {
    /// Whitespace before the key.
    pub prefix: String,
    pub key: String,
    /// Whitespace between the key and `=`.
    pub before_eq: String,
    /// Whitespace between `=` and the opening quote.
    pub after_eq: String,
    pub quote: Quote,
    /// Raw value between the quotes (entities are not decoded).
    pub value: String,
}

impl Attribute {
    /// A new attribute laid out as ` key="value"`.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Attribute {
            prefix: " ".to_string(),
            key: key.into(),
            before_eq: String::new(),
            after_eq: String::new(),
            quote: Quote::Double,
            value: value.into(),
        }
    }

    /// Same layout, different value.
    pub fn with_value(&self, value: impl Into<String>) -> Self {
        Attribute {
            value: value.into(),
            ..self.clone()
        }
    }

    fn render_into(&self, out: &mut String) {
        out.push_str(&self.prefix);
        out.push_str(&self.key);
        out.push_str(&self.before_eq);
        out.push('=');
        out.push_str(&self.after_eq);
        out.push(self.quote.as_char());
        out.push_str(&self.value);
        out.push(self.quote.as_char());
    }
}

// ============================================================================
// Content and Nodes
// ============================================================================

/// One item in a node's (or the tree's) content list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Node(Arc<Node>),
    /// Character data, including whitespace between nodes.
    Text(String),
    /// Inner text of `<!-- ... -->`.
    Comment(String),
    /// Inner text of `<![CDATA[ ... ]]>`.
    CData(String),
    /// Opaque markup carried verbatim, delimiters included: processing
    /// instructions, declarations, JSP directives and scriptlets.
    Opaque(String),
}

impl Content {
    /// Wrap a node.
    pub fn node(node: Node) -> Self {
        Content::Node(Arc::new(node))
    }

    /// The node, if this item is one.
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Content::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Whether this item is whitespace-only text.
    pub fn is_whitespace(&self) -> bool {
        matches!(self, Content::Text(text) if text.trim().is_empty())
    }

    fn render_into(&self, out: &mut String) {
        match self {
            Content::Node(node) => node.render_into(out),
            Content::Text(text) => out.push_str(text),
            Content::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            Content::CData(text) => {
                out.push_str("<![CDATA[");
                out.push_str(text);
                out.push_str("]]>");
            }
            Content::Opaque(raw) => out.push_str(raw),
        }
    }
}

/// A named node with attributes and, unless self-closing, content.
///
/// The closing marker is always derived from `name`, so a renamed node can
/// never render with a mismatched close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub attributes: Vec<Attribute>,
    /// Whitespace between the last attribute and `>` or `/>`.
    pub before_end: String,
    /// `None` for a self-closing node.
    pub content: Option<Vec<Content>>,
    /// Whitespace inside the closing marker, before `>`.
    pub closing_padding: String,
    /// Set by transforms that rewrote this node or its attributes/text.
    pub touched: bool,
}

impl Node {
    /// A new self-closing node with no attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Node {
            name: name.into(),
            attributes: Vec::new(),
            before_end: String::new(),
            content: None,
            closing_padding: String::new(),
            touched: false,
        }
    }

    /// Value of the attribute named `key`, if present.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }

    /// Value of the attribute named `key`, or `default` when absent.
    pub fn attribute_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.attribute(key).unwrap_or(default)
    }

    /// Copy with `key` set to `value`, keeping the attribute's layout when it
    /// already exists and appending it otherwise.
    pub fn with_attribute(&self, key: &str, value: impl Into<String>) -> Node {
        let value = value.into();
        let mut node = self.clone();
        match node.attributes.iter_mut().find(|a| a.key == key) {
            Some(existing) => existing.value = value,
            None => node.attributes.push(Attribute::new(key, value)),
        }
        node
    }

    /// Copy without the attribute named `key`.
    pub fn without_attribute(&self, key: &str) -> Node {
        let mut node = self.clone();
        node.attributes.retain(|a| a.key != key);
        node
    }

    /// Copy with the given content list.
    pub fn with_content(&self, content: Vec<Content>) -> Node {
        Node {
            content: Some(content),
            ..self.clone()
        }
    }

    /// Copy marked as touched.
    pub fn mark_touched(mut self) -> Node {
        self.touched = true;
        self
    }

    /// Content items (empty for a self-closing node).
    pub fn children(&self) -> &[Content] {
        self.content.as_deref().unwrap_or(&[])
    }

    /// Direct child nodes.
    pub fn child_nodes(&self) -> impl Iterator<Item = &Node> {
        self.children().iter().filter_map(Content::as_node)
    }

    /// Direct child nodes named `name`.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.child_nodes().filter(move |n| n.name == name)
    }

    /// First non-blank direct text (or CDATA) child, trimmed.
    pub fn text(&self) -> Option<&str> {
        self.children().iter().find_map(|c| match c {
            Content::Text(text) | Content::CData(text) if !text.trim().is_empty() => {
                Some(text.trim())
            }
            _ => None,
        })
    }

    /// Render this node back to markup.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for attribute in &self.attributes {
            attribute.render_into(out);
        }
        out.push_str(&self.before_end);
        match &self.content {
            None => out.push_str("/>"),
            Some(content) => {
                out.push('>');
                for item in content {
                    item.render_into(out);
                }
                out.push_str("</");
                out.push_str(&self.name);
                out.push_str(&self.closing_padding);
                out.push('>');
            }
        }
    }
}

// ============================================================================
// Tree
// ============================================================================

/// A parsed document: the top-level content list (prolog, root node, trailing text).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tree {
    pub content: Vec<Content>,
}

impl Tree {
    /// The first top-level node.
    pub fn root(&self) -> Option<&Node> {
        self.content.iter().find_map(Content::as_node)
    }

    /// Render the tree back to text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for item in &self.content {
            item.render_into(&mut out);
        }
        out
    }

    /// Number of nodes marked touched, at any depth.
    pub fn touched_count(&self) -> usize {
        fn count(content: &[Content]) -> usize {
            content
                .iter()
                .filter_map(Content::as_node)
                .map(|n| usize::from(n.touched) + count(n.children()))
                .sum()
        }
        count(&self.content)
    }
}

// ============================================================================
// Document
// ============================================================================

/// Parsed or raw body of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentBody {
    Tree(Tree),
    Text(String),
}

/// One project file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Project-relative path, `/`-separated.
    pub path: String,
    pub kind: DocumentKind,
    pub body: DocumentBody,
}

impl Document {
    /// Build a document from its text.
    ///
    /// Structured kinds are parsed; if parsing fails the document is kept as
    /// text and the parse error is returned alongside it so the caller can
    /// report it.
    pub fn load(path: impl Into<String>, text: impl Into<String>) -> (Document, Option<ParseError>) {
        let path = path.into();
        let text = text.into();
        let kind = DocumentKind::from_path(Path::new(&path));
        if !kind.is_structured() {
            let document = Document {
                path,
                kind,
                body: DocumentBody::Text(text),
            };
            return (document, None);
        }
        match parse_tree(&text) {
            Ok(tree) => (
                Document {
                    path,
                    kind,
                    body: DocumentBody::Tree(tree),
                },
                None,
            ),
            Err(err) => (
                Document {
                    path,
                    kind,
                    body: DocumentBody::Text(text),
                },
                Some(err),
            ),
        }
    }

    /// Same path and kind, new body.
    pub fn with_body(&self, body: DocumentBody) -> Document {
        Document {
            path: self.path.clone(),
            kind: self.kind,
            body,
        }
    }

    /// The parsed tree, if this document has one.
    pub fn tree(&self) -> Option<&Tree> {
        match &self.body {
            DocumentBody::Tree(tree) => Some(tree),
            DocumentBody::Text(_) => None,
        }
    }

    /// Render the document's current text.
    pub fn render(&self) -> String {
        match &self.body {
            DocumentBody::Tree(tree) => tree.render(),
            DocumentBody::Text(text) => text.clone(),
        }
    }

    /// File extension, lowercased.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.path)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod kind_tests {
        use super::*;

        #[test]
        fn classifies_by_extension() {
            assert_eq!(DocumentKind::from_path(Path::new("struts.xml")), DocumentKind::Config);
            assert_eq!(DocumentKind::from_path(Path::new("a/b.jsp")), DocumentKind::Markup);
            assert_eq!(DocumentKind::from_path(Path::new("a/b.ftl")), DocumentKind::Markup);
            assert_eq!(DocumentKind::from_path(Path::new("A.java")), DocumentKind::Source);
            assert_eq!(DocumentKind::from_path(Path::new("README")), DocumentKind::Other);
        }
    }

    mod node_tests {
        use super::*;

        fn action() -> Node {
            let tree = parse_tree(r#"<action name="user" class='com.app.User'><result>/u.jsp</result></action>"#).unwrap();
            tree.root().unwrap().clone()
        }

        #[test]
        fn attribute_lookup() {
            let node = action();
            assert_eq!(node.attribute("name"), Some("user"));
            assert_eq!(node.attribute("method"), None);
            assert_eq!(node.attribute_or("method", "unknown"), "unknown");
        }

        #[test]
        fn with_attribute_keeps_layout() {
            let node = action().with_attribute("class", "com.app.Other");
            assert!(node.render().contains("class='com.app.Other'"));
            let node = node.with_attribute("method", "list");
            assert!(node.render().starts_with(r#"<action name="user" class='com.app.Other' method="list">"#));
        }

        #[test]
        fn without_attribute() {
            let node = action().without_attribute("name");
            assert_eq!(node.attribute("name"), None);
            assert!(node.render().starts_with("<action class="));
        }

        #[test]
        fn text_of_result() {
            let node = action();
            let result = node.children_named("result").next().unwrap();
            assert_eq!(result.text(), Some("/u.jsp"));
            assert_eq!(node.text(), None);
        }

        #[test]
        fn new_node_renders_self_closing() {
            let node = Node::new("constant").with_attribute("name", "x");
            assert_eq!(node.render(), r#"<constant name="x"/>"#);
        }
    }

    mod document_tests {
        use super::*;

        #[test]
        fn load_parses_structured_kinds() {
            let (doc, err) = Document::load("struts.xml", "<struts/>");
            assert!(err.is_none());
            assert!(doc.tree().is_some());
            assert_eq!(doc.render(), "<struts/>");
        }

        #[test]
        fn load_falls_back_to_text() {
            let (doc, err) = Document::load("page.jsp", "<div><span></div>");
            assert!(err.is_some());
            assert_eq!(doc.body, DocumentBody::Text("<div><span></div>".to_string()));
        }

        #[test]
        fn source_is_text() {
            let (doc, err) = Document::load("src/A.java", "class A {}");
            assert!(err.is_none());
            assert_eq!(doc.kind, DocumentKind::Source);
            assert!(doc.tree().is_none());
        }

        #[test]
        fn touched_count_counts_nested_nodes() {
            let tree = parse_tree("<a><b/></a>").unwrap();
            assert_eq!(tree.touched_count(), 0);
            let inner = tree.root().unwrap().children()[0].as_node().unwrap().clone().mark_touched();
            let root = tree.root().unwrap().with_content(vec![Content::node(inner)]).mark_touched();
            let tree = Tree {
                content: vec![Content::node(root)],
            };
            assert_eq!(tree.touched_count(), 2);
        }
    }
}

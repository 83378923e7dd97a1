//! Expression rewriting for configuration and markup documents.
//!
//! Every static call expression in an attribute value or text span is
//! replaced by its wrapper property name (`@com.app.Util@makeCode()` becomes
//! `utilMakeCode`). The rewrite is purely syntactic: it does not consult the
//! cross-reference facts, so expressions whose owner could not be resolved are
//! rewritten too. Nodes whose attributes or direct text changed are marked
//! touched.

use std::collections::HashSet;

use serde::Serialize;

use crate::document::{transform, Attribute, Cursor, Document, DocumentBody, Node, TreeTransform};
use crate::naming;
use crate::scanner::{replace_call_sites, CallSiteMatch};

/// One replaced expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpressionRewrite {
    pub expression: String,
    pub property: String,
    pub owner_type: String,
    pub member_name: String,
}

impl ExpressionRewrite {
    fn from_match(found: &CallSiteMatch<'_>) -> Self {
        ExpressionRewrite {
            expression: found.expression.to_string(),
            property: naming::property_name(found.owner_type, found.member_name),
            owner_type: found.owner_type.to_string(),
            member_name: found.member_name.to_string(),
        }
    }
}

/// Replace every call expression in `text`, collecting what was replaced.
pub fn rewrite_text(text: &str, rewrites: &mut Vec<ExpressionRewrite>) -> Option<String> {
    replace_call_sites(text, |found| {
        let rewrite = ExpressionRewrite::from_match(found);
        let property = rewrite.property.clone();
        rewrites.push(rewrite);
        property
    })
}

/// Rewrite every call expression of a structured document.
///
/// Returns `None` when the document holds no call expression. Source and
/// other documents are never rewritten.
pub fn rewrite_document(document: &Document) -> Option<(Document, Vec<ExpressionRewrite>)> {
    if !document.kind.is_structured() {
        return None;
    }
    match &document.body {
        DocumentBody::Tree(tree) => {
            let mut rewriter = ExpressionRewriter::default();
            let rewritten = transform(tree, &mut rewriter)?;
            tracing::debug!(
                path = %document.path,
                rewrites = rewriter.rewrites.len(),
                touched = rewritten.touched_count(),
                "rewrote expressions"
            );
            Some((document.with_body(DocumentBody::Tree(rewritten)), rewriter.rewrites))
        }
        DocumentBody::Text(text) => {
            let mut rewrites = Vec::new();
            let rewritten = rewrite_text(text, &mut rewrites)?;
            Some((document.with_body(DocumentBody::Text(rewritten)), rewrites))
        }
    }
}

/// Tree transform replacing call expressions in attributes and text.
#[derive(Debug, Default)]
pub struct ExpressionRewriter {
    rewrites: Vec<ExpressionRewrite>,
    /// Depths of nodes with a rewritten attribute or direct text, pending marking.
    touched_depths: HashSet<usize>,
}

impl ExpressionRewriter {
    /// Expressions replaced so far, in document order.
    pub fn rewrites(&self) -> &[ExpressionRewrite] {
        &self.rewrites
    }

    fn rewrite(&mut self, cursor: &Cursor<'_>, text: &str) -> Option<String> {
        let rewritten = rewrite_text(text, &mut self.rewrites)?;
        self.touched_depths.insert(cursor.depth());
        Some(rewritten)
    }
}

impl TreeTransform for ExpressionRewriter {
    fn transform_attribute(&mut self, cursor: &Cursor<'_>, attribute: &Attribute) -> Option<Attribute> {
        self.rewrite(cursor, &attribute.value)
            .map(|value| attribute.with_value(value))
    }

    fn transform_text(&mut self, cursor: &Cursor<'_>, text: &str) -> Option<String> {
        self.rewrite(cursor, text)
    }

    fn transform_node(&mut self, cursor: &Cursor<'_>, node: &Node) -> Option<Node> {
        // Descendants are done by now, so a mark at this depth is this node's.
        self.touched_depths
            .remove(&cursor.depth())
            .then(|| node.clone().mark_touched())
    }
}

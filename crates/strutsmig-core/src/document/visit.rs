//! Tree traversal: read-only visitors and copy-on-write transforms.
//!
//! Both traversals carry a [`Cursor`] holding the chain of nodes from the
//! document root to the node being visited. Attribute and text callbacks see
//! the owning node as the cursor's current node.
//!
//! ## Transforms
//!
//! [`transform`] walks the original tree and asks the [`TreeTransform`] for
//! replacements. Children are transformed before their parent, so
//! `transform_node` receives a node whose content already reflects any
//! rewritten descendants. Only the nodes on a path to a replacement are
//! rebuilt; everything else stays shared with the original tree. When nothing
//! is replaced `transform` returns `None`.

use std::sync::Arc;

use super::{Attribute, Content, Node, Tree};

// ============================================================================
// Cursor
// ============================================================================

/// Root-to-current chain of nodes during a traversal.
#[derive(Debug, Clone, Default)]
pub struct Cursor<'a> {
    chain: Vec<&'a Node>,
}

impl<'a> Cursor<'a> {
    /// Full chain, root first, current node last.
    pub fn chain(&self) -> &[&'a Node] {
        &self.chain
    }

    /// The node being visited (`None` at the top level).
    pub fn current(&self) -> Option<&'a Node> {
        self.chain.last().copied()
    }

    /// The current node's parent.
    pub fn parent(&self) -> Option<&'a Node> {
        self.chain.iter().rev().nth(1).copied()
    }

    /// All ancestors named `name`, root first (the current node excluded).
    pub fn ancestors_named(&self, name: &str) -> Vec<&'a Node> {
        let ancestors = &self.chain[..self.chain.len().saturating_sub(1)];
        ancestors.iter().filter(|n| n.name == name).copied().collect()
    }

    /// Depth of the current node (0 at the top level).
    pub fn depth(&self) -> usize {
        self.chain.len()
    }

    fn push(&mut self, node: &'a Node) {
        self.chain.push(node);
    }

    fn pop(&mut self) {
        self.chain.pop();
    }
}

// ============================================================================
// Read-only Visitor
// ============================================================================

/// Callbacks for a pre-order, read-only walk.
pub trait TreeVisitor {
    /// Called before a node's attributes and content.
    fn enter_node(&mut self, _cursor: &Cursor<'_>) {}

    /// Called after a node's content.
    fn leave_node(&mut self, _cursor: &Cursor<'_>) {}

    /// Called for each attribute of the current node.
    fn visit_attribute(&mut self, _cursor: &Cursor<'_>, _attribute: &Attribute) {}

    /// Called for each text and CDATA span.
    fn visit_text(&mut self, _cursor: &Cursor<'_>, _text: &str) {}
}

/// Walk `tree` in document order.
pub fn walk<V: TreeVisitor + ?Sized>(tree: &Tree, visitor: &mut V) {
    let mut cursor = Cursor::default();
    walk_content(&tree.content, &mut cursor, visitor);
}

fn walk_content<'a, V: TreeVisitor + ?Sized>(
    content: &'a [Content],
    cursor: &mut Cursor<'a>,
    visitor: &mut V,
) {
    for item in content {
        match item {
            Content::Node(node) => {
                cursor.push(node);
                visitor.enter_node(cursor);
                for attribute in &node.attributes {
                    visitor.visit_attribute(cursor, attribute);
                }
                walk_content(node.children(), cursor, visitor);
                visitor.leave_node(cursor);
                cursor.pop();
            }
            Content::Text(text) | Content::CData(text) => visitor.visit_text(cursor, text),
            Content::Comment(_) | Content::Opaque(_) => {}
        }
    }
}

// ============================================================================
// Copy-on-write Transform
// ============================================================================

/// Replacement hooks for [`transform`]. Returning `None` keeps the original.
pub trait TreeTransform {
    /// Replace the current node. Called after its attributes and content have
    /// been transformed; `node` is the possibly rebuilt node.
    fn transform_node(&mut self, _cursor: &Cursor<'_>, _node: &Node) -> Option<Node> {
        None
    }

    /// Replace an attribute of the current node.
    fn transform_attribute(
        &mut self,
        _cursor: &Cursor<'_>,
        _attribute: &Attribute,
    ) -> Option<Attribute> {
        None
    }

    /// Replace a text or CDATA span inside the current node.
    fn transform_text(&mut self, _cursor: &Cursor<'_>, _text: &str) -> Option<String> {
        None
    }
}

/// Apply `transformer` to `tree`, returning the new tree if anything changed.
pub fn transform<T: TreeTransform + ?Sized>(tree: &Tree, transformer: &mut T) -> Option<Tree> {
    let mut cursor = Cursor::default();
    transform_content(&tree.content, &mut cursor, transformer).map(|content| Tree { content })
}

fn transform_content<'a, T: TreeTransform + ?Sized>(
    content: &'a [Content],
    cursor: &mut Cursor<'a>,
    transformer: &mut T,
) -> Option<Vec<Content>> {
    let mut rebuilt: Option<Vec<Content>> = None;
    for (i, item) in content.iter().enumerate() {
        let replacement = match item {
            Content::Node(node) => transform_node(node, cursor, transformer).map(Content::Node),
            Content::Text(text) => transformer.transform_text(cursor, text).map(Content::Text),
            Content::CData(text) => transformer.transform_text(cursor, text).map(Content::CData),
            Content::Comment(_) | Content::Opaque(_) => None,
        };
        match replacement {
            Some(new_item) => rebuilt
                .get_or_insert_with(|| content[..i].to_vec())
                .push(new_item),
            None => {
                if let Some(items) = rebuilt.as_mut() {
                    items.push(item.clone());
                }
            }
        }
    }
    rebuilt
}

fn transform_node<'a, T: TreeTransform + ?Sized>(
    node: &'a Arc<Node>,
    cursor: &mut Cursor<'a>,
    transformer: &mut T,
) -> Option<Arc<Node>> {
    cursor.push(node);

    let mut attributes: Option<Vec<Attribute>> = None;
    for (i, attribute) in node.attributes.iter().enumerate() {
        match transformer.transform_attribute(cursor, attribute) {
            Some(new_attribute) => attributes
                .get_or_insert_with(|| node.attributes[..i].to_vec())
                .push(new_attribute),
            None => {
                if let Some(items) = attributes.as_mut() {
                    items.push(attribute.clone());
                }
            }
        }
    }
    let content = node
        .content
        .as_deref()
        .and_then(|items| transform_content(items, cursor, transformer));

    let rebuilt = if attributes.is_some() || content.is_some() {
        let mut copy = Node::clone(node);
        if let Some(attributes) = attributes {
            copy.attributes = attributes;
        }
        if let Some(content) = content {
            copy.content = Some(content);
        }
        Some(copy)
    } else {
        None
    };

    let current: &Node = rebuilt.as_ref().unwrap_or(&**node);
    let replaced = transformer.transform_node(cursor, current).or(rebuilt);

    cursor.pop();
    replaced.map(Arc::new)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse_tree;

    const DOC: &str = r#"<struts>
  <package name="p">
    <action name="a" class="A"><result>/a.jsp</result></action>
  </package>
</struts>"#;

    #[derive(Default)]
    struct Recorder {
        entered: Vec<String>,
        texts: Vec<(String, String)>,
        attributes: Vec<String>,
    }

    impl TreeVisitor for Recorder {
        fn enter_node(&mut self, cursor: &Cursor<'_>) {
            let path: Vec<_> = cursor.chain().iter().map(|n| n.name.as_str()).collect();
            self.entered.push(path.join("/"));
        }

        fn visit_attribute(&mut self, cursor: &Cursor<'_>, attribute: &Attribute) {
            let owner = cursor.current().map(|n| n.name.clone()).unwrap_or_default();
            self.attributes.push(format!("{}@{}", owner, attribute.key));
        }

        fn visit_text(&mut self, cursor: &Cursor<'_>, text: &str) {
            if !text.trim().is_empty() {
                let owner = cursor.current().map(|n| n.name.clone()).unwrap_or_default();
                self.texts.push((owner, text.to_string()));
            }
        }
    }

    mod walk_tests {
        use super::*;

        #[test]
        fn visits_in_document_order() {
            let tree = parse_tree(DOC).unwrap();
            let mut recorder = Recorder::default();
            walk(&tree, &mut recorder);
            assert_eq!(
                recorder.entered,
                vec![
                    "struts",
                    "struts/package",
                    "struts/package/action",
                    "struts/package/action/result"
                ]
            );
            assert_eq!(
                recorder.attributes,
                vec!["package@name", "action@name", "action@class"]
            );
            assert_eq!(
                recorder.texts,
                vec![("result".to_string(), "/a.jsp".to_string())]
            );
        }

        #[test]
        fn cursor_navigation() {
            let tree = parse_tree(DOC).unwrap();
            let root = tree.root().unwrap();
            let package = root.child_nodes().next().unwrap();
            let action = package.child_nodes().next().unwrap();
            let result = action.child_nodes().next().unwrap();
            let cursor = Cursor {
                chain: vec![root, package, action, result],
            };
            assert_eq!(cursor.current().unwrap().name, "result");
            assert_eq!(cursor.parent().unwrap().name, "action");
            assert_eq!(cursor.ancestors_named("package").len(), 1);
            assert_eq!(cursor.depth(), 4);
        }
    }

    mod transform_tests {
        use super::*;

        struct RenameClass;

        impl TreeTransform for RenameClass {
            fn transform_attribute(
                &mut self,
                _cursor: &Cursor<'_>,
                attribute: &Attribute,
            ) -> Option<Attribute> {
                (attribute.key == "class").then(|| attribute.with_value("B"))
            }
        }

        struct Nothing;

        impl TreeTransform for Nothing {}

        #[test]
        fn unchanged_tree_returns_none() {
            let tree = parse_tree(DOC).unwrap();
            assert!(transform(&tree, &mut Nothing).is_none());
        }

        #[test]
        fn rebuilds_only_the_changed_path() {
            let tree = parse_tree(DOC).unwrap();
            let new_tree = transform(&tree, &mut RenameClass).unwrap();
            assert_eq!(new_tree.render(), DOC.replace("class=\"A\"", "class=\"B\""));

            let old_action = tree.root().unwrap().child_nodes().next().unwrap().children();
            let new_action = new_tree.root().unwrap().child_nodes().next().unwrap().children();
            // whitespace before the action is shared, the action itself is rebuilt
            assert_eq!(old_action[0], new_action[0]);
            let (Content::Node(old), Content::Node(new)) = (&old_action[1], &new_action[1]) else {
                panic!("expected action nodes");
            };
            assert!(!Arc::ptr_eq(old, new));
            let (Content::Node(old_result), Content::Node(new_result)) =
                (&old.children()[0], &new.children()[0])
            else {
                panic!("expected result nodes");
            };
            assert!(Arc::ptr_eq(old_result, new_result));
        }

        #[test]
        fn node_hook_sees_transformed_children() {
            struct CountResults(Vec<usize>);

            impl TreeTransform for CountResults {
                fn transform_text(&mut self, _cursor: &Cursor<'_>, text: &str) -> Option<String> {
                    (text == "/a.jsp").then(|| "/b.jsp".to_string())
                }

                fn transform_node(&mut self, _cursor: &Cursor<'_>, node: &Node) -> Option<Node> {
                    if node.name == "action" {
                        let result = node.child_nodes().next().map(|r| r.render());
                        self.0.push(result.map_or(0, |r| r.matches("/b.jsp").count()));
                        return Some(node.clone().mark_touched());
                    }
                    None
                }
            }

            let tree = parse_tree(DOC).unwrap();
            let mut counter = CountResults(Vec::new());
            let new_tree = transform(&tree, &mut counter).unwrap();
            assert_eq!(counter.0, vec![1]);
            assert_eq!(new_tree.touched_count(), 1);
            assert!(new_tree.render().contains("<result>/b.jsp</result>"));
        }
    }
}

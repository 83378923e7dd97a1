//! Action splitting for dynamic method invocation.
//!
//! With dynamic method invocation enabled, one `<action>` without a `method`
//! serves every outcome through `action!method` URLs. Once the flag is turned
//! off, each non-conventional outcome needs an explicit mapping. The splitter
//! rewrites
//!
//! ```text
//! <action name="product" class="ProductAction">
//!     <result>/product.jsp</result>
//!     <result name="view">/viewProduct.jsp</result>
//! </action>
//! ```
//!
//! into one action holding the default-class results (unnamed, `success`,
//! `error`, `input`, `login`, `none`) followed by one action per named-class
//! result (`productView`, `method="view"`). An action whose only results
//! are named-class ones is replaced by its named actions, even when there is
//! just one.
//!
//! ## Layout
//!
//! Produced actions hold results only; other children (interceptor
//! references, parameters) and the trivia before them are not carried over.
//! Whitespace and comments before a result travel with it; what follows the
//! last child closes every produced action. New actions are
//! separated by the whitespace that preceded the original action.
//!
//! ## Gating
//!
//! [`migrate_dynamic_invocation`] only acts on documents whose
//! `struts.enable.DynamicMethodInvocation` constant is `"true"`. The constant
//! is turned to `"false"` and every package of the document is split.

use std::sync::{Arc, LazyLock};

use serde::Serialize;

use crate::document::{transform, walk, Attribute, Content, Cursor, Node, PathMatcher, Tree, TreeTransform, TreeVisitor};
use crate::naming::capitalize;

/// Outcome names served by the action's default `execute` dispatch.
pub const DEFAULT_RESULT_NAMES: [&str; 6] = ["", "success", "error", "input", "login", "none"];

static DMI_CONSTANT: LazyLock<PathMatcher> = LazyLock::new(|| {
    PathMatcher::new("/struts/constant[@name='struts.enable.DynamicMethodInvocation']")
        .expect("constant path is valid")
});

/// Whether `name` is a default-class outcome.
pub fn is_default_result(name: &str) -> bool {
    DEFAULT_RESULT_NAMES.contains(&name)
}

fn is_result(node: &Node) -> bool {
    node.name == "result"
}

fn result_name(node: &Node) -> &str {
    node.attribute_or("name", "")
}

/// One action that was split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitRecord {
    /// `name` of the enclosing package.
    pub package: String,
    /// `name` of the original action.
    pub action: String,
    /// Names of the produced actions, in output order.
    pub outputs: Vec<String>,
}

// ============================================================================
// Splitting
// ============================================================================

/// A child node with the trivia that precedes it.
struct Unit<'a> {
    leading: &'a [Content],
    node: &'a Arc<Node>,
}

fn units(content: &[Content]) -> (Vec<Unit<'_>>, &[Content]) {
    let mut units = Vec::new();
    let mut start = 0;
    for (i, item) in content.iter().enumerate() {
        if let Content::Node(node) = item {
            units.push(Unit {
                leading: &content[start..i],
                node,
            });
            start = i + 1;
        }
    }
    (units, &content[start..])
}

fn select(units: &[Unit<'_>], trailing: &[Content], keep: impl Fn(&Arc<Node>) -> bool) -> Vec<Content> {
    let mut content = Vec::new();
    for unit in units.iter().filter(|u| keep(u.node)) {
        content.extend_from_slice(unit.leading);
        content.push(Content::Node(Arc::clone(unit.node)));
    }
    content.extend_from_slice(trailing);
    content
}

fn is_default_result_node(node: &Node) -> bool {
    is_result(node) && is_default_result(result_name(node))
}

/// Split one action by its results.
///
/// Returns `None` when the action already has a `method` or has no
/// named-class result. The default action keeps the original attributes
/// (without `method`) and only the default-class results; each named action
/// carries `name`, `class` and `method` and its single result.
pub fn split_action(action: &Node) -> Option<Vec<Node>> {
    if action.attribute("method").is_some_and(|m| !m.is_empty()) {
        return None;
    }
    let (units, trailing) = units(action.children());
    let named: Vec<&Arc<Node>> = units
        .iter()
        .map(|u| u.node)
        .filter(|n| is_result(n) && !is_default_result(result_name(n)))
        .collect();
    if named.is_empty() {
        return None;
    }

    let mut outputs = Vec::with_capacity(named.len() + 1);
    if units.iter().any(|u| is_default_result_node(u.node)) {
        let content = select(&units, trailing, |n| is_default_result_node(n));
        outputs.push(
            action
                .without_attribute("method")
                .with_content(content)
                .mark_touched(),
        );
    }
    for result in named {
        let content = select(&units, trailing, |n| Arc::ptr_eq(n, result));
        outputs.push(named_action(action, result_name(result)).with_content(content));
    }
    Some(outputs)
}

/// Action dispatching to `outcome` explicitly: `name`, `class` and `method` only.
fn named_action(action: &Node, outcome: &str) -> Node {
    let name = format!("{}{}", action.attribute_or("name", ""), capitalize(outcome));
    let mut attributes = vec![Attribute::new("name", name)];
    if let Some(class) = action.attributes.iter().find(|a| a.key == "class") {
        attributes.push(class.clone());
    }
    attributes.push(Attribute::new("method", outcome));
    Node {
        attributes,
        touched: true,
        ..action.clone()
    }
}

/// Split every splittable action directly inside `package`.
pub fn split_package(package: &Node) -> Option<(Node, Vec<SplitRecord>)> {
    let content = package.content.as_deref()?;
    let package_name = package.attribute_or("name", "");
    let mut rebuilt = Vec::with_capacity(content.len());
    let mut splits = Vec::new();

    for (i, item) in content.iter().enumerate() {
        let outputs = item
            .as_node()
            .filter(|n| n.name == "action")
            .and_then(|action| split_action(action).map(|outputs| (action, outputs)));
        let Some((action, outputs)) = outputs else {
            rebuilt.push(item.clone());
            continue;
        };

        let separator = i
            .checked_sub(1)
            .map(|p| &content[p])
            .and_then(|previous| match previous {
                Content::Text(text) if previous.is_whitespace() => Some(text.clone()),
                _ => None,
            })
            .unwrap_or_else(|| "\n".to_string());

        splits.push(SplitRecord {
            package: package_name.to_string(),
            action: action.attribute_or("name", "").to_string(),
            outputs: outputs
                .iter()
                .map(|n| n.attribute_or("name", "").to_string())
                .collect(),
        });
        for (n, node) in outputs.into_iter().enumerate() {
            if n > 0 {
                rebuilt.push(Content::Text(separator.clone()));
            }
            rebuilt.push(Content::node(node));
        }
    }

    if splits.is_empty() {
        return None;
    }
    Some((package.with_content(rebuilt).mark_touched(), splits))
}

// ============================================================================
// Gated Document Migration
// ============================================================================

/// Result of migrating one routing document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchMigration {
    pub tree: Tree,
    pub splits: Vec<SplitRecord>,
}

#[derive(Default)]
struct FlagFinder {
    enabled: bool,
}

impl TreeVisitor for FlagFinder {
    fn enter_node(&mut self, cursor: &Cursor<'_>) {
        if let Some(node) = cursor.current() {
            if DMI_CONSTANT.matches(cursor) && node.attribute_or("value", "false") == "true" {
                self.enabled = true;
            }
        }
    }
}

/// Whether the document enables dynamic method invocation.
pub fn dynamic_invocation_enabled(tree: &Tree) -> bool {
    let mut finder = FlagFinder::default();
    walk(tree, &mut finder);
    finder.enabled
}

#[derive(Default)]
struct DispatchMigrator {
    splits: Vec<SplitRecord>,
}

impl TreeTransform for DispatchMigrator {
    fn transform_node(&mut self, cursor: &Cursor<'_>, node: &Node) -> Option<Node> {
        if DMI_CONSTANT.matches(cursor) && node.attribute_or("value", "false") == "true" {
            return Some(node.with_attribute("value", "false").mark_touched());
        }
        if node.name == "package" {
            let (package, splits) = split_package(node)?;
            self.splits.extend(splits);
            return Some(package);
        }
        None
    }
}

/// Disable dynamic method invocation and split every package's actions.
///
/// Returns `None` when the flag is not enabled.
pub fn migrate_dynamic_invocation(tree: &Tree) -> Option<DispatchMigration> {
    if !dynamic_invocation_enabled(tree) {
        return None;
    }
    let mut migrator = DispatchMigrator::default();
    let tree = transform(tree, &mut migrator)?;
    tracing::debug!(splits = migrator.splits.len(), "disabled dynamic method invocation");
    Some(DispatchMigration {
        tree,
        splits: migrator.splits,
    })
}

// ============================================================================
// Tests
// ============================================================================

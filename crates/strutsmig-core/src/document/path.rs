//! Structural path matchers over node ancestry.
//!
//! A matcher is a `/`-separated list of steps matched against the chain of
//! nodes from the document root down to the current node:
//!
//! - `/struts/package/action`: absolute, the whole chain must match
//! - `//action/result`: relative, the chain must end with these steps
//! - `*` matches any node name
//! - `[@name='value']` (one or more per step) requires an attribute value
//!
//! ```
//! use strutsmig_core::document::{parse_tree, PathMatcher};
//!
//! let matcher = PathMatcher::new("//action/result").unwrap();
//! let tree = parse_tree("<struts><action><result/></action></struts>").unwrap();
//! let root = tree.root().unwrap();
//! let action = root.child_nodes().next().unwrap();
//! let result = action.child_nodes().next().unwrap();
//! assert!(matcher.matches_chain(&[root, action, result]));
//! assert!(!matcher.matches_chain(&[root, action]));
//! ```

use thiserror::Error;
use winnow::combinator::{alt, delimited, preceded, repeat};
use winnow::prelude::*;
use winnow::token::{take_till, take_while};
use winnow::ModalResult;

use super::visit::Cursor;
use super::Node;

/// A path expression could not be understood.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid path expression '{expr}': {message}")]
pub struct PathError {
    pub expr: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    /// `None` for the `*` wildcard.
    name: Option<String>,
    predicates: Vec<(String, String)>,
}

impl Step {
    fn matches(&self, node: &Node) -> bool {
        if let Some(name) = &self.name {
            if node.name != *name {
                return false;
            }
        }
        self.predicates
            .iter()
            .all(|(key, value)| node.attribute(key) == Some(value.as_str()))
    }
}

/// A compiled path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatcher {
    absolute: bool,
    steps: Vec<Step>,
}

impl PathMatcher {
    /// Compile a path expression.
    pub fn new(expr: &str) -> Result<Self, PathError> {
        let error = |message: &str| PathError {
            expr: expr.to_string(),
            message: message.to_string(),
        };
        let (absolute, body) = if let Some(rest) = expr.strip_prefix("//") {
            (false, rest)
        } else if let Some(rest) = expr.strip_prefix('/') {
            (true, rest)
        } else {
            return Err(error("must start with '/' or '//'"));
        };
        if body.is_empty() {
            return Err(error("no steps"));
        }
        let steps = body
            .split('/')
            .map(|segment| {
                step.parse(segment)
                    .map_err(|_| error(&format!("bad step '{segment}'")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PathMatcher { absolute, steps })
    }

    /// Match against a root-to-node chain (the last element is the candidate node).
    pub fn matches_chain(&self, chain: &[&Node]) -> bool {
        if chain.len() < self.steps.len() || (self.absolute && chain.len() != self.steps.len()) {
            return false;
        }
        let tail = &chain[chain.len() - self.steps.len()..];
        self.steps
            .iter()
            .zip(tail)
            .all(|(step, node)| step.matches(node))
    }

    /// Match the cursor's current node.
    pub fn matches(&self, cursor: &Cursor<'_>) -> bool {
        self.matches_chain(cursor.chain())
    }

}

// ============================================================================
// Step Parser
// ============================================================================

fn step(input: &mut &str) -> ModalResult<Step> {
    let name: &str = take_while(1.., |c: char| {
        c.is_alphanumeric() || matches!(c, '_' | ':' | '@' | '-' | '.' | '*')
    })
    .parse_next(input)?;
    let predicates: Vec<(String, String)> = repeat(0.., predicate).parse_next(input)?;
    Ok(Step {
        name: (name != "*").then(|| name.to_string()),
        predicates,
    })
}

/// `[@key='value']` or `[@key="value"]`.
fn predicate(input: &mut &str) -> ModalResult<(String, String)> {
    let key: &str = preceded(
        "[@",
        take_while(1.., |c: char| {
            c.is_alphanumeric() || matches!(c, '_' | ':' | '-' | '.')
        }),
    )
    .parse_next(input)?;
    let _ = '='.parse_next(input)?;
    let value: &str = alt((
        delimited('\'', take_till(0.., |c: char| c == '\''), '\''),
        delimited('"', take_till(0.., |c: char| c == '"'), '"'),
    ))
    .parse_next(input)?;
    let _ = ']'.parse_next(input)?;
    Ok((key.to_string(), value.to_string()))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse_tree;

    fn chain_of<'a>(root: &'a Node, names: &[&str]) -> Vec<&'a Node> {
        let mut chain = vec![root];
        for name in names {
            let next = chain
                .last()
                .unwrap()
                .child_nodes()
                .find(|n| n.name == *name)
                .unwrap();
            chain.push(next);
        }
        chain
    }

    const ROUTING: &str = r#"<struts>
  <constant name="struts.enable.DynamicMethodInvocation" value="true"/>
  <package name="p"><action name="a"><result>/a.jsp</result></action></package>
</struts>"#;

    #[test]
    fn absolute_requires_full_chain() {
        let tree = parse_tree(ROUTING).unwrap();
        let root = tree.root().unwrap();
        let matcher = PathMatcher::new("/struts/package/action").unwrap();
        assert!(matcher.matches_chain(&chain_of(root, &["package", "action"])));
        assert!(!matcher.matches_chain(&chain_of(root, &["package", "action", "result"])));
        assert!(!PathMatcher::new("/package/action")
            .unwrap()
            .matches_chain(&chain_of(root, &["package", "action"])));
    }

    #[test]
    fn relative_matches_suffix() {
        let tree = parse_tree(ROUTING).unwrap();
        let root = tree.root().unwrap();
        let matcher = PathMatcher::new("//action/result").unwrap();
        assert!(matcher.matches_chain(&chain_of(root, &["package", "action", "result"])));
        assert!(!matcher.matches_chain(&chain_of(root, &["package", "action"])));
    }

    #[test]
    fn root_only() {
        let tree = parse_tree(ROUTING).unwrap();
        let root = tree.root().unwrap();
        assert!(PathMatcher::new("/struts").unwrap().matches_chain(&[root]));
    }

    #[test]
    fn attribute_predicate() {
        let tree = parse_tree(ROUTING).unwrap();
        let root = tree.root().unwrap();
        let chain = chain_of(root, &["constant"]);
        let hit =
            PathMatcher::new("/struts/constant[@name='struts.enable.DynamicMethodInvocation']")
                .unwrap();
        let miss = PathMatcher::new("/struts/constant[@name=\"other\"]").unwrap();
        assert!(hit.matches_chain(&chain));
        assert!(!miss.matches_chain(&chain));
    }

    #[test]
    fn wildcard_step() {
        let tree = parse_tree(ROUTING).unwrap();
        let root = tree.root().unwrap();
        let matcher = PathMatcher::new("/struts/*/action").unwrap();
        assert!(matcher.matches_chain(&chain_of(root, &["package", "action"])));
    }

    #[test]
    fn rejects_malformed_expressions() {
        assert!(PathMatcher::new("action").is_err());
        assert!(PathMatcher::new("/").is_err());
        assert!(PathMatcher::new("/a//b").is_err());
        assert!(PathMatcher::new("/a[@k=v]").is_err());
    }
}

//! Read-only searches over a project.
//!
//! - [`find_call_sites`]: every `@Type@member(` head in attribute values and
//!   text spans of configuration and markup documents
//! - [`find_actions`]: every `action` of every routing document
//!
//! Searches never edit. Nodes holding a call-site hit are marked touched in a
//! copy of the tree so a caller can count or render them.

use std::collections::HashSet;
use std::sync::LazyLock;

use crate::config::RoutingConfig;
use crate::document::{
    transform, walk, Attribute, Cursor, Document, DocumentBody, Node, PathMatcher, Tree,
    TreeTransform, TreeVisitor,
};
use crate::output::{ActionRow, CallSiteRow, DataTable};
use crate::project::Project;
use crate::scanner;

const UNKNOWN: &str = "unknown";

// ============================================================================
// Call Sites
// ============================================================================

/// Hits of a call-site search.
#[derive(Debug, Clone, Default)]
pub struct CallSiteSearch {
    pub rows: DataTable<CallSiteRow>,
    /// Searched trees with every hit node marked touched, by path.
    pub marked: Vec<(String, Tree)>,
    pub touched_nodes: usize,
    pub documents: usize,
}

/// Cheap precheck before running the head pattern.
fn may_hold_call(text: &str) -> bool {
    text.contains('@') && text.contains('(')
}

struct CallSiteFinder<'d> {
    source_file: &'d str,
    rows: Vec<CallSiteRow>,
    hit_depths: HashSet<usize>,
}

impl CallSiteFinder<'_> {
    fn record(&mut self, cursor: &Cursor<'_>, text: &str, expression: &str) {
        if !may_hold_call(text) {
            return;
        }
        let before = self.rows.len();
        for (owner_type, member_name) in scanner::scan_heads(text) {
            self.rows.push(CallSiteRow {
                source_file: self.source_file.to_string(),
                expression: expression.to_string(),
                owner_type: owner_type.to_string(),
                member_name: member_name.to_string(),
            });
        }
        if self.rows.len() > before {
            self.hit_depths.insert(cursor.depth());
        }
    }
}

impl TreeTransform for CallSiteFinder<'_> {
    fn transform_attribute(&mut self, cursor: &Cursor<'_>, attribute: &Attribute) -> Option<Attribute> {
        self.record(cursor, &attribute.value, &attribute.value);
        None
    }

    fn transform_text(&mut self, cursor: &Cursor<'_>, text: &str) -> Option<String> {
        self.record(cursor, text, text.trim());
        None
    }

    fn transform_node(&mut self, cursor: &Cursor<'_>, node: &Node) -> Option<Node> {
        self.hit_depths
            .remove(&cursor.depth())
            .then(|| node.clone().mark_touched())
    }
}

/// Search one document for call heads.
///
/// A document kept as text is searched line by line; the row expression is
/// the trimmed line.
pub fn find_call_sites_in(document: &Document) -> (Vec<CallSiteRow>, Option<Tree>) {
    if !document.kind.is_structured() {
        return (Vec::new(), None);
    }
    match &document.body {
        DocumentBody::Tree(tree) => {
            let mut finder = CallSiteFinder {
                source_file: &document.path,
                rows: Vec::new(),
                hit_depths: HashSet::new(),
            };
            let marked = transform(tree, &mut finder);
            (finder.rows, marked)
        }
        DocumentBody::Text(text) => {
            let rows = text
                .lines()
                .filter(|line| may_hold_call(line))
                .flat_map(|line| {
                    scanner::scan_heads(line).map(move |(owner_type, member_name)| CallSiteRow {
                        source_file: document.path.clone(),
                        expression: line.trim().to_string(),
                        owner_type: owner_type.to_string(),
                        member_name: member_name.to_string(),
                    })
                })
                .collect();
            (rows, None)
        }
    }
}

/// Search every configuration and markup document for call heads.
pub fn find_call_sites(project: &Project) -> CallSiteSearch {
    let mut search = CallSiteSearch::default();
    for document in project.iter().filter(|d| d.kind.is_structured()) {
        search.documents += 1;
        let (rows, marked) = find_call_sites_in(document);
        if !rows.is_empty() {
            tracing::debug!(path = %document.path, hits = rows.len(), "found call sites");
        }
        search.rows.extend(rows);
        if let Some(tree) = marked {
            search.touched_nodes += tree.touched_count();
            search.marked.push((document.path.clone(), tree));
        }
    }
    search
}

// ============================================================================
// Actions
// ============================================================================

static ACTION_MATCHER: LazyLock<PathMatcher> =
    LazyLock::new(|| PathMatcher::new("//action").expect("action matcher is a valid path"));

struct ActionFinder<'d> {
    source_file: &'d str,
    rows: Vec<ActionRow>,
}

fn or_unknown(value: Option<&str>) -> String {
    value.unwrap_or(UNKNOWN).to_string()
}

impl TreeVisitor for ActionFinder<'_> {
    fn enter_node(&mut self, cursor: &Cursor<'_>) {
        if !ACTION_MATCHER.matches(cursor) {
            return;
        }
        let Some(action) = cursor.current() else {
            return;
        };
        let package = cursor
            .ancestors_named("package")
            .iter()
            .filter_map(|p| p.attribute("name"))
            .collect::<Vec<_>>()
            .join(".");
        self.rows.push(ActionRow {
            source_file: self.source_file.to_string(),
            package,
            name: or_unknown(action.attribute("name")),
            class_name: or_unknown(action.attribute("class")),
            method_name: or_unknown(action.attribute("method")),
        });
    }
}

/// Actions declared by one document, in document order.
pub fn find_actions_in(document: &Document) -> Vec<ActionRow> {
    let Some(tree) = document.tree() else {
        return Vec::new();
    };
    let mut finder = ActionFinder {
        source_file: &document.path,
        rows: Vec::new(),
    };
    walk(tree, &mut finder);
    finder.rows
}

/// Actions of every routing document, and how many documents were searched.
pub fn find_actions(project: &Project, routing: &RoutingConfig) -> (DataTable<ActionRow>, usize) {
    let mut rows = DataTable::new();
    let mut documents = 0;
    for document in project.iter().filter(|d| routing.is_routing(d)) {
        documents += 1;
        rows.extend(find_actions_in(document));
    }
    (rows, documents)
}

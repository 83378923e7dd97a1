//! Cross-reference facts: which view templates belong to which action types,
//! and which static calls each action type has to wrap.
//!
//! Facts are gathered in a dedicated scan pass over the whole project before
//! any document is edited:
//!
//! - [`ViewBinding`]: a routing document maps a view path to the action type
//!   that renders it (`<action class="T"><result>/view.jsp</result></action>`)
//! - [`CallSite`]: a `@Type@method(args)` expression found in a document
//!
//! An [`AccumulatorBuilder`] collects both kinds of fact in any order. Owner
//! resolution is deferred to [`AccumulatorBuilder::freeze`], so the result
//! does not depend on whether a view was scanned before or after the routing
//! document that binds it. The frozen [`Accumulator`] has no mutating methods
//! and is shared read-only by every worker of the edit pass.
//!
//! ## Ordering
//!
//! All maps and sets are insertion-ordered (`IndexMap`/`IndexSet`). With
//! documents scanned in sorted path order, call-site discovery order, and
//! therefore the order of synthesized accessors, is stable across runs.

use std::hash::{Hash, Hasher};
use std::sync::LazyLock;

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::document::{walk, Attribute, Cursor, Document, DocumentBody, Node, PathMatcher, TreeVisitor};
use crate::naming;
use crate::scanner::{self, CallSiteMatch};

// ============================================================================
// Call Sites
// ============================================================================

/// A static method-access expression found in a project document.
///
/// Two call sites are equal when owner, member and argument text are equal;
/// where they were found and how the full expression was spaced do not take
/// part in equality.
#[derive(Debug, Clone, Serialize)]
pub struct CallSite {
    /// Fully qualified owner type as written in the expression.
    pub owner_type: String,
    pub member_name: String,
    /// Raw argument text, compared as opaque text.
    pub arguments: String,
    /// Exact expression text (`@com.app.Util@makeCode()`).
    pub expression: String,
    /// Project-relative path of the document the expression was found in.
    pub source_document: String,
}

impl CallSite {
    /// Build a call site from a scanner match.
    pub fn from_match(found: &CallSiteMatch<'_>, source_document: &str) -> Self {
        CallSite {
            owner_type: found.owner_type.to_string(),
            member_name: found.member_name.to_string(),
            arguments: found.arguments.to_string(),
            expression: found.expression.to_string(),
            source_document: source_document.to_string(),
        }
    }

    /// Property token the expression is rewritten to (`utilMakeCode`).
    pub fn property_name(&self) -> String {
        naming::property_name(&self.owner_type, &self.member_name)
    }

    /// Accessor synthesized on owning types (`getUtilMakeCode`).
    pub fn accessor_name(&self) -> String {
        naming::accessor_name(&self.property_name())
    }

    fn key(&self) -> (&str, &str, &str) {
        (&self.owner_type, &self.member_name, &self.arguments)
    }
}

impl PartialEq for CallSite {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for CallSite {}

impl Hash for CallSite {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

// ============================================================================
// View Bindings
// ============================================================================

/// A routing rule mapping a view template path to the type that renders it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewBinding {
    /// Normalized view path (no leading `/`).
    pub view_path: String,
    /// Fully qualified action type.
    pub owner_type: String,
    /// Routing document the binding was read from.
    pub source_document: String,
}

/// Trim and strip one leading `/`.
pub fn normalize_view_path(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed.strip_prefix('/').unwrap_or(trimmed)
}

/// Whether a document path and a view path refer to the same file.
///
/// Bidirectional: either side may be a substring of the other (a suffix
/// being a special case), which tolerates different roots between routing
/// documents and the physical layout. Empty paths never correspond.
pub fn paths_correspond(document_path: &str, view_path: &str) -> bool {
    let document_path = normalize_view_path(document_path);
    let view_path = normalize_view_path(view_path);
    if document_path.is_empty() || view_path.is_empty() {
        return false;
    }
    document_path.contains(view_path) || view_path.contains(document_path)
}

// ============================================================================
// Collectors
// ============================================================================

static RESULT_MATCHER: LazyLock<PathMatcher> = LazyLock::new(|| {
    PathMatcher::new("//action/result").expect("result matcher is a valid path")
});

/// Where a result node points: its text, a `location` parameter, or its `name`.
fn result_view_path(result: &Node) -> Option<&str> {
    if let Some(text) = result.text() {
        return Some(text);
    }
    let location = result
        .children_named("param")
        .find(|p| p.attribute("name") == Some("location"))
        .and_then(Node::text);
    location.or_else(|| result.attribute("name"))
}

struct ViewBindingCollector<'d> {
    source_document: &'d str,
    bindings: Vec<ViewBinding>,
}

impl TreeVisitor for ViewBindingCollector<'_> {
    fn enter_node(&mut self, cursor: &Cursor<'_>) {
        if !RESULT_MATCHER.matches(cursor) {
            return;
        }
        let (Some(result), Some(action)) = (cursor.current(), cursor.parent()) else {
            return;
        };
        let owner = action.attribute("class").map(str::trim).unwrap_or_default();
        if owner.is_empty() {
            return;
        }
        let Some(view_path) = result_view_path(result).map(normalize_view_path) else {
            return;
        };
        if view_path.is_empty() {
            return;
        }
        self.bindings.push(ViewBinding {
            view_path: view_path.to_string(),
            owner_type: owner.to_string(),
            source_document: self.source_document.to_string(),
        });
    }
}

/// View bindings declared by a routing document, in document order.
pub fn collect_view_bindings(document: &Document) -> Vec<ViewBinding> {
    let Some(tree) = document.tree() else {
        return Vec::new();
    };
    let mut collector = ViewBindingCollector {
        source_document: &document.path,
        bindings: Vec::new(),
    };
    walk(tree, &mut collector);
    collector.bindings
}

struct CallSiteCollector<'d> {
    source_document: &'d str,
    call_sites: Vec<CallSite>,
}

impl CallSiteCollector<'_> {
    fn scan(&mut self, text: &str) {
        for found in scanner::scan(text) {
            self.call_sites
                .push(CallSite::from_match(&found, self.source_document));
        }
    }
}

impl TreeVisitor for CallSiteCollector<'_> {
    fn visit_attribute(&mut self, _cursor: &Cursor<'_>, attribute: &Attribute) {
        self.scan(&attribute.value);
    }

    fn visit_text(&mut self, _cursor: &Cursor<'_>, text: &str) {
        self.scan(text);
    }
}

/// Call sites in every attribute value and text span of a configuration or
/// markup document. Markup kept as text is scanned as a whole.
pub fn collect_call_sites(document: &Document) -> Vec<CallSite> {
    if !document.kind.is_structured() {
        return Vec::new();
    }
    let mut collector = CallSiteCollector {
        source_document: &document.path,
        call_sites: Vec::new(),
    };
    match &document.body {
        DocumentBody::Tree(tree) => walk(tree, &mut collector),
        DocumentBody::Text(text) => collector.scan(text),
    }
    collector.call_sites
}

// ============================================================================
// Accumulator
// ============================================================================

/// Mutable collection phase of the facts.
#[derive(Debug, Default)]
pub struct AccumulatorBuilder {
    view_to_owners: IndexMap<String, IndexSet<String>>,
    bindings: Vec<ViewBinding>,
    call_sites: Vec<CallSite>,
}

impl AccumulatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a view binding.
    pub fn record_view_binding(&mut self, binding: ViewBinding) {
        self.view_to_owners
            .entry(binding.view_path.clone())
            .or_default()
            .insert(binding.owner_type.clone());
        self.bindings.push(binding);
    }

    /// Record a discovered call site.
    pub fn record_call_site(&mut self, call_site: CallSite) {
        self.call_sites.push(call_site);
    }

    /// Resolve owners and freeze.
    ///
    /// Each call site is matched against every bound view path with
    /// [`paths_correspond`]; every owner found gets the call site.
    pub fn freeze(self) -> Accumulator {
        let mut owner_to_call_sites: IndexMap<String, IndexSet<CallSite>> = IndexMap::new();
        let mut unresolved = 0usize;
        for call_site in &self.call_sites {
            let owners = candidate_owners(&call_site.source_document, &self.view_to_owners);
            if owners.is_empty() {
                unresolved += 1;
            }
            for owner in owners {
                owner_to_call_sites
                    .entry(owner.to_string())
                    .or_default()
                    .insert(call_site.clone());
            }
        }
        tracing::debug!(
            bindings = self.bindings.len(),
            call_sites = self.call_sites.len(),
            owners = owner_to_call_sites.len(),
            unresolved,
            "froze cross-reference facts"
        );
        Accumulator {
            view_to_owners: self.view_to_owners,
            owner_to_call_sites,
            bindings: self.bindings,
            call_sites: self.call_sites,
        }
    }
}

/// Owners whose bound view paths correspond to `document_path`, in binding order.
pub fn candidate_owners<'m>(
    document_path: &str,
    view_to_owners: &'m IndexMap<String, IndexSet<String>>,
) -> IndexSet<&'m str> {
    view_to_owners
        .iter()
        .filter(|(view_path, _)| paths_correspond(document_path, view_path))
        .flat_map(|(_, owners)| owners.iter().map(String::as_str))
        .collect()
}

/// Frozen, read-only cross-reference facts for one migration run.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    view_to_owners: IndexMap<String, IndexSet<String>>,
    owner_to_call_sites: IndexMap<String, IndexSet<CallSite>>,
    bindings: Vec<ViewBinding>,
    call_sites: Vec<CallSite>,
}

impl Accumulator {
    /// View path to owning types.
    pub fn view_to_owners(&self) -> &IndexMap<String, IndexSet<String>> {
        &self.view_to_owners
    }

    /// Call sites resolved to `owner_type`, in discovery order, deduplicated.
    pub fn call_sites_for(&self, owner_type: &str) -> Option<&IndexSet<CallSite>> {
        self.owner_to_call_sites
            .get(owner_type)
            .filter(|sites| !sites.is_empty())
    }

    /// Owning types with at least one call site.
    pub fn owners(&self) -> impl Iterator<Item = &str> {
        self.owner_to_call_sites.keys().map(String::as_str)
    }

    /// Every binding, in discovery order.
    pub fn bindings(&self) -> &[ViewBinding] {
        &self.bindings
    }

    /// Every discovered call site, duplicates included, in discovery order.
    pub fn call_sites(&self) -> &[CallSite] {
        &self.call_sites
    }

    /// Owners resolved for a document path.
    pub fn owners_of_document(&self, document_path: &str) -> IndexSet<&str> {
        candidate_owners(document_path, &self.view_to_owners)
    }

    /// Call sites no owner could be resolved for.
    pub fn unresolved_call_sites(&self) -> impl Iterator<Item = &CallSite> {
        self.call_sites
            .iter()
            .filter(|c| self.owners_of_document(&c.source_document).is_empty())
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Wrapper synthesis for source-code documents.
//!
//! For every type declared in a Java file whose binary name owns call sites
//! in the frozen [`Accumulator`], a zero-argument delegating accessor is
//! appended to the type body:
//!
//! ```text
//! public Object getUtilMakeCode() {
//!     return Util.makeCode();
//! }
//! ```
//!
//! The owner type is imported when needed. Accessors that already exist are
//! skipped, so running the synthesizer on its own output changes nothing.
//!
//! Layout follows the surrounding code: the member indentation of the type
//! body is reused, and accessors go right before the closing brace.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use thiserror::Error;

use crate::facts::{Accumulator, CallSite};
use crate::naming;
use crate::patch::{apply_edits, PatchError, TextEdit};
use crate::source::{parse_source, SourceError, SourceModel, TypeDecl};
use crate::text::{is_line_leading, line_end, line_indent, line_start};

/// Failure to synthesize wrappers for one file.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("cannot model source: {0}")]
    Source(#[from] SourceError),

    #[error(transparent)]
    Patch(#[from] PatchError),
}

/// One accessor added to a type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SynthesizedAccessor {
    /// Binary name of the type the accessor was added to.
    pub type_name: String,
    pub accessor: String,
    /// Expression the accessor replaces in views.
    pub expression: String,
    /// Delegation target as written in the accessor body.
    pub delegate: String,
}

/// Result of synthesizing one file.
#[derive(Debug, Clone, Default)]
pub struct Synthesis {
    /// New file text (equal to the input when nothing was added).
    pub text: String,
    pub accessors: Vec<SynthesizedAccessor>,
    /// Imports added, in order.
    pub imports: Vec<String>,
    /// Call sites whose accessor already existed.
    pub skipped: usize,
}

/// Add delegating accessors for every owned call site of every type in `text`.
pub fn synthesize(text: &str, facts: &Accumulator) -> Result<Synthesis, SynthesisError> {
    let mut synthesis = Synthesis {
        text: text.to_string(),
        ..Default::default()
    };
    if facts.owners().next().is_none() {
        return Ok(synthesis);
    }

    let model = parse_source(text)?;
    let mut imports = ImportPlan::new(&model);
    let mut edits = Vec::new();

    for decl in &model.types {
        let Some(call_sites) = owned_call_sites(decl, facts) else {
            continue;
        };
        let layout = BodyLayout::of(text, decl);
        let mut planned: IndexMap<String, String> = IndexMap::new();

        for call_site in call_sites {
            let accessor = call_site.accessor_name();
            if decl.declares(&accessor) || planned.contains_key(&accessor) {
                tracing::debug!(
                    type_name = %decl.qualified_name,
                    accessor = %accessor,
                    "accessor already present"
                );
                synthesis.skipped += 1;
                continue;
            }
            let delegate = delegate_call(call_site, imports.reference(&call_site.owner_type));
            planned.insert(accessor.clone(), layout.accessor_block(&accessor, &delegate));
            synthesis.accessors.push(SynthesizedAccessor {
                type_name: decl.qualified_name.clone(),
                accessor,
                expression: call_site.expression.clone(),
                delegate,
            });
        }

        if !planned.is_empty() {
            let blocks: Vec<&str> = planned.values().map(String::as_str).collect();
            edits.push(layout.insertion(text, decl, &blocks));
        }
    }

    if let Some(edit) = imports.edit() {
        edits.push(edit);
    }
    if edits.is_empty() {
        return Ok(synthesis);
    }

    synthesis.text = apply_edits(text, &edits)?;
    synthesis.imports = imports.added.into_iter().collect();
    Ok(synthesis)
}

/// Call sites owned by `decl`, looked up by binary then canonical name.
fn owned_call_sites<'f>(decl: &TypeDecl, facts: &'f Accumulator) -> Option<&'f IndexSet<CallSite>> {
    facts
        .call_sites_for(&decl.qualified_name)
        .or_else(|| facts.call_sites_for(&decl.qualified_name.replace('$', ".")))
}

fn delegate_call(call_site: &CallSite, owner_reference: String) -> String {
    format!(
        "{owner_reference}.{}({})",
        call_site.member_name, call_site.arguments
    )
}

// ============================================================================
// Imports
// ============================================================================

/// Decides how owner types are referenced and which imports to add.
struct ImportPlan<'m> {
    model: &'m SourceModel,
    added: IndexSet<String>,
}

impl<'m> ImportPlan<'m> {
    fn new(model: &'m SourceModel) -> Self {
        ImportPlan {
            model,
            added: IndexSet::new(),
        }
    }

    /// Name to write for `owner` in the file, registering an import if needed.
    ///
    /// Falls back to the fully qualified name when the simple name is already
    /// taken by a different import or a type declared in the file.
    fn reference(&mut self, owner: &str) -> String {
        let simple = naming::simple_name(owner);
        let package = naming::package_of(owner);

        if package.is_empty()
            || package == "java.lang"
            || self.model.package.as_deref() == Some(package)
            || self.added.contains(owner)
            || self
                .model
                .imports
                .iter()
                .any(|i| !i.wildcard && i.covers(owner))
        {
            return simple.to_string();
        }

        let taken = self
            .model
            .imports
            .iter()
            .any(|i| !i.is_static && !i.wildcard && naming::simple_name(&i.path) == simple)
            || self.model.declared_simple_names().any(|n| n == simple)
            || self.added.iter().any(|a| naming::simple_name(a) == simple);
        if taken {
            return owner.to_string();
        }

        if !self.model.imports.iter().any(|i| i.covers(owner)) {
            self.added.insert(owner.to_string());
        }
        simple.to_string()
    }

    /// One edit inserting every added import after the existing ones.
    fn edit(&self) -> Option<TextEdit> {
        if self.added.is_empty() {
            return None;
        }
        let lines: Vec<String> = self.added.iter().map(|i| format!("import {i};")).collect();
        let lines = lines.join("\n");
        Some(match (self.model.imports_end(), self.model.package_end) {
            (Some(end), _) => TextEdit::insert(end, format!("\n{lines}")),
            (None, Some(end)) => TextEdit::insert(end, format!("\n\n{lines}")),
            (None, None) => TextEdit::insert(0, format!("{lines}\n\n")),
        })
    }
}

// ============================================================================
// Layout
// ============================================================================

/// Indentation facts of one type body.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BodyLayout {
    /// Indentation of the line holding the closing brace.
    close_indent: String,
    /// Indentation of members inside the body.
    member_indent: String,
    /// One indentation step.
    unit: String,
    body_is_blank: bool,
}

impl BodyLayout {
    fn of(text: &str, decl: &TypeDecl) -> Self {
        let close_indent = line_indent(text, decl.close_brace).to_string();
        let body_is_blank = text[decl.open_brace + 1..decl.close_brace].trim().is_empty();

        let first_line = line_end(text, decl.open_brace);
        let last_line = line_start(text, decl.close_brace);
        let detected = if first_line < last_line {
            text[first_line..last_line]
                .lines()
                .find(|l| {
                    let trimmed = l.trim_start();
                    !trimmed.is_empty() && !trimmed.starts_with('*')
                })
                .map(|l| &l[..l.len() - l.trim_start_matches([' ', '\t']).len()])
                .filter(|indent| indent.len() > close_indent.len())
        } else {
            None
        };

        let default_unit = if close_indent.contains('\t') { "\t" } else { "    " };
        let member_indent = match detected {
            Some(indent) => indent.to_string(),
            None => format!("{close_indent}{default_unit}"),
        };
        let unit = member_indent
            .strip_prefix(close_indent.as_str())
            .filter(|u| !u.is_empty())
            .unwrap_or(default_unit)
            .to_string();

        BodyLayout {
            close_indent,
            member_indent,
            unit,
            body_is_blank,
        }
    }

    fn accessor_block(&self, accessor: &str, delegate: &str) -> String {
        let BodyLayout {
            member_indent: mi,
            unit,
            ..
        } = self;
        format!("{mi}public Object {accessor}() {{\n{mi}{unit}return {delegate};\n{mi}}}\n")
    }

    /// Insert `blocks` before the closing brace of `decl`.
    fn insertion(&self, text: &str, decl: &TypeDecl, blocks: &[&str]) -> TextEdit {
        let joined = blocks.join("\n");
        if is_line_leading(text, decl.close_brace) {
            let separator = if self.body_is_blank { "" } else { "\n" };
            TextEdit::insert(
                line_start(text, decl.close_brace),
                format!("{separator}{joined}"),
            )
        } else {
            let separator = if self.body_is_blank { "\n" } else { "\n\n" };
            TextEdit::insert(
                decl.close_brace,
                format!("{separator}{joined}{}", self.close_indent),
            )
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::{AccumulatorBuilder, ViewBinding};

    fn facts(owner: &str, expressions: &[&str]) -> Accumulator {
        let mut builder = AccumulatorBuilder::new();
        builder.record_view_binding(ViewBinding {
            view_path: "dashboard.jsp".to_string(),
            owner_type: owner.to_string(),
            source_document: "struts.xml".to_string(),
        });
        for expression in expressions {
            for found in crate::scanner::scan(expression) {
                builder.record_call_site(CallSite::from_match(&found, "web/dashboard.jsp"));
            }
        }
        builder.freeze()
    }

    const ACTION: &str = "package com.example;

import com.opensymphony.xwork2.ActionSupport;

public class DashboardAction extends ActionSupport {
    public String execute() {
        return SUCCESS;
    }
}
";

    mod accessor_tests {
        use super::*;

        #[test]
        fn appends_accessor_and_import() {
            let facts = facts("com.example.DashboardAction", &["@com.app.Util@makeCode()"]);
            let result = synthesize(ACTION, &facts).unwrap();
            assert_eq!(
                result.text,
                "package com.example;

import com.opensymphony.xwork2.ActionSupport;
import com.app.Util;

public class DashboardAction extends ActionSupport {
    public String execute() {
        return SUCCESS;
    }

    public Object getUtilMakeCode() {
        return Util.makeCode();
    }
}
"
            );
            assert_eq!(result.imports, vec!["com.app.Util"]);
            assert_eq!(result.accessors.len(), 1);
            assert_eq!(result.accessors[0].accessor, "getUtilMakeCode");
            assert_eq!(result.accessors[0].delegate, "Util.makeCode()");
            assert_eq!(result.accessors[0].expression, "@com.app.Util@makeCode()");
        }

        #[test]
        fn second_run_is_a_no_op() {
            let facts = facts("com.example.DashboardAction", &["@com.app.Util@makeCode()"]);
            let once = synthesize(ACTION, &facts).unwrap();
            let twice = synthesize(&once.text, &facts).unwrap();
            assert_eq!(twice.text, once.text);
            assert!(twice.accessors.is_empty());
            assert_eq!(twice.skipped, 1);
        }

        #[test]
        fn duplicate_call_sites_produce_one_accessor() {
            let facts = facts(
                "com.example.DashboardAction",
                &["@com.app.Util@makeCode()", "@com.app.Util@makeCode()"],
            );
            let result = synthesize(ACTION, &facts).unwrap();
            assert_eq!(result.accessors.len(), 1);
            assert_eq!(result.text.matches("getUtilMakeCode").count(), 1);
        }

        #[test]
        fn same_accessor_name_with_different_arguments_is_skipped() {
            let facts = facts(
                "com.example.DashboardAction",
                &["@com.app.Format@currency(a)", "@com.app.Format@currency(b)"],
            );
            let result = synthesize(ACTION, &facts).unwrap();
            assert_eq!(result.accessors.len(), 1);
            assert_eq!(result.accessors[0].delegate, "Format.currency(a)");
            assert_eq!(result.skipped, 1);
        }

        #[test]
        fn accessors_follow_discovery_order() {
            let facts = facts(
                "com.example.DashboardAction",
                &["@com.app.Format@currency(amount)", "@com.app.Util@makeCode()"],
            );
            let result = synthesize(ACTION, &facts).unwrap();
            let currency = result.text.find("getFormatCurrency").unwrap();
            let code = result.text.find("getUtilMakeCode").unwrap();
            assert!(currency < code);
            assert!(result.text.contains("import com.app.Format;\nimport com.app.Util;"));
            assert_eq!(result.imports, vec!["com.app.Format", "com.app.Util"]);
        }

        #[test]
        fn unowned_types_are_untouched() {
            let facts = facts("com.example.OtherAction", &["@com.app.Util@makeCode()"]);
            let result = synthesize(ACTION, &facts).unwrap();
            assert_eq!(result.text, ACTION);
            assert!(result.accessors.is_empty());
        }

        #[test]
        fn empty_facts_skip_modeling() {
            let result = synthesize("class Broken {", &Accumulator::default()).unwrap();
            assert_eq!(result.text, "class Broken {");
        }

        #[test]
        fn unbalanced_source_is_an_error() {
            let facts = facts("Broken", &["@com.app.Util@makeCode()"]);
            assert!(matches!(
                synthesize("class Broken {", &facts),
                Err(SynthesisError::Source(_))
            ));
        }

        #[test]
        fn nested_type_by_canonical_name() {
            let text = "package p;\n\nclass Outer {\n    static class Inner {\n        int x;\n    }\n}\n";
            let facts = facts("p.Outer.Inner", &["@p.Util@run()"]);
            let result = synthesize(text, &facts).unwrap();
            assert_eq!(
                result.text,
                "package p;\n\nclass Outer {\n    static class Inner {\n        int x;\n\n        public Object getUtilRun() {\n            return Util.run();\n        }\n    }\n}\n"
            );
            assert!(result.imports.is_empty());
        }
    }

    mod import_tests {
        use super::*;

        #[test]
        fn existing_import_is_reused() {
            let text = "package p;\n\nimport com.app.Util;\n\nclass A {\n}\n";
            let result = synthesize(text, &facts("p.A", &["@com.app.Util@run()"])).unwrap();
            assert!(result.imports.is_empty());
            assert!(result.text.contains("return Util.run();"));
            assert_eq!(result.text.matches("import com.app.Util;").count(), 1);
        }

        #[test]
        fn wildcard_import_is_reused() {
            let text = "package p;\n\nimport com.app.*;\n\nclass A {\n}\n";
            let result = synthesize(text, &facts("p.A", &["@com.app.Util@run()"])).unwrap();
            assert!(result.imports.is_empty());
            assert!(result.text.contains("return Util.run();"));
        }

        #[test]
        fn conflicting_simple_name_uses_qualified_reference() {
            let text = "package p;\n\nimport org.other.Util;\n\nclass A {\n}\n";
            let result = synthesize(text, &facts("p.A", &["@com.app.Util@run()"])).unwrap();
            assert!(result.imports.is_empty());
            assert!(result.text.contains("return com.app.Util.run();"));
        }

        #[test]
        fn java_lang_needs_no_import() {
            let text = "package p;\n\nclass A {\n}\n";
            let result = synthesize(text, &facts("p.A", &["@java.lang.Math@random()"])).unwrap();
            assert!(result.imports.is_empty());
            assert!(result.text.contains("return Math.random();"));
        }

        #[test]
        fn import_after_package_when_none_exist() {
            let text = "package p;\n\nclass A {\n}\n";
            let result = synthesize(text, &facts("p.A", &["@com.app.Util@run()"])).unwrap();
            assert!(result.text.starts_with("package p;\n\nimport com.app.Util;\n\nclass A {\n"));
        }

        #[test]
        fn import_at_top_without_package() {
            let text = "class A {}\n";
            let result = synthesize(text, &facts("A", &["@com.app.Util@run()"])).unwrap();
            assert_eq!(
                result.text,
                "import com.app.Util;\n\nclass A {\n    public Object getUtilRun() {\n        return Util.run();\n    }\n}\n"
            );
        }
    }

    mod layout_tests {
        use super::*;

        #[test]
        fn tab_indented_body() {
            let text = "class A {\n\tint x;\n}\n";
            let result = synthesize(text, &facts("A", &["@A@run()"])).unwrap();
            assert_eq!(
                result.text,
                "class A {\n\tint x;\n\n\tpublic Object getARun() {\n\t\treturn A.run();\n\t}\n}\n"
            );
        }

        #[test]
        fn javadoc_lines_do_not_set_indentation() {
            let text = "class A {\n  /**\n   * Doc.\n   */\n  int x;\n}\n";
            let decl = &parse_source(text).unwrap().types[0];
            let layout = BodyLayout::of(text, decl);
            assert_eq!(layout.member_indent, "  ");
            assert_eq!(layout.unit, "  ");
        }
    }
}

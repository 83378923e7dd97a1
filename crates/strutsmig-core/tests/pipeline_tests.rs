//! End-to-end migration runs over on-disk workspaces.

use std::fs;
use std::path::Path;

use strutsmig_core::config::MigrationConfig;
use strutsmig_core::pipeline::{migrate, warning_codes};
use strutsmig_core::project::Project;
use strutsmig_core::workspace::{FileFilter, WorkspaceSnapshot};

// ============================================================================
// Test Infrastructure
// ============================================================================

const STRUTS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE struts PUBLIC "-//Apache Software Foundation//DTD Struts Configuration 2.5//EN" "http://struts.apache.org/dtds/struts-2.5.dtd">
<struts>
    <constant name="struts.enable.DynamicMethodInvocation" value="true"/>
    <constant name="struts.devMode" value="false"/>

    <package name="default" extends="struts-default">
        <action name="dashboard" class="com.example.DashboardAction">
            <result>/WEB-INF/jsp/dashboard.jsp</result>
        </action>
        <action name="product" class="com.example.ProductAction">
            <result>/WEB-INF/jsp/product.jsp</result>
            <result name="input">/WEB-INF/jsp/product.jsp</result>
            <result name="view">/WEB-INF/jsp/viewProduct.jsp</result>
        </action>
    </package>
</struts>
"#;

const DASHBOARD_JSP: &str = r#"<%@ taglib prefix="s" uri="/struts-tags" %>
<html>
<body>
  <h1><s:property value="%{@com.app.Util@makeCode()}"/></h1>
  <p>Generated <s:date name="generatedAt" format="YYYY-MM-dd"/></p>
  <p>Total: ${@com.app.Format@currency(total)}</p>
</body>
</html>
"#;

const DASHBOARD_ACTION: &str = "package com.example;

import com.opensymphony.xwork2.ActionSupport;

public class DashboardAction extends ActionSupport {

    private String name;

    public String execute() {
        return SUCCESS;
    }
}
";

const PRODUCT_JSP: &str = r#"<p><s:date name="created" format="EEEE, u"/></p>
"#;

fn write(root: &Path, path: &str, content: &str) {
    let full = root.join(path);
    fs::create_dir_all(full.parent().unwrap()).unwrap();
    fs::write(full, content).unwrap();
}

fn sample_workspace() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/main/resources/struts.xml", STRUTS_XML);
    write(dir.path(), "src/main/webapp/WEB-INF/jsp/dashboard.jsp", DASHBOARD_JSP);
    write(dir.path(), "src/main/webapp/WEB-INF/jsp/product.jsp", PRODUCT_JSP);
    write(
        dir.path(),
        "src/main/java/com/example/DashboardAction.java",
        DASHBOARD_ACTION,
    );
    write(dir.path(), "README.md", "# sample\n");
    dir
}

fn load(root: &Path) -> (WorkspaceSnapshot, Project) {
    let filter = FileFilter::new(&[], &[]).unwrap();
    let snapshot = WorkspaceSnapshot::create(root, &filter).unwrap();
    let project = Project::from_snapshot(&snapshot);
    (snapshot, project)
}

fn read(root: &Path, path: &str) -> String {
    fs::read_to_string(root.join(path)).unwrap()
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn full_run_migrates_every_document() {
    let dir = sample_workspace();
    let (snapshot, project) = load(dir.path());
    assert_eq!(project.len(), 4);

    let report = migrate(&project, &MigrationConfig::default());
    let written = snapshot.write_changes(&report.changes).unwrap();
    assert_eq!(written.len(), 4);

    let jsp = read(dir.path(), "src/main/webapp/WEB-INF/jsp/dashboard.jsp");
    assert!(jsp.contains(r#"<s:property value="%{utilMakeCode}"/>"#));
    assert!(jsp.contains("Total: ${formatCurrency}"));
    assert!(jsp.contains(r#"format="yyyy-MM-dd""#));
    assert!(jsp.starts_with("<%@ taglib prefix=\"s\" uri=\"/struts-tags\" %>\n"));

    let action = read(dir.path(), "src/main/java/com/example/DashboardAction.java");
    assert!(action.contains("import com.opensymphony.xwork2.ActionSupport;\nimport com.app.Format;\nimport com.app.Util;\n"));
    assert!(action.contains(
        "    public Object getUtilMakeCode() {\n        return Util.makeCode();\n    }\n"
    ));
    assert!(action.contains(
        "    public Object getFormatCurrency() {\n        return Format.currency(total);\n    }\n}\n"
    ));

    let product = read(dir.path(), "src/main/webapp/WEB-INF/jsp/product.jsp");
    assert_eq!(product, "<p><s:date name=\"created\" format=\"EEEE, e\"/></p>\n");

    let routing = read(dir.path(), "src/main/resources/struts.xml");
    assert!(routing.contains(r#"<constant name="struts.enable.DynamicMethodInvocation" value="false"/>"#));
    assert!(routing.contains(r#"<constant name="struts.devMode" value="false"/>"#));
    assert!(routing.contains(
        r#"<action name="productView" class="com.example.ProductAction" method="view">"#
    ));
    assert!(routing.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE struts"));

    assert_eq!(report.summary.accessors_added, 2);
    assert_eq!(report.summary.actions_split, 1);
    assert_eq!(report.summary.date_patterns_translated, 2);
    assert_eq!(report.summary.unresolved_call_sites, 0);
}

#[test]
fn second_run_changes_nothing() {
    let dir = sample_workspace();
    let (snapshot, project) = load(dir.path());
    let first = migrate(&project, &MigrationConfig::default());
    snapshot.write_changes(&first.changes).unwrap();

    let (_, project) = load(dir.path());
    let second = migrate(&project, &MigrationConfig::default());
    assert!(!second.has_changes());
    assert!(second.warnings.is_empty());
}

#[test]
fn routing_document_order_does_not_matter() {
    // The view sorts before the routing document, so it is scanned first.
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a/dashboard.jsp", "<p>@com.app.Util@makeCode()</p>");
    write(dir.path(), "z/struts.xml", r#"<struts><package name="p"><action name="d" class="com.example.DashboardAction"><result>/dashboard.jsp</result></action></package></struts>"#);
    write(dir.path(), "m/DashboardAction.java", "package com.example;\n\npublic class DashboardAction {\n}\n");

    let (_, project) = load(dir.path());
    let report = migrate(&project, &MigrationConfig::default());
    assert_eq!(report.summary.accessors_added, 1);
    assert_eq!(report.accessors[0].file, "m/DashboardAction.java");
}

#[test]
fn shared_view_fans_out_to_every_owner() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "struts.xml",
        r#"<struts><package name="p">
  <action name="a" class="com.example.AAction"><result>/shared.jsp</result></action>
  <action name="b" class="com.example.BAction"><result>/shared.jsp</result></action>
</package></struts>"#,
    );
    write(dir.path(), "web/shared.jsp", "<p>@com.app.Util@run()</p>");
    write(dir.path(), "src/AAction.java", "package com.example;\nclass AAction {\n}\n");
    write(dir.path(), "src/BAction.java", "package com.example;\nclass BAction {\n}\n");

    let (_, project) = load(dir.path());
    let report = migrate(&project, &MigrationConfig::default());
    let files: Vec<_> = report.accessors.iter().map(|a| a.file.as_str()).collect();
    assert_eq!(files, vec!["src/AAction.java", "src/BAction.java"]);
}

#[test]
fn broken_routing_document_is_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "struts.xml", "<struts><package name=\"p\"></struts>");
    write(dir.path(), "web/a.jsp", r#"<s:date name="d" format="YYYY"/>"#);

    let (_, project) = load(dir.path());
    let report = migrate(&project, &MigrationConfig::default());
    assert_eq!(report.summary.files_changed, 1);
    assert!(report
        .warnings
        .iter()
        .any(|w| w.code == warning_codes::UNPARSEABLE_DOCUMENT
            && w.location.as_ref().is_some_and(|l| l.file == "struts.xml")));
}

#[test]
fn stale_file_blocks_apply() {
    let dir = sample_workspace();
    let (snapshot, project) = load(dir.path());
    let report = migrate(&project, &MigrationConfig::default());
    write(dir.path(), "src/main/webapp/WEB-INF/jsp/product.jsp", "<p>edited</p>\n");

    assert!(snapshot.write_changes(&report.changes).is_err());
    assert_eq!(
        read(dir.path(), "src/main/webapp/WEB-INF/jsp/dashboard.jsp"),
        DASHBOARD_JSP
    );
}

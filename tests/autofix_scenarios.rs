//! End-to-end scenarios: findings with fix descriptors in, rewritten
//! resources out.

use amd_autofix::text::LineIndex;
use amd_autofix::{
    autofix, fix_resource, AutofixInput, AutofixOptions, Finding, FixDescriptor, ResourceInput,
};
use serde_json::{json, Value};

const RESOURCE: &str = "/resources/my/app/Main.js";

/// 1-based position of the `nth` occurrence of `needle` in `code`.
fn position_of(code: &str, needle: &str, nth: usize) -> Value {
    let offset = code
        .match_indices(needle)
        .nth(nth)
        .map(|(i, _)| i)
        .unwrap_or_else(|| panic!("`{needle}` occurs fewer than {} times", nth + 1));
    let position = LineIndex::new(code).position_at(code, offset);
    json!({"line": position.line, "column": position.column})
}

fn descriptor(mut fix: Value, code: &str, needle: &str, nth: usize) -> FixDescriptor {
    fix["position"] = position_of(code, needle, nth);
    serde_json::from_value(fix).unwrap()
}

fn global_access(code: &str, nth: usize, module: &str, access_path: &str) -> FixDescriptor {
    descriptor(
        json!({"type": "globalAccess", "moduleName": module, "accessPath": access_path}),
        code,
        access_path,
        nth,
    )
}

fn run_at(resource: &str, code: &str, fixes: &[FixDescriptor]) -> Option<String> {
    let options = AutofixOptions {
        parallel: false,
        ..Default::default()
    };
    fix_resource(resource, code, fixes, &options).unwrap()
}

fn run(code: &str, fixes: &[FixDescriptor]) -> Option<String> {
    run_at(RESOURCE, code, fixes)
}

#[test]
fn adds_import_for_global_access() {
    let code = r#"sap.ui.define(["sap/m/Button"], function(Button) { jQuery.sap.log.info("x"); });"#;
    let fix = global_access(code, 0, "sap/base/Log", "jQuery.sap.log");
    assert_eq!(
        run(code, &[fix]).unwrap(),
        r#"sap.ui.define(["sap/m/Button", "sap/base/Log"], function(Button, Log) { Log.info("x"); });"#
    );
}

#[test]
fn reuses_relative_dependency() {
    let code = r#"sap.ui.define(["./Helper"], function(Helper) { a.b.Helper.run(); });"#;
    let fix = global_access(code, 0, "a/b/Helper", "a.b.Helper");
    assert_eq!(
        run_at("/resources/a/b/c.js", code, &[fix]).unwrap(),
        r#"sap.ui.define(["./Helper"], function(Helper) { Helper.run(); });"#
    );
}

#[test]
fn reuses_existing_import_without_touching_declaration() {
    let code = "sap.ui.define([\"sap/base/Log\"], function(Log) {\n\tjQuery.sap.log.info(\"a\");\n\tjQuery.sap.log.warning(\"b\");\n});";
    let fixes = [
        global_access(code, 0, "sap/base/Log", "jQuery.sap.log"),
        global_access(code, 1, "sap/base/Log", "jQuery.sap.log"),
    ];
    assert_eq!(
        run(code, &fixes).unwrap(),
        "sap.ui.define([\"sap/base/Log\"], function(Log) {\n\tLog.info(\"a\");\n\tLog.warning(\"b\");\n});"
    );
}

#[test]
fn adds_each_module_once() {
    let code = r#"sap.ui.define([], function() { jQuery.sap.log.info("a"); jQuery.sap.log.error("b"); });"#;
    let fixes = [
        global_access(code, 0, "sap/base/Log", "jQuery.sap.log"),
        global_access(code, 1, "sap/base/Log", "jQuery.sap.log"),
    ];
    let fixed = run(code, &fixes).unwrap();
    assert_eq!(
        fixed,
        r#"sap.ui.define(["sap/base/Log"], function(Log) { Log.info("a"); Log.error("b"); });"#
    );
    assert_eq!(fixed.matches("\"sap/base/Log\"").count(), 1);
}

#[test]
fn removes_last_dependency_without_orphan_comma() {
    let code = "sap.ui.define([\n\t\"sap/m/Button\",\n\t\"sap/base/strings/NormalizePolyfill\"\n], function(Button, NormalizePolyfill) {\n\treturn Button;\n});";
    let fix = descriptor(
        json!({"type": "obsoleteImport", "moduleName": "sap/base/strings/NormalizePolyfill"}),
        code,
        "\"sap/base/strings/NormalizePolyfill\"",
        0,
    );
    assert_eq!(
        run(code, &[fix]).unwrap(),
        "sap.ui.define([\n\t\"sap/m/Button\"\n], function(Button) {\n\treturn Button;\n});"
    );
}

#[test]
fn keeps_commas_balanced_after_removal() {
    let code = r#"sap.ui.define(["a/A", "a/B", "a/C", "a/D"], function(A, B, C, D) { return A + D; });"#;
    let fixes = [
        descriptor(json!({"type": "obsoleteImport", "moduleName": "a/B"}), code, "\"a/B\"", 0),
        descriptor(json!({"type": "obsoleteImport", "moduleName": "a/C"}), code, "\"a/C\"", 0),
    ];
    let fixed = run(code, &fixes).unwrap();
    assert_eq!(
        fixed,
        r#"sap.ui.define(["a/A", "a/D"], function(A, D) { return A + D; });"#
    );
    let array = &fixed[fixed.find('[').unwrap()..=fixed.find(']').unwrap()];
    assert_eq!(array.matches(',').count(), 1);
}

#[test]
fn keeps_referenced_dependency() {
    let code = r#"sap.ui.define(["a/A", "a/B"], function(A, B) { return B; });"#;
    let fix = descriptor(
        json!({"type": "obsoleteImport", "moduleName": "a/B"}),
        code,
        "\"a/B\"",
        0,
    );
    assert_eq!(run(code, &[fix]), None);
}

#[test]
fn sibling_declarations_get_separate_imports() {
    let code = "sap.ui.define([], function() {\n\tsap.ui.core.Lib.init();\n});\nsap.ui.define([], function() {\n\tsap.ui.core.Lib.load();\n});";
    let fixes = [
        global_access(code, 0, "sap/ui/core/Lib", "sap.ui.core.Lib"),
        global_access(code, 1, "sap/ui/core/Lib", "sap.ui.core.Lib"),
    ];
    assert_eq!(
        run(code, &fixes).unwrap(),
        "sap.ui.define([\"sap/ui/core/Lib\"], function(Lib) {\n\tLib.init();\n});\nsap.ui.define([\"sap/ui/core/Lib\"], function(Lib1) {\n\tLib1.load();\n});"
    );
}

#[test]
fn hoists_shared_import_to_enclosing_declaration() {
    let code = "sap.ui.define([], function() {\n\tsap.ui.require([], function() {\n\t\tjQuery.sap.log.info(\"a\");\n\t});\n\tsap.ui.require([], function() {\n\t\tjQuery.sap.log.info(\"b\");\n\t});\n});";
    let fixes = [
        global_access(code, 0, "sap/base/Log", "jQuery.sap.log"),
        global_access(code, 1, "sap/base/Log", "jQuery.sap.log"),
    ];
    assert_eq!(
        run(code, &fixes).unwrap(),
        "sap.ui.define([\"sap/base/Log\"], function(Log) {\n\tsap.ui.require([], function() {\n\t\tLog.info(\"a\");\n\t});\n\tsap.ui.require([], function() {\n\t\tLog.info(\"b\");\n\t});\n});"
    );
}

#[test]
fn matches_quote_style_of_majority() {
    let code = r#"sap.ui.define(["a/A", "a/B", "a/C", "a/D", 'a/E'], function(A, B, C, D, E) { x.y.Log.info(); });"#;
    let fix = global_access(code, 0, "sap/base/Log", "x.y.Log");
    assert_eq!(
        run(code, &[fix]).unwrap(),
        r#"sap.ui.define(["a/A", "a/B", "a/C", "a/D", 'a/E', "sap/base/Log"], function(A, B, C, D, E, Log) { Log.info(); });"#
    );

    let code = r#"sap.ui.define(['a/A', 'a/B'], function(A, B) { x.y.Log.info(); });"#;
    let fix = global_access(code, 0, "sap/base/Log", "x.y.Log");
    assert_eq!(
        run(code, &[fix]).unwrap(),
        r#"sap.ui.define(['a/A', 'a/B', 'sap/base/Log'], function(A, B, Log) { Log.info(); });"#
    );
}

#[test]
fn probing_access_never_adds_import() {
    let code = r#"sap.ui.define([], function() { if (jQuery.sap.log) { return; } });"#;
    let fix = global_access(code, 0, "sap/base/Log", "jQuery.sap.log");
    assert_eq!(run(code, &[fix]), None);

    let code = r#"sap.ui.define(["sap/base/Log"], function(Log) { if (typeof jQuery.sap.log === "object") { return; } });"#;
    let fix = global_access(code, 0, "sap/base/Log", "jQuery.sap.log");
    assert_eq!(
        run(code, &[fix]).unwrap(),
        r#"sap.ui.define(["sap/base/Log"], function(Log) { if (typeof Log === "object") { return; } });"#
    );
}

#[test]
fn replaces_synchronous_require() {
    let code = r#"sap.ui.define(["sap/m/Button"], function(Button) { var oLog = sap.ui.requireSync("sap/base/Log"); });"#;
    let fix = descriptor(json!({"type": "requireSync"}), code, "sap.ui.requireSync", 0);
    assert_eq!(
        run(code, &[fix]).unwrap(),
        r#"sap.ui.define(["sap/m/Button", "sap/base/Log"], function(Button, Log) { var oLog = Log; });"#
    );

    let code = r#"sap.ui.define(["./Helper"], function(Helper) { return sap.ui.requireSync("./Helper"); });"#;
    let fix = descriptor(json!({"type": "requireSync"}), code, "sap.ui.requireSync", 0);
    assert_eq!(
        run_at("/resources/a/b/c.js", code, &[fix]).unwrap(),
        r#"sap.ui.define(["./Helper"], function(Helper) { return Helper; });"#
    );
}

#[test]
fn generates_calls_from_templates() {
    let code = r#"sap.ui.define([], function() { var s = jQuery.sap.encodeHTML(text); var b = !jQuery.sap.isEmpty(x); });"#;
    let fixes = [
        descriptor(
            json!({
                "type": "callGenerator",
                "template": "$moduleIdentifier($0)",
                "moduleName": "sap/base/security/encodeXML",
            }),
            code,
            "jQuery.sap.encodeHTML",
            0,
        ),
        descriptor(
            json!({"type": "callGenerator", "template": "$0 == null"}),
            code,
            "jQuery.sap.isEmpty",
            0,
        ),
    ];
    assert_eq!(
        run(code, &fixes).unwrap(),
        r#"sap.ui.define(["sap/base/security/encodeXML"], function(encodeXML) { var s = encodeXML(text); var b = !(x == null); });"#
    );
}

#[test]
fn replaces_callee_and_keeps_comments() {
    let code = r#"sap.ui.define([], function() { jQuery.sap/* keep */.log.info("x"); });"#;
    let fix = descriptor(
        json!({
            "type": "callExpression",
            "moduleName": "sap/base/Log",
            "propertyAccess": "info",
        }),
        code,
        "jQuery",
        0,
    );
    assert_eq!(
        run(code, &[fix]).unwrap(),
        r#"sap.ui.define(["sap/base/Log"], function(Log) { /* keep */ Log.info("x"); });"#
    );
}

#[test]
fn leaves_untouched_resources_out_of_output() {
    let code = "sap.ui.define([\n  'a/A'\n], function (A) {\n  // nothing to do\n  return A;\n});\n";
    let mut input = AutofixInput::default();
    input.resources.insert(
        RESOURCE.to_string(),
        ResourceInput {
            source: Some(code.to_string()),
            findings: vec![Finding {
                rule_id: "no-deprecated-api".to_string(),
                message: "informational only".to_string(),
                line: Some(1),
                column: Some(1),
                fix: None,
            }],
            ..Default::default()
        },
    );
    let output = autofix(&input, &AutofixOptions::default());
    assert!(output.resources.is_empty());
    assert!(output.failures.is_empty());
}

fn empty_check(code: &str, nth: usize) -> FixDescriptor {
    descriptor(
        json!({"type": "callGenerator", "template": "$0 == null"}),
        code,
        "jQuery.sap.isEmpty",
        nth,
    )
}

#[test]
fn parenthesizes_low_precedence_template_arguments() {
    let code = r#"sap.ui.define([], function() { var b = jQuery.sap.isEmpty(a || c); var d = jQuery.sap.isEmpty(e ? f : g); });"#;
    assert_eq!(
        run(code, &[empty_check(code, 0), empty_check(code, 1)]).unwrap(),
        r#"sap.ui.define([], function() { var b = (a || c) == null; var d = (e ? f : g) == null; });"#
    );
}

#[test]
fn keeps_generated_operators_apart_from_neighbours() {
    let code = r#"sap.ui.define([], function() { var b = -jQuery.sap.neg(a); var c = 1 - jQuery.sap.neg(-d); });"#;
    let negate = |nth| {
        descriptor(
            json!({"type": "callGenerator", "template": "-$0"}),
            code,
            "jQuery.sap.neg",
            nth,
        )
    };
    assert_eq!(
        run(code, &[negate(0), negate(1)]).unwrap(),
        r#"sap.ui.define([], function() { var b = - -a; var c = 1 - - -d; });"#
    );
}

#[test]
fn generates_calls_in_class_fields() {
    let code = r#"sap.ui.define([], function() { class C { x = jQuery.sap.isEmpty(a); #y = jQuery.sap.isEmpty(b); } return C; });"#;
    assert_eq!(
        run(code, &[empty_check(code, 0), empty_check(code, 1)]).unwrap(),
        r#"sap.ui.define([], function() { class C { x = a == null; #y = b == null; } return C; });"#
    );
}

#[test]
fn replaces_only_dependency_behind_trailing_comma() {
    let code = r#"sap.ui.define(["a/A",], function(A) { jQuery.sap.log.info("x"); });"#;
    let fixes = [
        descriptor(json!({"type": "obsoleteImport", "moduleName": "a/A"}), code, "\"a/A\"", 0),
        global_access(code, 0, "sap/base/Log", "jQuery.sap.log"),
    ];
    assert_eq!(
        run(code, &fixes).unwrap(),
        r#"sap.ui.define(["sap/base/Log"], function(Log) { Log.info("x"); });"#
    );
}

#[test]
fn leaves_factories_with_surplus_parameters_alone() {
    let code = r#"sap.ui.define(["a/A"], function(A, B) { jQuery.sap.log.info("x"); });"#;
    let fix = global_access(code, 0, "sap/base/Log", "jQuery.sap.log");
    assert_eq!(run(code, &[fix]), None);

    let code = r#"sap.ui.define(["a/A"], function(A, B) { jQuery.sap.log.info("x"); sap.ui.requireSync("a/A"); });"#;
    let fixes = [
        global_access(code, 0, "sap/base/Log", "jQuery.sap.log"),
        descriptor(json!({"type": "requireSync"}), code, "sap.ui.requireSync", 0),
    ];
    assert_eq!(
        run(code, &fixes).unwrap(),
        r#"sap.ui.define(["a/A"], function(A, B) { jQuery.sap.log.info("x"); A; });"#
    );
}

#[test]
fn locates_findings_after_astral_characters() {
    let code = "sap.ui.define([], function() { var s = \"\u{1F600}\"; jQuery.sap.log.info(s); });";
    // The emoji takes four bytes and two UTF-16 code units
    let column = code.find("jQuery").unwrap() - 4 + 2 + 1;
    let fix: FixDescriptor = serde_json::from_value(json!({
        "type": "globalAccess",
        "position": {"line": 1, "column": column},
        "moduleName": "sap/base/Log",
        "accessPath": "jQuery.sap.log",
    }))
    .unwrap();
    assert_eq!(
        run(code, &[fix]).unwrap(),
        "sap.ui.define([\"sap/base/Log\"], function(Log) { var s = \"\u{1F600}\"; Log.info(s); });"
    );
}

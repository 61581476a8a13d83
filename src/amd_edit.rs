//! Text edits on a module declaration: dependency literals and factory
//! parameters are added and removed in place, preserving the surrounding
//! formatting.

use std::collections::BTreeSet;

use crate::change_set::ChangeSet;
use crate::dependency_map::DependencyMap;
use crate::error::{AutofixError, Result};
use crate::identifiers::{default_identifier, UsedIdentifiers};
use crate::imports::DeclarationPlan;
use crate::module_declaration::{FactoryFunction, ModuleDeclaration};
use crate::parse::ParsedSource;
use crate::syntax_list::SeparatedList;
use crate::text::{indentation_at, TextRange};

/// Separator for appending `inserted` to `list` at `at`: the list's own
/// separator, or `", "`. Single-line separators break the line instead when
/// the line would grow beyond `max_line_length`.
fn separator_for(
    source: &ParsedSource,
    list: &SeparatedList,
    at: usize,
    inserted: &[String],
    max_line_length: usize,
) -> String {
    let sep = list.separator(source.text()).unwrap_or_else(|| ", ".to_string());
    if sep.contains('\n') {
        return sep;
    }
    let text = source.text();
    let index = source.line_index();
    let line = &text[index.line_start(at)..index.line_end(text, at)];
    let added: usize = inserted.iter().map(|s| sep.chars().count() + s.chars().count()).sum();
    if line.chars().count() + added > max_line_length {
        format!(",\n{}\t", indentation_at(text, index, at))
    } else {
        sep
    }
}

/// Appends `items` after the last item of `list`. `removed` are the ranges
/// deleted for removed items; when nothing survives, the items go where the
/// last deletion ends.
fn append_to_list(
    source: &ParsedSource,
    list: &SeparatedList,
    removed: &[TextRange],
    items: &[String],
    max_line_length: usize,
    changes: &mut ChangeSet,
) {
    if items.is_empty() {
        return;
    }
    match list.items.last() {
        None => changes.insert(list.open, items.join(", ")),
        Some(_) if removed.len() >= list.len() => {
            let at = removed.iter().map(|r| r.end).max().unwrap_or(list.open);
            changes.insert(at, items.join(", "));
        }
        Some(last) => {
            let sep = separator_for(source, list, last.end, items, max_line_length);
            let text: String = items.iter().map(|item| format!("{sep}{item}")).collect();
            changes.insert(last.end, text);
        }
    }
}

fn edit_dependencies(
    source: &ParsedSource,
    decl: &ModuleDeclaration,
    map: &DependencyMap,
    plan: &DeclarationPlan,
    max_line_length: usize,
    changes: &mut ChangeSet,
) -> Result<()> {
    let literals: Vec<String> = plan
        .new_dependencies
        .iter()
        .map(|d| map.quote_style().quote(&d.module_name))
        .collect();
    match &decl.dependencies {
        Some(array) => {
            if plan.removals.iter().any(|&i| i >= array.list.len()) {
                return Err(AutofixError::invariant("dependency array element not found"));
            }
            let removed = array.list.removal_ranges(&plan.removals);
            for range in &removed {
                changes.delete(*range);
            }
            append_to_list(source, &array.list, &removed, &literals, max_line_length, changes);
        }
        None => {
            if !plan.removals.is_empty() {
                return Err(AutofixError::invariant("dependency array element not found"));
            }
            if literals.is_empty() {
                return Ok(());
            }
            let factory = decl.factory.as_ref().ok_or_else(|| {
                AutofixError::invariant(
                    "cannot determine start position for inserting dependencies",
                )
            })?;
            changes.insert(factory.range.start, format!("[{}], ", literals.join(", ")));
        }
    }
    Ok(())
}

/// Parameter names to append after the existing parameters. Dependencies
/// between the last parameter and a bound one get a placeholder name.
fn parameter_names(
    decl: &ModuleDeclaration,
    plan: &DeclarationPlan,
    used: &mut UsedIdentifiers,
) -> Result<Vec<String>> {
    let params = decl.factory.as_ref().map_or(0, |f| f.params.len());
    let elements = decl.dependencies.as_ref().map_or(&[][..], |d| d.elements.as_slice());
    if params > elements.len() && !plan.new_dependencies.is_empty() {
        return Err(AutofixError::invariant(format!(
            "factory declares {params} parameters for {} dependencies",
            elements.len()
        )));
    }
    // `None` marks an unbound dependency that only needs a placeholder
    let mut slots: Vec<(usize, Option<String>)> = Vec::new();
    for index in params..elements.len() {
        if plan.removals.contains(&index) {
            continue;
        }
        slots.push((index, plan.bind_existing.get(&index).cloned()));
    }
    slots.extend(
        plan.new_dependencies
            .iter()
            .map(|d| (usize::MAX, Some(d.identifier.clone()))),
    );
    while slots.last().is_some_and(|(_, name)| name.is_none()) {
        slots.pop();
    }
    Ok(slots
        .into_iter()
        .map(|(index, name)| {
            name.unwrap_or_else(|| {
                let preferred = elements
                    .get(index)
                    .and_then(|e| e.literal.as_ref())
                    .map_or_else(|| "dependency".to_string(), |l| default_identifier(&l.value));
                used.claim(&preferred)
            })
        })
        .collect())
}

fn edit_parameters(
    source: &ParsedSource,
    factory: &FactoryFunction,
    removed: &BTreeSet<usize>,
    names: &[String],
    max_line_length: usize,
    changes: &mut ChangeSet,
) -> Result<()> {
    if !names.is_empty() && factory.params.last().is_some_and(|p| p.is_rest) {
        return Err(AutofixError::invariant("cannot add parameters after a rest parameter"));
    }
    if !factory.parenthesized {
        // `x => ...` has exactly one parameter
        let Some(param) = factory.params.first() else {
            return Err(AutofixError::invariant("arrow function without parameter list"));
        };
        if removed.contains(&0) {
            changes.replace(param.range, format!("({})", names.join(", ")));
        } else if !names.is_empty() {
            changes.insert(param.range.start, "(");
            changes.insert(param.range.end, format!(", {})", names.join(", ")));
        }
        return Ok(());
    }
    let list = factory
        .list
        .as_ref()
        .ok_or_else(|| AutofixError::invariant("SyntaxList not found in factory function"))?;
    let removed_ranges = list.removal_ranges(removed);
    for range in &removed_ranges {
        changes.delete(*range);
    }
    append_to_list(source, list, &removed_ranges, names, max_line_length, changes);
    Ok(())
}

/// Emits the edits `plan` requires for `decl`.
pub fn edit_declaration(
    source: &ParsedSource,
    decl: &ModuleDeclaration,
    map: &DependencyMap,
    plan: &DeclarationPlan,
    used: &mut UsedIdentifiers,
    max_line_length: usize,
    changes: &mut ChangeSet,
) -> Result<()> {
    if plan.is_empty() {
        return Ok(());
    }
    edit_dependencies(source, decl, map, plan, max_line_length, changes)?;

    let params = decl.factory.as_ref().map_or(0, |f| f.params.len());
    let removed: BTreeSet<usize> = plan.removals.iter().copied().filter(|&i| i < params).collect();
    let names = parameter_names(decl, plan, used)?;
    if names.is_empty() && removed.is_empty() {
        return Ok(());
    }
    let factory = decl
        .factory
        .as_ref()
        .ok_or_else(|| AutofixError::invariant("module declaration has no factory function"))?;
    edit_parameters(source, factory, &removed, &names, max_line_length, changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imports::NewDependency;
    use crate::module_declaration::collect_amd_calls;
    use crate::parse::parse_source;

    fn edit(code: &str, plan: DeclarationPlan, max_line_length: usize) -> Result<String> {
        let source = parse_source("/resources/my/app/Main.js", code, "/resources/").unwrap();
        let calls = collect_amd_calls(&source);
        let decl = &calls.declarations[0];
        let map = DependencyMap::build(decl.dependencies.as_ref(), source.module_name());
        let mut used = UsedIdentifiers::collect(source.program());
        let mut changes = ChangeSet::new();
        edit_declaration(&source, decl, &map, &plan, &mut used, max_line_length, &mut changes)?;
        changes.apply(source.text())
    }

    fn new_dependency(module: &str, identifier: &str) -> DeclarationPlan {
        DeclarationPlan {
            new_dependencies: vec![NewDependency {
                module_name: module.to_string(),
                identifier: identifier.to_string(),
            }],
            ..Default::default()
        }
    }

    fn removal(indices: &[usize]) -> DeclarationPlan {
        DeclarationPlan {
            removals: indices.iter().copied().collect(),
            ..Default::default()
        }
    }

    #[test]
    fn appends_dependency_and_parameter() {
        let code = r#"sap.ui.define(["sap/m/Button"], function(Button) {});"#;
        assert_eq!(
            edit(code, new_dependency("sap/base/Log", "Log"), 200).unwrap(),
            r#"sap.ui.define(["sap/m/Button", "sap/base/Log"], function(Button, Log) {});"#
        );
    }

    #[test]
    fn fills_empty_lists_and_missing_arrays() {
        let code = "sap.ui.define([], function() {});";
        assert_eq!(
            edit(code, new_dependency("sap/base/Log", "Log"), 200).unwrap(),
            r#"sap.ui.define(["sap/base/Log"], function(Log) {});"#
        );
        let code = "sap.ui.define(function() {});";
        assert_eq!(
            edit(code, new_dependency("sap/base/Log", "Log"), 200).unwrap(),
            r#"sap.ui.define(["sap/base/Log"], function(Log) {});"#
        );
    }

    #[test]
    fn keeps_quote_style_and_separator() {
        let code = "sap.ui.define([\n\t'a/A',\n\t'a/B',\n\t'a/C'\n], function(A,\n\tB, C) {});";
        assert_eq!(
            edit(code, new_dependency("sap/base/Log", "Log"), 200).unwrap(),
            "sap.ui.define([\n\t'a/A',\n\t'a/B',\n\t'a/C',\n\t'sap/base/Log'\n], function(A,\n\tB, C, Log) {});"
        );
    }

    #[test]
    fn names_skipped_dependencies() {
        let code = r#"sap.ui.define(["a/A", "sap/ui/thirdparty/jquery"], function(A) {});"#;
        assert_eq!(
            edit(code, new_dependency("sap/base/Log", "Log"), 200).unwrap(),
            r#"sap.ui.define(["a/A", "sap/ui/thirdparty/jquery", "sap/base/Log"], function(A, jquery, Log) {});"#
        );
    }

    #[test]
    fn wraps_long_lines() {
        let code = r#"sap.ui.define(["a/A"], function(A) {});"#;
        assert_eq!(
            edit(code, new_dependency("a/B", "B"), 30).unwrap(),
            "sap.ui.define([\"a/A\",\n\t\"a/B\"], function(A,\n\tB) {});"
        );
    }

    #[test]
    fn removes_dependencies_with_their_parameters() {
        let code = r#"sap.ui.define(["a/A", "a/B", "a/C"], function(A, B, C) {});"#;
        assert_eq!(
            edit(code, removal(&[1]), 200).unwrap(),
            r#"sap.ui.define(["a/A", "a/C"], function(A, C) {});"#
        );
        assert_eq!(
            edit(code, removal(&[2]), 200).unwrap(),
            r#"sap.ui.define(["a/A", "a/B"], function(A, B) {});"#
        );
        assert_eq!(
            edit(code, removal(&[0, 1, 2]), 200).unwrap(),
            "sap.ui.define([], function() {});"
        );
    }

    #[test]
    fn replaces_removed_arrow_parameter() {
        let code = r#"sap.ui.define(["a/A"], A => {});"#;
        let mut plan = removal(&[0]);
        plan.new_dependencies.push(NewDependency {
            module_name: "a/B".to_string(),
            identifier: "B".to_string(),
        });
        assert_eq!(
            edit(code, plan, 200).unwrap(),
            r#"sap.ui.define(["a/B"], (B) => {});"#
        );
        assert_eq!(
            edit(code, new_dependency("a/B", "B"), 200).unwrap(),
            r#"sap.ui.define(["a/A", "a/B"], (A, B) => {});"#
        );
    }

    #[test]
    fn refills_list_emptied_up_to_trailing_comma() {
        let code = r#"sap.ui.define(["a/A",], function(A,) {});"#;
        let mut plan = removal(&[0]);
        plan.new_dependencies.push(NewDependency {
            module_name: "sap/base/Log".to_string(),
            identifier: "Log".to_string(),
        });
        assert_eq!(
            edit(code, plan, 200).unwrap(),
            r#"sap.ui.define(["sap/base/Log"], function(Log) {});"#
        );
    }

    #[test]
    fn rejects_rest_parameters() {
        let code = r#"sap.ui.define(["a/A"], function(...deps) {});"#;
        let err = edit(code, new_dependency("a/B", "B"), 200).unwrap_err();
        assert!(matches!(err, AutofixError::Invariant { .. }));
    }
}

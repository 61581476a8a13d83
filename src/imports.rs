//! Decides, for every module a fix needs, which identifier provides it and
//! which declarations must gain or lose dependencies.
//!
//! Existing imports are reused first: a request is served by the innermost
//! enclosing declaration that already lists the module. Requests that no
//! enclosing declaration can serve add a new dependency. When several nested
//! declarations need the same new module, the import is placed once in their
//! outermost common declaration.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

use crate::dependency_map::DependencyMap;
use crate::error::{AutofixError, Result};
use crate::fix::{Fix, ImportRequest};
use crate::identifiers::{default_identifier, UsedIdentifiers};
use crate::module_declaration::ModuleDeclaration;
use crate::text::TextRange;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDependency {
    pub module_name: String,
    pub identifier: String,
}

/// Edits planned for one module declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclarationPlan {
    /// Parameters to add for existing dependencies that have none, by
    /// dependency index.
    pub bind_existing: BTreeMap<usize, String>,
    /// Dependencies appended to the array, in order.
    pub new_dependencies: Vec<NewDependency>,
    /// Dependency indices to delete together with their parameters.
    pub removals: BTreeSet<usize>,
}

impl DeclarationPlan {
    pub fn is_empty(&self) -> bool {
        self.bind_existing.is_empty()
            && self.new_dependencies.is_empty()
            && self.removals.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct ImportResolution {
    /// Plans keyed by declaration index.
    pub plans: BTreeMap<usize, DeclarationPlan>,
    /// `(fix index, module name, identifier)` for every served request.
    pub identifiers: Vec<(usize, String, String)>,
    /// Fixes that cannot be applied.
    pub dropped: BTreeSet<usize>,
}

impl ImportResolution {
    fn plan(&mut self, decl: usize) -> &mut DeclarationPlan {
        self.plans.entry(decl).or_default()
    }

    fn drop_fix(&mut self, fix: usize, reason: &str) {
        debug!(fix, reason, "dropping fix");
        self.dropped.insert(fix);
    }
}

fn ends_with_rest(decl: &ModuleDeclaration) -> bool {
    decl.factory
        .as_ref()
        .and_then(|f| f.params.last())
        .is_some_and(|p| p.is_rest)
}

/// Whether new parameters can be appended to the factory: no rest
/// parameter and no parameter without a matching dependency.
fn accepts_new_parameters(decl: &ModuleDeclaration) -> bool {
    let params = decl.factory.as_ref().map_or(0, |f| f.params.len());
    let dependencies = decl.dependencies.as_ref().map_or(0, |d| d.elements.len());
    !ends_with_rest(decl) && params <= dependencies
}

/// Declarations whose factory body contains `offset`, innermost first.
fn containing_declarations(declarations: &[ModuleDeclaration], offset: usize) -> Vec<usize> {
    let mut found: Vec<(usize, TextRange)> = declarations
        .iter()
        .enumerate()
        .filter_map(|(i, d)| d.body().filter(|b| b.contains_offset(offset)).map(|b| (i, b)))
        .collect();
    found.sort_by_key(|(i, body)| (body.len(), *i));
    found.into_iter().map(|(i, _)| i).collect()
}

/// Parent of each declaration: the innermost other declaration whose body
/// contains it.
fn declaration_parents(declarations: &[ModuleDeclaration]) -> Vec<Option<usize>> {
    declarations
        .iter()
        .enumerate()
        .map(|(i, decl)| {
            declarations
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .filter_map(|(j, other)| {
                    other
                        .body()
                        .filter(|b| b.contains(decl.range))
                        .map(|b| (b.len(), j))
                })
                .min()
                .map(|(_, j)| j)
        })
        .collect()
}

fn ancestors(parents: &[Option<usize>], decl: usize) -> Vec<usize> {
    let mut chain = vec![decl];
    let mut current = decl;
    while let Some(parent) = parents[current] {
        chain.push(parent);
        current = parent;
    }
    chain
}

fn mark_removals(
    declarations: &[ModuleDeclaration],
    fixes: &[Box<dyn Fix>],
    resolution: &mut ImportResolution,
    owners: &mut HashMap<(usize, usize), usize>,
) {
    for (fix_idx, fix) in fixes.iter().enumerate() {
        let Some(obsolete) = fix.obsolete_import() else {
            continue;
        };
        let found = declarations.iter().enumerate().find_map(|(d, decl)| {
            decl.dependencies.as_ref()?.elements.iter().position(|e| {
                e.literal.as_ref().is_some_and(|l| l.range == obsolete.literal)
            }).map(|index| (d, index))
        });
        let Some((d, index)) = found else {
            resolution.drop_fix(fix_idx, "literal is not part of a dependency array");
            continue;
        };
        let decl = &declarations[d];
        let blocked = match decl.parameter(index) {
            Some(param) => param.referenced || param.name.is_none() || param.is_rest,
            None => ends_with_rest(decl),
        };
        if blocked {
            resolution.drop_fix(fix_idx, "dependency is still in use");
            continue;
        }
        if owners.insert((d, index), fix_idx).is_some() {
            resolution.drop_fix(fix_idx, "dependency is already being removed");
            continue;
        }
        resolution.plan(d).removals.insert(index);
    }
}

/// Serves requests from dependencies already declared by an enclosing
/// declaration. Returns the requests that need a new dependency.
fn reuse_existing(
    declarations: &[ModuleDeclaration],
    maps: &[DependencyMap],
    requests: Vec<(usize, ImportRequest)>,
    used: &mut UsedIdentifiers,
    resolution: &mut ImportResolution,
    owners: &mut HashMap<(usize, usize), usize>,
) -> Vec<(usize, ImportRequest, Vec<usize>)> {
    let mut unresolved = Vec::new();
    'requests: for (fix_idx, request) in requests {
        if resolution.dropped.contains(&fix_idx) {
            continue;
        }
        let containing = containing_declarations(declarations, request.position);
        for &d in &containing {
            let Some(entry) = maps[d].get(&request.module_name) else {
                continue;
            };
            let index = entry.index;
            if let Some(owner) = owners.remove(&(d, index)) {
                resolution.plan(d).removals.remove(&index);
                resolution.drop_fix(owner, "dependency is needed by another fix");
            }
            let decl = &declarations[d];
            let identifier = match decl.parameter(index) {
                Some(param) => match (&param.name, param.is_rest) {
                    (Some(name), false) => name.clone(),
                    _ => {
                        resolution.drop_fix(fix_idx, "dependency is bound to a pattern");
                        continue 'requests;
                    }
                },
                None if ends_with_rest(decl) => {
                    resolution.drop_fix(fix_idx, "dependency is collected by a rest parameter");
                    continue 'requests;
                }
                None => {
                    let preferred = request
                        .preferred_identifier
                        .clone()
                        .unwrap_or_else(|| default_identifier(&request.module_name));
                    resolution
                        .plan(d)
                        .bind_existing
                        .entry(index)
                        .or_insert_with(|| used.claim(&preferred))
                        .clone()
                }
            };
            resolution
                .identifiers
                .push((fix_idx, request.module_name.clone(), identifier));
            continue 'requests;
        }
        unresolved.push((fix_idx, request, containing));
    }
    unresolved
}

/// Chooses the declaration that receives a new dependency for each request
/// of one module. A requester moves up to the outermost ancestor that is
/// shared with another requester and can take a new parameter.
fn hoist_targets(parents: &[Option<usize>], homes: &[usize], eligible: &[bool]) -> Vec<usize> {
    let requesters: BTreeSet<usize> = homes.iter().copied().collect();
    let on_path: BTreeSet<usize> = homes.iter().flat_map(|&h| ancestors(parents, h)).collect();
    let mut children_on_path: HashMap<usize, usize> = HashMap::new();
    for &node in &on_path {
        if let Some(parent) = parents[node] {
            *children_on_path.entry(parent).or_default() += 1;
        }
    }
    let units = |node: usize| {
        usize::from(requesters.contains(&node)) + children_on_path.get(&node).copied().unwrap_or(0)
    };
    homes
        .iter()
        .map(|&home| {
            ancestors(parents, home)
                .into_iter()
                .filter(|&a| units(a) >= 2 && eligible[a])
                .last()
                .unwrap_or(home)
        })
        .collect()
}

fn add_new_imports(
    declarations: &[ModuleDeclaration],
    unresolved: Vec<(usize, ImportRequest, Vec<usize>)>,
    used: &mut UsedIdentifiers,
    resolution: &mut ImportResolution,
) -> Result<()> {
    let parents = declaration_parents(declarations);
    let eligible: Vec<bool> = declarations.iter().map(accepts_new_parameters).collect();
    // module name -> (fix, request, innermost containing declaration)
    let mut groups: Vec<(String, Vec<(usize, ImportRequest, usize)>)> = Vec::new();
    for (fix_idx, request, containing) in unresolved {
        if resolution.dropped.contains(&fix_idx) {
            continue;
        }
        if request.blocks_new_import {
            resolution.drop_fix(fix_idx, "probing access cannot add an import");
            continue;
        }
        let Some(&home) = containing.first() else {
            return Err(AutofixError::not_implemented(format!(
                "global access without module declaration ({})",
                request.module_name
            )));
        };
        if ends_with_rest(&declarations[home]) {
            resolution.drop_fix(fix_idx, "factory ends with a rest parameter");
            continue;
        }
        if !accepts_new_parameters(&declarations[home]) {
            resolution.drop_fix(fix_idx, "factory declares parameters without dependencies");
            continue;
        }
        match groups.iter_mut().find(|(m, _)| *m == request.module_name) {
            Some((_, members)) => members.push((fix_idx, request, home)),
            None => groups.push((request.module_name.clone(), vec![(fix_idx, request, home)])),
        }
    }

    for (module_name, members) in groups {
        let homes: Vec<usize> = members.iter().map(|(_, _, home)| *home).collect();
        let targets = hoist_targets(&parents, &homes, &eligible);
        let mut assigned: BTreeMap<usize, String> = BTreeMap::new();
        for ((fix_idx, request, _), target) in members.into_iter().zip(targets) {
            let identifier = match assigned.get(&target) {
                Some(identifier) => identifier.clone(),
                None => {
                    let preferred = request
                        .preferred_identifier
                        .clone()
                        .unwrap_or_else(|| default_identifier(&module_name));
                    let identifier = used.claim(&preferred);
                    resolution.plan(target).new_dependencies.push(NewDependency {
                        module_name: module_name.clone(),
                        identifier: identifier.clone(),
                    });
                    assigned.insert(target, identifier.clone());
                    identifier
                }
            };
            resolution
                .identifiers
                .push((fix_idx, module_name.clone(), identifier));
        }
    }
    Ok(())
}

/// Resolves the import requests and obsolete imports of all `fixes`.
///
/// `maps[i]` must be the dependency map of `declarations[i]`, and
/// declarations must be in source order.
pub fn resolve_imports(
    declarations: &[ModuleDeclaration],
    maps: &[DependencyMap],
    fixes: &[Box<dyn Fix>],
    used: &mut UsedIdentifiers,
) -> Result<ImportResolution> {
    let mut resolution = ImportResolution::default();
    let mut owners = HashMap::new();
    mark_removals(declarations, fixes, &mut resolution, &mut owners);

    let mut requests: Vec<(usize, ImportRequest)> = fixes
        .iter()
        .enumerate()
        .flat_map(|(i, fix)| fix.import_requests().into_iter().map(move |r| (i, r)))
        .collect();
    requests.sort_by_key(|(i, r)| (r.position, *i));

    let unresolved =
        reuse_existing(declarations, maps, requests, used, &mut resolution, &mut owners);
    add_new_imports(declarations, unresolved, used, &mut resolution)?;

    let dropped = resolution.dropped.clone();
    resolution.identifiers.retain(|(fix, _, _)| !dropped.contains(fix));
    resolution.plans.retain(|_, plan| !plan.is_empty());
    Ok(resolution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module_declaration::collect_amd_calls;
    use crate::parse::{parse_source, ParsedSource};

    fn request(module: &str, position: usize) -> ImportRequest {
        ImportRequest {
            module_name: module.to_string(),
            preferred_identifier: None,
            position,
            blocks_new_import: false,
        }
    }

    #[derive(Debug)]
    struct Requesting(Vec<ImportRequest>);

    impl Fix for Requesting {
        fn name(&self) -> &'static str {
            "requesting"
        }
        fn position(&self) -> crate::text::Position {
            crate::text::Position::new(1, 1)
        }
        fn allowed_kinds(&self) -> &[crate::syntax::NodeKind] {
            &[]
        }
        fn visit_node(
            &mut self,
            _node: &swc_core::ecma::ast::Expr,
            _ctx: &crate::node_search::MatchContext<'_>,
        ) -> bool {
            false
        }
        fn affected_range(&self) -> Option<TextRange> {
            None
        }
        fn import_requests(&self) -> Vec<ImportRequest> {
            self.0.clone()
        }
        fn generate_changes(
            &self,
            _source: &ParsedSource,
            _changes: &mut crate::change_set::ChangeSet,
        ) -> Result<()> {
            Ok(())
        }
    }

    fn resolve(code: &str, fixes: Vec<Box<dyn Fix>>) -> Result<ImportResolution> {
        let source = parse_source("/resources/my/app/Main.js", code, "/resources/").unwrap();
        let calls = collect_amd_calls(&source);
        let maps: Vec<DependencyMap> = calls
            .declarations
            .iter()
            .map(|d| DependencyMap::build(d.dependencies.as_ref(), source.module_name()))
            .collect();
        let mut used = UsedIdentifiers::collect(source.program());
        resolve_imports(&calls.declarations, &maps, &fixes, &mut used)
    }

    fn at(code: &str, needle: &str) -> usize {
        code.find(needle).unwrap()
    }

    #[test]
    fn reuses_existing_parameter() {
        let code = r#"sap.ui.define(["sap/base/Log"], function(Logger) { x; });"#;
        let fixes: Vec<Box<dyn Fix>> =
            vec![Box::new(Requesting(vec![request("sap/base/Log", at(code, "x;"))]))];
        let resolution = resolve(code, fixes).unwrap();
        assert!(resolution.plans.is_empty());
        assert_eq!(
            resolution.identifiers,
            vec![(0, "sap/base/Log".to_string(), "Logger".to_string())]
        );
    }

    #[test]
    fn binds_dependency_without_parameter() {
        let code = r#"sap.ui.define(["a/B", "sap/base/Log"], function(B) { x; y; });"#;
        let fixes: Vec<Box<dyn Fix>> = vec![
            Box::new(Requesting(vec![request("sap/base/Log", at(code, "x;"))])),
            Box::new(Requesting(vec![request("sap/base/Log", at(code, "y;"))])),
        ];
        let resolution = resolve(code, fixes).unwrap();
        let plan = &resolution.plans[&0];
        assert_eq!(plan.bind_existing.get(&1).map(String::as_str), Some("Log"));
        assert!(plan.new_dependencies.is_empty());
        assert_eq!(resolution.identifiers.len(), 2);
        assert!(resolution.identifiers.iter().all(|(_, _, id)| id == "Log"));
    }

    #[test]
    fn adds_new_dependency_with_free_name() {
        let code = r#"sap.ui.define([], function() { var Log; x; });"#;
        let fixes: Vec<Box<dyn Fix>> =
            vec![Box::new(Requesting(vec![request("sap/base/Log", at(code, "x;"))]))];
        let resolution = resolve(code, fixes).unwrap();
        assert_eq!(
            resolution.plans[&0].new_dependencies,
            vec![NewDependency {
                module_name: "sap/base/Log".to_string(),
                identifier: "Log1".to_string(),
            }]
        );
    }

    #[test]
    fn hoists_shared_imports_to_common_declaration() {
        let code = r#"sap.ui.define([], function() {
    sap.ui.require([], function() { a; });
    sap.ui.require([], function() { b; });
    sap.ui.require([], function() { c; });
});"#;
        let fixes: Vec<Box<dyn Fix>> = vec![
            Box::new(Requesting(vec![request("sap/base/Log", at(code, "a;"))])),
            Box::new(Requesting(vec![request("sap/base/Log", at(code, "b;"))])),
            Box::new(Requesting(vec![request("sap/m/Text", at(code, "c;"))])),
        ];
        let resolution = resolve(code, fixes).unwrap();
        assert_eq!(resolution.plans[&0].new_dependencies.len(), 1);
        assert_eq!(resolution.plans[&0].new_dependencies[0].module_name, "sap/base/Log");
        assert_eq!(resolution.plans[&3].new_dependencies[0].module_name, "sap/m/Text");
        assert!(!resolution.plans.contains_key(&1));
    }

    #[test]
    fn skips_factories_with_surplus_parameters() {
        let code = r#"sap.ui.define(["a/A"], function(A, B) { x; });"#;
        let fixes: Vec<Box<dyn Fix>> =
            vec![Box::new(Requesting(vec![request("sap/base/Log", at(code, "x;"))]))];
        let resolution = resolve(code, fixes).unwrap();
        assert!(resolution.plans.is_empty());
        assert!(resolution.dropped.contains(&0));
    }

    #[test]
    fn never_hoists_into_factories_that_cannot_grow() {
        let code = r#"sap.ui.define([], function(...rest) {
    sap.ui.require([], function() { a; });
    sap.ui.require([], function() { b; });
});"#;
        let fixes: Vec<Box<dyn Fix>> = vec![
            Box::new(Requesting(vec![request("sap/base/Log", at(code, "a;"))])),
            Box::new(Requesting(vec![request("sap/base/Log", at(code, "b;"))])),
        ];
        let resolution = resolve(code, fixes).unwrap();
        assert!(!resolution.plans.contains_key(&0));
        assert_eq!(resolution.plans[&1].new_dependencies[0].identifier, "Log");
        assert_eq!(resolution.plans[&2].new_dependencies[0].identifier, "Log1");
        assert!(resolution.dropped.is_empty());
    }

    #[test]
    fn sibling_declarations_import_separately() {
        let code = r#"sap.ui.define([], function() { a; });
sap.ui.define([], function() { b; });"#;
        let fixes: Vec<Box<dyn Fix>> = vec![
            Box::new(Requesting(vec![request("sap/base/Log", at(code, "a;"))])),
            Box::new(Requesting(vec![request("sap/base/Log", at(code, "b;"))])),
        ];
        let resolution = resolve(code, fixes).unwrap();
        assert_eq!(resolution.plans.len(), 2);
        assert_eq!(resolution.plans[&0].new_dependencies[0].identifier, "Log");
        assert_eq!(resolution.plans[&1].new_dependencies[0].identifier, "Log1");
    }

    #[test]
    fn probing_requests_never_add_imports() {
        let code = r#"sap.ui.define([], function() { a; });"#;
        let mut probe = request("sap/base/Log", at(code, "a;"));
        probe.blocks_new_import = true;
        let resolution = resolve(code, vec![Box::new(Requesting(vec![probe]))]).unwrap();
        assert!(resolution.plans.is_empty());
        assert!(resolution.dropped.contains(&0));
    }

    #[test]
    fn requests_outside_declarations_are_not_supported() {
        let code = "a;";
        let fixes: Vec<Box<dyn Fix>> = vec![Box::new(Requesting(vec![request("sap/base/Log", 0)]))];
        let err = resolve(code, fixes).unwrap_err();
        assert!(matches!(err, AutofixError::NotImplemented { .. }));
    }
}

//! Per-resource driver: parse, match fixes, merge imports, apply changes.

use rayon::prelude::*;
use std::fs;
use tracing::{debug, info, warn};

use crate::amd_edit::edit_declaration;
use crate::change_set::ChangeSet;
use crate::config::AutofixOptions;
use crate::dependency_map::DependencyMap;
use crate::error::Result;
use crate::fix::{from_descriptor, Fix};
use crate::identifiers::UsedIdentifiers;
use crate::imports::resolve_imports;
use crate::model::{AutofixInput, AutofixOutput, FixDescriptor, ResourceFailure, ResourceInput};
use crate::module_declaration::collect_amd_calls;
use crate::node_search::{match_fixes, remove_conflicting_fixes};
use crate::parse::{parse_source, ParsedSource};

/// Runs `prepare` on every fix. Fixes failing with a local error are
/// dropped; any other error aborts the resource.
fn prepare_fixes(source: &ParsedSource, fixes: Vec<Box<dyn Fix>>) -> Result<Vec<Box<dyn Fix>>> {
    let mut prepared = Vec::with_capacity(fixes.len());
    for mut fix in fixes {
        match fix.prepare(source) {
            Ok(()) => prepared.push(fix),
            Err(err) if err.is_local() => debug!(
                resource = source.resource_path(),
                fix = fix.name(),
                error = %err,
                "skipping fix"
            ),
            Err(err) => return Err(err),
        }
    }
    Ok(prepared)
}

/// Applies the fixes described by `descriptors` to `text`.
///
/// Returns `None` when nothing changed.
pub fn fix_resource(
    resource_path: &str,
    text: &str,
    descriptors: &[FixDescriptor],
    options: &AutofixOptions,
) -> Result<Option<String>> {
    if descriptors.is_empty() {
        return Ok(None);
    }
    let source = parse_source(resource_path, text, &options.resource_prefix)?;
    let calls = collect_amd_calls(&source);

    let fixes = descriptors.iter().map(from_descriptor).collect();
    let fixes = match_fixes(&source, fixes);
    let fixes = prepare_fixes(&source, fixes)?;
    let mut fixes = remove_conflicting_fixes(fixes);
    if fixes.is_empty() {
        return Ok(None);
    }

    let maps: Vec<DependencyMap> = calls
        .declarations
        .iter()
        .map(|d| DependencyMap::build(d.dependencies.as_ref(), source.module_name()))
        .collect();
    let mut used = UsedIdentifiers::collect(source.program());
    let resolution = resolve_imports(&calls.declarations, &maps, &fixes, &mut used)?;
    for (fix_idx, module_name, identifier) in &resolution.identifiers {
        fixes[*fix_idx].set_identifier_for_dependency(module_name, identifier);
    }

    let mut changes = ChangeSet::new();
    for (&decl_idx, plan) in &resolution.plans {
        edit_declaration(
            &source,
            &calls.declarations[decl_idx],
            &maps[decl_idx],
            plan,
            &mut used,
            options.max_line_length,
            &mut changes,
        )?;
    }
    for (fix_idx, fix) in fixes.iter().enumerate() {
        if !resolution.dropped.contains(&fix_idx) {
            fix.generate_changes(&source, &mut changes)?;
        }
    }
    if changes.is_empty() {
        return Ok(None);
    }

    let mut output = changes.apply(source.text())?;
    if source.has_bom() {
        output.insert(0, '\u{feff}');
    }
    Ok((output != text).then_some(output))
}

fn process_resource(
    path: &str,
    resource: &ResourceInput,
    options: &AutofixOptions,
) -> Result<Option<String>> {
    let text = match (&resource.source, &resource.file) {
        (Some(source), _) => source.clone(),
        (None, Some(file)) => fs::read_to_string(file)?,
        (None, None) => return Ok(None),
    };
    let descriptors: Vec<FixDescriptor> = resource
        .findings
        .iter()
        .filter_map(|finding| finding.fix.clone())
        .collect();
    fix_resource(path, &text, &descriptors, options)
}

/// Fixes every resource of `input`. A failing resource is reported in
/// [`AutofixOutput::failures`] and keeps its original content.
pub fn autofix(input: &AutofixInput, options: &AutofixOptions) -> AutofixOutput {
    let run = |(path, resource): (&String, &ResourceInput)| {
        (path.clone(), process_resource(path, resource, options))
    };
    let results: Vec<(String, Result<Option<String>>)> = if options.parallel {
        input.resources.par_iter().map(run).collect()
    } else {
        input.resources.iter().map(run).collect()
    };

    let mut output = AutofixOutput::default();
    for (resource, result) in results {
        match result {
            Ok(Some(text)) => {
                info!(resource = %resource, "fixed resource");
                output.resources.insert(resource, text);
            }
            Ok(None) => debug!(resource = %resource, "no changes"),
            Err(err) => {
                warn!(resource = %resource, error = %err, "autofix failed");
                output.failures.push(ResourceFailure {
                    resource,
                    message: err.to_string(),
                });
            }
        }
    }
    output
}

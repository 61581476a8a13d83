//! Fixes: one proposed rewrite per lint finding.
//!
//! A fix is matched against the syntax tree by [`crate::node_search`], may
//! request module imports, and finally emits change-set entries.

mod call_expression;
mod call_generator;
mod global_access;
mod obsolete_import;
mod require_sync;

pub use call_expression::CallExpressionFix;
pub use call_generator::CallGeneratorFix;
pub use global_access::GlobalAccessFix;
pub use obsolete_import::ObsoleteImportFix;
pub use require_sync::RequireSyncFix;

use std::fmt;
use swc_core::ecma::ast::Expr;

use crate::change_set::ChangeSet;
use crate::error::Result;
use crate::model::FixDescriptor;
use crate::node_search::MatchContext;
use crate::parse::ParsedSource;
use crate::syntax::NodeKind;
use crate::text::{Position, TextRange};

/// A module that must be available under some identifier at `position`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    pub module_name: String,
    pub preferred_identifier: Option<String>,
    /// Usage offset; decides which module declaration serves the request.
    pub position: usize,
    /// Set for probing accesses, which may reuse an import but must not add one.
    pub blocks_new_import: bool,
}

/// A dependency literal to drop from its module declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObsoleteImport {
    pub module_name: String,
    pub literal: TextRange,
}

pub trait Fix: fmt::Debug + Send {
    fn name(&self) -> &'static str;

    /// 1-based start of the node this fix targets.
    fn position(&self) -> Position;

    fn allowed_kinds(&self) -> &[NodeKind];

    /// Called for every node starting at the fix position whose kind is
    /// allowed. Returns `true` to claim the node.
    fn visit_node(&mut self, node: &Expr, ctx: &MatchContext<'_>) -> bool;

    /// Runs once after matching. A local error drops only this fix.
    fn prepare(&mut self, _source: &ParsedSource) -> Result<()> {
        Ok(())
    }

    /// Range of original text this fix rewrites.
    fn affected_range(&self) -> Option<TextRange>;

    fn import_requests(&self) -> Vec<ImportRequest> {
        Vec::new()
    }

    fn set_identifier_for_dependency(&mut self, _module_name: &str, _identifier: &str) {}

    fn obsolete_import(&self) -> Option<ObsoleteImport> {
        None
    }

    /// Whether this fix wins over another fix touching `other`.
    fn supersedes(&self, _other: TextRange) -> bool {
        false
    }

    fn generate_changes(&self, source: &ParsedSource, changes: &mut ChangeSet) -> Result<()>;
}

pub fn from_descriptor(descriptor: &FixDescriptor) -> Box<dyn Fix> {
    match descriptor {
        FixDescriptor::GlobalAccess(data) => Box::new(GlobalAccessFix::new(data.clone())),
        FixDescriptor::CallExpression(data) => Box::new(CallExpressionFix::new(data.clone())),
        FixDescriptor::CallGenerator(data) => Box::new(CallGeneratorFix::new(data.clone())),
        FixDescriptor::RequireSync(data) => Box::new(RequireSyncFix::new(data.clone())),
        FixDescriptor::ObsoleteImport(data) => Box::new(ObsoleteImportFix::new(data.clone())),
    }
}

/// `identifier` followed by an optional member access (`info` or `.info`).
pub(crate) fn access_text(identifier: &str, property_access: Option<&str>) -> String {
    match property_access.map(|p| p.trim_start_matches('.')).filter(|p| !p.is_empty()) {
        Some(property) => format!("{identifier}.{property}"),
        None => identifier.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_access_text() {
        assert_eq!(access_text("Log", None), "Log");
        assert_eq!(access_text("Log", Some("info")), "Log.info");
        assert_eq!(access_text("Log", Some(".info")), "Log.info");
        assert_eq!(access_text("Log", Some("")), "Log");
    }
}

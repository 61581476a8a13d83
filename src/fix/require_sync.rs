use swc_core::ecma::ast::Expr;

use super::{Fix, ImportRequest};
use crate::change_set::ChangeSet;
use crate::comments::lost_comments;
use crate::dependency_map::resolve_module_name;
use crate::error::{AutofixError, Result};
use crate::identifiers::default_identifier;
use crate::model::RequireSyncFixData;
use crate::module_declaration::parse_require;
use crate::node_search::MatchContext;
use crate::parse::ParsedSource;
use crate::syntax::{AmdCallee, NodeKind};
use crate::text::{Position, TextRange};

/// Replaces `sap.ui.requireSync("x")` or `sap.ui.require("x")` by the
/// identifier bound to module `x`.
#[derive(Debug)]
pub struct RequireSyncFix {
    data: RequireSyncFixData,
    allowed_kinds: Vec<NodeKind>,
    range: Option<TextRange>,
    module_name: Option<String>,
    probing: bool,
    identifier: Option<String>,
}

impl RequireSyncFix {
    pub fn new(data: RequireSyncFixData) -> Self {
        let allowed_kinds = data
            .allowed_kinds
            .clone()
            .unwrap_or_else(|| vec![NodeKind::CallExpression]);
        Self {
            data,
            allowed_kinds,
            range: None,
            module_name: None,
            probing: false,
            identifier: None,
        }
    }
}

impl Fix for RequireSyncFix {
    fn name(&self) -> &'static str {
        "requireSync"
    }

    fn position(&self) -> Position {
        self.data.position
    }

    fn allowed_kinds(&self) -> &[NodeKind] {
        &self.allowed_kinds
    }

    fn visit_node(&mut self, node: &Expr, ctx: &MatchContext<'_>) -> bool {
        let Expr::Call(call) = node else {
            return false;
        };
        let Some(callee @ (AmdCallee::Require | AmdCallee::RequireSync)) =
            AmdCallee::of_call(call)
        else {
            return false;
        };
        let Ok(require) = parse_require(call, callee, ctx.source) else {
            return false;
        };
        let Some(literal) = require.module_name.filter(|_| !require.is_async) else {
            return false;
        };
        self.module_name = Some(resolve_module_name(&literal.value, ctx.source.module_name()));
        self.range = Some(require.range);
        // sap.ui.require("x") only returns modules that are already loaded
        self.probing = callee == AmdCallee::Require || ctx.probing;
        true
    }

    fn affected_range(&self) -> Option<TextRange> {
        self.range
    }

    fn import_requests(&self) -> Vec<ImportRequest> {
        let (Some(range), Some(module_name)) = (self.range, &self.module_name) else {
            return Vec::new();
        };
        vec![ImportRequest {
            module_name: module_name.clone(),
            preferred_identifier: Some(
                self.data
                    .preferred_identifier
                    .clone()
                    .unwrap_or_else(|| default_identifier(module_name)),
            ),
            position: range.start,
            blocks_new_import: self.probing,
        }]
    }

    fn set_identifier_for_dependency(&mut self, module_name: &str, identifier: &str) {
        if self.module_name.as_deref() == Some(module_name) {
            self.identifier = Some(identifier.to_string());
        }
    }

    fn generate_changes(&self, source: &ParsedSource, changes: &mut ChangeSet) -> Result<()> {
        let (Some(range), Some(identifier)) = (self.range, &self.identifier) else {
            return Err(AutofixError::invariant("synchronous require fix has no identifier"));
        };
        let mut text = lost_comments(source, range, &[]);
        text.push_str(identifier);
        changes.replace(range, text);
        Ok(())
    }
}

use swc_core::{
    common::Spanned,
    ecma::ast::{Callee, Expr},
};

use super::{access_text, Fix, ImportRequest};
use crate::change_set::ChangeSet;
use crate::comments::lost_comments;
use crate::error::{AutofixError, Result};
use crate::identifiers::default_identifier;
use crate::model::CallExpressionFixData;
use crate::node_search::MatchContext;
use crate::parse::ParsedSource;
use crate::syntax::{member_path, NodeKind};
use crate::text::{Position, TextRange};

/// Swaps the callee of a call for a module export, keeping the arguments.
#[derive(Debug)]
pub struct CallExpressionFix {
    data: CallExpressionFixData,
    allowed_kinds: Vec<NodeKind>,
    callee: Option<TextRange>,
    identifier: Option<String>,
}

impl CallExpressionFix {
    pub fn new(data: CallExpressionFixData) -> Self {
        let allowed_kinds = data
            .allowed_kinds
            .clone()
            .unwrap_or_else(|| vec![NodeKind::CallExpression]);
        Self {
            data,
            allowed_kinds,
            callee: None,
            identifier: None,
        }
    }
}

impl Fix for CallExpressionFix {
    fn name(&self) -> &'static str {
        "callExpression"
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
        let Callee::Expr(callee) = &call.callee else {
            return false;
        };
        if let Some(expected) = &self.data.callee_path {
            if member_path(callee).as_ref() != Some(expected) {
                return false;
            }
        }
        self.callee = Some(ctx.source.range(callee.span()));
        true
    }

    fn affected_range(&self) -> Option<TextRange> {
        self.callee
    }

    fn import_requests(&self) -> Vec<ImportRequest> {
        let Some(callee) = self.callee else {
            return Vec::new();
        };
        vec![ImportRequest {
            module_name: self.data.module_name.clone(),
            preferred_identifier: Some(
                self.data
                    .preferred_identifier
                    .clone()
                    .unwrap_or_else(|| default_identifier(&self.data.module_name)),
            ),
            position: callee.start,
            blocks_new_import: false,
        }]
    }

    fn set_identifier_for_dependency(&mut self, module_name: &str, identifier: &str) {
        if module_name == self.data.module_name {
            self.identifier = Some(identifier.to_string());
        }
    }

    fn generate_changes(&self, source: &ParsedSource, changes: &mut ChangeSet) -> Result<()> {
        let (Some(callee), Some(identifier)) = (self.callee, &self.identifier) else {
            return Err(AutofixError::invariant("call expression fix has no identifier"));
        };
        let mut text = lost_comments(source, callee, &[]);
        text.push_str(&access_text(identifier, self.data.property_access.as_deref()));
        changes.replace(callee, text);
        Ok(())
    }
}

use swc_core::{common::Spanned, ecma::ast::Expr};

use super::{access_text, Fix, ImportRequest};
use crate::change_set::ChangeSet;
use crate::comments::lost_comments;
use crate::error::{AutofixError, Result};
use crate::identifiers::default_identifier;
use crate::model::GlobalAccessFixData;
use crate::node_search::MatchContext;
use crate::parse::ParsedSource;
use crate::syntax::{member_path, NodeKind};
use crate::text::{Position, TextRange};

const DEFAULT_KINDS: &[NodeKind] = &[
    NodeKind::Identifier,
    NodeKind::PropertyAccessExpression,
    NodeKind::ElementAccessExpression,
];

/// Replaces an access chain like `jQuery.sap.log` by the identifier bound to
/// a module.
#[derive(Debug)]
pub struct GlobalAccessFix {
    data: GlobalAccessFixData,
    allowed_kinds: Vec<NodeKind>,
    range: Option<TextRange>,
    probing: bool,
    identifier: Option<String>,
}

impl GlobalAccessFix {
    pub fn new(data: GlobalAccessFixData) -> Self {
        let allowed_kinds = data
            .allowed_kinds
            .clone()
            .unwrap_or_else(|| DEFAULT_KINDS.to_vec());
        Self {
            data,
            allowed_kinds,
            range: None,
            probing: false,
            identifier: None,
        }
    }
}

impl Fix for GlobalAccessFix {
    fn name(&self) -> &'static str {
        "globalAccess"
    }

    fn position(&self) -> Position {
        self.data.position
    }

    fn allowed_kinds(&self) -> &[NodeKind] {
        &self.allowed_kinds
    }

    fn visit_node(&mut self, node: &Expr, ctx: &MatchContext<'_>) -> bool {
        if member_path(node).as_deref() != Some(self.data.access_path.as_str()) {
            return false;
        }
        self.range = Some(ctx.source.range(node.span()));
        self.probing = ctx.probing;
        true
    }

    fn affected_range(&self) -> Option<TextRange> {
        self.range
    }

    fn import_requests(&self) -> Vec<ImportRequest> {
        let Some(range) = self.range else {
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
            position: range.start,
            blocks_new_import: self.probing,
        }]
    }

    fn set_identifier_for_dependency(&mut self, module_name: &str, identifier: &str) {
        if module_name == self.data.module_name {
            self.identifier = Some(identifier.to_string());
        }
    }

    fn generate_changes(&self, source: &ParsedSource, changes: &mut ChangeSet) -> Result<()> {
        let (Some(range), Some(identifier)) = (self.range, &self.identifier) else {
            return Err(AutofixError::invariant(format!(
                "global access fix for {} has no identifier",
                self.data.access_path
            )));
        };
        let mut text = lost_comments(source, range, &[]);
        text.push_str(&access_text(identifier, self.data.property_access.as_deref()));
        changes.replace(range, text);
        Ok(())
    }
}

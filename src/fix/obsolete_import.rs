use swc_core::{
    common::Spanned,
    ecma::ast::{Expr, Lit},
};

use super::{Fix, ObsoleteImport};
use crate::change_set::ChangeSet;
use crate::dependency_map::resolve_module_name;
use crate::error::Result;
use crate::model::ObsoleteImportFixData;
use crate::node_search::MatchContext;
use crate::parse::ParsedSource;
use crate::syntax::NodeKind;
use crate::text::{Position, TextRange};

/// Drops an unused dependency and its factory parameter. The edit itself is
/// made by the declaration editor; this fix only identifies the literal.
#[derive(Debug)]
pub struct ObsoleteImportFix {
    data: ObsoleteImportFixData,
    allowed_kinds: Vec<NodeKind>,
    literal: Option<TextRange>,
}

impl ObsoleteImportFix {
    pub fn new(data: ObsoleteImportFixData) -> Self {
        let allowed_kinds = data.allowed_kinds.clone().unwrap_or_else(|| {
            vec![NodeKind::StringLiteral, NodeKind::NoSubstitutionTemplateLiteral]
        });
        Self {
            data,
            allowed_kinds,
            literal: None,
        }
    }
}

impl Fix for ObsoleteImportFix {
    fn name(&self) -> &'static str {
        "obsoleteImport"
    }

    fn position(&self) -> Position {
        self.data.position
    }

    fn allowed_kinds(&self) -> &[NodeKind] {
        &self.allowed_kinds
    }

    fn visit_node(&mut self, node: &Expr, ctx: &MatchContext<'_>) -> bool {
        let value = match node {
            Expr::Lit(Lit::Str(s)) => s.value.to_string(),
            Expr::Tpl(tpl) if tpl.exprs.is_empty() => match tpl.quasis.first() {
                Some(q) => q.raw.to_string(),
                None => return false,
            },
            _ => return false,
        };
        if value != self.data.module_name
            && resolve_module_name(&value, ctx.source.module_name()) != self.data.module_name
        {
            return false;
        }
        self.literal = Some(ctx.source.range(node.span()));
        true
    }

    fn affected_range(&self) -> Option<TextRange> {
        self.literal
    }

    fn obsolete_import(&self) -> Option<ObsoleteImport> {
        Some(ObsoleteImport {
            module_name: self.data.module_name.clone(),
            literal: self.literal?,
        })
    }

    fn generate_changes(&self, _source: &ParsedSource, _changes: &mut ChangeSet) -> Result<()> {
        Ok(())
    }
}

//! Maps fixes onto nodes of the original syntax tree in one traversal.

use std::collections::{HashMap, HashSet};
use swc_core::{
    common::Spanned,
    ecma::{
        ast::*,
        visit::{Visit, VisitWith},
    },
};
use tracing::debug;

use crate::fix::Fix;
use crate::parse::ParsedSource;
use crate::syntax::{unparen, NodeKind};
use crate::text::TextRange;

/// What a fix gets to see besides the node itself.
pub struct MatchContext<'a> {
    pub source: &'a ParsedSource,
    /// The node is only tested for existence: `typeof` operand, `!` operand,
    /// condition of `if`, `?:` or a loop, or left side of `&&`, `||`, `??`.
    pub probing: bool,
}

struct NodeSearch<'a> {
    source: &'a ParsedSource,
    fixes: &'a mut [Box<dyn Fix>],
    /// Node start offset to fix indices still looking for a node there.
    pending: HashMap<usize, Vec<usize>>,
    matched: Vec<bool>,
    claimed: HashSet<(TextRange, NodeKind)>,
    probed: HashSet<TextRange>,
}

impl NodeSearch<'_> {
    fn mark_probed(&mut self, expr: &Expr) {
        let range = self.source.range(unparen(expr).span());
        self.probed.insert(range);
    }
}

impl Visit for NodeSearch<'_> {
    fn visit_expr(&mut self, n: &Expr) {
        let range = self.source.range(n.span());
        if let Some(candidates) = self.pending.get(&range.start).cloned() {
            let kind = NodeKind::of(n);
            if !self.claimed.contains(&(range, kind)) {
                let ctx = MatchContext {
                    source: self.source,
                    probing: self.probed.contains(&range),
                };
                for idx in candidates {
                    let fix = &mut self.fixes[idx];
                    if fix.allowed_kinds().contains(&kind) && fix.visit_node(n, &ctx) {
                        self.matched[idx] = true;
                        self.claimed.insert((range, kind));
                        if let Some(list) = self.pending.get_mut(&range.start) {
                            list.retain(|i| *i != idx);
                        }
                        break;
                    }
                }
            }
        }
        n.visit_children_with(self);
    }

    fn visit_unary_expr(&mut self, n: &UnaryExpr) {
        if matches!(n.op, UnaryOp::TypeOf | UnaryOp::Bang) {
            self.mark_probed(&n.arg);
        }
        n.visit_children_with(self);
    }

    fn visit_bin_expr(&mut self, n: &BinExpr) {
        if matches!(
            n.op,
            BinaryOp::LogicalAnd | BinaryOp::LogicalOr | BinaryOp::NullishCoalescing
        ) {
            self.mark_probed(&n.left);
        }
        n.visit_children_with(self);
    }

    fn visit_cond_expr(&mut self, n: &CondExpr) {
        self.mark_probed(&n.test);
        n.visit_children_with(self);
    }

    fn visit_if_stmt(&mut self, n: &IfStmt) {
        self.mark_probed(&n.test);
        n.visit_children_with(self);
    }

    fn visit_while_stmt(&mut self, n: &WhileStmt) {
        self.mark_probed(&n.test);
        n.visit_children_with(self);
    }

    fn visit_do_while_stmt(&mut self, n: &DoWhileStmt) {
        self.mark_probed(&n.test);
        n.visit_children_with(self);
    }

    fn visit_for_stmt(&mut self, n: &ForStmt) {
        if let Some(test) = &n.test {
            self.mark_probed(test);
        }
        n.visit_children_with(self);
    }
}

/// Matches every fix to the node at its position and returns the matched
/// fixes in their original order. Fixes whose position lies outside the
/// text or matches no acceptable node are dropped.
pub fn match_fixes(source: &ParsedSource, mut fixes: Vec<Box<dyn Fix>>) -> Vec<Box<dyn Fix>> {
    let mut pending: HashMap<usize, Vec<usize>> = HashMap::new();
    for (idx, fix) in fixes.iter().enumerate() {
        match source.offset_at(fix.position()) {
            Some(offset) => pending.entry(offset).or_default().push(idx),
            None => debug!(
                resource = source.resource_path(),
                position = %fix.position(),
                fix = fix.name(),
                "fix position is outside of the source"
            ),
        }
    }
    let matched = {
        let mut search = NodeSearch {
            source,
            matched: vec![false; fixes.len()],
            fixes: &mut fixes,
            pending,
            claimed: HashSet::new(),
            probed: HashSet::new(),
        };
        source.program().visit_with(&mut search);
        search.matched
    };
    fixes
        .into_iter()
        .zip(matched)
        .filter_map(|(fix, matched)| {
            if !matched {
                debug!(
                    resource = source.resource_path(),
                    position = %fix.position(),
                    fix = fix.name(),
                    "no matching node for fix"
                );
            }
            matched.then_some(fix)
        })
        .collect()
}

/// Drops fixes whose affected ranges overlap, unless one of the two
/// declares that it supersedes the other.
pub fn remove_conflicting_fixes(fixes: Vec<Box<dyn Fix>>) -> Vec<Box<dyn Fix>> {
    let ranges: Vec<Option<TextRange>> = fixes.iter().map(|f| f.affected_range()).collect();
    let mut keep = vec![true; fixes.len()];
    for i in 0..fixes.len() {
        for j in i + 1..fixes.len() {
            if !keep[i] || !keep[j] {
                continue;
            }
            let (Some(a), Some(b)) = (ranges[i], ranges[j]) else {
                continue;
            };
            if !(a.overlaps(b) || a == b) {
                continue;
            }
            if fixes[i].supersedes(b) {
                keep[j] = false;
            } else if fixes[j].supersedes(a) {
                keep[i] = false;
            } else {
                debug!(
                    first = fixes[i].name(),
                    second = fixes[j].name(),
                    range = %a,
                    "dropping conflicting fixes"
                );
                keep[i] = false;
                keep[j] = false;
            }
        }
    }
    fixes
        .into_iter()
        .zip(keep)
        .filter_map(|(fix, keep)| keep.then_some(fix))
        .collect()
}

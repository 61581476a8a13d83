use regex::{Captures, Regex};
use std::sync::LazyLock;
use swc_core::{
    common::{Spanned, DUMMY_SP},
    ecma::{
        ast::{Callee, Expr, ExprStmt, ParenExpr, Program, Script, Stmt},
        visit::{Visit, VisitWith},
    },
};

use super::{Fix, ImportRequest};
use crate::change_set::ChangeSet;
use crate::comments::lost_comments;
use crate::error::{AutofixError, Result};
use crate::identifiers::default_identifier;
use crate::model::CallGeneratorFixData;
use crate::node_search::MatchContext;
use crate::parse::{parse_expression, ParsedSource};
use crate::replace::{
    find_parent, needs_parentheses, replace_node_in_parent, NodeReplacement, SyntaxNode,
};
use crate::syntax::NodeKind;
use crate::text::{tokens_fuse, Position, TextRange};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(moduleIdentifier|args|\d)").expect("valid placeholder pattern")
});

/// Stands in for argument placeholders while the template's shape is checked.
const ARGUMENT_STANDIN: &str = "__amd_autofix_argument";

#[derive(Debug)]
struct MatchedCall {
    node: Box<Expr>,
    range: TextRange,
    args: Vec<TextRange>,
}

impl MatchedCall {
    /// Argument expression a placeholder (`0`..`9` or `args`) stands for.
    /// `$args` only has one when the call has exactly one argument.
    fn argument(&self, placeholder: &str) -> Option<&Expr> {
        let Expr::Call(call) = &*self.node else {
            return None;
        };
        let index = match placeholder {
            "args" if call.args.len() == 1 => 0,
            "args" => return None,
            index => index.parse::<usize>().ok()?,
        };
        call.args.get(index).map(|a| &*a.expr)
    }
}

/// Collects the stand-in identifiers of a parsed template, by occurrence.
#[derive(Default)]
struct StandinFinder {
    found: Vec<(usize, Box<Expr>)>,
}

impl Visit for StandinFinder {
    fn visit_expr(&mut self, n: &Expr) {
        if let Expr::Ident(ident) = n {
            let occurrence = ident
                .sym
                .strip_prefix(ARGUMENT_STANDIN)
                .and_then(|rest| rest.parse::<usize>().ok());
            if let Some(occurrence) = occurrence {
                self.found.push((occurrence, Box::new(n.clone())));
                return;
            }
        }
        n.visit_children_with(self);
    }
}

/// Replaces a whole call by text rendered from a template.
#[derive(Debug)]
pub struct CallGeneratorFix {
    data: CallGeneratorFixData,
    allowed_kinds: Vec<NodeKind>,
    call: Option<MatchedCall>,
    identifier: Option<String>,
    parenthesize: bool,
    /// Per argument placeholder occurrence: wrap the argument in parentheses.
    wrapped_arguments: Vec<bool>,
}

impl CallGeneratorFix {
    pub fn new(data: CallGeneratorFixData) -> Self {
        let allowed_kinds = data
            .allowed_kinds
            .clone()
            .unwrap_or_else(|| vec![NodeKind::CallExpression]);
        Self {
            data,
            allowed_kinds,
            call: None,
            identifier: None,
            parenthesize: false,
            wrapped_arguments: Vec::new(),
        }
    }

    fn highest_argument_placeholder(&self) -> Option<usize> {
        PLACEHOLDER
            .captures_iter(&self.data.template)
            .filter_map(|c| c[1].parse::<usize>().ok())
            .max()
    }

    fn uses_all_arguments(&self) -> bool {
        PLACEHOLDER.captures_iter(&self.data.template).any(|c| &c[1] == "args")
    }

    /// Expands the template. Argument text is inserted as written, inside
    /// parentheses where `wrapped` says so, and separated by a space where it
    /// would fuse with the preceding operator.
    fn render(
        &self,
        source: &ParsedSource,
        call: &MatchedCall,
        identifier: &str,
        wrapped: &[bool],
    ) -> String {
        let template = &self.data.template;
        let mut out = String::with_capacity(template.len());
        let mut last = 0;
        let mut occurrence = 0;
        for caps in PLACEHOLDER.captures_iter(template) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            out.push_str(&template[last..whole.start()]);
            last = whole.end();
            if &caps[1] == "moduleIdentifier" {
                out.push_str(identifier);
                continue;
            }
            let text = argument_text(source, call, &caps[1]);
            if wrapped.get(occurrence).copied().unwrap_or(false) {
                out.push('(');
                out.push_str(text);
                out.push(')');
            } else {
                if tokens_fuse(&out, text) {
                    out.push(' ');
                }
                out.push_str(text);
            }
            occurrence += 1;
        }
        out.push_str(&template[last..]);
        out
    }

    /// Decides for each argument placeholder whether the argument must be
    /// parenthesized in the slot it fills. The template is parsed with
    /// stand-in identifiers in place of the arguments.
    fn argument_parentheses(
        &self,
        call: &MatchedCall,
        identifier: &str,
        position: Position,
    ) -> Result<Vec<bool>> {
        let mut placeholders = Vec::new();
        let skeleton = PLACEHOLDER.replace_all(&self.data.template, |caps: &Captures| {
            if &caps[1] == "moduleIdentifier" {
                return identifier.to_string();
            }
            placeholders.push(caps[1].to_string());
            format!("{ARGUMENT_STANDIN}{}", placeholders.len() - 1)
        });
        let expr = parse_expression(&skeleton).map_err(|_| AutofixError::UnsupportedReplacement {
            parent_kind: NodeKind::CallExpression.to_string(),
            expected: "expression",
            actual: format!("`{}`", self.data.template),
            position,
        })?;
        let program = Program::Script(Script {
            span: DUMMY_SP,
            body: vec![Stmt::Expr(ExprStmt {
                span: DUMMY_SP,
                expr: Box::new(Expr::Paren(ParenExpr { span: DUMMY_SP, expr })),
            })],
            shebang: None,
        });
        let mut finder = StandinFinder::default();
        program.visit_with(&mut finder);

        let mut wrapped = vec![false; placeholders.len()];
        for (occurrence, standin) in finder.found {
            let Some(argument) = placeholders.get(occurrence).and_then(|p| call.argument(p)) else {
                continue;
            };
            if let Some(wrap) = wrapped.get_mut(occurrence) {
                let standin = SyntaxNode::Expr(standin);
                *wrap = needs_parentheses(&program, &standin, argument, position)?;
            }
        }
        Ok(wrapped)
    }

    /// Argument ranges whose text survives in the rendered output.
    fn kept_ranges(&self, call: &MatchedCall) -> Vec<TextRange> {
        if self.uses_all_arguments() {
            return call.args.clone();
        }
        PLACEHOLDER
            .captures_iter(&self.data.template)
            .filter_map(|c| c[1].parse::<usize>().ok())
            .filter_map(|i| call.args.get(i).copied())
            .collect()
    }

    fn preferred_identifier(&self) -> Option<String> {
        let module = self.data.module_name.as_ref()?;
        Some(
            self.data
                .preferred_identifier
                .clone()
                .unwrap_or_else(|| default_identifier(module)),
        )
    }
}

/// Source text of the argument(s) a placeholder names.
fn argument_text<'a>(source: &'a ParsedSource, call: &MatchedCall, placeholder: &str) -> &'a str {
    match placeholder {
        "args" => match (call.args.first(), call.args.last()) {
            (Some(first), Some(last)) => source.slice(TextRange::new(first.start, last.end)),
            _ => "",
        },
        index => index
            .parse::<usize>()
            .ok()
            .and_then(|i| call.args.get(i))
            .map_or("", |r| source.slice(*r)),
    }
}

impl Fix for CallGeneratorFix {
    fn name(&self) -> &'static str {
        "callGenerator"
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
        if !matches!(call.callee, Callee::Expr(_)) || call.args.iter().any(|a| a.spread.is_some()) {
            return false;
        }
        let count = call.args.len();
        if self.data.min_arguments.is_some_and(|min| count < min)
            || self.data.max_arguments.is_some_and(|max| count > max)
            || self.highest_argument_placeholder().is_some_and(|i| i >= count)
        {
            return false;
        }
        self.call = Some(MatchedCall {
            node: Box::new(node.clone()),
            range: ctx.source.range(call.span),
            args: call.args.iter().map(|a| ctx.source.range(a.expr.span())).collect(),
        });
        true
    }

    /// Checks that the generated expression fits where the call stands and
    /// whether it needs parentheses there.
    fn prepare(&mut self, source: &ParsedSource) -> Result<()> {
        let Some(call) = &self.call else {
            return Ok(());
        };
        let position = source.position(call.range.start);
        let preview_identifier = self.preferred_identifier().unwrap_or_default();
        let wrapped = self.argument_parentheses(call, &preview_identifier, position)?;
        let preview = self.render(source, call, &preview_identifier, &wrapped);
        let substitute =
            parse_expression(&preview).map_err(|_| AutofixError::UnsupportedReplacement {
                parent_kind: NodeKind::CallExpression.to_string(),
                expected: "expression",
                actual: format!("`{preview}`"),
                position,
            })?;
        let original = SyntaxNode::Expr(call.node.clone());
        let parent = find_parent(source.program(), &original).ok_or_else(|| {
            AutofixError::UnsupportedReplacement {
                parent_kind: "unknown".to_string(),
                expected: "a supported parent node",
                actual: NodeKind::CallExpression.to_string(),
                position,
            }
        })?;
        let replaced = replace_node_in_parent(
            &parent,
            &NodeReplacement {
                original,
                substitute: SyntaxNode::Expr(substitute),
            },
            position,
        )?;
        self.parenthesize = replaced.parenthesized;
        self.wrapped_arguments = wrapped;
        Ok(())
    }

    fn affected_range(&self) -> Option<TextRange> {
        self.call.as_ref().map(|c| c.range)
    }

    fn import_requests(&self) -> Vec<ImportRequest> {
        let (Some(call), Some(module_name)) = (&self.call, &self.data.module_name) else {
            return Vec::new();
        };
        vec![ImportRequest {
            module_name: module_name.clone(),
            preferred_identifier: self.preferred_identifier(),
            position: call.range.start,
            blocks_new_import: false,
        }]
    }

    fn set_identifier_for_dependency(&mut self, module_name: &str, identifier: &str) {
        if self.data.module_name.as_deref() == Some(module_name) {
            self.identifier = Some(identifier.to_string());
        }
    }

    fn supersedes(&self, other: TextRange) -> bool {
        self.call.as_ref().is_some_and(|c| c.range.contains(other))
    }

    fn generate_changes(&self, source: &ParsedSource, changes: &mut ChangeSet) -> Result<()> {
        let Some(call) = &self.call else {
            return Ok(());
        };
        let identifier = match (&self.data.module_name, &self.identifier) {
            (None, _) => "",
            (Some(_), Some(identifier)) => identifier.as_str(),
            (Some(module), None) => {
                return Err(AutofixError::invariant(format!(
                    "no identifier assigned for module {module}"
                )))
            }
        };
        let rendered = self.render(source, call, identifier, &self.wrapped_arguments);
        let mut text = lost_comments(source, call.range, &self.kept_ranges(call));
        if self.parenthesize {
            text.push('(');
            text.push_str(&rendered);
            text.push(')');
        } else {
            text.push_str(&rendered);
        }
        if tokens_fuse(&source.text()[..call.range.start], &text) {
            text.insert(0, ' ');
        }
        changes.replace(call.range, text);
        Ok(())
    }
}

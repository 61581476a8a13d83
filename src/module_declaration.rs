//! Normalized model of `sap.ui.define` / `sap.ui.require` calls.
//!
//! The model keeps only ranges into the original text plus the little bit of
//! decoded data (module names, parameter names) the dependency merge needs.
//! Nothing here edits text; see `amd_edit` for that.

use std::collections::HashSet;
use swc_core::{
    common::Spanned,
    ecma::{
        ast::*,
        visit::{Visit, VisitWith},
    },
};
use tracing::debug;

use crate::dependency_map::QuoteStyle;
use crate::error::{AutofixError, Result};
use crate::parse::ParsedSource;
use crate::syntax::AmdCallee;
use crate::syntax_list::SeparatedList;
use crate::text::{scan_for_token, TextRange};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringLiteral {
    pub range: TextRange,
    pub value: String,
    pub quote: QuoteStyle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyElement {
    pub range: TextRange,
    /// `None` for elements that are not plain string literals.
    pub literal: Option<StringLiteral>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyArray {
    pub range: TextRange,
    pub elements: Vec<DependencyElement>,
    pub list: SeparatedList,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub range: TextRange,
    /// Bound name; `None` for destructuring patterns.
    pub name: Option<String>,
    pub is_rest: bool,
    /// Whether the name is used anywhere in the function body.
    pub referenced: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactoryFunction {
    pub range: TextRange,
    pub body: TextRange,
    pub params: Vec<Parameter>,
    /// Parameter list between the parentheses. `None` when the parentheses
    /// could not be located.
    pub list: Option<SeparatedList>,
    pub is_arrow: bool,
    /// `false` only for single-parameter arrows written as `x => ...`.
    pub parenthesized: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    Define,
    /// Asynchronous `sap.ui.require([...], callback)`.
    Require,
}

/// A call that declares dependencies bound to the parameters of a factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDeclaration {
    pub range: TextRange,
    pub kind: DeclarationKind,
    pub name: Option<StringLiteral>,
    pub dependencies: Option<DependencyArray>,
    pub factory: Option<FactoryFunction>,
    pub export: Option<bool>,
}

impl ModuleDeclaration {
    pub fn body(&self) -> Option<TextRange> {
        self.factory.as_ref().map(|f| f.body)
    }

    pub fn parameter(&self, index: usize) -> Option<&Parameter> {
        self.factory.as_ref()?.params.get(index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequireExpression {
    pub range: TextRange,
    pub is_async: bool,
    pub dependencies: Option<DependencyArray>,
    /// Module of the synchronous form.
    pub module_name: Option<StringLiteral>,
    pub callback: Option<FactoryFunction>,
    pub errback: Option<TextRange>,
}

impl RequireExpression {
    /// The async form viewed as a dependency declaration.
    pub fn to_declaration(&self) -> Option<ModuleDeclaration> {
        if !self.is_async {
            return None;
        }
        Some(ModuleDeclaration {
            range: self.range,
            kind: DeclarationKind::Require,
            name: None,
            dependencies: self.dependencies.clone(),
            factory: self.callback.clone(),
            export: None,
        })
    }
}

// -----------------------------------------------------------------------------
// Argument parsing
// -----------------------------------------------------------------------------

fn unsupported(source: &ParsedSource, offset: usize, message: impl Into<String>) -> AutofixError {
    AutofixError::unsupported_module(message, source.position(offset))
}

fn plain_args<'a>(call: &'a CallExpr, source: &ParsedSource) -> Result<Vec<&'a Expr>> {
    call.args
        .iter()
        .map(|arg| match arg.spread {
            Some(spread) => Err(unsupported(
                source,
                source.offset(spread.lo),
                "spread arguments are not supported",
            )),
            None => Ok(&*arg.expr),
        })
        .collect()
}

fn string_literal(expr: &Expr, source: &ParsedSource) -> Option<StringLiteral> {
    let range = source.range(expr.span());
    let value = match expr {
        Expr::Lit(Lit::Str(s)) => s.value.to_string(),
        Expr::Tpl(tpl) if tpl.exprs.is_empty() => {
            tpl.quasis.first().map(|q| q.raw.to_string()).unwrap_or_default()
        }
        _ => return None,
    };
    Some(StringLiteral {
        range,
        value,
        quote: QuoteStyle::from_literal_text(source.slice(range))?,
    })
}

fn dependency_array(array: &ArrayLit, source: &ParsedSource) -> Result<DependencyArray> {
    let range = source.range(array.span);
    let mut elements = Vec::with_capacity(array.elems.len());
    for elem in &array.elems {
        let Some(elem) = elem else {
            return Err(unsupported(
                source,
                range.start,
                "dependency array contains an elision",
            ));
        };
        if let Some(spread) = elem.spread {
            return Err(unsupported(
                source,
                source.offset(spread.lo),
                "dependency array contains a spread element",
            ));
        }
        elements.push(DependencyElement {
            range: source.range(elem.expr.span()),
            literal: string_literal(&elem.expr, source),
        });
    }
    let items = elements.iter().map(|e| e.range).collect();
    let list = SeparatedList::scan(source.text(), range.start + 1, range.end - 1, items)?;
    Ok(DependencyArray {
        range,
        elements,
        list,
    })
}

struct IdentCollector<'a> {
    names: &'a mut HashSet<String>,
}

impl Visit for IdentCollector<'_> {
    fn visit_ident(&mut self, n: &Ident) {
        self.names.insert(n.sym.to_string());
    }
}

fn parameter(pat: &Pat, range: TextRange, used: &HashSet<String>) -> Parameter {
    let (name, is_rest) = match pat {
        Pat::Ident(b) => (Some(b.id.sym.to_string()), false),
        Pat::Assign(a) => match &*a.left {
            Pat::Ident(b) => (Some(b.id.sym.to_string()), false),
            _ => (None, false),
        },
        Pat::Rest(r) => match &*r.arg {
            Pat::Ident(b) => (Some(b.id.sym.to_string()), true),
            _ => (None, true),
        },
        _ => (None, false),
    };
    // Destructuring binds names we do not track; count it as used
    let referenced = name.as_ref().map_or(true, |n| used.contains(n));
    Parameter {
        range,
        name,
        is_rest,
        referenced,
    }
}

fn factory_function(expr: &Expr, source: &ParsedSource) -> Option<FactoryFunction> {
    let range = source.range(expr.span());
    let mut used = HashSet::new();
    let (pats, body, is_arrow): (Vec<(&Pat, TextRange)>, TextRange, bool) = match expr {
        Expr::Fn(f) => {
            let body = f.function.body.as_ref()?;
            body.visit_with(&mut IdentCollector { names: &mut used });
            let pats = f
                .function
                .params
                .iter()
                .map(|p| (&p.pat, source.range(p.span)))
                .collect();
            (pats, source.range(body.span), false)
        }
        Expr::Arrow(a) => {
            a.body.visit_with(&mut IdentCollector { names: &mut used });
            let pats = a.params.iter().map(|p| (p, source.range(p.span()))).collect();
            (pats, source.range(a.body.span()), true)
        }
        _ => return None,
    };
    let params: Vec<Parameter> = pats
        .iter()
        .map(|(pat, r)| parameter(pat, *r, &used))
        .collect();

    let text = source.text();
    let search_end = params.first().map_or(body.start, |p| p.range.start);
    let open = scan_for_token(text, range.start, search_end, b'(').map(|p| p + 1);
    let parenthesized = open.is_some() || !is_arrow;
    let list = open.and_then(|open| {
        let from = params.last().map_or(open, |p| p.range.end);
        let close = scan_for_token(text, from, body.start, b')')?;
        SeparatedList::scan(text, open, close, params.iter().map(|p| p.range).collect()).ok()
    });
    Some(FactoryFunction {
        range,
        body,
        params,
        list,
        is_arrow,
        parenthesized,
    })
}

fn is_function(expr: &Expr) -> bool {
    matches!(expr, Expr::Fn(_) | Expr::Arrow(_))
}

/// Parses `sap.ui.define(name?, dependencies?, factory?, export?)`.
pub fn parse_module_declaration(
    call: &CallExpr,
    source: &ParsedSource,
) -> Result<ModuleDeclaration> {
    let range = source.range(call.span);
    let args = plain_args(call, source)?;
    let mut rest = args.as_slice();

    let mut name = None;
    if let Some((first, tail)) = rest.split_first() {
        if let Some(literal) = string_literal(first, source) {
            name = Some(literal);
            rest = tail;
        }
    }
    let mut dependencies = None;
    if let Some((Expr::Array(array), tail)) = rest.split_first().map(|(a, t)| (*a, t)) {
        dependencies = Some(dependency_array(array, source)?);
        rest = tail;
    }
    let mut factory = None;
    if let Some((first, tail)) = rest.split_first() {
        if is_function(first) {
            factory = factory_function(first, source);
            rest = tail;
        } else if !matches!(first, Expr::Lit(Lit::Bool(_))) {
            let offset = source.offset(first.span().lo);
            let message = if dependencies.is_none() {
                "dependencies argument is not an array literal"
            } else {
                "factory argument is not a function"
            };
            return Err(unsupported(source, offset, message));
        }
    }
    let mut export = None;
    if let Some((Expr::Lit(Lit::Bool(b)), tail)) = rest.split_first().map(|(a, t)| (*a, t)) {
        export = Some(b.value);
        rest = tail;
    }
    if let Some(extra) = rest.first() {
        return Err(unsupported(
            source,
            source.offset(extra.span().lo),
            "unexpected argument in module declaration",
        ));
    }
    if dependencies.is_none() && factory.is_none() {
        return Err(unsupported(
            source,
            range.start,
            "module declaration without dependencies or factory",
        ));
    }
    Ok(ModuleDeclaration {
        range,
        kind: DeclarationKind::Define,
        name,
        dependencies,
        factory,
        export,
    })
}

/// Parses `sap.ui.require([...], callback?, errback?)` as well as the
/// synchronous `sap.ui.require("x")` and `sap.ui.requireSync("x")`.
pub fn parse_require(
    call: &CallExpr,
    callee: AmdCallee,
    source: &ParsedSource,
) -> Result<RequireExpression> {
    let range = source.range(call.span);
    let args = plain_args(call, source)?;
    let first = args.first().copied();

    if let Some(literal) = first.and_then(|f| string_literal(f, source)) {
        if args.len() > 1 {
            return Err(unsupported(
                source,
                source.offset(args[1].span().lo),
                "synchronous require takes a single module name",
            ));
        }
        return Ok(RequireExpression {
            range,
            is_async: false,
            dependencies: None,
            module_name: Some(literal),
            callback: None,
            errback: None,
        });
    }

    let (Some(Expr::Array(array)), AmdCallee::Require) = (first, callee) else {
        return Err(unsupported(
            source,
            range.start,
            "require call expects a module name or a dependency array",
        ));
    };
    let dependencies = dependency_array(array, source)?;
    let callback = match args.get(1) {
        Some(cb) if is_function(cb) => factory_function(cb, source),
        Some(cb) => {
            return Err(unsupported(
                source,
                source.offset(cb.span().lo),
                "require callback is not a function",
            ))
        }
        None => None,
    };
    let errback = args.get(2).map(|e| source.range(e.span()));
    if let Some(extra) = args.get(3) {
        return Err(unsupported(
            source,
            source.offset(extra.span().lo),
            "unexpected argument in require call",
        ));
    }
    Ok(RequireExpression {
        range,
        is_async: true,
        dependencies: Some(dependencies),
        module_name: None,
        callback,
        errback,
    })
}

// -----------------------------------------------------------------------------
// Collection
// -----------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct AmdCalls {
    /// Module declarations and async requires, in source order.
    pub declarations: Vec<ModuleDeclaration>,
    pub requires: Vec<RequireExpression>,
}

struct AmdCallCollector<'a> {
    source: &'a ParsedSource,
    calls: AmdCalls,
}

impl Visit for AmdCallCollector<'_> {
    fn visit_call_expr(&mut self, n: &CallExpr) {
        if let Some(callee) = AmdCallee::of_call(n) {
            let parsed = match callee {
                AmdCallee::Define => parse_module_declaration(n, self.source).map(|decl| {
                    self.calls.declarations.push(decl);
                }),
                AmdCallee::Require | AmdCallee::RequireSync => {
                    parse_require(n, callee, self.source).map(|req| {
                        if let Some(decl) = req.to_declaration() {
                            self.calls.declarations.push(decl);
                        }
                        self.calls.requires.push(req);
                    })
                }
            };
            if let Err(err) = parsed {
                debug!(
                    resource = self.source.resource_path(),
                    error = %err,
                    "skipping unsupported loader call"
                );
            }
        }
        n.visit_children_with(self);
    }
}

/// Finds every loader call in the source. Calls with unsupported shapes are
/// logged and skipped.
pub fn collect_amd_calls(source: &ParsedSource) -> AmdCalls {
    let mut collector = AmdCallCollector {
        source,
        calls: AmdCalls::default(),
    };
    source.program().visit_with(&mut collector);
    collector.calls
}

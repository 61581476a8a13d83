//! Syntax kind vocabulary shared with the lint pass, and small helpers over
//! swc expressions.

use serde::{Deserialize, Serialize};
use std::fmt;
use swc_core::ecma::ast::*;

/// Kind of an expression node, named the way the lint pass names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Identifier,
    PropertyAccessExpression,
    ElementAccessExpression,
    CallExpression,
    NewExpression,
    StringLiteral,
    NoSubstitutionTemplateLiteral,
    TemplateExpression,
    TaggedTemplateExpression,
    NumericLiteral,
    BigIntLiteral,
    RegularExpressionLiteral,
    TrueKeyword,
    FalseKeyword,
    NullKeyword,
    ThisKeyword,
    ArrayLiteralExpression,
    ObjectLiteralExpression,
    FunctionExpression,
    ArrowFunction,
    ClassExpression,
    BinaryExpression,
    ConditionalExpression,
    PrefixUnaryExpression,
    PostfixUnaryExpression,
    TypeOfExpression,
    DeleteExpression,
    VoidExpression,
    AwaitExpression,
    YieldExpression,
    ParenthesizedExpression,
    MetaProperty,
    Other,
}

impl NodeKind {
    pub fn of(expr: &Expr) -> Self {
        match expr {
            Expr::Ident(_) => Self::Identifier,
            Expr::Member(m) => Self::of_member(m),
            Expr::SuperProp(_) => Self::PropertyAccessExpression,
            Expr::Call(_) => Self::CallExpression,
            Expr::New(_) => Self::NewExpression,
            Expr::Lit(lit) => match lit {
                Lit::Str(_) => Self::StringLiteral,
                Lit::Num(_) => Self::NumericLiteral,
                Lit::BigInt(_) => Self::BigIntLiteral,
                Lit::Regex(_) => Self::RegularExpressionLiteral,
                Lit::Bool(b) if b.value => Self::TrueKeyword,
                Lit::Bool(_) => Self::FalseKeyword,
                Lit::Null(_) => Self::NullKeyword,
                _ => Self::Other,
            },
            Expr::Tpl(tpl) if tpl.exprs.is_empty() => Self::NoSubstitutionTemplateLiteral,
            Expr::Tpl(_) => Self::TemplateExpression,
            Expr::TaggedTpl(_) => Self::TaggedTemplateExpression,
            Expr::This(_) => Self::ThisKeyword,
            Expr::Array(_) => Self::ArrayLiteralExpression,
            Expr::Object(_) => Self::ObjectLiteralExpression,
            Expr::Fn(_) => Self::FunctionExpression,
            Expr::Arrow(_) => Self::ArrowFunction,
            Expr::Class(_) => Self::ClassExpression,
            Expr::Bin(_) | Expr::Assign(_) | Expr::Seq(_) => Self::BinaryExpression,
            Expr::Cond(_) => Self::ConditionalExpression,
            Expr::Unary(u) => match u.op {
                UnaryOp::TypeOf => Self::TypeOfExpression,
                UnaryOp::Delete => Self::DeleteExpression,
                UnaryOp::Void => Self::VoidExpression,
                _ => Self::PrefixUnaryExpression,
            },
            Expr::Update(u) if u.prefix => Self::PrefixUnaryExpression,
            Expr::Update(_) => Self::PostfixUnaryExpression,
            Expr::Await(_) => Self::AwaitExpression,
            Expr::Yield(_) => Self::YieldExpression,
            Expr::Paren(_) => Self::ParenthesizedExpression,
            Expr::MetaProp(_) => Self::MetaProperty,
            Expr::OptChain(chain) => match &*chain.base {
                OptChainBase::Member(m) => Self::of_member(m),
                OptChainBase::Call(_) => Self::CallExpression,
            },
            _ => Self::Other,
        }
    }

    fn of_member(m: &MemberExpr) -> Self {
        match m.prop {
            MemberProp::Computed(_) => Self::ElementAccessExpression,
            _ => Self::PropertyAccessExpression,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Dotted path of a statically known access chain rooted at an identifier,
/// e.g. `jQuery.sap.log`. String-keyed element access counts as a property
/// access (`a["b"]` is `a.b`).
pub fn member_path(expr: &Expr) -> Option<String> {
    fn walk(e: &Expr, out: &mut String) -> bool {
        match e {
            Expr::Ident(i) => {
                out.push_str(&i.sym);
                true
            }
            Expr::Member(m) => {
                if !walk(&m.obj, out) {
                    return false;
                }
                match &m.prop {
                    MemberProp::Ident(p) => {
                        out.push('.');
                        out.push_str(&p.sym);
                        true
                    }
                    MemberProp::PrivateName(_) => false,
                    MemberProp::Computed(c) => match &*c.expr {
                        Expr::Lit(Lit::Str(s)) => {
                            out.push('.');
                            out.push_str(&s.value.to_string());
                            true
                        }
                        _ => false,
                    },
                }
            }
            _ => false,
        }
    }
    let mut path = String::new();
    walk(expr, &mut path).then_some(path)
}

/// The loader APIs whose calls are module declarations or require calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmdCallee {
    Define,
    Require,
    RequireSync,
}

impl AmdCallee {
    pub fn of_call(call: &CallExpr) -> Option<Self> {
        let Callee::Expr(callee) = &call.callee else {
            return None;
        };
        match member_path(callee)?.as_str() {
            "sap.ui.define" | "define" => Some(Self::Define),
            "sap.ui.require" => Some(Self::Require),
            "sap.ui.requireSync" => Some(Self::RequireSync),
            _ => None,
        }
    }
}

/// Strips any number of wrapping parentheses.
pub fn unparen(expr: &Expr) -> &Expr {
    match expr {
        Expr::Paren(p) => unparen(&p.expr),
        other => other,
    }
}

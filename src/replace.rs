//! Replacement of one child node inside its parent.
//!
//! swc nodes are plain owned trees, but the engine never edits the parsed
//! program: a rewrite clones the parent, swaps exactly one child and checks
//! that the substitute fits the slot. The rebuilt parent tells the caller
//! whether the substitute had to be parenthesized; the text edit itself is
//! then a single replacement of the original child's range.

use swc_core::{
    common::{Span, Spanned, DUMMY_SP},
    ecma::{
        ast::*,
        visit::{Visit, VisitWith},
    },
};

use crate::error::{AutofixError, Result};
use crate::syntax::NodeKind;
use crate::text::Position;

#[derive(Debug, Clone)]
pub enum SyntaxNode {
    Expr(Box<Expr>),
    Stmt(Box<Stmt>),
}

impl SyntaxNode {
    pub fn span(&self) -> Span {
        match self {
            Self::Expr(e) => e.span(),
            Self::Stmt(s) => s.span(),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Expr(e) => NodeKind::of(e).to_string(),
            Self::Stmt(s) => describe_stmt(s).to_string(),
        }
    }
}

fn describe_stmt(stmt: &Stmt) -> &'static str {
    match stmt {
        Stmt::Block(_) => "Block",
        Stmt::Expr(_) => "ExpressionStatement",
        Stmt::Decl(Decl::Var(v)) if v.kind != VarDeclKind::Var => "LexicalDeclaration",
        Stmt::Decl(Decl::Var(_)) => "VariableStatement",
        Stmt::Decl(Decl::Fn(_)) => "FunctionDeclaration",
        Stmt::Decl(Decl::Class(_)) => "ClassDeclaration",
        Stmt::Return(_) => "ReturnStatement",
        Stmt::If(_) => "IfStatement",
        _ => "Statement",
    }
}

#[derive(Debug, Clone)]
pub struct NodeReplacement {
    pub original: SyntaxNode,
    pub substitute: SyntaxNode,
}

#[derive(Debug, Clone)]
pub struct Replaced {
    pub parent: ParentNode,
    /// The substitute was wrapped in parentheses to keep its meaning.
    pub parenthesized: bool,
}

macro_rules! parent_nodes {
    ($($variant:ident($ty:ty) => $method:ident,)*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum ParentKind {
            $($variant,)*
        }

        /// Owned copy of a node that can contain the node being replaced.
        #[derive(Debug, Clone)]
        pub enum ParentNode {
            $($variant($ty),)*
        }

        impl ParentNode {
            pub fn kind(&self) -> ParentKind {
                match self {
                    $(Self::$variant(_) => ParentKind::$variant,)*
                }
            }

            pub fn span(&self) -> Span {
                match self {
                    $(Self::$variant(n) => n.span(),)*
                }
            }
        }

        impl Visit for ParentLocator<'_> {
            fn visit_expr(&mut self, n: &Expr) {
                if self.found.is_none() {
                    if let SyntaxNode::Expr(target) = self.target {
                        if n.span() == target.span() && NodeKind::of(n) == NodeKind::of(target) {
                            self.found = self.stack.last().copied();
                            return;
                        }
                    }
                    n.visit_children_with(self);
                }
            }

            fn visit_stmt(&mut self, n: &Stmt) {
                if self.found.is_none() {
                    if let SyntaxNode::Stmt(target) = self.target {
                        if n.span() == target.span() {
                            self.found = self.stack.last().copied();
                            return;
                        }
                    }
                    n.visit_children_with(self);
                }
            }

            $(
                fn $method(&mut self, n: &$ty) {
                    self.stack.push((ParentKind::$variant, n.span()));
                    n.visit_children_with(self);
                    self.stack.pop();
                }
            )*
        }

        impl Visit for ParentCloner {
            $(
                fn $method(&mut self, n: &$ty) {
                    if self.found.is_some() {
                        return;
                    }
                    if self.kind == ParentKind::$variant && n.span() == self.span {
                        self.found = Some(ParentNode::$variant(n.clone()));
                        return;
                    }
                    n.visit_children_with(self);
                }
            )*
        }
    };
}

parent_nodes! {
    Call(CallExpr) => visit_call_expr,
    New(NewExpr) => visit_new_expr,
    Binary(BinExpr) => visit_bin_expr,
    Assign(AssignExpr) => visit_assign_expr,
    Conditional(CondExpr) => visit_cond_expr,
    Unary(UnaryExpr) => visit_unary_expr,
    Update(UpdateExpr) => visit_update_expr,
    Sequence(SeqExpr) => visit_seq_expr,
    Paren(ParenExpr) => visit_paren_expr,
    Member(MemberExpr) => visit_member_expr,
    ArrayLiteral(ArrayLit) => visit_array_lit,
    ObjectLiteral(ObjectLit) => visit_object_lit,
    PropertyAssignment(KeyValueProp) => visit_key_value_prop,
    ComputedPropertyName(ComputedPropName) => visit_computed_prop_name,
    VariableDeclarator(VarDeclarator) => visit_var_declarator,
    ExpressionStatement(ExprStmt) => visit_expr_stmt,
    Return(ReturnStmt) => visit_return_stmt,
    Throw(ThrowStmt) => visit_throw_stmt,
    If(IfStmt) => visit_if_stmt,
    While(WhileStmt) => visit_while_stmt,
    DoWhile(DoWhileStmt) => visit_do_while_stmt,
    For(ForStmt) => visit_for_stmt,
    ForIn(ForInStmt) => visit_for_in_stmt,
    ForOf(ForOfStmt) => visit_for_of_stmt,
    Switch(SwitchStmt) => visit_switch_stmt,
    SwitchCase(SwitchCase) => visit_switch_case,
    Labeled(LabeledStmt) => visit_labeled_stmt,
    With(WithStmt) => visit_with_stmt,
    Block(BlockStmt) => visit_block_stmt,
    ArrowFunction(ArrowExpr) => visit_arrow_expr,
    Template(Tpl) => visit_tpl,
    TaggedTemplate(TaggedTpl) => visit_tagged_tpl,
    Await(AwaitExpr) => visit_await_expr,
    Yield(YieldExpr) => visit_yield_expr,
    Class(Class) => visit_class,
    ClassProperty(ClassProp) => visit_class_prop,
    PrivateProperty(PrivateProp) => visit_private_prop,
    OptionalCall(OptCall) => visit_opt_call,
    ParameterDefault(AssignPat) => visit_assign_pat,
    ExportDefault(ExportDefaultExpr) => visit_export_default_expr,
    Script(Script) => visit_script,
    Module(Module) => visit_module,
}

struct ParentLocator<'a> {
    target: &'a SyntaxNode,
    stack: Vec<(ParentKind, Span)>,
    found: Option<(ParentKind, Span)>,
}

struct ParentCloner {
    kind: ParentKind,
    span: Span,
    found: Option<ParentNode>,
}

/// Finds the direct parent of `node` in `program`.
pub fn find_parent(program: &Program, node: &SyntaxNode) -> Option<ParentNode> {
    let mut locator = ParentLocator {
        target: node,
        stack: Vec::new(),
        found: None,
    };
    program.visit_with(&mut locator);
    let (kind, span) = locator.found?;
    let mut cloner = ParentCloner {
        kind,
        span,
        found: None,
    };
    program.visit_with(&mut cloner);
    cloner.found
}

// -----------------------------------------------------------------------------
// Precedence
// -----------------------------------------------------------------------------

const PREC_SEQUENCE: u8 = 0;
const PREC_ASSIGNMENT: u8 = 1;
const PREC_CONDITIONAL: u8 = 2;
const PREC_UNARY: u8 = 14;
const PREC_POSTFIX: u8 = 15;
const PREC_CALL: u8 = 17;
const PREC_PRIMARY: u8 = 18;

fn binary_precedence(op: BinaryOp) -> u8 {
    use BinaryOp::*;
    match op {
        NullishCoalescing | LogicalOr => 3,
        LogicalAnd => 4,
        BitOr => 5,
        BitXor => 6,
        BitAnd => 7,
        EqEq | NotEq | EqEqEq | NotEqEq => 8,
        Lt | LtEq | Gt | GtEq | In | InstanceOf => 9,
        LShift | RShift | ZeroFillRShift => 10,
        Add | Sub => 11,
        Mul | Div | Mod => 12,
        Exp => 13,
    }
}

fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Seq(_) => PREC_SEQUENCE,
        Expr::Assign(_) | Expr::Arrow(_) | Expr::Yield(_) => PREC_ASSIGNMENT,
        Expr::Cond(_) => PREC_CONDITIONAL,
        Expr::Bin(b) => binary_precedence(b.op),
        Expr::Unary(_) | Expr::Await(_) => PREC_UNARY,
        Expr::Update(u) if u.prefix => PREC_UNARY,
        Expr::Update(_) => PREC_POSTFIX,
        Expr::New(n) if n.args.is_none() => PREC_CALL - 1,
        Expr::Call(_) | Expr::New(_) | Expr::Member(_) | Expr::SuperProp(_) | Expr::OptChain(_)
        | Expr::TaggedTpl(_) => PREC_CALL,
        _ => PREC_PRIMARY,
    }
}

/// Innermost expression at the left edge of `expr`.
fn leftmost(expr: &Expr) -> &Expr {
    match expr {
        Expr::Member(m) => leftmost(&m.obj),
        Expr::Call(CallExpr {
            callee: Callee::Expr(callee),
            ..
        }) => leftmost(callee),
        Expr::Bin(b) => leftmost(&b.left),
        Expr::Cond(c) => leftmost(&c.test),
        Expr::Seq(s) => s.exprs.first().map_or(expr, |e| leftmost(e)),
        Expr::Update(u) if !u.prefix => leftmost(&u.arg),
        Expr::TaggedTpl(t) => leftmost(&t.tag),
        _ => expr,
    }
}

fn is_logical(expr: &Expr) -> Option<bool> {
    match expr {
        Expr::Bin(b) if matches!(b.op, BinaryOp::LogicalAnd | BinaryOp::LogicalOr) => Some(false),
        Expr::Bin(b) if b.op == BinaryOp::NullishCoalescing => Some(true),
        _ => None,
    }
}

/// `??` cannot be combined with `&&` or `||` without parentheses.
fn mixes_nullish(op: BinaryOp, operand: &Expr) -> bool {
    matches!(
        op,
        BinaryOp::NullishCoalescing | BinaryOp::LogicalAnd | BinaryOp::LogicalOr
    ) && is_logical(operand).is_some_and(|nullish| nullish != (op == BinaryOp::NullishCoalescing))
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    /// Any expression including sequences.
    Any,
    /// AssignmentExpression: everything but a sequence.
    Assignment,
    ConditionalTest,
    BinaryLeft(BinaryOp),
    BinaryRight(BinaryOp),
    UnaryOperand,
    /// Callee, member object, tag or heritage clause.
    LeftHandSide,
    NewCallee,
    /// Operand of `++` / `--`: must be a simple assignment target.
    UpdateOperand,
    Statement,
    ArrowBody,
}

impl Slot {
    /// Whether `expr` needs parentheses in this slot. `Err` when no amount
    /// of parentheses makes it fit.
    fn needs_parens(self, expr: &Expr) -> std::result::Result<bool, &'static str> {
        let prec = precedence(expr);
        Ok(match self {
            Self::Any => false,
            Self::Assignment => prec < PREC_ASSIGNMENT,
            Self::ConditionalTest => prec <= PREC_CONDITIONAL,
            Self::BinaryLeft(op) => {
                let own = binary_precedence(op);
                if op == BinaryOp::Exp {
                    prec <= own || prec == PREC_UNARY
                } else {
                    prec < own || mixes_nullish(op, expr)
                }
            }
            Self::BinaryRight(op) => {
                let own = binary_precedence(op);
                if op == BinaryOp::Exp {
                    prec < own
                } else {
                    prec <= own || mixes_nullish(op, expr)
                }
            }
            Self::UnaryOperand => prec < PREC_UNARY,
            Self::LeftHandSide => {
                prec < PREC_CALL
                    || matches!(expr, Expr::Lit(Lit::Num(_)) | Expr::Fn(_) | Expr::Object(_))
            }
            Self::NewCallee => {
                prec < PREC_CALL || contains_call(expr) || matches!(expr, Expr::Lit(Lit::Num(_)))
            }
            Self::UpdateOperand => match expr {
                Expr::Ident(_) | Expr::Member(_) | Expr::SuperProp(_) => false,
                _ => return Err("simple assignment target"),
            },
            Self::Statement => {
                matches!(leftmost(expr), Expr::Object(_) | Expr::Fn(_) | Expr::Class(_))
                    || is_let_bracket(expr)
            }
            Self::ArrowBody => prec < PREC_ASSIGNMENT || matches!(leftmost(expr), Expr::Object(_)),
        })
    }
}

fn contains_call(expr: &Expr) -> bool {
    match expr {
        Expr::Call(_) | Expr::OptChain(_) => true,
        Expr::Member(m) => contains_call(&m.obj),
        _ => false,
    }
}

/// `let[x]` at the start of a statement reads as a declaration.
fn is_let_bracket(expr: &Expr) -> bool {
    matches!(leftmost(expr), Expr::Ident(i) if &*i.sym == "let")
        && matches!(expr, Expr::Member(MemberExpr { prop: MemberProp::Computed(_), .. }))
}

// -----------------------------------------------------------------------------
// Dispatch
// -----------------------------------------------------------------------------

struct Replacer<'a> {
    replacement: &'a NodeReplacement,
    parent_kind: ParentKind,
    position: Position,
    replaced: bool,
    parenthesized: bool,
}

impl Replacer<'_> {
    fn error(&self, expected: &'static str) -> AutofixError {
        AutofixError::UnsupportedReplacement {
            parent_kind: format!("{:?}", self.parent_kind),
            expected,
            actual: self.replacement.substitute.describe(),
            position: self.position,
        }
    }

    fn is_original_expr(&self, e: &Expr) -> bool {
        match &self.replacement.original {
            SyntaxNode::Expr(o) => o.span() == e.span() && NodeKind::of(o) == NodeKind::of(e),
            SyntaxNode::Stmt(_) => false,
        }
    }

    fn is_original_stmt(&self, s: &Stmt) -> bool {
        match &self.replacement.original {
            SyntaxNode::Stmt(o) => o.span() == s.span() && describe_stmt(o) == describe_stmt(s),
            SyntaxNode::Expr(_) => false,
        }
    }

    fn expr(&mut self, slot: &mut Box<Expr>, kind: Slot) -> Result<()> {
        if self.replaced || !self.is_original_expr(slot) {
            return Ok(());
        }
        let replacement = self.replacement;
        let SyntaxNode::Expr(substitute) = &replacement.substitute else {
            return Err(self.error("expression"));
        };
        let parens = kind.needs_parens(substitute).map_err(|expected| self.error(expected))?;
        *slot = if parens {
            Box::new(Expr::Paren(ParenExpr {
                span: DUMMY_SP,
                expr: substitute.clone(),
            }))
        } else {
            substitute.clone()
        };
        self.replaced = true;
        self.parenthesized = parens;
        Ok(())
    }

    fn opt_expr(&mut self, slot: &mut Option<Box<Expr>>, kind: Slot) -> Result<()> {
        match slot {
            Some(e) => self.expr(e, kind),
            None => Ok(()),
        }
    }

    /// `single` marks slots holding exactly one statement (branches and
    /// loop bodies), where declarations are not allowed.
    fn stmt(&mut self, slot: &mut Stmt, single: bool) -> Result<()> {
        if self.replaced || !self.is_original_stmt(slot) {
            return Ok(());
        }
        let replacement = self.replacement;
        let SyntaxNode::Stmt(substitute) = &replacement.substitute else {
            return Err(self.error("statement"));
        };
        if single && matches!(&**substitute, Stmt::Decl(_)) {
            return Err(self.error("statement other than a declaration"));
        }
        *slot = (**substitute).clone();
        self.replaced = true;
        Ok(())
    }

    fn stmts(&mut self, list: &mut [Stmt]) -> Result<()> {
        for stmt in list {
            self.stmt(stmt, false)?;
        }
        Ok(())
    }
}

const NOT_A_DIRECT_CHILD: &str = "a direct child of the parent";

/// Returns a copy of `parent` with the original child swapped for the
/// substitute. Fails with an unsupported-replacement error when the
/// substitute's category does not fit the slot, or when `parent` does not
/// directly contain the original node.
pub fn replace_node_in_parent(
    parent: &ParentNode,
    replacement: &NodeReplacement,
    position: Position,
) -> Result<Replaced> {
    let mut node = parent.clone();
    let mut r = Replacer {
        replacement,
        parent_kind: parent.kind(),
        position,
        replaced: false,
        parenthesized: false,
    };
    match &mut node {
        ParentNode::Call(n) => {
            if let Callee::Expr(callee) = &mut n.callee {
                r.expr(callee, Slot::LeftHandSide)?;
            }
            for arg in &mut n.args {
                r.expr(&mut arg.expr, Slot::Assignment)?;
            }
        }
        ParentNode::New(n) => {
            r.expr(&mut n.callee, Slot::NewCallee)?;
            for arg in n.args.iter_mut().flatten() {
                r.expr(&mut arg.expr, Slot::Assignment)?;
            }
        }
        ParentNode::Binary(n) => {
            let op = n.op;
            r.expr(&mut n.left, Slot::BinaryLeft(op))?;
            r.expr(&mut n.right, Slot::BinaryRight(op))?;
        }
        ParentNode::Assign(n) => r.expr(&mut n.right, Slot::Assignment)?,
        ParentNode::Conditional(n) => {
            r.expr(&mut n.test, Slot::ConditionalTest)?;
            r.expr(&mut n.cons, Slot::Assignment)?;
            r.expr(&mut n.alt, Slot::Assignment)?;
        }
        ParentNode::Unary(n) => r.expr(&mut n.arg, Slot::UnaryOperand)?,
        ParentNode::Update(n) => r.expr(&mut n.arg, Slot::UpdateOperand)?,
        ParentNode::Sequence(n) => {
            for e in &mut n.exprs {
                r.expr(e, Slot::Assignment)?;
            }
        }
        ParentNode::Paren(n) => r.expr(&mut n.expr, Slot::Any)?,
        ParentNode::Member(n) => {
            r.expr(&mut n.obj, Slot::LeftHandSide)?;
            if let MemberProp::Computed(c) = &mut n.prop {
                r.expr(&mut c.expr, Slot::Any)?;
            }
        }
        ParentNode::ArrayLiteral(n) => {
            for elem in n.elems.iter_mut().flatten() {
                r.expr(&mut elem.expr, Slot::Assignment)?;
            }
        }
        ParentNode::ObjectLiteral(n) => {
            for prop in &mut n.props {
                if let PropOrSpread::Spread(spread) = prop {
                    r.expr(&mut spread.expr, Slot::Assignment)?;
                }
            }
        }
        ParentNode::PropertyAssignment(n) => r.expr(&mut n.value, Slot::Assignment)?,
        ParentNode::ComputedPropertyName(n) => r.expr(&mut n.expr, Slot::Assignment)?,
        ParentNode::VariableDeclarator(n) => r.opt_expr(&mut n.init, Slot::Assignment)?,
        ParentNode::ExpressionStatement(n) => r.expr(&mut n.expr, Slot::Statement)?,
        ParentNode::Return(n) => r.opt_expr(&mut n.arg, Slot::Any)?,
        ParentNode::Throw(n) => r.expr(&mut n.arg, Slot::Any)?,
        ParentNode::If(n) => {
            r.expr(&mut n.test, Slot::Any)?;
            r.stmt(&mut n.cons, true)?;
            if let Some(alt) = &mut n.alt {
                r.stmt(alt, true)?;
            }
        }
        ParentNode::While(n) => {
            r.expr(&mut n.test, Slot::Any)?;
            r.stmt(&mut n.body, true)?;
        }
        ParentNode::DoWhile(n) => {
            r.stmt(&mut n.body, true)?;
            r.expr(&mut n.test, Slot::Any)?;
        }
        ParentNode::For(n) => {
            if let Some(VarDeclOrExpr::Expr(init)) = &mut n.init {
                r.expr(init, Slot::Any)?;
            }
            r.opt_expr(&mut n.test, Slot::Any)?;
            r.opt_expr(&mut n.update, Slot::Any)?;
            r.stmt(&mut n.body, true)?;
        }
        ParentNode::ForIn(n) => {
            r.expr(&mut n.right, Slot::Any)?;
            r.stmt(&mut n.body, true)?;
        }
        ParentNode::ForOf(n) => {
            r.expr(&mut n.right, Slot::Assignment)?;
            r.stmt(&mut n.body, true)?;
        }
        ParentNode::Switch(n) => r.expr(&mut n.discriminant, Slot::Any)?,
        ParentNode::SwitchCase(n) => {
            r.opt_expr(&mut n.test, Slot::Any)?;
            r.stmts(&mut n.cons)?;
        }
        ParentNode::Labeled(n) => r.stmt(&mut n.body, true)?,
        ParentNode::With(n) => {
            r.expr(&mut n.obj, Slot::Any)?;
            r.stmt(&mut n.body, true)?;
        }
        ParentNode::Block(n) => r.stmts(&mut n.stmts)?,
        ParentNode::ArrowFunction(n) => {
            if let BlockStmtOrExpr::Expr(body) = &mut *n.body {
                r.expr(body, Slot::ArrowBody)?;
            }
        }
        ParentNode::Template(n) => {
            for e in &mut n.exprs {
                r.expr(e, Slot::Any)?;
            }
        }
        ParentNode::TaggedTemplate(n) => r.expr(&mut n.tag, Slot::LeftHandSide)?,
        ParentNode::Await(n) => r.expr(&mut n.arg, Slot::UnaryOperand)?,
        ParentNode::Yield(n) => r.opt_expr(&mut n.arg, Slot::Assignment)?,
        ParentNode::Class(n) => r.opt_expr(&mut n.super_class, Slot::LeftHandSide)?,
        ParentNode::ClassProperty(n) => r.opt_expr(&mut n.value, Slot::Assignment)?,
        ParentNode::PrivateProperty(n) => r.opt_expr(&mut n.value, Slot::Assignment)?,
        ParentNode::OptionalCall(n) => {
            r.expr(&mut n.callee, Slot::LeftHandSide)?;
            for arg in &mut n.args {
                r.expr(&mut arg.expr, Slot::Assignment)?;
            }
        }
        ParentNode::ParameterDefault(n) => r.expr(&mut n.right, Slot::Assignment)?,
        ParentNode::ExportDefault(n) => r.expr(&mut n.expr, Slot::Assignment)?,
        ParentNode::Script(n) => r.stmts(&mut n.body)?,
        ParentNode::Module(n) => {
            for item in &mut n.body {
                if let ModuleItem::Stmt(stmt) = item {
                    r.stmt(stmt, false)?;
                }
            }
        }
    }
    if !r.replaced {
        return Err(AutofixError::UnsupportedReplacement {
            parent_kind: format!("{:?}", parent.kind()),
            expected: NOT_A_DIRECT_CHILD,
            actual: replacement.original.describe(),
            position,
        });
    }
    Ok(Replaced {
        parent: node,
        parenthesized: r.parenthesized,
    })
}

/// Whether `substitute` needs parentheses to take the place of `original`
/// inside `program`. Under a parent kind without slot rules anything below
/// primary precedence is parenthesized.
pub fn needs_parentheses(
    program: &Program,
    original: &SyntaxNode,
    substitute: &Expr,
    position: Position,
) -> Result<bool> {
    let fallback = precedence(substitute) < PREC_PRIMARY;
    let Some(parent) = find_parent(program, original) else {
        return Ok(fallback);
    };
    let replacement = NodeReplacement {
        original: original.clone(),
        substitute: SyntaxNode::Expr(Box::new(substitute.clone())),
    };
    match replace_node_in_parent(&parent, &replacement, position) {
        Ok(replaced) => Ok(replaced.parenthesized),
        Err(AutofixError::UnsupportedReplacement {
            expected: NOT_A_DIRECT_CHILD,
            ..
        }) => Ok(fallback),
        Err(e) => Err(e),
    }
}

//! Pre-order traversal over the lowered tree.
//!
//! The rewrite engine registers interest in four node kinds only; the walker
//! hands every such node to a [`Visitor`] in source pre-order:
//!
//! - a parent before its children,
//! - children left-to-right (assignment targets before values, callee before
//!   arguments, selector base after the selector itself).
//!
//! # Control Flow
//!
//! - `VisitResult::Continue` - traverse into children
//! - `VisitResult::SkipChildren` - skip this node's children
//! - `VisitResult::Stop` - halt traversal immediately

use crate::ast::{AssignStmt, Expr, ExprKind, IncDecStmt, SourceFile, Stmt};
use crate::patch::Span;

/// Result of visiting a node - controls traversal behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VisitResult {
    /// Continue traversal into children.
    #[default]
    Continue,
    /// Skip children, continue with siblings.
    SkipChildren,
    /// Stop traversal entirely.
    Stop,
}

/// A node of one of the four tracked kinds.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Assign(&'a AssignStmt),
    IncDec(&'a IncDecStmt),
    /// An expression whose kind is [`ExprKind::Call`].
    Call(&'a Expr),
    /// An expression whose kind is [`ExprKind::Selector`].
    Selector(&'a Expr),
}

impl<'a> Node<'a> {
    /// Source span of the node.
    pub fn span(&self) -> Span {
        match self {
            Node::Assign(s) => s.span,
            Node::IncDec(s) => s.span,
            Node::Call(e) | Node::Selector(e) => e.span,
        }
    }

    /// Start position, used as the suppression key.
    pub fn pos(&self) -> u64 {
        self.span().start
    }

    /// 1-indexed line of the node start.
    pub fn line(&self) -> u32 {
        match self {
            Node::Assign(s) => s.line,
            Node::IncDec(s) => s.line,
            Node::Call(e) | Node::Selector(e) => e.line,
        }
    }

    /// Node kind label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Node::Assign(_) => "assign",
            Node::IncDec(_) => "incdec",
            Node::Call(_) => "call",
            Node::Selector(_) => "selector",
        }
    }
}

/// Receives tracked nodes during traversal.
pub trait Visitor<'a> {
    fn visit_node(&mut self, node: Node<'a>) -> VisitResult;
}

/// Walk every top-level statement of a file.
pub fn walk_file<'a, V: Visitor<'a>>(visitor: &mut V, file: &'a SourceFile) -> VisitResult {
    walk_stmts(visitor, &file.body)
}

fn walk_stmts<'a, V: Visitor<'a>>(visitor: &mut V, stmts: &'a [Stmt]) -> VisitResult {
    for stmt in stmts {
        if walk_stmt(visitor, stmt) == VisitResult::Stop {
            return VisitResult::Stop;
        }
    }
    VisitResult::Continue
}

fn walk_exprs<'a, V: Visitor<'a>>(visitor: &mut V, exprs: &'a [Expr]) -> VisitResult {
    for expr in exprs {
        if walk_expr(visitor, expr) == VisitResult::Stop {
            return VisitResult::Stop;
        }
    }
    VisitResult::Continue
}

/// Walk a statement and its children.
pub fn walk_stmt<'a, V: Visitor<'a>>(visitor: &mut V, stmt: &'a Stmt) -> VisitResult {
    match stmt {
        Stmt::Assign(assign) => match visitor.visit_node(Node::Assign(assign)) {
            VisitResult::Stop => VisitResult::Stop,
            VisitResult::SkipChildren => VisitResult::Continue,
            VisitResult::Continue => {
                if walk_exprs(visitor, &assign.targets) == VisitResult::Stop {
                    return VisitResult::Stop;
                }
                walk_exprs(visitor, &assign.values)
            }
        },
        Stmt::IncDec(incdec) => match visitor.visit_node(Node::IncDec(incdec)) {
            VisitResult::Stop => VisitResult::Stop,
            VisitResult::SkipChildren => VisitResult::Continue,
            VisitResult::Continue => walk_expr(visitor, &incdec.operand),
        },
        Stmt::Expr(expr) => walk_expr(visitor, expr),
        Stmt::Compound { children, .. } => walk_stmts(visitor, children),
    }
}

/// Walk an expression and its children.
pub fn walk_expr<'a, V: Visitor<'a>>(visitor: &mut V, expr: &'a Expr) -> VisitResult {
    let tracked = match &expr.kind {
        ExprKind::Call { .. } => Some(Node::Call(expr)),
        ExprKind::Selector { .. } => Some(Node::Selector(expr)),
        _ => None,
    };
    if let Some(node) = tracked {
        match visitor.visit_node(node) {
            VisitResult::Stop => return VisitResult::Stop,
            VisitResult::SkipChildren => return VisitResult::Continue,
            VisitResult::Continue => {}
        }
    }

    match &expr.kind {
        ExprKind::Ident(_) | ExprKind::Literal(_) => VisitResult::Continue,
        ExprKind::Selector { base, .. } => walk_expr(visitor, base),
        ExprKind::Call { callee, args } => {
            if walk_expr(visitor, callee) == VisitResult::Stop {
                return VisitResult::Stop;
            }
            walk_exprs(visitor, args)
        }
        ExprKind::Index { base, index } => {
            if walk_expr(visitor, base) == VisitResult::Stop {
                return VisitResult::Stop;
            }
            walk_expr(visitor, index)
        }
        ExprKind::Binary { left, right, .. } => {
            if walk_expr(visitor, left) == VisitResult::Stop {
                return VisitResult::Stop;
            }
            walk_expr(visitor, right)
        }
        ExprKind::Unary { operand, .. } => walk_expr(visitor, operand),
        ExprKind::Paren(inner) => walk_expr(visitor, inner),
        ExprKind::Other { children, body, .. } => {
            if walk_exprs(visitor, children) == VisitResult::Stop {
                return VisitResult::Stop;
            }
            walk_stmts(visitor, body)
        }
    }
}

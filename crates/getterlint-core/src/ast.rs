//! Language-neutral expression/statement tree consumed by the rewrite engine.
//!
//! Front-ends lower their concrete syntax into these types. Nodes are
//! immutable once built; the engine only reads structure and positions.
//!
//! # NodeId Assignment
//!
//! Every [`Expr`] carries a [`NodeId`] so type oracles can attach resolved
//! types to expressions without the engine knowing anything about the type
//! system. Ids are unique within one [`SourceFile`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::patch::Span;

/// Identifier of an expression node within one source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node_{}", self.0)
    }
}

/// Generator for assigning sequential [`NodeId`]s.
#[derive(Debug, Default)]
pub struct NodeIdGenerator {
    next_id: u32,
}

impl NodeIdGenerator {
    /// Create a new generator starting from NodeId(0).
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate the next NodeId.
    pub fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Get the current count of generated NodeIds.
    pub fn count(&self) -> u32 {
        self.next_id
    }
}

// ============================================================================
// Expressions
// ============================================================================

/// An expression node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    pub id: NodeId,
    /// Source range of the whole expression.
    pub span: Span,
    /// 1-indexed line of `span.start`.
    pub line: u32,
    pub kind: ExprKind,
}

/// The member name of a selector, with its own span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub name: String,
    pub span: Span,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// `&x`
    AddressOf,
    /// `*x`
    Deref,
    /// `!x`
    Not,
    /// `-x`
    Neg,
    /// `+x`
    Plus,
    /// `^x`
    Complement,
    /// `<-x`
    Receive,
}

impl UnaryOp {
    /// Parse an operator token.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "&" => Some(UnaryOp::AddressOf),
            "*" => Some(UnaryOp::Deref),
            "!" => Some(UnaryOp::Not),
            "-" => Some(UnaryOp::Neg),
            "+" => Some(UnaryOp::Plus),
            "^" => Some(UnaryOp::Complement),
            "<-" => Some(UnaryOp::Receive),
            _ => None,
        }
    }

    /// The operator as written in source.
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::AddressOf => "&",
            UnaryOp::Deref => "*",
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Complement => "^",
            UnaryOp::Receive => "<-",
        }
    }
}

/// Closed set of expression shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprKind {
    /// A bare name (`t`, `nil`, `len`).
    Ident(String),
    /// A literal, stored verbatim (`42`, `"x"`).
    Literal(String),
    /// `base.Member`
    Selector { base: Box<Expr>, member: Member },
    /// `callee(args...)`
    Call { callee: Box<Expr>, args: Vec<Expr> },
    /// `base[index]`
    Index { base: Box<Expr>, index: Box<Expr> },
    /// `left OP right`
    Binary {
        left: Box<Expr>,
        op: String,
        right: Box<Expr>,
    },
    /// `OP operand`
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// `(inner)`
    Paren(Box<Expr>),
    /// Any other shape (composite literal, function literal, type assertion,
    /// slice expression, type syntax, ...). Children are kept so traversal
    /// still reaches nested expressions and statements.
    Other {
        kind: String,
        /// Source text of the whole node when it may be rendered verbatim,
        /// with its children spliced in. `None` leaves the shape unrenderable.
        text: Option<String>,
        children: Vec<Expr>,
        body: Vec<Stmt>,
    },
}

impl Expr {
    /// Start position, used as the suppression key.
    pub fn pos(&self) -> u64 {
        self.span.start
    }

    /// Short name of the node shape, for diagnostics.
    pub fn kind_name(&self) -> &str {
        match &self.kind {
            ExprKind::Ident(_) => "identifier",
            ExprKind::Literal(_) => "literal",
            ExprKind::Selector { .. } => "selector",
            ExprKind::Call { .. } => "call",
            ExprKind::Index { .. } => "index",
            ExprKind::Binary { .. } => "binary",
            ExprKind::Unary { .. } => "unary",
            ExprKind::Paren(_) => "paren",
            ExprKind::Other { kind, .. } => kind,
        }
    }

    /// The operand of an address-of expression, if this is one.
    pub fn address_of_operand(&self) -> Option<&Expr> {
        match &self.kind {
            ExprKind::Unary {
                op: UnaryOp::AddressOf,
                operand,
            } => Some(operand),
            _ => None,
        }
    }
}

// ============================================================================
// Statements
// ============================================================================

/// `targets OP values`, including short variable declarations and range
/// clauses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignStmt {
    pub span: Span,
    pub line: u32,
    pub targets: Vec<Expr>,
    pub op: String,
    pub values: Vec<Expr>,
}

/// `operand++` / `operand--`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncDecStmt {
    pub span: Span,
    pub line: u32,
    pub operand: Expr,
    pub increment: bool,
}

/// Statement nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Assign(AssignStmt),
    IncDec(IncDecStmt),
    /// An expression in statement position (or a bare condition/operand of an
    /// enclosing compound statement).
    Expr(Expr),
    /// Any statement that only groups other nodes: blocks, `if`, `for`,
    /// `return`, declarations, and so on.
    Compound {
        kind: String,
        span: Span,
        children: Vec<Stmt>,
    },
}

/// One lowered source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Workspace-relative path, used to key overlap tracking.
    pub path: String,
    pub body: Vec<Stmt>,
}

// ============================================================================
// Construction helpers
// ============================================================================

/// Builds expressions with sequential ids and caller-provided spans.
///
/// Front-ends and tests use this instead of filling in `NodeId`s by hand.
#[derive(Debug, Default)]
pub struct ExprBuilder {
    ids: NodeIdGenerator,
}

impl ExprBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a kind into a node with a fresh id.
    pub fn node(&mut self, kind: ExprKind, span: Span, line: u32) -> Expr {
        Expr {
            id: self.ids.next_id(),
            span,
            line,
            kind,
        }
    }

    /// Number of nodes built so far.
    pub fn count(&self) -> u32 {
        self.ids.count()
    }
}

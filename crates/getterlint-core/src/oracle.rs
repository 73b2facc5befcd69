//! Type oracle interface and the thin query surface the engine uses.
//!
//! The engine never looks at type representations. A front-end implements
//! [`TypeOracle`] over whatever type facts it has; [`MessageOracle`] wraps it
//! with the two questions the rewrite rules ask.

use crate::ast::Expr;

/// Type facts about expressions, supplied by a language front-end.
///
/// Every query describes the expression's resolved type after dereferencing
/// one level of pointer indirection. Unknown types answer `None`, `false`,
/// or an empty list; they never produce a rewrite.
pub trait TypeOracle {
    /// Display name of the expression's type (`*proto.Test`), if resolved.
    fn type_name(&self, expr: &Expr) -> Option<String>;

    /// Whether the type carries the marker of a generated message record.
    fn is_message_type(&self, expr: &Expr) -> bool;

    /// Names of the methods declared on the type.
    fn method_names(&self, expr: &Expr) -> Vec<String>;

    /// Whether the type declares a method with exactly this name.
    fn has_method(&self, expr: &Expr, name: &str) -> bool {
        self.method_names(expr).iter().any(|m| m == name)
    }
}

/// Query adapter used by the classifier, renderer, and driver.
#[derive(Clone, Copy)]
pub struct MessageOracle<'o> {
    inner: &'o dyn TypeOracle,
}

impl<'o> MessageOracle<'o> {
    pub fn new(inner: &'o dyn TypeOracle) -> Self {
        Self { inner }
    }

    /// True iff the expression's type is a message-like record.
    pub fn is_message_like(&self, expr: &Expr) -> bool {
        self.inner.is_message_type(expr)
    }

    /// True iff the expression's type declares `name`.
    pub fn has_method(&self, expr: &Expr, name: &str) -> bool {
        self.inner.has_method(expr, name)
    }

    /// Resolved type name, for logs.
    pub fn type_name(&self, expr: &Expr) -> Option<String> {
        self.inner.type_name(expr)
    }
}

impl std::fmt::Debug for MessageOracle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageOracle").finish_non_exhaustive()
    }
}

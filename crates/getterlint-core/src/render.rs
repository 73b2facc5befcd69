//! Dual rendering: one walk over an expression produces both the text as
//! written (`from`) and the text with field reads turned into getter calls
//! (`to`).
//!
//! | Shape | `from` / `to` |
//! |---|---|
//! | identifier, literal | verbatim on both sides |
//! | `base.Member` | `base.Member` / `base.GetMember()` when a getter exists |
//! | `callee(a, b)` | `callee(a,b)` |
//! | `base[idx]` | `base[idx]` |
//! | `l OP r` | `lOPr` |
//! | `OP x`, `(x)` | `OPx`, `(x)` |
//! | shape with source text | the text, with children rendered in place |
//!
//! Any other shape is a [`RenderError`]. Alongside the two strings the
//! renderer records one [`Edit`] per rewritten member, replacing just the
//! member identifier, which lets a fix keep the original formatting.

use thiserror::Error;

use crate::ast::{Expr, ExprKind};
use crate::oracle::MessageOracle;
use crate::patch::{Edit, Span};

/// Prefix of generated accessor methods.
pub const GETTER_PREFIX: &str = "Get";

/// Structural failure while rendering one node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The expression shape has no rendering rule.
    #[error("unsupported expression: {kind}")]
    UnsupportedExpr { kind: String, span: Span },

    /// A call whose callee is message-typed but is not a selector.
    #[error("unsupported callee: {kind}")]
    UnsupportedCallee { kind: String, span: Span },
}

impl RenderError {
    /// Span of the offending node.
    pub fn span(&self) -> Span {
        match self {
            RenderError::UnsupportedExpr { span, .. } => *span,
            RenderError::UnsupportedCallee { span, .. } => *span,
        }
    }

    pub(crate) fn unsupported(expr: &Expr) -> Self {
        RenderError::UnsupportedExpr {
            kind: expr.kind_name().to_string(),
            span: expr.span,
        }
    }
}

/// Output of a successful render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    pub from: String,
    pub to: String,
    /// Member-identifier replacements, in source order.
    pub edits: Vec<Edit>,
}

impl Rendered {
    /// Whether rendering found nothing to rewrite.
    pub fn is_unchanged(&self) -> bool {
        self.from == self.to
    }

    fn write(&mut self, text: &str) {
        self.from.push_str(text);
        self.to.push_str(text);
    }
}

/// Renders expressions against a type oracle.
#[derive(Debug, Clone, Copy)]
pub struct DualRenderer<'o> {
    oracle: MessageOracle<'o>,
}

impl<'o> DualRenderer<'o> {
    pub fn new(oracle: MessageOracle<'o>) -> Self {
        Self { oracle }
    }

    /// Render `expr` into its `(from, to)` pair.
    pub fn render(&self, expr: &Expr) -> Result<Rendered, RenderError> {
        let mut out = Rendered::default();
        self.render_into(expr, &mut out)?;
        Ok(out)
    }

    fn render_into(&self, expr: &Expr, out: &mut Rendered) -> Result<(), RenderError> {
        match &expr.kind {
            ExprKind::Ident(name) => out.write(name),
            ExprKind::Literal(text) => out.write(text),
            ExprKind::Selector { base, member } => {
                self.render_into(base, out)?;
                out.write(".");

                // An existing method means the chain is already a call.
                if self.oracle.has_method(base, &member.name) {
                    out.write(&member.name);
                    return Ok(());
                }

                let getter = format!("{}{}", GETTER_PREFIX, member.name);
                if self.oracle.has_method(base, &getter) {
                    let call = format!("{}()", getter);
                    out.from.push_str(&member.name);
                    out.to.push_str(&call);
                    out.edits.push(Edit::new(member.span, call));
                } else {
                    out.write(&member.name);
                }
            }
            ExprKind::Call { callee, args } => {
                self.render_into(callee, out)?;
                out.write("(");
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.write(",");
                    }
                    self.render_into(arg, out)?;
                }
                out.write(")");
            }
            ExprKind::Index { base, index } => {
                self.render_into(base, out)?;
                out.write("[");
                self.render_into(index, out)?;
                out.write("]");
            }
            ExprKind::Binary { left, op, right } => {
                self.render_into(left, out)?;
                out.write(op);
                self.render_into(right, out)?;
            }
            ExprKind::Unary { op, operand } => {
                out.write(op.as_str());
                self.render_into(operand, out)?;
            }
            ExprKind::Paren(inner) => {
                out.write("(");
                self.render_into(inner, out)?;
                out.write(")");
            }
            ExprKind::Other {
                text: Some(text),
                children,
                ..
            } => self.render_spliced(expr, text, children, out)?,
            ExprKind::Other { text: None, .. } => return Err(RenderError::unsupported(expr)),
        }
        Ok(())
    }

    /// Copy `text` verbatim, replacing each child's source range with the
    /// child's own rendering. Children must be in source order and inside
    /// the node.
    fn render_spliced(
        &self,
        expr: &Expr,
        text: &str,
        children: &[Expr],
        out: &mut Rendered,
    ) -> Result<(), RenderError> {
        let start = expr.span.start;
        let mut cursor = 0usize;
        for child in children {
            if child.span.start < start + cursor as u64 || !expr.span.contains(&child.span) {
                return Err(RenderError::unsupported(expr));
            }
            let from = (child.span.start - start) as usize;
            let gap = text
                .get(cursor..from)
                .ok_or_else(|| RenderError::unsupported(expr))?;
            out.write(gap);
            self.render_into(child, out)?;
            cursor = (child.span.end - start) as usize;
        }
        let tail = text
            .get(cursor..)
            .ok_or_else(|| RenderError::unsupported(expr))?;
        out.write(tail);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ExprBuilder, Member, SourceFile};
    use crate::testing::{first_expr, parse, SchemaOracle};

    fn render(source: &str) -> Result<Rendered, RenderError> {
        let oracle = SchemaOracle::proto();
        let file: SourceFile = parse(source);
        DualRenderer::new(MessageOracle::new(&oracle)).render(first_expr(&file))
    }

    mod selector_rules {
        use super::*;

        #[test]
        fn field_with_getter_is_rewritten() {
            let out = render("t.S").unwrap();
            assert_eq!(out.from, "t.S");
            assert_eq!(out.to, "t.GetS()");
            assert_eq!(out.edits, vec![Edit::new(Span::new(2, 3), "GetS()")]);
        }

        #[test]
        fn chain_rewrites_every_level() {
            let out = render("t.Embedded.S").unwrap();
            assert_eq!(out.from, "t.Embedded.S");
            assert_eq!(out.to, "t.GetEmbedded().GetS()");
            assert_eq!(out.edits.len(), 2);
        }

        #[test]
        fn existing_method_is_left_alone() {
            let out = render("t.GetEmbedded().S").unwrap();
            assert_eq!(out.from, "t.GetEmbedded().S");
            assert_eq!(out.to, "t.GetEmbedded().GetS()");
        }

        #[test]
        fn field_without_getter_is_unchanged() {
            let out = render("other.S").unwrap();
            assert!(out.is_unchanged());
            assert!(out.edits.is_empty());
        }
    }

    mod composite_rules {
        use super::*;

        #[test]
        fn call_arguments_join_without_spaces() {
            let out = render("fn(t.S, t.D)").unwrap();
            assert_eq!(out.from, "fn(t.S,t.D)");
            assert_eq!(out.to, "fn(t.GetS(),t.GetD())");
        }

        #[test]
        fn index_renders_both_sides() {
            let out = render("many[idx].S").unwrap();
            assert_eq!(out.from, "many[idx].S");
            assert_eq!(out.to, "many[idx].GetS()");
        }

        #[test]
        fn binary_operator_has_no_spaces() {
            let out = render("t.S == \"x\"").unwrap();
            assert_eq!(out.from, "t.S==\"x\"");
            assert_eq!(out.to, "t.GetS()==\"x\"");
        }

        #[test]
        fn unary_and_paren_render() {
            let out = render("(*t).S").unwrap();
            assert_eq!(out.from, "(*t).S");
            assert_eq!(out.to, "(*t).GetS()");
        }
    }

    mod spliced_rules {
        use super::*;

        fn assertion(b: &mut ExprBuilder) -> Expr {
            // `t.(*T)` at offset 0
            let t = b.node(ExprKind::Ident("t".into()), Span::new(0, 1), 1);
            b.node(
                ExprKind::Other {
                    kind: "type_assertion_expression".into(),
                    text: Some("t.(*T)".into()),
                    children: vec![t],
                    body: Vec::new(),
                },
                Span::new(0, 6),
                1,
            )
        }

        #[test]
        fn text_is_kept_around_children() {
            let oracle = SchemaOracle::proto();
            let mut b = ExprBuilder::new();
            let expr = assertion(&mut b);
            let out = DualRenderer::new(MessageOracle::new(&oracle))
                .render(&expr)
                .unwrap();
            assert_eq!(out.from, "t.(*T)");
            assert!(out.is_unchanged());
        }

        #[test]
        fn children_are_rewritten_in_place() {
            // `T{S: t.S}`
            let oracle = SchemaOracle::proto();
            let mut b = ExprBuilder::new();
            let t = b.node(ExprKind::Ident("t".into()), Span::new(5, 6), 1);
            let read = b.node(
                ExprKind::Selector {
                    base: Box::new(t),
                    member: Member {
                        name: "S".into(),
                        span: Span::new(7, 8),
                    },
                },
                Span::new(5, 8),
                1,
            );
            let lit = b.node(
                ExprKind::Other {
                    kind: "composite_literal".into(),
                    text: Some("T{S: t.S}".into()),
                    children: vec![read],
                    body: Vec::new(),
                },
                Span::new(0, 9),
                1,
            );
            let out = DualRenderer::new(MessageOracle::new(&oracle))
                .render(&lit)
                .unwrap();
            assert_eq!(out.from, "T{S: t.S}");
            assert_eq!(out.to, "T{S: t.GetS()}");
            assert_eq!(out.edits, vec![Edit::new(Span::new(7, 8), "GetS()")]);
        }

        #[test]
        fn child_outside_node_is_unsupported() {
            let oracle = SchemaOracle::proto();
            let mut b = ExprBuilder::new();
            let stray = b.node(ExprKind::Ident("x".into()), Span::new(20, 21), 1);
            let lit = b.node(
                ExprKind::Other {
                    kind: "composite_literal".into(),
                    text: Some("T{}".into()),
                    children: vec![stray],
                    body: Vec::new(),
                },
                Span::new(0, 3),
                1,
            );
            let err = DualRenderer::new(MessageOracle::new(&oracle))
                .render(&lit)
                .unwrap_err();
            assert_eq!(err.span(), Span::new(0, 3));
        }
    }

    mod errors {
        use super::*;

        #[test]
        fn other_shape_is_unsupported() {
            let oracle = SchemaOracle::proto();
            let mut b = ExprBuilder::new();
            let lit = b.node(
                ExprKind::Other {
                    kind: "composite_literal".into(),
                    text: None,
                    children: Vec::new(),
                    body: Vec::new(),
                },
                Span::new(3, 12),
                1,
            );
            let err = DualRenderer::new(MessageOracle::new(&oracle))
                .render(&lit)
                .unwrap_err();
            assert_eq!(err.span(), Span::new(3, 12));
            assert_eq!(err.to_string(), "unsupported expression: composite_literal");
        }
    }
}

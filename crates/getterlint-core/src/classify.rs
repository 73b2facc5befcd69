//! Write-context classification.
//!
//! Before a node is rendered as a read, the classifier records which
//! positions are really writes:
//!
//! - assignment targets,
//! - increment/decrement operands,
//! - operands of `&arg` passed to a call that is not a method on a message
//!   (out-parameter style APIs such as `Scan(&t.S)`).

use crate::ast::{Expr, ExprKind};
use crate::filter::PositionFilter;
use crate::oracle::MessageOracle;
use crate::render::RenderError;
use crate::visit::Node;

/// What the driver should do with a node after classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Evaluate the node as a read.
    Read,
    /// The node only establishes write context; do not evaluate it.
    Skip,
}

/// Marks write targets in a [`PositionFilter`].
#[derive(Debug, Clone, Copy)]
pub struct WriteContextClassifier<'o> {
    oracle: MessageOracle<'o>,
}

impl<'o> WriteContextClassifier<'o> {
    pub fn new(oracle: MessageOracle<'o>) -> Self {
        Self { oracle }
    }

    /// Classify `node`, recording suppressed positions in `filter`.
    pub fn classify(
        &self,
        node: Node<'_>,
        filter: &mut PositionFilter,
    ) -> Result<Classification, RenderError> {
        match node {
            Node::Assign(assign) => {
                for target in &assign.targets {
                    filter.add_pos(target.pos());
                }
                Ok(Classification::Skip)
            }
            Node::IncDec(incdec) => {
                filter.add_pos(incdec.operand.pos());
                Ok(Classification::Skip)
            }
            Node::Call(call) => self.classify_call(call, filter),
            Node::Selector(_) => Ok(Classification::Read),
        }
    }

    fn classify_call(
        &self,
        call: &Expr,
        filter: &mut PositionFilter,
    ) -> Result<Classification, RenderError> {
        let ExprKind::Call { callee, args } = &call.kind else {
            return Ok(Classification::Read);
        };

        match &callee.kind {
            ExprKind::Selector { base, .. } if self.oracle.is_message_like(base) => {
                Ok(Classification::Read)
            }
            ExprKind::Selector { .. } => {
                suppress_out_params(args, filter);
                filter.add_pos(call.pos());
                Ok(Classification::Skip)
            }
            _ if self.oracle.is_message_like(callee) => Err(RenderError::UnsupportedCallee {
                kind: callee.kind_name().to_string(),
                span: callee.span,
            }),
            _ => {
                suppress_out_params(args, filter);
                filter.add_pos(call.pos());
                Ok(Classification::Skip)
            }
        }
    }
}

fn suppress_out_params(args: &[Expr], filter: &mut PositionFilter) {
    for operand in args.iter().filter_map(Expr::address_of_operand) {
        filter.add_pos(operand.pos());
    }
}

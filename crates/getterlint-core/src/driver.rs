//! The rewrite driver: classify, render, filter, report.
//!
//! One [`RewriteDriver`] analyzes one file. For every tracked node it walks
//! the same decision ladder:
//!
//! 1. suppressed start position: stop;
//! 2. write context: record suppressed positions, stop;
//! 3. base not message-typed: stop;
//! 4. render `(from, to)`; a structural failure becomes a [`Diagnostic`];
//! 5. `from == to`: stop;
//! 6. inside the span already rewritten on this line: stop;
//! 7. record the span, suppress the start position, emit a [`Report`].
//!
//! Traversal always continues into children, so a failure on one node never
//! hides findings in its siblings.

use tracing::trace;

use crate::ast::{Expr, ExprKind, SourceFile};
use crate::classify::{Classification, WriteContextClassifier};
use crate::filter::PositionFilter;
use crate::oracle::{MessageOracle, TypeOracle};
use crate::render::DualRenderer;
use crate::report::{Diagnostic, Report};
use crate::visit::{walk_file, Node, VisitResult, Visitor};

/// Terminal state reached by one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Start position was suppressed earlier.
    Suppressed,
    /// The node only carried write context.
    WriteContext,
    /// The relevant base is not a message.
    NotMessage,
    /// Rendering produced identical text.
    Unchanged,
    /// Contained in a span already reported on this line.
    Overlapping,
    Reported(Report),
    Failed(Diagnostic),
}

/// Findings for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileAnalysis {
    pub reports: Vec<Report>,
    pub diagnostics: Vec<Diagnostic>,
}

impl FileAnalysis {
    pub fn is_clean(&self) -> bool {
        self.reports.is_empty() && self.diagnostics.is_empty()
    }
}

/// Per-file rewrite state machine.
pub struct RewriteDriver<'o> {
    file: String,
    oracle: MessageOracle<'o>,
    classifier: WriteContextClassifier<'o>,
    renderer: DualRenderer<'o>,
    filter: PositionFilter,
    analysis: FileAnalysis,
}

impl<'o> RewriteDriver<'o> {
    pub fn new(file: impl Into<String>, oracle: &'o dyn TypeOracle) -> Self {
        let oracle = MessageOracle::new(oracle);
        Self {
            file: file.into(),
            oracle,
            classifier: WriteContextClassifier::new(oracle),
            renderer: DualRenderer::new(oracle),
            filter: PositionFilter::new(),
            analysis: FileAnalysis::default(),
        }
    }

    /// Run one node through the decision ladder.
    pub fn process(&mut self, node: Node<'_>) -> Outcome {
        if self.filter.is_filtered(node.pos()) {
            return Outcome::Suppressed;
        }

        let span = node.span();
        let line = node.line();

        match self.classifier.classify(node, &mut self.filter) {
            Ok(Classification::Skip) => return Outcome::WriteContext,
            Ok(Classification::Read) => {}
            Err(err) => {
                return Outcome::Failed(Diagnostic::from_render_error(
                    &self.file, span, line, &err,
                ))
            }
        }

        let expr = match node {
            Node::Call(expr) => expr,
            Node::Selector(expr) => match &expr.kind {
                ExprKind::Selector { base, .. } if self.oracle.is_message_like(base) => expr,
                _ => return Outcome::NotMessage,
            },
            Node::Assign(_) | Node::IncDec(_) => return Outcome::WriteContext,
        };

        let rendered = match self.renderer.render(expr) {
            Ok(rendered) => rendered,
            Err(err) => {
                return Outcome::Failed(Diagnostic::from_render_error(
                    &self.file, span, line, &err,
                ))
            }
        };

        if rendered.is_unchanged() {
            return Outcome::Unchanged;
        }

        if self.filter.is_already_replaced(&self.file, line, span) {
            return Outcome::Overlapping;
        }
        self.filter.add_already_replaced(&self.file, line, span);
        self.filter.add_pos(node.pos());

        Outcome::Reported(Report {
            file: self.file.clone(),
            span,
            line,
            from: rendered.from,
            to: rendered.to,
            edits: rendered.edits,
        })
    }

    /// Resolved type of the selector base, for logs.
    fn base_type(&self, node: Node<'_>) -> Option<String> {
        match node {
            Node::Selector(Expr {
                kind: ExprKind::Selector { base, .. },
                ..
            }) => self.oracle.type_name(base),
            _ => None,
        }
    }

    /// Consume the driver and return everything it found.
    pub fn finish(self) -> FileAnalysis {
        trace!(
            file = %self.file,
            reports = self.analysis.reports.len(),
            diagnostics = self.analysis.diagnostics.len(),
            suppressed = self.filter.suppressed_count(),
            "file analyzed"
        );
        self.analysis
    }
}

impl<'a> Visitor<'a> for RewriteDriver<'_> {
    fn visit_node(&mut self, node: Node<'a>) -> VisitResult {
        let outcome = self.process(node);
        trace!(
            file = %self.file,
            kind = node.label(),
            pos = node.pos(),
            base_type = ?self.base_type(node),
            ?outcome,
            "node evaluated"
        );
        match outcome {
            Outcome::Reported(report) => self.analysis.reports.push(report),
            Outcome::Failed(diagnostic) => self.analysis.diagnostics.push(diagnostic),
            _ => {}
        }
        VisitResult::Continue
    }
}

/// Analyze one lowered file with a fresh driver.
pub fn analyze_file(file: &SourceFile, oracle: &dyn TypeOracle) -> FileAnalysis {
    let mut driver = RewriteDriver::new(file.path.clone(), oracle);
    walk_file(&mut driver, file);
    driver.finish()
}

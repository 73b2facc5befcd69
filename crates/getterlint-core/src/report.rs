//! Accepted rewrites and per-node diagnostics, plus the surfaces they are
//! rendered to.

use serde::{Deserialize, Serialize};

use crate::patch::{Edit, EditApplier, FixError, FixResult, Span};
use crate::render::RenderError;
use crate::text::{byte_offset_to_position, span_is_multiline};
use crate::types::Location;

/// One accepted rewrite: a read of a message field that should go through
/// its getter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Workspace-relative file path.
    pub file: String,
    /// Span of the reported node.
    pub span: Span,
    /// 1-indexed line of the node start.
    pub line: u32,
    pub from: String,
    pub to: String,
    /// Member-identifier edits that turn `from` into `to` in place.
    pub edits: Vec<Edit>,
}

impl Report {
    /// Human-readable finding.
    pub fn message(&self) -> String {
        format!(
            "avoid direct access to proto field {}, use {} instead",
            self.from, self.to
        )
    }

    /// Replace the whole node with the rendered `to` text.
    pub fn suggested_fix(&self) -> Edit {
        Edit::new(self.span, self.to.clone())
    }

    /// The node's source text with only the member edits applied, keeping
    /// its original spacing.
    pub fn preserved_replacement(&self, source: &str) -> FixResult<String> {
        let (start, end) = (self.span.start as usize, self.span.end as usize);
        let original = source
            .get(start..end)
            .ok_or(FixError::NotCharBoundary { span: self.span })?;

        let mut local = Vec::with_capacity(self.edits.len());
        for edit in &self.edits {
            if !self.span.contains(&edit.span) {
                return Err(FixError::SpanOutOfBounds {
                    span: edit.span,
                    source_len: source.len() as u64,
                });
            }
            let shifted = Span::new(
                edit.span.start - self.span.start,
                edit.span.end - self.span.start,
            );
            local.push(Edit::new(shifted, edit.new_text.clone()));
        }

        EditApplier::new(original, local).apply()
    }

    /// Line-oriented issue with an inline fix, as consumed by aggregating
    /// linters. Multi-line nodes get no inline fix.
    pub fn to_issue(&self, source: &str) -> Issue {
        let location = Location::from_span(&self.file, source.as_bytes(), self.span);
        let inline_fix = if span_is_multiline(source.as_bytes(), &self.span) {
            None
        } else {
            self.preserved_replacement(source)
                .ok()
                .map(|new_string| {
                    let (_, col) = byte_offset_to_position(source.as_bytes(), self.span.start as usize);
                    InlineFix {
                        start_col: col - 1,
                        length: self.span.len(),
                        new_string,
                    }
                })
        };

        Issue {
            location,
            message: self.message(),
            inline_fix,
        }
    }
}

/// A structural failure scoped to one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub file: String,
    pub span: Span,
    pub line: u32,
    pub message: String,
}

impl Diagnostic {
    /// Wrap a render failure, anchored at the node being evaluated.
    pub fn from_render_error(file: impl Into<String>, span: Span, line: u32, err: &RenderError) -> Self {
        Diagnostic {
            file: file.into(),
            span,
            line,
            message: format!("error: {}", err),
        }
    }
}

/// Issue with an optional single-line fix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub location: Location,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_fix: Option<InlineFix>,
}

/// Replace `length` bytes starting at zero-based column `start_col`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineFix {
    pub start_col: u32,
    pub length: u64,
    pub new_string: String,
}

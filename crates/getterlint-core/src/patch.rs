//! Patch IR: byte spans, text edits, and batch edit application.
//!
//! Edits produced by the rewrite engine are applied from end to start so
//! earlier spans stay valid while later text changes length.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Byte offsets into file content.
///
/// Spans are half-open intervals: `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: u64,
    /// End byte offset (exclusive).
    pub end: u64,
}

impl Span {
    /// Create a new span.
    ///
    /// # Panics
    /// Panics if `start > end`.
    pub fn new(start: u64, end: u64) -> Self {
        assert!(
            start <= end,
            "Span start ({}) must be <= end ({})",
            start,
            end
        );
        Span { start, end }
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Check if span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Check if this span overlaps with another.
    ///
    /// Adjacent spans (one ends where another starts) do NOT overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Check if this span contains another span entirely.
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// A single text replacement: replace the bytes at `span` with `new_text`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edit {
    /// Byte range being replaced.
    pub span: Span,
    /// Replacement text.
    pub new_text: String,
}

impl Edit {
    /// Create a new edit.
    pub fn new(span: Span, new_text: impl Into<String>) -> Self {
        Edit {
            span,
            new_text: new_text.into(),
        }
    }
}

/// Errors while applying a batch of edits to one file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FixError {
    /// An edit extends beyond the source text.
    #[error("span {span} is out of bounds for source of length {source_len}")]
    SpanOutOfBounds { span: Span, source_len: u64 },

    /// Two different edits touch the same bytes.
    #[error("overlapping edits: {first} and {second}")]
    OverlappingEdits { first: Span, second: Span },

    /// An edit boundary does not fall on a UTF-8 character boundary.
    #[error("span {span} does not fall on character boundaries")]
    NotCharBoundary { span: Span },
}

/// Result type for edit application.
pub type FixResult<T> = Result<T, FixError>;

/// Applies a batch of edits to a single source text.
///
/// Identical edits (same span, same text) are collapsed, because nested
/// reports can rewrite the same member twice. Distinct overlapping edits are
/// rejected.
pub struct EditApplier<'src> {
    source: &'src str,
    edits: Vec<Edit>,
}

impl<'src> EditApplier<'src> {
    /// Create an applier over `source`.
    pub fn new(source: &'src str, edits: Vec<Edit>) -> Self {
        Self { source, edits }
    }

    /// Sorted, de-duplicated, validated edits.
    pub fn normalized(&self) -> FixResult<Vec<Edit>> {
        let source_len = self.source.len() as u64;
        let mut edits = self.edits.clone();

        for edit in &edits {
            if edit.span.end > source_len {
                return Err(FixError::SpanOutOfBounds {
                    span: edit.span,
                    source_len,
                });
            }
            let (start, end) = (edit.span.start as usize, edit.span.end as usize);
            if !self.source.is_char_boundary(start) || !self.source.is_char_boundary(end) {
                return Err(FixError::NotCharBoundary { span: edit.span });
            }
        }

        edits.sort_by(|a, b| a.span.cmp(&b.span).then_with(|| a.new_text.cmp(&b.new_text)));
        edits.dedup();

        for pair in edits.windows(2) {
            if pair[0].span.overlaps(&pair[1].span) || pair[0].span == pair[1].span {
                return Err(FixError::OverlappingEdits {
                    first: pair[0].span,
                    second: pair[1].span,
                });
            }
        }

        Ok(edits)
    }

    /// Apply all edits and return the transformed source.
    pub fn apply(self) -> FixResult<String> {
        let edits = self.normalized()?;

        let mut result = self.source.to_string();
        for edit in edits.iter().rev() {
            let start = edit.span.start as usize;
            let end = edit.span.end as usize;
            result.replace_range(start..end, &edit.new_text);
        }

        Ok(result)
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Common types shared between the report and output modules.

use serde::{Deserialize, Serialize};

use crate::patch::Span;
use crate::text::byte_offset_to_position;

/// Location in a source file.
///
/// - `file`: Workspace-relative path
/// - `line`: 1-indexed line number
/// - `col`: 1-indexed column, UTF-8 bytes
/// - `byte_start` / `byte_end`: optional byte range
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Location {
    /// File path (workspace-relative).
    pub file: String,
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed, UTF-8 bytes).
    pub col: u32,
    /// Byte offset from file start (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byte_start: Option<u64>,
    /// Byte offset end, exclusive (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byte_end: Option<u64>,
}

impl Location {
    /// Create a new location without byte offsets.
    pub fn new(file: impl Into<String>, line: u32, col: u32) -> Self {
        Location {
            file: file.into(),
            line,
            col,
            byte_start: None,
            byte_end: None,
        }
    }

    /// Locate a span inside `content`, keeping its byte range.
    pub fn from_span(file: impl Into<String>, content: &[u8], span: Span) -> Self {
        let (line, col) = byte_offset_to_position(content, span.start as usize);
        Location {
            file: file.into(),
            line,
            col,
            byte_start: Some(span.start),
            byte_end: Some(span.end),
        }
    }

    /// Format as `file:line:col`.
    pub fn to_display(&self) -> String {
        format!("{}:{}:{}", self.file, self.line, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_serializes_without_byte_offsets() {
        let loc = Location::new("a.go", 4, 2);
        let json = serde_json::to_string(&loc).unwrap();
        assert!(!json.contains("byte_start"));
        assert!(!json.contains("byte_end"));
    }

    #[test]
    fn from_span_resolves_line_and_col() {
        let loc = Location::from_span("a.go", b"x\n  t.S", Span::new(4, 7));
        assert_eq!((loc.line, loc.col), (2, 3));
        assert_eq!(loc.byte_start, Some(4));
        assert_eq!(loc.to_display(), "a.go:2:3");
    }
}

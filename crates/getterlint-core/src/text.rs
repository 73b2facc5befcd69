//! Text position utilities for byte offset and line:column conversions.
//!
//! ## Coordinate Conventions
//!
//! - Lines and columns are **1-indexed** (matching editor conventions)
//! - Byte offsets are **0-indexed**
//! - Columns count bytes, not characters

use crate::patch::Span;

/// Convert a byte offset to 1-indexed line and column.
///
/// If `offset` exceeds content length, returns position at end of content.
pub fn byte_offset_to_position(content: &[u8], offset: usize) -> (u32, u32) {
    let offset = offset.min(content.len());
    let mut line = 1u32;
    let mut col = 1u32;

    for &byte in &content[..offset] {
        if byte == b'\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }

    (line, col)
}

/// Whether the span covers a newline, i.e. does not fit on one line.
pub fn span_is_multiline(content: &[u8], span: &Span) -> bool {
    extract_span(content, span).is_some_and(|bytes| bytes.contains(&b'\n'))
}

/// Extract the bytes of a span, if it lies within the content.
pub fn extract_span<'a>(content: &'a [u8], span: &Span) -> Option<&'a [u8]> {
    let start = span.start as usize;
    let end = span.end as usize;
    if end <= content.len() && start <= end {
        Some(&content[start..end])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_to_position_across_lines() {
        let content = b"package p\n\nvar x = t.S\n";
        assert_eq!(byte_offset_to_position(content, 0), (1, 1));
        assert_eq!(byte_offset_to_position(content, 10), (2, 1));
        assert_eq!(byte_offset_to_position(content, 19), (3, 9));
    }

    #[test]
    fn offset_past_end_clamps() {
        assert_eq!(byte_offset_to_position(b"ab", 99), (1, 3));
    }

    #[test]
    fn multiline_detection() {
        let content = b"f(a,\n  b)";
        assert!(span_is_multiline(content, &Span::new(0, 9)));
        assert!(!span_is_multiline(content, &Span::new(0, 4)));
    }

    #[test]
    fn extract_span_bounds() {
        assert_eq!(extract_span(b"hello", &Span::new(1, 3)), Some(&b"el"[..]));
        assert_eq!(extract_span(b"hello", &Span::new(1, 9)), None);
    }
}

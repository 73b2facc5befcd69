//! Per-file suppression state for the rewrite driver.
//!
//! One [`PositionFilter`] lives for exactly one file traversal. It records
//! two things:
//!
//! - start positions that must never be analyzed (write targets, nodes that
//!   were already reported),
//! - the widest span already rewritten on each line, so a nested selector
//!   inside a reported chain is not reported a second time.

use std::collections::{HashMap, HashSet};

use crate::patch::Span;

/// Suppressed positions plus already-rewritten spans keyed by `(file, line)`.
#[derive(Debug, Default, Clone)]
pub struct PositionFilter {
    positions: HashSet<u64>,
    replaced: HashMap<(String, u32), Span>,
}

impl PositionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a start position as suppressed. Idempotent.
    pub fn add_pos(&mut self, pos: u64) {
        self.positions.insert(pos);
    }

    /// Whether a start position is suppressed.
    pub fn is_filtered(&self, pos: u64) -> bool {
        self.positions.contains(&pos)
    }

    /// Whether `span` lies inside the span already rewritten on this line.
    pub fn is_already_replaced(&self, file: &str, line: u32, span: Span) -> bool {
        self.replaced
            .get(&(file.to_string(), line))
            .is_some_and(|recorded| recorded.contains(&span))
    }

    /// Record `span` as rewritten on this line.
    ///
    /// A span already contained in the recorded one is ignored, so the
    /// recorded span never narrows. Any other span replaces it.
    pub fn add_already_replaced(&mut self, file: &str, line: u32, span: Span) {
        if self.is_already_replaced(file, line, span) {
            return;
        }
        self.replaced.insert((file.to_string(), line), span);
    }

    /// Number of suppressed positions.
    pub fn suppressed_count(&self) -> usize {
        self.positions.len()
    }
}

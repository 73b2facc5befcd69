//! Unified diff generation utilities.
//!
//! Getter fixes only rewrite text inside a line, so a file's before and
//! after contents line up one-to-one; each changed line becomes its own
//! one-line hunk.

use serde::{Deserialize, Serialize};

/// Before/after contents of one fixed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    /// Workspace-relative file path.
    pub file: String,
    pub before: String,
    pub after: String,
}

/// Generate a unified diff for a set of changed files, in the given order.
pub fn generate_unified_diff(changes: &[FileChange]) -> String {
    let mut diff = String::new();
    for change in changes {
        if change.before == change.after {
            continue;
        }
        diff.push_str(&format!("--- a/{}\n", change.file));
        diff.push_str(&format!("+++ b/{}\n", change.file));

        let old: Vec<&str> = change.before.lines().collect();
        let new: Vec<&str> = change.after.lines().collect();

        if old.len() != new.len() {
            diff.push_str(&format!("@@ -1,{} +1,{} @@\n", old.len(), new.len()));
            for line in &old {
                diff.push_str(&format!("-{}\n", line));
            }
            for line in &new {
                diff.push_str(&format!("+{}\n", line));
            }
            continue;
        }

        for (idx, (before, after)) in old.iter().zip(&new).enumerate() {
            if before == after {
                continue;
            }
            let line = idx + 1;
            diff.push_str(&format!("@@ -{},1 +{},1 @@\n", line, line));
            diff.push_str(&format!("-{}\n", before));
            diff.push_str(&format!("+{}\n", after));
        }
    }
    diff
}

// ============================================================================
// Tests
// ============================================================================

//! Lexical scopes for local variable types.

use std::collections::HashMap;

use crate::types::GoType;

/// Stack of lexical scopes. The outermost frame is the file scope and is
/// never popped.
#[derive(Debug)]
pub struct ScopeStack {
    frames: Vec<HashMap<String, GoType>>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    pub fn new() -> Self {
        Self {
            frames: vec![HashMap::new()],
        }
    }

    pub fn push(&mut self) {
        self.frames.push(HashMap::new());
    }

    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Bind a name in the innermost scope. The blank identifier is ignored.
    pub fn bind(&mut self, name: &str, ty: GoType) {
        if name == "_" {
            return;
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_string(), ty);
        }
    }

    /// Innermost binding for a name.
    pub fn lookup(&self, name: &str) -> Option<&GoType> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

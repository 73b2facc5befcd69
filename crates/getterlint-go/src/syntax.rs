//! Parsing Go source with tree-sitter.

use getterlint_core::error::LintError;
use thiserror::Error;
use tree_sitter::{Node, Parser, Tree};

/// Errors produced by the Go front-end.
#[derive(Debug, Error)]
pub enum FrontendError {
    /// The tree-sitter grammar could not be loaded.
    #[error("failed to load Go grammar: {0}")]
    Grammar(String),

    /// tree-sitter produced no tree.
    #[error("parser produced no tree for {path}")]
    NoTree { path: String },

    /// The file contains syntax errors.
    #[error("syntax error in {path} at line {line}, column {col}")]
    Syntax { path: String, line: u32, col: u32 },

    /// A file or directory could not be read.
    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },

    /// A requested path does not exist.
    #[error("path not found: {path}")]
    NotFound { path: String },
}

impl From<FrontendError> for LintError {
    fn from(err: FrontendError) -> Self {
        match err {
            FrontendError::Grammar(message) => LintError::InternalError {
                message: format!("failed to load Go grammar: {}", message),
            },
            FrontendError::NoTree { path } => LintError::ParseFailed {
                path,
                message: "parser produced no tree".to_string(),
            },
            FrontendError::Syntax { path, line, col } => LintError::ParseFailed {
                message: format!("syntax error at line {}, column {}", line, col),
                path,
            },
            FrontendError::Io { path, message } => LintError::Io { path, message },
            FrontendError::NotFound { path } => LintError::FileNotFound { path },
        }
    }
}

/// Parse one Go file, rejecting trees that contain syntax errors.
pub fn parse_go(path: &str, source: &str) -> Result<Tree, FrontendError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_go::language())
        .map_err(|e| FrontendError::Grammar(e.to_string()))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| FrontendError::NoTree {
            path: path.to_string(),
        })?;

    if tree.root_node().has_error() {
        let at = first_error(tree.root_node()).unwrap_or(tree.root_node());
        let pos = at.start_position();
        return Err(FrontendError::Syntax {
            path: path.to_string(),
            line: pos.row as u32 + 1,
            col: pos.column as u32 + 1,
        });
    }

    Ok(tree)
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() {
            if let Some(found) = first_error(child) {
                return Some(found);
            }
        }
    }
    None
}

/// Source text of a node.
pub(crate) fn node_text<'s>(node: Node<'_>, src: &'s [u8]) -> &'s str {
    node.utf8_text(src).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_file() {
        let tree = parse_go("a.go", "package a\n\nfunc f() {}\n").unwrap();
        assert_eq!(tree.root_node().kind(), "source_file");
    }

    #[test]
    fn reports_syntax_error_position() {
        let err = parse_go("a.go", "package a\n\nfunc f() {\n\tx := \n").unwrap_err();
        match err {
            FrontendError::Syntax { path, line, .. } => {
                assert_eq!(path, "a.go");
                assert!(line >= 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    mod lint_error_bridge {
        use super::*;
        use getterlint_core::error::OutputErrorCode;

        #[test]
        fn syntax_error_is_parse_failure() {
            let err: LintError = FrontendError::Syntax {
                path: "a.go".into(),
                line: 3,
                col: 7,
            }
            .into();
            assert_eq!(err.error_code(), OutputErrorCode::ParseError);
            assert_eq!(
                err.to_string(),
                "failed to parse a.go: syntax error at line 3, column 7"
            );
        }

        #[test]
        fn missing_path_is_resolution_error() {
            let err: LintError = FrontendError::NotFound {
                path: "nope".into(),
            }
            .into();
            assert_eq!(err.error_code(), OutputErrorCode::ResolutionError);
        }

        #[test]
        fn grammar_failure_is_internal() {
            let err: LintError = FrontendError::Grammar("version mismatch".into()).into();
            assert_eq!(err.error_code(), OutputErrorCode::InternalError);
        }

        #[test]
        fn parse_failure_converts_with_question_mark() {
            fn load(source: &str) -> Result<Tree, LintError> {
                Ok(parse_go("b.go", source)?)
            }
            let err = load("package b\n\nfunc {\n").unwrap_err();
            assert_eq!(err.error_code(), OutputErrorCode::ParseError);
        }
    }
}

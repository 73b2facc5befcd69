//! Go language support for getterlint.
//!
//! This crate provides the Go front-end:
//! - Parsing with tree-sitter
//! - A cross-file declaration index and message type detection
//! - Scope-aware lowering into the core expression/statement tree
//! - A [`TypeOracle`](getterlint_core::TypeOracle) over lowered types
//! - Workspace file discovery and per-file analysis

pub mod index;
pub mod lower;
pub mod oracle;
pub mod package;
pub mod scope;
pub mod syntax;
pub mod types;

pub use index::{collect_decls, FileDecls, TypeIndex};
pub use lower::{lower_file, LoweredFile};
pub use oracle::GoOracle;
pub use package::{
    analyze_source, analyze_sources, discover_go_files, load_workspace, GoFile, LoadedWorkspace,
};
pub use syntax::{parse_go, FrontendError};

//! Core infrastructure for getterlint.
//!
//! This crate provides the language-agnostic pieces:
//! - A lowered expression/statement tree and its traversal
//! - The selector rewrite engine (classify, render, filter, report)
//! - The type oracle interface front-ends implement
//! - Patch IR and edit application for fixes
//! - Error types and error codes
//! - Configuration and file skip rules
//! - JSON output types, text utilities, and diff generation

pub mod ast;
pub mod classify;
pub mod config;
pub mod diff;
pub mod driver;
pub mod error;
pub mod filter;
pub mod oracle;
pub mod output;
pub mod patch;
pub mod render;
pub mod report;
pub mod text;
pub mod types;
pub mod visit;

#[cfg(test)]
pub(crate) mod testing;

pub use driver::{analyze_file, FileAnalysis, Outcome, RewriteDriver};
pub use oracle::{MessageOracle, TypeOracle};
pub use report::{Diagnostic, Report};

//! Error types and error code constants for getterlint.
//!
//! `LintError` is the single error type surfaced by the CLI. Subsystem
//! errors (`FixError`, `ConfigError`, and the front-end's error type) are
//! bridged into it with `From` impls.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments (bad input from caller)
//! - `3`: Resolution errors (file not found, unreadable input)
//! - `4`: Parse errors (source could not be parsed)
//! - `5`: Apply errors (failed to apply fixes)
//! - `10`: Internal errors (bugs, unexpected state)
//!
//! Structural render errors are not part of `LintError`; they surface per
//! node as diagnostics.

use std::fmt;

use thiserror::Error;

use crate::config::ConfigError;
use crate::patch::FixError;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output and process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller.
    InvalidArguments = 2,
    /// Missing or unreadable input.
    ResolutionError = 3,
    /// Source could not be parsed.
    ParseError = 4,
    /// Fixes could not be applied.
    ApplyError = 5,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for CLI output.
#[derive(Debug, Error)]
pub enum LintError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// A path named on the command line does not exist.
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    /// Reading or writing a file failed.
    #[error("io error on {path}: {message}")]
    Io { path: String, message: String },

    /// A source file could not be parsed.
    #[error("failed to parse {path}: {message}")]
    ParseFailed { path: String, message: String },

    /// Failed to apply fixes.
    #[error("apply error: {message}")]
    ApplyError {
        message: String,
        file: Option<String>,
    },

    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    InternalError { message: String },
}

impl From<&LintError> for OutputErrorCode {
    fn from(err: &LintError) -> Self {
        match err {
            LintError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            LintError::FileNotFound { .. } => OutputErrorCode::ResolutionError,
            LintError::Io { .. } => OutputErrorCode::ResolutionError,
            LintError::ParseFailed { .. } => OutputErrorCode::ParseError,
            LintError::ApplyError { .. } => OutputErrorCode::ApplyError,
            LintError::Config(_) => OutputErrorCode::InvalidArguments,
            LintError::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<LintError> for OutputErrorCode {
    fn from(err: LintError) -> Self {
        OutputErrorCode::from(&err)
    }
}

// ============================================================================
// Bridge: FixError -> LintError
// ============================================================================

impl LintError {
    /// Bridge a fix failure, naming the file it happened in.
    pub fn from_fix(err: FixError, file: impl Into<String>) -> Self {
        LintError::ApplyError {
            message: err.to_string(),
            file: Some(file.into()),
        }
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl LintError {
    /// Create an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        LintError::InvalidArguments {
            message: message.into(),
        }
    }

    /// Create a file not found error.
    pub fn file_not_found(path: impl Into<String>) -> Self {
        LintError::FileNotFound { path: path.into() }
    }

    /// Create an io error for `path`.
    pub fn io(path: impl Into<String>, err: &std::io::Error) -> Self {
        LintError::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        LintError::InternalError {
            message: message.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

// ============================================================================
// Tests
// ============================================================================

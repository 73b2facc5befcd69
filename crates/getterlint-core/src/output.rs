//! JSON output types and serialization for CLI responses.
//!
//! ## Principles
//!
//! 1. **Status first:** Every response has `status` as its first field
//! 2. **Deterministic:** Same input, same bytes (findings sorted by location)
//! 3. **Absent means not applicable:** optional fields are skipped, not null
//! 4. **Versioned:** `schema_version` in every response

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::config::Mode;
use crate::error::{LintError, OutputErrorCode};
use crate::patch::Span;
use crate::report::{Diagnostic, InlineFix, Report};
use crate::text::byte_offset_to_position;

pub use crate::types::Location;

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Findings
// ============================================================================

/// Whole-node replacement offered with a standalone finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedFix {
    pub span: Span,
    pub new_text: String,
}

/// One reported field read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub location: Location,
    pub message: String,
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<SuggestedFix>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_fix: Option<InlineFix>,
}

impl Finding {
    /// Render a report for the given surface. `source` is the file content
    /// the report was computed from.
    pub fn from_report(report: &Report, source: &str, mode: Mode) -> Self {
        match mode {
            Mode::Standalone => {
                let fix = report.suggested_fix();
                Finding {
                    location: Location::from_span(&report.file, source.as_bytes(), report.span),
                    message: report.message(),
                    from: report.from.clone(),
                    to: report.to.clone(),
                    suggested_fix: Some(SuggestedFix {
                        span: fix.span,
                        new_text: fix.new_text,
                    }),
                    inline_fix: None,
                }
            }
            Mode::Golangci => {
                let issue = report.to_issue(source);
                Finding {
                    location: issue.location,
                    message: issue.message,
                    from: report.from.clone(),
                    to: report.to.clone(),
                    suggested_fix: None,
                    inline_fix: issue.inline_fix,
                }
            }
        }
    }
}

/// A structural problem reported instead of a finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticInfo {
    pub location: Location,
    pub message: String,
}

impl DiagnosticInfo {
    pub fn from_diagnostic(diagnostic: &Diagnostic, source: &str) -> Self {
        DiagnosticInfo {
            location: Location::from_span(&diagnostic.file, source.as_bytes(), diagnostic.span),
            message: diagnostic.message.clone(),
        }
    }
}

// ============================================================================
// Edits
// ============================================================================

/// A single applied edit as it appears in output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputEdit {
    /// Workspace-relative file path.
    pub file: String,
    /// Byte range being replaced.
    pub span: Span,
    /// Original text.
    pub old_text: String,
    /// Replacement text.
    pub new_text: String,
    /// 1-indexed line number.
    pub line: u32,
    /// 1-indexed column.
    pub col: u32,
}

impl OutputEdit {
    pub fn new(file: impl Into<String>, source: &str, span: Span, new_text: impl Into<String>) -> Self {
        let (line, col) = byte_offset_to_position(source.as_bytes(), span.start as usize);
        OutputEdit {
            file: file.into(),
            span,
            old_text: source
                .get(span.start as usize..span.end as usize)
                .unwrap_or_default()
                .to_string(),
            new_text: new_text.into(),
            line,
            col,
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Error information for error responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Numeric error code.
    pub code: u8,
    /// Human-readable message.
    pub message: String,
    /// Error-specific structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorInfo {
    /// Create from a LintError.
    pub fn from_error(err: &LintError) -> Self {
        let details = match err {
            LintError::FileNotFound { path }
            | LintError::Io { path, .. }
            | LintError::ParseFailed { path, .. } => Some(serde_json::json!({ "path": path })),
            LintError::ApplyError { file, .. } => {
                file.as_ref().map(|f| serde_json::json!({ "file": f }))
            }
            _ => None,
        };

        ErrorInfo {
            code: OutputErrorCode::from(err).code(),
            message: err.to_string(),
            details,
        }
    }
}

// ============================================================================
// Response Structs
// ============================================================================

/// Response for the `check` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResponse {
    /// Status: "ok".
    pub status: String,
    pub schema_version: String,
    pub mode: Mode,
    pub files_analyzed: u32,
    pub files_skipped: u32,
    pub findings: Vec<Finding>,
    pub diagnostics: Vec<DiagnosticInfo>,
}

impl CheckResponse {
    pub fn new(
        mode: Mode,
        files_analyzed: u32,
        files_skipped: u32,
        mut findings: Vec<Finding>,
        mut diagnostics: Vec<DiagnosticInfo>,
    ) -> Self {
        findings.sort_by(|a, b| a.location.cmp(&b.location));
        diagnostics.sort_by(|a, b| a.location.cmp(&b.location));
        CheckResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            mode,
            files_analyzed,
            files_skipped,
            findings,
            diagnostics,
        }
    }

    /// Whether anything was reported.
    pub fn has_findings(&self) -> bool {
        !self.findings.is_empty() || !self.diagnostics.is_empty()
    }
}

/// Response for the `fix` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixResponse {
    /// Status: "ok".
    pub status: String,
    pub schema_version: String,
    /// Whether files were written (false for `--dry-run`).
    pub applied: bool,
    pub files_changed: u32,
    pub edits: Vec<OutputEdit>,
    pub unified_diff: String,
    /// Structural problems found while collecting fixes.
    pub diagnostics: Vec<DiagnosticInfo>,
}

impl FixResponse {
    pub fn new(
        applied: bool,
        files_changed: u32,
        edits: Vec<OutputEdit>,
        unified_diff: String,
        diagnostics: Vec<DiagnosticInfo>,
    ) -> Self {
        FixResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            applied,
            files_changed,
            edits,
            unified_diff,
            diagnostics,
        }
    }
}

/// Error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    pub schema_version: String,
    pub error: ErrorInfo,
}

impl ErrorResponse {
    pub fn from_error(err: &LintError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

// ============================================================================
// Emission
// ============================================================================

/// Emit a response as pretty-printed JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

/// Emit a check response as `file:line:col: message` lines.
pub fn emit_text(response: &CheckResponse, writer: &mut impl Write) -> io::Result<()> {
    let mut lines: Vec<(&Location, &str)> = response
        .findings
        .iter()
        .map(|f| (&f.location, f.message.as_str()))
        .chain(
            response
                .diagnostics
                .iter()
                .map(|d| (&d.location, d.message.as_str())),
        )
        .collect();
    lines.sort_by(|a, b| a.0.cmp(b.0));
    for (location, message) in lines {
        writeln!(writer, "{}: {}", location.to_display(), message)?;
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

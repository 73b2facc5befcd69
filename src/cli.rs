//! CLI front door.
//!
//! Provides the command implementations behind the `getterlint` binary:
//! - `check` - Report direct field reads on protobuf messages
//! - `fix` - Rewrite those reads into getter calls (or preview the diff)
//!
//! Both commands load the whole workspace so that message types declared
//! outside the requested paths are known, then analyze the requested files
//! in parallel. Files matched by the configured skip rules are indexed but
//! not analyzed.
//!
//! All functions return `Result<T, LintError>`; the binary turns errors into
//! an `ErrorResponse` and an exit code.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use getterlint_core::config::{Config, SkipRules};
use getterlint_core::diff::{generate_unified_diff, FileChange};
use getterlint_core::error::LintError;
use getterlint_core::output::{CheckResponse, DiagnosticInfo, Finding, FixResponse, OutputEdit};
use getterlint_core::patch::{Edit, EditApplier};
use getterlint_core::FileAnalysis;
use getterlint_go::{analyze_source, load_workspace, GoFile};
use rayon::prelude::*;
use tracing::debug;

/// Load configuration from an explicit file, or from the workspace root.
pub fn load_config(workspace: &Path, config_path: Option<&Path>) -> Result<Config, LintError> {
    let config = match config_path {
        Some(path) => Config::load(path)?,
        None => Config::load_from_workspace(workspace)?,
    };
    Ok(config)
}

/// An analyzed file together with the source it was analyzed from.
struct AnalyzedFile {
    file: GoFile,
    analysis: FileAnalysis,
}

/// Files analyzed plus the number skipped by configuration.
struct AnalysisRun {
    files: Vec<AnalyzedFile>,
    skipped: u32,
}

fn analyze_workspace(
    workspace: &Path,
    paths: &[PathBuf],
    config: &Config,
) -> Result<AnalysisRun, LintError> {
    let rules = SkipRules::compile(&config.getterlint)?;
    let loaded = load_workspace(workspace, paths)?;

    let mut skipped = 0u32;
    let mut targets = Vec::with_capacity(loaded.targets.len());
    for file in loaded.targets {
        match rules.skip_reason(&file.path, &file.source) {
            Some(reason) => {
                debug!(file = %file.path, ?reason, "skipping file");
                skipped += 1;
            }
            None => targets.push(file),
        }
    }

    let index = &loaded.index;
    let files = targets
        .into_par_iter()
        .map(|file| -> Result<AnalyzedFile, LintError> {
            let analysis = analyze_source(&file.path, &file.source, index)?;
            Ok(AnalyzedFile { file, analysis })
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!(analyzed = files.len(), skipped, "analysis complete");
    Ok(AnalysisRun { files, skipped })
}

fn diagnostics_of(run: &AnalysisRun) -> Vec<DiagnosticInfo> {
    run.files
        .iter()
        .flat_map(|f| {
            f.analysis
                .diagnostics
                .iter()
                .map(|d| DiagnosticInfo::from_diagnostic(d, &f.file.source))
        })
        .collect()
}

/// Analyze `paths` (the whole workspace when empty) and collect findings.
pub fn run_check(
    workspace: &Path,
    paths: &[PathBuf],
    config: &Config,
) -> Result<CheckResponse, LintError> {
    let run = analyze_workspace(workspace, paths, config)?;
    let mode = config.getterlint.mode;

    let findings: Vec<Finding> = run
        .files
        .iter()
        .flat_map(|f| {
            f.analysis
                .reports
                .iter()
                .map(|r| Finding::from_report(r, &f.file.source, mode))
        })
        .collect();
    let diagnostics = diagnostics_of(&run);

    Ok(CheckResponse::new(
        mode,
        run.files.len() as u32,
        run.skipped,
        findings,
        diagnostics,
    ))
}

/// Analyze `paths` and rewrite every reported read into getter calls.
///
/// Only member identifiers are replaced, so the surrounding formatting is
/// kept. Every file is fixed in memory before anything is written; with
/// `dry_run` nothing is written at all.
pub fn run_fix(
    workspace: &Path,
    paths: &[PathBuf],
    config: &Config,
    dry_run: bool,
) -> Result<FixResponse, LintError> {
    let run = analyze_workspace(workspace, paths, config)?;
    let diagnostics = diagnostics_of(&run);

    let mut changes = Vec::new();
    let mut output_edits = Vec::new();
    let mut absolute_paths = BTreeMap::new();
    for analyzed in &run.files {
        let edits: Vec<Edit> = analyzed
            .analysis
            .reports
            .iter()
            .flat_map(|r| r.edits.iter().cloned())
            .collect();
        if edits.is_empty() {
            continue;
        }

        let source = &analyzed.file.source;
        let path = &analyzed.file.path;
        let applier = EditApplier::new(source, edits);
        let normalized = applier
            .normalized()
            .map_err(|e| LintError::from_fix(e, path.as_str()))?;
        output_edits.extend(
            normalized
                .iter()
                .map(|e| OutputEdit::new(path.as_str(), source, e.span, e.new_text.as_str())),
        );
        let after = applier
            .apply()
            .map_err(|e| LintError::from_fix(e, path.as_str()))?;

        absolute_paths.insert(path.clone(), analyzed.file.absolute.clone());
        changes.push(FileChange {
            file: path.clone(),
            before: source.clone(),
            after,
        });
    }

    if !dry_run {
        for change in &changes {
            if let Some(absolute) = absolute_paths.get(&change.file) {
                std::fs::write(absolute, &change.after)
                    .map_err(|e| LintError::io(change.file.as_str(), &e))?;
                debug!(file = %change.file, "fixed");
            }
        }
    }

    let unified_diff = generate_unified_diff(&changes);
    Ok(FixResponse::new(
        !dry_run,
        changes.len() as u32,
        output_edits,
        unified_diff,
        diagnostics,
    ))
}

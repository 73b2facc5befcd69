//! Go file discovery, loading, and per-file analysis.
//!
//! Loading happens in two passes. The first parses every Go file in the
//! workspace and collects declarations into a shared [`TypeIndex`]; the
//! second (see [`analyze_source`]) re-parses one target file, lowers it, and
//! runs the rewrite engine against the index. Files outside the requested
//! targets still contribute their types, so a package that only imports
//! message types from elsewhere in the workspace is checked correctly.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use getterlint_core::{analyze_file, FileAnalysis};
use rayon::prelude::*;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::index::{collect_decls, FileDecls, TypeIndex};
use crate::lower::lower_file;
use crate::oracle::GoOracle;
use crate::syntax::{parse_go, FrontendError};

/// Directories the Go tool never treats as package sources.
const IGNORED_DIRS: &[&str] = &["vendor", "testdata", "node_modules"];

/// A Go source file read from disk.
#[derive(Debug, Clone)]
pub struct GoFile {
    /// Workspace-relative path with `/` separators.
    pub path: String,
    pub absolute: PathBuf,
    pub source: String,
}

/// Target files plus the declaration index of the whole workspace.
#[derive(Debug)]
pub struct LoadedWorkspace {
    pub targets: Vec<GoFile>,
    pub index: TypeIndex,
}

fn is_ignored_dir(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || name.starts_with('_') || IGNORED_DIRS.contains(&name.as_ref())
}

fn is_go_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "go")
}

/// Workspace-relative display path.
pub fn relative_path(workspace: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(workspace).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Every `.go` file under the given files or directories, sorted.
pub fn discover_go_files(
    workspace: &Path,
    paths: &[PathBuf],
) -> Result<Vec<PathBuf>, FrontendError> {
    let mut found = BTreeSet::new();
    for path in paths {
        let path = if path.is_absolute() {
            path.clone()
        } else {
            workspace.join(path)
        };
        if !path.exists() {
            return Err(FrontendError::NotFound {
                path: path.display().to_string(),
            });
        }
        if path.is_file() {
            found.insert(path);
            continue;
        }
        for entry in WalkDir::new(&path)
            .into_iter()
            .filter_entry(|e| !is_ignored_dir(e))
        {
            let entry = entry.map_err(|e| FrontendError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
            if entry.file_type().is_file() && is_go_file(entry.path()) {
                found.insert(entry.into_path());
            }
        }
    }
    Ok(found.into_iter().collect())
}

fn read_file(workspace: &Path, absolute: PathBuf) -> Result<GoFile, FrontendError> {
    let path = relative_path(workspace, &absolute);
    let source = std::fs::read_to_string(&absolute).map_err(|e| FrontendError::Io {
        path: path.clone(),
        message: e.to_string(),
    })?;
    Ok(GoFile {
        path,
        absolute,
        source,
    })
}

/// Collect declarations from one file.
pub fn file_decls(path: &str, source: &str) -> Result<FileDecls, FrontendError> {
    let tree = parse_go(path, source)?;
    Ok(collect_decls(&tree, source.as_bytes()))
}

/// Load the target files and index every Go file in the workspace.
///
/// A syntax error in a target file is fatal. Files that are only indexed
/// are skipped with a warning when they fail to parse.
pub fn load_workspace(
    workspace: &Path,
    targets: &[PathBuf],
) -> Result<LoadedWorkspace, FrontendError> {
    let workspace_paths = discover_go_files(workspace, &[workspace.to_path_buf()])?;
    let target_paths = if targets.is_empty() {
        workspace_paths.clone()
    } else {
        discover_go_files(workspace, targets)?
    };
    let mut all_paths: BTreeSet<PathBuf> = workspace_paths.into_iter().collect();
    all_paths.extend(target_paths.iter().cloned());

    let loaded: Vec<(bool, GoFile, Result<FileDecls, FrontendError>)> = all_paths
        .into_par_iter()
        .map(|absolute| {
            let is_target = target_paths.binary_search(&absolute).is_ok();
            let file = read_file(workspace, absolute)?;
            let decls = file_decls(&file.path, &file.source);
            Ok((is_target, file, decls))
        })
        .collect::<Result<_, FrontendError>>()?;

    let mut decls = Vec::with_capacity(loaded.len());
    let mut files = Vec::new();
    for (is_target, file, result) in loaded {
        match result {
            Ok(file_decls) => decls.push(file_decls),
            Err(err) if is_target => return Err(err),
            Err(err) => {
                warn!(file = %file.path, error = %err, "skipping unparseable file");
                continue;
            }
        }
        if is_target {
            files.push(file);
        }
    }

    debug!(
        targets = files.len(),
        indexed = decls.len(),
        "workspace loaded"
    );
    Ok(LoadedWorkspace {
        targets: files,
        index: TypeIndex::from_decls(decls),
    })
}

/// Parse, lower, and analyze one file against a prepared index.
pub fn analyze_source(
    path: &str,
    source: &str,
    index: &TypeIndex,
) -> Result<FileAnalysis, FrontendError> {
    let tree = parse_go(path, source)?;
    let lowered = lower_file(path, &tree, source, index);
    let oracle = GoOracle::new(&lowered, index);
    let analysis = analyze_file(&lowered.file, &oracle);
    debug!(
        file = path,
        reports = analysis.reports.len(),
        diagnostics = analysis.diagnostics.len(),
        "file analyzed"
    );
    Ok(analysis)
}

/// Analyze a self-contained set of in-memory files. Every file is indexed
/// and analyzed; results keep input order.
pub fn analyze_sources(
    files: &[(&str, &str)],
) -> Result<Vec<(String, FileAnalysis)>, FrontendError> {
    let decls = files
        .iter()
        .map(|(path, source)| file_decls(path, source))
        .collect::<Result<Vec<_>, _>>()?;
    let index = TypeIndex::from_decls(decls);
    files
        .iter()
        .map(|(path, source)| Ok((path.to_string(), analyze_source(path, source, &index)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    mod discovery {
        use super::*;

        #[test]
        fn skips_vendor_and_hidden_dirs() {
            let dir = TempDir::new().unwrap();
            write(dir.path(), "a.go", "package a\n");
            write(dir.path(), "sub/b.go", "package sub\n");
            write(dir.path(), "vendor/v.go", "package v\n");
            write(dir.path(), ".git/x.go", "package x\n");
            write(dir.path(), "notes.txt", "");

            let files = discover_go_files(dir.path(), &[dir.path().to_path_buf()]).unwrap();
            let rel: Vec<String> = files
                .iter()
                .map(|f| relative_path(dir.path(), f))
                .collect();
            assert_eq!(rel, vec!["a.go", "sub/b.go"]);
        }

        #[test]
        fn missing_path_is_not_found() {
            let dir = TempDir::new().unwrap();
            let err = discover_go_files(dir.path(), &[PathBuf::from("nope")]).unwrap_err();
            assert!(matches!(err, FrontendError::NotFound { .. }));
        }

        #[test]
        fn explicit_file_is_accepted() {
            let dir = TempDir::new().unwrap();
            write(dir.path(), "vendor/v.go", "package v\n");
            let files = discover_go_files(dir.path(), &[PathBuf::from("vendor/v.go")]).unwrap();
            assert_eq!(files.len(), 1);
        }
    }

    mod loading {
        use super::*;

        const PROTO: &str = "package proto\n\ntype Test struct {\n\tS string\n}\n\nfunc (x *Test) ProtoReflect() int { return 0 }\nfunc (x *Test) GetS() string { return \"\" }\n";

        #[test]
        fn targets_see_types_from_whole_workspace() {
            let dir = TempDir::new().unwrap();
            write(dir.path(), "proto/test.pb.go", PROTO);
            write(
                dir.path(),
                "cmd/main.go",
                "package main\n\nimport \"example.com/proto\"\n\nfunc f(t *proto.Test) {\n\t_ = t.S\n}\n",
            );

            let loaded = load_workspace(dir.path(), &[PathBuf::from("cmd")]).unwrap();
            assert_eq!(loaded.targets.len(), 1);
            let target = &loaded.targets[0];
            assert_eq!(target.path, "cmd/main.go");

            let analysis = analyze_source(&target.path, &target.source, &loaded.index).unwrap();
            assert_eq!(analysis.reports.len(), 1);
            assert_eq!(analysis.reports[0].to, "t.GetS()");
        }

        #[test]
        fn broken_non_target_is_skipped() {
            let dir = TempDir::new().unwrap();
            write(dir.path(), "broken/b.go", "package broken\n\nfunc {\n");
            write(dir.path(), "ok/a.go", "package ok\n");
            let loaded = load_workspace(dir.path(), &[PathBuf::from("ok")]).unwrap();
            assert_eq!(loaded.targets.len(), 1);
        }

        #[test]
        fn broken_target_is_fatal() {
            let dir = TempDir::new().unwrap();
            write(dir.path(), "broken/b.go", "package broken\n\nfunc {\n");
            let err = load_workspace(dir.path(), &[]).unwrap_err();
            assert!(matches!(err, FrontendError::Syntax { .. }));
        }
    }

    #[test]
    fn in_memory_sources_are_analyzed_in_order() {
        let results = analyze_sources(&[
            ("proto.go", "package proto\n\ntype Test struct {\n\tS string\n}\n\nfunc (x *Test) ProtoMessage() {}\nfunc (x *Test) GetS() string { return \"\" }\n"),
            ("use.go", "package proto\n\nfunc f(t *Test) string {\n\treturn t.S\n}\n"),
        ])
        .unwrap();
        assert_eq!(results[0].0, "proto.go");
        assert!(results[0].1.is_clean());
        assert_eq!(results[1].1.reports[0].from, "t.S");
        assert_eq!(results[1].1.reports[0].to, "t.GetS()");
    }
}

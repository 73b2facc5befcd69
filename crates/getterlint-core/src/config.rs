//! Configuration handling for getterlint
//!
//! Settings live under a `[getterlint]` table in `.getterlint.toml` at the
//! workspace root, or in a file named with `--config`:
//!
//! ```toml
//! [getterlint]
//! mode = "golangci"
//! skip_generated = true
//! skip_files = ["**/mocks/*.go"]
//! include_tests = false
//! ```

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default config file name, looked up in the workspace root.
pub const CONFIG_FILE_NAME: &str = ".getterlint.toml";

/// Errors while loading or compiling configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {message}")]
    Read { path: String, message: String },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("invalid skip pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// getterlint configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub getterlint: LintConfig,
}

/// How findings are surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Diagnostics with whole-node suggested fixes.
    #[default]
    Standalone,
    /// Line-oriented issues with inline fixes.
    Golangci,
}

/// Core lint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LintConfig {
    #[serde(default)]
    pub mode: Mode,

    /// Skip files carrying a generated-code header
    #[serde(default = "default_skip_generated")]
    pub skip_generated: bool,

    /// Glob patterns of files not to analyze
    #[serde(default)]
    pub skip_files: Vec<String>,

    /// Analyze `_test.go` files
    #[serde(default = "default_include_tests")]
    pub include_tests: bool,
}

fn default_skip_generated() -> bool {
    true
}

fn default_include_tests() -> bool {
    true
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            skip_generated: default_skip_generated(),
            skip_files: Vec::new(),
            include_tests: default_include_tests(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Load `.getterlint.toml` from the workspace root, or defaults
    pub fn load_from_workspace(root: &Path) -> Result<Self, ConfigError> {
        let config_path = root.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Config::default())
        }
    }
}

// ============================================================================
// Skip rules
// ============================================================================

/// Why a file was not analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Generated,
    Pattern,
    TestFile,
}

/// Compiled form of the file-selection settings.
#[derive(Debug, Clone)]
pub struct SkipRules {
    skip_generated: bool,
    include_tests: bool,
    patterns: GlobSet,
}

impl SkipRules {
    pub fn compile(config: &LintConfig) -> Result<Self, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.skip_files {
            let glob = Glob::new(pattern).map_err(|e| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
            builder.add(glob);
        }
        let patterns = builder.build().map_err(|e| ConfigError::InvalidPattern {
            pattern: config.skip_files.join(", "),
            message: e.to_string(),
        })?;

        Ok(Self {
            skip_generated: config.skip_generated,
            include_tests: config.include_tests,
            patterns,
        })
    }

    /// Decide whether the file at workspace-relative `path` is analyzed.
    pub fn skip_reason(&self, path: &str, source: &str) -> Option<SkipReason> {
        if self.patterns.is_match(path) {
            return Some(SkipReason::Pattern);
        }
        if !self.include_tests && path.ends_with("_test.go") {
            return Some(SkipReason::TestFile);
        }
        if self.skip_generated && is_generated(source) {
            return Some(SkipReason::Generated);
        }
        None
    }
}

impl Default for SkipRules {
    fn default() -> Self {
        Self {
            skip_generated: default_skip_generated(),
            include_tests: default_include_tests(),
            patterns: GlobSet::empty(),
        }
    }
}

static GENERATED_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^// Code generated .* DO NOT EDIT\.$").unwrap());

/// Whether the source carries a generated-code header before its package
/// clause.
pub fn is_generated(source: &str) -> bool {
    source
        .lines()
        .take_while(|line| !line.starts_with("package "))
        .any(|line| GENERATED_HEADER.is_match(line.trim_end_matches('\r')))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    mod loading {
        use super::*;

        #[test]
        fn missing_file_yields_defaults() {
            let dir = TempDir::new().unwrap();
            let config = Config::load_from_workspace(dir.path()).unwrap();
            assert_eq!(config.getterlint.mode, Mode::Standalone);
            assert!(config.getterlint.skip_generated);
            assert!(config.getterlint.include_tests);
        }

        #[test]
        fn partial_file_keeps_other_defaults() {
            let dir = TempDir::new().unwrap();
            fs::write(
                dir.path().join(CONFIG_FILE_NAME),
                "[getterlint]\nmode = \"golangci\"\nskip_files = [\"gen/**\"]\n",
            )
            .unwrap();
            let config = Config::load_from_workspace(dir.path()).unwrap();
            assert_eq!(config.getterlint.mode, Mode::Golangci);
            assert_eq!(config.getterlint.skip_files, vec!["gen/**".to_string()]);
            assert!(config.getterlint.skip_generated);
        }

        #[test]
        fn malformed_file_is_a_parse_error() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("bad.toml");
            fs::write(&path, "[getterlint\n").unwrap();
            assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
        }
    }

    mod skip_rules {
        use super::*;

        #[test]
        fn generated_header_detected_before_package() {
            assert!(is_generated(
                "// Code generated by protoc-gen-go. DO NOT EDIT.\n\npackage proto\n"
            ));
            assert!(!is_generated("package p\n\n// Code generated x DO NOT EDIT.\n"));
            assert!(!is_generated("// Code generated, edit freely\npackage p\n"));
        }

        #[test]
        fn patterns_and_tests_are_skipped() {
            let config = LintConfig {
                skip_files: vec!["mocks/*.go".into()],
                include_tests: false,
                ..LintConfig::default()
            };
            let rules = SkipRules::compile(&config).unwrap();
            assert_eq!(
                rules.skip_reason("mocks/a.go", "package m"),
                Some(SkipReason::Pattern)
            );
            assert_eq!(
                rules.skip_reason("a_test.go", "package p"),
                Some(SkipReason::TestFile)
            );
            assert_eq!(rules.skip_reason("a.go", "package p"), None);
        }

        #[test]
        fn invalid_pattern_is_rejected() {
            let config = LintConfig {
                skip_files: vec!["a[".into()],
                ..LintConfig::default()
            };
            assert!(matches!(
                SkipRules::compile(&config),
                Err(ConfigError::InvalidPattern { .. })
            ));
        }
    }
}

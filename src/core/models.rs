//! Core data models for codebundle
//!
//! This module contains the configuration, per-path records and run
//! statistics shared by the selector, codec, renderer and engine.

use crate::core::codec::is_known_encoding;
use crate::core::error::{BundleError, FileIssue, Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File patterns selected when no selection is configured
pub const DEFAULT_INCLUDE: &[&str] = &["*.cpp", "*.h", "*.hpp", "*.c", "*.py", "*.md"];

/// Directories dropped from the default selection, at any depth
pub const DEFAULT_EXCLUDE: &[&str] = &[
    "**/.git/",
    "**/node_modules/",
    "**/build/",
    "**/dist/",
    "**/__pycache__/",
];

/// Config file looked up in the bundle root
pub const DEFAULT_CONFIG_FILE: &str = ".codebundle.json";

/// Output file used when no destination is given
pub const DEFAULT_OUTPUT_FILE: &str = "bundle.md";

/// One selection step. Each string may itself be a comma-separated list.
///
/// Serialized externally tagged, so a config file reads
/// `[{"include": ["*.cpp"]}, {"exclude": ["build/"]}]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionOp {
    Include(Vec<String>),
    Exclude(Vec<String>),
}

impl SelectionOp {
    /// Include step from a single comma-separated list
    pub fn include(list: impl Into<String>) -> Self {
        SelectionOp::Include(vec![list.into()])
    }

    /// Exclude step from a single comma-separated list
    pub fn exclude(list: impl Into<String>) -> Self {
        SelectionOp::Exclude(vec![list.into()])
    }
}

/// Configuration loaded from `.codebundle.json` and CLI flags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
    /// Ordered selection steps; empty means the built-in defaults
    pub selection: Vec<SelectionOp>,
    /// Patterns rendered as placeholders without content
    pub paths_only: Vec<String>,
    /// `pattern:codec` rules, first match wins
    pub encoding: Vec<String>,
    /// Patterns whose original-bytes block is suppressed
    pub no_backup: Vec<String>,
    /// Encoding used for text files no rule covers
    pub default_encoding: Option<String>,
    /// Follow symbolic links while walking
    pub follow_symlinks: bool,
}

impl BundleConfig {
    /// Create a new BundleConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(BundleError::from)
            .context(format!("reading {}", path.display()))?;
        Self::from_json(&content).context(format!("loading {}", path.display()))
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that parse but cannot work.
    ///
    /// An unknown default encoding would fail every file it applies to, so
    /// it is rejected up front instead of per file.
    pub fn validate(&self) -> Result<()> {
        if let Some(label) = self.default_encoding.as_deref().map(str::trim) {
            if !label.is_empty() && !is_known_encoding(label) {
                return Err(BundleError::invalid_config(format!(
                    "unknown default encoding '{}'",
                    label
                )));
            }
        }
        Ok(())
    }

    /// Selection to run: the configured steps, or the defaults when none are set
    pub fn effective_selection(&self) -> Vec<SelectionOp> {
        if !self.selection.is_empty() {
            return self.selection.clone();
        }
        vec![
            SelectionOp::Include(DEFAULT_INCLUDE.iter().map(|s| s.to_string()).collect()),
            SelectionOp::Exclude(DEFAULT_EXCLUDE.iter().map(|s| s.to_string()).collect()),
        ]
    }

    /// Builder pattern: append an include step
    pub fn with_include(mut self, list: &str) -> Self {
        self.selection.push(SelectionOp::include(list));
        self
    }

    /// Builder pattern: append an exclude step
    pub fn with_exclude(mut self, list: &str) -> Self {
        self.selection.push(SelectionOp::exclude(list));
        self
    }

    /// Builder pattern: add paths-only patterns
    pub fn with_paths_only(mut self, list: &str) -> Self {
        self.paths_only.push(list.to_string());
        self
    }

    /// Builder pattern: add `pattern:codec` rules
    pub fn with_encoding(mut self, rules: &str) -> Self {
        self.encoding.push(rules.to_string());
        self
    }

    /// Builder pattern: add no-backup patterns
    pub fn with_no_backup(mut self, list: &str) -> Self {
        self.no_backup.push(list.to_string());
        self
    }

    /// Builder pattern: set the fallback encoding
    pub fn with_default_encoding(mut self, codec: &str) -> Self {
        self.default_encoding = Some(codec.to_string());
        self
    }
}

/// Where the rendered document goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    /// Create or truncate the file
    Overwrite(PathBuf),
    /// Create the file if needed and append
    Append(PathBuf),
}

impl OutputTarget {
    /// Destination file, if any
    pub fn file_path(&self) -> Option<&Path> {
        match self {
            OutputTarget::Stdout => None,
            OutputTarget::Overwrite(path) | OutputTarget::Append(path) => Some(path),
        }
    }

    /// Human-readable destination name
    pub fn describe(&self) -> String {
        match self.file_path() {
            Some(path) => path.display().to_string(),
            None => "<stdout>".to_string(),
        }
    }
}

impl Default for OutputTarget {
    fn default() -> Self {
        OutputTarget::Overwrite(PathBuf::from(DEFAULT_OUTPUT_FILE))
    }
}

/// Everything known about one emitted path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileRecord {
    /// Relative path
    pub path: String,
    /// Whether the path is a directory
    pub is_dir: bool,
    /// Rendered as a placeholder on request
    pub paths_only: bool,
    /// Canonical encoding name, when one was resolved
    pub encoding: Option<String>,
    /// UTF-8, LF-normalized content for text files
    pub text: Option<String>,
    /// Original bytes as read from disk
    pub raw: Vec<u8>,
    /// MD5 of `raw`
    pub md5: Option<String>,
    /// Whether an original-bytes block accompanies the text
    pub needs_backup: bool,
    /// Content is rendered as base64 only
    pub is_binary: bool,
    /// Per-file problem, if any
    pub error: Option<FileIssue>,
}

impl FileRecord {
    /// Placeholder record for a directory
    pub fn directory(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_dir: true,
            ..Default::default()
        }
    }

    /// Placeholder record for a paths-only file
    pub fn placeholder(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            paths_only: true,
            ..Default::default()
        }
    }

    /// Extension of the base name, used as the code fence language
    pub fn extension(&self) -> &str {
        let name = self.path.rsplit('/').next().unwrap_or(&self.path);
        match name.rfind('.') {
            Some(idx) if idx > 0 => &name[idx + 1..],
            _ => "",
        }
    }

    /// Whether an original-bytes block will be written after the text
    pub fn has_backup_block(&self) -> bool {
        self.text.is_some() && self.needs_backup
    }
}

/// Counters collected during a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleStats {
    pub files: usize,
    pub directories: usize,
    pub paths_only: usize,
    pub text: usize,
    pub binary: usize,
    pub backups: usize,
    pub errors: usize,
    pub bytes_read: u64,
}

impl BundleStats {
    /// Count one rendered record
    pub fn record(&mut self, record: &FileRecord) {
        if record.is_dir {
            self.directories += 1;
            return;
        }
        self.files += 1;
        if record.paths_only {
            self.paths_only += 1;
            return;
        }
        if record.text.is_some() {
            self.text += 1;
        } else if record.is_binary && !record.raw.is_empty() {
            self.binary += 1;
        }
        if record.has_backup_block() {
            self.backups += 1;
        }
        if record.error.is_some() {
            self.errors += 1;
        }
        self.bytes_read += record.raw.len() as u64;
    }

    /// Total records written
    pub fn total_records(&self) -> usize {
        self.files + self.directories
    }

    /// Print a summary on stderr
    pub fn print_report(&self) {
        eprintln!("{}", "=".repeat(40));
        eprintln!("BUNDLE REPORT");
        eprintln!("{}", "=".repeat(40));
        eprintln!("Files:        {:>8}", self.files);
        eprintln!("  text:       {:>8}", self.text);
        eprintln!("  binary:     {:>8}", self.binary);
        eprintln!("  paths-only: {:>8}", self.paths_only);
        eprintln!("Directories:  {:>8}", self.directories);
        eprintln!("Backups:      {:>8}", self.backups);
        eprintln!("Errors:       {:>8}", self.errors);
        eprintln!("Bytes read:   {:>8}", self.bytes_read);
    }
}

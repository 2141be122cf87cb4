//! Directory traversal for codebundle
//!
//! This module provides the [`TreeSource`] trait and the default
//! [`DirectoryTree`] implementation that enumerates every file and
//! directory under a root.

use crate::core::error::{BundleError, Result};
use std::cmp::Ordering;
use std::path::Path;

#[cfg(test)]
use mockall::automock;

/// Normalize path separators for cross-platform compatibility.
/// - Converts Windows backslashes to forward slashes
/// - Strips Windows UNC prefix `\\?\` if present
pub fn normalize_path_separators(path: &str) -> String {
    let mut normalized = path.to_string();

    // Strip Windows UNC prefix (\\?\ or \\.\)
    if normalized.starts_with(r"\\?\") || normalized.starts_with(r"\\.\") {
        normalized = normalized[4..].to_string();
    }

    normalized.replace('\\', "/")
}

/// A path relative to the bundle root, always `/`-separated
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathEntry {
    /// Relative path without leading or trailing separator
    pub path: String,
    /// Whether the path names a directory
    pub is_dir: bool,
}

impl PathEntry {
    /// Create a file entry
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_dir: false,
        }
    }

    /// Create a directory entry
    pub fn dir(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_dir: true,
        }
    }

    /// Last path component
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

impl Ord for PathEntry {
    /// Component-wise ordering, so `a/b` sorts before `a.txt` and a
    /// directory sorts before its own contents.
    fn cmp(&self, other: &Self) -> Ordering {
        self.path
            .split('/')
            .cmp(other.path.split('/'))
            .then(self.is_dir.cmp(&other.is_dir))
    }
}

impl PartialOrd for PathEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Sort entries into document order
pub fn sort_paths(entries: &mut [PathEntry]) {
    entries.sort();
}

/// Source of the path universe
///
/// This trait allows for mocking in tests and alternative implementations
/// (e.g., in-memory trees).
#[cfg_attr(test, automock)]
pub trait TreeSource {
    /// Enumerate every file and directory beneath `root`, root excluded
    fn enumerate(&self, root: &Path) -> Result<Vec<PathEntry>>;
}

/// Configuration for directory walking
#[derive(Debug, Clone, Default)]
pub struct WalkConfig {
    /// Follow symbolic links while descending
    pub follow_symlinks: bool,
}

/// Filesystem-backed tree source built on `walkdir`
#[derive(Debug, Clone, Default)]
pub struct DirectoryTree {
    config: WalkConfig,
}

impl DirectoryTree {
    /// Create a new DirectoryTree
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom configuration
    pub fn with_config(config: WalkConfig) -> Self {
        Self { config }
    }
}

impl TreeSource for DirectoryTree {
    fn enumerate(&self, root: &Path) -> Result<Vec<PathEntry>> {
        if !root.exists() {
            return Err(BundleError::PathNotFound {
                path: root.to_path_buf(),
            });
        }
        if !root.is_dir() {
            return Err(BundleError::NotADirectory {
                path: root.to_path_buf(),
            });
        }

        let mut entries = Vec::new();

        for result in walkdir::WalkDir::new(root)
            .min_depth(1)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name()
        {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Walk error: {}", e);
                    continue;
                }
            };

            let path = entry.path();
            let relative = match path.strip_prefix(root) {
                Ok(rel) => {
                    let lossy = rel.to_string_lossy();
                    if rel.to_str().is_none() {
                        tracing::warn!(
                            "{}: name is not valid UTF-8, its content cannot be bundled",
                            lossy
                        );
                    }
                    normalize_path_separators(&lossy)
                }
                Err(_) => continue,
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                entries.push(PathEntry::dir(relative));
            } else if file_type.is_file() || (file_type.is_symlink() && path.is_file()) {
                entries.push(PathEntry::file(relative));
            } else {
                tracing::debug!("Skipping special file: {}", relative);
            }
        }

        tracing::debug!("Enumerated {} paths under {}", entries.len(), root.display());
        Ok(entries)
    }
}

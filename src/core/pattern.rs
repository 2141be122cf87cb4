//! Role-aware path patterns
//!
//! A pattern with a trailing `/` is a directory rule, anything else is a
//! file rule. File rules look at a file's base name only. Directory rules
//! look at directory paths: a directory matches when it is the named
//! directory or lies beneath it, and a file matches when its parent chain
//! passes through the named directory.

use crate::core::error::{BundleError, Result};
use crate::core::walker::PathEntry;
use globset::{Glob, GlobBuilder, GlobMatcher};
use std::fmt;

/// A single compiled pattern
#[derive(Debug, Clone)]
pub enum PatternRule {
    /// Glob against the base name of a file. Never matches directories.
    FileGlob {
        pattern: String,
        matcher: GlobMatcher,
    },
    /// Directory and everything beneath it. An empty prefix is the root.
    DirectoryPrefix {
        prefix: String,
        /// Present when the prefix contains glob metacharacters
        matcher: Option<GlobMatcher>,
    },
}

impl PatternRule {
    /// Compile one pattern string
    pub fn parse(pattern: &str) -> Result<Self> {
        let normalized = pattern.trim().replace('\\', "/");
        if normalized.is_empty() {
            return Err(BundleError::InvalidPattern {
                pattern: pattern.to_string(),
                message: "empty pattern".to_string(),
            });
        }

        if let Some(dir) = normalized.strip_suffix('/') {
            let mut prefix = dir;
            while let Some(rest) = prefix.strip_prefix("./") {
                prefix = rest;
            }
            let prefix = prefix.trim_matches('/');
            let prefix = if prefix == "." { "" } else { prefix };

            let matcher = if has_glob_meta(prefix) {
                let glob = GlobBuilder::new(prefix)
                    .literal_separator(true)
                    .build()
                    .map_err(|e| invalid_glob(pattern, e))?;
                Some(glob.compile_matcher())
            } else {
                None
            };

            return Ok(PatternRule::DirectoryPrefix {
                prefix: prefix.to_string(),
                matcher,
            });
        }

        let glob = Glob::new(&normalized).map_err(|e| invalid_glob(pattern, e))?;
        Ok(PatternRule::FileGlob {
            pattern: normalized,
            matcher: glob.compile_matcher(),
        })
    }

    /// Compile a comma-separated pattern list. Blank items are skipped.
    ///
    /// Commas inside `{...}` belong to the glob, so `*.{h,hpp}` is one pattern.
    pub fn parse_list(list: &str) -> Result<Vec<Self>> {
        split_list(list).into_iter().map(Self::parse).collect()
    }

    /// Compile several comma-separated lists into one flat rule list
    pub fn parse_lists<S: AsRef<str>>(lists: &[S]) -> Result<Vec<Self>> {
        let mut rules = Vec::new();
        for list in lists {
            rules.extend(Self::parse_list(list.as_ref())?);
        }
        Ok(rules)
    }

    /// Test a candidate path against this rule
    pub fn matches(&self, entry: &PathEntry) -> bool {
        match self {
            PatternRule::FileGlob { matcher, .. } => {
                !entry.is_dir && matcher.is_match(entry.file_name())
            }
            PatternRule::DirectoryPrefix { prefix, matcher } => {
                if prefix.is_empty() {
                    return true;
                }
                directory_scopes(entry).any(|scope| match matcher {
                    Some(glob) => glob.is_match(scope),
                    None => scope == prefix,
                })
            }
        }
    }

    /// True when any rule in the list matches
    pub fn any_matches(rules: &[PatternRule], entry: &PathEntry) -> bool {
        rules.iter().any(|rule| rule.matches(entry))
    }
}

impl fmt::Display for PatternRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternRule::FileGlob { pattern, .. } => write!(f, "{}", pattern),
            PatternRule::DirectoryPrefix { prefix, .. } => write!(f, "{}/", prefix),
        }
    }
}

/// Directory paths a candidate lives in: every ancestor, plus itself for directories.
fn directory_scopes(entry: &PathEntry) -> impl Iterator<Item = &str> {
    let path = entry.path.as_str();
    let own = if entry.is_dir { Some(path) } else { None };
    path.match_indices('/')
        .map(move |(idx, _)| &path[..idx])
        .chain(own)
}

/// Split a comma-separated list on top-level commas, trimming and dropping blanks
pub(crate) fn split_list(list: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, ch) in list.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                items.push(&list[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    items.push(&list[start..]);

    items
        .into_iter()
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect()
}

fn has_glob_meta(s: &str) -> bool {
    s.contains(['*', '?', '[', '{'])
}

fn invalid_glob(pattern: &str, err: globset::Error) -> BundleError {
    BundleError::InvalidPattern {
        pattern: pattern.to_string(),
        message: err.kind().to_string(),
    }
}

//! Per-path overrides: encoding, paths-only and no-backup rules
//!
//! These rules never change which paths are selected. They are looked up
//! for each selected path independently of the selection fold.

use crate::core::error::{BundleError, Result};
use crate::core::models::BundleConfig;
use crate::core::pattern::{split_list, PatternRule};
use crate::core::walker::PathEntry;

/// A pattern mapped to a codec label
#[derive(Debug, Clone)]
pub struct EncodingRule {
    pub pattern: PatternRule,
    pub codec: String,
}

impl EncodingRule {
    /// Parse `pattern:codec`, splitting at the last `:`
    pub fn parse(rule: &str) -> Result<Self> {
        let (pattern, codec) = rule.trim().rsplit_once(':').ok_or_else(|| BundleError::InvalidRule {
            rule: rule.to_string(),
            message: "expected PATTERN:CODEC".to_string(),
        })?;

        let codec = codec.trim();
        if codec.is_empty() {
            return Err(BundleError::InvalidRule {
                rule: rule.to_string(),
                message: "missing codec name".to_string(),
            });
        }

        Ok(Self {
            pattern: PatternRule::parse(pattern)?,
            codec: codec.to_string(),
        })
    }

    /// Parse a comma-separated list of `pattern:codec` pairs
    pub fn parse_list(list: &str) -> Result<Vec<Self>> {
        split_list(list).into_iter().map(Self::parse).collect()
    }
}

/// All per-path overrides of a run
#[derive(Debug, Clone, Default)]
pub struct RuleBook {
    encodings: Vec<EncodingRule>,
    paths_only: Vec<PatternRule>,
    no_backup: Vec<PatternRule>,
    default_encoding: Option<String>,
}

impl RuleBook {
    /// Compile the rule lists of a configuration
    pub fn from_config(config: &BundleConfig) -> Result<Self> {
        let mut encodings = Vec::new();
        for list in &config.encoding {
            encodings.extend(EncodingRule::parse_list(list)?);
        }

        Ok(Self {
            encodings,
            paths_only: PatternRule::parse_lists(&config.paths_only)?,
            no_backup: PatternRule::parse_lists(&config.no_backup)?,
            default_encoding: config
                .default_encoding
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        })
    }

    /// Explicit encoding for a path: first matching rule, then the default
    pub fn encoding_for(&self, entry: &PathEntry) -> Option<&str> {
        self.encodings
            .iter()
            .find(|rule| rule.pattern.matches(entry))
            .map(|rule| rule.codec.as_str())
            .or(self.default_encoding.as_deref())
    }

    /// Whether the path renders as a placeholder
    pub fn is_paths_only(&self, entry: &PathEntry) -> bool {
        PatternRule::any_matches(&self.paths_only, entry)
    }

    /// Whether the original-bytes block is suppressed for the path
    pub fn skip_backup(&self, entry: &PathEntry) -> bool {
        PatternRule::any_matches(&self.no_backup, entry)
    }
}

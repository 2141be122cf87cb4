//! Restore: read a bundle document back into files
//!
//! Parsing is line based and tolerant of anything between records (the
//! document header, blank lines, several bundles appended to one file).
//! Original bytes are taken from base64 blocks when present, otherwise
//! the text body is re-encoded with the recorded encoding.

use crate::core::codec::{encode_text, is_utf8_family};
use crate::core::error::{BundleError, Result};
use crate::core::serialization::{
    calculate_md5, BACKUP_SUFFIX, BASE64_LANG, MARKER_PREFIX, MARKER_SUFFIX,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::path::{Component, Path, PathBuf};

/// One record read from a bundle document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleEntry {
    pub path: String,
    pub is_dir: bool,
    pub paths_only: bool,
    pub is_binary: bool,
    pub encoding: Option<String>,
    pub md5: Option<String>,
    /// Fenced text body
    pub text: Option<String>,
    /// Decoded base64 body (binary content or original-bytes backup)
    pub original: Option<Vec<u8>>,
    pub error: Option<String>,
}

impl BundleEntry {
    fn new(path: &str) -> Self {
        match path.strip_suffix('/') {
            Some(dir) => Self {
                path: dir.to_string(),
                is_dir: true,
                ..Default::default()
            },
            None => Self {
                path: path.to_string(),
                ..Default::default()
            },
        }
    }

    /// Bytes to write, best source first, with whether they came from text
    fn content(&self) -> Option<(Vec<u8>, bool)> {
        if let Some(original) = &self.original {
            return Some((original.clone(), false));
        }
        let text = self.text.as_ref()?;
        let bytes = match self.encoding.as_deref() {
            Some(enc) if !is_utf8_family(enc) || enc == "utf-8-sig" || enc == "utf-8-bom" => {
                encode_text(text, enc).unwrap_or_else(|| {
                    tracing::warn!("{}: cannot re-encode as {}, writing UTF-8", self.path, enc);
                    text.as_bytes().to_vec()
                })
            }
            _ => text.as_bytes().to_vec(),
        };
        Some((bytes, true))
    }
}

/// Counters for a restore run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreStats {
    pub files: usize,
    pub directories: usize,
    pub skipped: usize,
    /// Files written whose checksum did not match the recorded one
    pub mismatched: usize,
}

/// Heading target, and whether it is an original-bytes section.
///
/// Reads the code spans written by the renderer: one backtick around plain
/// paths, a longer space-padded delimiter around paths containing backticks.
fn parse_heading(line: &str) -> Option<(String, bool)> {
    let rest = line.strip_prefix("## ")?;
    let width = fence_width(rest);
    if width == 0 {
        return None;
    }
    let ticks = &rest[..width];
    let body = &rest[width..];

    let (inner, is_backup) = match body
        .strip_suffix(BACKUP_SUFFIX)
        .and_then(|r| r.strip_suffix(ticks))
    {
        Some(inner) => (inner, true),
        None => (body.strip_suffix(ticks)?, false),
    };

    let path = if width > 1 {
        inner.strip_prefix(' ')?.strip_suffix(' ')?
    } else {
        inner
    };
    if path.is_empty() || (width == 1 && path.contains('`')) {
        return None;
    }
    Some((path.to_string(), is_backup))
}

fn parse_marker(line: &str) -> Option<(&str, &str)> {
    line.strip_prefix(MARKER_PREFIX)?
        .strip_suffix(MARKER_SUFFIX)?
        .split_once('=')
}

fn fence_width(line: &str) -> usize {
    line.chars().take_while(|&c| c == '`').count()
}

fn decode_base64(body: &str, line: usize) -> Result<Vec<u8>> {
    let compact: String = body.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|e| BundleError::invalid_document(line, format!("bad base64: {}", e)))
}

/// Parse a bundle document into entries, in document order
pub fn parse_document(document: &str) -> Result<Vec<BundleEntry>> {
    let lines: Vec<&str> = document.lines().collect();
    let mut entries: Vec<BundleEntry> = Vec::new();
    let mut current: Option<BundleEntry> = None;
    let mut in_backup = false;
    let mut idx = 0;

    while idx < lines.len() {
        let line = lines[idx];

        if let Some((path, is_backup)) = parse_heading(line) {
            if is_backup {
                match &current {
                    Some(entry) if entry.path == path => in_backup = true,
                    _ => {
                        return Err(BundleError::invalid_document(
                            idx + 1,
                            format!("original bytes for '{}' without a matching record", path),
                        ))
                    }
                }
            } else {
                entries.extend(current.take());
                current = Some(BundleEntry::new(&path));
                in_backup = false;
            }
            idx += 1;
            continue;
        }

        let Some(entry) = current.as_mut() else {
            idx += 1;
            continue;
        };

        if let Some((key, value)) = parse_marker(line) {
            match key {
                "encoding" => entry.encoding = Some(value.to_string()),
                "md5" => entry.md5 = Some(value.to_string()),
                "binary" => entry.is_binary = value == "true",
                "directory" => entry.is_dir = value == "true",
                "paths-only" => entry.paths_only = value == "true",
                "error" => entry.error = Some(value.to_string()),
                other => tracing::debug!("ignoring unknown marker '{}'", other),
            }
            idx += 1;
            continue;
        }

        let width = fence_width(line);
        if width >= 3 {
            let open_line = idx + 1;
            let lang = line[width..].trim();
            let fence = &line[..width];
            let close = lines[idx + 1..]
                .iter()
                .position(|l| l.trim_end() == fence)
                .map(|offset| idx + 1 + offset)
                .ok_or_else(|| BundleError::invalid_document(open_line, "unterminated code fence"))?;

            let mut body = lines[idx + 1..close].join("\n");
            if close > idx + 1 {
                body.push('\n');
            }

            if in_backup || (entry.is_binary && lang == BASE64_LANG) {
                entry.original = Some(decode_base64(&body, open_line)?);
            } else if entry.text.is_none() {
                entry.text = Some(body);
            }
            idx = close + 1;
            continue;
        }

        idx += 1;
    }

    entries.extend(current);
    Ok(entries)
}

/// Reject absolute paths and anything that climbs out of the destination
fn safe_relative_path(path: &str) -> Result<PathBuf> {
    let relative = Path::new(path);
    let is_safe = !path.is_empty()
        && relative
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
    if is_safe {
        Ok(relative.to_path_buf())
    } else {
        Err(BundleError::UnsafePath {
            path: path.to_string(),
        })
    }
}

/// Write every entry of `document` beneath `dest`
pub fn restore_into(document: &str, dest: &Path) -> Result<RestoreStats> {
    let entries = parse_document(document)?;
    let mut stats = RestoreStats::default();

    for entry in &entries {
        let target = dest.join(safe_relative_path(&entry.path)?);

        if entry.is_dir {
            std::fs::create_dir_all(&target)?;
            stats.directories += 1;
            continue;
        }

        if entry.paths_only {
            tracing::warn!("{}: recorded without content, skipped", entry.path);
            stats.skipped += 1;
            continue;
        }

        let Some((mut bytes, from_text)) = entry.content() else {
            tracing::warn!(
                "{}: no content to restore ({})",
                entry.path,
                entry.error.as_deref().unwrap_or("empty record")
            );
            stats.skipped += 1;
            continue;
        };

        if let Some(expected) = &entry.md5 {
            if from_text && calculate_md5(&bytes) != *expected && bytes.last() == Some(&b'\n') {
                // Rendering adds a final newline to text that had none
                let trimmed = &bytes[..bytes.len() - 1];
                if calculate_md5(trimmed) == *expected {
                    bytes.truncate(bytes.len() - 1);
                }
            }
            if calculate_md5(&bytes) != *expected {
                tracing::warn!("{}: checksum mismatch, restored content differs from the original", entry.path);
                stats.mismatched += 1;
            }
        }

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, &bytes)?;
        stats.files += 1;
    }

    Ok(stats)
}

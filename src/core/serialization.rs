//! Serialization module for codebundle
//!
//! Renders [`FileRecord`]s as Markdown. Each record opens with a `---`
//! rule and a `## \`path\`` heading, carries `<!-- bundle:key=value -->`
//! markers, and holds either a placeholder, a fenced text body, or a
//! fenced base64 body. Text records in a non-UTF-8 encoding are followed by
//! an `(original bytes)` section holding the raw file as base64.

use crate::core::models::FileRecord;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::path::Path;

/// Horizontal rule that opens every record
pub const RECORD_SEPARATOR: &str = "---";

/// Opening of a metadata marker comment
pub const MARKER_PREFIX: &str = "<!-- bundle:";

/// Closing of a metadata marker comment
pub const MARKER_SUFFIX: &str = " -->";

/// Heading suffix of an original-bytes section
pub const BACKUP_SUFFIX: &str = " (original bytes)";

/// Fence info string of base64 blocks
pub const BASE64_LANG: &str = "base64";

/// Column at which base64 bodies wrap
pub const BASE64_LINE_WIDTH: usize = 76;

const DIRECTORY_PLACEHOLDER: &str = "_(directory)_";
const PATHS_ONLY_PLACEHOLDER: &str = "_(content omitted)_";

/// Trait for output format serializers
pub trait Serializer {
    /// Document header, written only when the output is a file
    fn header(&self, root: &Path) -> String;

    /// Serialize a single record
    fn serialize_record(&self, record: &FileRecord) -> String;
}

/// Markdown bundle serializer
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownSerializer;

impl MarkdownSerializer {
    /// Create a new MarkdownSerializer
    pub fn new() -> Self {
        Self
    }
}

impl Serializer for MarkdownSerializer {
    fn header(&self, root: &Path) -> String {
        format!("# Bundle from `{}`\n\n", root.display())
    }

    fn serialize_record(&self, record: &FileRecord) -> String {
        let mut output = String::new();
        output.push_str(RECORD_SEPARATOR);
        output.push('\n');

        if record.is_dir {
            output.push_str(&heading(&format!("{}/", record.path)));
            output.push_str(&marker("directory", "true"));
            output.push_str(DIRECTORY_PLACEHOLDER);
            output.push_str("\n\n");
            return output;
        }

        output.push_str(&heading(&record.path));

        if record.paths_only {
            output.push_str(&marker("paths-only", "true"));
            output.push_str(PATHS_ONLY_PLACEHOLDER);
            output.push_str("\n\n");
            return output;
        }

        if let Some(text) = &record.text {
            if let Some(encoding) = &record.encoding {
                output.push_str(&marker("encoding", encoding));
            }
            push_md5(&mut output, record);
            output.push_str(&fenced(record.extension(), text));

            if record.has_backup_block() {
                output.push_str(&backup_heading(&record.path));
                output.push_str(&fenced(BASE64_LANG, &encode_base64(&record.raw)));
            }
        } else if record.is_binary && (record.error.is_none() || !record.raw.is_empty()) {
            if let Some(encoding) = &record.encoding {
                output.push_str(&marker("encoding", encoding));
            }
            output.push_str(&marker("binary", "true"));
            if let Some(issue) = &record.error {
                output.push_str(&marker("error", &issue.to_string()));
            }
            push_md5(&mut output, record);
            output.push_str(&fenced(BASE64_LANG, &encode_base64(&record.raw)));
        } else if let Some(issue) = &record.error {
            output.push_str(&marker("error", &issue.to_string()));
        }

        output.push('\n');
        output
    }
}

/// `## \`path\`` heading line
pub fn heading(path: &str) -> String {
    format!("## {}\n", code_span(path))
}

/// Heading of the original-bytes section that follows a text body
pub fn backup_heading(path: &str) -> String {
    format!("## {}{}\n", code_span(path), BACKUP_SUFFIX)
}

/// Inline code span around `text`.
///
/// Text containing backticks gets a longer delimiter padded with one space
/// on each side, so the span always closes where it should.
pub fn code_span(text: &str) -> String {
    if !text.contains('`') {
        return format!("`{}`", text);
    }
    let ticks = "`".repeat(longest_backtick_run(text) + 1);
    format!("{} {} {}", ticks, text, ticks)
}

/// One `<!-- bundle:key=value -->` line
pub fn marker(key: &str, value: &str) -> String {
    // `--` would close the HTML comment early
    let value = value.replace("--", "- -").replace('\n', " ");
    format!("{}{}={}{}\n", MARKER_PREFIX, key, value, MARKER_SUFFIX)
}

fn push_md5(output: &mut String, record: &FileRecord) {
    if let Some(md5) = &record.md5 {
        output.push_str(&marker("md5", md5));
    }
}

/// Wrap `body` in a code fence longer than any backtick run inside it.
///
/// A non-empty body always ends with exactly the newline it had, plus one
/// if it had none.
pub fn fenced(lang: &str, body: &str) -> String {
    let fence = "`".repeat(fence_len(body));
    let mut output = format!("{}{}\n", fence, lang);
    output.push_str(body);
    if !body.is_empty() && !body.ends_with('\n') {
        output.push('\n');
    }
    output.push_str(&fence);
    output.push('\n');
    output
}

/// Fence length needed to enclose `body`
pub fn fence_len(body: &str) -> usize {
    (longest_backtick_run(body) + 1).max(3)
}

fn longest_backtick_run(body: &str) -> usize {
    let mut longest = 0;
    let mut run = 0;
    for ch in body.chars() {
        if ch == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    longest
}

/// Base64 (standard alphabet, padded) wrapped at [`BASE64_LINE_WIDTH`]
pub fn encode_base64(bytes: &[u8]) -> String {
    let encoded = STANDARD.encode(bytes);
    let mut output = String::with_capacity(encoded.len() + encoded.len() / BASE64_LINE_WIDTH);
    for (idx, ch) in encoded.chars().enumerate() {
        if idx > 0 && idx % BASE64_LINE_WIDTH == 0 {
            output.push('\n');
        }
        output.push(ch);
    }
    output
}

/// MD5 checksum of raw bytes as lowercase hex
pub fn calculate_md5(bytes: &[u8]) -> String {
    format!("{:x}", md5::compute(bytes))
}

//! Content codec: binary sniffing, encoding resolution and text normalization
//!
//! For each file the codec decides whether the bytes can be shown as text.
//! Text is decoded strictly with an explicit or detected encoding, then
//! line endings are normalized to `\n`. Anything that is not UTF-8 keeps
//! its original bytes around so the renderer can attach a backup block.

use crate::core::error::FileIssue;
use encoding_rs::Encoding;
use std::path::Path;

#[cfg(test)]
use mockall::automock;

/// Number of leading bytes inspected for a zero byte
pub const BINARY_SNIFF_LEN: usize = 1024;

/// Canonical names that need no original-bytes backup
pub const UTF8_FAMILY: &[&str] = &["utf-8", "utf-8-sig", "utf-8-bom", "utf8", "utf8-sig"];

/// Encoding assumed when nothing else is known
pub const FALLBACK_ENCODING: &str = "utf-8";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Guesses the text encoding of raw bytes.
///
/// Injected into [`ContentCodec`] so tests can substitute a deterministic fake.
#[cfg_attr(test, automock)]
pub trait EncodingDetector {
    /// Best guess for the encoding name, or `None` when there is nothing to go on
    fn detect(&self, bytes: &[u8]) -> Option<String>;
}

/// Production detector: BOM and UTF-8 validity first, `chardetng` otherwise
#[derive(Debug, Clone, Copy, Default)]
pub struct ChardetDetector;

impl EncodingDetector for ChardetDetector {
    fn detect(&self, bytes: &[u8]) -> Option<String> {
        if bytes.is_empty() {
            return None;
        }
        if bytes.starts_with(UTF8_BOM) {
            return Some("utf-8-sig".to_string());
        }
        if std::str::from_utf8(bytes).is_ok() {
            return Some("utf-8".to_string());
        }

        let mut detector = chardetng::EncodingDetector::new();
        detector.feed(bytes, true);
        Some(detector.guess(None, true).name().to_lowercase())
    }
}

/// Check if content appears to be binary
///
/// A file is binary if it contains a zero byte in the first 1024 bytes.
pub fn is_binary(content: &[u8]) -> bool {
    let check_len = content.len().min(BINARY_SNIFF_LEN);
    content[..check_len].contains(&0)
}

/// `\r\n` → `\n`, then any remaining `\r` → `\n`
pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Display form of an encoding name: lower-case, `_` → `-`, `utf8` → `utf-8`
pub fn canonical_encoding_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase().replace('_', "-");
    match lowered.strip_prefix("utf8") {
        Some(rest) if rest.is_empty() || rest.starts_with('-') => format!("utf-8{}", rest),
        _ => lowered,
    }
}

/// Whether a canonical name belongs to the UTF-8 family
pub fn is_utf8_family(canonical: &str) -> bool {
    UTF8_FAMILY.contains(&canonical)
}

/// How to turn bytes into text for a resolved label
#[derive(Debug, Clone, Copy)]
enum TextDecoder {
    /// UTF-8 with an optional leading BOM dropped
    Utf8Sig,
    Whatwg(&'static Encoding),
}

impl TextDecoder {
    fn lookup(label: &str) -> Option<Self> {
        let canonical = canonical_encoding_name(label);
        if matches!(canonical.as_str(), "utf-8-sig" | "utf-8-bom") {
            return Some(TextDecoder::Utf8Sig);
        }

        let compact = canonical.replace('-', "");
        [label.trim(), canonical.as_str(), compact.as_str()]
            .iter()
            .find_map(|candidate| Encoding::for_label(candidate.as_bytes()))
            .map(TextDecoder::Whatwg)
    }

    /// Strict decode; `None` on any malformed sequence
    fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            TextDecoder::Utf8Sig => {
                let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                std::str::from_utf8(body).ok().map(str::to_string)
            }
            TextDecoder::Whatwg(encoding) => encoding
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|text| text.into_owned()),
        }
    }
}

/// Whether `label` names an encoding the codec can decode
pub fn is_known_encoding(label: &str) -> bool {
    TextDecoder::lookup(label).is_some()
}

/// Re-encode text into the named encoding.
///
/// Returns `None` for unknown labels, for encodings `encoding_rs` cannot
/// produce (UTF-16), and for text the encoding cannot represent.
pub fn encode_text(text: &str, label: &str) -> Option<Vec<u8>> {
    match TextDecoder::lookup(label)? {
        TextDecoder::Utf8Sig => {
            let mut bytes = UTF8_BOM.to_vec();
            bytes.extend_from_slice(text.as_bytes());
            Some(bytes)
        }
        TextDecoder::Whatwg(encoding) => {
            if encoding.output_encoding() != encoding {
                return None;
            }
            let (bytes, _, had_errors) = encoding.encode(text);
            (!had_errors).then(|| bytes.into_owned())
        }
    }
}

/// Result of running one file through the codec
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodecOutput {
    /// Normalized UTF-8 text, absent for binary content
    pub text: Option<String>,
    /// Canonical encoding name, absent for binary content
    pub encoding: Option<String>,
    /// Original bytes must accompany the output
    pub needs_backup: bool,
    /// Content cannot be rendered as text
    pub is_binary: bool,
    /// Bytes as read
    pub raw: Vec<u8>,
    /// Read or decode problem
    pub error: Option<FileIssue>,
}

/// Classifies, decodes and normalizes file content
pub struct ContentCodec {
    detector: Box<dyn EncodingDetector>,
}

impl ContentCodec {
    /// Create a codec with the `chardetng`-backed detector
    pub fn new() -> Self {
        Self::with_detector(Box::new(ChardetDetector))
    }

    /// Create a codec with a custom detector
    pub fn with_detector(detector: Box<dyn EncodingDetector>) -> Self {
        Self { detector }
    }

    /// Read a file and process its bytes.
    ///
    /// A read failure yields a binary output carrying `FileIssue::ReadFailed`.
    pub fn read_file(&self, path: &Path, explicit: Option<&str>) -> CodecOutput {
        match std::fs::read(path) {
            Ok(bytes) => self.process_bytes(bytes, explicit),
            Err(e) => CodecOutput {
                is_binary: true,
                error: Some(FileIssue::ReadFailed {
                    message: e.to_string(),
                }),
                ..Default::default()
            },
        }
    }

    /// Process bytes already in memory
    pub fn process_bytes(&self, bytes: Vec<u8>, explicit: Option<&str>) -> CodecOutput {
        if is_binary(&bytes) {
            return CodecOutput {
                needs_backup: true,
                is_binary: true,
                raw: bytes,
                ..Default::default()
            };
        }

        let label = match explicit {
            Some(label) => label.to_string(),
            None => self
                .detector
                .detect(&bytes)
                .unwrap_or_else(|| FALLBACK_ENCODING.to_string()),
        };
        let canonical = canonical_encoding_name(&label);

        let decoded = match TextDecoder::lookup(&label) {
            Some(decoder) => decoder.decode(&bytes).ok_or_else(|| FileIssue::DecodeFailed {
                encoding: canonical.clone(),
            }),
            None => Err(FileIssue::UnknownEncoding {
                label: label.clone(),
            }),
        };

        match decoded {
            Ok(text) => CodecOutput {
                text: Some(normalize_line_endings(&text)),
                needs_backup: !is_utf8_family(&canonical),
                encoding: Some(canonical),
                is_binary: false,
                raw: bytes,
                error: None,
            },
            Err(issue) => CodecOutput {
                text: None,
                encoding: Some(canonical),
                needs_backup: true,
                is_binary: true,
                raw: bytes,
                error: Some(issue),
            },
        }
    }
}

impl Default for ContentCodec {
    fn default() -> Self {
        Self::new()
    }
}

//! Error types for codebundle
//!
//! Run-level failures use [`BundleError`]. Problems that only affect a
//! single file are recorded as a [`FileIssue`] on its record and never
//! abort the run.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for bundle operations
pub type Result<T> = std::result::Result<T, BundleError>;

/// Errors that abort a bundle or restore run
#[derive(Error, Debug)]
pub enum BundleError {
    /// IO error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Root directory does not exist
    #[error("Path not found: {path}")]
    PathNotFound { path: PathBuf },

    /// Root exists but is not a directory
    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Selection produced an empty set
    #[error("No paths matched the selection under {root}")]
    NoMatch { root: PathBuf },

    /// A glob pattern could not be compiled
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// A `pattern:codec` rule is malformed
    #[error("Invalid rule '{rule}': {message}")]
    InvalidRule { rule: String, message: String },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// UTF-8 encoding error
    #[error("UTF-8 encoding error: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),

    /// A bundle document could not be parsed
    #[error("Invalid bundle document at line {line}: {message}")]
    InvalidDocument { line: usize, message: String },

    /// A restored path would escape the destination directory
    #[error("Refusing to restore unsafe path: {path}")]
    UnsafePath { path: String },

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<BundleError>,
    },
}

impl BundleError {
    /// Wrap an error with additional context
    pub fn with_context(self, context: impl Into<String>) -> Self {
        BundleError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        BundleError::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an invalid document error
    pub fn invalid_document(line: usize, message: impl Into<String>) -> Self {
        BundleError::InvalidDocument {
            line,
            message: message.into(),
        }
    }

    /// Process exit status for this error.
    ///
    /// A missing or unusable root exits with 2, every other fatal error with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            BundleError::PathNotFound { .. } | BundleError::NotADirectory { .. } => 2,
            BundleError::WithContext { source, .. } => source.exit_code(),
            _ => 1,
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(ctx))
    }
}

/// A problem confined to one file. The run continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FileIssue {
    /// The raw bytes could not be read
    #[error("read failed: {message}")]
    ReadFailed { message: String },

    /// The resolved encoding rejected the byte stream
    #[error("cannot decode as {encoding}")]
    DecodeFailed { encoding: String },

    /// The requested encoding label is not known
    #[error("unknown encoding '{label}'")]
    UnknownEncoding { label: String },
}

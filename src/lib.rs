//! codebundle - bundle a source tree into one Markdown document
//!
//! This library selects paths under a root with an ordered list of include
//! and exclude steps, decodes each selected file (detecting its encoding
//! when none is configured), and renders everything as a single Markdown
//! document. Files in legacy encodings carry their original bytes as
//! base64 so a bundle can be restored byte for byte.
//!
//! # Architecture
//!
//! This crate follows the "Library-First" pattern:
//! - **lib.rs** (this file): Pure logic, no CLI concerns
//! - **bin/codebundle.rs**: Thin wrapper that calls the library
//!
//! # Example
//!
//! ```no_run
//! use codebundle::{BundleConfig, BundleEngine, OutputTarget};
//! use std::path::Path;
//!
//! let config = BundleConfig::new()
//!     .with_include("*.cpp,*.h")
//!     .with_exclude("build/");
//! let engine = BundleEngine::with_config(config)?;
//! let stats = engine.run(Path::new("."), &OutputTarget::Stdout)?;
//! eprintln!("{} records", stats.total_records());
//! # Ok::<(), codebundle::BundleError>(())
//! ```

pub mod core;

pub use crate::core::{
    parse_document, restore_into, BundleConfig, BundleEngine, BundleError, BundleStats,
    ChardetDetector, ContentCodec, EncodingDetector, FileIssue, FileRecord, OutputTarget,
    PathEntry, PathSelector, PatternRule, RestoreStats, Result, RuleBook, SelectionOp,
    TreeSource,
};

/// Library version, taken from Cargo metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the version of the codebundle library
pub fn version() -> &'static str {
    VERSION
}

//! Core module for codebundle
//!
//! This module provides the building blocks of the bundler.
//!
//! # Architecture
//!
//! - `models`: Configuration, records and run statistics
//! - `error`: Error types using thiserror
//! - `walker`: Path universe enumeration with the TreeSource trait
//! - `pattern`: File-glob and directory-prefix pattern rules
//! - `selector`: Ordered include/exclude selection
//! - `rules`: Per-path encoding, paths-only and no-backup overrides
//! - `codec`: Binary sniffing, encoding detection and strict decoding
//! - `serialization`: Markdown record rendering
//! - `restore`: Reading a bundle document back into files
//! - `engine`: Main BundleEngine orchestration

pub mod models;
pub mod error;
pub mod walker;
pub mod pattern;
pub mod selector;
pub mod rules;
pub mod codec;
pub mod serialization;
pub mod restore;
pub mod engine;

// Re-export commonly used types
pub use models::{BundleConfig, BundleStats, FileRecord, OutputTarget, SelectionOp};
pub use error::{BundleError, FileIssue, Result, ResultExt};
pub use walker::{DirectoryTree, PathEntry, TreeSource, WalkConfig};
pub use pattern::PatternRule;
pub use selector::{compile_operations, CompiledOperation, OpKind, PathSelector};
pub use rules::{EncodingRule, RuleBook};
pub use codec::{ChardetDetector, CodecOutput, ContentCodec, EncodingDetector};
pub use serialization::{MarkdownSerializer, Serializer};
pub use restore::{parse_document, restore_into, BundleEntry, RestoreStats};
pub use engine::BundleEngine;

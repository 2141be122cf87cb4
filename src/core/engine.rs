//! Bundle Engine - Main orchestration for codebundle
//!
//! The BundleEngine is the primary interface for bundling a tree. It
//! coordinates root validation, path selection, the content codec,
//! rendering, and the output sink.

use crate::core::codec::{ContentCodec, EncodingDetector};
use crate::core::error::{BundleError, FileIssue, Result};
use crate::core::models::{BundleConfig, BundleStats, FileRecord, OutputTarget};
use crate::core::rules::RuleBook;
use crate::core::selector::{compile_operations, CompiledOperation, PathSelector};
use crate::core::serialization::{calculate_md5, MarkdownSerializer, Serializer};
use crate::core::walker::{
    normalize_path_separators, DirectoryTree, PathEntry, TreeSource, WalkConfig,
};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// The main bundling engine
pub struct BundleEngine {
    /// Engine configuration
    config: BundleConfig,
    /// Compiled selection steps, in order
    operations: Vec<CompiledOperation>,
    /// Compiled per-path overrides
    rules: RuleBook,
    /// Path universe provider
    tree: Box<dyn TreeSource>,
    /// Text/binary classification and decoding
    codec: ContentCodec,
    /// Output serializer
    serializer: Box<dyn Serializer>,
}

impl BundleEngine {
    /// Create a new BundleEngine with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(BundleConfig::default())
    }

    /// Create a new BundleEngine with custom configuration.
    ///
    /// Fails when the configuration is invalid or a pattern or rule does
    /// not compile.
    pub fn with_config(config: BundleConfig) -> Result<Self> {
        config.validate()?;
        let operations = compile_operations(&config.effective_selection())?;
        let rules = RuleBook::from_config(&config)?;
        let tree = DirectoryTree::with_config(WalkConfig {
            follow_symlinks: config.follow_symlinks,
        });

        Ok(Self {
            config,
            operations,
            rules,
            tree: Box::new(tree),
            codec: ContentCodec::new(),
            serializer: Box::new(MarkdownSerializer::new()),
        })
    }

    /// Replace the path universe provider
    pub fn with_tree_source(mut self, tree: Box<dyn TreeSource>) -> Self {
        self.tree = tree;
        self
    }

    /// Replace the encoding detector
    pub fn with_detector(mut self, detector: Box<dyn EncodingDetector>) -> Self {
        self.codec = ContentCodec::with_detector(detector);
        self
    }

    /// Get the configuration
    pub fn config(&self) -> &BundleConfig {
        &self.config
    }

    /// Check the root and return its canonical form
    pub fn resolve_root(root: &Path) -> Result<PathBuf> {
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
        Ok(root.canonicalize()?)
    }

    /// Run the selection fold and return the sorted paths
    pub fn select(&self, root: &Path) -> Result<Vec<PathEntry>> {
        PathSelector::new(root, self.tree.as_ref()).select(&self.operations)
    }

    /// Build the record for one selected path
    pub fn process_entry(&self, root: &Path, entry: &PathEntry) -> FileRecord {
        if entry.is_dir {
            return FileRecord::directory(&entry.path);
        }
        if self.rules.is_paths_only(entry) {
            return FileRecord::placeholder(&entry.path);
        }

        let output = self
            .codec
            .read_file(&root.join(&entry.path), self.rules.encoding_for(entry));

        let read_failed = matches!(output.error, Some(FileIssue::ReadFailed { .. }));
        let needs_backup =
            output.needs_backup && (output.is_binary || !self.rules.skip_backup(entry));

        FileRecord {
            path: entry.path.clone(),
            is_dir: false,
            paths_only: false,
            md5: (!read_failed).then(|| calculate_md5(&output.raw)),
            encoding: output.encoding,
            text: output.text,
            raw: output.raw,
            needs_backup,
            is_binary: output.is_binary,
            error: output.error,
        }
    }

    /// Process and write every entry in order
    pub fn write_document<W: Write>(
        &self,
        root: &Path,
        entries: &[PathEntry],
        out: &mut W,
        with_header: bool,
    ) -> Result<BundleStats> {
        let mut stats = BundleStats::default();

        if with_header {
            out.write_all(self.serializer.header(root).as_bytes())?;
        }

        for entry in entries {
            let record = self.process_entry(root, entry);
            if let Some(issue) = &record.error {
                tracing::warn!("{}: {}", record.path, issue);
            }
            out.write_all(self.serializer.serialize_record(&record).as_bytes())?;
            stats.record(&record);
        }

        out.flush()?;
        Ok(stats)
    }

    /// Bundle `root` into a string, as it would appear on stdout
    pub fn bundle_to_string(&self, root: &Path) -> Result<(String, BundleStats)> {
        let root = Self::resolve_root(root)?;
        let entries = self.select(&root)?;

        let mut buffer = Vec::new();
        let stats = self.write_document(&root, &entries, &mut buffer, false)?;
        Ok((String::from_utf8(buffer)?, stats))
    }

    /// Bundle `root` into `target`.
    ///
    /// Selection runs before the sink is opened, so a run that selects
    /// nothing leaves no output behind.
    pub fn run(&self, root: &Path, target: &OutputTarget) -> Result<BundleStats> {
        let root = Self::resolve_root(root)?;
        let mut entries = self.select(&root)?;

        if let Some(own) = target.file_path().and_then(|p| relative_to_root(&root, p)) {
            entries.retain(|e| e.is_dir || e.path != own);
            if entries.is_empty() {
                return Err(BundleError::NoMatch { root });
            }
        }

        tracing::info!("Bundling {} paths from {}", entries.len(), root.display());

        let stats = match target {
            OutputTarget::Stdout => {
                let stdout = io::stdout();
                let mut out = BufWriter::new(stdout.lock());
                self.write_document(&root, &entries, &mut out, false)?
            }
            OutputTarget::Overwrite(path) => {
                let mut out = BufWriter::new(File::create(path)?);
                self.write_document(&root, &entries, &mut out, true)?
            }
            OutputTarget::Append(path) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                let mut out = BufWriter::new(file);
                self.write_document(&root, &entries, &mut out, true)?
            }
        };

        Ok(stats)
    }
}

/// Path of `output` relative to `root`, if the output file lives inside it
fn relative_to_root(root: &Path, output: &Path) -> Option<String> {
    let absolute = if output.is_absolute() {
        output.to_path_buf()
    } else {
        std::env::current_dir().ok()?.join(output)
    };
    let parent = absolute.parent()?.canonicalize().ok()?;
    let resolved = parent.join(absolute.file_name()?);
    let relative = resolved.strip_prefix(root).ok()?;
    Some(normalize_path_separators(&relative.to_string_lossy()))
}

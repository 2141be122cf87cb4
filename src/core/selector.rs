//! Path selection
//!
//! The final path set is a left fold over the ordered selection
//! operations. `include` adds every matching path from the whole tree,
//! `exclude` removes matching paths from what has been selected so far.
//! Because `include` always searches the full universe, a path removed by
//! an earlier `exclude` can come back only if a later `include` matches it
//! on its own terms.

use crate::core::error::{BundleError, Result};
use crate::core::models::SelectionOp;
use crate::core::pattern::PatternRule;
use crate::core::walker::{sort_paths, PathEntry, TreeSource};
use std::cell::OnceCell;
use std::collections::HashSet;
use std::path::Path;

/// Direction of a selection step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Include,
    Exclude,
}

/// A selection step with its patterns compiled
#[derive(Debug, Clone)]
pub struct CompiledOperation {
    pub kind: OpKind,
    pub rules: Vec<PatternRule>,
}

impl CompiledOperation {
    /// Compile one configured operation
    pub fn compile(op: &SelectionOp) -> Result<Self> {
        let (kind, patterns) = match op {
            SelectionOp::Include(patterns) => (OpKind::Include, patterns),
            SelectionOp::Exclude(patterns) => (OpKind::Exclude, patterns),
        };
        Ok(Self {
            kind,
            rules: PatternRule::parse_lists(patterns)?,
        })
    }
}

/// Compile an ordered operation list, preserving order
pub fn compile_operations(ops: &[SelectionOp]) -> Result<Vec<CompiledOperation>> {
    ops.iter().map(CompiledOperation::compile).collect()
}

/// Folds selection operations over the tree under one root.
///
/// The universe is enumerated on the first `include` and reused after that.
pub struct PathSelector<'a> {
    root: &'a Path,
    source: &'a dyn TreeSource,
    universe: OnceCell<Vec<PathEntry>>,
}

impl<'a> PathSelector<'a> {
    /// Create a selector for `root` backed by `source`
    pub fn new(root: &'a Path, source: &'a dyn TreeSource) -> Self {
        Self {
            root,
            source,
            universe: OnceCell::new(),
        }
    }

    fn universe(&self) -> Result<&[PathEntry]> {
        if let Some(universe) = self.universe.get() {
            return Ok(universe);
        }
        let enumerated = self.source.enumerate(self.root)?;
        Ok(self.universe.get_or_init(|| enumerated))
    }

    /// Apply one operation to the working set
    pub fn apply(&self, working: &mut HashSet<PathEntry>, op: &CompiledOperation) -> Result<()> {
        if op.rules.is_empty() {
            return Ok(());
        }

        match op.kind {
            OpKind::Include => {
                let before = working.len();
                for entry in self.universe()? {
                    if PatternRule::any_matches(&op.rules, entry) {
                        working.insert(entry.clone());
                    }
                }
                tracing::debug!(
                    "include [{}] added {} paths",
                    join_rules(&op.rules),
                    working.len() - before
                );
            }
            OpKind::Exclude => {
                let before = working.len();
                working.retain(|entry| !PatternRule::any_matches(&op.rules, entry));
                tracing::debug!(
                    "exclude [{}] removed {} paths",
                    join_rules(&op.rules),
                    before - working.len()
                );
            }
        }
        Ok(())
    }

    /// Fold `ops` in order and return the sorted result.
    ///
    /// Returns [`BundleError::NoMatch`] when nothing survives.
    pub fn select(&self, ops: &[CompiledOperation]) -> Result<Vec<PathEntry>> {
        let mut working = HashSet::new();
        for op in ops {
            self.apply(&mut working, op)?;
        }

        if working.is_empty() {
            return Err(BundleError::NoMatch {
                root: self.root.to_path_buf(),
            });
        }

        let mut selected: Vec<PathEntry> = working.into_iter().collect();
        sort_paths(&mut selected);
        Ok(selected)
    }
}

fn join_rules(rules: &[PatternRule]) -> String {
    rules
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

use crate::plan::RenameEntry;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Ordered record of the renames that actually happened during one job.
///
/// Only the worker appends, and only after a move succeeded. Entries are never
/// removed, so the log is always a prefix of the plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RenameLog {
    entries: Vec<RenameEntry>,
}

impl RenameLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, entry: RenameEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[RenameEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_source(&self, source: &Path) -> bool {
        self.entries.iter().any(|e| e.source == source)
    }

    /// Pairs in execution order, the shape the history file stores
    pub fn pairs(&self) -> Vec<(PathBuf, PathBuf)> {
        self.entries
            .iter()
            .map(|e| (e.source.clone(), e.destination.clone()))
            .collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RenameEntry> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a RenameLog {
    type Item = &'a RenameEntry;
    type IntoIter = std::slice::Iter<'a, RenameEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

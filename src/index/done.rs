// Per-run record of paths already seen or dispatched

use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// Visited, but not part of a dispatched group
    Found,
    /// Dispatched in a group
    Processed,
}

/// Only the traversal thread writes to this.
#[derive(Debug, Default)]
pub struct DoneSet {
    entries: HashMap<PathBuf, FileStatus>,
}

impl DoneSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, path: &Path) -> Option<FileStatus> {
        self.entries.get(path).copied()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn processed(&self, path: &Path) -> bool {
        self.status(path) == Some(FileStatus::Processed)
    }

    /// Never downgrades a processed entry
    pub fn mark_found(&mut self, path: &Path) {
        self.entries
            .entry(path.to_path_buf())
            .or_insert(FileStatus::Found);
    }

    pub fn mark_processed(&mut self, path: &Path) {
        self.entries.insert(path.to_path_buf(), FileStatus::Processed);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

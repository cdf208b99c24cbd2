//! Persistence of the incremental-build snapshot.
//!
//! A [`SourceSnapshot`] records which source files a build read and the newest
//! modification time among them. The loader compares it with the snapshot of
//! the previous build to decide whether parsing can be skipped.
//!
//! Implementations of [`SnapshotStore`]:
//! - [`JsonFileStore`]: snapshot kept in a JSON file between runs
//! - [`MemoryStore`]: in-memory store for tests and single-process reuse

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Source files of one build and their newest modification time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SourceSnapshot {
    /// `(dir_root, file)` pairs in discovery order
    pub source_files: Vec<(PathBuf, PathBuf)>,
    /// Newest mtime in seconds since the Unix epoch
    pub max_mtime: f64,
}

impl SourceSnapshot {
    pub fn new(source_files: Vec<(PathBuf, PathBuf)>, max_mtime: f64) -> Self {
        Self {
            source_files,
            max_mtime,
        }
    }

    /// Whether a build with this snapshot has to parse its sources again.
    ///
    /// Parsing is skipped only when `keep_files` is set, a previous snapshot
    /// exists for the same file list, and no file is newer than it.
    pub fn needs_load(&self, previous: Option<&SourceSnapshot>, keep_files: bool) -> bool {
        if !keep_files {
            return true;
        }
        match previous {
            None => true,
            Some(previous) => {
                previous.source_files != self.source_files
                    || previous.max_mtime == 0.0
                    || previous.max_mtime < self.max_mtime
            }
        }
    }
}

/// Where the previous build's snapshot is kept.
pub trait SnapshotStore {
    /// Snapshot of the previous build, if any.
    ///
    /// # Errors
    ///
    /// Returns [`DocError::Storage`](crate::DocError::Storage) or
    /// [`DocError::Serialization`](crate::DocError::Serialization) if a stored
    /// snapshot exists but cannot be read.
    fn load(&self) -> Result<Option<SourceSnapshot>>;

    /// Replace the stored snapshot.
    fn save(&mut self, snapshot: &SourceSnapshot) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(mtime: f64) -> SourceSnapshot {
        SourceSnapshot::new(
            vec![(PathBuf::from("/src"), PathBuf::from("/src/pkg/__init__.py"))],
            mtime,
        )
    }

    #[test]
    fn test_trait_object_safe() {
        fn _accept_trait_object(_store: &dyn SnapshotStore) {}
    }

    #[test]
    fn test_needs_load_without_keep_files() {
        let current = snapshot(10.0);
        assert!(current.needs_load(Some(&current.clone()), false));
    }

    #[test]
    fn test_needs_load_decisions() {
        let current = snapshot(10.0);
        assert!(current.needs_load(None, true));
        assert!(!current.needs_load(Some(&snapshot(10.0)), true));
        assert!(!current.needs_load(Some(&snapshot(12.0)), true));
        assert!(current.needs_load(Some(&snapshot(9.0)), true));
        assert!(current.needs_load(Some(&snapshot(0.0)), true));

        let mut other_files = snapshot(10.0);
        other_files
            .source_files
            .push((PathBuf::from("/src"), PathBuf::from("/src/pkg/new.py")));
        assert!(current.needs_load(Some(&other_files), true));
    }
}

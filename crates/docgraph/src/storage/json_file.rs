//! Snapshot store backed by a JSON file.

use super::{SnapshotStore, SourceSnapshot};
use crate::error::{DocError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Keeps the snapshot in a single JSON file.
///
/// A missing file means "no previous build". The parent directory is created
/// on first save.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<Option<SourceSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path).map_err(|e| {
            DocError::storage(format!("Failed to read {}", self.path.display()), Some(e))
        })?;
        let snapshot = serde_json::from_str(&contents).map_err(|e| {
            DocError::serialization(
                format!("Invalid snapshot in {}", self.path.display()),
                Some(e),
            )
        })?;
        Ok(Some(snapshot))
    }

    fn save(&mut self, snapshot: &SourceSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    DocError::storage(format!("Failed to create {}", parent.display()), Some(e))
                })?;
            }
        }
        let contents = serde_json::to_string_pretty(snapshot)
            .map_err(|e| DocError::serialization("Failed to encode snapshot", Some(e)))?;
        fs::write(&self.path, contents).map_err(|e| {
            DocError::storage(format!("Failed to write {}", self.path.display()), Some(e))
        })?;
        log::debug!("Saved snapshot of {} files to {}", snapshot.source_files.len(), self.path.display());
        Ok(())
    }
}

//! In-memory snapshot store.
//!
//! Nothing survives the process; useful for tests and for reusing one loader
//! across several builds in the same process.

use super::{SnapshotStore, SourceSnapshot};
use crate::error::Result;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    snapshot: Option<SourceSnapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with a snapshot.
    pub fn with_snapshot(snapshot: SourceSnapshot) -> Self {
        Self {
            snapshot: Some(snapshot),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.is_none()
    }

    pub fn clear(&mut self) {
        self.snapshot = None;
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Option<SourceSnapshot>> {
        Ok(self.snapshot.clone())
    }

    fn save(&mut self, snapshot: &SourceSnapshot) -> Result<()> {
        self.snapshot = Some(snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_new_store_is_empty() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_save_and_load() {
        let mut store = MemoryStore::new();
        let snapshot = SourceSnapshot::new(vec![(PathBuf::from("a"), PathBuf::from("a/b.py"))], 3.5);
        store.save(&snapshot).unwrap();
        assert_eq!(store.load().unwrap(), Some(snapshot));

        store.clear();
        assert!(store.is_empty());
    }
}

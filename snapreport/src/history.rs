//! Analysis history
//!
//! A bounded, newest-first record of completed analyses. Appending an
//! exact (task, result) duplicate is a no-op; once the cap is reached the
//! oldest entry is evicted. The store persists as a JSON array so a
//! session can resume where the previous one ended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

/// Maximum number of retained entries.
pub const HISTORY_CAP: usize = 20;

/// Errors raised while persisting or restoring history.
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("failed to read history file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse history file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One completed analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub task: String,
    pub result: String,
}

impl HistoryEntry {
    pub fn new(task: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            task: task.into(),
            result: result.into(),
        }
    }
}

/// Bounded newest-first history store.
#[derive(Debug, Default)]
pub struct HistoryStore {
    entries: Vec<HistoryEntry>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries, newest first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a completed analysis. Returns `false` without changing the
    /// store when an entry with the same task and result already exists.
    pub fn append(&mut self, task: &str, result: &str) -> bool {
        if self
            .entries
            .iter()
            .any(|e| e.task == task && e.result == result)
        {
            log::debug!("history append skipped: duplicate entry");
            return false;
        }
        self.entries.insert(0, HistoryEntry::new(task, result));
        if self.entries.len() > HISTORY_CAP {
            self.entries.truncate(HISTORY_CAP);
            log::debug!("history capped at {} entries", HISTORY_CAP);
        }
        true
    }

    /// Remove one entry by id. Returns `false` when no such entry exists.
    pub fn remove(&mut self, id: Uuid) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Restore a store from a JSON file. A missing file yields an empty
    /// store; malformed content is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, HistoryError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)?;
        let mut entries: Vec<HistoryEntry> = serde_json::from_str(&data)?;
        entries.truncate(HISTORY_CAP);
        Ok(Self { entries })
    }

    /// Persist the store as a JSON array, newest first.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), HistoryError> {
        let data = serde_json::to_string_pretty(&self.entries)?;
        fs::write(path.as_ref(), data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_is_newest_first() {
        let mut store = HistoryStore::new();
        store.append("first task", "a");
        store.append("second task", "b");
        assert_eq!(store.entries()[0].task, "second task");
        assert_eq!(store.entries()[1].task, "first task");
    }

    #[test]
    fn test_duplicate_append_is_noop() {
        let mut store = HistoryStore::new();
        assert!(store.append("task", "result"));
        assert!(!store.append("task", "result"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_same_task_different_result_is_kept() {
        let mut store = HistoryStore::new();
        assert!(store.append("task", "first run"));
        assert!(store.append("task", "second run"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_cap_evicts_oldest() {
        let mut store = HistoryStore::new();
        for i in 0..HISTORY_CAP {
            store.append(&format!("task {}", i), "r");
        }
        assert_eq!(store.len(), HISTORY_CAP);
        store.append("one more", "r");
        assert_eq!(store.len(), HISTORY_CAP);
        assert_eq!(store.entries()[0].task, "one more");
        // "task 0" was the oldest and is gone.
        assert!(store.entries().iter().all(|e| e.task != "task 0"));
    }

    #[test]
    fn test_remove_by_id() {
        let mut store = HistoryStore::new();
        store.append("task", "result");
        let id = store.entries()[0].id;
        assert!(store.remove(id));
        assert!(store.is_empty());
        assert!(!store.remove(id));
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        let mut store = HistoryStore::new();
        store.append("task a", "result a");
        store.append("task b", "result b");
        store.save(&path).unwrap();

        let restored = HistoryStore::load(&path).unwrap();
        assert_eq!(restored.entries(), store.entries());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::load(dir.path().join("absent.json")).unwrap();
        assert!(store.is_empty());
    }
}

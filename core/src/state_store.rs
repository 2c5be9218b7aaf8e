/// Account snapshot persistence
///
/// Only the current generation is written to disk; the previous generation
/// is scratch space for one delta computation.
use crate::error::{Result, WatchError};
use crate::records::{Comment, Deviation, Note};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// One generation of fetched message center state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Generation {
    pub comments: Vec<Comment>,
    #[serde(rename = "commentsCount")]
    pub comments_count: u64,

    pub deviations: Vec<Deviation>,
    #[serde(rename = "deviationsCount")]
    pub deviations_count: u64,

    pub replies: Vec<Comment>,
    #[serde(rename = "repliesCount")]
    pub replies_count: u64,

    pub unread_notes: Vec<Note>,
    #[serde(rename = "unread_notesCount")]
    pub unread_notes_count: u64,
}

/// Current and previous generation of the account's state
#[derive(Debug, Clone, Default)]
pub struct AccountSnapshot {
    pub current: Generation,
    pub previous: Generation,
}

impl AccountSnapshot {
    /// Move current into previous and install a freshly fetched generation
    pub fn rotate(&mut self, fetched: Generation) {
        self.previous = std::mem::replace(&mut self.current, fetched);
    }
}

/// Snapshot document on disk
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| self.error("unable to create state directory", e))?;
        }
        Ok(())
    }

    fn error(
        &self,
        detail: &str,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> WatchError {
        WatchError::State {
            path: self.path.clone(),
            detail: detail.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Load the snapshot; a missing file is the first-run state
    pub fn load(&self) -> Result<AccountSnapshot> {
        self.ensure_parent_dir()?;

        if !self.path.exists() {
            info!("No previous state at {:?} - all counts set to 0", self.path);
            return Ok(AccountSnapshot::default());
        }

        let raw = fs::read_to_string(&self.path)
            .map_err(|e| self.error("unable to read state document", e))?;
        if raw.trim().is_empty() {
            return Err(self.empty_document());
        }

        let value: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| self.error("unable to parse state document", e))?;
        if value.is_null() {
            return Err(self.empty_document());
        }

        let current: Generation = serde_json::from_value(value)
            .map_err(|e| self.error("unexpected state document layout", e))?;
        debug!(
            "Loaded state: {} comments, {} replies, {} unread notes, {} deviations",
            current.comments.len(),
            current.replies.len(),
            current.unread_notes.len(),
            current.deviations.len()
        );

        Ok(AccountSnapshot {
            current,
            previous: Generation::default(),
        })
    }

    /// Write the current generation, replacing any previous document
    pub fn save(&self, snapshot: &AccountSnapshot) -> Result<()> {
        self.ensure_parent_dir()?;
        let json = serde_json::to_string_pretty(&snapshot.current)
            .map_err(|e| self.error("unable to encode state document", e))?;
        // Renamed over the target; an interrupted save keeps the old document
        let dir = match self.path.parent() {
            Some(d) if !d.as_os_str().is_empty() => d,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)
            .map_err(|e| self.error("unable to create temporary state document", e))?;
        tmp.write_all(json.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| self.error("unable to write state document", e))?;
        tmp.persist(&self.path)
            .map_err(|e| self.error("unable to replace state document", e.error))?;
        debug!("Saved state to {:?}", self.path);
        Ok(())
    }

    fn empty_document(&self) -> WatchError {
        WatchError::State {
            path: self.path.clone(),
            detail: "state document is empty".to_string(),
            source: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::NoteId;
    use tempfile::TempDir;

    #[test]
    fn test_rotate() {
        let mut snapshot = AccountSnapshot::default();
        let mut first = Generation::default();
        first.comments_count = 3;
        snapshot.rotate(first.clone());

        let mut second = Generation::default();
        second.comments_count = 4;
        snapshot.rotate(second);

        assert_eq!(snapshot.previous.comments_count, 3);
        assert_eq!(snapshot.current.comments_count, 4);
    }

    #[test]
    fn test_missing_fields_default() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.json");
        fs::write(&path, r#"{"commentsCount": 2, "unread_notes": [{"ID": "9", "title": "t", "who": "w", "ts": 1}]}"#)
            .unwrap();

        let snapshot = StateStore::new(&path).load().unwrap();
        assert_eq!(snapshot.current.comments_count, 2);
        assert!(snapshot.current.comments.is_empty());
        assert_eq!(snapshot.current.unread_notes[0].id, NoteId::from(9));
        assert_eq!(snapshot.current.deviations_count, 0);
    }

    #[test]
    fn test_save_replaces_document_without_leftovers() {
        let temp_dir = TempDir::new().unwrap();
        let store = StateStore::new(temp_dir.path().join("state.json"));
        fs::write(store.path(), "{\"commentsCount\": 1, \"truncat").unwrap();

        let mut snapshot = AccountSnapshot::default();
        snapshot.current.replies_count = 7;
        store.save(&snapshot).unwrap();
        snapshot.current.replies_count = 8;
        store.save(&snapshot).unwrap();

        assert_eq!(store.load().unwrap().current.replies_count, 8);
        let entries: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("state.json")]);
    }

    #[test]
    fn test_document_keys() {
        let temp_dir = TempDir::new().unwrap();
        let store = StateStore::new(temp_dir.path().join("state.json"));
        let mut snapshot = AccountSnapshot::default();
        snapshot.previous.replies_count = 99;
        store.save(&snapshot).unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "comments",
                "commentsCount",
                "deviations",
                "deviationsCount",
                "replies",
                "repliesCount",
                "unread_notes",
                "unread_notesCount",
            ]
        );
        assert_eq!(value["repliesCount"], 0);
    }
}

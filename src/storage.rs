//! File-backed persistence for the task collection
//!
//! # Directory Structure
//!
//! ```text
//! <data dir>/
//!   taskdeck.toml        # Optional configuration
//!   items.json           # Persisted task collection
//!   items.json.lock      # Advisory lock held by the open session
//! ```
//!
//! Only the items are written. History lives in memory and is never
//! persisted.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::lock::{self, FileLock, DEFAULT_LOCK_TIMEOUT_MS};
use crate::session::Persistence;
use crate::task::Task;

/// Default items file name inside the data directory
pub const ITEMS_FILE: &str = "items.json";

/// Schema tag written into the items document
pub const ITEMS_SCHEMA_VERSION: &str = "taskdeck.items.v1";

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "TASKDECK_DIR";

/// On-disk shape of the items file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemsDocument {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    #[serde(default)]
    pub items: Vec<Task>,
}

fn default_schema_version() -> String {
    ITEMS_SCHEMA_VERSION.to_string()
}

impl ItemsDocument {
    pub fn new(items: Vec<Task>) -> Self {
        Self {
            schema_version: default_schema_version(),
            items,
        }
    }
}

/// Platform data directory, e.g. `~/.local/share/taskdeck` on Linux
pub fn default_data_dir() -> Result<PathBuf> {
    ProjectDirs::from("", "", "taskdeck")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
            Error::InvalidConfig(format!(
                "cannot determine a data directory; pass --data-dir or set {DATA_DIR_ENV}"
            ))
        })
}

/// Items file persistence with atomic, locked writes.
///
/// `load` takes the sidecar lock and keeps it until the store is dropped,
/// so a session's load, mutate, save cycle excludes every other writer.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock_timeout_ms: u64,
    held: Option<FileLock>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
            held: None,
        }
    }

    pub fn with_lock_timeout(mut self, timeout_ms: u64) -> Self {
        self.lock_timeout_ms = timeout_ms;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this store currently owns the sidecar lock.
    pub fn holds_lock(&self) -> bool {
        self.held.is_some()
    }

    /// Take the sidecar lock for the rest of this store's life.
    pub fn hold_lock(&mut self) -> Result<()> {
        if self.held.is_none() {
            let guard = FileLock::acquire(lock::lock_path_for(&self.path), self.lock_timeout_ms)?;
            debug!(path = %self.path.display(), "items lock held");
            self.held = Some(guard);
        }
        Ok(())
    }

    /// Read the items document. A missing file is an empty collection.
    pub fn read_items(&self) -> Result<Vec<Task>> {
        let bytes = if self.holds_lock() {
            lock::read_optional(&self.path)?
        } else {
            lock::read_locked(&self.path, self.lock_timeout_ms)?
        };
        let Some(bytes) = bytes else {
            debug!(path = %self.path.display(), "items file missing; starting empty");
            return Ok(Vec::new());
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        let document: ItemsDocument = serde_json::from_slice(&bytes)?;
        if document.schema_version != ITEMS_SCHEMA_VERSION {
            return Err(Error::InvalidConfig(format!(
                "unsupported items schema '{}' in {}",
                document.schema_version,
                self.path.display()
            )));
        }
        debug!(path = %self.path.display(), items = document.items.len(), "items loaded");
        Ok(document.items)
    }

    /// Replace the items document atomically
    pub fn write_items(&self, items: &[Task]) -> Result<()> {
        let document = ItemsDocument::new(items.to_vec());
        let mut json = serde_json::to_string_pretty(&document)?;
        json.push('\n');
        if self.holds_lock() {
            lock::write_atomic(&self.path, json.as_bytes())?;
        } else {
            lock::write_atomic_locked(&self.path, json.as_bytes(), self.lock_timeout_ms)?;
        }
        debug!(path = %self.path.display(), items = items.len(), "items saved");
        Ok(())
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

impl Persistence for FileStore {
    fn load(&mut self) -> Result<Vec<Task>> {
        self.hold_lock()?;
        self.read_items()
    }

    fn save(&mut self, items: &[Task]) -> Result<()> {
        self.write_items(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use crate::task::{NewTask, TaskPriority};
    use chrono::Utc;
    use tempfile::TempDir;

    fn sample() -> Vec<Task> {
        let now = Utc::now();
        vec![
            NewTask::new("One").into_task("id-1".to_string(), now),
            NewTask::new("Two")
                .with_priority(TaskPriority::High)
                .into_task("id-2".to_string(), now),
        ]
    }

    #[test]
    fn missing_file_loads_empty() {
        let temp = TempDir::new().expect("tempdir");
        let store = FileStore::new(temp.path().join(ITEMS_FILE));
        assert!(!store.exists());
        assert!(store.read_items().expect("read").is_empty());
    }

    #[test]
    fn write_then_read_preserves_items() {
        let temp = TempDir::new().expect("tempdir");
        let store = FileStore::new(temp.path().join("nested").join(ITEMS_FILE));
        let items = sample();
        store.write_items(&items).expect("write");

        assert_eq!(store.read_items().expect("read"), items);

        let raw = fs::read_to_string(store.path()).expect("raw");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(value["schema_version"], ITEMS_SCHEMA_VERSION);
        assert_eq!(value["items"].as_array().map(Vec::len), Some(2));
        assert!(value.get("history").is_none());
    }

    #[test]
    fn unknown_schema_is_rejected() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join(ITEMS_FILE);
        fs::write(&path, r#"{"schema_version":"taskdeck.items.v9","items":[]}"#).expect("write");
        let err = FileStore::new(&path).read_items().expect_err("schema");
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn corrupt_file_is_a_json_error() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join(ITEMS_FILE);
        fs::write(&path, "{ not json").expect("write");
        let err = FileStore::new(&path).read_items().expect_err("corrupt");
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn held_lock_times_out_writes() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join(ITEMS_FILE);
        let _held = lock::FileLock::acquire(lock::lock_path_for(&path), 1000).expect("lock");
        let err = FileStore::new(&path)
            .with_lock_timeout(50)
            .write_items(&sample())
            .expect_err("locked");
        assert!(matches!(err, Error::LockFailed(_)));
    }

    #[test]
    fn loaded_store_excludes_other_sessions_until_dropped() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join(ITEMS_FILE);
        FileStore::new(&path).write_items(&sample()).expect("seed");

        let mut first = FileStore::new(&path);
        assert_eq!(first.load().expect("load").len(), 2);
        assert!(first.holds_lock());

        let mut second = FileStore::new(&path).with_lock_timeout(50);
        let err = second.load().expect_err("locked");
        assert!(matches!(err, Error::LockFailed(_)));

        first.save(&sample()[..1]).expect("save under held lock");
        drop(first);

        assert_eq!(second.load().expect("load after release").len(), 1);
    }
}

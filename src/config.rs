//! Configuration loading and management
//!
//! Handles parsing of `taskdeck.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::history::{History, DEFAULT_HISTORY_CAPACITY};
use crate::lock::DEFAULT_LOCK_TIMEOUT_MS;
use crate::storage::FileStore;
use crate::view::{SortConfig, SortDirection, SortField, ViewMode};

/// Config file name inside the data directory
pub const CONFIG_FILE: &str = "taskdeck.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Undo/redo history
    #[serde(default)]
    pub history: HistoryConfig,

    /// Initial view settings for the shell and `list`
    #[serde(default)]
    pub view: ViewConfig,

    /// Data file location
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryConfig {
    /// Maximum number of undo steps
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViewConfig {
    #[serde(default)]
    pub mode: ViewMode,

    #[serde(default = "default_sort_field")]
    pub sort_field: SortField,

    #[serde(default = "default_sort_direction")]
    pub sort_direction: SortDirection,
}

fn default_sort_field() -> SortField {
    SortConfig::default().field
}

fn default_sort_direction() -> SortDirection {
    SortConfig::default().direction
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            mode: ViewMode::default(),
            sort_field: default_sort_field(),
            sort_direction: default_sort_direction(),
        }
    }
}

impl ViewConfig {
    pub fn sort(&self) -> SortConfig {
        SortConfig {
            field: self.sort_field,
            direction: self.sort_direction,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// Items file; relative paths resolve against the data directory.
    /// Defaults to `items.json` in the data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// How long to wait for another session to release the items file
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: None,
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise defaults. A present but invalid
    /// file is an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load `taskdeck.toml` from a data directory
    pub fn load_from_dir(data_dir: &Path) -> Result<Self> {
        Self::load_or_default(&data_dir.join(CONFIG_FILE))
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.history.capacity == 0 {
            return Err(Error::InvalidConfig(
                "history.capacity must be > 0".to_string(),
            ));
        }
        if let Some(path) = &self.storage.path {
            if path.as_os_str().is_empty() {
                return Err(Error::InvalidConfig(
                    "storage.path cannot be empty".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Fresh history sized by `history.capacity`
    pub fn new_history(&self) -> Result<History> {
        History::new(self.history.capacity)
    }

    /// Resolve the items file against `data_dir`
    pub fn items_path(&self, data_dir: &Path) -> PathBuf {
        match &self.storage.path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => data_dir.join(path),
            None => data_dir.join(crate::storage::ITEMS_FILE),
        }
    }

    /// Items file store for `data_dir` using the configured lock timeout
    pub fn file_store(&self, data_dir: &Path) -> FileStore {
        FileStore::new(self.items_path(data_dir)).with_lock_timeout(self.storage.lock_timeout_ms)
    }
}

//! Persisted client flags ("already rated", "checkpoint completed", "hide how-to").
//!
//! Flags are opaque string keys with a string value. A JSON-backed store keeps them across
//! CLI invocations; the in-memory store backs tests and single-run sessions.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::serde::ts_seconds;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::path_processing::{expand_tilde, prompt_finder_config_dir};

/// Environment variable controlling the flag file location.
pub const FLAGS_PATH_ENV: &str = "PF_FLAGS_PATH";

/// Default filename for the persisted flags.
pub const FLAGS_FILE_NAME: &str = "flags.json";

/// Errors surfaced by flag store operations.
#[derive(Debug, Error)]
pub enum FlagStoreError {
    #[error("flag store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("flag store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A stored flag value and when it was written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFlag {
    pub value: String,
    #[serde(with = "ts_seconds")]
    pub updated_at: DateTime<Utc>,
}

/// Backend for persisted client flags.
pub trait FlagStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<StoredFlag>, FlagStoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), FlagStoreError>;

    fn remove(&self, key: &str) -> Result<(), FlagStoreError>;

    /// `true` when the flag holds `"1"`.
    fn is_set(&self, key: &str) -> Result<bool, FlagStoreError> {
        Ok(self.get(key)?.is_some_and(|flag| flag.value == "1"))
    }
}

#[derive(Default, Serialize, Deserialize)]
struct FlagFile {
    flags: BTreeMap<String, StoredFlag>,
}

impl FlagFile {
    fn upsert(&mut self, key: &str, value: &str) {
        self.flags.insert(
            key.to_string(),
            StoredFlag {
                value: value.to_string(),
                updated_at: Utc::now(),
            },
        );
    }
}

/// JSON-backed flag store persisted on disk.
pub struct JsonFlagStore {
    path: PathBuf,
    file: Mutex<FlagFile>,
}

impl JsonFlagStore {
    /// Create a store at the provided path (or the default path when omitted).
    pub fn new<P: Into<Option<PathBuf>>>(path: P) -> Result<Self, FlagStoreError> {
        let resolved_path = match path.into() {
            Some(path) => path,
            None => default_flags_path(),
        };
        let file = load_flag_file(&resolved_path)?;
        Ok(Self {
            path: resolved_path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save_locked(&self, file: &FlagFile) -> Result<(), FlagStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(file)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

impl FlagStore for JsonFlagStore {
    fn get(&self, key: &str) -> Result<Option<StoredFlag>, FlagStoreError> {
        let file = self.file.lock().expect("flag store lock poisoned");
        Ok(file.flags.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), FlagStoreError> {
        let mut file = self.file.lock().expect("flag store lock poisoned");
        file.upsert(key, value);
        self.save_locked(&file)
    }

    fn remove(&self, key: &str) -> Result<(), FlagStoreError> {
        let mut file = self.file.lock().expect("flag store lock poisoned");
        if file.flags.remove(key).is_some() {
            self.save_locked(&file)?;
        }
        Ok(())
    }
}

/// In-memory flag store.
#[derive(Default)]
pub struct InMemoryFlagStore {
    file: Mutex<FlagFile>,
}

impl InMemoryFlagStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FlagStore for InMemoryFlagStore {
    fn get(&self, key: &str) -> Result<Option<StoredFlag>, FlagStoreError> {
        let file = self.file.lock().expect("flag store lock poisoned");
        Ok(file.flags.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), FlagStoreError> {
        let mut file = self.file.lock().expect("flag store lock poisoned");
        file.upsert(key, value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), FlagStoreError> {
        let mut file = self.file.lock().expect("flag store lock poisoned");
        file.flags.remove(key);
        Ok(())
    }
}

fn default_flags_path() -> PathBuf {
    if let Ok(path) = env::var(FLAGS_PATH_ENV)
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }
    prompt_finder_config_dir().join(FLAGS_FILE_NAME)
}

fn load_flag_file(path: &Path) -> Result<FlagFile, FlagStoreError> {
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<FlagFile>(&content) {
            Ok(file) => Ok(file),
            Err(error) => {
                warn!("Failed to parse flag file at {}: {}", path.display(), error);
                Ok(FlagFile::default())
            }
        },
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(FlagFile::default()),
        Err(error) => Err(FlagStoreError::Io(error)),
    }
}

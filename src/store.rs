// src/store.rs

use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("File I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    #[error("JSON processing error")]
    Json(#[from] serde_json::Error),
}

// Helper to create context-aware IO errors
fn io_context<E: Into<std::io::Error>, S: Into<String>>(source: E, context: S) -> StoreError {
    StoreError::Io {
        source: source.into(),
        context: context.into(),
    }
}

/// String-keyed blob store with get/set/remove semantics. Values are
/// JSON-serialized strings; use [`get_json`]/[`set_json`] for typed access.
pub trait KeyValueStore: Send + Sync {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set_raw(&self, key: &str, value: String) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

pub fn get_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.get_raw(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub fn set_json<T: Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let json_string = serde_json::to_string_pretty(value)?;
    store.set_raw(key, json_string)
}

// --- File-backed store ---

/// One JSON file per key under a state directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .map_err(|e| io_context(e, format!("Failed to create state directory: {:?}", dir)))?;
        }
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_name_for_key(key)))
    }
}

/// Keys are arbitrary strings; file names are not. Sanitize, and fall back
/// to a prefix + hash when the sanitized key would be unwieldy.
fn file_name_for_key(key: &str) -> String {
    let mut name = key.replace(|c: char| !c.is_alphanumeric(), "_");

    const MAX_NAME_LEN: usize = 100;
    if name.len() > MAX_NAME_LEN {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        let hash = hasher.finalize();
        name = format!("{}_{}", &name[..MAX_NAME_LEN / 2], hex::encode(&hash[..8]));
    }

    name
}

impl KeyValueStore for FileStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        if !path.exists() {
            debug!("Store miss (file not found) for key: {}", key);
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)
            .map_err(|e| io_context(e, format!("Failed to read store file: {:?}", path)))?;
        Ok(Some(raw))
    }

    fn set_raw(&self, key: &str, value: String) -> Result<(), StoreError> {
        let path = self.path_for(key);
        write_file(&path, &value)?;
        debug!("Stored value for key: {}", key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(&path)
                .map_err(|e| io_context(e, format!("Failed to remove store file: {:?}", path)))?;
        }
        Ok(())
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            io_context(e, format!("Failed to create directory for store file: {:?}", parent))
        })?;
    }
    let mut file = File::create(path)
        .map_err(|e| io_context(e, format!("Failed to create store file: {:?}", path)))?;
    file.write_all(contents.as_bytes())
        .map_err(|e| io_context(e, format!("Failed to write store file: {:?}", path)))?;
    Ok(())
}

// --- In-memory store ---

/// Backing store for tests; same semantics, no filesystem.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn set_raw(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_sanitizes_and_keeps_short_keys() {
        assert_eq!(file_name_for_key("auth_token"), "auth_token");
        assert_eq!(file_name_for_key("user profile/v2"), "user_profile_v2");
    }

    #[test]
    fn file_name_hashes_long_keys() {
        let long_key = "k".repeat(300);
        let name = file_name_for_key(&long_key);
        assert!(name.len() < 300);
        assert!(name.starts_with(&"k".repeat(50)));
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::new();
        set_json(&store, "numbers", &vec![1, 2, 3]).unwrap();
        let back: Option<Vec<i32>> = get_json(&store, "numbers").unwrap();
        assert_eq!(back, Some(vec![1, 2, 3]));

        store.remove("numbers").unwrap();
        let gone: Option<Vec<i32>> = get_json(&store, "numbers").unwrap();
        assert!(gone.is_none());
    }
}

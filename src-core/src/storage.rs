//! String key-value persistence used for local history, handoff staging and
//! the session token.
//!
//! The browser build backs this with `localStorage`; natively it is a JSON
//! file written atomically.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::error::KaleError;

/// Minimal string key-value store with `localStorage` semantics.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, KaleError>;
    fn set(&self, key: &str, value: &str) -> Result<(), KaleError>;
    fn remove(&self, key: &str) -> Result<(), KaleError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> Result<Option<String>, KaleError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KaleError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), KaleError> {
        (**self).remove(key)
    }
}

/// In-process store. Contents are lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, KaleError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| KaleError::Storage("memory store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KaleError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| KaleError::Storage("memory store lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), KaleError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| KaleError::Storage("memory store lock poisoned".to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use file_store::JsonFileStore;

#[cfg(not(target_arch = "wasm32"))]
mod file_store {
    use std::collections::BTreeMap;
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    use tempfile::NamedTempFile;
    use tracing::{debug, info};

    use super::KeyValueStore;
    use crate::error::KaleError;

    /// JSON object on disk, one string value per key.
    ///
    /// Every mutation rewrites the whole file through a temp file in the same
    /// directory followed by a rename, so a crash never leaves a partial file.
    pub struct JsonFileStore {
        path: PathBuf,
        entries: Mutex<BTreeMap<String, String>>,
    }

    impl JsonFileStore {
        /// Open the store at `path`, creating parent directories as needed.
        /// A missing file starts empty.
        pub fn open(path: &Path) -> Result<Self, KaleError> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| KaleError::Storage(format!("Failed to create data dir: {}", e)))?;
            }

            let entries = if path.exists() {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    KaleError::Storage(format!("Failed to read {:?}: {}", path, e))
                })?;
                if content.trim().is_empty() {
                    BTreeMap::new()
                } else {
                    serde_json::from_str(&content).map_err(|e| {
                        KaleError::Storage(format!("Corrupt store file {:?}: {}", path, e))
                    })?
                }
            } else {
                BTreeMap::new()
            };

            info!("Opened key-value store at {:?} ({} keys)", path, entries.len());
            Ok(Self {
                path: path.to_path_buf(),
                entries: Mutex::new(entries),
            })
        }

        pub fn path(&self) -> &Path {
            &self.path
        }

        fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), KaleError> {
            let json = serde_json::to_string_pretty(entries)
                .map_err(|e| KaleError::Storage(format!("Failed to serialize store: {}", e)))?;

            let parent = self.path.parent().ok_or_else(|| {
                KaleError::Storage(format!("Store path has no parent directory: {:?}", self.path))
            })?;

            let mut temp = NamedTempFile::new_in(parent)
                .map_err(|e| KaleError::Storage(format!("Failed to create temp file: {}", e)))?;
            temp.write_all(json.as_bytes())
                .and_then(|_| temp.flush())
                .map_err(|e| KaleError::Storage(format!("Failed to write store: {}", e)))?;
            temp.persist(&self.path)
                .map_err(|e| KaleError::Storage(format!("Failed to replace store file: {}", e)))?;

            debug!("Wrote {} keys to {:?}", entries.len(), self.path);
            Ok(())
        }

        fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>, KaleError> {
            self.entries
                .lock()
                .map_err(|_| KaleError::Storage("file store lock poisoned".to_string()))
        }
    }

    impl KeyValueStore for JsonFileStore {
        fn get(&self, key: &str) -> Result<Option<String>, KaleError> {
            Ok(self.lock()?.get(key).cloned())
        }

        fn set(&self, key: &str, value: &str) -> Result<(), KaleError> {
            let mut entries = self.lock()?;
            entries.insert(key.to_string(), value.to_string());
            self.persist(&entries)
        }

        fn remove(&self, key: &str) -> Result<(), KaleError> {
            let mut entries = self.lock()?;
            if entries.remove(key).is_some() {
                self.persist(&entries)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_set_get_remove() {
        let store = MemoryStore::new();
        assert!(store.get("token").unwrap().is_none());

        store.set("token", "abc").unwrap();
        assert_eq!(store.get("token").unwrap(), Some("abc".to_string()));

        store.remove("token").unwrap();
        assert!(store.get("token").unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("store.json");

        {
            let store = JsonFileStore::open(&path).unwrap();
            store.set("analysisHistory", "[]").unwrap();
            store.set("token", "t-1").unwrap();
            store.remove("token").unwrap();
        }

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get("analysisHistory").unwrap(), Some("[]".to_string()));
        assert!(reopened.get("token").unwrap().is_none());
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json").unwrap();

        let result = JsonFileStore::open(&path);
        assert!(matches!(result, Err(KaleError::Storage(_))));
    }

    #[test]
    fn test_store_through_reference() {
        let store = MemoryStore::new();
        let by_ref = &store;
        by_ref.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap(), Some("v".to_string()));
    }
}

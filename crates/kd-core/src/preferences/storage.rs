//! Durable key/value backends for the preference store
//!
//! Backends deal in raw JSON text, the same shape browser local storage
//! has: one string per key. Serialization lives in the store.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised by a storage backend
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("persistent storage is not available")]
    Unavailable,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("could not encode storage document: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A persistent string key/value capability
pub trait PreferenceStorage: Send + Sync {
    /// Whether this backend can persist anything at all
    fn is_available(&self) -> bool {
        true
    }

    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    /// All keys currently stored, in insertion order
    fn keys(&self) -> Result<Vec<String>, StorageError>;

    fn clear(&self) -> Result<(), StorageError>;
}

/// In-process storage, lost when the process exits
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RwLock<IndexMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items.write().shift_remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.items.read().keys().cloned().collect())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.items.write().clear();
        Ok(())
    }
}

/// Storage for environments with no persistent capability (headless runs,
/// read-only installs). Every call fails with [`StorageError::Unavailable`].
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableStorage;

impl PreferenceStorage for UnavailableStorage {
    fn is_available(&self) -> bool {
        false
    }

    fn get_item(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable)
    }

    fn set_item(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable)
    }

    fn remove_item(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable)
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Err(StorageError::Unavailable)
    }

    fn clear(&self) -> Result<(), StorageError> {
        Err(StorageError::Unavailable)
    }
}

/// All preferences in one JSON object document on disk
///
/// The document is loaded on first access and rewritten in full on every
/// change, through a sibling temp file so a crash never leaves half a file.
pub struct FileStorage {
    path: PathBuf,
    items: RwLock<Option<IndexMap<String, String>>>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            items: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_loaded(&self) -> Result<(), StorageError> {
        if self.items.read().is_some() {
            return Ok(());
        }

        let mut items = self.items.write();
        if items.is_none() {
            *items = Some(self.read_document()?);
        }
        Ok(())
    }

    fn read_document(&self) -> Result<IndexMap<String, String>, StorageError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No preference file yet");
                return Ok(IndexMap::new());
            }
            Err(err) => return Err(err.into()),
        };

        match serde_json::from_str(&text) {
            Ok(items) => Ok(items),
            Err(err) => {
                // Keep the unreadable file aside and start over
                let backup = self.path.with_extension("json.corrupt");
                warn!(
                    path = %self.path.display(),
                    backup = %backup.display(),
                    "Preference file is corrupt, starting empty: {}",
                    err
                );
                fs::rename(&self.path, &backup)?;
                Ok(IndexMap::new())
            }
        }
    }

    fn write_document(&self, items: &IndexMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let text = serde_json::to_string_pretty(items)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn modify<F>(&self, f: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut IndexMap<String, String>),
    {
        self.ensure_loaded()?;
        let mut guard = self.items.write();
        // only a change that reached the disk becomes visible to reads
        let mut updated = guard.clone().unwrap_or_default();
        f(&mut updated);
        self.write_document(&updated)?;
        *guard = Some(updated);
        Ok(())
    }
}

impl PreferenceStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.ensure_loaded()?;
        Ok(self
            .items
            .read()
            .as_ref()
            .and_then(|items| items.get(key).cloned()))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.modify(|items| {
            items.insert(key.to_string(), value.to_string());
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.modify(|items| {
            items.shift_remove(key);
        })
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        self.ensure_loaded()?;
        Ok(self
            .items
            .read()
            .as_ref()
            .map(|items| items.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.modify(|items| items.clear())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_basic_ops() {
        let storage = MemoryStorage::new();
        storage.set_item("a", "1").unwrap();
        storage.set_item("b", "2").unwrap();
        assert_eq!(storage.get_item("a").unwrap().as_deref(), Some("1"));
        assert_eq!(storage.keys().unwrap(), vec!["a", "b"]);

        storage.remove_item("a").unwrap();
        assert_eq!(storage.get_item("a").unwrap(), None);

        storage.clear().unwrap();
        assert!(storage.keys().unwrap().is_empty());
    }

    #[test]
    fn test_unavailable_storage_always_fails() {
        let storage = UnavailableStorage;
        assert!(!storage.is_available());
        assert!(matches!(storage.get_item("a"), Err(StorageError::Unavailable)));
        assert!(matches!(storage.set_item("a", "1"), Err(StorageError::Unavailable)));
    }

    #[test]
    fn test_file_storage_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs").join("preferences.json");

        let storage = FileStorage::new(&path);
        assert_eq!(storage.get_item("themePreferences").unwrap(), None);
        storage
            .set_item("themePreferences", r#"{"mode":"dark"}"#)
            .unwrap();

        let reopened = FileStorage::new(&path);
        assert_eq!(
            reopened.get_item("themePreferences").unwrap().as_deref(),
            Some(r#"{"mode":"dark"}"#)
        );
    }

    #[test]
    fn test_file_storage_recovers_from_corrupt_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        fs::write(&path, "{ not json").unwrap();

        let storage = FileStorage::new(&path);
        assert_eq!(storage.get_item("anything").unwrap(), None);
        assert!(path.with_extension("json.corrupt").exists());

        storage.set_item("k", "\"v\"").unwrap();
        assert_eq!(FileStorage::new(&path).keys().unwrap(), vec!["k"]);
    }

    #[test]
    fn test_failed_file_write_is_not_visible() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        let storage = FileStorage::new(&path);
        storage.set_item("k", "1").unwrap();

        // a directory in the temp file's place makes every write fail
        fs::create_dir(path.with_extension("json.tmp")).unwrap();
        assert!(matches!(storage.set_item("k", "5"), Err(StorageError::Io(_))));
        assert!(storage.remove_item("k").is_err());
        assert!(storage.clear().is_err());

        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("1"));
        assert_eq!(storage.keys().unwrap(), vec!["k"]);
    }
}

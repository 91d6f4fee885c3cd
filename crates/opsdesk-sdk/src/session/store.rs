//! Key/value backends for session state
//!
//! Backends are plain data access: no validation, no interpretation of values.
//! All operations are synchronous and a successful `set` is durable before it
//! returns.

use etcetera::{choose_base_strategy, BaseStrategy};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Result type for storage operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Session storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file is not a valid session document, or a value failed to encode
    #[error("Session serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No platform data directory could be determined
    #[error("Failed to determine data directory: {0}")]
    DataDir(String),
}

/// One change in a batch passed to [`KeyValueStore::apply`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation<'a> {
    Set(&'a str, &'a str),
    Remove(&'a str),
}

/// Persistent string key/value storage
pub trait KeyValueStore: Send + Sync + fmt::Debug {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    fn remove(&self, key: &str) -> StoreResult<()>;

    /// Remove every key in `keys`.
    fn clear(&self, keys: &[&str]) -> StoreResult<()> {
        for key in keys {
            self.remove(key)?;
        }
        Ok(())
    }

    /// Apply `batch` as a unit: either every change lands or none does.
    fn apply(&self, batch: &[Mutation<'_>]) -> StoreResult<()>;
}

/// Process-local store, used by tests and short-lived tools
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn apply(&self, batch: &[Mutation<'_>]) -> StoreResult<()> {
        let mut entries = self.entries.write();
        for mutation in batch {
            match *mutation {
                Mutation::Set(key, value) => {
                    entries.insert(key.to_string(), value.to_string());
                }
                Mutation::Remove(key) => {
                    entries.remove(key);
                }
            }
        }
        Ok(())
    }
}

/// JSON document on disk, rewritten on every mutation
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl fmt::Debug for FileStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // values are credentials
        f.debug_struct("FileStore")
            .field("path", &self.path)
            .field("keys", &self.entries.read().len())
            .finish()
    }
}

impl FileStore {
    /// Open the store at `path`, starting empty if the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            debug!("Session file not found at {}, starting empty", path.display());
            BTreeMap::new()
        };

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Platform data directory location (e.g. `~/.local/share/opsdesk/session.json`)
    pub fn default_path() -> StoreResult<PathBuf> {
        let strategy = choose_base_strategy().map_err(|e| StoreError::DataDir(e.to_string()))?;
        Ok(strategy.data_dir().join("opsdesk").join("session.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the document through a temp file readable only by the owner
    fn persist(&self, entries: &BTreeMap<String, String>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        // mode only applies on creation
        match std::fs::remove_file(&tmp) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            options.mode(0o600);
        }
        let mut file = options.open(&tmp)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        drop(file);

        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Run `change` on a copy of the entries and keep it only if it persists
    fn mutate(&self, change: impl FnOnce(&mut BTreeMap<String, String>)) -> StoreResult<()> {
        let mut entries = self.entries.write();
        let mut updated = entries.clone();
        change(&mut updated);
        if updated == *entries {
            return Ok(());
        }
        self.persist(&updated)?;
        *entries = updated;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.mutate(|entries| {
            entries.remove(key);
        })
    }

    fn clear(&self, keys: &[&str]) -> StoreResult<()> {
        self.mutate(|entries| {
            for key in keys {
                entries.remove(*key);
            }
        })
    }

    fn apply(&self, batch: &[Mutation<'_>]) -> StoreResult<()> {
        self.mutate(|entries| {
            for mutation in batch {
                match *mutation {
                    Mutation::Set(key, value) => {
                        entries.insert(key.to_string(), value.to_string());
                    }
                    Mutation::Remove(key) => {
                        entries.remove(key);
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryStore::new();
        store.set("authToken", "abc").unwrap();
        assert_eq!(store.get("authToken").as_deref(), Some("abc"));

        store.remove("authToken").unwrap();
        assert!(store.get("authToken").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn clear_only_touches_listed_keys() {
        let store = MemoryStore::new();
        store.set("authToken", "abc").unwrap();
        store.set("theme", "dark").unwrap();

        store.clear(&["authToken", "never-set"]).unwrap();
        assert!(store.get("authToken").is_none());
        assert_eq!(store.get("theme").as_deref(), Some("dark"));
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let store = FileStore::open(&path).unwrap();
        store.set("authToken", "abc").unwrap();
        store.set("tokenType", "Bearer").unwrap();
        drop(store);

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("authToken").as_deref(), Some("abc"));
        assert_eq!(reopened.get("tokenType").as_deref(), Some("Bearer"));

        reopened.clear(&["authToken", "tokenType"]).unwrap();
        let reopened = FileStore::open(&path).unwrap();
        assert!(reopened.get("authToken").is_none());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(FileStore::open(&path), Err(StoreError::Serialization(_))));
    }

    #[cfg(unix)]
    #[test]
    fn file_store_is_private_to_owner() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = FileStore::open(&path).unwrap();
        store.set("authToken", "abc").unwrap();
        store.set("refreshToken", "r-1").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o077, 0, "session file mode is {:o}", mode & 0o777);
    }

    #[test]
    fn failed_write_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();

        // parent is a regular file, so every write fails
        let store = FileStore::open(blocker.join("session.json")).unwrap();
        assert!(store.set("authToken", "abc").is_err());
        assert!(store.get("authToken").is_none());

        let batch = [
            Mutation::Set("authToken", "abc"),
            Mutation::Set("tokenExpiration", "1"),
        ];
        assert!(store.apply(&batch).is_err());
        assert!(store.get("tokenExpiration").is_none());
    }

    #[test]
    fn batch_lands_in_one_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = FileStore::open(&path).unwrap();
        store.set("customerId", "12").unwrap();

        store
            .apply(&[
                Mutation::Set("authToken", "abc"),
                Mutation::Set("tokenExpiration", "42"),
                Mutation::Remove("customerId"),
            ])
            .unwrap();

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("authToken").as_deref(), Some("abc"));
        assert_eq!(reopened.get("tokenExpiration").as_deref(), Some("42"));
        assert!(reopened.get("customerId").is_none());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn debug_output_hides_values() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("session.json")).unwrap();
        store.set("authToken", "super-secret").unwrap();
        assert!(!format!("{store:?}").contains("super-secret"));
    }
}

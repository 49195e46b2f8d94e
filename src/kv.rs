//! Persisted string key-value stores.
//!
//! Cooldown timestamps and HTTP validators each live in their own
//! [`KeyValueStore`] instance. Writes are single-key upserts; there are no
//! cross-key transactions.

use crate::error::{Result, SyncError};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tidesync_fetch::{FetchError, ValidatorStore, Validators};
use tracing::{debug, warn};

/// A process-wide string map with get/put/remove/clear semantics.
pub trait KeyValueStore: Send + Sync {
    /// Value stored for `key`.
    fn get(&self, key: &str) -> Result<Option<String>>;
    /// Insert or overwrite `key`.
    fn put(&self, key: &str, value: &str) -> Result<()>;
    /// Remove `key`. Returns `true` when it existed.
    fn remove(&self, key: &str) -> Result<bool>;
    /// Remove every key.
    fn clear(&self) -> Result<()>;
    /// All stored keys, sorted.
    fn keys(&self) -> Result<Vec<String>>;
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| SyncError::Store("key-value store lock poisoned".to_owned()))
}

/// In-memory store, lost on restart.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.entries)?.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        lock(&self.entries)?.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        Ok(lock(&self.entries)?.remove(key).is_some())
    }

    fn clear(&self) -> Result<()> {
        lock(&self.entries)?.clear();
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = lock(&self.entries)?.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

/// JSON-file-backed store.
///
/// The whole map is loaded at open and rewritten (temp file + rename) on
/// every mutation. A malformed file is treated as empty.
#[derive(Debug)]
pub struct JsonFileKvStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonFileKvStore {
    /// Open (or lazily create) the store at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = read_map(&path)?;
        debug!(path = %path.display(), entries = entries.len(), "opened key-value store");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_map(path: &Path) -> Result<BTreeMap<String, String>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => {
            return Err(SyncError::Store(format!(
                "cannot read {}: {e}",
                path.display()
            )));
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(map) => Ok(map),
        Err(e) => {
            warn!("ignoring malformed key-value store at {}: {e}", path.display());
            Ok(BTreeMap::new())
        }
    }
}

fn write_map(path: &Path, map: &BTreeMap<String, String>) -> Result<()> {
    write_json_atomic(path, map)
}

/// Serialize `value` to `path` via a sibling temp file and rename, creating
/// parent directories as needed.
pub(crate) fn write_json_atomic<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            SyncError::Store(format!("cannot create {}: {e}", parent.display()))
        })?;
    }

    let tmp_path = path.with_extension("tmp");
    let json = serde_json::to_vec_pretty(value)
        .map_err(|e| SyncError::Store(format!("cannot serialize {}: {e}", path.display())))?;
    std::fs::write(&tmp_path, json)
        .map_err(|e| SyncError::Store(format!("cannot write {}: {e}", tmp_path.display())))?;
    std::fs::rename(&tmp_path, path)
        .map_err(|e| SyncError::Store(format!("cannot finalize {}: {e}", path.display())))?;
    Ok(())
}

impl KeyValueStore for JsonFileKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.entries)?.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = lock(&self.entries)?;
        let mut next = entries.clone();
        next.insert(key.to_owned(), value.to_owned());
        write_map(&self.path, &next)?;
        *entries = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let mut entries = lock(&self.entries)?;
        if !entries.contains_key(key) {
            return Ok(false);
        }
        let mut next = entries.clone();
        next.remove(key);
        write_map(&self.path, &next)?;
        *entries = next;
        Ok(true)
    }

    fn clear(&self) -> Result<()> {
        let mut entries = lock(&self.entries)?;
        let next = BTreeMap::new();
        write_map(&self.path, &next)?;
        *entries = next;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(lock(&self.entries)?.keys().cloned().collect())
    }
}

/// Stores HTTP validators as JSON values in a [`KeyValueStore`].
#[derive(Clone)]
pub struct KvValidatorStore {
    kv: Arc<dyn KeyValueStore>,
}

impl KvValidatorStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }
}

impl ValidatorStore for KvValidatorStore {
    fn load(&self, key: &str) -> tidesync_fetch::Result<Option<Validators>> {
        let Some(raw) = self.kv.get(key).map_err(store_err)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(validators) => Ok(Some(validators)),
            Err(e) => {
                // Fall back to an unconditional request.
                warn!(key, "discarding unreadable validators: {e}");
                Ok(None)
            }
        }
    }

    fn save(&self, key: &str, validators: &Validators) -> tidesync_fetch::Result<()> {
        let json = serde_json::to_string(validators)
            .map_err(|e| FetchError::Store(format!("cannot serialize validators: {e}")))?;
        self.kv.put(key, &json).map_err(store_err)
    }

    fn remove(&self, key: &str) -> tidesync_fetch::Result<()> {
        self.kv.remove(key).map(|_| ()).map_err(store_err)
    }
}

fn store_err(e: SyncError) -> FetchError {
    FetchError::Store(e.to_string())
}

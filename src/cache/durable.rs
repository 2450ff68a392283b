//! Durable Tier Module
//!
//! Cross-session storage for cache entries. Records are kept as JSON strings
//! in a string key/value store under a namespaced key, and carry the release
//! identifier they were written under.

use std::collections::HashMap;
use std::fmt::Debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::cache::{CacheEntry, PersistedRecord};
use crate::error::StorageError;

type StorageResult<T> = std::result::Result<T, StorageError>;

// == Storage Trait ==
/// A string key/value store shared by every cache instance in the profile.
pub trait DurableStorage: Send + Sync + Debug {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;
    fn remove_item(&self, key: &str) -> StorageResult<()>;
    fn keys(&self) -> StorageResult<Vec<String>>;

    /// Removes several items in one pass. Stops at the first failure.
    fn remove_items(&self, keys: &[String]) -> StorageResult<()> {
        keys.iter().try_for_each(|key| self.remove_item(key))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> StorageResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| StorageError::Unavailable("storage lock poisoned".to_string()))
}

// == Memory Storage ==
#[derive(Debug, Default)]
struct MemoryStorageInner {
    items: HashMap<String, String>,
    quota_bytes: Option<usize>,
    disabled: bool,
}

/// In-process storage with an optional byte quota.
///
/// Clones share the same items, so a test can keep a handle and inspect what
/// the cache persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryStorageInner>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates storage that rejects writes once keys plus values exceed `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        let storage = Self::default();
        if let Ok(mut inner) = storage.inner.lock() {
            inner.quota_bytes = Some(quota_bytes);
        }
        storage
    }

    /// Makes every operation fail as if storage were turned off.
    pub fn set_disabled(&self, disabled: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.disabled = disabled;
        }
    }

    /// Number of stored items, regardless of namespace.
    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn guard(&self) -> StorageResult<MutexGuard<'_, MemoryStorageInner>> {
        let inner = lock(&self.inner)?;
        if inner.disabled {
            return Err(StorageError::Unavailable("storage disabled".to_string()));
        }
        Ok(inner)
    }
}

impl DurableStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.guard()?.items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut inner = self.guard()?;
        if let Some(quota) = inner.quota_bytes {
            let used: usize = inner
                .items
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if used + key.len() + value.len() > quota {
                return Err(StorageError::QuotaExceeded(format!(
                    "writing '{}' needs {} bytes, {} of {} in use",
                    key,
                    key.len() + value.len(),
                    used,
                    quota
                )));
            }
        }
        inner.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.guard()?.items.remove(key);
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.guard()?.items.keys().cloned().collect())
    }

    fn remove_items(&self, keys: &[String]) -> StorageResult<()> {
        let mut inner = self.guard()?;
        for key in keys {
            inner.items.remove(key);
        }
        Ok(())
    }
}

// == File Storage ==
/// Storage persisted as one file per item under a directory.
///
/// Each item is written to a temp file and renamed into place, so a crash
/// never leaves a half-written record and a write touches only its own
/// file. Item keys are percent-encoded into file names.
#[derive(Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

const ITEM_EXTENSION: &str = "json";

impl FileStorage {
    /// Opens (or creates) storage rooted at the directory `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn item_path(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", urlencoding::encode(key), ITEM_EXTENSION))
    }
}

impl DurableStorage for FileStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        match fs::read_to_string(self.item_path(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.item_path(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        match fs::remove_file(self.item_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        for dir_entry in fs::read_dir(&self.dir)? {
            let path = dir_entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(ITEM_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            match urlencoding::decode(stem) {
                Ok(key) => keys.push(key.into_owned()),
                Err(_) => debug!("Skipping foreign file {}", path.display()),
            }
        }
        Ok(keys)
    }
}

// == Durable Tier ==
/// What a stored record turned out to be.
enum Stored {
    Absent,
    /// Storage failed; the record may or may not exist
    Unreadable,
    Live(CacheEntry),
    Expired(CacheEntry),
    /// Corrupt or written under another version
    Discard,
}

/// Namespaced, versioned view of a [`DurableStorage`].
#[derive(Debug)]
pub struct DurableTier {
    storage: Box<dyn DurableStorage>,
    prefix: String,
    version: String,
}

impl DurableTier {
    pub fn new(
        storage: Box<dyn DurableStorage>,
        prefix: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            prefix: prefix.into(),
            version: version.into(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    fn storage_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Logical keys of every record in this namespace.
    fn logical_keys(&self) -> StorageResult<Vec<String>> {
        Ok(self
            .storage
            .keys()?
            .into_iter()
            .filter_map(|k| k.strip_prefix(&self.prefix).map(str::to_string))
            .collect())
    }

    /// Loads and classifies the record under `key` without changing storage.
    fn load(&self, key: &str, now_ms: u64) -> Stored {
        let raw = match self.storage.get_item(&self.storage_key(key)) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Stored::Absent,
            Err(e) => {
                warn!("Durable cache read failed for {}: {}", key, e);
                return Stored::Unreadable;
            }
        };

        let record: PersistedRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                warn!("Corrupt durable cache entry {}: {}", key, e);
                return Stored::Discard;
            }
        };

        let entry = CacheEntry::from_record(key, record);
        if !entry.matches_version(&self.version) {
            debug!(
                "Durable entry {} has version {}, running {}",
                key, entry.schema_version, self.version
            );
            return Stored::Discard;
        }
        if entry.is_expired_at(now_ms) {
            Stored::Expired(entry)
        } else {
            Stored::Live(entry)
        }
    }

    // == Read ==
    /// Reads the record stored under `key`.
    ///
    /// Corrupt and version-mismatched records are deleted and read as absent.
    /// Expired records are deleted and read as absent unless `allow_stale`.
    /// Storage failures read as absent.
    pub fn read(&self, key: &str, now_ms: u64, allow_stale: bool) -> Option<CacheEntry> {
        match self.load(key, now_ms) {
            Stored::Live(entry) => Some(entry),
            Stored::Expired(entry) if allow_stale => Some(entry),
            Stored::Expired(_) | Stored::Discard => {
                self.remove(key);
                None
            }
            Stored::Absent | Stored::Unreadable => None,
        }
    }

    // == Write ==
    /// Persists an entry, overwriting any record under the same key.
    pub fn write(&self, entry: &CacheEntry) -> StorageResult<()> {
        let json = serde_json::to_string(&entry.to_record())?;
        self.storage.set_item(&self.storage_key(&entry.key), &json)
    }

    // == Remove ==
    /// Removes a key. Failures are logged.
    pub fn remove(&self, key: &str) {
        if let Err(e) = self.storage.remove_item(&self.storage_key(key)) {
            warn!("Durable cache remove failed for {}: {}", key, e);
        }
    }

    /// Removes every key containing `pattern`. Returns the number removed.
    pub fn remove_matching(&self, pattern: &str) -> usize {
        match self.logical_keys() {
            Ok(keys) => {
                let matching: Vec<String> =
                    keys.into_iter().filter(|key| key.contains(pattern)).collect();
                self.remove_batch(&matching)
            }
            Err(e) => {
                warn!("Durable cache pattern invalidation failed: {}", e);
                0
            }
        }
    }

    /// Removes logical keys in one storage pass. Returns the number removed,
    /// or 0 if the pass failed.
    fn remove_batch(&self, keys: &[String]) -> usize {
        if keys.is_empty() {
            return 0;
        }
        let storage_keys: Vec<String> = keys.iter().map(|key| self.storage_key(key)).collect();
        match self.storage.remove_items(&storage_keys) {
            Ok(()) => keys.len(),
            Err(e) => {
                warn!("Durable cache batch remove failed: {}", e);
                0
            }
        }
    }

    /// Removes every record in this namespace.
    pub fn clear(&self) -> usize {
        self.remove_matching("")
    }

    // == Sweep ==
    /// Removes expired, version-mismatched and corrupt records.
    ///
    /// Returns the number of records removed.
    pub fn sweep(&self, now_ms: u64) -> usize {
        let keys = match self.logical_keys() {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Durable cache sweep skipped: {}", e);
                return 0;
            }
        };

        let stale: Vec<String> = keys
            .into_iter()
            .filter(|key| {
                matches!(
                    self.load(key, now_ms),
                    Stored::Expired(_) | Stored::Discard
                )
            })
            .collect();
        self.remove_batch(&stale)
    }

    /// Number of records in this namespace. Storage failures count as empty.
    pub fn len(&self) -> usize {
        self.logical_keys().map(|keys| keys.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

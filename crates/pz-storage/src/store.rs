//! Zone stores.
//!
//! [`ZoneStore`] is the seam between the registry and durable storage.
//! [`FsZoneStore`] writes one JSON file per zone plus a manifest using the
//! write-rename pattern, so a crash mid-write never leaves a torn file.
//! [`MemoryZoneStore`] keeps the same encoded bytes in memory.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::error::{StorageError, StorageResult};
use crate::keys::{manifest_path, record_key, record_path};
use crate::record::{Manifest, ZoneRecord};

/// Durable storage for zone records and the manifest.
pub trait ZoneStore: Send + Sync {
    /// Read the manifest, `None` if none has been written yet.
    fn load_manifest(&self) -> StorageResult<Option<Manifest>>;

    fn save_manifest(&self, manifest: &Manifest) -> StorageResult<()>;

    /// Read the record stored under `key`.
    ///
    /// Returns [`StorageError::MissingRecord`] if there is none.
    fn load_record(&self, key: &str) -> StorageResult<ZoneRecord>;

    fn save_record(&self, record: &ZoneRecord) -> StorageResult<()>;

    /// Delete the record stored under `key`. Returns whether one existed.
    fn delete_record(&self, key: &str) -> StorageResult<bool>;
}

impl<T: ZoneStore + ?Sized> ZoneStore for Arc<T> {
    fn load_manifest(&self) -> StorageResult<Option<Manifest>> {
        (**self).load_manifest()
    }

    fn save_manifest(&self, manifest: &Manifest) -> StorageResult<()> {
        (**self).save_manifest(manifest)
    }

    fn load_record(&self, key: &str) -> StorageResult<ZoneRecord> {
        (**self).load_record(key)
    }

    fn save_record(&self, record: &ZoneRecord) -> StorageResult<()> {
        (**self).save_record(record)
    }

    fn delete_record(&self, key: &str) -> StorageResult<bool> {
        (**self).delete_record(key)
    }
}

/// Atomically replace `path` with `data`.
///
/// 1. Write to `{path}.tmp`
/// 2. `sync_all()` to flush to disk
/// 3. `rename` over the final path
///
/// On failure the temporary file is removed.
fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let written = File::create(&tmp)
        .and_then(|mut file| {
            file.write_all(data)?;
            file.sync_all()
        })
        .map_err(|e| StorageError::io(&tmp, e))
        .and_then(|()| fs::rename(&tmp, path).map_err(|e| StorageError::io(path, e)));

    if written.is_err() {
        // Best effort; the write error is what gets reported.
        let _ = fs::remove_file(&tmp);
    }
    written
}

/// Filesystem store rooted at a data directory.
#[derive(Debug, Clone)]
pub struct FsZoneStore {
    root: PathBuf,
}

impl FsZoneStore {
    /// Open a store at `root`. Directories are created lazily on first write.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ZoneStore for FsZoneStore {
    fn load_manifest(&self) -> StorageResult<Option<Manifest>> {
        let path = manifest_path(&self.root);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::io(path, e)),
        };

        let manifest = Manifest::decode(&bytes)?;
        tracing::trace!("Loaded manifest with {} zones", manifest.zones.len());
        Ok(Some(manifest))
    }

    fn save_manifest(&self, manifest: &Manifest) -> StorageResult<()> {
        atomic_write(&manifest_path(&self.root), &manifest.encode()?)?;
        tracing::trace!("Persisted manifest with {} zones", manifest.zones.len());
        Ok(())
    }

    fn load_record(&self, key: &str) -> StorageResult<ZoneRecord> {
        let key = record_key(key)?;
        let path = record_path(&self.root, &key);

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::MissingRecord(key));
            }
            Err(e) => return Err(StorageError::io(path, e)),
        };

        let record = ZoneRecord::decode(&key, &bytes)?;
        tracing::trace!("Loaded record {key}");
        Ok(record)
    }

    fn save_record(&self, record: &ZoneRecord) -> StorageResult<()> {
        let key = record_key(&record.name)?;
        atomic_write(&record_path(&self.root, &key), &record.encode()?)?;
        tracing::trace!("Persisted record {key}");
        Ok(())
    }

    fn delete_record(&self, key: &str) -> StorageResult<bool> {
        let key = record_key(key)?;
        let path = record_path(&self.root, &key);

        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::trace!("Deleted record {key}");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }
}

#[derive(Default)]
struct MemoryInner {
    manifest: Option<Vec<u8>>,
    records: BTreeMap<String, Vec<u8>>,
}

/// In-memory store holding the same encoded documents as [`FsZoneStore`].
///
/// Writes can be switched off to exercise persistence failure handling.
#[derive(Default)]
pub struct MemoryZoneStore {
    inner: Mutex<MemoryInner>,
    fail_writes: AtomicBool,
}

impl MemoryZoneStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every write fails with [`StorageError::ReadOnly`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Keys of every stored record, sorted.
    #[must_use]
    pub fn record_keys(&self) -> Vec<String> {
        self.inner.lock().records.keys().cloned().collect()
    }

    /// Store raw bytes under `key`, bypassing encoding.
    pub fn insert_raw(&self, key: &str, bytes: Vec<u8>) {
        self.inner.lock().records.insert(key.to_owned(), bytes);
    }

    fn check_writable(&self) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::ReadOnly);
        }
        Ok(())
    }
}

impl ZoneStore for MemoryZoneStore {
    fn load_manifest(&self) -> StorageResult<Option<Manifest>> {
        let inner = self.inner.lock();
        inner.manifest.as_deref().map(Manifest::decode).transpose()
    }

    fn save_manifest(&self, manifest: &Manifest) -> StorageResult<()> {
        self.check_writable()?;
        let bytes = manifest.encode()?;
        self.inner.lock().manifest = Some(bytes);
        Ok(())
    }

    fn load_record(&self, key: &str) -> StorageResult<ZoneRecord> {
        let key = record_key(key)?;
        let inner = self.inner.lock();
        let bytes = inner
            .records
            .get(&key)
            .ok_or_else(|| StorageError::MissingRecord(key.clone()))?;
        ZoneRecord::decode(&key, bytes)
    }

    fn save_record(&self, record: &ZoneRecord) -> StorageResult<()> {
        self.check_writable()?;
        let key = record_key(&record.name)?;
        let bytes = record.encode()?;
        self.inner.lock().records.insert(key, bytes);
        Ok(())
    }

    fn delete_record(&self, key: &str) -> StorageResult<bool> {
        self.check_writable()?;
        let key = record_key(key)?;
        Ok(self.inner.lock().records.remove(&key).is_some())
    }
}

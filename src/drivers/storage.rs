// PulseWatch - Key/Value Blob Store
//
// The time store persists through this trait so it can run against the
// ESP-IDF NVS partition on the device, a JSON file on the host, or an
// in-memory map in tests.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The backing medium must be erased before it can be used again.
    #[error("store corrupted: {0}")]
    Corrupted(String),

    #[error("write failed: {0}")]
    Write(String),

    #[error("erase failed: {0}")]
    Erase(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub trait KvStore: Send {
    /// `Ok(None)` when the key has never been written.
    fn get_blob(&mut self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    fn set_blob(&mut self, namespace: &str, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Make previous writes durable.
    fn commit(&mut self) -> Result<(), StoreError>;

    /// Wipe everything and leave the store usable and empty.
    fn erase_and_reinit(&mut self) -> Result<(), StoreError>;
}

type Namespaces = BTreeMap<String, BTreeMap<String, Vec<u8>>>;

// ---------------------------------------------------------------------------
// In-memory store (shared between clones, with fault injection)
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryInner {
    committed: Namespaces,
    pending: Namespaces,
    corrupted: bool,
    fail_writes: bool,
    unavailable: bool,
}

/// Every clone sees the same contents, so dropping a `TimeStore` and building
/// a new one from a clone behaves like a reboot. Uncommitted writes are only
/// visible through the handle family until `commit`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make every read fail with `Corrupted` until erased.
    pub fn corrupt(&self) {
        self.lock().corrupted = true;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Committed contents of `namespace/key`, bypassing fault injection.
    pub fn committed(&self, namespace: &str, key: &str) -> Option<Vec<u8>> {
        self.lock()
            .committed
            .get(namespace)
            .and_then(|ns| ns.get(key))
            .cloned()
    }
}

impl KvStore for MemoryStore {
    fn get_blob(&mut self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let inner = self.lock();
        if inner.unavailable {
            return Err(StoreError::Unavailable("memory store offline".into()));
        }
        if inner.corrupted {
            return Err(StoreError::Corrupted("no free pages".into()));
        }
        let lookup = |map: &Namespaces| map.get(namespace).and_then(|ns| ns.get(key)).cloned();
        Ok(lookup(&inner.pending).or_else(|| lookup(&inner.committed)))
    }

    fn set_blob(&mut self, namespace: &str, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.unavailable {
            return Err(StoreError::Unavailable("memory store offline".into()));
        }
        if inner.fail_writes {
            return Err(StoreError::Write(format!("{namespace}/{key}")));
        }
        inner
            .pending
            .entry(namespace.to_owned())
            .or_default()
            .insert(key.to_owned(), value.to_vec());
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.fail_writes {
            inner.pending.clear();
            return Err(StoreError::Write("commit".into()));
        }
        let pending = std::mem::take(&mut inner.pending);
        for (ns, entries) in pending {
            inner.committed.entry(ns).or_default().extend(entries);
        }
        Ok(())
    }

    fn erase_and_reinit(&mut self) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.unavailable {
            return Err(StoreError::Erase("memory store offline".into()));
        }
        inner.committed.clear();
        inner.pending.clear();
        inner.corrupted = false;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// File-backed store (host builds)
// ---------------------------------------------------------------------------

/// Whole store kept as one JSON document; `commit` rewrites it via a
/// temporary file and rename.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    data: Namespaces,
    corrupted: bool,
}

impl FileStore {
    /// A missing file is an empty store. An unparsable file opens fine but
    /// reports `Corrupted` on read until erased.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let (data, corrupted) = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<Namespaces>(&bytes) {
                Ok(data) => (data, false),
                Err(e) => {
                    log::warn!("Store file {} unreadable: {}", path.display(), e);
                    (Namespaces::new(), true)
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => (Namespaces::new(), false),
            Err(e) => return Err(StoreError::Io(e)),
        };
        Ok(Self { path, data, corrupted })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_file(&self) -> Result<(), StoreError> {
        let payload =
            serde_json::to_vec_pretty(&self.data).map_err(|e| StoreError::Write(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, payload)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KvStore for FileStore {
    fn get_blob(&mut self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        if self.corrupted {
            return Err(StoreError::Corrupted(self.path.display().to_string()));
        }
        Ok(self.data.get(namespace).and_then(|ns| ns.get(key)).cloned())
    }

    fn set_blob(&mut self, namespace: &str, key: &str, value: &[u8]) -> Result<(), StoreError> {
        if self.corrupted {
            return Err(StoreError::Write("store must be erased first".into()));
        }
        self.data
            .entry(namespace.to_owned())
            .or_default()
            .insert(key.to_owned(), value.to_vec());
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.write_file()
    }

    fn erase_and_reinit(&mut self) -> Result<(), StoreError> {
        self.data.clear();
        self.corrupted = false;
        self.write_file()
            .map_err(|e| StoreError::Erase(e.to_string()))
    }
}

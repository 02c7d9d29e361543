//! Lock-scoped mutation of a JSONL store file.
//!
//! [`mutate_store_jsonl`] holds `<store>.lock` for the whole
//! load → mutate → save cycle. The file is rewritten only when the
//! mutation succeeded and actually changed a record; the returned
//! [`StoreChanges`] lists which records were written or removed.

use crate::jsonl::RecordKey;
use crate::memory::{MemoryStore, MemoryStoreError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub fn store_lock_path(store_path: &Path) -> PathBuf {
    let mut name = store_path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    store_path.with_file_name(name)
}

#[derive(Debug, thiserror::Error)]
pub enum AtomicStoreMutationError<E> {
    #[error("store lock {} is held by another process", .lock_path.display())]
    LockBusy { lock_path: PathBuf },

    #[error("cannot take store lock {}: {source}", .lock_path.display())]
    LockIo {
        lock_path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Store(MemoryStoreError),

    #[error("{0}")]
    Mutation(E),
}

/// Records a committed mutation touched, in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreChanges {
    pub written: Vec<RecordKey>,
    pub removed: Vec<RecordKey>,
}

impl StoreChanges {
    pub fn between(before: &MemoryStore, after: &MemoryStore) -> Self {
        let old = before.keyed_records();
        let new = after.keyed_records();
        Self {
            written: new
                .iter()
                .filter(|(key, record)| old.get(key) != Some(*record))
                .map(|(key, _)| *key)
                .collect(),
            removed: old.keys().filter(|key| !new.contains_key(key)).copied().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.written.is_empty() && self.removed.is_empty()
    }
}

/// Result of a successful [`mutate_store_jsonl`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed<T> {
    pub value: T,
    pub changes: StoreChanges,
}

/// Run `mutation` against the store at `path` under its lock file.
///
/// A failing mutation leaves the file untouched.
pub fn mutate_store_jsonl<T, E, F>(
    path: impl AsRef<Path>,
    mutation: F,
) -> Result<Committed<T>, AtomicStoreMutationError<E>>
where
    F: FnOnce(&mut MemoryStore) -> Result<T, E>,
{
    let path = path.as_ref();
    let _lock = StoreLock::acquire(path)?;

    let before = MemoryStore::load_jsonl(path).map_err(AtomicStoreMutationError::Store)?;
    let mut store = before.clone();
    let value = mutation(&mut store).map_err(AtomicStoreMutationError::Mutation)?;

    let changes = StoreChanges::between(&before, &store);
    if changes.is_empty() {
        debug!(path = %path.display(), "store unchanged");
    } else {
        store
            .save_jsonl(path)
            .map_err(AtomicStoreMutationError::Store)?;
        info!(
            path = %path.display(),
            written = ?changes.written,
            removed = ?changes.removed,
            "store file updated"
        );
    }
    Ok(Committed { value, changes })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LockOwner {
    pid: u32,
    acquired_at: DateTime<Utc>,
}

/// Exclusive lock file, removed on drop.
struct StoreLock {
    path: PathBuf,
}

impl StoreLock {
    fn acquire<E>(store_path: &Path) -> Result<Self, AtomicStoreMutationError<E>> {
        let path = store_lock_path(store_path);
        let io_error = |source| AtomicStoreMutationError::LockIo {
            lock_path: path.clone(),
            source,
        };
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir).map_err(io_error)?;
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                warn!(lock = %path.display(), "store lock busy");
                return Err(AtomicStoreMutationError::LockBusy { lock_path: path.clone() });
            }
            Err(err) => return Err(io_error(err)),
        };

        let owner = LockOwner {
            pid: std::process::id(),
            acquired_at: Utc::now(),
        };
        if let Ok(line) = serde_json::to_string(&owner) {
            let _ = writeln!(file, "{line}");
        }
        Ok(Self { path })
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

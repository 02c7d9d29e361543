use codemap_store::{AtomicStoreMutationError, MemoryStore, mutate_store_jsonl};
use serde::Serialize;
use std::fmt::Display;
use std::path::Path;

pub fn fail(message: impl Display) -> ! {
    eprintln!("error: {message}");
    std::process::exit(1);
}

pub fn print_json<T: Serialize + ?Sized>(payload: &T) {
    match serde_json::to_string_pretty(payload) {
        Ok(text) => println!("{text}"),
        Err(err) => fail(format!("json serialization failed: {err}")),
    }
}

pub fn load_store_or_exit(path: &Path) -> MemoryStore {
    MemoryStore::load_jsonl(path).unwrap_or_else(|e| {
        fail(format!("failed to load {}: {e}", path.display()));
    })
}

/// Run `mutation` under the store lock and persist what it changed.
///
/// Lock and load failures exit; the mutation's own error is handed back so
/// the caller can render it.
pub fn mutate_store<T, E, F>(path: &Path, mutation: F) -> Result<T, E>
where
    F: FnOnce(&mut MemoryStore) -> Result<T, E>,
{
    match mutate_store_jsonl(path, mutation) {
        Ok(committed) => {
            tracing::debug!(
                written = committed.changes.written.len(),
                removed = committed.changes.removed.len(),
                "store mutation committed"
            );
            Ok(committed.value)
        }
        Err(AtomicStoreMutationError::Mutation(err)) => Err(err),
        Err(AtomicStoreMutationError::LockBusy { lock_path }) => {
            fail(format!("store lock busy: {}", lock_path.display()))
        }
        Err(AtomicStoreMutationError::LockIo { lock_path, source }) => fail(format!(
            "failed to acquire store lock {}: {source}",
            lock_path.display()
        )),
        Err(AtomicStoreMutationError::Store(err)) => {
            fail(format!("failed to update {}: {err}", path.display()))
        }
    }
}

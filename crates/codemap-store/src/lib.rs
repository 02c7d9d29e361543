//! # codemap-store
//!
//! Storage layer for mapping state.
//!
//! This crate provides:
//! - `MapRow`, `MapRowTarget`, `Task`, `Project` and `MapInfo` (the records)
//! - the `RowStore` and `ProjectDirectory` collaborator traits the workflow
//!   engine is written against
//! - `MemoryStore`, a deterministic in-memory implementation of both
//! - JSONL read/write and a lock-scoped mutation helper that reports which
//!   records it persisted
//!
//! It intentionally does not validate workflow rules. Those live in
//! `codemap-workflow`; the store only answers queries and applies bulk
//! updates.
//!
//! ## Data model
//!
//! ```text
//! JSONL (on disk, one tagged record per line)
//!     ↕  load / save
//! MemoryStore (BTreeMap-backed projection, transactional clone-and-swap)
//! ```

pub mod atomic_store;
pub mod jsonl;
pub mod memory;
pub mod project;
pub mod row;
pub mod store;
pub mod task;

pub use atomic_store::{
    AtomicStoreMutationError, Committed, StoreChanges, mutate_store_jsonl, store_lock_path,
};
pub use jsonl::{JsonlError, RecordKey, StoreRecord};
pub use memory::{MemoryStore, MemoryStoreError};
pub use project::{MapId, MapInfo, Project, ProjectId, ProjectRole, ProjectRoles};
pub use row::{MapRow, MapRowTarget, Note, Relationship, RowId, SourceCode, SourceCodeId};
pub use store::{ProjectDirectory, RowStore, StoreError};
pub use task::{Task, TaskId, TaskRef, TaskType};

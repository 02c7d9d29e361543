//! # codemap-workflow
//!
//! The mapping workflow engine. Every operation takes the store, an explicit
//! [`Actor`] and a request, validates it completely and only then mutates the
//! store.
//!
//! ```text
//! assign_task ─→ RowSpecCodec ─→ conflict scan ─→ clear + bulk bind ─→ orphan sweep
//! save_row ───→ role ─→ check_transition ─→ author/reviewer rules ─→ put_row ─→ reconcile
//! add/update/delete_target ─→ role + status family ─→ put_row
//! reconcile_row ─→ sibling ─→ merge | escalate | resolve
//! ```
//!
//! Callers wanting all-or-nothing behaviour run an operation inside the
//! store's transaction (`MemoryStore::transact` or `mutate_store_jsonl`).

pub mod actor;
pub mod assignment;
pub mod error;
pub mod reconcile;
pub mod row;
pub mod target;

pub use actor::Actor;
pub use assignment::{
    AssignTaskRequest, TaskBindingResult, assign_task, compute_row_specification, delete_task,
};
pub use error::{AssignmentError, MappingProblem, UnassignableRows, WorkflowError};
pub use reconcile::{ReconcileOutcome, reconcile_row, targets_equivalent};
pub use row::{SaveRowOutcome, save_row};
pub use target::{TargetDraft, add_target, delete_target, update_target};

//! Error types for workflow operations.

use codemap_kernel::{MapStatus, RowSpecError, RowSpecification, TransitionError};
use codemap_store::{ProjectId, RowId, StoreError, TaskId, TaskType};
use serde::Serialize;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Errors raised by task assignment and task maintenance.
#[derive(Debug, thiserror::Error)]
pub enum AssignmentError {
    #[error(transparent)]
    RowSpec(#[from] RowSpecError),

    #[error("{login} has no role in project {project_id}")]
    NoProjectRole { login: String, project_id: ProjectId },

    #[error("unauthorized assignment: {0}")]
    UnauthorizedAssignment(String),

    #[error("task {task_id} is a {existing} task and cannot become {requested}")]
    TaskTypeChanged {
        task_id: TaskId,
        existing: TaskType,
        requested: TaskType,
    },

    #[error(transparent)]
    UnassignableRows(Box<UnassignableRows>),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<UnassignableRows> for AssignmentError {
    fn from(value: UnassignableRows) -> Self {
        Self::UnassignableRows(Box::new(value))
    }
}

/// Rows that could not be bound, with narrowed specifications to retry with.
///
/// Each `without_*` field is `None` when nothing would remain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnassignableRows {
    pub task_type: TaskType,
    pub assignee: String,
    pub original: RowSpecification,
    pub indexes_with_role_conflict: Option<RowSpecification>,
    pub indexes_with_existing_task: Option<RowSpecification>,
    pub without_role_conflicts: Option<RowSpecification>,
    pub without_existing_tasks: Option<RowSpecification>,
    pub without_any_conflicts: Option<RowSpecification>,
}

impl Display for UnassignableRows {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cannot assign rows {} to {} as {}",
            self.original.text, self.assignee, self.task_type
        )?;
        if let Some(role) = &self.indexes_with_role_conflict {
            write!(f, "; role conflict on {}", role.text)?;
        }
        if let Some(existing) = &self.indexes_with_existing_task {
            write!(f, "; already assigned {}", existing.text)?;
        }
        Ok(())
    }
}

impl std::error::Error for UnassignableRows {}

/// A row edit that leaves the mapping in an inconsistent shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
pub enum MappingProblem {
    #[error("no-map cannot change while the row is REJECTED; move it to DRAFT first")]
    NoMapChangeWhileRejected,

    #[error("status {0} needs at least one target or no-map")]
    StatusWithoutTarget(MapStatus),

    #[error("a row with targets or no-map cannot be UNMAPPED")]
    UnmappedWithContent,

    #[error("targets cannot be added while no-map is set")]
    TargetWhileNoMap,
}

/// Errors raised by row, target and reconciliation operations.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("{actor} may not change row {row_id}: {reason}")]
    UnauthorizedMapping {
        row_id: RowId,
        actor: String,
        reason: String,
    },

    #[error("invalid mapping on row {row_id}: {problem}")]
    InvalidMapping {
        row_id: RowId,
        problem: MappingProblem,
    },

    #[error("target {target_id} not found on row {row_id}")]
    TargetNotFound { row_id: RowId, target_id: Uuid },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WorkflowError {
    pub(crate) fn unauthorized(row_id: RowId, actor: &str, reason: impl Into<String>) -> Self {
        Self::UnauthorizedMapping {
            row_id,
            actor: actor.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(row_id: RowId, problem: MappingProblem) -> Self {
        Self::InvalidMapping { row_id, problem }
    }
}

//! Collaborator traits the workflow engine is written against.
//!
//! `RowStore` owns rows and tasks; `ProjectDirectory` answers membership
//! and code-set questions. Both are synchronous and every mutating call
//! carries the acting user and timestamp explicitly.

use crate::project::{MapId, MapInfo, Project, ProjectId, ProjectRoles};
use crate::row::{MapRow, RowId, SourceCodeId};
use crate::task::{Task, TaskId, TaskRef};
use chrono::{DateTime, Utc};
use codemap_kernel::{RangeSet, RowIndex};
use std::collections::BTreeSet;

/// Lookup failures from a store implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("row not found: {0}")]
    RowNotFound(RowId),

    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("map not found: {0}")]
    MapNotFound(MapId),

    #[error("project not found: {0}")]
    ProjectNotFound(ProjectId),

    #[error("{kind} {id} references missing {missing}")]
    DanglingReference {
        kind: &'static str,
        id: u64,
        missing: String,
    },
}

pub trait RowStore {
    fn row(&self, id: RowId) -> Result<MapRow, StoreError>;

    /// Insert or replace by id.
    fn put_row(&mut self, row: MapRow) -> Result<(), StoreError>;

    fn delete_row(&mut self, id: RowId) -> Result<MapRow, StoreError>;

    /// Rows of `map_id` whose source index is in `rows`, ordered by index then id.
    fn rows_in(&self, map_id: MapId, rows: &RangeSet) -> Result<Vec<MapRow>, StoreError>;

    /// The other row of a dual-mapped source code, if any.
    fn find_sibling(
        &self,
        map_id: MapId,
        source_code: SourceCodeId,
        exclude_row: RowId,
    ) -> Result<Option<MapRow>, StoreError>;

    fn task(&self, id: TaskId) -> Result<Task, StoreError>;

    fn tasks_in(&self, map_id: MapId) -> Result<Vec<Task>, StoreError>;

    fn allocate_task_id(&mut self) -> TaskId;

    fn put_task(&mut self, task: Task) -> Result<(), StoreError>;

    fn delete_task(&mut self, id: TaskId) -> Result<Task, StoreError>;

    /// Rows currently bound to `task` in its slot.
    fn rows_for_task(&self, task: &TaskRef) -> Result<Vec<MapRow>, StoreError>;

    fn bound_indices(&self, task: &TaskRef) -> Result<BTreeSet<RowIndex>, StoreError> {
        Ok(self
            .rows_for_task(task)?
            .iter()
            .map(MapRow::index)
            .collect())
    }

    /// Bind one row per index in `lower..=upper`. Returns the number bound.
    fn bind_range(
        &mut self,
        task: &TaskRef,
        lower: RowIndex,
        upper: RowIndex,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<usize, StoreError>;

    /// Bind one row per listed index. Returns the number bound.
    fn bind_indices(
        &mut self,
        task: &TaskRef,
        indices: &BTreeSet<RowIndex>,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<usize, StoreError>;

    /// Unbind every row from `task`. Returns the number unbound.
    fn clear_task_binding(
        &mut self,
        task: &TaskRef,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<usize, StoreError>;

    /// Remove every task that owns zero rows. Returns the removed ids.
    fn delete_orphan_tasks(&mut self) -> Result<Vec<TaskId>, StoreError>;
}

pub trait ProjectDirectory {
    fn project(&self, id: ProjectId) -> Result<Project, StoreError>;

    fn map_info(&self, id: MapId) -> Result<MapInfo, StoreError>;

    fn roles_for(&self, project: ProjectId) -> Result<ProjectRoles, StoreError> {
        Ok(self.project(project)?.roles())
    }

    /// Assignees of any task in any map of `project`.
    fn users_assigned_to_tasks(&self, project: ProjectId) -> Result<BTreeSet<String>, StoreError>;

    fn code_set_size(&self, map: MapId) -> Result<u64, StoreError> {
        Ok(self.map_info(map)?.code_set_size)
    }
}

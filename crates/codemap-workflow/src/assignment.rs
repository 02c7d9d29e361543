//! Conflict-aware assignment of rows to tasks.
//!
//! An assignment request names a task (new or existing), an assignee and a
//! row specification. The request is authorized against the project's
//! membership, the specification is normalized against the code-set size,
//! and, in projects with more than one user, every requested index is
//! checked for:
//!
//! - **role conflicts**: the assignee already holds the opposite role on
//!   the row (an author may not review their own mapping and vice versa);
//! - **existing-task conflicts**: every row at the index is already bound
//!   to another task of the same type.
//!
//! Any conflict rejects the whole request with [`UnassignableRows`], which
//! carries the conflicting index sets and three narrowed specifications the
//! caller can retry with. Otherwise the task's old bindings are cleared, the
//! requested set is bound in bulk (one bind per multi-index range plus one
//! id-set bind for the isolated indices) and tasks left without rows are
//! deleted.

use crate::actor::Actor;
use crate::error::{AssignmentError, UnassignableRows};
use codemap_kernel::{RangeSet, RowIndex, RowSpecCodec, RowSpecification};
use codemap_store::{
    MapId, MapInfo, MapRow, ProjectDirectory, ProjectRole, ProjectRoles, RowStore, Task, TaskId,
    TaskType,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignTaskRequest {
    /// Existing task to rebind; `None` creates a task.
    #[serde(default)]
    pub task_id: Option<TaskId>,
    pub map_id: MapId,
    pub task_type: TaskType,
    pub assignee: String,
    /// Row specification text, e.g. `1-20,31` or `*`.
    pub rows: String,
    #[serde(default)]
    pub allow_assignee_to_be_author_and_reviewer: bool,
    #[serde(default)]
    pub reassign_already_assigned_rows: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskBindingResult {
    pub task: Task,
    pub specification: RowSpecification,
    pub bound_rows: usize,
    /// Tasks removed by the orphan sweep, possibly including this one.
    pub deleted_tasks: Vec<TaskId>,
}

#[derive(Debug, Default)]
struct Conflicts {
    role: BTreeSet<RowIndex>,
    existing: BTreeSet<RowIndex>,
}

impl Conflicts {
    fn is_empty(&self) -> bool {
        self.role.is_empty() && self.existing.is_empty()
    }
}

pub fn assign_task<S>(
    store: &mut S,
    actor: &Actor,
    request: &AssignTaskRequest,
) -> Result<TaskBindingResult, AssignmentError>
where
    S: RowStore + ProjectDirectory,
{
    let map = store.map_info(request.map_id)?;
    let roles = store.roles_for(map.project_id)?;
    let actor_role = authorize(&roles, actor, request, map.project_id)?;

    let existing = match request.task_id {
        Some(task_id) => Some(existing_task(store, actor, actor_role, request, task_id)?),
        None => None,
    };

    let codec = RowSpecCodec::new(map.code_set_size);
    let requested = codec.normalize_set(&request.rows)?;

    let mut users = roles.users();
    users.extend(store.users_assigned_to_tasks(map.project_id)?);
    if users.len() > 1 {
        let conflicts = find_conflicts(
            store,
            &map,
            existing.as_ref().map(|task| task.id),
            request,
            actor_role == ProjectRole::Owner,
            &requested,
        )?;
        debug!(
            map_id = map.id,
            role_conflicts = conflicts.role.len(),
            existing_conflicts = conflicts.existing.len(),
            "assignment conflict scan"
        );
        if !conflicts.is_empty() {
            let rejection = unassignable(&codec, request, &requested, &conflicts)?;
            warn!(
                map_id = map.id,
                actor = %actor.login,
                assignee = %request.assignee,
                "{rejection}"
            );
            return Err(rejection.into());
        }
    }

    let now = actor.now;
    let task = match existing {
        Some(mut task) => {
            task.assignee = request.assignee.clone();
            task.source_row_specification = requested.to_string();
            task.updated_at = now;
            task
        }
        None => Task {
            id: store.allocate_task_id(),
            map_id: map.id,
            task_type: request.task_type,
            assignee: request.assignee.clone(),
            source_row_specification: requested.to_string(),
            created_at: now,
            updated_at: now,
        },
    };
    store.put_task(task.clone())?;

    let task_ref = task.task_ref();
    let cleared = store.clear_task_binding(&task_ref, &actor.login, now)?;
    let partition = requested.partition_for_binding(codec.limit());
    debug!(
        task_id = task.id,
        cleared,
        ranges = partition.ranges.len(),
        singles = partition.singles.len(),
        "binding partition"
    );

    let mut bound_rows = 0;
    for (lower, upper) in &partition.ranges {
        bound_rows += store.bind_range(&task_ref, *lower, *upper, &actor.login, now)?;
    }
    if !partition.singles.is_empty() {
        bound_rows += store.bind_indices(&task_ref, &partition.singles, &actor.login, now)?;
    }

    let deleted_tasks = store.delete_orphan_tasks()?;
    info!(
        task_id = task.id,
        map_id = map.id,
        task_type = %task.task_type,
        assignee = %task.assignee,
        bound_rows,
        deleted = deleted_tasks.len(),
        "task bound"
    );

    Ok(TaskBindingResult {
        task,
        specification: codec.specification(&requested),
        bound_rows,
        deleted_tasks,
    })
}

/// Canonical specification of the rows currently bound to `task_id`.
pub fn compute_row_specification<S>(
    store: &S,
    task_id: TaskId,
) -> Result<RowSpecification, AssignmentError>
where
    S: RowStore + ProjectDirectory,
{
    let task = store.task(task_id)?;
    let indices = store.bound_indices(&task.task_ref())?;
    if indices.is_empty() {
        return Ok(RowSpecification {
            text: String::new(),
            count: 0,
        });
    }
    let codec = RowSpecCodec::new(store.code_set_size(task.map_id)?);
    Ok(codec.from_indices(&indices)?)
}

/// Unbind and remove a task. Only project owners and the assignee may.
pub fn delete_task<S>(store: &mut S, actor: &Actor, task_id: TaskId) -> Result<Task, AssignmentError>
where
    S: RowStore + ProjectDirectory,
{
    let task = store.task(task_id)?;
    let map = store.map_info(task.map_id)?;
    let roles = store.roles_for(map.project_id)?;
    if roles.role_of(&actor.login) != Some(ProjectRole::Owner) && !actor.is(&task.assignee) {
        return Err(AssignmentError::UnauthorizedAssignment(format!(
            "{} may not delete task {task_id}",
            actor.login
        )));
    }

    let removed = store.delete_task(task_id)?;
    info!(task_id, actor = %actor.login, "task deleted");
    Ok(removed)
}

fn authorize(
    roles: &ProjectRoles,
    actor: &Actor,
    request: &AssignTaskRequest,
    project_id: u64,
) -> Result<ProjectRole, AssignmentError> {
    match roles.role_of(&request.assignee) {
        None => {
            return Err(AssignmentError::NoProjectRole {
                login: request.assignee.clone(),
                project_id,
            });
        }
        Some(ProjectRole::Guest) => {
            return Err(AssignmentError::UnauthorizedAssignment(format!(
                "guest {} cannot own tasks",
                request.assignee
            )));
        }
        Some(_) => {}
    }

    match roles.role_of(&actor.login) {
        Some(ProjectRole::Owner) => Ok(ProjectRole::Owner),
        Some(ProjectRole::Member) => {
            if !actor.is(&request.assignee) {
                return Err(AssignmentError::UnauthorizedAssignment(
                    "members may only assign tasks to themselves".to_string(),
                ));
            }
            if request.allow_assignee_to_be_author_and_reviewer
                || request.reassign_already_assigned_rows
            {
                return Err(AssignmentError::UnauthorizedAssignment(
                    "only owners may override assignment conflicts".to_string(),
                ));
            }
            Ok(ProjectRole::Member)
        }
        _ => Err(AssignmentError::UnauthorizedAssignment(format!(
            "{} is not an owner or member of project {project_id}",
            actor.login
        ))),
    }
}

fn existing_task<S: RowStore>(
    store: &S,
    actor: &Actor,
    actor_role: ProjectRole,
    request: &AssignTaskRequest,
    task_id: TaskId,
) -> Result<Task, AssignmentError> {
    let task = store.task(task_id)?;
    if task.map_id != request.map_id {
        return Err(AssignmentError::UnauthorizedAssignment(format!(
            "task {task_id} belongs to map {}",
            task.map_id
        )));
    }
    if task.task_type != request.task_type {
        return Err(AssignmentError::TaskTypeChanged {
            task_id,
            existing: task.task_type,
            requested: request.task_type,
        });
    }
    if actor_role != ProjectRole::Owner && !actor.is(&task.assignee) {
        return Err(AssignmentError::UnauthorizedAssignment(format!(
            "task {task_id} is assigned to {}",
            task.assignee
        )));
    }
    Ok(task)
}

fn find_conflicts<S: RowStore>(
    store: &S,
    map: &MapInfo,
    task_id: Option<TaskId>,
    request: &AssignTaskRequest,
    actor_is_owner: bool,
    requested: &RangeSet,
) -> Result<Conflicts, AssignmentError> {
    let check_roles = !(actor_is_owner && request.allow_assignee_to_be_author_and_reviewer);
    let check_existing = !(actor_is_owner && request.reassign_already_assigned_rows);
    let mut conflicts = Conflicts::default();
    if !check_roles && !check_existing {
        return Ok(conflicts);
    }

    let mut by_index: BTreeMap<RowIndex, Vec<MapRow>> = BTreeMap::new();
    for row in store.rows_in(map.id, requested)? {
        by_index.entry(row.index()).or_default().push(row);
    }

    let mut assignees = AssigneeCache::default();
    let task_type = request.task_type;
    for (index, rows) in by_index {
        if task_id.is_some() && rows.iter().any(|row| row.task_for(task_type) == task_id) {
            continue;
        }
        if check_existing && rows.iter().all(|row| row.task_for(task_type).is_some()) {
            conflicts.existing.insert(index);
        }
        if check_roles && has_role_conflict(store, &mut assignees, &rows, request)? {
            conflicts.role.insert(index);
        }
    }
    Ok(conflicts)
}

fn has_role_conflict<S: RowStore>(
    store: &S,
    assignees: &mut AssigneeCache,
    rows: &[MapRow],
    request: &AssignTaskRequest,
) -> Result<bool, AssignmentError> {
    let candidate = request.assignee.as_str();
    for row in rows {
        let conflicted = match request.task_type {
            TaskType::Author => {
                assignees.is(store, row.review_task, candidate)?
                    || row.last_reviewer.as_deref() == Some(candidate)
                    // Dual-mapped rows need two distinct authors.
                    || (rows.len() > 1 && assignees.is(store, row.author_task, candidate)?)
            }
            TaskType::Review | TaskType::Reconcile => {
                assignees.is(store, row.author_task, candidate)?
                    || row.last_author.as_deref() == Some(candidate)
            }
        };
        if conflicted {
            return Ok(true);
        }
    }
    Ok(false)
}

#[derive(Default)]
struct AssigneeCache {
    by_task: BTreeMap<TaskId, String>,
}

impl AssigneeCache {
    fn is<S: RowStore>(
        &mut self,
        store: &S,
        task_id: Option<TaskId>,
        login: &str,
    ) -> Result<bool, AssignmentError> {
        let Some(task_id) = task_id else {
            return Ok(false);
        };
        if !self.by_task.contains_key(&task_id) {
            let task = store.task(task_id)?;
            self.by_task.insert(task_id, task.assignee);
        }
        Ok(self.by_task.get(&task_id).is_some_and(|assignee| assignee == login))
    }
}

fn unassignable(
    codec: &RowSpecCodec,
    request: &AssignTaskRequest,
    requested: &RangeSet,
    conflicts: &Conflicts,
) -> Result<UnassignableRows, AssignmentError> {
    let text = requested.to_string();
    let indexes = |set: &BTreeSet<RowIndex>| -> Result<Option<RowSpecification>, AssignmentError> {
        if set.is_empty() {
            Ok(None)
        } else {
            Ok(Some(codec.from_indices(set)?))
        }
    };

    Ok(UnassignableRows {
        task_type: request.task_type,
        assignee: request.assignee.clone(),
        original: codec.specification(requested),
        indexes_with_role_conflict: indexes(&conflicts.role)?,
        indexes_with_existing_task: indexes(&conflicts.existing)?,
        without_role_conflicts: codec.subtract(&text, &[&conflicts.role])?,
        without_existing_tasks: codec.subtract(&text, &[&conflicts.existing])?,
        without_any_conflicts: codec.subtract(&text, &[&conflicts.role, &conflicts.existing])?,
    })
}

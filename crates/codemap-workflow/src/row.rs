//! Saving a row: role-checked status and no-map changes.
//!
//! The caller passes the complete proposed row; it is diffed against the
//! stored row. Structural fields (map, source code, task bindings, targets)
//! are not editable here, notes are append-only, and audit fields are
//! maintained by the engine. Targets change through [`crate::target`].

use crate::actor::Actor;
use crate::error::{MappingProblem, WorkflowError};
use crate::reconcile::{ReconcileOutcome, reconcile_row};
use codemap_kernel::{MapStatus, Role, check_transition, is_author_state};
use codemap_store::{MapRow, ProjectDirectory, RowStore, TaskId};
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRowOutcome {
    /// The saved row, or the sibling it was merged into.
    pub row: MapRow,
    /// Present when the save triggered reconciliation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconcile: Option<ReconcileOutcome>,
}

pub fn save_row<S>(
    store: &mut S,
    actor: &Actor,
    proposed: MapRow,
) -> Result<SaveRowOutcome, WorkflowError>
where
    S: RowStore + ProjectDirectory,
{
    let current = store.row(proposed.id)?;
    let result = validate(store, actor, &current, &proposed);
    let role = match result {
        Ok(role) => role,
        Err(err) => {
            warn!(row_id = current.id, actor = %actor.login, error = %err, "row save rejected");
            return Err(err);
        }
    };

    let map = store.map_info(current.map_id)?;
    let project = store.project(map.project_id)?;
    let status_changed = current.status != proposed.status;
    let no_map_set = proposed.no_map && !current.no_map;

    let mut row = proposed;
    row.last_author = current.last_author.clone();
    row.last_reviewer = current.last_reviewer.clone();
    stamp_role(&mut row, role, &actor.login);
    if row.status == MapStatus::Unmapped && (row.has_targets() || row.no_map) {
        row.status = MapStatus::Draft;
    }
    if no_map_set {
        row.targets.clear();
        if project.dual_map_mode
            && let Some(mut sibling) = store.find_sibling(row.map_id, row.source_code.id, row.id)?
            && sibling.has_targets()
        {
            sibling.targets.clear();
            sibling.touch(&actor.login, actor.now);
            store.put_row(sibling)?;
        }
    }
    row.touch(&actor.login, actor.now);
    store.put_row(row.clone())?;
    info!(
        row_id = row.id,
        map_id = row.map_id,
        actor = %actor.login,
        role = %role,
        from = %current.status,
        to = %row.status,
        "row saved"
    );

    let reconcile = if project.dual_map_mode
        && status_changed
        && matches!(row.status, MapStatus::Mapped | MapStatus::Reconcile)
    {
        Some(reconcile_row(store, actor, row.id)?)
    } else {
        None
    };

    let row = match reconcile {
        Some(ReconcileOutcome::Merged { survivor, .. })
        | Some(ReconcileOutcome::Resolved { survivor, .. }) => store.row(survivor)?,
        Some(ReconcileOutcome::Escalated { .. }) => store.row(row.id)?,
        _ => row,
    };
    Ok(SaveRowOutcome { row, reconcile })
}

fn validate<S: RowStore>(
    store: &S,
    actor: &Actor,
    current: &MapRow,
    proposed: &MapRow,
) -> Result<Role, WorkflowError> {
    check_immutable(actor, current, proposed)?;
    let role = role_on_row(store, actor, current)?;
    if current.status != proposed.status {
        check_transition(current.status, proposed.status, role)?;
    }
    match role {
        Role::Author => check_author(current, proposed)?,
        Role::Reviewer => {
            if current.no_map != proposed.no_map {
                return Err(WorkflowError::unauthorized(
                    current.id,
                    &actor.login,
                    "reviewers cannot change no-map",
                ));
            }
        }
        Role::Reconciler => {}
    }
    debug!(row_id = current.id, role = %role, "row change validated");
    Ok(role)
}

fn check_immutable(actor: &Actor, current: &MapRow, proposed: &MapRow) -> Result<(), WorkflowError> {
    let changed = if current.map_id != proposed.map_id {
        Some("map")
    } else if current.source_code != proposed.source_code {
        Some("source code")
    } else if current.author_task != proposed.author_task {
        Some("author task")
    } else if current.review_task != proposed.review_task {
        Some("review task")
    } else if current.reconcile_task != proposed.reconcile_task {
        Some("reconcile task")
    } else if current.targets != proposed.targets {
        Some("targets")
    } else if !proposed.notes.starts_with(&current.notes) {
        Some("existing notes")
    } else {
        None
    };

    match changed {
        Some(field) => Err(WorkflowError::unauthorized(
            current.id,
            &actor.login,
            format!("{field} cannot be changed by a row edit"),
        )),
        None => Ok(()),
    }
}

fn check_author(current: &MapRow, proposed: &MapRow) -> Result<(), WorkflowError> {
    if current.status == MapStatus::Rejected && current.no_map != proposed.no_map {
        return Err(WorkflowError::invalid(
            current.id,
            MappingProblem::NoMapChangeWhileRejected,
        ));
    }
    if proposed.status != MapStatus::Unmapped && !proposed.has_targets() && !proposed.no_map {
        return Err(WorkflowError::invalid(
            current.id,
            MappingProblem::StatusWithoutTarget(proposed.status),
        ));
    }
    if current.status != MapStatus::Unmapped
        && proposed.status == MapStatus::Unmapped
        && (proposed.has_targets() || proposed.no_map)
    {
        return Err(WorkflowError::invalid(
            current.id,
            MappingProblem::UnmappedWithContent,
        ));
    }
    Ok(())
}

/// The capacity in which `actor` may act on `row`.
///
/// RECONCILE rows answer only to their reconciler. Elsewhere the author
/// role wins, so a self-reviewing author is held to author rules.
pub(crate) fn role_on_row<S: RowStore>(
    store: &S,
    actor: &Actor,
    row: &MapRow,
) -> Result<Role, WorkflowError> {
    if row.status == MapStatus::Reconcile {
        if assigned_to(store, row.reconcile_task, actor)? {
            return Ok(Role::Reconciler);
        }
        return Err(WorkflowError::unauthorized(
            row.id,
            &actor.login,
            "row is awaiting reconciliation",
        ));
    }
    if assigned_to(store, row.author_task, actor)? {
        return Ok(Role::Author);
    }
    if assigned_to(store, row.review_task, actor)? {
        return Ok(Role::Reviewer);
    }
    Err(WorkflowError::unauthorized(
        row.id,
        &actor.login,
        "no author, review or reconcile task on this row",
    ))
}

fn assigned_to<S: RowStore>(
    store: &S,
    task_id: Option<TaskId>,
    actor: &Actor,
) -> Result<bool, WorkflowError> {
    match task_id {
        Some(task_id) => Ok(actor.is(&store.task(task_id)?.assignee)),
        None => Ok(false),
    }
}

/// Record who last worked the row in which phase.
pub(crate) fn stamp_role(row: &mut MapRow, role: Role, login: &str) {
    match role {
        Role::Reviewer => row.last_reviewer = Some(login.to_string()),
        _ if is_author_state(row.status) => row.last_author = Some(login.to_string()),
        _ => {}
    }
}

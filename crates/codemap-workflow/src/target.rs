//! Adding, editing and removing a row's targets.
//!
//! Who may touch targets depends on the row's status:
//!
//! - authors while the row is UNMAPPED, DRAFT, MAPPED or REJECTED;
//! - reviewers only to toggle `flagged`, while the row is MAPPED,
//!   INREVIEW, ACCEPTED or REJECTED;
//! - reconcilers while the row is RECONCILE.
//!
//! Outside RECONCILE any content change (code, display, relationship)
//! sends the row back to DRAFT, and removing the last target of a row
//! without no-map sends it to UNMAPPED.

use crate::actor::Actor;
use crate::error::{MappingProblem, WorkflowError};
use crate::row::{role_on_row, stamp_role};
use codemap_kernel::{MapStatus, Role, check_transition};
use codemap_store::{MapRow, MapRowTarget, Relationship, RowId, RowStore};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Content of a target to add.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetDraft {
    pub target_code: String,
    #[serde(default)]
    pub target_display: String,
    pub relationship: Relationship,
}

pub fn add_target<S: RowStore>(
    store: &mut S,
    actor: &Actor,
    row_id: RowId,
    draft: TargetDraft,
) -> Result<MapRow, WorkflowError> {
    let mut row = store.row(row_id)?;
    let role = editing_role(store, actor, &row, false)?;
    if row.no_map {
        return Err(WorkflowError::invalid(row.id, MappingProblem::TargetWhileNoMap));
    }

    let target = MapRowTarget::new(draft.target_code, draft.target_display, draft.relationship);
    let target_id = target.id;
    row.targets.push(target);
    after_content_change(&mut row, role)?;
    commit(store, actor, row, role, "target added", target_id)
}

/// Replace the stored target with the same id by `target`.
pub fn update_target<S: RowStore>(
    store: &mut S,
    actor: &Actor,
    row_id: RowId,
    target: MapRowTarget,
) -> Result<MapRow, WorkflowError> {
    let mut row = store.row(row_id)?;
    let Some(at) = row.targets.iter().position(|kept| kept.id == target.id) else {
        return Err(WorkflowError::TargetNotFound {
            row_id,
            target_id: target.id,
        });
    };
    let content_changed = row.targets[at].content_differs(&target);
    let role = editing_role(store, actor, &row, !content_changed)?;

    let target_id = target.id;
    row.targets[at] = target;
    if content_changed {
        after_content_change(&mut row, role)?;
    }
    commit(store, actor, row, role, "target updated", target_id)
}

pub fn delete_target<S: RowStore>(
    store: &mut S,
    actor: &Actor,
    row_id: RowId,
    target_id: Uuid,
) -> Result<MapRow, WorkflowError> {
    let mut row = store.row(row_id)?;
    let Some(at) = row.targets.iter().position(|kept| kept.id == target_id) else {
        return Err(WorkflowError::TargetNotFound { row_id, target_id });
    };
    let role = editing_role(store, actor, &row, false)?;

    row.targets.remove(at);
    after_content_change(&mut row, role)?;
    if row.status == MapStatus::Draft && !row.has_targets() && !row.no_map {
        move_to(&mut row, MapStatus::Unmapped, role)?;
    }
    commit(store, actor, row, role, "target deleted", target_id)
}

/// Resolve the actor's role and check it may edit targets in the row's
/// current status. `flag_only` is true for edits that only toggle `flagged`.
fn editing_role<S: RowStore>(
    store: &S,
    actor: &Actor,
    row: &MapRow,
    flag_only: bool,
) -> Result<Role, WorkflowError> {
    let role = role_on_row(store, actor, row)?;
    let allowed = match role {
        Role::Author => row.status.is_author_editable(),
        Role::Reviewer => flag_only && row.status.is_review_family(),
        Role::Reconciler => row.status == MapStatus::Reconcile,
    };
    if allowed {
        Ok(role)
    } else {
        Err(WorkflowError::unauthorized(
            row.id,
            &actor.login,
            format!("{role} cannot edit targets of a {} row", row.status),
        ))
    }
}

fn after_content_change(row: &mut MapRow, role: Role) -> Result<(), WorkflowError> {
    if row.status == MapStatus::Reconcile {
        return Ok(());
    }
    move_to(row, MapStatus::Draft, role)
}

fn move_to(row: &mut MapRow, status: MapStatus, role: Role) -> Result<(), WorkflowError> {
    if row.status != status {
        check_transition(row.status, status, role)?;
        row.status = status;
    }
    Ok(())
}

fn commit<S: RowStore>(
    store: &mut S,
    actor: &Actor,
    mut row: MapRow,
    role: Role,
    message: &'static str,
    target_id: Uuid,
) -> Result<MapRow, WorkflowError> {
    stamp_role(&mut row, role, &actor.login);
    row.touch(&actor.login, actor.now);
    store.put_row(row.clone())?;
    info!(
        row_id = row.id,
        %target_id,
        actor = %actor.login,
        status = %row.status,
        "{message}"
    );
    Ok(row)
}

//! Dual-map reconciliation.
//!
//! In dual-map projects every source code has two rows (siblings) authored
//! independently. When a row reaches MAPPED or RECONCILE its sibling is
//! inspected:
//!
//! | row       | sibling   | outcome                                           |
//! |-----------|-----------|---------------------------------------------------|
//! | MAPPED    | MAPPED    | equivalent: merge into row; else both RECONCILE   |
//! | MAPPED    | RECONCILE | sibling merged into row                           |
//! | RECONCILE | MAPPED    | row merged into sibling                           |
//! | otherwise |           | nothing to do yet                                 |

use crate::actor::Actor;
use crate::error::WorkflowError;
use codemap_kernel::MapStatus;
use codemap_store::{MapRow, MapRowTarget, RowId, RowStore, TaskType};
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum ReconcileOutcome {
    /// The row has no sibling.
    NoSibling,
    /// The sibling exists but the pair is not ready to reconcile.
    Pending { sibling: RowId },
    /// Two equivalent MAPPED rows were merged.
    Merged { survivor: RowId, removed: RowId },
    /// Two disagreeing MAPPED rows were moved to RECONCILE.
    Escalated { rows: [RowId; 2] },
    /// A reconciled row absorbed its RECONCILE sibling.
    Resolved { survivor: RowId, removed: RowId },
}

/// Whether two sibling rows carry the same mapping.
///
/// Compares `no_map`, `status` and the `(target_code, relationship)` pairs
/// regardless of target order.
pub fn targets_equivalent(left: &MapRow, right: &MapRow) -> bool {
    if left.no_map != right.no_map || left.status != right.status {
        return false;
    }
    if left.targets.len() != right.targets.len() {
        return false;
    }
    let mut left_keys: Vec<_> = left.targets.iter().map(|t| t.equivalence_key()).collect();
    let mut right_keys: Vec<_> = right.targets.iter().map(|t| t.equivalence_key()).collect();
    left_keys.sort_unstable();
    right_keys.sort_unstable();
    left_keys == right_keys
}

/// Reconcile `row_id` against its sibling, if any.
pub fn reconcile_row<S: RowStore>(
    store: &mut S,
    actor: &Actor,
    row_id: RowId,
) -> Result<ReconcileOutcome, WorkflowError> {
    let row = store.row(row_id)?;
    let Some(sibling) = store.find_sibling(row.map_id, row.source_code.id, row.id)? else {
        debug!(row_id, "no sibling to reconcile");
        return Ok(ReconcileOutcome::NoSibling);
    };

    match (row.status, sibling.status) {
        (MapStatus::Mapped, MapStatus::Mapped) => both_mapped(store, actor, row, sibling),
        (MapStatus::Mapped, MapStatus::Reconcile) => resolve(store, actor, row, sibling),
        (MapStatus::Reconcile, MapStatus::Mapped) => resolve(store, actor, sibling, row),
        _ => {
            debug!(row_id, sibling = sibling.id, "sibling not ready");
            Ok(ReconcileOutcome::Pending {
                sibling: sibling.id,
            })
        }
    }
}

fn both_mapped<S: RowStore>(
    store: &mut S,
    actor: &Actor,
    mut row: MapRow,
    mut sibling: MapRow,
) -> Result<ReconcileOutcome, WorkflowError> {
    add_provenance(store, actor, &mut row)?;
    add_provenance(store, actor, &mut sibling)?;

    if targets_equivalent(&row, &sibling) {
        row.author_task = None;
        row.notes.extend(sibling.notes.iter().cloned());
        row.touch(&actor.login, actor.now);

        let outcome = ReconcileOutcome::Merged {
            survivor: row.id,
            removed: sibling.id,
        };
        store.delete_row(sibling.id)?;
        store.put_row(row)?;
        let swept = store.delete_orphan_tasks()?;
        info!(?outcome, swept = swept.len(), "sibling rows merged");
        return Ok(outcome);
    }

    let rows = [row.id, sibling.id];
    for mut pending in [row, sibling] {
        pending.status = MapStatus::Reconcile;
        pending.author_task = None;
        pending.touch(&actor.login, actor.now);
        store.put_row(pending)?;
    }
    let swept = store.delete_orphan_tasks()?;
    info!(rows = ?rows, swept = swept.len(), "sibling rows escalated to reconcile");
    Ok(ReconcileOutcome::Escalated { rows })
}

/// Merge a RECONCILE row into its reconciled MAPPED sibling.
///
/// Every target of the absorbed row is cloned onto the survivor, including
/// ones the survivor already carries.
fn resolve<S: RowStore>(
    store: &mut S,
    actor: &Actor,
    mut survivor: MapRow,
    absorbed: MapRow,
) -> Result<ReconcileOutcome, WorkflowError> {
    if absorbed.no_map {
        survivor.no_map = true;
    }
    survivor
        .targets
        .extend(absorbed.targets.iter().map(MapRowTarget::duplicate));
    survivor.notes.extend(absorbed.notes.iter().cloned());
    survivor.reconcile_task = None;
    survivor.touch(&actor.login, actor.now);

    let outcome = ReconcileOutcome::Resolved {
        survivor: survivor.id,
        removed: absorbed.id,
    };
    store.delete_row(absorbed.id)?;
    store.put_row(survivor)?;
    let swept = store.delete_orphan_tasks()?;
    info!(?outcome, swept = swept.len(), "reconciled row resolved");
    Ok(outcome)
}

fn add_provenance<S: RowStore>(
    store: &S,
    actor: &Actor,
    row: &mut MapRow,
) -> Result<(), WorkflowError> {
    let author = match row.task_for(TaskType::Author) {
        Some(task_id) => Some(store.task(task_id)?.assignee),
        None => row.last_author.clone(),
    };
    let author = author.unwrap_or_else(|| actor.login.clone());
    let text = format!("Mapped by {author}");
    row.add_note(author, text, actor.now);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use codemap_store::{MapRowTarget, Relationship, SourceCode};

    fn row(id: RowId, targets: &[(&str, Relationship)]) -> MapRow {
        let mut row = MapRow::new(
            id,
            1,
            SourceCode {
                id: 7,
                index: 1,
                code: "A00".to_string(),
                display: String::new(),
            },
        );
        row.status = MapStatus::Mapped;
        row.targets = targets
            .iter()
            .map(|(code, rel)| MapRowTarget::new(*code, "", *rel))
            .collect();
        row
    }

    #[test]
    fn equivalence_ignores_target_order_and_display() {
        let left = row(
            1,
            &[("X", Relationship::Equivalent), ("Y", Relationship::Broader)],
        );
        let mut right = row(
            2,
            &[("Y", Relationship::Broader), ("X", Relationship::Equivalent)],
        );
        right.targets[0].target_display = "other wording".to_string();
        assert!(targets_equivalent(&left, &right));
    }

    #[test]
    fn equivalence_sees_relationship_no_map_and_status() {
        let left = row(1, &[("X", Relationship::Equivalent)]);

        let narrower = row(2, &[("X", Relationship::Narrower)]);
        assert!(!targets_equivalent(&left, &narrower));

        let mut no_map = row(2, &[("X", Relationship::Equivalent)]);
        no_map.no_map = true;
        assert!(!targets_equivalent(&left, &no_map));

        let mut draft = row(2, &[("X", Relationship::Equivalent)]);
        draft.status = MapStatus::Draft;
        assert!(!targets_equivalent(&left, &draft));

        let extra = row(
            2,
            &[("X", Relationship::Equivalent), ("X", Relationship::Equivalent)],
        );
        assert!(!targets_equivalent(&left, &extra));
    }

    #[test]
    fn outcome_serializes_with_tag() {
        let json = serde_json::to_value(ReconcileOutcome::Merged {
            survivor: 1,
            removed: 2,
        })
        .expect("serialize");
        assert_eq!(json["outcome"], "merged");
        assert_eq!(json["survivor"], 1);
    }
}

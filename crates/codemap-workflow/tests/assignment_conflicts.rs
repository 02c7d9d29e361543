//! Conflict completeness: an assignment is rejected on exactly the rows
//! with a role or existing-task conflict, and the fully narrowed
//! specification it reports always assigns cleanly.

use chrono::{DateTime, Utc};
use codemap_kernel::RowIndex;
use codemap_store::{MapInfo, MapRow, MemoryStore, Project, RowStore, SourceCode, TaskType};
use codemap_workflow::{Actor, AssignTaskRequest, AssignmentError, assign_task};
use proptest::prelude::*;
use std::collections::BTreeSet;

const SIZE: u64 = 24;

fn owner() -> Actor {
    Actor::new(
        "olga",
        DateTime::parse_from_rfc3339("2026-02-02T08:00:00Z")
            .expect("fixed timestamp")
            .with_timezone(&Utc),
    )
}

fn store() -> MemoryStore {
    let mut store = MemoryStore::new();
    store.insert_project(Project {
        id: 1,
        name: "drugs".to_string(),
        owners: BTreeSet::from(["olga".to_string()]),
        members: BTreeSet::from(["ada".to_string(), "ben".to_string()]),
        guests: BTreeSet::new(),
        dual_map_mode: false,
    });
    store.insert_map(MapInfo {
        id: 3,
        project_id: 1,
        name: "drugs-to-atc".to_string(),
        code_set_size: SIZE,
    });
    for index in 1..=SIZE {
        store.insert_row(MapRow::new(
            index,
            3,
            SourceCode {
                id: index,
                index,
                code: format!("D{index}"),
                display: String::new(),
            },
        ));
    }
    store
}

fn spec(indices: &BTreeSet<RowIndex>) -> String {
    indices
        .iter()
        .map(|index| index.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn request(task_type: TaskType, assignee: &str, rows: String) -> AssignTaskRequest {
    AssignTaskRequest {
        task_id: None,
        map_id: 3,
        task_type,
        assignee: assignee.to_string(),
        rows,
        allow_assignee_to_be_author_and_reviewer: false,
        reassign_already_assigned_rows: false,
    }
}

fn indices() -> impl Strategy<Value = BTreeSet<RowIndex>> {
    prop::collection::btree_set(1..=SIZE, 0..12)
}

proptest! {
    #[test]
    fn prop_rejection_names_exactly_the_conflicting_rows(
        authored_by_ada in indices(),
        reviewed_by_ben in indices(),
        requested in prop::collection::btree_set(1..=SIZE, 1..20),
    ) {
        let mut store = store();
        if !authored_by_ada.is_empty() {
            assign_task(&mut store, &owner(), &request(TaskType::Author, "ada", spec(&authored_by_ada)))
                .expect("ada author task");
        }
        if !reviewed_by_ben.is_empty() {
            assign_task(&mut store, &owner(), &request(TaskType::Review, "ben", spec(&reviewed_by_ben)))
                .expect("ben review task");
        }

        let role: BTreeSet<RowIndex> = requested.intersection(&reviewed_by_ben).copied().collect();
        let existing: BTreeSet<RowIndex> = requested.intersection(&authored_by_ada).copied().collect();
        let rejected: BTreeSet<RowIndex> = role.union(&existing).copied().collect();

        let attempt = request(TaskType::Author, "ben", spec(&requested));
        match assign_task(&mut store, &owner(), &attempt) {
            Ok(result) => {
                prop_assert!(rejected.is_empty());
                prop_assert_eq!(result.bound_rows as usize, requested.len());
            }
            Err(AssignmentError::UnassignableRows(rows)) => {
                prop_assert!(!rejected.is_empty());
                prop_assert_eq!(
                    rows.indexes_with_role_conflict.as_ref().map(|s| s.count).unwrap_or(0),
                    role.len() as u64
                );
                prop_assert_eq!(
                    rows.indexes_with_existing_task.as_ref().map(|s| s.count).unwrap_or(0),
                    existing.len() as u64
                );

                let assignable: BTreeSet<RowIndex> =
                    requested.difference(&rejected).copied().collect();
                match &rows.without_any_conflicts {
                    None => prop_assert!(assignable.is_empty()),
                    Some(narrowed) => {
                        prop_assert_eq!(narrowed.count, assignable.len() as u64);
                        let retry = request(TaskType::Author, "ben", narrowed.text.clone());
                        let result = assign_task(&mut store, &owner(), &retry)
                            .expect("narrowed specification assigns cleanly");
                        let bound = store
                            .bound_indices(&result.task.task_ref())
                            .expect("bound indices");
                        prop_assert_eq!(bound, assignable);
                    }
                }
            }
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }
}

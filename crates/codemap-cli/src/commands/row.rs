use crate::cli::{RowCommands, TargetCommands};
use crate::support::{fail, load_store_or_exit, mutate_store, print_json};
use codemap_kernel::{MapStatus, RowSpecCodec};
use codemap_store::{MapRow, ProjectDirectory, Relationship, RowStore};
use codemap_workflow::{
    Actor, TargetDraft, WorkflowError, add_target, delete_target, reconcile_row, save_row,
    update_target,
};
use serde_json::json;
use std::path::Path;
use uuid::Uuid;

pub fn run(command: RowCommands, store_path: &Path) {
    match command {
        RowCommands::List {
            map,
            rows,
            status,
            json,
        } => run_list(store_path, map, rows, status, json),
        RowCommands::Save {
            id,
            actor,
            status,
            no_map,
            note,
            json,
        } => run_save(
            store_path,
            Actor::current(actor),
            id,
            RowChanges {
                status,
                no_map,
                note,
            },
            json,
        ),
        RowCommands::Reconcile { id, actor, json } => {
            run_reconcile(store_path, Actor::current(actor), id, json)
        }
        RowCommands::Target { command } => run_target(command, store_path),
    }
}

struct RowChanges {
    status: Option<MapStatus>,
    no_map: Option<bool>,
    note: Option<String>,
}

fn run_list(
    store_path: &Path,
    map: u64,
    rows: String,
    status: Option<MapStatus>,
    json_output: bool,
) {
    let store = load_store_or_exit(store_path);
    let size = store.code_set_size(map).unwrap_or_else(|e| fail(e));
    let selection = RowSpecCodec::new(size)
        .normalize_set(&rows)
        .unwrap_or_else(|e| fail(e));
    let listed: Vec<MapRow> = store
        .rows_in(map, &selection)
        .unwrap_or_else(|e| fail(e))
        .into_iter()
        .filter(|row| status.is_none_or(|wanted| row.status == wanted))
        .collect();

    if json_output {
        print_json(&json!({
            "action": "row.list",
            "mapId": map,
            "count": listed.len(),
            "rows": listed,
        }));
        return;
    }

    println!("codemap row list\n  Map: {map}\n  Rows: {}", listed.len());
    for row in &listed {
        let flag = if row.no_map { " no-map" } else { "" };
        println!(
            "  - {} #{} {} [{}] targets={}{flag}",
            row.id,
            row.index(),
            row.source_code.code,
            row.status,
            row.targets.len()
        );
    }
}

fn run_save(store_path: &Path, actor: Actor, id: u64, changes: RowChanges, json_output: bool) {
    let outcome = mutate_store(store_path, |store| -> Result<_, WorkflowError> {
        let mut proposed = store.row(id)?;
        if let Some(status) = changes.status {
            proposed.status = status;
        }
        if let Some(no_map) = changes.no_map {
            proposed.no_map = no_map;
        }
        if let Some(note) = changes.note {
            proposed.add_note(actor.login.clone(), note, actor.now);
        }
        save_row(store, &actor, proposed)
    })
    .unwrap_or_else(|e| fail(e));

    if json_output {
        print_json(&json!({
            "action": "row.save",
            "row": outcome.row,
            "reconcile": outcome.reconcile,
        }));
    } else {
        println!(
            "codemap row save\n  Row: {} [{}]\n  Targets: {}",
            outcome.row.id,
            outcome.row.status,
            outcome.row.targets.len()
        );
        if let Some(reconcile) = &outcome.reconcile {
            println!("  Reconcile: {reconcile:?}");
        }
    }
}

fn run_reconcile(store_path: &Path, actor: Actor, id: u64, json_output: bool) {
    let outcome =
        mutate_store(store_path, |store| reconcile_row(store, &actor, id)).unwrap_or_else(|e| fail(e));

    if json_output {
        print_json(&json!({
            "action": "row.reconcile",
            "rowId": id,
            "reconcile": outcome,
        }));
    } else {
        println!("codemap row reconcile\n  Row: {id}\n  Outcome: {outcome:?}");
    }
}

fn run_target(command: TargetCommands, store_path: &Path) {
    let (action, json_output, result) = match command {
        TargetCommands::Add {
            row,
            actor,
            code,
            display,
            relationship,
            json,
        } => {
            let actor = Actor::current(actor);
            let draft = TargetDraft {
                target_code: code,
                target_display: display,
                relationship,
            };
            let result = mutate_store(store_path, |store| add_target(store, &actor, row, draft));
            ("row.target.add", json, result)
        }
        TargetCommands::Update {
            row,
            target,
            actor,
            code,
            display,
            relationship,
            flagged,
            json,
        } => {
            let actor = Actor::current(actor);
            let result = mutate_store(store_path, |store| -> Result<_, WorkflowError> {
                let current = store.row(row)?;
                let Some(existing) = current.target(target) else {
                    return Err(WorkflowError::TargetNotFound {
                        row_id: row,
                        target_id: target,
                    });
                };
                let mut edited = existing.clone();
                if let Some(code) = code {
                    edited.target_code = code;
                }
                if let Some(display) = display {
                    edited.target_display = display;
                }
                if let Some(relationship) = relationship {
                    edited.relationship = relationship;
                }
                if let Some(flagged) = flagged {
                    edited.flagged = flagged;
                }
                update_target(store, &actor, row, edited)
            });
            ("row.target.update", json, result)
        }
        TargetCommands::Delete {
            row,
            target,
            actor,
            json,
        } => {
            let actor = Actor::current(actor);
            let result = mutate_store(store_path, |store| delete_target(store, &actor, row, target));
            ("row.target.delete", json, result)
        }
    };

    let row = result.unwrap_or_else(|e| fail(e));
    if json_output {
        print_json(&json!({
            "action": action,
            "row": row,
        }));
    } else {
        println!(
            "codemap {}\n  Row: {} [{}]",
            action.replace('.', " "),
            row.id,
            row.status
        );
        for target in &row.targets {
            print_target(target.id, &target.target_code, target.relationship, target.flagged);
        }
    }
}

fn print_target(id: Uuid, code: &str, relationship: Relationship, flagged: bool) {
    let flag = if flagged { " flagged" } else { "" };
    println!("  - {id} {code} {relationship}{flag}");
}

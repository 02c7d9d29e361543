use crate::cli::TaskCommands;
use crate::support::{fail, load_store_or_exit, mutate_store, print_json};
use codemap_store::{RowStore, TaskType};
use codemap_workflow::{
    Actor, AssignTaskRequest, AssignmentError, assign_task, compute_row_specification,
    delete_task,
};
use serde_json::json;
use std::path::Path;

pub fn run(command: TaskCommands, store_path: &Path) {
    match command {
        TaskCommands::Assign {
            map,
            task_type,
            assignee,
            rows,
            task,
            actor,
            allow_author_and_reviewer,
            reassign,
            json,
        } => run_assign(
            store_path,
            Actor::current(actor),
            AssignTaskRequest {
                task_id: task,
                map_id: map,
                task_type,
                assignee,
                rows,
                allow_assignee_to_be_author_and_reviewer: allow_author_and_reviewer,
                reassign_already_assigned_rows: reassign,
            },
            json,
        ),
        TaskCommands::Spec { id, json } => run_spec(store_path, id, json),
        TaskCommands::Delete { id, actor, json } => {
            run_delete(store_path, Actor::current(actor), id, json)
        }
        TaskCommands::List { map, json } => run_list(store_path, map, json),
    }
}

fn run_assign(store_path: &Path, actor: Actor, request: AssignTaskRequest, json_output: bool) {
    let result = match mutate_store(store_path, |store| assign_task(store, &actor, &request)) {
        Ok(result) => result,
        Err(AssignmentError::UnassignableRows(rows)) if json_output => {
            print_json(&json!({
                "action": "task.assign",
                "error": "unassignableRows",
                "message": rows.to_string(),
                "unassignable": rows,
            }));
            std::process::exit(1);
        }
        Err(err) => fail(err),
    };

    if json_output {
        print_json(&json!({
            "action": "task.assign",
            "storePath": store_path.display().to_string(),
            "task": result.task,
            "specification": result.specification,
            "boundRows": result.bound_rows,
            "deletedTasks": result.deleted_tasks,
        }));
    } else {
        println!(
            "codemap task assign\n  Task: {} {} -> {}\n  Rows: {} ({} bound)\n  Path: {}",
            result.task.id,
            result.task.task_type,
            result.task.assignee,
            result.specification.text,
            result.bound_rows,
            store_path.display()
        );
        if !result.deleted_tasks.is_empty() {
            let deleted: Vec<String> = result.deleted_tasks.iter().map(u64::to_string).collect();
            println!("  Deleted tasks: {}", deleted.join(", "));
        }
    }
}

fn run_spec(store_path: &Path, id: u64, json_output: bool) {
    let store = load_store_or_exit(store_path);
    let specification = compute_row_specification(&store, id).unwrap_or_else(|e| fail(e));

    if json_output {
        print_json(&json!({
            "action": "task.spec",
            "taskId": id,
            "specification": specification,
        }));
    } else {
        println!(
            "codemap task spec\n  Task: {id}\n  Specification: {}\n  Rows: {}",
            specification.text, specification.count
        );
    }
}

fn run_delete(store_path: &Path, actor: Actor, id: u64, json_output: bool) {
    let removed =
        mutate_store(store_path, |store| delete_task(store, &actor, id)).unwrap_or_else(|e| fail(e));

    if json_output {
        print_json(&json!({
            "action": "task.delete",
            "task": removed,
        }));
    } else {
        println!(
            "codemap task delete\n  Deleted: {} {} ({})",
            removed.id, removed.task_type, removed.assignee
        );
    }
}

fn run_list(store_path: &Path, map: u64, json_output: bool) {
    let store = load_store_or_exit(store_path);
    let tasks = store.tasks_in(map).unwrap_or_else(|e| fail(e));

    if json_output {
        print_json(&json!({
            "action": "task.list",
            "mapId": map,
            "count": tasks.len(),
            "tasks": tasks,
        }));
        return;
    }

    println!("codemap task list\n  Map: {map}\n  Tasks: {}", tasks.len());
    for task_type in [TaskType::Author, TaskType::Review, TaskType::Reconcile] {
        for task in tasks.iter().filter(|task| task.task_type == task_type) {
            println!(
                "  - {} {} {} [{}]",
                task.id, task.task_type, task.assignee, task.source_row_specification
            );
        }
    }
}

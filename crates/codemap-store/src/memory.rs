//! Canonical in-memory representation of mapping state.
//!
//! This is the reference collaborator for `codemap-workflow`:
//! - load/store JSONL
//! - deterministic row/task queries in id order
//! - set-oriented task binding
//! - clone-and-swap transactions

use crate::jsonl::{self, JsonlError, RecordKey, StoreRecord};
use crate::project::{MapId, MapInfo, Project, ProjectId};
use crate::row::{MapRow, RowId, SourceCodeId};
use crate::store::{ProjectDirectory, RowStore, StoreError};
use crate::task::{Task, TaskId, TaskRef};
use chrono::{DateTime, Utc};
use codemap_kernel::{RangeSet, RowIndex};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Errors raised while loading or saving the memory store.
#[derive(Debug, thiserror::Error)]
pub enum MemoryStoreError {
    #[error(transparent)]
    Jsonl(#[from] JsonlError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    projects: BTreeMap<ProjectId, Project>,
    maps: BTreeMap<MapId, MapInfo>,
    tasks: BTreeMap<TaskId, Task>,
    rows: BTreeMap<RowId, MapRow>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from records in file order.
    ///
    /// Duplicate ids resolve last-write-wins. Maps must name a known project,
    /// and tasks and rows a known map.
    pub fn from_records(records: Vec<StoreRecord>) -> Result<Self, MemoryStoreError> {
        let mut store = Self::new();
        for record in records {
            match record {
                StoreRecord::Project(project) => store.insert_project(project),
                StoreRecord::Map(map) => store.insert_map(map),
                StoreRecord::Task(task) => store.insert_task(task),
                StoreRecord::Row(row) => store.insert_row(row),
            }
        }
        store.check_references()?;
        Ok(store)
    }

    pub fn load_jsonl(path: impl AsRef<Path>) -> Result<Self, MemoryStoreError> {
        Self::from_records(jsonl::load(path.as_ref())?)
    }

    pub fn save_jsonl(&self, path: impl AsRef<Path>) -> Result<(), MemoryStoreError> {
        jsonl::persist(path.as_ref(), &self.records())?;
        Ok(())
    }

    /// All records, parents before children.
    pub fn records(&self) -> Vec<StoreRecord> {
        self.projects
            .values()
            .cloned()
            .map(StoreRecord::Project)
            .chain(self.maps.values().cloned().map(StoreRecord::Map))
            .chain(self.tasks.values().cloned().map(StoreRecord::Task))
            .chain(self.rows.values().cloned().map(StoreRecord::Row))
            .collect()
    }

    /// Records keyed by identity.
    pub fn keyed_records(&self) -> BTreeMap<RecordKey, StoreRecord> {
        self.records()
            .into_iter()
            .map(|record| (record.key(), record))
            .collect()
    }

    /// Run `mutation` against a copy and keep the copy only on success.
    pub fn transact<T, E>(
        &mut self,
        mutation: impl FnOnce(&mut MemoryStore) -> Result<T, E>,
    ) -> Result<T, E> {
        let mut working = self.clone();
        let value = mutation(&mut working)?;
        *self = working;
        Ok(value)
    }

    pub fn insert_project(&mut self, project: Project) {
        self.projects.insert(project.id, project);
    }

    pub fn insert_map(&mut self, map: MapInfo) {
        self.maps.insert(map.id, map);
    }

    pub fn insert_task(&mut self, task: Task) {
        self.tasks.insert(task.id, task);
    }

    pub fn insert_row(&mut self, row: MapRow) {
        self.rows.insert(row.id, row);
    }

    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn rows(&self) -> impl Iterator<Item = &MapRow> {
        self.rows.values()
    }

    fn check_references(&self) -> Result<(), StoreError> {
        for map in self.maps.values() {
            if !self.projects.contains_key(&map.project_id) {
                return Err(dangling("map", map.id, format!("project {}", map.project_id)));
            }
        }
        for task in self.tasks.values() {
            if !self.maps.contains_key(&task.map_id) {
                return Err(dangling("task", task.id, format!("map {}", task.map_id)));
            }
        }
        for row in self.rows.values() {
            if !self.maps.contains_key(&row.map_id) {
                return Err(dangling("row", row.id, format!("map {}", row.map_id)));
            }
        }
        Ok(())
    }

    /// For each wanted index pick the row to bind: one already bound to
    /// this task, else an unbound one, else the lowest id.
    fn binding_candidates(&self, task: &TaskRef, wanted: impl Fn(RowIndex) -> bool) -> Vec<RowId> {
        let mut by_index: BTreeMap<RowIndex, Vec<&MapRow>> = BTreeMap::new();
        for row in self.rows.values() {
            if row.map_id == task.map_id && wanted(row.index()) {
                by_index.entry(row.index()).or_default().push(row);
            }
        }

        by_index
            .into_values()
            .filter_map(|rows| {
                rows.iter()
                    .find(|row| row.task_for(task.task_type) == Some(task.id))
                    .or_else(|| rows.iter().find(|row| row.task_for(task.task_type).is_none()))
                    .or_else(|| rows.first())
                    .map(|row| row.id)
            })
            .collect()
    }

    fn bind_rows(&mut self, task: &TaskRef, ids: Vec<RowId>, actor: &str, at: DateTime<Utc>) -> usize {
        let mut bound = 0;
        for id in ids {
            if let Some(row) = self.rows.get_mut(&id) {
                row.set_task(task.task_type, Some(task.id));
                row.touch(actor, at);
                bound += 1;
            }
        }
        bound
    }
}

fn dangling(kind: &'static str, id: u64, missing: String) -> StoreError {
    StoreError::DanglingReference { kind, id, missing }
}

impl RowStore for MemoryStore {
    fn row(&self, id: RowId) -> Result<MapRow, StoreError> {
        self.rows.get(&id).cloned().ok_or(StoreError::RowNotFound(id))
    }

    fn put_row(&mut self, row: MapRow) -> Result<(), StoreError> {
        if !self.maps.contains_key(&row.map_id) {
            return Err(StoreError::MapNotFound(row.map_id));
        }
        self.rows.insert(row.id, row);
        Ok(())
    }

    fn delete_row(&mut self, id: RowId) -> Result<MapRow, StoreError> {
        self.rows.remove(&id).ok_or(StoreError::RowNotFound(id))
    }

    fn rows_in(&self, map_id: MapId, rows: &RangeSet) -> Result<Vec<MapRow>, StoreError> {
        if !self.maps.contains_key(&map_id) {
            return Err(StoreError::MapNotFound(map_id));
        }
        let mut selected: Vec<MapRow> = self
            .rows
            .values()
            .filter(|row| row.map_id == map_id && rows.contains(row.index()))
            .cloned()
            .collect();
        selected.sort_by_key(|row| (row.index(), row.id));
        Ok(selected)
    }

    fn find_sibling(
        &self,
        map_id: MapId,
        source_code: SourceCodeId,
        exclude_row: RowId,
    ) -> Result<Option<MapRow>, StoreError> {
        Ok(self
            .rows
            .values()
            .find(|row| {
                row.map_id == map_id && row.source_code.id == source_code && row.id != exclude_row
            })
            .cloned())
    }

    fn task(&self, id: TaskId) -> Result<Task, StoreError> {
        self.tasks.get(&id).cloned().ok_or(StoreError::TaskNotFound(id))
    }

    fn tasks_in(&self, map_id: MapId) -> Result<Vec<Task>, StoreError> {
        if !self.maps.contains_key(&map_id) {
            return Err(StoreError::MapNotFound(map_id));
        }
        Ok(self
            .tasks
            .values()
            .filter(|task| task.map_id == map_id)
            .cloned()
            .collect())
    }

    fn allocate_task_id(&mut self) -> TaskId {
        self.tasks.keys().next_back().map_or(1, |last| last + 1)
    }

    fn put_task(&mut self, task: Task) -> Result<(), StoreError> {
        if !self.maps.contains_key(&task.map_id) {
            return Err(StoreError::MapNotFound(task.map_id));
        }
        self.tasks.insert(task.id, task);
        Ok(())
    }

    fn delete_task(&mut self, id: TaskId) -> Result<Task, StoreError> {
        let task = self.tasks.remove(&id).ok_or(StoreError::TaskNotFound(id))?;
        let task_ref = task.task_ref();
        for row in self.rows.values_mut() {
            if row.task_for(task_ref.task_type) == Some(id) {
                row.set_task(task_ref.task_type, None);
            }
        }
        Ok(task)
    }

    fn rows_for_task(&self, task: &TaskRef) -> Result<Vec<MapRow>, StoreError> {
        Ok(self
            .rows
            .values()
            .filter(|row| row.map_id == task.map_id && row.task_for(task.task_type) == Some(task.id))
            .cloned()
            .collect())
    }

    fn bind_range(
        &mut self,
        task: &TaskRef,
        lower: RowIndex,
        upper: RowIndex,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let ids = self.binding_candidates(task, |index| (lower..=upper).contains(&index));
        Ok(self.bind_rows(task, ids, actor, at))
    }

    fn bind_indices(
        &mut self,
        task: &TaskRef,
        indices: &BTreeSet<RowIndex>,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let ids = self.binding_candidates(task, |index| indices.contains(&index));
        Ok(self.bind_rows(task, ids, actor, at))
    }

    fn clear_task_binding(
        &mut self,
        task: &TaskRef,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let mut cleared = 0;
        for row in self.rows.values_mut() {
            if row.map_id == task.map_id && row.task_for(task.task_type) == Some(task.id) {
                row.set_task(task.task_type, None);
                row.touch(actor, at);
                cleared += 1;
            }
        }
        Ok(cleared)
    }

    fn delete_orphan_tasks(&mut self) -> Result<Vec<TaskId>, StoreError> {
        let owned: BTreeSet<TaskId> = self
            .rows
            .values()
            .flat_map(|row| [row.author_task, row.review_task, row.reconcile_task])
            .flatten()
            .collect();
        let orphans: Vec<TaskId> = self
            .tasks
            .keys()
            .filter(|id| !owned.contains(id))
            .copied()
            .collect();
        for id in &orphans {
            self.tasks.remove(id);
        }
        Ok(orphans)
    }
}

impl ProjectDirectory for MemoryStore {
    fn project(&self, id: ProjectId) -> Result<Project, StoreError> {
        self.projects
            .get(&id)
            .cloned()
            .ok_or(StoreError::ProjectNotFound(id))
    }

    fn map_info(&self, id: MapId) -> Result<MapInfo, StoreError> {
        self.maps.get(&id).cloned().ok_or(StoreError::MapNotFound(id))
    }

    fn users_assigned_to_tasks(&self, project: ProjectId) -> Result<BTreeSet<String>, StoreError> {
        if !self.projects.contains_key(&project) {
            return Err(StoreError::ProjectNotFound(project));
        }
        Ok(self
            .tasks
            .values()
            .filter(|task| {
                self.maps
                    .get(&task.map_id)
                    .is_some_and(|map| map.project_id == project)
            })
            .map(|task| task.assignee.clone())
            .collect())
    }
}

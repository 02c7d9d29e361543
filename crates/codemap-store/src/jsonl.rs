//! JSONL storage: one tagged record per line.
//!
//! Projects, maps, tasks and rows share a single file; each line carries a
//! `kind` tag. Blank lines and `#` comments are skipped on read.
//!
//! Saving stages the whole file next to the target, syncs it, renames it
//! over the target and then syncs the directory, so a reader sees either
//! the old file or the new one.

use crate::project::{MapId, MapInfo, Project, ProjectId};
use crate::row::{MapRow, RowId};
use crate::task::{Task, TaskId};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreRecord {
    Project(Project),
    Map(MapInfo),
    Task(Task),
    Row(MapRow),
}

/// Identity of a record within a store file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum RecordKey {
    Project(ProjectId),
    Map(MapId),
    Task(TaskId),
    Row(RowId),
}

impl StoreRecord {
    pub fn key(&self) -> RecordKey {
        match self {
            Self::Project(project) => RecordKey::Project(project.id),
            Self::Map(map) => RecordKey::Map(map.id),
            Self::Task(task) => RecordKey::Task(task.id),
            Self::Row(row) => RecordKey::Row(row.id),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Project(_) => "project",
            Self::Map(_) => "map",
            Self::Task(_) => "task",
            Self::Row(_) => "row",
        }
    }
}

/// Parse store text. Line numbers in errors are 1-based.
pub fn decode(text: &str) -> Result<Vec<StoreRecord>, JsonlError> {
    text.lines()
        .enumerate()
        .map(|(at, line)| (at + 1, line.trim()))
        .filter(|(_, body)| !body.is_empty() && !body.starts_with('#'))
        .map(|(line, body)| {
            serde_json::from_str(body).map_err(|source| JsonlError::Record { line, source })
        })
        .collect()
}

pub fn encode(records: &[StoreRecord]) -> Result<String, JsonlError> {
    let mut text = String::new();
    for record in records {
        let line = serde_json::to_string(record).map_err(|source| JsonlError::Encode {
            kind: record.kind(),
            source,
        })?;
        text.push_str(&line);
        text.push('\n');
    }
    Ok(text)
}

/// Read the store file at `path`. A missing file is an empty store.
pub fn load(path: &Path) -> Result<Vec<StoreRecord>, JsonlError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(source) if source.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(JsonlError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    if bytes.contains(&0) {
        return Err(JsonlError::Corrupt {
            path: path.to_path_buf(),
            reason: "contains NUL bytes",
        });
    }
    let text = String::from_utf8(bytes).map_err(|_| JsonlError::Corrupt {
        path: path.to_path_buf(),
        reason: "is not valid UTF-8",
    })?;
    decode(&text)
}

/// Replace the store file at `path` with `records`.
pub fn persist(path: &Path, records: &[StoreRecord]) -> Result<(), JsonlError> {
    let text = encode(records)?;
    let dir = containing_dir(path);
    fs::create_dir_all(dir).map_err(|source| JsonlError::Write {
        path: dir.to_path_buf(),
        source,
    })?;

    StagedFile::create(path)?.commit(text.as_bytes())
}

fn containing_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// A sibling file that becomes the target on `commit` and is removed
/// otherwise.
struct StagedFile {
    target: PathBuf,
    staging: PathBuf,
    file: File,
    committed: bool,
}

impl StagedFile {
    fn create(target: &Path) -> Result<Self, JsonlError> {
        let mut name = target.file_name().map(OsString::from).unwrap_or_default();
        name.push(format!(".{}.staging", std::process::id()));
        let staging = target.with_file_name(name);
        let file = File::create(&staging).map_err(|source| JsonlError::Write {
            path: staging.clone(),
            source,
        })?;
        Ok(Self {
            target: target.to_path_buf(),
            staging,
            file,
            committed: false,
        })
    }

    fn commit(mut self, contents: &[u8]) -> Result<(), JsonlError> {
        let staged = self
            .file
            .write_all(contents)
            .and_then(|()| self.file.sync_all());
        staged.map_err(|source| JsonlError::Write {
            path: self.staging.clone(),
            source,
        })?;

        fs::rename(&self.staging, &self.target).map_err(|source| JsonlError::Write {
            path: self.target.clone(),
            source,
        })?;
        self.committed = true;

        let dir = containing_dir(&self.target);
        File::open(dir)
            .and_then(|handle| handle.sync_all())
            .map_err(|source| JsonlError::Write {
                path: dir.to_path_buf(),
                source,
            })
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.staging);
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JsonlError {
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: &'static str },

    #[error("line {line}: {source}")]
    Record {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot encode {kind} record: {source}")]
    Encode {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

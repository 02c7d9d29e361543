//! Tasks: units of work binding a set of rows to one assignee.

use crate::project::MapId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub type TaskId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskType {
    Author,
    Review,
    Reconcile,
}

impl TaskType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Author => "AUTHOR",
            Self::Review => "REVIEW",
            Self::Reconcile => "RECONCILE",
        }
    }
}

impl Display for TaskType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "AUTHOR" => Ok(Self::Author),
            "REVIEW" => Ok(Self::Review),
            "RECONCILE" => Ok(Self::Reconcile),
            other => Err(format!("unknown task type: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub map_id: MapId,
    pub task_type: TaskType,
    pub assignee: String,
    /// Normalized specification as last requested.
    #[serde(default)]
    pub source_row_specification: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn task_ref(&self) -> TaskRef {
        TaskRef {
            id: self.id,
            map_id: self.map_id,
            task_type: self.task_type,
        }
    }
}

/// The fields of a task the row store needs to bind rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskRef {
    pub id: TaskId,
    pub map_id: MapId,
    pub task_type: TaskType,
}

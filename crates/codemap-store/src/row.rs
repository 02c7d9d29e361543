//! Mapping rows and their targets.

use crate::project::MapId;
use crate::task::{TaskId, TaskType};
use chrono::{DateTime, Utc};
use codemap_kernel::{MapStatus, RowIndex};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

pub type RowId = u64;
pub type SourceCodeId = u64;

/// The imported source code a row maps from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceCode {
    pub id: SourceCodeId,
    /// 1-based position within the code set.
    pub index: RowIndex,
    pub code: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Relationship {
    Equivalent,
    Narrower,
    Broader,
    Inexact,
}

impl Relationship {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equivalent => "EQUIVALENT",
            Self::Narrower => "NARROWER",
            Self::Broader => "BROADER",
            Self::Inexact => "INEXACT",
        }
    }
}

impl Display for Relationship {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Relationship {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim();
        [
            Self::Equivalent,
            Self::Narrower,
            Self::Broader,
            Self::Inexact,
        ]
        .into_iter()
        .find(|rel| rel.as_str().eq_ignore_ascii_case(wanted))
        .ok_or_else(|| format!("unknown relationship: {wanted}"))
    }
}

/// One target code a row maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapRowTarget {
    pub id: Uuid,
    pub target_code: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target_display: String,
    pub relationship: Relationship,
    #[serde(default)]
    pub flagged: bool,
}

impl MapRowTarget {
    pub fn new(
        target_code: impl Into<String>,
        target_display: impl Into<String>,
        relationship: Relationship,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            target_code: target_code.into(),
            target_display: target_display.into(),
            relationship,
            flagged: false,
        }
    }

    /// Copy with a fresh identity and the flag cleared.
    pub fn duplicate(&self) -> Self {
        Self {
            id: Uuid::new_v4(),
            flagged: false,
            ..self.clone()
        }
    }

    /// Key used for equivalence between sibling rows.
    pub fn equivalence_key(&self) -> (&str, Relationship) {
        (self.target_code.as_str(), self.relationship)
    }

    /// Whether anything other than `flagged` differs.
    pub fn content_differs(&self, other: &Self) -> bool {
        self.target_code != other.target_code
            || self.target_display != other.target_display
            || self.relationship != other.relationship
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub author: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Mapping state of one source code within one map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapRow {
    pub id: RowId,
    pub map_id: MapId,
    pub source_code: SourceCode,

    #[serde(default)]
    pub status: MapStatus,
    #[serde(default)]
    pub no_map: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_task: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_task: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconcile_task: Option<TaskId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reviewer: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<MapRowTarget>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<Note>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub modified_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

impl MapRow {
    /// A fresh UNMAPPED row with no tasks, targets or notes.
    pub fn new(id: RowId, map_id: MapId, source_code: SourceCode) -> Self {
        Self {
            id,
            map_id,
            source_code,
            status: MapStatus::Unmapped,
            no_map: false,
            author_task: None,
            review_task: None,
            reconcile_task: None,
            last_author: None,
            last_reviewer: None,
            targets: Vec::new(),
            notes: Vec::new(),
            modified_by: String::new(),
            modified_at: None,
        }
    }

    pub fn index(&self) -> RowIndex {
        self.source_code.index
    }

    pub fn task_for(&self, task_type: TaskType) -> Option<TaskId> {
        match task_type {
            TaskType::Author => self.author_task,
            TaskType::Review => self.review_task,
            TaskType::Reconcile => self.reconcile_task,
        }
    }

    pub fn set_task(&mut self, task_type: TaskType, task: Option<TaskId>) {
        match task_type {
            TaskType::Author => self.author_task = task,
            TaskType::Review => self.review_task = task,
            TaskType::Reconcile => self.reconcile_task = task,
        }
    }

    pub fn has_targets(&self) -> bool {
        !self.targets.is_empty()
    }

    pub fn target(&self, id: Uuid) -> Option<&MapRowTarget> {
        self.targets.iter().find(|target| target.id == id)
    }

    pub fn add_note(&mut self, author: impl Into<String>, text: impl Into<String>, at: DateTime<Utc>) {
        self.notes.push(Note {
            author: author.into(),
            text: text.into(),
            created_at: at,
        });
    }

    /// Stamp the audit fields.
    pub fn touch(&mut self, actor: &str, at: DateTime<Utc>) {
        self.modified_by = actor.to_string();
        self.modified_at = Some(at);
    }
}

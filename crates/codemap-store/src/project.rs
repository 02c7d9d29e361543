//! Projects, their membership and the maps they own.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub type ProjectId = u64;
pub type MapId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub owners: BTreeSet<String>,
    #[serde(default)]
    pub members: BTreeSet<String>,
    #[serde(default)]
    pub guests: BTreeSet<String>,
    /// Every source code is mapped twice and reconciled.
    #[serde(default)]
    pub dual_map_mode: bool,
}

impl Project {
    pub fn roles(&self) -> ProjectRoles {
        ProjectRoles {
            owners: self.owners.clone(),
            members: self.members.clone(),
            guests: self.guests.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectRole {
    Owner,
    Member,
    Guest,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRoles {
    pub owners: BTreeSet<String>,
    pub members: BTreeSet<String>,
    pub guests: BTreeSet<String>,
}

impl ProjectRoles {
    /// Strongest role held by `user`.
    pub fn role_of(&self, user: &str) -> Option<ProjectRole> {
        if self.owners.contains(user) {
            Some(ProjectRole::Owner)
        } else if self.members.contains(user) {
            Some(ProjectRole::Member)
        } else if self.guests.contains(user) {
            Some(ProjectRole::Guest)
        } else {
            None
        }
    }

    pub fn users(&self) -> BTreeSet<String> {
        self.owners
            .iter()
            .chain(&self.members)
            .chain(&self.guests)
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapInfo {
    pub id: MapId,
    pub project_id: ProjectId,
    pub name: String,
    /// Number of source codes; the largest valid row index.
    pub code_set_size: u64,
}

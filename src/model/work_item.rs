use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::WorkItemState;

/// Coarse category of a work item, derived from its raw type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Bug,
    Feature,
    Other,
}

impl TaskType {
    /// Total lookup: unknown type names fall back to `Other`.
    pub fn from_type_name(name: &str) -> Self {
        match name {
            "Bug" | "Defect" => TaskType::Bug,
            "Feature" | "Epic" => TaskType::Feature,
            "Story" | "Task" => TaskType::Other,
            _ => TaskType::Other,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<WorkItemState>,
    /// Raw type name as reported by Azure DevOps (e.g. "User Story").
    pub kind: String,
    pub task_type: TaskType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
    /// Only meaningful for the response that produced this value.
    pub revision: u32,
    /// Browser link to the item, filled in by the repository layer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_url: Option<String>,
    /// URL of the repository the item was fetched through, filled in by the repository layer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
}

impl WorkItem {
    pub fn is_closed(&self) -> bool {
        self.state.as_ref().is_some_and(WorkItemState::is_closed)
    }

    pub fn is_issue(&self) -> bool {
        self.issue_url.is_some()
    }
}

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{ClientError, Result};
use crate::model::{TaskType, WorkItem, WorkItemState};

/// Work item ids are numbers on the wire but opaque strings to callers.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(u64),
    Text(String),
}

impl From<RawId> for String {
    fn from(id: RawId) -> Self {
        match id {
            RawId::Number(n) => n.to_string(),
            RawId::Text(s) => s,
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct RawWorkItem {
    id: RawId,
    rev: u32,
    #[serde(default)]
    fields: RawFields,
}

#[derive(Deserialize, Default)]
struct RawFields {
    #[serde(rename = "System.Title")]
    title: Option<String>,
    #[serde(rename = "System.Description")]
    description: Option<String>,
    #[serde(rename = "System.State")]
    state: Option<String>,
    #[serde(rename = "System.WorkItemType")]
    work_item_type: Option<String>,
    #[serde(rename = "System.CreatedDate")]
    created: Option<String>,
    #[serde(rename = "System.ChangedDate")]
    changed: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct ValueList<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

#[derive(Deserialize)]
pub(crate) struct RawState {
    name: String,
}

#[derive(Deserialize)]
pub(crate) struct WiqlResult {
    #[serde(rename = "workItems", default)]
    pub work_items: Vec<ItemLink>,
}

/// Stub returned by WIQL: just enough to resolve the full record.
#[derive(Deserialize)]
pub(crate) struct ItemLink {
    id: RawId,
}

impl ItemLink {
    pub fn into_id(self) -> String {
        self.id.into()
    }
}

/// Empty or missing timestamps map to `None`.
fn parse_instant(raw: Option<String>) -> Result<Option<DateTime<Utc>>> {
    match raw.filter(|s| !s.trim().is_empty()) {
        None => Ok(None),
        Some(value) => DateTime::parse_from_rfc3339(&value)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|source| ClientError::InvalidTimestamp { value, source }),
    }
}

impl RawWorkItem {
    pub fn into_work_item(self) -> Result<WorkItem> {
        let fields = self.fields;
        let kind = fields.work_item_type.unwrap_or_default();

        Ok(WorkItem {
            id: self.id.into(),
            summary: fields.title.unwrap_or_default(),
            description: fields.description,
            state: fields.state.map(WorkItemState::from_name),
            task_type: TaskType::from_type_name(&kind),
            kind,
            created: parse_instant(fields.created)?,
            updated: parse_instant(fields.changed)?,
            revision: self.rev,
            issue_url: None,
            repository: None,
        })
    }
}

impl From<RawState> for WorkItemState {
    fn from(state: RawState) -> Self {
        WorkItemState::from_name(state.name)
    }
}

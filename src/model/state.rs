use serde::{Deserialize, Serialize};

/// A state a work item can be in. Azure DevOps identifies states by name, so
/// `id` and `label` carry the same value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WorkItemState {
    pub id: String,
    pub label: String,
}

impl WorkItemState {
    pub fn from_name(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            label: name,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.label.eq_ignore_ascii_case("closed") || self.label.eq_ignore_ascii_case("resolved")
    }
}

impl std::fmt::Display for WorkItemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label)
    }
}

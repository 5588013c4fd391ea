use serde::Serialize;
use serde_json::Value;

pub const JSON_PATCH_CONTENT_TYPE: &str = "application/json-patch+json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Test,
    Replace,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchOperation {
    pub op: PatchOp,
    pub path: &'static str,
    pub value: Value,
}

impl PatchOperation {
    pub fn test_revision(revision: u32) -> Self {
        Self {
            op: PatchOp::Test,
            path: "/rev",
            value: Value::from(revision),
        }
    }

    pub fn replace_state(state: &str) -> Self {
        Self {
            op: PatchOp::Replace,
            path: "/fields/System.State",
            value: Value::from(state),
        }
    }
}

/// Patch that moves a work item to `state`. With `expected_revision`, a `test`
/// on `/rev` comes first so the server rejects the whole patch if the item has
/// moved on; without it the write is unconditional.
pub fn set_state(state: &str, expected_revision: Option<u32>) -> Vec<PatchOperation> {
    expected_revision
        .map(PatchOperation::test_revision)
        .into_iter()
        .chain(std::iter::once(PatchOperation::replace_state(state)))
        .collect()
}

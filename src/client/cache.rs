use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use crate::model::WorkItemState;

/// Valid states per work item type, filled on first lookup of each type.
///
/// Not authoritative: entries never expire, so state definitions changed on the
/// server mid-session are not picked up. Unbounded, but a project only has a
/// handful of types. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct StateCache {
    inner: Arc<RwLock<HashMap<String, BTreeSet<WorkItemState>>>>,
}

impl StateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: &str) -> Option<BTreeSet<WorkItemState>> {
        let map = match self.inner.read() {
            Ok(map) => map,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.get(kind).cloned()
    }

    /// Stores `states` unless another caller got there first; returns what is cached.
    pub fn insert(&self, kind: &str, states: BTreeSet<WorkItemState>) -> BTreeSet<WorkItemState> {
        let mut map = match self.inner.write() {
            Ok(map) => map,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.entry(kind.to_string()).or_insert(states).clone()
    }

    pub fn len(&self) -> usize {
        match self.inner.read() {
            Ok(map) => map.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

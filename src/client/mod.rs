//! Client for the Azure DevOps work item tracking REST API.
//!
//! Every call is a live round trip. Reads that come back 404 report absence
//! (`None`, an empty list, `false`); any other non-2xx status is an error
//! carrying the raw body. Nothing is retried.

pub mod cache;
mod mapper;
pub mod patch;
pub mod query;
pub mod response;
pub mod transport;

use std::collections::BTreeSet;
use std::sync::Arc;

use reqwest::Method;
use secrecy::SecretString;

use crate::error::{ClientError, Result};
use crate::model::{WorkItem, WorkItemState};
use cache::StateCache;
use mapper::{RawState, RawWorkItem, ValueList, WiqlResult};
use patch::JSON_PATCH_CONTENT_TYPE;
use query::WorkItemQuery;
use response::{classify, parse_json, Classified};
use transport::{encode_segment, ApiRequest, HttpTransport, Transport, DEFAULT_SERVER_URL};

const WORK_ITEMS_API_VERSION: &str = "7.2-preview.3";

pub struct AzureDevOpsClient {
    project: String,
    transport: Arc<dyn Transport>,
    states: StateCache,
}

impl AzureDevOpsClient {
    /// Client for `https://dev.azure.com/{team}/`. The connection pool lives until
    /// [`close`](Self::close) is called or the client is dropped.
    pub fn new(team: &str, project: &str, token: &SecretString) -> Result<Self> {
        Self::with_server(DEFAULT_SERVER_URL, team, project, token)
    }

    pub fn with_server(
        server_url: &str,
        team: &str,
        project: &str,
        token: &SecretString,
    ) -> Result<Self> {
        let transport = HttpTransport::new(server_url, team, token)?;
        Ok(Self::with_transport(project, Arc::new(transport)))
    }

    pub fn with_transport(project: &str, transport: Arc<dyn Transport>) -> Self {
        Self {
            project: encode_segment(project),
            transport,
            states: StateCache::new(),
        }
    }

    /// Shares `cache` with this client so state lookups survive across clients.
    pub fn with_state_cache(mut self, cache: StateCache) -> Self {
        self.states = cache;
        self
    }

    pub fn state_cache(&self) -> &StateCache {
        &self.states
    }

    async fn execute(&self, request: ApiRequest) -> Result<Classified> {
        let response = self.transport.execute(request).await?;
        classify(response)
    }

    /// Cheap availability probe: lists projects, which every user can see.
    pub async fn ping(&self) -> Result<()> {
        self.execute(ApiRequest::get("_apis/projects?api-version=2.0")).await?;
        Ok(())
    }

    /// Runs `query` and resolves the matching items with a single batch request.
    pub async fn query_work_items(&self, query: &WorkItemQuery) -> Result<Vec<WorkItem>> {
        let request = ApiRequest::get("_apis/wit/wiql/?api-version=7.2-preview.2")
            .with_method(Method::POST)
            .with_body("application/json", query.to_body());

        let Some(body) = self.execute(request).await?.into_body() else {
            return Ok(Vec::new());
        };

        let result: WiqlResult = parse_json(&body, "query result")?;
        let ids: Vec<String> = result.work_items.into_iter().map(|l| l.into_id()).collect();
        tracing::debug!(matches = ids.len(), "work item query complete");

        self.get_work_items(&ids).await
    }

    /// Fetches one work item, or `None` if it does not exist.
    pub async fn get_work_item(&self, id: &str) -> Result<Option<WorkItem>> {
        let path = format!(
            "{}/_apis/wit/workitems/{}/?api-version={WORK_ITEMS_API_VERSION}",
            self.project,
            encode_segment(id)
        );

        match self.execute(ApiRequest::get(path)).await? {
            Classified::Absent => Ok(None),
            Classified::Success(body) => {
                let raw: RawWorkItem = parse_json(&body, "work item")?;
                raw.into_work_item().map(Some)
            }
        }
    }

    /// Fetches all `ids` in one request, in the order the server returns them.
    pub async fn get_work_items<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<WorkItem>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let csv = ids
            .iter()
            .map(|id| encode_segment(id.as_ref()))
            .collect::<Vec<_>>()
            .join(",");
        let path = format!(
            "{}/_apis/wit/workitems/?ids={csv}&api-version={WORK_ITEMS_API_VERSION}",
            self.project
        );

        let Some(body) = self.execute(ApiRequest::get(path)).await?.into_body() else {
            return Ok(Vec::new());
        };

        let list: ValueList<RawWorkItem> = parse_json(&body, "work item list")?;
        list.value
            .into_iter()
            .map(RawWorkItem::into_work_item)
            .collect()
    }

    /// Lists the valid states for a work item type, always asking the server.
    pub async fn get_work_item_states(
        &self,
        kind: &str,
    ) -> Result<Option<BTreeSet<WorkItemState>>> {
        let path = format!(
            "{}/_apis/wit/workitemtypes/{}/states?api-version=7.2-preview.1",
            self.project,
            encode_segment(kind)
        );

        let Some(body) = self.execute(ApiRequest::get(path)).await?.into_body() else {
            return Ok(None);
        };

        let list: ValueList<RawState> = parse_json(&body, "work item states")?;
        Ok(Some(list.value.into_iter().map(WorkItemState::from).collect()))
    }

    /// Valid states for `kind`, served from the state cache after the first lookup.
    /// An unknown type yields an empty set and is not cached.
    pub async fn get_states_for_type(&self, kind: &str) -> Result<BTreeSet<WorkItemState>> {
        if let Some(states) = self.states.get(kind) {
            return Ok(states);
        }

        match self.get_work_item_states(kind).await? {
            Some(states) => Ok(self.states.insert(kind, states)),
            None => Ok(BTreeSet::new()),
        }
    }

    /// Moves a work item to `state`.
    ///
    /// With `expected_revision` the update only applies if the item is still at
    /// that revision. Returns `false` on 404, which covers both a missing item and
    /// a failed revision check.
    pub async fn set_work_item_state(
        &self,
        id: &str,
        state: &str,
        expected_revision: Option<u32>,
    ) -> Result<bool> {
        let ops = patch::set_state(state, expected_revision);
        let body = serde_json::to_string(&ops).map_err(|source| ClientError::Encode {
            context: "patch document",
            source,
        })?;

        let path = format!(
            "{}/_apis/wit/workitems/{}?api-version={WORK_ITEMS_API_VERSION}",
            self.project,
            encode_segment(id)
        );
        let request = ApiRequest::get(path)
            .with_method(Method::PATCH)
            .with_body(JSON_PATCH_CONTENT_TYPE, body);

        let applied = matches!(self.execute(request).await?, Classified::Success(_));
        tracing::info!(id, state, ?expected_revision, applied, "set work item state");
        Ok(applied)
    }

    /// Releases the connection pool. Later calls fail with `ClientError::Closed`.
    pub fn close(&self) {
        self.transport.close();
    }
}

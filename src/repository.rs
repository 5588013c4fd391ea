//! Adapter between a host (the CLI, an editor plugin, ...) and the client.
//!
//! The repository owns the connection settings and the state cache. Every
//! operation opens a fresh client and releases it when the operation ends,
//! including when the operation's future is dropped mid-flight.

use std::collections::BTreeSet;
use std::ops::Deref;

use secrecy::{ExposeSecret, SecretString};

use crate::cancel::{run_cancellable, CancelToken};
use crate::client::cache::StateCache;
use crate::client::query::WorkItemQuery;
use crate::client::transport::{encode_segment, DEFAULT_SERVER_URL};
use crate::client::AzureDevOpsClient;
use crate::config::AppConfig;
use crate::error::{ClientError, Result};
use crate::model::{WorkItem, WorkItemState};

#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    pub team: Option<String>,
    pub project: Option<String>,
    pub access_token: Option<SecretString>,
    pub server_url: String,
    pub preferred_open_state: Option<WorkItemState>,
    pub preferred_close_state: Option<WorkItemState>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            team: None,
            project: None,
            access_token: None,
            server_url: DEFAULT_SERVER_URL.to_string(),
            preferred_open_state: None,
            preferred_close_state: None,
        }
    }
}

impl From<&AppConfig> for RepositoryConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            team: config.team.clone(),
            project: config.project.clone(),
            access_token: config.access_token.clone(),
            server_url: config.server_url().to_string(),
            preferred_open_state: config
                .preferred_open_state
                .as_deref()
                .map(WorkItemState::from_name),
            preferred_close_state: config
                .preferred_close_state
                .as_deref()
                .map(WorkItemState::from_name),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// A client that is closed when dropped.
pub struct ClientSession(AzureDevOpsClient);

impl Deref for ClientSession {
    type Target = AzureDevOpsClient;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        self.0.close();
    }
}

pub struct WorkItemRepository {
    config: RepositoryConfig,
    state_cache: StateCache,
}

impl WorkItemRepository {
    pub fn new(config: RepositoryConfig) -> Self {
        Self {
            config,
            state_cache: StateCache::new(),
        }
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn is_configured(&self) -> bool {
        non_empty(&self.config.team).is_some()
            && non_empty(&self.config.project).is_some()
            && self
                .config
                .access_token
                .as_ref()
                .is_some_and(|t| !t.expose_secret().is_empty())
    }

    /// Web URL of the project, with placeholders for missing settings.
    pub fn url(&self) -> String {
        let team = non_empty(&self.config.team).map_or_else(|| "<team-id>".into(), encode_segment);
        let project =
            non_empty(&self.config.project).map_or_else(|| "<project-id>".into(), encode_segment);
        format!(
            "{}/{team}/{project}/",
            self.config.server_url.trim_end_matches('/')
        )
    }

    /// Task names look like `"123: Fix login"`; the id is everything before the first colon.
    pub fn extract_id(task_name: &str) -> &str {
        task_name
            .split_once(':')
            .map_or(task_name, |(id, _)| id)
            .trim()
    }

    pub fn preferred_open_state(&self) -> Option<&WorkItemState> {
        self.config.preferred_open_state.as_ref()
    }

    pub fn set_preferred_open_state(&mut self, state: Option<WorkItemState>) {
        self.config.preferred_open_state = state;
    }

    pub fn preferred_close_state(&self) -> Option<&WorkItemState> {
        self.config.preferred_close_state.as_ref()
    }

    pub fn set_preferred_close_state(&mut self, state: Option<WorkItemState>) {
        self.config.preferred_close_state = state;
    }

    fn new_client(&self) -> Result<AzureDevOpsClient> {
        let team = non_empty(&self.config.team).ok_or(ClientError::NotConfigured("team"))?;
        let project =
            non_empty(&self.config.project).ok_or(ClientError::NotConfigured("project"))?;
        let token = self
            .config
            .access_token
            .as_ref()
            .filter(|t| !t.expose_secret().is_empty())
            .ok_or(ClientError::NotConfigured("access token"))?;

        let client = AzureDevOpsClient::with_server(&self.config.server_url, team, project, token)?;
        Ok(client.with_state_cache(self.state_cache.clone()))
    }

    /// Opens a client for one operation. Fails before any network call when unconfigured.
    pub fn open_client(&self) -> Result<ClientSession> {
        self.new_client().map(ClientSession)
    }

    fn attach(&self, item: &mut WorkItem) {
        let url = self.url();
        item.issue_url = Some(format!("{url}_workitems/edit/{}", item.id));
        item.repository = Some(url);
    }

    /// Work items assigned to the current user, optionally narrowed by title.
    pub async fn get_issues(
        &self,
        query: Option<&str>,
        with_closed: bool,
    ) -> Result<Vec<WorkItem>> {
        let client = self.open_client()?;
        let mut items = client
            .query_work_items(&WorkItemQuery::new(query, with_closed))
            .await?;
        for item in &mut items {
            self.attach(item);
        }
        Ok(items)
    }

    pub async fn find_task(&self, id: &str) -> Result<Option<WorkItem>> {
        let client = self.open_client()?;
        let mut item = client.get_work_item(id).await?;
        if let Some(item) = item.as_mut() {
            self.attach(item);
        }
        Ok(item)
    }

    /// States the task can move to. Re-fetches the item to learn its type.
    pub async fn available_states(&self, id: &str) -> Result<BTreeSet<WorkItemState>> {
        let client = self.open_client()?;
        match client.get_work_item(id).await? {
            Some(item) => client.get_states_for_type(&item.kind).await,
            None => Ok(BTreeSet::new()),
        }
    }

    /// Unconditionally moves the task to `state`. `false` if the task does not exist.
    pub async fn set_task_state(&self, id: &str, state: &WorkItemState) -> Result<bool> {
        let client = self.open_client()?;
        client.set_work_item_state(id, &state.id, None).await
    }

    /// Revision-guarded variant of [`set_task_state`](Self::set_task_state).
    pub async fn set_task_state_if_unchanged(
        &self,
        id: &str,
        state: &WorkItemState,
        revision: u32,
    ) -> Result<bool> {
        let client = self.open_client()?;
        client.set_work_item_state(id, &state.id, Some(revision)).await
    }

    pub fn connection_test(&self) -> Result<ConnectionTest> {
        Ok(ConnectionTest {
            client: self.new_client()?,
            token: CancelToken::new(),
        })
    }
}

/// A connectivity check that another task can abort.
pub struct ConnectionTest {
    client: AzureDevOpsClient,
    token: CancelToken,
}

impl ConnectionTest {
    /// Pings the server. Resolves to `Cancelled` if [`cancel`](Self::cancel) fires first.
    pub async fn run(&self) -> Result<()> {
        let result = run_cancellable(self.client.ping(), &self.token).await;
        if !self.token.is_cancelled() {
            self.client.close();
        }
        result
    }

    pub fn cancel(&self) {
        self.token.cancel();
        self.client.close();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.token.clone()
    }
}

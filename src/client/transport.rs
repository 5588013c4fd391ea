use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Url};
use secrecy::{ExposeSecret, SecretString};

use crate::error::{ClientError, Result};

pub const DEFAULT_SERVER_URL: &str = "https://dev.azure.com";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A request relative to the team base URL. Defaults to a bodiless GET.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub content_type: Option<&'static str>,
    pub body: Option<String>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            content_type: None,
            body: None,
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_body(mut self, content_type: &'static str, body: String) -> Self {
        self.content_type = Some(content_type);
        self.body = Some(body);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Executes one request per call. No retries happen at this layer.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse>;

    /// Releases the underlying connection pool. Safe to call more than once.
    fn close(&self) {}
}

/// Percent-encodes a single path segment (spaces become `%20`).
pub fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

/// `Basic` credentials with an empty user name, as Azure DevOps expects for PATs.
pub fn basic_auth_header(token: &SecretString) -> String {
    let creds = format!(":{}", token.expose_secret());
    let encoded = base64::engine::general_purpose::STANDARD.encode(creds);
    format!("Basic {encoded}")
}

/// Transport backed by a pooled `reqwest::Client`.
pub struct HttpTransport {
    base_url: Url,
    auth_header: HeaderValue,
    client: Mutex<Option<reqwest::Client>>,
}

impl HttpTransport {
    /// Transport for `{server_url}/{team}/`.
    pub fn new(server_url: &str, team: &str, token: &SecretString) -> Result<Self> {
        let base = format!(
            "{}/{}/",
            server_url.trim_end_matches('/'),
            encode_segment(team)
        );
        Self::with_base_url(&base, token)
    }

    pub fn with_base_url(base_url: &str, token: &SecretString) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|source| ClientError::InvalidUrl {
            url: base_url.to_string(),
            source,
        })?;

        let mut auth_header = HeaderValue::from_str(&basic_auth_header(token))
            .map_err(|_| ClientError::NotConfigured("a valid access token"))?;
        auth_header.set_sensitive(true);

        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self {
            base_url,
            auth_header,
            client: Mutex::new(Some(client)),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn resolve(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|source| ClientError::InvalidUrl {
                url: path.to_string(),
                source,
            })
    }

    fn pooled_client(&self) -> Result<reqwest::Client> {
        let guard = self.client.lock().map_err(|_| ClientError::Closed)?;
        guard.clone().ok_or(ClientError::Closed)
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url.as_str())
            .field("auth_header", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let client = self.pooled_client()?;
        let url = self.resolve(&request.path)?;

        let mut builder = client
            .request(request.method.clone(), url)
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, self.auth_header.clone());
        if let Some(content_type) = request.content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;

        tracing::debug!(method = %request.method, path = %request.path, status, "azure devops request");

        Ok(ApiResponse { status, body })
    }

    fn close(&self) {
        // A poisoned lock still lets us drop the pool.
        let mut guard = match self.client.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.take().is_some() {
            tracing::debug!(base_url = %self.base_url, "closed http transport");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    #[test]
    fn auth_header_uses_empty_user_name() {
        // base64(":token")
        assert_eq!(basic_auth_header(&token("token")), "Basic OnRva2Vu");
    }

    #[test]
    fn segments_encode_spaces() {
        assert_eq!(encode_segment("My Project"), "My%20Project");
        assert_eq!(encode_segment("plain"), "plain");
    }

    #[test]
    fn relative_paths_resolve_under_the_team() {
        let transport = HttpTransport::new(DEFAULT_SERVER_URL, "My Team", &token("t")).unwrap();
        assert_eq!(transport.base_url().as_str(), "https://dev.azure.com/My%20Team/");

        let url = transport
            .resolve("My%20Project/_apis/wit/workitems/?ids=1,2,3&api-version=7.2-preview.3")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://dev.azure.com/My%20Team/My%20Project/_apis/wit/workitems/?ids=1,2,3&api-version=7.2-preview.3"
        );
    }

    #[test]
    fn trailing_slash_on_server_url_is_ignored() {
        let transport = HttpTransport::new("http://localhost:8080/", "team", &token("t")).unwrap();
        assert_eq!(transport.base_url().as_str(), "http://localhost:8080/team/");
    }

    #[test]
    fn debug_output_redacts_credentials() {
        let transport = HttpTransport::new(DEFAULT_SERVER_URL, "team", &token("hunter2")).unwrap();
        let debug = format!("{transport:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("Omh1bnRlcjI"));
    }

    #[tokio::test]
    async fn execute_after_close_fails() {
        let transport = HttpTransport::new(DEFAULT_SERVER_URL, "team", &token("t")).unwrap();
        transport.close();
        transport.close();
        let err = transport
            .execute(ApiRequest::get("_apis/projects?api-version=2.0"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Closed));
    }

    #[test]
    fn request_customization_sets_method_and_body() {
        let req = ApiRequest::get("x")
            .with_method(Method::PATCH)
            .with_body("application/json-patch+json", "[]".into());
        assert_eq!(req.method, Method::PATCH);
        assert_eq!(req.content_type, Some("application/json-patch+json"));
        assert_eq!(req.body.as_deref(), Some("[]"));
    }
}

//! Single HTTP exchanges with bearer authentication. No retries here.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client as ReqwestClient, Method};
use serde_json::Value;
use sheetsync_domain::constants::DEFAULT_REQUEST_TIMEOUT_SECS;
use sheetsync_domain::Result;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::errors::InfraError;

/// One logical request, replayable across retries.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the transport's base URL, e.g. `/Clients`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Per-call timeout; the transport default applies when `None`.
    pub timeout: Option<Duration>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), query: Vec::new(), body: None, timeout: None }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Raw response; status interpretation belongs to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    /// `Retry-After` in whole seconds, when present.
    pub retry_after: Option<Duration>,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, retry_after: None, body: body.into() }
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Failure before any HTTP status was received.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("network error: {0}")]
    Network(String),
    /// The request could not be built; retrying cannot help.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    pub const fn is_transient(&self) -> bool {
        !matches!(self, Self::InvalidRequest(_))
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> std::result::Result<ApiResponse, TransportError>;
}

/// [`Transport`] over a shared `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: ReqwestClient,
    base_url: Url,
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport").field("base_url", &self.base_url.as_str()).finish()
    }
}

impl ReqwestTransport {
    pub fn builder(base_url: impl Into<String>) -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::new(base_url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, request: &ApiRequest) -> std::result::Result<Url, TransportError> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            request.path.trim_start_matches('/')
        );
        let mut url =
            Url::parse(&joined).map_err(|err| TransportError::InvalidRequest(err.to_string()))?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(request.query.iter());
        }
        Ok(url)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> std::result::Result<ApiResponse, TransportError> {
        let url = self.url_for(request)?;
        debug!(method = %request.method, %url, "sending HTTP request");

        let mut builder = self.client.request(request.method.clone(), url);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = response.text().await?;

        debug!(status, bytes = body.len(), "received HTTP response");
        Ok(ApiResponse { status, retry_after, body })
    }
}

/// Builder for [`ReqwestTransport`].
#[derive(Debug)]
pub struct ReqwestTransportBuilder {
    base_url: String,
    bearer_token: Option<String>,
    timeout: Duration,
    user_agent: Option<String>,
}

impl ReqwestTransportBuilder {
    fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            bearer_token: None,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: None,
        }
    }

    #[must_use]
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// # Errors
    /// `SheetSyncError::Config` for an unparsable base URL, a token that is
    /// not a valid header value, or a client that fails to initialise.
    pub fn build(self) -> Result<ReqwestTransport> {
        let base_url = Url::parse(&self.base_url).map_err(InfraError::from)?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = self.bearer_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                sheetsync_domain::SheetSyncError::Config(
                    "bearer token contains invalid header characters".into(),
                )
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = ReqwestClient::builder().timeout(self.timeout).default_headers(headers);
        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }
        let client = builder.build().map_err(InfraError::from)?;

        Ok(ReqwestTransport { client, base_url })
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn sends_bearer_query_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/Clients"))
            .and(query_param("$top", "1"))
            .and(header("authorization", "Bearer secret"))
            .and(header("accept", "application/json"))
            .and(body_json(json!({"Name": "ACME"})))
            .respond_with(
                ResponseTemplate::new(429).insert_header("Retry-After", "3").set_body_string("slow"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let transport = ReqwestTransport::builder(format!("{}/api/", server.uri()))
            .bearer_token("secret")
            .build()
            .expect("transport");
        let response = transport
            .send(&ApiRequest::new(Method::POST, "/Clients").query("$top", 1).json(json!({"Name": "ACME"})))
            .await
            .expect("response");

        assert_eq!(response.status, 429);
        assert_eq!(response.retry_after, Some(Duration::from_secs(3)));
        assert_eq!(response.body, "slow");
    }

    #[tokio::test]
    async fn connection_refused_is_transient() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = ReqwestTransport::builder(format!("http://{addr}")).build().unwrap();
        let err = transport.send(&ApiRequest::get("/Warehouses")).await.unwrap_err();
        assert!(err.is_transient(), "unexpected {err:?}");
    }

    #[test]
    fn invalid_base_url_is_a_config_error() {
        let err = ReqwestTransport::builder("::nope::").build().unwrap_err();
        assert_eq!(err.category(), "config");
    }
}

//! HTTP query endpoint backed by `reqwest`.
//!
//! Targets management APIs that accept `POST` requests with a JSON body of
//! the form `{"query": "<sql>"}` and a bearer token, such as the Supabase
//! `database/query` endpoint.
//!
//! This module is gated behind the `client` feature.

use alloc::format;
use alloc::string::{String, ToString};
use core::time::Duration;

use serde::Serialize;

use crate::response::QueryResponse;
use crate::upload::QueryEndpoint;

/// Base URL of the Supabase management API.
pub const MANAGEMENT_API_BASE: &str = "https://api.supabase.com/v1";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Default `User-Agent` header value.
pub const DEFAULT_USER_AGENT: &str = concat!("seed-loader/", env!("CARGO_PKG_VERSION"));

/// Query endpoint URL of a Supabase project.
#[must_use]
pub fn management_api_url(project_ref: &str) -> String {
    format!(
        "{MANAGEMENT_API_BASE}/projects/{}/database/query",
        project_ref.trim()
    )
}

/// Connection settings of a [`ManagementApiClient`].
#[derive(Clone)]
pub struct ClientConfig {
    /// Full URL of the query endpoint.
    pub endpoint: String,
    /// Bearer token sent in the `Authorization` header.
    pub token: String,
    /// Maximum time to wait for one response.
    pub timeout: Duration,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl core::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("token", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl ClientConfig {
    /// Settings with the default timeout and user agent.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token: token.into(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the `User-Agent` header value.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Errors raised while talking to the query endpoint.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
    /// Connection, TLS, timeout or body transfer failure.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
}

/// [`QueryEndpoint`] that posts queries to an HTTP management API.
#[derive(Debug, Clone)]
pub struct ManagementApiClient {
    config: ClientConfig,
    client: reqwest::Client,
}

impl ManagementApiClient {
    /// Build a client from its settings.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Build`] if the TLS backend cannot be
    /// initialised.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(ClientError::Build)?;
        Ok(Self { config, client })
    }

    /// The settings of this client.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl QueryEndpoint for ManagementApiClient {
    type Error = ClientError;

    async fn execute(&self, query: &str) -> Result<QueryResponse, ClientError> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&QueryRequest { query })
            .send()
            .await?;

        let status = response.status();
        let body = if status.is_success() {
            response.text().await?
        } else {
            response.text().await.unwrap_or_default()
        };
        Ok(QueryResponse::from_http(status.as_u16(), &body))
    }
}

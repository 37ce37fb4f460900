use std::fmt::{self, Debug};
use std::sync::Arc;

use reqwest::{Client, StatusCode};
use scheduler_agent_core::tool::Error as ToolError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The public Tavily endpoint.
pub const DEFAULT_TAVILY_BASE_URL: &str = "https://api.tavily.com";

/// Credentials and endpoint of the Tavily search API.
///
/// A missing key is allowed here; search calls fail with a
/// configuration error instead, so the rest of the toolbox stays usable.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TavilyConfig {
    api_key: Option<String>,
    base_url: String,
}

impl TavilyConfig {
    /// Creates a configuration for the public endpoint.
    ///
    /// Empty keys are treated as absent.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            base_url: DEFAULT_TAVILY_BASE_URL.to_owned(),
        }
    }

    /// Sets a custom endpoint.
    #[inline]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    /// Returns `true` if an API key is configured.
    #[inline]
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Returns the endpoint.
    #[inline]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Debug for TavilyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TavilyConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    search_depth: &'static str,
    include_answer: bool,
    include_raw_content: bool,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Value>,
}

/// A minimal Tavily search client.
#[derive(Clone, Debug)]
pub struct TavilyClient {
    client: Client,
    config: Arc<TavilyConfig>,
}

impl TavilyClient {
    /// Creates a client with the given configuration.
    #[inline]
    pub fn new(config: TavilyConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }

    /// Returns the configuration of this client.
    #[inline]
    pub fn config(&self) -> &TavilyConfig {
        &self.config
    }

    /// Runs an advanced search and returns the `results` array.
    ///
    /// Missing or rejected credentials and an unreachable endpoint fail
    /// with a `Configuration` error. Everything else is an
    /// `ExecutionError`.
    pub fn search(
        &self,
        query: String,
    ) -> impl Future<Output = Result<Vec<Value>, ToolError>> + Send + 'static
    {
        let client = self.client.clone();
        let config = Arc::clone(&self.config);
        async move {
            let Some(api_key) = config.api_key.as_deref() else {
                return Err(ToolError::configuration()
                    .with_reason("TAVILY_API_KEY is not set"));
            };

            debug!(%query, "searching");
            let resp = client
                .post(format!("{}/search", config.base_url))
                .bearer_auth(api_key)
                .json(&SearchRequest {
                    query: &query,
                    search_depth: "advanced",
                    include_answer: true,
                    include_raw_content: true,
                })
                .send()
                .await
                .map_err(|err| {
                    if err.is_connect() {
                        ToolError::configuration().with_reason(format!(
                            "search endpoint {} is unreachable: {err}",
                            config.base_url
                        ))
                    } else {
                        ToolError::execution_error()
                            .with_reason(format!("search request failed: {err}"))
                    }
                })?;

            let status = resp.status();
            if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
            {
                return Err(ToolError::configuration().with_reason(format!(
                    "search endpoint rejected the API key (HTTP {status})"
                )));
            }
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(ToolError::execution_error().with_reason(format!(
                    "search failed with HTTP {status}: {}",
                    body.trim()
                )));
            }

            let body: SearchResponse = resp.json().await.map_err(|err| {
                ToolError::execution_error()
                    .with_reason(format!("invalid search response: {err}"))
            })?;
            trace!(results = body.results.len(), "search finished");
            Ok(body.results)
        }
    }
}

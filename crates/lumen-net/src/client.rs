//! The reqwest-backed production fetcher.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::{Fetch, NetError, Request, Response};

/// Fetcher configuration.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// User agent string.
    pub user_agent: String,
    /// Accept-Language header.
    pub accept_language: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("LumenWorker/{}", env!("CARGO_PKG_VERSION")),
            accept_language: "en-US,en;q=0.9".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Live-network fetcher.
pub struct HttpFetcher {
    config: FetcherConfig,
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher with default configuration.
    pub fn new() -> Result<Self, NetError> {
        Self::with_config(FetcherConfig::default())
    }

    /// Create a fetcher with custom configuration.
    pub fn with_config(config: FetcherConfig) -> Result<Self, NetError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, NetError> {
        debug!(method = %request.method, url = %request.url, "Network fetch");

        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone())
            .header("accept-language", self.config.accept_language.as_str());

        if let Some(ref body) = request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                NetError::Timeout(self.config.timeout)
            } else if e.is_connect() {
                NetError::Unreachable
            } else {
                NetError::HttpError(e)
            }
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let url = request.url.clone();
        let body = response.bytes().await?;

        trace!(status = %status, body_len = body.len(), "Network response");

        Ok(Response {
            url,
            status,
            headers,
            body,
        })
    }
}

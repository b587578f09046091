//! Upstream page fetching.

use crate::{Error, Result, ServiceConfig, UpstreamResponse};
use async_trait::async_trait;
use log::debug;
use std::time::Duration;

/// Source of upstream documentation pages
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// GET `path` from the upstream site and buffer the whole body.
    ///
    /// Any HTTP status is a successful fetch; only transport failures are errors.
    async fn fetch(&self, path: &str) -> Result<UpstreamResponse>;
}

/// `reqwest`-backed fetcher pinned to one upstream host
pub struct HttpFetcher {
    client: reqwest::Client,
    base: String,
    timeout_ms: u64,
}

impl HttpFetcher {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.fetch_timeout_ms))
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| Error::InitializationError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base: config.upstream_base.clone(),
            timeout_ms: config.fetch_timeout_ms,
        })
    }

    /// Upstream URL for `path`.
    ///
    /// Plain concatenation keeps paths such as `//other.host/x` on the
    /// configured host.
    pub fn url_for(&self, path: &str) -> Result<url::Url> {
        let raw = format!("{}{}", self.base, path);
        url::Url::parse(&raw).map_err(|e| Error::NetworkError(format!("Bad upstream URL {}: {}", raw, e)))
    }

    fn map_err(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout(self.timeout_ms)
        } else {
            Error::NetworkError(format!("HTTP GET failed: {}", err))
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, path: &str) -> Result<UpstreamResponse> {
        let url = self.url_for(path)?;
        debug!("fetching {}", url);

        let res = self.client.get(url).send().await.map_err(|e| self.map_err(e))?;
        let status = res.status().as_u16();
        let body = res.text().await.map_err(|e| self.map_err(e))?;

        Ok(UpstreamResponse { body, status })
    }
}

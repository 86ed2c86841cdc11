//! Page retrieval
//!
//! One idempotent operation, `GET <path> -> full page markup`, reused
//! unmodified by both prefetch and navigation. There is no dedicated
//! prefetch endpoint or partial-payload format, and no retry logic: every
//! fetch is single-shot.

use crate::{FetchConfig, Result, RouterError};
use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::{Client, StatusCode};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Retrieval seam between the router and the network
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the full markup for a page path
    async fn fetch_page(&self, path: &str) -> Result<String>;
}

/// HTTP page fetcher
pub struct HttpFetcher {
    client: Client,
    base_url: String,
}

impl HttpFetcher {
    /// Build a fetcher from the given config
    pub fn new(config: FetchConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent);

        if config.compression {
            builder = builder.gzip(true).brotli(true);
        }

        let client = builder
            .build()
            .map_err(|e| RouterError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_page(&self, path: &str) -> Result<String> {
        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        debug!(%url, "fetching page");

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        match status {
            StatusCode::NOT_FOUND => Err(RouterError::NotFound(path.to_string())),
            s if s.is_success() => Ok(response.text().await?),
            s => Err(RouterError::Http {
                status: s.as_u16(),
                message: response.text().await.unwrap_or_default(),
            }),
        }
    }
}

/// In-memory page fetcher for tests and demos
///
/// Serves payloads from a map and counts how many fetches were issued, so
/// tests can assert that cached paths never reach the network.
pub struct StaticFetcher {
    pages: DashMap<String, String>,
    calls: AtomicU64,
}

impl StaticFetcher {
    /// Create an empty fetcher
    pub fn new() -> Self {
        Self {
            pages: DashMap::new(),
            calls: AtomicU64::new(0),
        }
    }

    /// Register a page payload
    pub fn insert(&self, path: impl Into<String>, payload: impl Into<String>) {
        self.pages.insert(path.into(), payload.into());
    }

    /// Number of fetches issued so far
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

impl Default for StaticFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch_page(&self, path: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.pages
            .get(path)
            .map(|p| p.clone())
            .ok_or_else(|| RouterError::NotFound(path.to_string()))
    }
}

//! Status fetcher: cache, throttle, network and stale fallback
//!
//! The order of checks matters. A fresh cache entry is returned without
//! touching the throttle, because it puts no load on the upstream. Only the
//! network path is throttled, and every dispatched request is recorded
//! whatever its outcome. When the network path fails, the last stored
//! snapshot is returned even if it has expired.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::StatusCache;
use crate::config::UpstreamConfig;
use crate::io::HttpClient;
use crate::monitor::{MonitorRecord, UpstreamMonitorPage};
use crate::throttle::RequestThrottle;

/// Where a [`SystemStatus`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusSource {
    /// No monitor ids or no API key; nothing was looked up
    Skipped,
    /// Fresh cache hit
    Cache,
    /// Fetched from the upstream API just now
    Network,
    /// The throttle denied the request
    Throttled,
    /// Upstream failed; returning an expired snapshot
    StaleCache,
    /// Upstream failed and no snapshot was stored
    Unavailable,
}

/// Monitor records plus their provenance
///
/// An empty `monitors` list is ambiguous on its own; `source` tells a
/// throttled or failed fetch apart from a genuinely empty selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemStatus {
    pub monitors: Vec<MonitorRecord>,
    pub source: StatusSource,
}

impl SystemStatus {
    fn empty(source: StatusSource) -> Self {
        Self {
            monitors: Vec::new(),
            source,
        }
    }
}

/// Fetches monitor statuses from the uptime API through cache and throttle
pub struct StatusFetcher {
    http: Arc<dyn HttpClient>,
    cache: Arc<StatusCache>,
    throttle: Arc<RequestThrottle>,
    monitors_url: String,
    page_limit: u32,
}

impl std::fmt::Debug for StatusFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusFetcher")
            .field("monitors_url", &self.monitors_url)
            .field("page_limit", &self.page_limit)
            .finish()
    }
}

impl StatusFetcher {
    pub fn new(
        config: &UpstreamConfig,
        http: Arc<dyn HttpClient>,
        cache: Arc<StatusCache>,
        throttle: Arc<RequestThrottle>,
    ) -> Self {
        Self {
            http,
            cache,
            throttle,
            monitors_url: config.monitors_url.clone(),
            page_limit: config.page_limit,
        }
    }

    pub fn cache(&self) -> &Arc<StatusCache> {
        &self.cache
    }

    /// Fetch the requested monitors. Never fails; see [`StatusSource`].
    pub async fn fetch_system_status(&self, ids: &[String], api_key: &str) -> SystemStatus {
        if ids.is_empty() || api_key.is_empty() {
            return SystemStatus::empty(StatusSource::Skipped);
        }

        if let Some(entry) = self.cache.get().await {
            tracing::debug!("Serving {} monitors from cache", entry.payload.len());
            return SystemStatus {
                monitors: entry.payload,
                source: StatusSource::Cache,
            };
        }

        if !self.throttle.can_make_request() {
            tracing::warn!("Uptime API request throttled");
            return SystemStatus::empty(StatusSource::Throttled);
        }

        match self.request_monitors(ids, api_key).await {
            Ok(monitors) => {
                self.cache.set(monitors.clone()).await;
                tracing::info!("Fetched and cached {} monitor statuses", monitors.len());
                SystemStatus {
                    monitors,
                    source: StatusSource::Network,
                }
            }
            Err(e) => {
                tracing::warn!("Failed to fetch monitor statuses: {}", e);
                match self.cache.get_raw().await {
                    Some(entry) if !entry.payload.is_empty() => {
                        tracing::info!("Upstream unavailable, serving stale cache");
                        SystemStatus {
                            monitors: entry.payload,
                            source: StatusSource::StaleCache,
                        }
                    }
                    _ => SystemStatus::empty(StatusSource::Unavailable),
                }
            }
        }
    }

    async fn request_monitors(
        &self,
        ids: &[String],
        api_key: &str,
    ) -> crate::Result<Vec<MonitorRecord>> {
        let url = format!("{}?limit={}", self.monitors_url, self.page_limit);
        let authorization = format!("Bearer {}", api_key);
        let headers = [
            ("Authorization", authorization.as_str()),
            ("Content-Type", "application/json"),
        ];

        tracing::debug!("Requesting monitor statuses from {}", url);
        let result = self.http.get(&url, &headers).await;
        self.throttle.record_request();
        let response = result?;

        if !response.is_success() {
            return Err(crate::StatusBoardError::Upstream(format!(
                "Uptime API returned status {}",
                response.status
            )));
        }

        let page: UpstreamMonitorPage = serde_json::from_str(&response.body)?;
        Ok(page.select(ids))
    }
}

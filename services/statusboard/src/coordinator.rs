//! Refresh coordinator: one refresh cycle at a time, plus the periodic timer
//!
//! A cycle reloads targets, runs the live-status fetch and the status fetcher
//! concurrently, publishes the merged result to the board state and emits
//! notices. A call made while a cycle is running is dropped, not queued.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::fetcher::{StatusFetcher, StatusSource, SystemStatus};
use crate::live::{LiveStatusClient, Streamer};
use crate::notifier::{Notice, NoticeRecord, Notifier};
use crate::state::{ConnectionState, StateHandle};
use crate::targets::{Targets, TargetsSource};

/// Result of a call to [`RefreshCoordinator::refresh`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshOutcome {
    /// Another cycle held the lock; nothing was done
    AlreadyRunning,
    Healthy,
    Failed,
}

/// Clears the in-progress flag on every exit path, including unwinding
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Serializes refresh cycles and publishes their results
pub struct RefreshCoordinator {
    targets: Arc<dyn TargetsSource>,
    live: Arc<LiveStatusClient>,
    fetcher: Arc<StatusFetcher>,
    notifiers: Vec<Arc<dyn Notifier>>,
    state: StateHandle,
    clock: Arc<dyn Clock>,
    running: AtomicBool,
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("targets", &self.targets)
            .field("running", &self.is_refreshing())
            .finish()
    }
}

impl RefreshCoordinator {
    pub fn new(
        targets: Arc<dyn TargetsSource>,
        live: Arc<LiveStatusClient>,
        fetcher: Arc<StatusFetcher>,
        notifiers: Vec<Arc<dyn Notifier>>,
        state: StateHandle,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            targets,
            live,
            fetcher,
            notifiers,
            state,
            clock,
            running: AtomicBool::new(false),
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn state(&self) -> &StateHandle {
        &self.state
    }

    /// Run one refresh cycle unless one is already running
    ///
    /// `force_refresh` empties the cache slot first so the status fetcher
    /// cannot be served from cache; the throttle still applies.
    pub async fn refresh(&self, force_refresh: bool) -> RefreshOutcome {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Refresh already in progress, dropping request");
            return RefreshOutcome::AlreadyRunning;
        }
        let _guard = RunningGuard(&self.running);

        self.state.write().await.connection = ConnectionState::Loading;
        tracing::debug!("Refresh cycle started (force={})", force_refresh);

        let outcome = self.run_cycle(force_refresh).await;

        self.state.write().await.connection = match outcome {
            RefreshOutcome::Healthy => ConnectionState::Healthy,
            _ => ConnectionState::Error,
        };
        tracing::debug!("Refresh cycle finished: {:?}", outcome);
        outcome
    }

    async fn run_cycle(&self, force_refresh: bool) -> RefreshOutcome {
        if force_refresh {
            self.fetcher.cache().set(Vec::new()).await;
            tracing::info!("Forced refresh, cache cleared");
        }

        let targets = match self.targets.load().await {
            Ok(targets) => targets,
            Err(e) => {
                self.notify(Notice::error(
                    "Configuration",
                    format!("Failed to load configuration: {}", e),
                ))
                .await;
                Targets::default()
            }
        };

        if targets.is_empty() {
            self.notify(Notice::error("Data error", "No monitoring targets found"))
                .await;
            return RefreshOutcome::Failed;
        }

        let (live, status) = tokio::join!(
            self.live.fetch_live_status(&targets.accounts),
            self.fetcher
                .fetch_system_status(&targets.monitors, &targets.api_key),
        );

        let live = match live {
            Ok(live) => live,
            Err(e) => {
                self.notify(Notice::error(
                    "Live status",
                    format!("Failed to fetch live status: {}", e),
                ))
                .await;
                BTreeMap::new()
            }
        };

        let status = match status.source {
            StatusSource::Throttled => {
                self.notify(Notice::warning(
                    "Rate limit",
                    "API requests too frequent, using last cache",
                ))
                .await;
                // keep what the board already shows
                SystemStatus {
                    monitors: self.state.read().await.monitors.clone(),
                    source: StatusSource::Throttled,
                }
            }
            StatusSource::StaleCache => {
                self.notify(Notice::warning(
                    "Degraded",
                    "Using cached data (API temporarily unavailable)",
                ))
                .await;
                status
            }
            StatusSource::Unavailable => {
                self.notify(Notice::error("System status", "System status unavailable"))
                    .await;
                status
            }
            StatusSource::Skipped | StatusSource::Cache | StatusSource::Network => status,
        };

        let streamers = Streamer::collect(&live);
        let streamer_count = streamers.len();
        let service_count = status.monitors.len();
        let from_cache = status.source == StatusSource::Cache;
        let unavailable = status.source == StatusSource::Unavailable;

        self.state
            .write()
            .await
            .apply_refresh(streamers, status, self.clock.now_ms());

        tracing::info!(
            "Refreshed {} streamers and {} services",
            streamer_count,
            service_count
        );

        // neither network nor cache produced monitor data
        if unavailable {
            return RefreshOutcome::Failed;
        }

        if from_cache {
            if let Some(age) = self.fetcher.cache().age().await {
                self.notify(Notice::info(
                    "Cache",
                    format!("Data cached ({}s ago)", age.as_secs()),
                ))
                .await;
            }
        }

        self.notify(Notice::success(
            "Data updated",
            format!(
                "Data updated ({} streamers, {} services)",
                streamer_count, service_count
            ),
        ))
        .await;

        RefreshOutcome::Healthy
    }

    /// Deliver a notice to every notifier and record it in the board history
    async fn notify(&self, notice: Notice) {
        for notifier in &self.notifiers {
            if let Err(e) = notifier.notify(&notice).await {
                tracing::warn!("Notice via '{}' failed: {}", notifier.type_name(), e);
            }
        }

        self.state.write().await.add_notice(NoticeRecord {
            notice,
            timestamp_epoch_ms: self.clock.now_ms(),
        });
    }

    /// Refresh on a fixed interval until cancelled. The first tick fires at once.
    pub async fn run(&self, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let outcome = self.refresh(false).await;
                    tracing::debug!("Periodic refresh: {:?}", outcome);
                }
                _ = cancel.cancelled() => {
                    tracing::debug!("Periodic refresh cancelled");
                    break;
                }
            }
        }
    }
}

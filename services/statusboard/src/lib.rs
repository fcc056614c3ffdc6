//! Statusboard - live stream and uptime status board
//!
//! Periodically fetches live-stream status for tracked accounts and service
//! status from an uptime API, caching and throttling the uptime requests, and
//! serves the merged board on a local dashboard.

pub mod cache;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod dashboard;
pub mod error;
pub mod fetcher;
pub mod io;
pub mod live;
pub mod monitor;
pub mod notifier;
pub mod state;
pub mod targets;
pub mod throttle;


pub use config::{load_config, Config};
pub use coordinator::{RefreshCoordinator, RefreshOutcome};
pub use error::{Result, StatusBoardError};

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::cache::{FileSlotStore, SlotStore, StatusCache};
use crate::clock::{Clock, SystemClock};
use crate::fetcher::StatusFetcher;
use crate::io::{HttpClient, ReqwestHttpClient};
use crate::live::LiveStatusClient;
use crate::notifier::{LogNotifier, Notifier};
use crate::targets::{FileTargets, StaticTargets, TargetsSource};
use crate::throttle::RequestThrottle;

/// Builder wiring the status board components from a [`Config`]
///
/// Every collaborator can be replaced, which is how the tests drive the
/// board without network or wall-clock time.
pub struct StatusBoardBuilder {
    config: Config,
    http: Option<Arc<dyn HttpClient>>,
    clock: Option<Arc<dyn Clock>>,
    slot_store: Option<Arc<dyn SlotStore>>,
    targets: Option<Arc<dyn TargetsSource>>,
    notifiers: Option<Vec<Arc<dyn Notifier>>>,
    cancel: Option<CancellationToken>,
}

impl StatusBoardBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            http: None,
            clock: None,
            slot_store: None,
            targets: None,
            notifiers: None,
            cancel: None,
        }
    }

    pub fn with_http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_slot_store(mut self, store: Arc<dyn SlotStore>) -> Self {
        self.slot_store = Some(store);
        self
    }

    pub fn with_targets(mut self, targets: Arc<dyn TargetsSource>) -> Self {
        self.targets = Some(targets);
        self
    }

    pub fn with_notifiers(mut self, notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        self.notifiers = Some(notifiers);
        self
    }

    pub fn with_cancellation_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn build(self) -> Result<StatusBoard> {
        let config = self.config;

        let http: Arc<dyn HttpClient> = match self.http {
            Some(http) => http,
            None => Arc::new(ReqwestHttpClient::new()?),
        };
        let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let store: Arc<dyn SlotStore> = self
            .slot_store
            .unwrap_or_else(|| Arc::new(FileSlotStore::new(config.cache.dir.clone())));
        let targets: Arc<dyn TargetsSource> = match self.targets {
            Some(targets) => targets,
            None => match &config.targets.path {
                Some(path) => {
                    tracing::debug!("Reading targets from {:?}", path);
                    Arc::new(FileTargets::new(path.clone()))
                }
                None => Arc::new(StaticTargets::new(config.targets.clone())),
            },
        };
        let notifiers = self
            .notifiers
            .unwrap_or_else(|| vec![Arc::new(LogNotifier) as Arc<dyn Notifier>]);

        let cache = Arc::new(StatusCache::new(store, Arc::clone(&clock), config.cache.ttl));
        let throttle = Arc::new(RequestThrottle::new(
            config.throttle,
            Arc::clone(&clock),
        ));
        let fetcher = Arc::new(StatusFetcher::new(
            &config.upstream,
            Arc::clone(&http),
            cache,
            throttle,
        ));
        let live = Arc::new(LiveStatusClient::new(
            config.upstream.live_url.clone(),
            http,
        ));
        let state = state::new_state_handle(config.dashboard.notice_history_size);

        let coordinator = Arc::new(RefreshCoordinator::new(
            targets, live, fetcher, notifiers, state, clock,
        ));

        Ok(StatusBoard {
            config,
            coordinator,
            cancel: self.cancel.unwrap_or_default(),
        })
    }
}

/// A fully wired status board, ready to start
#[derive(Debug)]
pub struct StatusBoard {
    config: Config,
    coordinator: Arc<RefreshCoordinator>,
    cancel: CancellationToken,
}

impl StatusBoard {
    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Serve the dashboard (if enabled) and refresh periodically until cancelled
    pub async fn start(self) -> Result<()> {
        if self.config.dashboard.enabled {
            let dashboard_port = self.config.dashboard.port;
            let router = dashboard::build_router(Arc::clone(&self.coordinator));
            let cancel_for_dashboard = self.cancel.clone();

            tokio::spawn(async move {
                let addr = SocketAddr::from(([127, 0, 0, 1], dashboard_port));
                let listener = match tokio::net::TcpListener::bind(addr).await {
                    Ok(l) => l,
                    Err(e) => {
                        tracing::error!(
                            "Failed to bind dashboard to port {}: {}. Continuing without dashboard.",
                            dashboard_port,
                            e
                        );
                        return;
                    }
                };
                tracing::info!("Dashboard listening on http://{}", addr);

                axum::serve(listener, router)
                    .with_graceful_shutdown(async move {
                        cancel_for_dashboard.cancelled().await;
                    })
                    .await
                    .ok();

                tracing::debug!("Dashboard stopped");
            });
        }

        tracing::info!(
            "Status board started, refreshing every {:?}",
            self.config.refresh.interval
        );

        self.coordinator
            .run(self.config.refresh.interval, self.cancel.clone())
            .await;

        tracing::info!("Status board stopped");
        Ok(())
    }
}

/// Run the status board with the given configuration until ctrl-c
///
/// A failed initialization is retried after `refresh.init_retry_delay`.
pub async fn run(config: Config) -> Result<()> {
    let cancel = CancellationToken::new();

    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for ctrl-c");
        tracing::info!("Shutdown signal received");
        cancel_for_signal.cancel();
    });

    let board = loop {
        match StatusBoardBuilder::new(config.clone())
            .with_cancellation_token(cancel.clone())
            .build()
        {
            Ok(board) => break board,
            Err(e) => {
                tracing::error!(
                    "Initialization failed: {}. Retrying in {:?}",
                    e,
                    config.refresh.init_retry_delay
                );
                tokio::select! {
                    _ = tokio::time::sleep(config.refresh.init_retry_delay) => {}
                    _ = cancel.cancelled() => return Ok(()),
                }
            }
        }
    };

    board.start().await
}

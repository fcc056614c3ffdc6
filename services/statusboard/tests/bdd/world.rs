//! BDD test world for the status board

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use cucumber::World;
use statusboard::cache::StatusCache;
use statusboard::clock::ManualClock;
use statusboard::fetcher::{StatusFetcher, SystemStatus};
use statusboard::io::{HttpClient, HttpResponse};
use statusboard::throttle::RequestThrottle;
use statusboard::{RefreshOutcome, StatusBoard};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Canned response for one upstream
#[derive(Debug, Clone)]
pub enum Canned {
    Respond(u16, String),
    Fail(String),
}

impl Default for Canned {
    fn default() -> Self {
        Canned::Respond(200, r#"{"code": 0, "data": {}}"#.to_string())
    }
}

/// HTTP client serving canned bodies: GET is the uptime API, POST the live API
///
/// When a gate is set, live requests wait on it, which keeps a refresh cycle
/// in flight for as long as a scenario needs.
#[derive(Debug, Default)]
pub struct ScriptedHttpClient {
    pub monitors: Mutex<Canned>,
    pub live: Mutex<Canned>,
    pub gate: Mutex<Option<Arc<Notify>>>,
    pub monitor_calls: AtomicUsize,
    pub live_calls: AtomicUsize,
}

impl ScriptedHttpClient {
    pub fn set_monitors(&self, canned: Canned) {
        *self.monitors.lock().unwrap() = canned;
    }

    pub fn set_live(&self, canned: Canned) {
        *self.live.lock().unwrap() = canned;
    }

    pub fn monitor_calls(&self) -> usize {
        self.monitor_calls.load(Ordering::SeqCst)
    }

    pub fn live_calls(&self) -> usize {
        self.live_calls.load(Ordering::SeqCst)
    }

    fn answer(canned: Canned) -> statusboard::Result<HttpResponse> {
        match canned {
            Canned::Respond(status, body) => Ok(HttpResponse { status, body }),
            Canned::Fail(message) => Err(statusboard::StatusBoardError::Http(message)),
        }
    }
}

#[async_trait::async_trait]
impl HttpClient for ScriptedHttpClient {
    async fn get(&self, _url: &str, _headers: &[(&str, &str)]) -> statusboard::Result<HttpResponse> {
        self.monitor_calls.fetch_add(1, Ordering::SeqCst);
        let canned = self.monitors.lock().unwrap().clone();
        Self::answer(canned)
    }

    async fn post_json(
        &self,
        _url: &str,
        _body: &serde_json::Value,
    ) -> statusboard::Result<HttpResponse> {
        self.live_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let canned = self.live.lock().unwrap().clone();
        Self::answer(canned)
    }
}

#[derive(Debug, Default, World)]
pub struct StatusBoardWorld {
    pub clock: Option<Arc<ManualClock>>,
    pub cache_dir: Option<tempfile::TempDir>,

    // Cache testing
    pub cache: Option<Arc<StatusCache>>,

    // Throttle testing
    pub throttle: Option<Arc<RequestThrottle>>,
    pub throttle_decisions: Vec<bool>,

    // Fetcher testing
    pub http: Option<Arc<ScriptedHttpClient>>,
    pub upstream_monitors: Vec<(u64, String)>,
    pub fetcher: Option<StatusFetcher>,
    pub fetch_result: Option<SystemStatus>,

    // Refresh testing
    pub accounts: Vec<String>,
    pub monitors: Vec<String>,
    pub board: Option<StatusBoard>,
    pub refresh_outcomes: Vec<RefreshOutcome>,

    // Lifecycle testing
    pub targets_file: Option<std::path::PathBuf>,
    pub cancel: Option<CancellationToken>,
    pub build_succeeded: Option<bool>,
    pub start_succeeded: Option<bool>,
}

impl StatusBoardWorld {
    pub fn clock(&mut self) -> Arc<ManualClock> {
        self.clock
            .get_or_insert_with(|| Arc::new(ManualClock::new(1_700_000_000_000)))
            .clone()
    }

    pub fn http(&mut self) -> Arc<ScriptedHttpClient> {
        self.http
            .get_or_insert_with(|| Arc::new(ScriptedHttpClient::default()))
            .clone()
    }

    pub fn cache_path(&mut self) -> std::path::PathBuf {
        self.cache_dir
            .get_or_insert_with(|| tempfile::tempdir().expect("failed to create temp dir"))
            .path()
            .to_path_buf()
    }
}

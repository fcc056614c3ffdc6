//! Shared board state: latest streamers, monitors, connection state and notices

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::fetcher::{StatusSource, SystemStatus};
use crate::live::{Streamer, StreamerSummary};
use crate::monitor::{MonitorRecord, SystemSummary};
use crate::notifier::NoticeRecord;

/// Connection indicator shown by the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Loading,
    Healthy,
    Error,
}

/// Shared state written by the refresh coordinator and read by the dashboard
#[derive(Debug)]
pub struct BoardState {
    pub connection: ConnectionState,
    pub streamers: Vec<Streamer>,
    pub monitors: Vec<MonitorRecord>,
    pub monitor_source: Option<StatusSource>,
    pub streamer_summary: StreamerSummary,
    pub system_summary: SystemSummary,
    pub last_update_epoch_ms: Option<u64>,
    pub notices: VecDeque<NoticeRecord>,
    pub notice_history_size: usize,
    pub started_at: Instant,
}

/// Serializable view of [`BoardState`] for the dashboard API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub connection: ConnectionState,
    pub streamers: Vec<Streamer>,
    pub monitors: Vec<MonitorRecord>,
    pub monitor_source: Option<StatusSource>,
    pub streamer_summary: StreamerSummary,
    pub system_summary: SystemSummary,
    pub last_update_epoch_ms: Option<u64>,
    pub uptime_seconds: u64,
}

impl BoardState {
    pub fn new(notice_history_size: usize) -> Self {
        Self {
            connection: ConnectionState::Loading,
            streamers: Vec::new(),
            monitors: Vec::new(),
            monitor_source: None,
            streamer_summary: StreamerSummary::default(),
            system_summary: SystemSummary::default(),
            last_update_epoch_ms: None,
            notices: VecDeque::with_capacity(notice_history_size),
            notice_history_size,
            started_at: Instant::now(),
        }
    }

    /// Replace the board contents with the results of a refresh cycle
    pub fn apply_refresh(&mut self, streamers: Vec<Streamer>, status: SystemStatus, now_ms: u64) {
        self.streamer_summary = StreamerSummary::from_streamers(&streamers);
        self.system_summary = SystemSummary::from_records(&status.monitors);
        self.streamers = streamers;
        self.monitors = status.monitors;
        self.monitor_source = Some(status.source);
        self.last_update_epoch_ms = Some(now_ms);
    }

    /// Add a notice to history, dropping the oldest when full
    pub fn add_notice(&mut self, record: NoticeRecord) {
        if self.notice_history_size == 0 {
            return;
        }
        if self.notices.len() >= self.notice_history_size {
            self.notices.pop_front();
        }
        self.notices.push_back(record);
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            connection: self.connection,
            streamers: self.streamers.clone(),
            monitors: self.monitors.clone(),
            monitor_source: self.monitor_source,
            streamer_summary: self.streamer_summary,
            system_summary: self.system_summary,
            last_update_epoch_ms: self.last_update_epoch_ms,
            uptime_seconds: self.started_at.elapsed().as_secs(),
        }
    }
}

/// Thread-safe shared state handle
pub type StateHandle = Arc<RwLock<BoardState>>;

pub fn new_state_handle(notice_history_size: usize) -> StateHandle {
    Arc::new(RwLock::new(BoardState::new(notice_history_size)))
}

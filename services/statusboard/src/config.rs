//! Configuration types for the status board

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::DEFAULT_CACHE_DURATION;
use crate::throttle::ThrottleLimits;

/// Environment variable consulted when no API key is configured
pub const API_KEY_ENV: &str = "STATUSBOARD_API_KEY";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub targets: TargetsConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub throttle: ThrottleLimits,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

impl Config {
    /// Fill an empty API key from the environment
    pub fn resolve_secrets(&mut self) -> crate::Result<()> {
        if self.targets.api_key.is_empty() {
            if let Ok(key) = std::env::var(API_KEY_ENV) {
                tracing::debug!("Using API key from {}", API_KEY_ENV);
                self.targets.api_key = key;
            }
        }
        Ok(())
    }
}

/// Accounts and monitors to track
///
/// When `path` is set the lists below are ignored and the targets file is
/// re-read on every refresh.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetsConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub accounts: Vec<String>,
    #[serde(default)]
    pub monitors: Vec<String>,
    #[serde(default, skip_serializing)]
    pub api_key: String,
}

/// Upstream API endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_monitors_url")]
    pub monitors_url: String,
    #[serde(default = "default_live_url")]
    pub live_url: String,
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            monitors_url: default_monitors_url(),
            live_url: default_live_url(),
            page_limit: default_page_limit(),
        }
    }
}

/// Local cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_cache_ttl", with = "humantime_serde")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            ttl: default_cache_ttl(),
        }
    }
}

/// Background refresh settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_refresh_interval", with = "humantime_serde")]
    pub interval: Duration,
    #[serde(default = "default_init_retry_delay", with = "humantime_serde")]
    pub init_retry_delay: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: default_refresh_interval(),
            init_retry_delay: default_init_retry_delay(),
        }
    }
}

/// Dashboard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_dashboard_port")]
    pub port: u16,
    #[serde(default = "default_notice_history_size")]
    pub notice_history_size: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_dashboard_port(),
            notice_history_size: default_notice_history_size(),
        }
    }
}

fn default_monitors_url() -> String {
    "https://api.uptimerobot.com/v3/monitors".to_string()
}

fn default_live_url() -> String {
    "https://api.silvertideproject.top/api/v1/live".to_string()
}

fn default_page_limit() -> u32 {
    200
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".statusboard-cache")
}

fn default_cache_ttl() -> Duration {
    DEFAULT_CACHE_DURATION
}

fn default_refresh_interval() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_init_retry_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_true() -> bool {
    true
}

fn default_dashboard_port() -> u16 {
    11120
}

fn default_notice_history_size() -> usize {
    50
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::StatusBoardError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}

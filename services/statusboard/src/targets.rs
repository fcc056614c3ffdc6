//! Tracked accounts, monitor ids and the uptime API key
//!
//! Targets are reloaded at the start of every refresh cycle. Ids must be
//! numeric strings; anything else is dropped before it reaches the fetchers.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::TargetsConfig;

/// Targets as written in a targets file, before validation
///
/// Accepts the legacy `data.json` field names (`mid`, `monitorsid`,
/// `readonlyuptimerobotapikey`) as well as the descriptive ones.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTargets {
    #[serde(default, alias = "mid")]
    pub accounts: Option<Vec<serde_json::Value>>,
    #[serde(default, alias = "monitorsid")]
    pub monitors: Option<Vec<serde_json::Value>>,
    #[serde(default, alias = "readonlyuptimerobotapikey")]
    pub api_key: Option<String>,
}

/// Validated working sets for one refresh cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Targets {
    pub accounts: Vec<String>,
    pub monitors: Vec<String>,
    pub api_key: String,
}

impl Targets {
    pub fn from_raw(raw: RawTargets) -> crate::Result<Self> {
        let accounts = raw.accounts.ok_or_else(|| {
            crate::StatusBoardError::Config("Account id list is missing".to_string())
        })?;
        let monitors = raw.monitors.ok_or_else(|| {
            crate::StatusBoardError::Config("Monitor id list is missing".to_string())
        })?;
        let api_key = raw
            .api_key
            .filter(|key| !key.is_empty())
            .ok_or_else(|| crate::StatusBoardError::Config("API key is missing".to_string()))?;

        let targets = Self {
            accounts: numeric_ids(accounts),
            monitors: numeric_ids(monitors),
            api_key,
        };
        tracing::debug!(
            "Loaded {} valid account ids and {} monitor ids",
            targets.accounts.len(),
            targets.monitors.len()
        );
        Ok(targets)
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty() && self.monitors.is_empty()
    }
}

fn numeric_ids(values: Vec<serde_json::Value>) -> Vec<String> {
    values
        .into_iter()
        .filter_map(|v| match v {
            serde_json::Value::String(s) if is_numeric_id(&s) => Some(s),
            _ => None,
        })
        .collect()
}

fn is_numeric_id(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

/// Where the targets for a refresh cycle come from
#[async_trait]
pub trait TargetsSource: Send + Sync + std::fmt::Debug {
    async fn load(&self) -> crate::Result<Targets>;
}

/// Targets re-read from a JSON file on every load
#[derive(Debug, Clone)]
pub struct FileTargets {
    path: PathBuf,
}

impl FileTargets {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TargetsSource for FileTargets {
    async fn load(&self) -> crate::Result<Targets> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            crate::StatusBoardError::Config(format!(
                "Failed to read targets file {:?}: {}",
                self.path, e
            ))
        })?;
        let raw: RawTargets = serde_json::from_str(&content).map_err(|e| {
            crate::StatusBoardError::Config(format!("Invalid targets file {:?}: {}", self.path, e))
        })?;
        Targets::from_raw(raw)
    }
}

/// Targets taken from the main configuration
#[derive(Debug, Clone)]
pub struct StaticTargets {
    config: TargetsConfig,
}

impl StaticTargets {
    pub fn new(config: TargetsConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TargetsSource for StaticTargets {
    async fn load(&self) -> crate::Result<Targets> {
        let to_values = |ids: &[String]| {
            ids.iter()
                .cloned()
                .map(serde_json::Value::String)
                .collect::<Vec<_>>()
        };
        Targets::from_raw(RawTargets {
            accounts: Some(to_values(&self.config.accounts)),
            monitors: Some(to_values(&self.config.monitors)),
            api_key: Some(self.config.api_key.clone()),
        })
    }
}

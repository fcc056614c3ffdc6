//! Monitor records and the upstream uptime API shapes they are built from

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use tracing::warn;

/// Status of a monitored service as reported by the uptime API
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MonitorStatus {
    Up,
    Down,
    Paused,
    Maintenance,
    #[default]
    #[serde(other)]
    Unknown,
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorStatus::Up => write!(f, "Up"),
            MonitorStatus::Down => write!(f, "Down"),
            MonitorStatus::Paused => write!(f, "Paused"),
            MonitorStatus::Maintenance => write!(f, "Maintenance"),
            MonitorStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Snapshot of one monitored service at fetch time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorRecord {
    pub id: u64,
    pub display_name: String,
    pub url: String,
    pub status: MonitorStatus,
    pub kind: String,
    pub poll_interval_seconds: u64,
    pub current_state_duration_seconds: u64,
    pub created_at: String,
}

impl From<UpstreamMonitor> for MonitorRecord {
    fn from(m: UpstreamMonitor) -> Self {
        Self {
            id: m.id,
            display_name: m.friendly_name,
            url: m.url,
            status: m.status,
            kind: m.kind,
            poll_interval_seconds: m.interval,
            current_state_duration_seconds: m.current_state_duration,
            created_at: m.create_date_time,
        }
    }
}

/// One monitor object in the uptime API response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamMonitor {
    #[serde(deserialize_with = "numeric_id")]
    pub id: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub friendly_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: MonitorStatus,
    #[serde(default, rename = "type", deserialize_with = "string_or_number")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub interval: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub current_state_duration: u64,
    #[serde(default, deserialize_with = "string_or_number")]
    pub create_date_time: String,
}

/// Envelope of a bulk monitor query
///
/// Entries stay as raw JSON until they are matched against the requested
/// ids, so a malformed monitor nobody asked for cannot fail the page.
#[derive(Debug, Deserialize)]
pub struct UpstreamMonitorPage {
    pub data: Vec<serde_json::Value>,
}

impl UpstreamMonitorPage {
    /// Keep only the requested monitor ids, in upstream order
    pub fn select(self, ids: &[String]) -> Vec<MonitorRecord> {
        self.data
            .into_iter()
            .filter(|entry| raw_id(entry).is_some_and(|raw| ids.iter().any(|id| *id == raw)))
            .filter_map(|entry| match serde_json::from_value::<UpstreamMonitor>(entry) {
                Ok(monitor) => Some(MonitorRecord::from(monitor)),
                Err(e) => {
                    warn!("Skipping unreadable monitor entry: {}", e);
                    None
                }
            })
            .collect()
    }
}

/// A monitor id given either as a JSON number or a numeric string
fn id_value(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn raw_id(entry: &serde_json::Value) -> Option<String> {
    entry.get("id").and_then(id_value).map(|id| id.to_string())
}

fn numeric_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    id_value(&value)
        .ok_or_else(|| serde::de::Error::custom("monitor id is not a non-negative integer"))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_status<'de, D>(deserializer: D) -> Result<MonitorStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Up/down counts over a set of monitor records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemSummary {
    pub total: usize,
    pub up: usize,
    pub down: usize,
}

impl SystemSummary {
    /// Anything that is not UP counts as down
    pub fn from_records(records: &[MonitorRecord]) -> Self {
        let up = records
            .iter()
            .filter(|m| m.status == MonitorStatus::Up)
            .count();
        Self {
            total: records.len(),
            up,
            down: records.len() - up,
        }
    }
}

//! Live-status client and the streamer view built from it

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::io::HttpClient;

const DEFAULT_FACE: &str = "/noface.jpg";

/// Live-status fields for one account, as returned by the live API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveStatus {
    #[serde(default)]
    pub uname: Option<String>,
    #[serde(default)]
    pub live_status: Option<i64>,
    #[serde(default)]
    pub room_id: Option<u64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub online: Option<u64>,
    #[serde(default)]
    pub face: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub keyframe: Option<String>,
    #[serde(default)]
    pub area_name: Option<String>,
    #[serde(default)]
    pub area_v2_name: Option<String>,
    #[serde(default)]
    pub area_v2_parent_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LiveEnvelope {
    code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<BTreeMap<String, Option<LiveStatus>>>,
}

/// Client for the live-status API
pub struct LiveStatusClient {
    http: Arc<dyn HttpClient>,
    url: String,
}

impl std::fmt::Debug for LiveStatusClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveStatusClient")
            .field("url", &self.url)
            .finish()
    }
}

impl LiveStatusClient {
    pub fn new(url: impl Into<String>, http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    /// Live status keyed by account id; accounts the API returns null for are dropped
    pub async fn fetch_live_status(
        &self,
        uids: &[String],
    ) -> crate::Result<BTreeMap<String, LiveStatus>> {
        if uids.is_empty() {
            return Ok(BTreeMap::new());
        }

        let body = serde_json::json!({ "uids": uids });
        let response = self.http.post_json(&self.url, &body).await?;

        if !response.is_success() {
            return Err(crate::StatusBoardError::Upstream(format!(
                "Live API returned status {}",
                response.status
            )));
        }

        let envelope: LiveEnvelope = serde_json::from_str(&response.body)?;
        match envelope {
            LiveEnvelope {
                code: 0,
                data: Some(data),
                ..
            } => Ok(data
                .into_iter()
                .filter_map(|(uid, status)| status.map(|s| (uid, s)))
                .collect()),
            LiveEnvelope { message, .. } => Err(crate::StatusBoardError::Upstream(
                message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "invalid response format".to_string()),
            )),
        }
    }
}

/// A tracked account ready for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streamer {
    pub uid: u64,
    pub name: String,
    pub living: bool,
    pub title: String,
    pub description: String,
    pub face: String,
    pub room_id: u64,
    pub online: u64,
    pub area: String,
    pub keyframe: Option<String>,
}

impl Streamer {
    /// `None` when the key is not a numeric account id
    pub fn from_live(uid: &str, status: &LiveStatus) -> Option<Self> {
        let uid_num = uid.parse::<u64>().ok()?;
        let living = status.live_status == Some(1);

        let area = match (&status.area_v2_parent_name, &status.area_v2_name) {
            (Some(parent), Some(child)) if !parent.is_empty() && !child.is_empty() => {
                format!("{} · {}", parent, child)
            }
            _ => status.area_name.clone().unwrap_or_default(),
        };

        Some(Self {
            uid: uid_num,
            name: status
                .uname
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| format!("streamer_{}", uid)),
            living,
            title: status.title.clone().unwrap_or_default(),
            description: status.description.clone().unwrap_or_default(),
            face: status
                .face
                .clone()
                .filter(|f| !f.is_empty())
                .unwrap_or_else(|| DEFAULT_FACE.to_string()),
            room_id: status.room_id.unwrap_or(0),
            online: if living { status.online.unwrap_or(0) } else { 0 },
            area,
            keyframe: status
                .keyframe
                .clone()
                .filter(|k| living && !k.is_empty()),
        })
    }

    /// Build streamers from a live-status map, ordered by account id
    pub fn collect(live: &BTreeMap<String, LiveStatus>) -> Vec<Self> {
        let mut streamers: Vec<Self> = live
            .iter()
            .filter_map(|(uid, status)| Self::from_live(uid, status))
            .collect();
        streamers.sort_by_key(|s| s.uid);
        streamers
    }
}

/// Live/offline counts over a set of streamers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamerSummary {
    pub total: usize,
    pub live: usize,
    pub offline: usize,
}

impl StreamerSummary {
    pub fn from_streamers(streamers: &[Streamer]) -> Self {
        let live = streamers.iter().filter(|s| s.living).count();
        Self {
            total: streamers.len(),
            live,
            offline: streamers.len() - live,
        }
    }
}

//! Local web dashboard with JSON API endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::Router;

use crate::coordinator::RefreshCoordinator;
use crate::monitor::MonitorStatus;
use crate::notifier::NoticeLevel;
use crate::state::{ConnectionState, StateHandle};

/// Dashboard application state
#[derive(Clone)]
pub struct DashboardState {
    pub state: StateHandle,
    pub coordinator: Arc<RefreshCoordinator>,
}

/// Build the dashboard axum router
pub fn build_router(coordinator: Arc<RefreshCoordinator>) -> Router {
    let dashboard_state = DashboardState {
        state: Arc::clone(coordinator.state()),
        coordinator,
    };

    Router::new()
        .route("/", get(index_handler))
        .route("/api/board", get(board_handler))
        .route("/api/notices", get(notices_handler))
        .route("/api/refresh", post(refresh_handler))
        .route("/health", get(health_handler))
        .with_state(dashboard_state)
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Compact duration for state ages: `42s`, `7m`, `3h`
fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m", seconds / 60)
    } else {
        format!("{}h", seconds / 3600)
    }
}

fn format_epoch_ms(epoch_ms: Option<u64>) -> String {
    epoch_ms
        .and_then(|ms| chrono::DateTime::from_timestamp_millis(ms as i64))
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "Never".to_string())
}

fn status_colors(status: MonitorStatus) -> (&'static str, &'static str) {
    match status {
        MonitorStatus::Up => ("#155724", "#d4edda"),
        MonitorStatus::Down => ("#721c24", "#f8d7da"),
        MonitorStatus::Paused | MonitorStatus::Maintenance => ("#856404", "#fff3cd"),
        MonitorStatus::Unknown => ("#383d41", "#e2e3e5"),
    }
}

async fn index_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let state = dashboard.state.read().await;

    let connection = match state.connection {
        ConnectionState::Loading => "Loading",
        ConnectionState::Healthy => "Connected",
        ConnectionState::Error => "Connection error",
    };

    let streamer_cards: String = state
        .streamers
        .iter()
        .map(|s| {
            let badge = if s.living {
                format!(
                    r#"<span style="color: #155724; font-weight: 600;">LIVE · {} watching</span>"#,
                    s.online
                )
            } else {
                r#"<span style="color: #6c757d;">Offline</span>"#.to_string()
            };
            format!(
                r#"<div style="border: 1px solid #dee2e6; border-radius: 0.5rem; padding: 0.75rem;">
                    <img src="{}" alt="" width="48" height="48" style="border-radius: 50%;">
                    <div style="font-weight: 600;">{}</div>
                    <div>{}</div>
                    <div style="font-size: 0.9em;">{}</div>
                    <div style="font-size: 0.85em; color: #6c757d;">{}</div>
                </div>"#,
                escape_html(&s.face),
                escape_html(&s.name),
                badge,
                escape_html(&s.title),
                escape_html(&s.area),
            )
        })
        .collect();

    let monitor_rows: String = state
        .monitors
        .iter()
        .map(|m| {
            let (color, bg) = status_colors(m.status);
            format!(
                r#"<tr style="border-bottom: 1px solid #dee2e6;">
                    <td style="padding: 0.5rem;">{}</td>
                    <td style="padding: 0.5rem;">
                        <span style="display: inline-block; padding: 0.25em 0.6em; border-radius: 0.25rem; font-size: 0.85em; font-weight: 600; color: {}; background-color: {};">{}</span>
                    </td>
                    <td style="padding: 0.5rem;">{}</td>
                    <td style="padding: 0.5rem;">{}</td>
                </tr>"#,
                escape_html(&m.display_name),
                color,
                bg,
                m.status,
                escape_html(&m.kind),
                format_duration(m.current_state_duration_seconds),
            )
        })
        .collect();

    let notice_rows: String = state
        .notices
        .iter()
        .rev()
        .map(|n| {
            let color = match n.notice.level {
                NoticeLevel::Error => "#721c24",
                NoticeLevel::Warning => "#856404",
                NoticeLevel::Success => "#155724",
                NoticeLevel::Info => "#383d41",
            };
            format!(
                r#"<tr style="border-bottom: 1px solid #dee2e6;">
                    <td style="padding: 0.5rem;">{}</td>
                    <td style="padding: 0.5rem; color: {};">{}</td>
                    <td style="padding: 0.5rem;">{}</td>
                    <td style="padding: 0.5rem;">{}</td>
                </tr>"#,
                format_epoch_ms(Some(n.timestamp_epoch_ms)),
                color,
                n.notice.level,
                escape_html(&n.notice.title),
                escape_html(&n.notice.message),
            )
        })
        .collect();

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Status Board</title>
    <script>
        function forceRefresh() {{
            fetch('/api/refresh', {{ method: 'POST' }})
                .then(() => window.location.reload());
        }}
        setInterval(() => window.location.reload(), 60000);
    </script>
</head>
<body style="font-family: system-ui, sans-serif; max-width: 960px; margin: 0 auto; padding: 1rem;">
    <h1>Status Board</h1>
    <p>{connection} · Last update: {last_update}
        <button onclick="forceRefresh()">Refresh</button>
    </p>
    <section>
        <h2>Streamers</h2>
        <p>{live} live · {offline} offline · {streamer_total} total</p>
        <div style="display: grid; grid-template-columns: repeat(auto-fill, minmax(200px, 1fr)); gap: 0.75rem;">{streamer_cards}</div>
    </section>
    <section>
        <h2>Services</h2>
        <p>{up} up · {down} down · {service_total} total</p>
        <table style="width: 100%; border-collapse: collapse;">
            <thead>
                <tr style="border-bottom: 2px solid #dee2e6;">
                    <th style="padding: 0.5rem; text-align: left;">Name</th>
                    <th style="padding: 0.5rem; text-align: left;">Status</th>
                    <th style="padding: 0.5rem; text-align: left;">Type</th>
                    <th style="padding: 0.5rem; text-align: left;">For</th>
                </tr>
            </thead>
            <tbody>{monitor_rows}</tbody>
        </table>
    </section>
    <section>
        <h2>Notices</h2>
        <table style="width: 100%; border-collapse: collapse;">
            <thead>
                <tr style="border-bottom: 2px solid #dee2e6;">
                    <th style="padding: 0.5rem; text-align: left;">Time</th>
                    <th style="padding: 0.5rem; text-align: left;">Level</th>
                    <th style="padding: 0.5rem; text-align: left;">Title</th>
                    <th style="padding: 0.5rem; text-align: left;">Message</th>
                </tr>
            </thead>
            <tbody>{notice_rows}</tbody>
        </table>
    </section>
</body>
</html>"#,
        connection = connection,
        last_update = format_epoch_ms(state.last_update_epoch_ms),
        live = state.streamer_summary.live,
        offline = state.streamer_summary.offline,
        streamer_total = state.streamer_summary.total,
        streamer_cards = streamer_cards,
        up = state.system_summary.up,
        down = state.system_summary.down,
        service_total = state.system_summary.total,
        monitor_rows = monitor_rows,
        notice_rows = notice_rows,
    );

    Html(html)
}

async fn board_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let state = dashboard.state.read().await;
    axum::Json(state.snapshot())
}

async fn notices_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let state = dashboard.state.read().await;
    let notices: Vec<_> = state.notices.iter().cloned().collect();
    axum::Json(notices)
}

async fn refresh_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let outcome = dashboard.coordinator.refresh(true).await;
    tracing::debug!("Manual refresh via dashboard: {:?}", outcome);
    axum::Json(serde_json::json!({ "outcome": outcome }))
}

async fn health_handler() -> impl IntoResponse {
    "OK"
}

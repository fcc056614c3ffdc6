//! Request throttle for the upstream uptime API
//!
//! A fixed window caps the number of requests per minute, and a minimum
//! spacing keeps any two requests apart. Both limits apply. The throttle is
//! local to this process and cannot see other clients sharing the quota.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::clock::Clock;

/// Limits applied by [`RequestThrottle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleLimits {
    #[serde(default = "default_window", with = "humantime_serde")]
    pub window: Duration,
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    #[serde(default = "default_min_spacing", with = "humantime_serde")]
    pub min_spacing: Duration,
}

impl Default for ThrottleLimits {
    fn default() -> Self {
        Self {
            window: default_window(),
            max_requests: default_max_requests(),
            min_spacing: default_min_spacing(),
        }
    }
}

impl ThrottleLimits {
    /// Window length in milliseconds, clamped to `u64::MAX`
    fn window_ms(&self) -> u64 {
        u64::try_from(self.window.as_millis()).unwrap_or(u64::MAX)
    }
}

fn default_window() -> Duration {
    Duration::from_secs(60)
}

fn default_max_requests() -> u32 {
    10
}

fn default_min_spacing() -> Duration {
    Duration::from_secs(6)
}

/// Quota usage in the current window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleWindow {
    pub reset_at_ms: u64,
    pub requests_in_window: u32,
    pub last_request_at_ms: Option<u64>,
}

/// Sliding-window limiter for outbound API calls
pub struct RequestThrottle {
    limits: ThrottleLimits,
    clock: Arc<dyn Clock>,
    window: Mutex<ThrottleWindow>,
}

impl std::fmt::Debug for RequestThrottle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestThrottle")
            .field("limits", &self.limits)
            .field("window", &self.snapshot())
            .finish()
    }
}

impl RequestThrottle {
    pub fn new(limits: ThrottleLimits, clock: Arc<dyn Clock>) -> Self {
        let window = ThrottleWindow {
            reset_at_ms: clock.now_ms().saturating_add(limits.window_ms()),
            requests_in_window: 0,
            last_request_at_ms: None,
        };
        Self {
            limits,
            clock,
            window: Mutex::new(window),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ThrottleWindow> {
        self.window.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether a request may be sent now. Resets the window once it has elapsed.
    pub fn can_make_request(&self) -> bool {
        let now = self.clock.now_ms();
        let mut window = self.lock();

        if now >= window.reset_at_ms {
            window.requests_in_window = 0;
            window.reset_at_ms = now.saturating_add(self.limits.window_ms());
            window.last_request_at_ms = None;
            return true;
        }

        if window.requests_in_window >= self.limits.max_requests {
            tracing::warn!(
                "Upstream request quota reached ({}/{})",
                window.requests_in_window,
                self.limits.max_requests
            );
            return false;
        }

        if let Some(last) = window.last_request_at_ms {
            if u128::from(now.saturating_sub(last)) < self.limits.min_spacing.as_millis() {
                tracing::debug!("Request spacing too short, try again later");
                return false;
            }
        }

        true
    }

    /// Account for a request that has just been dispatched
    pub fn record_request(&self) {
        let now = self.clock.now_ms();
        let mut window = self.lock();
        window.last_request_at_ms = Some(now);
        window.requests_in_window += 1;
        tracing::debug!(
            "Upstream requests: {}/{} (window resets at {})",
            window.requests_in_window,
            self.limits.max_requests,
            window.reset_at_ms
        );
    }

    /// Copy of the current window state
    pub fn snapshot(&self) -> ThrottleWindow {
        *self.lock()
    }
}

//! User-facing notices and the trait for delivering them

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoticeLevel::Info => write!(f, "info"),
            NoticeLevel::Success => write!(f, "success"),
            NoticeLevel::Warning => write!(f, "warning"),
            NoticeLevel::Error => write!(f, "error"),
        }
    }
}

/// A human-readable notice produced by a refresh cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, title, message)
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, title, message)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, title, message)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, title, message)
    }
}

/// Record of a notice kept in the board history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoticeRecord {
    #[serde(flatten)]
    pub notice: Notice,
    pub timestamp_epoch_ms: u64,
}

/// Trait for delivering notices
#[async_trait]
pub trait Notifier: Send + Sync + std::fmt::Debug {
    /// Get the notifier type name (e.g. "log")
    fn type_name(&self) -> &str;

    /// Deliver a notice
    async fn notify(&self, notice: &Notice) -> crate::Result<()>;
}

/// Notifier that writes notices to the tracing log
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn type_name(&self) -> &str {
        "log"
    }

    async fn notify(&self, notice: &Notice) -> crate::Result<()> {
        match notice.level {
            NoticeLevel::Error => tracing::error!("[{}] {}", notice.title, notice.message),
            NoticeLevel::Warning => tracing::warn!("[{}] {}", notice.title, notice.message),
            NoticeLevel::Info | NoticeLevel::Success => {
                tracing::info!("[{}] {}", notice.title, notice.message)
            }
        }
        Ok(())
    }
}

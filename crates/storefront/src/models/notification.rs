//! One-slot transient notifications.
//!
//! Handlers post a notification before redirecting; the next rendered page
//! takes it out of the session and shows it. Posting replaces any
//! notification that has not been shown yet.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use super::session::keys;

/// How long the browser keeps a notification on screen.
pub const DISMISS_AFTER_MS: u32 = 3000;

/// Visual style of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Success,
    Error,
    Info,
}

impl NotificationKind {
    /// CSS modifier class.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Success => "notice--success",
            Self::Error => "notice--error",
            Self::Info => "notice--info",
        }
    }
}

/// A message shown once and then auto-dismissed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
}

impl Notification {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: NotificationKind::Success,
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: NotificationKind::Error,
        }
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: NotificationKind::Info,
        }
    }

    /// Store this notification for the next rendered page.
    ///
    /// Failures are logged, not returned: losing a notification must never
    /// fail the request that posted it.
    pub async fn post(self, session: &Session) {
        if let Err(e) = session.insert(keys::NOTIFICATION, &self).await {
            tracing::warn!("Failed to store notification: {e}");
        }
    }

    /// Remove and return the pending notification, if any.
    pub async fn take(session: &Session) -> Option<Self> {
        session
            .remove::<Self>(keys::NOTIFICATION)
            .await
            .ok()
            .flatten()
    }
}

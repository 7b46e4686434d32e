//! Notification records persisted on domain events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Domain event categories that fan out to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Message,
    Follow,
}

/// Persisted notification. Written unconditionally; realtime delivery is
/// opportunistic and never retried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub content: String,
    pub data: Value,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

impl Notification {
    /// New unread notification for `user_id`.
    pub fn new(
        user_id: impl Into<String>,
        kind: NotificationKind,
        content: impl Into<String>,
        data: Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            kind,
            content: content.into(),
            data,
            created_at: Utc::now(),
            read: false,
        }
    }
}

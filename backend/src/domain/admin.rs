//! Admin back-office types: audit log entries and redacted user views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::user::{Stats, Subscription, Suspension, User};

/// Append-only record of a privileged action. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminLogEntry {
    pub id: String,
    pub actor: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_user_id: Option<String>,
    pub details: Value,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl AdminLogEntry {
    /// New entry stamped with the current time.
    pub fn new(
        actor: impl Into<String>,
        action: impl Into<String>,
        target_user_id: Option<String>,
        details: Value,
        origin: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            actor: actor.into(),
            action: action.into(),
            target_user_id,
            details,
            created_at: Utc::now(),
            origin,
        }
    }
}

/// Verified admin identity extracted from a token with the admin claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminContext {
    pub actor: String,
}

/// User document as the back-office sees it. Excludes credential material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminUserView {
    pub id: String,
    pub username: String,
    pub email: String,
    pub name: String,
    pub avatar: String,
    pub created_at: DateTime<Utc>,
    pub suspension: Suspension,
    pub stats: Stats,
    pub subscription: Subscription,
}

impl From<&User> for AdminUserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            avatar: user.avatar.clone(),
            created_at: user.created_at,
            suspension: user.suspension.clone(),
            stats: user.stats.clone(),
            subscription: user.subscription.clone(),
        }
    }
}

/// Headline counters for the admin dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardCounts {
    pub total_users: u64,
    pub total_decisions: u64,
    pub suspended_users: u64,
}

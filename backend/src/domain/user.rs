//! User aggregate: identity, suspension, stats, and subscription state.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default number of AI-assisted decision creations per day for free accounts.
pub const DEFAULT_DAILY_QUERIES: u32 = 3;

/// Aggregated per-user counters shown on profiles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub total_decisions: u32,
    pub implemented_decisions: u32,
    /// Percentage in 0..=100, recomputed on every decision outcome.
    pub success_rate: u32,
    pub followers: u32,
    pub following: u32,
}

impl Stats {
    /// Record a decision outcome.
    ///
    /// Deliberately not idempotent: every call increments `total_decisions`,
    /// mirroring the behaviour the public API documents.
    pub fn record_outcome(&mut self, implemented: bool) {
        self.total_decisions += 1;
        if implemented {
            self.implemented_decisions += 1;
        }
        self.success_rate = if self.total_decisions == 0 {
            0
        } else {
            let scaled = f64::from(self.implemented_decisions) * 100.0;
            (scaled / f64::from(self.total_decisions)).round() as u32
        };
    }
}

/// Account suspension state. Either permanent (`until == None`) or bounded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suspension {
    pub is_suspended: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until: Option<DateTime<Utc>>,
}

impl Suspension {
    /// Permanent suspension with the given reason.
    pub fn permanent(reason: impl Into<String>) -> Self {
        Self {
            is_suspended: true,
            reason: Some(reason.into()),
            until: None,
        }
    }

    /// Suspension that lapses at `until`.
    pub fn bounded(reason: impl Into<String>, until: DateTime<Utc>) -> Self {
        Self {
            is_suspended: true,
            reason: Some(reason.into()),
            until: Some(until),
        }
    }

    /// Whether the suspension is in force at `now`.
    ///
    /// A bounded suspension whose `until` has passed behaves as lifted; the
    /// stale flag stays in the document until an unsuspend or a fresh
    /// suspension overwrites it.
    pub fn active_at(&self, now: DateTime<Utc>) -> bool {
        self.is_suspended && self.until.is_none_or(|until| until > now)
    }
}

/// Subscription and daily query-quota state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub is_premium: bool,
    pub daily_queries: u32,
    pub queries_used_today: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_query_date: Option<NaiveDate>,
    pub subscription_status: String,
}

impl Subscription {
    /// Free-tier subscription with the given daily allowance.
    pub fn free(daily_queries: u32) -> Self {
        Self {
            is_premium: false,
            daily_queries,
            queries_used_today: 0,
            last_query_date: None,
            subscription_status: "free".to_string(),
        }
    }
}

impl Default for Subscription {
    fn default() -> Self {
        Self::free(DEFAULT_DAILY_QUERIES)
    }
}

/// Pending password reset, stored as a SHA-256 digest of the issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordReset {
    pub token_sha256: String,
    pub expires_at: DateTime<Utc>,
}

/// Application user. Never hard-deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub avatar: String,
    pub created_at: DateTime<Utc>,
    pub suspension: Suspension,
    pub stats: Stats,
    pub subscription: Subscription,
    pub password_reset: Option<PasswordReset>,
}

impl User {
    /// Build a fresh user with zeroed stats and the given subscription.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        name: impl Into<String>,
        avatar: impl Into<String>,
        subscription: Subscription,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            name: name.into(),
            avatar: avatar.into(),
            created_at: Utc::now(),
            suspension: Suspension::default(),
            stats: Stats::default(),
            subscription,
            password_reset: None,
        }
    }

    /// Compact public representation used in feeds, search, and messaging.
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            username: self.username.clone(),
            name: self.name.clone(),
            avatar: self.avatar.clone(),
        }
    }

    /// Self-view returned from authentication endpoints.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            username: self.username.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            avatar: self.avatar.clone(),
            stats: self.stats.clone(),
        }
    }
}

/// Public user summary. Excludes email and any credential material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub name: String,
    pub avatar: String,
}

/// Authenticated self-view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub name: String,
    pub email: String,
    pub avatar: String,
    pub stats: Stats,
}

//! Domain ports: the edges of the hexagon.
//!
//! The document store, the alternative generator, and realtime push delivery
//! are external collaborators reached only through these traits. Each trait
//! exposes strongly typed errors so adapters map failures into predictable
//! variants instead of leaking transport detail.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use super::admin::AdminLogEntry;
use super::decision::{ALTERNATIVE_COUNT, Decision, VoteStats};
use super::error::Error;
use super::message::Message;
use super::notification::Notification;
use super::quota::QuotaOutcome;
use super::social::{Comment, FollowEdge, Vote};
use super::token::RevokedToken;
use super::user::{PasswordReset, Stats, Suspension, User, UserSummary};

/// Failures surfaced by document-store adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated.
    #[error("duplicate value for {field}")]
    Duplicate { field: &'static str },
    /// The store could not be reached or its state is unusable.
    #[error("document store unavailable: {message}")]
    Unavailable { message: String },
}

impl StoreError {
    /// Helper for uniqueness violations.
    pub fn duplicate(field: &'static str) -> Self {
        Self::Duplicate { field }
    }

    /// Helper for connectivity and state failures.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { field } => Error::conflict(format!("{field} already exists")),
            StoreError::Unavailable { .. } => {
                tracing::error!(error = %err, "document store failure");
                Error::internal("Internal server error")
            }
        }
    }
}

/// User collection port.
///
/// Counter mutations (`stats.*`, quota usage, follower counts) are dedicated
/// operations so the adapter can apply the read-modify-write atomically,
/// the way a document store applies `$inc`/`$set` updates.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. Fails with [`StoreError::Duplicate`] on a taken
    /// email or username.
    async fn insert_user(&self, user: User) -> Result<(), StoreError>;
    async fn user_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;
    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    /// Case-insensitive substring search over name and username, excluding
    /// `exclude` (the caller), capped at `limit`.
    async fn search_users(
        &self,
        query: &str,
        exclude: &str,
        limit: usize,
    ) -> Result<Vec<UserSummary>, StoreError>;
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;
    async fn count_users(&self) -> Result<u64, StoreError>;
    async fn count_suspended(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
    /// Replace the suspension state. Returns false when the user is unknown.
    async fn set_suspension(&self, id: &str, suspension: Suspension) -> Result<bool, StoreError>;
    /// Atomic quota check-and-consume for `today`. `None` when the user is
    /// unknown.
    async fn try_consume_quota(
        &self,
        id: &str,
        today: NaiveDate,
    ) -> Result<Option<QuotaOutcome>, StoreError>;
    /// Atomically record a decision outcome in the user's stats. Returns the
    /// updated stats, or `None` when the user is unknown.
    async fn record_decision_outcome(
        &self,
        id: &str,
        implemented: bool,
    ) -> Result<Option<Stats>, StoreError>;
    /// Atomically adjust follower/following counters on both ends of an
    /// edge. `delta` is +1 on follow and -1 on unfollow.
    async fn adjust_follow_counts(
        &self,
        follower_id: &str,
        following_id: &str,
        delta: i32,
    ) -> Result<(), StoreError>;
    /// Replace the password hash. Returns false when the user is unknown.
    async fn set_password_hash(&self, id: &str, hash: String) -> Result<bool, StoreError>;
    /// Set or clear the pending password reset record.
    async fn set_password_reset(
        &self,
        id: &str,
        reset: Option<PasswordReset>,
    ) -> Result<bool, StoreError>;
    /// Find the user holding an unexpired reset token digest.
    async fn user_by_reset_token(
        &self,
        token_sha256: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError>;
}

/// Decision collection port.
#[async_trait]
pub trait DecisionStore: Send + Sync {
    async fn insert_decision(&self, decision: Decision) -> Result<(), StoreError>;
    async fn decision_by_id(&self, id: &str) -> Result<Option<Decision>, StoreError>;
    /// Replace a decision document by id. Returns false when absent.
    async fn update_decision(&self, decision: Decision) -> Result<bool, StoreError>;
    /// A user's decisions, most recent first.
    async fn decisions_for_user(&self, user_id: &str) -> Result<Vec<Decision>, StoreError>;
    /// Public decisions with a roll present, most recent first.
    async fn public_rolled(&self, skip: usize, limit: usize) -> Result<Vec<Decision>, StoreError>;
    async fn count_decisions(&self) -> Result<u64, StoreError>;
    /// Replace the aggregated vote counters. Returns false when absent.
    async fn set_vote_stats(&self, id: &str, stats: VoteStats) -> Result<bool, StoreError>;
}

/// Follow-edge collection port.
#[async_trait]
pub trait FollowStore: Send + Sync {
    /// Insert an edge. Fails with [`StoreError::Duplicate`] when the pair
    /// already exists.
    async fn insert_follow(&self, edge: FollowEdge) -> Result<(), StoreError>;
    /// Delete an edge. Returns false when it did not exist.
    async fn delete_follow(&self, follower_id: &str, following_id: &str)
    -> Result<bool, StoreError>;
    async fn is_following(&self, follower_id: &str, following_id: &str)
    -> Result<bool, StoreError>;
    async fn followers_of(&self, user_id: &str) -> Result<Vec<String>, StoreError>;
    async fn following_of(&self, user_id: &str) -> Result<Vec<String>, StoreError>;
}

/// One conversation partner with the latest message and unread tally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationHead {
    pub partner_id: String,
    pub last_message: Message,
    pub unread: u64,
}

/// Message collection port.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn insert_message(&self, message: Message) -> Result<(), StoreError>;
    /// Full thread between two users, oldest first.
    async fn conversation(&self, user_a: &str, user_b: &str) -> Result<Vec<Message>, StoreError>;
    /// Mark everything `sender_id` sent to `recipient_id` as read. Returns
    /// the number of messages touched.
    async fn mark_conversation_read(
        &self,
        sender_id: &str,
        recipient_id: &str,
    ) -> Result<u64, StoreError>;
    /// Conversation list for a user, most recently active first.
    async fn conversation_heads(&self, user_id: &str)
    -> Result<Vec<ConversationHead>, StoreError>;
}

/// Notification collection port.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert_notification(&self, notification: Notification) -> Result<(), StoreError>;
    /// Most recent first, capped at `limit`.
    async fn notifications_for(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Notification>, StoreError>;
    async fn unread_count(&self, user_id: &str) -> Result<u64, StoreError>;
    /// Mark one notification read. Returns false when it does not exist or
    /// belongs to someone else.
    async fn mark_read(&self, id: &str, user_id: &str) -> Result<bool, StoreError>;
}

/// Append-only audit log port.
#[async_trait]
pub trait AdminLogStore: Send + Sync {
    async fn append(&self, entry: AdminLogEntry) -> Result<(), StoreError>;
    /// Most recent first.
    async fn list(&self, skip: usize, limit: usize) -> Result<Vec<AdminLogEntry>, StoreError>;
}

/// Revoked-token membership port.
#[async_trait]
pub trait RevokedTokenStore: Send + Sync {
    /// Record a revocation. Idempotent on `jti`.
    async fn revoke(&self, record: RevokedToken) -> Result<(), StoreError>;
    async fn is_revoked(&self, jti: &str) -> Result<bool, StoreError>;
    /// Drop records whose tokens have expired anyway. Returns the number
    /// removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// Comment and vote collection port.
#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn insert_comment(&self, comment: Comment) -> Result<(), StoreError>;
    async fn comment_by_id(&self, id: &str) -> Result<Option<Comment>, StoreError>;
    /// Visible comments for a decision, newest first.
    async fn comments_for_decision(&self, decision_id: &str)
    -> Result<Vec<Comment>, StoreError>;
    /// Soft-delete a comment. Returns false when absent.
    async fn soft_delete_comment(&self, id: &str, now: DateTime<Utc>) -> Result<bool, StoreError>;
    /// Insert or update the caller's vote, returning the recomputed
    /// aggregate for the decision.
    async fn upsert_vote(&self, vote: Vote) -> Result<VoteStats, StoreError>;
    async fn vote_stats(&self, decision_id: &str) -> Result<VoteStats, StoreError>;
}

/// Failures surfaced by the alternative-generator adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneratorError {
    /// The call did not complete within the configured deadline.
    #[error("generator timed out: {message}")]
    Timeout { message: String },
    /// Connectivity or HTTP-level failure.
    #[error("generator transport failure: {message}")]
    Transport { message: String },
    /// The response could not be turned into alternatives.
    #[error("generator response unusable: {message}")]
    Decode { message: String },
}

impl GeneratorError {
    /// Helper for deadline failures.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Helper for transport failures.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Helper for unusable responses.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

/// External LLM call producing exactly four short alternatives.
///
/// Callers recover from every error with a fixed fallback list; the error
/// variants exist for logging, not for control flow beyond that.
#[async_trait]
pub trait AlternativeSource: Send + Sync {
    async fn generate(&self, prompt: &str)
    -> Result<[String; ALTERNATIVE_COUNT], GeneratorError>;
}

/// Deterministic generator used when no endpoint is configured and in tests.
pub struct FixtureAlternativeSource;

#[async_trait]
impl AlternativeSource for FixtureAlternativeSource {
    async fn generate(
        &self,
        prompt: &str,
    ) -> Result<[String; ALTERNATIVE_COUNT], GeneratorError> {
        let topic: String = prompt.chars().take(24).collect();
        Ok([
            format!("Go ahead with it: {topic}"),
            "Take the cautious route".to_string(),
            "Ask someone you trust first".to_string(),
            "Give it one more day".to_string(),
        ])
    }
}

/// Best-effort push delivery to a live connection.
///
/// Fire-and-forget by contract: when the target has no live channel the
/// frame is dropped silently. The persisted notification written by the
/// fan-out is the durable record.
pub trait RealtimePush: Send + Sync {
    fn send_direct(&self, user_id: &str, frame: String);
}

//! Social graph and public-decision feedback: follows, comments, votes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Directed follow edge. The `(follower_id, following_id)` pair is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowEdge {
    pub id: String,
    pub follower_id: String,
    pub following_id: String,
    pub created_at: DateTime<Utc>,
}

impl FollowEdge {
    /// New edge from `follower_id` to `following_id`.
    pub fn new(follower_id: impl Into<String>, following_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            follower_id: follower_id.into(),
            following_id: following_id.into(),
            created_at: Utc::now(),
        }
    }
}

/// Maximum accepted comment length in characters.
pub const COMMENT_MAX_CHARS: usize = 500;

/// Comment on a public decision. Deletion is soft so threads keep their shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub decision_id: String,
    pub user_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub likes: u32,
    pub is_deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Comment {
    /// New visible comment.
    pub fn new(
        decision_id: impl Into<String>,
        user_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            decision_id: decision_id.into(),
            user_id: user_id.into(),
            content: content.into(),
            created_at: Utc::now(),
            likes: 0,
            is_deleted: false,
            deleted_at: None,
        }
    }
}

/// How a vote reads a decision outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteKind {
    Helpful,
    Unhelpful,
}

/// A user's single vote on a decision; re-voting updates in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: String,
    pub user_id: String,
    pub decision_id: String,
    pub vote_type: VoteKind,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Vote {
    /// New vote by `user_id` on `decision_id`.
    pub fn new(
        user_id: impl Into<String>,
        decision_id: impl Into<String>,
        vote_type: VoteKind,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            decision_id: decision_id.into(),
            vote_type,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

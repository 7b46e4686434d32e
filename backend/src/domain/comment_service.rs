//! Comments and helpful/unhelpful votes on public decisions.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::decision::{Decision, PrivacyLevel, VoteStats};
use super::error::{ApiResult, Error};
use super::ports::{CommentStore, DecisionStore, UserStore};
use super::social::{COMMENT_MAX_CHARS, Comment, Vote, VoteKind};
use super::user::User;

/// Comment joined with its author's public summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentView {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub user_avatar: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub likes: u32,
}

/// Vote aggregate with the derived percentage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteStatsView {
    pub helpful: u32,
    pub unhelpful: u32,
    pub total: u32,
    pub helpful_percentage: u32,
}

impl From<VoteStats> for VoteStatsView {
    fn from(stats: VoteStats) -> Self {
        Self {
            helpful_percentage: stats.helpful_percentage(),
            helpful: stats.helpful,
            unhelpful: stats.unhelpful,
            total: stats.total,
        }
    }
}

pub struct CommentService {
    comments: Arc<dyn CommentStore>,
    decisions: Arc<dyn DecisionStore>,
    users: Arc<dyn UserStore>,
}

impl CommentService {
    pub fn new(
        comments: Arc<dyn CommentStore>,
        decisions: Arc<dyn DecisionStore>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            comments,
            decisions,
            users,
        }
    }

    /// Comment on a public decision.
    pub async fn add_comment(
        &self,
        author: &User,
        decision_id: &str,
        content: &str,
    ) -> ApiResult<String> {
        let content = content.trim();
        if content.is_empty() || content.chars().count() > COMMENT_MAX_CHARS {
            return Err(Error::invalid_request(format!(
                "Comment must be between 1 and {COMMENT_MAX_CHARS} characters"
            )));
        }
        self.public_decision(decision_id).await?;

        let comment = Comment::new(decision_id, &author.id, content);
        let comment_id = comment.id.clone();
        self.comments.insert_comment(comment).await?;
        Ok(comment_id)
    }

    /// Visible comments on a public decision, newest first, with authors.
    pub async fn list_comments(&self, decision_id: &str) -> ApiResult<Vec<CommentView>> {
        self.public_decision(decision_id).await?;
        let comments = self.comments.comments_for_decision(decision_id).await?;
        let mut views = Vec::with_capacity(comments.len());
        for comment in comments {
            let Some(author) = self.users.user_by_id(&comment.user_id).await? else {
                continue;
            };
            views.push(CommentView {
                id: comment.id,
                user_id: comment.user_id,
                username: author.username,
                user_avatar: author.avatar,
                content: comment.content,
                created_at: comment.created_at,
                likes: comment.likes,
            });
        }
        Ok(views)
    }

    /// Soft-delete one's own comment.
    pub async fn delete_comment(&self, caller_id: &str, comment_id: &str) -> ApiResult<()> {
        let Some(comment) = self.comments.comment_by_id(comment_id).await? else {
            return Err(Error::not_found("Comment not found"));
        };
        if comment.user_id != caller_id {
            return Err(Error::forbidden("You cannot delete this comment"));
        }
        self.comments
            .soft_delete_comment(comment_id, Utc::now())
            .await?;
        Ok(())
    }

    /// Cast or change a helpful/unhelpful vote on a public decision.
    pub async fn vote(
        &self,
        voter: &User,
        decision_id: &str,
        vote_type: VoteKind,
    ) -> ApiResult<VoteStatsView> {
        self.public_decision(decision_id).await?;
        let stats = self
            .comments
            .upsert_vote(Vote::new(&voter.id, decision_id, vote_type))
            .await?;
        // The aggregate is denormalised onto the decision document, the way
        // the feed reads it.
        self.decisions
            .set_vote_stats(decision_id, stats.clone())
            .await?;
        Ok(stats.into())
    }

    /// Vote aggregate for a public decision.
    pub async fn vote_stats(&self, decision_id: &str) -> ApiResult<VoteStatsView> {
        self.public_decision(decision_id).await?;
        Ok(self.comments.vote_stats(decision_id).await?.into())
    }

    async fn public_decision(&self, decision_id: &str) -> ApiResult<Decision> {
        match self.decisions.decision_by_id(decision_id).await? {
            Some(decision) if decision.privacy == PrivacyLevel::Public => Ok(decision),
            _ => Err(Error::not_found("Decision not found or not public")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ErrorCode;
    use crate::domain::user::Subscription;
    use crate::outbound::memory::MemoryStore;

    async fn seeded_user(store: &Arc<MemoryStore>, username: &str) -> User {
        let user = User::new(
            username,
            format!("{username}@example.com"),
            "hash",
            username.to_uppercase(),
            "https://example.com/a.png",
            Subscription::default(),
        );
        store.insert_user(user.clone()).await.expect("seed user");
        user
    }

    async fn seeded_decision(
        store: &Arc<MemoryStore>,
        owner: &User,
        privacy: PrivacyLevel,
    ) -> Decision {
        let decision = Decision::new(
            &owner.id,
            "soup or salad?",
            [
                "Soup".to_string(),
                "Salad".to_string(),
                "Both".to_string(),
                "Neither".to_string(),
            ],
            privacy,
        );
        store
            .insert_decision(decision.clone())
            .await
            .expect("seed decision");
        decision
    }

    fn service(store: &Arc<MemoryStore>) -> CommentService {
        CommentService::new(store.clone(), store.clone(), store.clone())
    }

    #[tokio::test]
    async fn comments_require_a_public_decision() {
        let store = Arc::new(MemoryStore::new());
        let alice = seeded_user(&store, "alice").await;
        let private = seeded_decision(&store, &alice, PrivacyLevel::Private).await;
        let service = service(&store);

        let err = service
            .add_comment(&alice, &private.id, "nice")
            .await
            .expect_err("private decision");
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn deleted_comments_disappear_from_listings() {
        let store = Arc::new(MemoryStore::new());
        let alice = seeded_user(&store, "alice").await;
        let bob = seeded_user(&store, "bob").await;
        let decision = seeded_decision(&store, &alice, PrivacyLevel::Public).await;
        let service = service(&store);

        let comment_id = service
            .add_comment(&bob, &decision.id, "roll it!")
            .await
            .expect("comment");

        let listed = service.list_comments(&decision.id).await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].username, "bob");

        // Only the author can delete.
        let err = service
            .delete_comment(&alice.id, &comment_id)
            .await
            .expect_err("foreign delete");
        assert_eq!(err.code, ErrorCode::Forbidden);

        service
            .delete_comment(&bob.id, &comment_id)
            .await
            .expect("delete");
        assert!(service
            .list_comments(&decision.id)
            .await
            .expect("list")
            .is_empty());
    }

    #[tokio::test]
    async fn revoting_updates_in_place() {
        let store = Arc::new(MemoryStore::new());
        let alice = seeded_user(&store, "alice").await;
        let bob = seeded_user(&store, "bob").await;
        let decision = seeded_decision(&store, &alice, PrivacyLevel::Public).await;
        let service = service(&store);

        let stats = service
            .vote(&bob, &decision.id, VoteKind::Helpful)
            .await
            .expect("vote");
        assert_eq!(stats.helpful, 1);
        assert_eq!(stats.total, 1);

        let stats = service
            .vote(&bob, &decision.id, VoteKind::Unhelpful)
            .await
            .expect("revote");
        assert_eq!(stats.helpful, 0);
        assert_eq!(stats.unhelpful, 1);
        assert_eq!(stats.total, 1);
        assert_eq!(stats.helpful_percentage, 0);

        // The aggregate is mirrored onto the decision document.
        let stored = store
            .decision_by_id(&decision.id)
            .await
            .expect("get")
            .expect("decision");
        assert_eq!(stored.vote_stats.unhelpful, 1);
    }

    #[tokio::test]
    async fn vote_stats_compute_percentage() {
        let store = Arc::new(MemoryStore::new());
        let alice = seeded_user(&store, "alice").await;
        let bob = seeded_user(&store, "bob").await;
        let carol = seeded_user(&store, "carol").await;
        let decision = seeded_decision(&store, &alice, PrivacyLevel::Public).await;
        let service = service(&store);

        service
            .vote(&bob, &decision.id, VoteKind::Helpful)
            .await
            .expect("vote");
        service
            .vote(&carol, &decision.id, VoteKind::Unhelpful)
            .await
            .expect("vote");

        let stats = service.vote_stats(&decision.id).await.expect("stats");
        assert_eq!(stats.total, 2);
        assert_eq!(stats.helpful_percentage, 50);
    }
}

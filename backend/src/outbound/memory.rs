//! In-memory document store.
//!
//! Stand-in for the external document store behind the domain ports: every
//! collection is a map keyed by document id, every operation is a single
//! read or read-modify-write applied under one lock. Counter updates are
//! therefore atomic with respect to each other; concurrent requests cannot
//! lose updates to `stats.*` or quota counters.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::admin::AdminLogEntry;
use crate::domain::decision::{Decision, VoteStats};
use crate::domain::message::Message;
use crate::domain::notification::Notification;
use crate::domain::ports::{
    AdminLogStore, CommentStore, ConversationHead, DecisionStore, FollowStore, MessageStore,
    NotificationStore, RevokedTokenStore, StoreError, UserStore,
};
use crate::domain::quota::{self, QuotaOutcome};
use crate::domain::social::{Comment, FollowEdge, Vote, VoteKind};
use crate::domain::token::RevokedToken;
use crate::domain::user::{PasswordReset, Stats, Suspension, User, UserSummary};

#[derive(Default)]
struct Collections {
    users: HashMap<String, User>,
    decisions: HashMap<String, Decision>,
    follows: HashMap<(String, String), FollowEdge>,
    messages: Vec<Message>,
    notifications: HashMap<String, Notification>,
    admin_logs: Vec<AdminLogEntry>,
    revoked_tokens: HashMap<String, RevokedToken>,
    comments: HashMap<String, Comment>,
    votes: HashMap<(String, String), Vote>,
}

/// Process-local document store implementing every collection port.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Collections> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Collections> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn recompute_vote_stats(votes: &HashMap<(String, String), Vote>, decision_id: &str) -> VoteStats {
    let mut stats = VoteStats::default();
    for vote in votes.values().filter(|v| v.decision_id == decision_id) {
        match vote.vote_type {
            VoteKind::Helpful => stats.helpful += 1,
            VoteKind::Unhelpful => stats.unhelpful += 1,
        }
    }
    stats.total = stats.helpful + stats.unhelpful;
    stats
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: User) -> Result<(), StoreError> {
        let mut inner = self.write();
        if inner
            .users
            .values()
            .any(|existing| existing.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StoreError::duplicate("email"));
        }
        if inner
            .users
            .values()
            .any(|existing| existing.username.eq_ignore_ascii_case(&user.username))
        {
            return Err(StoreError::duplicate("username"));
        }
        inner.users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn user_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.read().users.get(id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .read()
            .users
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .read()
            .users
            .values()
            .find(|user| user.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn search_users(
        &self,
        query: &str,
        exclude: &str,
        limit: usize,
    ) -> Result<Vec<UserSummary>, StoreError> {
        let needle = query.to_lowercase();
        let inner = self.read();
        let mut matches: Vec<&User> = inner
            .users
            .values()
            .filter(|user| user.id != exclude)
            .filter(|user| {
                user.name.to_lowercase().contains(&needle)
                    || user.username.to_lowercase().contains(&needle)
            })
            .collect();
        matches.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(matches
            .into_iter()
            .take(limit)
            .map(User::summary)
            .collect())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let inner = self.read();
        let mut users: Vec<User> = inner.users.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }

    async fn count_users(&self) -> Result<u64, StoreError> {
        Ok(self.read().users.len() as u64)
    }

    async fn count_suspended(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        Ok(self
            .read()
            .users
            .values()
            .filter(|user| user.suspension.active_at(now))
            .count() as u64)
    }

    async fn set_suspension(&self, id: &str, suspension: Suspension) -> Result<bool, StoreError> {
        let mut inner = self.write();
        match inner.users.get_mut(id) {
            Some(user) => {
                user.suspension = suspension;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn try_consume_quota(
        &self,
        id: &str,
        today: NaiveDate,
    ) -> Result<Option<QuotaOutcome>, StoreError> {
        let mut inner = self.write();
        Ok(inner
            .users
            .get_mut(id)
            .map(|user| quota::check_and_consume(&mut user.subscription, today)))
    }

    async fn record_decision_outcome(
        &self,
        id: &str,
        implemented: bool,
    ) -> Result<Option<Stats>, StoreError> {
        let mut inner = self.write();
        Ok(inner.users.get_mut(id).map(|user| {
            user.stats.record_outcome(implemented);
            user.stats.clone()
        }))
    }

    async fn adjust_follow_counts(
        &self,
        follower_id: &str,
        following_id: &str,
        delta: i32,
    ) -> Result<(), StoreError> {
        let mut inner = self.write();
        if let Some(follower) = inner.users.get_mut(follower_id) {
            follower.stats.following = follower.stats.following.saturating_add_signed(delta);
        }
        if let Some(target) = inner.users.get_mut(following_id) {
            target.stats.followers = target.stats.followers.saturating_add_signed(delta);
        }
        Ok(())
    }

    async fn set_password_hash(&self, id: &str, hash: String) -> Result<bool, StoreError> {
        let mut inner = self.write();
        match inner.users.get_mut(id) {
            Some(user) => {
                user.password_hash = hash;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_password_reset(
        &self,
        id: &str,
        reset: Option<PasswordReset>,
    ) -> Result<bool, StoreError> {
        let mut inner = self.write();
        match inner.users.get_mut(id) {
            Some(user) => {
                user.password_reset = reset;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn user_by_reset_token(
        &self,
        token_sha256: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        Ok(self
            .read()
            .users
            .values()
            .find(|user| {
                user.password_reset.as_ref().is_some_and(|reset| {
                    reset.token_sha256 == token_sha256 && reset.expires_at > now
                })
            })
            .cloned())
    }
}

#[async_trait]
impl DecisionStore for MemoryStore {
    async fn insert_decision(&self, decision: Decision) -> Result<(), StoreError> {
        self.write()
            .decisions
            .insert(decision.id.clone(), decision);
        Ok(())
    }

    async fn decision_by_id(&self, id: &str) -> Result<Option<Decision>, StoreError> {
        Ok(self.read().decisions.get(id).cloned())
    }

    async fn update_decision(&self, decision: Decision) -> Result<bool, StoreError> {
        let mut inner = self.write();
        match inner.decisions.get_mut(&decision.id) {
            Some(existing) => {
                *existing = decision;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn decisions_for_user(&self, user_id: &str) -> Result<Vec<Decision>, StoreError> {
        let inner = self.read();
        let mut decisions: Vec<Decision> = inner
            .decisions
            .values()
            .filter(|decision| decision.user_id == user_id)
            .cloned()
            .collect();
        decisions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(decisions)
    }

    async fn public_rolled(&self, skip: usize, limit: usize) -> Result<Vec<Decision>, StoreError> {
        use crate::domain::decision::PrivacyLevel;
        let inner = self.read();
        let mut decisions: Vec<Decision> = inner
            .decisions
            .values()
            .filter(|decision| decision.privacy == PrivacyLevel::Public)
            .filter(|decision| decision.dice_result().is_some())
            .cloned()
            .collect();
        decisions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(decisions.into_iter().skip(skip).take(limit).collect())
    }

    async fn count_decisions(&self) -> Result<u64, StoreError> {
        Ok(self.read().decisions.len() as u64)
    }

    async fn set_vote_stats(&self, id: &str, stats: VoteStats) -> Result<bool, StoreError> {
        let mut inner = self.write();
        match inner.decisions.get_mut(id) {
            Some(decision) => {
                decision.vote_stats = stats;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl FollowStore for MemoryStore {
    async fn insert_follow(&self, edge: FollowEdge) -> Result<(), StoreError> {
        let mut inner = self.write();
        let key = (edge.follower_id.clone(), edge.following_id.clone());
        if inner.follows.contains_key(&key) {
            return Err(StoreError::duplicate("follow"));
        }
        inner.follows.insert(key, edge);
        Ok(())
    }

    async fn delete_follow(
        &self,
        follower_id: &str,
        following_id: &str,
    ) -> Result<bool, StoreError> {
        let key = (follower_id.to_string(), following_id.to_string());
        Ok(self.write().follows.remove(&key).is_some())
    }

    async fn is_following(
        &self,
        follower_id: &str,
        following_id: &str,
    ) -> Result<bool, StoreError> {
        let key = (follower_id.to_string(), following_id.to_string());
        Ok(self.read().follows.contains_key(&key))
    }

    async fn followers_of(&self, user_id: &str) -> Result<Vec<String>, StoreError> {
        let inner = self.read();
        let mut edges: Vec<&FollowEdge> = inner
            .follows
            .values()
            .filter(|edge| edge.following_id == user_id)
            .collect();
        edges.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(edges.iter().map(|edge| edge.follower_id.clone()).collect())
    }

    async fn following_of(&self, user_id: &str) -> Result<Vec<String>, StoreError> {
        let inner = self.read();
        let mut edges: Vec<&FollowEdge> = inner
            .follows
            .values()
            .filter(|edge| edge.follower_id == user_id)
            .collect();
        edges.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(edges.iter().map(|edge| edge.following_id.clone()).collect())
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn insert_message(&self, message: Message) -> Result<(), StoreError> {
        self.write().messages.push(message);
        Ok(())
    }

    async fn conversation(&self, user_a: &str, user_b: &str) -> Result<Vec<Message>, StoreError> {
        // Insertion order is chronological for an append-only collection.
        Ok(self
            .read()
            .messages
            .iter()
            .filter(|m| {
                (m.sender_id == user_a && m.recipient_id == user_b)
                    || (m.sender_id == user_b && m.recipient_id == user_a)
            })
            .cloned()
            .collect())
    }

    async fn mark_conversation_read(
        &self,
        sender_id: &str,
        recipient_id: &str,
    ) -> Result<u64, StoreError> {
        let mut inner = self.write();
        let mut touched = 0;
        for message in inner
            .messages
            .iter_mut()
            .filter(|m| m.sender_id == sender_id && m.recipient_id == recipient_id && !m.read)
        {
            message.read = true;
            touched += 1;
        }
        Ok(touched)
    }

    async fn conversation_heads(
        &self,
        user_id: &str,
    ) -> Result<Vec<ConversationHead>, StoreError> {
        let inner = self.read();
        let mut heads: HashMap<String, ConversationHead> = HashMap::new();
        for message in inner
            .messages
            .iter()
            .filter(|m| m.sender_id == user_id || m.recipient_id == user_id)
        {
            let partner_id = if message.sender_id == user_id {
                message.recipient_id.clone()
            } else {
                message.sender_id.clone()
            };
            let unread_increment =
                u64::from(message.recipient_id == user_id && !message.read);
            heads
                .entry(partner_id.clone())
                .and_modify(|head| {
                    head.unread += unread_increment;
                    if message.created_at >= head.last_message.created_at {
                        head.last_message = message.clone();
                    }
                })
                .or_insert_with(|| ConversationHead {
                    partner_id,
                    last_message: message.clone(),
                    unread: unread_increment,
                });
        }
        let mut list: Vec<ConversationHead> = heads.into_values().collect();
        list.sort_by(|a, b| b.last_message.created_at.cmp(&a.last_message.created_at));
        Ok(list)
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert_notification(&self, notification: Notification) -> Result<(), StoreError> {
        self.write()
            .notifications
            .insert(notification.id.clone(), notification);
        Ok(())
    }

    async fn notifications_for(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Notification>, StoreError> {
        let inner = self.read();
        let mut notifications: Vec<Notification> = inner
            .notifications
            .values()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        notifications.truncate(limit);
        Ok(notifications)
    }

    async fn unread_count(&self, user_id: &str) -> Result<u64, StoreError> {
        Ok(self
            .read()
            .notifications
            .values()
            .filter(|n| n.user_id == user_id && !n.read)
            .count() as u64)
    }

    async fn mark_read(&self, id: &str, user_id: &str) -> Result<bool, StoreError> {
        let mut inner = self.write();
        match inner.notifications.get_mut(id) {
            Some(notification) if notification.user_id == user_id => {
                notification.read = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl AdminLogStore for MemoryStore {
    async fn append(&self, entry: AdminLogEntry) -> Result<(), StoreError> {
        self.write().admin_logs.push(entry);
        Ok(())
    }

    async fn list(&self, skip: usize, limit: usize) -> Result<Vec<AdminLogEntry>, StoreError> {
        Ok(self
            .read()
            .admin_logs
            .iter()
            .rev()
            .skip(skip)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RevokedTokenStore for MemoryStore {
    async fn revoke(&self, record: RevokedToken) -> Result<(), StoreError> {
        self.write()
            .revoked_tokens
            .entry(record.jti.clone())
            .or_insert(record);
        Ok(())
    }

    async fn is_revoked(&self, jti: &str) -> Result<bool, StoreError> {
        Ok(self.read().revoked_tokens.contains_key(jti))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut inner = self.write();
        let before = inner.revoked_tokens.len();
        inner.revoked_tokens.retain(|_, record| record.expires_at > now);
        Ok((before - inner.revoked_tokens.len()) as u64)
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn insert_comment(&self, comment: Comment) -> Result<(), StoreError> {
        self.write().comments.insert(comment.id.clone(), comment);
        Ok(())
    }

    async fn comment_by_id(&self, id: &str) -> Result<Option<Comment>, StoreError> {
        Ok(self.read().comments.get(id).cloned())
    }

    async fn comments_for_decision(
        &self,
        decision_id: &str,
    ) -> Result<Vec<Comment>, StoreError> {
        let inner = self.read();
        let mut comments: Vec<Comment> = inner
            .comments
            .values()
            .filter(|c| c.decision_id == decision_id && !c.is_deleted)
            .cloned()
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(comments)
    }

    async fn soft_delete_comment(&self, id: &str, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut inner = self.write();
        match inner.comments.get_mut(id) {
            Some(comment) => {
                comment.is_deleted = true;
                comment.deleted_at = Some(now);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn upsert_vote(&self, vote: Vote) -> Result<VoteStats, StoreError> {
        let mut inner = self.write();
        let key = (vote.user_id.clone(), vote.decision_id.clone());
        let decision_id = vote.decision_id.clone();
        inner
            .votes
            .entry(key)
            .and_modify(|existing| {
                existing.vote_type = vote.vote_type;
                existing.updated_at = Some(Utc::now());
            })
            .or_insert(vote);
        Ok(recompute_vote_stats(&inner.votes, &decision_id))
    }

    async fn vote_stats(&self, decision_id: &str) -> Result<VoteStats, StoreError> {
        Ok(recompute_vote_stats(&self.read().votes, decision_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::Subscription;
    use chrono::Duration;

    fn user(username: &str, email: &str) -> User {
        User::new(
            username,
            email,
            "hash",
            username.to_uppercase(),
            "https://example.com/a.png",
            Subscription::default(),
        )
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_case_insensitively() {
        let store = MemoryStore::new();
        store
            .insert_user(user("alice", "alice@example.com"))
            .await
            .expect("insert");
        let err = store
            .insert_user(user("other", "ALICE@example.com"))
            .await
            .expect_err("duplicate email");
        assert_eq!(err, StoreError::duplicate("email"));
    }

    #[tokio::test]
    async fn search_excludes_the_caller_and_matches_name_or_username() {
        let store = MemoryStore::new();
        let alice = user("alice", "alice@example.com");
        let caller_id = alice.id.clone();
        store.insert_user(alice).await.expect("insert");
        store
            .insert_user(user("alicia", "alicia@example.com"))
            .await
            .expect("insert");
        store
            .insert_user(user("bob", "bob@example.com"))
            .await
            .expect("insert");

        let found = store
            .search_users("ali", &caller_id, 20)
            .await
            .expect("search");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].username, "alicia");
    }

    #[tokio::test]
    async fn revocation_is_idempotent_and_purgeable() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let record = RevokedToken {
            jti: "abc".to_string(),
            revoked_at: now,
            expires_at: now + Duration::days(1),
        };
        store.revoke(record.clone()).await.expect("revoke");
        store.revoke(record).await.expect("revoke again");
        assert!(store.is_revoked("abc").await.expect("check"));

        assert_eq!(
            store
                .purge_expired(now + Duration::days(2))
                .await
                .expect("purge"),
            1
        );
        assert!(!store.is_revoked("abc").await.expect("check"));
    }

    #[tokio::test]
    async fn admin_log_pagination_is_most_recent_first() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store
                .append(AdminLogEntry::new(
                    "root",
                    format!("a{i}"),
                    None,
                    serde_json::json!({}),
                    None,
                ))
                .await
                .expect("append");
        }
        let page = store.list(1, 2).await.expect("list");
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].action, "a3");
        assert_eq!(page[1].action, "a2");
    }
}

//! Follow graph operations and user search.

use std::sync::Arc;

use serde_json::json;
use tracing::warn;

use super::error::{ApiResult, Error};
use super::notification::NotificationKind;
use super::notification_service::NotificationService;
use super::ports::{FollowStore, StoreError, UserStore};
use super::social::FollowEdge;
use super::user::{User, UserSummary};

/// Maximum results returned by user search.
const SEARCH_LIMIT: usize = 20;

pub struct SocialService {
    follows: Arc<dyn FollowStore>,
    users: Arc<dyn UserStore>,
    notifications: Arc<NotificationService>,
}

impl SocialService {
    pub fn new(
        follows: Arc<dyn FollowStore>,
        users: Arc<dyn UserStore>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            follows,
            users,
            notifications,
        }
    }

    /// Follow `target_id`, bump both counters, and notify the target.
    pub async fn follow(&self, follower: &User, target_id: &str) -> ApiResult<()> {
        if follower.id == target_id {
            return Err(Error::invalid_request("Cannot follow yourself"));
        }
        if self.users.user_by_id(target_id).await?.is_none() {
            return Err(Error::not_found("User not found"));
        }

        match self
            .follows
            .insert_follow(FollowEdge::new(&follower.id, target_id))
            .await
        {
            Ok(()) => {}
            Err(StoreError::Duplicate { .. }) => {
                return Err(Error::conflict("Already following this user"));
            }
            Err(err) => return Err(err.into()),
        }
        self.users
            .adjust_follow_counts(&follower.id, target_id, 1)
            .await?;

        // Fan-out is best-effort on top of the durable edge; a notification
        // failure must not roll back the follow.
        if let Err(err) = self
            .notifications
            .notify(
                target_id,
                NotificationKind::Follow,
                format!("{} started following you", follower.name),
                json!({
                    "follower_id": follower.id,
                    "username": follower.username,
                }),
            )
            .await
        {
            warn!(error = %err, "follow notification failed");
        }
        Ok(())
    }

    /// Remove a follow edge and decrement both counters.
    pub async fn unfollow(&self, follower_id: &str, target_id: &str) -> ApiResult<()> {
        if !self.follows.delete_follow(follower_id, target_id).await? {
            return Err(Error::invalid_request("Not following this user"));
        }
        self.users
            .adjust_follow_counts(follower_id, target_id, -1)
            .await?;
        Ok(())
    }

    /// Case-insensitive search over names and usernames, excluding the
    /// caller.
    pub async fn search(&self, query: &str, caller_id: &str) -> ApiResult<Vec<UserSummary>> {
        Ok(self
            .users
            .search_users(query, caller_id, SEARCH_LIMIT)
            .await?)
    }

    /// Users following `user_id`.
    pub async fn followers(&self, user_id: &str) -> ApiResult<Vec<UserSummary>> {
        self.summaries(self.follows.followers_of(user_id).await?)
            .await
    }

    /// Users that `user_id` follows.
    pub async fn following(&self, user_id: &str) -> ApiResult<Vec<UserSummary>> {
        self.summaries(self.follows.following_of(user_id).await?)
            .await
    }

    /// Whether both directed edges exist between two users.
    pub async fn is_mutual(&self, user_a: &str, user_b: &str) -> ApiResult<bool> {
        Ok(self.follows.is_following(user_a, user_b).await?
            && self.follows.is_following(user_b, user_a).await?)
    }

    async fn summaries(&self, ids: Vec<String>) -> ApiResult<Vec<UserSummary>> {
        let mut result = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(user) = self.users.user_by_id(&id).await? {
                result.push(user.summary());
            }
        }
        Ok(result)
    }
}

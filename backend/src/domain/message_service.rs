//! Direct messaging between users.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use super::error::{ApiResult, Error};
use super::message::Message;
use super::notification::NotificationKind;
use super::notification_service::NotificationService;
use super::ports::{FollowStore, MessageStore, UserStore};
use super::user::{User, UserSummary};

/// Behaviour toggles for messaging.
#[derive(Debug, Clone, Copy)]
pub struct MessagePolicy {
    /// When true (the default), messages require a
    /// mutual follow between sender and recipient.
    pub require_mutual_follow: bool,
}

impl Default for MessagePolicy {
    fn default() -> Self {
        Self {
            require_mutual_follow: true,
        }
    }
}

/// Conversation list entry: partner, latest message, unread tally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationView {
    pub user: UserSummary,
    pub last_message: String,
    pub time: chrono::DateTime<chrono::Utc>,
    pub unread: u64,
}

pub struct MessageService {
    messages: Arc<dyn MessageStore>,
    users: Arc<dyn UserStore>,
    follows: Arc<dyn FollowStore>,
    notifications: Arc<NotificationService>,
    policy: MessagePolicy,
}

impl MessageService {
    pub fn new(
        messages: Arc<dyn MessageStore>,
        users: Arc<dyn UserStore>,
        follows: Arc<dyn FollowStore>,
        notifications: Arc<NotificationService>,
        policy: MessagePolicy,
    ) -> Self {
        Self {
            messages,
            users,
            follows,
            notifications,
            policy,
        }
    }

    /// Send a direct message and fan out a notification to the recipient.
    pub async fn send(
        &self,
        sender: &User,
        recipient_id: &str,
        content: &str,
    ) -> ApiResult<String> {
        let content = content.trim();
        if content.is_empty() {
            return Err(Error::invalid_request("Message content must not be empty"));
        }
        if self.users.user_by_id(recipient_id).await?.is_none() {
            return Err(Error::not_found("Recipient not found"));
        }
        if self.policy.require_mutual_follow && !self.mutual(&sender.id, recipient_id).await? {
            return Err(Error::forbidden(
                "You can only message users you mutually follow",
            ));
        }

        let message = Message::new(&sender.id, recipient_id, content);
        let message_id = message.id.clone();
        self.messages.insert_message(message).await?;

        if let Err(err) = self
            .notifications
            .notify(
                recipient_id,
                NotificationKind::Message,
                format!("New message from {}", sender.name),
                json!({
                    "sender_id": sender.id,
                    "message_id": message_id,
                }),
            )
            .await
        {
            warn!(error = %err, "message notification failed");
        }
        Ok(message_id)
    }

    /// Conversation list for the caller, most recently active first.
    pub async fn conversations(&self, user_id: &str) -> ApiResult<Vec<ConversationView>> {
        let heads = self.messages.conversation_heads(user_id).await?;
        let mut views = Vec::with_capacity(heads.len());
        for head in heads {
            let Some(partner) = self.users.user_by_id(&head.partner_id).await? else {
                continue;
            };
            views.push(ConversationView {
                user: partner.summary(),
                last_message: head.last_message.content,
                time: head.last_message.created_at,
                unread: head.unread,
            });
        }
        Ok(views)
    }

    /// Full thread with `partner_id`, oldest first. Marks everything the
    /// partner sent to the caller as read.
    pub async fn conversation_with(
        &self,
        user_id: &str,
        partner_id: &str,
    ) -> ApiResult<Vec<Message>> {
        let thread = self.messages.conversation(user_id, partner_id).await?;
        self.messages
            .mark_conversation_read(partner_id, user_id)
            .await?;
        Ok(thread)
    }

    async fn mutual(&self, a: &str, b: &str) -> ApiResult<bool> {
        Ok(self.follows.is_following(a, b).await? && self.follows.is_following(b, a).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ErrorCode;
    use crate::domain::ports::NotificationStore;
    use crate::domain::ports::test_support::RecordingPush;
    use crate::domain::social::FollowEdge;
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

    async fn make_mutual(store: &Arc<MemoryStore>, a: &User, b: &User) {
        store
            .insert_follow(FollowEdge::new(&a.id, &b.id))
            .await
            .expect("edge a->b");
        store
            .insert_follow(FollowEdge::new(&b.id, &a.id))
            .await
            .expect("edge b->a");
    }

    fn service(store: &Arc<MemoryStore>, policy: MessagePolicy) -> (MessageService, Arc<RecordingPush>) {
        let push = Arc::new(RecordingPush::default());
        let notifications = Arc::new(NotificationService::new(store.clone(), push.clone()));
        (
            MessageService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                notifications,
                policy,
            ),
            push,
        )
    }

    #[tokio::test]
    async fn send_without_mutual_follow_is_forbidden() {
        let store = Arc::new(MemoryStore::new());
        let alice = seeded_user(&store, "alice").await;
        let bob = seeded_user(&store, "bob").await;
        let (service, _) = service(&store, MessagePolicy::default());

        let err = service
            .send(&alice, &bob.id, "hi")
            .await
            .expect_err("no mutual follow");
        assert_eq!(err.code, ErrorCode::Forbidden);

        // One-directional is still not enough.
        store
            .insert_follow(FollowEdge::new(&alice.id, &bob.id))
            .await
            .expect("edge");
        let err = service
            .send(&alice, &bob.id, "hi")
            .await
            .expect_err("one-way follow");
        assert_eq!(err.code, ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn policy_off_allows_strangers() {
        let store = Arc::new(MemoryStore::new());
        let alice = seeded_user(&store, "alice").await;
        let bob = seeded_user(&store, "bob").await;
        let (service, _) = service(
            &store,
            MessagePolicy {
                require_mutual_follow: false,
            },
        );
        service.send(&alice, &bob.id, "hi").await.expect("send");
    }

    #[tokio::test]
    async fn send_persists_notification_even_when_recipient_is_offline() {
        let store = Arc::new(MemoryStore::new());
        let alice = seeded_user(&store, "alice").await;
        let bob = seeded_user(&store, "bob").await;
        make_mutual(&store, &alice, &bob).await;
        let (service, push) = service(&store, MessagePolicy::default());

        service.send(&alice, &bob.id, "hi bob").await.expect("send");

        // The push double records the frame; the durable record is the
        // notification row either way.
        assert_eq!(push.sent.lock().expect("test mutex").len(), 1);
        assert_eq!(store.unread_count(&bob.id).await.expect("count"), 1);
    }

    #[tokio::test]
    async fn conversations_group_by_partner_with_unread_counts() {
        let store = Arc::new(MemoryStore::new());
        let alice = seeded_user(&store, "alice").await;
        let bob = seeded_user(&store, "bob").await;
        make_mutual(&store, &alice, &bob).await;
        let (service, _) = service(&store, MessagePolicy::default());

        service.send(&alice, &bob.id, "one").await.expect("send");
        service.send(&alice, &bob.id, "two").await.expect("send");
        service.send(&bob, &alice.id, "reply").await.expect("send");

        let bob_view = service.conversations(&bob.id).await.expect("list");
        assert_eq!(bob_view.len(), 1);
        assert_eq!(bob_view[0].user.username, "alice");
        assert_eq!(bob_view[0].last_message, "reply");
        assert_eq!(bob_view[0].unread, 2);
    }

    #[tokio::test]
    async fn reading_a_thread_marks_it_read() {
        let store = Arc::new(MemoryStore::new());
        let alice = seeded_user(&store, "alice").await;
        let bob = seeded_user(&store, "bob").await;
        make_mutual(&store, &alice, &bob).await;
        let (service, _) = service(&store, MessagePolicy::default());

        service.send(&alice, &bob.id, "one").await.expect("send");
        service.send(&alice, &bob.id, "two").await.expect("send");

        let thread = service
            .conversation_with(&bob.id, &alice.id)
            .await
            .expect("thread");
        assert_eq!(thread.len(), 2);
        assert_eq!(thread[0].content, "one");

        let view = service.conversations(&bob.id).await.expect("list");
        assert_eq!(view[0].unread, 0);
    }

    #[tokio::test]
    async fn empty_content_and_unknown_recipient_are_rejected() {
        let store = Arc::new(MemoryStore::new());
        let alice = seeded_user(&store, "alice").await;
        let (service, _) = service(&store, MessagePolicy::default());

        let err = service
            .send(&alice, "missing", "hi")
            .await
            .expect_err("unknown recipient");
        assert_eq!(err.code, ErrorCode::NotFound);

        let bob = seeded_user(&store, "bob").await;
        let err = service
            .send(&alice, &bob.id, "   ")
            .await
            .expect_err("blank content");
        assert_eq!(err.code, ErrorCode::InvalidRequest);
    }
}

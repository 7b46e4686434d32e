//! Notification fan-out: persist first, push opportunistically.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::debug;

use super::error::{ApiResult, Error};
use super::notification::{Notification, NotificationKind};
use super::ports::{NotificationStore, RealtimePush};

/// Default page size for notification listings.
pub const DEFAULT_LIST_LIMIT: usize = 50;

/// Persists notification records and attempts immediate realtime delivery.
pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
    push: Arc<dyn RealtimePush>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn NotificationStore>, push: Arc<dyn RealtimePush>) -> Self {
        Self { store, push }
    }

    /// Persist a notification, then try to deliver it over the live channel.
    ///
    /// Persistence always happens; delivery is best-effort and silently
    /// dropped when the target has no connection.
    pub async fn notify(
        &self,
        user_id: &str,
        kind: NotificationKind,
        content: impl Into<String>,
        data: Value,
    ) -> ApiResult<Notification> {
        let notification = Notification::new(user_id, kind, content, data);
        self.store.insert_notification(notification.clone()).await?;

        let envelope = json!({
            "type": notification.kind,
            "payload": {
                "id": notification.id,
                "content": notification.content,
                "data": notification.data,
                "created_at": notification.created_at,
            },
        });
        self.push.send_direct(user_id, envelope.to_string());
        debug!(user_id, kind = ?notification.kind, "notification fan-out");
        Ok(notification)
    }

    /// Most recent notifications for `user_id`.
    pub async fn list(&self, user_id: &str, limit: usize) -> ApiResult<Vec<Notification>> {
        Ok(self.store.notifications_for(user_id, limit).await?)
    }

    /// Number of unread notifications.
    pub async fn unread_count(&self, user_id: &str) -> ApiResult<u64> {
        Ok(self.store.unread_count(user_id).await?)
    }

    /// Mark one of the caller's notifications as read.
    pub async fn mark_read(&self, id: &str, user_id: &str) -> ApiResult<()> {
        if self.store.mark_read(id, user_id).await? {
            Ok(())
        } else {
            Err(Error::not_found("Notification not found"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::test_support::RecordingPush;
    use crate::outbound::memory::MemoryStore;

    fn service() -> (NotificationService, Arc<MemoryStore>, Arc<RecordingPush>) {
        let store = Arc::new(MemoryStore::new());
        let push = Arc::new(RecordingPush::default());
        (
            NotificationService::new(store.clone(), push.clone()),
            store,
            push,
        )
    }

    #[tokio::test]
    async fn notify_persists_and_pushes() {
        let (service, _store, push) = service();
        let notification = service
            .notify("u1", NotificationKind::Follow, "alice follows you", json!({}))
            .await
            .expect("notify");

        assert_eq!(service.unread_count("u1").await.expect("count"), 1);
        let sent = push.sent.lock().expect("test mutex");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "u1");
        let frame: Value = serde_json::from_str(&sent[0].1).expect("frame json");
        assert_eq!(frame["type"], "follow");
        assert_eq!(frame["payload"]["id"], notification.id.as_str());
    }

    #[tokio::test]
    async fn mark_read_rejects_foreign_notifications() {
        let (service, _store, _push) = service();
        let notification = service
            .notify("u1", NotificationKind::Message, "hi", json!({}))
            .await
            .expect("notify");

        let err = service
            .mark_read(&notification.id, "someone-else")
            .await
            .expect_err("foreign mark must fail");
        assert_eq!(err.code, crate::domain::error::ErrorCode::NotFound);

        service
            .mark_read(&notification.id, "u1")
            .await
            .expect("owner can mark read");
        assert_eq!(service.unread_count("u1").await.expect("count"), 0);
    }

    #[tokio::test]
    async fn listing_is_most_recent_first() {
        let (service, _store, _push) = service();
        for i in 0..3 {
            service
                .notify("u1", NotificationKind::Message, format!("m{i}"), json!({}))
                .await
                .expect("notify");
        }
        let listed = service.list("u1", 2).await.expect("list");
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].content, "m2");
        assert_eq!(listed[1].content, "m1");
    }
}

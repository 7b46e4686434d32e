//! Dependency bundle for HTTP handlers.

use std::sync::Arc;

use crate::domain::{
    AccountService, AdminService, CommentService, DecisionService, MessageService,
    NotificationService, SocialService,
};

/// Everything the HTTP handlers need, cloned per worker.
#[derive(Clone)]
pub struct HttpState {
    pub accounts: Arc<AccountService>,
    pub decisions: Arc<DecisionService>,
    pub social: Arc<SocialService>,
    pub messages: Arc<MessageService>,
    pub notifications: Arc<NotificationService>,
    pub comments: Arc<CommentService>,
    pub admin: Arc<AdminService>,
}

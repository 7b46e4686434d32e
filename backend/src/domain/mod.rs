//! Domain entities, services, and ports.
//!
//! Services orchestrate the ports; inbound adapters call services and map
//! [`Error`] into transport responses. Nothing in here knows about HTTP.

pub mod account_service;
pub mod admin;
pub mod admin_service;
pub mod comment_service;
pub mod decision;
pub mod decision_service;
pub mod error;
pub mod message;
pub mod message_service;
pub mod notification;
pub mod notification_service;
pub mod ports;
pub mod quota;
pub mod social;
pub mod social_service;
pub mod token;
pub mod user;

pub use account_service::{AccountService, AdminCredentials, Registration};
pub use admin::{AdminContext, AdminLogEntry, AdminUserView, DashboardCounts};
pub use admin_service::AdminService;
pub use comment_service::{CommentService, CommentView, VoteStatsView};
pub use decision::{ALTERNATIVE_COUNT, Decision, DecisionState, PrivacyLevel, VoteStats};
pub use decision_service::{
    DecisionPolicy, DecisionService, FALLBACK_ALTERNATIVES, PublicDecision,
};
pub use error::{ApiResult, Error, ErrorCode};
pub use message::Message;
pub use message_service::{ConversationView, MessagePolicy, MessageService};
pub use notification::{Notification, NotificationKind};
pub use notification_service::NotificationService;
pub use social::{Comment, FollowEdge, Vote, VoteKind};
pub use social_service::SocialService;
pub use token::{Claims, IssuedToken, TokenIssuer};
pub use user::{Stats, Subscription, Suspension, User, UserProfile, UserSummary};

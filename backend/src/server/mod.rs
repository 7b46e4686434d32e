//! Server construction: state wiring, app assembly, listener startup.

mod config;

pub use config::{AppConfig, ConfigError, GeneratorConfig};

use std::sync::Arc;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use tracing::warn;

use crate::domain::ports::{AlternativeSource, FixtureAlternativeSource};
use crate::domain::{
    AccountService, AdminCredentials, AdminService, CommentService, DecisionPolicy,
    DecisionService, MessagePolicy, MessageService, NotificationService, SocialService,
    TokenIssuer,
};
use crate::inbound::http::health::HealthState;
use crate::inbound::http::{self, HttpState, health};
use crate::inbound::ws::{self, WsState};
use crate::middleware::Trace;
use crate::outbound::generator::GeneratorHttpSource;
use crate::outbound::memory::MemoryStore;
use crate::outbound::realtime::ConnectionRegistry;

/// Fully wired application state, shared across workers.
#[derive(Clone)]
pub struct AppState {
    pub http: web::Data<HttpState>,
    pub ws: web::Data<WsState>,
    pub health: web::Data<HealthState>,
}

/// Wire services onto a fresh in-memory store and connection registry.
pub fn build_state(config: &AppConfig) -> AppState {
    let store = Arc::new(MemoryStore::new());
    let registry = Arc::new(ConnectionRegistry::new());

    let accounts = Arc::new(AccountService::new(
        store.clone(),
        store.clone(),
        TokenIssuer::new(config.token_secret.as_bytes(), config.token_ttl_days),
        AdminCredentials {
            username: config.admin_username.clone(),
            password: config.admin_password.clone(),
        },
        config.daily_query_limit,
    ));

    let generator: Arc<dyn AlternativeSource> = match &config.generator {
        Some(settings) => {
            match GeneratorHttpSource::new(
                settings.url.clone(),
                settings.api_key.clone(),
                settings.timeout,
            ) {
                Ok(source) => Arc::new(source),
                Err(err) => {
                    warn!(error = %err, "generator client unavailable; using fixture source");
                    Arc::new(FixtureAlternativeSource)
                }
            }
        }
        None => Arc::new(FixtureAlternativeSource),
    };

    let notifications = Arc::new(NotificationService::new(store.clone(), registry.clone()));
    let decisions = Arc::new(DecisionService::new(
        store.clone(),
        store.clone(),
        generator,
        DecisionPolicy {
            allow_reroll: config.allow_reroll,
        },
    ));
    let social = Arc::new(SocialService::new(
        store.clone(),
        store.clone(),
        notifications.clone(),
    ));
    let messages = Arc::new(MessageService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        notifications.clone(),
        MessagePolicy {
            require_mutual_follow: config.require_mutual_follow,
        },
    ));
    let comments = Arc::new(CommentService::new(
        store.clone(),
        store.clone(),
        store.clone(),
    ));
    let admin = Arc::new(AdminService::new(store.clone(), store.clone(), store));

    AppState {
        http: web::Data::new(HttpState {
            accounts: accounts.clone(),
            decisions,
            social,
            messages,
            notifications,
            comments,
            admin,
        }),
        ws: web::Data::new(WsState::new(accounts, registry)),
        health: web::Data::new(HealthState::new()),
    }
}

/// Assemble the Actix application around shared state.
pub fn build_app(
    state: AppState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppState { http, ws, health } = state;

    let api = web::scope("/api")
        .service(http::index)
        .service(http::auth::register)
        .service(http::auth::login)
        .service(http::auth::logout)
        .service(http::auth::admin_login)
        .service(http::auth::me)
        .service(http::auth::password_reset_request)
        .service(http::auth::password_reset_confirm)
        .service(http::decisions::create_decision)
        .service(http::decisions::decision_history)
        .service(http::decisions::public_decisions)
        .service(http::decisions::roll_decision)
        .service(http::decisions::implement_decision)
        .service(http::comments::add_comment)
        .service(http::comments::list_comments)
        .service(http::comments::delete_comment)
        .service(http::comments::vote)
        .service(http::comments::vote_stats)
        .service(http::users::follow)
        .service(http::users::unfollow)
        .service(http::users::search_users)
        .service(http::users::followers)
        .service(http::users::following)
        .service(http::messages::send_message)
        .service(http::messages::conversations)
        .service(http::messages::conversation)
        .service(http::notifications::list_notifications)
        .service(http::notifications::unread_count)
        .service(http::notifications::mark_notification_read)
        .service(http::admin::dashboard)
        .service(http::admin::list_users)
        .service(http::admin::user_detail)
        .service(http::admin::suspend_user)
        .service(http::admin::unsuspend_user)
        .service(http::admin::logs)
        .service(http::admin::export_users);

    App::new()
        .app_data(http)
        .app_data(ws)
        .app_data(health)
        .wrap(Trace)
        .service(api)
        .service(ws::ws_entry)
        .service(health::ready)
        .service(health::live)
}

/// Bind the listener and start serving.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(config: AppConfig) -> std::io::Result<Server> {
    let state = build_state(&config);
    let health_state = state.health.clone();
    let server = HttpServer::new(move || build_app(state.clone()))
        .bind(config.bind_addr)?
        .run();
    health_state.mark_ready();
    Ok(server)
}

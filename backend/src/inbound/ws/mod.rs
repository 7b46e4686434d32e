//! WebSocket entry and shared state.
//!
//! One duplex channel per user, addressed by user id. Clients authenticate
//! the upgrade with a bearer token in the `token` query parameter (browsers
//! cannot set headers on WebSocket handshakes).

use std::sync::Arc;

use actix_web::web::Payload;
use actix_web::{HttpRequest, HttpResponse, get, web};
use serde::Deserialize;
use tracing::error;

use crate::domain::{AccountService, Error};
use crate::inbound::http::ApiResult;
use crate::outbound::realtime::ConnectionRegistry;

pub mod messages;
mod session;

/// Dependency bundle for the WebSocket entry point.
#[derive(Clone)]
pub struct WsState {
    pub accounts: Arc<AccountService>,
    pub registry: Arc<ConnectionRegistry>,
}

impl WsState {
    pub fn new(accounts: Arc<AccountService>, registry: Arc<ConnectionRegistry>) -> Self {
        Self { accounts, registry }
    }
}

#[derive(Debug, Deserialize)]
struct WsQuery {
    token: String,
}

/// Handle the WebSocket upgrade for `/ws`.
#[get("/ws")]
pub async fn ws_entry(
    req: HttpRequest,
    stream: Payload,
    state: web::Data<WsState>,
    query: web::Query<WsQuery>,
) -> ApiResult<HttpResponse> {
    // Same session rules as HTTP: revocation and suspension checked here.
    let user = state.accounts.resolve_session(&query.token).await?;

    let (response, session, message_stream) = actix_ws::handle(&req, stream).map_err(|err| {
        error!(error = %err, "WebSocket upgrade failed");
        Error::internal("WebSocket upgrade failed")
    })?;

    let handle = state.registry.connect(&user.id);
    actix_web::rt::spawn(session::run_session(
        state.registry.clone(),
        user.id,
        session,
        message_stream,
        handle,
    ));
    Ok(response)
}

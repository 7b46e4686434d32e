//! Direct messaging endpoints.

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::Message;
use crate::domain::message_service::ConversationView;
use crate::inbound::http::{ApiResult, BearerToken, HttpState};

/// `POST /api/messages/send` body.
#[derive(Debug, Deserialize, Serialize)]
pub struct SendMessageRequest {
    pub recipient_id: String,
    pub content: String,
}

#[post("/messages/send")]
pub async fn send_message(
    state: web::Data<HttpState>,
    token: BearerToken,
    payload: web::Json<SendMessageRequest>,
) -> ApiResult<HttpResponse> {
    let user = state.accounts.resolve_session(token.as_str()).await?;
    let message_id = state
        .messages
        .send(&user, &payload.recipient_id, &payload.content)
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message_id": message_id,
    })))
}

#[get("/messages/conversations")]
pub async fn conversations(
    state: web::Data<HttpState>,
    token: BearerToken,
) -> ApiResult<web::Json<Vec<ConversationView>>> {
    let user = state.accounts.resolve_session(token.as_str()).await?;
    Ok(web::Json(state.messages.conversations(&user.id).await?))
}

/// Reading a thread marks everything the partner sent as read.
#[get("/messages/conversation/{partner_id}")]
pub async fn conversation(
    state: web::Data<HttpState>,
    token: BearerToken,
    path: web::Path<String>,
) -> ApiResult<web::Json<Vec<Message>>> {
    let user = state.accounts.resolve_session(token.as_str()).await?;
    Ok(web::Json(
        state.messages.conversation_with(&user.id, &path).await?,
    ))
}

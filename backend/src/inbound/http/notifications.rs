//! Notification endpoints.

use actix_web::{HttpResponse, get, put, web};
use serde::Deserialize;
use serde_json::json;

use crate::domain::Notification;
use crate::domain::notification_service::DEFAULT_LIST_LIMIT;
use crate::inbound::http::{ApiResult, BearerToken, HttpState};

/// `GET /api/notifications?limit=` query.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_LIST_LIMIT
}

#[get("/notifications")]
pub async fn list_notifications(
    state: web::Data<HttpState>,
    token: BearerToken,
    query: web::Query<ListQuery>,
) -> ApiResult<web::Json<Vec<Notification>>> {
    let user = state.accounts.resolve_session(token.as_str()).await?;
    Ok(web::Json(
        state.notifications.list(&user.id, query.limit).await?,
    ))
}

#[get("/notifications/unread-count")]
pub async fn unread_count(
    state: web::Data<HttpState>,
    token: BearerToken,
) -> ApiResult<HttpResponse> {
    let user = state.accounts.resolve_session(token.as_str()).await?;
    let unread = state.notifications.unread_count(&user.id).await?;
    Ok(HttpResponse::Ok().json(json!({ "unread": unread })))
}

#[put("/notifications/{id}/read")]
pub async fn mark_notification_read(
    state: web::Data<HttpState>,
    token: BearerToken,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let user = state.accounts.resolve_session(token.as_str()).await?;
    state.notifications.mark_read(&path, &user.id).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

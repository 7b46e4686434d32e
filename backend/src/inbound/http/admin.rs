//! Admin back-office endpoints.
//!
//! Every handler resolves an admin session first and records exactly one
//! audit entry per invocation.

use actix_web::{HttpRequest, HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::AdminLogEntry;
use crate::domain::admin::{AdminUserView, DashboardCounts};
use crate::domain::admin_service::DEFAULT_LOG_LIMIT;
use crate::inbound::http::auth::origin_of;
use crate::inbound::http::{ApiResult, BearerToken, HttpState};

#[get("/admin/dashboard")]
pub async fn dashboard(
    state: web::Data<HttpState>,
    token: BearerToken,
) -> ApiResult<web::Json<DashboardCounts>> {
    state.accounts.resolve_admin_session(token.as_str()).await?;
    Ok(web::Json(state.admin.dashboard().await?))
}

#[get("/admin/users")]
pub async fn list_users(
    state: web::Data<HttpState>,
    token: BearerToken,
    req: HttpRequest,
) -> ApiResult<web::Json<Vec<AdminUserView>>> {
    let context = state.accounts.resolve_admin_session(token.as_str()).await?;
    let users = state.admin.list_users().await?;
    state
        .admin
        .record(
            &context.actor,
            "view_users",
            None,
            json!({ "count": users.len() }),
            origin_of(&req),
        )
        .await?;
    Ok(web::Json(users))
}

#[get("/admin/users/{id}")]
pub async fn user_detail(
    state: web::Data<HttpState>,
    token: BearerToken,
    path: web::Path<String>,
    req: HttpRequest,
) -> ApiResult<web::Json<AdminUserView>> {
    let context = state.accounts.resolve_admin_session(token.as_str()).await?;
    let user = state.admin.user_detail(&path).await?;
    state
        .admin
        .record(
            &context.actor,
            "view_user",
            Some(path.into_inner()),
            json!({}),
            origin_of(&req),
        )
        .await?;
    Ok(web::Json(user))
}

/// `POST /api/admin/users/{id}/suspend` body.
#[derive(Debug, Deserialize, Serialize)]
pub struct SuspendRequest {
    pub reason: String,
    #[serde(default)]
    pub duration_days: Option<i64>,
}

#[post("/admin/users/{id}/suspend")]
pub async fn suspend_user(
    state: web::Data<HttpState>,
    token: BearerToken,
    path: web::Path<String>,
    payload: web::Json<SuspendRequest>,
    req: HttpRequest,
) -> ApiResult<HttpResponse> {
    let context = state.accounts.resolve_admin_session(token.as_str()).await?;
    let target = path.into_inner();
    let suspension = state
        .admin
        .suspend(&target, &payload.reason, payload.duration_days)
        .await?;
    state
        .admin
        .record(
            &context.actor,
            "suspend_user",
            Some(target),
            json!({
                "reason": payload.reason,
                "duration_days": payload.duration_days,
                "until": suspension.until,
            }),
            origin_of(&req),
        )
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "suspension": suspension })))
}

#[post("/admin/users/{id}/unsuspend")]
pub async fn unsuspend_user(
    state: web::Data<HttpState>,
    token: BearerToken,
    path: web::Path<String>,
    req: HttpRequest,
) -> ApiResult<HttpResponse> {
    let context = state.accounts.resolve_admin_session(token.as_str()).await?;
    let target = path.into_inner();
    state.admin.unsuspend(&target).await?;
    state
        .admin
        .record(
            &context.actor,
            "unsuspend_user",
            Some(target),
            json!({}),
            origin_of(&req),
        )
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

/// `GET /api/admin/logs?skip&limit` query.
#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_log_limit")]
    pub limit: usize,
}

fn default_log_limit() -> usize {
    DEFAULT_LOG_LIMIT
}

#[get("/admin/logs")]
pub async fn logs(
    state: web::Data<HttpState>,
    token: BearerToken,
    query: web::Query<LogsQuery>,
) -> ApiResult<web::Json<Vec<AdminLogEntry>>> {
    state.accounts.resolve_admin_session(token.as_str()).await?;
    Ok(web::Json(state.admin.logs(query.skip, query.limit).await?))
}

#[get("/admin/export/users")]
pub async fn export_users(
    state: web::Data<HttpState>,
    token: BearerToken,
    req: HttpRequest,
) -> ApiResult<HttpResponse> {
    let context = state.accounts.resolve_admin_session(token.as_str()).await?;
    let export = state.admin.export_users().await?;
    state
        .admin
        .record(
            &context.actor,
            "export_users",
            None,
            json!({ "count": export["count"] }),
            origin_of(&req),
        )
        .await?;
    Ok(HttpResponse::Ok().json(export))
}

//! Comment and vote endpoints on public decisions.

use actix_web::{HttpResponse, delete, get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::VoteKind;
use crate::domain::comment_service::{CommentView, VoteStatsView};
use crate::inbound::http::{ApiResult, BearerToken, HttpState};

/// `POST /api/decisions/{id}/comments` body.
#[derive(Debug, Deserialize, Serialize)]
pub struct CommentRequest {
    pub content: String,
}

#[post("/decisions/{id}/comments")]
pub async fn add_comment(
    state: web::Data<HttpState>,
    token: BearerToken,
    path: web::Path<String>,
    payload: web::Json<CommentRequest>,
) -> ApiResult<HttpResponse> {
    let user = state.accounts.resolve_session(token.as_str()).await?;
    let comment_id = state
        .comments
        .add_comment(&user, &path, &payload.content)
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "comment_id": comment_id,
        "message": "Comment added",
    })))
}

/// Reads are public, like the decisions they hang off.
#[get("/decisions/{id}/comments")]
pub async fn list_comments(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<Vec<CommentView>>> {
    Ok(web::Json(state.comments.list_comments(&path).await?))
}

#[delete("/comments/{id}")]
pub async fn delete_comment(
    state: web::Data<HttpState>,
    token: BearerToken,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let user = state.accounts.resolve_session(token.as_str()).await?;
    state.comments.delete_comment(&user.id, &path).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Comment deleted" })))
}

/// `POST /api/decisions/{id}/vote` body.
#[derive(Debug, Deserialize, Serialize)]
pub struct VoteRequest {
    pub vote_type: VoteKind,
}

#[post("/decisions/{id}/vote")]
pub async fn vote(
    state: web::Data<HttpState>,
    token: BearerToken,
    path: web::Path<String>,
    payload: web::Json<VoteRequest>,
) -> ApiResult<HttpResponse> {
    let user = state.accounts.resolve_session(token.as_str()).await?;
    let stats = state
        .comments
        .vote(&user, &path, payload.vote_type)
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "vote_stats": stats })))
}

#[get("/decisions/{id}/votes")]
pub async fn vote_stats(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let stats: VoteStatsView = state.comments.vote_stats(&path).await?;
    Ok(HttpResponse::Ok().json(json!({ "vote_stats": stats })))
}

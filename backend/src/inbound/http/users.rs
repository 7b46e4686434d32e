//! Social graph endpoints: follow, unfollow, search, follower listings.

use actix_web::{HttpResponse, delete, get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::user::UserSummary;
use crate::inbound::http::{ApiResult, BearerToken, HttpState};

/// `POST /api/users/follow` body.
#[derive(Debug, Deserialize, Serialize)]
pub struct FollowRequest {
    pub target_user_id: String,
}

#[post("/users/follow")]
pub async fn follow(
    state: web::Data<HttpState>,
    token: BearerToken,
    payload: web::Json<FollowRequest>,
) -> ApiResult<HttpResponse> {
    let user = state.accounts.resolve_session(token.as_str()).await?;
    state.social.follow(&user, &payload.target_user_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

#[delete("/users/unfollow/{id}")]
pub async fn unfollow(
    state: web::Data<HttpState>,
    token: BearerToken,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let user = state.accounts.resolve_session(token.as_str()).await?;
    state.social.unfollow(&user.id, &path).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

/// `GET /api/users/search?q=` query.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[get("/users/search")]
pub async fn search_users(
    state: web::Data<HttpState>,
    token: BearerToken,
    query: web::Query<SearchQuery>,
) -> ApiResult<web::Json<Vec<UserSummary>>> {
    let user = state.accounts.resolve_session(token.as_str()).await?;
    Ok(web::Json(state.social.search(&query.q, &user.id).await?))
}

#[get("/users/{id}/followers")]
pub async fn followers(
    state: web::Data<HttpState>,
    token: BearerToken,
    path: web::Path<String>,
) -> ApiResult<web::Json<Vec<UserSummary>>> {
    state.accounts.resolve_session(token.as_str()).await?;
    Ok(web::Json(state.social.followers(&path).await?))
}

#[get("/users/{id}/following")]
pub async fn following(
    state: web::Data<HttpState>,
    token: BearerToken,
    path: web::Path<String>,
) -> ApiResult<web::Json<Vec<UserSummary>>> {
    state.accounts.resolve_session(token.as_str()).await?;
    Ok(web::Json(state.social.following(&path).await?))
}

//! Decision lifecycle endpoints.

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::decision::{Decision, PrivacyLevel};
use crate::domain::decision_service::PublicDecision;
use crate::inbound::http::{ApiResult, BearerToken, HttpState};

/// `POST /api/decisions/create` body.
///
/// `privacy_level` wins when both fields are present; `is_public` is the
/// older client shape and maps onto public/private.
#[derive(Debug, Deserialize, Serialize)]
pub struct CreateDecisionRequest {
    pub text: String,
    #[serde(default)]
    pub privacy_level: Option<PrivacyLevel>,
    #[serde(default)]
    pub is_public: Option<bool>,
}

impl CreateDecisionRequest {
    fn privacy(&self) -> PrivacyLevel {
        if let Some(level) = self.privacy_level {
            return level;
        }
        match self.is_public {
            Some(false) => PrivacyLevel::Private,
            _ => PrivacyLevel::Public,
        }
    }
}

#[post("/decisions/create")]
pub async fn create_decision(
    state: web::Data<HttpState>,
    token: BearerToken,
    payload: web::Json<CreateDecisionRequest>,
) -> ApiResult<HttpResponse> {
    let user = state.accounts.resolve_session(token.as_str()).await?;
    let decision = state
        .decisions
        .create(&user, &payload.text, payload.privacy())
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "decision_id": decision.id,
        "alternatives": decision.alternatives,
    })))
}

#[post("/decisions/{id}/roll")]
pub async fn roll_decision(
    state: web::Data<HttpState>,
    token: BearerToken,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let user = state.accounts.resolve_session(token.as_str()).await?;
    let (dice_result, selected_option) = state.decisions.roll(&user.id, &path).await?;
    Ok(HttpResponse::Ok().json(json!({
        "dice_result": dice_result,
        "selected_option": selected_option,
    })))
}

/// `POST /api/decisions/{id}/implement?implemented=bool` query.
#[derive(Debug, Deserialize)]
pub struct ImplementQuery {
    pub implemented: bool,
}

#[post("/decisions/{id}/implement")]
pub async fn implement_decision(
    state: web::Data<HttpState>,
    token: BearerToken,
    path: web::Path<String>,
    query: web::Query<ImplementQuery>,
) -> ApiResult<HttpResponse> {
    let user = state.accounts.resolve_session(token.as_str()).await?;
    let implemented = state
        .decisions
        .implement(&user.id, &path, query.implemented)
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "implemented": implemented,
    })))
}

#[get("/decisions/history")]
pub async fn decision_history(
    state: web::Data<HttpState>,
    token: BearerToken,
) -> ApiResult<web::Json<Vec<Decision>>> {
    let user = state.accounts.resolve_session(token.as_str()).await?;
    Ok(web::Json(state.decisions.history(&user.id).await?))
}

/// `GET /api/decisions/public?skip&limit` query.
#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_feed_limit")]
    pub limit: usize,
}

fn default_feed_limit() -> usize {
    20
}

/// Public feed: rolled public decisions joined with owner summaries. No
/// authentication required.
#[get("/decisions/public")]
pub async fn public_decisions(
    state: web::Data<HttpState>,
    query: web::Query<FeedQuery>,
) -> ApiResult<web::Json<Vec<PublicDecision>>> {
    Ok(web::Json(
        state.decisions.public_feed(query.skip, query.limit).await?,
    ))
}

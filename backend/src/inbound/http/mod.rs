//! HTTP adapter: request DTOs, bearer extraction, and route handlers.
//!
//! Handlers stay thin: extract, call one service, serialise. Error mapping
//! lives on [`crate::domain::Error`] via `ResponseError`.

use actix_web::{HttpResponse, get};
use serde_json::json;

pub mod admin;
pub mod auth;
pub mod bearer;
pub mod comments;
pub mod decisions;
pub mod health;
pub mod messages;
pub mod notifications;
pub mod state;
pub mod users;

pub use crate::domain::error::ApiResult;
pub use bearer::BearerToken;
pub use state::HttpState;

/// API root, kept for uptime checks and compatibility.
#[get("/")]
pub async fn index() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "message": "Zarver API is running" }))
}

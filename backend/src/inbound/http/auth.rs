//! Authentication endpoints: register, login, logout, admin login, me, and
//! password reset.

use actix_web::{HttpRequest, HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::Registration;
use crate::domain::user::UserProfile;
use crate::inbound::http::{ApiResult, BearerToken, HttpState};

/// `POST /api/auth/register` body.
#[derive(Debug, Deserialize, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub privacy_agreement: bool,
}

/// `POST /api/auth/login` body.
#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// `POST /api/auth/admin/login` body.
#[derive(Debug, Deserialize, Serialize)]
pub struct AdminLoginRequest {
    pub username: String,
    pub password: String,
}

/// Token envelope returned from register and login.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: UserProfile,
}

#[post("/auth/register")]
pub async fn register(
    state: web::Data<HttpState>,
    payload: web::Json<RegisterRequest>,
) -> ApiResult<web::Json<AuthResponse>> {
    let body = payload.into_inner();
    let (token, user) = state
        .accounts
        .register(Registration {
            username: body.username,
            email: body.email,
            password: body.password,
            name: body.name,
            privacy_accepted: body.privacy_agreement,
        })
        .await?;
    Ok(web::Json(AuthResponse {
        access_token: token.token,
        token_type: "bearer".to_string(),
        user: user.profile(),
    }))
}

#[post("/auth/login")]
pub async fn login(
    state: web::Data<HttpState>,
    payload: web::Json<LoginRequest>,
) -> ApiResult<web::Json<AuthResponse>> {
    let (token, user) = state
        .accounts
        .authenticate(&payload.email, &payload.password)
        .await?;
    Ok(web::Json(AuthResponse {
        access_token: token.token,
        token_type: "bearer".to_string(),
        user: user.profile(),
    }))
}

/// Revoke the presented token. Later requests with it are rejected.
#[post("/auth/logout")]
pub async fn logout(state: web::Data<HttpState>, token: BearerToken) -> ApiResult<HttpResponse> {
    state.accounts.revoke(token.as_str()).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

/// Admin login boundary. Every attempt lands in the audit log, failures
/// included, so brute-force attempts can be reviewed after the fact.
#[post("/auth/admin/login")]
pub async fn admin_login(
    state: web::Data<HttpState>,
    payload: web::Json<AdminLoginRequest>,
    req: HttpRequest,
) -> ApiResult<HttpResponse> {
    let origin = origin_of(&req);
    let result = state
        .accounts
        .admin_login(&payload.username, &payload.password);
    state
        .admin
        .record(
            &payload.username,
            "admin_login",
            None,
            json!({ "success": result.is_ok() }),
            origin,
        )
        .await?;
    let token = result?;
    Ok(HttpResponse::Ok().json(json!({
        "access_token": token.token,
        "token_type": "bearer",
    })))
}

#[get("/auth/me")]
pub async fn me(
    state: web::Data<HttpState>,
    token: BearerToken,
) -> ApiResult<web::Json<UserProfile>> {
    let user = state.accounts.resolve_session(token.as_str()).await?;
    Ok(web::Json(user.profile()))
}

/// `POST /api/auth/password-reset/request` body.
#[derive(Debug, Deserialize, Serialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

/// `POST /api/auth/password-reset/confirm` body.
#[derive(Debug, Deserialize, Serialize)]
pub struct PasswordResetConfirm {
    pub token: String,
    pub new_password: String,
}

/// Always answers success so email addresses cannot be enumerated.
#[post("/auth/password-reset/request")]
pub async fn password_reset_request(
    state: web::Data<HttpState>,
    payload: web::Json<PasswordResetRequest>,
) -> ApiResult<HttpResponse> {
    // The raw token travels through the mail seam; it never appears in the
    // response.
    state
        .accounts
        .request_password_reset(&payload.email)
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "If this email is registered, a reset code has been sent",
    })))
}

#[post("/auth/password-reset/confirm")]
pub async fn password_reset_confirm(
    state: web::Data<HttpState>,
    payload: web::Json<PasswordResetConfirm>,
) -> ApiResult<HttpResponse> {
    state
        .accounts
        .confirm_password_reset(&payload.token, &payload.new_password)
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Password updated",
    })))
}

pub(crate) fn origin_of(req: &HttpRequest) -> Option<String> {
    req.connection_info()
        .realip_remote_addr()
        .map(str::to_string)
}

//! Credential and session management.
//!
//! Owns registration, login, per-request session resolution, token
//! revocation, the admin login boundary, and password reset. Suspension is
//! re-checked on every resolved session so a mid-session suspension takes
//! effect on the next authenticated request.

use std::sync::Arc;

use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::password_hash::rand_core::OsRng;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use tracing::{error, info, warn};
use zeroize::Zeroizing;

use super::error::{ApiResult, Error};
use super::ports::{RevokedTokenStore, StoreError, UserStore};
use super::token::{Claims, IssuedToken, RevokedToken, TokenIssuer};
use super::user::{PasswordReset, Subscription, User};

/// Reset tokens stay valid for one hour.
const RESET_TOKEN_TTL_HOURS: i64 = 1;
/// Minimum accepted password length on reset.
const MIN_PASSWORD_CHARS: usize = 6;

/// The single message for every credential failure, so callers cannot tell
/// an unknown email from a wrong password.
const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Back-office bootstrap credentials, held in configuration.
#[derive(Debug, Clone)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

/// Validated registration input.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub name: String,
    pub privacy_accepted: bool,
}

/// Verified admin identity.
pub use super::admin::AdminContext;

pub struct AccountService {
    users: Arc<dyn UserStore>,
    revoked: Arc<dyn RevokedTokenStore>,
    tokens: TokenIssuer,
    admin: AdminCredentials,
    daily_query_limit: u32,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserStore>,
        revoked: Arc<dyn RevokedTokenStore>,
        tokens: TokenIssuer,
        admin: AdminCredentials,
        daily_query_limit: u32,
    ) -> Self {
        Self {
            users,
            revoked,
            tokens,
            admin,
            daily_query_limit,
        }
    }

    /// Create an account and sign a session token bound to it.
    pub async fn register(&self, registration: Registration) -> ApiResult<(IssuedToken, User)> {
        if !registration.privacy_accepted {
            return Err(Error::invalid_request(
                "The privacy agreement must be accepted",
            ));
        }
        let username = registration.username.trim().to_string();
        let email = registration.email.trim().to_string();
        let name = registration.name.trim().to_string();
        let password = Zeroizing::new(registration.password);
        if username.is_empty() || email.is_empty() || name.is_empty() || password.is_empty() {
            return Err(Error::invalid_request(
                "username, email, password, and name are required",
            ));
        }

        let password_hash = hash_password(&password)?;
        let user = User::new(
            username,
            email,
            password_hash,
            name,
            generate_avatar(),
            Subscription::free(self.daily_query_limit),
        );

        match self.users.insert_user(user.clone()).await {
            Ok(()) => {}
            Err(StoreError::Duplicate { field: "email" }) => {
                return Err(Error::conflict("Email already registered"));
            }
            Err(StoreError::Duplicate { field: "username" }) => {
                return Err(Error::conflict("Username already taken"));
            }
            Err(err) => return Err(err.into()),
        }

        let token = self.tokens.issue(&user.id, false).map_err(signing_error)?;
        info!(user_id = %user.id, "account registered");
        Ok((token, user))
    }

    /// Verify credentials and sign a session token.
    pub async fn authenticate(&self, email: &str, password: &str) -> ApiResult<(IssuedToken, User)> {
        let Some(user) = self.users.user_by_email(email.trim()).await? else {
            return Err(Error::unauthorized(INVALID_CREDENTIALS));
        };
        if !verify_password(password, &user.password_hash) {
            return Err(Error::unauthorized(INVALID_CREDENTIALS));
        }
        self.reject_if_suspended(&user, Utc::now())?;

        let token = self.tokens.issue(&user.id, false).map_err(signing_error)?;
        Ok((token, user))
    }

    /// Resolve a bearer token into the current user context.
    ///
    /// Rejects malformed, expired, and revoked tokens, and tokens whose
    /// subject no longer exists. Suspension is enforced here, not only at
    /// login.
    pub async fn resolve_session(&self, token: &str) -> ApiResult<User> {
        let claims = self.verified_claims(token).await?;
        let Some(user) = self.users.user_by_id(&claims.sub).await? else {
            return Err(Error::unauthorized("Invalid token"));
        };
        self.reject_if_suspended(&user, Utc::now())?;
        Ok(user)
    }

    /// Resolve a bearer token into an admin context.
    pub async fn resolve_admin_session(&self, token: &str) -> ApiResult<AdminContext> {
        let claims = self.verified_claims(token).await?;
        if !claims.admin {
            return Err(Error::forbidden("Admin access required"));
        }
        Ok(AdminContext { actor: claims.sub })
    }

    /// Revoke the presented token until its natural expiry. Idempotent.
    pub async fn revoke(&self, token: &str) -> ApiResult<()> {
        let claims = self
            .tokens
            .verify(token)
            .map_err(|_| Error::unauthorized("Invalid token"))?;
        let expires_at = claims.expires_at();
        self.revoked
            .revoke(RevokedToken {
                jti: claims.jti,
                revoked_at: Utc::now(),
                expires_at,
            })
            .await?;
        Ok(())
    }

    /// Admin login against the configured bootstrap credentials.
    ///
    /// The caller records the attempt in the audit log whatever the outcome.
    pub fn admin_login(&self, username: &str, password: &str) -> ApiResult<IssuedToken> {
        if username != self.admin.username || password != self.admin.password {
            return Err(Error::unauthorized(INVALID_CREDENTIALS));
        }
        self.tokens.issue(username, true).map_err(signing_error)
    }

    /// Begin a password reset.
    ///
    /// Always succeeds from the caller's point of view so email addresses
    /// cannot be enumerated. Returns the raw token for the mail seam when
    /// the address is known.
    pub async fn request_password_reset(&self, email: &str) -> ApiResult<Option<String>> {
        let Some(user) = self.users.user_by_email(email.trim()).await? else {
            warn!("password reset requested for unknown email");
            return Ok(None);
        };

        let raw_token = generate_reset_token();
        let reset = PasswordReset {
            token_sha256: sha256_hex(&raw_token),
            expires_at: Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS),
        };
        self.users.set_password_reset(&user.id, Some(reset)).await?;
        info!(user_id = %user.id, "password reset issued");
        Ok(Some(raw_token))
    }

    /// Complete a password reset with the emailed token.
    pub async fn confirm_password_reset(&self, token: &str, new_password: &str) -> ApiResult<()> {
        let digest = sha256_hex(token);
        let Some(user) = self.users.user_by_reset_token(&digest, Utc::now()).await? else {
            return Err(Error::invalid_request("Invalid or expired reset token"));
        };
        if new_password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(Error::invalid_request(format!(
                "Password must be at least {MIN_PASSWORD_CHARS} characters"
            )));
        }
        let hash = hash_password(new_password)?;
        self.users.set_password_hash(&user.id, hash).await?;
        self.users.set_password_reset(&user.id, None).await?;
        info!(user_id = %user.id, "password reset completed");
        Ok(())
    }

    async fn verified_claims(&self, token: &str) -> ApiResult<Claims> {
        let claims = self
            .tokens
            .verify(token)
            .map_err(|_| Error::unauthorized("Invalid token"))?;
        if self.revoked.is_revoked(&claims.jti).await? {
            return Err(Error::unauthorized("Invalid token"));
        }
        Ok(claims)
    }

    fn reject_if_suspended(&self, user: &User, now: DateTime<Utc>) -> ApiResult<()> {
        if !user.suspension.active_at(now) {
            return Ok(());
        }
        let message = match user.suspension.until {
            Some(until) => format!("Account suspended until {}", until.to_rfc3339()),
            None => "Account suspended".to_string(),
        };
        Err(Error::forbidden(message))
    }
}

fn signing_error(err: super::token::TokenError) -> Error {
    error!(error = %err, "token signing failed");
    Error::internal("Internal server error")
}

fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| {
            error!(error = %err, "password hashing failed");
            Error::internal("Internal server error")
        })
}

fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}

fn generate_avatar() -> String {
    // Random stock photo id, the shape clients already render.
    let photo_id: u64 = rand::thread_rng().gen_range(1_500_000_000_000..1_600_000_000_000);
    format!("https://images.unsplash.com/photo-{photo_id}?w=150&h=150&fit=crop&crop=face")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ErrorCode;
    use crate::domain::user::Suspension;
    use crate::outbound::memory::MemoryStore;

    fn service_with(store: Arc<MemoryStore>) -> AccountService {
        AccountService::new(
            store.clone(),
            store,
            TokenIssuer::new(b"test-secret", 30),
            AdminCredentials {
                username: "root".to_string(),
                password: "hunter2!".to_string(),
            },
            3,
        )
    }

    fn registration(username: &str, email: &str) -> Registration {
        Registration {
            username: username.to_string(),
            email: email.to_string(),
            password: "correct horse".to_string(),
            name: "Test User".to_string(),
            privacy_accepted: true,
        }
    }

    #[tokio::test]
    async fn register_without_privacy_agreement_persists_nothing() {
        let store = Arc::new(MemoryStore::new());
        let service = service_with(store.clone());
        let mut reg = registration("alice", "alice@example.com");
        reg.privacy_accepted = false;

        let err = service.register(reg).await.expect_err("must fail");
        assert_eq!(err.code, ErrorCode::InvalidRequest);
        assert_eq!(store.count_users().await.expect("count"), 0);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_and_first_token_stays_valid() {
        let service = service_with(Arc::new(MemoryStore::new()));
        let (token, _) = service
            .register(registration("alice", "alice@example.com"))
            .await
            .expect("first registration");

        let err = service
            .register(registration("alice2", "alice@example.com"))
            .await
            .expect_err("duplicate email");
        assert_eq!(err.code, ErrorCode::Conflict);

        service
            .resolve_session(&token.token)
            .await
            .expect("first token still resolves");
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let service = service_with(Arc::new(MemoryStore::new()));
        service
            .register(registration("alice", "alice@example.com"))
            .await
            .expect("first registration");
        let err = service
            .register(registration("alice", "other@example.com"))
            .await
            .expect_err("duplicate username");
        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn login_failures_use_one_message_for_both_causes() {
        let service = service_with(Arc::new(MemoryStore::new()));
        service
            .register(registration("alice", "alice@example.com"))
            .await
            .expect("registration");

        let unknown = service
            .authenticate("nobody@example.com", "whatever")
            .await
            .expect_err("unknown email");
        let wrong = service
            .authenticate("alice@example.com", "wrong password")
            .await
            .expect_err("wrong password");
        assert_eq!(unknown.message, wrong.message);
        assert_eq!(unknown.code, ErrorCode::Unauthorized);
        assert_eq!(wrong.code, ErrorCode::Unauthorized);
    }

    #[tokio::test]
    async fn revoked_tokens_no_longer_resolve() {
        let service = service_with(Arc::new(MemoryStore::new()));
        let (token, _) = service
            .register(registration("alice", "alice@example.com"))
            .await
            .expect("registration");

        service.revoke(&token.token).await.expect("revoke");
        // Revocation is idempotent.
        service.revoke(&token.token).await.expect("revoke again");

        let err = service
            .resolve_session(&token.token)
            .await
            .expect_err("revoked token");
        assert_eq!(err.code, ErrorCode::Unauthorized);
    }

    #[tokio::test]
    async fn suspension_applies_mid_session_and_lapses_when_bounded() {
        let store = Arc::new(MemoryStore::new());
        let service = service_with(store.clone());
        let (token, user) = service
            .register(registration("alice", "alice@example.com"))
            .await
            .expect("registration");

        store
            .set_suspension(&user.id, Suspension::permanent("abuse"))
            .await
            .expect("suspend");
        let err = service
            .resolve_session(&token.token)
            .await
            .expect_err("suspended mid-session");
        assert_eq!(err.code, ErrorCode::Forbidden);

        // A bounded suspension already in the past behaves as lifted.
        store
            .set_suspension(
                &user.id,
                Suspension::bounded("spam", Utc::now() - Duration::hours(1)),
            )
            .await
            .expect("suspend in the past");
        service
            .resolve_session(&token.token)
            .await
            .expect("lapsed suspension resolves");
        service
            .authenticate("alice@example.com", "correct horse")
            .await
            .expect("lapsed suspension logs in");
    }

    #[tokio::test]
    async fn bounded_suspension_surfaces_the_instant_at_login() {
        let store = Arc::new(MemoryStore::new());
        let service = service_with(store.clone());
        let (_, user) = service
            .register(registration("alice", "alice@example.com"))
            .await
            .expect("registration");
        let until = Utc::now() + Duration::days(2);
        store
            .set_suspension(&user.id, Suspension::bounded("spam", until))
            .await
            .expect("suspend");

        let err = service
            .authenticate("alice@example.com", "correct horse")
            .await
            .expect_err("suspended login");
        assert_eq!(err.code, ErrorCode::Forbidden);
        assert!(err.message.contains(&until.to_rfc3339()));
    }

    #[tokio::test]
    async fn admin_sessions_require_the_admin_claim() {
        let service = service_with(Arc::new(MemoryStore::new()));
        let (user_token, _) = service
            .register(registration("alice", "alice@example.com"))
            .await
            .expect("registration");

        let err = service
            .resolve_admin_session(&user_token.token)
            .await
            .expect_err("user token is not admin");
        assert_eq!(err.code, ErrorCode::Forbidden);

        let admin_token = service.admin_login("root", "hunter2!").expect("admin login");
        let context = service
            .resolve_admin_session(&admin_token.token)
            .await
            .expect("admin token resolves");
        assert_eq!(context.actor, "root");

        let err = service
            .admin_login("root", "wrong")
            .expect_err("bad admin password");
        assert_eq!(err.code, ErrorCode::Unauthorized);
    }

    #[tokio::test]
    async fn password_reset_round_trip() {
        let service = service_with(Arc::new(MemoryStore::new()));
        service
            .register(registration("alice", "alice@example.com"))
            .await
            .expect("registration");

        // Unknown addresses succeed without issuing anything.
        assert!(
            service
                .request_password_reset("nobody@example.com")
                .await
                .expect("generic success")
                .is_none()
        );

        let token = service
            .request_password_reset("alice@example.com")
            .await
            .expect("request")
            .expect("token issued");

        let short = service
            .confirm_password_reset(&token, "tiny")
            .await
            .expect_err("short password");
        assert_eq!(short.code, ErrorCode::InvalidRequest);

        service
            .confirm_password_reset(&token, "brand new password")
            .await
            .expect("confirm");

        // Token is single-use.
        let reuse = service
            .confirm_password_reset(&token, "another password")
            .await
            .expect_err("reuse");
        assert_eq!(reuse.code, ErrorCode::InvalidRequest);

        service
            .authenticate("alice@example.com", "brand new password")
            .await
            .expect("new password works");
        let old = service
            .authenticate("alice@example.com", "correct horse")
            .await
            .expect_err("old password dead");
        assert_eq!(old.code, ErrorCode::Unauthorized);
    }
}

//! Bearer token issuance and verification.
//!
//! Tokens are symmetric JWTs (HS256). Each issuance carries a unique `jti`
//! so one session can be revoked without touching the user's other sessions.
//! Verification treats every defect the same way: tampered signature,
//! expired claim, or unparseable payload all come back as
//! [`TokenError::Invalid`].

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Default token lifetime in days.
pub const DEFAULT_TOKEN_TTL_DAYS: i64 = 30;

/// Claims embedded in every issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id, or the admin username for back-office tokens.
    pub sub: String,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
    /// Unique issuance id, the unit of revocation.
    pub jti: String,
    /// Present and true only on back-office tokens.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub admin: bool,
}

impl Claims {
    /// Expiry as a UTC instant.
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }
}

/// Token verification and signing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Signature, expiry, or structure check failed. Deliberately carries no
    /// detail so callers cannot distinguish the cases.
    #[error("token is invalid or expired")]
    Invalid,
    /// The signing operation itself failed.
    #[error("token could not be signed: {message}")]
    Signing { message: String },
}

/// A freshly signed token plus its decoded claims.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

/// Issues and verifies session tokens with a server-held secret.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    /// Build an issuer around `secret` with a lifetime of `ttl_days`.
    pub fn new(secret: &[u8], ttl_days: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: Duration::days(ttl_days),
        }
    }

    /// Sign a token for `subject`.
    pub fn issue(&self, subject: &str, admin: bool) -> Result<IssuedToken, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
            admin,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| TokenError::Signing {
                message: err.to_string(),
            })?;
        Ok(IssuedToken { token, claims })
    }

    /// Verify a presented token and return its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| TokenError::Invalid)
    }
}

/// Revocation record for a single token issuance. Eligible for removal once
/// the token would have expired anyway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokedToken {
    pub jti: String,
    pub revoked_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

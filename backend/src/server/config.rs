//! Application configuration read from the environment at startup.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;
use url::Url;
use uuid::Uuid;

use crate::domain::token::DEFAULT_TOKEN_TTL_DAYS;
use crate::domain::user::DEFAULT_DAILY_QUERIES;
use crate::outbound::generator::DEFAULT_GENERATOR_TIMEOUT;

/// Configuration failures that should stop startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {message}")]
    Invalid { name: &'static str, message: String },
    #[error("TOKEN_SECRET must be set in release builds")]
    MissingSecret,
}

/// External generator endpoint settings.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub url: Url,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

/// Everything the server needs, resolved once in `main`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub token_secret: String,
    pub token_ttl_days: i64,
    pub admin_username: String,
    pub admin_password: String,
    /// `None` selects the deterministic fixture source.
    pub generator: Option<GeneratorConfig>,
    pub daily_query_limit: u32,
    pub require_mutual_follow: bool,
    pub allow_reroll: bool,
}

impl AppConfig {
    /// Read configuration from the environment.
    ///
    /// Missing optional values fall back to development defaults with a
    /// warning; a missing token secret is fatal outside debug builds.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr = parse_var("BIND_ADDR", "0.0.0.0:8001")?;
        let token_secret = match env::var("TOKEN_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ if cfg!(debug_assertions) => {
                warn!("TOKEN_SECRET not set; using an ephemeral secret (dev only)");
                Uuid::new_v4().to_string()
            }
            _ => return Err(ConfigError::MissingSecret),
        };
        let token_ttl_days = parse_var("TOKEN_TTL_DAYS", &DEFAULT_TOKEN_TTL_DAYS.to_string())?;
        let admin_username = env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
        let admin_password = match env::var("ADMIN_PASSWORD") {
            Ok(password) if !password.is_empty() => password,
            _ => {
                warn!("ADMIN_PASSWORD not set; admin login is disabled");
                // An unguessable value nobody can present.
                Uuid::new_v4().to_string()
            }
        };

        let generator = match env::var("GENERATOR_URL") {
            Ok(raw) if !raw.is_empty() => {
                let url = raw.parse::<Url>().map_err(|err| ConfigError::Invalid {
                    name: "GENERATOR_URL",
                    message: err.to_string(),
                })?;
                let timeout_secs: u64 = parse_var(
                    "GENERATOR_TIMEOUT_SECS",
                    &DEFAULT_GENERATOR_TIMEOUT.as_secs().to_string(),
                )?;
                Some(GeneratorConfig {
                    url,
                    api_key: env::var("GENERATOR_API_KEY").ok().filter(|k| !k.is_empty()),
                    timeout: Duration::from_secs(timeout_secs),
                })
            }
            _ => {
                warn!("GENERATOR_URL not set; using the fixture alternative source");
                None
            }
        };

        Ok(Self {
            bind_addr,
            token_secret,
            token_ttl_days,
            admin_username,
            admin_password,
            generator,
            daily_query_limit: parse_var("DAILY_QUERY_LIMIT", &DEFAULT_DAILY_QUERIES.to_string())?,
            require_mutual_follow: parse_flag("REQUIRE_MUTUAL_FOLLOW", true),
            allow_reroll: parse_flag("ALLOW_REROLL", true),
        })
    }

    /// Fixed configuration for integration tests: fixture generator,
    /// deterministic secrets, ephemeral port.
    pub fn for_tests() -> Self {
        Self {
            bind_addr: "127.0.0.1:0".parse().expect("loopback address"),
            token_secret: "test-secret".to_string(),
            token_ttl_days: DEFAULT_TOKEN_TTL_DAYS,
            admin_username: "root".to_string(),
            admin_password: "hunter2!".to_string(),
            generator: None,
            daily_query_limit: DEFAULT_DAILY_QUERIES,
            require_mutual_follow: true,
            allow_reroll: true,
        }
    }
}

fn parse_var<T>(name: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<T>().map_err(|err| ConfigError::Invalid {
        name,
        message: err.to_string(),
    })
}

fn parse_flag(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(raw) => !matches!(raw.as_str(), "0" | "false" | "off" | "no"),
        Err(_) => default,
    }
}

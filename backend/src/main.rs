//! Service entry point.

use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use zarver_backend::server::{AppConfig, create_server};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(err) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %err, "tracing init failed");
    }

    let config = AppConfig::from_env().map_err(std::io::Error::other)?;
    create_server(config)?.await
}

//! Backend entry-point: loads configuration, prepares storage, and serves
//! the REST API.

use actix_web::web;
use mockable::DefaultEnv;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use zimbeat_backend::config::{AppSettings, BuildMode, secrets_from_env};
use zimbeat_backend::inbound::http::health::HealthState;
use zimbeat_backend::outbound::persistence::{DbPool, PoolConfig, run_pending_migrations};
use zimbeat_backend::server::{ServerConfig, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AppSettings::load_from_iter(std::env::args_os())
        .map_err(|e| std::io::Error::other(format!("failed to load settings: {e}")))?;
    let secrets = secrets_from_env(&DefaultEnv::new(), BuildMode::from_debug_assertions())
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    let bind_addr = settings
        .bind_addr()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    let mut health = HealthState::new();
    let mut config = ServerConfig::new(bind_addr, settings.clone(), secrets);

    if let Some(url) = settings.database_url() {
        run_pending_migrations(url)
            .await
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        let mut pool_config = PoolConfig::new(url);
        if let Some(max) = settings.db_max_connections {
            pool_config = pool_config.with_max_size(max);
        }
        let pool = DbPool::new(pool_config)
            .await
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        health = health.with_db_pool(pool.clone());
        config = config.with_db_pool(pool);
    }

    info!(%bind_addr, "starting server");
    let server = create_server(web::Data::new(health), config)?;
    server.await
}

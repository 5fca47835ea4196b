use std::time::Duration;

use once_cell::sync::Lazy;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::info;

pub use configs::DatabaseConfig;

// Load .env once, before anything reads DATABASE_URL
static DOTENV_LOADED: Lazy<bool> = Lazy::new(|| dotenvy::dotenv().is_ok());

/// Whether a database is configured at all (config file or `DATABASE_URL`).
pub fn database_configured() -> bool {
    Lazy::force(&DOTENV_LOADED);
    configs::AppConfig::load_or_env().is_ok()
}

/// Connect using `config.toml` (or `CONFIG_PATH`) with `DATABASE_URL` as fallback.
pub async fn connect() -> anyhow::Result<DatabaseConnection> {
    Lazy::force(&DOTENV_LOADED);
    let cfg = configs::AppConfig::load_or_env()?;
    connect_with_config(&cfg.database).await
}

/// Connect with explicit pool settings. The pool size is the only
/// concurrency bound on store access.
pub async fn connect_with_config(cfg: &DatabaseConfig) -> anyhow::Result<DatabaseConnection> {
    cfg.validate()?;
    let mut opt = ConnectOptions::new(cfg.url.clone());
    opt.max_connections(cfg.max_connections)
        .min_connections(cfg.min_connections)
        .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
        .acquire_timeout(Duration::from_secs(cfg.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(cfg.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(cfg.max_lifetime_secs))
        .sqlx_logging(cfg.sqlx_logging);
    let db = Database::connect(opt).await?;
    info!(max_connections = cfg.max_connections, min_connections = cfg.min_connections, "database pool ready");
    Ok(db)
}

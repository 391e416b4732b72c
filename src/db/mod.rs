//! Profile database: pool settings, pool creation, and embedded migrations.
//!
//! The only table is `profiles`; its unique `username` index is what finally
//! settles two sign-ups racing for the same name.

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_DB_ACQUIRE_TIMEOUT_SECS: u64 = 5;

/// Connection settings for the profile database, parsed by
/// [`crate::config::AppConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    /// How long a request waits for a free connection before the profile
    /// store reports itself unavailable.
    pub acquire_timeout: Duration,
}

impl DbConfig {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            acquire_timeout: Duration::from_secs(DEFAULT_DB_ACQUIRE_TIMEOUT_SECS),
        }
    }
}

/// Open the profile pool and bring the schema up to date.
///
/// # Errors
///
/// Returns an error if the database cannot be reached or a migration fails.
pub async fn init_pool(config: &DbConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.url)
        .await?;

    sqlx::migrate!("src/db/migrations").run(&pool).await?;
    info!(max_connections = config.max_connections, "profile database ready");

    Ok(pool)
}

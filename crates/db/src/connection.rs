use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;
use vibecheck_core::config::DatabaseConfig;

pub type DbPool = sqlx::SqlitePool;

/// Pool sizing knobs, usually taken from `database.*` config.
#[derive(Clone, Copy, Debug)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self { max_connections: 5, acquire_timeout_secs: 30 }
    }
}

impl From<&DatabaseConfig> for PoolSettings {
    fn from(config: &DatabaseConfig) -> Self {
        Self { max_connections: config.max_connections, acquire_timeout_secs: config.timeout_secs }
    }
}

/// Opens a SQLite pool with WAL journaling and a busy timeout on every
/// connection. `max_connections` is clamped to at least one so in-memory
/// databases keep their single backing connection alive.
pub async fn connect(database_url: &str, settings: PoolSettings) -> Result<DbPool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(settings.max_connections.max(1))
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs.max(1)))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                sqlx::query("PRAGMA busy_timeout = 5000").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await
}

/// Round-trips one statement through the pool. Readiness probes use this
/// instead of relying on pool construction alone.
pub async fn ping(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await.map(|_| ())
}

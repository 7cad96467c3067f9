use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

/// Reverts the most recently applied migration and returns its version.
///
/// Returns `None` when the database has no applied migrations, including
/// the case where the migrations bookkeeping table does not exist yet.
pub async fn rollback_last(pool: &DbPool) -> Result<Option<i64>, MigrateError> {
    let bookkeeping_tables: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?;
    if bookkeeping_tables == 0 {
        return Ok(None);
    }

    let latest: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await?;
    let Some(latest) = latest else {
        return Ok(None);
    };

    // Undo stops at the highest version below the one being reverted.
    let target = MIGRATOR
        .iter()
        .map(|migration| migration.version)
        .filter(|version| *version < latest)
        .max()
        .unwrap_or(0);

    MIGRATOR.undo(pool, target).await?;
    Ok(Some(latest))
}

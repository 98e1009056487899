//! Schema migrations.
//!
//! The auth tables (`users`, `refresh_tokens`, `api_keys`) are created by
//! the SQL files under `migrations/`, embedded at compile time.

use sqlx::PgPool;
use sqlx::migrate::MigrateError;

/// Apply any pending migrations to the given pool.
pub async fn run(pool: &PgPool) -> Result<(), MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;

use super::types::GatewayError;

// ============================================================================
// Database
// ============================================================================

/// SQLite-backed persistence gateway.
///
/// Cloning is cheap (the pool is reference counted) and all methods take
/// `&self`, so one instance is shared by every concurrent feed worker.
#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Connections in the pool. SQLite is single-writer; the busy timeout
    /// below serializes concurrent inserts from feed workers.
    const MAX_CONNECTIONS: u32 = 5;

    /// Open a database connection and run migrations.
    ///
    /// `path` may be `:memory:` for an in-process database shared across the pool.
    pub async fn open(path: &str) -> Result<Self, GatewayError> {
        let url = format!("sqlite:{}?mode=rwc", path);

        let options = SqliteConnectOptions::from_str(&url)
            .map_err(GatewayError::Database)?
            .foreign_keys(true)
            .pragma("busy_timeout", "5000");
        let pool = SqlitePoolOptions::new()
            .max_connections(Self::MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(GatewayError::Database)?;

        let db = Self { pool };
        db.migrate()
            .await
            .map_err(|e| GatewayError::Migration(e.to_string()))?;
        tracing::debug!(path = %path, "Database opened");
        Ok(db)
    }

    /// Create tables and indexes inside a single transaction.
    ///
    /// Every statement uses `IF NOT EXISTS`, so re-running on an existing
    /// database is a no-op.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feeds (
                id INTEGER PRIMARY KEY,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                name TEXT NOT NULL,
                url TEXT UNIQUE NOT NULL,
                last_fetched_at INTEGER
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS items (
                id BLOB PRIMARY KEY,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                published_at INTEGER NOT NULL,
                url TEXT NOT NULL,
                feed_id INTEGER NOT NULL REFERENCES feeds(id) ON DELETE CASCADE,
                UNIQUE(feed_id, url)
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        // Due-feed selection orders by last_fetched_at
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_feeds_last_fetched ON feeds(last_fetched_at)",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_items_feed_published ON items(feed_id, published_at DESC)",
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

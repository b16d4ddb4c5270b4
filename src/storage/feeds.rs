use super::schema::Database;
use super::types::{Feed, FeedRow, GatewayError};

const FEED_COLUMNS: &str = "id, name, url, created_at, updated_at, last_fetched_at";

impl Database {
    // ========================================================================
    // Feed Registration
    // ========================================================================

    /// Register a new feed. Returns [`GatewayError::Conflict`] if the URL is
    /// already registered.
    pub async fn insert_feed(&self, url: &str, name: &str) -> Result<Feed, GatewayError> {
        let now = chrono::Utc::now().timestamp();
        let row: FeedRow = sqlx::query_as(&format!(
            "INSERT INTO feeds (created_at, updated_at, name, url) VALUES (?, ?, ?, ?) \
             RETURNING {FEED_COLUMNS}"
        ))
        .bind(now)
        .bind(now)
        .bind(name)
        .bind(url)
        .fetch_one(&self.pool)
        .await
        .map_err(GatewayError::from_sqlx)?;

        Ok(Feed::from(row))
    }

    /// All feeds ordered by name.
    pub async fn list_feeds(&self) -> Result<Vec<Feed>, GatewayError> {
        let rows: Vec<FeedRow> =
            sqlx::query_as(&format!("SELECT {FEED_COLUMNS} FROM feeds ORDER BY name, id"))
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(Feed::from).collect())
    }

    pub async fn get_feed(&self, feed_id: i64) -> Result<Feed, GatewayError> {
        let row: Option<FeedRow> =
            sqlx::query_as(&format!("SELECT {FEED_COLUMNS} FROM feeds WHERE id = ?"))
                .bind(feed_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Feed::from).ok_or(GatewayError::NotFound(feed_id))
    }

    // ========================================================================
    // Scheduling
    // ========================================================================

    /// Up to `limit` feeds, never-fetched first, then least recently fetched.
    /// Ties break on id so selection is deterministic.
    pub async fn select_due_feeds(&self, limit: usize) -> Result<Vec<Feed>, GatewayError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows: Vec<FeedRow> = sqlx::query_as(&format!(
            "SELECT {FEED_COLUMNS} FROM feeds \
             ORDER BY last_fetched_at IS NOT NULL, last_fetched_at ASC, id ASC \
             LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Feed::from).collect())
    }

    /// Advance a feed's `last_fetched_at` to now.
    ///
    /// The stored value never decreases, even if the wall clock steps back.
    pub async fn mark_fetched(&self, feed_id: i64) -> Result<(), GatewayError> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            "UPDATE feeds \
             SET last_fetched_at = MAX(COALESCE(last_fetched_at, 0), ?), updated_at = ? \
             WHERE id = ?",
        )
        .bind(now)
        .bind(now)
        .bind(feed_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(GatewayError::NotFound(feed_id));
        }
        Ok(())
    }
}

use super::schema::Database;
use super::types::{GatewayError, ItemRecord};

impl Database {
    // ========================================================================
    // Item Operations
    // ========================================================================

    /// Insert one normalized item.
    ///
    /// A row with the same `(feed_id, url)` yields [`GatewayError::Conflict`]
    /// and leaves the stored row untouched.
    pub async fn insert_item(&self, item: &ItemRecord) -> Result<(), GatewayError> {
        sqlx::query(
            r#"
            INSERT INTO items
                (id, created_at, updated_at, title, description, published_at, url, feed_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        )
        .bind(item.id)
        .bind(item.created_at)
        .bind(item.updated_at)
        .bind(&item.title)
        .bind(&item.description)
        .bind(item.published_at)
        .bind(&item.url)
        .bind(item.feed_id)
        .execute(&self.pool)
        .await
        .map_err(GatewayError::from_sqlx)?;

        Ok(())
    }

    /// Items for a feed, newest publication first.
    pub async fn items_for_feed(&self, feed_id: i64) -> Result<Vec<ItemRecord>, GatewayError> {
        let items = sqlx::query_as::<_, ItemRecord>(
            r#"
            SELECT id, created_at, updated_at, title, description, published_at, url, feed_id
            FROM items
            WHERE feed_id = ?
            ORDER BY published_at DESC, created_at DESC
        "#,
        )
        .bind(feed_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    pub async fn count_items(&self, feed_id: i64) -> Result<i64, GatewayError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM items WHERE feed_id = ?")
            .bind(feed_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

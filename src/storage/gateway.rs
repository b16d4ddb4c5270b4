use async_trait::async_trait;

use super::schema::Database;
use super::types::{Feed, GatewayError, ItemRecord};

/// The store operations the ingestion core depends on.
///
/// Implementations must be safe to call concurrently from independent
/// workers without any locking on the caller side. Due-feed selection
/// policy belongs to the implementation; callers only rely on receiving at
/// most `limit` feeds.
#[async_trait]
pub trait FeedGateway: Send + Sync {
    /// At most `limit` feeds that are due for polling.
    async fn select_due_feeds(&self, limit: usize) -> Result<Vec<Feed>, GatewayError>;

    /// Advance the feed's last-fetched timestamp.
    async fn mark_fetched(&self, feed_id: i64) -> Result<(), GatewayError>;

    /// Persist one item. An existing `(feed_id, url)` pair must be reported
    /// as [`GatewayError::Conflict`].
    async fn insert_item(&self, item: &ItemRecord) -> Result<(), GatewayError>;
}

#[async_trait]
impl FeedGateway for Database {
    async fn select_due_feeds(&self, limit: usize) -> Result<Vec<Feed>, GatewayError> {
        Database::select_due_feeds(self, limit).await
    }

    async fn mark_fetched(&self, feed_id: i64) -> Result<(), GatewayError> {
        Database::mark_fetched(self, feed_id).await
    }

    async fn insert_item(&self, item: &ItemRecord) -> Result<(), GatewayError> {
        Database::insert_item(self, item).await
    }
}

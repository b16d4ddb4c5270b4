use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Error Types
// ============================================================================

/// Errors surfaced by the persistence gateway.
///
/// `Conflict` is the typed form of a uniqueness violation so callers can treat
/// "already stored" as a normal outcome without inspecting error text.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The row already exists (unique constraint on `(feed_id, url)` or feed url).
    #[error("Record already exists")]
    Conflict,

    #[error("Feed {0} not found")]
    NotFound(i64),

    #[error("Database migration failed: {0}")]
    Migration(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl GatewayError {
    /// Classify a sqlx error, mapping unique violations to [`GatewayError::Conflict`].
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        match err.as_database_error() {
            Some(db_err) if db_err.is_unique_violation() => GatewayError::Conflict,
            _ => GatewayError::Database(err),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, GatewayError::Conflict)
    }
}

// ============================================================================
// Helper Types
// ============================================================================

/// Row type for feed queries
pub(crate) type FeedRow = (i64, String, String, i64, i64, Option<i64>);

// ============================================================================
// Data Structures
// ============================================================================

/// A polled feed as stored by the gateway.
///
/// `name` is `Arc<str>` so workers can clone it into log fields cheaply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    pub id: i64,
    pub name: Arc<str>,
    pub url: String,
    pub created_at: i64,
    pub updated_at: i64,
    /// Unix seconds of the last "mark fetched"; `None` means never fetched.
    pub last_fetched_at: Option<i64>,
}

impl From<FeedRow> for Feed {
    fn from(
        (id, name, url, created_at, updated_at, last_fetched_at): FeedRow,
    ) -> Self {
        Feed {
            id,
            name: Arc::from(name),
            url,
            created_at,
            updated_at,
            last_fetched_at,
        }
    }
}

/// A normalized feed item, as inserted and as read back.
///
/// Timestamps are unix seconds (UTC).
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ItemRecord {
    pub id: Uuid,
    pub created_at: i64,
    pub updated_at: i64,
    pub title: String,
    pub description: Option<String>,
    pub published_at: i64,
    pub url: String,
    pub feed_id: i64,
}

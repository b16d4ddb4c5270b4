use chrono::Utc;
use thiserror::Error;

use crate::feed::{normalize_item, parse_document, FeedSource, FetchError, ParseError, RssItem};
use crate::storage::{Feed, FeedGateway, GatewayError};

/// Feed-scoped failure. Aborts this feed for the current cycle only.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Failed to mark feed as fetched: {0}")]
    MarkFetched(#[source] GatewayError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// What happened to a single item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Inserted,
    /// `(feed, url)` was already stored.
    Duplicate,
    /// Normalization or a non-conflict store error; the item is dropped.
    Skipped,
}

/// Per-feed counters reported after a successful pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedReport {
    pub seen: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub skipped: usize,
}

impl FeedReport {
    fn record(&mut self, outcome: ItemOutcome) {
        self.seen += 1;
        match outcome {
            ItemOutcome::Inserted => self.inserted += 1,
            ItemOutcome::Duplicate => self.duplicates += 1,
            ItemOutcome::Skipped => self.skipped += 1,
        }
    }
}

/// Fetch, parse and store one feed.
///
/// The feed is marked fetched before anything else so a persistently broken
/// feed still rotates out of the front of the due queue. Item failures are
/// logged and counted, never returned.
pub async fn ingest_feed(
    gateway: &dyn FeedGateway,
    source: &dyn FeedSource,
    feed: &Feed,
) -> Result<FeedReport, IngestError> {
    gateway
        .mark_fetched(feed.id)
        .await
        .map_err(IngestError::MarkFetched)?;

    let bytes = source.fetch(&feed.url).await?;
    let document = parse_document(&bytes)?;

    let mut report = FeedReport::default();
    for item in &document.channel.items {
        let outcome = store_item(gateway, feed, item).await;
        report.record(outcome);
    }

    tracing::info!(
        feed_id = feed.id,
        feed = %feed.name,
        channel = %document.channel.title,
        language = %document.channel.language,
        seen = report.seen,
        inserted = report.inserted,
        duplicates = report.duplicates,
        skipped = report.skipped,
        "Feed collected"
    );

    Ok(report)
}

async fn store_item(gateway: &dyn FeedGateway, feed: &Feed, item: &RssItem) -> ItemOutcome {
    let record = match normalize_item(feed.id, item, Utc::now().timestamp()) {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!(
                feed_id = feed.id,
                link = %item.link,
                error = %e,
                "Skipping item"
            );
            return ItemOutcome::Skipped;
        }
    };

    match gateway.insert_item(&record).await {
        Ok(()) => ItemOutcome::Inserted,
        Err(GatewayError::Conflict) => {
            tracing::debug!(feed_id = feed.id, url = %record.url, "Item already stored");
            ItemOutcome::Duplicate
        }
        Err(e) => {
            tracing::warn!(
                feed_id = feed.id,
                url = %record.url,
                error = %e,
                "Failed to store item"
            );
            ItemOutcome::Skipped
        }
    }
}

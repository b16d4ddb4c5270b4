use chrono::{DateTime, FixedOffset};
use thiserror::Error;
use uuid::Uuid;

use super::parser::RssItem;
use crate::storage::ItemRecord;

/// `pubDate` layout: RFC 1123 with a numeric zone, e.g. `Mon, 02 Jan 2006 15:04:05 -0700`.
const PUB_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// Item-level normalization failure. Skips only the offending item.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("Unparsable pubDate {value:?}: {reason}")]
    InvalidDate { value: String, reason: String },
    #[error("Item has no link")]
    MissingLink,
}

/// Parse an RSS `pubDate` in RFC 1123 form with a numeric timezone offset.
pub fn parse_pub_date(raw: &str) -> Result<DateTime<FixedOffset>, NormalizeError> {
    let value = raw.trim();
    DateTime::parse_from_str(value, PUB_DATE_FORMAT).map_err(|e| NormalizeError::InvalidDate {
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Empty descriptions are absent, anything else is kept verbatim.
pub fn normalize_description(raw: &str) -> Option<String> {
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

/// Map a raw item into a record ready for insertion, stamped with a fresh id
/// and `now` (unix seconds) as its created/updated time.
pub fn normalize_item(feed_id: i64, item: &RssItem, now: i64) -> Result<ItemRecord, NormalizeError> {
    let url = item.link.trim();
    if url.is_empty() {
        return Err(NormalizeError::MissingLink);
    }
    let description = normalize_description(&item.description);
    let published = parse_pub_date(&item.pub_date)?;

    Ok(ItemRecord {
        id: Uuid::new_v4(),
        created_at: now,
        updated_at: now,
        title: item.title.clone(),
        description,
        published_at: published.timestamp(),
        url: url.to_string(),
        feed_id,
    })
}

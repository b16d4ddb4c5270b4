//! In-memory gateway and feed source used by the ingest unit tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use crate::feed::{FeedSource, FetchError};
use crate::storage::{Feed, FeedGateway, GatewayError, ItemRecord};

pub(crate) fn feed(id: i64, url: &str) -> Feed {
    Feed {
        id,
        name: Arc::from(format!("Feed {id}")),
        url: url.to_string(),
        created_at: 0,
        updated_at: 0,
        last_fetched_at: None,
    }
}

/// Builds an RSS body from `(link, pubDate)` pairs.
pub(crate) fn rss(items: &[(&str, &str)]) -> String {
    let mut body = String::from(
        "<?xml version=\"1.0\"?>\n<rss version=\"2.0\"><channel><title>Test</title>",
    );
    for (i, (link, date)) in items.iter().enumerate() {
        body.push_str(&format!(
            "<item><title>Item {i}</title><link>{link}</link><pubDate>{date}</pubDate>\
             <description>Body {i}</description></item>"
        ));
    }
    body.push_str("</channel></rss>");
    body
}

pub(crate) const GOOD_DATE: &str = "Mon, 02 Jan 2006 15:04:05 -0700";

#[derive(Default)]
pub(crate) struct MemoryGateway {
    feeds: Mutex<Vec<Feed>>,
    items: Mutex<Vec<ItemRecord>>,
    clock: AtomicI64,
    /// Number of upcoming `select_due_feeds` calls that should fail.
    failing_selects: AtomicUsize,
    fail_mark: Mutex<HashSet<i64>>,
    fail_insert_urls: Mutex<HashSet<String>>,
    /// Return every feed regardless of `limit`.
    ignore_limit: AtomicBool,
    select_calls: Mutex<Vec<Instant>>,
}

impl MemoryGateway {
    pub(crate) fn with_feeds(feeds: Vec<Feed>) -> Self {
        Self {
            feeds: Mutex::new(feeds),
            ..Self::default()
        }
    }

    pub(crate) fn fail_next_selects(&self, n: usize) {
        self.failing_selects.store(n, Ordering::SeqCst);
    }

    pub(crate) fn fail_mark_fetched(&self, feed_id: i64) {
        self.fail_mark.lock().unwrap().insert(feed_id);
    }

    pub(crate) fn fail_insert(&self, url: &str) {
        self.fail_insert_urls.lock().unwrap().insert(url.to_string());
    }

    pub(crate) fn ignore_limit(&self) {
        self.ignore_limit.store(true, Ordering::SeqCst);
    }

    pub(crate) fn items(&self) -> Vec<ItemRecord> {
        self.items.lock().unwrap().clone()
    }

    pub(crate) fn item_urls(&self, feed_id: i64) -> Vec<String> {
        self.items()
            .into_iter()
            .filter(|i| i.feed_id == feed_id)
            .map(|i| i.url)
            .collect()
    }

    pub(crate) fn feed(&self, feed_id: i64) -> Feed {
        self.feeds
            .lock()
            .unwrap()
            .iter()
            .find(|f| f.id == feed_id)
            .cloned()
            .unwrap()
    }

    pub(crate) fn select_calls(&self) -> Vec<Instant> {
        self.select_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedGateway for MemoryGateway {
    async fn select_due_feeds(&self, limit: usize) -> Result<Vec<Feed>, GatewayError> {
        self.select_calls.lock().unwrap().push(Instant::now());

        let failing = self.failing_selects.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_selects.store(failing - 1, Ordering::SeqCst);
            return Err(GatewayError::Database(sqlx::Error::PoolTimedOut));
        }

        let mut feeds = self.feeds.lock().unwrap().clone();
        feeds.sort_by_key(|f| (f.last_fetched_at.is_some(), f.last_fetched_at, f.id));
        if !self.ignore_limit.load(Ordering::SeqCst) {
            feeds.truncate(limit);
        }
        Ok(feeds)
    }

    async fn mark_fetched(&self, feed_id: i64) -> Result<(), GatewayError> {
        if self.fail_mark.lock().unwrap().contains(&feed_id) {
            return Err(GatewayError::Database(sqlx::Error::PoolTimedOut));
        }
        let tick = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
        let mut feeds = self.feeds.lock().unwrap();
        let feed = feeds
            .iter_mut()
            .find(|f| f.id == feed_id)
            .ok_or(GatewayError::NotFound(feed_id))?;
        feed.last_fetched_at = Some(feed.last_fetched_at.unwrap_or(0).max(tick));
        Ok(())
    }

    async fn insert_item(&self, item: &ItemRecord) -> Result<(), GatewayError> {
        if self.fail_insert_urls.lock().unwrap().contains(&item.url) {
            return Err(GatewayError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut items = self.items.lock().unwrap();
        if items
            .iter()
            .any(|i| i.feed_id == item.feed_id && i.url == item.url)
        {
            return Err(GatewayError::Conflict);
        }
        items.push(item.clone());
        Ok(())
    }
}

/// Serves canned bodies keyed by URL, optionally after a delay, and records
/// how many fetches were in flight at once.
#[derive(Default)]
pub(crate) struct StaticSource {
    bodies: HashMap<String, Result<String, u16>>,
    panics: HashSet<String>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

impl StaticSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn body(mut self, url: &str, body: impl Into<String>) -> Self {
        self.bodies.insert(url.to_string(), Ok(body.into()));
        self
    }

    pub(crate) fn status(mut self, url: &str, status: u16) -> Self {
        self.bodies.insert(url.to_string(), Err(status));
        self
    }

    pub(crate) fn panic_on(mut self, url: &str) -> Self {
        self.panics.insert(url.to_string());
        self
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedSource for StaticSource {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panics.contains(url) {
            panic!("fetch of {url} blew up");
        }
        match self.bodies.get(url) {
            Some(Ok(body)) => Ok(body.clone().into_bytes()),
            Some(Err(status)) => Err(FetchError::HttpStatus(*status)),
            None => Err(FetchError::HttpStatus(404)),
        }
    }
}

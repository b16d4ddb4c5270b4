use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::worker::{ingest_feed, FeedReport};
use crate::config::{Config, ConfigError};
use crate::feed::FeedSource;
use crate::storage::{FeedGateway, GatewayError};

/// The two knobs the host process controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    concurrency: usize,
    interval: Duration,
}

impl SchedulerConfig {
    /// Both values must be non-zero.
    pub fn new(concurrency: usize, interval: Duration) -> Result<Self, ConfigError> {
        if concurrency == 0 {
            return Err(ConfigError::Invalid(
                "concurrency must be greater than 0".into(),
            ));
        }
        if interval.is_zero() {
            return Err(ConfigError::Invalid("interval must be greater than 0".into()));
        }
        Ok(Self {
            concurrency,
            interval,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Self::new(config.concurrency, config.interval())
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Totals for one select → fan-out → join cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub feeds: usize,
    pub failed_feeds: usize,
    pub items_seen: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub skipped: usize,
}

impl CycleReport {
    fn add(&mut self, feed: &FeedReport) {
        self.items_seen += feed.seen;
        self.inserted += feed.inserted;
        self.duplicates += feed.duplicates;
        self.skipped += feed.skipped;
    }
}

/// Periodically polls due feeds.
///
/// Each cycle asks the gateway for up to `concurrency` due feeds, ingests
/// them concurrently and waits for all of them before the next tick. Cycles
/// never overlap.
pub struct Scheduler {
    gateway: Arc<dyn FeedGateway>,
    source: Arc<dyn FeedSource>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(
        gateway: Arc<dyn FeedGateway>,
        source: Arc<dyn FeedSource>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            gateway,
            source,
            config,
        }
    }

    pub fn config(&self) -> SchedulerConfig {
        self.config
    }

    /// Run cycles until `cancel` fires.
    ///
    /// The first cycle starts immediately. Ticks are aligned to the start
    /// time; a cycle that overruns the interval is followed at once by the
    /// next one, and missed ticks do not accumulate. Cancellation drops the
    /// in-flight cycle without draining it.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            concurrency = self.config.concurrency,
            interval_secs = self.config.interval.as_secs_f64(),
            "Feed scheduler started"
        );

        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::warn!("Shutdown requested, abandoning in-flight cycle");
                    break;
                }
                result = self.run_cycle() => {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "Failed to select due feeds, skipping cycle");
                    }
                }
            }
        }

        tracing::info!("Feed scheduler stopped");
    }

    /// Run a single cycle.
    ///
    /// Only the due-feed query can fail; feed and item failures are logged
    /// and reflected in the report.
    pub async fn run_cycle(&self) -> Result<CycleReport, GatewayError> {
        let concurrency = self.config.concurrency;
        let feeds = self.gateway.select_due_feeds(concurrency).await?;

        if feeds.is_empty() {
            tracing::debug!("No feeds due");
            return Ok(CycleReport::default());
        }

        let mut report = CycleReport {
            feeds: feeds.len(),
            ..CycleReport::default()
        };

        // Each feed runs on its own task so a panicking worker only fails
        // that feed. Dropping the set aborts whatever is still running.
        let mut workers = JoinSet::new();
        let mut pending = feeds.into_iter();
        loop {
            while workers.len() < concurrency {
                let Some(feed) = pending.next() else { break };
                let gateway = Arc::clone(&self.gateway);
                let source = Arc::clone(&self.source);
                workers.spawn(async move {
                    let result = ingest_feed(gateway.as_ref(), source.as_ref(), &feed).await;
                    if let Err(e) = &result {
                        tracing::warn!(
                            feed_id = feed.id,
                            feed = %feed.name,
                            url = %feed.url,
                            error = %e,
                            "Feed ingestion failed"
                        );
                    }
                    result
                });
            }

            let Some(joined) = workers.join_next().await else { break };
            match joined {
                Ok(Ok(feed)) => report.add(&feed),
                Ok(Err(_)) => report.failed_feeds += 1,
                Err(e) => {
                    tracing::error!(error = %e, "Feed worker panicked");
                    report.failed_feeds += 1;
                }
            }
        }

        tracing::info!(
            feeds = report.feeds,
            failed = report.failed_feeds,
            inserted = report.inserted,
            duplicates = report.duplicates,
            skipped = report.skipped,
            "Cycle complete"
        );

        Ok(report)
    }
}

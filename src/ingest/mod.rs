//! The ingestion core: a periodic scheduler fanning out per-feed workers.
//!
//! Failure isolation is layered. An item error never aborts its feed, a feed
//! error never aborts its cycle, and a due-feed query error never stops the
//! scheduler.

mod scheduler;
#[cfg(test)]
pub(crate) mod test_support;
mod worker;

pub use scheduler::{CycleReport, Scheduler, SchedulerConfig};
pub use worker::{ingest_feed, FeedReport, IngestError, ItemOutcome};

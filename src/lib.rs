//! feedmill: a background RSS ingestion scheduler.
//!
//! The scheduler repeatedly selects a bounded batch of due feeds from the
//! persistence gateway, fetches and parses each one concurrently, and stores
//! any items not already present. Failures are isolated per item, per feed
//! and per cycle so that no single bad input stops ingestion.

pub mod config;
pub mod feed;
pub mod ingest;
pub mod storage;
pub mod util;

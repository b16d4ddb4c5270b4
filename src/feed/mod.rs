//! Feed source client and item normalization.
//!
//! - [`client`] - HTTP retrieval of raw feed bytes with a bounded timeout
//! - [`parser`] - RSS 2.0 channel/item decoding
//! - [`normalize`] - Raw item to persistable record, including `pubDate` parsing

mod client;
mod normalize;
mod parser;

pub use client::{
    FeedSource, FetchError, HttpFeedClient, DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_FEED_SIZE,
};
pub use normalize::{normalize_description, normalize_item, parse_pub_date, NormalizeError};
pub use parser::{parse_document, ParseError, RssChannel, RssDocument, RssItem};

//! Persistence gateway: the contract the ingestion core consumes, and the
//! SQLite implementation the binary runs against.

mod feeds;
mod gateway;
mod items;
mod schema;
mod types;

pub use gateway::FeedGateway;
pub use schema::Database;
pub use types::{Feed, GatewayError, ItemRecord};

//! Event feed: source aggregation and response cache.
//!
//! This crate assembles the school's events for a date range:
//! - [`EventFeed`] logs in, fetches every source and buckets events per day
//! - [`ResponseCache`] keeps normalized payloads on disk for an hour
//! - [`FeedConfig`] carries credentials, server and cache settings
//!
//! # Example
//!
//! ```rust,no_run
//! use schoolfeed_core::DateRange;
//! use schoolfeed_providers::untis::Credentials;
//! use schoolfeed_server::{EventFeed, FeedConfig, PersonQuery};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let feed = EventFeed::new(FeedConfig::new(Credentials::password("display", "secret")))?;
//!     let today = chrono::Local::now().date_naive();
//!     let range = DateRange::parse(None, None, Some("7"), today)?;
//!
//!     let days = feed.get_events(&range, PersonQuery::from_params(Some("Müller"), None).as_ref()).await?;
//!     for (day, events) in days {
//!         println!("{day}: {} events", events.len());
//!     }
//!     Ok(())
//! }
//! ```

mod cache;
mod config;
mod error;
mod feed;

pub use cache::{
    CacheError, CacheKey, CacheResult, DEFAULT_CACHE_DIR, DEFAULT_CACHE_TTL, ResponseCache,
    encode_name,
};
pub use config::FeedConfig;
pub use error::{FeedError, FeedResult};
pub use feed::{DailyEvents, EventFeed, PersonQuery, bucket_by_day};

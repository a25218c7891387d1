//! The ingestion pipeline: fetching, parsing and storing RSS feeds.
//!
//! - [`fetcher`] - HTTP GET with a deadline and a size cap
//! - [`parser`] - RSS 2.0 decoding with quick-xml, plus HTML entity cleanup
//! - [`dates`] - `<pubDate>` normalization to epoch milliseconds
//! - [`ingest`] - per-item, duplicate-tolerant post writing
//! - [`scheduler`] - the `agg` polling loop
//!
//! # Example
//!
//! ```ignore
//! use gator::feed::{build_client, Scheduler};
//!
//! let scheduler = Scheduler::new(db, build_client()?, interval)?;
//! let stats = scheduler.run(shutdown_rx).await;
//! ```

mod dates;
mod fetcher;
mod ingest;
mod parser;
mod scheduler;

pub use dates::parse_pub_date;
pub use fetcher::{build_client, fetch_feed, FetchError, USER_AGENT};
pub use ingest::{write_items, IngestReport};
pub use parser::{parse_rss, ParseError, RssChannel, RssItem};
pub use scheduler::{Clock, RunStats, Scheduler, SystemClock, TickError, TickOutcome};

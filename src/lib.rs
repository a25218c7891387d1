//! gator: a command-line blog aggregator.
//!
//! Users register, add and follow RSS feeds, and `gator agg` polls the feeds
//! on a fixed interval, storing new posts in SQLite for `gator browse`.
//!
//! - [`commands`] - the command router, the login wrapper and every handler
//! - [`feed`] - fetch, parse and ingest, driven by the polling scheduler
//! - [`storage`] - the SQLite repository
//! - [`config`] - `~/.gatorconfig.json`
//! - [`util`] - text and URL helpers

pub mod commands;
pub mod config;
pub mod feed;
pub mod storage;
pub mod util;

//! Fixed-interval polling loop.
//!
//! Every tick processes exactly one feed end to end: pick the stalest feed,
//! stamp it as fetched, download it, then write its items. A failing tick is
//! logged and the loop carries on.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::config::ConfigError;
use crate::storage::{Database, DatabaseError, Feed};

use super::fetcher::{fetch_feed, FetchError};
use super::ingest::{write_items, IngestReport};

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Source of the `last_fetched_at` stamp.
pub trait Clock: Send + Sync {
    /// Current time as Unix epoch milliseconds
    fn now_millis(&self) -> i64;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Why a single tick failed. Never fatal to the loop.
#[derive(Debug, Error)]
pub enum TickError {
    #[error("{0}")]
    Database(#[from] DatabaseError),

    #[error("Fetching {url} failed: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },
}

/// What a successful tick did
#[derive(Debug)]
pub enum TickOutcome {
    /// No feeds exist yet
    Idle,
    /// One feed was fetched and its items written
    Ingested { feed: Feed, report: IngestReport },
}

/// Totals returned when the loop stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub ticks: u64,
    pub failures: u64,
    pub posts_inserted: u64,
}

pub struct Scheduler<C = SystemClock> {
    db: Database,
    client: reqwest::Client,
    interval: Duration,
    fetch_timeout: Duration,
    clock: C,
}

impl Scheduler<SystemClock> {
    /// Create a scheduler polling every `interval`.
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidInterval` for a zero interval.
    pub fn new(
        db: Database,
        client: reqwest::Client,
        interval: Duration,
    ) -> Result<Self, ConfigError> {
        if interval.is_zero() {
            return Err(ConfigError::InvalidInterval(format!("{:?}", interval)));
        }
        Ok(Self {
            db,
            client,
            interval,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            clock: SystemClock,
        })
    }
}

impl<C: Clock> Scheduler<C> {
    /// Deadline for each fetch, request and body read together
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_clock<C2: Clock>(self, clock: C2) -> Scheduler<C2> {
        Scheduler {
            db: self.db,
            client: self.client,
            interval: self.interval,
            fetch_timeout: self.fetch_timeout,
            clock,
        }
    }

    /// Process one feed: select, mark, fetch, ingest.
    ///
    /// The feed is marked before the fetch, so a feed that hangs or errors
    /// still moves to the back of the queue.
    pub async fn tick(&self) -> Result<TickOutcome, TickError> {
        let Some(next) = self.db.get_next_feed_to_fetch().await? else {
            return Ok(TickOutcome::Idle);
        };

        // The feed can be deleted by a concurrent `reset` between the two queries
        let Some(feed) = self
            .db
            .mark_feed_fetched(next.id, self.clock.now_millis())
            .await?
        else {
            return Ok(TickOutcome::Idle);
        };

        tracing::debug!(feed = %feed.url, name = %feed.name, "Fetching feed");
        let channel = fetch_feed(&self.client, &feed.url, Some(self.fetch_timeout))
            .await
            .map_err(|source| TickError::Fetch {
                url: feed.url.clone(),
                source,
            })?;

        let report = write_items(&self.db, &feed, &channel.items).await;
        tracing::info!(
            feed = %feed.url,
            items = channel.items.len(),
            inserted = report.inserted,
            duplicates = report.duplicates,
            failed = report.failed,
            skipped = report.skipped,
            "Ingested feed"
        );

        Ok(TickOutcome::Ingested { feed, report })
    }

    /// Tick immediately, then once per interval, until `shutdown` turns true
    /// or its sender is dropped.
    ///
    /// Shutdown is observed between ticks; a tick in progress runs to
    /// completion.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> RunStats {
        tracing::info!(interval = ?self.interval, "Scheduler started");

        let stats = drive(self.interval, shutdown, move || self.tick()).await;

        tracing::info!(
            ticks = stats.ticks,
            failures = stats.failures,
            posts = stats.posts_inserted,
            "Scheduler stopped"
        );
        stats
    }
}

/// Call `tick` immediately and then once per `period` until shutdown.
///
/// A tick that overruns the period delays the next one instead of causing a
/// burst of catch-up ticks.
async fn drive<F, Fut>(
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut tick: F,
) -> RunStats
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<TickOutcome, TickError>>,
{
    let mut stats = RunStats::default();
    let mut timer = tokio::time::interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = timer.tick() => {
                stats.ticks += 1;
                match tick().await {
                    Ok(TickOutcome::Idle) => {
                        tracing::info!("No feeds to fetch");
                    }
                    Ok(TickOutcome::Ingested { report, .. }) => {
                        stats.posts_inserted += report.inserted as u64;
                    }
                    Err(e) => {
                        stats.failures += 1;
                        tracing::warn!(error = %e, "Tick failed");
                    }
                }
            }
        }
    }

    stats
}

use crate::storage::{Database, Feed, NewPost};

use super::dates::parse_pub_date;
use super::parser::RssItem;

/// Outcome counts for one batch of items written to a feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// New posts stored
    pub inserted: usize,
    /// Items whose URL was already stored
    pub duplicates: usize,
    /// Items dropped because the write failed for another reason
    pub failed: usize,
    /// Items without a link, which cannot be deduplicated
    pub skipped: usize,
}

/// Write parsed items as posts of `feed`, in source order.
///
/// Each item is an independent insert. A duplicate URL is the expected
/// outcome of re-polling and is counted, not reported. Any other write error
/// is logged and only that item is lost. Nothing here aborts the batch.
pub async fn write_items(db: &Database, feed: &Feed, items: &[RssItem]) -> IngestReport {
    let mut report = IngestReport::default();

    for item in items {
        if item.link.is_empty() {
            tracing::warn!(feed = %feed.url, title = %item.title, "Skipping item without a link");
            report.skipped += 1;
            continue;
        }

        let published_at = parse_pub_date(&item.pub_date);
        if published_at.is_none() && !item.pub_date.is_empty() {
            tracing::debug!(
                post = %item.link,
                pub_date = %item.pub_date,
                "Unrecognized publication date, storing without one"
            );
        }

        let post = NewPost {
            feed_id: feed.id,
            title: item.title.clone(),
            url: item.link.clone(),
            description: Some(item.description.clone()).filter(|d| !d.is_empty()),
            published_at,
        };

        match db.create_post(&post).await {
            Ok(_) => report.inserted += 1,
            Err(e) if e.is_conflict() => {
                tracing::debug!(post = %post.url, "Post already stored");
                report.duplicates += 1;
            }
            Err(e) => {
                tracing::warn!(
                    feed = %feed.url,
                    post = %post.url,
                    error = %e,
                    "Failed to store post"
                );
                report.failed += 1;
            }
        }
    }

    report
}

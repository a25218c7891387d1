use super::follows::insert_feed_follow;
use super::schema::{now_millis, Database};
use super::types::{DatabaseError, Feed, FeedFollow, FeedWithCreator};

const FEED_COLUMNS: &str = "id, name, url, user_id, last_fetched_at, created_at, updated_at";

impl Database {
    // ========================================================================
    // Feed Operations
    // ========================================================================

    /// Add a feed owned by `user_id`.
    ///
    /// Returns `DatabaseError::Conflict` if a feed with the same URL exists.
    pub async fn create_feed(
        &self,
        name: &str,
        url: &str,
        user_id: i64,
    ) -> Result<Feed, DatabaseError> {
        let now = now_millis();
        sqlx::query_as::<_, Feed>(&format!(
            "INSERT INTO feeds (name, url, user_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?) RETURNING {FEED_COLUMNS}"
        ))
        .bind(name)
        .bind(url)
        .bind(user_id)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Add a feed owned by `user_id` and subscribe that user to it.
    ///
    /// Both rows are written in one transaction: if the follow cannot be
    /// stored, the feed is not kept either.
    pub async fn create_feed_and_follow(
        &self,
        name: &str,
        url: &str,
        user_id: i64,
    ) -> Result<(Feed, FeedFollow), DatabaseError> {
        let now = now_millis();
        let mut tx = self.pool.begin().await?;

        let feed = sqlx::query_as::<_, Feed>(&format!(
            "INSERT INTO feeds (name, url, user_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?) RETURNING {FEED_COLUMNS}"
        ))
        .bind(name)
        .bind(url)
        .bind(user_id)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        let follow = insert_feed_follow(&mut tx, user_id, feed.id).await?;

        tx.commit().await?;
        Ok((feed, follow))
    }

    /// All feeds with the name of the user who added them, oldest first
    pub async fn get_feeds(&self) -> Result<Vec<FeedWithCreator>, DatabaseError> {
        let feeds = sqlx::query_as::<_, FeedWithCreator>(
            r#"
            SELECT f.id, f.name, f.url, u.name AS creator
            FROM feeds f
            JOIN users u ON u.id = f.user_id
            ORDER BY f.created_at, f.id
        "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(feeds)
    }

    /// Look up a feed by its source URL
    pub async fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>, DatabaseError> {
        let feed = sqlx::query_as::<_, Feed>(&format!(
            "SELECT {FEED_COLUMNS} FROM feeds WHERE url = ?"
        ))
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(feed)
    }

    // ========================================================================
    // Scheduling
    // ========================================================================

    /// The stalest feed: never-fetched feeds first, then ascending `last_fetched_at`.
    ///
    /// Ties are broken by id so the order is deterministic. Returns `None` when
    /// no feeds exist.
    pub async fn get_next_feed_to_fetch(&self) -> Result<Option<Feed>, DatabaseError> {
        let feed = sqlx::query_as::<_, Feed>(&format!(
            "SELECT {FEED_COLUMNS} FROM feeds \
             ORDER BY last_fetched_at ASC NULLS FIRST, id ASC \
             LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;
        Ok(feed)
    }

    /// Stamp a feed as fetched at `fetched_at` (epoch millis) in a single update.
    ///
    /// Returns the updated row, or `None` if the feed was deleted in the meantime.
    pub async fn mark_feed_fetched(
        &self,
        feed_id: i64,
        fetched_at: i64,
    ) -> Result<Option<Feed>, DatabaseError> {
        let feed = sqlx::query_as::<_, Feed>(&format!(
            "UPDATE feeds SET last_fetched_at = ?, updated_at = ? \
             WHERE id = ? RETURNING {FEED_COLUMNS}"
        ))
        .bind(fetched_at)
        .bind(fetched_at)
        .bind(feed_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(feed)
    }
}

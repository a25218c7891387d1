use super::schema::{now_millis, Database};
use super::types::{DatabaseError, NewPost, Post, PostWithFeed};

/// Upper bound for `browse` queries (OOM protection)
const MAX_POSTS: i64 = 1000;

impl Database {
    // ========================================================================
    // Post Operations
    // ========================================================================

    /// Insert a single post.
    ///
    /// A post whose URL is already stored yields `DatabaseError::Conflict`; the
    /// existing row is left untouched. Posts are never updated once written.
    pub async fn create_post(&self, post: &NewPost) -> Result<Post, DatabaseError> {
        let now = now_millis();
        sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (feed_id, title, url, description, published_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id, feed_id, title, url, description, published_at, created_at, updated_at
        "#,
        )
        .bind(post.feed_id)
        .bind(&post.title)
        .bind(&post.url)
        .bind(&post.description)
        .bind(post.published_at)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Posts of one feed in insertion order
    pub async fn get_posts_for_feed(&self, feed_id: i64) -> Result<Vec<Post>, DatabaseError> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, feed_id, title, url, description, published_at, created_at, updated_at
            FROM posts
            WHERE feed_id = ?
            ORDER BY id
        "#,
        )
        .bind(feed_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }

    /// Most recent posts across the feeds a user follows.
    ///
    /// Newest publication date first; posts without a date sort after dated
    /// ones, by ingestion time. `limit` is capped at [`MAX_POSTS`].
    pub async fn get_posts_for_user(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<PostWithFeed>, DatabaseError> {
        let limit = limit.clamp(0, MAX_POSTS);
        let posts = sqlx::query_as::<_, PostWithFeed>(
            r#"
            SELECT p.id, p.title, p.url, p.description, p.published_at, f.name AS feed_name
            FROM posts p
            JOIN feeds f ON f.id = p.feed_id
            JOIN feed_follows ff ON ff.feed_id = p.feed_id
            WHERE ff.user_id = ?
            ORDER BY p.published_at DESC NULLS LAST, p.created_at DESC, p.id DESC
            LIMIT ?
        "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }
}

use sqlx::SqliteConnection;

use super::schema::{now_millis, Database};
use super::types::{DatabaseError, FeedFollow};

impl Database {
    // ========================================================================
    // Feed Follow Operations
    // ========================================================================

    /// Subscribe a user to a feed.
    ///
    /// At most one follow exists per (user, feed); a second attempt returns
    /// `DatabaseError::Conflict`.
    pub async fn create_feed_follow(
        &self,
        user_id: i64,
        feed_id: i64,
    ) -> Result<FeedFollow, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let follow = insert_feed_follow(&mut tx, user_id, feed_id).await?;
        tx.commit().await?;
        Ok(follow)
    }

    /// Remove a user's subscription to the feed with the given URL.
    ///
    /// Returns `true` if a follow was removed, `false` if there was none.
    pub async fn delete_feed_follow(&self, user_id: i64, url: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"
            DELETE FROM feed_follows
            WHERE user_id = ?
              AND feed_id IN (SELECT id FROM feeds WHERE url = ?)
        "#,
        )
        .bind(user_id)
        .bind(url)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Feeds a user follows, in subscription order
    pub async fn get_feed_follows_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<FeedFollow>, DatabaseError> {
        let follows = sqlx::query_as::<_, FeedFollow>(
            r#"
            SELECT ff.id, ff.user_id, ff.feed_id, u.name AS user_name,
                   f.name AS feed_name, ff.created_at
            FROM feed_follows ff
            JOIN users u ON u.id = ff.user_id
            JOIN feeds f ON f.id = ff.feed_id
            WHERE ff.user_id = ?
            ORDER BY ff.created_at, ff.id
        "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(follows)
    }
}

/// Insert a follow and read it back joined with the user and feed names.
pub(super) async fn insert_feed_follow(
    conn: &mut SqliteConnection,
    user_id: i64,
    feed_id: i64,
) -> Result<FeedFollow, DatabaseError> {
    let now = now_millis();
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO feed_follows (user_id, feed_id, created_at, updated_at)
        VALUES (?, ?, ?, ?)
        RETURNING id
    "#,
    )
    .bind(user_id)
    .bind(feed_id)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await
    .map_err(DatabaseError::from_sqlx)?;

    let follow = sqlx::query_as::<_, FeedFollow>(
        r#"
        SELECT ff.id, ff.user_id, ff.feed_id, u.name AS user_name,
               f.name AS feed_name, ff.created_at
        FROM feed_follows ff
        JOIN users u ON u.id = ff.user_id
        JOIN feeds f ON f.id = ff.feed_id
        WHERE ff.id = ?
    "#,
    )
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(follow)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seed() -> (Database, i64, i64) {
        let db = Database::open(":memory:").await.unwrap();
        let user = db.create_user("alice").await.unwrap();
        let feed = db
            .create_feed("Blog", "https://example.com/rss", user.id)
            .await
            .unwrap();
        (db, user.id, feed.id)
    }

    #[tokio::test]
    async fn test_follow_resolves_names() {
        let (db, user_id, feed_id) = seed().await;

        let follow = db.create_feed_follow(user_id, feed_id).await.unwrap();
        assert_eq!(follow.user_name, "alice");
        assert_eq!(follow.feed_name, "Blog");
    }

    #[tokio::test]
    async fn test_follow_twice_is_conflict() {
        let (db, user_id, feed_id) = seed().await;
        db.create_feed_follow(user_id, feed_id).await.unwrap();

        let err = db.create_feed_follow(user_id, feed_id).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(db.get_feed_follows_for_user(user_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unfollow_by_url() {
        let (db, user_id, feed_id) = seed().await;
        db.create_feed_follow(user_id, feed_id).await.unwrap();

        assert!(db
            .delete_feed_follow(user_id, "https://example.com/rss")
            .await
            .unwrap());
        assert!(db.get_feed_follows_for_user(user_id).await.unwrap().is_empty());

        // Second unfollow has nothing to remove
        assert!(!db
            .delete_feed_follow(user_id, "https://example.com/rss")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_follows_are_per_user() {
        let (db, alice, feed_id) = seed().await;
        let bob = db.create_user("bob").await.unwrap().id;
        db.create_feed_follow(alice, feed_id).await.unwrap();
        db.create_feed_follow(bob, feed_id).await.unwrap();

        db.delete_feed_follow(alice, "https://example.com/rss")
            .await
            .unwrap();

        assert!(db.get_feed_follows_for_user(alice).await.unwrap().is_empty());
        let bobs = db.get_feed_follows_for_user(bob).await.unwrap();
        assert_eq!(bobs.len(), 1);
        assert_eq!(bobs[0].user_name, "bob");
    }
}

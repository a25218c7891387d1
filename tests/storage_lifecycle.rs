//! Integration tests for the repository: users, feeds, follows and posts.
//!
//! Each test creates its own in-memory SQLite database for isolation, except
//! where two handles must share one file.

use gator::storage::{Database, NewPost};

async fn test_db() -> Database {
    Database::open(":memory:").await.unwrap()
}

fn post(feed_id: i64, slug: &str, published_at: Option<i64>) -> NewPost {
    NewPost {
        feed_id,
        title: format!("Title {slug}"),
        url: format!("https://example.com/{slug}"),
        description: None,
        published_at,
    }
}

// ============================================================================
// Users
// ============================================================================

#[tokio::test]
async fn test_register_then_lookup() {
    let db = test_db().await;

    let created = db.create_user("alice").await.unwrap();
    let found = db.get_user("alice").await.unwrap().unwrap();
    assert_eq!(created, found);
    assert!(db.get_user("bob").await.unwrap().is_none());
}

#[tokio::test]
async fn test_user_names_are_unique() {
    let db = test_db().await;
    db.create_user("alice").await.unwrap();

    let err = db.create_user("alice").await.unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(db.get_users().await.unwrap().len(), 1);
}

// ============================================================================
// Feeds and follows
// ============================================================================

#[tokio::test]
async fn test_follow_lifecycle() {
    let db = test_db().await;
    let alice = db.create_user("alice").await.unwrap();
    let bob = db.create_user("bob").await.unwrap();
    let feed = db
        .create_feed("Blog", "https://example.com/rss", alice.id)
        .await
        .unwrap();

    let listed = db.get_feeds().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].creator, "alice");

    db.create_feed_follow(bob.id, feed.id).await.unwrap();
    assert!(db
        .create_feed_follow(bob.id, feed.id)
        .await
        .unwrap_err()
        .is_conflict());

    let follows = db.get_feed_follows_for_user(bob.id).await.unwrap();
    assert_eq!(follows.len(), 1);
    assert_eq!(follows[0].feed_name, "Blog");
    assert_eq!(follows[0].user_name, "bob");

    assert!(db.delete_feed_follow(bob.id, &feed.url).await.unwrap());
    assert!(!db.delete_feed_follow(bob.id, &feed.url).await.unwrap());
    assert!(db.get_feed_follows_for_user(bob.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_scheduling_order_by_staleness() {
    let db = test_db().await;
    let user = db.create_user("alice").await.unwrap();
    let a = db.create_feed("A", "https://a.example/rss", user.id).await.unwrap();
    let b = db.create_feed("B", "https://b.example/rss", user.id).await.unwrap();
    let c = db.create_feed("C", "https://c.example/rss", user.id).await.unwrap();

    db.mark_feed_fetched(a.id, 3_000).await.unwrap();
    db.mark_feed_fetched(b.id, 1_000).await.unwrap();

    // never fetched first, then oldest fetch
    assert_eq!(db.get_next_feed_to_fetch().await.unwrap().unwrap().id, c.id);
    db.mark_feed_fetched(c.id, 4_000).await.unwrap();
    assert_eq!(db.get_next_feed_to_fetch().await.unwrap().unwrap().id, b.id);
    db.mark_feed_fetched(b.id, 5_000).await.unwrap();
    assert_eq!(db.get_next_feed_to_fetch().await.unwrap().unwrap().id, a.id);
}

#[tokio::test]
async fn test_mark_missing_feed_returns_none() {
    let db = test_db().await;
    assert!(db.mark_feed_fetched(42, 1_000).await.unwrap().is_none());
    assert!(db.get_next_feed_to_fetch().await.unwrap().is_none());
}

// ============================================================================
// Posts
// ============================================================================

#[tokio::test]
async fn test_browse_sees_only_followed_feeds() {
    let db = test_db().await;
    let alice = db.create_user("alice").await.unwrap();
    let mine = db.create_feed("Mine", "https://mine.example/rss", alice.id).await.unwrap();
    let other = db.create_feed("Other", "https://other.example/rss", alice.id).await.unwrap();
    db.create_feed_follow(alice.id, mine.id).await.unwrap();

    db.create_post(&post(mine.id, "m1", Some(1_000))).await.unwrap();
    db.create_post(&post(other.id, "o1", Some(9_000))).await.unwrap();

    let posts = db.get_posts_for_user(alice.id, 10).await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].feed_name, "Mine");
}

#[tokio::test]
async fn test_reset_cascades() {
    let db = test_db().await;
    let alice = db.create_user("alice").await.unwrap();
    let feed = db.create_feed("Blog", "https://example.com/rss", alice.id).await.unwrap();
    db.create_feed_follow(alice.id, feed.id).await.unwrap();
    db.create_post(&post(feed.id, "p1", None)).await.unwrap();

    assert_eq!(db.reset().await.unwrap(), 1);

    assert!(db.get_users().await.unwrap().is_empty());
    assert!(db.get_feeds().await.unwrap().is_empty());
    assert!(db.get_posts_for_feed(feed.id).await.unwrap().is_empty());

    // the URL is free again after a reset
    let again = db.create_user("alice").await.unwrap();
    let feed = db.create_feed("Blog", "https://example.com/rss", again.id).await.unwrap();
    db.create_post(&post(feed.id, "p1", None)).await.unwrap();
}

#[tokio::test]
async fn test_post_url_unique_across_handles() {
    // two handles on one file stand in for `agg` and a second process
    let dir = std::env::temp_dir().join(format!("gator_storage_it_{}", std::process::id()));
    std::fs::remove_dir_all(&dir).ok();
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("gator.db");
    let path = path.to_str().unwrap();

    let first = Database::open(path).await.unwrap();
    let second = Database::open(path).await.unwrap();

    let user = first.create_user("alice").await.unwrap();
    let feed = first.create_feed("Blog", "https://example.com/rss", user.id).await.unwrap();

    first.create_post(&post(feed.id, "shared", None)).await.unwrap();
    let err = second.create_post(&post(feed.id, "shared", None)).await.unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(second.get_posts_for_feed(feed.id).await.unwrap().len(), 1);

    first.close().await;
    second.close().await;
    std::fs::remove_dir_all(&dir).ok();
}

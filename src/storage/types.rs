use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// A unique constraint rejected the write (duplicate user name, feed URL,
    /// follow pair or post URL)
    #[error("Already exists: {0}")]
    Conflict(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Classify a sqlx error, separating unique-key violations from everything else.
    ///
    /// Callers treat `Conflict` as an expected outcome (ingestion skips the item,
    /// `follow` reports the existing subscription), so the distinction is made from
    /// the driver's constraint code rather than from error message text.
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return DatabaseError::Conflict(db_err.message().to_string());
            }
        }
        DatabaseError::Other(err)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, DatabaseError::Conflict(_))
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A feed source owned by the user that added it.
///
/// `last_fetched_at` is `None` until the scheduler first picks the feed.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Feed {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub user_id: i64,
    pub last_fetched_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Feed row joined with the name of the user who created it (`feeds` command)
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FeedWithCreator {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub creator: String,
}

/// A subscription of a user to a feed, with both names resolved for display.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FeedFollow {
    pub id: i64,
    pub user_id: i64,
    pub feed_id: i64,
    pub user_name: String,
    pub feed_name: String,
    pub created_at: i64,
}

/// An ingested feed item. Posts are only ever inserted; `url` is globally unique.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub feed_id: i64,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub published_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Post row joined with its feed name, as listed by `browse`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostWithFeed {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub published_at: Option<i64>,
    pub feed_name: String,
}

/// Parameters for a single post insert
#[derive(Debug, Clone)]
pub struct NewPost {
    pub feed_id: i64,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub published_at: Option<i64>,
}

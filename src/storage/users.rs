use super::schema::{now_millis, Database};
use super::types::{DatabaseError, User};

impl Database {
    // ========================================================================
    // User Operations
    // ========================================================================

    /// Register a new user.
    ///
    /// Returns `DatabaseError::Conflict` when the name is already taken.
    pub async fn create_user(&self, name: &str) -> Result<User, DatabaseError> {
        let now = now_millis();
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, created_at, updated_at)
            VALUES (?, ?, ?)
            RETURNING id, name, created_at, updated_at
        "#,
        )
        .bind(name)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Look up a user by name
    pub async fn get_user(&self, name: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, created_at, updated_at FROM users WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// All users, ordered by name
    pub async fn get_users(&self) -> Result<Vec<User>, DatabaseError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, name, created_at, updated_at FROM users ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    /// Delete every user and feed.
    ///
    /// Follows and posts go with them through `ON DELETE CASCADE`.
    /// Returns the number of users removed.
    pub async fn reset(&self) -> Result<u64, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM feeds").execute(&mut *tx).await?;
        let removed = sqlx::query("DELETE FROM users")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(removed)
    }
}

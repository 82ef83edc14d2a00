/// Refresh token model and database operations
///
/// Each user holds at most one refresh token. Only the SHA-256 digest of the
/// opaque token is stored; the plaintext is handed to the client once.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE refresh_tokens (
///     user_id UUID PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
///     token_hash VARCHAR(64) NOT NULL UNIQUE,
///     expires_at TIMESTAMPTZ NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Stored refresh token
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RefreshToken {
    /// Owning user (one token per user)
    pub user_id: Uuid,

    /// SHA-256 hex digest of the opaque token
    pub token_hash: String,

    /// Absolute expiry
    pub expires_at: DateTime<Utc>,

    /// When the token was issued
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    /// Checks whether the token has expired at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Replaces the user's refresh token
    ///
    /// A single upsert on the `user_id` key, so concurrent replacements for
    /// one user both succeed and the last one wins.
    pub async fn replace_for_user(
        pool: &PgPool,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        let token = sqlx::query_as::<_, RefreshToken>(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE
            SET token_hash = EXCLUDED.token_hash,
                expires_at = EXCLUDED.expires_at,
                created_at = NOW()
            RETURNING user_id, token_hash, expires_at, created_at
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .fetch_one(pool)
        .await?;

        Ok(token)
    }

    /// Finds a token by its digest
    pub async fn find_by_hash(pool: &PgPool, token_hash: &str) -> Result<Option<Self>, sqlx::Error> {
        let token = sqlx::query_as::<_, RefreshToken>(
            r#"
            SELECT user_id, token_hash, expires_at, created_at
            FROM refresh_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(pool)
        .await?;

        Ok(token)
    }

    /// Deletes a token by its digest
    pub async fn delete_by_hash(pool: &PgPool, token_hash: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token_hash = $1")
            .bind(token_hash)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes every refresh token of a user
    ///
    /// # Returns
    ///
    /// Number of tokens deleted
    pub async fn delete_for_user(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}

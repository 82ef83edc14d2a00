/// Email verification token model and database operations
///
/// Issued at registration and consumed once on confirmation. Like refresh
/// tokens, only the SHA-256 digest is stored and a user has at most one.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE verification_tokens (
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

/// Stored verification token
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VerificationToken {
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl VerificationToken {
    /// Checks whether the token has expired at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Replaces the user's verification token
    ///
    /// A single upsert on the `user_id` key, so concurrent replacements for
    /// one user both succeed and the last one wins.
    pub async fn replace_for_user(
        pool: &PgPool,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        let token = sqlx::query_as::<_, VerificationToken>(
            r#"
            INSERT INTO verification_tokens (user_id, token_hash, expires_at)
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
        let token = sqlx::query_as::<_, VerificationToken>(
            r#"
            SELECT user_id, token_hash, expires_at, created_at
            FROM verification_tokens
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
        let result = sqlx::query("DELETE FROM verification_tokens WHERE token_hash = $1")
            .bind(token_hash)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Consumes the token identified by `token_hash` and enables its user
    ///
    /// Runs in one transaction. The delete comes first so two concurrent
    /// confirmations cannot both succeed.
    ///
    /// # Returns
    ///
    /// True if a token was consumed
    pub async fn redeem(pool: &PgPool, token_hash: &str) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let user_id = sqlx::query_scalar::<_, Uuid>(
            "DELETE FROM verification_tokens WHERE token_hash = $1 RETURNING user_id",
        )
        .bind(token_hash)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(user_id) = user_id else {
            return Ok(false);
        };

        sqlx::query("UPDATE users SET enabled = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(true)
    }
}

/// Session token lifecycle
///
/// [`TokenService`] issues, validates and revokes the three credentials a
/// user can hold:
///
/// | Token | Form | Stored | Lifetime |
/// |-------|------|--------|----------|
/// | access | signed JWT | no | `access_ttl` |
/// | refresh | opaque `pfr_...` | SHA-256 digest, one per user | `refresh_ttl` |
/// | verification | opaque `pfv_...` | SHA-256 digest, one per user | `verification_ttl` |
///
/// # Session states
///
/// ```text
/// Unauthenticated ──login──▶ Authenticated(access, refresh)
///        ▲                          │            │
///        │                    access expires   logout / refresh expires
///        │                          ▼            ▼
///        └──────────────────── Expired ─────── Revoked
/// ```
///
/// Refreshing issues a new access token only; the refresh token is not
/// rotated. Issuing a refresh token replaces any previous one for the user.
/// Expired refresh and verification tokens are deleted when presented.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use chrono::Duration;
/// use projectflow_shared::auth::clock::SystemClock;
/// use projectflow_shared::auth::tokens::{TokenConfig, TokenService};
/// use projectflow_shared::store::memory::MemoryStore;
///
/// # async fn example(user: projectflow_shared::models::user::User) -> Result<(), Box<dyn std::error::Error>> {
/// let tokens = TokenService::new(
///     Arc::new(MemoryStore::new()),
///     TokenConfig {
///         jwt_secret: "a-secret-key-of-at-least-32-bytes!!".to_string(),
///         access_ttl: Duration::minutes(15),
///         refresh_ttl: Duration::days(7),
///         verification_ttl: Duration::hours(6),
///     },
///     Arc::new(SystemClock),
/// );
///
/// let access = tokens.issue_access_token(&user)?;
/// let refresh = tokens.issue_refresh_token(user.id).await?;
///
/// let claims = tokens.validate_access(&access.token)?;
/// assert_eq!(claims.id, user.id);
///
/// let (renewed, owner) = tokens.refresh(Some(&refresh.token)).await?;
/// assert_eq!(owner.id, user.id);
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::clock::Clock;
use super::jwt::{create_token, validate_token, Claims, JwtError};
use super::opaque::{generate_token, hash_token, validate_format, TokenKind};
use crate::models::user::User;
use crate::store::{Store, StoreError};

/// Error type for token operations
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// No token was presented
    #[error("Token is missing")]
    Missing,

    /// Bad signature, bad format, or an unknown/expired verification token
    #[error("Token is invalid")]
    Invalid,

    /// Token is past its expiry
    #[error("Token has expired")]
    Expired,

    /// Refresh token isn't in the store (revoked, replaced or never issued)
    #[error("Token not found")]
    NotFound,

    /// Signing failed
    #[error("Failed to sign token: {0}")]
    Signing(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Token lifetimes and signing secret
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub jwt_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub verification_ttl: Duration,
}

/// A freshly issued token and its expiry
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues, validates and revokes session tokens
#[derive(Clone)]
pub struct TokenService {
    store: Arc<dyn Store>,
    config: TokenConfig,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(store: Arc<dyn Store>, config: TokenConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            config,
            clock,
        }
    }

    /// Current instant according to the service clock
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Lifetime of access tokens
    pub fn access_ttl(&self) -> Duration {
        self.config.access_ttl
    }

    /// Signs an access token for `user`
    ///
    /// Pure computation; nothing is stored.
    pub fn issue_access_token(&self, user: &User) -> Result<IssuedToken, TokenError> {
        let now = self.clock.now();
        let claims = Claims::new(user.id, &user.email, now, self.config.access_ttl);

        let token = create_token(&claims, &self.config.jwt_secret)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(IssuedToken {
            token,
            expires_at: now + self.config.access_ttl,
        })
    }

    /// Validates an access token and returns its claims
    ///
    /// # Errors
    ///
    /// - `TokenError::Expired` if the token is past its expiry
    /// - `TokenError::Invalid` for any signature, format or issuer problem
    pub fn validate_access(&self, token: &str) -> Result<Claims, TokenError> {
        validate_token(token, &self.config.jwt_secret, self.clock.now()).map_err(|e| match e {
            JwtError::Expired => TokenError::Expired,
            _ => TokenError::Invalid,
        })
    }

    /// Issues a refresh token for `user_id`, replacing any previous one
    pub async fn issue_refresh_token(&self, user_id: Uuid) -> Result<IssuedToken, TokenError> {
        let (token, hash) = generate_token(TokenKind::Refresh);
        let expires_at = self.clock.now() + self.config.refresh_ttl;

        self.store
            .replace_refresh_token(user_id, &hash, expires_at)
            .await?;

        tracing::debug!(user_id = %user_id, expires_at = %expires_at, "Issued refresh token");

        Ok(IssuedToken { token, expires_at })
    }

    /// Exchanges a refresh token for a new access token
    ///
    /// # Returns
    ///
    /// The new access token and the user owning the refresh token
    ///
    /// # Errors
    ///
    /// - `TokenError::Missing` if no token (or an empty one) was presented
    /// - `TokenError::NotFound` if the token isn't stored, or its user is gone
    /// - `TokenError::Expired` if the token is past its expiry; the row is deleted
    pub async fn refresh(&self, token: Option<&str>) -> Result<(IssuedToken, User), TokenError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(TokenError::Missing)?;

        if !validate_format(TokenKind::Refresh, token) {
            return Err(TokenError::NotFound);
        }

        let hash = hash_token(token);
        let stored = self
            .store
            .find_refresh_token(&hash)
            .await?
            .ok_or(TokenError::NotFound)?;

        if stored.is_expired(self.clock.now()) {
            self.store.delete_refresh_token(&hash).await?;
            tracing::debug!(user_id = %stored.user_id, "Deleted expired refresh token");
            return Err(TokenError::Expired);
        }

        let user = self
            .store
            .find_user(stored.user_id)
            .await?
            .ok_or(TokenError::NotFound)?;

        let access = self.issue_access_token(&user)?;

        Ok((access, user))
    }

    /// Deletes every refresh token of a user
    pub async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, TokenError> {
        let revoked = self.store.delete_refresh_tokens_for_user(user_id).await?;
        tracing::debug!(user_id = %user_id, revoked, "Revoked refresh tokens");
        Ok(revoked)
    }

    /// Issues an email verification token for `user_id`, replacing any previous one
    pub async fn issue_verification_token(&self, user_id: Uuid) -> Result<IssuedToken, TokenError> {
        let (token, hash) = generate_token(TokenKind::Verification);
        let expires_at = self.clock.now() + self.config.verification_ttl;

        self.store
            .replace_verification_token(user_id, &hash, expires_at)
            .await?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Consumes a verification token and enables its user
    ///
    /// # Returns
    ///
    /// ID of the confirmed user
    ///
    /// # Errors
    ///
    /// `TokenError::Invalid` if the token is unknown, already used or
    /// expired. Expired tokens are deleted.
    pub async fn redeem_verification_token(&self, token: &str) -> Result<Uuid, TokenError> {
        let token = token.trim();
        if !validate_format(TokenKind::Verification, token) {
            return Err(TokenError::Invalid);
        }

        let hash = hash_token(token);
        let stored = self
            .store
            .find_verification_token(&hash)
            .await?
            .ok_or(TokenError::Invalid)?;

        if stored.is_expired(self.clock.now()) {
            self.store.delete_verification_token(&hash).await?;
            tracing::debug!(user_id = %stored.user_id, "Deleted expired verification token");
            return Err(TokenError::Invalid);
        }

        // A concurrent confirmation may have consumed it in between
        if !self.store.redeem_verification_token(&hash).await? {
            return Err(TokenError::Invalid);
        }

        Ok(stored.user_id)
    }
}

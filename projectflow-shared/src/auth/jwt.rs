/// JWT access token generation and validation
///
/// Access tokens are short-lived HS256-signed JWTs carrying the user's ID
/// and email. Refresh and verification tokens are opaque instead (see
/// [`super::opaque`]).
///
/// # Security
///
/// - **Algorithm**: HS256 (HMAC with SHA-256)
/// - **Expiration**: Configurable per deployment (`JWT_EXPIRATION_MS`)
/// - **Validation**: Signature, issuer, then expiry against an explicit clock
/// - **Secret Management**: Secrets must be at least 32 bytes
///
/// Expiry is checked against the `now` the caller passes rather than the
/// system clock, so token lifetimes follow the service's [`super::clock::Clock`].
///
/// # Example
///
/// ```
/// use projectflow_shared::auth::jwt::{create_token, validate_token, Claims};
/// use chrono::{Duration, Utc};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "a-secret-key-of-at-least-32-bytes!!";
/// let now = Utc::now();
/// let user_id = Uuid::new_v4();
///
/// let claims = Claims::new(user_id, "ada@example.com", now, Duration::minutes(15));
/// let token = create_token(&claims, secret)?;
///
/// let validated = validate_token(&token, secret, now)?;
/// assert_eq!(validated.id, user_id);
/// assert_eq!(validated.sub, "ada@example.com");
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer claim written into and required from every token
pub const ISSUER: &str = "projectflow";

/// Minimum signing secret length in bytes
pub const MIN_SECRET_LEN: usize = 32;

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Signature, format or claim validation failed
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Token was issued by someone else
    #[error("Invalid issuer")]
    InvalidIssuer,
}

/// Access token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - the user's email
    pub sub: String,

    /// User ID
    pub id: Uuid,

    /// Issuer - always [`ISSUER`]
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,
}

impl Claims {
    /// Creates claims issued at `now` and valid for `ttl`
    pub fn new(user_id: Uuid, email: &str, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub: email.to_string(),
            id: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            nbf: now.timestamp(),
        }
    }

    /// Checks whether the token has expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }

    /// Expiry as a timestamp
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// Signs claims into a JWT with HS256
///
/// # Errors
///
/// Returns `JwtError::CreateError` if encoding fails
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates a JWT and extracts its claims
///
/// Verifies, in order:
/// - Signature and format
/// - Issuer is [`ISSUER`]
/// - Token is not used before `nbf`
/// - Token hasn't expired at `now`
///
/// # Errors
///
/// - `JwtError::Expired` if `now` is at or past `exp`
/// - `JwtError::InvalidIssuer` if the issuer doesn't match
/// - `JwtError::ValidationError` for anything else
pub fn validate_token(token: &str, secret: &str, now: DateTime<Utc>) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    // Time-based claims are checked below against the caller's clock
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    let claims = token_data.claims;

    if now.timestamp() < claims.nbf {
        return Err(JwtError::ValidationError("Token not yet valid".to_string()));
    }

    if claims.is_expired_at(now) {
        return Err(JwtError::Expired);
    }

    Ok(claims)
}

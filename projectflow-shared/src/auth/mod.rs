/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength rules
/// - [`jwt`]: Signed access tokens
/// - [`opaque`]: Random refresh/verification tokens and their digests
/// - [`clock`]: Time source used for every expiry decision
/// - [`tokens`]: Token lifecycle service (issue, validate, refresh, revoke)
/// - [`authorization`]: Project membership and admin checks
/// - [`middleware`]: Request token extraction and the `AuthContext` extractor
///
/// # Example
///
/// ```
/// use projectflow_shared::auth::password::{hash_password, verify_password};
/// use projectflow_shared::auth::jwt::{create_token, validate_token, Claims};
/// use chrono::{Duration, Utc};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password_1")?;
/// assert!(verify_password("user_password_1", &hash)?);
///
/// let now = Utc::now();
/// let claims = Claims::new(Uuid::new_v4(), "ada@example.com", now, Duration::minutes(15));
/// let token = create_token(&claims, "a-secret-key-of-at-least-32-bytes!!")?;
/// validate_token(&token, "a-secret-key-of-at-least-32-bytes!!", now)?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod clock;
pub mod jwt;
pub mod middleware;
pub mod opaque;
pub mod password;
pub mod tokens;

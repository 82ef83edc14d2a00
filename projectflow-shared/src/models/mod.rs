/// Database models for ProjectFlow
///
/// This module contains the persisted entities and their PostgreSQL queries.
/// Relations are held by ID only; there are no embedded child collections.
///
/// # Models
///
/// - `user`: User accounts
/// - `project`: Projects and task key numbering
/// - `membership`: User-project links with roles, keyed by (project, user)
/// - `task`: Tasks, their lanes and ranks
/// - `refresh_token`: One refresh token per user
/// - `verification_token`: One-shot email confirmation tokens
///
/// # Example
///
/// ```no_run
/// use projectflow_shared::models::user::{User, CreateUser};
/// use projectflow_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     name: "Ada".to_string(),
///     email: "ada@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     enabled: true,
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod membership;
pub mod project;
pub mod refresh_token;
pub mod task;
pub mod user;
pub mod verification_token;

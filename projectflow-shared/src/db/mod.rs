/// PostgreSQL plumbing
///
/// # Modules
///
/// - `pool`: Connection pool creation and health checks
/// - `migrations`: Embedded schema migrations (`projectflow-shared/migrations`)
///
/// Queries live on the models; the store layer wraps them behind traits.
///
/// # Example
///
/// ```no_run
/// use projectflow_shared::db::{migrations::run_migrations, pool::{create_pool, DatabaseConfig}};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pool = create_pool(DatabaseConfig::from_url(std::env::var("DATABASE_URL")?)).await?;
///     run_migrations(&pool).await?;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;

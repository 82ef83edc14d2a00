/// Schema migrations
///
/// Migration files live in `projectflow-shared/migrations/` and are embedded
/// into the binary at compile time by `sqlx::migrate!`. Each migration has a
/// `{version}_{name}.up.sql` and a matching `.down.sql`.
///
/// # Example
///
/// ```no_run
/// use projectflow_shared::db::migrations::{ensure_database_exists, run_migrations};
/// use projectflow_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example(url: &str) -> Result<(), Box<dyn std::error::Error>> {
/// ensure_database_exists(url).await?;
/// let pool = create_pool(DatabaseConfig::from_url(url)).await?;
/// run_migrations(&pool).await?;
/// # Ok(())
/// # }
/// ```

use sqlx::{migrate::MigrateDatabase, postgres::PgPool, Postgres};
use tracing::{debug, info, warn};

/// Applies every pending migration
///
/// # Errors
///
/// Returns an error if a migration fails or was modified after being applied
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Running database migrations");

    match sqlx::migrate!("./migrations").run(pool).await {
        Ok(()) => {
            info!("Database schema is up to date");
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "Migration failed");
            Err(e)
        }
    }
}

/// Creates the database named in `database_url` if it doesn't exist
///
/// Meant for development and test databases.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), sqlx::Error> {
    if Postgres::database_exists(database_url).await? {
        debug!("Database already exists");
        return Ok(());
    }

    info!("Database does not exist, creating it");
    Postgres::create_database(database_url).await?;

    Ok(())
}

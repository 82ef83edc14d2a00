/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `CORS_ORIGINS`: Comma-separated allowed origins (default: `*`)
/// - `APP_ENV`: `development` or `production` (default: development)
/// - `DATABASE_URL`: PostgreSQL connection string (optional; in-memory store when unset)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `JWT_SECRET`: Secret key for JWT signing (required, at least 32 characters)
/// - `JWT_EXPIRATION_MS`: Access token lifetime (default: 15 minutes)
/// - `JWT_REFRESH_EXPIRATION_MS`: Refresh token lifetime (default: 7 days)
/// - `VERIFICATION_EXPIRATION_MS`: Email confirmation token lifetime (default: 6 hours)
/// - `REQUIRE_EMAIL_VERIFICATION`: Whether new accounts must confirm their email (default: true)
/// - `CLIENT_URL`: Web client base URL for confirmation links (default: http://localhost:3000)
/// - `RUST_LOG`: Log filter; `LOG_FORMAT=json` switches to JSON logs
///
/// # Example
///
/// ```no_run
/// use projectflow_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::env;
use std::str::FromStr;

use chrono::Duration;
use projectflow_shared::auth::jwt::MIN_SECRET_LEN;
use serde::{Deserialize, Serialize};

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration; `None` runs on the in-memory store
    pub database: Option<DatabaseConfig>,

    /// Token configuration
    pub jwt: JwtConfig,

    /// Account configuration
    pub accounts: AccountConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Production mode (secure cookies)
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// Token configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Must be at least 32 bytes. Generate with: `openssl rand -hex 32`
    #[serde(skip_serializing)]
    pub secret: String,

    /// Access token lifetime in milliseconds
    pub expiration_ms: i64,

    /// Refresh token lifetime in milliseconds
    pub refresh_expiration_ms: i64,

    /// Verification token lifetime in milliseconds
    pub verification_expiration_ms: i64,
}

/// Account configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// New accounts stay disabled until their email is confirmed
    pub require_email_verification: bool,

    /// Base URL of the web client
    pub client_url: String,
}

impl JwtConfig {
    pub fn access_ttl(&self) -> Duration {
        Duration::milliseconds(self.expiration_ms)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::milliseconds(self.refresh_expiration_ms)
    }

    pub fn verification_ttl(&self) -> Duration {
        Duration::milliseconds(self.verification_expiration_ms)
    }
}

fn var_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value: {}", name, e)),
        _ => Ok(default),
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `JWT_SECRET` is missing or shorter than 32 characters
    /// - A variable has an unparsable value
    /// - A token lifetime isn't positive
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let production = env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let database = match env::var("DATABASE_URL") {
            Ok(url) if !url.trim().is_empty() => Some(DatabaseConfig {
                url,
                max_connections: var_or("DATABASE_MAX_CONNECTIONS", 10)?,
            }),
            _ => None,
        };

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < MIN_SECRET_LEN {
            anyhow::bail!("JWT_SECRET must be at least {} characters long", MIN_SECRET_LEN);
        }

        let jwt = JwtConfig {
            secret: jwt_secret,
            expiration_ms: var_or("JWT_EXPIRATION_MS", 900_000)?,
            refresh_expiration_ms: var_or("JWT_REFRESH_EXPIRATION_MS", 604_800_000)?,
            verification_expiration_ms: var_or("VERIFICATION_EXPIRATION_MS", 21_600_000)?,
        };

        if jwt.expiration_ms <= 0 || jwt.refresh_expiration_ms <= 0 || jwt.verification_expiration_ms <= 0 {
            anyhow::bail!("Token lifetimes must be positive");
        }

        Ok(Self {
            api: ApiConfig {
                host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: var_or("API_PORT", 8080)?,
                cors_origins,
                production,
            },
            database,
            jwt,
            accounts: AccountConfig {
                require_email_verification: var_or("REQUIRE_EMAIL_VERIFICATION", true)?,
                client_url: env::var("CLIENT_URL")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                cors_origins: vec!["*".to_string()],
                production: false,
            },
            database: None,
            jwt: JwtConfig {
                secret: "test-secret-key-at-least-32-bytes-long".to_string(),
                expiration_ms: 900_000,
                refresh_expiration_ms: 604_800_000,
                verification_expiration_ms: 21_600_000,
            },
            accounts: AccountConfig {
                require_email_verification: true,
                client_url: "http://localhost:3000".to_string(),
            },
        }
    }

    #[test]
    fn test_bind_address() {
        assert_eq!(config().bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_ttls() {
        let jwt = config().jwt;
        assert_eq!(jwt.access_ttl(), Duration::minutes(15));
        assert_eq!(jwt.refresh_ttl(), Duration::days(7));
        assert_eq!(jwt.verification_ttl(), Duration::hours(6));
    }

    #[test]
    fn test_secret_is_not_serialized() {
        let json = serde_json::to_string(&config()).unwrap();
        assert!(!json.contains("test-secret-key"));
    }
}

//! # ProjectFlow API Server
//!
//! HTTP server for the ProjectFlow task tracker: accounts and sessions,
//! projects with role-based membership, and task boards with drag-and-drop
//! ordering.
//!
//! ## Usage
//!
//! ```bash
//! JWT_SECRET=$(openssl rand -hex 32) cargo run -p projectflow-api
//! ```
//!
//! Without `DATABASE_URL` the server keeps all data in memory.

use std::sync::Arc;

use projectflow_api::{
    app::{build_router, AppState},
    config::Config,
};
use projectflow_shared::{
    auth::clock::SystemClock,
    db::{
        migrations::run_migrations,
        pool::{create_pool, DatabaseConfig},
    },
    service::mail::LogMailer,
    store::{memory::MemoryStore, postgres::PgStore, Store},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!(
        "ProjectFlow API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let store: Arc<dyn Store> = match &config.database {
        Some(database) => {
            let mut db_config = DatabaseConfig::from_url(&database.url);
            db_config.max_connections = database.max_connections;

            let pool = create_pool(db_config).await?;
            run_migrations(&pool).await?;
            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL is not set; using the in-memory store (data is lost on exit)");
            Arc::new(MemoryStore::new())
        }
    };

    let bind_address = config.bind_address();
    let state = AppState::new(
        store.clone(),
        Arc::new(LogMailer),
        Arc::new(SystemClock),
        config,
    );
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    tracing::info!("Server stopped");

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "projectflow_api=debug,projectflow_shared=debug,tower_http=debug".into()
    });

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, exiting...");
}

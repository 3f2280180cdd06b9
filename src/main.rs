//! Ledger Transaction Server - Main Application Entry Point
//!
//! Serves the ledger core (deposits, withdrawals, transfers and ledger
//! history) over a small JSON API.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx, row locks via `SELECT ... FOR UPDATE`
//! - **Money**: `rust_decimal`, stored as `NUMERIC(20, 2)`
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Optionally seed demo accounts
//! 5. Build HTTP router and start server on configured port

use ledger_transaction_server::{
    config, db,
    routes::{self, AppState},
    services::{AccountService, QueryService, TransactionEngine},
    store::PgStore,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    let pool = db::create_pool(
        &config.database_url,
        config.max_connections,
        config.unit_of_work_timeout(),
    )
    .await?;
    tracing::info!("Database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let store = PgStore::new(pool);

    if config.seed_demo_accounts {
        let opened = AccountService::new(store.clone())
            .seed_demo_accounts()
            .await?;
        tracing::info!(count = opened.len(), "Demo accounts seeded");
    }

    let engine = TransactionEngine::new(store.clone(), config.unit_of_work_timeout());
    let queries = QueryService::new(store.clone(), config.ledger_page_size);
    let app = routes::router(AppState::new(engine, queries, store));

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

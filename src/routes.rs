//! HTTP router and shared handler state.

use axum::{
    Router,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers,
    services::{AccountService, QueryService, TransactionEngine},
    store::LedgerStore,
};

/// Everything a handler needs, shared via `State` extraction.
#[derive(Clone)]
pub struct AppState<S> {
    pub store: S,
    pub engine: TransactionEngine<S>,
    pub queries: QueryService<S>,
    pub accounts: AccountService<S>,
}

impl<S: LedgerStore> AppState<S> {
    pub fn new(engine: TransactionEngine<S>, queries: QueryService<S>, store: S) -> Self {
        Self {
            accounts: AccountService::new(store.clone()),
            store,
            engine,
            queries,
        }
    }
}

/// Build the application router.
pub fn router<S: LedgerStore>(state: AppState<S>) -> Router {
    Router::new()
        // Public routes
        .route("/health", get(handlers::health::health_check::<S>))
        // Account routes
        .route(
            "/api/v1/accounts",
            post(handlers::accounts::open_account::<S>).get(handlers::accounts::list_accounts::<S>),
        )
        .route(
            "/api/v1/accounts/{id}",
            get(handlers::accounts::get_account::<S>),
        )
        // Transaction routes
        .route(
            "/api/v1/transactions",
            get(handlers::transactions::list_entries::<S>),
        )
        .route(
            "/api/v1/transactions/deposit",
            post(handlers::transactions::deposit::<S>),
        )
        .route(
            "/api/v1/transactions/withdraw",
            post(handlers::transactions::withdraw::<S>),
        )
        .route(
            "/api/v1/transactions/transfer",
            post(handlers::transactions::transfer::<S>),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

//! Account HTTP handlers.
//!
//! This module implements the account-related API endpoints:
//! - POST /api/v1/accounts - Open new account
//! - GET /api/v1/accounts/:id - Get account balance
//! - GET /api/v1/accounts - List all accounts

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    error::LedgerError,
    models::{Account, AccountId, account::OpenAccountRequest},
    routes::AppState,
    store::LedgerStore,
};

/// Open a new account.
///
/// # Request Body
///
/// ```json
/// {
///   "opening_balance": "100.00"
/// }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: Returns the opened account
/// - **Error (400)**: Negative or over-precise opening balance
pub async fn open_account<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Json(request): Json<OpenAccountRequest>,
) -> Result<(StatusCode, Json<Account>), LedgerError> {
    let account = state.accounts.open(request.opening_balance).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// Get one account by id.
///
/// The balance is read without taking the row lock.
pub async fn get_account<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<i64>,
) -> Result<Json<Account>, LedgerError> {
    let account = state.queries.account(AccountId(id)).await?;
    Ok(Json(account))
}

/// List all accounts ordered by id.
pub async fn list_accounts<S: LedgerStore>(
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<Account>>, LedgerError> {
    let accounts = state.queries.accounts().await?;
    Ok(Json(accounts))
}

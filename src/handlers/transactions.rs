//! Transaction HTTP handlers.
//!
//! This module implements transaction-related API endpoints:
//! - POST /api/v1/transactions/deposit - Add money to account
//! - POST /api/v1/transactions/withdraw - Remove money from account
//! - POST /api/v1/transactions/transfer - Move money between accounts
//! - GET /api/v1/transactions - List ledger entries

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};

use crate::{
    error::LedgerError,
    models::{
        EntryFilter, LedgerEntry,
        ledger_entry::{DepositRequest, TransferRequest, WithdrawRequest},
    },
    routes::AppState,
    services::Operation,
    store::LedgerStore,
};

/// Deposit into an account.
///
/// # Request Body
///
/// ```json
/// {
///   "account_id": 1,
///   "amount": "50.00",
///   "details": "Initial deposit"
/// }
/// ```
///
/// # Response (201)
///
/// ```json
/// {
///   "id": 7,
///   "from_account_id": 1,
///   "from_account_balance": "150.00",
///   "to_account_id": 1,
///   "to_account_balance": "150.00",
///   "amount": "50.00",
///   "kind": "deposit",
///   "details": "Initial deposit",
///   "created_at": "2025-12-21T16:00:00Z"
/// }
/// ```
pub async fn deposit<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Json(request): Json<DepositRequest>,
) -> Result<(StatusCode, Json<LedgerEntry>), LedgerError> {
    let operation = Operation::Deposit {
        account_id: request.account_id,
        amount: request.amount,
    };

    execute(&state, operation, request.details).await
}

/// Withdraw from an account.
///
/// # Validation
///
/// - Account must have sufficient balance (400 otherwise)
/// - Account must exist (404 otherwise)
pub async fn withdraw<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Json(request): Json<WithdrawRequest>,
) -> Result<(StatusCode, Json<LedgerEntry>), LedgerError> {
    let operation = Operation::Withdraw {
        account_id: request.account_id,
        amount: request.amount,
    };

    execute(&state, operation, request.details).await
}

/// Transfer money between accounts.
///
/// # Atomicity
///
/// Both accounts and the ledger entry are written in a single unit of work.
///
/// # Validation
///
/// - Source must have sufficient balance
/// - Accounts must be different
pub async fn transfer<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Json(request): Json<TransferRequest>,
) -> Result<(StatusCode, Json<LedgerEntry>), LedgerError> {
    let operation = Operation::Transfer {
        from: request.from_account_id,
        to: request.to_account_id,
        amount: request.amount,
    };

    execute(&state, operation, request.details).await
}

/// List ledger entries, oldest first.
///
/// # Query Parameters
///
/// - `account_id` (optional): only entries where the account is source or destination
/// - `after_id` (optional): continue after this entry id
/// - `limit` (optional): page size
pub async fn list_entries<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Query(filter): Query<EntryFilter>,
) -> Result<Json<Vec<LedgerEntry>>, LedgerError> {
    let entries = state.queries.ledger_entries(filter).await?;
    Ok(Json(entries))
}

async fn execute<S: LedgerStore>(
    state: &AppState<S>,
    operation: Operation,
    details: Option<String>,
) -> Result<(StatusCode, Json<LedgerEntry>), LedgerError> {
    let details = details.unwrap_or_default();
    let entry = state
        .engine
        .execute(&operation, &details, state.engine.timeout())
        .await?;

    Ok((StatusCode::CREATED, Json(entry)))
}

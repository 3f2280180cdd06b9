//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Calls the ledger services
//! 3. Returns HTTP response (JSON, status code)

/// Account opening and balance endpoints
pub mod accounts;
/// Store connectivity endpoint
pub mod health;
/// Deposit, withdraw, transfer and ledger history endpoints
pub mod transactions;

//! Account data models and API request types.
//!
//! This module defines:
//! - `AccountId`: Strongly typed account identifier
//! - `Account`: Database entity holding the current balance of one account
//! - `OpenAccountRequest`: Request body for opening accounts

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identifier of an account row.
///
/// Ids are positive and assigned by the store when the account is opened.
/// The type is ordered so that multi-row locks can be taken in a fixed
/// order (ascending id).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct AccountId(pub i64);

impl AccountId {
    /// Ids start at 1; zero and negative values never reference a row.
    pub fn is_valid(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Represents an account record from the database.
///
/// # Database Table
///
/// Maps to the `accounts` table. The balance column is only ever modified
/// by the transaction engine while it holds the row lock.
///
/// # Balance Storage
///
/// Balances are `NUMERIC(20, 2)` in Postgres and `Decimal` here, so values
/// such as 100.10 are exact.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct Account {
    /// Unique identifier for this account
    pub id: AccountId,

    /// Current balance, never negative
    pub balance: Decimal,

    /// Timestamp when account was opened
    pub created_at: DateTime<Utc>,

    /// Timestamp of last committed balance change
    pub updated_at: DateTime<Utc>,
}

/// Request body for opening a new account.
///
/// # JSON Example
///
/// ```json
/// {
///   "opening_balance": "100.00"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct OpenAccountRequest {
    /// Starting balance (defaults to 0 if not provided)
    #[serde(default)]
    pub opening_balance: Decimal,
}

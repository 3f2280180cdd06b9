//! Ledger entry data models and API request types.
//!
//! This module defines:
//! - `LedgerEntry`: Immutable database record of one committed balance change
//! - `NewLedgerEntry`: Values the engine hands to the store for insertion
//! - `OperationKind`: deposit, withdraw or transfer
//! - `EntryFilter`: Selection used by the query service
//! - Request types for deposit, withdraw and transfer

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::account::AccountId;

/// Kind of balance-changing operation.
///
/// Stored in Postgres as the `ledger_operation_kind` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "ledger_operation_kind", rename_all = "lowercase")]
pub enum OperationKind {
    Deposit,
    Withdraw,
    Transfer,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Deposit => "deposit",
            OperationKind::Withdraw => "withdraw",
            OperationKind::Transfer => "transfer",
        }
    }
}

/// Represents a ledger entry record from the database.
///
/// # Database Table
///
/// Maps to the `ledger_entries` table. Entries are append-only: the table
/// carries a trigger that rejects `UPDATE` and `DELETE`.
///
/// For deposits and withdrawals the source and destination are the same
/// account and both recorded balances are equal. For transfers they differ.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct LedgerEntry {
    /// Store-assigned identifier, increasing with insertion
    pub id: i64,

    /// Debited account (the account itself for deposit/withdraw)
    pub from_account_id: AccountId,

    /// Balance of the source account after the operation
    pub from_account_balance: Decimal,

    /// Credited account (the account itself for deposit/withdraw)
    pub to_account_id: AccountId,

    /// Balance of the destination account after the operation
    pub to_account_balance: Decimal,

    /// Amount moved, always positive
    pub amount: Decimal,

    pub kind: OperationKind,

    /// Free-form caller supplied text, empty when none was given
    pub details: String,

    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Whether this entry debits or credits `account_id`.
    pub fn involves(&self, account_id: AccountId) -> bool {
        self.from_account_id == account_id || self.to_account_id == account_id
    }
}

/// A ledger entry that has not been inserted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLedgerEntry {
    pub from_account_id: AccountId,
    pub from_account_balance: Decimal,
    pub to_account_id: AccountId,
    pub to_account_balance: Decimal,
    pub amount: Decimal,
    pub kind: OperationKind,
    pub details: String,
}

impl NewLedgerEntry {
    /// Entry for a deposit or withdrawal: the account references itself.
    pub fn single(
        kind: OperationKind,
        account_id: AccountId,
        balance_after: Decimal,
        amount: Decimal,
        details: &str,
    ) -> Self {
        Self {
            from_account_id: account_id,
            from_account_balance: balance_after,
            to_account_id: account_id,
            to_account_balance: balance_after,
            amount,
            kind,
            details: details.to_string(),
        }
    }

    pub fn transfer(
        from: (AccountId, Decimal),
        to: (AccountId, Decimal),
        amount: Decimal,
        details: &str,
    ) -> Self {
        Self {
            from_account_id: from.0,
            from_account_balance: from.1,
            to_account_id: to.0,
            to_account_balance: to.1,
            amount,
            kind: OperationKind::Transfer,
            details: details.to_string(),
        }
    }
}

/// Selection of ledger entries.
///
/// Entries are always returned oldest first. `after_id` continues a previous
/// page (keyset pagination), `limit` caps the page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct EntryFilter {
    /// Only entries where this account is source or destination
    pub account_id: Option<AccountId>,

    /// Only entries with an id strictly greater than this.
    ///
    /// Ids are assigned in commit order, so an entry committed after a page
    /// was read always carries a higher id than that page.
    pub after_id: Option<i64>,

    /// Maximum number of entries to return
    pub limit: Option<u32>,
}

impl EntryFilter {
    pub fn for_account(account_id: AccountId) -> Self {
        Self {
            account_id: Some(account_id),
            ..Self::default()
        }
    }

    /// Apply the filter to an in-memory entry (limit is handled by the caller).
    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        self.account_id.is_none_or(|id| entry.involves(id))
            && self.after_id.is_none_or(|after| entry.id > after)
    }
}

/// Request to deposit money into an account.
///
/// # JSON Example
///
/// ```json
/// {
///   "account_id": 1,
///   "amount": "50.00",
///   "details": "Salary"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub account_id: AccountId,
    pub amount: Decimal,
    #[serde(default)]
    pub details: Option<String>,
}

/// Request to withdraw money from an account.
///
/// # Validation
///
/// - Account must have sufficient balance
/// - Amount must be positive
#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    pub account_id: AccountId,
    pub amount: Decimal,
    #[serde(default)]
    pub details: Option<String>,
}

/// Request to transfer money between accounts.
///
/// # JSON Example
///
/// ```json
/// {
///   "from_account_id": 1,
///   "to_account_id": 2,
///   "amount": "50.00"
/// }
/// ```
///
/// # Atomicity Guarantee
///
/// BOTH accounts are updated in the same unit of work together with the
/// ledger entry. Either all effects are visible or none are.
#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: Decimal,
    #[serde(default)]
    pub details: Option<String>,
}

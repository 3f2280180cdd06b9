//! Account balance store boundary.
//!
//! The transaction engine never talks to a database directly. It opens a
//! [`UnitOfWork`] from a [`LedgerStore`], takes exclusive row locks through
//! it, writes balances, appends one ledger entry and commits. Everything a
//! unit did becomes visible at once on commit, or not at all.
//!
//! Two implementations share this contract:
//! - [`PgStore`]: PostgreSQL via sqlx, row locks are `SELECT ... FOR UPDATE`
//! - [`MemoryStore`]: in-process, one async mutex per account row
//!
//! Dropping a unit without committing rolls it back and releases its locks.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::{
    error::Result,
    models::{Account, AccountId, EntryFilter, LedgerEntry, NewLedgerEntry},
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Proof that a unit of work holds the exclusive lock on an account row.
///
/// Returned by [`UnitOfWork::lock_account`] and required by
/// [`UnitOfWork::write_balance`], so balances can only be written under lock.
/// The lock itself is released when the owning unit commits or rolls back.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountLock {
    account_id: AccountId,
    balance: Decimal,
}

impl AccountLock {
    pub(crate) fn new(account_id: AccountId, balance: Decimal) -> Self {
        Self {
            account_id,
            balance,
        }
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    /// Balance as read under the lock.
    pub fn balance(&self) -> Decimal {
        self.balance
    }
}

/// Durable account and ledger storage.
#[async_trait]
pub trait LedgerStore: Clone + Send + Sync + 'static {
    type Unit: UnitOfWork;

    /// Start a unit of work bounded by `timeout`.
    async fn begin(&self, timeout: Duration) -> Result<Self::Unit>;

    /// Committed account snapshot, read without locking.
    async fn account(&self, id: AccountId) -> Result<Option<Account>>;

    /// All accounts ordered by id, read without locking.
    async fn accounts(&self) -> Result<Vec<Account>>;

    /// Committed ledger entries matching `filter`, ascending by id.
    ///
    /// `filter.limit` must already be resolved by the caller.
    async fn entries(&self, filter: EntryFilter) -> Result<Vec<LedgerEntry>>;

    /// Insert a new account row with the given starting balance.
    async fn open_account(&self, opening_balance: Decimal) -> Result<Account>;

    /// Cheap connectivity check.
    async fn ping(&self) -> Result<()>;
}

/// One all-or-nothing group of locks, balance writes and ledger appends.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Take the exclusive lock on an account row and read its balance.
    ///
    /// Blocks while another unit holds the lock. Returns `None` when no row
    /// matches. Locking an account this unit already holds returns the unit's
    /// current view of it.
    async fn lock_account(&mut self, id: AccountId) -> Result<Option<AccountLock>>;

    /// Replace the balance of a locked account. Negative balances are refused.
    async fn write_balance(&mut self, lock: &AccountLock, balance: Decimal) -> Result<()>;

    /// Append a ledger entry; the store assigns its id and timestamp.
    ///
    /// Waits until every unit that appended earlier has committed or rolled
    /// back, so entry ids follow commit order. Call it after the last
    /// `lock_account` of the unit.
    async fn append_entry(&mut self, entry: NewLedgerEntry) -> Result<LedgerEntry>;

    /// Publish every write of this unit and release its locks.
    async fn commit(self) -> Result<()>;

    /// Discard every write of this unit and release its locks.
    async fn rollback(self) -> Result<()>;
}

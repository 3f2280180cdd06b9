//! In-process ledger store.
//!
//! Every account row owns an async mutex that plays the role of
//! `SELECT ... FOR UPDATE`: a unit of work holds the row's guard until it
//! commits or is dropped. Balance writes and ledger appends are buffered in
//! the unit and published together under a single write lock on commit, so
//! readers see either all of a unit's effects or none.
//!
//! Appending a ledger entry takes a store-wide turn held until the unit
//! finishes, so entry ids are handed out in commit order and a reader paging
//! with `after_id` never steps over an entry that commits later.
//!
//! Used by tests and local runs without Postgres.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        Arc,
        atomic::{AtomicI64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use tokio::sync::{Mutex as RowMutex, OwnedMutexGuard};

use super::{AccountLock, LedgerStore, UnitOfWork};
use crate::{
    error::{LedgerError, Result},
    models::{Account, AccountId, EntryFilter, LedgerEntry, NewLedgerEntry},
    services::money::max_money,
};

/// Mirrors the `NUMERIC(20, 2)` range check of the balance column.
fn check_column_range(balance: Decimal) -> Result<()> {
    if balance > max_money() {
        return Err(LedgerError::invalid(format!("balance {balance} is out of range")));
    }
    Ok(())
}

#[derive(Debug, Default)]
struct Committed {
    accounts: BTreeMap<AccountId, Account>,
    entries: BTreeMap<i64, LedgerEntry>,
}

#[derive(Debug, Default)]
struct Inner {
    state: RwLock<Committed>,
    row_locks: Mutex<HashMap<AccountId, Arc<RowMutex<()>>>>,
    append_turn: Arc<RowMutex<()>>,
    last_account_id: AtomicI64,
    last_entry_id: AtomicI64,
}

/// In-memory [`LedgerStore`].
///
/// Cloning is cheap and every clone shares the same rows.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn row_lock(&self, id: AccountId) -> Option<Arc<RowMutex<()>>> {
        self.inner.row_locks.lock().get(&id).cloned()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    type Unit = MemoryUnit;

    async fn begin(&self, _timeout: Duration) -> Result<MemoryUnit> {
        Ok(MemoryUnit {
            store: self.clone(),
            held: Vec::new(),
            append_turn: None,
            balances: HashMap::new(),
            entries: Vec::new(),
        })
    }

    async fn account(&self, id: AccountId) -> Result<Option<Account>> {
        Ok(self.inner.state.read().accounts.get(&id).cloned())
    }

    async fn accounts(&self) -> Result<Vec<Account>> {
        Ok(self.inner.state.read().accounts.values().cloned().collect())
    }

    async fn entries(&self, filter: EntryFilter) -> Result<Vec<LedgerEntry>> {
        let limit = filter.limit.map_or(usize::MAX, |limit| limit as usize);
        let state = self.inner.state.read();

        Ok(state
            .entries
            .values()
            .filter(|entry| filter.matches(entry))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn open_account(&self, opening_balance: Decimal) -> Result<Account> {
        if opening_balance < Decimal::ZERO {
            return Err(LedgerError::invalid("opening balance cannot be negative"));
        }
        check_column_range(opening_balance)?;

        let id = AccountId(self.inner.last_account_id.fetch_add(1, Ordering::SeqCst) + 1);
        let now = Utc::now();
        let account = Account {
            id,
            balance: opening_balance,
            created_at: now,
            updated_at: now,
        };

        // Row lock first so a concurrent locker never finds a row without one.
        self.inner
            .row_locks
            .lock()
            .insert(id, Arc::new(RowMutex::new(())));
        self.inner.state.write().accounts.insert(id, account.clone());

        Ok(account)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Unit of work over a [`MemoryStore`].
///
/// Holds the row guards it acquired; dropping the unit releases them and
/// discards the buffered writes.
#[derive(Debug)]
pub struct MemoryUnit {
    store: MemoryStore,
    held: Vec<(AccountId, OwnedMutexGuard<()>)>,
    append_turn: Option<OwnedMutexGuard<()>>,
    balances: HashMap<AccountId, Decimal>,
    entries: Vec<LedgerEntry>,
}

impl MemoryUnit {
    fn holds(&self, id: AccountId) -> bool {
        self.held.iter().any(|(held, _)| *held == id)
    }

    fn current_balance(&self, id: AccountId) -> Option<Decimal> {
        self.balances.get(&id).copied().or_else(|| {
            self.store
                .inner
                .state
                .read()
                .accounts
                .get(&id)
                .map(|account| account.balance)
        })
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnit {
    async fn lock_account(&mut self, id: AccountId) -> Result<Option<AccountLock>> {
        if !self.holds(id) {
            let Some(row) = self.store.row_lock(id) else {
                return Ok(None);
            };
            let guard = row.lock_owned().await;
            self.held.push((id, guard));
        }

        Ok(self
            .current_balance(id)
            .map(|balance| AccountLock::new(id, balance)))
    }

    async fn write_balance(&mut self, lock: &AccountLock, balance: Decimal) -> Result<()> {
        if !self.holds(lock.account_id()) {
            return Err(LedgerError::invalid(format!(
                "account {} is not locked by this unit of work",
                lock.account_id()
            )));
        }
        if balance < Decimal::ZERO {
            return Err(LedgerError::invalid("balance cannot be negative"));
        }
        check_column_range(balance)?;

        self.balances.insert(lock.account_id(), balance);
        Ok(())
    }

    async fn append_entry(&mut self, entry: NewLedgerEntry) -> Result<LedgerEntry> {
        if self.append_turn.is_none() {
            let turn = self.store.inner.append_turn.clone().lock_owned().await;
            self.append_turn = Some(turn);
        }

        let id = self.store.inner.last_entry_id.fetch_add(1, Ordering::SeqCst) + 1;
        let entry = LedgerEntry {
            id,
            from_account_id: entry.from_account_id,
            from_account_balance: entry.from_account_balance,
            to_account_id: entry.to_account_id,
            to_account_balance: entry.to_account_balance,
            amount: entry.amount,
            kind: entry.kind,
            details: entry.details,
            created_at: Utc::now(),
        };

        self.entries.push(entry.clone());
        Ok(entry)
    }

    async fn commit(mut self) -> Result<()> {
        let now = Utc::now();
        {
            let mut state = self.store.inner.state.write();
            for (id, balance) in self.balances.drain() {
                if let Some(account) = state.accounts.get_mut(&id) {
                    account.balance = balance;
                    account.updated_at = now;
                }
            }
            for entry in self.entries.drain(..) {
                state.entries.insert(entry.id, entry);
            }
        }

        // Guards are released here, after the writes are published.
        self.append_turn = None;
        self.held.clear();
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}

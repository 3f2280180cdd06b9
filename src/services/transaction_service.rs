//! Transaction engine - Core business logic for balance-changing operations.
//!
//! This service handles:
//! - Exclusive row locking of the accounts involved
//! - Balance validation under lock (no read-then-check race)
//! - Balance updates and the matching ledger entry
//! - Commit or full rollback of the unit of work
//!
//! # Atomicity Guarantees
//!
//! Every operation runs inside one [`UnitOfWork`]. The locked reads, the
//! balance writes and the ledger insert are published together on commit;
//! any error, early return or expired deadline discards all of them.
//!
//! # Deadlock Avoidance
//!
//! Transfers lock both accounts in ascending id order regardless of the
//! direction of the transfer, so two opposite transfers between the same
//! pair of accounts cannot wait on each other.

use std::{sync::Arc, time::Duration};

use rust_decimal::Decimal;
use tracing::instrument;

use crate::{
    error::{LedgerError, Result},
    models::{AccountId, LedgerEntry, NewLedgerEntry, OperationKind},
    services::{
        money::{max_money, validate_account_id, validate_amount},
        observer::{LedgerObserver, default_observer},
    },
    store::{AccountLock, LedgerStore, UnitOfWork},
};

/// A balance-changing request, already authorized by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Deposit {
        account_id: AccountId,
        amount: Decimal,
    },
    Withdraw {
        account_id: AccountId,
        amount: Decimal,
    },
    Transfer {
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    },
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Deposit { .. } => OperationKind::Deposit,
            Operation::Withdraw { .. } => OperationKind::Withdraw,
            Operation::Transfer { .. } => OperationKind::Transfer,
        }
    }

    pub fn amount(&self) -> Decimal {
        match *self {
            Operation::Deposit { amount, .. }
            | Operation::Withdraw { amount, .. }
            | Operation::Transfer { amount, .. } => amount,
        }
    }

    /// Checks that need no store access.
    fn validate(&self) -> Result<()> {
        validate_amount(self.amount())?;

        match *self {
            Operation::Deposit { account_id, .. } | Operation::Withdraw { account_id, .. } => {
                validate_account_id(account_id)
            }
            Operation::Transfer { from, to, .. } => {
                validate_account_id(from)?;
                validate_account_id(to)?;
                if from == to {
                    return Err(LedgerError::invalid(
                        "cannot transfer to the same account",
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Executes deposits, withdrawals and transfers as isolated units of work.
///
/// The engine keeps no shared mutable state of its own; all coordination
/// goes through the store's row locks. It is cheap to clone and safe to use
/// from many tasks at once.
#[derive(Clone)]
pub struct TransactionEngine<S> {
    store: S,
    timeout: Duration,
    observer: Arc<dyn LedgerObserver>,
}

impl<S: LedgerStore> TransactionEngine<S> {
    /// Create an engine whose units of work are bounded by `timeout`.
    pub fn new(store: S, timeout: Duration) -> Self {
        Self {
            store,
            timeout,
            observer: default_observer(),
        }
    }

    /// Replace the default `tracing` observer.
    pub fn with_observer(mut self, observer: Arc<dyn LedgerObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Default deadline applied by [`deposit`](Self::deposit),
    /// [`withdraw`](Self::withdraw) and [`transfer`](Self::transfer).
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Add money to an account.
    ///
    /// # Process
    ///
    /// 1. Validate the amount
    /// 2. Lock the account row
    /// 3. Write balance + amount
    /// 4. Append a `deposit` entry referencing the account on both sides
    /// 5. Commit (or rollback on error)
    ///
    /// # Errors
    ///
    /// - `InvalidArgument`: Amount is zero, negative or too precise
    /// - `AccountNotFound`: Account doesn't exist
    /// - `Timeout` / `StoreUnavailable`: Rolled back, safe to retry
    pub async fn deposit(&self, account_id: AccountId, amount: Decimal) -> Result<LedgerEntry> {
        self.execute(&Operation::Deposit { account_id, amount }, "", self.timeout)
            .await
    }

    /// Remove money from an account.
    ///
    /// The balance check happens on the value read under the row lock, so
    /// concurrent withdrawals can never overdraw the account.
    pub async fn withdraw(&self, account_id: AccountId, amount: Decimal) -> Result<LedgerEntry> {
        self.execute(&Operation::Withdraw { account_id, amount }, "", self.timeout)
            .await
    }

    /// Move money between two different accounts.
    pub async fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> Result<LedgerEntry> {
        self.execute(&Operation::Transfer { from, to, amount }, "", self.timeout)
            .await
    }

    /// Run `operation` as one unit of work bounded by `timeout`.
    ///
    /// `details` is stored verbatim on the ledger entry. On expiry the unit
    /// is abandoned (its transaction rolls back and its locks are released)
    /// and `Timeout` is returned. No retries are attempted here.
    #[instrument(skip(self, details))]
    pub async fn execute(
        &self,
        operation: &Operation,
        details: &str,
        timeout: Duration,
    ) -> Result<LedgerEntry> {
        let result = match operation.validate() {
            Ok(()) => tokio::time::timeout(timeout, self.run(operation, details, timeout))
                .await
                .unwrap_or(Err(LedgerError::Timeout)),
            Err(err) => Err(err),
        };

        match &result {
            Ok(entry) => self.observer.committed(entry),
            Err(err) => self.observer.rejected(operation, err),
        }

        result
    }

    async fn run(
        &self,
        operation: &Operation,
        details: &str,
        timeout: Duration,
    ) -> Result<LedgerEntry> {
        let mut unit = self.store.begin(timeout).await?;

        match apply(&mut unit, operation, details).await {
            Ok(entry) => {
                unit.commit().await?;
                Ok(entry)
            }
            Err(err) => {
                if let Err(rollback_err) = unit.rollback().await {
                    // The transaction is still discarded when its connection is dropped.
                    tracing::warn!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }
}

async fn apply<U: UnitOfWork>(
    unit: &mut U,
    operation: &Operation,
    details: &str,
) -> Result<LedgerEntry> {
    match *operation {
        Operation::Deposit { account_id, amount } => {
            let lock = lock_existing(unit, account_id).await?;
            let balance = credit(&lock, amount)?;
            unit.write_balance(&lock, balance).await?;
            unit.append_entry(NewLedgerEntry::single(
                OperationKind::Deposit,
                account_id,
                balance,
                amount,
                details,
            ))
            .await
        }
        Operation::Withdraw { account_id, amount } => {
            let lock = lock_existing(unit, account_id).await?;
            let balance = debit(&lock, amount)?;
            unit.write_balance(&lock, balance).await?;
            unit.append_entry(NewLedgerEntry::single(
                OperationKind::Withdraw,
                account_id,
                balance,
                amount,
                details,
            ))
            .await
        }
        Operation::Transfer { from, to, amount } => {
            // Lower id first, independent of transfer direction.
            let (first, second) = if from < to { (from, to) } else { (to, from) };
            let first_lock = lock_existing(unit, first).await?;
            let second_lock = lock_existing(unit, second).await?;
            let (from_lock, to_lock) = if from < to {
                (first_lock, second_lock)
            } else {
                (second_lock, first_lock)
            };

            let from_balance = debit(&from_lock, amount)?;
            let to_balance = credit(&to_lock, amount)?;

            unit.write_balance(&from_lock, from_balance).await?;
            unit.write_balance(&to_lock, to_balance).await?;
            unit.append_entry(NewLedgerEntry::transfer(
                (from, from_balance),
                (to, to_balance),
                amount,
                details,
            ))
            .await
        }
    }
}

async fn lock_existing<U: UnitOfWork>(unit: &mut U, account_id: AccountId) -> Result<AccountLock> {
    unit.lock_account(account_id)
        .await?
        .ok_or(LedgerError::AccountNotFound(account_id))
}

fn debit(lock: &AccountLock, amount: Decimal) -> Result<Decimal> {
    if lock.balance() < amount {
        return Err(LedgerError::InsufficientBalance {
            account_id: lock.account_id(),
            balance: lock.balance(),
            requested: amount,
        });
    }
    Ok(lock.balance() - amount)
}

fn credit(lock: &AccountLock, amount: Decimal) -> Result<Decimal> {
    lock.balance()
        .checked_add(amount)
        .filter(|balance| *balance <= max_money())
        .ok_or_else(|| {
            LedgerError::invalid(format!(
                "balance of account {} would exceed {}",
                lock.account_id(),
                max_money()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::EntryFilter, store::MemoryStore};
    use rust_decimal_macros::dec;

    async fn engine_with(balances: &[Decimal]) -> (TransactionEngine<MemoryStore>, MemoryStore) {
        let store = MemoryStore::new();
        for balance in balances {
            store.open_account(*balance).await.unwrap();
        }
        (
            TransactionEngine::new(store.clone(), Duration::from_secs(2)),
            store,
        )
    }

    async fn balance(store: &MemoryStore, id: i64) -> Decimal {
        store.account(AccountId(id)).await.unwrap().unwrap().balance
    }

    #[tokio::test]
    async fn transfer_records_both_post_balances() {
        let (engine, store) = engine_with(&[dec!(100.00), dec!(200.00)]).await;

        let entry = engine
            .transfer(AccountId(1), AccountId(2), dec!(50.00))
            .await
            .unwrap();

        assert_eq!(entry.kind, OperationKind::Transfer);
        assert_eq!(entry.from_account_id, AccountId(1));
        assert_eq!(entry.to_account_id, AccountId(2));
        assert_eq!(entry.from_account_balance, dec!(50.00));
        assert_eq!(entry.to_account_balance, dec!(250.00));
        assert_eq!(entry.amount, dec!(50.00));
        assert_eq!(balance(&store, 1).await, dec!(50.00));
        assert_eq!(balance(&store, 2).await, dec!(250.00));
    }

    #[tokio::test]
    async fn overdraft_withdrawal_is_rejected_and_leaves_balance() {
        let (engine, store) = engine_with(&[dec!(100.00)]).await;

        let err = engine
            .withdraw(AccountId(1), dec!(150.00))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LedgerError::InsufficientBalance { account_id: AccountId(1), .. }
        ));
        assert_eq!(balance(&store, 1).await, dec!(100.00));
        assert!(store.entries(EntryFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deposit_appends_one_self_referencing_entry() {
        let (engine, store) = engine_with(&[dec!(100.00)]).await;

        engine.deposit(AccountId(1), dec!(50.00)).await.unwrap();

        let entries = store
            .entries(EntryFilter::for_account(AccountId(1)))
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].amount, dec!(50.00));
        assert_eq!(entries[0].kind, OperationKind::Deposit);
        assert_eq!(entries[0].from_account_id, entries[0].to_account_id);
        assert_eq!(entries[0].from_account_balance, dec!(150.00));
        assert_eq!(entries[0].to_account_balance, dec!(150.00));
    }

    #[tokio::test]
    async fn withdraw_to_exactly_zero_is_allowed() {
        let (engine, store) = engine_with(&[dec!(30.00)]).await;

        let entry = engine.withdraw(AccountId(1), dec!(30.00)).await.unwrap();

        assert_eq!(entry.kind, OperationKind::Withdraw);
        assert_eq!(entry.from_account_balance, dec!(0));
        assert_eq!(balance(&store, 1).await, dec!(0));
    }

    #[tokio::test]
    async fn missing_accounts_are_reported() {
        let (engine, _) = engine_with(&[dec!(10)]).await;

        let err = engine.deposit(AccountId(9), dec!(1)).await.unwrap_err();
        assert!(matches!(err, LedgerError::AccountNotFound(AccountId(9))));

        let err = engine
            .transfer(AccountId(1), AccountId(9), dec!(1))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::AccountNotFound(AccountId(9))));
    }

    #[tokio::test]
    async fn failed_transfer_leaves_both_accounts_untouched() {
        let (engine, store) = engine_with(&[dec!(10.00), dec!(20.00)]).await;

        let err = engine
            .transfer(AccountId(2), AccountId(1), dec!(20.01))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LedgerError::InsufficientBalance { account_id: AccountId(2), .. }
        ));
        assert_eq!(balance(&store, 1).await, dec!(10.00));
        assert_eq!(balance(&store, 2).await, dec!(20.00));
    }

    #[tokio::test]
    async fn invalid_requests_never_reach_the_store() {
        let (engine, _) = engine_with(&[dec!(10)]).await;

        for op in [
            Operation::Deposit { account_id: AccountId(1), amount: dec!(0) },
            Operation::Withdraw { account_id: AccountId(1), amount: dec!(-1) },
            Operation::Deposit { account_id: AccountId(0), amount: dec!(1) },
            Operation::Deposit { account_id: AccountId(1), amount: dec!(0.001) },
            Operation::Transfer { from: AccountId(1), to: AccountId(1), amount: dec!(1) },
        ] {
            let err = engine
                .execute(&op, "", engine.timeout())
                .await
                .unwrap_err();
            assert!(matches!(err, LedgerError::InvalidArgument(_)), "{op:?}");
        }
    }

    #[tokio::test]
    async fn oversized_deposit_is_invalid_argument() {
        let (engine, store) = engine_with(&[dec!(100.00)]).await;

        let err = engine
            .deposit(AccountId(1), dec!(100_000_000_000_000_000_000))
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::InvalidArgument(_)));
        assert!(!err.is_retryable());
        assert_eq!(balance(&store, 1).await, dec!(100.00));
    }

    #[tokio::test]
    async fn credit_past_column_range_is_rejected() {
        let near_max = max_money() - dec!(1.00);
        let (engine, store) = engine_with(&[near_max, dec!(5.00)]).await;

        let err = engine.deposit(AccountId(1), dec!(1.01)).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidArgument(_)));

        let err = engine
            .transfer(AccountId(2), AccountId(1), dec!(5.00))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidArgument(_)));

        assert_eq!(balance(&store, 1).await, near_max);
        assert_eq!(balance(&store, 2).await, dec!(5.00));
        assert!(store.entries(EntryFilter::default()).await.unwrap().is_empty());

        engine.deposit(AccountId(1), dec!(1.00)).await.unwrap();
        assert_eq!(balance(&store, 1).await, max_money());
    }

    #[tokio::test]
    async fn details_are_stored_verbatim() {
        let (engine, _) = engine_with(&[dec!(10)]).await;

        let entry = engine
            .execute(
                &Operation::Deposit { account_id: AccountId(1), amount: dec!(5) },
                "salary",
                engine.timeout(),
            )
            .await
            .unwrap();

        assert_eq!(entry.details, "salary");
    }
}

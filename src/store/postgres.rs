//! PostgreSQL-backed ledger store.
//!
//! A unit of work is one database transaction. Row locks are taken with
//! `SELECT ... FOR UPDATE`, so concurrent lockers of the same account block
//! until the holder commits or rolls back, while plain `SELECT`s (the query
//! side) are never blocked under the default READ COMMITTED isolation.
//!
//! Each transaction sets `lock_timeout` and `statement_timeout` locally to
//! the unit's deadline, so the server gives up on a stuck lock wait even if
//! the client side deadline is lost. Dropping an uncommitted `PgUnit` rolls
//! the transaction back when its connection returns to the pool.
//!
//! Appends take a transaction-scoped advisory lock before drawing the entry
//! id, so a `BIGSERIAL` value never becomes visible after a higher one.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use tracing::instrument;

use super::{AccountLock, LedgerStore, UnitOfWork};
use crate::{
    db::DbPool,
    error::{LedgerError, Result},
    models::{Account, AccountId, EntryFilter, LedgerEntry, NewLedgerEntry},
};

/// Advisory lock key serializing ledger appends ("ledger" in ASCII).
const APPEND_LOCK_KEY: i64 = 0x6c65_6467_6572;

const ENTRY_COLUMNS: &str = "id, from_account_id, from_account_balance, to_account_id, \
     to_account_balance, amount, kind, details, created_at";

/// Postgres [`LedgerStore`].
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    type Unit = PgUnit;

    #[instrument(skip(self))]
    async fn begin(&self, timeout: Duration) -> Result<PgUnit> {
        let mut tx = self.pool.begin().await?;

        // Postgres reads a bare number as milliseconds.
        let millis = timeout.as_millis().max(1).to_string();
        sqlx::query(
            "SELECT set_config('lock_timeout', $1, true), set_config('statement_timeout', $1, true)",
        )
        .bind(&millis)
        .execute(&mut *tx)
        .await?;

        Ok(PgUnit { tx })
    }

    async fn account(&self, id: AccountId) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT id, balance, created_at, updated_at FROM accounts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn accounts(&self) -> Result<Vec<Account>> {
        let accounts = sqlx::query_as::<_, Account>(
            "SELECT id, balance, created_at, updated_at FROM accounts ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(accounts)
    }

    #[instrument(skip(self))]
    async fn entries(&self, filter: EntryFilter) -> Result<Vec<LedgerEntry>> {
        let sql = format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM ledger_entries
            WHERE ($1::BIGINT IS NULL OR from_account_id = $1 OR to_account_id = $1)
              AND ($2::BIGINT IS NULL OR id > $2)
            ORDER BY id ASC
            LIMIT $3
            "#
        );

        let entries = sqlx::query_as::<_, LedgerEntry>(&sql)
            .bind(filter.account_id)
            .bind(filter.after_id)
            .bind(filter.limit.map(i64::from))
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    #[instrument(skip(self))]
    async fn open_account(&self, opening_balance: Decimal) -> Result<Account> {
        if opening_balance < Decimal::ZERO {
            return Err(LedgerError::invalid("opening balance cannot be negative"));
        }

        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (balance)
            VALUES ($1)
            RETURNING id, balance, created_at, updated_at
            "#,
        )
        .bind(opening_balance)
        .fetch_one(&self.pool)
        .await?;

        Ok(account)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// One Postgres transaction acting as a unit of work.
pub struct PgUnit {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnit {
    async fn lock_account(&mut self, id: AccountId) -> Result<Option<AccountLock>> {
        // FOR UPDATE blocks other lockers of this row until we finish
        let balance: Option<Decimal> =
            sqlx::query_scalar("SELECT balance FROM accounts WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *self.tx)
                .await?;

        Ok(balance.map(|balance| AccountLock::new(id, balance)))
    }

    async fn write_balance(&mut self, lock: &AccountLock, balance: Decimal) -> Result<()> {
        if balance < Decimal::ZERO {
            return Err(LedgerError::invalid("balance cannot be negative"));
        }

        let updated = sqlx::query(
            r#"
            UPDATE accounts
            SET balance = $1,
                updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(balance)
        .bind(lock.account_id())
        .execute(&mut *self.tx)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(LedgerError::AccountNotFound(lock.account_id()));
        }

        Ok(())
    }

    async fn append_entry(&mut self, entry: NewLedgerEntry) -> Result<LedgerEntry> {
        // Held until commit or rollback; waits are bounded by lock_timeout.
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(APPEND_LOCK_KEY)
            .execute(&mut *self.tx)
            .await?;

        let sql = format!(
            r#"
            INSERT INTO ledger_entries (
                from_account_id,
                from_account_balance,
                to_account_id,
                to_account_balance,
                amount,
                kind,
                details
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ENTRY_COLUMNS}
            "#
        );

        let entry = sqlx::query_as::<_, LedgerEntry>(&sql)
            .bind(entry.from_account_id)
            .bind(entry.from_account_balance)
            .bind(entry.to_account_id)
            .bind(entry.to_account_balance)
            .bind(entry.amount)
            .bind(entry.kind)
            .bind(entry.details)
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(entry)
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

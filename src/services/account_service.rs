//! Account opening.
//!
//! Opening accounts is administrative and sits outside the transaction
//! engine: a new row is inserted with its starting balance and no ledger
//! entry. Every later balance change goes through the engine.

use rust_decimal::Decimal;
use tracing::instrument;

use crate::{
    error::Result,
    models::Account,
    services::money::validate_opening_balance,
    store::LedgerStore,
};

/// Balances of the demo accounts opened by [`AccountService::seed_demo_accounts`].
pub fn demo_opening_balances() -> [Decimal; 3] {
    [
        Decimal::new(10_000, 2),
        Decimal::new(20_000, 2),
        Decimal::new(30_000, 2),
    ]
}

#[derive(Debug, Clone)]
pub struct AccountService<S> {
    store: S,
}

impl<S: LedgerStore> AccountService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Open an account with a non-negative starting balance.
    #[instrument(skip(self))]
    pub async fn open(&self, opening_balance: Decimal) -> Result<Account> {
        validate_opening_balance(opening_balance)?;

        let account = self.store.open_account(opening_balance).await?;
        tracing::info!(account_id = %account.id, balance = %account.balance, "account opened");

        Ok(account)
    }

    /// Open the demo accounts when the store holds none yet.
    ///
    /// Returns the accounts that were opened (empty if the store was not empty).
    pub async fn seed_demo_accounts(&self) -> Result<Vec<Account>> {
        if !self.store.accounts().await?.is_empty() {
            return Ok(Vec::new());
        }

        let mut opened = Vec::new();
        for balance in demo_opening_balances() {
            opened.push(self.open(balance).await?);
        }
        Ok(opened)
    }
}

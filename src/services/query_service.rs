//! Read-only access to ledger history and account balances.
//!
//! Nothing here takes a row lock: queries neither block nor are blocked by
//! units of work in the transaction engine. They observe committed state
//! only.

use tracing::instrument;

use crate::{
    error::{LedgerError, Result},
    models::{Account, AccountId, EntryFilter, LedgerEntry},
    services::money::validate_account_id,
    store::LedgerStore,
};

/// Upper bound on one page of ledger entries.
pub const MAX_PAGE_SIZE: u32 = 1_000;

#[derive(Debug, Clone)]
pub struct QueryService<S> {
    store: S,
    page_size: u32,
}

impl<S: LedgerStore> QueryService<S> {
    /// `page_size` is used when a filter carries no limit.
    pub fn new(store: S, page_size: u32) -> Self {
        Self {
            store,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Ledger entries oldest first, optionally restricted to one account
    /// (as source or destination).
    ///
    /// Pass the id of the last entry of a page as `after_id` to fetch the next.
    #[instrument(skip(self))]
    pub async fn ledger_entries(&self, filter: EntryFilter) -> Result<Vec<LedgerEntry>> {
        if let Some(account_id) = filter.account_id {
            validate_account_id(account_id)?;
        }

        let limit = filter
            .limit
            .unwrap_or(self.page_size)
            .clamp(1, MAX_PAGE_SIZE);

        self.store
            .entries(EntryFilter {
                limit: Some(limit),
                ..filter
            })
            .await
    }

    /// Convenience for `ledger_entries` filtered by `account_id` (or unfiltered).
    pub async fn entries_for(&self, account_id: Option<AccountId>) -> Result<Vec<LedgerEntry>> {
        self.ledger_entries(EntryFilter {
            account_id,
            ..EntryFilter::default()
        })
        .await
    }

    /// Committed snapshot of one account.
    pub async fn account(&self, id: AccountId) -> Result<Account> {
        validate_account_id(id)?;
        self.store
            .account(id)
            .await?
            .ok_or(LedgerError::AccountNotFound(id))
    }

    pub async fn accounts(&self) -> Result<Vec<Account>> {
        self.store.accounts().await
    }
}

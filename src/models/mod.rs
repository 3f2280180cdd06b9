//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables.

/// Account balance model
pub mod account;
/// Append-only ledger entry model
pub mod ledger_entry;

pub use account::{Account, AccountId};
pub use ledger_entry::{EntryFilter, LedgerEntry, NewLedgerEntry, OperationKind};

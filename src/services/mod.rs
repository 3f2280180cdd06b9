//! Business logic services.
//!
//! Services contain the ledger core separated from HTTP handlers. They are
//! generic over the [`LedgerStore`](crate::store::LedgerStore) they run on.

pub mod account_service;
pub mod money;
pub mod observer;
pub mod query_service;
pub mod transaction_service;

pub use account_service::AccountService;
pub use observer::{LedgerObserver, TracingObserver};
pub use query_service::QueryService;
pub use transaction_service::{Operation, TransactionEngine};

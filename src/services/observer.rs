//! Structured events emitted by the transaction engine.
//!
//! The engine reports outcomes through an injected [`LedgerObserver`]
//! instead of a global logger, so tests can capture events and deployments
//! can forward them wherever they like.

use std::sync::Arc;

use crate::{error::LedgerError, models::LedgerEntry, services::transaction_service::Operation};

/// Receives one event per finished unit of work.
pub trait LedgerObserver: Send + Sync {
    /// A unit of work committed and produced `entry`.
    fn committed(&self, entry: &LedgerEntry);

    /// A unit of work was rejected or aborted; nothing was committed.
    fn rejected(&self, operation: &Operation, error: &LedgerError);
}

/// Default observer that logs through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl LedgerObserver for TracingObserver {
    fn committed(&self, entry: &LedgerEntry) {
        tracing::info!(
            entry_id = entry.id,
            kind = entry.kind.as_str(),
            from_account_id = %entry.from_account_id,
            to_account_id = %entry.to_account_id,
            amount = %entry.amount,
            "ledger entry committed"
        );
    }

    fn rejected(&self, operation: &Operation, error: &LedgerError) {
        if error.is_retryable() {
            tracing::warn!(
                kind = operation.kind().as_str(),
                code = error.code(),
                error = %error,
                "unit of work aborted"
            );
        } else {
            tracing::info!(
                kind = operation.kind().as_str(),
                code = error.code(),
                error = %error,
                "operation rejected"
            );
        }
    }
}

pub(crate) fn default_observer() -> Arc<dyn LedgerObserver> {
    Arc::new(TracingObserver)
}

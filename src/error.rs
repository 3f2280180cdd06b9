//! Error types and HTTP error response handling.
//!
//! This module defines every failure the ledger core can report and how
//! they are converted into HTTP responses by the adapter layer.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde_json::json;

use crate::models::AccountId;

/// Result alias used throughout the crate.
pub type Result<T, E = LedgerError> = std::result::Result<T, E>;

/// Ledger-wide error type.
///
/// # Error Categories
///
/// - **Business rule failures** (`InvalidArgument`, `AccountNotFound`,
///   `InsufficientBalance`): terminal for the request, retrying without
///   changing it yields the same answer.
/// - **Infrastructure failures** (`Timeout`, `StoreUnavailable`): the unit
///   of work was rolled back and the caller may retry with backoff.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Non-positive amount, identical transfer endpoints, bad id or scale.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Referenced account has no row.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Account {0} not found")]
    AccountNotFound(AccountId),

    /// Source balance, read under lock, is below the requested amount.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Insufficient balance in account {account_id}: balance {balance}, requested {requested}")]
    InsufficientBalance {
        account_id: AccountId,
        balance: Decimal,
        requested: Decimal,
    },

    /// Unit of work exceeded its deadline and was rolled back.
    ///
    /// Returns HTTP 500 Internal Server Error.
    #[error("Unit of work timed out")]
    Timeout,

    /// Store connection or query failure; the unit of work was rolled back.
    ///
    /// Returns HTTP 500 Internal Server Error (hides details from client).
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[source] sqlx::Error),
}

impl LedgerError {
    /// Infrastructure failures are safe to retry, business rejections are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Timeout | LedgerError::StoreUnavailable(_))
    }

    /// Stable machine readable code.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::InvalidArgument(_) => "invalid_argument",
            LedgerError::AccountNotFound(_) => "account_not_found",
            LedgerError::InsufficientBalance { .. } => "insufficient_balance",
            LedgerError::Timeout => "timeout",
            LedgerError::StoreUnavailable(_) => "store_unavailable",
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        LedgerError::InvalidArgument(msg.into())
    }
}

/// Classify driver errors.
///
/// | sqlx error | SQLSTATE | LedgerError |
/// |------------|----------|-------------|
/// | `PoolTimedOut` | n/a | `Timeout` |
/// | Database (query_canceled) | `57014` | `Timeout` |
/// | Database (lock_not_available) | `55P03` | `Timeout` |
/// | Database (numeric_value_out_of_range) | `22003` | `InvalidArgument` |
/// | Database (check_violation) | `23514` | `InvalidArgument` |
/// | anything else | any | `StoreUnavailable` |
impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        let class = match &err {
            sqlx::Error::PoolTimedOut => Some(SqlStateClass::Timeout),
            sqlx::Error::Database(db) => db.code().as_deref().and_then(SqlStateClass::of),
            _ => None,
        };

        match class {
            Some(SqlStateClass::Timeout) => LedgerError::Timeout,
            Some(SqlStateClass::Rejected) => LedgerError::InvalidArgument(
                err.as_database_error()
                    .map(|db| db.message().to_string())
                    .unwrap_or_else(|| err.to_string()),
            ),
            None => LedgerError::StoreUnavailable(err),
        }
    }
}

/// SQLSTATEs that are not infrastructure failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SqlStateClass {
    Timeout,
    /// The statement was well formed but the values broke a column rule.
    Rejected,
}

impl SqlStateClass {
    fn of(code: &str) -> Option<Self> {
        match code {
            "57014" | "55P03" => Some(Self::Timeout),
            "22003" | "23514" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Convert LedgerError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "error": {
///     "code": "insufficient_balance",
///     "message": "Insufficient balance in account 1: balance 100.00, requested 150.00",
///     "retryable": false
///   }
/// }
/// ```
///
/// # Status Code Mapping
///
/// - `InvalidArgument` → 400 Bad Request
/// - `InsufficientBalance` → 400 Bad Request
/// - `AccountNotFound` → 404 Not Found
/// - `Timeout`, `StoreUnavailable` → 500 Internal Server Error
impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            LedgerError::InvalidArgument(_) | LedgerError::InsufficientBalance { .. } => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            LedgerError::AccountNotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            LedgerError::Timeout => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            LedgerError::StoreUnavailable(err) => {
                tracing::error!(error = %err, "store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": message,
                "retryable": self.is_retryable(),
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn only_infrastructure_failures_are_retryable() {
        assert!(LedgerError::Timeout.is_retryable());
        assert!(LedgerError::StoreUnavailable(sqlx::Error::PoolClosed).is_retryable());
        assert!(!LedgerError::AccountNotFound(AccountId(1)).is_retryable());
        assert!(!LedgerError::invalid("amount must be positive").is_retryable());
        assert!(
            !LedgerError::InsufficientBalance {
                account_id: AccountId(1),
                balance: dec!(1),
                requested: dec!(2),
            }
            .is_retryable()
        );
    }

    #[test]
    fn pool_timeout_maps_to_timeout() {
        assert!(matches!(
            LedgerError::from(sqlx::Error::PoolTimedOut),
            LedgerError::Timeout
        ));
        assert!(matches!(
            LedgerError::from(sqlx::Error::PoolClosed),
            LedgerError::StoreUnavailable(_)
        ));
    }

    #[test]
    fn sqlstates_are_classified() {
        assert_eq!(SqlStateClass::of("57014"), Some(SqlStateClass::Timeout));
        assert_eq!(SqlStateClass::of("55P03"), Some(SqlStateClass::Timeout));
        assert_eq!(SqlStateClass::of("22003"), Some(SqlStateClass::Rejected));
        assert_eq!(SqlStateClass::of("23514"), Some(SqlStateClass::Rejected));
        assert_eq!(SqlStateClass::of("08006"), None);
    }

    #[test]
    fn status_codes_follow_error_class() {
        let not_found = LedgerError::AccountNotFound(AccountId(9)).into_response();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let insufficient = LedgerError::InsufficientBalance {
            account_id: AccountId(1),
            balance: dec!(100.00),
            requested: dec!(150.00),
        }
        .into_response();
        assert_eq!(insufficient.status(), StatusCode::BAD_REQUEST);

        let timeout = LedgerError::Timeout.into_response();
        assert_eq!(timeout.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

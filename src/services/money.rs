//! Amount validation shared by the engine and account opening.

use rust_decimal::Decimal;

use crate::{error::LedgerError, models::AccountId};

/// Fractional digits stored by the `NUMERIC(20, 2)` columns.
pub const MONEY_SCALE: u32 = 2;

/// Largest value a `NUMERIC(20, 2)` column holds: 999,999,999,999,999,999.99.
pub fn max_money() -> Decimal {
    Decimal::from_i128_with_scale(99_999_999_999_999_999_999, MONEY_SCALE)
}

/// Reject amounts the store could not hold exactly.
fn check_representable(value: Decimal, what: &str) -> Result<(), LedgerError> {
    if value.normalize().scale() > MONEY_SCALE {
        return Err(LedgerError::invalid(format!(
            "{what} {value} has more than {MONEY_SCALE} decimal places"
        )));
    }
    if value > max_money() {
        return Err(LedgerError::invalid(format!(
            "{what} {value} exceeds the maximum of {}",
            max_money()
        )));
    }
    Ok(())
}

/// Amounts moved by an operation must be strictly positive.
pub fn validate_amount(amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::invalid(format!(
            "amount must be positive, got {amount}"
        )));
    }
    check_representable(amount, "amount")
}

/// Opening balances may be zero but never negative.
pub fn validate_opening_balance(balance: Decimal) -> Result<(), LedgerError> {
    if balance < Decimal::ZERO {
        return Err(LedgerError::invalid(format!(
            "opening balance cannot be negative, got {balance}"
        )));
    }
    check_representable(balance, "opening balance")
}

pub fn validate_account_id(id: AccountId) -> Result<(), LedgerError> {
    if !id.is_valid() {
        return Err(LedgerError::invalid(format!(
            "account id must be positive, got {id}"
        )));
    }
    Ok(())
}

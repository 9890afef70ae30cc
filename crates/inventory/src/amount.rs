//! Bounds and checked arithmetic for stored amounts.
//!
//! Quantities, unit costs and balance snapshots are persisted as
//! `NUMERIC(28, 8)`: at most 8 decimal places and 20 integer digits. Every
//! backend enforces the same bounds so an accepted amount is stored exactly.

use rust_decimal::Decimal;

use stockledger_core::{DomainError, DomainResult};

/// Maximum decimal places of a stored amount.
pub const MAX_SCALE: u32 = 8;

/// Maximum integer digits of a stored amount.
pub const MAX_INTEGER_DIGITS: u32 = 20;

/// Exclusive upper bound on the magnitude of a stored amount.
pub fn limit() -> Decimal {
    Decimal::from_i128_with_scale(10_i128.pow(MAX_INTEGER_DIGITS), 0)
}

/// Reject `value` unless it is representable in the stored precision.
pub fn check(field: &str, value: Decimal) -> DomainResult<()> {
    if value.normalize().scale() > MAX_SCALE {
        return Err(DomainError::validation(format!(
            "{field} has more than {MAX_SCALE} decimal places"
        )));
    }
    if value.abs() >= limit() {
        return Err(DomainError::validation(format!(
            "{field} exceeds {MAX_INTEGER_DIGITS} integer digits"
        )));
    }
    Ok(())
}

/// Balance after applying `quantity` to `stock_before`, bounded like any stored amount.
pub fn balance_after(stock_before: Decimal, quantity: Decimal) -> DomainResult<Decimal> {
    let after = stock_before
        .checked_add(quantity)
        .ok_or_else(|| DomainError::validation("resulting stock balance overflows"))?;
    check("resulting stock balance", after)?;
    Ok(after)
}

/// Overflow-checked sum for read-side totals.
pub fn total(values: impl IntoIterator<Item = Decimal>) -> DomainResult<Decimal> {
    values.into_iter().try_fold(Decimal::ZERO, |acc, v| {
        acc.checked_add(v)
            .ok_or_else(|| DomainError::invariant("stock total overflows decimal range"))
    })
}

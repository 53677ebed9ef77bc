//! Fixed-precision money arithmetic.
//!
//! CRITICAL: amounts are `rust_decimal::Decimal`, never floats.
//! - Every stored amount is rounded once to 2 decimal places
//! - Rounding is half away from zero (1.005 -> 1.01, -1.005 -> -1.01)
//! - Arithmetic is checked; overflow is reported, not wrapped
//!
//! # Modules
//!
//! - `totals` - Line, subtotal, tax, and total computation for invoices

pub mod totals;

#[cfg(test)]
mod totals_props;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::LedgerError;

pub use totals::{InvoiceTotals, LineItemInput, PricedInvoice, PricedLine, price_invoice};

/// Decimal places kept on every stored amount.
pub const MONEY_SCALE: u32 = 2;

/// Decimal places accepted on quantities and unit prices.
pub const INPUT_SCALE: u32 = 4;

/// Largest amount the store's `NUMERIC(14, 2)` columns can hold.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

/// Largest quantity or unit price the `NUMERIC(14, 4)` columns can hold.
pub const MAX_INPUT_VALUE: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 4);

/// Rounds to 2 decimal places, half away from zero.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Multiplies two values and rounds the product to 2 decimal places.
pub fn multiply(qty: Decimal, unit_price: Decimal) -> Result<Decimal, LedgerError> {
    qty.checked_mul(unit_price)
        .map(round_money)
        .ok_or_else(|| LedgerError::validation("amount is too large"))
}

/// Sums amounts, rounding the result to 2 decimal places.
pub fn sum<I>(amounts: I) -> Result<Decimal, LedgerError>
where
    I: IntoIterator<Item = Decimal>,
{
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, Decimal::checked_add)
        .map(round_money)
        .ok_or_else(|| LedgerError::validation("amount is too large"))
}

/// Applies a percentage rate (0-100) to an amount, rounding to 2 decimal places.
pub fn percentage(amount: Decimal, rate_percent: Decimal) -> Result<Decimal, LedgerError> {
    amount
        .checked_mul(rate_percent)
        .and_then(|product| product.checked_div(Decimal::ONE_HUNDRED))
        .map(round_money)
        .ok_or_else(|| LedgerError::validation("amount is too large"))
}

/// Subtracts `rhs` from `lhs`, rounding to 2 decimal places.
#[must_use]
pub fn subtract(lhs: Decimal, rhs: Decimal) -> Decimal {
    round_money(lhs - rhs)
}

/// Returns `max(amount, 0)`.
#[must_use]
pub fn clamp_zero(amount: Decimal) -> Decimal {
    amount.max(Decimal::ZERO)
}

/// Outstanding balance: `max(total - paid, 0)` at 2 decimal places.
#[must_use]
pub fn balance(total: Decimal, paid: Decimal) -> Decimal {
    round_money(clamp_zero(total - paid))
}

/// Rejects amounts that would not fit the stored column.
pub fn ensure_storable(amount: Decimal, field: &str) -> Result<(), LedgerError> {
    if amount.abs() > MAX_AMOUNT {
        return Err(LedgerError::validation(format!("{field} is too large")));
    }
    Ok(())
}

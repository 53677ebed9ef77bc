//! Payment and reversal planning.
//!
//! The db layer loads the invoice under a row lock, sums the existing ledger,
//! and asks this module what to write. Keeping the arithmetic here means the
//! overpayment rule, the receipt balance, and the next status are decided in
//! one place.

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::invoice::{InvoiceStateMachine, InvoiceStatus};
use crate::money::{self, MONEY_SCALE};

/// Longest payment method the store accepts, in characters.
pub const MAX_METHOD_LEN: usize = 100;

/// Money movement requested by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInput {
    /// Positive amount with at most 2 decimal places.
    pub amount: Decimal,
    /// Free-text method (cash, transfer, ...).
    pub method: String,
    /// Defaults to now.
    pub paid_at: Option<DateTime<Utc>>,
    /// Optional note.
    pub note: Option<String>,
}

/// A ledger line as stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerLine {
    /// Signed amount.
    pub amount: Decimal,
    /// True for reversals.
    pub is_reversal: bool,
}

/// Invoice state a payment is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentContext {
    /// Current status.
    pub status: InvoiceStatus,
    /// Invoice total.
    pub total: Decimal,
    /// Sum of existing non-reversal payments.
    pub paid_total: Decimal,
    /// Business setting.
    pub allow_overpay: bool,
}

/// What to write for one ledger line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentPlan {
    /// Signed amount stored on both the payment and its receipt.
    pub signed_amount: Decimal,
    /// True for reversals.
    pub is_reversal: bool,
    /// Trimmed method.
    pub method: String,
    /// Resolved payment time.
    pub paid_at: DateTime<Utc>,
    /// Note, if any.
    pub note: Option<String>,
    /// Non-reversal total after this line.
    pub paid_after: Decimal,
    /// `max(total - paid_after, 0)`, printed on the receipt.
    pub balance_after: Decimal,
    /// Year that selects the receipt numbering period.
    pub receipt_period: i32,
    /// Status to persist, `None` when it does not change.
    pub next_status: Option<InvoiceStatus>,
}

/// Sum of non-reversal amounts.
#[must_use]
pub fn paid_total(lines: &[LedgerLine]) -> Decimal {
    money::round_money(
        lines
            .iter()
            .filter(|line| !line.is_reversal)
            .map(|line| line.amount)
            .sum(),
    )
}

/// Plans a payment.
///
/// # Returns
/// * `Err(Locked(Voided))` for a voided invoice
/// * `Err(Validation)` for a non-positive amount or blank method
/// * `Err(Overpayment)` when `paid_after > total` and overpay is disallowed
pub fn plan_payment(
    ctx: &PaymentContext,
    input: &PaymentInput,
    now: DateTime<Utc>,
) -> Result<PaymentPlan, LedgerError> {
    InvoiceStateMachine::ensure_payable(ctx.status)?;
    let amount = validate_amount(input.amount)?;
    let method = validate_method(&input.method)?;

    let paid_after = money::round_money(ctx.paid_total + amount);
    if !ctx.allow_overpay && paid_after > ctx.total {
        return Err(LedgerError::Overpayment {
            total: ctx.total,
            paid_after,
        });
    }
    money::ensure_storable(paid_after, "paid total")?;

    let derived = InvoiceStateMachine::derive_status(ctx.status, ctx.total, paid_after);
    let paid_at = input.paid_at.unwrap_or(now);

    Ok(PaymentPlan {
        signed_amount: amount,
        is_reversal: false,
        method,
        paid_at,
        note: input.note.clone(),
        paid_after,
        balance_after: money::balance(ctx.total, paid_after),
        receipt_period: paid_at.year(),
        next_status: (derived != ctx.status).then_some(derived),
    })
}

/// Plans a reversal.
///
/// No overpayment check and no status change. The receipt balance is
/// computed from the non-reversal total, which this line does not alter.
pub fn plan_reversal(
    ctx: &PaymentContext,
    input: &PaymentInput,
    now: DateTime<Utc>,
) -> Result<PaymentPlan, LedgerError> {
    InvoiceStateMachine::ensure_payable(ctx.status)?;
    let amount = validate_amount(input.amount)?;
    let method = validate_method(&input.method)?;
    let paid_at = input.paid_at.unwrap_or(now);

    Ok(PaymentPlan {
        signed_amount: -amount,
        is_reversal: true,
        method,
        paid_at,
        note: input.note.clone(),
        paid_after: ctx.paid_total,
        balance_after: money::balance(ctx.total, ctx.paid_total),
        receipt_period: paid_at.year(),
        next_status: None,
    })
}

fn validate_amount(amount: Decimal) -> Result<Decimal, LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::validation("amount must be positive"));
    }
    if amount.normalize().scale() > MONEY_SCALE {
        return Err(LedgerError::validation(
            "amount supports at most 2 decimal places",
        ));
    }
    money::ensure_storable(amount, "amount")?;
    Ok(money::round_money(amount))
}

fn validate_method(method: &str) -> Result<String, LedgerError> {
    let method = method.trim();
    if method.is_empty() {
        return Err(LedgerError::validation("payment method is required"));
    }
    if method.chars().count() > MAX_METHOD_LEN {
        return Err(LedgerError::validation(format!(
            "payment method must be at most {MAX_METHOD_LEN} characters"
        )));
    }
    Ok(method.to_string())
}

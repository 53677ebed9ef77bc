//! Property-based tests for payment planning.
//!
//! - Property 1: with overpay disallowed, an accepted payment never exceeds the total
//! - Property 2: `balance_after == max(total - paid_after, 0)`
//! - Property 3: a reversal never changes status

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::service::{PaymentContext, PaymentInput, plan_payment, plan_reversal};
use crate::error::LedgerError;
use crate::invoice::InvoiceStatus;

/// Amounts from 0.01 to 10,000.00.
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn payable_status() -> impl Strategy<Value = InvoiceStatus> {
    prop_oneof![
        Just(InvoiceStatus::Draft),
        Just(InvoiceStatus::Sent),
        Just(InvoiceStatus::Signed),
        Just(InvoiceStatus::PartPaid),
        Just(InvoiceStatus::Paid),
    ]
}

fn input(amount: Decimal) -> PaymentInput {
    PaymentInput {
        amount,
        method: "cash".to_string(),
        paid_at: None,
        note: None,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_no_overpayment_when_disallowed(
        status in payable_status(),
        total in amount_strategy(),
        paid in amount_strategy(),
        amount in amount_strategy(),
    ) {
        let ctx = PaymentContext { status, total, paid_total: paid, allow_overpay: false };
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

        match plan_payment(&ctx, &input(amount), now) {
            Ok(plan) => prop_assert!(plan.paid_after <= total),
            Err(LedgerError::Overpayment { paid_after, .. }) => prop_assert!(paid_after > total),
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }

    #[test]
    fn prop_balance_is_clamped_difference(
        status in payable_status(),
        total in amount_strategy(),
        paid in amount_strategy(),
        amount in amount_strategy(),
    ) {
        let ctx = PaymentContext { status, total, paid_total: paid, allow_overpay: true };
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let plan = plan_payment(&ctx, &input(amount), now).unwrap();

        prop_assert_eq!(plan.paid_after, paid + amount);
        prop_assert_eq!(plan.balance_after, (total - plan.paid_after).max(Decimal::ZERO));
        prop_assert!(plan.balance_after >= Decimal::ZERO);
    }

    #[test]
    fn prop_reversal_never_changes_status(
        status in payable_status(),
        total in amount_strategy(),
        paid in amount_strategy(),
        amount in amount_strategy(),
    ) {
        let ctx = PaymentContext { status, total, paid_total: paid, allow_overpay: false };
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let plan = plan_reversal(&ctx, &input(amount), now).unwrap();

        prop_assert_eq!(plan.next_status, None);
        prop_assert_eq!(plan.signed_amount, -amount);
        prop_assert_eq!(plan.paid_after, paid);
    }
}

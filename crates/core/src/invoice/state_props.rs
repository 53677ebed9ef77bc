//! Property-based tests for the invoice state machine.
//!
//! - Property 1: every successful guard result is a listed transition
//! - Property 2: status derivation is idempotent
//! - Property 3: derivation never returns to DRAFT, SENT or SIGNED from a paid state
//! - Property 4: nothing leaves VOIDED

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::state::InvoiceStateMachine;
use super::types::{InvoiceAction, InvoiceStatus};

fn status_strategy() -> impl Strategy<Value = InvoiceStatus> {
    prop::sample::select(InvoiceStatus::ALL.to_vec())
}

/// Amounts from -1,000.00 to 10,000.00.
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (-100_000i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Totals from 0.01 to 10,000.00.
fn total_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_guards_follow_table(
        status in status_strategy(),
        has_signature in any::<bool>(),
        payments in 0u64..3,
    ) {
        if let Ok(to) = InvoiceStateMachine::send(status) {
            prop_assert!(InvoiceStateMachine::is_valid_transition(status, InvoiceAction::Send, to));
        }
        if let Ok(to) = InvoiceStateMachine::sign(status, has_signature) {
            prop_assert!(InvoiceStateMachine::is_valid_transition(status, InvoiceAction::Sign, to));
        }
        if let Ok(to) = InvoiceStateMachine::void(status, has_signature, payments) {
            prop_assert!(InvoiceStateMachine::is_valid_transition(status, InvoiceAction::Void, to));
            prop_assert!(!has_signature);
            prop_assert_eq!(payments, 0);
        }
    }

    #[test]
    fn prop_derive_follows_table(
        status in status_strategy(),
        total in total_strategy(),
        paid in amount_strategy(),
    ) {
        let next = InvoiceStateMachine::derive_status(status, total, paid);
        prop_assert!(
            next == status
                || InvoiceStateMachine::is_valid_transition(status, InvoiceAction::ApplyPayment, next)
        );
    }

    #[test]
    fn prop_derive_is_idempotent(
        status in status_strategy(),
        total in total_strategy(),
        paid in amount_strategy(),
    ) {
        let once = InvoiceStateMachine::derive_status(status, total, paid);
        let twice = InvoiceStateMachine::derive_status(once, total, paid);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_paid_states_never_regress(
        total in total_strategy(),
        paid in amount_strategy(),
    ) {
        for status in [InvoiceStatus::PartPaid, InvoiceStatus::Paid] {
            let next = InvoiceStateMachine::derive_status(status, total, paid);
            prop_assert!(matches!(next, InvoiceStatus::PartPaid | InvoiceStatus::Paid));
        }
    }

    #[test]
    fn prop_voided_is_terminal(
        total in total_strategy(),
        paid in amount_strategy(),
        has_signature in any::<bool>(),
    ) {
        let voided = InvoiceStatus::Voided;
        prop_assert_eq!(InvoiceStateMachine::derive_status(voided, total, paid), voided);
        prop_assert!(InvoiceStateMachine::send(voided).is_err());
        prop_assert!(InvoiceStateMachine::sign(voided, has_signature).is_err());
        prop_assert!(InvoiceStateMachine::void(voided, has_signature, 0).is_err());
        prop_assert!(InvoiceStateMachine::ensure_payable(voided).is_err());
    }
}

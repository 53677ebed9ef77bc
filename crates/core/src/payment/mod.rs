//! Payment ledger rules.
//!
//! Payments and reversals are append-only ledger lines. Only non-reversal
//! lines count toward the collected amount.

pub mod service;

#[cfg(test)]
mod service_props;

pub use service::{
    LedgerLine, PaymentContext, PaymentInput, PaymentPlan, paid_total, plan_payment,
    plan_reversal,
};

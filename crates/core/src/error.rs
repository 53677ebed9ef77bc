//! Ledger error types.
//!
//! Every failure the invoice and payment ledgers can report is a variant of
//! [`LedgerError`]. Callers map them to responses through
//! [`LedgerError::error_code`] and [`LedgerError::status_code`].

use std::fmt;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::sequence::SequenceKey;

/// Why an invoice refused a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockReason {
    /// Items, dates, tax, and currency are frozen once an invoice leaves DRAFT.
    NotDraft,
    /// A draft is edited in place, so revising it is redundant.
    AlreadyDraft,
    /// Signing requires the invoice to have been sent.
    NotSent,
    /// A signature exists.
    Signed,
    /// At least one payment or reversal is on the ledger.
    HasPayments,
    /// The invoice is voided.
    Voided,
}

impl LockReason {
    /// Returns a short machine-readable tag for the reason.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotDraft => "not_draft",
            Self::AlreadyDraft => "already_draft",
            Self::NotSent => "not_sent",
            Self::Signed => "signed",
            Self::HasPayments => "has_payments",
            Self::Voided => "voided",
        }
    }
}

impl fmt::Display for LockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::NotDraft => "invoice is not editable",
            Self::AlreadyDraft => "invoice is still a draft and can be edited directly",
            Self::NotSent => "invoice must be sent before signing",
            Self::Signed => "signed invoices cannot be voided",
            Self::HasPayments => "invoices with payments cannot be voided",
            Self::Voided => "invoice is voided",
        };
        f.write_str(message)
    }
}

/// Errors raised by ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Entity is absent or belongs to another business.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The invoice's current state forbids the mutation.
    #[error("Invoice locked: {0}")]
    Locked(LockReason),

    /// The invoice already carries a signature.
    #[error("Invoice already signed")]
    AlreadySigned,

    /// The presented token is past its expiry.
    #[error("Token expired")]
    TokenExpired,

    /// Malformed input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The payment would push the collected amount past the invoice total.
    #[error("Overpayment is not allowed: total {total}, paid after payment {paid_after}")]
    Overpayment {
        /// Invoice total.
        total: Decimal,
        /// Collected amount had the payment been accepted.
        paid_after: Decimal,
    },

    /// Sequence allocation kept conflicting and gave up.
    #[error("Unable to allocate {key} number for period {period} after {attempts} attempts")]
    SequenceExhausted {
        /// Counter that was being allocated.
        key: SequenceKey,
        /// Calendar year of the counter.
        period: i32,
        /// Attempts made before giving up.
        attempts: u32,
    },

    /// Unexpected storage failure.
    #[error("Database error: {0}")]
    Database(String),
}

impl LedgerError {
    /// Shorthand for a validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Locked(_) | Self::AlreadySigned => 409,
            Self::TokenExpired => 410,
            Self::Validation(_) | Self::Overpayment { .. } => 400,
            Self::SequenceExhausted { .. } | Self::Database(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Locked(_) => "INVOICE_LOCKED",
            Self::AlreadySigned => "ALREADY_SIGNED",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Overpayment { .. } => "OVERPAYMENT",
            Self::SequenceExhausted { .. } => "SEQUENCE_EXHAUSTED",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns true for failures that are not the caller's fault.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::SequenceExhausted { .. } | Self::Database(_))
    }

    /// Returns a message that is safe to show to an end user.
    ///
    /// Internal failures collapse to a generic sentence so storage details
    /// never leave the process.
    #[must_use]
    pub fn public_message(&self) -> String {
        if self.is_internal() {
            "An unexpected error occurred".to_string()
        } else {
            self.to_string()
        }
    }
}

//! Invoice state machine.
//!
//! Every status change goes through [`InvoiceStateMachine`]. Legal moves are
//! listed once in [`TRANSITIONS`]; the guard methods add the checks that
//! depend on more than the status (signature present, payments recorded).

use rust_decimal::Decimal;

use crate::error::{LedgerError, LockReason};
use crate::invoice::types::{InvoiceAction, InvoiceStatus};

use InvoiceAction::{ApplyPayment, Send, Sign, Void};
use InvoiceStatus::{Draft, Paid, PartPaid, Sent, Signed, Voided};

/// `(from, action, to)` for every legal status change.
pub const TRANSITIONS: &[(InvoiceStatus, InvoiceAction, InvoiceStatus)] = &[
    (Draft, Send, Sent),
    (Sent, Sign, Signed),
    (PartPaid, Sign, Signed),
    (Paid, Sign, Signed),
    (Draft, Void, Voided),
    (Sent, Void, Voided),
    (Draft, ApplyPayment, PartPaid),
    (Draft, ApplyPayment, Paid),
    (Sent, ApplyPayment, PartPaid),
    (Sent, ApplyPayment, Paid),
    (Signed, ApplyPayment, PartPaid),
    (Signed, ApplyPayment, Paid),
    (PartPaid, ApplyPayment, PartPaid),
    (PartPaid, ApplyPayment, Paid),
    (Paid, ApplyPayment, PartPaid),
    (Paid, ApplyPayment, Paid),
];

/// Stateless guard and transition logic for invoices.
pub struct InvoiceStateMachine;

impl InvoiceStateMachine {
    /// Returns true if `(from, action, to)` appears in [`TRANSITIONS`].
    #[must_use]
    pub fn is_valid_transition(
        from: InvoiceStatus,
        action: InvoiceAction,
        to: InvoiceStatus,
    ) -> bool {
        TRANSITIONS
            .iter()
            .any(|&(f, a, t)| f == from && a == action && t == to)
    }

    /// Rejects edits to anything but a draft.
    pub fn ensure_editable(status: InvoiceStatus) -> Result<(), LedgerError> {
        if status.is_editable() {
            Ok(())
        } else {
            Err(LedgerError::Locked(LockReason::NotDraft))
        }
    }

    /// Send a draft.
    ///
    /// # Returns
    /// * `Ok(Sent)` from DRAFT
    /// * `Err(Locked(NotDraft))` otherwise
    pub fn send(status: InvoiceStatus) -> Result<InvoiceStatus, LedgerError> {
        Self::transition(status, Send).ok_or(LedgerError::Locked(LockReason::NotDraft))
    }

    /// Sign a sent invoice.
    ///
    /// A second signature is a conflict, not a no-op.
    ///
    /// # Returns
    /// * `Ok(Signed)` when unsigned and neither DRAFT nor VOIDED
    /// * `Err(AlreadySigned)` when a signature exists
    /// * `Err(Locked(Voided))` / `Err(Locked(NotSent))` otherwise
    pub fn sign(status: InvoiceStatus, has_signature: bool) -> Result<InvoiceStatus, LedgerError> {
        if has_signature || status == Signed {
            return Err(LedgerError::AlreadySigned);
        }
        match status {
            Voided => Err(LedgerError::Locked(LockReason::Voided)),
            Draft => Err(LedgerError::Locked(LockReason::NotSent)),
            _ => Self::transition(status, Sign).ok_or(LedgerError::Locked(LockReason::NotSent)),
        }
    }

    /// Void an unsigned, unpaid invoice.
    ///
    /// `payment_count` counts every ledger line, reversals included.
    pub fn void(
        status: InvoiceStatus,
        has_signature: bool,
        payment_count: u64,
    ) -> Result<InvoiceStatus, LedgerError> {
        if status == Voided {
            return Err(LedgerError::Locked(LockReason::Voided));
        }
        if has_signature || status == Signed {
            return Err(LedgerError::Locked(LockReason::Signed));
        }
        if payment_count > 0 {
            return Err(LedgerError::Locked(LockReason::HasPayments));
        }
        Self::transition(status, Void).ok_or(LedgerError::Locked(LockReason::HasPayments))
    }

    /// Rejects money movements against a voided invoice.
    pub fn ensure_payable(status: InvoiceStatus) -> Result<(), LedgerError> {
        if status == Voided {
            Err(LedgerError::Locked(LockReason::Voided))
        } else {
            Ok(())
        }
    }

    /// Status implied by the collected amount.
    ///
    /// `paid` sums non-reversal payments only. The result never moves back
    /// to SENT or SIGNED, and a voided invoice is left alone.
    #[must_use]
    pub fn derive_status(current: InvoiceStatus, total: Decimal, paid: Decimal) -> InvoiceStatus {
        if current == Voided || paid <= Decimal::ZERO {
            return current;
        }
        if paid < total { PartPaid } else { Paid }
    }

    fn transition(from: InvoiceStatus, action: InvoiceAction) -> Option<InvoiceStatus> {
        TRANSITIONS
            .iter()
            .find(|&&(f, a, _)| f == from && a == action)
            .map(|&(_, _, to)| to)
    }
}

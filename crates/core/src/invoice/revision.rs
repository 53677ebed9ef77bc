//! Revision planning.
//!
//! A revision is a new DRAFT row. Its `original_invoice_id` always points to
//! the version-1 root, so one filter returns a whole chain.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::{LedgerError, LockReason};
use crate::invoice::types::InvoiceStatus;

/// The parts of the source invoice a revision depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevisionSource {
    /// Source invoice id.
    pub id: Uuid,
    /// Source version.
    pub version: i32,
    /// Root of the source's chain, `None` for a version-1 invoice.
    pub original_invoice_id: Option<Uuid>,
    /// Source status.
    pub status: InvoiceStatus,
}

/// Identity fields of the revision to insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevisionPlan {
    /// `source.version + 1`.
    pub version: i32,
    /// Chain root.
    pub original_invoice_id: Uuid,
    /// Issue date of the revision; its year picks the numbering period.
    pub issue_date: NaiveDate,
    /// Always DRAFT.
    pub status: InvoiceStatus,
}

/// Plans a revision of `source` issued on `today`.
///
/// Drafts are rejected with `Locked(AlreadyDraft)` since they can be edited
/// directly.
pub fn plan_revision(source: &RevisionSource, today: NaiveDate) -> Result<RevisionPlan, LedgerError> {
    if source.status == InvoiceStatus::Draft {
        return Err(LedgerError::Locked(LockReason::AlreadyDraft));
    }
    let version = source
        .version
        .checked_add(1)
        .ok_or_else(|| LedgerError::validation("revision limit reached"))?;

    Ok(RevisionPlan {
        version,
        original_invoice_id: source.original_invoice_id.unwrap_or(source.id),
        issue_date: today,
        status: InvoiceStatus::Draft,
    })
}

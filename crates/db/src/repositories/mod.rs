//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.
//! Every ledger mutation runs in one transaction and reports failures as
//! [`LedgerError`].

pub mod audit;
pub mod invoice;
pub mod link;
pub mod payment;
pub mod public;
pub mod sequence;

pub use audit::TracingAuditSink;
pub use invoice::{InvoiceDetail, InvoiceRepository, InvoiceWithItems, SentInvoice};
pub use link::{AccessTokenRepository, IssuedToken};
pub use payment::{PaymentRepository, PaymentWithReceipt, RecordedPayment};
pub use public::{PublicInvoiceRepository, SignedInvoice};
pub use sequence::SequenceRepository;

use sea_orm::{DbErr, SqlErr};
use tracing::error;

use receipta_core::LedgerError;

/// Logs a storage failure and wraps it as `LedgerError::Database`.
pub(crate) fn db_err(err: DbErr) -> LedgerError {
    error!(error = %err, "database operation failed");
    LedgerError::Database(err.to_string())
}

/// Returns true if `err` is a unique-constraint violation.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

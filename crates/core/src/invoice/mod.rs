//! Invoice lifecycle.
//!
//! # Modules
//!
//! - `types` - Status, kind, unit and input types
//! - `draft` - Validation of draft contents
//! - `state` - Transition table and guards
//! - `revision` - Revision chain planning
//! - `signature` - Signer input validation

pub mod draft;
pub mod revision;
pub mod signature;
pub mod state;
pub mod types;

#[cfg(test)]
mod state_props;

pub use draft::{InvoiceDraft, prepare_create, prepare_update};
pub use revision::{RevisionPlan, RevisionSource, plan_revision};
pub use signature::{SignInput, ValidatedSignature, validate_signature};
pub use state::{InvoiceStateMachine, TRANSITIONS};
pub use types::{
    CreateInvoiceInput, InvoiceAction, InvoiceHeader, InvoiceKind, InvoiceStatus, ServiceUnit,
    UpdateInvoiceInput,
};

//! Core business logic for Receipta.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All invoice lifecycle rules, ledger arithmetic, and token handling live here;
//! the db crate runs them inside transactions.
//!
//! # Modules
//!
//! - `money` - Fixed-precision amounts and invoice totals
//! - `sequence` - Document number counters and formatting
//! - `invoice` - Invoice state machine, drafts, revisions, signatures
//! - `payment` - Payment and reversal planning
//! - `token` - View/sign bearer tokens
//! - `audit` - Audit events and sinks
//! - `error` - Ledger error taxonomy

pub mod audit;
pub mod error;
pub mod invoice;
pub mod money;
pub mod payment;
pub mod sequence;
pub mod token;

pub use error::{LedgerError, LockReason};

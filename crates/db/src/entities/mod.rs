//! `SeaORM` entities.
//!
//! One module per table, plus the Postgres enum types in
//! `sea_orm_active_enums`.

pub mod businesses;
pub mod clients;
pub mod invoice_items;
pub mod invoice_links;
pub mod invoice_signatures;
pub mod invoices;
pub mod payments;
pub mod receipts;
pub mod sea_orm_active_enums;
pub mod sequences;

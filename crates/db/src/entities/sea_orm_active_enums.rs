//! `SeaORM` active enums mirroring the Postgres enum types.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use receipta_core::invoice;
use receipta_core::sequence;
use receipta_core::token;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "invoice_status")]
pub enum InvoiceStatus {
    #[sea_orm(string_value = "DRAFT")]
    Draft,
    #[sea_orm(string_value = "SENT")]
    Sent,
    #[sea_orm(string_value = "SIGNED")]
    Signed,
    #[sea_orm(string_value = "PART_PAID")]
    PartPaid,
    #[sea_orm(string_value = "PAID")]
    Paid,
    #[sea_orm(string_value = "VOIDED")]
    Voided,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "invoice_kind")]
pub enum InvoiceKind {
    #[sea_orm(string_value = "PRODUCT")]
    Product,
    #[sea_orm(string_value = "SERVICE")]
    Service,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "service_unit")]
pub enum ServiceUnit {
    #[sea_orm(string_value = "HOURS")]
    Hours,
    #[sea_orm(string_value = "MONTHS")]
    Months,
    #[sea_orm(string_value = "SESSIONS")]
    Sessions,
    #[sea_orm(string_value = "UNITS")]
    Units,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "invoice_link_type")]
pub enum InvoiceLinkType {
    #[sea_orm(string_value = "VIEW")]
    View,
    #[sea_orm(string_value = "SIGN")]
    Sign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "sequence_key")]
pub enum SequenceKey {
    #[sea_orm(string_value = "INVOICE")]
    Invoice,
    #[sea_orm(string_value = "RECEIPT")]
    Receipt,
}

impl From<InvoiceStatus> for invoice::InvoiceStatus {
    fn from(status: InvoiceStatus) -> Self {
        match status {
            InvoiceStatus::Draft => Self::Draft,
            InvoiceStatus::Sent => Self::Sent,
            InvoiceStatus::Signed => Self::Signed,
            InvoiceStatus::PartPaid => Self::PartPaid,
            InvoiceStatus::Paid => Self::Paid,
            InvoiceStatus::Voided => Self::Voided,
        }
    }
}

impl From<invoice::InvoiceStatus> for InvoiceStatus {
    fn from(status: invoice::InvoiceStatus) -> Self {
        match status {
            invoice::InvoiceStatus::Draft => Self::Draft,
            invoice::InvoiceStatus::Sent => Self::Sent,
            invoice::InvoiceStatus::Signed => Self::Signed,
            invoice::InvoiceStatus::PartPaid => Self::PartPaid,
            invoice::InvoiceStatus::Paid => Self::Paid,
            invoice::InvoiceStatus::Voided => Self::Voided,
        }
    }
}

impl From<InvoiceKind> for invoice::InvoiceKind {
    fn from(kind: InvoiceKind) -> Self {
        match kind {
            InvoiceKind::Product => Self::Product,
            InvoiceKind::Service => Self::Service,
        }
    }
}

impl From<invoice::InvoiceKind> for InvoiceKind {
    fn from(kind: invoice::InvoiceKind) -> Self {
        match kind {
            invoice::InvoiceKind::Product => Self::Product,
            invoice::InvoiceKind::Service => Self::Service,
        }
    }
}

impl From<ServiceUnit> for invoice::ServiceUnit {
    fn from(unit: ServiceUnit) -> Self {
        match unit {
            ServiceUnit::Hours => Self::Hours,
            ServiceUnit::Months => Self::Months,
            ServiceUnit::Sessions => Self::Sessions,
            ServiceUnit::Units => Self::Units,
        }
    }
}

impl From<invoice::ServiceUnit> for ServiceUnit {
    fn from(unit: invoice::ServiceUnit) -> Self {
        match unit {
            invoice::ServiceUnit::Hours => Self::Hours,
            invoice::ServiceUnit::Months => Self::Months,
            invoice::ServiceUnit::Sessions => Self::Sessions,
            invoice::ServiceUnit::Units => Self::Units,
        }
    }
}

impl From<InvoiceLinkType> for token::LinkType {
    fn from(link_type: InvoiceLinkType) -> Self {
        match link_type {
            InvoiceLinkType::View => Self::View,
            InvoiceLinkType::Sign => Self::Sign,
        }
    }
}

impl From<token::LinkType> for InvoiceLinkType {
    fn from(link_type: token::LinkType) -> Self {
        match link_type {
            token::LinkType::View => Self::View,
            token::LinkType::Sign => Self::Sign,
        }
    }
}

impl From<sequence::SequenceKey> for SequenceKey {
    fn from(key: sequence::SequenceKey) -> Self {
        match key {
            sequence::SequenceKey::Invoice => Self::Invoice,
            sequence::SequenceKey::Receipt => Self::Receipt,
        }
    }
}

//! Invoice domain types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::money::LineItemInput;

/// Invoice lifecycle status.
///
/// The valid transitions are:
/// - Draft → Sent (send)
/// - Sent → Signed (sign)
/// - any payable status → PartPaid / Paid (payment recorded)
/// - Draft / Sent → Voided (void, unsigned and unpaid only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    /// Being drafted; items, dates and tax are editable.
    Draft,
    /// Tokens minted and delivered to the client.
    Sent,
    /// Client acknowledged and signed.
    Signed,
    /// Some money collected, less than the total.
    PartPaid,
    /// Collected amount reached the total.
    Paid,
    /// Cancelled before signature or payment.
    Voided,
}

impl InvoiceStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::Draft,
        Self::Sent,
        Self::Signed,
        Self::PartPaid,
        Self::Paid,
        Self::Voided,
    ];

    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Sent => "SENT",
            Self::Signed => "SIGNED",
            Self::PartPaid => "PART_PAID",
            Self::Paid => "PAID",
            Self::Voided => "VOIDED",
        }
    }

    /// Parses a status from a string, ignoring case.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "DRAFT" => Some(Self::Draft),
            "SENT" => Some(Self::Sent),
            "SIGNED" => Some(Self::Signed),
            "PART_PAID" => Some(Self::PartPaid),
            "PAID" => Some(Self::Paid),
            "VOIDED" => Some(Self::Voided),
            _ => None,
        }
    }

    /// Returns true if items, dates, tax and currency may change.
    #[must_use]
    pub const fn is_editable(&self) -> bool {
        matches!(self, Self::Draft)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an invoice bills for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceKind {
    /// Goods.
    Product,
    /// Services, usually with a period and unit.
    Service,
}

impl InvoiceKind {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Product => "PRODUCT",
            Self::Service => "SERVICE",
        }
    }
}

/// Unit a service quantity is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceUnit {
    /// Hours.
    Hours,
    /// Months.
    Months,
    /// Sessions.
    Sessions,
    /// Generic units.
    Units,
}

impl ServiceUnit {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Hours => "HOURS",
            Self::Months => "MONTHS",
            Self::Sessions => "SESSIONS",
            Self::Units => "UNITS",
        }
    }
}

/// Status-changing actions, used as the key of the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvoiceAction {
    /// Mint tokens and deliver.
    Send,
    /// Client signature.
    Sign,
    /// Cancel.
    Void,
    /// Status recomputed after a payment landed.
    ApplyPayment,
}

/// Input for creating an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateInvoiceInput {
    /// Client being billed; must belong to the same business.
    pub client_id: Uuid,
    /// Defaults to today.
    pub issue_date: Option<NaiveDate>,
    /// Optional due date.
    pub due_date: Option<NaiveDate>,
    /// ISO-style currency code.
    pub currency: String,
    /// Percentage 0-100; defaults to 0.
    pub tax_rate: Option<Decimal>,
    /// Free text printed on the document.
    pub notes: Option<String>,
    /// Product or service invoice.
    pub invoice_kind: Option<InvoiceKind>,
    /// Billing period description for service invoices.
    pub service_period: Option<String>,
    /// Unit of measure for service invoices.
    pub service_unit: Option<ServiceUnit>,
    /// At least one line.
    pub items: Vec<LineItemInput>,
}

/// Input for updating a draft. Omitted header fields keep their current value;
/// items are always replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateInvoiceInput {
    /// New issue date.
    pub issue_date: Option<NaiveDate>,
    /// New due date.
    pub due_date: Option<NaiveDate>,
    /// New currency.
    pub currency: Option<String>,
    /// New tax rate.
    pub tax_rate: Option<Decimal>,
    /// New notes.
    pub notes: Option<String>,
    /// New kind.
    pub invoice_kind: Option<InvoiceKind>,
    /// New service period.
    pub service_period: Option<String>,
    /// New service unit.
    pub service_unit: Option<ServiceUnit>,
    /// Replacement item set.
    pub items: Vec<LineItemInput>,
}

/// Header fields frozen once an invoice leaves DRAFT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceHeader {
    /// Issue date; its year selects the numbering period.
    pub issue_date: NaiveDate,
    /// Optional due date.
    pub due_date: Option<NaiveDate>,
    /// Currency code.
    pub currency: String,
    /// Percentage 0-100.
    pub tax_rate: Decimal,
    /// Free text.
    pub notes: Option<String>,
    /// Product or service.
    pub invoice_kind: Option<InvoiceKind>,
    /// Service billing period.
    pub service_period: Option<String>,
    /// Service unit.
    pub service_unit: Option<ServiceUnit>,
}

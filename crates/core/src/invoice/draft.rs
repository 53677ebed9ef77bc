//! Validation of draft contents.
//!
//! Turns create/update input into a validated header plus priced lines. The
//! result is what gets written; nothing here touches storage.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::LedgerError;
use crate::invoice::types::{CreateInvoiceInput, InvoiceHeader, UpdateInvoiceInput};
use crate::money::{PricedInvoice, price_invoice};

/// Longest accepted currency code.
pub const MAX_CURRENCY_LEN: usize = 8;

/// Validated draft ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceDraft {
    /// Header fields.
    pub header: InvoiceHeader,
    /// Priced lines and totals.
    pub priced: PricedInvoice,
}

/// Validates a create request. `today` fills a missing issue date.
pub fn prepare_create(
    input: &CreateInvoiceInput,
    today: NaiveDate,
) -> Result<InvoiceDraft, LedgerError> {
    let header = InvoiceHeader {
        issue_date: input.issue_date.unwrap_or(today),
        due_date: input.due_date,
        currency: normalize_currency(&input.currency)?,
        tax_rate: input.tax_rate.unwrap_or(Decimal::ZERO),
        notes: input.notes.clone(),
        invoice_kind: input.invoice_kind,
        service_period: normalize_service_period(input.service_period.as_deref())?,
        service_unit: input.service_unit,
    };
    let priced = price_invoice(&input.items, header.tax_rate)?;

    Ok(InvoiceDraft { header, priced })
}

/// Validates an update request against the draft's current header.
pub fn prepare_update(
    current: &InvoiceHeader,
    input: &UpdateInvoiceInput,
) -> Result<InvoiceDraft, LedgerError> {
    let currency = match input.currency.as_deref() {
        Some(currency) => normalize_currency(currency)?,
        None => current.currency.clone(),
    };
    let service_period = match input.service_period.as_deref() {
        Some(period) => normalize_service_period(Some(period))?,
        None => current.service_period.clone(),
    };

    let header = InvoiceHeader {
        issue_date: input.issue_date.unwrap_or(current.issue_date),
        due_date: input.due_date.or(current.due_date),
        currency,
        tax_rate: input.tax_rate.unwrap_or(current.tax_rate),
        notes: input.notes.clone().or_else(|| current.notes.clone()),
        invoice_kind: input.invoice_kind.or(current.invoice_kind),
        service_period,
        service_unit: input.service_unit.or(current.service_unit),
    };
    let priced = price_invoice(&input.items, header.tax_rate)?;

    Ok(InvoiceDraft { header, priced })
}

fn normalize_currency(currency: &str) -> Result<String, LedgerError> {
    let currency = currency.trim();
    if currency.is_empty() {
        return Err(LedgerError::validation("currency is required"));
    }
    if currency.chars().count() > MAX_CURRENCY_LEN {
        return Err(LedgerError::validation(format!(
            "currency must be at most {MAX_CURRENCY_LEN} characters"
        )));
    }
    Ok(currency.to_string())
}

fn normalize_service_period(period: Option<&str>) -> Result<Option<String>, LedgerError> {
    match period.map(str::trim) {
        Some("") => Err(LedgerError::validation("service period cannot be blank")),
        Some(period) => Ok(Some(period.to_string())),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::types::{InvoiceKind, ServiceUnit};
    use crate::money::LineItemInput;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    fn create_input() -> CreateInvoiceInput {
        CreateInvoiceInput {
            client_id: Uuid::new_v4(),
            issue_date: None,
            due_date: None,
            currency: "USD".to_string(),
            tax_rate: None,
            notes: Some("Thanks".to_string()),
            invoice_kind: Some(InvoiceKind::Service),
            service_period: Some("March 2026".to_string()),
            service_unit: Some(ServiceUnit::Hours),
            items: vec![LineItemInput::new("Consulting", dec!(10), dec!(120))],
        }
    }

    #[test]
    fn test_create_defaults_issue_date_and_tax() {
        let draft = prepare_create(&create_input(), today()).unwrap();

        assert_eq!(draft.header.issue_date, today());
        assert_eq!(draft.header.tax_rate, Decimal::ZERO);
        assert_eq!(draft.priced.totals.total, dec!(1200.00));
        assert_eq!(draft.header.service_unit, Some(ServiceUnit::Hours));
    }

    #[test]
    fn test_create_rejects_bad_currency() {
        let mut input = create_input();
        input.currency = "  ".to_string();
        assert!(matches!(
            prepare_create(&input, today()),
            Err(LedgerError::Validation(_))
        ));

        input.currency = "TOOLONGCODE".to_string();
        assert!(prepare_create(&input, today()).is_err());
    }

    #[test]
    fn test_create_rejects_blank_service_period() {
        let mut input = create_input();
        input.service_period = Some(" ".to_string());
        assert!(prepare_create(&input, today()).is_err());
    }

    #[test]
    fn test_update_keeps_omitted_fields() {
        let current = prepare_create(&create_input(), today()).unwrap().header;
        let update = UpdateInvoiceInput {
            tax_rate: Some(dec!(10)),
            items: vec![LineItemInput::new("Consulting", dec!(5), dec!(120))],
            ..UpdateInvoiceInput::default()
        };

        let draft = prepare_update(&current, &update).unwrap();

        assert_eq!(draft.header.currency, "USD");
        assert_eq!(draft.header.notes.as_deref(), Some("Thanks"));
        assert_eq!(draft.header.issue_date, today());
        assert_eq!(draft.header.tax_rate, dec!(10));
        assert_eq!(draft.priced.totals.subtotal, dec!(600.00));
        assert_eq!(draft.priced.totals.total, dec!(660.00));
    }

    #[test]
    fn test_update_requires_items() {
        let current = prepare_create(&create_input(), today()).unwrap().header;
        let update = UpdateInvoiceInput::default();
        assert!(prepare_update(&current, &update).is_err());
    }
}

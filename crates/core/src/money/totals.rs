//! Invoice totals.
//!
//! `subtotal = Σ line_total`, `tax_total = round(subtotal × rate / 100)`,
//! `total = subtotal + tax_total`. Each figure is rounded once and then
//! stored as-is.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{
    INPUT_SCALE, MAX_INPUT_VALUE, ensure_storable, multiply, percentage, round_money, sum,
};
use crate::error::LedgerError;

/// Decimal places accepted on a tax rate.
pub const TAX_RATE_SCALE: u32 = 2;

/// A line item as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemInput {
    /// What is being billed.
    pub description: String,
    /// Quantity, strictly positive.
    pub qty: Decimal,
    /// Price per unit, strictly positive.
    pub unit_price: Decimal,
}

impl LineItemInput {
    /// Convenience constructor.
    pub fn new(description: impl Into<String>, qty: Decimal, unit_price: Decimal) -> Self {
        Self {
            description: description.into(),
            qty,
            unit_price,
        }
    }
}

/// A validated line with its frozen total and 1-based position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    /// 1-based ordinal within the invoice.
    pub position: i32,
    /// Trimmed description.
    pub description: String,
    /// Quantity.
    pub qty: Decimal,
    /// Price per unit.
    pub unit_price: Decimal,
    /// `round(qty × unit_price, 2)`.
    pub line_total: Decimal,
}

/// Stored invoice amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    /// Sum of line totals.
    pub subtotal: Decimal,
    /// Tax on the subtotal.
    pub tax_total: Decimal,
    /// `subtotal + tax_total`.
    pub total: Decimal,
}

/// Result of pricing an item set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedInvoice {
    /// Lines in input order.
    pub lines: Vec<PricedLine>,
    /// Tax rate the totals were computed with.
    pub tax_rate: Decimal,
    /// Computed amounts.
    pub totals: InvoiceTotals,
}

/// Validates an item set and computes its totals.
///
/// Rejects an empty item list, blank descriptions, non-positive quantities or
/// prices, inputs with more than 4 decimal places, tax rates outside 0-100, and
/// amounts that would not fit the stored columns.
pub fn price_invoice(
    items: &[LineItemInput],
    tax_rate: Decimal,
) -> Result<PricedInvoice, LedgerError> {
    if items.is_empty() {
        return Err(LedgerError::validation("at least one item is required"));
    }
    validate_tax_rate(tax_rate)?;

    let mut lines = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let position = i32::try_from(index + 1)
            .map_err(|_| LedgerError::validation("too many items"))?;
        lines.push(price_line(position, item)?);
    }

    let subtotal = sum(lines.iter().map(|line| line.line_total))?;
    let tax_total = percentage(subtotal, tax_rate)?;
    let total = round_money(subtotal + tax_total);
    ensure_storable(total, "total")?;

    Ok(PricedInvoice {
        lines,
        tax_rate,
        totals: InvoiceTotals {
            subtotal,
            tax_total,
            total,
        },
    })
}

/// Checks that a tax rate is a percentage between 0 and 100.
pub fn validate_tax_rate(tax_rate: Decimal) -> Result<(), LedgerError> {
    if tax_rate.is_sign_negative() && !tax_rate.is_zero() {
        return Err(LedgerError::validation("tax rate cannot be negative"));
    }
    if tax_rate > Decimal::ONE_HUNDRED {
        return Err(LedgerError::validation("tax rate cannot exceed 100"));
    }
    if tax_rate.normalize().scale() > TAX_RATE_SCALE {
        return Err(LedgerError::validation(
            "tax rate supports at most 2 decimal places",
        ));
    }
    Ok(())
}

fn price_line(position: i32, item: &LineItemInput) -> Result<PricedLine, LedgerError> {
    let description = item.description.trim();
    if description.is_empty() {
        return Err(LedgerError::validation(format!(
            "item {position}: description is required"
        )));
    }
    if item.qty <= Decimal::ZERO {
        return Err(LedgerError::validation(format!(
            "item {position}: quantity must be positive"
        )));
    }
    if item.unit_price <= Decimal::ZERO {
        return Err(LedgerError::validation(format!(
            "item {position}: unit price must be positive"
        )));
    }
    if item.qty.normalize().scale() > INPUT_SCALE
        || item.unit_price.normalize().scale() > INPUT_SCALE
    {
        return Err(LedgerError::validation(format!(
            "item {position}: at most 4 decimal places are supported"
        )));
    }
    if item.qty > MAX_INPUT_VALUE || item.unit_price > MAX_INPUT_VALUE {
        return Err(LedgerError::validation(format!(
            "item {position}: quantity and unit price must not exceed {MAX_INPUT_VALUE}"
        )));
    }

    let line_total = multiply(item.qty, item.unit_price)?;
    ensure_storable(line_total, "line total")?;

    Ok(PricedLine {
        position,
        description: description.to_string(),
        qty: item.qty,
        unit_price: item.unit_price,
        line_total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_price_invoice_basic() {
        let items = vec![
            LineItemInput::new("Design", dec!(2), dec!(150.00)),
            LineItemInput::new("Hosting", dec!(1), dec!(25.50)),
        ];

        let priced = price_invoice(&items, dec!(10)).unwrap();

        assert_eq!(priced.lines[0].line_total, dec!(300.00));
        assert_eq!(priced.lines[1].line_total, dec!(25.50));
        assert_eq!(priced.totals.subtotal, dec!(325.50));
        assert_eq!(priced.totals.tax_total, dec!(32.55));
        assert_eq!(priced.totals.total, dec!(358.05));
    }

    #[test]
    fn test_positions_are_one_based_in_input_order() {
        let items = vec![
            LineItemInput::new("first", dec!(1), dec!(1)),
            LineItemInput::new("second", dec!(1), dec!(1)),
            LineItemInput::new("third", dec!(1), dec!(1)),
        ];

        let priced = price_invoice(&items, Decimal::ZERO).unwrap();
        let positions: Vec<_> = priced.lines.iter().map(|l| l.position).collect();

        assert_eq!(positions, vec![1, 2, 3]);
        assert_eq!(priced.lines[2].description, "third");
    }

    #[test]
    fn test_fractional_inputs_round_per_line() {
        // 0.333 x 10.01 = 3.33333 -> 3.33 (rounded per line, not at the end)
        let items = vec![
            LineItemInput::new("a", dec!(0.333), dec!(10.01)),
            LineItemInput::new("b", dec!(0.333), dec!(10.01)),
            LineItemInput::new("c", dec!(0.333), dec!(10.01)),
        ];

        let priced = price_invoice(&items, dec!(12.5)).unwrap();

        assert_eq!(priced.totals.subtotal, dec!(9.99));
        // 9.99 x 12.5% = 1.24875 -> 1.25
        assert_eq!(priced.totals.tax_total, dec!(1.25));
        assert_eq!(priced.totals.total, dec!(11.24));
    }

    #[test]
    fn test_description_is_trimmed() {
        let items = vec![LineItemInput::new("  Consulting  ", dec!(1), dec!(10))];
        let priced = price_invoice(&items, Decimal::ZERO).unwrap();
        assert_eq!(priced.lines[0].description, "Consulting");
    }

    #[test]
    fn test_rejects_empty_items() {
        let err = price_invoice(&[], Decimal::ZERO).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn test_rejects_non_positive_qty_and_price() {
        let zero_qty = vec![LineItemInput::new("x", Decimal::ZERO, dec!(10))];
        assert!(matches!(
            price_invoice(&zero_qty, Decimal::ZERO),
            Err(LedgerError::Validation(_))
        ));

        let negative_price = vec![LineItemInput::new("x", dec!(1), dec!(-10))];
        assert!(matches!(
            price_invoice(&negative_price, Decimal::ZERO),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn test_rejects_blank_description() {
        let items = vec![LineItemInput::new("   ", dec!(1), dec!(10))];
        assert!(price_invoice(&items, Decimal::ZERO).is_err());
    }

    #[test]
    fn test_rejects_excess_precision() {
        let items = vec![LineItemInput::new("x", dec!(1.00001), dec!(10))];
        assert!(price_invoice(&items, Decimal::ZERO).is_err());

        // Trailing zeros do not count.
        let items = vec![LineItemInput::new("x", dec!(1.500000), dec!(10))];
        assert!(price_invoice(&items, Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_tax_rate_bounds() {
        assert!(validate_tax_rate(Decimal::ZERO).is_ok());
        assert!(validate_tax_rate(dec!(100)).is_ok());
        assert!(validate_tax_rate(dec!(7.25)).is_ok());
        assert!(validate_tax_rate(dec!(-0.01)).is_err());
        assert!(validate_tax_rate(dec!(100.01)).is_err());
        assert!(validate_tax_rate(dec!(7.125)).is_err());
    }

    #[test]
    fn test_rejects_unstorable_total() {
        let items = vec![LineItemInput::new("x", dec!(1000000), dec!(1000000000))];
        assert!(price_invoice(&items, Decimal::ZERO).is_err());
    }

    #[test]
    fn test_rejects_qty_and_price_beyond_column() {
        // A tiny line total does not excuse a quantity the column cannot hold.
        let huge_qty = vec![LineItemInput::new("x", dec!(100000000000), dec!(0.001))];
        assert!(matches!(
            price_invoice(&huge_qty, Decimal::ZERO),
            Err(LedgerError::Validation(_))
        ));

        let huge_price = vec![LineItemInput::new("x", dec!(0.0001), dec!(10000000000))];
        assert!(matches!(
            price_invoice(&huge_price, Decimal::ZERO),
            Err(LedgerError::Validation(_))
        ));

        let at_limit = vec![LineItemInput::new("x", dec!(0.0001), MAX_INPUT_VALUE)];
        assert!(price_invoice(&at_limit, Decimal::ZERO).is_ok());
    }
}

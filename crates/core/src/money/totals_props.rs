//! Property-based tests for invoice totals.
//!
//! - Property 1: `total == subtotal + tax_total`
//! - Property 2: `subtotal == Σ line_total`
//! - Property 3: every stored amount has at most 2 decimal places
//! - Property 4: `line_total == round(qty × unit_price, 2)`

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::round_money;
use super::totals::{LineItemInput, price_invoice};

/// Quantities from 0.0001 to 1,000.0000.
fn qty_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|v| Decimal::new(v, 4))
}

/// Unit prices from 0.0001 to 100,000.0000.
fn price_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000_000i64).prop_map(|v| Decimal::new(v, 4))
}

/// Tax rates from 0.00 to 100.00.
fn tax_rate_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..=10_000i64).prop_map(|v| Decimal::new(v, 2))
}

fn items_strategy() -> impl Strategy<Value = Vec<LineItemInput>> {
    prop::collection::vec(
        (qty_strategy(), price_strategy())
            .prop_map(|(qty, price)| LineItemInput::new("item", qty, price)),
        1..12,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_total_is_subtotal_plus_tax(items in items_strategy(), rate in tax_rate_strategy()) {
        let priced = price_invoice(&items, rate).unwrap();
        let totals = priced.totals;

        prop_assert_eq!(totals.total, totals.subtotal + totals.tax_total);
    }

    #[test]
    fn prop_subtotal_is_sum_of_lines(items in items_strategy(), rate in tax_rate_strategy()) {
        let priced = price_invoice(&items, rate).unwrap();
        let line_sum: Decimal = priced.lines.iter().map(|l| l.line_total).sum();

        prop_assert_eq!(priced.totals.subtotal, line_sum);
    }

    #[test]
    fn prop_amounts_have_two_decimal_places(items in items_strategy(), rate in tax_rate_strategy()) {
        let priced = price_invoice(&items, rate).unwrap();
        let totals = priced.totals;

        for amount in [totals.subtotal, totals.tax_total, totals.total] {
            prop_assert_eq!(amount, round_money(amount));
        }
        for line in &priced.lines {
            prop_assert_eq!(line.line_total, round_money(line.line_total));
        }
    }

    #[test]
    fn prop_line_total_is_rounded_product(qty in qty_strategy(), price in price_strategy()) {
        let priced = price_invoice(&[LineItemInput::new("x", qty, price)], Decimal::ZERO).unwrap();

        prop_assert_eq!(priced.lines[0].line_total, round_money(qty * price));
        prop_assert_eq!(priced.totals.tax_total, Decimal::ZERO);
    }

    #[test]
    fn prop_tax_never_exceeds_subtotal(items in items_strategy(), rate in tax_rate_strategy()) {
        let priced = price_invoice(&items, rate).unwrap();

        prop_assert!(priced.totals.tax_total >= Decimal::ZERO);
        prop_assert!(priced.totals.tax_total <= priced.totals.subtotal);
    }
}

//! Document numbering.
//!
//! Counters are keyed by (business, [`SequenceKey`], calendar year) and hand
//! out 1, 2, 3, ... with no gaps. Allocation itself needs a row lock and
//! lives in the db crate; this module holds the pure parts: counter keys,
//! periods, the retry bound, and the printed number format.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Attempts made before allocation fails with `SequenceExhausted`.
pub const SEQUENCE_MAX_ATTEMPTS: u32 = 3;

/// Minimum width of the counter in a printed document number.
pub const SEQUENCE_PAD_WIDTH: usize = 4;

/// Which counter a number is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SequenceKey {
    /// Invoice numbers.
    Invoice,
    /// Receipt numbers.
    Receipt,
}

impl SequenceKey {
    /// Returns the stored counter key.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Invoice => "INVOICE",
            Self::Receipt => "RECEIPT",
        }
    }

    /// Returns the segment printed in document numbers.
    #[must_use]
    pub const fn prefix(&self) -> &'static str {
        match self {
            Self::Invoice => "INV",
            Self::Receipt => "RCT",
        }
    }

    /// Parses a stored counter key.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "INVOICE" => Some(Self::Invoice),
            "RECEIPT" => Some(Self::Receipt),
            _ => None,
        }
    }
}

impl fmt::Display for SequenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counter period for a document dated `date`.
#[must_use]
pub fn period_of(date: NaiveDate) -> i32 {
    date.year()
}

/// Value following `last_number`, or `None` once the counter is exhausted.
#[must_use]
pub fn next_number(last_number: i32) -> Option<i32> {
    last_number.checked_add(1)
}

/// Formats `{code}-{INV|RCT}-{year}-{seq}` with the counter zero-padded to 4
/// digits. Larger counters widen the field instead of wrapping.
#[must_use]
pub fn format_document_number(
    business_code: &str,
    key: SequenceKey,
    period: i32,
    sequence: i32,
) -> String {
    format!(
        "{business_code}-{}-{period}-{sequence:0width$}",
        key.prefix(),
        width = SEQUENCE_PAD_WIDTH
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("ACME", SequenceKey::Invoice, 2026, 1, "ACME-INV-2026-0001")]
    #[case("ACME", SequenceKey::Receipt, 2026, 42, "ACME-RCT-2026-0042")]
    #[case("RCP", SequenceKey::Invoice, 2025, 9999, "RCP-INV-2025-9999")]
    #[case("RCP", SequenceKey::Invoice, 2025, 12345, "RCP-INV-2025-12345")]
    fn test_format_document_number(
        #[case] code: &str,
        #[case] key: SequenceKey,
        #[case] period: i32,
        #[case] sequence: i32,
        #[case] expected: &str,
    ) {
        assert_eq!(format_document_number(code, key, period, sequence), expected);
    }

    #[test]
    fn test_period_is_calendar_year() {
        let date = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();
        assert_eq!(period_of(date), 2026);

        let date = NaiveDate::from_ymd_opt(2027, 1, 1).unwrap();
        assert_eq!(period_of(date), 2027);
    }

    #[test]
    fn test_key_round_trip() {
        for key in [SequenceKey::Invoice, SequenceKey::Receipt] {
            assert_eq!(SequenceKey::parse(key.as_str()), Some(key));
        }
        assert_eq!(SequenceKey::parse("invoice"), None);
    }

    #[test]
    fn test_next_number() {
        assert_eq!(next_number(0), Some(1));
        assert_eq!(next_number(41), Some(42));
        assert_eq!(next_number(i32::MAX), None);
    }
}

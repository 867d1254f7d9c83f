//! Amount cell parsing.
//!
//! Export files write amounts like `£1,234.50` or ` 2,000 `. A cell is
//! cleaned of currency symbols, thousands separators and whitespace, then
//! parsed. The outcome says whether the value was read as-is, had to be
//! repaired, or could not be read at all.

use tally_core::{ColumnData, LedgerError, Result};

const CURRENCY_SYMBOLS: [char; 3] = ['£', '$', '€'];
const THOUSANDS_SEPARATOR: char = ',';

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AmountOutcome {
    Parsed(f64),
    /// Readable, but changed to keep amounts non-negative.
    Repaired(f64),
    /// Missing or unreadable; stored as zero.
    Failed,
}

impl AmountOutcome {
    pub fn value(self) -> f64 {
        match self {
            AmountOutcome::Parsed(v) | AmountOutcome::Repaired(v) => v,
            AmountOutcome::Failed => 0.0,
        }
    }

    pub fn is_repair(self) -> bool {
        !matches!(self, AmountOutcome::Parsed(_))
    }

    fn from_number(v: f64) -> Self {
        if !v.is_finite() {
            AmountOutcome::Failed
        } else if v < 0.0 {
            AmountOutcome::Repaired(-v)
        } else {
            AmountOutcome::Parsed(v)
        }
    }
}

/// Strip formatting artifacts from `raw` and parse what is left.
pub fn parse_amount(raw: &str) -> AmountOutcome {
    let cleaned: String = raw
        .chars()
        .filter(|c| !CURRENCY_SYMBOLS.contains(c) && *c != THOUSANDS_SEPARATOR && !c.is_whitespace())
        .collect();

    match cleaned.parse::<f64>() {
        Ok(v) => AmountOutcome::from_number(v),
        Err(_) => AmountOutcome::Failed,
    }
}

/// A fully coerced amount column.
#[derive(Debug, Clone, PartialEq)]
pub struct AmountColumn {
    pub values: Vec<f64>,
    /// Cells that were missing, unreadable or negative.
    pub repairs: usize,
}

impl AmountColumn {
    fn collect(outcomes: impl Iterator<Item = AmountOutcome>) -> Self {
        let mut values = Vec::new();
        let mut repairs = 0;
        for outcome in outcomes {
            if outcome.is_repair() {
                repairs += 1;
            }
            values.push(outcome.value());
        }
        Self { values, repairs }
    }

    pub fn into_data(self) -> ColumnData {
        ColumnData::Number(self.values.into_iter().map(Some).collect())
    }
}

/// Coerce every cell of `data` to a non-negative amount.
///
/// Text and number cells are coerced cell by cell. A date column cannot be
/// read as amounts and is an error.
pub fn coerce_amounts(label: &str, data: &ColumnData) -> Result<AmountColumn> {
    match data {
        ColumnData::Text(cells) => Ok(AmountColumn::collect(cells.iter().map(|c| {
            c.as_deref().map(parse_amount).unwrap_or(AmountOutcome::Failed)
        }))),
        ColumnData::Number(cells) => Ok(AmountColumn::collect(cells.iter().map(|c| {
            c.map(AmountOutcome::from_number).unwrap_or(AmountOutcome::Failed)
        }))),
        ColumnData::Date(_) => Err(LedgerError::AmountColumn {
            label: label.to_string(),
            reason: "column holds dates".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_currency_and_separators() {
        assert_eq!(parse_amount("£1,234.50"), AmountOutcome::Parsed(1234.50));
        assert_eq!(parse_amount("  2,000  "), AmountOutcome::Parsed(2000.0));
        assert_eq!(parse_amount("$ 12"), AmountOutcome::Parsed(12.0));
        assert_eq!(parse_amount("€0.99"), AmountOutcome::Parsed(0.99));
    }

    #[test]
    fn test_unreadable_is_failed_zero() {
        let outcome = parse_amount("abc");
        assert_eq!(outcome, AmountOutcome::Failed);
        assert_eq!(outcome.value(), 0.0);
        assert!(outcome.is_repair());
        assert_eq!(parse_amount(""), AmountOutcome::Failed);
        assert_eq!(parse_amount("NaN"), AmountOutcome::Failed);
        assert_eq!(parse_amount("inf"), AmountOutcome::Failed);
    }

    #[test]
    fn test_negative_is_repaired() {
        assert_eq!(parse_amount("-£5.00"), AmountOutcome::Repaired(5.0));
        assert_eq!(parse_amount("-£5.00").value(), 5.0);
    }

    #[test]
    fn test_coerce_text_column_counts_repairs() {
        let data = ColumnData::Text(vec![
            Some("£1,234.50".to_string()),
            None,
            Some("abc".to_string()),
            Some("3".to_string()),
        ]);
        let col = coerce_amounts("Debit Amount", &data).unwrap();
        assert_eq!(col.values, vec![1234.5, 0.0, 0.0, 3.0]);
        assert_eq!(col.repairs, 2);
    }

    #[test]
    fn test_coerce_clean_number_column_is_untouched() {
        let data = ColumnData::Number(vec![Some(1.5), Some(0.0)]);
        let col = coerce_amounts("Credit Amount", &data).unwrap();
        assert_eq!(col.repairs, 0);
        assert_eq!(col.into_data(), data);
    }

    #[test]
    fn test_date_column_is_an_error() {
        let data = ColumnData::Date(vec![None]);
        let err = coerce_amounts("Debit Amount", &data).unwrap_err();
        assert!(err.to_string().contains("Debit Amount"));
    }
}

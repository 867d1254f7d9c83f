//! Summary statistics over a normalized ledger.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::columns::ColumnMapping;
use crate::ledger::{ColumnData, Ledger};
use crate::stats::DescriptiveStats;

pub const NO_DATA_WARNING: &str = "No data available for analysis";

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingCount {
    pub column: String,
    pub missing: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub column: String,
    #[serde(flatten)]
    pub stats: DescriptiveStats,
}

/// Read-only snapshot of a ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub transaction_count: usize,
    pub period: DateRange,
    pub total_debit: f64,
    pub total_credit: f64,
    /// Null cells per column, in ledger column order.
    pub missing_values: Vec<MissingCount>,
    /// Descriptive statistics for every numeric column.
    pub summary_stats: Vec<ColumnStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl AnalysisSummary {
    pub fn no_data() -> Self {
        Self {
            transaction_count: 0,
            period: DateRange::default(),
            total_debit: 0.0,
            total_credit: 0.0,
            missing_values: Vec::new(),
            summary_stats: Vec::new(),
            warning: Some(NO_DATA_WARNING.to_string()),
        }
    }

    pub fn has_data(&self) -> bool {
        self.warning.is_none()
    }

    /// Fixed-width statistics table, one column per numeric ledger column.
    pub fn stats_table(&self) -> String {
        if self.summary_stats.is_empty() {
            return String::from("(no numeric columns)");
        }
        let width = self
            .summary_stats
            .iter()
            .map(|c| c.column.len())
            .max()
            .unwrap_or(0)
            .max(12);

        let mut out = format!("{:<6}", "");
        for c in &self.summary_stats {
            out.push_str(&format!(" {:>width$}", c.column));
        }
        out.push('\n');

        let labels = self.summary_stats[0].stats.rows().map(|(name, _)| name);
        for (i, name) in labels.iter().enumerate() {
            out.push_str(&format!("{name:<6}"));
            for c in &self.summary_stats {
                let cell = c.stats.rows()[i].1.map(|v| format!("{v:.2}"));
                out.push_str(&format!(" {:>width$}", cell.as_deref().unwrap_or("NaN")));
            }
            out.push('\n');
        }
        out
    }
}

/// Compute the summary of `ledger`. Never fails; a zero-row ledger yields the
/// no-data summary.
pub fn analyze(ledger: &Ledger, columns: &ColumnMapping) -> AnalysisSummary {
    if ledger.is_empty() {
        warn!("{NO_DATA_WARNING}");
        return AnalysisSummary::no_data();
    }

    let period = ledger
        .dates(&columns.date)
        .map(|dates| DateRange {
            start: dates.iter().flatten().min().copied(),
            end: dates.iter().flatten().max().copied(),
        })
        .unwrap_or_default();

    let total = |label: &str| -> f64 {
        ledger
            .numbers(label)
            .map(|v| v.iter().flatten().sum())
            .unwrap_or(0.0)
    };

    let missing_values = ledger
        .columns()
        .iter()
        .map(|c| MissingCount {
            column: c.label.clone(),
            missing: c.data.null_count(),
        })
        .collect();

    let summary_stats: Vec<ColumnStats> = ledger
        .columns()
        .iter()
        .filter_map(|c| match &c.data {
            ColumnData::Number(cells) => Some(ColumnStats {
                column: c.label.clone(),
                stats: DescriptiveStats::from_cells(cells),
            }),
            _ => None,
        })
        .collect();

    debug!(
        "Analyzed {} rows, {} numeric columns",
        ledger.row_count(),
        summary_stats.len()
    );

    AnalysisSummary {
        transaction_count: ledger.row_count(),
        period,
        total_debit: total(&columns.debit),
        total_credit: total(&columns.credit),
        missing_values,
        summary_stats,
        warning: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Column;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    fn sample() -> Ledger {
        Ledger::from_columns(vec![
            Column::new(
                "Transaction Date",
                ColumnData::Date(vec![date(2024, 3, 2), date(2024, 1, 15), date(2024, 2, 1)]),
            ),
            Column::new(
                "Debit Amount",
                ColumnData::Number(vec![Some(10.0), Some(0.0), Some(32.5)]),
            ),
            Column::new(
                "Credit Amount",
                ColumnData::Number(vec![Some(0.0), Some(1500.0), Some(0.0)]),
            ),
            Column::new(
                "Category",
                ColumnData::Text(vec![Some("Food".into()), None, Some("Rent".into())]),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_empty_ledger_is_no_data() {
        let summary = analyze(&Ledger::default(), &ColumnMapping::default());
        assert_eq!(summary.transaction_count, 0);
        assert_eq!(summary.period, DateRange::default());
        assert_eq!(summary.total_debit, 0.0);
        assert_eq!(summary.total_credit, 0.0);
        assert!(summary.missing_values.is_empty());
        assert!(summary.summary_stats.is_empty());
        assert_eq!(summary.warning.as_deref(), Some(NO_DATA_WARNING));
        assert!(!summary.has_data());
    }

    #[test]
    fn test_totals_and_period() {
        let summary = analyze(&sample(), &ColumnMapping::default());
        assert!(summary.has_data());
        assert_eq!(summary.transaction_count, 3);
        assert_eq!(summary.period.start, date(2024, 1, 15));
        assert_eq!(summary.period.end, date(2024, 3, 2));
        assert_eq!(summary.total_debit, 42.5);
        assert_eq!(summary.total_credit, 1500.0);
    }

    #[test]
    fn test_missing_values_follow_column_order() {
        let summary = analyze(&sample(), &ColumnMapping::default());
        let missing: Vec<_> = summary
            .missing_values
            .iter()
            .map(|m| (m.column.as_str(), m.missing))
            .collect();
        assert_eq!(
            missing,
            vec![
                ("Transaction Date", 0),
                ("Debit Amount", 0),
                ("Credit Amount", 0),
                ("Category", 1),
            ]
        );
    }

    #[test]
    fn test_stats_only_for_numeric_columns() {
        let summary = analyze(&sample(), &ColumnMapping::default());
        let names: Vec<_> = summary.summary_stats.iter().map(|s| s.column.as_str()).collect();
        assert_eq!(names, vec!["Debit Amount", "Credit Amount"]);
        assert_eq!(summary.summary_stats[0].stats.max, Some(32.5));
    }

    #[test]
    fn test_missing_date_column_gives_null_period() {
        let ledger = Ledger::from_columns(vec![Column::new(
            "Debit Amount",
            ColumnData::Number(vec![Some(1.0)]),
        )])
        .unwrap();
        let summary = analyze(&ledger, &ColumnMapping::default());
        assert_eq!(summary.period, DateRange::default());
        assert_eq!(summary.total_credit, 0.0);
    }

    #[test]
    fn test_analyze_is_repeatable() {
        let ledger = sample();
        let a = analyze(&ledger, &ColumnMapping::default());
        let b = analyze(&ledger, &ColumnMapping::default());
        assert_eq!(a, b);
    }

    #[test]
    fn test_stats_table_lists_rows() {
        let table = analyze(&sample(), &ColumnMapping::default()).stats_table();
        assert!(table.contains("Debit Amount"));
        for row in ["count", "mean", "std", "min", "25%", "50%", "75%", "max"] {
            assert!(table.contains(row), "missing row {row}");
        }
    }

    #[test]
    fn test_summary_serializes_without_warning() {
        let json = serde_json::to_value(analyze(&sample(), &ColumnMapping::default())).unwrap();
        assert!(json.get("warning").is_none());
        assert_eq!(json["period"]["start"], "2024-01-15");
        assert_eq!(json["summary_stats"][0]["count"], 3);
    }
}

//! Normalization of a loaded ledger.
//!
//! After [`normalize`]:
//! - the date column (when present) holds parsed dates only; rows whose date
//!   could not be read are gone,
//! - the debit and credit columns exist and hold a non-negative number in
//!   every row,
//! - column labels carry no surrounding whitespace.
//!
//! Running it on an already normalized ledger changes nothing.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use tally_core::{Column, ColumnData, ColumnMapping, Ledger, Result};
use tracing::{info, warn};

use crate::amount::coerce_amounts;

/// Day/month/year, as written by UK bank exports.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// What normalization changed.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NormalizeReport {
    pub rows_in: usize,
    pub rows_out: usize,
    /// Rows removed because their date could not be parsed.
    pub dropped_rows: usize,
    /// Amount columns that were absent and created as zeros.
    pub created_columns: Vec<String>,
    /// Amount columns that were entirely empty and filled with zeros.
    pub zero_filled_columns: Vec<String>,
    /// Amount columns that could not be processed and were reset to zeros.
    pub reset_columns: Vec<String>,
    /// Per amount column, cells that were zeroed or made non-negative.
    pub repairs: BTreeMap<String, usize>,
}

impl NormalizeReport {
    /// True when normalization had nothing to fix.
    pub fn is_clean(&self) -> bool {
        self.dropped_rows == 0
            && self.created_columns.is_empty()
            && self.zero_filled_columns.is_empty()
            && self.reset_columns.is_empty()
            && self.repairs.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub ledger: Ledger,
    pub report: NormalizeReport,
}

/// Parse a `DD/MM/YYYY` date. The year must be exactly four digits; chrono's
/// `%Y` alone would read `01/02/24` as the year 24.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let (_, year) = raw.rsplit_once('/')?;
    if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT).ok()
}

/// Normalize `ledger` according to the column `mapping`.
pub fn normalize(mut ledger: Ledger, mapping: &ColumnMapping) -> Result<Normalized> {
    let mut report = NormalizeReport {
        rows_in: ledger.row_count(),
        ..Default::default()
    };

    report.dropped_rows = normalize_dates(&mut ledger, &mapping.date)?;

    for label in mapping.amount_labels() {
        normalize_amounts(&mut ledger, label, &mut report)?;
    }

    ledger.trim_labels();

    report.rows_out = ledger.row_count();
    if !report.is_clean() {
        info!(
            "Normalized ledger: {} -> {} rows, {} repaired amount cells",
            report.rows_in,
            report.rows_out,
            report.repairs.values().sum::<usize>()
        );
    }
    Ok(Normalized { ledger, report })
}

/// Parse the date column and drop rows without a valid date. Returns the
/// number of rows dropped.
fn normalize_dates(ledger: &mut Ledger, label: &str) -> Result<usize> {
    let Some(index) = ledger.position(label) else {
        return Ok(0);
    };

    let dates: Vec<Option<NaiveDate>> = match &ledger.columns()[index].data {
        ColumnData::Date(cells) => cells.clone(),
        ColumnData::Text(cells) => cells
            .iter()
            .map(|c| c.as_deref().and_then(parse_date))
            .collect(),
        ColumnData::Number(cells) => vec![None; cells.len()],
    };

    let keep: Vec<bool> = dates.iter().map(Option::is_some).collect();
    ledger.replace_data(index, ColumnData::Date(dates))?;

    let dropped = keep.iter().filter(|k| !**k).count();
    if dropped > 0 {
        warn!("{dropped} rows with unparseable {label:?} values were dropped");
        ledger.retain_rows(&keep)?;
    }
    Ok(dropped)
}

fn normalize_amounts(ledger: &mut Ledger, label: &str, report: &mut NormalizeReport) -> Result<()> {
    let rows = ledger.row_count();

    let Some(index) = ledger.position(label) else {
        warn!("{label} column not found; creating it with zeros");
        ledger.push_column(Column::new(label, ColumnData::zeros(rows)))?;
        report.created_columns.push(label.to_string());
        return Ok(());
    };

    let data = &ledger.columns()[index].data;
    if !data.is_empty() && data.all_null() {
        warn!("{label} column is entirely empty; filling with zeros");
        ledger.replace_data(index, ColumnData::zeros(rows))?;
        report.zero_filled_columns.push(label.to_string());
        return Ok(());
    }

    match coerce_amounts(label, data) {
        Ok(column) => {
            if column.repairs > 0 {
                warn!(
                    "{} values in {label} could not be read as amounts and were set to 0",
                    column.repairs
                );
                report.repairs.insert(label.to_string(), column.repairs);
            }
            ledger.replace_data(index, column.into_data())?;
        }
        Err(e) => {
            warn!("{e}; setting all values in {label} to 0");
            ledger.replace_data(index, ColumnData::zeros(rows))?;
            report.reset_columns.push(label.to_string());
        }
    }
    Ok(())
}

//! Load a CSV ledger export into an in-memory [`Ledger`].
//!
//! The first non-blank row is the header. Empty cells become nulls, and a
//! column whose non-empty cells all read as finite numbers is loaded as a
//! number column; everything else stays text for the normalizer to coerce.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tally_core::{Column, ColumnData, Ledger, LedgerError, Result};
use tracing::debug;

/// Load the CSV file at `path`.
///
/// Fails with [`LedgerError::DataSource`] when the file cannot be opened and
/// [`LedgerError::EmptyData`] when it has no header row.
pub fn load_csv(path: impl AsRef<Path>) -> Result<Ledger> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| LedgerError::DataSource {
        path: path.to_path_buf(),
        source,
    })?;
    load_reader(file, &path.display().to_string())
}

/// Load CSV data from any reader. `origin` names the source in errors and logs.
pub fn load_reader<R: Read>(reader: R, origin: &str) -> Result<Ledger> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(false)
        .from_reader(reader);

    let mut records = rdr.records();

    let header = loop {
        match records.next() {
            None => return Err(LedgerError::EmptyData(origin.to_string())),
            Some(record) => {
                let record = record?;
                if is_blank(&record) {
                    continue;
                }
                break record;
            }
        }
    };

    let labels: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(i, label)| {
            if i == 0 {
                label.trim_start_matches('\u{feff}').to_string()
            } else {
                label.to_string()
            }
        })
        .collect();

    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); labels.len()];
    for record in records {
        let record = record?;
        // csv already skips empty lines. A lone empty field is a real row in
        // a single-column ledger.
        if record.is_empty() {
            continue;
        }
        // Ragged rows are padded with nulls or cut to the header width.
        for (i, column) in cells.iter_mut().enumerate() {
            let cell = record.get(i).filter(|s| !s.is_empty()).map(str::to_string);
            column.push(cell);
        }
    }

    let columns: Vec<Column> = labels
        .into_iter()
        .zip(cells)
        .map(|(label, values)| Column::new(label, infer(values)))
        .collect();

    let ledger = Ledger::from_columns(columns)?;
    debug!(
        "Loaded {} rows x {} columns from {}",
        ledger.row_count(),
        ledger.column_count(),
        origin
    );
    for column in ledger.columns() {
        debug!("  {:?}: {:?}", column.label, column.data.kind());
    }
    Ok(ledger)
}

/// A whitespace-only line ahead of the header.
fn is_blank(record: &csv::StringRecord) -> bool {
    record.len() == 1 && record.get(0).is_some_and(|s| s.trim().is_empty())
}

fn infer(values: Vec<Option<String>>) -> ColumnData {
    let mut numbers = Vec::with_capacity(values.len());
    let mut any = false;
    for v in &values {
        match v {
            None => numbers.push(None),
            Some(s) => match s.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => {
                    any = true;
                    numbers.push(Some(n));
                }
                _ => return ColumnData::Text(values),
            },
        }
    }
    if any {
        ColumnData::Number(numbers)
    } else {
        ColumnData::Text(values)
    }
}

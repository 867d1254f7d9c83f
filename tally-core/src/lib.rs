//! tally-core: ledger data model, column mapping, session configuration, and
//! the deterministic analysis over a normalized ledger.

pub mod analysis;
pub mod columns;
pub mod config;
pub mod error;
pub mod ledger;
pub mod stats;

pub use analysis::{analyze, AnalysisSummary, ColumnStats, DateRange, MissingCount, NO_DATA_WARNING};
pub use columns::ColumnMapping;
pub use config::{RetryPolicy, SessionConfig};
pub use error::{LedgerError, Result};
pub use ledger::{Column, ColumnData, ColumnKind, Ledger};
pub use stats::DescriptiveStats;

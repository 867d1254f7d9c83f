//! tally-ingest: CSV ledger loading and normalization.

pub mod amount;
pub mod loader;
pub mod normalizer;

pub use amount::{parse_amount, AmountOutcome};
pub use loader::{load_csv, load_reader};
pub use normalizer::{normalize, NormalizeReport, Normalized};

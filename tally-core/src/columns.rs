//! Logical ledger columns and their source labels.

use serde::{Deserialize, Serialize};

/// Maps the logical columns of a ledger to the labels used in the source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub date: String,
    pub debit: String,
    pub credit: String,
    pub transaction_type: String,
    pub description: String,
    pub category: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            date: "Transaction Date".to_string(),
            debit: "Debit Amount".to_string(),
            credit: "Credit Amount".to_string(),
            transaction_type: "Transaction Type".to_string(),
            description: "Transaction Description".to_string(),
            category: "Category".to_string(),
        }
    }
}

impl ColumnMapping {
    /// The two amount columns, debit first.
    pub fn amount_labels(&self) -> [&str; 2] {
        [&self.debit, &self.credit]
    }
}

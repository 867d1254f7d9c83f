//! Descriptive statistics over a numeric column.

use serde::{Deserialize, Serialize};

/// Compute the `p`-th percentile of a **sorted** slice using linear
/// interpolation between the closest ranks.
///
/// Returns `None` for an empty slice.
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = (p / 100.0) * (sorted.len() as f64 - 1.0);
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return Some(sorted[lo]);
    }
    let frac = rank - lo as f64;
    Some(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator); undefined below two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() as f64 - 1.0)).sqrt())
}

/// count / mean / std / min / quartiles / max of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveStats {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

impl DescriptiveStats {
    /// Summarise the non-null cells of a column.
    pub fn from_cells(cells: &[Option<f64>]) -> Self {
        let mut values: Vec<f64> = cells.iter().flatten().copied().collect();
        values.sort_by(|a, b| a.total_cmp(b));

        Self {
            count: values.len(),
            mean: mean(&values),
            std: sample_std(&values),
            min: values.first().copied(),
            q25: percentile(&values, 25.0),
            median: percentile(&values, 50.0),
            q75: percentile(&values, 75.0),
            max: values.last().copied(),
        }
    }

    /// Rows in `describe()` order, label first.
    pub fn rows(&self) -> [(&'static str, Option<f64>); 8] {
        [
            ("count", Some(self.count as f64)),
            ("mean", self.mean),
            ("std", self.std),
            ("min", self.min),
            ("25%", self.q25),
            ("50%", self.median),
            ("75%", self.q75),
            ("max", self.max),
        ]
    }
}

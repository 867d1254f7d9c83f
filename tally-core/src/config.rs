//! Explicit configuration handed to an analysis session.

use std::path::PathBuf;
use std::time::Duration;

use crate::columns::ColumnMapping;

pub const DEFAULT_PLOTS_DIR: &str = "plots";
pub const DEFAULT_REPORT_DIR: &str = "report";
pub const DEFAULT_LLM_MODEL: &str = "llama2";
pub const DEFAULT_JUDGE_MODEL: &str = "mistral";
pub const REPORT_FILE_NAME: &str = "analysis_report.md";

/// Bounded retry with a fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub plots_dir: PathBuf,
    pub report_dir: PathBuf,
    /// Model used for the narrative.
    pub llm_model: String,
    /// Model used to review the narrative.
    pub judge_model: String,
    pub columns: ColumnMapping,
    pub judge_retry: RetryPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            plots_dir: PathBuf::from(DEFAULT_PLOTS_DIR),
            report_dir: PathBuf::from(DEFAULT_REPORT_DIR),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            judge_model: DEFAULT_JUDGE_MODEL.to_string(),
            columns: ColumnMapping::default(),
            judge_retry: RetryPolicy::default(),
        }
    }
}

impl SessionConfig {
    pub fn report_path(&self) -> PathBuf {
        self.report_dir.join(REPORT_FILE_NAME)
    }
}

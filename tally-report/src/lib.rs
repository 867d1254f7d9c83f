//! tally-report: charts, LLM narrative and review, and Markdown report
//! assembly over a normalized ledger.

pub mod charts;
pub mod insights;
pub mod llm;
pub mod report;
pub mod session;

pub use charts::{Chart, ChartSet, Visualizer};
pub use insights::{Generated, SERVICE_UNAVAILABLE};
pub use llm::{GenerateError, OllamaClient, TextGenerator};
pub use session::AnalysisSession;

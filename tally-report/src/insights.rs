//! Narrative and judge stages: prompt construction and the calls around them.
//!
//! Neither stage fails. When the generation service cannot help, they return
//! a [`Generated::Fallback`] the report renders as a warning.

use tally_core::{AnalysisSummary, RetryPolicy, NO_DATA_WARNING};
use tracing::{info, warn};

use crate::llm::{GenerateError, TextGenerator};
use crate::report::{format_date, format_money};

pub const SERVICE_UNAVAILABLE: &str =
    "LLM service is currently unavailable. Please ensure Ollama is running and accessible.";

/// Output of a generation stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generated {
    Text(String),
    Fallback(String),
}

impl Generated {
    pub fn as_str(&self) -> &str {
        match self {
            Generated::Text(s) | Generated::Fallback(s) => s,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Generated::Fallback(_))
    }
}

pub fn narrative_prompt(summary: &AnalysisSummary) -> String {
    format!(
        "Analyze the following transaction data structure and provide insights:\n\
         {stats}\n\
         Key observations from the data:\n\
         1. Number of transactions: {count}\n\
         2. Time period covered: {start} to {end}\n\
         3. Total amount: {total}\n\n\
         Please provide:\n\
         1. 3-5 key insights about spending patterns and financial behavior\n\
         2. Any notable trends in transaction volume\n\
         3. Recommendations for financial optimization\n\n\
         Format your response in markdown format with clear sections.\n",
        stats = summary.stats_table(),
        count = summary.transaction_count,
        start = format_date(summary.period.start),
        end = format_date(summary.period.end),
        total = format_money(summary.total_debit),
    )
}

pub fn judge_prompt(summary: &AnalysisSummary, narrative: &str) -> String {
    let analysis = serde_json::to_string_pretty(summary).unwrap_or_else(|_| format!("{summary:?}"));
    format!(
        "Evaluate the following data analysis and LLM-generated insights:\n\n\
         Data Analysis:\n{analysis}\n\n\
         Generated Insights:\n{narrative}\n\n\
         Please provide:\n\
         1. Evaluation of the accuracy and relevance of the insights\n\
         2. Suggestions for improvement in the analysis\n\
         3. Overall assessment of the financial recommendations\n\n\
         Format your response in markdown format with clear sections.\n"
    )
}

/// Ask `generator` for a narrative of `summary`. One attempt.
pub async fn narrative<G: TextGenerator>(generator: &G, model: &str, summary: &AnalysisSummary) -> Generated {
    if !summary.has_data() {
        return Generated::Fallback(NO_DATA_WARNING.to_string());
    }
    if !generator.is_available().await {
        return Generated::Fallback(SERVICE_UNAVAILABLE.to_string());
    }

    info!("Generating narrative with {model}");
    match generator.generate(model, &narrative_prompt(summary)).await {
        Ok(text) => Generated::Text(text),
        Err(e) => {
            warn!("Error generating LLM insights: {e}");
            Generated::Fallback(format!("Error generating LLM insights: {e}"))
        }
    }
}

/// Ask `generator` to review `narrative`.
///
/// Connectivity failures, including a failed probe, are retried up to
/// `retry.max_attempts` attempts with `retry.delay` between them. A malformed
/// response ends the stage at once. When attempts run out, the fallback
/// carries the last generation error, or the unavailable notice if the last
/// attempt failed its probe.
pub async fn judge<G: TextGenerator>(
    generator: &G,
    model: &str,
    retry: RetryPolicy,
    summary: &AnalysisSummary,
    narrative: &Generated,
) -> Generated {
    let prompt = judge_prompt(summary, narrative.as_str());
    let max_attempts = retry.max_attempts.max(1);

    // Cause of the latest attempt, when the probe passed and generation failed.
    let mut last_error: Option<GenerateError> = None;

    for attempt in 1..=max_attempts {
        if generator.is_available().await {
            info!("Generating judge evaluation with {model} (attempt {attempt}/{max_attempts})");
            match generator.generate(model, &prompt).await {
                Ok(text) => return Generated::Text(text),
                Err(e) if e.is_retryable() => {
                    warn!("Error generating judge evaluation (attempt {attempt}/{max_attempts}): {e}");
                    last_error = Some(e);
                }
                Err(e) => {
                    warn!("Error generating judge evaluation: {e}");
                    return Generated::Fallback(format!("Error generating judge evaluation: {e}"));
                }
            }
        } else {
            warn!("Generation service did not answer the probe (attempt {attempt}/{max_attempts})");
            last_error = None;
        }

        if attempt < max_attempts {
            info!("Retrying in {:?}...", retry.delay);
            tokio::time::sleep(retry.delay).await;
        }
    }

    match last_error {
        Some(e) => Generated::Fallback(format!("Error generating judge evaluation: {e}")),
        None => Generated::Fallback(SERVICE_UNAVAILABLE.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};
    use tally_core::DateRange;

    /// Replays queued responses; answers "done" once the queue is empty.
    struct Scripted {
        up: bool,
        responses: Mutex<VecDeque<Result<String, GenerateError>>>,
        probes: AtomicUsize,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(up: bool, responses: Vec<Result<String, GenerateError>>) -> Self {
            Self {
                up,
                responses: Mutex::new(responses.into()),
                probes: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl TextGenerator for Scripted {
        async fn is_available(&self) -> bool {
            self.probes.fetch_add(1, Ordering::SeqCst);
            self.up
        }

        async fn generate(&self, _model: &str, _prompt: &str) -> Result<String, GenerateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("done".to_string()))
        }
    }

    fn down() -> Result<String, GenerateError> {
        Err(GenerateError::Unavailable("connection refused".to_string()))
    }

    fn policy(ms: u64) -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_millis(ms),
        }
    }

    fn summary() -> AnalysisSummary {
        AnalysisSummary {
            transaction_count: 2,
            period: DateRange {
                start: NaiveDate::from_ymd_opt(2025, 1, 2),
                end: NaiveDate::from_ymd_opt(2025, 1, 9),
            },
            total_debit: 1234.5,
            total_credit: 0.0,
            missing_values: Vec::new(),
            summary_stats: Vec::new(),
            warning: None,
        }
    }

    #[tokio::test]
    async fn test_judge_gives_up_after_three_attempts() {
        let generator = Scripted::new(true, vec![down(), down(), down(), down()]);
        let out = judge(&generator, "mistral", policy(5), &summary(), &Generated::Text("n".into())).await;
        assert_eq!(
            out,
            Generated::Fallback(
                "Error generating judge evaluation: generation service unavailable: connection refused"
                    .to_string()
            )
        );
        assert_eq!(generator.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_judge_recovers_on_second_attempt() {
        let generator = Scripted::new(true, vec![down(), Ok("looks sound".to_string())]);
        let started = Instant::now();
        let out = judge(&generator, "mistral", policy(40), &summary(), &Generated::Text("n".into())).await;
        assert_eq!(out, Generated::Text("looks sound".to_string()));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_judge_retries_failed_probe() {
        let generator = Scripted::new(false, vec![]);
        let out = judge(&generator, "mistral", policy(1), &summary(), &Generated::Text("n".into())).await;
        assert_eq!(out, Generated::Fallback(SERVICE_UNAVAILABLE.to_string()));
        assert_eq!(generator.probes.load(Ordering::SeqCst), 3);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_judge_does_not_retry_malformed() {
        let generator = Scripted::new(true, vec![Err(GenerateError::Malformed("not json".into()))]);
        let out = judge(&generator, "mistral", policy(1), &summary(), &Generated::Text("n".into())).await;
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
        assert!(out.as_str().starts_with("Error generating judge evaluation"));
    }

    #[tokio::test]
    async fn test_narrative_paths() {
        let up = Scripted::new(true, vec![Ok("## Insights".to_string())]);
        assert_eq!(
            narrative(&up, "llama2", &summary()).await,
            Generated::Text("## Insights".to_string())
        );

        let no_data = narrative(&up, "llama2", &AnalysisSummary::no_data()).await;
        assert_eq!(no_data, Generated::Fallback(NO_DATA_WARNING.to_string()));

        let offline = Scripted::new(false, vec![]);
        assert_eq!(
            narrative(&offline, "llama2", &summary()).await,
            Generated::Fallback(SERVICE_UNAVAILABLE.to_string())
        );
        assert_eq!(offline.calls.load(Ordering::SeqCst), 0);

        let failing = Scripted::new(true, vec![down()]);
        assert!(narrative(&failing, "llama2", &summary()).await.is_fallback());
    }

    #[test]
    fn test_prompts_carry_the_summary() {
        let prompt = narrative_prompt(&summary());
        assert!(prompt.contains("Number of transactions: 2"));
        assert!(prompt.contains("2025-01-02 to 2025-01-09"));
        assert!(prompt.contains("£1,234.50"));

        let judge = judge_prompt(&summary(), "spend less on coffee");
        assert!(judge.contains("\"transaction_count\": 2"));
        assert!(judge.contains("spend less on coffee"));
    }
}

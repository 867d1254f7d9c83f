//! One analysis run over one ledger file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use tally_core::{analyze, AnalysisSummary, Ledger, SessionConfig};
use tally_ingest::{load_csv, normalize, NormalizeReport, Normalized};
use tracing::info;

use crate::charts::{ChartSet, Visualizer};
use crate::insights::{self, Generated};
use crate::llm::TextGenerator;
use crate::report::{render_report, write_report};

/// Owns the normalized ledger and the configuration it was built with.
/// Every downstream stage only borrows the ledger.
#[derive(Debug, Clone)]
pub struct AnalysisSession {
    config: SessionConfig,
    ledger: Ledger,
    normalize_report: NormalizeReport,
}

impl AnalysisSession {
    /// Load and normalize the CSV at `csv_path`.
    pub fn open(csv_path: impl AsRef<Path>, config: SessionConfig) -> Result<Self> {
        let csv_path = csv_path.as_ref();
        info!("Loading data from {}", csv_path.display());
        let raw = load_csv(csv_path).with_context(|| format!("Error loading data from {}", csv_path.display()))?;
        Self::from_ledger(raw, config)
    }

    /// Normalize an already loaded ledger.
    pub fn from_ledger(raw: Ledger, config: SessionConfig) -> Result<Self> {
        let Normalized { ledger, report } =
            normalize(raw, &config.columns).context("Error preprocessing data")?;
        info!(
            "Ledger ready: {} transactions, {} columns",
            ledger.row_count(),
            ledger.column_count()
        );
        Ok(Self {
            config,
            ledger,
            normalize_report: report,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn normalize_report(&self) -> &NormalizeReport {
        &self.normalize_report
    }

    pub fn analyze(&self) -> AnalysisSummary {
        analyze(&self.ledger, &self.config.columns)
    }

    pub fn visualize(&self) -> Result<ChartSet> {
        Visualizer::new(&self.config.plots_dir, &self.config.columns)
            .render(&self.ledger)
            .context("Error generating visualizations")
    }

    pub async fn narrative<G: TextGenerator>(&self, generator: &G, summary: &AnalysisSummary) -> Generated {
        insights::narrative(generator, &self.config.llm_model, summary).await
    }

    pub async fn judge<G: TextGenerator>(
        &self,
        generator: &G,
        summary: &AnalysisSummary,
        narrative: &Generated,
    ) -> Generated {
        insights::judge(
            generator,
            &self.config.judge_model,
            self.config.judge_retry,
            summary,
            narrative,
        )
        .await
    }

    /// Run every stage and write the report. Returns the report path.
    pub async fn generate_report<G: TextGenerator>(&self, generator: &G) -> Result<PathBuf> {
        let summary = self.analyze();
        let charts = self.visualize()?;
        let narrative = self.narrative(generator, &summary).await;
        let review = self.judge(generator, &summary, &narrative).await;

        let markdown = render_report(
            Local::now().naive_local(),
            &summary,
            &charts,
            &narrative,
            &review,
        );

        let path = self.config.report_path();
        write_report(&path, &markdown).context("Error generating report")?;
        info!("Report generated at {}", path.display());
        Ok(path)
    }
}

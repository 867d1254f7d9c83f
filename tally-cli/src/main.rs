use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

use tally_core::AnalysisSummary;
use tally_ingest::NormalizeReport;
use tally_report::report::{format_date, format_money};
use tally_report::{AnalysisSession, OllamaClient};

mod bootstrap;
mod config;

use config::{load_config, Config, Overrides, DEFAULT_CONFIG_FILE};

#[derive(Parser, Debug)]
#[command(name = "tally", version, about = "Bank ledger analysis and reporting")]
struct Cli {
    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a ledger CSV, render charts and write the Markdown report
    Report {
        /// Path to the ledger CSV
        csv: PathBuf,

        /// Directory for chart files
        #[arg(long, env = "PLOTS_DIR")]
        plots_dir: Option<PathBuf>,

        /// Directory for the report
        #[arg(long, env = "REPORT_DIR")]
        report_dir: Option<PathBuf>,

        /// Model that writes the narrative
        #[arg(long, env = "LLM_MODEL")]
        llm_model: Option<String>,

        /// Model that reviews the narrative
        #[arg(long, env = "JUDGE_MODEL")]
        judge_model: Option<String>,

        /// Ollama server address
        #[arg(long, env = "OLLAMA_HOST")]
        ollama_host: Option<String>,

        /// Config file (defaults to ./tally.toml if present)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the analysis summary without charts or LLM calls
    Analyze {
        /// Path to the ledger CSV
        csv: PathBuf,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,

        /// Config file (defaults to ./tally.toml if present)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Write a default config file
    InitConfig {
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        path: PathBuf,
    },
}

#[derive(Serialize)]
struct AnalyzeOutput<'a> {
    summary: &'a AnalysisSummary,
    normalization: &'a NormalizeReport,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    bootstrap::setup_logging(&cli.log_level);

    match cli.command {
        Command::Report {
            csv,
            plots_dir,
            report_dir,
            llm_model,
            judge_model,
            ollama_host,
            config,
        } => {
            let mut cfg = load_config(config.as_deref())?;
            cfg.apply(Overrides {
                plots_dir,
                report_dir,
                llm_model,
                judge_model,
                ollama_host,
            });
            let path = run_report(&csv, &cfg).await?;
            println!("Report generated successfully at: {}", path.display());
        }

        Command::Analyze { csv, json, config } => {
            let cfg = load_config(config.as_deref())?;
            let session = AnalysisSession::open(&csv, cfg.session_config())?;
            let summary = session.analyze();
            if json {
                let out = AnalyzeOutput {
                    summary: &summary,
                    normalization: session.normalize_report(),
                };
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                print_summary(&summary, session.normalize_report());
            }
        }

        Command::InitConfig { path } => {
            config::init_config(&path)?;
        }
    }

    Ok(())
}

async fn run_report(csv: &Path, cfg: &Config) -> Result<PathBuf> {
    let client = OllamaClient::new(&cfg.llm.host, cfg.request_timeout())
        .context("building Ollama client")?;
    tracing::debug!("Using Ollama at {}", client.base_url());

    let session = AnalysisSession::open(csv, cfg.session_config())?;
    session.generate_report(&client).await
}

fn print_summary(summary: &AnalysisSummary, norm: &NormalizeReport) {
    if let Some(w) = &summary.warning {
        println!("Warning: {w}");
        return;
    }

    println!("Transactions: {}", summary.transaction_count);
    println!(
        "Period:       {} to {}",
        format_date(summary.period.start),
        format_date(summary.period.end)
    );
    println!("Total debit:  {}", format_money(summary.total_debit));
    println!("Total credit: {}", format_money(summary.total_credit));

    println!("\nSummary statistics:");
    println!("{}", summary.stats_table());

    let missing: Vec<_> = summary.missing_values.iter().filter(|m| m.missing > 0).collect();
    if !missing.is_empty() {
        println!("\nMissing values:");
        for m in missing {
            println!("  {}: {}", m.column, m.missing);
        }
    }

    if !norm.is_clean() {
        println!(
            "\nNormalization: {} rows in, {} kept, {} dropped",
            norm.rows_in, norm.rows_out, norm.dropped_rows
        );
        for (column, n) in &norm.repairs {
            println!("  repaired {n} value(s) in {column}");
        }
        for column in &norm.created_columns {
            println!("  created {column} as zeros");
        }
        for column in &norm.zero_filled_columns {
            println!("  filled empty {column} with zeros");
        }
        for column in &norm.reset_columns {
            println!("  reset unreadable {column} to zeros");
        }
    }
}

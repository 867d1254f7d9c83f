//! Markdown report assembly.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use tally_core::AnalysisSummary;

use crate::charts::ChartSet;
use crate::insights::Generated;

pub const REPORT_TITLE: &str = "# Bank Transaction Analysis Report";

/// `£1,234.50`; negative values keep their sign in front of the symbol.
pub fn format_money(v: f64) -> String {
    let fixed = format!("{:.2}", v.abs());
    let (int, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::new();
    for (i, ch) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if v < 0.0 { "-" } else { "" };
    format!("{sign}£{grouped}.{frac}")
}

pub fn format_date(d: Option<NaiveDate>) -> String {
    d.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Render the whole report. Pure apart from the caller-supplied timestamp.
pub fn render_report(
    generated_at: NaiveDateTime,
    summary: &AnalysisSummary,
    charts: &ChartSet,
    narrative: &Generated,
    judge: &Generated,
) -> String {
    let mut out = String::new();
    out.push_str(REPORT_TITLE);
    out.push_str("\n\n");
    out.push_str(&format!(
        "Generated on: {}\n\n",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    ));

    write_structure_analysis(&mut out, summary);
    write_visualizations(&mut out, charts);
    write_generated(&mut out, "## LLM Insights", narrative);
    write_generated(&mut out, "## Expert Review", judge);
    out
}

/// Write `contents` to `path`, creating the parent directory.
pub fn write_report(path: &Path, contents: &str) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

fn warning(out: &mut String, message: &str) {
    out.push_str(&format!("**Warning:** {message}\n\n"));
}

fn cell(s: &str) -> String {
    s.replace('|', "\\|")
}

fn write_structure_analysis(out: &mut String, summary: &AnalysisSummary) {
    out.push_str("## Data Structure Analysis\n\n");

    if let Some(message) = &summary.warning {
        warning(out, message);
        return;
    }

    out.push_str(&format!(
        "Number of transactions: {}\n\n",
        summary.transaction_count
    ));
    out.push_str(&format!(
        "Time period: {} to {}\n\n",
        format_date(summary.period.start),
        format_date(summary.period.end)
    ));
    out.push_str(&format!(
        "Total debit: {}\n\n",
        format_money(summary.total_debit)
    ));
    out.push_str(&format!(
        "Total credit: {}\n\n",
        format_money(summary.total_credit)
    ));

    out.push_str("### Missing Values\n\n");
    out.push_str("| Column | Missing |\n|---|---:|\n");
    for m in &summary.missing_values {
        out.push_str(&format!("| {} | {} |\n", cell(&m.column), m.missing));
    }
    out.push('\n');

    out.push_str("### Summary Statistics\n\n");
    if summary.summary_stats.is_empty() {
        out.push_str("No numeric columns.\n\n");
        return;
    }

    out.push_str("| Statistic |");
    for c in &summary.summary_stats {
        out.push_str(&format!(" {} |", cell(&c.column)));
    }
    out.push_str("\n|---|");
    out.push_str(&"---:|".repeat(summary.summary_stats.len()));
    out.push('\n');

    let labels = summary.summary_stats[0].stats.rows().map(|(name, _)| name);
    for (i, name) in labels.iter().enumerate() {
        out.push_str(&format!("| {name} |"));
        for c in &summary.summary_stats {
            match c.stats.rows()[i].1 {
                Some(v) => out.push_str(&format!(" {v:.2} |")),
                None => out.push_str(" NaN |"),
            }
        }
        out.push('\n');
    }
    out.push('\n');
}

fn write_visualizations(out: &mut String, charts: &ChartSet) {
    out.push_str("## Visualizations\n\n");

    match charts {
        ChartSet::NoData(message) => warning(out, message),
        ChartSet::Rendered(charts) => {
            for chart in charts {
                out.push_str(&format!("### {}\n\n", chart.title()));
                out.push_str(&format!("![{}]({})\n\n", chart.name, chart.path.display()));
            }
        }
    }
}

fn write_generated(out: &mut String, heading: &str, generated: &Generated) {
    out.push_str(heading);
    out.push_str("\n\n");
    match generated {
        Generated::Text(text) => {
            out.push_str(text);
            out.push_str("\n\n");
        }
        Generated::Fallback(message) => warning(out, message),
    }
}

//! Bar charts over a normalized ledger, rendered to SVG.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Datelike;
use svg::{
    Document,
    node::element::{Line, Rectangle, Text},
};
use tally_core::{ColumnMapping, Ledger};
use tracing::info;

pub const NO_DATA_WARNING: &str = "No data available for visualization";
pub const TOP_CATEGORIES: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub name: String,
    pub path: PathBuf,
}

impl Chart {
    /// `monthly_volume` -> `Monthly Volume`.
    pub fn title(&self) -> String {
        self.name
            .split('_')
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartSet {
    NoData(String),
    Rendered(Vec<Chart>),
}

/// Transactions per calendar month, oldest first. `None` without a date column.
pub fn monthly_counts(ledger: &Ledger, date_label: &str) -> Option<Vec<(String, f64)>> {
    let dates = ledger.dates(date_label)?;
    let mut months: BTreeMap<(i32, u32), usize> = BTreeMap::new();
    for d in dates.iter().flatten() {
        *months.entry((d.year(), d.month())).or_insert(0) += 1;
    }
    Some(
        months
            .into_iter()
            .map(|((y, m), n)| (format!("{y:04}-{m:02}"), n as f64))
            .collect(),
    )
}

/// Occurrences of each value of `label`, most frequent first.
pub fn value_counts(ledger: &Ledger, label: &str) -> Option<Vec<(String, f64)>> {
    let column = ledger.column(label)?;
    let mut counts: HashMap<String, usize> = HashMap::new();
    for row in 0..ledger.row_count() {
        if let Some(v) = column.data.display(row) {
            *counts.entry(v).or_insert(0) += 1;
        }
    }
    let mut out: Vec<(String, f64)> = counts.into_iter().map(|(k, n)| (k, n as f64)).collect();
    sort_descending(&mut out);
    Some(out)
}

/// Debit totals per category, largest `n` first.
///
/// Groups by the category column, or by description when the ledger has no
/// category column.
pub fn top_debit_groups(ledger: &Ledger, mapping: &ColumnMapping, n: usize) -> Option<Vec<(String, f64)>> {
    let key = ledger
        .column(&mapping.category)
        .or_else(|| ledger.column(&mapping.description))?;
    let debits = ledger.numbers(&mapping.debit)?;

    let mut totals: HashMap<String, f64> = HashMap::new();
    for (row, debit) in debits.iter().enumerate() {
        if let Some(k) = key.data.display(row) {
            *totals.entry(k).or_insert(0.0) += debit.unwrap_or(0.0);
        }
    }
    let mut out: Vec<(String, f64)> = totals.into_iter().collect();
    sort_descending(&mut out);
    out.truncate(n);
    Some(out)
}

fn sort_descending(bars: &mut [(String, f64)]) {
    bars.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
}

/// A labelled bar chart.
#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub bars: Vec<(String, f64)>,
    /// Rotate category labels, for long names.
    pub rotate_labels: bool,
}

const WIDTH: f64 = 1200.0;
const HEIGHT: f64 = 600.0;
const MARGIN_LEFT: f64 = 90.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 60.0;
const MARGIN_BOTTOM: f64 = 140.0;
const Y_TICKS: usize = 5;
const BAR_COLOR: &str = "steelblue";

impl BarChart {
    pub fn new(title: &str, x_label: &str, y_label: &str, bars: Vec<(String, f64)>) -> Self {
        Self {
            title: title.to_string(),
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            bars,
            rotate_labels: false,
        }
    }

    pub fn rotated(mut self) -> Self {
        self.rotate_labels = true;
        self
    }

    pub fn to_document(&self) -> Document {
        let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
        let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
        let base_y = MARGIN_TOP + plot_h;

        let max = self.bars.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max);
        let scale = if max > 0.0 { plot_h / max } else { 0.0 };

        let mut doc = Document::new()
            .set("viewBox", (0.0, 0.0, WIDTH, HEIGHT))
            .set("width", WIDTH)
            .set("height", HEIGHT)
            .add(
                Rectangle::new()
                    .set("width", WIDTH)
                    .set("height", HEIGHT)
                    .set("fill", "white"),
            )
            .add(label(WIDTH / 2.0, MARGIN_TOP / 2.0, &self.title, 20.0))
            .add(label(
                MARGIN_LEFT + plot_w / 2.0,
                HEIGHT - 15.0,
                &self.x_label,
                14.0,
            ))
            .add(
                label(20.0, MARGIN_TOP + plot_h / 2.0, &self.y_label, 14.0)
                    .set("transform", format!("rotate(-90 20 {})", MARGIN_TOP + plot_h / 2.0)),
            );

        for i in 0..=Y_TICKS {
            let value = max * i as f64 / Y_TICKS as f64;
            let y = base_y - value * scale;
            doc = doc
                .add(axis(MARGIN_LEFT - 5.0, y, MARGIN_LEFT, y))
                .add(label(MARGIN_LEFT - 10.0, y + 4.0, &format_tick(value), 11.0).set("text-anchor", "end"));
        }

        let slot = if self.bars.is_empty() {
            plot_w
        } else {
            plot_w / self.bars.len() as f64
        };
        for (i, (name, value)) in self.bars.iter().enumerate() {
            let x = MARGIN_LEFT + slot * i as f64 + slot * 0.1;
            let h = value * scale;
            let center = x + slot * 0.4;
            doc = doc.add(
                Rectangle::new()
                    .set("x", x)
                    .set("y", base_y - h)
                    .set("width", slot * 0.8)
                    .set("height", h)
                    .set("fill", BAR_COLOR),
            );
            let tick = if self.rotate_labels {
                label(center, base_y + 15.0, name, 11.0)
                    .set("text-anchor", "end")
                    .set("transform", format!("rotate(-45 {center} {})", base_y + 15.0))
            } else {
                label(center, base_y + 18.0, name, 11.0)
            };
            doc = doc.add(tick);
        }

        doc.add(axis(MARGIN_LEFT, MARGIN_TOP, MARGIN_LEFT, base_y))
            .add(axis(MARGIN_LEFT, base_y, WIDTH - MARGIN_RIGHT, base_y))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        svg::save(path, &self.to_document()).with_context(|| format!("write {}", path.display()))
    }
}

fn label(x: f64, y: f64, content: &str, size: f64) -> Text {
    Text::new()
        .set("x", x)
        .set("y", y)
        .set("font-family", "sans-serif")
        .set("font-size", size)
        .set("text-anchor", "middle")
        .add(svg::node::Text::new(escape(content)))
}

fn axis(x1: f64, y1: f64, x2: f64, y2: f64) -> Line {
    Line::new()
        .set("x1", x1)
        .set("y1", y1)
        .set("x2", x2)
        .set("y2", y2)
        .set("stroke", "black")
        .set("stroke-width", 1.5)
}

fn format_tick(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        format!("{v:.1}")
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Writes the ledger's charts into a directory.
pub struct Visualizer<'a> {
    plots_dir: &'a Path,
    mapping: &'a ColumnMapping,
}

impl<'a> Visualizer<'a> {
    pub fn new(plots_dir: &'a Path, mapping: &'a ColumnMapping) -> Self {
        Self { plots_dir, mapping }
    }

    /// Render every chart the ledger has data for. Any chart that cannot be
    /// written fails the whole call.
    pub fn render(&self, ledger: &Ledger) -> Result<ChartSet> {
        if ledger.is_empty() {
            return Ok(ChartSet::NoData(NO_DATA_WARNING.to_string()));
        }

        let mut planned: Vec<(&str, BarChart)> = Vec::new();
        if let Some(bars) = monthly_counts(ledger, &self.mapping.date) {
            planned.push((
                "monthly_volume",
                BarChart::new("Monthly Transaction Volume", "Month", "Number of Transactions", bars),
            ));
        }
        if let Some(bars) = value_counts(ledger, &self.mapping.transaction_type) {
            planned.push((
                "type_distribution",
                BarChart::new(
                    "Transaction Type Distribution",
                    "Transaction Type",
                    "Number of Transactions",
                    bars,
                ),
            ));
        }
        if let Some(bars) = top_debit_groups(ledger, self.mapping, TOP_CATEGORIES) {
            planned.push((
                "top_categories",
                BarChart::new("Top 10 Categories by Amount", "Category", "Amount", bars).rotated(),
            ));
        }

        fs::create_dir_all(self.plots_dir)
            .with_context(|| format!("create {}", self.plots_dir.display()))?;

        let mut charts = Vec::new();
        for (name, chart) in planned {
            let path = self.plots_dir.join(format!("{name}.svg"));
            chart
                .save(&path)
                .with_context(|| format!("Error creating plot {name}"))?;
            info!("Saved {} to {}", chart.title, path.display());
            charts.push(Chart {
                name: name.to_string(),
                path,
            });
        }
        Ok(ChartSet::Rendered(charts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tally_core::{Column, ColumnData};

    fn text(values: &[&str]) -> ColumnData {
        ColumnData::Text(values.iter().map(|v| Some(v.to_string())).collect())
    }

    fn ledger() -> Ledger {
        let d = |m, day| NaiveDate::from_ymd_opt(2025, m, day);
        Ledger::from_columns(vec![
            Column::new(
                "Transaction Date",
                ColumnData::Date(vec![d(1, 2), d(1, 20), d(2, 3), d(3, 9)]),
            ),
            Column::new("Transaction Type", text(&["DEB", "DD", "DEB", "DEB"])),
            Column::new("Transaction Description", text(&["TESCO", "RENT", "TESCO", "M&S"])),
            Column::new(
                "Debit Amount",
                ColumnData::Number(vec![Some(10.0), Some(900.0), Some(5.5), Some(20.0)]),
            ),
            Column::new("Credit Amount", ColumnData::zeros(4)),
        ])
        .unwrap()
    }

    #[test]
    fn test_monthly_counts_in_order() {
        let bars = monthly_counts(&ledger(), "Transaction Date").unwrap();
        assert_eq!(
            bars,
            vec![
                ("2025-01".to_string(), 2.0),
                ("2025-02".to_string(), 1.0),
                ("2025-03".to_string(), 1.0),
            ]
        );
        assert!(monthly_counts(&ledger(), "Posted").is_none());
    }

    #[test]
    fn test_value_counts_most_frequent_first() {
        let bars = value_counts(&ledger(), "Transaction Type").unwrap();
        assert_eq!(bars[0], ("DEB".to_string(), 3.0));
        assert_eq!(bars[1], ("DD".to_string(), 1.0));
    }

    #[test]
    fn test_top_groups_fall_back_to_description() {
        let bars = top_debit_groups(&ledger(), &ColumnMapping::default(), 2).unwrap();
        assert_eq!(
            bars,
            vec![("RENT".to_string(), 900.0), ("M&S".to_string(), 20.0)]
        );
    }

    #[test]
    fn test_chart_title() {
        let chart = Chart {
            name: "top_categories".to_string(),
            path: PathBuf::from("x.svg"),
        };
        assert_eq!(chart.title(), "Top Categories");
    }

    #[test]
    fn test_render_writes_each_chart() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("plots");
        let mapping = ColumnMapping::default();
        let charts = Visualizer::new(&dir, &mapping).render(&ledger()).unwrap();

        let ChartSet::Rendered(charts) = charts else {
            panic!("expected rendered charts");
        };
        let names: Vec<_> = charts.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["monthly_volume", "type_distribution", "top_categories"]);
        for chart in &charts {
            let body = fs::read_to_string(&chart.path).unwrap();
            assert!(body.contains("<svg"));
        }
        let top = fs::read_to_string(dir.join("top_categories.svg")).unwrap();
        assert!(top.contains("M&amp;"));
        assert!(!top.contains("M&S"));
    }

    #[test]
    fn test_render_empty_ledger_is_no_data() {
        let tmp = tempfile::tempdir().unwrap();
        let mapping = ColumnMapping::default();
        let out = Visualizer::new(tmp.path(), &mapping)
            .render(&Ledger::default())
            .unwrap();
        assert_eq!(out, ChartSet::NoData(NO_DATA_WARNING.to_string()));
    }

    #[test]
    fn test_no_date_column_skips_monthly_chart() {
        let tmp = tempfile::tempdir().unwrap();
        let mapping = ColumnMapping::default();
        let ledger = Ledger::from_columns(vec![
            Column::new("Debit Amount", ColumnData::Number(vec![Some(1.0)])),
            Column::new("Category", text(&["Food"])),
        ])
        .unwrap();
        let ChartSet::Rendered(charts) = Visualizer::new(tmp.path(), &mapping).render(&ledger).unwrap() else {
            panic!("expected rendered charts");
        };
        let names: Vec<_> = charts.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["top_categories"]);
    }

    #[test]
    fn test_unwritable_plots_dir_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("not_a_dir");
        fs::write(&blocker, "").unwrap();
        let mapping = ColumnMapping::default();
        assert!(Visualizer::new(&blocker, &mapping).render(&ledger()).is_err());
    }
}

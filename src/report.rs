//! Plain-text and JSON renderings of a dashboard report for `--report`.

use color_eyre::Result;
use std::fmt::Write;

use crate::analysis::ModelPriceSummary;
use crate::chart_data::ChartSpec;
use crate::dashboard::{DashboardReport, Item};
use crate::frame::TablePreview;

/// Mean price per model as a table.
pub fn price_summary_table(rows: &[ModelPriceSummary]) -> TablePreview {
    TablePreview {
        headers: vec!["model".into(), "count".into(), "mean price".into()],
        rows: rows
            .iter()
            .map(|r| vec![r.model.clone(), r.count.to_string(), format!("{:.2}", r.mean)])
            .collect(),
        total_rows: rows.len(),
    }
}

/// Column-aligned rendering of a table preview.
pub fn format_table(table: &TablePreview) -> String {
    let mut widths: Vec<usize> = table.headers.iter().map(|h| h.chars().count()).collect();
    for row in &table.rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }
    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<width$}", c, width = *w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    let _ = writeln!(out, "{}", line(&table.headers));
    let _ = writeln!(
        out,
        "{}",
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  ")
    );
    for row in &table.rows {
        let _ = writeln!(out, "{}", line(row));
    }
    let _ = writeln!(
        out,
        "({} of {} rows)",
        table.rows.len(),
        table.total_rows
    );
    out
}

fn format_chart(out: &mut String, chart: &ChartSpec) {
    let (x_label, y_label) = chart.labels();
    let _ = writeln!(out, "[chart] {} ({} by {})", chart.title(), y_label, x_label);
    match chart {
        ChartSpec::Bar { bars, .. } => {
            let width = bars.iter().map(|b| b.0.chars().count()).max().unwrap_or(0);
            for (name, count) in bars {
                let _ = writeln!(out, "  {:<width$}  {}", name, count, width = width);
            }
            if bars.is_empty() {
                let _ = writeln!(out, "  (no data)");
            }
        }
        ChartSpec::Scatter { series, .. } => {
            for s in series {
                let _ = writeln!(out, "  {}: {} points", s.name, s.points.len());
            }
            if chart.is_empty() {
                let _ = writeln!(out, "  (no data)");
            }
        }
        ChartSpec::BoxPlot { boxes, .. } => {
            for b in boxes {
                let _ = writeln!(
                    out,
                    "  {}: min {:.2}, q1 {:.2}, median {:.2}, q3 {:.2}, max {:.2}",
                    b.label, b.min, b.q1, b.median, b.q3, b.max
                );
            }
            if boxes.is_empty() {
                let _ = writeln!(out, "  (no data)");
            }
        }
    }
}

pub fn render_text(report: &DashboardReport) -> String {
    let mut out = String::new();
    for section in &report.sections {
        let _ = writeln!(out, "== {} ==", section.title);
        for item in &section.items {
            match item {
                Item::Text { text } => {
                    let _ = writeln!(out, "{}", text);
                }
                Item::Notice { text } => {
                    let _ = writeln!(out, "note: {}", text);
                }
                Item::Error { text } => {
                    let _ = writeln!(out, "error: {}", text);
                }
                Item::Table { title, table } => {
                    let _ = writeln!(out, "{}", title);
                    out.push_str(&format_table(table));
                }
                Item::Chart { chart } => format_chart(&mut out, chart),
                Item::Training { outcome } => {
                    let _ = writeln!(
                        out,
                        "Target: {}\nFeatures: {}\nRows used: {} ({} dropped for missing values)\nClasses: {}\nTraining accuracy: {:.3}",
                        outcome.target,
                        outcome.features.join(", "),
                        outcome.n_rows,
                        outcome.dropped_rows,
                        outcome.n_classes,
                        outcome.accuracy
                    );
                }
                Item::PriceSummary { rows } => {
                    let _ = writeln!(out, "Average price per model");
                    out.push_str(&format_table(&price_summary_table(rows)));
                }
            }
        }
        out.push('\n');
    }
    out
}

pub fn render_json(report: &DashboardReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_columns_are_aligned() {
        let table = TablePreview {
            headers: vec!["marca".into(), "precio".into()],
            rows: vec![
                vec!["Samsung".into(), "150.0".into()],
                vec!["LG".into(), "99.5".into()],
            ],
            total_rows: 10,
        };
        let text = format_table(&table);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "marca    precio");
        assert_eq!(lines[1], "-------  ------");
        assert_eq!(lines[2], "Samsung  150.0");
        assert_eq!(lines[3], "LG       99.5");
        assert_eq!(lines[4], "(2 of 10 rows)");
    }
}

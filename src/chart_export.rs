//! Chart export to PNG (plotters bitmap) and SVG (plotters svg).

use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::chart_data::{ChartSpec, ColorScale, PALETTE};
use crate::cli::ExportFormat;
use crate::dashboard::DashboardReport;

impl ExportFormat {
    pub const ALL: [Self; 2] = [Self::Png, Self::Svg];

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Png => "PNG",
            Self::Svg => "SVG",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.extension().eq_ignore_ascii_case(name.trim()))
    }
}

/// Lowercase file-name stem from a chart title.
pub fn slug(title: &str) -> String {
    let mut out = String::new();
    for c in title.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    let trimmed = out.trim_end_matches('-');
    if trimmed.is_empty() {
        "chart".to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn file_name(index: usize, title: &str, format: ExportFormat) -> String {
    format!("{:02}-{}.{}", index, slug(title), format.extension())
}

/// Category name for an axis position, blank between categories.
fn category_label(names: &[String], v: f64) -> String {
    let i = v.round();
    if (v - i).abs() > 1e-6 || i < 0.0 {
        return String::new();
    }
    names.get(i as usize).cloned().unwrap_or_default()
}

fn rgb((r, g, b): (u8, u8, u8)) -> RGBColor {
    RGBColor(r, g, b)
}

fn pad((lo, hi): (f64, f64)) -> (f64, f64) {
    let margin = (hi - lo) * 0.05;
    (lo - margin, hi + margin)
}

struct ChartTheme {
    background: RGBColor,
    foreground: RGBColor,
    grid: RGBColor,
}

const LIGHT: ChartTheme = ChartTheme {
    background: WHITE,
    foreground: BLACK,
    grid: RGBColor(225, 225, 225),
};

const DARK: ChartTheme = ChartTheme {
    background: RGBColor(17, 17, 17),
    foreground: RGBColor(242, 245, 250),
    grid: RGBColor(40, 48, 62),
};

fn draw<DB>(root: DrawingArea<DB, Shift>, chart: &ChartSpec) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let Some((x_min, x_max, y_min, y_max)) = chart.bounds() else {
        return Err(eyre!("No data to export"));
    };
    let theme = match chart {
        ChartSpec::Scatter { dark: true, .. } => &DARK,
        _ => &LIGHT,
    };
    root.fill(&theme.background)?;

    let (x_label, y_label) = chart.labels();
    let fg = theme.foreground;
    let mut builder = ChartBuilder::on(&root);
    builder
        .caption(chart.title(), ("sans-serif", 22).into_font().color(&fg))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70);

    match chart {
        ChartSpec::Bar { bars, scale, .. } => {
            let mut ctx = builder.build_cartesian_2d(x_min..x_max, 0.0..y_max * 1.05)?;
            let names: Vec<String> = bars.iter().map(|(name, _)| name.clone()).collect();
            let formatter = |v: &f64| category_label(&names, *v);
            ctx.configure_mesh()
                .disable_x_mesh()
                .x_labels(names.len().max(2))
                .x_label_formatter(&formatter)
                .x_desc(x_label)
                .y_desc(y_label)
                .label_style(("sans-serif", 13).into_font().color(&fg))
                .axis_style(fg)
                .light_line_style(theme.grid)
                .draw()?;

            let lo = bars.iter().map(|b| b.1).min().unwrap_or(0) as f64;
            let hi = bars.iter().map(|b| b.1).max().unwrap_or(0) as f64;
            ctx.draw_series(bars.iter().enumerate().map(|(i, (_, count))| {
                let count = *count as f64;
                let t = if hi > lo { (count - lo) / (hi - lo) } else { 0.0 };
                let color = match scale {
                    ColorScale::Single => rgb(PALETTE[0]),
                    scale => rgb(scale.at(t)),
                };
                let x = i as f64;
                Rectangle::new([(x - 0.4, 0.0), (x + 0.4, count)], color.filled())
            }))?;
        }
        ChartSpec::Scatter { series, .. } => {
            let (x0, x1) = pad((x_min, x_max));
            let (y0, y1) = pad((y_min, y_max));
            let mut ctx = builder.build_cartesian_2d(x0..x1, y0..y1)?;
            ctx.configure_mesh()
                .x_desc(x_label)
                .y_desc(y_label)
                .label_style(("sans-serif", 13).into_font().color(&fg))
                .axis_style(fg)
                .bold_line_style(theme.grid)
                .light_line_style(theme.grid.mix(0.5))
                .draw()?;

            for s in series {
                let color = rgb(s.color.rgb());
                ctx.draw_series(
                    s.points
                        .iter()
                        .map(|&p| Circle::new(p, 3, color.mix(0.8).filled())),
                )?
                .label(s.name.as_str())
                .legend(move |(x, y)| Circle::new((x + 8, y), 4, color.filled()));
            }
            if series.len() > 1 {
                ctx.configure_series_labels()
                    .background_style(theme.background.mix(0.8))
                    .border_style(fg)
                    .label_font(("sans-serif", 12).into_font().color(&fg))
                    .position(SeriesLabelPosition::UpperRight)
                    .draw()?;
            }
        }
        ChartSpec::BoxPlot { boxes, .. } => {
            let (y0, y1) = pad((y_min, y_max));
            let mut ctx = builder.build_cartesian_2d(x_min..x_max, y0..y1)?;
            let names: Vec<String> = boxes.iter().map(|b| b.label.clone()).collect();
            let formatter = |v: &f64| category_label(&names, *v);
            ctx.configure_mesh()
                .disable_x_mesh()
                .x_labels(names.len().max(2))
                .x_label_formatter(&formatter)
                .x_desc(x_label)
                .y_desc(y_label)
                .label_style(("sans-serif", 13).into_font().color(&fg))
                .axis_style(fg)
                .light_line_style(theme.grid)
                .draw()?;

            for (i, b) in boxes.iter().enumerate() {
                let color = rgb(PALETTE[i % PALETTE.len()]);
                let x = i as f64;
                let stroke = color.stroke_width(2);
                ctx.draw_series([
                    PathElement::new(vec![(x, b.min), (x, b.q1)], stroke),
                    PathElement::new(vec![(x, b.q3), (x, b.max)], stroke),
                    PathElement::new(vec![(x - 0.15, b.min), (x + 0.15, b.min)], stroke),
                    PathElement::new(vec![(x - 0.15, b.max), (x + 0.15, b.max)], stroke),
                ])?;
                ctx.draw_series([
                    Rectangle::new([(x - 0.3, b.q1), (x + 0.3, b.q3)], color.mix(0.4).filled()),
                    Rectangle::new([(x - 0.3, b.q1), (x + 0.3, b.q3)], stroke),
                ])?;
                ctx.draw_series([PathElement::new(
                    vec![(x - 0.3, b.median), (x + 0.3, b.median)],
                    BLACK.stroke_width(2),
                )])?;
            }
        }
    }

    root.present()?;
    Ok(())
}

/// Write a single chart.
pub fn export_chart(
    path: &Path,
    chart: &ChartSpec,
    format: ExportFormat,
    size: (u32, u32),
) -> Result<()> {
    if chart.is_empty() {
        return Err(eyre!("No data to export"));
    }
    let drawn = match format {
        ExportFormat::Png => draw(BitMapBackend::new(path, size).into_drawing_area(), chart),
        ExportFormat::Svg => draw(SVGBackend::new(path, size).into_drawing_area(), chart),
    };
    drawn.wrap_err_with(|| format!("Failed to export chart to {}", path.display()))
}

/// Write every non-empty chart of the report as `NN-<title>.<ext>` into
/// `dir`, numbered in dashboard order.
pub fn export_report(
    dir: &Path,
    report: &DashboardReport,
    format: ExportFormat,
    size: (u32, u32),
) -> Result<Vec<PathBuf>> {
    let charts: Vec<&ChartSpec> = report.charts().filter(|c| !c.is_empty()).collect();
    if charts.is_empty() {
        return Err(eyre!("No data to export"));
    }
    std::fs::create_dir_all(dir)
        .wrap_err_with(|| format!("Failed to create {}", dir.display()))?;

    let mut written = Vec::with_capacity(charts.len());
    for (i, chart) in charts.into_iter().enumerate() {
        let path = dir.join(file_name(i + 1, chart.title(), format));
        export_chart(&path, chart, format, size)?;
        written.push(path);
    }
    info!(
        count = written.len(),
        dir = %dir.display(),
        format = format.as_str(),
        "exported charts"
    );
    Ok(written)
}

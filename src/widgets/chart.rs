//! Terminal rendering of dashboard charts: bars, scatters and box plots.

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Rect},
    style::{Color, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Bar, BarChart, BarGroup, Block, Borders, Chart, Dataset, GraphType,
        LegendPosition, Paragraph, Widget,
    },
};

use crate::chart_data::{ChartSpec, ColorScale, PALETTE};
use crate::config::Theme;

fn rgb((r, g, b): (u8, u8, u8)) -> Color {
    Color::Rgb(r, g, b)
}

fn format_axis_label(v: f64) -> String {
    if v.abs() >= 1e6 || (v.abs() < 1e-2 && v != 0.0) {
        format!("{:.2e}", v)
    } else if (v - v.round()).abs() < 1e-9 {
        format!("{:.0}", v)
    } else {
        format!("{:.2}", v)
    }
}

fn axis_labels(lo: f64, hi: f64, style: Style) -> Vec<Span<'static>> {
    vec![
        Span::styled(format_axis_label(lo), style),
        Span::styled(format_axis_label((lo + hi) / 2.0), style),
        Span::styled(format_axis_label(hi), style),
    ]
}

pub fn render_chart(area: Rect, buf: &mut Buffer, chart: &ChartSpec, theme: &Theme) {
    let text_primary = theme.get("text_primary");
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.get("table_border")))
        .title(format!(" {} ", chart.title()));
    let inner = block.inner(area);
    block.render(area, buf);

    let Some((x_min, x_max, y_min, y_max)) = chart.bounds() else {
        Paragraph::new("No valid data points")
            .style(Style::default().fg(theme.get("text_secondary")))
            .centered()
            .render(inner, buf);
        return;
    };
    let (x_label, y_label) = chart.labels();
    let label_style = Style::default().fg(text_primary);

    match chart {
        ChartSpec::Bar { bars, scale, .. } => {
            let lo = bars.iter().map(|b| b.1).min().unwrap_or(0) as f64;
            let hi = bars.iter().map(|b| b.1).max().unwrap_or(0) as f64;
            let items: Vec<Bar> = bars
                .iter()
                .map(|(name, count)| {
                    let t = if hi > lo {
                        (*count as f64 - lo) / (hi - lo)
                    } else {
                        0.0
                    };
                    let color = match scale {
                        ColorScale::Single => rgb(PALETTE[0]),
                        scale => rgb(scale.at(t)),
                    };
                    Bar::default()
                        .value(*count as u64)
                        .label(Line::from(name.clone()))
                        .style(Style::default().fg(color))
                        .value_style(Style::default().fg(Color::Black).bg(color))
                })
                .collect();
            let n = items.len().max(1) as u16;
            let bar_width = (inner.width.saturating_sub(n) / n).clamp(1, 12);
            BarChart::default()
                .data(BarGroup::default().bars(&items))
                .bar_width(bar_width)
                .bar_gap(1)
                .label_style(label_style)
                .render(inner, buf);
        }
        ChartSpec::Scatter { series, dark, .. } => {
            if *dark {
                Block::default()
                    .style(Style::default().bg(Color::Rgb(17, 17, 17)))
                    .render(inner, buf);
            }
            let datasets: Vec<Dataset> = series
                .iter()
                .map(|s| {
                    Dataset::default()
                        .name(s.name.clone())
                        .marker(symbols::Marker::Braille)
                        .graph_type(GraphType::Scatter)
                        .style(Style::default().fg(rgb(s.color.rgb())))
                        .data(&s.points)
                })
                .collect();
            let legend = if series.len() > 1 {
                Some(LegendPosition::TopRight)
            } else {
                None
            };
            Chart::new(datasets)
                .x_axis(
                    Axis::default()
                        .title(x_label.to_string())
                        .style(label_style)
                        .bounds([x_min, x_max])
                        .labels(axis_labels(x_min, x_max, label_style)),
                )
                .y_axis(
                    Axis::default()
                        .title(y_label.to_string())
                        .style(label_style)
                        .bounds([y_min, y_max])
                        .labels(axis_labels(y_min, y_max, label_style)),
                )
                .legend_position(legend)
                .hidden_legend_constraints((Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)))
                .render(inner, buf);
        }
        ChartSpec::BoxPlot { boxes, .. } => {
            // Outline, whisker and median of each box as line segments.
            let shapes: Vec<(Color, Vec<Vec<(f64, f64)>>)> = boxes
                .iter()
                .enumerate()
                .map(|(i, b)| {
                    let x = i as f64;
                    let outline = vec![
                        (x - 0.3, b.q1),
                        (x + 0.3, b.q1),
                        (x + 0.3, b.q3),
                        (x - 0.3, b.q3),
                        (x - 0.3, b.q1),
                    ];
                    let low = vec![(x, b.min), (x, b.q1)];
                    let high = vec![(x, b.q3), (x, b.max)];
                    let median = vec![(x - 0.3, b.median), (x + 0.3, b.median)];
                    (
                        rgb(PALETTE[i % PALETTE.len()]),
                        vec![outline, low, high, median],
                    )
                })
                .collect();
            let datasets: Vec<Dataset> = shapes
                .iter()
                .flat_map(|(color, parts)| {
                    parts.iter().map(move |points| {
                        Dataset::default()
                            .marker(symbols::Marker::Braille)
                            .graph_type(GraphType::Line)
                            .style(Style::default().fg(*color))
                            .data(points)
                    })
                })
                .collect();
            let names: Vec<Span> = boxes
                .iter()
                .map(|b| Span::styled(b.label.clone(), label_style))
                .collect();
            Chart::new(datasets)
                .x_axis(
                    Axis::default()
                        .title(x_label.to_string())
                        .style(label_style)
                        .bounds([x_min, x_max])
                        .labels(names),
                )
                .y_axis(
                    Axis::default()
                        .title(y_label.to_string())
                        .style(label_style)
                        .bounds([y_min, y_max])
                        .labels(axis_labels(y_min, y_max, label_style)),
                )
                .legend_position(None)
                .render(inner, buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_labels_are_compact() {
        assert_eq!(format_axis_label(8.0), "8");
        assert_eq!(format_axis_label(199.5), "199.50");
        assert_eq!(format_axis_label(2_500_000.0), "2.50e6");
    }
}

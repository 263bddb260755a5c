//! One dashboard section laid out as a vertical list of items.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::Line,
    widgets::{Paragraph, Widget},
};

use crate::config::Theme;
use crate::dashboard::{Item, Section};
use crate::report::price_summary_table;
use crate::widgets::chart::render_chart;
use crate::widgets::table::{render_table, table_height};

const MIN_CHART_HEIGHT: u16 = 12;

/// Height an item wants inside a body of `body_height` rows.
pub fn item_height(item: &Item, body_height: u16) -> u16 {
    match item {
        Item::Text { .. } | Item::Notice { .. } | Item::Error { .. } => 1,
        Item::Table { table, .. } => table_height(table),
        Item::PriceSummary { rows } => rows.len() as u16 + 3,
        Item::Training { .. } => 5,
        Item::Chart { .. } => (body_height / 2).max(MIN_CHART_HEIGHT),
    }
}

/// Render the items of `section` starting at item `scroll`. Items that no
/// longer fit are cut at the bottom edge.
pub fn render_section(area: Rect, buf: &mut Buffer, section: &Section, scroll: usize, theme: &Theme) {
    let mut y = area.y;
    let bottom = area.y + area.height;

    for item in section.items.iter().skip(scroll) {
        if y >= bottom {
            break;
        }
        let wanted = item_height(item, area.height);
        let height = wanted.min(bottom - y);
        // A table or chart squeezed below three rows shows nothing useful.
        if height < 3 && wanted >= 3 {
            break;
        }
        let rect = Rect::new(area.x, y, area.width, height);
        render_item(rect, buf, item, theme);
        y += height;
    }
}

fn render_item(area: Rect, buf: &mut Buffer, item: &Item, theme: &Theme) {
    match item {
        Item::Text { text } => Paragraph::new(text.as_str())
            .style(Style::default().fg(theme.get("text_primary")))
            .render(area, buf),
        Item::Notice { text } => Paragraph::new(format!("! {}", text))
            .style(Style::default().fg(theme.get("notice")))
            .render(area, buf),
        Item::Error { text } => Paragraph::new(format!("Error: {}", text))
            .style(
                Style::default()
                    .fg(theme.get("error"))
                    .add_modifier(Modifier::BOLD),
            )
            .render(area, buf),
        Item::Table { title, table } => render_table(area, buf, title, table, theme),
        Item::PriceSummary { rows } => render_table(
            area,
            buf,
            "Average price per model",
            &price_summary_table(rows),
            theme,
        ),
        Item::Chart { chart } => render_chart(area, buf, chart, theme),
        Item::Training { outcome } => {
            let lines = vec![
                Line::from(format!("Target: {}", outcome.target)),
                Line::from(format!("Features: {}", outcome.features.join(", "))),
                Line::from(format!(
                    "Rows used: {} ({} dropped for missing values)",
                    outcome.n_rows, outcome.dropped_rows
                )),
                Line::from(format!("Classes: {}", outcome.n_classes)),
                Line::from(format!("Training accuracy: {:.3}", outcome.accuracy)),
            ];
            Paragraph::new(lines)
                .style(Style::default().fg(theme.get("primary")))
                .render(area, buf);
        }
    }
}

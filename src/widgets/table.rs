use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    widgets::{Block, Borders, Row, Table, Widget},
};

use crate::config::Theme;
use crate::frame::TablePreview;

/// Rows needed to show the whole preview including borders and header.
pub fn table_height(table: &TablePreview) -> u16 {
    table.rows.len() as u16 + 3
}

pub fn render_table(
    area: Rect,
    buf: &mut Buffer,
    title: &str,
    table: &TablePreview,
    theme: &Theme,
) {
    let widths: Vec<Constraint> = table
        .headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            let longest = table
                .rows
                .iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
                .max(header.chars().count());
            Constraint::Length(longest.min(32) as u16)
        })
        .collect();

    let header = Row::new(table.headers.clone()).style(
        Style::default()
            .fg(theme.get("table_header"))
            .add_modifier(Modifier::BOLD),
    );
    let rows = table.rows.iter().map(|r| Row::new(r.clone()));

    let caption = format!(" {} ({} of {} rows) ", title, table.rows.len(), table.total_rows);
    Table::new(rows, widths)
        .header(header)
        .column_spacing(2)
        .style(Style::default().fg(theme.get("text_primary")))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.get("table_border")))
                .title(caption),
        )
        .render(area, buf);
}

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style, Stylize},
    widgets::{Paragraph, Widget},
};

#[derive(Default)]
pub struct Controls {
    pub row_count: Option<usize>,
    /// Current brand and model selection, shown on the right
    pub selection: Option<String>,
    pub training: bool,
    pub background: Option<Color>,
    /// Color of the "Train" hint while training is on
    pub highlight: Option<Color>,
}

impl Controls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_row_count(mut self, row_count: usize) -> Self {
        self.row_count = Some(row_count);
        self
    }

    pub fn with_selection(mut self, selection: impl Into<String>) -> Self {
        self.selection = Some(selection.into());
        self
    }

    pub fn with_training(mut self, training: bool) -> Self {
        self.training = training;
        self
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }

    pub fn with_highlight(mut self, color: Color) -> Self {
        self.highlight = Some(color);
        self
    }
}

const CONTROLS: [(&str, &str); 8] = [
    ("Tab", "View"),
    ("↑↓", "Scroll"),
    ("t", "Train"),
    ("←→", "Target"),
    ("b", "Brand"),
    ("m", "Model"),
    ("e", "Export"),
    ("q", "Quit"),
];

impl Widget for &Controls {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut constraints = CONTROLS.iter().fold(vec![], |mut acc, (key, action)| {
            acc.push(Constraint::Length(key.chars().count() as u16 + 2));
            acc.push(Constraint::Length(action.chars().count() as u16 + 1));
            acc
        });
        constraints.push(Constraint::Fill(1));
        if self.row_count.is_some() {
            constraints.push(Constraint::Length(14));
        }

        let layout = Layout::new(Direction::Horizontal, constraints).split(area);
        let color = self.background.unwrap_or(Color::DarkGray);
        let base_style = Style::default();

        for (i, (key, action)) in CONTROLS.iter().enumerate() {
            let j = i * 2;
            Paragraph::new(*key)
                .style(base_style.bold())
                .centered()
                .render(layout[j], buf);
            let action_style = if *action == "Train" && self.training {
                base_style
                    .bg(color)
                    .fg(self.highlight.unwrap_or(Color::Cyan))
            } else {
                base_style.bg(color)
            };
            Paragraph::new(*action)
                .style(action_style)
                .render(layout[j + 1], buf);
        }

        let fill_idx = CONTROLS.len() * 2;
        Paragraph::new(self.selection.clone().unwrap_or_default())
            .style(base_style.bg(color).fg(Color::White))
            .right_aligned()
            .render(layout[fill_idx], buf);

        if let Some(count) = self.row_count {
            Paragraph::new(format!("Rows: {}", count))
                .style(base_style.bg(color).fg(Color::White))
                .right_aligned()
                .render(layout[fill_idx + 1], buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(controls: &Controls) -> Buffer {
        let area = Rect::new(0, 0, 120, 1);
        let mut buf = Buffer::empty(area);
        controls.render(area, &mut buf);
        buf
    }

    fn line(buf: &Buffer) -> String {
        (0..buf.area.width)
            .map(|x| buf[(x, 0)].symbol().to_string())
            .collect()
    }

    #[test]
    fn hints_and_row_count_are_drawn() {
        let controls = Controls::new()
            .with_row_count(12)
            .with_selection("Brand: All");
        let text = line(&rendered(&controls));
        assert!(text.contains("Tab"));
        assert!(text.contains("Train"));
        assert!(text.contains("Quit"));
        assert!(text.contains("Rows: 12"));
    }

    #[test]
    fn training_uses_highlight_color() {
        let controls = Controls::new()
            .with_training(true)
            .with_highlight(Color::Yellow);
        let buf = rendered(&controls);
        let text = line(&buf);
        let x = text[..text.find("Train").unwrap()].chars().count() as u16;
        assert_eq!(buf[(x, 0)].fg, Color::Yellow);
        // Keys are bold
        assert!(buf[(0, 0)].modifier.contains(ratatui::style::Modifier::BOLD));
    }
}

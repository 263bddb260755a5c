use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::{Paragraph, Widget},
};

#[derive(Debug, Default)]
pub struct DebugState {
    pub enabled: bool,
    pub num_events: usize,
    pub num_frames: usize,
    pub last_key: Option<String>,
    /// Training cache size at the last refresh
    pub trained_targets: usize,
}

impl Widget for &DebugState {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let text = format!(
            "events: {} | frames: {} | key: {} | trained targets: {}",
            self.num_events,
            self.num_frames,
            self.last_key.as_deref().unwrap_or("-"),
            self.trained_targets
        );
        Paragraph::new(text)
            .style(Style::default().fg(Color::Black).bg(Color::Yellow))
            .render(area, buf);
    }
}

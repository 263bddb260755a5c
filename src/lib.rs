use color_eyre::eyre::eyre;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use tracing::{error, info};

use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Modifier, Style};
use ratatui::{buffer::Buffer, layout::Rect, widgets::Widget};

use ratatui::widgets::{Block, Paragraph, Tabs};

pub mod analysis;
pub mod chart_data;
pub mod chart_export;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod encoding;
pub mod forest;
pub mod frame;
pub mod model;
pub mod report;
pub mod selection;
pub mod source;
pub mod widgets;

pub use analysis::{BrandModelFilter, Choice};
pub use cli::{Args, CompressionFormat, ExportFormat};
pub use config::{rgb_to_256_color, AppConfig, ColorParser, ConfigManager, Theme};
pub use dashboard::{ColumnRoles, Dashboard, DashboardOptions, DashboardReport, SectionKind};
pub use source::OpenOptions;

use widgets::controls::Controls;
use widgets::debug::DebugState;

/// Application name used for config and log directories
pub const APP_NAME: &str = "phonedash";

impl OpenOptions {
    /// Create OpenOptions from CLI args and config, with CLI args taking precedence
    pub fn from_args_and_config(args: &cli::Args, config: &AppConfig) -> Result<Self> {
        let mut opts = OpenOptions::new();

        if let Some(delimiter) = args.delimiter.or(config.file_loading.delimiter) {
            if !delimiter.is_ascii() {
                return Err(eyre!("Delimiter must be a single ASCII character"));
            }
            opts.delimiter = delimiter as u8;
        }

        if let Some(encoding) = args
            .encoding
            .clone()
            .or_else(|| config.file_loading.encoding.clone())
        {
            opts.encoding = encoding;
        }

        // Handle has_header: CLI no_header flag overrides config
        opts.has_header = if args.no_header {
            false
        } else {
            config.file_loading.has_header.unwrap_or(true)
        };

        opts.compression = args.compression.or_else(|| {
            config
                .file_loading
                .compression
                .as_deref()
                .and_then(CompressionFormat::from_name)
        });

        Ok(opts)
    }
}

impl DashboardOptions {
    pub fn from_args_and_config(args: &cli::Args, config: &AppConfig) -> Self {
        Self {
            head_rows: config.display.head_rows,
            top_n: config.charts.top_n,
            train_target: args.train.clone(),
            forest: config.forest_params(),
            filter: BrandModelFilter {
                brand: Choice::from_option(args.brand.as_deref()),
                model: Choice::from_option(args.model.as_deref()),
            },
        }
    }
}

/// Where and how charts are exported.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSettings {
    pub dir: PathBuf,
    pub format: ExportFormat,
    pub size: (u32, u32),
    /// A directory was named on the command line or in the config file.
    /// Report mode only writes charts in that case.
    pub requested: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("charts"),
            format: ExportFormat::Png,
            size: (800, 600),
            requested: false,
        }
    }
}

impl ExportSettings {
    pub fn from_args_and_config(args: &cli::Args, config: &AppConfig) -> Self {
        let charts = &config.charts;
        let dir = args
            .export_dir
            .clone()
            .or_else(|| charts.export_dir.clone());
        Self {
            requested: dir.is_some(),
            dir: dir.unwrap_or_else(|| PathBuf::from("charts")),
            format: args
                .format
                .or_else(|| ExportFormat::from_name(&charts.export_format))
                .unwrap_or_default(),
            size: (charts.width, charts.height),
        }
    }
}

pub enum AppEvent {
    Key(KeyEvent),
    Open(PathBuf, OpenOptions),
    /// Write every chart of the current report into the directory
    Export(PathBuf),
    Exit,
    Crash(String),
    Resize(u16, u16), // resized (width, height)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Info(String),
    Error(String),
}

pub struct App {
    events: Sender<AppEvent>,
    path: Option<PathBuf>,
    dashboard: Option<Dashboard>,
    report: Option<DashboardReport>,
    roles: ColumnRoles,
    options: DashboardOptions,
    training_enabled: bool,
    /// Preferred training target, kept while training is off
    target: Option<String>,
    view: usize,
    scroll: usize,
    export: ExportSettings,
    status: Option<Status>,
    theme: Theme,
    debug: DebugState,
}

impl App {
    pub fn send_event(&mut self, event: AppEvent) -> Result<()> {
        self.events.send(event)?;
        Ok(())
    }

    pub fn new(events: Sender<AppEvent>) -> App {
        Self::new_with_config(
            events,
            Theme::default(),
            ColumnRoles::default(),
            DashboardOptions::default(),
            ExportSettings::default(),
        )
    }

    pub fn new_with_config(
        events: Sender<AppEvent>,
        theme: Theme,
        roles: ColumnRoles,
        options: DashboardOptions,
        export: ExportSettings,
    ) -> App {
        let training_enabled = options.train_target.is_some();
        let target = options.train_target.clone();
        App {
            events,
            path: None,
            dashboard: None,
            report: None,
            roles,
            options,
            training_enabled,
            target,
            view: 0,
            scroll: 0,
            export,
            status: None,
            theme,
            debug: DebugState::default(),
        }
    }

    pub fn enable_debug(&mut self) {
        self.debug.enabled = true;
    }

    pub fn view(&self) -> SectionKind {
        SectionKind::ALL[self.view]
    }

    pub fn report(&self) -> Option<&DashboardReport> {
        self.report.as_ref()
    }

    pub fn options(&self) -> &DashboardOptions {
        &self.options
    }

    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    pub fn training_enabled(&self) -> bool {
        self.training_enabled
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Index of the first item shown in the current view.
    pub fn scroll(&self) -> usize {
        self.scroll
    }

    fn load(&mut self, path: &Path, options: &OpenOptions) -> Result<()> {
        let df = source::load_csv(path, options)?;
        let rows = df.height();
        self.dashboard = Some(Dashboard::new(df, self.roles.clone())?);
        self.path = Some(path.to_path_buf());
        self.status = Some(Status::Info(format!(
            "Loaded {} rows from {}",
            rows,
            path.display()
        )));
        Ok(())
    }

    /// Rebuild the report from the current options.
    fn refresh(&mut self) {
        let Some(dashboard) = self.dashboard.as_mut() else {
            return;
        };
        let candidates = dashboard.candidate_targets();
        if self.target.is_none() {
            self.target = candidates.first().cloned();
        }
        self.options.train_target = if self.training_enabled {
            self.target.clone()
        } else {
            None
        };

        let result = dashboard.report(&self.options);
        self.debug.trained_targets = dashboard.trained_targets();
        match result {
            Ok(report) => {
                self.report = Some(report);
                let len = self.section_len();
                if self.scroll >= len {
                    self.scroll = len.saturating_sub(1);
                }
            }
            Err(e) => {
                error!(error = %e, "failed to build dashboard");
                self.status = Some(Status::Error(e.to_string()));
            }
        }
    }

    fn section_len(&self) -> usize {
        self.report
            .as_ref()
            .and_then(|r| r.section(self.view()))
            .map(|s| s.items.len())
            .unwrap_or(0)
    }

    fn set_view(&mut self, view: usize) {
        if view != self.view {
            self.view = view % SectionKind::ALL.len();
            self.scroll = 0;
        }
    }

    fn cycle_target(&mut self, forward: bool) {
        let Some(dashboard) = &self.dashboard else {
            return;
        };
        let candidates = dashboard.candidate_targets();
        if candidates.is_empty() {
            return;
        }
        let n = candidates.len();
        let next = match self
            .target
            .as_ref()
            .and_then(|t| candidates.iter().position(|c| c == t))
        {
            Some(pos) if forward => (pos + 1) % n,
            Some(pos) => (pos + n - 1) % n,
            None => 0,
        };
        self.target = Some(candidates[next].clone());
        self.refresh();
    }

    fn cycle_brand(&mut self, forward: bool) {
        let options = self
            .report
            .as_ref()
            .map(|r| r.brand_options.clone())
            .unwrap_or_default();
        if let Some(brand) = cycle_choice(&options, &self.options.filter.brand, forward) {
            self.options.filter.brand = brand;
            self.options.filter.model = Choice::All;
            self.refresh();
        }
    }

    fn cycle_model(&mut self, forward: bool) {
        let options = self
            .report
            .as_ref()
            .map(|r| r.model_options.clone())
            .unwrap_or_default();
        if let Some(model) = cycle_choice(&options, &self.options.filter.model, forward) {
            self.options.filter.model = model;
            self.refresh();
        }
    }

    fn key(&mut self, event: &KeyEvent) -> Option<AppEvent> {
        self.debug.last_key = Some(format!("{:?}", event.code));
        let views = SectionKind::ALL.len();
        match event.code {
            KeyCode::Char('q') | KeyCode::Esc => Some(AppEvent::Exit),
            KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(AppEvent::Exit)
            }
            KeyCode::Tab => {
                self.set_view(self.view + 1);
                None
            }
            KeyCode::BackTab => {
                self.set_view(self.view + views - 1);
                None
            }
            KeyCode::Char(c @ '1'..='6') => {
                self.set_view(c as usize - '1' as usize);
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.scroll + 1 < self.section_len() {
                    self.scroll += 1;
                }
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.scroll = self.scroll.saturating_sub(1);
                None
            }
            KeyCode::Home => {
                self.scroll = 0;
                None
            }
            KeyCode::Char('t') => {
                self.training_enabled = !self.training_enabled;
                self.refresh();
                None
            }
            KeyCode::Right => {
                self.cycle_target(true);
                None
            }
            KeyCode::Left => {
                self.cycle_target(false);
                None
            }
            KeyCode::Char('b') => {
                self.cycle_brand(true);
                None
            }
            KeyCode::Char('B') => {
                self.cycle_brand(false);
                None
            }
            KeyCode::Char('m') => {
                self.cycle_model(true);
                None
            }
            KeyCode::Char('M') => {
                self.cycle_model(false);
                None
            }
            KeyCode::Char('e') => Some(AppEvent::Export(self.export.dir.clone())),
            _ => None,
        }
    }

    fn export(&mut self, dir: &Path) {
        let Some(report) = &self.report else {
            self.status = Some(Status::Error("No data to export".to_string()));
            return;
        };
        self.status = Some(
            match chart_export::export_report(dir, report, self.export.format, self.export.size) {
                Ok(paths) => Status::Info(format!(
                    "Exported {} charts to {}",
                    paths.len(),
                    dir.display()
                )),
                Err(e) => {
                    error!(error = %e, "chart export failed");
                    Status::Error(format!("{:#}", e))
                }
            },
        );
    }

    pub fn event(&mut self, event: &AppEvent) -> Option<AppEvent> {
        self.debug.num_events += 1;
        match event {
            AppEvent::Key(key) => self.key(key),
            AppEvent::Open(path, options) => match self.load(path, options) {
                Ok(()) => {
                    info!(path = %path.display(), "opened file");
                    self.refresh();
                    None
                }
                Err(e) => Some(AppEvent::Crash(format!("{:#}", e))),
            },
            AppEvent::Export(dir) => {
                self.export(dir);
                None
            }
            AppEvent::Resize(_, _) => None,
            AppEvent::Exit | AppEvent::Crash(_) => None,
        }
    }

    fn status_line(&self) -> (String, Style) {
        let theme = &self.theme;
        match &self.status {
            Some(Status::Error(msg)) => (
                msg.lines().next().unwrap_or_default().to_string(),
                Style::default().fg(theme.get("error")),
            ),
            Some(Status::Info(msg)) => (
                format!("{} | {}", msg, self.training_summary()),
                Style::default().fg(theme.get("text_secondary")),
            ),
            None => (
                self.training_summary(),
                Style::default().fg(theme.get("text_secondary")),
            ),
        }
    }

    fn training_summary(&self) -> String {
        format!(
            "Target: {} (training {})",
            self.target.as_deref().unwrap_or("-"),
            if self.training_enabled { "on" } else { "off" }
        )
    }
}

/// Next (or previous) entry of a picker, wrapping around.
fn cycle_choice(options: &[String], current: &Choice, forward: bool) -> Option<Choice> {
    if options.is_empty() {
        return None;
    }
    let n = options.len();
    let label = current.to_string();
    let next = match options.iter().position(|o| *o == label) {
        Some(pos) if forward => (pos + 1) % n,
        Some(pos) => (pos + n - 1) % n,
        None => 0,
    };
    Some(Choice::from_option(Some(&options[next])))
}

impl Widget for &mut App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        self.debug.num_frames += 1;

        let mut constraints = vec![
            Constraint::Length(1), // Tabs
            Constraint::Fill(1),
            Constraint::Length(1), // Status
            Constraint::Length(1), // Controls
        ];
        if self.debug.enabled {
            constraints.push(Constraint::Length(1));
        }
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        let theme = &self.theme;
        let titles: Vec<String> = SectionKind::ALL
            .iter()
            .enumerate()
            .map(|(i, kind)| format!("{} {}", i + 1, kind.short_name()))
            .collect();
        Tabs::new(titles)
            .select(self.view)
            .style(Style::default().fg(theme.get("text_secondary")))
            .highlight_style(
                Style::default()
                    .fg(theme.get("tab_active"))
                    .add_modifier(Modifier::BOLD),
            )
            .divider("|")
            .render(layout[0], buf);

        let body = layout[1];
        match self.report.as_ref().and_then(|r| r.section(self.view())) {
            Some(section) => {
                widgets::section::render_section(body, buf, section, self.scroll, theme)
            }
            None => {
                let message = match &self.path {
                    Some(_) => "Nothing to show",
                    None => "Loading...",
                };
                Block::default().render(body, buf);
                Paragraph::new(message)
                    .style(Style::default().fg(theme.get("text_secondary")))
                    .centered()
                    .render(body, buf);
            }
        }

        let (status, style) = self.status_line();
        Paragraph::new(status).style(style).render(layout[2], buf);

        let mut controls = Controls::new()
            .with_training(self.training_enabled)
            .with_background(theme.get("controls_bg"))
            .with_highlight(theme.get("secondary"))
            .with_selection(format!(
                "Brand: {} | Model: {} ",
                self.options.filter.brand, self.options.filter.model
            ));
        if let Some(dashboard) = &self.dashboard {
            controls = controls.with_row_count(dashboard.frame().height());
        }
        (&controls).render(layout[3], buf);

        if self.debug.enabled {
            (&self.debug).render(layout[4], buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn choices_wrap_in_both_directions() {
        let options = labels(&["All", "Apple", "Samsung"]);
        assert_eq!(
            cycle_choice(&options, &Choice::All, true),
            Some(Choice::Value("Apple".into()))
        );
        assert_eq!(
            cycle_choice(&options, &Choice::Value("Samsung".into()), true),
            Some(Choice::All)
        );
        assert_eq!(
            cycle_choice(&options, &Choice::All, false),
            Some(Choice::Value("Samsung".into()))
        );
        assert_eq!(cycle_choice(&[], &Choice::All, true), None);
    }

    #[test]
    fn unknown_choice_restarts_at_first_option() {
        let options = labels(&["All", "Apple"]);
        assert_eq!(
            cycle_choice(&options, &Choice::Value("Nokia".into()), true),
            Some(Choice::All)
        );
    }
}

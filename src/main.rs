use clap::Parser;
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use phonedash::{
    chart_export, report, source, App, AppConfig, AppEvent, Args, ConfigManager, Dashboard,
    DashboardOptions, ExportSettings, OpenOptions, Theme, APP_NAME,
};
use ratatui::DefaultTerminal;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn render(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
    terminal.draw(|frame| frame.render_widget(app, frame.area()))?;
    Ok(())
}

fn run(
    mut terminal: DefaultTerminal,
    mut app: App,
    (tx, rx): (Sender<AppEvent>, Receiver<AppEvent>),
    path: PathBuf,
    opts: OpenOptions,
    poll: Duration,
) -> Result<()> {
    render(&mut terminal, &mut app)?;
    tx.send(AppEvent::Open(path, opts))?;

    loop {
        if crossterm::event::poll(poll)? {
            match crossterm::event::read()? {
                crossterm::event::Event::Key(key) => tx.send(AppEvent::Key(key))?,
                crossterm::event::Event::Resize(cols, rows) => {
                    tx.send(AppEvent::Resize(cols, rows))?
                }
                _ => {}
            }
        }

        let updated = match rx.recv_timeout(Duration::from_millis(0)) {
            Ok(event) => {
                match event {
                    AppEvent::Exit => break,
                    AppEvent::Crash(msg) => {
                        return Err(eyre!(msg));
                    }
                    event => {
                        if let Some(event) = app.event(&event) {
                            tx.send(event)?;
                        }
                    }
                }
                true
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => false,
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        };

        if updated {
            render(&mut terminal, &mut app)?;
        }
    }
    Ok(())
}

/// Print the dashboard (and optionally export its charts) without a terminal UI.
fn run_report(
    args: &Args,
    path: &Path,
    opts: &OpenOptions,
    config: &AppConfig,
    options: &DashboardOptions,
    export: &ExportSettings,
) -> Result<()> {
    let df = source::load_csv(path, opts)?;
    let mut dashboard = Dashboard::new(df, config.column_roles())?;
    let dashboard_report = dashboard.report(options)?;

    if args.json {
        println!("{}", report::render_json(&dashboard_report)?);
    } else {
        print!("{}", report::render_text(&dashboard_report));
    }

    if export.requested {
        let written =
            chart_export::export_report(&export.dir, &dashboard_report, export.format, export.size)?;
        eprintln!(
            "Exported {} charts to {}",
            written.len(),
            export.dir.display()
        );
    }
    Ok(())
}

fn default_log_file() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_NAME)
        .join(format!("{}.log", APP_NAME))
}

/// Logs go to stderr in report mode. The terminal UI owns the screen, so
/// there they go to a file, and only when asked for.
fn init_logging(args: &Args, config: &AppConfig) -> Result<()> {
    let level = if args.debug {
        "debug"
    } else {
        config.debug.log_level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if args.report {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
        return Ok(());
    }

    if !(args.debug || config.debug.enabled || args.log_file.is_some()) {
        return Ok(());
    }
    let log_path = args.log_file.clone().unwrap_or_else(default_log_file);
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .wrap_err_with(|| format!("Failed to open log file {}", log_path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn handle_early_exit_flags(args: &Args) -> Result<Option<()>> {
    if args.generate_config {
        let manager = ConfigManager::new(APP_NAME)?;
        let path = manager.write_default_config(args.force)?;
        println!("Configuration written to {}", path.display());
        return Ok(Some(()));
    }
    Ok(None)
}

fn main() -> Result<()> {
    let args = Args::parse();

    color_eyre::install()?;
    if let Some(()) = handle_early_exit_flags(&args)? {
        return Ok(());
    }

    let config = AppConfig::load(APP_NAME)?;
    init_logging(&args, &config)?;

    let path = args
        .path
        .clone()
        .ok_or_else(|| eyre!("A CSV file is required"))?;
    let opts = OpenOptions::from_args_and_config(&args, &config)?;
    let options = DashboardOptions::from_args_and_config(&args, &config);
    let export = ExportSettings::from_args_and_config(&args, &config);

    if args.report {
        return run_report(&args, &path, &opts, &config, &options, &export);
    }

    let theme = Theme::from_config(&config.theme)?;
    let (tx, rx) = channel::<AppEvent>();
    let mut app = App::new_with_config(
        tx.clone(),
        theme,
        config.column_roles(),
        options,
        export,
    );
    if args.debug || config.debug.enabled {
        app.enable_debug();
    }

    let poll = Duration::from_millis(config.display.event_poll_interval_ms);
    let terminal = ratatui::init();
    let result = run(terminal, app, (tx, rx), path, opts, poll);
    ratatui::restore();
    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

use phonedash::config::{AppConfig, Theme};
use phonedash::{App, AppEvent, ColumnRoles, DashboardOptions, ExportSettings};
use ratatui::style::Color;
use std::sync::mpsc::channel;

#[test]
fn default_theme_has_every_color() {
    let config = AppConfig::default();
    let theme = Theme::from_config(&config.theme).expect("default theme should parse");
    for name in [
        "primary",
        "secondary",
        "text_primary",
        "text_secondary",
        "controls_bg",
        "table_header",
        "table_border",
        "tab_active",
        "notice",
        "error",
    ] {
        assert!(theme.colors.contains_key(name), "missing {}", name);
    }
    assert_eq!(theme.get("no_such_color"), Color::Reset);
}

#[test]
fn invalid_theme_color_is_rejected() {
    let mut config = AppConfig::default();
    config.theme.colors.notice = "indexed(300)".to_string();
    assert!(Theme::from_config(&config.theme).is_err());

    config.theme.colors.notice = "#12345".to_string();
    let err = config.validate().unwrap_err().to_string();
    assert!(err.contains("notice"));
}

#[test]
fn app_accepts_custom_theme() {
    let mut config = AppConfig::default();
    config.theme.colors.primary = "#ff0000".to_string();
    config.theme.colors.tab_active = "indexed(33)".to_string();
    let theme = Theme::from_config(&config.theme).expect("custom theme should parse");

    let (tx, _rx) = channel::<AppEvent>();
    let app = App::new_with_config(
        tx,
        theme,
        ColumnRoles::default(),
        DashboardOptions::default(),
        ExportSettings::default(),
    );
    assert!(app.report().is_none());
}

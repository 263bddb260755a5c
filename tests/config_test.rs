use clap::Parser;
use phonedash::config::{AppConfig, ConfigManager};
use phonedash::forest::MaxFeatures;
use phonedash::{Args, Choice, CompressionFormat, DashboardOptions, ExportFormat, ExportSettings, OpenOptions};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

mod common;

// Helper to create a temporary config directory for testing
fn setup_test_config_dir() -> (TempDir, ConfigManager) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_manager = ConfigManager::with_dir(temp_dir.path().to_path_buf());
    (temp_dir, config_manager)
}

#[test]
fn test_default_config() {
    let config = AppConfig::default();

    assert_eq!(config.version, "0.1");
    assert_eq!(config.file_loading.delimiter, None);
    assert_eq!(config.columns.brand, "marca_telefono");
    assert_eq!(config.columns.os, "sistema operativo");
    assert_eq!(config.columns.selected.len(), 7);
    assert_eq!(config.model.n_trees, 100);
    assert_eq!(config.model.max_features, "sqrt");
    assert_eq!(config.model.seed, 42);
    assert_eq!(config.charts.top_n, 10);
    assert_eq!(config.display.head_rows, 5);
    assert_eq!(config.display.event_poll_interval_ms, 25);
    assert_eq!(config.theme.colors.controls_bg, "indexed(236)");
    assert!(!config.debug.enabled);
    assert_eq!(config.debug.log_level, "info");
}

#[test]
fn test_generate_default_config() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    let template = config_manager.generate_default_config();

    for section in [
        "[file_loading]",
        "[columns]",
        "[model]",
        "[charts]",
        "[display]",
        "[theme.colors]",
        "[debug]",
    ] {
        assert!(template.contains(section), "missing {}", section);
    }
    assert!(template.contains("version = \"0.1\""));
}

#[test]
fn test_template_parses_to_defaults() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    let parsed: AppConfig = toml::from_str(&config_manager.generate_default_config()).unwrap();
    let defaults = AppConfig::default();
    assert_eq!(parsed.columns, defaults.columns);
    assert_eq!(parsed.theme.colors, defaults.theme.colors);
    assert_eq!(parsed.model.n_trees, defaults.model.n_trees);
    assert!(parsed.validate().is_ok());
}

#[test]
fn test_write_default_config() {
    let (_temp_dir, config_manager) = setup_test_config_dir();

    let config_path = config_manager
        .write_default_config(false)
        .expect("Failed to write config");
    assert!(config_path.exists());

    let content = fs::read_to_string(&config_path).expect("Failed to read config");
    assert!(content.contains("[model]"));
}

#[test]
fn test_write_config_without_force_fails_if_exists() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    config_manager.write_default_config(false).unwrap();

    let result = config_manager.write_default_config(false);
    assert!(result.is_err());
    let message = result.unwrap_err().to_string();
    assert!(message.contains("already exists"));
    assert!(message.contains("--force"));
}

#[test]
fn test_write_config_with_force_overwrites() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    let first_path = config_manager.write_default_config(false).unwrap();
    fs::write(&first_path, "garbage").unwrap();

    let second_path = config_manager.write_default_config(true).unwrap();
    assert_eq!(first_path, second_path);
    let content = fs::read_to_string(&second_path).unwrap();
    assert!(content.contains("version = \"0.1\""));
}

#[test]
fn test_load_config_with_no_file() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    let config = AppConfig::load_from(&config_manager).unwrap();
    assert_eq!(config.version, "0.1");
    assert_eq!(config.charts.width, 800);
}

#[test]
fn test_load_and_parse_minimal_config() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    config_manager.ensure_config_dir().unwrap();
    fs::write(
        config_manager.config_path("config.toml"),
        r#"
version = "0.1"

[columns]
price = "price"

[model]
n_trees = 25
max_features = "log2"
"#,
    )
    .unwrap();

    let config = AppConfig::load_from(&config_manager).unwrap();
    assert_eq!(config.columns.price, "price");
    assert_eq!(config.columns.brand, "marca_telefono"); // Default
    assert_eq!(config.model.n_trees, 25);

    let params = config.forest_params();
    assert_eq!(params.n_trees, 25);
    assert_eq!(params.max_features, MaxFeatures::Log2);
    assert_eq!(config.column_roles().price, "price");
}

#[test]
fn test_load_rejects_invalid_values() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    config_manager.ensure_config_dir().unwrap();
    fs::write(
        config_manager.config_path("config.toml"),
        "[model]\nmax_features = \"most\"\n",
    )
    .unwrap();
    assert!(AppConfig::load_from(&config_manager).is_err());
}

#[test]
fn test_merge_configs() {
    let mut base = AppConfig::default();
    let mut other = AppConfig::default();
    other.charts.top_n = 5;
    other.theme.colors.primary = "blue".to_string();
    other.file_loading.encoding = Some("utf-8".to_string());

    base.merge(other);
    assert_eq!(base.charts.top_n, 5);
    assert_eq!(base.theme.colors.primary, "blue");
    assert_eq!(base.file_loading.encoding.as_deref(), Some("utf-8"));
    assert_eq!(base.charts.width, 800); // Still default
    assert_eq!(base.theme.colors.error, "red"); // Still default
}

#[test]
fn test_validate_config_invalid_version() {
    let mut config = AppConfig::default();
    config.version = "2.0".to_string();
    let result = config.validate();
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("Unsupported config version"));
}

#[test]
fn test_validate_config_bad_values() {
    let mut config = AppConfig::default();
    config.model.min_samples_split = 1;
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.charts.export_format = "eps".to_string();
    assert!(config
        .validate()
        .unwrap_err()
        .to_string()
        .contains("export_format"));

    let mut config = AppConfig::default();
    config.file_loading.encoding = Some("klingon".to_string());
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.display.event_poll_interval_ms = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_args_and_config_layering() {
    let mut config = AppConfig::default();
    config.file_loading.delimiter = Some(';');
    config.file_loading.compression = Some("gzip".to_string());
    config.charts.export_format = "svg".to_string();
    config.charts.top_n = 3;

    let args = Args::parse_from([
        "phonedash",
        "phones.csv",
        "--no-header",
        "--encoding",
        "utf-8",
        "--brand",
        "Apple",
        "--train",
        "ram",
        "--export-dir",
        "out",
    ]);

    let opts = OpenOptions::from_args_and_config(&args, &config).unwrap();
    assert_eq!(opts.delimiter, b';');
    assert!(!opts.has_header);
    assert_eq!(opts.encoding, "utf-8");
    assert_eq!(opts.compression, Some(CompressionFormat::Gzip));

    let options = DashboardOptions::from_args_and_config(&args, &config);
    assert_eq!(options.top_n, 3);
    assert_eq!(options.train_target.as_deref(), Some("ram"));
    assert_eq!(options.filter.brand, Choice::Value("Apple".into()));
    assert_eq!(options.filter.model, Choice::All);

    let export = ExportSettings::from_args_and_config(&args, &config);
    assert_eq!(export.dir, PathBuf::from("out"));
    assert_eq!(export.format, ExportFormat::Svg);
    assert_eq!(export.size, (800, 600));
}

#[test]
fn test_cli_delimiter_overrides_config() {
    let mut config = AppConfig::default();
    config.file_loading.delimiter = Some(';');
    let args = Args::parse_from(["phonedash", "phones.csv", "--delimiter", "\t"]);
    let opts = OpenOptions::from_args_and_config(&args, &config).unwrap();
    assert_eq!(opts.delimiter, b'\t');
    assert!(opts.has_header);
    assert_eq!(opts.encoding, "latin-1");

    let args = Args::parse_from(["phonedash", "phones.csv", "--delimiter", "é"]);
    assert!(OpenOptions::from_args_and_config(&args, &config).is_err());
}

#[test]
fn test_template_encoding_loads_latin1_file() {
    let (temp_dir, config_manager) = setup_test_config_dir();
    let template = config_manager
        .generate_default_config()
        .replace("# encoding = ", "encoding = ");
    let config: AppConfig = toml::from_str(&template).unwrap();
    assert_eq!(config.file_loading.encoding.as_deref(), Some("latin-1"));
    assert!(config.validate().is_ok());

    let path = common::write_phones_csv(temp_dir.path());
    let args = Args::parse_from(["phonedash", path.to_str().unwrap()]);
    let opts = OpenOptions::from_args_and_config(&args, &config).unwrap();
    let df = phonedash::source::load_csv(&path, &opts).unwrap();
    let models = phonedash::frame::string_values(&df, "modelo_telefono").unwrap();
    assert_eq!(models[8].as_deref(), Some("Moto G Señal"));
}

#[test]
fn test_export_dir_from_config_requests_export() {
    let args = Args::parse_from(["phonedash", "phones.csv", "--report"]);
    let config = AppConfig::default();
    assert!(!ExportSettings::from_args_and_config(&args, &config).requested);

    let mut config = AppConfig::default();
    config.charts.export_dir = Some(PathBuf::from("plots"));
    let export = ExportSettings::from_args_and_config(&args, &config);
    assert!(export.requested);
    assert_eq!(export.dir, PathBuf::from("plots"));
}

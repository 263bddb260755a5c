use color_eyre::eyre::eyre;
use color_eyre::Result;
use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use supports_color::Stream;

use crate::dashboard::ColumnRoles;
use crate::forest::{ForestParams, MaxFeatures};

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get path to a specific config file or subdirectory
    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Generate default configuration template as a string
    pub fn generate_default_config(&self) -> String {
        DEFAULT_CONFIG_TEMPLATE.to_string()
    }

    /// Write default configuration to config file
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let config_path = self.config_path("config.toml");

        if config_path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Use --force to overwrite.",
                config_path.display()
            ));
        }

        self.ensure_config_dir()?;
        std::fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE)?;

        Ok(config_path)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration format version (for future compatibility)
    pub version: String,
    pub file_loading: FileLoadingConfig,
    pub columns: ColumnsConfig,
    pub model: ModelConfig,
    pub charts: ChartsConfig,
    pub display: DisplayConfig,
    pub theme: ThemeConfig,
    pub debug: DebugConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FileLoadingConfig {
    pub delimiter: Option<char>,
    pub encoding: Option<String>,
    pub has_header: Option<bool>,
    pub compression: Option<String>,
}

/// Column names the dashboard looks for. Phone datasets in the wild use the
/// Spanish headers below, so they are the defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ColumnsConfig {
    pub selected: Vec<String>,
    pub brand: String,
    pub model: String,
    pub os: String,
    pub price: String,
    pub ram: String,
    pub storage: String,
    pub battery: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// "sqrt", "log2" or "all"
    pub max_features: String,
    pub bootstrap: bool,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartsConfig {
    pub top_n: usize,
    pub width: u32,
    pub height: u32,
    /// "png" or "svg"
    pub export_format: String,
    pub export_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub head_rows: usize,
    pub event_poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    pub colors: ColorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ColorConfig {
    pub primary: String,
    pub secondary: String,
    pub text_primary: String,
    pub text_secondary: String,
    pub controls_bg: String,
    pub table_header: String,
    pub table_border: String,
    pub tab_active: String,
    pub notice: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub enabled: bool,
    /// Filter directive used when RUST_LOG is not set
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            file_loading: FileLoadingConfig::default(),
            columns: ColumnsConfig::default(),
            model: ModelConfig::default(),
            charts: ChartsConfig::default(),
            display: DisplayConfig::default(),
            theme: ThemeConfig::default(),
            debug: DebugConfig::default(),
        }
    }
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        let roles = ColumnRoles::default();
        Self {
            selected: roles.selected,
            brand: roles.brand,
            model: roles.model,
            os: roles.os,
            price: roles.price,
            ram: roles.ram,
            storage: roles.storage,
            battery: roles.battery,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        let params = ForestParams::default();
        Self {
            n_trees: params.n_trees,
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            min_samples_leaf: params.min_samples_leaf,
            max_features: params.max_features.as_str().to_string(),
            bootstrap: params.bootstrap,
            seed: params.seed,
        }
    }
}

impl Default for ChartsConfig {
    fn default() -> Self {
        Self {
            top_n: 10,
            width: 800,
            height: 600,
            export_format: "png".to_string(),
            export_dir: None,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            head_rows: 5,
            event_poll_interval_ms: 25,
        }
    }
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            colors: ColorConfig::default(),
        }
    }
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            primary: "cyan".to_string(),
            secondary: "yellow".to_string(),
            text_primary: "white".to_string(),
            text_secondary: "dark_gray".to_string(),
            controls_bg: "indexed(236)".to_string(),
            table_header: "white".to_string(),
            table_border: "cyan".to_string(),
            tab_active: "yellow".to_string(),
            notice: "yellow".to_string(),
            error: "red".to_string(),
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from all layers (default → user)
    pub fn load(app_name: &str) -> Result<Self> {
        let config_manager = ConfigManager::new(app_name)?;
        Self::load_from(&config_manager)
    }

    /// Load configuration using the given manager's config.toml, if present
    pub fn load_from(config_manager: &ConfigManager) -> Result<Self> {
        let mut config = AppConfig::default();
        let config_path = config_manager.config_path("config.toml");

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path).map_err(|e| {
                eyre!(
                    "Failed to read config file at {}: {}",
                    config_path.display(),
                    e
                )
            })?;
            let user_config: AppConfig = toml::from_str(&content).map_err(|e| {
                eyre!(
                    "Failed to parse config file at {}: {}",
                    config_path.display(),
                    e
                )
            })?;
            config.merge(user_config);
        }

        config.validate()?;
        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: AppConfig) {
        if other.version != AppConfig::default().version {
            self.version = other.version;
        }

        self.file_loading.merge(other.file_loading);
        self.columns.merge(other.columns);
        self.model.merge(other.model);
        self.charts.merge(other.charts);
        self.display.merge(other.display);
        self.theme.colors.merge(other.theme.colors);
        self.debug.merge(other.debug);
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with("0.1") {
            return Err(eyre!(
                "Unsupported config version: {}. Expected 0.1.x",
                self.version
            ));
        }

        if let Some(label) = &self.file_loading.encoding {
            crate::source::TextEncoding::from_label(label)?;
        }
        if let Some(delimiter) = self.file_loading.delimiter {
            if !delimiter.is_ascii() {
                return Err(eyre!("delimiter must be a single ASCII character"));
            }
        }

        if self.model.n_trees == 0 {
            return Err(eyre!("n_trees must be greater than 0"));
        }
        if self.model.min_samples_split < 2 {
            return Err(eyre!("min_samples_split must be at least 2"));
        }
        if self.model.min_samples_leaf == 0 {
            return Err(eyre!("min_samples_leaf must be greater than 0"));
        }
        MaxFeatures::parse(&self.model.max_features)?;

        if self.charts.top_n == 0 {
            return Err(eyre!("top_n must be greater than 0"));
        }
        if self.charts.width < 100 || self.charts.height < 100 {
            return Err(eyre!("chart width and height must be at least 100 pixels"));
        }
        match self.charts.export_format.to_lowercase().as_str() {
            "png" | "svg" => {}
            other => {
                return Err(eyre!(
                    "Invalid export_format: {}. Must be 'png' or 'svg'",
                    other
                ))
            }
        }

        if self.display.head_rows == 0 {
            return Err(eyre!("head_rows must be greater than 0"));
        }
        if self.display.event_poll_interval_ms == 0 {
            return Err(eyre!("event_poll_interval_ms must be greater than 0"));
        }

        let parser = ColorParser::new();
        self.theme.colors.validate(&parser)?;

        Ok(())
    }

    /// Column roles and selected list as the dashboard consumes them
    pub fn column_roles(&self) -> ColumnRoles {
        ColumnRoles {
            selected: self.columns.selected.clone(),
            brand: self.columns.brand.clone(),
            model: self.columns.model.clone(),
            os: self.columns.os.clone(),
            price: self.columns.price.clone(),
            ram: self.columns.ram.clone(),
            storage: self.columns.storage.clone(),
            battery: self.columns.battery.clone(),
        }
    }

    /// Forest hyperparameters. `validate` has already checked `max_features`.
    pub fn forest_params(&self) -> ForestParams {
        ForestParams {
            n_trees: self.model.n_trees,
            max_depth: self.model.max_depth,
            min_samples_split: self.model.min_samples_split,
            min_samples_leaf: self.model.min_samples_leaf,
            max_features: MaxFeatures::parse(&self.model.max_features).unwrap_or_default(),
            bootstrap: self.model.bootstrap,
            seed: self.model.seed,
        }
    }
}

impl FileLoadingConfig {
    pub fn merge(&mut self, other: Self) {
        if other.delimiter.is_some() {
            self.delimiter = other.delimiter;
        }
        if other.encoding.is_some() {
            self.encoding = other.encoding;
        }
        if other.has_header.is_some() {
            self.has_header = other.has_header;
        }
        if other.compression.is_some() {
            self.compression = other.compression;
        }
    }
}

impl ColumnsConfig {
    pub fn merge(&mut self, other: Self) {
        let default = ColumnsConfig::default();
        if other.selected != default.selected {
            self.selected = other.selected;
        }
        let pairs = [
            (&mut self.brand, other.brand, &default.brand),
            (&mut self.model, other.model, &default.model),
            (&mut self.os, other.os, &default.os),
            (&mut self.price, other.price, &default.price),
            (&mut self.ram, other.ram, &default.ram),
            (&mut self.storage, other.storage, &default.storage),
            (&mut self.battery, other.battery, &default.battery),
        ];
        for (field, value, default_value) in pairs {
            if value != *default_value {
                *field = value;
            }
        }
    }
}

impl ModelConfig {
    pub fn merge(&mut self, other: Self) {
        let default = ModelConfig::default();
        if other.n_trees != default.n_trees {
            self.n_trees = other.n_trees;
        }
        if other.max_depth.is_some() {
            self.max_depth = other.max_depth;
        }
        if other.min_samples_split != default.min_samples_split {
            self.min_samples_split = other.min_samples_split;
        }
        if other.min_samples_leaf != default.min_samples_leaf {
            self.min_samples_leaf = other.min_samples_leaf;
        }
        if other.max_features != default.max_features {
            self.max_features = other.max_features;
        }
        if other.bootstrap != default.bootstrap {
            self.bootstrap = other.bootstrap;
        }
        if other.seed != default.seed {
            self.seed = other.seed;
        }
    }
}

impl ChartsConfig {
    pub fn merge(&mut self, other: Self) {
        let default = ChartsConfig::default();
        if other.top_n != default.top_n {
            self.top_n = other.top_n;
        }
        if other.width != default.width {
            self.width = other.width;
        }
        if other.height != default.height {
            self.height = other.height;
        }
        if other.export_format != default.export_format {
            self.export_format = other.export_format;
        }
        if other.export_dir.is_some() {
            self.export_dir = other.export_dir;
        }
    }
}

impl DisplayConfig {
    pub fn merge(&mut self, other: Self) {
        let default = DisplayConfig::default();
        if other.head_rows != default.head_rows {
            self.head_rows = other.head_rows;
        }
        if other.event_poll_interval_ms != default.event_poll_interval_ms {
            self.event_poll_interval_ms = other.event_poll_interval_ms;
        }
    }
}

impl ColorConfig {
    fn entries(&self) -> [(&'static str, &String); 10] {
        [
            ("primary", &self.primary),
            ("secondary", &self.secondary),
            ("text_primary", &self.text_primary),
            ("text_secondary", &self.text_secondary),
            ("controls_bg", &self.controls_bg),
            ("table_header", &self.table_header),
            ("table_border", &self.table_border),
            ("tab_active", &self.tab_active),
            ("notice", &self.notice),
            ("error", &self.error),
        ]
    }

    fn entries_mut(&mut self) -> [(&'static str, &mut String); 10] {
        [
            ("primary", &mut self.primary),
            ("secondary", &mut self.secondary),
            ("text_primary", &mut self.text_primary),
            ("text_secondary", &mut self.text_secondary),
            ("controls_bg", &mut self.controls_bg),
            ("table_header", &mut self.table_header),
            ("table_border", &mut self.table_border),
            ("tab_active", &mut self.tab_active),
            ("notice", &mut self.notice),
            ("error", &mut self.error),
        ]
    }

    /// Validate all color strings can be parsed
    fn validate(&self, parser: &ColorParser) -> Result<()> {
        for (name, value) in self.entries() {
            parser
                .parse(value)
                .map_err(|e| eyre!("Invalid color value for '{}': {}", name, e))?;
        }
        Ok(())
    }

    pub fn merge(&mut self, other: Self) {
        let default = ColorConfig::default();
        let defaults = default.entries();
        let others = other.entries();
        for (i, (_, field)) in self.entries_mut().into_iter().enumerate() {
            if others[i].1 != defaults[i].1 {
                *field = others[i].1.clone();
            }
        }
    }
}

impl DebugConfig {
    pub fn merge(&mut self, other: Self) {
        let default = DebugConfig::default();
        if other.enabled != default.enabled {
            self.enabled = other.enabled;
        }
        if other.log_level != default.log_level {
            self.log_level = other.log_level;
        }
    }
}

/// Color parser with terminal capability detection
pub struct ColorParser {
    supports_true_color: bool,
    supports_256: bool,
    no_color: bool,
}

impl ColorParser {
    pub fn new() -> Self {
        let no_color = std::env::var("NO_COLOR").is_ok();
        let support = supports_color::on(Stream::Stdout);

        Self {
            supports_true_color: support.as_ref().map(|s| s.has_16m).unwrap_or(false),
            supports_256: support.as_ref().map(|s| s.has_256).unwrap_or(false),
            no_color,
        }
    }

    /// Parse a color string (hex, indexed(n) or named)
    pub fn parse(&self, s: &str) -> Result<Color> {
        let trimmed = s.trim();

        let color = if trimmed.starts_with('#') {
            let (r, g, b) = parse_hex(trimmed)?;
            self.convert_rgb_to_terminal_color(r, g, b)
        } else if trimmed.to_lowercase().starts_with("indexed(") && trimmed.ends_with(')') {
            let num = trimmed[8..trimmed.len() - 1].parse::<u8>().map_err(|_| {
                eyre!(
                    "Invalid indexed color: '{}'. Expected format: indexed(0-255)",
                    trimmed
                )
            })?;
            Color::Indexed(num)
        } else {
            match trimmed.to_lowercase().replace(' ', "_").as_str() {
                "black" => Color::Black,
                "red" => Color::Red,
                "green" => Color::Green,
                "yellow" => Color::Yellow,
                "blue" => Color::Blue,
                "magenta" => Color::Magenta,
                "cyan" => Color::Cyan,
                "white" => Color::White,
                "gray" | "grey" | "dark_gray" | "dark_grey" => Color::Indexed(8),
                "light_gray" | "light_grey" => Color::Indexed(7),
                "reset" => Color::Reset,
                _ => {
                    return Err(eyre!(
                        "Unknown color name: '{}'. Use a basic ANSI name (red, blue, ...), \
                         indexed(0-255) or a hex color (#ff0000)",
                        trimmed
                    ))
                }
            }
        };

        if self.no_color {
            return Ok(Color::Reset);
        }
        Ok(color)
    }

    fn convert_rgb_to_terminal_color(&self, r: u8, g: u8, b: u8) -> Color {
        if self.supports_true_color {
            Color::Rgb(r, g, b)
        } else if self.supports_256 {
            Color::Indexed(rgb_to_256_color(r, g, b))
        } else {
            Color::Rgb(r, g, b)
        }
    }
}

impl Default for ColorParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse hex color string (#ff0000) to RGB components
pub fn parse_hex(s: &str) -> Result<(u8, u8, u8)> {
    if !s.starts_with('#') || s.len() != 7 || !s.is_ascii() {
        return Err(eyre!(
            "Invalid hex color format: '{}'. Expected format: #rrggbb",
            s
        ));
    }

    let component = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&s[range], 16).map_err(|_| eyre!("Invalid hex color: {}", s))
    };
    Ok((component(1..3)?, component(3..5)?, component(5..7)?))
}

/// Convert RGB to nearest index of the xterm 256-color palette
pub fn rgb_to_256_color(r: u8, g: u8, b: u8) -> u8 {
    let max_diff = r.max(g).max(b) as i16 - r.min(g).min(b) as i16;
    if max_diff < 10 {
        // Grayscale ramp (232-255)
        let gray = (r as u16 + g as u16 + b as u16) / 3;
        return if gray < 8 {
            16
        } else if gray > 247 {
            231
        } else {
            232 + ((gray - 8) * 24 / 240) as u8
        };
    }

    // 6x6x6 color cube (16-231)
    let r_idx = (r as u16 * 5 / 255) as u8;
    let g_idx = (g as u16 * 5 / 255) as u8;
    let b_idx = (b as u16 * 5 / 255) as u8;

    16 + 36 * r_idx + 6 * g_idx + b_idx
}

/// Theme containing parsed colors ready for use
#[derive(Debug, Clone)]
pub struct Theme {
    pub colors: HashMap<String, Color>,
}

impl Theme {
    /// Create a Theme from a ThemeConfig by parsing all color strings
    pub fn from_config(config: &ThemeConfig) -> Result<Self> {
        let parser = ColorParser::new();
        let mut colors = HashMap::new();
        for (name, value) in config.colors.entries() {
            colors.insert(name.to_string(), parser.parse(value)?);
        }
        Ok(Self { colors })
    }

    /// Get a color by name, returns Reset if not found
    pub fn get(&self, name: &str) -> Color {
        self.colors.get(name).copied().unwrap_or(Color::Reset)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::from_config(&ThemeConfig::default()).unwrap_or(Self {
            colors: HashMap::new(),
        })
    }
}

// Default configuration template
const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("../config/default.toml");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex_components() {
        assert_eq!(parse_hex("#ff8000").unwrap(), (255, 128, 0));
        assert!(parse_hex("ff8000").is_err());
        assert!(parse_hex("#ff80").is_err());
        assert!(parse_hex("#gg0000").is_err());
    }

    #[test]
    fn grayscale_maps_to_ramp() {
        assert_eq!(rgb_to_256_color(0, 0, 0), 16);
        assert_eq!(rgb_to_256_color(255, 255, 255), 231);
        assert!((232..=255).contains(&rgb_to_256_color(128, 128, 128)));
    }

    #[test]
    fn named_and_indexed_colors_parse() {
        let parser = ColorParser {
            supports_true_color: true,
            supports_256: true,
            no_color: false,
        };
        assert_eq!(parser.parse("Cyan").unwrap(), Color::Cyan);
        assert_eq!(parser.parse("dark gray").unwrap(), Color::Indexed(8));
        assert_eq!(parser.parse("indexed(236)").unwrap(), Color::Indexed(236));
        assert_eq!(parser.parse("#010203").unwrap(), Color::Rgb(1, 2, 3));
        assert!(parser.parse("chartreuse-ish").is_err());
    }

    #[test]
    fn forest_params_follow_model_section() {
        let mut config = AppConfig::default();
        config.model.n_trees = 7;
        config.model.max_features = "log2".to_string();
        let params = config.forest_params();
        assert_eq!(params.n_trees, 7);
        assert_eq!(params.max_features, MaxFeatures::Log2);
        assert_eq!(params.seed, 42);
    }
}

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Compression format for data files
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum CompressionFormat {
    /// Gzip compression (.gz) - Most common, good balance of speed and compression
    Gzip,
    /// Zstandard compression (.zst) - Modern, fast compression with good ratios
    Zstd,
    /// Bzip2 compression (.bz2) - Good compression ratio, slower than gzip
    Bzip2,
    /// XZ compression (.xz) - Excellent compression ratio, slower than bzip2
    Xz,
}

/// Image format for exported charts
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Portable Network Graphics (needs a system font for labels)
    #[default]
    Png,
    /// Scalable Vector Graphics
    Svg,
}

/// Command-line arguments for phonedash
#[derive(Parser, Debug)]
#[command(version, about = "Phone specification dashboard in the terminal")]
pub struct Args {
    /// CSV file with one phone per row
    #[arg(required_unless_present = "generate_config")]
    pub path: Option<PathBuf>,

    /// Specify the delimiter to use when reading a file
    #[arg(long = "delimiter")]
    pub delimiter: Option<char>,

    /// Text encoding of the file (latin-1, utf-8, windows-1252, ...)
    #[arg(long = "encoding")]
    pub encoding: Option<String>,

    /// Specify that the file has no header
    #[arg(long = "no-header", action)]
    pub no_header: bool,

    /// Specify the compression format explicitly (gzip, zstd, bzip2, xz)
    /// If not specified, compression is auto-detected from file extension.
    #[arg(long = "compression", value_enum)]
    pub compression: Option<CompressionFormat>,

    /// Print the dashboard to stdout instead of opening the terminal UI
    #[arg(long = "report", action)]
    pub report: bool,

    /// With --report, print JSON instead of text
    #[arg(long = "json", action, requires = "report")]
    pub json: bool,

    /// Write every chart into this directory
    #[arg(long = "export-dir")]
    pub export_dir: Option<PathBuf>,

    /// Image format for exported charts
    #[arg(long = "format", value_enum)]
    pub format: Option<ExportFormat>,

    /// Train a random forest predicting this column
    #[arg(long = "train", value_name = "TARGET")]
    pub train: Option<String>,

    /// Only show phones of this brand in the dashboard section
    #[arg(long = "brand")]
    pub brand: Option<String>,

    /// Only show this phone model in the dashboard section
    #[arg(long = "model")]
    pub model: Option<String>,

    /// Enable debug logging
    #[arg(long = "debug", action)]
    pub debug: bool,

    /// Write logs to this file (defaults to the cache directory)
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,

    /// Write the default configuration file and exit
    #[arg(long = "generate-config", action)]
    pub generate_config: bool,

    /// Overwrite an existing configuration file with --generate-config
    #[arg(long = "force", action, requires = "generate_config")]
    pub force: bool,
}

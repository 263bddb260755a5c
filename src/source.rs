//! Reading the phone CSV: decompression, text decoding and polars parsing.

use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use encoding_rs::Encoding;
use polars::prelude::*;
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;
use tracing::{debug, warn};

use crate::cli::CompressionFormat;

/// Encoding used when none is configured. Phone exports come from
/// spreadsheet tools that write Latin-1.
pub const DEFAULT_ENCODING: &str = "latin-1";

impl CompressionFormat {
    /// Detect compression format from file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::from_name(ext)
    }

    /// Parse a format from its name or extension ("gzip", "gz", "zst", ...)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "gz" | "gzip" => Some(Self::Gzip),
            "zst" | "zstd" => Some(Self::Zstd),
            "bz2" | "bz" | "bzip2" => Some(Self::Bzip2),
            "xz" => Some(Self::Xz),
            _ => None,
        }
    }

    /// Get file extension for this compression format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Gzip => "gz",
            Self::Zstd => "zst",
            Self::Bzip2 => "bz2",
            Self::Xz => "xz",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenOptions {
    pub delimiter: u8,
    pub has_header: bool,
    pub skip_rows: usize,
    pub encoding: String,
    pub compression: Option<CompressionFormat>,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenOptions {
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            has_header: true,
            skip_rows: 0,
            encoding: DEFAULT_ENCODING.to_string(),
            compression: None,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_has_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    pub fn with_skip_rows(mut self, skip_rows: usize) -> Self {
        self.skip_rows = skip_rows;
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    pub fn with_compression(mut self, compression: CompressionFormat) -> Self {
        self.compression = Some(compression);
        self
    }
}

/// Read raw bytes, decompressing when requested or implied by the extension.
fn read_bytes(path: &Path, compression: Option<CompressionFormat>) -> Result<Vec<u8>> {
    let file = File::open(path).wrap_err_with(|| format!("Failed to open {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut bytes = Vec::new();

    match compression.or_else(|| CompressionFormat::from_extension(path)) {
        None => {
            let mut reader = reader;
            reader.read_to_end(&mut bytes)?;
        }
        Some(CompressionFormat::Gzip) => {
            flate2::read::MultiGzDecoder::new(reader).read_to_end(&mut bytes)?;
        }
        Some(CompressionFormat::Zstd) => {
            bytes = zstd::decode_all(reader)?;
        }
        Some(CompressionFormat::Bzip2) => {
            bzip2::read::BzDecoder::new(reader).read_to_end(&mut bytes)?;
        }
        Some(CompressionFormat::Xz) => {
            xz2::read::XzDecoder::new(reader).read_to_end(&mut bytes)?;
        }
    }

    Ok(bytes)
}

/// A text encoding the loader can decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// ISO-8859-1: every byte maps to the code point of the same value.
    Latin1,
    /// Any other WHATWG encoding. Note that WHATWG maps the ISO-8859-1
    /// labels to windows-1252, so those never land here.
    Whatwg(&'static Encoding),
}

impl TextEncoding {
    /// Resolve a user-supplied label ("latin-1", "utf-8", "windows-1252", ...)
    pub fn from_label(label: &str) -> Result<Self> {
        let trimmed = label.trim();
        let compact: String = trimmed
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_lowercase();
        if matches!(
            compact.as_str(),
            "latin1" | "l1" | "iso88591" | "iso885911987" | "cp819" | "ibm819"
        ) {
            return Ok(Self::Latin1);
        }
        Encoding::for_label(trimmed.as_bytes())
            .map(Self::Whatwg)
            .ok_or_else(|| eyre!("Unknown encoding: {}", label))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Latin1 => "ISO-8859-1",
            Self::Whatwg(encoding) => encoding.name(),
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Self::Latin1 => encoding_rs::mem::decode_latin1(bytes).into_owned(),
            Self::Whatwg(encoding) => {
                let (text, used, had_errors) = encoding.decode(bytes);
                if had_errors {
                    warn!(
                        encoding = used.name(),
                        "input contained malformed sequences; replaced with U+FFFD"
                    );
                }
                text.into_owned()
            }
        }
    }
}

/// Decode bytes in the given encoding into UTF-8 text.
pub fn decode_text(bytes: &[u8], label: &str) -> Result<String> {
    Ok(TextEncoding::from_label(label)?.decode(bytes))
}

/// Parse decoded CSV text into a DataFrame.
pub fn parse_csv(text: String, options: &OpenOptions) -> Result<DataFrame> {
    if text.trim().is_empty() {
        return Err(eyre!("File is empty"));
    }

    let delimiter = options.delimiter;
    let read_options = CsvReadOptions::default()
        .with_has_header(options.has_header)
        .with_skip_rows(options.skip_rows)
        .with_infer_schema_length(None)
        .map_parse_options(|opts| opts.with_separator(delimiter));

    let df = CsvReader::new(Cursor::new(text.into_bytes()))
        .with_options(read_options)
        .finish()
        .wrap_err("Failed to parse CSV")?;

    if df.width() == 0 {
        return Err(eyre!("File has no columns"));
    }
    Ok(df)
}

/// Load a CSV file into a DataFrame.
pub fn load_csv(path: &Path, options: &OpenOptions) -> Result<DataFrame> {
    let bytes = read_bytes(path, options.compression)?;
    debug!(path = %path.display(), bytes = bytes.len(), "read input file");

    let text = decode_text(&bytes, &options.encoding)?;
    let df = parse_csv(text, options)
        .wrap_err_with(|| format!("Failed to load {}", path.display()))?;

    debug!(rows = df.height(), columns = df.width(), "parsed csv");
    Ok(df)
}

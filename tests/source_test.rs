use flate2::write::GzEncoder;
use flate2::Compression;
use phonedash::{source, CompressionFormat, OpenOptions};
use std::io::Write;
use tempfile::TempDir;

mod common;

fn latin1_phones() -> Vec<u8> {
    let text = common::csv_text(common::PHONES_HEADER, &common::PHONES_ROWS);
    encoding_rs::WINDOWS_1252.encode(&text).0.into_owned()
}

#[test]
fn gzip_is_detected_from_extension() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("phones.csv.gz");
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&latin1_phones()).unwrap();
    std::fs::write(&path, encoder.finish().unwrap()).unwrap();

    let df = source::load_csv(&path, &OpenOptions::default()).unwrap();
    assert_eq!(df.height(), 12);
    assert_eq!(df.width(), 9);
}

#[test]
fn explicit_compression_overrides_extension() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("phones.data");
    let compressed = zstd::encode_all(latin1_phones().as_slice(), 3).unwrap();
    std::fs::write(&path, compressed).unwrap();

    let options = OpenOptions::default().with_compression(CompressionFormat::Zstd);
    let df = source::load_csv(&path, &options).unwrap();
    assert_eq!(df.height(), 12);
}

#[test]
fn utf8_encoding_can_be_selected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("utf8.csv");
    std::fs::write(&path, "marca_telefono,precio_usd\nÑandú,10\n").unwrap();

    let latin1 = source::load_csv(&path, &OpenOptions::default()).unwrap();
    let utf8 = source::load_csv(&path, &OpenOptions::default().with_encoding("utf-8")).unwrap();

    let name = |df: &polars::prelude::DataFrame| {
        phonedash::frame::string_values(df, "marca_telefono").unwrap()[0]
            .clone()
            .unwrap()
    };
    assert_eq!(name(&utf8), "Ñandú");
    assert_ne!(name(&latin1), "Ñandú");
}

#[test]
fn headerless_files_get_generated_names() {
    let dir = TempDir::new().unwrap();
    let path = common::write_latin1(dir.path(), "plain.csv", "Samsung;150\nApple;829\n");
    let options = OpenOptions::default()
        .with_delimiter(b';')
        .with_has_header(false);
    let df = source::load_csv(&path, &options).unwrap();
    assert_eq!(df.height(), 2);
    assert_eq!(df.width(), 2);
}

#[test]
fn missing_file_is_an_error() {
    let err = source::load_csv(
        std::path::Path::new("no/such/phones.csv"),
        &OpenOptions::default(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("Failed to open"));
}

#[test]
fn default_options_read_latin1_files() {
    let dir = TempDir::new().unwrap();
    let path = common::write_phones_csv(dir.path());
    // ñ is stored as the single byte 0xF1
    assert!(std::fs::read(&path).unwrap().contains(&0xF1));

    let df = source::load_csv(&path, &OpenOptions::default()).unwrap();
    let models = phonedash::frame::string_values(&df, "modelo_telefono").unwrap();
    assert_eq!(models[8].as_deref(), Some("Moto G Señal"));
}

#[test]
fn quoted_thousands_in_prices() {
    let dir = TempDir::new().unwrap();
    let text = common::csv_text(
        "marca_telefono,ram,precio_usd",
        &["Apple,4,\"1,299\"", "Samsung,8,\"2,499\"", "Xiaomi,6,\"349,50\""],
    );
    let path = common::write_latin1(dir.path(), "prices.csv", &text);
    let df = source::load_csv(&path, &OpenOptions::default()).unwrap();
    assert_eq!(
        phonedash::frame::numeric_values(&df, "precio_usd").unwrap(),
        vec![Some(1299.0), Some(2499.0), Some(349.5)]
    );
}

use std::path::{Path, PathBuf};

pub const PHONES_HEADER: &str = "marca_telefono,modelo_telefono,sistema operativo,precio_usd,ram,almacenamiento,bateria,resolucion_pantalla,resolucion_video";

pub const PHONES_ROWS: [&str; 12] = [
    "Samsung,Galaxy A10,Android,150,2,32,3400,720x1520,1080p",
    "Samsung,Galaxy S21,Android,799,8,128,4000,1080x2400,8K",
    "Samsung,Galaxy A10,Android,140,2,32,3400,720x1520,1080p",
    "Apple,iPhone 12,iOS,829,4,64,2815,1170x2532,4K",
    "Apple,iPhone 12,iOS,899,4,128,2815,1170x2532,4K",
    "Apple,iPhone SE,iOS,399,3,64,1821,750x1334,4K",
    "Xiaomi,Redmi Note 9,Android,199,4,64,5020,1080x2340,1080p",
    "Xiaomi,Mi 11,Android,749,8,256,4600,1440x3200,8K",
    "Motorola,Moto G Señal,Android,179,4,64,5000,720x1600,1080p",
    "Samsung,Galaxy S21,Android,849,8,256,4000,1080x2400,8K",
    "Xiaomi,Redmi Note 9,Android,,4,128,5020,1080x2340,1080p",
    "Huawei,P30,EMUI,499,6,128,3650,1080x2340,4K",
];

/// CSV text with the given header and rows.
pub fn csv_text(header: &str, rows: &[&str]) -> String {
    let mut text = String::from(header);
    text.push('\n');
    for row in rows {
        text.push_str(row);
        text.push('\n');
    }
    text
}

/// Write `text` encoded as Latin-1 (windows-1252) to `dir/name`.
pub fn write_latin1(dir: &Path, name: &str, text: &str) -> PathBuf {
    let (bytes, _, had_errors) = encoding_rs::WINDOWS_1252.encode(text);
    assert!(!had_errors, "test data must be representable in Latin-1");
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// The sample phone table as a Latin-1 CSV inside `dir`.
pub fn write_phones_csv(dir: &Path) -> PathBuf {
    write_latin1(dir, "phones.csv", &csv_text(PHONES_HEADER, &PHONES_ROWS))
}

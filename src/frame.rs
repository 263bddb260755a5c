//! Small accessors over polars frames shared by the pipeline stages.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use polars::prelude::*;
use regex::Regex;
use std::sync::OnceLock;

/// Rendered preview of the first rows of a frame.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TablePreview {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Row count of the whole frame, not only the preview
    pub total_rows: usize,
}

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_index(name).is_some()
}

/// Integer and floating point dtypes; these are the columns a model can use.
pub fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

pub fn numeric_columns(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|c| is_numeric(c.dtype()))
        .map(|c| c.name().to_string())
        .collect()
}

pub fn string_columns(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|c| matches!(c.dtype(), DataType::String))
        .map(|c| c.name().to_string())
        .collect()
}

fn leading_number() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^\s*([-+]?)(?:(\d{1,3}(?:,\d{3})+(?:\.\d+)?)(?:\D|$)|(\d+(?:[.,]\d+)?|[.,]\d+))",
        )
        .expect("valid regex literal")
    })
}

/// Parse the leading number of a cell such as "8 GB" or "4500mAh".
/// Comma groups of three digits ("1,299") are thousands separators;
/// any other comma is a decimal comma ("6,5").
pub fn parse_lenient(s: &str) -> Option<f64> {
    let caps = leading_number().captures(s)?;
    let sign = caps.get(1).map_or("", |m| m.as_str());
    let digits = match (caps.get(2), caps.get(3)) {
        (Some(grouped), _) => grouped.as_str().replace(',', ""),
        (None, Some(plain)) => plain.as_str().replace(',', "."),
        (None, None) => return None,
    };
    format!("{}{}", sign, digits).parse::<f64>().ok()
}

/// Values of a column as text; nulls stay `None`.
pub fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .map_err(|_| eyre!("column '{}' not found", name))?;
    let as_str = column.cast(&DataType::String)?;
    Ok(as_str
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect())
}

/// Values of a column as f64. Numeric columns are cast; text columns are
/// parsed leniently. Unparsable cells and NaN become `None`.
pub fn numeric_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| eyre!("column '{}' not found", name))?;

    let values: Vec<Option<f64>> = if is_numeric(column.dtype()) {
        let cast = column.cast(&DataType::Float64)?;
        cast.f64()?.into_iter().collect()
    } else {
        string_values(df, name)?
            .into_iter()
            .map(|v| v.and_then(|s| parse_lenient(&s)))
            .collect()
    };

    Ok(values
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect())
}

fn format_cell(value: AnyValue) -> String {
    match value {
        AnyValue::Null => "null".to_string(),
        AnyValue::Float64(v) => format_float(v),
        AnyValue::Float32(v) => format_float(v as f64),
        other => other.str_value().to_string(),
    }
}

fn format_float(v: f64) -> String {
    if (v - v.round()).abs() < 1e-9 && v.abs() < 1e15 {
        format!("{:.1}", v)
    } else {
        format!("{}", (v * 1e4).round() / 1e4)
    }
}

/// First `n` rows of a frame, formatted for display.
pub fn preview(df: &DataFrame, n: usize) -> TablePreview {
    let head = df.head(Some(n));
    let headers = column_names(&head);
    let rows = (0..head.height())
        .map(|i| {
            head.get_columns()
                .iter()
                .map(|c| c.get(i).map(format_cell).unwrap_or_default())
                .collect()
        })
        .collect();

    TablePreview {
        headers,
        rows,
        total_rows: df.height(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_parsing_takes_leading_number() {
        assert_eq!(parse_lenient("8 GB"), Some(8.0));
        assert_eq!(parse_lenient("4500mAh"), Some(4500.0));
        assert_eq!(parse_lenient(" 6.5"), Some(6.5));
        assert_eq!(parse_lenient("6,5 pulgadas"), Some(6.5));
        assert_eq!(parse_lenient("-3"), Some(-3.0));
        assert_eq!(parse_lenient(",5"), Some(0.5));
        assert_eq!(parse_lenient("n/a"), None);
        assert_eq!(parse_lenient(""), None);
    }

    #[test]
    fn thousands_separators_are_not_decimals() {
        assert_eq!(parse_lenient("1,299"), Some(1299.0));
        assert_eq!(parse_lenient("12,499,000"), Some(12_499_000.0));
        assert_eq!(parse_lenient("1,299.50 USD"), Some(1299.5));
        assert_eq!(parse_lenient("-2,499"), Some(-2499.0));
        assert_eq!(parse_lenient("5,000mAh"), Some(5000.0));
        // Not a group of three: still a decimal comma
        assert_eq!(parse_lenient("1,2995"), Some(1.2995));
        assert_eq!(parse_lenient("1,29"), Some(1.29));
    }

    #[test]
    fn numeric_values_handle_text_and_numbers() {
        let df = df!(
            "ram" => &["8 GB", "12GB", "unknown"],
            "price" => &[199.0_f64, f64::NAN, 999.0]
        )
        .unwrap();
        assert_eq!(
            numeric_values(&df, "ram").unwrap(),
            vec![Some(8.0), Some(12.0), None]
        );
        assert_eq!(
            numeric_values(&df, "price").unwrap(),
            vec![Some(199.0), None, Some(999.0)]
        );
        assert!(numeric_values(&df, "missing").is_err());
    }

    #[test]
    fn preview_limits_rows_and_keeps_total() {
        let df = df!(
            "a" => (0..10).collect::<Vec<i64>>(),
            "b" => (0..10).map(|i| format!("v{}", i)).collect::<Vec<String>>()
        )
        .unwrap();
        let p = preview(&df, 3);
        assert_eq!(p.headers, vec!["a", "b"]);
        assert_eq!(p.rows.len(), 3);
        assert_eq!(p.rows[2], vec!["2", "v2"]);
        assert_eq!(p.total_rows, 10);
    }

    #[test]
    fn dtype_classification() {
        let df = df!(
            "i" => &[1_i64, 2],
            "f" => &[1.5_f64, 2.5],
            "s" => &["a", "b"]
        )
        .unwrap();
        assert_eq!(numeric_columns(&df), vec!["i", "f"]);
        assert_eq!(string_columns(&df), vec!["s"]);
        assert!(has_column(&df, "s"));
        assert!(!has_column(&df, "t"));
    }
}

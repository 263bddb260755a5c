//! Label encoding of text columns into integer codes.

use color_eyre::Result;
use polars::prelude::*;
use serde::Serialize;
use tracing::debug;

/// Text used for missing cells before encoding.
pub const MISSING_LABEL: &str = "nan";

/// Maps each distinct text value to its index in the sorted list of classes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn fit<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut classes: Vec<String> = values.into_iter().map(|v| v.as_ref().to_string()).collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn transform(&self, value: &str) -> Option<i64> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(value))
            .ok()
            .map(|i| i as i64)
    }

    pub fn inverse(&self, code: i64) -> Option<&str> {
        usize::try_from(code)
            .ok()
            .and_then(|i| self.classes.get(i))
            .map(|s| s.as_str())
    }
}

/// A text column that was replaced by codes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodedColumn {
    pub name: String,
    pub encoder: LabelEncoder,
}

pub struct EncodedFrame {
    pub frame: DataFrame,
    pub encoded: Vec<EncodedColumn>,
}

/// Encode one text column. Nulls are encoded as [`MISSING_LABEL`].
pub fn encode_column(df: &DataFrame, name: &str) -> Result<(Series, LabelEncoder)> {
    let values: Vec<String> = crate::frame::string_values(df, name)?
        .into_iter()
        .map(|v| v.unwrap_or_else(|| MISSING_LABEL.to_string()))
        .collect();
    let encoder = LabelEncoder::fit(&values);
    let codes: Vec<i64> = values
        .iter()
        .map(|v| encoder.transform(v).unwrap_or_default())
        .collect();
    Ok((Series::new(name.into(), codes), encoder))
}

/// Replace every text column of `df` with integer codes.
pub fn encode_categorical(df: &DataFrame) -> Result<EncodedFrame> {
    let mut frame = df.clone();
    let mut encoded = Vec::new();

    for name in crate::frame::string_columns(df) {
        let (series, encoder) = encode_column(df, &name)?;
        debug!(column = %name, classes = encoder.classes().len(), "label encoded");
        frame.with_column(series)?;
        encoded.push(EncodedColumn { name, encoder });
    }

    Ok(EncodedFrame { frame, encoded })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_are_sorted_and_distinct() {
        let enc = LabelEncoder::fit(["samsung", "apple", "xiaomi", "apple"]);
        assert_eq!(enc.classes(), &["apple", "samsung", "xiaomi"]);
        assert_eq!(enc.transform("apple"), Some(0));
        assert_eq!(enc.transform("xiaomi"), Some(2));
        assert_eq!(enc.transform("nokia"), None);
        assert_eq!(enc.inverse(1), Some("samsung"));
        assert_eq!(enc.inverse(-1), None);
        assert_eq!(enc.inverse(3), None);
    }

    #[test]
    fn encodes_only_text_columns() {
        let df = df!(
            "marca" => &[Some("b"), Some("a"), None, Some("b")],
            "ram" => &[4_i64, 8, 6, 12]
        )
        .unwrap();
        let out = encode_categorical(&df).unwrap();

        assert_eq!(out.encoded.len(), 1);
        assert_eq!(out.encoded[0].name, "marca");
        assert_eq!(out.encoded[0].encoder.classes(), &["a", "b", "nan"]);

        let codes: Vec<Option<i64>> = out.frame.column("marca").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(codes, vec![Some(1), Some(0), Some(2), Some(1)]);

        let ram: Vec<Option<i64>> = out.frame.column("ram").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(ram, vec![Some(4), Some(8), Some(6), Some(12)]);
    }

    #[test]
    fn frame_without_text_is_unchanged() {
        let df = df!("x" => &[1.0_f64, 2.0]).unwrap();
        let out = encode_categorical(&df).unwrap();
        assert!(out.encoded.is_empty());
        assert!(out.frame.equals(&df));
    }
}

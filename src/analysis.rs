//! Counting, filtering and per-model price summaries.

use color_eyre::Result;
use polars::prelude::*;
use serde::Serialize;
use std::fmt;

use crate::frame;

/// Label of the "no filter" entry in brand and model pickers.
pub const ALL_LABEL: &str = "All";

// Scratch column names for aggregation results
const COUNT: &str = "__count";
const MODEL: &str = "__model";
const PRICE: &str = "__price";

/// Text values of one column of an aggregated frame.
fn text_values(df: &DataFrame, column: &str) -> Result<Vec<String>> {
    Ok(df
        .column(column)?
        .str()?
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect())
}

fn f64_values(df: &DataFrame, column: &str) -> Result<Vec<f64>> {
    Ok(df
        .column(column)?
        .cast(&DataType::Float64)?
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}

/// Distinct non-null values of a column in the order they first appear.
pub fn unique_in_order(df: &DataFrame, column: &str) -> Result<Vec<String>> {
    let unique = df
        .clone()
        .lazy()
        .select([col(column).cast(DataType::String)])
        .drop_nulls(None)
        .unique_stable(None, UniqueKeepStrategy::First)
        .collect()?;
    text_values(&unique, column)
}

/// Occurrences per value, most frequent first. Ties keep first-seen order.
/// `limit` keeps only the first entries.
pub fn value_counts(
    df: &DataFrame,
    column: &str,
    limit: Option<usize>,
) -> Result<Vec<(String, usize)>> {
    let sort = SortMultipleOptions::default()
        .with_order_descending(true)
        .with_maintain_order(true);
    let mut lf = df
        .clone()
        .lazy()
        .select([col(column).cast(DataType::String)])
        .drop_nulls(None)
        .group_by_stable([col(column)])
        .agg([len().alias(COUNT)])
        .sort_by_exprs([col(COUNT)], sort);
    if let Some(limit) = limit {
        lf = lf.limit(limit as IdxSize);
    }
    let counts = lf.collect()?;

    let values = text_values(&counts, column)?;
    let totals = f64_values(&counts, COUNT)?;
    Ok(values
        .into_iter()
        .zip(totals)
        .map(|(value, n)| (value, n as usize))
        .collect())
}

/// One picker value: everything, or rows equal to a value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum Choice {
    #[default]
    All,
    Value(String),
}

impl Choice {
    pub fn from_option(value: Option<&str>) -> Self {
        match value {
            None => Self::All,
            Some(v) if v == ALL_LABEL => Self::All,
            Some(v) => Self::Value(v.to_string()),
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str(ALL_LABEL),
            Self::Value(v) => f.write_str(v),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BrandModelFilter {
    pub brand: Choice,
    pub model: Choice,
}

/// Rows whose `column` equals `value`. A missing column leaves `df` as is.
pub fn filter_equal(df: &DataFrame, column: &str, value: &str) -> Result<DataFrame> {
    if !frame::has_column(df, column) {
        return Ok(df.clone());
    }
    Ok(df
        .clone()
        .lazy()
        .filter(col(column).cast(DataType::String).eq(lit(value)))
        .collect()?)
}

/// Apply the brand choice, then the model choice.
pub fn apply_filter(
    df: &DataFrame,
    filter: &BrandModelFilter,
    brand_column: &str,
    model_column: &str,
) -> Result<DataFrame> {
    let mut out = df.clone();
    if let Choice::Value(brand) = &filter.brand {
        out = filter_equal(&out, brand_column, brand)?;
    }
    if let Choice::Value(model) = &filter.model {
        out = filter_equal(&out, model_column, model)?;
    }
    Ok(out)
}

/// Picker entries: "All" followed by the distinct values.
pub fn options_with_all(values: Vec<String>) -> Vec<String> {
    std::iter::once(ALL_LABEL.to_string())
        .chain(values.into_iter().filter(|v| v != ALL_LABEL))
        .collect()
}

/// Models available once the brand choice is applied.
pub fn model_options(
    df: &DataFrame,
    brand: &Choice,
    brand_column: &str,
    model_column: &str,
) -> Result<Vec<String>> {
    if !frame::has_column(df, model_column) {
        return Ok(Vec::new());
    }
    let brand_rows = match brand {
        Choice::All => df.clone(),
        Choice::Value(b) => filter_equal(df, brand_column, b)?,
    };
    unique_in_order(&brand_rows, model_column)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelPriceSummary {
    pub model: String,
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

/// Price statistics per model, in first-seen order. Models without a
/// numeric price are left out. Quartiles interpolate linearly.
pub fn price_by_model(
    df: &DataFrame,
    model_column: &str,
    price_column: &str,
) -> Result<Vec<ModelPriceSummary>> {
    // Prices go through the lenient parser so "1,299" or "899 USD" count.
    let prices = Series::new(PRICE.into(), frame::numeric_values(df, price_column)?);
    let mut base = df.select([model_column])?;
    base.with_column(prices)?;

    let price = || col(PRICE);
    let summary = base
        .lazy()
        .select([col(model_column).cast(DataType::String).alias(MODEL), price()])
        .drop_nulls(None)
        .group_by_stable([col(MODEL)])
        .agg([
            price().count().alias("count"),
            price().mean().alias("mean"),
            price().min().alias("min"),
            price()
                .quantile(lit(0.25), QuantileMethod::Linear)
                .alias("q1"),
            price().median().alias("median"),
            price()
                .quantile(lit(0.75), QuantileMethod::Linear)
                .alias("q3"),
            price().max().alias("max"),
        ])
        .collect()?;

    let models = text_values(&summary, MODEL)?;
    let stat = |name: &str| f64_values(&summary, name);
    let (count, mean, min, q1, median, q3, max) = (
        stat("count")?,
        stat("mean")?,
        stat("min")?,
        stat("q1")?,
        stat("median")?,
        stat("q3")?,
        stat("max")?,
    );

    Ok(models
        .into_iter()
        .enumerate()
        .map(|(i, model)| ModelPriceSummary {
            model,
            count: count[i] as usize,
            mean: mean[i],
            min: min[i],
            q1: q1[i],
            median: median[i],
            q3: q3[i],
            max: max[i],
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phones() -> DataFrame {
        df!(
            "marca" => &[Some("Samsung"), Some("Apple"), Some("Samsung"), Some("Xiaomi"), Some("Apple"), None, Some("Samsung")],
            "modelo" => &["A10", "iPhone 12", "S21", "Note 9", "iPhone 12", "X", "A10"],
            "precio" => &[150.0_f64, 800.0, 700.0, 200.0, 820.0, 10.0, 170.0]
        )
        .unwrap()
    }

    #[test]
    fn counts_are_sorted_with_stable_ties() {
        let counts = value_counts(&phones(), "marca", None).unwrap();
        assert_eq!(
            counts,
            vec![
                ("Samsung".to_string(), 3),
                ("Apple".to_string(), 2),
                ("Xiaomi".to_string(), 1)
            ]
        );
        let top = value_counts(&phones(), "marca", Some(2)).unwrap();
        assert_eq!(top.len(), 2);
    }

    #[test]
    fn unique_keeps_first_seen_order() {
        assert_eq!(
            unique_in_order(&phones(), "marca").unwrap(),
            vec!["Samsung", "Apple", "Xiaomi"]
        );
    }

    #[test]
    fn brand_then_model_filter() {
        let df = phones();
        let filter = BrandModelFilter {
            brand: Choice::Value("Samsung".into()),
            model: Choice::All,
        };
        assert_eq!(apply_filter(&df, &filter, "marca", "modelo").unwrap().height(), 3);

        let filter = BrandModelFilter {
            brand: Choice::Value("Samsung".into()),
            model: Choice::Value("A10".into()),
        };
        assert_eq!(apply_filter(&df, &filter, "marca", "modelo").unwrap().height(), 2);

        let all = BrandModelFilter::default();
        assert_eq!(apply_filter(&df, &all, "marca", "modelo").unwrap().height(), 7);
    }

    #[test]
    fn filter_on_missing_column_is_ignored() {
        let df = phones();
        let filter = BrandModelFilter {
            brand: Choice::Value("Samsung".into()),
            model: Choice::Value("A10".into()),
        };
        let out = apply_filter(&df, &filter, "marca", "no_such_column").unwrap();
        assert_eq!(out.height(), 3);
    }

    #[test]
    fn model_options_follow_brand() {
        let df = phones();
        assert_eq!(
            model_options(&df, &Choice::Value("Samsung".into()), "marca", "modelo").unwrap(),
            vec!["A10", "S21"]
        );
        assert_eq!(model_options(&df, &Choice::All, "marca", "modelo").unwrap().len(), 5);
        assert!(model_options(&df, &Choice::All, "marca", "missing").unwrap().is_empty());
    }

    #[test]
    fn choice_parsing_and_display() {
        assert_eq!(Choice::from_option(None), Choice::All);
        assert_eq!(Choice::from_option(Some("All")), Choice::All);
        assert_eq!(Choice::from_option(Some("Apple")).to_string(), "Apple");
        assert_eq!(
            options_with_all(vec!["Apple".into(), "Nokia".into()]),
            vec!["All", "Apple", "Nokia"]
        );
    }

    #[test]
    fn price_summary_per_model() {
        let summary = price_by_model(&phones(), "modelo", "precio").unwrap();
        let models: Vec<&str> = summary.iter().map(|s| s.model.as_str()).collect();
        assert_eq!(models, vec!["A10", "iPhone 12", "S21", "Note 9", "X"]);
        let iphone = &summary[1];
        assert_eq!(iphone.count, 2);
        assert!((iphone.mean - 810.0).abs() < 1e-9);
        assert_eq!(iphone.min, 800.0);
        assert_eq!(iphone.max, 820.0);
        assert!((iphone.median - 810.0).abs() < 1e-9);
        assert!((iphone.q1 - 805.0).abs() < 1e-9);
        assert!((iphone.q3 - 815.0).abs() < 1e-9);
    }

    #[test]
    fn quartiles_interpolate_linearly() {
        let df = df!(
            "modelo" => &["A", "A", "A", "A"],
            "precio" => &[1.0_f64, 2.0, 3.0, 4.0]
        )
        .unwrap();
        let summary = price_by_model(&df, "modelo", "precio").unwrap();
        assert_eq!(summary.len(), 1);
        assert!((summary[0].q1 - 1.75).abs() < 1e-12);
        assert!((summary[0].median - 2.5).abs() < 1e-12);
        assert!((summary[0].q3 - 3.25).abs() < 1e-12);
    }

    #[test]
    fn text_prices_with_thousands_separators() {
        let df = df!(
            "modelo" => &["Pro", "Pro", "Lite"],
            "precio" => &["1,299", "1,499 USD", "n/a"]
        )
        .unwrap();
        let summary = price_by_model(&df, "modelo", "precio").unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].model, "Pro");
        assert!((summary[0].mean - 1399.0).abs() < 1e-9);
        assert_eq!(summary[0].max, 1499.0);
    }
}

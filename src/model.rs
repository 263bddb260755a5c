//! Training the optional classifier on the encoded phone table.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use polars::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use crate::forest::{ForestParams, RandomForest};
use crate::frame;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingOutcome {
    pub target: String,
    pub features: Vec<String>,
    pub n_rows: usize,
    /// Rows left out because a used cell was missing
    pub dropped_rows: usize,
    pub n_classes: usize,
    /// Accuracy measured on the rows the forest was trained on
    pub accuracy: f64,
}

/// Numeric columns, in frame order; any of them can be the target.
pub fn candidate_targets(df: &DataFrame) -> Vec<String> {
    frame::numeric_columns(df)
}

/// Feature matrix and dense class labels built from a frame.
pub struct TrainingSet {
    pub features: Vec<String>,
    pub x: Vec<Vec<f64>>,
    pub y: Vec<usize>,
    /// Original target value of each class index
    pub classes: Vec<i64>,
    pub dropped_rows: usize,
}

impl TrainingSet {
    pub fn from_frame(df: &DataFrame, target: &str) -> Result<Self> {
        if !frame::has_column(df, target) {
            return Err(eyre!("Target column '{}' not found", target));
        }
        let target_dtype = df.column(target)?.dtype().clone();
        if !frame::is_numeric(&target_dtype) {
            return Err(eyre!(
                "Target column '{}' is not numeric ({})",
                target,
                target_dtype
            ));
        }

        let features: Vec<String> = frame::column_names(df)
            .into_iter()
            .filter(|name| name != target)
            .collect();
        if features.is_empty() {
            return Err(eyre!(
                "No feature columns left after removing target '{}'",
                target
            ));
        }

        let target_values = frame::numeric_values(df, target)?;
        let columns: Vec<Vec<Option<f64>>> = features
            .iter()
            .map(|name| frame::numeric_values(df, name))
            .collect::<Result<_>>()?;

        let mut x = Vec::new();
        let mut raw_labels = Vec::new();
        let mut dropped_rows = 0;
        for (row, label) in target_values.iter().enumerate() {
            let values: Option<Vec<f64>> = columns.iter().map(|c| c[row]).collect();
            match (values, label) {
                (Some(values), Some(label)) => {
                    if label.fract() != 0.0 {
                        return Err(eyre!(
                            "Target column '{}' holds continuous values (e.g. {}); \
                             a classifier needs discrete labels",
                            target,
                            label
                        ));
                    }
                    x.push(values);
                    raw_labels.push(*label as i64);
                }
                _ => dropped_rows += 1,
            }
        }

        if x.is_empty() {
            return Err(eyre!("No complete rows to train on"));
        }

        let index: BTreeMap<i64, usize> = raw_labels
            .iter()
            .copied()
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .enumerate()
            .map(|(i, v)| (v, i))
            .collect();
        let y = raw_labels.iter().map(|v| index[v]).collect();
        let classes = index.keys().copied().collect();

        Ok(Self {
            features,
            x,
            y,
            classes,
            dropped_rows,
        })
    }
}

/// Fit a forest predicting `target` from every other column and report its
/// accuracy on the same rows.
pub fn train(df: &DataFrame, target: &str, params: &ForestParams) -> Result<TrainingOutcome> {
    let set = TrainingSet::from_frame(df, target)?;
    let forest = RandomForest::fit(&set.x, &set.y, set.classes.len(), params)?;
    let accuracy = forest.score(&set.x, &set.y)?;

    info!(
        column = %target,
        rows = set.x.len(),
        classes = forest.n_classes(),
        accuracy,
        "trained random forest"
    );

    Ok(TrainingOutcome {
        target: target.to_string(),
        features: set.features,
        n_rows: set.x.len(),
        dropped_rows: set.dropped_rows,
        n_classes: forest.n_classes(),
        accuracy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phones() -> DataFrame {
        df!(
            "marca" => &[0_i64, 1, 2, 0, 1, 2, 0, 1],
            "ram" => &[Some(4_i64), Some(8), Some(12), Some(4), None, Some(12), Some(6), Some(8)],
            "precio" => &[150.0_f64, 400.0, 900.0, 160.0, 420.0, 950.0, 200.0, 380.0]
        )
        .unwrap()
    }

    #[test]
    fn candidates_are_numeric_columns() {
        let mut df = phones();
        df.with_column(Series::new("texto".into(), &["a", "b", "c", "d", "e", "f", "g", "h"]))
            .unwrap();
        assert_eq!(candidate_targets(&df), vec!["marca", "ram", "precio"]);
    }

    #[test]
    fn training_set_drops_incomplete_rows_and_densifies_labels() {
        let set = TrainingSet::from_frame(&phones(), "ram").unwrap();
        assert_eq!(set.features, vec!["marca", "precio"]);
        assert_eq!(set.dropped_rows, 1);
        assert_eq!(set.x.len(), 7);
        assert_eq!(set.classes, vec![4, 6, 8, 12]);
        assert_eq!(set.y[0], 0);
        assert_eq!(set.y[2], 3);
    }

    #[test]
    fn trains_and_scores_on_training_rows() {
        let outcome = train(&phones(), "marca", &ForestParams::default()).unwrap();
        assert_eq!(outcome.target, "marca");
        assert_eq!(outcome.n_classes, 3);
        assert_eq!(outcome.n_rows, 7);
        assert_eq!(outcome.dropped_rows, 1);
        assert!(outcome.accuracy > 0.5 && outcome.accuracy <= 1.0);
    }

    #[test]
    fn continuous_target_is_rejected() {
        let df = df!(
            "a" => &[1_i64, 2, 3],
            "precio" => &[10.5_f64, 20.0, 30.25]
        )
        .unwrap();
        let err = train(&df, "precio", &ForestParams::default()).unwrap_err();
        assert!(err.to_string().contains("continuous"));
    }

    #[test]
    fn missing_or_lonely_target_is_an_error() {
        assert!(train(&phones(), "nope", &ForestParams::default()).is_err());
        let lonely = df!("y" => &[1_i64, 2]).unwrap();
        assert!(train(&lonely, "y", &ForestParams::default()).is_err());
    }
}

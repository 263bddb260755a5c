//! Chart descriptions shared by the terminal view and the file exporter.

use color_eyre::Result;
use polars::prelude::*;
use serde::Serialize;

use crate::analysis::ModelPriceSummary;
use crate::frame;

pub const CHART_ROW_LIMIT: usize = 10_000;

/// Continuous color scale for bar charts, applied by bar height.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ColorScale {
    Viridis,
    Cividis,
    /// Every bar in the first palette color
    Single,
}

impl ColorScale {
    fn stops(self) -> &'static [(u8, u8, u8)] {
        match self {
            Self::Viridis => &[
                (68, 1, 84),
                (59, 82, 139),
                (33, 145, 140),
                (94, 201, 98),
                (253, 231, 37),
            ],
            Self::Cividis => &[
                (0, 34, 78),
                (65, 77, 107),
                (124, 123, 120),
                (188, 175, 111),
                (254, 232, 56),
            ],
            Self::Single => &[(31, 119, 180)],
        }
    }

    /// Color at position `t` in [0, 1].
    pub fn at(self, t: f64) -> (u8, u8, u8) {
        let stops = self.stops();
        if stops.len() == 1 || !t.is_finite() {
            return stops[0];
        }
        let t = t.clamp(0.0, 1.0) * (stops.len() - 1) as f64;
        let i = (t.floor() as usize).min(stops.len() - 2);
        let f = t - i as f64;
        let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * f).round() as u8;
        let (a, b) = (stops[i], stops[i + 1]);
        (lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
    }
}

/// Categorical palette for grouped series.
pub const PALETTE: [(u8, u8, u8); 10] = [
    (99, 110, 250),
    (239, 85, 59),
    (0, 204, 150),
    (171, 99, 250),
    (255, 161, 90),
    (25, 211, 243),
    (255, 102, 146),
    (182, 232, 128),
    (255, 151, 255),
    (254, 203, 82),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SeriesColor {
    Blue,
    Green,
    Purple,
    Palette(usize),
}

impl SeriesColor {
    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            Self::Blue => (0, 0, 255),
            Self::Green => (0, 128, 0),
            Self::Purple => (128, 0, 128),
            Self::Palette(i) => PALETTE[i % PALETTE.len()],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScatterSeries {
    pub name: String,
    pub color: SeriesColor,
    pub points: Vec<(f64, f64)>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BoxStats {
    pub label: String,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl From<&ModelPriceSummary> for BoxStats {
    fn from(s: &ModelPriceSummary) -> Self {
        Self {
            label: s.model.clone(),
            min: s.min,
            q1: s.q1,
            median: s.median,
            q3: s.q3,
            max: s.max,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartSpec {
    Bar {
        title: String,
        x_label: String,
        y_label: String,
        bars: Vec<(String, usize)>,
        scale: ColorScale,
    },
    Scatter {
        title: String,
        x_label: String,
        y_label: String,
        series: Vec<ScatterSeries>,
        /// Dark background template
        dark: bool,
    },
    BoxPlot {
        title: String,
        x_label: String,
        y_label: String,
        boxes: Vec<BoxStats>,
    },
}

/// Axis bounds of a chart: (x_min, x_max, y_min, y_max).
pub type Bounds = (f64, f64, f64, f64);

impl ChartSpec {
    pub fn title(&self) -> &str {
        match self {
            Self::Bar { title, .. } | Self::Scatter { title, .. } | Self::BoxPlot { title, .. } => {
                title
            }
        }
    }

    pub fn labels(&self) -> (&str, &str) {
        match self {
            Self::Bar {
                x_label, y_label, ..
            }
            | Self::Scatter {
                x_label, y_label, ..
            }
            | Self::BoxPlot {
                x_label, y_label, ..
            } => (x_label.as_str(), y_label.as_str()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Bar { bars, .. } => bars.is_empty(),
            Self::Scatter { series, .. } => series.iter().all(|s| s.points.is_empty()),
            Self::BoxPlot { boxes, .. } => boxes.is_empty(),
        }
    }

    /// Data bounds, widened when degenerate so axes always have extent.
    /// Bar and box charts use category indices on x.
    pub fn bounds(&self) -> Option<Bounds> {
        if self.is_empty() {
            return None;
        }
        let (x_min, x_max, y_min, y_max) = match self {
            Self::Bar { bars, .. } => {
                let max = bars.iter().map(|b| b.1).max().unwrap_or(0) as f64;
                (-0.5, bars.len() as f64 - 0.5, 0.0, max)
            }
            Self::Scatter { series, .. } => series
                .iter()
                .flat_map(|s| s.points.iter())
                .fold(
                    (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
                    |(a, b, c, d), &(x, y)| (a.min(x), b.max(x), c.min(y), d.max(y)),
                ),
            Self::BoxPlot { boxes, .. } => {
                let lo = boxes.iter().map(|b| b.min).fold(f64::INFINITY, f64::min);
                let hi = boxes.iter().map(|b| b.max).fold(f64::NEG_INFINITY, f64::max);
                (-0.5, boxes.len() as f64 - 0.5, lo, hi)
            }
        };
        let widen = |lo: f64, hi: f64| if hi > lo { (lo, hi) } else { (lo - 0.5, hi + 0.5) };
        let (x_min, x_max) = widen(x_min, x_max);
        let (y_min, y_max) = widen(y_min, y_max);
        Some((x_min, x_max, y_min, y_max))
    }
}

/// (x, y) pairs of two columns; rows where either side is missing are
/// dropped. At most `CHART_ROW_LIMIT` points.
pub fn numeric_points(df: &DataFrame, x_column: &str, y_column: &str) -> Result<Vec<(f64, f64)>> {
    let xs = frame::numeric_values(df, x_column)?;
    let ys = frame::numeric_values(df, y_column)?;
    Ok(xs
        .into_iter()
        .zip(ys)
        .filter_map(|(x, y)| Some((x?, y?)))
        .take(CHART_ROW_LIMIT)
        .collect())
}

/// One series per value of `group_column`, in first-seen order, colored
/// from the palette.
pub fn grouped_points(
    df: &DataFrame,
    x_column: &str,
    y_column: &str,
    group_column: &str,
) -> Result<Vec<ScatterSeries>> {
    let xs = frame::numeric_values(df, x_column)?;
    let ys = frame::numeric_values(df, y_column)?;
    let groups = frame::string_values(df, group_column)?;

    let mut series: Vec<ScatterSeries> = Vec::new();
    let mut total = 0;
    for ((x, y), group) in xs.into_iter().zip(ys).zip(groups) {
        let (Some(x), Some(y), Some(group)) = (x, y, group) else {
            continue;
        };
        if total >= CHART_ROW_LIMIT {
            break;
        }
        total += 1;
        match series.iter_mut().find(|s| s.name == group) {
            Some(s) => s.points.push((x, y)),
            None => {
                let color = SeriesColor::Palette(series.len());
                series.push(ScatterSeries {
                    name: group,
                    color,
                    points: vec![(x, y)],
                });
            }
        }
    }
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_skip_missing_values() {
        let df = df!(
            "ram" => &[Some(4.0_f64), None, Some(8.0)],
            "precio" => &[Some(100.0_f64), Some(200.0), Some(300.0)]
        )
        .unwrap();
        assert_eq!(
            numeric_points(&df, "ram", "precio").unwrap(),
            vec![(4.0, 100.0), (8.0, 300.0)]
        );
    }

    #[test]
    fn missing_column_errors() {
        let df = df!("x" => &[1.0_f64], "y" => &[2.0_f64]).unwrap();
        assert!(numeric_points(&df, "missing", "y").is_err());
    }

    #[test]
    fn grouped_series_follow_first_seen_order() {
        let df = df!(
            "ram" => &[4.0_f64, 8.0, 6.0, 12.0],
            "precio" => &[100.0_f64, 800.0, 150.0, 900.0],
            "marca" => &["Xiaomi", "Apple", "Xiaomi", "Apple"]
        )
        .unwrap();
        let series = grouped_points(&df, "ram", "precio", "marca").unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].name, "Xiaomi");
        assert_eq!(series[0].points, vec![(4.0, 100.0), (6.0, 150.0)]);
        assert_eq!(series[1].color, SeriesColor::Palette(1));
    }

    #[test]
    fn color_scale_endpoints() {
        assert_eq!(ColorScale::Viridis.at(0.0), (68, 1, 84));
        assert_eq!(ColorScale::Viridis.at(1.0), (253, 231, 37));
        assert_eq!(ColorScale::Cividis.at(2.0), (254, 232, 56));
        assert_eq!(ColorScale::Single.at(0.7), (31, 119, 180));
    }

    #[test]
    fn bounds_widen_single_point() {
        let chart = ChartSpec::Scatter {
            title: "t".into(),
            x_label: "x".into(),
            y_label: "y".into(),
            series: vec![ScatterSeries {
                name: "s".into(),
                color: SeriesColor::Blue,
                points: vec![(2.0, 3.0)],
            }],
            dark: false,
        };
        assert_eq!(chart.bounds(), Some((1.5, 2.5, 2.5, 3.5)));

        let empty = ChartSpec::Bar {
            title: "t".into(),
            x_label: "x".into(),
            y_label: "y".into(),
            bars: vec![],
            scale: ColorScale::Single,
        };
        assert!(empty.is_empty());
        assert_eq!(empty.bounds(), None);
    }
}

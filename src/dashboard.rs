//! The dashboard pipeline: selection, encoding, optional training and the
//! fixed sequence of tables and charts, recomputed for every interaction.

use color_eyre::Result;
use polars::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::analysis::{self, BrandModelFilter, Choice, ModelPriceSummary};
use crate::chart_data::{self, BoxStats, ChartSpec, ColorScale, SeriesColor, ScatterSeries};
use crate::encoding::{self, EncodedColumn};
use crate::forest::ForestParams;
use crate::frame::{self, TablePreview};
use crate::model::{self, TrainingOutcome};
use crate::selection::{self, SELECTED_COLUMNS};

/// Which column plays which part in the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnRoles {
    pub selected: Vec<String>,
    pub brand: String,
    pub model: String,
    pub os: String,
    pub price: String,
    pub ram: String,
    pub storage: String,
    pub battery: String,
}

impl Default for ColumnRoles {
    fn default() -> Self {
        Self {
            selected: SELECTED_COLUMNS.iter().map(|s| s.to_string()).collect(),
            brand: "marca_telefono".to_string(),
            model: "modelo_telefono".to_string(),
            os: "sistema operativo".to_string(),
            price: "precio_usd".to_string(),
            ram: "ram".to_string(),
            storage: "almacenamiento".to_string(),
            battery: "bateria".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardOptions {
    pub head_rows: usize,
    pub top_n: usize,
    /// Train a forest predicting this column
    pub train_target: Option<String>,
    pub forest: ForestParams,
    pub filter: BrandModelFilter,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            head_rows: 5,
            top_n: 10,
            train_target: None,
            forest: ForestParams::default(),
            filter: BrandModelFilter::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Columns,
    Encoding,
    Model,
    Popularity,
    Prices,
    Dashboard,
}

impl SectionKind {
    pub const ALL: [Self; 6] = [
        Self::Columns,
        Self::Encoding,
        Self::Model,
        Self::Popularity,
        Self::Prices,
        Self::Dashboard,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::Columns => "Selected Columns",
            Self::Encoding => "Categorical Encoding",
            Self::Model => "Random Forest",
            Self::Popularity => "Popularity",
            Self::Prices => "Price vs Specifications",
            Self::Dashboard => "Dashboard",
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            Self::Columns => "Columns",
            Self::Encoding => "Encoding",
            Self::Model => "Model",
            Self::Popularity => "Popularity",
            Self::Prices => "Prices",
            Self::Dashboard => "Dashboard",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Item {
    Text { text: String },
    /// A part of the dashboard that could not be shown
    Notice { text: String },
    Error { text: String },
    Table { title: String, table: TablePreview },
    Chart { chart: ChartSpec },
    Training { outcome: TrainingOutcome },
    PriceSummary { rows: Vec<ModelPriceSummary> },
}

impl Item {
    fn text(s: impl Into<String>) -> Self {
        Self::Text { text: s.into() }
    }

    fn notice(s: impl Into<String>) -> Self {
        Self::Notice { text: s.into() }
    }

    fn table(title: impl Into<String>, table: TablePreview) -> Self {
        Self::Table {
            title: title.into(),
            table,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub kind: SectionKind,
    pub title: String,
    pub items: Vec<Item>,
}

impl Section {
    fn new(kind: SectionKind) -> Self {
        Self {
            kind,
            title: kind.title().to_string(),
            items: Vec::new(),
        }
    }

    pub fn charts(&self) -> impl Iterator<Item = &ChartSpec> {
        self.items.iter().filter_map(|item| match item {
            Item::Chart { chart } => Some(chart),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub sections: Vec<Section>,
    pub candidate_targets: Vec<String>,
    pub brand_options: Vec<String>,
    pub model_options: Vec<String>,
    pub filter: BrandModelFilter,
    pub encoded_columns: Vec<EncodedColumn>,
}

impl DashboardReport {
    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    pub fn charts(&self) -> impl Iterator<Item = &ChartSpec> {
        self.sections.iter().flat_map(|s| s.charts())
    }
}

/// Notice naming the columns of `needed` that `df` lacks, if any.
fn missing_notice(df: &DataFrame, needed: &[&str], what: &str) -> Option<Item> {
    let missing: Vec<&str> = needed
        .iter()
        .copied()
        .filter(|c| !frame::has_column(df, c))
        .collect();
    if missing.is_empty() {
        return None;
    }
    Some(Item::notice(format!(
        "{} skipped: column{} {} not in the file",
        what,
        if missing.len() > 1 { "s" } else { "" },
        missing
            .iter()
            .map(|c| format!("\"{}\"", c))
            .collect::<Vec<_>>()
            .join(", ")
    )))
}

/// A loaded table with its projection and encoding computed once.
pub struct Dashboard {
    df: DataFrame,
    roles: ColumnRoles,
    selected: Option<DataFrame>,
    encoded: Option<encoding::EncodedFrame>,
    training_cache: HashMap<String, std::result::Result<TrainingOutcome, String>>,
    cached_params: Option<ForestParams>,
}

impl Dashboard {
    pub fn new(df: DataFrame, roles: ColumnRoles) -> Result<Self> {
        let selected = selection::project(&df, &roles.selected)?;
        let encoded = match &selected {
            Some(sel) => Some(encoding::encode_categorical(sel)?),
            None => None,
        };
        debug!(
            rows = df.height(),
            selected = selected.as_ref().map(|s| s.width()).unwrap_or(0),
            "dashboard data prepared"
        );
        Ok(Self {
            df,
            roles,
            selected,
            encoded,
            training_cache: HashMap::new(),
            cached_params: None,
        })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    /// Number of targets with a cached training result.
    pub fn trained_targets(&self) -> usize {
        self.training_cache.len()
    }

    /// Targets the forest can be trained on.
    pub fn candidate_targets(&self) -> Vec<String> {
        self.encoded
            .as_ref()
            .map(|e| model::candidate_targets(&e.frame))
            .unwrap_or_default()
    }

    /// Train (or reuse) the forest for `target`.
    pub fn training(
        &mut self,
        target: &str,
        params: &ForestParams,
    ) -> std::result::Result<TrainingOutcome, String> {
        if self.cached_params.as_ref() != Some(params) {
            self.training_cache.clear();
            self.cached_params = Some(params.clone());
        }
        if let Some(hit) = self.training_cache.get(target) {
            return hit.clone();
        }
        let outcome = match &self.encoded {
            Some(e) => model::train(&e.frame, target, params).map_err(|e| e.to_string()),
            None => Err("No selected columns to train on".to_string()),
        };
        if let Err(e) = &outcome {
            warn!(target_column = target, error = %e, "training failed");
        }
        self.training_cache
            .insert(target.to_string(), outcome.clone());
        outcome
    }

    pub fn report(&mut self, options: &DashboardOptions) -> Result<DashboardReport> {
        let candidate_targets = self.candidate_targets();
        let brand_options = if frame::has_column(&self.df, &self.roles.brand) {
            analysis::options_with_all(analysis::unique_in_order(&self.df, &self.roles.brand)?)
        } else {
            Vec::new()
        };
        let model_options = if frame::has_column(&self.df, &self.roles.model) {
            analysis::options_with_all(analysis::model_options(
                &self.df,
                &options.filter.brand,
                &self.roles.brand,
                &self.roles.model,
            )?)
        } else {
            Vec::new()
        };

        let training = options
            .train_target
            .as_deref()
            .map(|target| self.training(target, &options.forest));

        let sections = vec![
            self.columns_section(options),
            self.encoding_section(options),
            self.model_section(&candidate_targets, options, training),
            self.popularity_section(options)?,
            self.prices_section(options)?,
            self.dashboard_section(options, &brand_options, &model_options)?,
        ];

        Ok(DashboardReport {
            sections,
            candidate_targets,
            brand_options,
            model_options,
            filter: options.filter.clone(),
            encoded_columns: self
                .encoded
                .as_ref()
                .map(|e| e.encoded.clone())
                .unwrap_or_default(),
        })
    }

    fn no_selection_notice(&self) -> Item {
        Item::notice(format!(
            "None of the selected columns ({}) are present in the file",
            self.roles.selected.join(", ")
        ))
    }

    fn columns_section(&self, options: &DashboardOptions) -> Section {
        let mut section = Section::new(SectionKind::Columns);
        match &self.selected {
            Some(sel) => section.items.push(Item::table(
                "Selected columns of the dataset",
                frame::preview(sel, options.head_rows),
            )),
            None => section.items.push(self.no_selection_notice()),
        }
        section
    }

    fn encoding_section(&self, options: &DashboardOptions) -> Section {
        let mut section = Section::new(SectionKind::Encoding);
        let Some(encoded) = &self.encoded else {
            section.items.push(self.no_selection_notice());
            return section;
        };
        if encoded.frame.height() == 0 {
            section
                .items
                .push(Item::notice("The file has no data rows; nothing to convert"));
            return section;
        }
        if encoded.encoded.is_empty() {
            section
                .items
                .push(Item::text("No categorical columns to convert."));
            return section;
        }
        for column in &encoded.encoded {
            section.items.push(Item::text(format!(
                "Column {} converted successfully ({} categories).",
                column.name,
                column.encoder.classes().len()
            )));
        }
        section.items.push(Item::table(
            "Dataset with categorical columns converted",
            frame::preview(&encoded.frame, options.head_rows),
        ));
        section
    }

    fn model_section(
        &self,
        candidates: &[String],
        options: &DashboardOptions,
        training: Option<std::result::Result<TrainingOutcome, String>>,
    ) -> Section {
        let mut section = Section::new(SectionKind::Model);
        if self.encoded.is_none() {
            section.items.push(self.no_selection_notice());
            return section;
        }
        if candidates.is_empty() {
            section
                .items
                .push(Item::notice("No numeric column can be used as a target"));
        } else {
            section.items.push(Item::text(format!(
                "Target candidates: {}",
                candidates.join(", ")
            )));
        }
        match training {
            None => section
                .items
                .push(Item::text("Model training is off.")),
            Some(Ok(outcome)) => {
                section.items.push(Item::text(format!(
                    "Trained {} trees to predict {}.",
                    options.forest.n_trees, outcome.target
                )));
                section.items.push(Item::Training { outcome });
            }
            Some(Err(e)) => section.items.push(Item::Error { text: e }),
        }
        section
    }

    fn popularity_bar(
        &self,
        column: &str,
        title: &str,
        x_label: &str,
        scale: ColorScale,
        top_n: usize,
    ) -> Result<Item> {
        if let Some(notice) = missing_notice(&self.df, &[column], title) {
            return Ok(notice);
        }
        let bars = analysis::value_counts(&self.df, column, Some(top_n))?;
        Ok(Item::Chart {
            chart: ChartSpec::Bar {
                title: title.to_string(),
                x_label: x_label.to_string(),
                y_label: "Number of Phones".to_string(),
                bars,
                scale,
            },
        })
    }

    fn popularity_section(&self, options: &DashboardOptions) -> Result<Section> {
        let mut section = Section::new(SectionKind::Popularity);
        let n = options.top_n;
        section.items.push(self.popularity_bar(
            &self.roles.brand,
            &format!("Brand Popularity (Top {})", n),
            "Brand",
            ColorScale::Viridis,
            n,
        )?);
        section.items.push(self.popularity_bar(
            &self.roles.os,
            &format!("Operating System Popularity (Top {})", n),
            "Operating System",
            ColorScale::Cividis,
            n,
        )?);
        Ok(section)
    }

    fn price_scatter(
        &self,
        x_column: &str,
        spec_name: &str,
        unit: &str,
        color: SeriesColor,
    ) -> Result<Item> {
        let title = format!("Price (USD) vs {}", spec_name);
        let price = self.roles.price.as_str();
        if let Some(notice) = missing_notice(&self.df, &[x_column, price], &title) {
            return Ok(notice);
        }
        let points = chart_data::numeric_points(&self.df, x_column, price)?;
        Ok(Item::Chart {
            chart: ChartSpec::Scatter {
                title,
                x_label: format!("{} ({})", spec_name, unit),
                y_label: "Price (USD)".to_string(),
                series: vec![ScatterSeries {
                    name: spec_name.to_string(),
                    color,
                    points,
                }],
                dark: true,
            },
        })
    }

    fn prices_section(&self, options: &DashboardOptions) -> Result<Section> {
        let mut section = Section::new(SectionKind::Prices);
        section.items.push(Item::table(
            "First rows of the dataset",
            frame::preview(&self.df, options.head_rows),
        ));
        let roles = &self.roles;
        section
            .items
            .push(self.price_scatter(&roles.ram, "RAM", "GB", SeriesColor::Blue)?);
        section
            .items
            .push(self.price_scatter(&roles.storage, "Storage", "GB", SeriesColor::Green)?);
        section
            .items
            .push(self.price_scatter(&roles.battery, "Battery", "mAh", SeriesColor::Purple)?);
        Ok(section)
    }

    fn brand_scatter(&self, rows: &DataFrame, x_column: &str, spec_name: &str) -> Result<Item> {
        let title = format!("Price vs {}", spec_name);
        let roles = &self.roles;
        if let Some(notice) =
            missing_notice(rows, &[x_column, &roles.price, &roles.brand], &title)
        {
            return Ok(notice);
        }
        let series = chart_data::grouped_points(rows, x_column, &roles.price, &roles.brand)?;
        Ok(Item::Chart {
            chart: ChartSpec::Scatter {
                title,
                x_label: x_column.to_string(),
                y_label: roles.price.clone(),
                series,
                dark: false,
            },
        })
    }

    fn dashboard_section(
        &self,
        options: &DashboardOptions,
        brand_options: &[String],
        model_options: &[String],
    ) -> Result<Section> {
        let mut section = Section::new(SectionKind::Dashboard);
        let roles = &self.roles;

        match &self.encoded {
            Some(e) => section.items.push(Item::table(
                "Filtered dataset",
                frame::preview(&e.frame, options.head_rows),
            )),
            None => section.items.push(self.no_selection_notice()),
        }

        if !frame::has_column(&self.df, &roles.brand) {
            section.items.push(Item::notice(format!(
                "The file has no \"{}\" column; brand and model filtering is unavailable",
                roles.brand
            )));
            return Ok(section);
        }

        let filter = &options.filter;
        if let Choice::Value(brand) = &filter.brand {
            if !brand_options.iter().any(|b| b == brand) {
                section
                    .items
                    .push(Item::notice(format!("Brand \"{}\" does not appear in the file", brand)));
            }
        }
        if let Choice::Value(model) = &filter.model {
            if !model_options.iter().any(|m| m == model) {
                section.items.push(Item::notice(format!(
                    "Model \"{}\" does not appear for brand {}",
                    model, filter.brand
                )));
            }
        }

        let rows = analysis::apply_filter(&self.df, filter, &roles.brand, &roles.model)?;
        section
            .items
            .push(Item::text(format!("Showing data for brand: {}", filter.brand)));
        if frame::has_column(&self.df, &roles.model) {
            section
                .items
                .push(Item::text(format!("Showing data for model: {}", filter.model)));
        }
        section.items.push(Item::table(
            "Phones matching the selection",
            frame::preview(&rows, options.head_rows),
        ));

        section
            .items
            .push(self.brand_scatter(&rows, &roles.ram, "RAM")?);
        section
            .items
            .push(self.brand_scatter(&rows, &roles.storage, "Storage")?);
        section
            .items
            .push(self.brand_scatter(&rows, &roles.battery, "Battery")?);

        section.items.push(Item::Chart {
            chart: ChartSpec::Bar {
                title: "Phone Brand Popularity".to_string(),
                x_label: "Brand".to_string(),
                y_label: "Count".to_string(),
                bars: analysis::value_counts(&rows, &roles.brand, None)?,
                scale: ColorScale::Single,
            },
        });

        let title = "Price Distribution by Model";
        match missing_notice(&rows, &[&roles.model, &roles.price], title) {
            Some(notice) => section.items.push(notice),
            None => {
                let summary = analysis::price_by_model(&rows, &roles.model, &roles.price)?;
                section.items.push(Item::Chart {
                    chart: ChartSpec::BoxPlot {
                        title: title.to_string(),
                        x_label: roles.model.clone(),
                        y_label: roles.price.clone(),
                        boxes: summary.iter().map(BoxStats::from).collect(),
                    },
                });
                section.items.push(Item::PriceSummary { rows: summary });
            }
        }

        Ok(section)
    }
}

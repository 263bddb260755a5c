use color_eyre::Result;
use polars::prelude::*;

/// Columns shown in the "selected columns" table when no config overrides them.
pub const SELECTED_COLUMNS: [&str; 7] = [
    "marca_telefono",
    "almacenamiento",
    "ram",
    "resolucion_pantalla",
    "bateria",
    "resolucion_video",
    "precio_usd",
];

/// Selected columns that exist in `available`, in the order of `selected`.
pub fn columns_to_use<S: AsRef<str>>(available: &[String], selected: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in selected {
        let name = name.as_ref();
        if available.iter().any(|a| a == name) && !out.iter().any(|o| o == name) {
            out.push(name.to_string());
        }
    }
    out
}

/// Project `df` onto the selected columns that exist. `None` when none do.
pub fn project<S: AsRef<str>>(df: &DataFrame, selected: &[S]) -> Result<Option<DataFrame>> {
    let available = crate::frame::column_names(df);
    let use_columns = columns_to_use(&available, selected);
    if use_columns.is_empty() {
        return Ok(None);
    }
    Ok(Some(df.select(use_columns.iter().map(|s| s.as_str()))?))
}

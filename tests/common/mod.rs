use std::path::PathBuf;

use heatpump_dashboard::{DashboardConfig, NormalizedSeries};

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("ingest")
        .join(name)
}

pub fn load_fixture(name: &str) -> NormalizedSeries {
    NormalizedSeries::load(fixture(name), &DashboardConfig::default())
        .expect("fixture should load")
}

pub fn f64s(df: &polars::prelude::DataFrame, name: &str) -> Vec<Option<f64>> {
    df.column(name)
        .expect("column exists")
        .f64()
        .expect("column is Float64")
        .into_iter()
        .collect()
}

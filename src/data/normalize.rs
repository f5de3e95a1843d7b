use std::path::Path;

use chrono_tz::Tz;
use polars::prelude::{DataFrame, DataType, Expr, IntoLazy, col, lit};
use strum::IntoEnumIterator;
use tracing::{debug, info, warn};

use crate::{
    config::DashboardConfig,
    data::{
        column::{ChannelCol, DerivedCol, TIMESTAMP},
        resample::{BucketWidth, resample},
        source::read_raw,
    },
    error::{DashboardResult, DataError, polars_err},
    week::WeekSpan,
};

/// The monitoring log restricted to numeric channels and resampled to the
/// native cadence, with `P_Sur` and `P_conso` attached.
///
/// Built once per process and borrowed by every consumer.
#[derive(Debug, Clone)]
pub struct NormalizedSeries {
    df: DataFrame,
    tz: Tz,
    width: BucketWidth,
}

impl NormalizedSeries {
    /// Reads, normalizes and resamples the log at `path`.
    ///
    /// # Errors
    /// Fails if the file is missing or malformed, if a timestamp cannot be
    /// parsed, or if a required channel is absent.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>, cfg: &DashboardConfig) -> DashboardResult<Self> {
        cfg.validate()?;
        let raw = read_raw(path.as_ref())?;
        Self::from_raw(raw, cfg.tz()?, cfg.native_bucket)
    }

    /// Normalizes an already-read frame whose `timestamp` column holds instants.
    pub fn from_raw(raw: DataFrame, tz: Tz, width: BucketWidth) -> DashboardResult<Self> {
        let numeric = numeric_only(raw)?;
        ensure_channels(&numeric)?;

        let resampled = resample(&numeric, width, tz)?;
        let df = resampled
            .lazy()
            .with_columns(load_time_exprs())
            .collect()
            .map_err(|e| polars_err("Failed to compute surplus and consumption", e))?;

        info!(
            rows = df.height(),
            channels = df.width() - 1,
            width = %width,
            tz = %tz,
            "Normalized monitoring log"
        );
        Ok(Self { df, tz, width })
    }

    pub fn as_df(&self) -> &DataFrame {
        &self.df
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    pub fn width(&self) -> BucketWidth {
        self.width
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Rows whose instant falls within `span` on the civil clock.
    ///
    /// A span outside the data's coverage yields an empty frame.
    #[tracing::instrument(skip(self), fields(week = %span.slug()))]
    pub fn select_week(&self, span: &WeekSpan) -> DashboardResult<DataFrame> {
        let (start, end) = span.bounds_micros(self.tz);
        let instant = col(TIMESTAMP).cast(DataType::Int64);

        let slice = self
            .df
            .clone()
            .lazy()
            .filter(
                instant
                    .clone()
                    .gt_eq(lit(start))
                    .and(instant.lt(lit(end))),
            )
            .collect()
            .map_err(|e| polars_err("Failed to slice week", e))?;

        if slice.height() == 0 {
            warn!(week = %span.label(), "Selected week has no data");
        } else {
            debug!(rows = slice.height(), "Selected week");
        }
        Ok(slice)
    }
}

/// Keeps the timestamp and every integer or float column, cast to `Float64`.
fn numeric_only(raw: DataFrame) -> DashboardResult<DataFrame> {
    let mut selection = vec![col(TIMESTAMP)];
    let mut dropped = Vec::new();

    for column in raw.get_columns() {
        let name = column.name().as_str();
        if name == TIMESTAMP {
            continue;
        }
        if is_numeric(column.dtype()) {
            selection.push(col(name).cast(DataType::Float64));
        } else {
            dropped.push(name.to_string());
        }
    }

    if !dropped.is_empty() {
        debug!(?dropped, "Dropped non-numeric columns");
    }

    raw.lazy()
        .select(selection)
        .collect()
        .map_err(|e| polars_err("Failed to select numeric columns", e))
}

fn is_numeric(dtype: &DataType) -> bool {
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

fn ensure_channels(df: &DataFrame) -> DashboardResult<()> {
    let names = df.get_column_names();
    for channel in ChannelCol::iter() {
        if !names.iter().any(|n| n.as_str() == channel.as_str()) {
            return Err(DataError::MissingColumn(channel.to_string()).into());
        }
    }
    Ok(())
}

fn load_time_exprs() -> Vec<Expr> {
    let grid = ChannelCol::GridElec.expr();
    vec![
        (ChannelCol::HeatPumpElec.expr() - grid.clone()).alias(DerivedCol::Surplus),
        (grid * lit(-1.0)).alias(DerivedCol::Consumption),
    ]
}

use std::{fmt, str::FromStr, sync::Arc};

use chrono_tz::Tz;
use polars::prelude::{
    Column, DataFrame, DataType, Duration, Expr, Field, IntoLazy, PlSmallStr, PolarsUpsample,
    Schema, SortMultipleOptions, TimeUnit, TimeZone, col, lit,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    data::column::TIMESTAMP,
    error::{ConfigError, DashboardError, DashboardResult, DataError, polars_err},
};

const SECONDS_PER_DAY: u64 = 86_400;

/// Width of a fixed aggregation window.
///
/// Sub-day widths are aligned on the civil clock of the time zone (a 1h bucket
/// starts on the local hour), day widths start at local midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BucketWidth {
    Minutes(u32),
    Hours(u32),
    Days(u32),
}

impl BucketWidth {
    pub const NATIVE: Self = Self::Minutes(2);
    pub const HOURLY: Self = Self::Hours(1);
    pub const DAILY: Self = Self::Days(1);

    /// The width as a polars duration string, e.g. `2m` or `1d` (calendar day).
    pub fn as_polars_str(&self) -> String {
        self.to_string()
    }

    fn every(&self) -> DashboardResult<Duration> {
        Duration::try_parse(&self.as_polars_str())
            .map_err(|e| polars_err(&format!("Invalid bucket width {self}"), e))
    }

    /// Start of the bucket holding each row's instant, on the local clock of `tz`.
    pub fn truncate_expr(&self, tz: &TimeZone) -> Expr {
        local_time(tz)
            .dt()
            .truncate(lit(self.as_polars_str()))
    }
}

impl Default for BucketWidth {
    fn default() -> Self {
        Self::NATIVE
    }
}

impl fmt::Display for BucketWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minutes(n) => write!(f, "{n}m"),
            Self::Hours(n) => write!(f, "{n}h"),
            Self::Days(n) => write!(f, "{n}d"),
        }
    }
}

impl FromStr for BucketWidth {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |msg: &str| ConfigError::InvalidBucketWidth {
            value: s.to_string(),
            msg: msg.to_string(),
        };

        let duration = humantime::parse_duration(s.trim()).map_err(|e| invalid(&e.to_string()))?;
        if duration.subsec_nanos() != 0 {
            return Err(invalid("sub-second widths are not supported").into());
        }

        let secs = duration.as_secs();
        let to_u32 = |v: u64| u32::try_from(v).map_err(|_| invalid("width too large"));
        match secs {
            0 => Err(invalid("width must be positive").into()),
            s if s % SECONDS_PER_DAY == 0 => Ok(Self::Days(to_u32(s / SECONDS_PER_DAY)?)),
            s if SECONDS_PER_DAY % s != 0 => {
                Err(invalid("sub-day widths must divide a day evenly").into())
            }
            s if s % 3_600 == 0 => Ok(Self::Hours(to_u32(s / 3_600)?)),
            s if s % 60 == 0 => Ok(Self::Minutes(to_u32(s / 60)?)),
            _ => Err(invalid("width must be a whole number of minutes").into()),
        }
    }
}

impl TryFrom<String> for BucketWidth {
    type Error = DashboardError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BucketWidth> for String {
    fn from(value: BucketWidth) -> Self {
        value.to_string()
    }
}

// ================================================================================================
// Civil Time
// ================================================================================================

/// The polars time zone matching `tz`.
pub fn polars_time_zone(tz: Tz) -> DashboardResult<TimeZone> {
    TimeZone::opt_try_new(Some(tz.name()))
        .map_err(|e| polars_err(&format!("Unsupported time zone {tz}"), e))?
        .ok_or_else(|| ConfigError::InvalidTimeZone(tz.name().to_string()).into())
}

/// The timestamp column viewed on the civil clock of `tz`.
pub fn local_time(tz: &TimeZone) -> Expr {
    col(TIMESTAMP).dt().convert_time_zone(tz.clone())
}

/// Day of week, Monday = 0.
pub fn local_weekday_expr(tz: &TimeZone) -> Expr {
    (local_time(tz).dt().weekday().cast(DataType::Int32) - lit(1)).cast(DataType::Int32)
}

pub fn local_hour_expr(tz: &TimeZone) -> Expr {
    local_time(tz).dt().hour().cast(DataType::Int32)
}

// ================================================================================================
// Resampling
// ================================================================================================

/// Reads the timestamp column of `df` as epoch microseconds.
pub fn timestamps_micros(df: &DataFrame) -> DashboardResult<Vec<i64>> {
    let column = df
        .column(TIMESTAMP)
        .map_err(|_| DataError::MissingColumn(TIMESTAMP.to_string()))?;
    let ca = column.datetime().map_err(|_| DataError::UnexpectedType {
        column: TIMESTAMP.to_string(),
        dtype: column.dtype().to_string(),
    })?;

    ca.physical()
        .into_iter()
        .enumerate()
        .map(|(row, v)| v.ok_or_else(|| DataError::MissingTimestamp(row).into()))
        .collect()
}

/// Builds a timestamp column from epoch microseconds.
pub fn timestamp_column(values: Vec<i64>) -> DashboardResult<Column> {
    Column::new(TIMESTAMP.into(), values)
        .cast(&timestamp_dtype())
        .map_err(|e| polars_err("Failed to build timestamp column", e))
}

pub fn timestamp_dtype() -> DataType {
    DataType::Datetime(TimeUnit::Microseconds, Some(TimeZone::UTC))
}

/// Names of every column except the timestamp.
pub fn value_columns(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .filter(|name| name.as_str() != TIMESTAMP)
        .map(|name| name.to_string())
        .collect()
}

/// Resamples `df` to buckets of `width` by taking the arithmetic mean of every
/// value column within each bucket.
///
/// Every bucket between the first and the last occupied one is present in the
/// output. Buckets without samples hold nulls, and nulls inside a bucket are
/// skipped by the mean. The output is sorted by timestamp and keeps the
/// column order of the input.
pub fn resample(df: &DataFrame, width: BucketWidth, tz: Tz) -> DashboardResult<DataFrame> {
    let values = value_columns(df);
    if df.height() == 0 {
        return Ok(empty_frame(&values));
    }

    let local = polars_time_zone(tz)?;
    let means: Vec<Expr> = values
        .iter()
        .map(|name| col(name.as_str()).cast(DataType::Float64).mean())
        .collect();

    let grouped = df
        .clone()
        .lazy()
        .with_column(width.truncate_expr(&local).alias(TIMESTAMP))
        .group_by([col(TIMESTAMP)])
        .agg(means)
        .sort([TIMESTAMP], SortMultipleOptions::default())
        .collect()
        .map_err(|e| polars_err(&format!("Failed to resample to {width}"), e))?;

    let mut selection = Vec::with_capacity(values.len() + 1);
    selection.push(col(TIMESTAMP).dt().convert_time_zone(TimeZone::UTC));
    selection.extend(values.iter().map(|name| col(name.as_str())));

    let out = grouped
        .upsample(Vec::<PlSmallStr>::new(), TIMESTAMP, width.every()?)
        .map_err(|e| polars_err(&format!("Failed to fill {width} gaps"), e))?
        .lazy()
        .select(selection)
        .collect()
        .map_err(|e| polars_err(&format!("Failed to resample to {width}"), e))?;

    debug!(
        width = %width,
        rows_in = df.height(),
        rows_out = out.height(),
        "Resampled frame"
    );
    Ok(out)
}

/// A frame with a timestamp column and `Float64` value columns, but no rows.
pub fn empty_frame(values: &[String]) -> DataFrame {
    let mut fields = Vec::with_capacity(values.len() + 1);
    fields.push(Field::new(TIMESTAMP.into(), timestamp_dtype()));
    fields.extend(
        values
            .iter()
            .map(|name| Field::new(name.as_str().into(), DataType::Float64)),
    );
    DataFrame::empty_with_schema(&Arc::new(Schema::from_iter(fields)))
}

use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::{
    Column, DataFrame, DataType, IntoLazy, LazyCsvReader, LazyFileListReader, PlPath, col,
};
use strum::{Display, EnumString, IntoStaticStr};
use tracing::{debug, info};

use crate::{
    data::{
        column::TIMESTAMP,
        resample::{timestamp_column, timestamp_dtype},
    },
    error::{DashboardError, DashboardResult, DataError, IoError, polars_err},
};

/// Days between the spreadsheet epoch (1899-12-30) and the Unix epoch.
const SPREADSHEET_UNIX_EPOCH_DAYS: f64 = 25_569.0;
const MICROS_PER_DAY: f64 = 86_400_000_000.0;

const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M%:z",
];

const NAIVE_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Input formats the dashboard can ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum SourceFormat {
    Csv,
    Spreadsheet,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> DashboardResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .ok_or_else(|| {
                IoError::UnsupportedFormat(format!(
                    "missing or invalid extension in path '{}'",
                    path.display()
                ))
            })?;

        match ext.as_str() {
            "csv" => Ok(Self::Csv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(Self::Spreadsheet),
            other => Err(IoError::UnsupportedFormat(format!("'{other}'")).into()),
        }
    }
}

/// Reads the monitoring log at `path`.
///
/// The returned frame holds a `timestamp` column of absolute instants (UTC,
/// microseconds) followed by every other column of the input in header order.
/// Columns are typed as read; numeric filtering happens during normalization.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn read_raw(path: &Path) -> DashboardResult<DataFrame> {
    if !path.exists() {
        return Err(IoError::NotFound(path.display().to_string()).into());
    }

    let format = SourceFormat::from_path(path)?;
    let df = match format {
        SourceFormat::Csv => read_csv(path)?,
        SourceFormat::Spreadsheet => read_spreadsheet(path)?,
    };

    if df.height() == 0 {
        return Err(DataError::EmptyInput.into());
    }

    info!(
        format = %format,
        rows = df.height(),
        columns = df.width(),
        "Read raw monitoring log"
    );
    Ok(df)
}

// ================================================================================================
// CSV
// ================================================================================================

fn read_csv(path: &Path) -> DashboardResult<DataFrame> {
    let uri = path.to_str().ok_or_else(|| {
        IoError::ReadFailed(format!(
            "Path contains invalid UTF-8 characters: {}",
            path.display()
        ))
    })?;

    // scan every row before fixing column types
    let df = LazyCsvReader::new(PlPath::new(uri))
        .with_has_header(true)
        .with_infer_schema_length(None)
        .finish()
        .and_then(|lf| lf.collect())
        .map_err(|e| IoError::ReadFailed(format!("{}: {e}", path.display())))?;

    normalize_timestamp_column(df)
}

/// Replaces the timestamp column of a freshly read frame by parsed instants.
fn normalize_timestamp_column(df: DataFrame) -> DashboardResult<DataFrame> {
    let dtype = df
        .column(TIMESTAMP)
        .map_err(|_| DataError::MissingColumn(TIMESTAMP.to_string()))?
        .dtype()
        .clone();

    match dtype {
        DataType::String => {
            let parsed = parse_string_timestamps(&df)?;
            let mut df = df;
            df.with_column(parsed)
                .map_err(|e| polars_err("Failed to replace timestamp column", e))?;
            Ok(df)
        }
        DataType::Datetime(_, _) | DataType::Date => df
            .lazy()
            .with_column(col(TIMESTAMP).cast(timestamp_dtype()))
            .collect()
            .map_err(|e| polars_err("Failed to cast timestamp column", e)),
        other => Err(DataError::UnexpectedType {
            column: TIMESTAMP.to_string(),
            dtype: other.to_string(),
        }
        .into()),
    }
}

fn parse_string_timestamps(df: &DataFrame) -> DashboardResult<Column> {
    let ca = df
        .column(TIMESTAMP)
        .and_then(|c| c.str())
        .map_err(|e| polars_err("Timestamp column", e))?;

    let micros = ca
        .into_iter()
        .enumerate()
        .map(|(row, value)| match value {
            Some(raw) => parse_instant(raw).ok_or_else(|| {
                DataError::TimestampParse {
                    row,
                    value: raw.to_string(),
                }
                .into()
            }),
            None => Err(DataError::MissingTimestamp(row).into()),
        })
        .collect::<DashboardResult<Vec<_>>>()?;

    timestamp_column(micros)
}

// ================================================================================================
// Spreadsheet
// ================================================================================================

fn read_spreadsheet(path: &Path) -> DashboardResult<DataFrame> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| IoError::Spreadsheet(e.to_string()))?;

    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| IoError::Spreadsheet("workbook contains no sheets".to_string()))?;
    debug!(sheet = %sheet, "Reading first worksheet");

    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| IoError::Spreadsheet(e.to_string()))?;

    let mut rows = range.rows();
    let header: Vec<String> = rows
        .next()
        .ok_or(DataError::EmptyInput)?
        .iter()
        .map(|cell| cell.to_string().trim().to_string())
        .collect();
    let body: Vec<&[Data]> = rows.collect();

    let ts_index = header
        .iter()
        .position(|name| name == TIMESTAMP)
        .ok_or_else(|| DataError::MissingColumn(TIMESTAMP.to_string()))?;

    let mut columns = Vec::with_capacity(header.len());
    let micros = body
        .iter()
        .enumerate()
        .map(|(row, cells)| cell_instant(row, cells.get(ts_index)))
        .collect::<DashboardResult<Vec<_>>>()?;
    columns.push(timestamp_column(micros)?);

    for (index, name) in header.iter().enumerate() {
        if index == ts_index || name.is_empty() {
            continue;
        }
        let cells: Vec<Option<&Data>> = body.iter().map(|row| row.get(index)).collect();
        columns.push(sheet_column(name, &cells));
    }

    DataFrame::new(columns).map_err(|e| polars_err("Failed to assemble spreadsheet frame", e))
}

fn cell_instant(row: usize, cell: Option<&Data>) -> DashboardResult<i64> {
    let err = |value: String| -> DashboardError { DataError::TimestampParse { row, value }.into() };

    match cell {
        None | Some(Data::Empty) => Err(DataError::MissingTimestamp(row).into()),
        Some(Data::DateTime(dt)) => Ok(serial_to_micros(dt.as_f64())),
        Some(Data::Float(serial)) => Ok(serial_to_micros(*serial)),
        Some(Data::Int(serial)) => Ok(serial_to_micros(*serial as f64)),
        Some(Data::String(s)) | Some(Data::DateTimeIso(s)) => {
            parse_instant(s).ok_or_else(|| err(s.clone()))
        }
        Some(other) => Err(err(other.to_string())),
    }
}

/// Builds a column from spreadsheet cells: `Float64` when every non-empty cell
/// is a number, `Boolean` when every one is a boolean, `String` otherwise.
fn sheet_column(name: &str, cells: &[Option<&Data>]) -> Column {
    let present = || cells.iter().flatten().filter(|c| !matches!(c, Data::Empty));

    if present().all(|c| matches!(c, Data::Float(_) | Data::Int(_))) {
        let values: Vec<Option<f64>> = cells
            .iter()
            .map(|cell| match cell {
                Some(Data::Float(v)) => Some(*v),
                Some(Data::Int(v)) => Some(*v as f64),
                _ => None,
            })
            .collect();
        return Column::new(name.into(), values);
    }

    if present().all(|c| matches!(c, Data::Bool(_))) {
        let values: Vec<Option<bool>> = cells
            .iter()
            .map(|cell| match cell {
                Some(Data::Bool(v)) => Some(*v),
                _ => None,
            })
            .collect();
        return Column::new(name.into(), values);
    }

    let values: Vec<Option<String>> = cells
        .iter()
        .map(|cell| match cell {
            None | Some(Data::Empty) => None,
            Some(other) => Some(other.to_string()),
        })
        .collect();
    Column::new(name.into(), values)
}

// ================================================================================================
// Timestamp Parsing
// ================================================================================================

/// Parses a timestamp string to epoch microseconds.
///
/// Strings with an offset keep it; naive strings and bare dates are read as UTC.
pub fn parse_instant(raw: &str) -> Option<i64> {
    let s = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_micros());
    }
    if let Some(dt) = OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(s, fmt).ok())
    {
        return Some(dt.timestamp_micros());
    }
    if let Some(dt) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(dt.and_utc().timestamp_micros());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(chrono::NaiveTime::MIN).and_utc().timestamp_micros())
}

fn serial_to_micros(serial: f64) -> i64 {
    ((serial - SPREADSHEET_UNIX_EPOCH_DAYS) * MICROS_PER_DAY).round() as i64
}

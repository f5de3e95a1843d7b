use std::{fs, path::Path, str::FromStr};

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    data::resample::BucketWidth,
    error::{ConfigError, DashboardResult, IoError},
    week::WeekCatalog,
};

const DEFAULT_TIMEZONE: &str = "Europe/Brussels";
const DEFAULT_AUTOPROD_THRESHOLD_W: f64 = 100.0;

/// Settings of one dashboard session.
///
/// Every field has a default, so a config file only needs to list what it
/// changes:
///
/// ```
/// # use heatpump_dashboard::config::DashboardConfig;
/// let cfg: DashboardConfig = serde_json::from_str(r#"{ "timezone": "Europe/Paris" }"#).unwrap();
/// assert_eq!(cfg.native_bucket.to_string(), "2m");
/// assert_eq!(cfg.weeks.len(), 13);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// IANA name of the civil time zone all buckets and labels use.
    pub timezone: String,

    /// Cadence the raw log is resampled to at load time.
    pub native_bucket: BucketWidth,

    /// Heat-pump draw (W) at or below which the self-production ratio is undefined.
    pub autoprod_threshold_w: f64,

    /// Weeks offered by the selector.
    pub weeks: WeekCatalog,

    /// Chart dimensions.
    pub chart: ChartConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE.to_string(),
            native_bucket: BucketWidth::NATIVE,
            autoprod_threshold_w: DEFAULT_AUTOPROD_THRESHOLD_W,
            weeks: WeekCatalog::default(),
            chart: ChartConfig::default(),
        }
    }
}

impl DashboardConfig {
    /// Loads and validates a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> DashboardResult<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(IoError::Io)?;
        let cfg: Self = serde_json::from_str(&raw).map_err(IoError::Json)?;
        cfg.validate()?;
        info!(path = %path.display(), "Loaded dashboard config");
        Ok(cfg)
    }

    pub fn with_timezone(self, timezone: impl Into<String>) -> Self {
        Self {
            timezone: timezone.into(),
            ..self
        }
    }

    pub fn with_native_bucket(self, native_bucket: BucketWidth) -> Self {
        Self {
            native_bucket,
            ..self
        }
    }

    pub fn with_autoprod_threshold(self, watts: f64) -> Self {
        Self {
            autoprod_threshold_w: watts,
            ..self
        }
    }

    pub fn with_weeks(self, weeks: WeekCatalog) -> Self {
        Self { weeks, ..self }
    }

    pub fn with_chart(self, chart: ChartConfig) -> Self {
        Self { chart, ..self }
    }

    /// Parsed time zone.
    pub fn tz(&self) -> DashboardResult<Tz> {
        Tz::from_str(&self.timezone)
            .map_err(|_| ConfigError::InvalidTimeZone(self.timezone.clone()).into())
    }

    /// Checks every field and returns the first problem found.
    pub fn validate(&self) -> DashboardResult<()> {
        self.tz()?;

        if !self.autoprod_threshold_w.is_finite() || self.autoprod_threshold_w < 0.0 {
            return Err(ConfigError::InvalidThreshold(format!(
                "autoprod threshold must be a non-negative number of watts, got {}",
                self.autoprod_threshold_w
            ))
            .into());
        }

        self.weeks.validate()?;
        self.chart.validate()
    }
}

/// Pixel dimensions of the rendered charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub width: u32,
    pub height: u32,
    pub heatmap_height: u32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 480,
            heatmap_height: 420,
        }
    }
}

impl ChartConfig {
    const MIN_SIDE: u32 = 200;

    pub fn validate(&self) -> DashboardResult<()> {
        let too_small = [self.width, self.height, self.heatmap_height]
            .iter()
            .any(|side| *side < Self::MIN_SIDE);
        if too_small {
            return Err(ConfigError::InvalidChartSize(format!(
                "every side must be at least {} px, got {self:?}",
                Self::MIN_SIDE
            ))
            .into());
        }
        Ok(())
    }
}

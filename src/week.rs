use chrono::{Datelike, Days, NaiveDate, NaiveTime, TimeDelta, TimeZone, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, DashboardResult};

/// First Monday of the monitoring campaign.
const CAMPAIGN_START: (i32, u32, u32) = (2024, 11, 4);
const CAMPAIGN_WEEKS: u64 = 13;

/// A closed calendar interval `[start, end]` analysed as one week.
///
/// `start` is taken from 00:00 and `end` through 23:59:59 on the civil clock
/// of the dashboard's time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WeekSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WeekSpan {
    /// Creates a span.
    ///
    /// # Errors
    /// Returns an error if `end` precedes `start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> DashboardResult<Self> {
        let span = Self { start, end };
        span.validate()?;
        Ok(span)
    }

    /// The seven-day span opening on `monday`.
    pub fn starting(monday: NaiveDate) -> Self {
        Self {
            start: monday,
            end: monday.checked_add_days(Days::new(6)).unwrap_or(monday),
        }
    }

    pub fn validate(&self) -> DashboardResult<()> {
        if self.end < self.start {
            return Err(ConfigError::InvalidWeekSpan {
                start: self.start.to_string(),
                end: self.end.to_string(),
                msg: "end date precedes start date".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Absolute bounds of the span in epoch microseconds, as the half-open
    /// interval `[start 00:00, day after end 00:00)`.
    pub fn bounds_micros(&self, tz: Tz) -> (i64, i64) {
        let after_end = self.end.checked_add_days(Days::new(1)).unwrap_or(self.end);
        (
            local_midnight_micros(self.start, tz),
            local_midnight_micros(after_end, tz),
        )
    }

    /// Number of calendar days covered, both ends included.
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn is_monday_aligned(&self) -> bool {
        self.start.weekday() == Weekday::Mon && self.num_days() == 7
    }

    /// Label shown in the week selector, e.g. `Du 04/11/2024 au 10/11/2024`.
    pub fn label(&self) -> String {
        format!(
            "Du {} au {}",
            self.start.format("%d/%m/%Y"),
            self.end.format("%d/%m/%Y")
        )
    }

    /// Stable identifier used in output file names, e.g. `2024-11-04`.
    pub fn slug(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }
}

/// Ordered list of the weeks an operator can pick from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeekCatalog {
    weeks: Vec<WeekSpan>,
}

impl Default for WeekCatalog {
    /// The thirteen Monday-aligned weeks from 2024-11-04 to 2025-02-02.
    fn default() -> Self {
        let (y, m, d) = CAMPAIGN_START;
        let first = NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default();
        let weeks = (0..CAMPAIGN_WEEKS)
            .filter_map(|i| first.checked_add_days(Days::new(7 * i)))
            .map(WeekSpan::starting)
            .collect();
        Self { weeks }
    }
}

impl WeekCatalog {
    pub fn new(weeks: Vec<WeekSpan>) -> DashboardResult<Self> {
        let catalog = Self { weeks };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn validate(&self) -> DashboardResult<()> {
        self.weeks.iter().try_for_each(WeekSpan::validate)
    }

    pub fn len(&self) -> usize {
        self.weeks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weeks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WeekSpan> {
        self.weeks.iter()
    }

    /// Week at zero-based `index`.
    pub fn get(&self, index: usize) -> DashboardResult<&WeekSpan> {
        self.weeks.get(index).ok_or_else(|| {
            ConfigError::WeekOutOfRange {
                index,
                len: self.weeks.len(),
            }
            .into()
        })
    }

    /// Position of the week opening on `start`.
    pub fn position(&self, start: NaiveDate) -> Option<usize> {
        self.weeks.iter().position(|w| w.start == start)
    }
}

/// First instant of `date` on the civil clock of `tz`, in epoch microseconds.
///
/// Where midnight falls in a DST gap the day opens at the first valid local
/// time after it.
fn local_midnight_micros(date: NaiveDate, tz: Tz) -> i64 {
    let midnight = date.and_time(NaiveTime::MIN);
    (0..=3)
        .find_map(|h| {
            tz.from_local_datetime(&(midnight + TimeDelta::hours(h)))
                .earliest()
        })
        .map(|dt| dt.timestamp_micros())
        .unwrap_or_else(|| midnight.and_utc().timestamp_micros())
}

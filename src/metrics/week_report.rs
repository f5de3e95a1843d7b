use chrono_tz::Tz;
use polars::prelude::DataFrame;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use tracing::info;

use crate::{
    data::{
        normalize::NormalizedSeries,
        resample::{BucketWidth, resample},
    },
    error::DashboardResult,
    metrics::{
        derived::with_week_metrics,
        heatmap::{WeekHeatmaps, bucket_by_day_hour},
    },
    week::WeekSpan,
};

/// Every table the charts of one week are drawn from.
#[derive(Debug, Clone)]
pub struct WeekReport {
    pub span: WeekSpan,
    pub tz: Tz,
    /// Cadence of the detail table.
    pub bucket: BucketWidth,
    /// Native-cadence slice with `grid_elec_positive` and `autoprod`.
    pub detail: WeekTable,
    /// Hourly means of the detail slice.
    pub hourly: WeekTable,
    /// Daily means of the detail slice.
    pub daily: WeekTable,
    pub heatmaps: WeekHeatmaps,
}

impl WeekReport {
    /// Slices `series` to `span` and prepares every table of the week.
    ///
    /// A week without data gives empty tables and all-zero heatmaps.
    #[tracing::instrument(skip(series), fields(week = %span.slug()))]
    pub fn build(
        series: &NormalizedSeries,
        span: &WeekSpan,
        autoprod_threshold_w: f64,
    ) -> DashboardResult<Self> {
        let tz = series.tz();
        let slice = series.select_week(span)?;
        let detail = with_week_metrics(slice, autoprod_threshold_w)?;

        let hourly = resample(&detail, BucketWidth::HOURLY, tz)?;
        let daily = resample(&detail, BucketWidth::DAILY, tz)?;
        let heatmaps = bucket_by_day_hour(&detail, tz)?;

        info!(
            detail_rows = detail.height(),
            hourly_rows = hourly.height(),
            daily_rows = daily.height(),
            "Built week report"
        );

        Ok(Self {
            span: *span,
            tz,
            bucket: series.width(),
            detail: WeekTable::new(TableKind::Detail, detail),
            hourly: WeekTable::new(TableKind::Hourly, hourly),
            daily: WeekTable::new(TableKind::Daily, daily),
            heatmaps,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.detail.as_df().height() == 0
    }

    pub fn tables(&self) -> [&WeekTable; 3] {
        [&self.detail, &self.hourly, &self.daily]
    }
}

/// Granularity of a prepared week table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum TableKind {
    Detail,
    Hourly,
    Daily,
}

/// One prepared table of a week report.
#[derive(Debug, Clone)]
pub struct WeekTable {
    kind: TableKind,
    df: DataFrame,
}

impl WeekTable {
    pub fn new(kind: TableKind, df: DataFrame) -> Self {
        Self { kind, df }
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn as_df(&self) -> &DataFrame {
        &self.df
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};
    use polars::prelude::df;

    use super::*;
    use crate::{
        data::{
            column::TIMESTAMP,
            resample::{timestamp_column, timestamps_micros},
        },
        metrics::heatmap::{DAYS, HOURS},
    };

    const BRUSSELS: Tz = chrono_tz::Europe::Brussels;

    fn utc(s: &str) -> i64 {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
            .unwrap()
            .and_utc()
            .timestamp_micros()
    }

    fn series(rows: &[(&str, f64, f64, f64)]) -> NormalizedSeries {
        let n = rows.len();
        let mut df = df![
            "P_grid_elec" => rows.iter().map(|r| r.1).collect::<Vec<_>>(),
            "P_HP_elec" => rows.iter().map(|r| r.2).collect::<Vec<_>>(),
            "T_HP_flow" => vec![35.0; n],
            "T_HP_return" => vec![30.0; n],
            "T_house_actual" => rows.iter().map(|r| r.3).collect::<Vec<_>>(),
        ]
        .unwrap();
        df.with_column(timestamp_column(rows.iter().map(|r| utc(r.0)).collect()).unwrap())
            .unwrap();
        NormalizedSeries::from_raw(df, BRUSSELS, BucketWidth::NATIVE).unwrap()
    }

    fn week_of_nov_4() -> WeekSpan {
        WeekSpan::starting(NaiveDate::from_ymd_opt(2024, 11, 4).unwrap())
    }

    #[test]
    fn builds_every_table_of_a_week() {
        let series = series(&[
            ("2024-11-04 09:00:00", 500.0, 800.0, 20.0),
            ("2024-11-04 09:02:00", 500.0, 50.0, 21.0),
            ("2024-11-05 09:00:00", -200.0, 0.0, 19.0),
        ]);

        let report = WeekReport::build(&series, &week_of_nov_4(), 100.0).unwrap();

        let autoprod: Vec<Option<f64>> = report
            .detail
            .as_df()
            .column("autoprod")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .take(2)
            .collect();
        assert_eq!(autoprod, vec![Some(37.5), None]);

        // 10:00 on the 4th through 10:00 on the 5th, local time
        assert_eq!(report.hourly.as_df().height(), 25);
        assert_eq!(report.daily.as_df().height(), 2);
        assert_eq!(
            timestamps_micros(report.daily.as_df()).unwrap(),
            vec![utc("2024-11-03 23:00:00"), utc("2024-11-04 23:00:00")]
        );

        let indoor: Vec<Option<f64>> = report
            .hourly
            .as_df()
            .column("T_house_actual")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(indoor.first(), Some(&Some(20.5)));
        assert_eq!(indoor.get(1), Some(&None));

        assert_eq!(report.heatmaps.power.get(0, 10), 425.0);
        assert_eq!(report.heatmaps.working.get(0, 10), 2.0);
    }

    #[test]
    fn daily_autoprod_skips_undefined_rows() {
        let series = series(&[
            ("2024-11-04 09:00:00", 500.0, 800.0, 20.0),
            ("2024-11-04 09:02:00", 0.0, 1000.0, 20.0),
            ("2024-11-04 09:04:00", 0.0, 10.0, 20.0),
        ]);

        let report = WeekReport::build(&series, &week_of_nov_4(), 100.0).unwrap();

        let daily = report.daily.as_df().column("autoprod").unwrap().f64().unwrap().get(0);
        assert_eq!(daily, Some((37.5 + 100.0) / 2.0));
    }

    #[test]
    fn empty_week_yields_empty_tables_and_zero_grids() {
        let series = series(&[("2024-11-04 09:00:00", 500.0, 800.0, 20.0)]);
        let span = WeekSpan::starting(NaiveDate::from_ymd_opt(2025, 1, 27).unwrap());

        let report = WeekReport::build(&series, &span, 100.0).unwrap();

        assert!(report.is_empty());
        assert!(report.tables().iter().all(|t| t.as_df().height() == 0));
        assert!(
            report
                .detail
                .as_df()
                .get_column_names()
                .iter()
                .any(|n| n.as_str() == "autoprod")
        );
        assert_eq!(report.heatmaps.power.rows().len(), DAYS);
        assert_eq!(report.heatmaps.power.rows()[0].len(), HOURS);
        assert_eq!(report.heatmaps.working.max(), 0.0);
    }

    #[test]
    fn tables_come_in_detail_hourly_daily_order() {
        let series = series(&[("2024-11-04 09:00:00", 500.0, 800.0, 20.0)]);
        let report = WeekReport::build(&series, &week_of_nov_4(), 100.0).unwrap();

        let kinds: Vec<String> = report.tables().iter().map(|t| t.kind().to_string()).collect();
        assert_eq!(kinds, vec!["detail", "hourly", "daily"]);
        for table in report.tables() {
            assert_eq!(table.as_df().get_column_names()[0].as_str(), TIMESTAMP);
        }
    }
}

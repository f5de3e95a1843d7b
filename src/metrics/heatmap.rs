use chrono_tz::Tz;
use polars::prelude::{DataFrame, DataType, IntoLazy, lit};

use crate::{
    data::{
        column::{BucketCol, ChannelCol, DerivedCol},
        resample::{local_hour_expr, local_weekday_expr, polars_time_zone},
    },
    error::{DashboardResult, polars_err},
};

pub const DAYS: usize = 7;
pub const HOURS: usize = 24;

/// French day names, Monday first, as shown on the heatmap rows.
pub const DAY_NAMES: [&str; DAYS] = [
    "Lundi", "Mardi", "Mercredi", "Jeudi", "Vendredi", "Samedi", "Dimanche",
];

/// Dense day-of-week × hour-of-day table. Monday is row 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatmapGrid {
    cells: [[f64; HOURS]; DAYS],
}

impl Default for HeatmapGrid {
    fn default() -> Self {
        Self {
            cells: [[0.0; HOURS]; DAYS],
        }
    }
}

impl HeatmapGrid {
    pub fn get(&self, day: usize, hour: usize) -> f64 {
        self.cells[day][hour]
    }

    pub fn rows(&self) -> &[[f64; HOURS]; DAYS] {
        &self.cells
    }

    /// Largest cell value; zero for an all-zero grid.
    pub fn max(&self) -> f64 {
        self.cells
            .iter()
            .flatten()
            .copied()
            .fold(0.0_f64, f64::max)
    }

    /// Copy with every cell below `floor` raised to it.
    pub fn clamp_min(&self, floor: f64) -> Self {
        self.map(|v| v.max(floor))
    }

    /// Copy with every cell multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        self.map(|v| v * factor)
    }

    fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        let mut cells = self.cells;
        cells.iter_mut().flatten().for_each(|v| *v = f(*v));
        Self { cells }
    }

    fn set(&mut self, day: usize, hour: usize, value: Option<f64>) {
        if day < DAYS && hour < HOURS {
            self.cells[day][hour] = value.filter(|v| v.is_finite()).unwrap_or(0.0);
        }
    }
}

/// The three weekly heatmaps of a report.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WeekHeatmaps {
    /// Mean heat-pump draw per day and hour.
    pub power: HeatmapGrid,
    /// Mean consumption per day and hour, clamped to zero from below.
    pub consumption: HeatmapGrid,
    /// Largest cell of the consumption grid before clamping.
    pub consumption_peak: f64,
    /// Number of native buckets with a positive heat-pump draw per day and hour.
    ///
    /// With 2-minute buckets this counts half the working minutes.
    pub working: HeatmapGrid,
}

/// Groups a week slice by local (day-of-week, hour-of-day) and reduces it to
/// dense grids. Day/hour combinations without rows are zero.
pub fn bucket_by_day_hour(df: &DataFrame, tz: Tz) -> DashboardResult<WeekHeatmaps> {
    if df.height() == 0 {
        return Ok(WeekHeatmaps::default());
    }

    let local = polars_time_zone(tz)?;
    let draw = ChannelCol::HeatPumpElec.expr();
    let grouped = df
        .clone()
        .lazy()
        .with_columns([
            local_weekday_expr(&local).alias(BucketCol::Day),
            local_hour_expr(&local).alias(BucketCol::Hour),
        ])
        .group_by([BucketCol::Day.expr(), BucketCol::Hour.expr()])
        .agg([
            draw.clone().mean().alias(BucketCol::PowerMean),
            DerivedCol::Consumption
                .expr()
                .mean()
                .alias(BucketCol::ConsumptionMean),
            draw.gt(lit(0.0))
                .cast(DataType::Float64)
                .sum()
                .alias(BucketCol::WorkingCount),
        ])
        .collect()
        .map_err(|e| polars_err("Failed to group by day and hour", e))?;

    let read = |col: BucketCol| -> DashboardResult<Vec<Option<f64>>> {
        Ok(grouped
            .column(col.as_str())
            .and_then(|c| c.cast(&DataType::Float64))
            .map_err(|e| polars_err("Failed to read heatmap column", e))?
            .f64()
            .map_err(|e| polars_err("Failed to read heatmap column", e))?
            .into_iter()
            .collect())
    };
    let read_key = |col: BucketCol| -> DashboardResult<Vec<Option<i32>>> {
        Ok(grouped
            .column(col.as_str())
            .and_then(|c| c.i32())
            .map_err(|e| polars_err("Failed to read heatmap key", e))?
            .into_iter()
            .collect())
    };

    let days = read_key(BucketCol::Day)?;
    let hours = read_key(BucketCol::Hour)?;
    let power = read(BucketCol::PowerMean)?;
    let consumption = read(BucketCol::ConsumptionMean)?;
    let working = read(BucketCol::WorkingCount)?;

    let mut out = WeekHeatmaps::default();
    let mut raw_consumption = HeatmapGrid::default();
    for i in 0..grouped.height() {
        let (Some(day), Some(hour)) = (days[i], hours[i]) else {
            continue;
        };
        let (day, hour) = (day as usize, hour as usize);
        out.power.set(day, hour, power[i]);
        raw_consumption.set(day, hour, consumption[i]);
        out.working.set(day, hour, working[i]);
    }

    out.consumption_peak = raw_consumption.max();
    out.consumption = raw_consumption.clamp_min(0.0);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;
    use polars::prelude::df;

    use super::*;
    use crate::data::resample::timestamp_column;

    const BRUSSELS: Tz = chrono_tz::Europe::Brussels;

    fn utc(s: &str) -> i64 {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
            .unwrap()
            .and_utc()
            .timestamp_micros()
    }

    fn slice(rows: &[(&str, Option<f64>, Option<f64>)]) -> DataFrame {
        let hp: Vec<Option<f64>> = rows.iter().map(|r| r.1).collect();
        let conso: Vec<Option<f64>> = rows.iter().map(|r| r.2).collect();
        let mut df = df!["P_HP_elec" => hp, "P_conso" => conso].unwrap();
        df.with_column(timestamp_column(rows.iter().map(|r| utc(r.0)).collect()).unwrap())
            .unwrap();
        df
    }

    #[test]
    fn counts_positive_draw_samples_per_hour() {
        // Wednesday 2024-11-06, 10:xx in Brussels
        let df = slice(&[
            ("2024-11-06 09:00:00", Some(0.0), Some(100.0)),
            ("2024-11-06 09:02:00", Some(120.0), Some(100.0)),
            ("2024-11-06 09:04:00", Some(0.0), Some(100.0)),
        ]);

        let maps = bucket_by_day_hour(&df, BRUSSELS).unwrap();

        assert_eq!(maps.working.get(2, 10), 1.0);
        assert_eq!(maps.power.get(2, 10), 40.0);
        assert_eq!(maps.consumption.get(2, 10), 100.0);
    }

    #[test]
    fn grids_are_dense_with_zero_fill() {
        let df = slice(&[("2024-11-04 12:00:00", Some(900.0), Some(300.0))]);
        let maps = bucket_by_day_hour(&df, BRUSSELS).unwrap();

        for grid in [maps.power, maps.consumption, maps.working] {
            assert_eq!(grid.rows().len(), DAYS);
            assert!(grid.rows().iter().all(|row| row.len() == HOURS));
        }
        assert_eq!(maps.power.get(0, 13), 900.0);
        let non_zero = maps.power.rows().iter().flatten().filter(|v| **v != 0.0).count();
        assert_eq!(non_zero, 1);
    }

    #[test]
    fn consumption_is_clamped_but_peak_is_not() {
        let df = slice(&[
            ("2024-11-04 12:00:00", Some(0.0), Some(-300.0)),
            ("2024-11-05 12:00:00", Some(0.0), Some(250.0)),
        ]);
        let maps = bucket_by_day_hour(&df, BRUSSELS).unwrap();

        assert_eq!(maps.consumption.get(0, 13), 0.0);
        assert_eq!(maps.consumption.get(1, 13), 250.0);
        assert_eq!(maps.consumption_peak, 250.0);
    }

    #[test]
    fn null_rows_count_as_idle_and_do_not_bias_means() {
        let df = slice(&[
            ("2024-11-04 12:00:00", Some(600.0), None),
            ("2024-11-04 12:02:00", None, None),
        ]);
        let maps = bucket_by_day_hour(&df, BRUSSELS).unwrap();

        assert_eq!(maps.power.get(0, 13), 600.0);
        assert_eq!(maps.working.get(0, 13), 1.0);
        assert_eq!(maps.consumption.get(0, 13), 0.0);
    }

    #[test]
    fn rows_land_on_the_local_day_and_hour() {
        // Sunday 23:30 UTC is Monday 00:30 in Brussels
        let df = slice(&[("2024-11-10 23:30:00", Some(500.0), Some(50.0))]);
        let maps = bucket_by_day_hour(&df, BRUSSELS).unwrap();

        assert_eq!(maps.power.get(0, 0), 500.0);
        assert_eq!(maps.power.get(6, 23), 0.0);
    }

    #[test]
    fn empty_slice_gives_zero_grids() {
        let df = slice(&[]);
        let maps = bucket_by_day_hour(&df, BRUSSELS).unwrap();
        assert_eq!(maps, WeekHeatmaps::default());
        assert_eq!(maps.working.max(), 0.0);
    }

    #[test]
    fn scaling_and_clamping_keep_shape() {
        let mut grid = HeatmapGrid::default();
        grid.set(6, 23, Some(-2.0));
        grid.set(0, 0, Some(3.0));
        assert_eq!(grid.scaled(3.0).get(0, 0), 9.0);
        assert_eq!(grid.clamp_min(0.0).get(6, 23), 0.0);
        assert_eq!(grid.max(), 3.0);
    }
}

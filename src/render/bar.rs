use chrono_tz::Tz;
use plotters::{
    prelude::*,
    style::text_anchor::{HPos, Pos, VPos},
};

use crate::{
    error::DashboardResult,
    render::{
        chart::{DrawResult, label_font, render_svg, title_font},
        palette::hex,
    },
};

const BAR_HALF_WIDTH: f64 = 0.4;

/// Vertical bars, one per day, each labelled with its value in percent.
#[derive(Debug, Clone)]
pub struct DailyBars {
    pub title: String,
    pub color: RGBColor,
    /// Day start instants with their value; undefined days get no bar.
    pub days: Vec<(i64, Option<f64>)>,
}

impl DailyBars {
    pub fn new(title: impl Into<String>, color: &str, days: Vec<(i64, Option<f64>)>) -> Self {
        Self {
            title: title.into(),
            color: hex(color),
            days,
        }
    }

    #[tracing::instrument(skip_all, fields(chart = %self.title))]
    pub fn render(&self, tz: Tz, size: (u32, u32)) -> DashboardResult<String> {
        render_svg(&self.title, size, |root| self.draw(root, tz))
    }

    fn y_max(&self) -> f64 {
        self.days
            .iter()
            .filter_map(|(_, v)| *v)
            .fold(0.0_f64, f64::max)
            .max(1.0)
            * 1.15
    }

    fn day_label(ts: i64, tz: Tz) -> String {
        chrono::DateTime::from_timestamp_micros(ts)
            .map(|utc| utc.with_timezone(&tz).format("%b %d").to_string())
            .unwrap_or_default()
    }

    fn draw<DB>(&self, root: &DrawingArea<DB, plotters::coord::Shift>, tz: Tz) -> DrawResult
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        let n = self.days.len().max(1);
        let mut chart = ChartBuilder::on(root)
            .caption(&self.title, title_font())
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(-0.5..(n as f64 - 0.5), 0.0..self.y_max())?;

        let x_fmt = |x: &f64| {
            let i = x.round();
            if (x - i).abs() > 1e-6 || i < 0.0 {
                return String::new();
            }
            self.days
                .get(i as usize)
                .map(|(ts, _)| Self::day_label(*ts, tz))
                .unwrap_or_default()
        };
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n)
            .x_label_formatter(&x_fmt)
            .y_label_formatter(&|y| format!("{y:.0}"))
            .label_style(label_font())
            .draw()?;

        let bars = self.days.iter().enumerate().filter_map(|(i, (_, v))| {
            let x = i as f64;
            v.map(|v| {
                Rectangle::new(
                    [(x - BAR_HALF_WIDTH, 0.0), (x + BAR_HALF_WIDTH, v)],
                    self.color.filled(),
                )
            })
        });
        chart.draw_series(bars)?;

        let style = TextStyle::from(label_font()).pos(Pos::new(HPos::Center, VPos::Bottom));
        let labels = self.days.iter().enumerate().filter_map(|(i, (_, v))| {
            v.map(|v| Text::new(percent_label(v), (i as f64, v), style.clone()))
        });
        chart.draw_series(labels)?;
        Ok(())
    }
}

/// Bar text, e.g. `37.5%`.
pub fn percent_label(value: f64) -> String {
    format!("{value:.1}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    const BRUSSELS: Tz = chrono_tz::Europe::Brussels;
    const DAY: i64 = 86_400_000_000;
    // 2024-11-04 00:00 in Brussels
    const MONDAY: i64 = 1_730_674_800_000_000;

    #[test]
    fn labels_use_one_decimal() {
        assert_eq!(percent_label(37.5), "37.5%");
        assert_eq!(percent_label(68.76), "68.8%");
        assert_eq!(percent_label(100.0), "100.0%");
    }

    #[test]
    fn renders_one_label_per_defined_day() {
        let bars = DailyBars::new(
            "Autoproduction moyenne journalière",
            "#4CBB17",
            vec![
                (MONDAY, Some(37.5)),
                (MONDAY + DAY, None),
                (MONDAY + 2 * DAY, Some(80.0)),
            ],
        );

        let svg = bars.render(BRUSSELS, (800, 400)).unwrap();

        assert!(svg.contains("37.5%"));
        assert!(svg.contains("80.0%"));
        assert!(svg.contains("Nov 04"));
        assert!(svg.contains("Nov 06"));
    }

    #[test]
    fn empty_week_still_renders() {
        let bars = DailyBars::new("Autoproduction moyenne journalière", "#4CBB17", vec![]);
        let svg = bars.render(BRUSSELS, (800, 400)).unwrap();
        assert!(svg.contains("Autoproduction moyenne journalière"));
    }
}

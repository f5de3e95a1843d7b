use std::error::Error;

use chrono_tz::Tz;
use plotters::{
    coord::Shift,
    prelude::{DrawingArea, IntoDrawingArea, SVGBackend, WHITE},
    style::{FontDesc, FontFamily, FontStyle},
};

use crate::{
    error::{DashboardResult, RenderError},
    week::WeekSpan,
};

pub(crate) type DrawResult = Result<(), Box<dyn Error>>;

const MICROS_PER_HOUR: f64 = 3_600_000_000.0;
const HOURS_PER_TICK: f64 = 12.0;

/// Renders one chart into an SVG string.
pub(crate) fn render_svg(
    chart: &str,
    size: (u32, u32),
    draw: impl FnOnce(&DrawingArea<SVGBackend<'_>, Shift>) -> DrawResult,
) -> DashboardResult<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        root.fill(&WHITE).map_err(|e| draw_err(chart, &e))?;
        draw(&root).map_err(|e| draw_err(chart, e.as_ref()))?;
        root.present().map_err(|e| draw_err(chart, &e))?;
    }
    Ok(svg)
}

pub(crate) fn title_font() -> FontDesc<'static> {
    FontDesc::new(FontFamily::SansSerif, 24.0, FontStyle::Normal)
}

pub(crate) fn label_font() -> FontDesc<'static> {
    FontDesc::new(FontFamily::SansSerif, 13.0, FontStyle::Normal)
}

fn draw_err(chart: &str, e: &dyn Error) -> RenderError {
    RenderError::Draw {
        chart: chart.to_string(),
        msg: e.to_string(),
    }
}

/// Maps instants of a week onto chart x coordinates.
///
/// One x unit is twelve hours of elapsed time from the start of the week, so
/// integer key points give the twelve-hourly date ticks.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TimeAxis {
    start_us: i64,
    end_us: i64,
    tz: Tz,
}

impl TimeAxis {
    pub fn new(span: &WeekSpan, tz: Tz) -> Self {
        let (start_us, end_us) = span.bounds_micros(tz);
        Self {
            start_us,
            end_us,
            tz,
        }
    }

    pub fn x(&self, ts_us: i64) -> f64 {
        (ts_us - self.start_us) as f64 / (MICROS_PER_HOUR * HOURS_PER_TICK)
    }

    /// Full x range of the week.
    pub fn range(&self) -> std::ops::Range<f64> {
        0.0..self.x(self.end_us)
    }

    /// Number of tick labels needed for a tick every twelve hours.
    pub fn tick_count(&self) -> usize {
        self.range().end.ceil() as usize + 1
    }

    /// Tick text for an x coordinate, e.g. `Nov 04 12:00`.
    pub fn label(&self, x: f64) -> String {
        let ts = self.start_us + (x * MICROS_PER_HOUR * HOURS_PER_TICK).round() as i64;
        chrono::DateTime::from_timestamp_micros(ts)
            .map(|utc| utc.with_timezone(&self.tz).format("%b %d %H:%M").to_string())
            .unwrap_or_default()
    }
}

/// Value range padded by 5 % on each side; `0..1` when there is nothing to show.
pub(crate) fn padded_range(values: impl IntoIterator<Item = f64>) -> std::ops::Range<f64> {
    let (min, max) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });

    if !min.is_finite() || !max.is_finite() {
        return 0.0..1.0;
    }
    let pad = ((max - min) * 0.05).max(0.5);
    (min - pad)..(max + pad)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn axis() -> TimeAxis {
        let span = WeekSpan::starting(NaiveDate::from_ymd_opt(2024, 11, 4).unwrap());
        TimeAxis::new(&span, chrono_tz::Europe::Brussels)
    }

    #[test]
    fn week_spans_fourteen_ticks() {
        let axis = axis();
        assert_eq!(axis.range(), 0.0..14.0);
        assert_eq!(axis.tick_count(), 15);
    }

    #[test]
    fn labels_use_the_local_clock() {
        let axis = axis();
        assert_eq!(axis.label(0.0), "Nov 04 00:00");
        assert_eq!(axis.label(1.0), "Nov 04 12:00");
        assert_eq!(axis.label(14.0), "Nov 11 00:00");
    }

    #[test]
    fn padded_range_handles_empty_and_flat_input() {
        assert_eq!(padded_range(Vec::new()), 0.0..1.0);
        assert_eq!(padded_range(vec![f64::NAN]), 0.0..1.0);
        assert_eq!(padded_range(vec![2.0, 2.0]), 1.5..2.5);
        let r = padded_range(vec![0.0, 100.0]);
        assert_eq!(r, -5.0..105.0);
    }

    #[test]
    fn renders_an_empty_svg() {
        let svg = render_svg("blank", (300, 200), |_| Ok(())).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }
}

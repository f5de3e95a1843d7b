use chrono_tz::Tz;
use itertools::Itertools;
use plotters::prelude::*;
use polars::prelude::DataFrame;

use crate::{
    data::resample::timestamps_micros,
    error::{DashboardResult, DataError, polars_err},
    render::{
        chart::{DrawResult, TimeAxis, label_font, padded_range, render_svg, title_font},
        palette::hex,
    },
    week::WeekSpan,
};

/// Points inserted between two samples of a smoothed trace.
const SMOOTH_SUBDIVISIONS: usize = 5;
/// Height in pixels of the overview strip under the main plot.
const OVERVIEW_HEIGHT: u32 = 90;

/// One named series of a time chart.
#[derive(Debug, Clone)]
pub struct Trace {
    pub name: String,
    pub color: RGBColor,
    /// Fill the area between the line and zero.
    pub fill: bool,
    /// Draw a Catmull-Rom curve through the samples instead of straight segments.
    pub smooth: bool,
    pub points: Vec<(i64, Option<f64>)>,
}

impl Trace {
    /// Reads `column` of `df` against its timestamps.
    pub fn from_column(df: &DataFrame, column: &str, color: &str) -> DashboardResult<Self> {
        let timestamps = timestamps_micros(df)?;
        let values = df
            .column(column)
            .map_err(|_| DataError::MissingColumn(column.to_string()))?
            .f64()
            .map_err(|e| polars_err(&format!("Column '{column}' is not Float64"), e))?;

        Ok(Self {
            name: column.to_string(),
            color: hex(color),
            fill: false,
            smooth: false,
            points: timestamps.into_iter().zip(values).collect(),
        })
    }

    pub fn filled(self) -> Self {
        Self { fill: true, ..self }
    }

    pub fn smoothed(self) -> Self {
        Self {
            smooth: true,
            ..self
        }
    }

    /// Maximal runs of consecutive defined values. Nulls end a run.
    pub fn runs(&self) -> Vec<Vec<(i64, f64)>> {
        self.points
            .iter()
            .chunk_by(|(_, v)| v.is_some())
            .into_iter()
            .filter(|(defined, _)| *defined)
            .map(|(_, run)| run.filter_map(|(ts, v)| v.map(|v| (*ts, v))).collect())
            .collect()
    }

    fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().filter_map(|(_, v)| *v)
    }

    /// Chart coordinates of every run, interpolated when the trace is smoothed.
    fn plot_runs(&self, axis: &TimeAxis) -> Vec<Vec<(f64, f64)>> {
        self.runs()
            .into_iter()
            .map(|run| {
                let points: Vec<(f64, f64)> =
                    run.into_iter().map(|(ts, v)| (axis.x(ts), v)).collect();
                if self.smooth {
                    catmull_rom(&points)
                } else {
                    points
                }
            })
            .collect()
    }
}

/// Uniform Catmull-Rom curve through `points`. End points are repeated as
/// outer control points, so the curve starts and ends on the samples.
pub fn catmull_rom(points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let last = points.len() - 1;
    let mut out = Vec::with_capacity(last * SMOOTH_SUBDIVISIONS + 1);
    for i in 0..last {
        let p0 = points[i.saturating_sub(1)];
        let (p1, p2) = (points[i], points[i + 1]);
        let p3 = points[(i + 2).min(last)];
        for j in 0..SMOOTH_SUBDIVISIONS {
            let t = j as f64 / SMOOTH_SUBDIVISIONS as f64;
            out.push((
                catmull_rom_coord(p0.0, p1.0, p2.0, p3.0, t),
                catmull_rom_coord(p0.1, p1.1, p2.1, p3.1, t),
            ));
        }
    }
    out.push(points[last]);
    out
}

fn catmull_rom_coord(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let (t2, t3) = (t * t, t * t * t);
    0.5 * (2.0 * p1
        + (p2 - p0) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (3.0 * p1 - p0 - 3.0 * p2 + p3) * t3)
}

/// A week-long line or area chart with a date x axis.
#[derive(Debug, Clone)]
pub struct TimeChart {
    pub title: String,
    /// Suffix appended to every y tick, e.g. `" W"`.
    pub y_suffix: String,
    /// Lower bound of the y axis; derived from the data when unset.
    pub y_floor: Option<f64>,
    pub show_legend: bool,
    /// Draw a whole-week overview strip of every trace under the main plot.
    pub show_overview: bool,
    pub traces: Vec<Trace>,
}

impl TimeChart {
    pub fn new(title: impl Into<String>, y_suffix: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            y_suffix: y_suffix.into(),
            y_floor: None,
            show_legend: true,
            show_overview: true,
            traces: Vec::new(),
        }
    }

    pub fn with_trace(mut self, trace: Trace) -> Self {
        self.traces.push(trace);
        self
    }

    pub fn with_y_floor(self, floor: f64) -> Self {
        Self {
            y_floor: Some(floor),
            ..self
        }
    }

    pub fn without_legend(self) -> Self {
        Self {
            show_legend: false,
            ..self
        }
    }

    pub fn without_overview(self) -> Self {
        Self {
            show_overview: false,
            ..self
        }
    }

    fn y_range(&self) -> std::ops::Range<f64> {
        let any_fill = self.traces.iter().any(|t| t.fill);
        let values = self
            .traces
            .iter()
            .flat_map(Trace::values)
            .chain(any_fill.then_some(0.0));
        let range = padded_range(values);

        match self.y_floor {
            Some(floor) => floor..range.end.max(floor + 1.0),
            None => range,
        }
    }

    /// Draws the chart for `span` as an SVG document.
    #[tracing::instrument(skip_all, fields(chart = %self.title))]
    pub fn render(&self, span: &WeekSpan, tz: Tz, size: (u32, u32)) -> DashboardResult<String> {
        let axis = TimeAxis::new(span, tz);
        render_svg(&self.title, size, |root| self.draw(root, &axis))
    }

    fn draw<DB>(
        &self,
        root: &DrawingArea<DB, plotters::coord::Shift>,
        axis: &TimeAxis,
    ) -> DrawResult
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        let height = root.dim_in_pixel().1;
        if self.show_overview && height > 2 * OVERVIEW_HEIGHT {
            let (main, strip) = root.split_vertically(height - OVERVIEW_HEIGHT);
            self.draw_main(&main, axis)?;
            self.draw_overview(&strip, axis)
        } else {
            self.draw_main(root, axis)
        }
    }

    fn draw_main<DB>(
        &self,
        root: &DrawingArea<DB, plotters::coord::Shift>,
        axis: &TimeAxis,
    ) -> DrawResult
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        let mut chart = ChartBuilder::on(root)
            .caption(&self.title, title_font())
            .margin(15)
            .x_label_area_size(45)
            .y_label_area_size(70)
            .build_cartesian_2d(axis.range(), self.y_range())?;

        let x_fmt = |x: &f64| axis.label(*x);
        let y_fmt = |y: &f64| format!("{y:.0}{}", self.y_suffix);
        chart
            .configure_mesh()
            .x_desc("Date")
            .x_labels(axis.tick_count())
            .x_label_formatter(&x_fmt)
            .y_label_formatter(&y_fmt)
            .label_style(label_font())
            .light_line_style(WHITE)
            .draw()?;

        for trace in &self.traces {
            let color = trace.color;
            let legend = chart.draw_series(LineSeries::new(
                std::iter::empty::<(f64, f64)>(),
                color.stroke_width(2),
            ))?;
            if self.show_legend {
                legend.label(trace.name.as_str()).legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                });
            }

            for points in trace.plot_runs(axis) {
                if trace.fill {
                    chart.draw_series(
                        AreaSeries::new(points, 0.0, color.mix(0.25))
                            .border_style(color.stroke_width(2)),
                    )?;
                } else {
                    chart.draw_series(LineSeries::new(points, color.stroke_width(2)))?;
                }
            }
        }

        if self.show_legend {
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .label_font(label_font())
                .draw()?;
        }
        Ok(())
    }

    /// Thin whole-week view of the traces, framed like a range selector.
    fn draw_overview<DB>(
        &self,
        root: &DrawingArea<DB, plotters::coord::Shift>,
        axis: &TimeAxis,
    ) -> DrawResult
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        let y_range = self.y_range();
        let mut strip = ChartBuilder::on(root)
            .margin_top(5)
            .margin_bottom(10)
            .margin_right(15)
            .margin_left(85)
            .build_cartesian_2d(axis.range(), y_range.clone())?;

        let window = axis.range();
        strip.draw_series(std::iter::once(Rectangle::new(
            [(window.start, y_range.start), (window.end, y_range.end)],
            RGBColor(240, 240, 240).filled(),
        )))?;

        for trace in &self.traces {
            for points in trace.plot_runs(axis) {
                strip.draw_series(LineSeries::new(points, trace.color.stroke_width(1)))?;
            }
        }

        strip.draw_series(std::iter::once(Rectangle::new(
            [(window.start, y_range.start), (window.end, y_range.end)],
            RGBColor(170, 170, 170).stroke_width(1),
        )))?;
        Ok(())
    }
}

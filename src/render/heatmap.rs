use plotters::prelude::*;

use crate::{
    error::DashboardResult,
    metrics::heatmap::{DAY_NAMES, DAYS, HOURS, HeatmapGrid},
    render::{
        chart::{DrawResult, label_font, render_svg, title_font},
        palette::plasma,
    },
};

const COLOR_BAR_WIDTH: u32 = 110;
const COLOR_BAR_STEPS: usize = 64;
const HOUR_TICK_EVERY: usize = 2;

/// A day-of-week × hour-of-day heatmap with a Plasma colour bar.
#[derive(Debug, Clone)]
pub struct HeatmapChart {
    pub title: String,
    /// Text under the hour axis.
    pub subtitle: Option<String>,
    pub grid: HeatmapGrid,
    /// Colour range; values outside it saturate.
    pub z_range: (f64, f64),
}

impl HeatmapChart {
    /// Colour range `[0, max]` of the grid itself.
    pub fn auto(title: impl Into<String>, grid: HeatmapGrid) -> Self {
        let z_max = grid.max();
        Self::with_range(title, grid, (0.0, z_max))
    }

    pub fn with_range(title: impl Into<String>, grid: HeatmapGrid, z_range: (f64, f64)) -> Self {
        Self {
            title: title.into(),
            subtitle: None,
            grid,
            z_range,
        }
    }

    pub fn with_subtitle(self, subtitle: impl Into<String>) -> Self {
        Self {
            subtitle: Some(subtitle.into()),
            ..self
        }
    }

    /// Colour range widened to a non-empty interval.
    pub fn effective_range(&self) -> (f64, f64) {
        let (lo, hi) = self.z_range;
        let lo = if lo.is_finite() { lo } else { 0.0 };
        let hi = if hi.is_finite() && hi > lo { hi } else { lo + 1.0 };
        (lo, hi)
    }

    #[tracing::instrument(skip_all, fields(chart = %self.title))]
    pub fn render(&self, size: (u32, u32)) -> DashboardResult<String> {
        render_svg(&self.title, size, |root| self.draw(root, size.0))
    }

    fn draw<DB>(&self, root: &DrawingArea<DB, plotters::coord::Shift>, width: u32) -> DrawResult
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        let (z_min, z_max) = self.effective_range();
        let split = width.saturating_sub(COLOR_BAR_WIDTH);
        let (cells_area, bar_area) = root.split_horizontally(split);

        let mut chart = ChartBuilder::on(&cells_area)
            .caption(&self.title, title_font())
            .margin(15)
            .x_label_area_size(45)
            .y_label_area_size(90)
            .build_cartesian_2d(-0.5..(HOURS as f64 - 0.5), -0.5..(DAYS as f64 - 0.5))?;

        let x_fmt = |x: &f64| format!("{:.0}", x);
        let y_fmt = |y: &f64| {
            let row = y.round();
            if row < 0.0 || row >= DAYS as f64 {
                return String::new();
            }
            DAY_NAMES[DAYS - 1 - row as usize].to_string()
        };
        chart
            .configure_mesh()
            .disable_mesh()
            .x_labels(HOURS / HOUR_TICK_EVERY)
            .y_labels(DAYS)
            .x_label_formatter(&x_fmt)
            .y_label_formatter(&y_fmt)
            .x_desc(self.subtitle.as_deref().unwrap_or(""))
            .label_style(label_font())
            .draw()?;

        let cells = self.grid.rows().iter().enumerate().flat_map(|(day, row)| {
            let y = (DAYS - 1 - day) as f64;
            row.iter().enumerate().map(move |(hour, value)| {
                let x = hour as f64;
                Rectangle::new(
                    [(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)],
                    plasma(*value, z_min, z_max).filled(),
                )
            })
        });
        chart.draw_series(cells)?;

        self.draw_color_bar(&bar_area, z_min, z_max)
    }

    fn draw_color_bar<DB>(
        &self,
        area: &DrawingArea<DB, plotters::coord::Shift>,
        z_min: f64,
        z_max: f64,
    ) -> DrawResult
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        let mut bar = ChartBuilder::on(area)
            .margin_top(60)
            .margin_bottom(60)
            .margin_left(10)
            .set_label_area_size(LabelAreaPosition::Right, 60)
            .build_cartesian_2d(0.0..1.0, z_min..z_max)?;

        bar.configure_mesh()
            .disable_mesh()
            .disable_x_axis()
            .y_labels(6)
            .y_label_formatter(&|v| format!("{v:.0}"))
            .label_style(label_font())
            .draw()?;

        let step = (z_max - z_min) / COLOR_BAR_STEPS as f64;
        bar.draw_series((0..COLOR_BAR_STEPS).map(|i| {
            let lo = z_min + step * i as f64;
            Rectangle::new(
                [(0.0, lo), (1.0, lo + step)],
                plasma(lo + step / 2.0, z_min, z_max).filled(),
            )
        }))?;
        Ok(())
    }
}

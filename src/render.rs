pub mod bar;
mod chart;
pub mod heatmap;
pub mod page;
pub mod palette;
pub mod timeseries;

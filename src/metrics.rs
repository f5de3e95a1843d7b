pub mod derived;
pub mod heatmap;
pub mod week_report;

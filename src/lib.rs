pub mod config;
pub mod data;
pub mod error;
pub mod io;
pub mod metrics;
pub mod render;
pub mod week;

pub use config::{ChartConfig, DashboardConfig};
pub use data::{normalize::NormalizedSeries, resample::BucketWidth};
pub use error::{DashboardError, DashboardResult};
pub use metrics::week_report::WeekReport;
pub use render::page::DashboardPage;
pub use week::{WeekCatalog, WeekSpan};

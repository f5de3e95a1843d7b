use polars::prelude::{DataFrame, DataType, Expr, IntoLazy, Null, lit, when};

use crate::{
    data::column::{ChannelCol, DerivedCol},
    error::{DashboardResult, polars_err},
};

/// Adds `grid_elec_positive` and `autoprod` to a week slice.
///
/// Both are pure functions of values on the same row.
pub fn with_week_metrics(df: DataFrame, autoprod_threshold_w: f64) -> DashboardResult<DataFrame> {
    df.lazy()
        .with_columns([
            grid_elec_positive_expr().alias(DerivedCol::GridElecPositive),
            autoprod_expr(autoprod_threshold_w).alias(DerivedCol::Autoprod),
        ])
        .collect()
        .map_err(|e| polars_err("Failed to compute week metrics", e))
}

/// `max(P_conso, 0)`, null where consumption is null.
pub fn grid_elec_positive_expr() -> Expr {
    let conso = DerivedCol::Consumption.expr();
    when(conso.clone().lt(lit(0.0)))
        .then(lit(0.0))
        .otherwise(conso)
}

/// Self-production ratio in percent.
///
/// `clamp(max(P_Sur, 0) / P_HP_elec, 0, 1) * 100` when the heat-pump draw
/// exceeds `threshold_w`, null otherwise. A null draw or surplus also gives null.
pub fn autoprod_expr(threshold_w: f64) -> Expr {
    let draw = ChannelCol::HeatPumpElec.expr();
    let surplus = DerivedCol::Surplus.expr();

    let covered = when(surplus.clone().lt(lit(0.0)))
        .then(lit(0.0))
        .otherwise(surplus);
    let ratio = covered / draw.clone();
    let clamped = when(ratio.clone().gt(lit(1.0)))
        .then(lit(1.0))
        .otherwise(ratio);

    when(draw.gt(lit(threshold_w)))
        .then(clamped * lit(100.0))
        .otherwise(lit(Null {}))
        .cast(DataType::Float64)
}

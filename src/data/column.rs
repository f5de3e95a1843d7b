use polars::prelude::{Expr, PlSmallStr, col};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Name of the instant column every frame in this crate is indexed by.
pub const TIMESTAMP: &str = "timestamp";

/// Measured channels the dashboard reads from the monitoring log.
///
/// Names are exact-match keys of the input header row.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumString,
    Display,
    EnumIter,
    IntoStaticStr,
)]
pub enum ChannelCol {
    /// Grid electrical power in W. Negative values are imports.
    #[strum(serialize = "P_grid_elec")]
    GridElec,
    /// Electrical draw of the heat pump in W.
    #[strum(serialize = "P_HP_elec")]
    HeatPumpElec,
    /// Heat-pump flow temperature in °C.
    #[strum(serialize = "T_HP_flow")]
    HeatPumpFlowTemp,
    /// Heat-pump return temperature in °C.
    #[strum(serialize = "T_HP_return")]
    HeatPumpReturnTemp,
    /// Indoor temperature in °C.
    #[strum(serialize = "T_house_actual")]
    IndoorTemp,
}

/// Columns computed from the measured channels.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumString,
    Display,
    EnumIter,
    IntoStaticStr,
)]
pub enum DerivedCol {
    /// Surplus power: heat-pump draw net of grid import.
    #[strum(serialize = "P_Sur")]
    Surplus,
    /// Consumption: negated grid power.
    #[strum(serialize = "P_conso")]
    Consumption,
    /// Consumption clamped to zero from below.
    #[strum(serialize = "grid_elec_positive")]
    GridElecPositive,
    /// Share of heat-pump draw covered by surplus power, in percent.
    #[strum(serialize = "autoprod")]
    Autoprod,
}

/// Scratch columns used while bucketing; never part of a returned frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case", prefix = "__")]
pub enum BucketCol {
    Day,
    Hour,
    PowerMean,
    ConsumptionMean,
    WorkingCount,
}

macro_rules! column_name_impls {
    ($($ty:ty),+) => {
        $(
            impl From<$ty> for PlSmallStr {
                fn from(value: $ty) -> Self {
                    value.as_str().into()
                }
            }

            impl $ty {
                pub fn name(&self) -> PlSmallStr {
                    (*self).into()
                }

                pub fn as_str(&self) -> &'static str {
                    self.into()
                }

                pub fn expr(&self) -> Expr {
                    col(*self)
                }
            }
        )+
    };
}

column_name_impls!(ChannelCol, DerivedCol, BucketCol);

//! Aggregation pipeline: filtered view → KPIs and chart series.
//!
//! Every function here is a pure function of its inputs. The dataset is
//! borrowed read-only and nothing is memoized between calls.

pub mod aggregate;
pub mod kpi;
pub mod view;

pub use aggregate::{
    aggregate_by, AggregateRequest, AggregateSeries, GroupField, GroupKey, Measure, SeriesPoint,
};
pub use kpi::{compute_kpis, sales_by_year, sales_yoy, KpiSet, YearOverYear};
pub use view::{render, DashboardView, RenderOptions};

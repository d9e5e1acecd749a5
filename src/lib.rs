//! Retail sales dashboard pipeline.
//!
//! Load a transactions table once, then for each filter selection compute
//! the KPI set and the chart series the dashboard displays:
//!
//! ```no_run
//! use std::path::Path;
//! use sales_dashboard::{load_file, render, FilterSelection, RenderOptions};
//!
//! let dataset = load_file(Path::new("superstore.csv"))?;
//! let selection = FilterSelection::default().with_years([2016, 2017]);
//! let view = render(&dataset, &selection, &RenderOptions::default())?;
//! println!("total sales: {}", view.kpis.total_sales);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod format;
pub mod pipeline;
pub mod report;

pub use data::cache::DatasetCache;
pub use data::filter::{filter, FilterSelection, FilteredView};
pub use data::loader::{load_file, load_file_with, LoadOptions};
pub use data::model::{Dataset, MonthBucket, RawRecord, Record};
pub use error::{LoadError, PipelineError};
pub use pipeline::{
    aggregate_by, compute_kpis, render, AggregateRequest, AggregateSeries, DashboardView,
    GroupField, GroupKey, KpiSet, Measure, RenderOptions, YearOverYear,
};

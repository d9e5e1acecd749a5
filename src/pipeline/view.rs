use serde::{Deserialize, Serialize};

use super::aggregate::{aggregate_by, AggregateRequest, AggregateSeries};
use super::kpi::{compute_kpis, KpiSet};
use crate::data::filter::{filter, FilterSelection, FilteredView};
use crate::data::model::Dataset;
use crate::error::PipelineError;

/// Knobs for [`render`] that do not change which rows are selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Number of groups in the top cities / sub-categories charts.
    pub top_n: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions { top_n: 10 }
    }
}

/// Everything one dashboard pass displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView<'a> {
    pub kpis: KpiSet,
    pub sales_over_time: AggregateSeries,
    pub top_cities: AggregateSeries,
    pub categories: AggregateSeries,
    pub top_subcategories: AggregateSeries,
    pub subcategories_by_sales: AggregateSeries,
    /// The filtered rows, for raw-table inspection.
    pub rows: FilteredView<'a>,
    /// `(rows, columns)` of the raw table.
    pub dimensions: (usize, usize),
}

/// Compute the dashboard for one selection.
///
/// Pure in `(dataset, selection, options)`: nothing is cached between calls.
/// A selection that matches no rows stops before any KPI or series is
/// computed and yields [`PipelineError::EmptySelectionResult`].
pub fn render<'a>(
    dataset: &'a Dataset,
    selection: &FilterSelection,
    options: &RenderOptions,
) -> Result<DashboardView<'a>, PipelineError> {
    let rows = filter(dataset, selection);
    if rows.is_empty() {
        log::warn!("selection matched none of {} records", dataset.len());
        return Err(PipelineError::EmptySelectionResult);
    }

    let kpis = compute_kpis(&rows)?;
    log::debug!(
        "kpis: {} customers, {} units, sales {:.2}, profit {:.2}",
        kpis.total_customers,
        kpis.total_units,
        kpis.total_sales,
        kpis.total_profit
    );

    let series = |request: AggregateRequest| aggregate_by(&rows, &request);
    let view = DashboardView {
        kpis,
        sales_over_time: series(AggregateRequest::sales_over_time())?,
        top_cities: series(AggregateRequest::top_cities(options.top_n))?,
        categories: series(AggregateRequest::categories())?,
        top_subcategories: series(AggregateRequest::top_subcategories(options.top_n))?,
        subcategories_by_sales: series(AggregateRequest::subcategories_by_sales())?,
        dimensions: rows.dimensions(),
        rows,
    };
    Ok(view)
}

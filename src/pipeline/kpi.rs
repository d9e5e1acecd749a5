use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::data::filter::FilteredView;
use crate::error::PipelineError;

/// Percent change in sales between the two most recent years of a view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YearOverYear {
    pub previous_year: i32,
    pub latest_year: i32,
    pub previous: f64,
    pub latest: f64,
    /// `(latest - previous) / previous * 100`, unrounded.
    pub percent: f64,
}

impl YearOverYear {
    /// False when the selection skipped a year between the two compared.
    pub fn is_adjacent(&self) -> bool {
        self.latest_year - self.previous_year == 1
    }
}

/// Scalar summary metrics of a view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSet {
    pub total_customers: usize,
    pub total_units: u64,
    pub total_sales: f64,
    pub total_profit: f64,
    /// `None` when the view spans fewer than two years or the earlier year
    /// has no sales; render it as not applicable, never as zero.
    pub sales_yoy: Option<YearOverYear>,
}

/// Sales totals per year, ascending by year.
pub fn sales_by_year(view: &FilteredView) -> BTreeMap<i32, f64> {
    let mut totals = BTreeMap::new();
    for rec in view.iter() {
        *totals.entry(rec.year()).or_insert(0.0) += rec.sales();
    }
    totals
}

/// Compare the two most recent distinct years present in `view`.
///
/// The years need not be adjacent: with 2023 filtered out, 2024 is compared
/// against 2022.
pub fn sales_yoy(view: &FilteredView) -> Result<YearOverYear, PipelineError> {
    let by_year = sales_by_year(view);
    let mut recent = by_year.iter().rev();
    let (Some((&latest_year, &latest)), Some((&previous_year, &previous))) =
        (recent.next(), recent.next())
    else {
        return Err(PipelineError::InsufficientYearRange {
            distinct_years: by_year.len(),
        });
    };

    if previous == 0.0 {
        return Err(PipelineError::ZeroBaseline {
            year: previous_year,
        });
    }

    let yoy = YearOverYear {
        previous_year,
        latest_year,
        previous,
        latest,
        percent: (latest - previous) / previous * 100.0,
    };
    if !yoy.is_adjacent() {
        log::debug!("sales YoY compares non-adjacent years {previous_year} and {latest_year}");
    }
    Ok(yoy)
}

/// Compute the KPI set. The view must be non-empty.
pub fn compute_kpis(view: &FilteredView) -> Result<KpiSet, PipelineError> {
    if view.is_empty() {
        return Err(PipelineError::EmptySelectionResult);
    }

    let mut customers = BTreeSet::new();
    let mut total_units = 0u64;
    let mut total_sales = 0.0;
    let mut total_profit = 0.0;
    for rec in view.iter() {
        customers.insert(rec.customer_id());
        total_units += u64::from(rec.quantity());
        total_sales += rec.sales();
        total_profit += rec.profit();
    }

    let sales_yoy = match sales_yoy(view) {
        Ok(yoy) => Some(yoy),
        Err(e) => {
            log::warn!("sales YoY not applicable: {e}");
            None
        }
    };

    Ok(KpiSet {
        total_customers: customers.len(),
        total_units,
        total_sales,
        total_profit,
        sales_yoy,
    })
}

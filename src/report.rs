use std::fmt::Write;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::batch::pretty_table;
use crate::format::{format_count, format_currency, format_dimensions, format_yoy};
use crate::pipeline::{AggregateSeries, DashboardView, Measure};

/// How the report binary prints a [`DashboardView`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Render `view` in the requested format.
pub fn write_report(view: &DashboardView, format: OutputFormat, preview_rows: usize) -> Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(view).context("serializing dashboard"),
        OutputFormat::Text => text_report(view, preview_rows),
    }
}

/// Plain-text dashboard: KPI cards, one table per chart, raw-data preview.
pub fn text_report(view: &DashboardView, preview_rows: usize) -> Result<String> {
    let mut out = String::new();
    let k = &view.kpis;

    writeln!(out, "Key Metrics")?;
    writeln!(out, "  Total Customers   {}", format_count(k.total_customers as u64))?;
    writeln!(out, "  Total Units Sold  {}", format_count(k.total_units))?;
    writeln!(out, "  Total Sales       {}", format_currency(k.total_sales))?;
    match &k.sales_yoy {
        Some(yoy) => writeln!(
            out,
            "  Sales YoY         {} ({} vs {})",
            format_yoy(Some(yoy)),
            yoy.latest_year,
            yoy.previous_year
        )?,
        None => writeln!(out, "  Sales YoY         {}", format_yoy(None))?,
    }
    writeln!(out, "  Total Profit      {}", format_currency(k.total_profit))?;

    write_series(&mut out, "Sales Over Time", &view.sales_over_time)?;
    write_series(&mut out, "Top Cities by Sales & Profit", &view.top_cities)?;
    write_series(&mut out, "Categories by Sales & Profit", &view.categories)?;
    write_series(&mut out, "Top Sub-Categories by Sales", &view.top_subcategories)?;
    write_series(&mut out, "Sales vs Profit by Sub-Category", &view.subcategories_by_sales)?;

    if preview_rows > 0 {
        writeln!(out, "\nRaw Data (first {preview_rows} rows)")?;
        let table = pretty_table(view.rows.iter(), preview_rows).context("formatting raw data")?;
        writeln!(out, "{table}")?;
    }
    writeln!(out, "Data Dimensions: {}", format_dimensions(view.dimensions))?;
    Ok(out)
}

fn write_series(out: &mut String, title: &str, series: &AggregateSeries) -> std::fmt::Result {
    writeln!(out, "\n{title}")?;
    let width = series
        .keys()
        .map(|k| k.to_string().chars().count())
        .max()
        .unwrap_or(0);

    write!(out, "  {:width$}", "")?;
    for m in &series.measures {
        write!(out, "  {:>14}", m.name())?;
    }
    writeln!(out)?;

    for point in &series.points {
        write!(out, "  {:width$}", point.key.to_string())?;
        for (m, v) in series.measures.iter().zip(&point.values) {
            let cell = match m {
                Measure::Units => format_count(*v as u64),
                Measure::Sales | Measure::Profit => format_currency(*v),
            };
            write!(out, "  {cell:>14}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

use std::path::PathBuf;

use anyhow::{Context, Result};
use sales_dashboard::config::load_config;
use sales_dashboard::report::write_report;
use sales_dashboard::{render, DatasetCache, PipelineError};

/// `sales-dashboard [CONFIG]` – render the configured selection and print it.
fn main() -> Result<()> {
    env_logger::init();

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = load_config(config_path.as_deref())?;

    let mut cache = DatasetCache::new();
    let dataset = cache
        .get_or_load(&config.source.path, &config.load_options())
        .context("loading dataset")?;

    match render(&dataset, &config.filters, &config.render_options()) {
        Ok(view) => {
            let report = write_report(&view, config.report.format, config.report.preview_rows)?;
            println!("{report}");
        }
        Err(PipelineError::EmptySelectionResult) => {
            println!("{}", PipelineError::EmptySelectionResult);
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

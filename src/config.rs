use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::data::filter::FilterSelection;
use crate::data::loader::LoadOptions;
use crate::pipeline::RenderOptions;
use crate::report::OutputFormat;

/// File name searched for when no config path is given.
pub const CONFIG_FILE_NAME: &str = "dashboard.toml";

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub filters: FilterSelection,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Dataset file; relative paths resolve against the config file's directory.
    pub path: PathBuf,
    /// Worksheet for `.xlsx` sources.
    #[serde(default)]
    pub sheet: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub top_n: usize,
    pub preview_rows: usize,
    pub format: OutputFormat,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            top_n: RenderOptions::default().top_n,
            preview_rows: 10,
            format: OutputFormat::Text,
        }
    }
}

/// Default configuration embedded in the binary
const DEFAULT_CONFIG: &str = r#"
[source]
path = "sample_superstore.csv"

[report]
top_n = 10
preview_rows = 10
format = "text"
"#;

impl Config {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("parsing dashboard config")
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            sheet: self.source.sheet.clone(),
        }
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            top_n: self.report.top_n,
        }
    }

    /// Anchor a relative source path at `base`.
    fn resolve_source(mut self, base: &Path) -> Self {
        if self.source.path.is_relative() {
            self.source.path = base.join(&self.source.path);
        }
        self
    }
}

/// Read and parse a config file.
pub fn load_config_file(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = Config::from_toml(&contents)
        .with_context(|| format!("in {}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    Ok(config.resolve_source(base))
}

/// Load configuration.
///
/// Search order:
/// 1. `explicit` path, if given (must exist)
/// 2. `dashboard.toml` in the working directory
/// 3. `dashboard.toml` next to the executable
/// 4. Falls back to embedded default config
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        log::info!("Loading config from: {}", path.display());
        return load_config_file(path);
    }

    let mut search_dirs = vec![PathBuf::from(".")];
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            search_dirs.push(exe_dir.to_path_buf());
        }
    }
    search_config(&search_dirs)
}

/// First `dashboard.toml` found in `dirs`, in order, else the embedded default.
fn search_config(dirs: &[PathBuf]) -> Result<Config> {
    for candidate in dirs.iter().map(|dir| dir.join(CONFIG_FILE_NAME)) {
        if candidate.exists() {
            log::info!("Loading config from: {}", candidate.display());
            return load_config_file(&candidate);
        }
        log::debug!("{CONFIG_FILE_NAME} not found at: {}", candidate.display());
    }

    log::info!("Using default embedded configuration");
    Config::from_toml(DEFAULT_CONFIG)
}

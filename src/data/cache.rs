use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::{Context, Result};

use super::loader::{load_file_with, LoadOptions};
use super::model::Dataset;

/// Identity of a source file at the moment it was read.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Fingerprint {
    modified: Option<SystemTime>,
    len: u64,
    sheet: Option<String>,
}

/// Memoizes loaded datasets so repeated renders over an unchanged file share
/// one materialized table. A file whose size or modification time changed is
/// reloaded.
#[derive(Debug, Default)]
pub struct DatasetCache {
    entries: HashMap<PathBuf, (Fingerprint, Arc<Dataset>)>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached dataset for `path`, loading it on first use or when
    /// the file changed since it was cached.
    pub fn get_or_load(&mut self, path: &Path, options: &LoadOptions) -> Result<Arc<Dataset>> {
        let key = path
            .canonicalize()
            .with_context(|| format!("resolving {}", path.display()))?;
        let meta = std::fs::metadata(&key).with_context(|| format!("reading {}", key.display()))?;
        let fingerprint = Fingerprint {
            modified: meta.modified().ok(),
            len: meta.len(),
            sheet: options.sheet.clone(),
        };

        if let Some((cached, dataset)) = self.entries.get(&key) {
            if *cached == fingerprint {
                log::debug!("dataset cache hit for {}", key.display());
                return Ok(Arc::clone(dataset));
            }
            log::info!("{} changed on disk, reloading", key.display());
        }

        let dataset = Arc::new(load_file_with(&key, options)?);
        self.entries
            .insert(key, (fingerprint, Arc::clone(&dataset)));
        Ok(dataset)
    }

    /// Drop every cached dataset.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Data layer: record types, loading, caching, and filtering.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet / .xlsx
///        │
///        ▼
///   ┌──────────┐
///   │  loader  │  parse + validate rows → Dataset   (cache: memoize per file)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ Dataset  │  Vec<Record>, observed filter values
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter  │  FilterSelection → FilteredView (borrowed rows)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  batch   │  rows → Arrow RecordBatch (table preview, parquet export)
///   └──────────┘
/// ```

pub mod batch;
pub mod cache;
pub mod filter;
pub mod loader;
pub mod model;

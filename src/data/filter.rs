use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::model::{Dataset, Record, COLUMN_NAMES};

// ---------------------------------------------------------------------------
// Filter selection: accepted values per filter field
// ---------------------------------------------------------------------------

/// Accepted values for each filter field.
///
/// A field left as `None` accepts every observed value. A field set to an
/// empty set accepts nothing, so the resulting view is empty. Fields combine
/// with AND, values within a field with OR.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterSelection {
    pub years: Option<BTreeSet<i32>>,
    pub regions: Option<BTreeSet<String>>,
    pub categories: Option<BTreeSet<String>>,
    pub segments: Option<BTreeSet<String>>,
}

impl FilterSelection {
    /// Selection with every observed value explicitly listed (i.e., show everything).
    pub fn all_observed(dataset: &Dataset) -> Self {
        FilterSelection {
            years: Some(dataset.years().clone()),
            regions: Some(dataset.regions().iter().cloned().collect()),
            categories: Some(dataset.categories().iter().cloned().collect()),
            segments: Some(dataset.segments().iter().cloned().collect()),
        }
    }

    pub fn with_years(mut self, years: impl IntoIterator<Item = i32>) -> Self {
        self.years = Some(years.into_iter().collect());
        self
    }

    pub fn with_regions<S: Into<String>>(mut self, regions: impl IntoIterator<Item = S>) -> Self {
        self.regions = Some(regions.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_categories<S: Into<String>>(
        mut self,
        categories: impl IntoIterator<Item = S>,
    ) -> Self {
        self.categories = Some(categories.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_segments<S: Into<String>>(mut self, segments: impl IntoIterator<Item = S>) -> Self {
        self.segments = Some(segments.into_iter().map(Into::into).collect());
        self
    }

    /// Whether `record` passes every field of the selection.
    pub fn accepts(&self, record: &Record) -> bool {
        fn allowed<T: Ord + ?Sized, U: std::borrow::Borrow<T> + Ord>(
            set: &Option<BTreeSet<U>>,
            value: &T,
        ) -> bool {
            set.as_ref().map_or(true, |s| s.contains(value))
        }

        allowed(&self.years, &record.year())
            && allowed(&self.regions, record.region())
            && allowed(&self.categories, record.category())
            && allowed(&self.segments, record.segment())
    }
}

// ---------------------------------------------------------------------------
// Filtered view: the rows passing a selection, in source order
// ---------------------------------------------------------------------------

/// The records of a [`Dataset`] that pass a [`FilterSelection`].
///
/// Borrows from the dataset and keeps source order. A new view is built for
/// every selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FilteredView<'a> {
    rows: Vec<&'a Record>,
}

impl<'a> FilteredView<'a> {
    /// The whole dataset, unfiltered.
    pub fn all(dataset: &'a Dataset) -> Self {
        FilteredView {
            rows: dataset.records().iter().collect(),
        }
    }

    /// Narrow this view further. Applying a selection the rows already
    /// satisfy returns an identical view.
    pub fn refine(&self, selection: &FilterSelection) -> FilteredView<'a> {
        FilteredView {
            rows: self
                .rows
                .iter()
                .copied()
                .filter(|r| selection.accepts(r))
                .collect(),
        }
    }

    pub fn rows(&self) -> &[&'a Record] {
        &self.rows
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Record> + '_ {
        self.rows.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `(rows, columns)` of the raw table.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.rows.len(), COLUMN_NAMES.len())
    }
}

impl<'a> FromIterator<&'a Record> for FilteredView<'a> {
    fn from_iter<I: IntoIterator<Item = &'a Record>>(iter: I) -> Self {
        FilteredView {
            rows: iter.into_iter().collect(),
        }
    }
}

/// Return the records that pass `selection`, in dataset order.
pub fn filter<'a>(dataset: &'a Dataset, selection: &FilterSelection) -> FilteredView<'a> {
    let view: FilteredView<'a> = dataset
        .records()
        .iter()
        .filter(|r| selection.accepts(r))
        .collect();
    log::debug!("selection kept {} of {} records", view.len(), dataset.len());
    view
}

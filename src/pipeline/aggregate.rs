use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Serialize, Serializer};

use crate::data::filter::FilteredView;
use crate::data::model::{MonthBucket, Record};
use crate::error::PipelineError;

// ---------------------------------------------------------------------------
// Group fields and measures
// ---------------------------------------------------------------------------

/// Field a view can be partitioned by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupField {
    Month,
    Year,
    Region,
    Category,
    Subcategory,
    Segment,
    City,
}

impl GroupField {
    /// Calendar fields order chronologically; the rest keep first appearance.
    fn is_temporal(self) -> bool {
        matches!(self, GroupField::Month | GroupField::Year)
    }

    fn key_of(self, rec: &Record) -> KeyRef<'_> {
        match self {
            GroupField::Month => KeyRef::Month(rec.month()),
            GroupField::Year => KeyRef::Year(rec.year()),
            GroupField::Region => KeyRef::Text(rec.region()),
            GroupField::Category => KeyRef::Text(rec.category()),
            GroupField::Subcategory => KeyRef::Text(rec.subcategory()),
            GroupField::Segment => KeyRef::Text(rec.segment()),
            GroupField::City => KeyRef::Text(rec.city()),
        }
    }
}

/// A numeric field summed per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    Sales,
    Profit,
    Units,
}

impl Measure {
    pub fn name(self) -> &'static str {
        match self {
            Measure::Sales => "sales",
            Measure::Profit => "profit",
            Measure::Units => "units",
        }
    }

    fn of(self, rec: &Record) -> f64 {
        match self {
            Measure::Sales => rec.sales(),
            Measure::Profit => rec.profit(),
            Measure::Units => f64::from(rec.quantity()),
        }
    }
}

// ---------------------------------------------------------------------------
// Group keys
// ---------------------------------------------------------------------------

/// Borrowed key used while partitioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum KeyRef<'a> {
    Month(MonthBucket),
    Year(i32),
    Text(&'a str),
}

/// Key of one group in an [`AggregateSeries`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupKey {
    Month(MonthBucket),
    Year(i32),
    Text(String),
}

impl From<KeyRef<'_>> for GroupKey {
    fn from(key: KeyRef<'_>) -> Self {
        match key {
            KeyRef::Month(m) => GroupKey::Month(m),
            KeyRef::Year(y) => GroupKey::Year(y),
            KeyRef::Text(s) => GroupKey::Text(s.to_string()),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Month(m) => write!(f, "{m}"),
            GroupKey::Year(y) => write!(f, "{y}"),
            GroupKey::Text(s) => write!(f, "{s}"),
        }
    }
}

impl Serialize for GroupKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            GroupKey::Year(y) => serializer.serialize_i32(*y),
            other => serializer.collect_str(other),
        }
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// What to group by, what to sum, and how to order the result.
///
/// Without `top_n` or `sort_by` the series keeps its natural order:
/// chronological for month/year, first appearance otherwise. With either
/// set, groups are ranked descending by `sort_by` (default: first measure),
/// ties keeping natural order, and `top_n` truncates.
///
/// Tied text groups therefore stay in first-appearance order, not sorted by
/// key: cities with equal sales rank in the order they first occur in the
/// view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateRequest {
    pub group_by: GroupField,
    pub measures: Vec<Measure>,
    #[serde(default)]
    pub top_n: Option<usize>,
    #[serde(default)]
    pub sort_by: Option<Measure>,
}

impl AggregateRequest {
    pub fn new(group_by: GroupField, measures: impl Into<Vec<Measure>>) -> Self {
        AggregateRequest {
            group_by,
            measures: measures.into(),
            top_n: None,
            sort_by: None,
        }
    }

    /// Keep only the `n` largest groups.
    pub fn top(mut self, n: usize) -> Self {
        self.top_n = Some(n);
        self
    }

    /// Rank groups descending by `measure`.
    pub fn sorted_by(mut self, measure: Measure) -> Self {
        self.sort_by = Some(measure);
        self
    }

    /// Sales per month, chronological.
    pub fn sales_over_time() -> Self {
        Self::new(GroupField::Month, [Measure::Sales])
    }

    /// Sales and profit of the `n` best-selling cities.
    pub fn top_cities(n: usize) -> Self {
        Self::new(GroupField::City, [Measure::Sales, Measure::Profit]).top(n)
    }

    /// Sales and profit of every category, in first-appearance order.
    pub fn categories() -> Self {
        Self::new(GroupField::Category, [Measure::Sales, Measure::Profit])
    }

    /// Sales and profit of the `n` best-selling sub-categories.
    pub fn top_subcategories(n: usize) -> Self {
        Self::new(GroupField::Subcategory, [Measure::Sales, Measure::Profit]).top(n)
    }

    /// Sales and profit of every sub-category, best-selling first.
    pub fn subcategories_by_sales() -> Self {
        Self::new(GroupField::Subcategory, [Measure::Sales, Measure::Profit])
            .sorted_by(Measure::Sales)
    }

    fn ranking(&self) -> Option<Measure> {
        match (self.sort_by, self.top_n) {
            (Some(m), _) => Some(m),
            (None, Some(_)) => self.measures.first().copied(),
            (None, None) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// One group: its key and one sum per requested measure.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub key: GroupKey,
    /// Sums in the order of [`AggregateSeries::measures`].
    pub values: Vec<f64>,
}

/// Ordered `(group key, sums)` pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSeries {
    pub group_by: GroupField,
    pub measures: Vec<Measure>,
    pub points: Vec<SeriesPoint>,
}

impl AggregateSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &GroupKey> {
        self.points.iter().map(|p| &p.key)
    }

    fn measure_index(&self, measure: Measure) -> Option<usize> {
        self.measures.iter().position(|&m| m == measure)
    }

    /// The sums of `measure`, one per group; `None` if it was not requested.
    pub fn values(&self, measure: Measure) -> Option<Vec<f64>> {
        let idx = self.measure_index(measure)?;
        Some(self.points.iter().map(|p| p.values[idx]).collect())
    }

    /// Sum of `measure` for the group with `key`.
    pub fn get(&self, key: &GroupKey, measure: Measure) -> Option<f64> {
        let idx = self.measure_index(measure)?;
        self.points
            .iter()
            .find(|p| &p.key == key)
            .map(|p| p.values[idx])
    }

    /// Sum of `measure` across every group in the series.
    pub fn total(&self, measure: Measure) -> Option<f64> {
        Some(self.values(measure)?.into_iter().sum())
    }
}

struct PointEntry<'s> {
    point: &'s SeriesPoint,
    measures: &'s [Measure],
}

impl Serialize for PointEntry<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1 + self.measures.len()))?;
        map.serialize_entry("key", &self.point.key)?;
        for (m, v) in self.measures.iter().zip(&self.point.values) {
            map.serialize_entry(m.name(), v)?;
        }
        map.end()
    }
}

impl Serialize for AggregateSeries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let points: Vec<PointEntry> = self
            .points
            .iter()
            .map(|point| PointEntry {
                point,
                measures: &self.measures,
            })
            .collect();
        let mut st = serializer.serialize_struct("AggregateSeries", 3)?;
        st.serialize_field("group_by", &self.group_by)?;
        st.serialize_field("measures", &self.measures)?;
        st.serialize_field("points", &points)?;
        st.end()
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Partition `view` by `request.group_by` and sum each measure per group.
pub fn aggregate_by(
    view: &FilteredView,
    request: &AggregateRequest,
) -> Result<AggregateSeries, PipelineError> {
    if request.measures.is_empty() {
        return Err(PipelineError::NoMeasures);
    }

    let ranking = request.ranking();
    // A ranking measure that was not requested is summed in a trailing
    // column and dropped after sorting.
    let mut columns = request.measures.clone();
    let rank_idx = ranking.map(|m| match columns.iter().position(|&c| c == m) {
        Some(i) => i,
        None => {
            columns.push(m);
            columns.len() - 1
        }
    });

    let mut index: BTreeMap<KeyRef, usize> = BTreeMap::new();
    let mut groups: Vec<(KeyRef, Vec<f64>)> = Vec::new();
    for rec in view.iter() {
        let key = request.group_by.key_of(rec);
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push((key, vec![0.0; columns.len()]));
            groups.len() - 1
        });
        let sums = &mut groups[slot].1;
        for (sum, m) in sums.iter_mut().zip(&columns) {
            *sum += m.of(rec);
        }
    }

    if request.group_by.is_temporal() {
        groups.sort_by(|a, b| a.0.cmp(&b.0));
    }
    if let Some(i) = rank_idx {
        // Stable: equal sums keep natural order.
        groups.sort_by(|a, b| b.1[i].total_cmp(&a.1[i]));
    }
    if let Some(n) = request.top_n {
        groups.truncate(n);
    }

    let points = groups
        .into_iter()
        .map(|(key, mut values)| {
            values.truncate(request.measures.len());
            SeriesPoint {
                key: key.into(),
                values,
            }
        })
        .collect();

    Ok(AggregateSeries {
        group_by: request.group_by,
        measures: request.measures.clone(),
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{filter, FilterSelection};
    use crate::data::model::{Dataset, RawRecord};
    use chrono::NaiveDate;

    fn sale(date: (i32, u32), city: &str, sub: &str, sales: f64, profit: f64) -> RawRecord {
        RawRecord {
            order_date: NaiveDate::from_ymd_opt(date.0, date.1, 10).unwrap(),
            region: "East".into(),
            category: if sub == "Chairs" { "Furniture" } else { "Technology" }.into(),
            subcategory: sub.into(),
            segment: "Consumer".into(),
            city: city.into(),
            customer_id: "X".into(),
            quantity: 1,
            sales,
            profit,
        }
    }

    fn dataset() -> Dataset {
        vec![
            sale((2024, 3), "Boston", "Phones", 50.0, 5.0),
            sale((2023, 11), "Austin", "Chairs", 200.0, -20.0),
            sale((2024, 1), "Boston", "Copiers", 120.0, 30.0),
            sale((2023, 11), "Denver", "Phones", 80.0, 8.0),
            sale((2024, 1), "Austin", "Chairs", 10.0, 1.0),
        ]
        .into_iter()
        .collect()
    }

    fn text_keys(series: &AggregateSeries) -> Vec<String> {
        series.keys().map(|k| k.to_string()).collect()
    }

    #[test]
    fn month_series_is_chronological() {
        let ds = dataset();
        let view = filter(&ds, &FilterSelection::default());
        let series = aggregate_by(&view, &AggregateRequest::sales_over_time()).unwrap();

        assert_eq!(text_keys(&series), ["2023-11", "2024-01", "2024-03"]);
        assert_eq!(series.values(Measure::Sales).unwrap(), vec![280.0, 130.0, 50.0]);
        assert_eq!(series.values(Measure::Profit), None);
    }

    #[test]
    fn unranked_text_groups_keep_first_appearance() {
        let ds = dataset();
        let view = filter(&ds, &FilterSelection::default());
        let req = AggregateRequest::new(GroupField::City, [Measure::Sales, Measure::Profit]);
        let series = aggregate_by(&view, &req).unwrap();

        assert_eq!(text_keys(&series), ["Boston", "Austin", "Denver"]);
        let austin = GroupKey::Text("Austin".into());
        assert_eq!(series.get(&austin, Measure::Sales), Some(210.0));
        assert_eq!(series.get(&austin, Measure::Profit), Some(-19.0));
    }

    #[test]
    fn top_n_ranks_and_truncates() {
        let ds = dataset();
        let view = filter(&ds, &FilterSelection::default());
        let series = aggregate_by(&view, &AggregateRequest::top_cities(2)).unwrap();

        assert_eq!(text_keys(&series), ["Austin", "Boston"]);
        assert_eq!(series.values(Measure::Sales).unwrap(), vec![210.0, 170.0]);
        assert_eq!(series.measures, vec![Measure::Sales, Measure::Profit]);

        let all = aggregate_by(&view, &AggregateRequest::top_cities(10)).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn ties_keep_natural_order() {
        let ds: Dataset = vec![
            sale((2024, 1), "Reno", "Phones", 10.0, 0.0),
            sale((2024, 1), "Omaha", "Phones", 30.0, 0.0),
            sale((2024, 1), "Tulsa", "Phones", 10.0, 0.0),
        ]
        .into_iter()
        .collect();
        let view = filter(&ds, &FilterSelection::default());
        let series = aggregate_by(&view, &AggregateRequest::top_cities(10)).unwrap();
        assert_eq!(text_keys(&series), ["Omaha", "Reno", "Tulsa"]);
    }

    #[test]
    fn tied_groups_cut_by_top_n_follow_first_appearance_not_key_order() {
        let ds: Dataset = vec![
            sale((2024, 1), "Tulsa", "Phones", 10.0, 0.0),
            sale((2024, 1), "Omaha", "Phones", 40.0, 0.0),
            sale((2024, 1), "Reno", "Phones", 10.0, 0.0),
            sale((2024, 1), "Akron", "Phones", 10.0, 0.0),
        ]
        .into_iter()
        .collect();
        let view = filter(&ds, &FilterSelection::default());
        let series = aggregate_by(&view, &AggregateRequest::top_cities(3)).unwrap();
        assert_eq!(text_keys(&series), ["Omaha", "Tulsa", "Reno"]);
    }

    #[test]
    fn sorted_without_top_n_keeps_every_group() {
        let ds = dataset();
        let view = filter(&ds, &FilterSelection::default());
        let series = aggregate_by(&view, &AggregateRequest::subcategories_by_sales()).unwrap();

        assert_eq!(text_keys(&series), ["Chairs", "Phones", "Copiers"]);
        assert_eq!(series.values(Measure::Sales).unwrap(), vec![210.0, 130.0, 120.0]);
    }

    #[test]
    fn ranking_by_an_unrequested_measure() {
        let ds = dataset();
        let view = filter(&ds, &FilterSelection::default());
        let req = AggregateRequest::new(GroupField::Subcategory, [Measure::Sales])
            .sorted_by(Measure::Profit);
        let series = aggregate_by(&view, &req).unwrap();

        assert_eq!(text_keys(&series), ["Copiers", "Phones", "Chairs"]);
        assert!(series.points.iter().all(|p| p.values.len() == 1));
    }

    #[test]
    fn group_sums_add_up_to_view_totals() {
        let ds = dataset();
        let view = filter(&ds, &FilterSelection::default());
        let grand: f64 = view.iter().map(|r| r.profit()).sum();
        for field in [GroupField::Month, GroupField::City, GroupField::Subcategory, GroupField::Year] {
            let req = AggregateRequest::new(field, [Measure::Profit, Measure::Units]);
            let series = aggregate_by(&view, &req).unwrap();
            assert!((series.total(Measure::Profit).unwrap() - grand).abs() < 1e-9);
            assert_eq!(series.total(Measure::Units), Some(view.len() as f64));
        }
    }

    #[test]
    fn empty_measure_list_is_rejected() {
        let ds = dataset();
        let view = filter(&ds, &FilterSelection::default());
        let req = AggregateRequest::new(GroupField::City, Vec::new());
        assert_eq!(aggregate_by(&view, &req), Err(PipelineError::NoMeasures));
    }

    #[test]
    fn serializes_points_with_measure_names() {
        let ds = dataset();
        let view = filter(&ds, &FilterSelection::default().with_years([2023]));
        let series = aggregate_by(&view, &AggregateRequest::top_subcategories(1)).unwrap();
        let json = serde_json::to_value(&series).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "group_by": "subcategory",
                "measures": ["sales", "profit"],
                "points": [{ "key": "Chairs", "sales": 200.0, "profit": -20.0 }],
            })
        );
    }
}

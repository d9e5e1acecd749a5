use std::collections::BTreeSet;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

// ---------------------------------------------------------------------------
// MonthBucket – calendar year + month grouping key
// ---------------------------------------------------------------------------

/// A calendar month. Orders chronologically and displays as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthBucket {
    pub year: i32,
    pub month: u32,
}

impl MonthBucket {
    /// The bucket containing `date`.
    pub fn of(date: NaiveDate) -> Self {
        MonthBucket {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for MonthBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for MonthBucket {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// Record – one order line
// ---------------------------------------------------------------------------

/// Source attributes of one order line, as read from a file.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub order_date: NaiveDate,
    pub region: String,
    pub category: String,
    pub subcategory: String,
    pub segment: String,
    pub city: String,
    pub customer_id: String,
    pub quantity: u32,
    pub sales: f64,
    pub profit: f64,
}

/// A single transaction row.
///
/// `year` and `month` are derived from `order_date` once, at construction, and
/// are read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    order_date: NaiveDate,
    year: i32,
    month: MonthBucket,
    region: String,
    category: String,
    subcategory: String,
    segment: String,
    city: String,
    customer_id: String,
    quantity: u32,
    sales: f64,
    profit: f64,
}

impl From<RawRecord> for Record {
    fn from(raw: RawRecord) -> Self {
        Record {
            year: raw.order_date.year(),
            month: MonthBucket::of(raw.order_date),
            order_date: raw.order_date,
            region: raw.region,
            category: raw.category,
            subcategory: raw.subcategory,
            segment: raw.segment,
            city: raw.city,
            customer_id: raw.customer_id,
            quantity: raw.quantity,
            sales: raw.sales,
            profit: raw.profit,
        }
    }
}

impl Record {
    pub fn order_date(&self) -> NaiveDate {
        self.order_date
    }
    pub fn year(&self) -> i32 {
        self.year
    }
    pub fn month(&self) -> MonthBucket {
        self.month
    }
    pub fn region(&self) -> &str {
        &self.region
    }
    pub fn category(&self) -> &str {
        &self.category
    }
    pub fn subcategory(&self) -> &str {
        &self.subcategory
    }
    pub fn segment(&self) -> &str {
        &self.segment
    }
    pub fn city(&self) -> &str {
        &self.city
    }
    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }
    pub fn quantity(&self) -> u32 {
        self.quantity
    }
    pub fn sales(&self) -> f64 {
        self.sales
    }
    pub fn profit(&self) -> f64 {
        self.profit
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// Column names of the raw table, in display order.
pub const COLUMN_NAMES: [&str; 12] = [
    "order_date",
    "year",
    "month",
    "region",
    "category",
    "subcategory",
    "segment",
    "city",
    "customer_id",
    "quantity",
    "sales",
    "profit",
];

/// The full parsed dataset with the observed values of each filter field.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<Record>,
    /// Distinct years, ascending.
    years: BTreeSet<i32>,
    /// Distinct values in order of first appearance.
    regions: Vec<String>,
    categories: Vec<String>,
    segments: Vec<String>,
}

impl Dataset {
    /// Build the filter-field indices from the loaded records.
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut years = BTreeSet::new();
        let mut regions = Vec::new();
        let mut categories = Vec::new();
        let mut segments = Vec::new();

        for rec in &records {
            years.insert(rec.year);
            push_unique(&mut regions, &rec.region);
            push_unique(&mut categories, &rec.category);
            push_unique(&mut segments, &rec.segment);
        }

        Dataset {
            records,
            years,
            regions,
            categories,
            segments,
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn years(&self) -> &BTreeSet<i32> {
        &self.years
    }

    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<RawRecord> for Dataset {
    fn from_iter<I: IntoIterator<Item = RawRecord>>(iter: I) -> Self {
        Dataset::from_records(iter.into_iter().map(Record::from).collect())
    }
}

fn push_unique(values: &mut Vec<String>, value: &str) {
    if !values.iter().any(|v| v == value) {
        values.push(value.to_string());
    }
}

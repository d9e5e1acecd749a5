use std::path::Path;

use anyhow::{Context, Result};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Date32Type, Float64Type, Int64Type};
use calamine::{open_workbook, Data, Reader, Xlsx};
use chrono::{DateTime, Days, NaiveDate, NaiveDateTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Dataset, RawRecord};
use crate::error::LoadError;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Options that only some formats honour.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Worksheet to read from an `.xlsx` workbook (first sheet when `None`).
    pub sheet: Option<String>,
}

/// Load a sales dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one order line per row
/// * `.json`    – `[{ "order_date": "...", "region": "...", ... }, ...]`
/// * `.parquet` – flat columns; dates as strings, Date32/Date64 or timestamps
/// * `.xlsx`    – first worksheet (or [`LoadOptions::sheet`]), header row first
///
/// Any row with an unparseable date, a missing field or an invalid number is
/// rejected with [`LoadError::MalformedRecord`].
pub fn load_file(path: &Path) -> Result<Dataset> {
    load_file_with(path, &LoadOptions::default())
}

/// [`load_file`] with explicit [`LoadOptions`].
pub fn load_file_with(path: &Path, options: &LoadOptions) -> Result<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let records = match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        "xlsx" => load_xlsx(path, options.sheet.as_deref()),
        other => Err(LoadError::UnsupportedFormat(other.to_string()).into()),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    let dataset: Dataset = records.into_iter().collect();
    if dataset.is_empty() {
        log::warn!("{} contains no records", path.display());
    } else {
        log::info!(
            "Loaded {} records from {} (years {:?}, {} regions, {} categories, {} segments)",
            dataset.len(),
            path.display(),
            dataset.years(),
            dataset.regions().len(),
            dataset.categories().len(),
            dataset.segments().len(),
        );
    }
    Ok(dataset)
}

// ---------------------------------------------------------------------------
// Column schema shared by every format
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    OrderDate,
    Region,
    Category,
    Subcategory,
    Segment,
    City,
    CustomerId,
    Quantity,
    Sales,
    Profit,
}

const COLUMN_COUNT: usize = 10;

const COLUMNS: [Column; COLUMN_COUNT] = [
    Column::OrderDate,
    Column::Region,
    Column::Category,
    Column::Subcategory,
    Column::Segment,
    Column::City,
    Column::CustomerId,
    Column::Quantity,
    Column::Sales,
    Column::Profit,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Date,
    Text,
    Integer,
    Decimal,
}

impl Column {
    fn name(self) -> &'static str {
        match self {
            Column::OrderDate => "order_date",
            Column::Region => "region",
            Column::Category => "category",
            Column::Subcategory => "subcategory",
            Column::Segment => "segment",
            Column::City => "city",
            Column::CustomerId => "customer_id",
            Column::Quantity => "quantity",
            Column::Sales => "sales",
            Column::Profit => "profit",
        }
    }

    fn kind(self) -> ColumnKind {
        match self {
            Column::OrderDate => ColumnKind::Date,
            Column::Quantity => ColumnKind::Integer,
            Column::Sales | Column::Profit => ColumnKind::Decimal,
            _ => ColumnKind::Text,
        }
    }

    /// Match a source header, ignoring case, surrounding blanks and the
    /// space/hyphen/underscore spelling (`Order Date`, `Sub-Category`, ...).
    fn from_header(header: &str) -> Option<Column> {
        let key: String = header
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();

        match key.as_str() {
            "orderdate" => Some(Column::OrderDate),
            "region" => Some(Column::Region),
            "category" => Some(Column::Category),
            "subcategory" => Some(Column::Subcategory),
            "segment" => Some(Column::Segment),
            "city" => Some(Column::City),
            "customerid" => Some(Column::CustomerId),
            "quantity" | "qty" => Some(Column::Quantity),
            "sales" => Some(Column::Sales),
            "profit" => Some(Column::Profit),
            _ => None,
        }
    }
}

/// Source position of each required column.
struct ColumnIndex {
    positions: [usize; COLUMN_COUNT],
}

impl ColumnIndex {
    /// Resolve headers; the first header matching a column wins.
    fn resolve<I, S>(headers: I) -> Result<Self, LoadError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut found: [Option<usize>; COLUMN_COUNT] = [None; COLUMN_COUNT];
        for (pos, header) in headers.into_iter().enumerate() {
            if let Some(col) = Column::from_header(header.as_ref()) {
                found[col as usize].get_or_insert(pos);
            }
        }

        let mut positions = [0; COLUMN_COUNT];
        for col in COLUMNS {
            positions[col as usize] =
                found[col as usize].ok_or(LoadError::MissingColumn(col.name()))?;
        }
        Ok(ColumnIndex { positions })
    }

    fn position(&self, col: Column) -> usize {
        self.positions[col as usize]
    }
}

// ---------------------------------------------------------------------------
// Cell values and record validation
// ---------------------------------------------------------------------------

/// A raw cell value before it is checked against its column.
#[derive(Debug, Clone, Default, PartialEq)]
enum Cell {
    #[default]
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Date(NaiveDate),
}

type Row = [Cell; COLUMN_COUNT];

fn empty_row() -> Row {
    std::array::from_fn(|_| Cell::Empty)
}

/// Validate one row of cells into a [`RawRecord`]. `row` is 1-based.
fn build_record(row: usize, mut cells: Row) -> Result<RawRecord, LoadError> {
    let mut take = |col: Column| std::mem::take(&mut cells[col as usize]);

    Ok(RawRecord {
        order_date: date_field(row, Column::OrderDate, take(Column::OrderDate))?,
        region: text_field(row, Column::Region, take(Column::Region))?,
        category: text_field(row, Column::Category, take(Column::Category))?,
        subcategory: text_field(row, Column::Subcategory, take(Column::Subcategory))?,
        segment: text_field(row, Column::Segment, take(Column::Segment))?,
        city: text_field(row, Column::City, take(Column::City))?,
        customer_id: text_field(row, Column::CustomerId, take(Column::CustomerId))?,
        quantity: quantity_field(row, take(Column::Quantity))?,
        sales: decimal_field(row, Column::Sales, take(Column::Sales))?,
        profit: decimal_field(row, Column::Profit, take(Column::Profit))?,
    })
}

fn missing(row: usize, col: Column) -> LoadError {
    LoadError::malformed(row, format!("missing value for '{}'", col.name()))
}

fn date_field(row: usize, col: Column, cell: Cell) -> Result<NaiveDate, LoadError> {
    match cell {
        Cell::Date(d) => Ok(d),
        Cell::Text(s) if s.trim().is_empty() => Err(missing(row, col)),
        Cell::Text(s) => parse_date(&s).ok_or_else(|| {
            LoadError::malformed(row, format!("'{}' is not a valid {}", s.trim(), col.name()))
        }),
        Cell::Empty => Err(missing(row, col)),
        other => Err(LoadError::malformed(
            row,
            format!("expected a date for '{}', got {other:?}", col.name()),
        )),
    }
}

fn text_field(row: usize, col: Column, cell: Cell) -> Result<String, LoadError> {
    let text = match cell {
        Cell::Text(s) => s.trim().to_string(),
        Cell::Int(i) => i.to_string(),
        Cell::Float(f) => f.to_string(),
        Cell::Date(d) => d.to_string(),
        Cell::Empty => String::new(),
    };
    if text.is_empty() {
        return Err(missing(row, col));
    }
    Ok(text)
}

fn quantity_field(row: usize, cell: Cell) -> Result<u32, LoadError> {
    let col = Column::Quantity;
    let value = match cell {
        Cell::Int(i) => i,
        Cell::Float(f) if f.fract() == 0.0 && f.is_finite() => f as i64,
        Cell::Text(s) if s.trim().is_empty() => return Err(missing(row, col)),
        Cell::Text(s) => parse_whole(&s).ok_or_else(|| {
            LoadError::malformed(row, format!("'{}' is not a whole quantity", s.trim()))
        })?,
        Cell::Empty => return Err(missing(row, col)),
        other => {
            return Err(LoadError::malformed(
                row,
                format!("expected a whole quantity, got {other:?}"),
            ))
        }
    };
    u32::try_from(value)
        .map_err(|_| LoadError::malformed(row, format!("quantity {value} is out of range")))
}

fn decimal_field(row: usize, col: Column, cell: Cell) -> Result<f64, LoadError> {
    let value = match cell {
        Cell::Float(f) => f,
        Cell::Int(i) => i as f64,
        Cell::Text(s) if s.trim().is_empty() => return Err(missing(row, col)),
        Cell::Text(s) => parse_amount(&s).ok_or_else(|| {
            LoadError::malformed(row, format!("'{}' is not a valid {}", s.trim(), col.name()))
        })?,
        Cell::Empty => return Err(missing(row, col)),
        other => {
            return Err(LoadError::malformed(
                row,
                format!("expected a number for '{}', got {other:?}", col.name()),
            ))
        }
    };
    if !value.is_finite() {
        return Err(LoadError::malformed(
            row,
            format!("{} must be finite, got {value}", col.name()),
        ));
    }
    Ok(value)
}

/// Parse a whole number, also accepting an integral float such as `3.0`.
fn parse_whole(s: &str) -> Option<i64> {
    let s = s.trim();
    s.parse::<i64>().ok().or_else(|| {
        let f = s.parse::<f64>().ok()?;
        (f.is_finite() && f.fract() == 0.0).then_some(f as i64)
    })
}

/// Parse a currency amount, tolerating a leading `$` and thousands separators.
fn parse_amount(s: &str) -> Option<f64> {
    let s = s.trim();
    let (negative, s) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let digits: String = s
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    let v: f64 = digits.parse().ok()?;
    Some(if negative { -v } else { v })
}

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
];

/// Parse an order date; any time-of-day part is discarded.
pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

/// Convert an Excel serial day number (1900 date system) to a date.
///
/// Excel counts a 1900-02-29 that never existed as serial 60. Serials up to
/// 59 count from 1899-12-31 and later ones from 1899-12-30, so serial 60
/// reads as 1900-03-01.
fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let epoch = if serial < 61.0 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    epoch.checked_add_days(Days::new(serial.floor() as u64))
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<Vec<RawRecord>> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let index = ColumnIndex::resolve(reader.headers().context("reading CSV headers")?)?;

    let mut records = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let row = i + 1;
        let record = result.with_context(|| format!("CSV row {row}"))?;

        let mut cells = empty_row();
        for col in COLUMNS {
            if let Some(value) = record.get(index.position(col)) {
                cells[col as usize] = Cell::Text(value.to_string());
            }
        }
        records.push(build_record(row, cells)?);
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, as written by `df.to_json(orient='records')`.
/// Numeric order dates are read as epoch milliseconds (the Pandas default).
fn load_json(path: &Path) -> Result<Vec<RawRecord>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let rows = root.as_array().context("Expected top-level JSON array")?;

    let mut records = Vec::with_capacity(rows.len());
    for (i, value) in rows.iter().enumerate() {
        let row = i + 1;
        let obj = value
            .as_object()
            .ok_or_else(|| LoadError::malformed(row, "not a JSON object"))?;

        let mut cells = empty_row();
        for (key, val) in obj {
            let Some(col) = Column::from_header(key) else {
                continue;
            };
            let cell = &mut cells[col as usize];
            if *cell != Cell::Empty {
                continue;
            }
            *cell = json_to_cell(col, val);
        }
        records.push(build_record(row, cells)?);
    }
    Ok(records)
}

fn json_to_cell(col: Column, val: &JsonValue) -> Cell {
    match val {
        JsonValue::String(s) => Cell::Text(s.clone()),
        JsonValue::Number(n) if col.kind() == ColumnKind::Date => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(|dt| Cell::Date(dt.date_naive()))
            .unwrap_or_else(|| Cell::Text(n.to_string())),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Cell::Int(i),
            None => n.as_f64().map(Cell::Float).unwrap_or(Cell::Empty),
        },
        JsonValue::Bool(b) => Cell::Text(b.to_string()),
        JsonValue::Null => Cell::Empty,
        other => Cell::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one flat column per field.
///
/// Columns are cast to a canonical Arrow type before reading: text columns
/// to Utf8, quantity to Int64, amounts to Float64, and non-string order
/// dates to Date32. Nulls and failed casts become missing values.
fn load_parquet(path: &Path) -> Result<Vec<RawRecord>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        let index = ColumnIndex::resolve(schema.fields().iter().map(|f| f.name()))?;

        let columns = COLUMNS
            .iter()
            .map(|&col| {
                normalize_arrow_column(col, batch.column(index.position(col)))
                    .with_context(|| format!("converting parquet column '{}'", col.name()))
            })
            .collect::<Result<Vec<ArrayRef>>>()?;

        for i in 0..batch.num_rows() {
            let row = records.len() + 1;
            let mut cells = empty_row();
            for (slot, array) in cells.iter_mut().zip(&columns) {
                *slot = arrow_cell(array, i);
            }
            records.push(build_record(row, cells)?);
        }
    }
    Ok(records)
}

fn normalize_arrow_column(col: Column, array: &ArrayRef) -> Result<ArrayRef> {
    let target = match col.kind() {
        ColumnKind::Date => match array.data_type() {
            DataType::Utf8 | DataType::LargeUtf8 => DataType::Utf8,
            _ => DataType::Date32,
        },
        ColumnKind::Text => DataType::Utf8,
        ColumnKind::Integer => DataType::Int64,
        ColumnKind::Decimal => DataType::Float64,
    };
    Ok(cast(array, &target)?)
}

fn arrow_cell(array: &ArrayRef, row: usize) -> Cell {
    if array.is_null(row) {
        return Cell::Empty;
    }
    match array.data_type() {
        DataType::Utf8 => Cell::Text(array.as_string::<i32>().value(row).to_string()),
        DataType::Date32 => {
            Cell::Date(Date32Type::to_naive_date(array.as_primitive::<Date32Type>().value(row)))
        }
        DataType::Int64 => Cell::Int(array.as_primitive::<Int64Type>().value(row)),
        DataType::Float64 => Cell::Float(array.as_primitive::<Float64Type>().value(row)),
        _ => Cell::Empty,
    }
}

// ---------------------------------------------------------------------------
// XLSX loader
// ---------------------------------------------------------------------------

fn load_xlsx(path: &Path, sheet: Option<&str>) -> Result<Vec<RawRecord>> {
    let mut workbook: Xlsx<_> = open_workbook(path).context("opening workbook")?;
    let sheet_names = workbook.sheet_names().to_vec();

    let sheet_name = match sheet {
        Some(name) if sheet_names.iter().any(|s| s == name) => name.to_string(),
        Some(name) => return Err(LoadError::SheetNotFound(name.to_string()).into()),
        None => sheet_names.first().cloned().ok_or(LoadError::EmptyWorkbook)?,
    };
    log::debug!("reading worksheet '{sheet_name}' of {}", path.display());

    let range = workbook
        .worksheet_range(&sheet_name)
        .with_context(|| format!("reading worksheet '{sheet_name}'"))?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Err(LoadError::MissingColumn(Column::OrderDate.name()).into());
    };
    let index = ColumnIndex::resolve(header.iter().map(|c| c.to_string()))?;

    let mut records = Vec::new();
    for (i, data) in rows.enumerate() {
        let row = i + 1;
        let mut cells = empty_row();
        for col in COLUMNS {
            if let Some(value) = data.get(index.position(col)) {
                cells[col as usize] = xlsx_cell(col, value);
            }
        }
        records.push(build_record(row, cells)?);
    }
    Ok(records)
}

fn xlsx_cell(col: Column, data: &Data) -> Cell {
    let is_date = col.kind() == ColumnKind::Date;
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64())
            .map(Cell::Date)
            .unwrap_or(Cell::Float(dt.as_f64())),
        Data::Float(f) if is_date => excel_serial_to_date(*f).map(Cell::Date).unwrap_or(Cell::Float(*f)),
        Data::Int(i) if is_date => excel_serial_to_date(*i as f64)
            .map(Cell::Date)
            .unwrap_or(Cell::Int(*i)),
        Data::Float(f) => Cell::Float(*f),
        Data::Int(i) => Cell::Int(*i),
        Data::Bool(b) => Cell::Text(b.to_string()),
    }
}

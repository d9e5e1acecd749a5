use std::sync::Arc;

use arrow::array::{ArrayRef, Date32Array, Float64Array, Int32Array, StringArray, UInt32Array};
use arrow::datatypes::{DataType, Date32Type, Field, Schema, SchemaRef};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;

use super::model::{Record, COLUMN_NAMES};

// ---------------------------------------------------------------------------
// Record slice → Arrow RecordBatch
// ---------------------------------------------------------------------------

/// Arrow schema of the raw table; field order follows [`COLUMN_NAMES`].
pub fn record_schema() -> SchemaRef {
    let types = [
        DataType::Date32,
        DataType::Int32,
        DataType::Utf8,
        DataType::Utf8,
        DataType::Utf8,
        DataType::Utf8,
        DataType::Utf8,
        DataType::Utf8,
        DataType::Utf8,
        DataType::UInt32,
        DataType::Float64,
        DataType::Float64,
    ];
    let fields: Vec<Field> = COLUMN_NAMES
        .iter()
        .zip(types)
        .map(|(name, ty)| Field::new(*name, ty, false))
        .collect();
    Arc::new(Schema::new(fields))
}

/// Build a single batch holding `records` in order.
pub fn to_record_batch<'a, I>(records: I) -> Result<RecordBatch, ArrowError>
where
    I: IntoIterator<Item = &'a Record>,
{
    let records: Vec<&Record> = records.into_iter().collect();

    fn strings<'r>(rows: &[&'r Record], f: impl Fn(&'r Record) -> &'r str) -> ArrayRef {
        Arc::new(StringArray::from_iter_values(rows.iter().map(|&r| f(r))))
    }

    let columns: Vec<ArrayRef> = vec![
        Arc::new(Date32Array::from_iter_values(
            records.iter().map(|r| Date32Type::from_naive_date(r.order_date())),
        )),
        Arc::new(Int32Array::from_iter_values(records.iter().map(|r| r.year()))),
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.month().to_string()),
        )),
        strings(&records, Record::region),
        strings(&records, Record::category),
        strings(&records, Record::subcategory),
        strings(&records, Record::segment),
        strings(&records, Record::city),
        strings(&records, Record::customer_id),
        Arc::new(UInt32Array::from_iter_values(records.iter().map(|r| r.quantity()))),
        Arc::new(Float64Array::from_iter_values(records.iter().map(|r| r.sales()))),
        Arc::new(Float64Array::from_iter_values(records.iter().map(|r| r.profit()))),
    ];

    RecordBatch::try_new(record_schema(), columns)
}

/// Render up to `limit` records as a boxed text table.
pub fn pretty_table<'a, I>(records: I, limit: usize) -> Result<String, ArrowError>
where
    I: IntoIterator<Item = &'a Record>,
{
    let batch = to_record_batch(records.into_iter().take(limit))?;
    Ok(pretty_format_batches(&[batch])?.to_string())
}

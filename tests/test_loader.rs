//! Integration tests for loading datasets from disk.

mod common;

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use common::{date, three_orders, write_temp, CSV_HEADER};
use sales_dashboard::config::load_config_file;
use sales_dashboard::data::batch::{record_schema, to_record_batch};
use sales_dashboard::report::write_report;
use sales_dashboard::{
    load_file, load_file_with, render, DatasetCache, FilterSelection, LoadError, LoadOptions,
    MonthBucket, RenderOptions,
};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn load_error(result: anyhow::Result<sales_dashboard::Dataset>) -> LoadError {
    let err = result.expect_err("load should fail");
    err.downcast_ref::<LoadError>()
        .cloned()
        .unwrap_or_else(|| panic!("not a LoadError: {err:#}"))
}

// ============================================================================
// CSV
// ============================================================================

#[test]
fn csv_with_superstore_headers_loads() {
    let body = format!(
        "{CSV_HEADER}\n\
         11/8/2016,South,Furniture,Bookcases,Consumer,Henderson,CG-12520,2,\"$261.96\",41.9136\n\
         2017-06-12,West,Office Supplies,Labels,Corporate,Los Angeles,DV-13045,2,14.62,6.8714\n"
    );
    let (_dir, path) = write_temp("orders.csv", &body);
    let ds = load_file(&path).unwrap();

    assert_eq!(ds.len(), 2);
    let first = &ds.records()[0];
    assert_eq!(first.order_date(), date(2016, 11, 8));
    assert_eq!(first.year(), 2016);
    assert_eq!(first.month(), MonthBucket { year: 2016, month: 11 });
    assert_eq!(first.subcategory(), "Bookcases");
    assert_eq!(first.sales(), 261.96);
    assert_eq!(ds.regions(), ["South", "West"]);
    assert_eq!(ds.years().len(), 2);
}

#[test]
fn csv_malformed_date_is_rejected_with_row() {
    let body = format!(
        "{CSV_HEADER}\n\
         2017-06-12,West,Office Supplies,Labels,Corporate,Los Angeles,DV-13045,2,14.62,6.87\n\
         someday,West,Office Supplies,Labels,Corporate,Los Angeles,DV-13045,2,14.62,6.87\n"
    );
    let (_dir, path) = write_temp("orders.csv", &body);

    match load_error(load_file(&path)) {
        LoadError::MalformedRecord { row, reason } => {
            assert_eq!(row, 2);
            assert!(reason.contains("someday"), "{reason}");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn csv_float_formatted_quantity_loads() {
    let body = format!(
        "{CSV_HEADER}\n\
         2017-06-12,West,Office Supplies,Labels,Corporate,Los Angeles,DV-13045,3.0,14.62,6.87\n\
         2017-06-13,West,Office Supplies,Paper,Corporate,Los Angeles,DV-13045,2,9.50,1.20\n"
    );
    let (_dir, path) = write_temp("orders.csv", &body);
    let ds = load_file(&path).unwrap();
    assert_eq!(ds.records()[0].quantity(), 3);
    assert_eq!(ds.records()[1].quantity(), 2);

    let fractional = body.replace(",3.0,", ",2.5,");
    let (_dir, path) = write_temp("orders.csv", &fractional);
    assert!(matches!(
        load_error(load_file(&path)),
        LoadError::MalformedRecord { row: 1, .. }
    ));
}

#[test]
fn csv_missing_column_is_rejected() {
    let body = "order_date,region,category,segment,city,customer_id,quantity,sales,profit\n";
    let (_dir, path) = write_temp("orders.csv", body);
    assert_eq!(load_error(load_file(&path)), LoadError::MissingColumn("subcategory"));
}

#[test]
fn header_only_file_is_an_empty_dataset() {
    let (_dir, path) = write_temp("orders.csv", &format!("{CSV_HEADER}\n"));
    let ds = load_file(&path).unwrap();
    assert!(ds.is_empty());
    assert!(render(&ds, &FilterSelection::default(), &RenderOptions::default()).is_err());
}

#[test]
fn unsupported_extension_is_rejected() {
    let (_dir, path) = write_temp("orders.txt", "whatever");
    assert_eq!(
        load_error(load_file(&path)),
        LoadError::UnsupportedFormat("txt".into())
    );
}

// ============================================================================
// JSON
// ============================================================================

#[test]
fn json_records_load_with_epoch_and_text_dates() {
    let body = r#"[
        {"order_date": 1672876800000, "region": "East", "category": "Technology",
         "subcategory": "Phones", "segment": "Consumer", "city": "Boston",
         "customer_id": "AA-1", "quantity": 3, "sales": 300, "profit": 45.5, "discount": 0.2},
        {"Order Date": "2024-02-29", "Region": "East", "Category": "Technology",
         "Sub-Category": "Copiers", "Segment": "Corporate", "City": "Boston",
         "Customer ID": 1042, "Quantity": 1, "Sales": 999.99, "Profit": -10}
    ]"#;
    let (_dir, path) = write_temp("orders.json", body);
    let ds = load_file(&path).unwrap();

    assert_eq!(ds.len(), 2);
    assert_eq!(ds.records()[0].order_date(), date(2023, 1, 5));
    assert_eq!(ds.records()[0].sales(), 300.0);
    assert_eq!(ds.records()[1].order_date(), date(2024, 2, 29));
    assert_eq!(ds.records()[1].customer_id(), "1042");
    assert_eq!(ds.records()[1].profit(), -10.0);
}

#[test]
fn json_row_missing_a_field_is_rejected() {
    let body = r#"[{"order_date": "2024-01-01", "region": "East"}]"#;
    let (_dir, path) = write_temp("orders.json", body);
    assert!(matches!(
        load_error(load_file(&path)),
        LoadError::MalformedRecord { row: 1, .. }
    ));
}

// ============================================================================
// PARQUET
// ============================================================================

#[test]
fn parquet_written_from_records_loads_back() {
    let source = three_orders();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orders.parquet");

    let batch = to_record_batch(source.records()).unwrap();
    let file = std::fs::File::create(&path).unwrap();
    let mut writer = ArrowWriter::try_new(file, record_schema(), None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let loaded = load_file(&path).unwrap();
    assert_eq!(loaded.records(), source.records());
}

#[test]
fn parquet_timestamps_and_int_amounts_are_accepted() {
    let schema = Arc::new(Schema::new(vec![
        Field::new("Order Date", DataType::Timestamp(TimeUnit::Millisecond, None), true),
        Field::new("Region", DataType::Utf8, false),
        Field::new("Category", DataType::Utf8, false),
        Field::new("Sub-Category", DataType::Utf8, false),
        Field::new("Segment", DataType::Utf8, false),
        Field::new("City", DataType::Utf8, false),
        Field::new("Customer ID", DataType::Utf8, false),
        Field::new("Quantity", DataType::Int64, false),
        Field::new("Sales", DataType::Int64, false),
        Field::new("Profit", DataType::Float64, false),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(TimestampMillisecondArray::from(vec![1_672_923_600_000_i64])),
        Arc::new(StringArray::from(vec!["Central"])),
        Arc::new(StringArray::from(vec!["Furniture"])),
        Arc::new(StringArray::from(vec!["Chairs"])),
        Arc::new(StringArray::from(vec!["Home Office"])),
        Arc::new(StringArray::from(vec!["Chicago"])),
        Arc::new(StringArray::from(vec!["ZZ-9"])),
        Arc::new(Int64Array::from(vec![4])),
        Arc::new(Int64Array::from(vec![500])),
        Arc::new(Float64Array::from(vec![-12.5])),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orders.pq");
    let file = std::fs::File::create(&path).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let ds = load_file(&path).unwrap();
    let rec = &ds.records()[0];
    assert_eq!(rec.order_date(), date(2023, 1, 5));
    assert_eq!(rec.quantity(), 4);
    assert_eq!(rec.sales(), 500.0);
    assert_eq!(rec.profit(), -12.5);
}

// ============================================================================
// XLSX
// ============================================================================

fn write_xlsx(path: &std::path::Path, sheet: &str) {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet).unwrap();

    for (col, header) in CSV_HEADER.split(',').enumerate() {
        worksheet.write_string(0, col as u16, header).unwrap();
    }
    // Excel serial 44931 is 2023-01-05.
    worksheet.write_number(1, 0, 44931.0).unwrap();
    worksheet.write_string(2, 0, "2024-07-04").unwrap();
    for row in 1..=2u32 {
        for (col, text) in ["South", "Technology", "Phones", "Consumer", "Atlanta", "BB-2"]
            .iter()
            .enumerate()
        {
            worksheet.write_string(row, col as u16 + 1, *text).unwrap();
        }
        worksheet.write_number(row, 7, 2.0).unwrap();
        worksheet.write_number(row, 8, 100.0 * f64::from(row)).unwrap();
        worksheet.write_number(row, 9, 7.5).unwrap();
    }
    workbook.save(path).unwrap();
}

#[test]
fn xlsx_first_sheet_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("superstore.xlsx");
    write_xlsx(&path, "Orders");

    let ds = load_file(&path).unwrap();
    assert_eq!(ds.len(), 2);
    assert_eq!(ds.records()[0].order_date(), date(2023, 1, 5));
    assert_eq!(ds.records()[1].order_date(), date(2024, 7, 4));
    assert_eq!(ds.records()[1].sales(), 200.0);
    assert_eq!(ds.records()[0].quantity(), 2);

    let view = render(&ds, &FilterSelection::default(), &RenderOptions::default()).unwrap();
    assert_eq!(view.kpis.sales_yoy.map(|y| y.percent), Some(100.0));
}

#[test]
fn xlsx_named_sheet_must_exist() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("superstore.xlsx");
    write_xlsx(&path, "Orders");

    let named = LoadOptions {
        sheet: Some("Orders".into()),
    };
    assert_eq!(load_file_with(&path, &named).unwrap().len(), 2);

    let missing = LoadOptions {
        sheet: Some("Returns".into()),
    };
    assert_eq!(
        load_error(load_file_with(&path, &missing)),
        LoadError::SheetNotFound("Returns".into())
    );
}

// ============================================================================
// CONFIG TO REPORT
// ============================================================================

#[test]
fn configured_run_loads_filters_and_reports() {
    let body = format!(
        "{CSV_HEADER}\n\
         2023-03-01,A,X,Phones,Consumer,Seattle,C1,2,100,10\n\
         2024-03-01,A,X,Phones,Consumer,Seattle,C2,3,150,20\n\
         2024-07-01,B,Y,Paper,Corporate,Boston,C1,1,50,-5\n"
    );
    let (dir, _csv) = write_temp("orders.csv", &body);
    let config_path = dir.path().join("dashboard.toml");
    std::fs::write(
        &config_path,
        r#"
[source]
path = "orders.csv"

[report]
top_n = 1
format = "json"

[filters]
regions = ["A"]
"#,
    )
    .unwrap();

    let config = load_config_file(&config_path).unwrap();
    assert_eq!(config.source.path, dir.path().join("orders.csv"));

    let mut cache = DatasetCache::new();
    let dataset = cache
        .get_or_load(&config.source.path, &config.load_options())
        .unwrap();
    let again = cache
        .get_or_load(&config.source.path, &config.load_options())
        .unwrap();
    assert!(Arc::ptr_eq(&dataset, &again));

    let view = render(&dataset, &config.filters, &config.render_options()).unwrap();
    assert_eq!(view.kpis.total_sales, 250.0);
    assert_eq!(view.top_cities.len(), 1);

    let json = write_report(&view, config.report.format, config.report.preview_rows).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["kpis"]["total_sales"], 250.0);
    assert_eq!(parsed["kpis"]["sales_yoy"]["percent"], 50.0);
}

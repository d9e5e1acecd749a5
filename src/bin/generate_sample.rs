use chrono::{Days, NaiveDate};
use parquet::arrow::ArrowWriter;

use sales_dashboard::data::batch::{record_schema, to_record_batch};
use sales_dashboard::{Dataset, RawRecord};

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_f64() * n as f64) as usize % n
    }

    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.below(items.len())]
    }
}

const REGIONS: [(&str, &[&str]); 4] = [
    ("West", &["Los Angeles", "Seattle", "San Francisco", "Phoenix"]),
    ("East", &["New York City", "Philadelphia", "Boston", "Columbus"]),
    ("Central", &["Houston", "Chicago", "Dallas", "Detroit"]),
    ("South", &["Jacksonville", "Atlanta", "Miami", "Louisville"]),
];

/// (category, sub-category, typical unit price, typical margin)
const PRODUCTS: [(&str, &str, f64, f64); 12] = [
    ("Furniture", "Chairs", 130.0, 0.08),
    ("Furniture", "Tables", 260.0, -0.05),
    ("Furniture", "Bookcases", 170.0, -0.02),
    ("Furniture", "Furnishings", 30.0, 0.14),
    ("Office Supplies", "Binders", 35.0, 0.15),
    ("Office Supplies", "Paper", 15.0, 0.43),
    ("Office Supplies", "Storage", 60.0, 0.10),
    ("Office Supplies", "Appliances", 90.0, 0.17),
    ("Technology", "Phones", 120.0, 0.13),
    ("Technology", "Machines", 300.0, 0.02),
    ("Technology", "Accessories", 55.0, 0.22),
    ("Technology", "Copiers", 700.0, 0.37),
];

const SEGMENTS: [&str; 3] = ["Consumer", "Corporate", "Home Office"];

fn main() {
    env_logger::init();
    let mut rng = SimpleRng::new(42);

    let first_day = NaiveDate::from_ymd_opt(2021, 1, 1).expect("valid start date");
    let n_days = 4 * 365;
    let n_orders = 2_000;

    let rows = (0..n_orders).map(|_| {
        let (region, cities) = *rng.pick(&REGIONS);
        let (category, subcategory, price, margin) = *rng.pick(&PRODUCTS);
        let quantity = 1 + rng.below(9) as u32;
        let sales = (price * rng.uniform(0.6, 1.4) * f64::from(quantity) * 100.0).round() / 100.0;
        let profit = (sales * (margin + rng.uniform(-0.25, 0.25)) * 100.0).round() / 100.0;

        RawRecord {
            order_date: first_day
                .checked_add_days(Days::new(rng.below(n_days) as u64))
                .expect("date within range"),
            region: region.to_string(),
            category: category.to_string(),
            subcategory: subcategory.to_string(),
            segment: rng.pick(&SEGMENTS).to_string(),
            city: rng.pick(cities).to_string(),
            customer_id: format!("CU-{:05}", 10_000 + rng.below(400)),
            quantity,
            sales,
            profit,
        }
    });
    let dataset: Dataset = rows.collect();

    // Write Parquet
    let parquet_path = "sample_superstore.parquet";
    let batch = to_record_batch(dataset.records()).expect("Failed to create RecordBatch");
    let file = std::fs::File::create(parquet_path).expect("Failed to create output file");
    let mut writer = ArrowWriter::try_new(file, record_schema(), None).expect("Failed to create writer");
    writer.write(&batch).expect("Failed to write batch");
    writer.close().expect("Failed to close writer");

    // Write CSV
    let csv_path = "sample_superstore.csv";
    let mut csv_writer = csv::Writer::from_path(csv_path).expect("Failed to create CSV file");
    for rec in dataset.records() {
        csv_writer.serialize(rec).expect("Failed to write CSV row");
    }
    csv_writer.flush().expect("Failed to flush CSV");

    println!(
        "Wrote {} orders ({} to {}) to {parquet_path} and {csv_path}",
        dataset.len(),
        dataset.years().first().copied().unwrap_or_default(),
        dataset.years().last().copied().unwrap_or_default(),
    );
}

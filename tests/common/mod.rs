//! Fixtures shared by the integration tests.
#![allow(dead_code)]

use std::io::Write;
use std::path::PathBuf;

use chrono::NaiveDate;
use sales_dashboard::{Dataset, RawRecord};

pub const EPSILON: f64 = 1e-9;

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= EPSILON * a.abs().max(b.abs()).max(1.0)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Builder-style order line with neutral defaults.
pub struct Order(RawRecord);

impl Order {
    pub fn on(y: i32, m: u32, d: u32) -> Self {
        Order(RawRecord {
            order_date: date(y, m, d),
            region: "West".into(),
            category: "Technology".into(),
            subcategory: "Phones".into(),
            segment: "Consumer".into(),
            city: "Seattle".into(),
            customer_id: "CUST-1".into(),
            quantity: 1,
            sales: 0.0,
            profit: 0.0,
        })
    }

    pub fn region(mut self, v: &str) -> Self {
        self.0.region = v.into();
        self
    }
    pub fn category(mut self, v: &str) -> Self {
        self.0.category = v.into();
        self
    }
    pub fn subcategory(mut self, v: &str) -> Self {
        self.0.subcategory = v.into();
        self
    }
    pub fn segment(mut self, v: &str) -> Self {
        self.0.segment = v.into();
        self
    }
    pub fn city(mut self, v: &str) -> Self {
        self.0.city = v.into();
        self
    }
    pub fn customer(mut self, v: &str) -> Self {
        self.0.customer_id = v.into();
        self
    }
    pub fn quantity(mut self, v: u32) -> Self {
        self.0.quantity = v;
        self
    }
    pub fn amounts(mut self, sales: f64, profit: f64) -> Self {
        self.0.sales = sales;
        self.0.profit = profit;
        self
    }
    pub fn build(self) -> RawRecord {
        self.0
    }
}

/// The three-order scenario: two regions, two categories, 2023 and 2024.
pub fn three_orders() -> Dataset {
    vec![
        Order::on(2023, 3, 1)
            .region("A")
            .category("X")
            .customer("C1")
            .quantity(2)
            .amounts(100.0, 10.0)
            .build(),
        Order::on(2024, 3, 1)
            .region("A")
            .category("X")
            .customer("C2")
            .quantity(3)
            .amounts(150.0, 20.0)
            .build(),
        Order::on(2024, 7, 1)
            .region("B")
            .category("Y")
            .customer("C1")
            .quantity(1)
            .amounts(50.0, -5.0)
            .build(),
    ]
    .into_iter()
    .collect()
}

/// A larger, irregular dataset for property-style checks.
pub fn mixed_orders() -> Dataset {
    let regions = ["West", "East", "Central", "South"];
    let categories = [
        ("Furniture", ["Chairs", "Tables", "Bookcases"]),
        ("Office Supplies", ["Paper", "Binders", "Storage"]),
        ("Technology", ["Phones", "Copiers", "Machines"]),
    ];
    let segments = ["Consumer", "Corporate", "Home Office"];
    let cities = [
        "Seattle", "Boston", "Dallas", "Miami", "Denver", "Austin", "Tulsa", "Omaha", "Reno",
        "Provo", "Fresno", "Toledo", "Akron",
    ];

    (0..240u32)
        .map(|i| {
            let (category, subs) = categories[(i as usize * 7) % 3];
            Order::on(2021 + (i % 4) as i32, 1 + (i * 5) % 12, 1 + (i * 11) % 28)
                .region(regions[(i as usize * 3) % 4])
                .category(category)
                .subcategory(subs[(i as usize / 3) % 3])
                .segment(segments[(i as usize / 2) % 3])
                .city(cities[(i as usize * 17) % cities.len()])
                .customer(&format!("C-{}", i % 37))
                .quantity(1 + i % 6)
                .amounts(
                    f64::from(i % 50) * 13.75 + 4.5,
                    f64::from(i % 9) * 6.25 - 20.0,
                )
                .build()
        })
        .collect()
}

pub const CSV_HEADER: &str = "Order Date,Region,Category,Sub-Category,Segment,City,Customer ID,Quantity,Sales,Profit";

/// Write `body` under a temp directory as `name`; the directory lives as long
/// as the returned guard.
pub fn write_temp(name: &str, body: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(body.as_bytes()).unwrap();
    (dir, path)
}

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::db::models::{
    HistoryAction, HistoryEntry, LocalizedText, Order, OrderItem, OrderStatus, User,
};
use crate::db::{Datastore, FileStore, StoreData};
use crate::utils::time;

use super::engine::{display_name, ReportEngine, TOP_LIMIT};

// ========================================================================
// Helpers
// ========================================================================

fn ms(date: &str) -> i64 {
    let date = time::parse_date(date).unwrap();
    time::day_start_millis(date, chrono_tz::UTC)
}

/// Build an order record directly in the arena (the engine only reads).
fn order(
    customer: &str,
    customer_name: &str,
    created_at: i64,
    status: OrderStatus,
    lines: &[(&str, &str, u32)],
) -> Order {
    let items: Vec<OrderItem> = lines
        .iter()
        .map(|(product, name, quantity)| OrderItem {
            product: product.to_string(),
            product_name: LocalizedText::new(*name, *name),
            quantity: *quantity,
        })
        .collect();
    let total_items = items.iter().map(|i| i.quantity).sum();
    Order {
        id: Some(format!("{customer}-{created_at}")),
        order_number: format!("ST-{customer}-{created_at}"),
        customer: customer.to_string(),
        customer_name: customer_name.to_string(),
        customer_phone: "+971".into(),
        items,
        total_items,
        status,
        message: None,
        can_edit: false,
        edit_deadline: created_at,
        history: vec![HistoryEntry {
            action: HistoryAction::Created,
            by: customer.to_string(),
            by_name: customer_name.to_string(),
            timestamp: created_at,
            changes: None,
        }],
        created_at,
        updated_at: created_at,
    }
}

fn engine_over(seed: StoreData) -> ReportEngine {
    let store = Arc::new(Datastore::fallback_only(FileStore::in_memory(seed)));
    ReportEngine::new(store, chrono_tz::UTC)
}

// ========================================================================
// Worked example from the reporting requirements
// ========================================================================

#[tokio::test]
async fn same_day_orders_roll_up_into_top_products_and_summary() {
    let day = ms("2026-08-06");
    let seed = StoreData {
        orders: vec![
            order(
                "u-a",
                "Customer A",
                day + 1_000,
                OrderStatus::New,
                &[("p-a", "Product A", 2)],
            ),
            order(
                "u-b",
                "Customer B",
                day + 2_000,
                OrderStatus::New,
                &[("p-a", "Product A", 3), ("p-b", "Product B", 1)],
            ),
        ],
        ..StoreData::default()
    };
    let engine = engine_over(seed);

    let report = engine.build_report(day, ms("2026-08-07")).await.unwrap();

    assert_eq!(report.summary.total_orders, 2);
    assert_eq!(report.summary.total_items, 6);
    assert!((report.summary.average_items_per_order - 3.0).abs() < f64::EPSILON);

    assert_eq!(report.top_products.len(), 2);
    assert_eq!(report.top_products[0].product, "p-a");
    assert_eq!(report.top_products[0].quantity_sum, 5);
    assert_eq!(report.top_products[0].order_count, 2);
    assert_eq!(report.top_products[1].product, "p-b");
    assert_eq!(report.top_products[1].quantity_sum, 1);
    assert_eq!(report.top_products[1].order_count, 1);
}

// ========================================================================
// Matrix invariants
// ========================================================================

#[tokio::test]
async fn matrix_totals_equal_cell_sums_for_random_orders() {
    let customers = ["u-1", "u-2", "u-3", "u-4", "u-5"];
    let products = ["p-1", "p-2", "p-3", "p-4"];
    let day = ms("2026-03-01");

    let mut rng = StdRng::seed_from_u64(42);
    let mut orders = Vec::new();
    let mut expected_rows: std::collections::HashMap<&str, u64> = Default::default();
    let mut expected_cols: std::collections::HashMap<&str, u64> = Default::default();
    let mut expected_grand = 0u64;

    for n in 0..30 {
        let customer = customers[rng.gen_range(0..customers.len())];
        let line_count = rng.gen_range(1..=3);
        let mut picked: Vec<usize> = (0..products.len()).collect();
        let mut lines: Vec<(&str, &str, u32)> = Vec::new();
        for _ in 0..line_count {
            let product = products[picked.remove(rng.gen_range(0..picked.len()))];
            let quantity = rng.gen_range(1..9u32);
            lines.push((product, product, quantity));
            *expected_rows.entry(customer).or_insert(0) += u64::from(quantity);
            *expected_cols.entry(product).or_insert(0) += u64::from(quantity);
            expected_grand += u64::from(quantity);
        }
        orders.push(order(
            customer,
            customer,
            day + n * 60_000,
            OrderStatus::New,
            &lines,
        ));
    }

    let engine = engine_over(StoreData {
        orders,
        ..StoreData::default()
    });
    let report = engine.build_report(day, ms("2026-03-02")).await.unwrap();
    let matrix = &report.matrix;

    assert_eq!(matrix.grand_total(), expected_grand);
    assert_eq!(
        matrix.row_totals().iter().sum::<u64>(),
        matrix.column_totals().iter().sum::<u64>()
    );
    for (row, total) in matrix.rows.iter().zip(matrix.row_totals()) {
        assert_eq!(total, expected_rows[row.customer.as_str()], "row {}", row.customer);
    }
    for (column, total) in matrix.columns.iter().zip(matrix.column_totals()) {
        assert_eq!(
            total, expected_cols[column.product.as_str()],
            "column {}",
            column.product
        );
    }
    // The matrix equals the slice: its grand total is the item total.
    assert_eq!(matrix.grand_total(), report.summary.total_items);
}

// ========================================================================
// Trend, histogram, summary
// ========================================================================

#[tokio::test]
async fn daily_trend_buckets_only_days_with_orders() {
    let seed = StoreData {
        orders: vec![
            order("u-a", "A", ms("2026-08-03") + 10, OrderStatus::New, &[("p", "P", 2)]),
            order("u-a", "A", ms("2026-08-03") + 20, OrderStatus::New, &[("p", "P", 3)]),
            // nothing on 2026-08-04
            order("u-b", "B", ms("2026-08-05") + 30, OrderStatus::Received, &[("p", "P", 4)]),
        ],
        ..StoreData::default()
    };
    let engine = engine_over(seed);

    let report = engine
        .build_report(ms("2026-08-01"), ms("2026-08-08"))
        .await
        .unwrap();

    let dates: Vec<String> = report
        .daily_trend
        .iter()
        .map(|p| p.date.to_string())
        .collect();
    assert_eq!(dates, vec!["2026-08-03", "2026-08-05"]);
    assert_eq!(report.daily_trend[0].order_count, 2);
    assert_eq!(report.daily_trend[0].total_item_units, 5);
    assert_eq!(report.daily_trend[1].order_count, 1);
    assert_eq!(report.daily_trend[1].total_item_units, 4);
}

#[tokio::test]
async fn status_distribution_counts_only_statuses_present() {
    let day = ms("2026-08-06");
    let seed = StoreData {
        orders: vec![
            order("u-a", "A", day + 1, OrderStatus::New, &[("p", "P", 2)]),
            order("u-a", "A", day + 2, OrderStatus::Received, &[("p", "P", 2)]),
            order("u-b", "B", day + 3, OrderStatus::Received, &[("p", "P", 2)]),
        ],
        ..StoreData::default()
    };
    let engine = engine_over(seed);

    let report = engine.build_report(day, ms("2026-08-07")).await.unwrap();
    assert_eq!(report.status_distribution.len(), 2);
    assert_eq!(report.status_distribution["new"], 1);
    assert_eq!(report.status_distribution["received"], 2);
}

#[tokio::test]
async fn new_customers_are_counted_against_full_history() {
    let seed = StoreData {
        orders: vec![
            // u-old's first order predates the range.
            order("u-old", "Old", ms("2026-07-01"), OrderStatus::Received, &[("p", "P", 2)]),
            order("u-old", "Old", ms("2026-08-06") + 1, OrderStatus::New, &[("p", "P", 2)]),
            order("u-new", "New", ms("2026-08-06") + 2, OrderStatus::New, &[("p", "P", 3)]),
        ],
        ..StoreData::default()
    };
    let engine = engine_over(seed);

    let report = engine
        .build_report(ms("2026-08-06"), ms("2026-08-07"))
        .await
        .unwrap();

    // Overall distinct customers, not just the range.
    assert_eq!(report.summary.total_customers, 2);
    assert_eq!(report.summary.new_customers, 1);
    assert_eq!(report.summary.total_orders, 2);
}

#[tokio::test]
async fn empty_ranges_produce_an_empty_report_with_zero_average() {
    let seed = StoreData {
        orders: vec![order(
            "u-a",
            "A",
            ms("2026-01-01"),
            OrderStatus::New,
            &[("p", "P", 2)],
        )],
        ..StoreData::default()
    };
    let engine = engine_over(seed);

    let report = engine
        .build_report(ms("2026-08-01"), ms("2026-08-02"))
        .await
        .unwrap();
    assert_eq!(report.summary.total_orders, 0);
    assert_eq!(report.summary.average_items_per_order, 0.0);
    assert!(report.daily_trend.is_empty());
    assert!(report.top_products.is_empty());
    assert!(report.matrix.rows.is_empty());
    // History outside the range still counts towards the customer base.
    assert_eq!(report.summary.total_customers, 1);
}

#[tokio::test]
async fn leaderboards_truncate_to_the_top_ten() {
    let day = ms("2026-08-06");
    let mut orders = Vec::new();
    for i in 0..12 {
        let customer = format!("u-{i:02}");
        // Customer i places i+1 orders so the ranking is unambiguous.
        for n in 0..=i {
            orders.push(order(
                &customer,
                &customer,
                day + (i * 100 + n) as i64,
                OrderStatus::New,
                &[("p", "P", 2)],
            ));
        }
    }
    let engine = engine_over(StoreData {
        orders,
        ..StoreData::default()
    });

    let report = engine.build_report(day, ms("2026-08-07")).await.unwrap();
    assert_eq!(report.top_customers.len(), TOP_LIMIT);
    assert_eq!(report.top_customers[0].customer, "u-11");
    assert_eq!(report.top_customers[0].order_count, 12);
    // The two least active customers fell off the board.
    assert!(!report.top_customers.iter().any(|c| c.customer == "u-00"));
    assert!(!report.top_customers.iter().any(|c| c.customer == "u-01"));
}

#[tokio::test]
async fn company_names_win_in_customer_labels() {
    let day = ms("2026-08-06");
    let seed = StoreData {
        orders: vec![order(
            "u-alnoor",
            "Ahmed",
            day + 1,
            OrderStatus::New,
            &[("p", "P", 2)],
        )],
        users: vec![User {
            id: "u-alnoor".into(),
            name: "Ahmed".into(),
            company: Some("Al Noor Trading".into()),
            phone: "+971".into(),
        }],
        ..StoreData::default()
    };
    let engine = engine_over(seed);

    let report = engine.build_report(day, ms("2026-08-07")).await.unwrap();
    assert_eq!(report.top_customers[0].display_name, "Al Noor Trading");
    assert_eq!(report.matrix.rows[0].display_name, "Al Noor Trading");
}

#[tokio::test]
async fn malformed_stored_orders_are_skipped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    let day = ms("2026-08-06");
    let good = serde_json::to_value(order(
        "u-a",
        "A",
        day + 1,
        OrderStatus::New,
        &[("p", "P", 2)],
    ))
    .unwrap();
    let doc = serde_json::json!({
        "orders": [good, {"this": "is not an order"}],
        "products": [],
        "users": [],
    });
    std::fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();

    let store = Arc::new(Datastore::fallback_only(FileStore::open(
        &path,
        StoreData::default(),
    )));
    let engine = ReportEngine::new(store, chrono_tz::UTC);

    let report = engine.build_report(day, ms("2026-08-07")).await.unwrap();
    assert_eq!(report.summary.total_orders, 1);
    assert_eq!(report.summary.skipped_records, 1);
}

// ========================================================================
// Display name resolution rungs
// ========================================================================

#[test]
fn display_name_prefers_the_company() {
    let user = User {
        id: "u".into(),
        name: "Ahmed".into(),
        company: Some("Al Noor Trading".into()),
        phone: "+971".into(),
    };
    assert_eq!(display_name(Some(&user), Some("Snapshot")), "Al Noor Trading");
}

#[test]
fn display_name_falls_back_to_the_personal_name() {
    let user = User {
        id: "u".into(),
        name: "Basma".into(),
        company: None,
        phone: "+971".into(),
    };
    assert_eq!(display_name(Some(&user), Some("Snapshot")), "Basma");

    let blank_company = User {
        company: Some(String::new()),
        ..user
    };
    assert_eq!(display_name(Some(&blank_company), None), "Basma");
}

#[test]
fn display_name_falls_back_to_the_order_snapshot() {
    let nameless = User {
        id: "u".into(),
        name: String::new(),
        company: None,
        phone: "+971".into(),
    };
    assert_eq!(display_name(Some(&nameless), Some("Snapshot")), "Snapshot");
    assert_eq!(display_name(None, Some("Snapshot")), "Snapshot");
}

#[test]
fn display_name_bottoms_out_at_unknown() {
    assert_eq!(display_name(None, None), "unknown");
    assert_eq!(display_name(None, Some("")), "unknown");
}

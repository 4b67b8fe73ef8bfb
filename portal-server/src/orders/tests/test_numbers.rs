use super::*;

use futures::future::join_all;

#[tokio::test]
async fn numbers_are_day_scoped_and_sequential() {
    let (_, manager, _) = test_manager();
    let first = manager
        .create_order(create_req("u-alnoor", vec![line("p-oil", 2)]))
        .await
        .unwrap();
    let second = manager
        .create_order(create_req("u-basma", vec![line("p-dates", 3)]))
        .await
        .unwrap();

    let today = time::today(chrono_tz::UTC).format("%y%m%d").to_string();
    assert_eq!(first.order_number, format!("ST{today}-0001"));
    assert_eq!(second.order_number, format!("ST{today}-0002"));
}

#[tokio::test]
async fn yesterdays_orders_do_not_advance_todays_sequence() {
    let mut seed = catalog_seed();
    // Two orders created yesterday, still in the store.
    let yesterday = time::now_millis() - 24 * 60 * 60 * 1_000;
    for (i, id) in ["ord-y1", "ord-y2"].iter().enumerate() {
        let mut order = seeded_order(id, &format!("ST260101-000{}", i + 1), i64::MAX, true);
        order.created_at = yesterday;
        seed.orders.push(order);
    }
    let (_, manager, _) = manager_over(seed);

    let order = manager
        .create_order(create_req("u-alnoor", vec![line("p-oil", 2)]))
        .await
        .unwrap();
    let today = time::today(chrono_tz::UTC).format("%y%m%d").to_string();
    assert_eq!(order.order_number, format!("ST{today}-0001"));
}

#[tokio::test]
async fn concurrent_creations_yield_distinct_numbers() {
    let (_, manager, _) = test_manager();

    let creates = (0..8).map(|_| {
        let manager = manager.clone();
        async move {
            manager
                .create_order(create_req("u-alnoor", vec![line("p-oil", 2)]))
                .await
        }
    });
    let orders: Vec<_> = join_all(creates)
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    let numbers: std::collections::HashSet<String> =
        orders.iter().map(|o| o.order_number.clone()).collect();
    assert_eq!(numbers.len(), 8, "expected 8 distinct numbers: {numbers:?}");
}

#[tokio::test]
async fn allocation_retries_after_a_duplicate_rejection() {
    // Pre-seed an order that already holds today's first sequence slot
    // but was created with a backdated timestamp, so the allocator's
    // day-count starts at zero and its first pick collides.
    let mut seed = catalog_seed();
    let today = time::today(chrono_tz::UTC);
    let mut squatter = seeded_order(
        "ord-squat",
        &crate::orders::number::format_order_number(today, 1),
        i64::MAX,
        true,
    );
    squatter.created_at = time::now_millis() - 24 * 60 * 60 * 1_000;
    seed.orders.push(squatter);
    let (_, manager, _) = manager_over(seed);

    let order = manager
        .create_order(create_req("u-alnoor", vec![line("p-oil", 2)]))
        .await
        .unwrap();
    // First pick (-0001) is taken; the retry lands on a free number.
    assert_eq!(
        order.order_number,
        crate::orders::number::format_order_number(today, 2)
    );
}

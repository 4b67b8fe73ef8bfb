//! Failover integration: the primary document engine is unreachable,
//! ordering must keep working on the fallback store.

use std::sync::Arc;
use std::time::Duration;

use portal_server::db::models::{LocalizedText, Product, User};
use portal_server::db::{Datastore, FileStore, OrderFilter, StoreData, SurrealConfig, SurrealStore};
use portal_server::orders::{CreateOrderRequest, OrderItemInput, OrderManager};
use portal_server::services::LogNotifier;

fn seeded_catalog() -> StoreData {
    StoreData {
        orders: Vec::new(),
        products: vec![Product {
            id: "p-oil".into(),
            name: LocalizedText::new("Olive Oil 5L", "زيت زيتون ٥ لتر"),
            is_available: true,
            sort_order: 1,
        }],
        users: vec![User {
            id: "u-alnoor".into(),
            name: "Ahmed".into(),
            company: Some("Al Noor Trading".into()),
            phone: "+9715550001".into(),
        }],
    }
}

/// A primary that cannot be reached: nothing listens on this endpoint.
fn dead_primary() -> SurrealStore {
    SurrealStore::new(SurrealConfig {
        endpoint: "127.0.0.1:1".into(),
        namespace: "portal".into(),
        database: "orders".into(),
        username: None,
        password: None,
        connect_timeout: Duration::from_millis(500),
        query_timeout: Duration::from_millis(500),
    })
}

#[tokio::test]
async fn orders_survive_a_downed_primary() {
    let store = Arc::new(Datastore::new(
        Some(dead_primary()),
        FileStore::in_memory(seeded_catalog()),
    ));
    let manager = OrderManager::new(
        store.clone(),
        Arc::new(LogNotifier),
        2,
        chrono_tz::UTC,
    );

    // Creation goes through even though every primary call fails.
    let order = manager
        .create_order(CreateOrderRequest {
            customer_id: "u-alnoor".into(),
            items: vec![OrderItemInput {
                product: "p-oil".into(),
                quantity: 4,
            }],
            message: None,
        })
        .await
        .expect("create must succeed via the fallback store");

    assert!(order.order_number.starts_with("ST"));
    assert_eq!(order.total_items, 4);

    // A subsequent list (still on the fallback) returns that order.
    let slice = manager
        .list_orders(&OrderFilter::default())
        .await
        .expect("list must succeed via the fallback store");
    assert_eq!(slice.orders.len(), 1);
    assert_eq!(slice.orders[0].order_number, order.order_number);
    assert_eq!(slice.orders[0].id, order.id);
}

#[tokio::test]
async fn backend_label_reports_the_configured_primary() {
    let with_primary = Datastore::new(
        Some(dead_primary()),
        FileStore::in_memory(StoreData::default()),
    );
    assert_eq!(with_primary.backend_label(), "document");

    let fallback_only = Datastore::fallback_only(FileStore::in_memory(StoreData::default()));
    assert_eq!(fallback_only.backend_label(), "memory");
}

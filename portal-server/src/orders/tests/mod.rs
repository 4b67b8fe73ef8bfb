use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::db::models::{
    HistoryAction, HistoryEntry, LocalizedText, Order, OrderItem, OrderStatus, Product, User,
};
use crate::db::{Datastore, FileStore, OrderFilter, StoreData};
use crate::services::{NotificationKind, Notifier};
use crate::utils::time;

use super::error::OrderError;
use super::manager::{Actor, CreateOrderRequest, EditOrderRequest, OrderItemInput, OrderManager};

mod test_numbers;

// ========================================================================
// Helpers
// ========================================================================

/// Notifier that records every emission for assertions
pub(crate) struct RecordingNotifier {
    pub events: Mutex<Vec<(String, NotificationKind, String)>>,
}

impl RecordingNotifier {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, user_id: &str, kind: NotificationKind, order_id: &str) {
        self.events
            .lock()
            .push((user_id.to_string(), kind, order_id.to_string()));
    }
}

fn catalog_seed() -> StoreData {
    StoreData {
        orders: Vec::new(),
        products: vec![
            Product {
                id: "p-oil".into(),
                name: LocalizedText::new("Olive Oil 5L", "زيت زيتون ٥ لتر"),
                is_available: true,
                sort_order: 1,
            },
            Product {
                id: "p-dates".into(),
                name: LocalizedText::new("Dates 1kg", "تمر ١ كجم"),
                is_available: true,
                sort_order: 2,
            },
            Product {
                id: "p-retired".into(),
                name: LocalizedText::new("Legacy Item", "صنف قديم"),
                is_available: false,
                sort_order: 3,
            },
        ],
        users: vec![
            User {
                id: "u-alnoor".into(),
                name: "Ahmed".into(),
                company: Some("Al Noor Trading".into()),
                phone: "+9715550001".into(),
            },
            User {
                id: "u-basma".into(),
                name: "Basma".into(),
                company: None,
                phone: "+9715550002".into(),
            },
        ],
    }
}

fn manager_over(seed: StoreData) -> (Arc<Datastore>, Arc<OrderManager>, Arc<RecordingNotifier>) {
    let store = Arc::new(Datastore::fallback_only(FileStore::in_memory(seed)));
    let notifier = RecordingNotifier::new();
    let manager = Arc::new(OrderManager::new(
        store.clone(),
        notifier.clone(),
        2,
        chrono_tz::UTC,
    ));
    (store, manager, notifier)
}

fn test_manager() -> (Arc<Datastore>, Arc<OrderManager>, Arc<RecordingNotifier>) {
    manager_over(catalog_seed())
}

fn line(product: &str, quantity: u32) -> OrderItemInput {
    OrderItemInput {
        product: product.to_string(),
        quantity,
    }
}

fn create_req(customer: &str, items: Vec<OrderItemInput>) -> CreateOrderRequest {
    CreateOrderRequest {
        customer_id: customer.to_string(),
        items,
        message: None,
    }
}

fn admin() -> Actor {
    Actor {
        id: "admin-1".into(),
        name: "Back Office".into(),
    }
}

/// Seed order injected straight into the arena (bypasses the manager),
/// used to set up states a live flow cannot produce, e.g. a stale
/// `can_edit` flag.
fn seeded_order(id: &str, number: &str, edit_deadline: i64, can_edit: bool) -> Order {
    let now = time::now_millis();
    Order {
        id: Some(id.to_string()),
        order_number: number.to_string(),
        customer: "u-alnoor".into(),
        customer_name: "Ahmed".into(),
        customer_phone: "+9715550001".into(),
        items: vec![OrderItem {
            product: "p-oil".into(),
            product_name: LocalizedText::new("Olive Oil 5L", "زيت زيتون ٥ لتر"),
            quantity: 3,
        }],
        total_items: 3,
        status: OrderStatus::New,
        message: None,
        can_edit,
        edit_deadline,
        history: vec![HistoryEntry {
            action: HistoryAction::Created,
            by: "u-alnoor".into(),
            by_name: "Ahmed".into(),
            timestamp: now - 1,
            changes: None,
        }],
        created_at: now - 1,
        updated_at: now - 1,
    }
}

//! OrderManager - lifecycle transitions and the audit trail
//!
//! Validates order creation against the catalog, enforces the time-boxed
//! edit window, and appends a history entry on every mutation. All
//! persistence goes through the store adapter; the manager never knows
//! which backend served it.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Duration;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::models::{HistoryAction, HistoryEntry, Order, OrderItem, OrderStatus};
use crate::db::{Datastore, OrderFilter, OrderSlice, StoreError};
use crate::services::{NotificationKind, Notifier};
use crate::utils::time;

use super::error::OrderError;
use super::number::OrderNumberAllocator;

/// Minimum item units across all lines for a valid order
pub const MIN_ORDER_UNITS: u32 = 2;

/// Bound on order-number reallocation after duplicate rejections
const MAX_ALLOCATE_RETRIES: usize = 3;

// ============================================================================
// Request Types
// ============================================================================

/// One requested order line
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemInput {
    pub product: String,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: u32,
}

/// Create-order payload
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub customer_id: String,
    #[validate(length(min = 1, message = "order must contain at least one line"), nested)]
    pub items: Vec<OrderItemInput>,
    #[validate(length(max = 500, message = "message too long"))]
    pub message: Option<String>,
}

/// Edit-order payload; quantity patches may only touch lines already on
/// the order.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EditOrderRequest {
    #[validate(nested)]
    pub items: Option<Vec<OrderItemInput>>,
    #[validate(length(max = 500, message = "message too long"))]
    pub message: Option<String>,
}

/// Acting user identity, supplied by the (external) auth layer
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: String,
    pub name: String,
}

// ============================================================================
// Manager
// ============================================================================

/// Order lifecycle manager
pub struct OrderManager {
    store: Arc<Datastore>,
    allocator: OrderNumberAllocator,
    notifier: Arc<dyn Notifier>,
    edit_window: Duration,
    tz: Tz,
    /// Single-writer section around allocate+insert; in-process
    /// creations observe distinct day counts instead of racing to the
    /// same one.
    create_gate: tokio::sync::Mutex<()>,
}

impl OrderManager {
    pub fn new(
        store: Arc<Datastore>,
        notifier: Arc<dyn Notifier>,
        edit_window_hours: i64,
        tz: Tz,
    ) -> Self {
        let allocator = OrderNumberAllocator::new(store.clone(), tz);
        Self {
            store,
            allocator,
            notifier,
            edit_window: Duration::hours(edit_window_hours),
            tz,
            create_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Create an order for a customer.
    ///
    /// Validates the payload before touching the store, checks the
    /// catalog, snapshots display data, allocates a day-scoped order
    /// number (retrying bounded times on duplicates) and inserts.
    pub async fn create_order(&self, req: CreateOrderRequest) -> Result<Order, OrderError> {
        req.validate()
            .map_err(|e| OrderError::Validation(e.to_string()))?;

        let total_units: u32 = req.items.iter().map(|i| i.quantity).sum();
        if total_units < MIN_ORDER_UNITS {
            return Err(OrderError::InsufficientItems {
                min: MIN_ORDER_UNITS,
            });
        }

        let mut seen = HashSet::new();
        for item in &req.items {
            if !seen.insert(item.product.as_str()) {
                return Err(OrderError::Validation(format!(
                    "duplicate line for product {}",
                    item.product
                )));
            }
        }

        // Catalog checks - every referenced product must exist and be
        // orderable right now.
        let ids: Vec<String> = req.items.iter().map(|i| i.product.clone()).collect();
        let products = self.store.products_by_ids(&ids).await?;

        let found: HashSet<&str> = products.iter().map(|p| p.id.as_str()).collect();
        let mut missing: Vec<String> = ids
            .iter()
            .filter(|id| !found.contains(id.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            missing.sort();
            return Err(OrderError::ProductsNotFound(missing));
        }

        let mut unavailable: Vec<String> = products
            .iter()
            .filter(|p| !p.is_available)
            .map(|p| p.id.clone())
            .collect();
        if !unavailable.is_empty() {
            unavailable.sort();
            return Err(OrderError::ProductsUnavailable(unavailable));
        }

        let customer = self
            .store
            .user_by_id(&req.customer_id)
            .await?
            .ok_or_else(|| OrderError::CustomerNotFound(req.customer_id.clone()))?;

        let now = time::now_millis();
        let by_id: std::collections::HashMap<&str, &crate::db::models::Product> =
            products.iter().map(|p| (p.id.as_str(), p)).collect();
        // Presence was checked above; filter_map keeps request order.
        let items: Vec<OrderItem> = req
            .items
            .iter()
            .filter_map(|input| {
                by_id.get(input.product.as_str()).map(|product| OrderItem {
                    product: input.product.clone(),
                    product_name: product.name.clone(),
                    quantity: input.quantity,
                })
            })
            .collect();

        let order = Order {
            id: None,
            order_number: String::new(),
            customer: customer.id.clone(),
            customer_name: customer.name.clone(),
            customer_phone: customer.phone.clone(),
            items,
            total_items: total_units,
            status: OrderStatus::New,
            message: req.message.clone(),
            can_edit: true,
            edit_deadline: now + self.edit_window.num_milliseconds(),
            history: vec![HistoryEntry {
                action: HistoryAction::Created,
                by: customer.id.clone(),
                by_name: customer.name.clone(),
                timestamp: now,
                changes: None,
            }],
            created_at: now,
            updated_at: now,
        };

        let created = self.insert_with_number(order, now).await?;

        let order_id = created.id.clone().unwrap_or_default();
        tracing::info!(
            order = %created.order_number,
            customer = %created.customer,
            items = created.total_items,
            "order created"
        );
        self.notifier
            .notify(&created.customer, NotificationKind::OrderCreated, &order_id)
            .await;

        Ok(created)
    }

    /// Allocate-and-insert with bounded retry on duplicate numbers.
    ///
    /// Serialized in-process so concurrent creations observe distinct
    /// day counts; across processes the store-level uniqueness
    /// constraint turns the loser into a retryable duplicate.
    async fn insert_with_number(&self, mut order: Order, now: i64) -> Result<Order, OrderError> {
        let _guard = self.create_gate.lock().await;
        for attempt in 1..=MAX_ALLOCATE_RETRIES {
            order.order_number = self.allocator.allocate(now, attempt as u64).await?;
            match self.store.insert_order(order.clone()).await {
                Ok(created) => return Ok(created),
                Err(StoreError::Duplicate(reason)) if attempt < MAX_ALLOCATE_RETRIES => {
                    tracing::warn!(
                        attempt,
                        number = %order.order_number,
                        error = %reason,
                        "order number collision, reallocating"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(OrderError::Unavailable(
            "order number allocation kept colliding".to_string(),
        ))
    }

    /// Edit quantities and/or the message while the edit window is open.
    ///
    /// The deadline is re-derived from the stored order; the persisted
    /// `can_edit` flag is never trusted here. The deadline itself is not
    /// reset by an edit.
    pub async fn edit_order(
        &self,
        order_id: &str,
        req: EditOrderRequest,
        actor: &Actor,
    ) -> Result<Order, OrderError> {
        req.validate()
            .map_err(|e| OrderError::Validation(e.to_string()))?;
        if req.items.is_none() && req.message.is_none() {
            return Err(OrderError::Validation("empty edit".to_string()));
        }

        let mut order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))?;

        let now = time::now_millis();
        if !order.editable_at(now) {
            return Err(OrderError::EditWindowClosed(order.order_number.clone()));
        }

        let mut notes: Vec<String> = Vec::new();

        if let Some(patches) = &req.items {
            for patch in patches {
                let Some(line) = order.items.iter_mut().find(|i| i.product == patch.product)
                else {
                    return Err(OrderError::Validation(format!(
                        "product {} is not on this order",
                        patch.product
                    )));
                };
                if line.quantity != patch.quantity {
                    notes.push(format!(
                        "{}: {} -> {}",
                        line.product_name.label(),
                        line.quantity,
                        patch.quantity
                    ));
                    line.quantity = patch.quantity;
                }
            }

            let total = order.computed_total();
            if total < MIN_ORDER_UNITS {
                return Err(OrderError::InsufficientItems {
                    min: MIN_ORDER_UNITS,
                });
            }
            order.total_items = total;
        }

        if let Some(message) = &req.message {
            if order.message.as_deref() != Some(message.as_str()) {
                notes.push("message updated".to_string());
                order.message = Some(message.clone());
            }
        }

        // Identical-value patches are a no-op: nothing to persist and
        // nothing to record in the trail.
        if notes.is_empty() {
            return Ok(order);
        }

        order.can_edit = order.editable_at(now);
        order.history.push(HistoryEntry {
            action: HistoryAction::Updated,
            by: actor.id.clone(),
            by_name: actor.name.clone(),
            timestamp: now,
            changes: Some(notes.join("; ")),
        });

        let updated = self.store.update_order(order_id, order).await?;

        tracing::info!(order = %updated.order_number, by = %actor.id, "order edited");
        self.notifier
            .notify(&updated.customer, NotificationKind::OrderUpdated, order_id)
            .await;

        Ok(updated)
    }

    /// Administrator acknowledges physical receipt of the order.
    ///
    /// Ignores the edit window; repeated calls are a no-op.
    pub async fn mark_received(&self, order_id: &str, admin: &Actor) -> Result<Order, OrderError> {
        let mut order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))?;

        if order.status == OrderStatus::Received {
            return Ok(order);
        }

        let now = time::now_millis();
        order.status = OrderStatus::Received;
        order.can_edit = order.editable_at(now);
        order.history.push(HistoryEntry {
            action: HistoryAction::Received,
            by: admin.id.clone(),
            by_name: admin.name.clone(),
            timestamp: now,
            changes: None,
        });

        let updated = self.store.update_order(order_id, order).await?;

        tracing::info!(order = %updated.order_number, admin = %admin.id, "order received");
        self.notifier
            .notify(&updated.customer, NotificationKind::OrderReceived, order_id)
            .await;

        Ok(updated)
    }

    /// List orders; `can_edit` is re-derived on the way out since the
    /// persisted flag can go stale between writes.
    pub async fn list_orders(&self, filter: &OrderFilter) -> Result<OrderSlice, OrderError> {
        let mut slice = self.store.find_orders(filter).await?;
        let now = time::now_millis();
        for order in &mut slice.orders {
            order.can_edit = order.editable_at(now);
        }
        Ok(slice)
    }

    /// Fetch one order by id
    pub async fn get_order(&self, order_id: &str) -> Result<Order, OrderError> {
        let mut order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))?;
        order.can_edit = order.editable_at(time::now_millis());
        Ok(order)
    }

    /// Business timezone this manager allocates and buckets in
    pub fn timezone(&self) -> Tz {
        self.tz
    }
}

impl std::fmt::Debug for OrderManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderManager")
            .field("edit_window", &self.edit_window)
            .field("tz", &self.tz)
            .finish()
    }
}

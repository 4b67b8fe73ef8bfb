//! Order Model
//!
//! The central persisted entity. Orders denormalize customer and product
//! display data at creation time so history stays readable after catalog
//! edits, and carry an append-only audit trail of every state change.
//!
//! All timestamps (`created_at`, `updated_at`, `edit_deadline`, history
//! entries) are Unix millis; date→millis conversion happens at the API
//! layer.

use serde::{Deserialize, Serialize};

use super::product::LocalizedText;

// =============================================================================
// Status & History
// =============================================================================

/// Order status enum
///
/// `new` is the only state a customer can create; `received` is terminal
/// and set by an administrator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    New,
    Received,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "new",
            OrderStatus::Received => "received",
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(OrderStatus::New),
            "received" => Ok(OrderStatus::Received),
            other => Err(format!("unknown order status: {}", other)),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// History action vocabulary
///
/// `cancelled` is reserved vocabulary: no code path produces it today,
/// but stored documents using it must keep round-tripping.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HistoryAction {
    Created,
    Updated,
    Received,
    Cancelled,
}

/// One entry in an order's append-only audit trail
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub action: HistoryAction,
    /// Acting user id
    pub by: String,
    /// Acting user display name, snapshotted at write time
    pub by_name: String,
    /// Unix millis
    pub timestamp: i64,
    /// Human-readable note describing what changed (edits only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<String>,
}

// =============================================================================
// Order
// =============================================================================

/// One order line
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Referenced product id
    pub product: String,
    /// Bilingual product name snapshot taken at creation time
    pub product_name: LocalizedText,
    pub quantity: u32,
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Store-assigned opaque id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Human-facing unique number, assigned exactly once at creation
    pub order_number: String,
    /// Referencing customer id (immutable)
    pub customer: String,
    /// Customer name snapshot (immutable)
    pub customer_name: String,
    /// Customer phone snapshot (immutable)
    pub customer_phone: String,
    pub items: Vec<OrderItem>,
    /// Invariant: equals the sum of item quantities
    pub total_items: u32,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Persisted for fast reads; re-derived before any mutation
    pub can_edit: bool,
    /// Unix millis; edits are rejected once this has passed
    pub edit_deadline: i64,
    /// Append-only; first entry is always `created`
    pub history: Vec<HistoryEntry>,
    /// Unix millis, managed by the store
    pub created_at: i64,
    /// Unix millis, managed by the store
    pub updated_at: i64,
}

impl Order {
    /// Sum of item quantities, recomputed from the lines
    pub fn computed_total(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Whether the edit window is still open at `now_ms`
    ///
    /// This is the authoritative check; the persisted `can_edit` flag is
    /// a fast-read convenience only.
    pub fn editable_at(&self, now_ms: i64) -> bool {
        now_ms < self.edit_deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_document_round_trips_with_wire_field_names() {
        let order = Order {
            id: Some("a1".into()),
            order_number: "ST260806-0001".into(),
            customer: "u1".into(),
            customer_name: "Al Noor Trading".into(),
            customer_phone: "+9715550001".into(),
            items: vec![OrderItem {
                product: "p1".into(),
                product_name: LocalizedText::new("Olive Oil 5L", "زيت زيتون ٥ لتر"),
                quantity: 3,
            }],
            total_items: 3,
            status: OrderStatus::New,
            message: None,
            can_edit: true,
            edit_deadline: 1_000,
            history: vec![HistoryEntry {
                action: HistoryAction::Created,
                by: "u1".into(),
                by_name: "Al Noor Trading".into(),
                timestamp: 1,
                changes: None,
            }],
            created_at: 1,
            updated_at: 1,
        };

        let value = serde_json::to_value(&order).unwrap();
        assert_eq!(value["orderNumber"], "ST260806-0001");
        assert_eq!(value["customerName"], "Al Noor Trading");
        assert_eq!(value["items"][0]["productName"]["en"], "Olive Oil 5L");
        assert_eq!(value["totalItems"], 3);
        assert_eq!(value["status"], "new");
        assert_eq!(value["history"][0]["action"], "created");
        assert_eq!(value["canEdit"], true);

        let back: Order = serde_json::from_value(value).unwrap();
        assert_eq!(back.computed_total(), back.total_items);
    }

    #[test]
    fn editable_at_is_exclusive_of_the_deadline() {
        let order = Order {
            id: None,
            order_number: "ST260806-0002".into(),
            customer: "u1".into(),
            customer_name: "n".into(),
            customer_phone: "p".into(),
            items: vec![],
            total_items: 0,
            status: OrderStatus::New,
            message: None,
            can_edit: true,
            edit_deadline: 5_000,
            history: vec![],
            created_at: 0,
            updated_at: 0,
        };
        assert!(order.editable_at(4_999));
        assert!(!order.editable_at(5_000));
        assert!(!order.editable_at(5_001));
    }
}

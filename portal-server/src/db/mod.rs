//! Store Module
//!
//! Dual-backend persistence for the ordering core:
//!
//! - [`SurrealStore`] - the primary networked document engine
//! - [`FileStore`] - single-file JSON fallback with memory-only downgrade
//! - [`Datastore`] - the facade callers use; it routes every operation to
//!   the primary and transparently retries on the fallback when the
//!   primary is unreachable
//!
//! Callers never branch on which backend is active. `NotFound` and
//! `Duplicate` are answers, not outages, and propagate without failover.

pub mod file;
pub mod models;
pub mod surreal;

pub use file::{FileStore, StoreData};
pub use surreal::{SurrealConfig, SurrealStore};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;

use models::{Order, OrderStatus, Product, User};

/// Store error types
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Bad record: {0}")]
    Data(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Order query filter; all bounds optional, timestamps are Unix millis
/// with `[from, to)` semantics.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub customer: Option<String>,
    pub status: Option<OrderStatus>,
    pub created_from: Option<i64>,
    pub created_to: Option<i64>,
    pub limit: Option<usize>,
}

/// A page of decoded orders plus the number of stored documents that
/// could not be decoded and were skipped.
#[derive(Debug, Clone, Default)]
pub struct OrderSlice {
    pub orders: Vec<Order>,
    pub skipped: usize,
}

/// Uniform contract both backends implement.
///
/// Reads hand back owned copies; mutating a result never mutates store
/// state (the file backend guarantees this explicitly, the document
/// engine gets it for free).
#[async_trait]
pub trait StoreBackend: Send + Sync {
    async fn get_order(&self, id: &str) -> StoreResult<Option<Order>>;

    /// Insert a new order. The store assigns `id`, `created_at` and
    /// `updated_at`; a pre-existing `order_number` is rejected with
    /// [`StoreError::Duplicate`].
    async fn insert_order(&self, order: Order) -> StoreResult<Order>;

    /// Replace an existing order document. `id`, `created_at` and the
    /// stored identity fields win over whatever the caller passed.
    async fn update_order(&self, id: &str, order: Order) -> StoreResult<Order>;

    async fn find_orders(&self, filter: &OrderFilter) -> StoreResult<OrderSlice>;

    /// Count orders with `created_at` in `[start_ms, end_ms)`.
    async fn count_orders_between(&self, start_ms: i64, end_ms: i64) -> StoreResult<u64>;

    async fn products_by_ids(&self, ids: &[String]) -> StoreResult<Vec<Product>>;

    async fn users_by_ids(&self, ids: &[String]) -> StoreResult<Vec<User>>;

    async fn user_by_id(&self, id: &str) -> StoreResult<Option<User>>;
}

/// Decode a collection leniently: skip records that fail to decode,
/// warn once per record, and report how many were dropped.
pub(crate) fn decode_lenient<T: DeserializeOwned>(
    values: Vec<serde_json::Value>,
    what: &str,
) -> (Vec<T>, usize) {
    let mut out = Vec::with_capacity(values.len());
    let mut skipped = 0usize;
    for value in values {
        match serde_json::from_value::<T>(value) {
            Ok(record) => out.push(record),
            Err(e) => {
                skipped += 1;
                tracing::warn!(collection = what, error = %e, "skipping malformed record");
            }
        }
    }
    (out, skipped)
}

// =============================================================================
// Datastore facade
// =============================================================================

/// Try the primary backend, fall back on unavailability.
macro_rules! failover {
    ($self:ident, $call:ident ( $($arg:expr),* )) => {{
        if let Some(primary) = &$self.primary {
            match primary.$call($($arg),*).await {
                Err(StoreError::Unavailable(reason)) => {
                    tracing::warn!(
                        op = stringify!($call),
                        error = %reason,
                        "primary store unavailable, retrying on fallback"
                    );
                }
                other => return other,
            }
        }
        $self.fallback.$call($($arg),*).await
    }};
}

/// The store handle shared across the application.
///
/// Holds an optional primary plus the always-present fallback. A
/// deployment without a configured document engine simply runs
/// fallback-only; nothing upstream can tell the difference.
pub struct Datastore {
    primary: Option<SurrealStore>,
    fallback: FileStore,
}

impl Datastore {
    pub fn new(primary: Option<SurrealStore>, fallback: FileStore) -> Self {
        Self { primary, fallback }
    }

    pub fn fallback_only(fallback: FileStore) -> Self {
        Self {
            primary: None,
            fallback,
        }
    }

    /// Label for health reporting: which backend this process would try
    /// first, and whether the fallback still persists to disk.
    pub fn backend_label(&self) -> &'static str {
        if self.primary.is_some() {
            "document"
        } else if self.fallback.is_persistent() {
            "file"
        } else {
            "memory"
        }
    }

    pub async fn get_order(&self, id: &str) -> StoreResult<Option<Order>> {
        failover!(self, get_order(id))
    }

    pub async fn insert_order(&self, order: Order) -> StoreResult<Order> {
        failover!(self, insert_order(order.clone()))
    }

    pub async fn update_order(&self, id: &str, order: Order) -> StoreResult<Order> {
        failover!(self, update_order(id, order.clone()))
    }

    pub async fn find_orders(&self, filter: &OrderFilter) -> StoreResult<OrderSlice> {
        failover!(self, find_orders(filter))
    }

    pub async fn count_orders_between(&self, start_ms: i64, end_ms: i64) -> StoreResult<u64> {
        failover!(self, count_orders_between(start_ms, end_ms))
    }

    pub async fn products_by_ids(&self, ids: &[String]) -> StoreResult<Vec<Product>> {
        failover!(self, products_by_ids(ids))
    }

    pub async fn users_by_ids(&self, ids: &[String]) -> StoreResult<Vec<User>> {
        failover!(self, users_by_ids(ids))
    }

    pub async fn user_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        failover!(self, user_by_id(id))
    }
}

impl std::fmt::Debug for Datastore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Datastore")
            .field("backend", &self.backend_label())
            .finish()
    }
}

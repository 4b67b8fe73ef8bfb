//! File Store (fallback backend)
//!
//! A single JSON document on local disk holding every collection. Each
//! mutation re-serializes the whole document under one lock, so writes
//! are atomic with respect to other callers. If the filesystem turns out
//! to be unwritable (restricted hosting), the store downgrades to a pure
//! in-memory copy of the same data: persistence is best-effort, serving
//! requests is not.
//!
//! Reads always return owned copies, never references into the arena, so
//! callers cannot mutate store state through their results.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::models::{Order, Product, User};
use super::{decode_lenient, OrderFilter, OrderSlice, StoreBackend, StoreError, StoreResult};

/// All collections in one injectable arena.
///
/// Tests instantiate independent arenas freely; there is no process-wide
/// store state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreData {
    #[serde(default)]
    pub orders: Vec<Order>,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub users: Vec<User>,
}

struct FileState {
    data: StoreData,
    /// Cleared on the first failed save; the store then serves from
    /// memory only.
    persist: bool,
    /// Order documents dropped while loading the file.
    load_skipped: usize,
}

/// JSON-file store with in-memory downgrade.
pub struct FileStore {
    path: Option<PathBuf>,
    state: Mutex<FileState>,
}

impl FileStore {
    /// Open the store at `path`, seeding with `seed` when no usable file
    /// exists yet. Never fails: any filesystem problem downgrades to
    /// memory-only.
    pub fn open(path: impl AsRef<Path>, seed: StoreData) -> Self {
        let path = path.as_ref().to_path_buf();

        let mut persist = true;
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "store directory not writable, running memory-only"
                );
                persist = false;
            }
        }

        let (data, load_skipped) = if persist && path.exists() {
            Self::load(&path, &seed)
        } else {
            (seed, 0)
        };

        let store = Self {
            path: Some(path),
            state: Mutex::new(FileState {
                data,
                persist,
                load_skipped,
            }),
        };

        // Establish writability up front so a restricted host downgrades
        // once at startup instead of on the first order.
        if persist {
            let mut state = store.state.lock();
            store.save_locked(&mut state);
        }
        store
    }

    /// Pure in-memory store (used by tests and as the downgrade target).
    pub fn in_memory(seed: StoreData) -> Self {
        Self {
            path: None,
            state: Mutex::new(FileState {
                data: seed,
                persist: false,
                load_skipped: 0,
            }),
        }
    }

    /// Whether mutations still reach the disk.
    pub fn is_persistent(&self) -> bool {
        self.state.lock().persist
    }

    fn load(path: &Path, seed: &StoreData) -> (StoreData, usize) {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "store file unreadable, starting from seed");
                return (seed.clone(), 0);
            }
        };
        let value: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "store file corrupt, starting from seed");
                return (seed.clone(), 0);
            }
        };

        // Decode per record so one bad document does not take the whole
        // store down with it.
        let collection = |name: &str| -> Vec<serde_json::Value> {
            value
                .get(name)
                .and_then(|v| v.as_array())
                .cloned()
                .unwrap_or_default()
        };
        let (orders, skipped) = decode_lenient::<Order>(collection("orders"), "orders");
        let (products, _) = decode_lenient::<Product>(collection("products"), "products");
        let (users, _) = decode_lenient::<User>(collection("users"), "users");

        let mut data = StoreData {
            orders,
            products,
            users,
        };
        // Keep the bootstrap catalog available even on a pre-existing
        // file that only ever held orders.
        if data.products.is_empty() {
            data.products = seed.products.clone();
        }
        if data.users.is_empty() {
            data.users = seed.users.clone();
        }
        (data, skipped)
    }

    /// Whole-document write-back; on failure, warn once and downgrade.
    fn save_locked(&self, state: &mut FileState) {
        if !state.persist {
            return;
        }
        let Some(path) = &self.path else {
            state.persist = false;
            return;
        };
        let payload = match serde_json::to_vec_pretty(&state.data) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, "store serialization failed, running memory-only");
                state.persist = false;
                return;
            }
        };
        if let Err(e) = std::fs::write(path, payload) {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "store file not writable, running memory-only"
            );
            state.persist = false;
        }
    }

    fn now_ms() -> i64 {
        Utc::now().timestamp_millis()
    }
}

#[async_trait]
impl StoreBackend for FileStore {
    async fn get_order(&self, id: &str) -> StoreResult<Option<Order>> {
        let state = self.state.lock();
        Ok(state
            .data
            .orders
            .iter()
            .find(|o| o.id.as_deref() == Some(id))
            .cloned())
    }

    async fn insert_order(&self, mut order: Order) -> StoreResult<Order> {
        let mut state = self.state.lock();
        if state
            .data
            .orders
            .iter()
            .any(|o| o.order_number == order.order_number)
        {
            return Err(StoreError::Duplicate(format!(
                "order number {} already exists",
                order.order_number
            )));
        }

        let now = Self::now_ms();
        order.id = Some(Uuid::new_v4().simple().to_string());
        order.created_at = now;
        order.updated_at = now;

        state.data.orders.push(order.clone());
        self.save_locked(&mut state);
        Ok(order)
    }

    async fn update_order(&self, id: &str, mut order: Order) -> StoreResult<Order> {
        let mut state = self.state.lock();
        let Some(index) = state
            .data
            .orders
            .iter()
            .position(|o| o.id.as_deref() == Some(id))
        else {
            return Err(StoreError::NotFound(format!("order {} not found", id)));
        };

        let existing = &state.data.orders[index];
        order.id = existing.id.clone();
        order.created_at = existing.created_at;
        order.updated_at = Self::now_ms();

        state.data.orders[index] = order.clone();
        self.save_locked(&mut state);
        Ok(order)
    }

    async fn find_orders(&self, filter: &OrderFilter) -> StoreResult<OrderSlice> {
        let state = self.state.lock();
        let mut orders: Vec<Order> = state
            .data
            .orders
            .iter()
            .filter(|o| {
                filter
                    .customer
                    .as_ref()
                    .is_none_or(|c| &o.customer == c)
                    && filter.status.is_none_or(|s| o.status == s)
                    && filter.created_from.is_none_or(|f| o.created_at >= f)
                    && filter.created_to.is_none_or(|t| o.created_at < t)
            })
            .cloned()
            .collect();

        orders.sort_by_key(|o| std::cmp::Reverse(o.created_at));
        if let Some(limit) = filter.limit {
            orders.truncate(limit);
        }
        Ok(OrderSlice {
            orders,
            skipped: state.load_skipped,
        })
    }

    async fn count_orders_between(&self, start_ms: i64, end_ms: i64) -> StoreResult<u64> {
        let state = self.state.lock();
        Ok(state
            .data
            .orders
            .iter()
            .filter(|o| o.created_at >= start_ms && o.created_at < end_ms)
            .count() as u64)
    }

    async fn products_by_ids(&self, ids: &[String]) -> StoreResult<Vec<Product>> {
        let state = self.state.lock();
        Ok(state
            .data
            .products
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn users_by_ids(&self, ids: &[String]) -> StoreResult<Vec<User>> {
        let state = self.state.lock();
        Ok(state
            .data
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn user_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        let state = self.state.lock();
        Ok(state.data.users.iter().find(|u| u.id == id).cloned())
    }
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("path", &self.path)
            .field("persistent", &self.is_persistent())
            .finish()
    }
}

//! Server state - shared service handles
//!
//! `ServerState` holds shared references to the store and the two
//! engines. `Arc` makes the clone handed to every request cheap.

use std::sync::Arc;

use crate::core::Config;
use crate::db::{Datastore, FileStore, StoreData, SurrealStore};
use crate::orders::OrderManager;
use crate::reports::ReportEngine;
use crate::services::{LogNotifier, Notifier};

/// Shared application state
#[derive(Clone, Debug)]
pub struct ServerState {
    /// Server configuration
    pub config: Config,
    /// Dual-backend store handle
    pub store: Arc<Datastore>,
    /// Order lifecycle manager
    pub orders: Arc<OrderManager>,
    /// Aggregation engine
    pub reports: Arc<ReportEngine>,
}

impl ServerState {
    /// Initialize the state from configuration.
    ///
    /// Wires the fallback store (seeded from `BOOTSTRAP_FILE` when set),
    /// the primary engine when an endpoint is configured, and the two
    /// engines on top. Never fails: a broken filesystem or an absent
    /// primary degrade, they do not abort startup.
    pub async fn initialize(config: &Config) -> Self {
        let seed = load_bootstrap(config.bootstrap_file.as_deref());
        let fallback = FileStore::open(config.store_path(), seed);

        let primary = config.surreal_config().map(SurrealStore::new);
        if primary.is_none() {
            tracing::info!("no document engine configured, running on the fallback store");
        }

        let store = Arc::new(Datastore::new(primary, fallback));
        Self::with_store(config.clone(), store, Arc::new(LogNotifier))
    }

    /// Assemble state over an existing store (used by tests and by
    /// deployments that wire a real notification transport).
    pub fn with_store(
        config: Config,
        store: Arc<Datastore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let orders = Arc::new(OrderManager::new(
            store.clone(),
            notifier,
            config.edit_window_hours,
            config.timezone,
        ));
        let reports = Arc::new(ReportEngine::new(store.clone(), config.timezone));
        Self {
            config,
            store,
            orders,
            reports,
        }
    }
}

/// Load the fallback seed document; any problem means an empty seed.
fn load_bootstrap(path: Option<&str>) -> StoreData {
    let Some(path) = path else {
        return StoreData::default();
    };
    match std::fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(seed) => {
                tracing::info!(path, "loaded bootstrap seed");
                seed
            }
            Err(e) => {
                tracing::warn!(path, error = %e, "bootstrap seed unparsable, starting empty");
                StoreData::default()
            }
        },
        Err(e) => {
            tracing::warn!(path, error = %e, "bootstrap seed unreadable, starting empty");
            StoreData::default()
        }
    }
}

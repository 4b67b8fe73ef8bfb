//! Portal Server - bilingual B2B ordering backend
//!
//! # Architecture overview
//!
//! The core of the service is order persistence and reporting:
//!
//! - **Store** (`db`): dual-backend persistence - a networked document
//!   engine with a single-file JSON fallback that keeps ordering alive
//!   when the engine is unreachable
//! - **Orders** (`orders`): day-scoped order numbers, the time-boxed
//!   edit window, and the append-only audit trail
//! - **Reports** (`reports`): daily trends, leaderboards, and the
//!   customer×product pivot matrix, computed from one order slice
//! - **HTTP API** (`api`): thin axum layer over the two engines
//!
//! # Module structure
//!
//! ```text
//! portal-server/src/
//! ├── core/          # Config, state, server shell
//! ├── api/           # HTTP routes and handlers
//! ├── db/            # Store adapter and backends
//! ├── orders/        # Order lifecycle
//! ├── reports/       # Aggregation engine
//! ├── services/      # Notification collaborator seam
//! └── utils/         # Errors, logging, time helpers
//! ```

pub mod api;
pub mod core;
pub mod db;
pub mod orders;
pub mod reports;
pub mod services;
pub mod utils;

// Re-export public types
pub use crate::core::{Config, Server, ServerState};
pub use db::{Datastore, FileStore, StoreData, SurrealStore};
pub use orders::{OrderError, OrderManager};
pub use reports::ReportEngine;
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// Load `.env` and initialize logging; call once at startup
pub fn setup_environment() {
    dotenv::dotenv().ok();
    init_logger();
}

/// Startup banner (log stream)
pub fn print_banner() {
    tracing::info!("==============================================");
    tracing::info!("  PORTAL SERVER - B2B ordering backend");
    tracing::info!("  version {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("==============================================");
}

//! Order Lifecycle Module
//!
//! The write side of the portal core:
//!
//! - **number**: day-scoped, human-readable order number allocation
//! - **manager**: creation/edit/receive transitions with edit-window
//!   enforcement and the append-only audit trail
//!
//! # Create Flow
//!
//! ```text
//! create_order(request)
//!     ├─ 1. Payload validation (no store access)
//!     ├─ 2. Catalog checks (products exist + available, customer exists)
//!     ├─ 3. Snapshot customer + product display data
//!     ├─ 4. Allocate order number (retry on duplicate)
//!     ├─ 5. Insert via the store adapter
//!     └─ 6. Emit notification (fire-and-forget)
//! ```

pub mod error;
pub mod manager;
pub mod number;

pub use error::OrderError;
pub use manager::{
    Actor, CreateOrderRequest, EditOrderRequest, OrderItemInput, OrderManager, MIN_ORDER_UNITS,
};
pub use number::OrderNumberAllocator;

#[cfg(test)]
mod tests;

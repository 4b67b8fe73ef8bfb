//! Store Models
//!
//! Document shapes shared by both store backends. Field names are part of
//! the persisted contract: the JSON fallback file and the document engine
//! must agree on them so either backend is a drop-in substitute for the
//! other.

pub mod order;
pub mod product;
pub mod user;

pub use order::{HistoryAction, HistoryEntry, Order, OrderItem, OrderStatus};
pub use product::{LocalizedText, Product};
pub use user::User;

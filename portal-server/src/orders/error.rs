//! Order lifecycle error taxonomy
//!
//! Callers of the lifecycle manager see exactly these variants; backend
//! error types never leak past this seam.

use thiserror::Error;

use crate::db::StoreError;
use crate::utils::AppError;

/// Lifecycle error types
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Order must contain at least {min} item units")]
    InsufficientItems { min: u32 },

    #[error("Products not found: {}", .0.join(", "))]
    ProductsNotFound(Vec<String>),

    #[error("Products unavailable: {}", .0.join(", "))]
    ProductsUnavailable(Vec<String>),

    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Edit window closed for order {0}")]
    EditWindowClosed(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for OrderError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => OrderError::OrderNotFound(msg),
            // Duplicates are handled where they are retryable; one that
            // escapes here means retries ran out.
            StoreError::Duplicate(msg) => OrderError::Unavailable(msg),
            StoreError::Unavailable(msg) => OrderError::Unavailable(msg),
            StoreError::Data(msg) => OrderError::Unavailable(msg),
        }
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        let msg = err.to_string();
        match err {
            OrderError::InsufficientItems { .. }
            | OrderError::ProductsUnavailable(_)
            | OrderError::EditWindowClosed(_) => AppError::BusinessRule(msg),
            OrderError::ProductsNotFound(_)
            | OrderError::CustomerNotFound(_)
            | OrderError::OrderNotFound(_) => AppError::NotFound(msg),
            OrderError::Validation(_) => AppError::Validation(msg),
            OrderError::Unavailable(_) => AppError::Unavailable(msg),
        }
    }
}

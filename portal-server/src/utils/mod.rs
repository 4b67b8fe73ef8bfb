//! Utility Module
//!
//! - [`AppError`] / [`AppResult`] - application error surface
//! - [`logger`] - tracing subscriber bootstrap
//! - [`time`] - business-timezone date helpers

pub mod error;
pub mod logger;
pub mod time;

pub use error::{AppError, AppResult};

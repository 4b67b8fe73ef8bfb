//! Reporting Module
//!
//! Read-side aggregation over the order history: daily trends, top-N
//! leaderboards, a status histogram and the customer×product pivot
//! matrix, all computed from one order slice fetched through the store
//! adapter.

pub mod engine;

pub use engine::{
    display_name, DailyTrendPoint, Matrix, MatrixColumn, MatrixRow, OrderReport, ReportEngine,
    Summary, TopCustomer, TopProduct, TOP_LIMIT,
};

#[cfg(test)]
mod tests;

//! Report Engine
//!
//! Consumes a date-bounded slice of orders and derives every report view
//! from that single in-memory slice - no per-view re-querying. Orders
//! outside the range still feed the overall/new-customer counters, so
//! the engine fetches the full set once and partitions in memory.
//!
//! Malformed order documents never abort a report; the store adapter
//! skips them per record and the count surfaces in the summary.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;

use crate::db::models::{LocalizedText, Order, User};
use crate::db::{Datastore, OrderFilter};
use crate::utils::time;
use crate::utils::{AppError, AppResult};

/// Leaderboards are truncated to this many entries
pub const TOP_LIMIT: usize = 10;

// ============================================================================
// Report Types
// ============================================================================

/// One calendar-day bucket; only days with at least one order appear
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTrendPoint {
    pub date: NaiveDate,
    pub order_count: u64,
    pub total_item_units: u64,
}

/// Per-product leaderboard entry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub product: String,
    pub name: LocalizedText,
    pub quantity_sum: u64,
    pub order_count: u64,
}

/// Per-customer leaderboard entry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopCustomer {
    pub customer: String,
    pub display_name: String,
    pub order_count: u64,
    pub item_sum: u64,
}

/// One matrix column (a product seen in the slice)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixColumn {
    pub product: String,
    pub name: LocalizedText,
}

/// One matrix row: a customer's summed quantity per column, aligned
/// with [`Matrix::columns`]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixRow {
    pub customer: String,
    pub display_name: String,
    pub quantities: Vec<u64>,
}

/// Customer×product pivot matrix.
///
/// Row/column totals are derived, never stored; they always equal the
/// sum of their cells.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Matrix {
    pub columns: Vec<MatrixColumn>,
    pub rows: Vec<MatrixRow>,
}

impl Matrix {
    pub fn row_totals(&self) -> Vec<u64> {
        self.rows
            .iter()
            .map(|row| row.quantities.iter().sum())
            .collect()
    }

    pub fn column_totals(&self) -> Vec<u64> {
        let mut totals = vec![0u64; self.columns.len()];
        for row in &self.rows {
            for (total, quantity) in totals.iter_mut().zip(&row.quantities) {
                *total += quantity;
            }
        }
        totals
    }

    pub fn grand_total(&self) -> u64 {
        self.rows
            .iter()
            .map(|row| row.quantities.iter().sum::<u64>())
            .sum()
    }
}

/// Headline figures for the range
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_orders: u64,
    pub total_items: u64,
    /// Distinct customers across ALL orders, not just the range
    pub total_customers: u64,
    /// Customers whose first order falls inside the range
    pub new_customers: u64,
    /// 0 when the range holds no orders
    pub average_items_per_order: f64,
    /// Stored documents that could not be decoded and were skipped
    pub skipped_records: u64,
}

/// Full report payload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReport {
    pub daily_trend: Vec<DailyTrendPoint>,
    pub top_products: Vec<TopProduct>,
    pub top_customers: Vec<TopCustomer>,
    pub status_distribution: BTreeMap<String, u64>,
    pub matrix: Matrix,
    pub summary: Summary,
}

// ============================================================================
// Display name resolution
// ============================================================================

/// Resolve the customer label shown in reports.
///
/// Priority: company name → personal name → order snapshot → "unknown".
pub fn display_name(user: Option<&User>, snapshot: Option<&str>) -> String {
    if let Some(user) = user {
        if let Some(company) = user.company.as_deref()
            && !company.is_empty()
        {
            return company.to_string();
        }
        if !user.name.is_empty() {
            return user.name.clone();
        }
    }
    match snapshot {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => "unknown".to_string(),
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Aggregation engine over the store adapter's read path
pub struct ReportEngine {
    store: Arc<Datastore>,
    tz: Tz,
}

impl ReportEngine {
    pub fn new(store: Arc<Datastore>, tz: Tz) -> Self {
        Self { store, tz }
    }

    /// Build every report view for `[start_ms, end_ms)`.
    ///
    /// Callers normalize the bounds to midnight in the business
    /// timezone; the engine treats them as opaque millis.
    pub async fn build_report(&self, start_ms: i64, end_ms: i64) -> AppResult<OrderReport> {
        let slice = self
            .store
            .find_orders(&OrderFilter::default())
            .await
            .map_err(|e| AppError::unavailable(e.to_string()))?;

        let all = slice.orders;
        let in_range: Vec<&Order> = all
            .iter()
            .filter(|o| o.created_at >= start_ms && o.created_at < end_ms)
            .collect();

        tracing::debug!(
            start = start_ms,
            end = end_ms,
            orders = in_range.len(),
            skipped = slice.skipped,
            "building report"
        );

        let names = self.resolve_names(&in_range).await;

        let summary = Self::summarize(&all, &in_range, start_ms, end_ms, slice.skipped);

        Ok(OrderReport {
            daily_trend: self.daily_trend(&in_range),
            top_products: Self::top_products(&in_range),
            top_customers: Self::top_customers(&in_range, &names),
            status_distribution: Self::status_distribution(&in_range),
            matrix: Self::matrix(&in_range, &names),
            summary,
        })
    }

    /// Map every customer in the slice to a display label.
    ///
    /// The lookup is best-effort: if the user collection cannot be read
    /// the snapshot names on the orders still carry the report.
    async fn resolve_names(&self, orders: &[&Order]) -> HashMap<String, String> {
        let mut snapshots: HashMap<&str, &str> = HashMap::new();
        for order in orders {
            snapshots
                .entry(order.customer.as_str())
                .or_insert(order.customer_name.as_str());
        }

        let ids: Vec<String> = snapshots.keys().map(|id| id.to_string()).collect();
        let users: HashMap<String, User> = match self.store.users_by_ids(&ids).await {
            Ok(users) => users.into_iter().map(|u| (u.id.clone(), u)).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "user lookup failed, using order snapshots");
                HashMap::new()
            }
        };

        snapshots
            .into_iter()
            .map(|(id, snapshot)| {
                let label = display_name(users.get(id), Some(snapshot));
                (id.to_string(), label)
            })
            .collect()
    }

    fn daily_trend(&self, orders: &[&Order]) -> Vec<DailyTrendPoint> {
        let mut buckets: BTreeMap<NaiveDate, (u64, u64)> = BTreeMap::new();
        for order in orders {
            let date = time::millis_to_date(order.created_at, self.tz);
            let bucket = buckets.entry(date).or_insert((0, 0));
            bucket.0 += 1;
            bucket.1 += u64::from(order.total_items);
        }
        buckets
            .into_iter()
            .map(|(date, (order_count, total_item_units))| DailyTrendPoint {
                date,
                order_count,
                total_item_units,
            })
            .collect()
    }

    fn top_products(orders: &[&Order]) -> Vec<TopProduct> {
        let mut stats: HashMap<&str, (LocalizedText, u64, u64)> = HashMap::new();
        for order in orders {
            for item in &order.items {
                let entry = stats
                    .entry(item.product.as_str())
                    .or_insert_with(|| (item.product_name.clone(), 0, 0));
                entry.1 += u64::from(item.quantity);
                entry.2 += 1;
            }
        }

        let mut products: Vec<TopProduct> = stats
            .into_iter()
            .map(|(product, (name, quantity_sum, order_count))| TopProduct {
                product: product.to_string(),
                name,
                quantity_sum,
                order_count,
            })
            .collect();
        products.sort_by(|a, b| {
            b.quantity_sum
                .cmp(&a.quantity_sum)
                .then_with(|| a.product.cmp(&b.product))
        });
        products.truncate(TOP_LIMIT);
        products
    }

    fn top_customers(orders: &[&Order], names: &HashMap<String, String>) -> Vec<TopCustomer> {
        let mut stats: HashMap<&str, (u64, u64)> = HashMap::new();
        for order in orders {
            let entry = stats.entry(order.customer.as_str()).or_insert((0, 0));
            entry.0 += 1;
            entry.1 += u64::from(order.total_items);
        }

        let mut customers: Vec<TopCustomer> = stats
            .into_iter()
            .map(|(customer, (order_count, item_sum))| TopCustomer {
                customer: customer.to_string(),
                display_name: names
                    .get(customer)
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                order_count,
                item_sum,
            })
            .collect();
        customers.sort_by(|a, b| {
            b.order_count
                .cmp(&a.order_count)
                .then_with(|| a.customer.cmp(&b.customer))
        });
        customers.truncate(TOP_LIMIT);
        customers
    }

    fn status_distribution(orders: &[&Order]) -> BTreeMap<String, u64> {
        let mut distribution = BTreeMap::new();
        for order in orders {
            *distribution
                .entry(order.status.as_str().to_string())
                .or_insert(0) += 1;
        }
        distribution
    }

    fn matrix(orders: &[&Order], names: &HashMap<String, String>) -> Matrix {
        let mut cells: HashMap<(&str, &str), u64> = HashMap::new();
        let mut column_names: HashMap<&str, &LocalizedText> = HashMap::new();
        let mut customers: HashSet<&str> = HashSet::new();

        for order in orders {
            customers.insert(order.customer.as_str());
            for item in &order.items {
                column_names
                    .entry(item.product.as_str())
                    .or_insert(&item.product_name);
                *cells
                    .entry((order.customer.as_str(), item.product.as_str()))
                    .or_insert(0) += u64::from(item.quantity);
            }
        }

        // Deterministic export order: ids ascending on both axes.
        let mut product_ids: Vec<&str> = column_names.keys().copied().collect();
        product_ids.sort_unstable();
        let mut customer_ids: Vec<&str> = customers.into_iter().collect();
        customer_ids.sort_unstable();

        let columns: Vec<MatrixColumn> = product_ids
            .iter()
            .map(|id| MatrixColumn {
                product: id.to_string(),
                name: column_names
                    .get(*id)
                    .map(|name| (*name).clone())
                    .unwrap_or_default(),
            })
            .collect();

        let rows: Vec<MatrixRow> = customer_ids
            .into_iter()
            .map(|customer| MatrixRow {
                customer: customer.to_string(),
                display_name: names
                    .get(customer)
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                quantities: product_ids
                    .iter()
                    .map(|product| cells.get(&(customer, *product)).copied().unwrap_or(0))
                    .collect(),
            })
            .collect();

        Matrix { columns, rows }
    }

    fn summarize(
        all: &[Order],
        in_range: &[&Order],
        start_ms: i64,
        end_ms: i64,
        skipped: usize,
    ) -> Summary {
        // First order per customer across the full history.
        let mut first_order: HashMap<&str, i64> = HashMap::new();
        for order in all {
            first_order
                .entry(order.customer.as_str())
                .and_modify(|t| *t = (*t).min(order.created_at))
                .or_insert(order.created_at);
        }

        let total_orders = in_range.len() as u64;
        let total_items: u64 = in_range.iter().map(|o| u64::from(o.total_items)).sum();
        let new_customers = first_order
            .values()
            .filter(|t| **t >= start_ms && **t < end_ms)
            .count() as u64;

        let average_items_per_order = if total_orders == 0 {
            0.0
        } else {
            total_items as f64 / total_orders as f64
        };

        Summary {
            total_orders,
            total_items,
            total_customers: first_order.len() as u64,
            new_customers,
            average_items_per_order,
            skipped_records: skipped as u64,
        }
    }
}

impl std::fmt::Debug for ReportEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportEngine").field("tz", &self.tz).finish()
    }
}

//! Surreal Store (primary backend)
//!
//! Remote document engine reached over WebSocket. The connection is
//! lazily established and cached for the process lifetime; racing early
//! callers converge on one connection instead of dialing N of them, and
//! any connection-level failure clears the cache so the next call dials
//! fresh rather than replaying a dead handle forever.
//!
//! Every dial and every query runs under a bounded timeout so a downed
//! engine degrades to the fallback path within a predictable window.
//!
//! Orders are written with serde's camelCase field names - the same
//! document shape the JSON fallback file uses - and read back through
//! explicit projections (`record::id(id)` keeps ids as bare keys on both
//! backends).

use std::future::IntoFuture;
use std::time::Duration;

use async_trait::async_trait;
use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tokio::sync::RwLock;
use tokio::time::timeout;

use super::models::{Order, Product, User};
use super::{decode_lenient, OrderFilter, OrderSlice, StoreBackend, StoreError, StoreResult};

/// Projection used by every order read; keeps the wire shape identical
/// to the fallback file.
const ORDER_FIELDS: &str = "record::id(id) AS id, orderNumber, customer, customerName, \
     customerPhone, items, totalItems, status, message, canEdit, editDeadline, history, \
     createdAt, updatedAt";

const PRODUCT_FIELDS: &str = "record::id(id) AS id, name, isAvailable, sortOrder";

const USER_FIELDS: &str = "record::id(id) AS id, name, company, phone";

/// Connection settings for the primary engine
#[derive(Debug, Clone)]
pub struct SurrealConfig {
    /// `host:port` of the SurrealDB endpoint
    pub endpoint: String,
    pub namespace: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub connect_timeout: Duration,
    pub query_timeout: Duration,
}

/// Primary store over a shared lazy connection.
pub struct SurrealStore {
    config: SurrealConfig,
    conn: RwLock<Option<Surreal<Client>>>,
}

impl SurrealStore {
    pub fn new(config: SurrealConfig) -> Self {
        Self {
            config,
            conn: RwLock::new(None),
        }
    }

    /// Get the shared connection, dialing it on first use.
    ///
    /// Double-checked under the write lock: concurrent first callers all
    /// await the same dial instead of opening one connection each.
    async fn conn(&self) -> StoreResult<Surreal<Client>> {
        if let Some(db) = self.conn.read().await.as_ref() {
            return Ok(db.clone());
        }

        let mut guard = self.conn.write().await;
        if let Some(db) = guard.as_ref() {
            return Ok(db.clone());
        }

        let db = timeout(
            self.config.connect_timeout,
            Surreal::new::<Ws>(self.config.endpoint.as_str()).into_future(),
        )
        .await
        .map_err(|_| {
            StoreError::Unavailable(format!(
                "connect to {} timed out after {:?}",
                self.config.endpoint, self.config.connect_timeout
            ))
        })?
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        if let (Some(username), Some(password)) =
            (self.config.username.as_deref(), self.config.password.as_deref())
        {
            db.signin(Root { username, password })
                .await
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        }

        db.use_ns(self.config.namespace.as_str())
            .use_db(self.config.database.as_str())
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        // Schema bootstrap: order numbers are unique at the store level
        // so concurrent allocation collapses to retryable duplicates.
        db.query(
            "DEFINE TABLE IF NOT EXISTS order SCHEMALESS; \
             DEFINE INDEX IF NOT EXISTS uniq_order_number ON TABLE order FIELDS orderNumber UNIQUE;",
        )
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        tracing::info!(endpoint = %self.config.endpoint, "connected to document engine");
        *guard = Some(db.clone());
        Ok(db)
    }

    /// Drop the cached connection so the next call dials fresh.
    async fn reset(&self) {
        *self.conn.write().await = None;
    }

    /// Classify an engine error; anything that is not a duplicate-key
    /// rejection is treated as the backend being unavailable.
    fn classify(err: surrealdb::Error) -> StoreError {
        let msg = err.to_string();
        if msg.contains("already contains") {
            StoreError::Duplicate(msg)
        } else {
            StoreError::Unavailable(msg)
        }
    }

    /// Map an operation failure, resetting the cached connection when
    /// the backend looks gone.
    async fn fail(&self, err: StoreError) -> StoreError {
        if matches!(err, StoreError::Unavailable(_)) {
            self.reset().await;
        }
        err
    }

    async fn run_query(
        &self,
        sql: String,
        binds: Vec<(&'static str, serde_json::Value)>,
    ) -> StoreResult<surrealdb::Response> {
        let db = self.conn().await?;
        let mut query = db.query(sql);
        for (key, value) in binds {
            query = query.bind((key, value));
        }
        let response = match timeout(self.config.query_timeout, query.into_future()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(self.fail(Self::classify(e)).await),
            Err(_) => {
                return Err(self
                    .fail(StoreError::Unavailable(format!(
                        "query timed out after {:?}",
                        self.config.query_timeout
                    )))
                    .await);
            }
        };
        match response.check() {
            Ok(response) => Ok(response),
            Err(e) => Err(self.fail(Self::classify(e)).await),
        }
    }

    fn take_values(
        response: &mut surrealdb::Response,
        index: usize,
    ) -> StoreResult<Vec<serde_json::Value>> {
        response
            .take(index)
            .map_err(|e| StoreError::Data(e.to_string()))
    }

    fn now_ms() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

#[async_trait]
impl StoreBackend for SurrealStore {
    async fn get_order(&self, id: &str) -> StoreResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_FIELDS} FROM type::thing('order', $key)");
        let mut response = self
            .run_query(sql, vec![("key", serde_json::Value::from(id))])
            .await?;
        let values = Self::take_values(&mut response, 0)?;
        match values.into_iter().next() {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| StoreError::Data(e.to_string())),
            None => Ok(None),
        }
    }

    async fn insert_order(&self, mut order: Order) -> StoreResult<Order> {
        let key = uuid::Uuid::new_v4().simple().to_string();
        let now = Self::now_ms();
        order.id = None;
        order.created_at = now;
        order.updated_at = now;

        let content =
            serde_json::to_value(&order).map_err(|e| StoreError::Data(e.to_string()))?;
        let sql = "CREATE type::thing('order', $key) CONTENT $data RETURN NONE".to_string();
        self.run_query(
            sql,
            vec![
                ("key", serde_json::Value::from(key.clone())),
                ("data", content),
            ],
        )
        .await?;

        order.id = Some(key);
        Ok(order)
    }

    async fn update_order(&self, id: &str, mut order: Order) -> StoreResult<Order> {
        order.id = None;
        order.updated_at = Self::now_ms();

        let content =
            serde_json::to_value(&order).map_err(|e| StoreError::Data(e.to_string()))?;
        let sql =
            "UPDATE type::thing('order', $key) CONTENT $data RETURN record::id(id) AS id"
                .to_string();
        let mut response = self
            .run_query(
                sql,
                vec![
                    ("key", serde_json::Value::from(id)),
                    ("data", content),
                ],
            )
            .await?;
        let rows = Self::take_values(&mut response, 0)?;
        if rows.is_empty() {
            return Err(StoreError::NotFound(format!("order {} not found", id)));
        }

        order.id = Some(id.to_string());
        Ok(order)
    }

    async fn find_orders(&self, filter: &OrderFilter) -> StoreResult<OrderSlice> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut binds: Vec<(&'static str, serde_json::Value)> = Vec::new();

        if let Some(customer) = &filter.customer {
            clauses.push("customer = $customer");
            binds.push(("customer", serde_json::Value::from(customer.as_str())));
        }
        if let Some(status) = filter.status {
            clauses.push("status = $status");
            binds.push(("status", serde_json::Value::from(status.as_str())));
        }
        if let Some(from) = filter.created_from {
            clauses.push("createdAt >= $from");
            binds.push(("from", serde_json::Value::from(from)));
        }
        if let Some(to) = filter.created_to {
            clauses.push("createdAt < $to");
            binds.push(("to", serde_json::Value::from(to)));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        let limit_sql = filter
            .limit
            .map(|n| format!(" LIMIT {}", n))
            .unwrap_or_default();
        let sql = format!(
            "SELECT {ORDER_FIELDS} FROM order{where_sql} ORDER BY createdAt DESC{limit_sql}"
        );

        let mut response = self.run_query(sql, binds).await?;
        let values = Self::take_values(&mut response, 0)?;
        let (orders, skipped) = decode_lenient::<Order>(values, "orders");
        Ok(OrderSlice { orders, skipped })
    }

    async fn count_orders_between(&self, start_ms: i64, end_ms: i64) -> StoreResult<u64> {
        let sql = "SELECT count() AS total FROM order \
                   WHERE createdAt >= $from AND createdAt < $to GROUP ALL"
            .to_string();
        let mut response = self
            .run_query(
                sql,
                vec![
                    ("from", serde_json::Value::from(start_ms)),
                    ("to", serde_json::Value::from(end_ms)),
                ],
            )
            .await?;
        let rows = Self::take_values(&mut response, 0)?;
        Ok(rows
            .first()
            .and_then(|row| row.get("total"))
            .and_then(|v| v.as_u64())
            .unwrap_or(0))
    }

    async fn products_by_ids(&self, ids: &[String]) -> StoreResult<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_FIELDS} FROM product WHERE record::id(id) IN $ids");
        let mut response = self
            .run_query(sql, vec![("ids", serde_json::Value::from(ids.to_vec()))])
            .await?;
        let values = Self::take_values(&mut response, 0)?;
        let (products, _) = decode_lenient::<Product>(values, "products");
        Ok(products)
    }

    async fn users_by_ids(&self, ids: &[String]) -> StoreResult<Vec<User>> {
        let sql = format!("SELECT {USER_FIELDS} FROM user WHERE record::id(id) IN $ids");
        let mut response = self
            .run_query(sql, vec![("ids", serde_json::Value::from(ids.to_vec()))])
            .await?;
        let values = Self::take_values(&mut response, 0)?;
        let (users, _) = decode_lenient::<User>(values, "users");
        Ok(users)
    }

    async fn user_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_FIELDS} FROM type::thing('user', $key)");
        let mut response = self
            .run_query(sql, vec![("key", serde_json::Value::from(id))])
            .await?;
        let values = Self::take_values(&mut response, 0)?;
        match values.into_iter().next() {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| StoreError::Data(e.to_string())),
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for SurrealStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurrealStore")
            .field("endpoint", &self.config.endpoint)
            .finish()
    }
}

//! Order API Handlers
//!
//! Date query params arrive as calendar dates (YYYY-MM-DD, inclusive)
//! and are converted to `[start, end)` millis in the business timezone
//! here; nothing below this layer sees a date string.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::core::ServerState;
use crate::db::models::Order;
use crate::db::OrderFilter;
use crate::orders::{Actor, CreateOrderRequest, EditOrderRequest};
use crate::utils::{time, AppError, AppResult};

/// Query params for listing orders
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub customer: Option<String>,
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<usize>,
}

/// Identity of the acting user, supplied by the auth layer in front
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorPayload {
    pub by: String,
    pub by_name: String,
}

impl From<ActorPayload> for Actor {
    fn from(payload: ActorPayload) -> Self {
        Actor {
            id: payload.by,
            name: payload.by_name,
        }
    }
}

/// PATCH body: the patch itself plus the acting user
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditOrderBody {
    #[serde(flatten)]
    pub patch: EditOrderRequest,
    #[serde(flatten)]
    pub actor: ActorPayload,
}

/// POST /api/orders - place an order
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<Json<Order>> {
    let order = state.orders.create_order(payload).await?;
    Ok(Json(order))
}

/// GET /api/orders - list orders with optional filters
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Order>>> {
    let tz = state.config.timezone;

    let status = query
        .status
        .as_deref()
        .map(|s| {
            s.parse::<crate::db::models::OrderStatus>()
                .map_err(AppError::validation)
        })
        .transpose()?;
    let created_from = query
        .start_date
        .as_deref()
        .map(|d| time::parse_date(d).map(|d| time::day_start_millis(d, tz)))
        .transpose()?;
    let created_to = query
        .end_date
        .as_deref()
        .map(|d| time::parse_date(d).map(|d| time::day_end_millis(d, tz)))
        .transpose()?;

    let filter = OrderFilter {
        customer: query.customer,
        status,
        created_from,
        created_to,
        limit: query.limit,
    };
    let slice = state.orders.list_orders(&filter).await?;
    Ok(Json(slice.orders))
}

/// GET /api/orders/:id - fetch one order
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    let order = state.orders.get_order(&id).await?;
    Ok(Json(order))
}

/// PATCH /api/orders/:id - edit quantities/message inside the window
pub async fn edit(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(body): Json<EditOrderBody>,
) -> AppResult<Json<Order>> {
    let actor: Actor = body.actor.into();
    let order = state.orders.edit_order(&id, body.patch, &actor).await?;
    Ok(Json(order))
}

/// POST /api/orders/:id/receive - administrator marks the order received
pub async fn receive(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(body): Json<ActorPayload>,
) -> AppResult<Json<Order>> {
    let admin: Actor = body.into();
    let order = state.orders.mark_received(&id, &admin).await?;
    Ok(Json(order))
}

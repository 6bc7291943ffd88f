//! CRUD and observability endpoints.
//!
//! These handlers are stateless wrappers: each translates one HTTP
//! request into one store call. The realtime pipeline never depends on
//! them beyond the store mutations they trigger.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/orders` | List orders, offset-paginated |
//! | `POST` | `/orders` | Create an order |
//! | `PUT` | `/orders/:id` | Partially update an order |
//! | `DELETE` | `/orders/:id` | Delete an order |
//! | `GET` | `/stats` | Connected-session and relay counters |

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use orderstream_core::{NewOrder, Order, OrderId, OrderPatch, OrderStore};

use crate::error::ApiError;
use crate::metrics::{MetricsSnapshot, RelayMetrics};
use crate::registry::SessionRegistry;

/// Default page number when the query parameter is missing or invalid.
pub const DEFAULT_PAGE: usize = 1;
/// Default page size when the query parameter is missing or invalid.
pub const DEFAULT_LIMIT: usize = 10;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The change source.
    pub store: Arc<OrderStore>,
    /// Live session bookkeeping.
    pub registry: Arc<SessionRegistry>,
    /// Relay pipeline counters.
    pub metrics: Arc<RelayMetrics>,
}

/// Builds the CRUD/observability router over the given state.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/{id}", axum::routing::put(update_order).delete(delete_order))
        .route("/stats", get(stats))
        .with_state(state)
}

/// Pagination query parameters, parsed leniently: non-integer or
/// non-positive values fall back to the defaults instead of rejecting
/// the request.
#[derive(Debug, Default, Deserialize)]
struct ListParams {
    page: Option<String>,
    limit: Option<String>,
}

fn positive_or(raw: Option<&str>, default: usize) -> usize {
    raw.and_then(|s| s.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}

/// `GET /orders?page=&limit=` — one page of orders, newest first.
async fn list_orders(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Json<Vec<Order>> {
    let page = positive_or(params.page.as_deref(), DEFAULT_PAGE);
    let limit = positive_or(params.limit.as_deref(), DEFAULT_LIMIT);
    Json(state.store.list(page, limit))
}

/// Response for the create endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateResponse {
    inserted_id: OrderId,
}

/// `POST /orders` — create an order; triggers one `insert` event.
async fn create_order(
    State(state): State<AppState>,
    Json(new): Json<NewOrder>,
) -> Result<Json<CreateResponse>, ApiError> {
    let inserted_id = state.store.create(new)?;
    Ok(Json(CreateResponse { inserted_id }))
}

/// Response for write endpoints reporting how many records were hit.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WriteResponse {
    affected_count: usize,
}

/// `PUT /orders/:id` — partial update; a missing id is a zero-affected
/// no-op, not an error.
async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<OrderPatch>,
) -> Result<Json<WriteResponse>, ApiError> {
    let affected_count = state.store.update(&OrderId::new(id), patch)?;
    Ok(Json(WriteResponse { affected_count }))
}

/// `DELETE /orders/:id` — remove an order; a missing id is a
/// zero-affected no-op.
async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<WriteResponse> {
    let affected_count = state.store.delete(&OrderId::new(id));
    Json(WriteResponse { affected_count })
}

/// Observability response: the connected count plus relay counters.
#[derive(Debug, Serialize)]
struct StatsResponse {
    connected_sessions: usize,
    orders: usize,
    relay: MetricsSnapshot,
}

/// `GET /stats` — registry size and relay counters.
async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        connected_sessions: state.registry.session_count(),
        orders: state.store.len(),
        relay: state.metrics.snapshot(),
    })
}

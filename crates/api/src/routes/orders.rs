//! Payment callback and order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{OrderId, ProductId, UserId};
use domain::{Authority, Order, OrderStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub authority: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Deserialize)]
pub struct UpdateOrderRequest {
    pub status: Option<String>,
    pub post_tracking_code: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: OrderId,
    pub owner: UserId,
    pub status: OrderStatus,
    pub items: Vec<OrderItemResponse>,
    pub total_price: i64,
    pub post_tracking_code: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: i64,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id(),
            owner: order.owner(),
            status: order.status(),
            total_price: order.total_price().amount(),
            post_tracking_code: order.post_tracking_code().map(str::to_string),
            created_at: order.created_at(),
            items: order
                .lines()
                .iter()
                .map(|line| OrderItemResponse {
                    product_id: line.product_id,
                    quantity: line.quantity,
                    unit_price: line.unit_price.amount(),
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
pub struct OrderListResponse {
    pub orders: Vec<OrderResponse>,
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub pages: u64,
}

// -- Handlers --

/// GET /payment/callback?authority=… — gateway callback; verifies the
/// payment and materializes the order.
#[tracing::instrument(skip(state))]
pub async fn callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    if params.authority.is_empty() {
        return Err(ApiError::BadRequest("authority must not be empty".into()));
    }

    let verified = state
        .order_service
        .verify(&Authority::new(params.authority))
        .await?;

    Ok((StatusCode::CREATED, Json(verified.order.into())))
}

/// GET /orders/{user_id} — lists the user's orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> Result<Json<OrderListResponse>, ApiError> {
    let page = state
        .order_service
        .list_orders(
            UserId::from_uuid(user_id),
            params.page.unwrap_or(1),
            params.per_page.unwrap_or(10),
        )
        .await?;

    Ok(Json(OrderListResponse {
        orders: page.orders.into_iter().map(Into::into).collect(),
        page: page.page,
        per_page: page.per_page,
        total: page.total,
        pages: page.pages,
    }))
}

/// GET /orders/by-id/{order_id} — returns a single order.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .order_service
        .get_order(OrderId::from_uuid(order_id))
        .await?;
    Ok(Json(order.into()))
}

/// PATCH /orders/by-id/{order_id} — advances the status and/or records
/// the postal tracking code.
#[tracing::instrument(skip(state, req))]
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<UpdateOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let status = req
        .status
        .as_deref()
        .map(str::parse::<OrderStatus>)
        .transpose()
        .map_err(ApiError::BadRequest)?;

    let order = state
        .order_service
        .update_order(OrderId::from_uuid(order_id), status, req.post_tracking_code)
        .await?;
    Ok(Json(order.into()))
}

//! Cart endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{ProductId, UserId};
use domain::Cart;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: u32,
}

// -- Response types --

#[derive(Serialize)]
pub struct CartResponse {
    pub owner: UserId,
    pub items: Vec<CartItemResponse>,
    pub total_price: i64,
}

#[derive(Serialize)]
pub struct CartItemResponse {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: i64,
    pub total_price: i64,
}

impl From<Cart> for CartResponse {
    fn from(cart: Cart) -> Self {
        Self {
            owner: cart.owner(),
            total_price: cart.total_price().amount(),
            items: cart
                .lines()
                .iter()
                .map(|line| CartItemResponse {
                    product_id: line.product_id,
                    quantity: line.quantity,
                    unit_price: line.unit_price.amount(),
                    total_price: line.total_price().amount(),
                })
                .collect(),
        }
    }
}

// -- Handlers --

/// GET /cart/{user_id} — returns the reconciled cart.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state
        .cart_service
        .get_cart(UserId::from_uuid(user_id))
        .await?;
    Ok(Json(cart.into()))
}

/// POST /cart/{user_id}/items — adds units of a product, merging into
/// any existing line.
#[tracing::instrument(skip(state, req))]
pub async fn add_item(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<CartResponse>), ApiError> {
    let cart = state
        .cart_service
        .add_item(
            UserId::from_uuid(user_id),
            ProductId::from_uuid(req.product_id),
            req.quantity,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(cart.into())))
}

/// PATCH /cart/{user_id}/items/{product_id} — sets a line's quantity.
#[tracing::instrument(skip(state, req))]
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    Path((user_id, product_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state
        .cart_service
        .update_item_quantity(
            UserId::from_uuid(user_id),
            ProductId::from_uuid(product_id),
            req.quantity,
        )
        .await?;
    Ok(Json(cart.into()))
}

/// DELETE /cart/{user_id}/items/{product_id} — removes a line
/// entirely. Returns 204 when the removal empties the cart.
#[tracing::instrument(skip(state))]
pub async fn remove_item(
    State(state): State<Arc<AppState>>,
    Path((user_id, product_id)): Path<(Uuid, Uuid)>,
) -> Result<axum::response::Response, ApiError> {
    use axum::response::IntoResponse;

    let remaining = state
        .cart_service
        .remove_item(UserId::from_uuid(user_id), ProductId::from_uuid(product_id))
        .await?;

    Ok(match remaining {
        Some(cart) => Json(CartResponse::from(cart)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

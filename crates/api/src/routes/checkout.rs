//! Checkout creation endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{AddressId, CheckoutId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CreateCheckoutRequest {
    pub shipping_address_id: Uuid,
}

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub checkout_id: CheckoutId,
    pub total_price: i64,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    /// Where to send the customer to complete payment.
    pub payment_url: String,
}

/// POST /checkout/{user_id} — freezes the cart into a checkout and
/// opens the payment.
#[tracing::instrument(skip(state, req))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<CreateCheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError> {
    let created = state
        .checkout_service
        .create_checkout(
            UserId::from_uuid(user_id),
            AddressId::from_uuid(req.shipping_address_id),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            checkout_id: created.checkout.id(),
            total_price: created.checkout.total_price().amount(),
            expires_at: created.checkout.expires_at(),
            payment_url: created.payment_url,
        }),
    ))
}

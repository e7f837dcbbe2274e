use axum::{extract::State, routing::post, Json, Router};
use atrium_core::booking::ItemType;
use atrium_payment::{DiscountError, DiscountRejection};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ValidateDiscountRequest {
    pub code: String,
    pub amount_cents: i64,
    pub item_type: Option<ItemType>,
}

#[derive(Debug, Serialize)]
pub struct ValidateDiscountResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DiscountRejection>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/discounts/validate", post(validate_discount))
}

/// Dry-run a code against an amount. Open to unauthenticated carts, and a
/// rejection is a normal 200 answer rather than an error. `item_type` may be
/// omitted when the cart does not know it yet.
async fn validate_discount(
    State(state): State<AppState>,
    Json(req): Json<ValidateDiscountRequest>,
) -> Result<Json<ValidateDiscountResponse>, AppError> {
    match state
        .discounts
        .validate(&req.code, req.amount_cents, req.item_type, Utc::now())
        .await
    {
        Ok(discount_cents) => Ok(Json(ValidateDiscountResponse {
            ok: true,
            discount_cents: Some(discount_cents),
            reason: None,
        })),
        Err(DiscountError::Rejected(reason)) => Ok(Json(ValidateDiscountResponse {
            ok: false,
            discount_cents: None,
            reason: Some(reason),
        })),
        Err(DiscountError::Store(err)) => Err(err.into()),
    }
}

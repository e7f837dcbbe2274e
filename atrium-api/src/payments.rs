use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use atrium_core::booking::{ItemType, PaymentMethod};
use atrium_core::payment::{CardDetails, Receipt};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::Claims;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PayBookingRequest {
    pub payment_method: PaymentMethod,
    pub discount_code: Option<String>,
    pub card: Option<CardDetails>,
}

#[derive(Debug, Serialize)]
pub struct WalletView {
    pub owner_id: String,
    pub balance_cents: i64,
}

#[derive(Debug, Deserialize)]
pub struct TopUpRequest {
    pub amount_cents: i64,
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings/{id}/payment", post(pay_booking))
        .route("/v1/tutorials/{id}/payment", post(pay_tutorial))
        .route("/v1/wallet", get(wallet_balance))
        .route("/v1/wallet/topup", post(topup_wallet))
}

// ============================================================================
// Handlers
// ============================================================================

async fn pay_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<PayBookingRequest>,
) -> Result<Json<Receipt>, AppError> {
    settle(&state, &claims, id, req, None).await
}

/// Tutorial-flavored alias of the payment route; it additionally insists the
/// booking actually is a tutorial session.
async fn pay_tutorial(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<PayBookingRequest>,
) -> Result<Json<Receipt>, AppError> {
    settle(&state, &claims, id, req, Some(ItemType::Tutorial)).await
}

async fn settle(
    state: &AppState,
    claims: &Claims,
    id: Uuid,
    req: PayBookingRequest,
    expected_subject: Option<ItemType>,
) -> Result<Json<Receipt>, AppError> {
    let booking = state
        .bookings
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("booking {id} not found")))?;

    if !claims.can_access(&booking.owner_id) {
        return Err(AppError::Authorization(
            "booking belongs to another customer".to_string(),
        ));
    }
    if let Some(expected) = expected_subject {
        if booking.subject.item_type() != expected {
            return Err(AppError::Validation(format!(
                "booking {id} is not a tutorial session"
            )));
        }
    }

    let receipt = state
        .payments
        .charge(id, req.payment_method, req.discount_code.as_deref(), req.card.as_ref())
        .await?;
    Ok(Json(receipt))
}

async fn wallet_balance(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<WalletView>, AppError> {
    let balance_cents = state.wallets.balance(&claims.sub).await?;
    Ok(Json(WalletView {
        owner_id: claims.sub.clone(),
        balance_cents,
    }))
}

async fn topup_wallet(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<TopUpRequest>,
) -> Result<Json<WalletView>, AppError> {
    if req.amount_cents <= 0 {
        return Err(AppError::Validation(
            "top-up amount must be positive".to_string(),
        ));
    }

    let balance_cents = state.wallets.credit(&claims.sub, req.amount_cents).await?;
    tracing::info!(owner_id = %claims.sub, amount_cents = req.amount_cents, "wallet topped up");
    Ok(Json(WalletView {
        owner_id: claims.sub.clone(),
        balance_cents,
    }))
}

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use atrium_booking::lifecycle::LifecycleError;
use atrium_booking::transitions::TransitionError;
use atrium_core::store::StoreError;
use atrium_payment::{DiscountError, DiscountRejection, PaymentError};
use atrium_shared::slot::SlotError;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug)]
pub enum AppError {
    Authentication(String),
    Authorization(String),
    Validation(String),
    InvalidDiscount(DiscountRejection),
    InsufficientFunds {
        balance_cents: i64,
        required_cents: i64,
    },
    CardDeclined(String),
    NotFound(String),
    Conflict {
        message: String,
        conflicting_booking_ids: Vec<Uuid>,
    },
    StaleState(Uuid),
    IllegalTransition(String),
    PaymentIndeterminate(String),
    Internal(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Authentication(msg) => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "UNAUTHORIZED", "message": msg }),
            ),
            AppError::Authorization(msg) => (
                StatusCode::FORBIDDEN,
                json!({ "error": "FORBIDDEN", "message": msg }),
            ),
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "VALIDATION_ERROR", "message": msg }),
            ),
            AppError::InvalidDiscount(rejection) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "INVALID_DISCOUNT",
                    "reason": rejection,
                    "message": rejection.to_string(),
                }),
            ),
            AppError::InsufficientFunds {
                balance_cents,
                required_cents,
            } => (
                StatusCode::PAYMENT_REQUIRED,
                json!({
                    "error": "INSUFFICIENT_FUNDS",
                    "balance_cents": balance_cents,
                    "required_cents": required_cents,
                }),
            ),
            AppError::CardDeclined(msg) => (
                StatusCode::PAYMENT_REQUIRED,
                json!({ "error": "CARD_DECLINED", "message": msg }),
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                json!({ "error": "NOT_FOUND", "message": msg }),
            ),
            AppError::Conflict {
                message,
                conflicting_booking_ids,
            } => (
                StatusCode::CONFLICT,
                json!({
                    "error": "CONFLICT",
                    "message": message,
                    "conflicting_booking_ids": conflicting_booking_ids,
                }),
            ),
            AppError::StaleState(booking_id) => (
                StatusCode::CONFLICT,
                json!({
                    "error": "STALE_STATE",
                    "message": format!("booking {booking_id} changed state, reload and retry"),
                }),
            ),
            AppError::IllegalTransition(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": "ILLEGAL_TRANSITION", "message": msg }),
            ),
            AppError::PaymentIndeterminate(msg) => (
                StatusCode::GATEWAY_TIMEOUT,
                json!({
                    "error": "PAYMENT_INDETERMINATE",
                    "message": msg,
                    "retryable": true,
                }),
            ),
            AppError::Internal(err) => {
                tracing::error!("internal server error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "INTERNAL", "message": "internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => AppError::NotFound(format!("booking {id} not found")),
            StoreError::StaleState { booking_id, .. } => AppError::StaleState(booking_id),
            StoreError::DuplicateWindow {
                resource_id,
                date,
                window,
                holder,
            } => AppError::Conflict {
                message: format!("{resource_id} is already booked on {date} for {window}"),
                conflicting_booking_ids: vec![holder],
            },
            StoreError::UnknownCode(code) => {
                AppError::NotFound(format!("discount code {code} not found"))
            }
        }
    }
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::NotFound(id) => AppError::NotFound(format!("booking {id} not found")),
            LifecycleError::Transition(inner) => AppError::IllegalTransition(inner.to_string()),
            LifecycleError::Store(inner) => inner.into(),
        }
    }
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        AppError::IllegalTransition(err.to_string())
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::NotFound(id) => AppError::NotFound(format!("booking {id} not found")),
            PaymentError::InsufficientFunds {
                balance_cents,
                required_cents,
            } => AppError::InsufficientFunds {
                balance_cents,
                required_cents,
            },
            PaymentError::InvalidDiscount(rejection) => AppError::InvalidDiscount(rejection),
            PaymentError::IllegalState { .. } => AppError::IllegalTransition(err.to_string()),
            PaymentError::MissingCard => AppError::Validation(err.to_string()),
            PaymentError::CardDeclined(msg) => AppError::CardDeclined(msg),
            PaymentError::Indeterminate(msg) => AppError::PaymentIndeterminate(msg),
            PaymentError::StaleState(id) => AppError::StaleState(id),
            PaymentError::Store(inner) => inner.into(),
        }
    }
}

impl From<DiscountError> for AppError {
    fn from(err: DiscountError) -> Self {
        match err {
            DiscountError::Rejected(rejection) => AppError::InvalidDiscount(rejection),
            DiscountError::Store(inner) => inner.into(),
        }
    }
}

impl From<SlotError> for AppError {
    fn from(err: SlotError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

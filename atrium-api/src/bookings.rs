use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use atrium_booking::transitions::LifecycleEvent;
use atrium_core::booking::{Booking, BookingStatus, BookingSubject, ItemType};
use atrium_core::store::BookingFilter;
use atrium_shared::slot::TimeSlot;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::Claims;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RawSlot {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub item_type: String,
    pub date: String,
    pub venue_id: Option<Uuid>,
    pub slot: Option<RawSlot>,
    pub equipment_ids: Option<Vec<Uuid>>,
    pub tutorial_id: Option<Uuid>,
    pub discount_code: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<BookingStatus>,
    pub item_type: Option<ItemType>,
}

#[derive(Debug, Deserialize)]
pub struct ViewQuery {
    pub display_currency: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DisplayTotal {
    pub currency: String,
    pub total_cents: i64,
}

#[derive(Debug, Serialize)]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_total: Option<DisplayTotal>,
}

#[derive(Debug, Deserialize)]
pub struct StatusChangeRequest {
    pub event: LifecycleEvent,
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking).get(list_bookings))
        .route("/v1/bookings/{id}", get(get_booking))
        .route("/v1/bookings/{id}/status", patch(change_status))
}

// ============================================================================
// Handlers
// ============================================================================

async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    // 1. Validate the payload into a subject
    let date = NaiveDate::parse_from_str(&req.date, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("invalid date: {}", req.date)))?;
    let subject = build_subject(&req)?;

    // 2. Price against the rate card
    let subtotal_cents = state.pricing.quote(&subject);
    let mut booking = Booking::new(claims.sub.clone(), subject, date, subtotal_cents);
    booking.notes = req.notes;

    // 3. Apply the discount if one was offered; it is re-validated at charge
    // time, so nothing is consumed here.
    if let Some(code) = &req.discount_code {
        let discount_cents = state
            .discounts
            .validate(
                code,
                booking.subtotal_cents,
                Some(booking.subject.item_type()),
                Utc::now(),
            )
            .await?;
        booking.apply_discount(code, discount_cents);
    }

    // 4. Advisory availability check for a friendly conflict answer; the
    // store's window keys still arbitrate racing inserts.
    let availability = state.availability.check_subject(&booking.subject, date).await?;
    if !availability.available {
        return Err(AppError::Conflict {
            message: "requested window is not available".to_string(),
            conflicting_booking_ids: availability.conflicting_booking_ids,
        });
    }

    // 5. Insert; a duplicate window surfaces as a conflict
    let stored = state.bookings.insert(booking).await?;
    tracing::info!(booking_id = %stored.id, owner_id = %stored.owner_id, "booking created");

    Ok((StatusCode::CREATED, Json(stored)))
}

fn build_subject(req: &CreateBookingRequest) -> Result<BookingSubject, AppError> {
    match req.item_type.as_str() {
        "VENUE" => {
            let venue_id = req.venue_id.ok_or_else(|| {
                AppError::Validation("venue_id is required for venue bookings".to_string())
            })?;
            let raw = req.slot.as_ref().ok_or_else(|| {
                AppError::Validation("slot is required for venue bookings".to_string())
            })?;
            let slot = TimeSlot::parse(&raw.start, &raw.end)?;
            Ok(BookingSubject::Venue { venue_id, slot })
        }
        "EQUIPMENT" => {
            let equipment_ids = req.equipment_ids.clone().unwrap_or_default();
            if equipment_ids.is_empty() {
                return Err(AppError::Validation(
                    "equipment_ids must name at least one piece".to_string(),
                ));
            }
            let mut seen = HashSet::new();
            if !equipment_ids.iter().all(|id| seen.insert(*id)) {
                return Err(AppError::Validation(
                    "equipment_ids must not repeat".to_string(),
                ));
            }
            Ok(BookingSubject::Equipment { equipment_ids })
        }
        "TUTORIAL" => {
            let tutorial_id = req.tutorial_id.ok_or_else(|| {
                AppError::Validation("tutorial_id is required for tutorial bookings".to_string())
            })?;
            Ok(BookingSubject::Tutorial { tutorial_id })
        }
        other => Err(AppError::Validation(format!("unknown item_type: {other}"))),
    }
}

async fn list_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let filter = BookingFilter {
        status: query.status,
        item_type: query.item_type,
    };
    let bookings = state.bookings.list_for_owner(&claims.sub, &filter).await?;
    Ok(Json(bookings))
}

async fn get_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Query(query): Query<ViewQuery>,
) -> Result<Json<BookingView>, AppError> {
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

    let display_total = match query.display_currency {
        Some(currency) => {
            let converted = state
                .rates
                .convert(booking.total_cents, &currency)
                .ok_or_else(|| AppError::Validation(format!("no exchange rate for {currency}")))?;
            Some(DisplayTotal {
                currency,
                total_cents: converted,
            })
        }
        None => None,
    };

    Ok(Json(BookingView {
        booking,
        display_total,
    }))
}

async fn change_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusChangeRequest>,
) -> Result<Json<Booking>, AppError> {
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

    let updated = match req.event {
        LifecycleEvent::Cancel => state.lifecycle.cancel(id).await?,
        LifecycleEvent::CancelWithRefund => state.payments.cancel_with_refund(id).await?,
        LifecycleEvent::Complete => {
            if !claims.is_admin() {
                return Err(AppError::Authorization(
                    "only admins can complete bookings".to_string(),
                ));
            }
            state.lifecycle.complete(id).await?
        }
        // Settlement and expiry events belong to the engine, not the API.
        other => {
            return Err(AppError::Validation(format!(
                "{other:?} cannot be requested through the API"
            )))
        }
    };

    tracing::info!(booking_id = %id, event = ?req.event, "booking status changed");
    Ok(Json(updated))
}

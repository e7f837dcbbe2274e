use atrium_core::booking::ItemType;
use atrium_core::discount::{DiscountCode, DiscountKind};
use atrium_core::store::{DiscountStore, StoreError};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Why a code cannot be applied. Serialized form feeds API responses
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountRejection {
    #[error("unknown discount code")]
    UnknownCode,

    #[error("discount code has expired")]
    Expired,

    #[error("discount code does not apply to this item type")]
    ScopeMismatch,

    #[error("amount is below the code's minimum")]
    BelowMinimum,

    #[error("discount code usage limit reached")]
    UsageExhausted,

    #[error("code cannot cover the full amount")]
    FullAmountNotAllowed,
}

#[derive(Debug, thiserror::Error)]
pub enum DiscountError {
    #[error("{0}")]
    Rejected(#[from] DiscountRejection),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Evaluate a code against an amount. Returns the discount in cents.
///
/// Checks run cheapest-first; the first failure wins. Percent discounts
/// floor, and the result is clamped into `[0, amount_cents]`. A discount
/// that would wipe the whole amount is only allowed when the code opts in.
/// Scoped codes need a matching `item_type`; evaluating one without a
/// context is a scope mismatch.
pub fn evaluate(
    code: &DiscountCode,
    amount_cents: i64,
    item_type: Option<ItemType>,
    now: DateTime<Utc>,
) -> Result<i64, DiscountRejection> {
    if now >= code.expires_at {
        return Err(DiscountRejection::Expired);
    }

    if let Some(scope) = code.item_scope {
        if item_type != Some(scope) {
            return Err(DiscountRejection::ScopeMismatch);
        }
    }

    if let Some(min) = code.min_subtotal_cents {
        if amount_cents < min {
            return Err(DiscountRejection::BelowMinimum);
        }
    }

    if code.is_exhausted() {
        return Err(DiscountRejection::UsageExhausted);
    }

    // Percent products can exceed i64 for extreme amounts, so the math runs
    // in i128 and narrows back only after the clamp.
    let raw = match code.kind {
        DiscountKind::Fixed { amount_cents: fixed } => i128::from(fixed),
        DiscountKind::Percent { percent } => i128::from(amount_cents) * i128::from(percent) / 100,
    };
    let clamped = raw.clamp(0, i128::from(amount_cents.max(0))) as i64;

    if clamped == amount_cents && amount_cents > 0 && !code.allows_full_discount {
        return Err(DiscountRejection::FullAmountNotAllowed);
    }

    Ok(clamped)
}

/// Store-backed wrapper around `evaluate`.
///
/// Validation never consumes usage; `consume` is called by the orchestrator
/// once, after settlement succeeds.
#[derive(Clone)]
pub struct DiscountService {
    store: Arc<dyn DiscountStore>,
}

impl DiscountService {
    pub fn new(store: Arc<dyn DiscountStore>) -> Self {
        Self { store }
    }

    pub async fn validate(
        &self,
        code: &str,
        amount_cents: i64,
        item_type: Option<ItemType>,
        now: DateTime<Utc>,
    ) -> Result<i64, DiscountError> {
        let record = self
            .store
            .find(code)
            .await?
            .ok_or(DiscountRejection::UnknownCode)?;
        Ok(evaluate(&record, amount_cents, item_type, now)?)
    }

    pub async fn consume(&self, code: &str) -> Result<(), StoreError> {
        self.store.increment_usage(code).await
    }
}

/// Demo codes seeded at startup.
pub fn default_codes() -> Vec<DiscountCode> {
    let horizon = Utc::now() + Duration::days(365);

    let welcome = DiscountCode::percent("WELCOME10", 10, horizon);

    let save20 = DiscountCode::percent("SAVE20", 20, horizon);

    let mut venue50 = DiscountCode::fixed("VENUE50OFF", 5_000, horizon);
    venue50.item_scope = Some(ItemType::Venue);
    venue50.min_subtotal_cents = Some(10_000);

    let mut freebie = DiscountCode::percent("FREEBIE", 100, horizon);
    freebie.allows_full_discount = true;
    freebie.usage_limit = Some(25);

    vec![welcome, save20, venue50, freebie]
}

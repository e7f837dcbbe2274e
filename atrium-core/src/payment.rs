use crate::booking::PaymentMethod;
use async_trait::async_trait;
use atrium_shared::pii::Masked;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardIntentStatus {
    Created,
    Confirmed,
    Declined,
}

/// A charge intent held by the card provider.
///
/// The id is derived from `(booking_id, attempt)`, so re-creating the intent
/// for the same attempt returns the one already on file instead of opening a
/// second charge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardIntent {
    pub id: String,
    pub booking_id: Uuid,
    pub attempt: u32,
    pub amount_cents: i64,
    pub currency: String,
    pub status: CardIntentStatus,
    /// Provider-side reference, if the provider issued one.
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Card input as submitted by the caller. The token is masked so request
/// logging cannot leak it.
#[derive(Debug, Clone, Deserialize)]
pub struct CardDetails {
    pub token: Masked<String>,
    pub holder: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CardError {
    #[error("card declined: {0}")]
    Declined(String),

    #[error("card network fault: {0}")]
    Network(String),

    #[error("unknown card intent: {0}")]
    UnknownIntent(String),
}

#[async_trait]
pub trait CardProcessor: Send + Sync {
    /// Create the intent for this booking attempt, or return the existing one
    /// for the same key.
    async fn create_intent(
        &self,
        booking_id: Uuid,
        attempt: u32,
        amount_cents: i64,
        currency: &str,
    ) -> Result<CardIntent, CardError>;

    /// Confirm (settle) an intent. Confirming an already confirmed intent is
    /// a no-op success, which is what makes retries after unknown outcomes
    /// safe.
    async fn confirm_intent(&self, intent_id: &str, card: &CardDetails) -> Result<CardIntent, CardError>;
}

/// Settlement record returned to the caller after a successful charge.
#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    pub booking_id: Uuid,
    pub method: PaymentMethod,
    pub amount_cents: i64,
    pub discount_cents: i64,
    pub currency: String,
    pub reference: String,
    pub paid_at: DateTime<Utc>,
}

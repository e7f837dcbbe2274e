use crate::booking::{Booking, BookingStatus, ItemType, PaymentStatus};
use crate::discount::DiscountCode;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("booking not found: {0}")]
    NotFound(Uuid),

    #[error("stale state for booking {booking_id}: expected {expected:?}, found {actual:?}")]
    StaleState {
        booking_id: Uuid,
        expected: (BookingStatus, PaymentStatus),
        actual: (BookingStatus, PaymentStatus),
    },

    #[error("window {window} on {date} already booked for resource {resource_id} by {holder}")]
    DuplicateWindow {
        resource_id: Uuid,
        date: NaiveDate,
        window: String,
        holder: Uuid,
    },

    #[error("unknown discount code: {0}")]
    UnknownCode(String),
}

#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub item_type: Option<ItemType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitOutcome {
    Debited { balance_cents: i64 },
    Insufficient { balance_cents: i64 },
}

/// Persistence seam for bookings.
///
/// All mutations after insert go through `update_if`, which only applies when
/// the stored lifecycle tuple still equals what the mutator read. Competing
/// writers therefore serialize into exactly one winner; losers see
/// `StoreError::StaleState` and must re-read.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Persist a new booking, claiming its `(resource, date, window)` keys.
    /// Fails with `DuplicateWindow` if another active booking holds one.
    async fn insert(&self, booking: Booking) -> Result<Booking, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Booking>, StoreError>;

    async fn list_for_owner(&self, owner_id: &str, filter: &BookingFilter) -> Result<Vec<Booking>, StoreError>;

    /// Active (pending or confirmed) bookings touching a resource on a date.
    async fn find_active_for_resource(&self, resource_id: Uuid, date: NaiveDate) -> Result<Vec<Booking>, StoreError>;

    /// Guarded replace: applies only when the stored `(status, payment_status)`
    /// equals `expected`. Leaving the active states releases the window keys.
    async fn update_if(
        &self,
        expected: (BookingStatus, PaymentStatus),
        booking: Booking,
    ) -> Result<Booking, StoreError>;

    /// Unpaid pending bookings created before `cutoff`.
    async fn find_expiration_candidates(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>, StoreError>;
}

/// Per-user prepaid balance in base-currency cents.
#[async_trait]
pub trait WalletStore: Send + Sync {
    async fn balance(&self, owner_id: &str) -> Result<i64, StoreError>;

    async fn credit(&self, owner_id: &str, amount_cents: i64) -> Result<i64, StoreError>;

    /// Atomic compare-and-decrement. An insufficient balance reports the
    /// current balance without mutating anything.
    async fn try_debit(&self, owner_id: &str, amount_cents: i64) -> Result<DebitOutcome, StoreError>;
}

#[async_trait]
pub trait DiscountStore: Send + Sync {
    async fn find(&self, code: &str) -> Result<Option<DiscountCode>, StoreError>;

    /// Record one redemption. Fails with `UnknownCode` for codes not on file.
    async fn increment_usage(&self, code: &str) -> Result<(), StoreError>;

    async fn upsert(&self, code: DiscountCode) -> Result<(), StoreError>;
}

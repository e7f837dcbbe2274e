use async_trait::async_trait;
use atrium_core::booking::{Booking, BookingStatus, PaymentStatus};
use atrium_core::discount::DiscountCode;
use atrium_core::store::{
    BookingFilter, BookingStore, DebitOutcome, DiscountStore, StoreError, WalletStore,
};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Per-resource claim on a date: the normalized slot window for venues, a
/// whole-day marker for equipment and tutorials.
type WindowKey = (Uuid, NaiveDate, String);

const DAY_WINDOW: &str = "DAY";

fn window_keys(booking: &Booking) -> Vec<WindowKey> {
    let window = match booking.subject.slot() {
        Some(slot) => slot.window_key(),
        None => DAY_WINDOW.to_string(),
    };
    booking
        .subject
        .resource_ids()
        .into_iter()
        .map(|resource_id| (resource_id, booking.date, window.clone()))
        .collect()
}

#[derive(Default)]
struct StoreInner {
    bookings: HashMap<Uuid, Booking>,
    /// Uniqueness arbiter: each key is held by at most one active booking.
    windows: HashMap<WindowKey, Uuid>,
    /// Active bookings per resource-day, for availability lookups.
    by_resource: HashMap<(Uuid, NaiveDate), HashSet<Uuid>>,
    wallets: HashMap<String, i64>,
    discounts: HashMap<String, DiscountCode>,
}

impl StoreInner {
    fn index(&mut self, booking: &Booking) {
        for key in window_keys(booking) {
            self.by_resource
                .entry((key.0, booking.date))
                .or_default()
                .insert(booking.id);
            self.windows.insert(key, booking.id);
        }
    }

    fn release(&mut self, booking: &Booking) {
        for key in window_keys(booking) {
            if self.windows.get(&key) == Some(&booking.id) {
                self.windows.remove(&key);
            }
            if let Some(ids) = self.by_resource.get_mut(&(key.0, booking.date)) {
                ids.remove(&booking.id);
                if ids.is_empty() {
                    self.by_resource.remove(&(key.0, booking.date));
                }
            }
        }
    }
}

/// In-memory store backing every trait seam.
///
/// One lock guards all maps so that a guarded update and its index
/// maintenance are a single atomic step.
pub struct MemoryStore {
    inner: RwLock<StoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn insert(&self, booking: Booking) -> Result<Booking, StoreError> {
        let mut inner = self.inner.write().await;

        for (resource_id, date, window) in window_keys(&booking) {
            if let Some(holder) = inner.windows.get(&(resource_id, date, window.clone())) {
                return Err(StoreError::DuplicateWindow {
                    resource_id,
                    date,
                    window,
                    holder: *holder,
                });
            }
        }

        inner.index(&booking);
        inner.bookings.insert(booking.id, booking.clone());
        tracing::debug!(booking_id = %booking.id, "booking inserted");
        Ok(booking)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.bookings.get(&id).cloned())
    }

    async fn list_for_owner(&self, owner_id: &str, filter: &BookingFilter) -> Result<Vec<Booking>, StoreError> {
        let inner = self.inner.read().await;
        let mut matches: Vec<Booking> = inner
            .bookings
            .values()
            .filter(|b| b.owner_id == owner_id)
            .filter(|b| filter.status.map_or(true, |s| b.status == s))
            .filter(|b| filter.item_type.map_or(true, |t| b.subject.item_type() == t))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matches)
    }

    async fn find_active_for_resource(&self, resource_id: Uuid, date: NaiveDate) -> Result<Vec<Booking>, StoreError> {
        let inner = self.inner.read().await;
        let ids = match inner.by_resource.get(&(resource_id, date)) {
            Some(ids) => ids,
            None => return Ok(Vec::new()),
        };
        Ok(ids
            .iter()
            .filter_map(|id| inner.bookings.get(id))
            .filter(|b| b.is_active())
            .cloned()
            .collect())
    }

    async fn update_if(
        &self,
        expected: (BookingStatus, PaymentStatus),
        booking: Booking,
    ) -> Result<Booking, StoreError> {
        let mut inner = self.inner.write().await;

        let current = inner
            .bookings
            .get(&booking.id)
            .ok_or(StoreError::NotFound(booking.id))?;

        let actual = current.state();
        if actual != expected {
            return Err(StoreError::StaleState {
                booking_id: booking.id,
                expected,
                actual,
            });
        }

        let was_active = current.is_active();
        if was_active && !booking.is_active() {
            let released = current.clone();
            inner.release(&released);
        }

        inner.bookings.insert(booking.id, booking.clone());
        tracing::debug!(
            booking_id = %booking.id,
            status = ?booking.status,
            payment_status = ?booking.payment_status,
            "booking updated"
        );
        Ok(booking)
    }

    async fn find_expiration_candidates(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .bookings
            .values()
            .filter(|b| {
                b.status == BookingStatus::Pending
                    && b.payment_status == PaymentStatus::Pending
                    && b.created_at < cutoff
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl WalletStore for MemoryStore {
    async fn balance(&self, owner_id: &str) -> Result<i64, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.wallets.get(owner_id).copied().unwrap_or(0))
    }

    async fn credit(&self, owner_id: &str, amount_cents: i64) -> Result<i64, StoreError> {
        let mut inner = self.inner.write().await;
        let balance = inner.wallets.entry(owner_id.to_string()).or_insert(0);
        *balance += amount_cents;
        Ok(*balance)
    }

    async fn try_debit(&self, owner_id: &str, amount_cents: i64) -> Result<DebitOutcome, StoreError> {
        let mut inner = self.inner.write().await;
        let balance = inner.wallets.entry(owner_id.to_string()).or_insert(0);
        if *balance < amount_cents {
            return Ok(DebitOutcome::Insufficient {
                balance_cents: *balance,
            });
        }
        *balance -= amount_cents;
        Ok(DebitOutcome::Debited {
            balance_cents: *balance,
        })
    }
}

#[async_trait]
impl DiscountStore for MemoryStore {
    async fn find(&self, code: &str) -> Result<Option<DiscountCode>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.discounts.get(code).cloned())
    }

    async fn increment_usage(&self, code: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let record = inner
            .discounts
            .get_mut(code)
            .ok_or_else(|| StoreError::UnknownCode(code.to_string()))?;
        record.used_count += 1;
        Ok(())
    }

    async fn upsert(&self, code: DiscountCode) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.discounts.insert(code.code.clone(), code);
        Ok(())
    }
}

use crate::transitions::{self, LifecycleEvent, TransitionError};
use atrium_core::booking::Booking;
use atrium_core::store::{BookingStore, StoreError};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("booking not found: {0}")]
    NotFound(Uuid),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Applies lifecycle events to stored bookings.
///
/// Every application is conditioned on the tuple read at load time: if a
/// concurrent writer got there first, the store rejects the update and the
/// error propagates instead of overwriting the winner.
#[derive(Clone)]
pub struct LifecycleManager {
    store: Arc<dyn BookingStore>,
}

impl LifecycleManager {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    pub async fn apply(&self, booking_id: Uuid, event: LifecycleEvent) -> Result<Booking, LifecycleError> {
        let booking = self
            .store
            .get(booking_id)
            .await?
            .ok_or(LifecycleError::NotFound(booking_id))?;

        let observed = booking.state();
        let next = transitions::next(observed, event)?;

        let mut updated = booking;
        updated.apply_state(next);

        let stored = self.store.update_if(observed, updated).await?;
        tracing::info!(
            booking_id = %booking_id,
            event = ?event,
            status = ?stored.status,
            payment_status = ?stored.payment_status,
            "lifecycle event applied"
        );
        Ok(stored)
    }

    pub async fn cancel(&self, booking_id: Uuid) -> Result<Booking, LifecycleError> {
        self.apply(booking_id, LifecycleEvent::Cancel).await
    }

    pub async fn complete(&self, booking_id: Uuid) -> Result<Booking, LifecycleError> {
        self.apply(booking_id, LifecycleEvent::Complete).await
    }
}

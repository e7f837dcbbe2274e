use crate::transitions::{self, LifecycleEvent};
use atrium_core::store::{BookingStore, StoreError};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    pub scanned: usize,
    pub expired: Vec<uuid::Uuid>,
    /// Candidates that changed state between selection and update; a
    /// concurrent payment or cancel got there first.
    pub skipped_stale: usize,
}

/// Cancels unpaid pending bookings whose payment deadline has elapsed.
#[derive(Clone)]
pub struct ExpirationSweeper {
    store: Arc<dyn BookingStore>,
}

impl ExpirationSweeper {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    /// One pass over bookings created before `now - deadline`.
    ///
    /// Each expiry is applied through a guarded update expecting the unpaid
    /// pending tuple, so a booking paid mid-sweep is left alone. `now` is a
    /// parameter so callers control the clock.
    pub async fn sweep(&self, now: DateTime<Utc>, deadline: Duration) -> Result<SweepReport, StoreError> {
        let cutoff = now - deadline;
        let candidates = self.store.find_expiration_candidates(cutoff).await?;

        let mut report = SweepReport {
            scanned: candidates.len(),
            ..Default::default()
        };

        for booking in candidates {
            let observed = booking.state();
            let next = match transitions::next(observed, LifecycleEvent::Expire) {
                Ok(next) => next,
                Err(_) => {
                    report.skipped_stale += 1;
                    continue;
                }
            };

            let mut expired = booking;
            expired.apply_state(next);
            expired.annotate("expiration_reason", json!("payment_deadline_elapsed"));
            expired.annotate("expired_at", json!(now.to_rfc3339()));

            match self.store.update_if(observed, expired).await {
                Ok(stored) => report.expired.push(stored.id),
                Err(StoreError::StaleState { booking_id, .. }) => {
                    tracing::debug!(booking_id = %booking_id, "expiry lost the race, skipping");
                    report.skipped_stale += 1;
                }
                Err(other) => return Err(other),
            }
        }

        if !report.expired.is_empty() {
            tracing::info!(
                expired = report.expired.len(),
                scanned = report.scanned,
                "expiration sweep canceled unpaid bookings"
            );
        }
        Ok(report)
    }
}

/// Owns the recurring sweep task.
///
/// Runs one pass immediately on start, then on a fixed interval, until
/// `stop` signals the task and joins it.
pub struct ExpirationScheduler {
    handle: JoinHandle<()>,
    stop_tx: watch::Sender<bool>,
}

impl ExpirationScheduler {
    pub fn start(sweeper: ExpirationSweeper, interval: std::time::Duration, deadline: Duration) -> Self {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(error) = sweeper.sweep(Utc::now(), deadline).await {
                            tracing::error!(error = %error, "expiration sweep failed");
                        }
                    }
                    _ = stop_rx.changed() => break,
                }
            }
            tracing::debug!("expiration scheduler stopped");
        });

        Self { handle, stop_tx }
    }

    /// Signal the task and wait for the in-flight pass to finish.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.handle.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atrium_core::booking::{Booking, BookingStatus, BookingSubject, PaymentStatus};
    use atrium_shared::slot::TimeSlot;
    use atrium_store::MemoryStore;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn stale_booking(hours_old: i64) -> Booking {
        let mut booking = Booking::new(
            "user-1".to_string(),
            BookingSubject::Venue {
                venue_id: Uuid::new_v4(),
                slot: TimeSlot::parse("09:00", "11:00").unwrap(),
            },
            NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            10_000,
        );
        booking.created_at = Utc::now() - Duration::hours(hours_old);
        booking
    }

    #[tokio::test]
    async fn test_sweep_is_a_no_op_before_the_deadline() {
        let store = Arc::new(MemoryStore::new());
        let booking = store.insert(stale_booking(23)).await.unwrap();

        let sweeper = ExpirationSweeper::new(store.clone());
        let report = sweeper.sweep(Utc::now(), Duration::hours(24)).await.unwrap();

        assert!(report.expired.is_empty());
        let stored = store.get(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn test_sweep_cancels_past_deadline_and_annotates() {
        let store = Arc::new(MemoryStore::new());
        let booking = store.insert(stale_booking(25)).await.unwrap();

        let sweeper = ExpirationSweeper::new(store.clone());
        let report = sweeper.sweep(Utc::now(), Duration::hours(24)).await.unwrap();

        assert_eq!(report.expired, vec![booking.id]);

        let stored = store.get(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.state(), (BookingStatus::Canceled, PaymentStatus::Pending));
        assert_eq!(
            stored.metadata.get("expiration_reason"),
            Some(&json!("payment_deadline_elapsed"))
        );
        assert!(stored.metadata.contains_key("expired_at"));
    }

    #[tokio::test]
    async fn test_sweep_ignores_paid_bookings() {
        let store = Arc::new(MemoryStore::new());
        let booking = store.insert(stale_booking(25)).await.unwrap();

        let observed = booking.state();
        let mut paid = booking.clone();
        paid.apply_state((BookingStatus::Confirmed, PaymentStatus::Paid));
        store.update_if(observed, paid).await.unwrap();

        let sweeper = ExpirationSweeper::new(store.clone());
        let report = sweeper.sweep(Utc::now(), Duration::hours(24)).await.unwrap();

        assert_eq!(report.scanned, 0);
        assert!(report.expired.is_empty());
    }

    #[tokio::test]
    async fn test_sweep_with_explicit_now_needs_no_waiting() {
        let store = Arc::new(MemoryStore::new());
        let booking = store.insert(stale_booking(0)).await.unwrap();

        // Pretend two days pass.
        let sweeper = ExpirationSweeper::new(store.clone());
        let future = Utc::now() + Duration::hours(48);
        let report = sweeper.sweep(future, Duration::hours(24)).await.unwrap();

        assert_eq!(report.expired, vec![booking.id]);
    }

    #[tokio::test]
    async fn test_scheduler_runs_immediately_and_stops() {
        let store = Arc::new(MemoryStore::new());
        let booking = store.insert(stale_booking(25)).await.unwrap();

        let scheduler = ExpirationScheduler::start(
            ExpirationSweeper::new(store.clone()),
            std::time::Duration::from_secs(3600),
            Duration::hours(24),
        );

        // The first pass fires on start, not after the first interval.
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        let stored = store.get(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Canceled);

        scheduler.stop().await;
    }
}

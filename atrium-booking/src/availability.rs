use atrium_core::booking::BookingSubject;
use atrium_core::store::{BookingStore, StoreError};
use atrium_shared::slot::TimeSlot;
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct Availability {
    pub available: bool,
    /// Every active booking standing in the way, for caller diagnostics.
    pub conflicting_booking_ids: Vec<Uuid>,
}

/// Advisory conflict check against active bookings.
///
/// Advisory because a competing create can land between this check and the
/// insert; the store's window keys are the final arbiter.
#[derive(Clone)]
pub struct AvailabilityChecker {
    store: Arc<dyn BookingStore>,
}

impl AvailabilityChecker {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    /// Check one resource on a date. `slot` of `None` means whole-day
    /// occupancy, which conflicts with anything active on that date.
    pub async fn check(
        &self,
        resource_id: Uuid,
        date: NaiveDate,
        slot: Option<&TimeSlot>,
    ) -> Result<Availability, StoreError> {
        let active = self.store.find_active_for_resource(resource_id, date).await?;

        let conflicting: Vec<Uuid> = active
            .iter()
            .filter(|existing| match (slot, existing.subject.slot()) {
                (Some(requested), Some(held)) => requested.overlaps(held),
                // A whole-day claim on either side conflicts with any window.
                _ => true,
            })
            .map(|existing| existing.id)
            .collect();

        Ok(Availability {
            available: conflicting.is_empty(),
            conflicting_booking_ids: conflicting,
        })
    }

    /// Check every resource a subject occupies; an equipment set must fit on
    /// all of its pieces at once.
    pub async fn check_subject(&self, subject: &BookingSubject, date: NaiveDate) -> Result<Availability, StoreError> {
        let slot = subject.slot();
        let mut conflicting = Vec::new();

        for resource_id in subject.resource_ids() {
            let result = self.check(resource_id, date, slot).await?;
            for id in result.conflicting_booking_ids {
                if !conflicting.contains(&id) {
                    conflicting.push(id);
                }
            }
        }

        Ok(Availability {
            available: conflicting.is_empty(),
            conflicting_booking_ids: conflicting,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atrium_core::booking::Booking;
    use atrium_store::MemoryStore;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 9, 1).unwrap()
    }

    fn venue_subject(venue_id: Uuid, start: &str, end: &str) -> BookingSubject {
        BookingSubject::Venue {
            venue_id,
            slot: TimeSlot::parse(start, end).unwrap(),
        }
    }

    async fn checker_with(bookings: Vec<Booking>) -> (AvailabilityChecker, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        for booking in bookings {
            store.insert(booking).await.unwrap();
        }
        (AvailabilityChecker::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_overlapping_slot_conflicts() {
        let venue = Uuid::new_v4();
        let existing = Booking::new("a".into(), venue_subject(venue, "09:00", "12:00"), date(), 0);
        let existing_id = existing.id;
        let (checker, _) = checker_with(vec![existing]).await;

        let requested = TimeSlot::parse("11:00", "13:00").unwrap();
        let result = checker.check(venue, date(), Some(&requested)).await.unwrap();

        assert!(!result.available);
        assert_eq!(result.conflicting_booking_ids, vec![existing_id]);
    }

    #[tokio::test]
    async fn test_touching_slot_does_not_conflict() {
        let venue = Uuid::new_v4();
        let existing = Booking::new("a".into(), venue_subject(venue, "09:00", "12:00"), date(), 0);
        let (checker, _) = checker_with(vec![existing]).await;

        let requested = TimeSlot::parse("12:00", "14:00").unwrap();
        let result = checker.check(venue, date(), Some(&requested)).await.unwrap();

        assert!(result.available);
        assert!(result.conflicting_booking_ids.is_empty());
    }

    #[tokio::test]
    async fn test_other_dates_do_not_conflict() {
        let venue = Uuid::new_v4();
        let existing = Booking::new("a".into(), venue_subject(venue, "09:00", "12:00"), date(), 0);
        let (checker, _) = checker_with(vec![existing]).await;

        let requested = TimeSlot::parse("09:00", "12:00").unwrap();
        let other_day = NaiveDate::from_ymd_opt(2026, 9, 2).unwrap();
        let result = checker.check(venue, other_day, Some(&requested)).await.unwrap();

        assert!(result.available);
    }

    #[tokio::test]
    async fn test_canceled_bookings_do_not_conflict() {
        let venue = Uuid::new_v4();
        let existing = Booking::new("a".into(), venue_subject(venue, "09:00", "12:00"), date(), 0);
        let observed = existing.state();
        let (checker, store) = checker_with(vec![existing.clone()]).await;

        let mut canceled = existing;
        canceled.apply_state((
            atrium_core::booking::BookingStatus::Canceled,
            atrium_core::booking::PaymentStatus::Pending,
        ));
        store.update_if(observed, canceled).await.unwrap();

        let requested = TimeSlot::parse("10:00", "11:00").unwrap();
        let result = checker.check(venue, date(), Some(&requested)).await.unwrap();
        assert!(result.available);
    }

    #[tokio::test]
    async fn test_whole_day_claim_blocks_any_window() {
        let tutorial = Uuid::new_v4();
        let existing = Booking::new(
            "a".into(),
            BookingSubject::Tutorial { tutorial_id: tutorial },
            date(),
            0,
        );
        let (checker, _) = checker_with(vec![existing]).await;

        let result = checker.check(tutorial, date(), None).await.unwrap();
        assert!(!result.available);
    }

    #[tokio::test]
    async fn test_equipment_set_conflicts_on_any_piece() {
        let shared_piece = Uuid::new_v4();
        let existing = Booking::new(
            "a".into(),
            BookingSubject::Equipment {
                equipment_ids: vec![shared_piece, Uuid::new_v4()],
            },
            date(),
            0,
        );
        let existing_id = existing.id;
        let (checker, _) = checker_with(vec![existing]).await;

        let requested = BookingSubject::Equipment {
            equipment_ids: vec![Uuid::new_v4(), shared_piece],
        };
        let result = checker.check_subject(&requested, date()).await.unwrap();

        assert!(!result.available);
        assert_eq!(result.conflicting_booking_ids, vec![existing_id]);
    }
}

use atrium_shared::slot::TimeSlot;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Canceled,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Wallet,
    Card,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemType {
    Venue,
    Equipment,
    Tutorial,
}

/// What a booking reserves. The variant carries exactly the fields that make
/// sense for its item type, so a venue booking without a slot (or an equipment
/// booking with one) cannot be constructed at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "item_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingSubject {
    Venue { venue_id: Uuid, slot: TimeSlot },
    Equipment { equipment_ids: Vec<Uuid> },
    Tutorial { tutorial_id: Uuid },
}

impl BookingSubject {
    pub fn item_type(&self) -> ItemType {
        match self {
            BookingSubject::Venue { .. } => ItemType::Venue,
            BookingSubject::Equipment { .. } => ItemType::Equipment,
            BookingSubject::Tutorial { .. } => ItemType::Tutorial,
        }
    }

    /// Every resource this subject occupies for its date.
    pub fn resource_ids(&self) -> Vec<Uuid> {
        match self {
            BookingSubject::Venue { venue_id, .. } => vec![*venue_id],
            BookingSubject::Equipment { equipment_ids } => equipment_ids.clone(),
            BookingSubject::Tutorial { tutorial_id } => vec![*tutorial_id],
        }
    }

    /// The booked window, or `None` for whole-day items.
    pub fn slot(&self) -> Option<&TimeSlot> {
        match self {
            BookingSubject::Venue { slot, .. } => Some(slot),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub owner_id: String,
    #[serde(flatten)]
    pub subject: BookingSubject,
    pub date: NaiveDate,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<PaymentMethod>,
    pub subtotal_cents: i64,
    pub discount_code: Option<String>,
    pub discount_cents: i64,
    pub total_cents: i64,
    /// Count of definitive payment attempts; keys card intent idempotency.
    pub payment_attempts: u32,
    pub notes: Option<String>,
    /// Append-only audit facts (expiration reason, payment references).
    /// Never read for control flow.
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(owner_id: String, subject: BookingSubject, date: NaiveDate, subtotal_cents: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            subject,
            date,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: None,
            subtotal_cents,
            discount_code: None,
            discount_cents: 0,
            total_cents: subtotal_cents,
            payment_attempts: 0,
            notes: None,
            metadata: Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The lifecycle tuple all transition decisions are made against.
    pub fn state(&self) -> (BookingStatus, PaymentStatus) {
        (self.status, self.payment_status)
    }

    pub fn apply_state(&mut self, next: (BookingStatus, PaymentStatus)) {
        self.status = next.0;
        self.payment_status = next.1;
        self.updated_at = Utc::now();
    }

    /// Record a discount and recompute the total. Recomputing from the
    /// subtotal keeps the call idempotent; the total never goes negative.
    pub fn apply_discount(&mut self, code: &str, discount_cents: i64) {
        self.discount_code = Some(code.to_string());
        self.discount_cents = discount_cents;
        self.total_cents = (self.subtotal_cents - discount_cents).max(0);
        self.updated_at = Utc::now();
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    /// Append an audit fact to the booking's metadata.
    pub fn annotate(&mut self, key: &str, value: Value) {
        self.metadata.insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn venue_subject() -> BookingSubject {
        BookingSubject::Venue {
            venue_id: Uuid::new_v4(),
            slot: TimeSlot::parse("09:00", "11:00").unwrap(),
        }
    }

    #[test]
    fn test_new_booking_defaults() {
        let booking = Booking::new(
            "user-1".to_string(),
            venue_subject(),
            NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            10_000,
        );

        assert_eq!(booking.state(), (BookingStatus::Pending, PaymentStatus::Pending));
        assert_eq!(booking.total_cents, 10_000);
        assert_eq!(booking.discount_cents, 0);
        assert_eq!(booking.payment_attempts, 0);
        assert!(booking.is_active());
    }

    #[test]
    fn test_apply_discount_is_idempotent_and_clamped() {
        let mut booking = Booking::new(
            "user-1".to_string(),
            venue_subject(),
            NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            10_000,
        );

        booking.apply_discount("SAVE20", 2_000);
        assert_eq!(booking.total_cents, 8_000);

        // Re-applying recomputes from the subtotal, it does not stack.
        booking.apply_discount("SAVE20", 2_000);
        assert_eq!(booking.total_cents, 8_000);

        booking.apply_discount("HUGE", 50_000);
        assert_eq!(booking.total_cents, 0);
    }

    #[test]
    fn test_subject_tag_serialization() {
        let json = serde_json::to_value(venue_subject()).unwrap();
        assert_eq!(json["item_type"], "VENUE");
        assert_eq!(json["slot"]["start"], "09:00");

        let tutorial = BookingSubject::Tutorial {
            tutorial_id: Uuid::new_v4(),
        };
        let json = serde_json::to_value(&tutorial).unwrap();
        assert_eq!(json["item_type"], "TUTORIAL");
        assert!(json.get("slot").is_none());
    }

    #[test]
    fn test_booking_json_flattens_subject() {
        let booking = Booking::new(
            "user-1".to_string(),
            venue_subject(),
            NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            10_000,
        );

        let json = serde_json::to_value(&booking).unwrap();
        assert_eq!(json["item_type"], "VENUE");
        assert_eq!(json["status"], "PENDING");
        assert_eq!(json["payment_status"], "PENDING");

        let back: Booking = serde_json::from_value(json).unwrap();
        assert_eq!(back, booking);
    }

    #[test]
    fn test_annotate_appends() {
        let mut booking = Booking::new(
            "user-1".to_string(),
            venue_subject(),
            NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            10_000,
        );

        booking.annotate("expiration_reason", serde_json::json!("payment_deadline_elapsed"));
        booking.annotate("payment_reference", serde_json::json!("pi_abc_1"));
        assert_eq!(booking.metadata.len(), 2);
    }

    #[test]
    fn test_resource_ids_per_subject() {
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let subject = BookingSubject::Equipment {
            equipment_ids: ids.clone(),
        };
        assert_eq!(subject.resource_ids(), ids);
        assert_eq!(subject.item_type(), ItemType::Equipment);
        assert!(subject.slot().is_none());
    }
}

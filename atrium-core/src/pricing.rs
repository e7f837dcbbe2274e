use crate::booking::BookingSubject;
use serde::{Deserialize, Serialize};

/// Flat rate card standing in for the catalog service's pricing feed.
///
/// Venues price by the hour (pro-rated to the minute), equipment per piece
/// per day, tutorials per session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBook {
    pub venue_hour_cents: i64,
    pub equipment_day_cents: i64,
    pub tutorial_session_cents: i64,
}

impl Default for PriceBook {
    fn default() -> Self {
        Self {
            venue_hour_cents: 5_000,
            equipment_day_cents: 2_500,
            tutorial_session_cents: 8_000,
        }
    }
}

impl PriceBook {
    /// Subtotal for a subject in base-currency cents.
    pub fn quote(&self, subject: &BookingSubject) -> i64 {
        match subject {
            BookingSubject::Venue { slot, .. } => {
                self.venue_hour_cents * slot.duration_minutes() as i64 / 60
            }
            BookingSubject::Equipment { equipment_ids } => {
                self.equipment_day_cents * equipment_ids.len() as i64
            }
            BookingSubject::Tutorial { .. } => self.tutorial_session_cents,
        }
    }
}

pub mod money;
pub mod pii;
pub mod slot;

pub use money::{Cents, RateTable};
pub use slot::{SlotError, SlotTime, TimeSlot};

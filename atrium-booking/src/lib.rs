pub mod availability;
pub mod expiration;
pub mod lifecycle;
pub mod transitions;

pub use availability::{Availability, AvailabilityChecker};
pub use expiration::{ExpirationScheduler, ExpirationSweeper, SweepReport};
pub use lifecycle::{LifecycleError, LifecycleManager};
pub use transitions::{next, LifecycleEvent, LifecycleState, TransitionError};

use atrium_core::booking::{BookingStatus, PaymentStatus};
use serde::{Deserialize, Serialize};

pub type LifecycleState = (BookingStatus, PaymentStatus);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleEvent {
    PaymentSucceeded,
    PaymentFailed,
    Expire,
    Cancel,
    CancelWithRefund,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("illegal transition: {event:?} from ({from_status:?}, {from_payment:?})")]
pub struct TransitionError {
    pub from_status: BookingStatus,
    pub from_payment: PaymentStatus,
    pub event: LifecycleEvent,
}

/// The complete legal transition table over `(status, payment_status)`.
///
/// Anything not listed is rejected; callers never coerce a booking into a
/// tuple this function would not produce.
///
/// - A successful payment confirms the booking, whether it is the first
///   attempt or a retry after a failure.
/// - A failed attempt keeps the booking pending and payable.
/// - Expiration and cancellation of a pending booking preserve the payment
///   status; money never moved, so there is nothing to refund.
/// - A paid booking leaves only through an explicit refunding cancel or
///   completion. `Canceled` and `Completed` are terminal.
pub fn next(state: LifecycleState, event: LifecycleEvent) -> Result<LifecycleState, TransitionError> {
    use BookingStatus::*;
    use LifecycleEvent as Ev;
    use PaymentStatus as Pay;

    let (status, payment) = state;
    let next = match (status, payment, event) {
        (Pending, Pay::Pending | Pay::Failed, Ev::PaymentSucceeded) => (Confirmed, Pay::Paid),
        (Pending, Pay::Pending | Pay::Failed, Ev::PaymentFailed) => (Pending, Pay::Failed),
        (Pending, Pay::Pending | Pay::Failed, Ev::Expire) => (Canceled, payment),
        (Pending, Pay::Pending | Pay::Failed, Ev::Cancel) => (Canceled, payment),
        (Confirmed, Pay::Paid, Ev::CancelWithRefund) => (Canceled, Pay::Refunded),
        (Confirmed, Pay::Paid, Ev::Complete) => (Completed, Pay::Paid),
        _ => {
            return Err(TransitionError {
                from_status: status,
                from_payment: payment,
                event,
            })
        }
    };
    Ok(next)
}

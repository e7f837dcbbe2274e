pub mod booking;
pub mod discount;
pub mod payment;
pub mod pricing;
pub mod store;

pub use booking::{Booking, BookingStatus, BookingSubject, ItemType, PaymentMethod, PaymentStatus};
pub use discount::{DiscountCode, DiscountKind};
pub use payment::{CardDetails, CardError, CardIntent, CardIntentStatus, CardProcessor, Receipt};
pub use pricing::PriceBook;
pub use store::{BookingFilter, BookingStore, DebitOutcome, DiscountStore, StoreError, WalletStore};

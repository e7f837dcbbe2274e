pub mod discounts;
pub mod orchestrator;

pub use discounts::{default_codes, evaluate, DiscountError, DiscountRejection, DiscountService};
pub use orchestrator::{PaymentError, PaymentOrchestrator, SimCardProcessor};

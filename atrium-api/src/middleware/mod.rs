pub mod auth;

pub use auth::{require_auth, Claims, ADMIN_ROLE, CUSTOMER_ROLE};

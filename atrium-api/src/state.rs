use std::sync::Arc;

use atrium_booking::availability::AvailabilityChecker;
use atrium_booking::lifecycle::LifecycleManager;
use atrium_core::pricing::PriceBook;
use atrium_core::store::{BookingStore, DiscountStore, WalletStore};
use atrium_payment::{default_codes, DiscountService, PaymentOrchestrator, SimCardProcessor};
use atrium_shared::money::RateTable;
use atrium_store::app_config::Config;
use atrium_store::MemoryStore;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub bookings: Arc<dyn BookingStore>,
    pub wallets: Arc<dyn WalletStore>,
    pub lifecycle: LifecycleManager,
    pub availability: AvailabilityChecker,
    pub discounts: DiscountService,
    pub payments: Arc<PaymentOrchestrator>,
    pub pricing: PriceBook,
    pub rates: RateTable,
    pub auth: AuthConfig,
}

impl AppState {
    /// Wire every component against one in-memory store and seed the
    /// starter discount codes.
    pub async fn from_config(config: &Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        for code in default_codes() {
            // Seeding a fresh store cannot collide.
            let _ = store.upsert(code).await;
        }

        let processor = Arc::new(SimCardProcessor::new());
        let discounts = DiscountService::new(store.clone());
        let payments = Arc::new(PaymentOrchestrator::new(
            store.clone(),
            store.clone(),
            discounts.clone(),
            processor,
            config.rates.base_currency.clone(),
            std::time::Duration::from_millis(config.booking_rules.card_timeout_ms),
        ));

        Self {
            bookings: store.clone(),
            wallets: store.clone(),
            lifecycle: LifecycleManager::new(store.clone()),
            availability: AvailabilityChecker::new(store),
            discounts,
            payments,
            pricing: config.pricing.clone(),
            rates: config.rates.clone(),
            auth: AuthConfig {
                secret: config.auth.jwt_secret.clone(),
                expiration: config.auth.jwt_expiration_seconds,
            },
        }
    }
}

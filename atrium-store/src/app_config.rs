use atrium_core::pricing::PriceBook;
use atrium_shared::money::RateTable;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub booking_rules: BookingRules,
    #[serde(default)]
    pub pricing: PriceBook,
    #[serde(default)]
    pub rates: RateTable,
    #[serde(default)]
    pub processor: ProcessorConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BookingRules {
    /// How long an unpaid pending booking may live before the sweeper
    /// cancels it.
    #[serde(default = "default_payment_deadline_hours")]
    pub payment_deadline_hours: u64,

    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,

    /// Upper bound on a card confirmation round-trip before the outcome is
    /// treated as unknown.
    #[serde(default = "default_card_timeout_ms")]
    pub card_timeout_ms: u64,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            payment_deadline_hours: default_payment_deadline_hours(),
            sweep_interval_seconds: default_sweep_interval_seconds(),
            card_timeout_ms: default_card_timeout_ms(),
        }
    }
}

fn default_payment_deadline_hours() -> u64 {
    24
}

fn default_sweep_interval_seconds() -> u64 {
    3600
}

fn default_card_timeout_ms() -> u64 {
    10_000
}

/// Card provider credentials. Opaque to this service; the simulated provider
/// ignores them.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProcessorConfig {
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub api_key: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Add in the current environment file (optional)
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add in a local configuration file that stays out of git
            .add_source(config::File::with_name("config/local").required(false))
            // Environment overrides, e.g. ATRIUM__SERVER__PORT=9000
            .add_source(config::Environment::with_prefix("ATRIUM").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

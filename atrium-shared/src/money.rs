use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Monetary amounts are integer minor units of the base currency.
pub type Cents = i64;

/// Render cents as a human-readable decimal amount, e.g. `100.00`.
pub fn format_cents(amount: Cents) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Fixed conversion table for presentation-only currency display.
///
/// The ledger stays in the base currency; conversions are floor-rounded and
/// never written back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateTable {
    pub base_currency: String,
    #[serde(default)]
    pub rates: HashMap<String, f64>,
}

impl Default for RateTable {
    fn default() -> Self {
        Self {
            base_currency: "USD".to_string(),
            rates: HashMap::new(),
        }
    }
}

impl RateTable {
    /// Convert base-currency cents into `target` currency cents.
    ///
    /// Returns `None` for currencies the table does not know.
    pub fn convert(&self, amount: Cents, target: &str) -> Option<Cents> {
        if target.eq_ignore_ascii_case(&self.base_currency) {
            return Some(amount);
        }
        let rate = self.rates.get(&target.to_ascii_uppercase())?;
        Some((amount as f64 * rate).floor() as Cents)
    }

    pub fn knows(&self, currency: &str) -> bool {
        currency.eq_ignore_ascii_case(&self.base_currency)
            || self.rates.contains_key(&currency.to_ascii_uppercase())
    }
}

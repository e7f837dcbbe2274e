use crate::booking::ItemType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountKind {
    Fixed { amount_cents: i64 },
    Percent { percent: u32 },
}

/// A redeemable discount code as stored. Validity checks live in
/// `atrium-payment`; this record only carries the facts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountCode {
    pub code: String,
    #[serde(flatten)]
    pub kind: DiscountKind,
    pub expires_at: DateTime<Utc>,
    /// Restrict the code to one item type; `None` means any.
    pub item_scope: Option<ItemType>,
    /// Reject amounts below this subtotal.
    pub min_subtotal_cents: Option<i64>,
    /// Total redemptions allowed across all users.
    pub usage_limit: Option<u32>,
    pub used_count: u32,
    /// Whether the code may bring a total down to zero.
    pub allows_full_discount: bool,
}

impl DiscountCode {
    pub fn fixed(code: &str, amount_cents: i64, expires_at: DateTime<Utc>) -> Self {
        Self {
            code: code.to_string(),
            kind: DiscountKind::Fixed { amount_cents },
            expires_at,
            item_scope: None,
            min_subtotal_cents: None,
            usage_limit: None,
            used_count: 0,
            allows_full_discount: false,
        }
    }

    pub fn percent(code: &str, percent: u32, expires_at: DateTime<Utc>) -> Self {
        Self {
            code: code.to_string(),
            kind: DiscountKind::Percent { percent },
            expires_at,
            item_scope: None,
            min_subtotal_cents: None,
            usage_limit: None,
            used_count: 0,
            allows_full_discount: false,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        match self.usage_limit {
            Some(limit) => self.used_count >= limit,
            None => false,
        }
    }
}

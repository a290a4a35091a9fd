//! Price breakdown types.

use crate::catalog::RequirementKey;
use crate::ids::ServiceId;
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// A surcharge traced to exactly one requirement (and option, for choices).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Addon {
    /// Service the requirement belongs to
    pub service_id: ServiceId,
    /// Requirement that produced the surcharge
    pub requirement: RequirementKey,
    /// Human-readable line ("Oil type: Synthetic")
    pub label: String,
    /// Surcharge
    pub amount: Money,
}

/// Base price plus addons for one service or a whole booking.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    /// Sum of base prices (missing base prices count as zero)
    pub base: Money,
    /// Surcharges, in requirement order
    pub addons: Vec<Addon>,
    /// `base` plus every addon
    pub total: Money,
    /// At least one service has no base price and is quoted on site
    pub quote_required: bool,
}

impl PriceQuote {
    /// Builds a quote, deriving the total.
    #[must_use]
    pub fn new(base: Money, addons: Vec<Addon>, quote_required: bool) -> Self {
        let total = addons
            .iter()
            .map(|a| a.amount)
            .fold(base, Money::saturating_add);
        Self {
            base,
            addons,
            total,
            quote_required,
        }
    }

    /// Merges per-service quotes into one booking total.
    #[must_use]
    pub fn combine(quotes: impl IntoIterator<Item = Self>) -> Self {
        let mut base = Money::ZERO;
        let mut addons = Vec::new();
        let mut quote_required = false;
        for quote in quotes {
            base = base.saturating_add(quote.base);
            addons.extend(quote.addons);
            quote_required |= quote.quote_required;
        }
        Self::new(base, addons, quote_required)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;

    #[test]
    fn test_combine_sums_bases_and_addons() {
        let addon = Addon {
            service_id: ServiceId::new(1),
            requirement: RequirementKey::new("oil_type"),
            label: "Oil type: Synthetic".to_string(),
            amount: Money::from_cents(1500),
        };
        let oil = PriceQuote::new(Money::from_cents(4500), vec![addon], false);
        let inspection = PriceQuote::new(Money::ZERO, vec![], true);
        assert_eq!(oil.total, Money::from_cents(6000));

        let booking = PriceQuote::combine([oil, inspection]);
        assert_eq!(booking.total, Money::from_cents(6000));
        assert_eq!(booking.addons.len(), 1);
        assert!(booking.quote_required);
    }
}

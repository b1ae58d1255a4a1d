//! Subscription fee lookups.

use indexmap::IndexMap;

use crate::config::SubscriptionConfig;

/// Monthly fees per platform, in KRW.
#[derive(Debug, Clone)]
pub struct SubscriptionCatalog {
    fees: IndexMap<String, u32>,
    fallback_fee: u32,
}

impl SubscriptionCatalog {
    /// Builds the catalogue from configuration. Keys are normalised.
    #[must_use]
    pub fn from_config(config: &SubscriptionConfig) -> Self {
        Self {
            fees: config
                .fees
                .iter()
                .map(|(platform, fee)| (normalize_platform(platform), *fee))
                .collect(),
            fallback_fee: config.fallback_fee,
        }
    }

    /// Fee for a known platform.
    #[must_use]
    pub fn fee(&self, platform: &str) -> Option<u32> {
        self.fees.get(&normalize_platform(platform)).copied()
    }

    /// Fee for any platform; unknown ones cost the fallback fee.
    #[must_use]
    pub fn fee_or_fallback(&self, platform: &str) -> u32 {
        self.fee(platform).unwrap_or(self.fallback_fee)
    }

    /// Fee assumed for unknown platforms.
    #[must_use]
    pub const fn fallback_fee(&self) -> u32 {
        self.fallback_fee
    }

    /// Known platforms in configuration order.
    pub fn platforms(&self) -> impl Iterator<Item = &str> {
        self.fees.keys().map(String::as_str)
    }
}

/// Canonical form of a platform key.
#[must_use]
pub fn normalize_platform(platform: &str) -> String {
    platform.trim().to_lowercase()
}

/// Renders an amount in KRW with thousands separators, e.g. `17,000원`.
#[must_use]
pub fn format_won(amount: u64) -> String {
    let digits = amount.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped.push('원');
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> SubscriptionCatalog {
        SubscriptionCatalog::from_config(&SubscriptionConfig::default())
    }

    #[test]
    fn known_and_unknown_fees() {
        let catalog = catalog();
        assert_eq!(catalog.fee("netflix"), Some(17_000));
        assert_eq!(catalog.fee("  Netflix "), Some(17_000));
        assert_eq!(catalog.fee("hulu"), None);
        assert_eq!(catalog.fee_or_fallback("hulu"), 15_000);
        assert_eq!(catalog.fallback_fee(), 15_000);
    }

    #[test]
    fn config_keys_are_normalised() {
        let mut config = SubscriptionConfig::default();
        config.fees.insert("Coupang Play ".to_string(), 7_890);
        let catalog = SubscriptionCatalog::from_config(&config);
        assert_eq!(catalog.fee("coupang play"), Some(7_890));
        assert_eq!(catalog.platforms().last(), Some("coupang play"));
    }

    #[test]
    fn platforms_keep_order() {
        let catalog = catalog();
        let platforms: Vec<_> = catalog.platforms().collect();
        assert_eq!(platforms[0], "netflix");
        assert_eq!(platforms.len(), 7);
    }

    #[test]
    fn won_formatting() {
        assert_eq!(format_won(0), "0원");
        assert_eq!(format_won(999), "999원");
        assert_eq!(format_won(8_500), "8,500원");
        assert_eq!(format_won(17_000), "17,000원");
        assert_eq!(format_won(1_234_567), "1,234,567원");
    }
}

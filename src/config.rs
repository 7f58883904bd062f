//! Ledger configuration.

use rust_decimal::Decimal;

use crate::domain::{DEFAULT_BASE_CURRENCY, DEFAULT_FEE_RATE, DEFAULT_NOTIFICATION_CAPACITY, RateTable};

/// Tunables shared by every ledger session.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Currency balances are kept in.
    pub base_currency: String,
    /// Fraction of the base amount charged on every send.
    pub fee_rate: Decimal,
    /// Maximum number of notifications kept per account.
    pub notification_capacity: usize,
    /// Rate-to-base table used for conversions.
    pub rates: RateTable,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            base_currency: DEFAULT_BASE_CURRENCY.to_string(),
            fee_rate: DEFAULT_FEE_RATE,
            notification_capacity: DEFAULT_NOTIFICATION_CAPACITY,
            rates: RateTable::default(),
        }
    }
}

impl LedgerConfig {
    /// Load configuration from `SWIFTSEND_*` environment variables,
    /// falling back to defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(rate) = lookup("SWIFTSEND_FEE_RATE") {
            if let Ok(rate) = rate.trim().parse() {
                config.fee_rate = rate;
            }
        }

        if let Some(capacity) = lookup("SWIFTSEND_NOTIFICATION_CAPACITY") {
            if let Ok(capacity) = capacity.trim().parse() {
                config.notification_capacity = capacity;
            }
        }

        if let Some(base) = lookup("SWIFTSEND_BASE_CURRENCY") {
            let base = base.trim().to_uppercase();
            if !base.is_empty() && base != config.base_currency {
                // The bundled table is quoted against USD; a different base
                // starts from an empty table.
                config.rates = RateTable::new(base.clone());
                config.base_currency = base;
            }
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.base_currency.is_empty() {
            return Err("Base currency cannot be empty".to_string());
        }

        if self.rates.base() != self.base_currency {
            return Err(format!(
                "Rate table is quoted against {} but base currency is {}",
                self.rates.base(),
                self.base_currency
            ));
        }

        if self.fee_rate < Decimal::ZERO || self.fee_rate >= Decimal::ONE {
            return Err("Fee rate must be in [0, 1)".to_string());
        }

        if self.notification_capacity == 0 {
            return Err("Notification capacity must be at least 1".to_string());
        }

        if self.rates.iter().any(|(_, rate)| rate <= Decimal::ZERO) {
            return Err("FX rates must be positive".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rust_decimal_macros::dec;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = LedgerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.fee_rate, dec!(0.0125));
        assert_eq!(config.notification_capacity, 25);
        assert_eq!(config.base_currency, "USD");
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = LedgerConfig::from_lookup(lookup_from(&[
            ("SWIFTSEND_FEE_RATE", "0.02"),
            ("SWIFTSEND_NOTIFICATION_CAPACITY", "10"),
        ]));
        assert_eq!(config.fee_rate, dec!(0.02));
        assert_eq!(config.notification_capacity, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_ignores_garbage() {
        let config = LedgerConfig::from_lookup(lookup_from(&[
            ("SWIFTSEND_FEE_RATE", "lots"),
            ("SWIFTSEND_NOTIFICATION_CAPACITY", "-3"),
        ]));
        assert_eq!(config.fee_rate, DEFAULT_FEE_RATE);
        assert_eq!(config.notification_capacity, DEFAULT_NOTIFICATION_CAPACITY);
    }

    #[test]
    fn test_other_base_currency_resets_rates() {
        let config =
            LedgerConfig::from_lookup(lookup_from(&[("SWIFTSEND_BASE_CURRENCY", "eur")]));
        assert_eq!(config.base_currency, "EUR");
        assert_eq!(config.rates.base(), "EUR");
        assert_eq!(config.rates.get("GBP"), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = LedgerConfig::default();
        config.fee_rate = dec!(1.5);
        assert!(config.validate().is_err());

        let mut config = LedgerConfig::default();
        config.notification_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = LedgerConfig::default();
        config.base_currency = "EUR".into();
        assert!(config.validate().is_err());

        let mut config = LedgerConfig::default();
        config.rates.set_rate("KES", dec!(0));
        assert!(config.validate().is_err());
    }
}

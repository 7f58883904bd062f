use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Amount, LedgerError};

/// Transfer fee charged on every send, applied to the base-currency amount.
pub const DEFAULT_FEE_RATE: Decimal = Decimal::from_parts(125, 0, 0, false, 4); // 1.25%

pub const DEFAULT_BASE_CURRENCY: &str = "USD";

/// Static FX table mapping a currency code to its rate-to-base multiplier.
///
/// Unknown codes convert at 1.0, the same as the base currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTable {
    base: String,
    rates: BTreeMap<String, Decimal>,
}

impl RateTable {
    /// Create a table for the given base currency. The base always maps to 1.
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into().to_uppercase();
        let mut rates = BTreeMap::new();
        rates.insert(base.clone(), Decimal::ONE);
        Self { base, rates }
    }

    pub fn with_rate(mut self, code: impl Into<String>, rate: Decimal) -> Self {
        self.set_rate(code, rate);
        self
    }

    pub fn set_rate(&mut self, code: impl Into<String>, rate: Decimal) {
        let code = code.into().to_uppercase();
        if code != self.base {
            self.rates.insert(code, rate);
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Rate-to-base for a currency, if it is listed.
    pub fn get(&self, code: &str) -> Option<Decimal> {
        self.rates.get(&code.to_uppercase()).copied()
    }

    /// Rate-to-base for a currency, 1.0 for unknown codes.
    pub fn rate(&self, code: &str) -> Decimal {
        self.get(code).unwrap_or(Decimal::ONE)
    }

    pub fn convert_to_base(&self, amount: Amount, code: &str) -> Result<Amount, LedgerError> {
        amount
            .checked_mul(self.rate(code))
            .ok_or_else(LedgerError::amount_too_large)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.rates.iter().map(|(code, rate)| (code.as_str(), *rate))
    }
}

impl Default for RateTable {
    fn default() -> Self {
        RateTable::new(DEFAULT_BASE_CURRENCY)
            .with_rate("EUR", Decimal::new(108, 2))
            .with_rate("GBP", Decimal::new(127, 2))
            .with_rate("KES", Decimal::new(78, 4))
            .with_rate("PHP", Decimal::new(18, 3))
    }
}

/// Convert using the default rate table.
pub fn convert_to_base(amount: Amount, code: &str) -> Result<Amount, LedgerError> {
    RateTable::default().convert_to_base(amount, code)
}

/// Fee owed on a base-currency amount.
pub fn compute_fee(base_amount: Amount, fee_rate: Decimal) -> Result<Amount, LedgerError> {
    base_amount
        .checked_mul(fee_rate)
        .ok_or_else(LedgerError::amount_too_large)
}

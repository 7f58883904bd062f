use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AccountId, Amount, BeneficiaryId};

pub type TransactionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Money left the account (amount + fee debited)
    Sent,
    /// Money arrived in the account
    Received,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Sent => "sent",
            Direction::Received => "received",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sent" => Some(Direction::Sent),
            "received" => Some(Direction::Received),
            _ => None,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transactions complete synchronously; there is no pending/settling state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Completed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A transaction is the permanent audit record of one balance change.
/// Records are never edited; the ledger only ever prepends new ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    /// Monotonically increasing per account, starting at 1
    pub sequence: u64,
    pub account_id: AccountId,
    pub direction: Direction,
    pub counterpart: String,
    /// Set when the money went to a saved beneficiary
    pub beneficiary_id: Option<BeneficiaryId>,
    /// Amount in the transaction currency (always positive)
    pub amount: Amount,
    pub currency: String,
    /// Rate-to-base applied at the time of the transaction
    pub fx_rate: Decimal,
    /// Fee in the base currency, zero for receipts
    pub fee: Amount,
    pub note: Option<String>,
    pub status: TransactionStatus,
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    /// Amount converted to the account's base currency. Saturates instead
    /// of overflowing on records that did not come through the engine.
    pub fn base_amount(&self) -> Amount {
        self.amount.saturating_mul(self.fx_rate)
    }

    /// Signed effect on the account balance.
    pub fn balance_delta(&self) -> Amount {
        match self.direction {
            Direction::Sent => -(self.base_amount().saturating_add(self.fee)),
            Direction::Received => self.base_amount(),
        }
    }

    pub fn is_sent(&self) -> bool {
        self.direction == Direction::Sent
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn sample(direction: Direction, amount: Amount, fx_rate: Decimal, fee: Amount) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            sequence: 1,
            account_id: Uuid::new_v4(),
            direction,
            counterpart: "Jamie Lee".into(),
            beneficiary_id: None,
            amount,
            currency: "EUR".into(),
            fx_rate,
            fee,
            note: None,
            status: TransactionStatus::Completed,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_direction_roundtrip() {
        for direction in [Direction::Sent, Direction::Received] {
            assert_eq!(Direction::from_str(direction.as_str()), Some(direction));
        }
        assert_eq!(Direction::from_str("SENT"), Some(Direction::Sent));
        assert_eq!(Direction::from_str("pending"), None);
    }

    #[test]
    fn test_balance_delta_for_send_includes_fee() {
        let tx = sample(Direction::Sent, dec!(100), dec!(1.08), dec!(1.35));
        assert_eq!(tx.base_amount(), dec!(108));
        assert_eq!(tx.balance_delta(), dec!(-109.35));
        assert!(tx.is_sent());
    }

    #[test]
    fn test_balance_delta_for_receipt() {
        let tx = sample(Direction::Received, dec!(100), dec!(1.08), dec!(0));
        assert_eq!(tx.balance_delta(), dec!(108));
    }

    #[test]
    fn test_serializes_direction_lowercase() {
        let tx = sample(Direction::Received, dec!(1), dec!(1), dec!(0));
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["direction"], "received");
        assert_eq!(json["status"], "completed");
    }
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{validate_email, validate_phone, Amount, KycStatus, LedgerError};

pub type AccountId = Uuid;

/// The single local user whose money the ledger moves.
///
/// `balance` is only ever changed by `LedgerEngine`; everything else reads it
/// through `balance()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub(super) balance: Amount,
    /// Balance the account started from; the integrity check replays
    /// history on top of it.
    pub opening_balance: Amount,
    pub base_currency: String,
    #[serde(default)]
    pub kyc_status: KycStatus,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(
        name: impl Into<String>,
        base_currency: impl Into<String>,
        opening_balance: Amount,
    ) -> Result<Self, LedgerError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(LedgerError::validation("account name required"));
        }
        if opening_balance < Decimal::ZERO {
            return Err(LedgerError::validation("opening balance cannot be negative"));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            name,
            email: None,
            phone: None,
            balance: opening_balance,
            opening_balance,
            base_currency: base_currency.into().to_uppercase(),
            kyc_status: KycStatus::Pending,
            created_at: Utc::now(),
        })
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Result<Self, LedgerError> {
        let email = email.into().trim().to_string();
        if !validate_email(&email) {
            return Err(LedgerError::validation("invalid email"));
        }
        self.email = Some(email);
        Ok(self)
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Result<Self, LedgerError> {
        let phone = phone.into().trim().to_string();
        if !validate_phone(&phone) {
            return Err(LedgerError::validation("invalid phone number"));
        }
        self.phone = Some(phone);
        Ok(self)
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    /// Matches either the account id or, case-insensitively, its email.
    pub fn matches(&self, id_or_email: &str) -> bool {
        let needle = id_or_email.trim();
        self.id.to_string() == needle
            || self
                .email
                .as_deref()
                .is_some_and(|email| email.eq_ignore_ascii_case(needle))
    }
}

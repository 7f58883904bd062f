use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::required;
use super::{AccountId, LedgerError};

pub type BeneficiaryId = Uuid;

/// A saved transfer recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beneficiary {
    pub id: BeneficiaryId,
    pub account_id: AccountId,
    pub name: String,
    pub country: String,
    /// Payout method, e.g. "Bank transfer" or "Mobile wallet"
    pub method: String,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

impl Beneficiary {
    pub fn new(
        account_id: AccountId,
        name: &str,
        country: &str,
        method: &str,
    ) -> Result<Self, LedgerError> {
        Ok(Self {
            id: Uuid::new_v4(),
            account_id,
            name: required(name, "beneficiary name required")?,
            country: required(country, "beneficiary country required")?,
            method: required(method, "beneficiary method required")?,
            verified: false,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_beneficiary_is_unverified() {
        let beneficiary =
            Beneficiary::new(Uuid::new_v4(), " Jamie Lee ", "Kenya", "Mobile wallet").unwrap();
        assert_eq!(beneficiary.name, "Jamie Lee");
        assert!(!beneficiary.verified);
    }

    #[test]
    fn test_all_fields_required() {
        let owner = Uuid::new_v4();
        assert_eq!(
            Beneficiary::new(owner, "", "Kenya", "Bank").unwrap_err(),
            LedgerError::validation("beneficiary name required")
        );
        assert_eq!(
            Beneficiary::new(owner, "Jamie", " ", "Bank").unwrap_err(),
            LedgerError::validation("beneficiary country required")
        );
        assert_eq!(
            Beneficiary::new(owner, "Jamie", "Kenya", "").unwrap_err(),
            LedgerError::validation("beneficiary method required")
        );
    }
}

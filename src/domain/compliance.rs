use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::required;
use super::{AccountId, Amount, LedgerError, Transaction, TransactionId};

pub type KycSubmissionId = Uuid;
pub type FraudAlertId = Uuid;

/// Identity verification state, both of a submission and of the account
/// that filed it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KycStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl KycStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            KycStatus::Pending => "pending",
            KycStatus::Approved => "approved",
            KycStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(KycStatus::Pending),
            "approved" => Some(KycStatus::Approved),
            "rejected" => Some(KycStatus::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for KycStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KycSubmission {
    pub id: KycSubmissionId,
    pub account_id: AccountId,
    /// e.g. "passport", "national id"
    pub document_type: String,
    pub document_number: String,
    pub status: KycStatus,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl KycSubmission {
    pub fn new(
        account_id: AccountId,
        document_type: &str,
        document_number: &str,
    ) -> Result<Self, LedgerError> {
        Ok(Self {
            id: Uuid::new_v4(),
            account_id,
            document_type: required(document_type, "document type required")?,
            document_number: required(document_number, "document number required")?,
            status: KycStatus::Pending,
            submitted_at: Utc::now(),
            reviewed_at: None,
        })
    }

    /// Record a review decision. Only pending submissions can be reviewed,
    /// and the decision must be approve or reject.
    pub fn review(&mut self, decision: KycStatus) -> Result<(), LedgerError> {
        if decision == KycStatus::Pending {
            return Err(LedgerError::validation("review must approve or reject"));
        }
        if self.status != KycStatus::Pending {
            return Err(LedgerError::validation(format!(
                "KYC submission already {}",
                self.status
            )));
        }
        self.status = decision;
        self.reviewed_at = Some(Utc::now());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FraudAlertStatus {
    PendingReview,
    UnderInvestigation,
    Resolved,
}

impl FraudAlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FraudAlertStatus::PendingReview => "pending_review",
            FraudAlertStatus::UnderInvestigation => "under_investigation",
            FraudAlertStatus::Resolved => "resolved",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "pending_review" => Some(FraudAlertStatus::PendingReview),
            "under_investigation" => Some(FraudAlertStatus::UnderInvestigation),
            "resolved" => Some(FraudAlertStatus::Resolved),
            _ => None,
        }
    }

    /// Alerts move forward only: pending review may go to investigation or
    /// straight to resolved, investigation may only be resolved.
    pub fn can_transition_to(&self, next: FraudAlertStatus) -> bool {
        matches!(
            (self, next),
            (FraudAlertStatus::PendingReview, FraudAlertStatus::UnderInvestigation)
                | (FraudAlertStatus::PendingReview, FraudAlertStatus::Resolved)
                | (FraudAlertStatus::UnderInvestigation, FraudAlertStatus::Resolved)
        )
    }
}

impl std::fmt::Display for FraudAlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A transaction flagged for review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudAlert {
    pub id: FraudAlertId,
    pub account_id: AccountId,
    pub transaction_id: TransactionId,
    pub alert_type: String,
    pub description: String,
    /// 0 to 100; 70 and above counts as high risk
    pub risk_score: u8,
    pub amount: Amount,
    pub currency: String,
    pub status: FraudAlertStatus,
    pub flagged_at: DateTime<Utc>,
}

pub const HIGH_RISK_SCORE: u8 = 70;

impl FraudAlert {
    pub fn for_transaction(
        transaction: &Transaction,
        alert_type: &str,
        description: &str,
        risk_score: u8,
    ) -> Result<Self, LedgerError> {
        if risk_score > 100 {
            return Err(LedgerError::validation("risk score must be between 0 and 100"));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            account_id: transaction.account_id,
            transaction_id: transaction.id,
            alert_type: required(alert_type, "alert type required")?,
            description: required(description, "description required")?,
            risk_score,
            amount: transaction.amount,
            currency: transaction.currency.clone(),
            status: FraudAlertStatus::PendingReview,
            flagged_at: Utc::now(),
        })
    }

    pub fn is_active(&self) -> bool {
        self.status != FraudAlertStatus::Resolved
    }

    pub fn is_high_risk(&self) -> bool {
        self.risk_score >= HIGH_RISK_SCORE
    }

    pub fn transition(&mut self, next: FraudAlertStatus) -> Result<(), LedgerError> {
        if !self.status.can_transition_to(next) {
            return Err(LedgerError::validation(format!(
                "cannot move fraud alert from {} to {}",
                self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }
}

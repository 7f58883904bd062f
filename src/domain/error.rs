use thiserror::Error;

use super::Amount;

/// Failures raised by ledger operations. All of them are recoverable by the
/// caller and leave the ledger untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: Amount, required: Amount },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
}

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation(message.into())
    }

    pub fn invalid_amount() -> Self {
        Self::validation("invalid amount")
    }

    /// An amount whose conversion, fee or resulting balance exceeds what
    /// `Amount` can represent.
    pub fn amount_too_large() -> Self {
        Self::validation("amount too large")
    }

    pub fn recipient_required() -> Self {
        Self::validation("recipient required")
    }

    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        LedgerError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

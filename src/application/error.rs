use thiserror::Error;

use crate::domain::LedgerError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Account already exists: {0}")]
    AccountAlreadyExists(String),

    #[error("Support ticket not found: {0}")]
    TicketNotFound(String),

    #[error("KYC submission not found: {0}")]
    KycSubmissionNotFound(String),

    #[error("Fraud alert not found: {0}")]
    FraudAlertNotFound(String),

    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Account {account} is kept in {found}, but the ledger is configured for {configured}")]
    CurrencyMismatch {
        account: String,
        found: String,
        configured: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl AppError {
    /// The ledger-level failure, if this error is one.
    pub fn as_ledger(&self) -> Option<&LedgerError> {
        match self {
            AppError::Ledger(err) => Some(err),
            _ => None,
        }
    }

    /// Unwrap a store failure that carries a ledger rejection, such as one
    /// raised inside `Repository::modify_record`.
    pub(crate) fn from_store(err: anyhow::Error) -> Self {
        match err.downcast::<LedgerError>() {
            Ok(err) => AppError::Ledger(err),
            Err(err) => AppError::Database(err),
        }
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::required;
use super::{validate_email, AccountId, LedgerError};

pub type TicketId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Open,
    Resolved,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::Resolved => "resolved",
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportTicket {
    pub id: TicketId,
    pub account_id: AccountId,
    pub name: String,
    pub email: String,
    pub message: String,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
}

impl SupportTicket {
    pub fn new(
        account_id: AccountId,
        name: &str,
        email: &str,
        message: &str,
    ) -> Result<Self, LedgerError> {
        let name = required(name, "name required")?;
        let email = required(email, "email required")?;
        if !validate_email(&email) {
            return Err(LedgerError::validation("invalid email"));
        }
        let message = required(message, "message required")?;

        Ok(Self {
            id: Uuid::new_v4(),
            account_id,
            name,
            email,
            message,
            status: TicketStatus::Open,
            created_at: Utc::now(),
        })
    }

    pub fn is_open(&self) -> bool {
        self.status == TicketStatus::Open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ticket_is_open() {
        let ticket = SupportTicket::new(
            Uuid::new_v4(),
            "Alex",
            "alex@swiftsend.app",
            "My transfer is missing",
        )
        .unwrap();
        assert!(ticket.is_open());
        assert_eq!(ticket.status.as_str(), "open");
    }

    #[test]
    fn test_ticket_validation() {
        let owner = Uuid::new_v4();
        assert!(SupportTicket::new(owner, "", "alex@swiftsend.app", "help").is_err());
        assert!(SupportTicket::new(owner, "Alex", "nope", "help").is_err());
        assert!(SupportTicket::new(owner, "Alex", "alex@swiftsend.app", "  ").is_err());
    }
}

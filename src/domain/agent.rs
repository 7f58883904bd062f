use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::{optional, required};
use super::{Amount, LedgerError};

pub type AgentId = Uuid;

/// Whether a cash agent is currently taking customers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Open,
    Closed,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Open => "open",
            AgentStatus::Closed => "closed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "open" => Some(AgentStatus::Open),
            "closed" => Some(AgentStatus::Closed),
            _ => None,
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Cash-in/cash-out agent. Agents are shared by every account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub city: String,
    /// Opening hours as shown to customers, e.g. "08:00-18:00"
    pub hours: Option<String>,
    pub commissions: Amount,
    pub status: AgentStatus,
    pub created_at: DateTime<Utc>,
}

impl Agent {
    pub fn new(name: &str, city: &str, hours: Option<&str>) -> Result<Self, LedgerError> {
        Ok(Self {
            id: Uuid::new_v4(),
            name: required(name, "agent name required")?,
            city: required(city, "agent city required")?,
            hours: optional(hours),
            commissions: Decimal::ZERO,
            status: AgentStatus::Open,
            created_at: Utc::now(),
        })
    }
}

/// Partial update for an agent; `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commissions: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AgentStatus>,
}

impl AgentUpdate {
    pub fn status(status: AgentStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Normalize and check the fields that are set.
    pub fn validate(mut self) -> Result<Self, LedgerError> {
        if let Some(name) = self.name.take() {
            self.name = Some(required(&name, "agent name required")?);
        }
        if let Some(city) = self.city.take() {
            self.city = Some(required(&city, "agent city required")?);
        }
        if self.commissions.is_some_and(|c| c < Decimal::ZERO) {
            return Err(LedgerError::validation("commissions cannot be negative"));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_new_agent_is_open() {
        let agent = Agent::new("Mama Njeri Shop", "Nairobi", Some(" 08:00-18:00 ")).unwrap();
        assert_eq!(agent.status, AgentStatus::Open);
        assert_eq!(agent.hours.as_deref(), Some("08:00-18:00"));
        assert_eq!(agent.commissions, dec!(0));
        assert!(Agent::new("", "Nairobi", None).is_err());
    }

    #[test]
    fn test_update_validation() {
        assert!(AgentUpdate::default().is_empty());
        assert!(!AgentUpdate::status(AgentStatus::Closed).is_empty());

        let update = AgentUpdate {
            city: Some("  Mombasa ".into()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(update.city.as_deref(), Some("Mombasa"));

        let negative = AgentUpdate {
            commissions: Some(dec!(-1)),
            ..Default::default()
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_update_serializes_only_set_fields() {
        let patch = serde_json::to_value(AgentUpdate::status(AgentStatus::Closed)).unwrap();
        assert_eq!(patch, serde_json::json!({ "status": "closed" }));
    }
}

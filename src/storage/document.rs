use std::collections::BTreeMap;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Named sections of the app's JSON document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Section {
    Users,
    Transactions,
    Beneficiaries,
    SupportTickets,
    Notifications,
    KycSubmissions,
    FraudAlerts,
    Agents,
}

impl Section {
    pub const ALL: [Section; 8] = [
        Section::Users,
        Section::Transactions,
        Section::Beneficiaries,
        Section::SupportTickets,
        Section::Notifications,
        Section::KycSubmissions,
        Section::FraudAlerts,
        Section::Agents,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Users => "users",
            Section::Transactions => "transactions",
            Section::Beneficiaries => "beneficiaries",
            Section::SupportTickets => "supportTickets",
            Section::Notifications => "notifications",
            Section::KycSubmissions => "kycSubmissions",
            Section::FraudAlerts => "fraudAlerts",
            Section::Agents => "agents",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Section::ALL.into_iter().find(|section| section.as_str() == s)
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The whole store as one JSON document: section name -> list of items.
pub type Document = BTreeMap<Section, Vec<Value>>;

/// Key-value collaborator the ledger persists through. Each section holds a
/// JSON array of objects identified by their `"id"` field.
///
/// Only `get` and `put` are required; the rest are derived from them.
/// Implementations that can write several sections atomically should
/// override `put_many`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All items in a section; empty when the section was never written.
    async fn get(&self, section: Section) -> Result<Vec<Value>>;

    /// Replace a section wholesale.
    async fn put(&self, section: Section, items: Vec<Value>) -> Result<()>;

    /// Replace several sections. The default is not atomic.
    async fn put_many(&self, batch: Vec<(Section, Vec<Value>)>) -> Result<()> {
        for (section, items) in batch {
            self.put(section, items).await?;
        }
        Ok(())
    }

    async fn find_by_id(&self, section: Section, id: &str) -> Result<Option<Value>> {
        Ok(self
            .get(section)
            .await?
            .into_iter()
            .find(|item| item_id(item) == Some(id)))
    }

    /// Shallow-merge `patch` into the item with the given id and return the
    /// merged item. Returns `None` (and writes nothing) when no item has
    /// that id.
    async fn upsert_by_id(&self, section: Section, id: &str, patch: Value) -> Result<Option<Value>> {
        let mut items = self.get(section).await?;
        let Some(item) = items.iter_mut().find(|item| item_id(item) == Some(id)) else {
            return Ok(None);
        };

        merge_patch(item, &patch)?;
        let merged = item.clone();
        self.put(section, items).await?;
        Ok(Some(merged))
    }

    /// Append an item to a section.
    async fn add(&self, section: Section, item: Value) -> Result<Value> {
        let mut items = self.get(section).await?;
        items.push(item.clone());
        self.put(section, items).await?;
        Ok(item)
    }

    /// Remove an item; returns whether anything was removed.
    async fn remove_by_id(&self, section: Section, id: &str) -> Result<bool> {
        let mut items = self.get(section).await?;
        let before = items.len();
        items.retain(|item| item_id(item) != Some(id));
        if items.len() == before {
            return Ok(false);
        }
        self.put(section, items).await?;
        Ok(true)
    }

    async fn document(&self) -> Result<Document> {
        let mut document = Document::new();
        for section in Section::ALL {
            document.insert(section, self.get(section).await?);
        }
        Ok(document)
    }

    /// Overwrite every section present in `document`. Sections it doesn't
    /// mention are left alone.
    async fn replace_document(&self, document: Document) -> Result<()> {
        self.put_many(document.into_iter().collect()).await
    }
}

/// The `"id"` of a stored item, when it is a string.
pub fn item_id(item: &Value) -> Option<&str> {
    item.get("id").and_then(Value::as_str)
}

/// Copy every top-level field of `patch` onto `item`.
pub fn merge_patch(item: &mut Value, patch: &Value) -> Result<()> {
    let (Some(target), Some(fields)) = (item.as_object_mut(), patch.as_object()) else {
        bail!("Both item and patch must be JSON objects");
    };
    for (key, value) in fields {
        target.insert(key.clone(), value.clone());
    }
    Ok(())
}

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{Document, DocumentStore, Section};

/// Volatile store, useful for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sections: RwLock<HashMap<Section, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing document, e.g. seed data.
    pub fn from_document(document: Document) -> Self {
        Self {
            sections: RwLock::new(document.into_iter().collect()),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, section: Section) -> Result<Vec<Value>> {
        Ok(self
            .sections
            .read()
            .await
            .get(&section)
            .cloned()
            .unwrap_or_default())
    }

    async fn put(&self, section: Section, items: Vec<Value>) -> Result<()> {
        self.sections.write().await.insert(section, items);
        Ok(())
    }

    async fn put_many(&self, batch: Vec<(Section, Vec<Value>)>) -> Result<()> {
        let mut sections = self.sections.write().await;
        sections.extend(batch);
        Ok(())
    }
}

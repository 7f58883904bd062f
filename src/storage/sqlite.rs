use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use super::{DocumentStore, Section, MIGRATION_001_INITIAL};

/// Document store backed by SQLite: one row per section, JSON text body.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new store with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let store = Self::connect(database_url).await?;
        store.migrate().await?;
        Ok(store)
    }

    fn encode(section: Section, items: &[Value]) -> Result<String> {
        serde_json::to_string(items)
            .with_context(|| format!("Failed to encode section {}", section))
    }
}

const UPSERT_SECTION: &str = r#"
    INSERT INTO sections (name, body, updated_at)
    VALUES (?, ?, ?)
    ON CONFLICT(name) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at
"#;

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn get(&self, section: Section) -> Result<Vec<Value>> {
        let row = sqlx::query("SELECT body FROM sections WHERE name = ?")
            .bind(section.as_str())
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to fetch section {}", section))?;

        match row {
            Some(row) => {
                let body: String = row.get("body");
                serde_json::from_str(&body)
                    .with_context(|| format!("Section {} is not a JSON array", section))
            }
            None => Ok(Vec::new()),
        }
    }

    async fn put(&self, section: Section, items: Vec<Value>) -> Result<()> {
        let body = Self::encode(section, &items)?;
        sqlx::query(UPSERT_SECTION)
            .bind(section.as_str())
            .bind(&body)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to save section {}", section))?;
        Ok(())
    }

    /// All sections are written in one SQLite transaction.
    async fn put_many(&self, batch: Vec<(Section, Vec<Value>)>) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        for (section, items) in &batch {
            let body = Self::encode(*section, items)?;
            sqlx::query(UPSERT_SECTION)
                .bind(section.as_str())
                .bind(&body)
                .bind(&now)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to save section {}", section))?;
        }

        tx.commit().await.context("Failed to commit transaction")?;
        debug!(sections = batch.len(), "committed section batch");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    async fn temp_store() -> Result<(SqliteStore, TempDir)> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("store.db");
        let url = format!("sqlite:{}?mode=rwc", db_path.display());
        let store = SqliteStore::init(&url).await?;
        Ok((store, temp_dir))
    }

    #[tokio::test]
    async fn test_put_and_get() -> Result<()> {
        let (store, _temp) = temp_store().await?;

        assert!(store.get(Section::Users).await?.is_empty());

        store
            .put(Section::Users, vec![json!({"id": "u1", "balance": "10.50"})])
            .await?;
        let users = store.get(Section::Users).await?;
        assert_eq!(users, vec![json!({"id": "u1", "balance": "10.50"})]);

        // Overwrite replaces the whole section
        store.put(Section::Users, vec![]).await?;
        assert!(store.get(Section::Users).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_put_many_writes_all_sections() -> Result<()> {
        let (store, _temp) = temp_store().await?;

        store
            .put_many(vec![
                (Section::Users, vec![json!({"id": "u1"})]),
                (Section::Transactions, vec![json!({"id": "t1"}), json!({"id": "t2"})]),
            ])
            .await?;

        assert_eq!(store.get(Section::Users).await?.len(), 1);
        assert_eq!(store.get(Section::Transactions).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() -> Result<()> {
        let (store, _temp) = temp_store().await?;
        store.add(Section::Users, json!({"id": "u1"})).await?;
        store.migrate().await?;
        assert_eq!(store.get(Section::Users).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_upsert_persists() -> Result<()> {
        let (store, _temp) = temp_store().await?;
        store
            .add(Section::Users, json!({"id": "u1", "name": "Alex"}))
            .await?;
        store
            .upsert_by_id(Section::Users, "u1", json!({"name": "Alex Morgan"}))
            .await?;

        let user = store.find_by_id(Section::Users, "u1").await?.unwrap();
        assert_eq!(user["name"], "Alex Morgan");
        Ok(())
    }
}

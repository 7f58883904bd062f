use std::sync::Arc;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::domain::{
    Account, AccountId, Agent, Beneficiary, FraudAlert, KycSubmission, LedgerEngine,
    SupportTicket, TicketId, TicketStatus, Transaction,
};

use super::{item_id, DocumentStore, Section};

/// Per-account notification feed as stored in the `notifications` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct NotificationLog {
    id: AccountId,
    entries: Vec<String>,
}

/// A set of section writes meant to land together.
type Batch = Vec<(Section, Vec<Value>)>;

/// A record written in the same batch as a ledger save. It replaces the
/// item with the same id, or is appended when there is none.
#[derive(Debug, Clone)]
pub struct Attached {
    section: Section,
    item: Value,
}

impl Attached {
    pub fn new<T: Serialize>(section: Section, record: &T) -> Result<Self> {
        Ok(Self {
            section,
            item: encode(record)?,
        })
    }
}

/// Typed access to ledger records on top of a `DocumentStore`.
///
/// Sections are shared by every account, so each write reads whole sections
/// and puts them back. All such read-modify-write cycles run under one
/// store-wide write lock shared by every clone of the repository.
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn DocumentStore>,
    writes: Arc<Mutex<()>>,
}

impl Repository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            writes: Arc::new(Mutex::new(())),
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    // ========================
    // Accounts
    // ========================

    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        decode_all(Section::Users, self.store.get(Section::Users).await?)
    }

    pub async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        self.store
            .find_by_id(Section::Users, &id.to_string())
            .await?
            .map(|item| decode(Section::Users, item))
            .transpose()
    }

    /// Look an account up by id or email.
    pub async fn find_account(&self, id_or_email: &str) -> Result<Option<Account>> {
        Ok(self
            .list_accounts()
            .await?
            .into_iter()
            .find(|account| account.matches(id_or_email)))
    }

    // ========================
    // Ledger state
    // ========================

    /// Transactions of one account, most recent first.
    pub async fn list_transactions(&self, account_id: AccountId) -> Result<Vec<Transaction>> {
        let mut transactions: Vec<Transaction> = decode_owned(
            Section::Transactions,
            self.store.get(Section::Transactions).await?,
            account_id,
        )?;
        transactions.sort_by(|a, b| b.sequence.cmp(&a.sequence));
        Ok(transactions)
    }

    pub async fn list_beneficiaries(&self, account_id: AccountId) -> Result<Vec<Beneficiary>> {
        decode_owned(
            Section::Beneficiaries,
            self.store.get(Section::Beneficiaries).await?,
            account_id,
        )
    }

    /// Notification feed of one account, most recent first.
    pub async fn load_notifications(&self, account_id: AccountId) -> Result<Vec<String>> {
        let log = self
            .store
            .find_by_id(Section::Notifications, &account_id.to_string())
            .await?
            .map(|item| decode::<NotificationLog>(Section::Notifications, item))
            .transpose()?;
        Ok(log.map(|log| log.entries).unwrap_or_default())
    }

    /// Load everything a ledger session needs for one account.
    pub async fn load_ledger(
        &self,
        account: Account,
        config: &crate::config::LedgerConfig,
    ) -> Result<LedgerEngine> {
        let transactions = self.list_transactions(account.id).await?;
        let beneficiaries = self.list_beneficiaries(account.id).await?;
        let notifications = self.load_notifications(account.id).await?;
        Ok(LedgerEngine::restore(
            account,
            transactions,
            beneficiaries,
            notifications,
            config,
        ))
    }

    /// Persist the engine's state in a single batch.
    pub async fn save_ledger(&self, engine: &LedgerEngine) -> Result<()> {
        self.save_ledger_with(engine, Vec::new()).await
    }

    /// Persist the engine's state together with `attached` records, all in
    /// one batch.
    pub async fn save_ledger_with(
        &self,
        engine: &LedgerEngine,
        attached: Vec<Attached>,
    ) -> Result<()> {
        let _writes = self.writes.lock().await;
        let mut batch = self.ledger_batch(engine).await?;

        for Attached { section, item } in attached {
            let index = match batch.iter().position(|(s, _)| *s == section) {
                Some(index) => index,
                None => {
                    batch.push((section, self.store.get(section).await?));
                    batch.len() - 1
                }
            };
            upsert_item(&mut batch[index].1, item);
        }

        self.commit(batch).await
    }

    /// Store a brand-new account. Returns `false`, writing nothing, when
    /// another account already uses its email.
    pub async fn create_ledger(&self, engine: &LedgerEngine) -> Result<bool> {
        let _writes = self.writes.lock().await;
        let account = engine.account();
        if let Some(email) = &account.email {
            let taken = self
                .list_accounts()
                .await?
                .iter()
                .any(|other| other.id != account.id && other.matches(email));
            if taken {
                return Ok(false);
            }
        }

        let batch = self.ledger_batch(engine).await?;
        self.commit(batch).await?;
        Ok(true)
    }

    /// Section writes that bring the store in line with `engine`: the
    /// account record, its transactions, beneficiaries and notifications.
    /// Records of other accounts are carried over untouched. Callers hold
    /// the write lock.
    async fn ledger_batch(&self, engine: &LedgerEngine) -> Result<Batch> {
        let account = engine.account();
        let account_key = account.id.to_string();

        let mut users = self.store.get(Section::Users).await?;
        upsert_item(&mut users, encode(account)?);

        let transactions = replace_owned(
            self.store.get(Section::Transactions).await?,
            &account_key,
            engine.transactions().iter().rev().map(encode).collect::<Result<_>>()?,
        );

        let beneficiaries = replace_owned(
            self.store.get(Section::Beneficiaries).await?,
            &account_key,
            engine.beneficiaries().iter().map(encode).collect::<Result<_>>()?,
        );

        let mut notifications = self.store.get(Section::Notifications).await?;
        upsert_item(
            &mut notifications,
            encode(&NotificationLog {
                id: account.id,
                entries: engine.notifications().to_vec(),
            })?,
        );

        Ok(vec![
            (Section::Users, users),
            (Section::Transactions, transactions),
            (Section::Beneficiaries, beneficiaries),
            (Section::Notifications, notifications),
        ])
    }

    async fn commit(&self, batch: Batch) -> Result<()> {
        self.store
            .put_many(batch)
            .await
            .context("Failed to persist ledger state")
    }

    // ========================
    // Standalone records
    // ========================

    /// Append a record to a section.
    pub async fn insert_record<T: Serialize>(&self, section: Section, record: &T) -> Result<()> {
        let item = encode(record)?;
        let _writes = self.writes.lock().await;
        self.store.add(section, item).await?;
        Ok(())
    }

    /// Shallow-merge `patch` into the record with the given id. `None` when
    /// there is no such record.
    pub async fn update_record<T: DeserializeOwned>(
        &self,
        section: Section,
        id: &str,
        patch: Value,
    ) -> Result<Option<T>> {
        let _writes = self.writes.lock().await;
        self.store
            .upsert_by_id(section, id, patch)
            .await?
            .map(|item| decode(section, item))
            .transpose()
    }

    /// Apply `change` to the decoded record with the given id and write it
    /// back. Nothing is written when `change` fails. `None` when there is
    /// no such record.
    pub async fn modify_record<T, F>(
        &self,
        section: Section,
        id: &str,
        change: F,
    ) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T) -> Result<()>,
    {
        let _writes = self.writes.lock().await;
        let mut items = self.store.get(section).await?;
        let Some(index) = items.iter().position(|item| item_id(item) == Some(id)) else {
            return Ok(None);
        };

        let mut record: T = decode(section, items[index].clone())?;
        change(&mut record)?;
        items[index] = encode(&record)?;
        self.store.put(section, items).await?;
        Ok(Some(record))
    }

    /// Overwrite the sections present in `document`.
    pub async fn replace_document(&self, document: super::Document) -> Result<()> {
        let _writes = self.writes.lock().await;
        self.store.replace_document(document).await
    }

    // ========================
    // Support tickets
    // ========================

    pub async fn list_support_tickets(&self, account_id: AccountId) -> Result<Vec<SupportTicket>> {
        decode_owned(
            Section::SupportTickets,
            self.store.get(Section::SupportTickets).await?,
            account_id,
        )
    }

    pub async fn set_ticket_status(
        &self,
        id: TicketId,
        status: TicketStatus,
    ) -> Result<Option<SupportTicket>> {
        self.update_record(
            Section::SupportTickets,
            &id.to_string(),
            json!({ "status": status }),
        )
        .await
    }

    // ========================
    // Compliance and agents
    // ========================

    pub async fn list_kyc_submissions(&self, account_id: AccountId) -> Result<Vec<KycSubmission>> {
        decode_owned(
            Section::KycSubmissions,
            self.store.get(Section::KycSubmissions).await?,
            account_id,
        )
    }

    /// Fraud alerts of one account, or of every account.
    pub async fn list_fraud_alerts(&self, account_id: Option<AccountId>) -> Result<Vec<FraudAlert>> {
        let items = self.store.get(Section::FraudAlerts).await?;
        match account_id {
            Some(account_id) => decode_owned(Section::FraudAlerts, items, account_id),
            None => decode_all(Section::FraudAlerts, items),
        }
    }

    pub async fn list_agents(&self) -> Result<Vec<Agent>> {
        decode_all(Section::Agents, self.store.get(Section::Agents).await?)
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).context("Failed to encode record")
}

fn decode<T: DeserializeOwned>(section: Section, item: Value) -> Result<T> {
    serde_json::from_value(item).with_context(|| format!("Malformed record in {}", section))
}

fn decode_all<T: DeserializeOwned>(section: Section, items: Vec<Value>) -> Result<Vec<T>> {
    items.into_iter().map(|item| decode(section, item)).collect()
}

/// Decode the items of `section` that belong to `account_id`.
fn decode_owned<T: DeserializeOwned>(
    section: Section,
    items: Vec<Value>,
    account_id: AccountId,
) -> Result<Vec<T>> {
    let key = account_id.to_string();
    decode_all(
        section,
        items
            .into_iter()
            .filter(|item| owner_id(item) == Some(key.as_str()))
            .collect(),
    )
}

fn owner_id(item: &Value) -> Option<&str> {
    item.get("account_id").and_then(Value::as_str)
}

/// Replace the item with the same id as `item`, or append it.
fn upsert_item(items: &mut Vec<Value>, item: Value) {
    let existing = item_id(&item).and_then(|id| {
        items
            .iter()
            .position(|other| item_id(other) == Some(id))
    });
    match existing {
        Some(index) => items[index] = item,
        None => items.push(item),
    }
}

/// Drop `account_key`'s items from `items` and append `owned` in their place.
fn replace_owned(mut items: Vec<Value>, account_key: &str, owned: Vec<Value>) -> Vec<Value> {
    items.retain(|item| owner_id(item) != Some(account_key));
    items.extend(owned);
    items
}

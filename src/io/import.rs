use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::io::Read;
use tracing::{info, warn};

use crate::application::LedgerService;
use crate::domain::{
    Account, Agent, Beneficiary, FraudAlert, KycSubmission, LedgerEngine, SupportTicket,
    Transaction,
};
use crate::io::export::DatabaseSnapshot;
use crate::storage::Section;

/// Result of an import operation
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    /// Items written per section
    pub imported: Vec<(Section, usize)>,
    pub errors: Vec<ImportError>,
}

impl ImportResult {
    pub fn total(&self) -> usize {
        self.imported.iter().map(|(_, count)| count).sum()
    }
}

/// A record that failed validation
#[derive(Debug, Clone)]
pub struct ImportError {
    pub section: Section,
    pub index: usize,
    pub error: String,
}

/// Options for import operations
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Validate without writing anything
    pub validate_only: bool,
}

/// Importer for restoring a snapshot into the store
pub struct Importer<'a> {
    service: &'a LedgerService,
}

impl<'a> Importer<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Restore a JSON snapshot. Every record is type-checked first, then
    /// each account's ledger is rebuilt from the resulting state and must
    /// pass the integrity check. If anything fails, nothing is written.
    /// Sections in the snapshot replace the stored ones, sections it omits
    /// are kept.
    pub async fn import_full_json<R: Read>(
        &self,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let snapshot: DatabaseSnapshot =
            serde_json::from_reader(reader).context("Invalid snapshot file")?;

        let mut result = ImportResult::default();
        for (section, items) in &snapshot.sections {
            for (index, item) in items.iter().enumerate() {
                if let Err(e) = check_record(*section, item) {
                    result.errors.push(ImportError {
                        section: *section,
                        index,
                        error: e.to_string(),
                    });
                }
            }
            result.imported.push((*section, items.len()));
        }

        if result.errors.is_empty() {
            result.errors = self.check_ledgers(&snapshot).await?;
        }

        if !result.errors.is_empty() || options.validate_only {
            if !result.errors.is_empty() {
                warn!(errors = result.errors.len(), "snapshot rejected");
            }
            result.imported.clear();
            return Ok(result);
        }

        self.service.restore_document(snapshot.sections).await?;
        info!(records = result.total(), "snapshot imported");

        Ok(result)
    }

    /// Rebuild every account's ledger as it would stand after the import
    /// and report the ones that fail the integrity check.
    async fn check_ledgers(&self, snapshot: &DatabaseSnapshot) -> Result<Vec<ImportError>> {
        let accounts: Vec<Account> = self.section_after_import(snapshot, Section::Users).await?;
        let transactions: Vec<Transaction> =
            self.section_after_import(snapshot, Section::Transactions).await?;
        let beneficiaries: Vec<Beneficiary> =
            self.section_after_import(snapshot, Section::Beneficiaries).await?;

        let known: Vec<_> = accounts.iter().map(|account| account.id).collect();
        let mut errors = Vec::new();
        for (index, account) in accounts.into_iter().enumerate() {
            let id = account.id;
            let owned_transactions = transactions
                .iter()
                .filter(|tx| tx.account_id == id)
                .cloned()
                .collect();
            let owned_beneficiaries = beneficiaries
                .iter()
                .filter(|b| b.account_id == id)
                .cloned()
                .collect();

            let engine = LedgerEngine::restore(
                account,
                owned_transactions,
                owned_beneficiaries,
                Vec::new(),
                self.service.config(),
            );
            let issues = engine.verify().issues();
            if !issues.is_empty() {
                errors.push(ImportError {
                    section: Section::Users,
                    index,
                    error: format!("ledger of account {}: {}", id, issues.join(", ")),
                });
            }
        }

        for (index, tx) in transactions.iter().enumerate() {
            if !known.contains(&tx.account_id) {
                errors.push(ImportError {
                    section: Section::Transactions,
                    index,
                    error: format!(
                        "transaction {} belongs to unknown account {}",
                        tx.id, tx.account_id
                    ),
                });
            }
        }

        Ok(errors)
    }

    /// Records of `section` from the snapshot, or the stored ones when the
    /// snapshot leaves the section out.
    async fn section_after_import<T: DeserializeOwned>(
        &self,
        snapshot: &DatabaseSnapshot,
        section: Section,
    ) -> Result<Vec<T>> {
        let items = match snapshot.sections.get(&section) {
            Some(items) => items.clone(),
            None => self.service.store().get(section).await?,
        };
        items
            .into_iter()
            .map(|item| {
                serde_json::from_value(item)
                    .with_context(|| format!("Malformed record in {}", section))
            })
            .collect()
    }
}

fn check_record(section: Section, item: &Value) -> Result<()> {
    let item = item.clone();
    match section {
        Section::Users => serde_json::from_value::<Account>(item).map(drop)?,
        Section::Transactions => serde_json::from_value::<Transaction>(item).map(drop)?,
        Section::Beneficiaries => serde_json::from_value::<Beneficiary>(item).map(drop)?,
        Section::SupportTickets => serde_json::from_value::<SupportTicket>(item).map(drop)?,
        Section::KycSubmissions => serde_json::from_value::<KycSubmission>(item).map(drop)?,
        Section::FraudAlerts => serde_json::from_value::<FraudAlert>(item).map(drop)?,
        Section::Agents => serde_json::from_value::<Agent>(item).map(drop)?,
        Section::Notifications => {
            if item.get("id").is_none() || !item["entries"].is_array() {
                anyhow::bail!("notification log needs an id and an entries array");
            }
        }
    }
    Ok(())
}

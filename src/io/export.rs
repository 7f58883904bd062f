use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::{LedgerService, LedgerSession};
use crate::storage::Document;

/// Whole-store snapshot for backup and restore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub sections: Document,
}

/// Exporter for converting ledger data to various formats
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Export one account's transaction history to CSV, oldest first.
    pub async fn export_transactions_csv<W: Write>(
        &self,
        session: &LedgerSession,
        writer: W,
    ) -> Result<usize> {
        let mut transactions = session.transactions().await;
        transactions.reverse();
        let mut csv_writer = csv::Writer::from_writer(writer);

        // Write header
        csv_writer.write_record([
            "id",
            "sequence",
            "timestamp",
            "direction",
            "counterpart",
            "amount",
            "currency",
            "fx_rate",
            "fee",
            "note",
            "status",
        ])?;

        let mut count = 0;
        for tx in &transactions {
            csv_writer.write_record([
                tx.id.to_string(),
                tx.sequence.to_string(),
                tx.timestamp.to_rfc3339(),
                tx.direction.to_string(),
                tx.counterpart.clone(),
                tx.amount.to_string(),
                tx.currency.clone(),
                tx.fx_rate.to_string(),
                tx.fee.to_string(),
                tx.note.clone().unwrap_or_default(),
                tx.status.to_string(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export the full store as a JSON snapshot
    pub async fn export_full_json<W: Write>(&self, mut writer: W) -> Result<DatabaseSnapshot> {
        let snapshot = DatabaseSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            sections: self.service.store().document().await?,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}

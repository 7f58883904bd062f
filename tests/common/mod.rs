// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal_macros::dec;
use swiftsend::application::{LedgerService, LedgerSession};
use swiftsend::domain::Beneficiary;
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Path of the database inside a test directory, for reconnecting
pub fn db_path(temp_dir: &TempDir) -> String {
    temp_dir.path().join("test.db").to_str().unwrap().to_string()
}

/// Helper to parse a date string into DateTime<Utc>
pub fn parse_date(date_str: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

/// Test fixture: the demo account holder and a saved beneficiary
pub struct DemoAccount;

impl DemoAccount {
    pub const EMAIL: &'static str = "alex@swiftsend.app";

    /// Create Alex Morgan with 8250.75 USD
    pub async fn create(service: &LedgerService) -> Result<LedgerSession> {
        service
            .create_account("Alex Morgan", Some(Self::EMAIL), None, dec!(8250.75))
            .await?;
        Ok(service.open_session(Self::EMAIL).await?)
    }

    /// Create Alex Morgan plus Jamie Lee as a beneficiary
    pub async fn create_with_beneficiary(
        service: &LedgerService,
    ) -> Result<(LedgerSession, Beneficiary)> {
        let session = Self::create(service).await?;
        let jamie = session
            .add_beneficiary("Jamie Lee", "Philippines", "Mobile wallet")
            .await?;
        Ok((session, jamie))
    }
}

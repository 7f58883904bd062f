use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::config::LedgerConfig;
use crate::domain::{
    Account, AccountId, Agent, AgentId, AgentUpdate, Amount, Beneficiary, BeneficiaryId,
    Direction, FraudAlert, FraudAlertId, FraudAlertStatus, IntegrityReport, KycStatus,
    KycSubmission, KycSubmissionId, LedgerEngine, LedgerError, MoneyRequest, SupportTicket,
    TicketId, TicketStatus, Transaction, TransactionId, TransferQuote, TransferRequest,
};
use crate::storage::{Attached, Document, DocumentStore, Repository, Section, SqliteStore};

use super::{ActivityReport, AppError};

/// Application service providing account-level operations.
/// This is the primary interface for any client (CLI, API, TUI, etc.).
pub struct LedgerService {
    repo: Repository,
    config: LedgerConfig,
}

/// Filter for querying transaction history
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub direction: Option<Direction>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl LedgerService {
    /// Create a new ledger service over any document store.
    pub fn with_store(store: Arc<dyn DocumentStore>, config: LedgerConfig) -> Result<Self, AppError> {
        config.validate().map_err(AppError::InvalidConfig)?;
        Ok(Self {
            repo: Repository::new(store),
            config,
        })
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        Self::init_with_config(database_path, LedgerConfig::default()).await
    }

    pub async fn init_with_config(
        database_path: &str,
        config: LedgerConfig,
    ) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let store = SqliteStore::init(&db_url).await?;
        Self::with_store(Arc::new(store), config)
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str, config: LedgerConfig) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let store = SqliteStore::connect(&db_url).await?;
        Self::with_store(Arc::new(store), config)
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        self.repo.store()
    }

    // ========================
    // Account operations
    // ========================

    /// Create a new account in the configured base currency.
    #[instrument(skip(self, phone))]
    pub async fn create_account(
        &self,
        name: &str,
        email: Option<&str>,
        phone: Option<&str>,
        opening_balance: Amount,
    ) -> Result<Account, AppError> {
        let mut account = Account::new(name, &self.config.base_currency, opening_balance)?;
        if let Some(email) = email {
            if self.repo.find_account(email).await?.is_some() {
                return Err(AppError::AccountAlreadyExists(email.trim().to_string()));
            }
            account = account.with_email(email)?;
        }
        if let Some(phone) = phone {
            account = account.with_phone(phone)?;
        }

        let mut engine = LedgerEngine::new(account, &self.config);
        engine.notify(format!("Welcome {}!", engine.account().name));
        if !self.repo.create_ledger(&engine).await? {
            let email = engine.account().email.clone().unwrap_or_default();
            return Err(AppError::AccountAlreadyExists(email));
        }

        info!(account = %engine.account().id, "account created");
        Ok(engine.account().clone())
    }

    /// Get an account by id or email.
    pub async fn get_account(&self, id_or_email: &str) -> Result<Account, AppError> {
        self.repo
            .find_account(id_or_email)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(id_or_email.to_string()))
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>, AppError> {
        Ok(self.repo.list_accounts().await?)
    }

    /// Load an account's ledger into a session.
    #[instrument(skip(self))]
    pub async fn open_session(&self, id_or_email: &str) -> Result<LedgerSession, AppError> {
        let account = self.get_account(id_or_email).await?;
        if account.base_currency != self.config.base_currency {
            return Err(AppError::CurrencyMismatch {
                account: account.id.to_string(),
                found: account.base_currency,
                configured: self.config.base_currency.clone(),
            });
        }
        let engine = self.repo.load_ledger(account, &self.config).await?;
        debug!(
            account = %engine.account().id,
            transactions = engine.transactions().len(),
            "ledger loaded"
        );

        Ok(LedgerSession {
            account_id: engine.account().id,
            repo: self.repo.clone(),
            engine: Mutex::new(engine),
        })
    }

    /// Overwrite the sections present in `document`, under the store's
    /// write lock. Open sessions keep their own copy of the ledger.
    pub async fn restore_document(&self, document: Document) -> Result<(), AppError> {
        self.repo.replace_document(document).await?;
        Ok(())
    }

    // ========================
    // Fraud review
    // ========================

    /// Fraud alerts across every account, optionally only unresolved ones.
    pub async fn list_fraud_alerts(&self, active_only: bool) -> Result<Vec<FraudAlert>, AppError> {
        let mut alerts = self.repo.list_fraud_alerts(None).await?;
        if active_only {
            alerts.retain(FraudAlert::is_active);
        }
        Ok(alerts)
    }

    /// Move an alert along its review workflow.
    #[instrument(skip(self))]
    pub async fn update_fraud_alert_status(
        &self,
        id: FraudAlertId,
        status: FraudAlertStatus,
    ) -> Result<FraudAlert, AppError> {
        let alert = self
            .repo
            .modify_record(Section::FraudAlerts, &id.to_string(), |alert: &mut FraudAlert| {
                Ok(alert.transition(status)?)
            })
            .await
            .map_err(AppError::from_store)?
            .ok_or_else(|| AppError::FraudAlertNotFound(id.to_string()))?;

        info!(alert = %alert.id, status = %alert.status, "fraud alert updated");
        Ok(alert)
    }

    // ========================
    // Agents
    // ========================

    #[instrument(skip(self, hours))]
    pub async fn add_agent(
        &self,
        name: &str,
        city: &str,
        hours: Option<&str>,
    ) -> Result<Agent, AppError> {
        let agent = Agent::new(name, city, hours)?;
        self.repo.insert_record(Section::Agents, &agent).await?;
        info!(agent = %agent.id, "agent added");
        Ok(agent)
    }

    pub async fn list_agents(&self) -> Result<Vec<Agent>, AppError> {
        Ok(self.repo.list_agents().await?)
    }

    /// Apply a partial update to an agent; unset fields are left alone.
    #[instrument(skip(self, update))]
    pub async fn update_agent(&self, id: AgentId, update: AgentUpdate) -> Result<Agent, AppError> {
        let update = update.validate()?;
        if update.is_empty() {
            return Err(LedgerError::validation("nothing to update").into());
        }

        let patch = serde_json::to_value(&update).map_err(anyhow::Error::from)?;
        let agent: Agent = self
            .repo
            .update_record(Section::Agents, &id.to_string(), patch)
            .await?
            .ok_or_else(|| AppError::AgentNotFound(id.to_string()))?;

        info!(agent = %agent.id, status = %agent.status, "agent updated");
        Ok(agent)
    }
}

/// One account's live ledger.
///
/// Operations are serialized by an async mutex held across both the engine
/// call and the store write. If the write fails the engine is put back the
/// way it was, so memory and store never disagree.
pub struct LedgerSession {
    account_id: AccountId,
    repo: Repository,
    engine: Mutex<LedgerEngine>,
}

impl LedgerSession {
    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    // ========================
    // Reads
    // ========================

    pub async fn account(&self) -> Account {
        self.engine.lock().await.account().clone()
    }

    pub async fn balance(&self) -> Amount {
        self.engine.lock().await.balance()
    }

    /// Full history, most recent first.
    pub async fn transactions(&self) -> Vec<Transaction> {
        self.engine.lock().await.transactions().to_vec()
    }

    /// History matching `filter`, most recent first.
    pub async fn history(&self, filter: &HistoryFilter) -> Vec<Transaction> {
        let engine = self.engine.lock().await;
        engine
            .transactions()
            .iter()
            .filter(|tx| filter.direction.is_none_or(|d| tx.direction == d))
            .filter(|tx| filter.from_date.is_none_or(|from| tx.timestamp >= from))
            .filter(|tx| filter.to_date.is_none_or(|to| tx.timestamp <= to))
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    pub async fn beneficiaries(&self) -> Vec<Beneficiary> {
        self.engine.lock().await.beneficiaries().to_vec()
    }

    /// Notification feed, most recent first.
    pub async fn notifications(&self) -> Vec<String> {
        self.engine.lock().await.notifications().to_vec()
    }

    pub async fn quote(
        &self,
        amount: Amount,
        currency: Option<&str>,
    ) -> Result<TransferQuote, AppError> {
        Ok(self.engine.lock().await.quote(amount, currency)?)
    }

    /// A copy of the engine as it stands.
    pub async fn snapshot(&self) -> LedgerEngine {
        self.engine.lock().await.clone()
    }

    pub async fn check_integrity(&self) -> IntegrityReport {
        self.engine.lock().await.verify()
    }

    // ========================
    // Money movement
    // ========================

    #[instrument(skip(self, request), fields(account = %self.account_id))]
    pub async fn send(&self, request: TransferRequest) -> Result<Transaction, AppError> {
        let tx = self.apply(|engine| engine.send(request)).await?;
        info!(
            transaction = %tx.id,
            amount = %tx.amount,
            currency = %tx.currency,
            fee = %tx.fee,
            "money sent"
        );
        Ok(tx)
    }

    #[instrument(skip(self, note), fields(account = %self.account_id))]
    pub async fn send_to_beneficiary(
        &self,
        beneficiary_id: BeneficiaryId,
        amount: Amount,
        currency: Option<&str>,
        note: Option<&str>,
    ) -> Result<Transaction, AppError> {
        let tx = self
            .apply(|engine| engine.send_to_beneficiary(beneficiary_id, amount, currency, note))
            .await?;
        info!(transaction = %tx.id, amount = %tx.amount, "money sent to beneficiary");
        Ok(tx)
    }

    #[instrument(skip(self, request), fields(account = %self.account_id))]
    pub async fn receive(&self, request: TransferRequest) -> Result<Transaction, AppError> {
        let tx = self.apply(|engine| engine.receive(request)).await?;
        info!(
            transaction = %tx.id,
            amount = %tx.amount,
            currency = %tx.currency,
            "money received"
        );
        Ok(tx)
    }

    #[instrument(skip(self, note), fields(account = %self.account_id))]
    pub async fn request_money(
        &self,
        counterpart: &str,
        amount: Amount,
        note: Option<&str>,
    ) -> Result<MoneyRequest, AppError> {
        let request = self
            .apply(|engine| engine.request_money(counterpart, amount, note))
            .await?;
        info!(request = %request.id, "money requested");
        Ok(request)
    }

    // ========================
    // Beneficiaries
    // ========================

    #[instrument(skip(self), fields(account = %self.account_id))]
    pub async fn add_beneficiary(
        &self,
        name: &str,
        country: &str,
        method: &str,
    ) -> Result<Beneficiary, AppError> {
        let beneficiary = self
            .apply(|engine| engine.add_beneficiary(name, country, method))
            .await?;
        info!(beneficiary = %beneficiary.id, "beneficiary added");
        Ok(beneficiary)
    }

    pub async fn verify_beneficiary(&self, id: BeneficiaryId) -> Result<Beneficiary, AppError> {
        self.apply(|engine| engine.set_beneficiary_verified(id, true))
            .await
    }

    // ========================
    // Support
    // ========================

    /// File a support ticket. The ticket and its notification are written in
    /// the same batch as the rest of the ledger state.
    #[instrument(skip(self, message), fields(account = %self.account_id))]
    pub async fn submit_support_ticket(
        &self,
        name: &str,
        email: &str,
        message: &str,
    ) -> Result<SupportTicket, AppError> {
        let ticket = SupportTicket::new(self.account_id, name, email, message)?;

        self.apply_with(|engine| {
            engine.notify("Support ticket submitted successfully");
            Ok(((), vec![Attached::new(Section::SupportTickets, &ticket)?]))
        })
        .await?;

        info!(ticket = %ticket.id, "support ticket submitted");
        Ok(ticket)
    }

    pub async fn list_support_tickets(&self) -> Result<Vec<SupportTicket>, AppError> {
        Ok(self.repo.list_support_tickets(self.account_id).await?)
    }

    pub async fn resolve_support_ticket(&self, id: TicketId) -> Result<SupportTicket, AppError> {
        let owned = self
            .list_support_tickets()
            .await?
            .iter()
            .any(|ticket| ticket.id == id);
        if !owned {
            return Err(AppError::TicketNotFound(id.to_string()));
        }

        self.repo
            .set_ticket_status(id, TicketStatus::Resolved)
            .await?
            .ok_or_else(|| AppError::TicketNotFound(id.to_string()))
    }

    // ========================
    // Compliance
    // ========================

    /// File identity documents for review. The account's KYC status goes
    /// back to pending until the submission is reviewed.
    #[instrument(skip(self, document_number), fields(account = %self.account_id))]
    pub async fn submit_kyc(
        &self,
        document_type: &str,
        document_number: &str,
    ) -> Result<KycSubmission, AppError> {
        let submission = KycSubmission::new(self.account_id, document_type, document_number)?;

        self.apply_with(|engine| {
            if engine.account().kyc_status == KycStatus::Approved {
                return Err(LedgerError::validation("identity already verified").into());
            }
            engine.set_kyc_status(KycStatus::Pending);
            Ok(((), vec![Attached::new(Section::KycSubmissions, &submission)?]))
        })
        .await?;

        info!(submission = %submission.id, "KYC submitted");
        Ok(submission)
    }

    pub async fn list_kyc_submissions(&self) -> Result<Vec<KycSubmission>, AppError> {
        Ok(self.repo.list_kyc_submissions(self.account_id).await?)
    }

    /// Approve or reject a pending submission. The decision is mirrored onto
    /// the account and written in the same batch.
    #[instrument(skip(self), fields(account = %self.account_id))]
    pub async fn review_kyc(
        &self,
        id: KycSubmissionId,
        decision: KycStatus,
    ) -> Result<KycSubmission, AppError> {
        let mut submission = self
            .list_kyc_submissions()
            .await?
            .into_iter()
            .find(|submission| submission.id == id)
            .ok_or_else(|| AppError::KycSubmissionNotFound(id.to_string()))?;
        submission.review(decision)?;

        self.apply_with(|engine| {
            engine.set_kyc_status(decision);
            Ok(((), vec![Attached::new(Section::KycSubmissions, &submission)?]))
        })
        .await?;

        info!(submission = %submission.id, status = %decision, "KYC reviewed");
        Ok(submission)
    }

    /// Raise a fraud alert against one of this account's transactions.
    #[instrument(skip(self, description), fields(account = %self.account_id))]
    pub async fn flag_transaction(
        &self,
        transaction_id: TransactionId,
        alert_type: &str,
        description: &str,
        risk_score: u8,
    ) -> Result<FraudAlert, AppError> {
        let alert = {
            let engine = self.engine.lock().await;
            let tx = engine
                .find_transaction(transaction_id)
                .ok_or_else(|| LedgerError::not_found("Transaction", transaction_id))?;
            FraudAlert::for_transaction(tx, alert_type, description, risk_score)?
        };

        self.repo.insert_record(Section::FraudAlerts, &alert).await?;
        if alert.is_high_risk() {
            warn!(alert = %alert.id, risk = alert.risk_score, "high-risk transaction flagged");
        } else {
            info!(alert = %alert.id, "transaction flagged");
        }
        Ok(alert)
    }

    pub async fn list_fraud_alerts(&self) -> Result<Vec<FraudAlert>, AppError> {
        Ok(self.repo.list_fraud_alerts(Some(self.account_id)).await?)
    }

    // ========================
    // Reporting
    // ========================

    pub async fn activity_report(
        &self,
        from_date: DateTime<Utc>,
        to_date: DateTime<Utc>,
    ) -> Result<ActivityReport, AppError> {
        let tickets = self.list_support_tickets().await?;
        let submissions = self.list_kyc_submissions().await?;
        let alerts = self.list_fraud_alerts().await?;
        let engine = self.engine.lock().await;
        Ok(ActivityReport::build(
            self.account_id,
            engine.transactions(),
            &tickets,
            from_date,
            to_date,
        )
        .with_compliance(&submissions, &alerts))
    }

    /// Run `op` against the engine and persist the result. The engine is
    /// restored if either step fails.
    async fn apply<T>(
        &self,
        op: impl FnOnce(&mut LedgerEngine) -> Result<T, LedgerError>,
    ) -> Result<T, AppError> {
        self.apply_with(|engine| Ok((op(engine)?, Vec::new())))
            .await
    }

    /// Like `apply`, also writing the records `op` hands back in the same
    /// batch as the ledger.
    async fn apply_with<T>(
        &self,
        op: impl FnOnce(&mut LedgerEngine) -> Result<(T, Vec<Attached>), AppError>,
    ) -> Result<T, AppError> {
        let mut engine = self.engine.lock().await;
        let before = engine.clone();

        let (output, attached) = match op(&mut *engine) {
            Ok(output) => output,
            Err(err) => {
                debug!(error = %err, "ledger operation rejected");
                *engine = before;
                return Err(err);
            }
        };

        if let Err(err) = self.repo.save_ledger_with(&engine, attached).await {
            warn!(error = %err, "failed to persist ledger; rolling back");
            *engine = before;
            return Err(err.into());
        }

        Ok(output)
    }
}

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::LedgerConfig;

use super::validation::{optional, required};
use super::{
    compute_fee, format_currency, Account, Amount, Beneficiary, BeneficiaryId, Direction,
    KycStatus, LedgerError, NotificationFeed, RateTable, Transaction, TransactionId,
    TransactionStatus,
};

const UNKNOWN_SENDER: &str = "Unknown Sender";

/// Input for `send` and `receive`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    pub counterpart: String,
    pub amount: Amount,
    /// Defaults to the account's base currency
    pub currency: Option<String>,
    pub note: Option<String>,
}

impl TransferRequest {
    pub fn new(counterpart: impl Into<String>, amount: Amount) -> Self {
        Self {
            counterpart: counterpart.into(),
            amount,
            currency: None,
            note: None,
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Fee and FX breakdown of a prospective send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferQuote {
    pub amount: Amount,
    pub currency: String,
    pub fx_rate: Decimal,
    pub base_amount: Amount,
    pub fee: Amount,
    pub total_debit: Amount,
}

/// A request for money. Nothing moves; the id lets the caller correlate a
/// later `receive`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoneyRequest {
    pub id: Uuid,
    pub counterpart: String,
    pub amount: Amount,
    pub currency: String,
    pub note: Option<String>,
}

/// Result of replaying the history on top of the opening balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityReport {
    pub opening_balance: Amount,
    pub expected_balance: Amount,
    pub actual_balance: Amount,
    pub transaction_count: usize,
    pub has_sequence_gaps: bool,
}

impl IntegrityReport {
    pub fn balance_matches(&self) -> bool {
        self.expected_balance == self.actual_balance
    }

    pub fn is_ok(&self) -> bool {
        self.issues().is_empty()
    }

    /// Human-readable list of what is wrong; empty when the ledger is sound.
    pub fn issues(&self) -> Vec<&'static str> {
        let mut issues = Vec::new();
        if !self.balance_matches() {
            issues.push("balance does not match transaction history");
        }
        if self.has_sequence_gaps {
            issues.push("transaction sequence has gaps");
        }
        if self.actual_balance < Decimal::ZERO {
            issues.push("balance is negative");
        }
        issues
    }
}

/// Sole authority over one account's balance and transaction history.
///
/// Every operation validates completely before touching state, so a failed
/// call leaves balance, history, beneficiaries and notifications exactly as
/// they were.
#[derive(Debug, Clone)]
pub struct LedgerEngine {
    account: Account,
    /// Most recent first
    transactions: Vec<Transaction>,
    beneficiaries: Vec<Beneficiary>,
    notifications: NotificationFeed,
    rates: RateTable,
    fee_rate: Decimal,
}

impl LedgerEngine {
    pub fn new(account: Account, config: &LedgerConfig) -> Self {
        Self {
            account,
            transactions: Vec::new(),
            beneficiaries: Vec::new(),
            notifications: NotificationFeed::new(config.notification_capacity),
            rates: config.rates.clone(),
            fee_rate: config.fee_rate,
        }
    }

    /// Rebuild an engine from persisted state. Transactions may arrive in any
    /// order; notifications are expected most-recent-first.
    pub fn restore(
        account: Account,
        mut transactions: Vec<Transaction>,
        beneficiaries: Vec<Beneficiary>,
        notifications: Vec<String>,
        config: &LedgerConfig,
    ) -> Self {
        transactions.sort_by(|a, b| b.sequence.cmp(&a.sequence));
        Self {
            account,
            transactions,
            beneficiaries,
            notifications: NotificationFeed::from_entries(
                config.notification_capacity,
                notifications,
            ),
            rates: config.rates.clone(),
            fee_rate: config.fee_rate,
        }
    }

    // ========================
    // Read accessors
    // ========================

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn balance(&self) -> Amount {
        self.account.balance
    }

    pub fn base_currency(&self) -> &str {
        &self.account.base_currency
    }

    /// Transaction history, most recent first.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn find_transaction(&self, id: TransactionId) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id == id)
    }

    pub fn beneficiaries(&self) -> &[Beneficiary] {
        &self.beneficiaries
    }

    pub fn find_beneficiary(&self, id: BeneficiaryId) -> Option<&Beneficiary> {
        self.beneficiaries.iter().find(|b| b.id == id)
    }

    pub fn notifications(&self) -> &NotificationFeed {
        &self.notifications
    }

    pub fn rates(&self) -> &RateTable {
        &self.rates
    }

    // ========================
    // Money movement
    // ========================

    /// Price a send without performing it.
    pub fn quote(&self, amount: Amount, currency: Option<&str>) -> Result<TransferQuote, LedgerError> {
        validate_amount(amount)?;
        let currency = self.resolve_currency(currency);
        let fx_rate = self.rates.rate(&currency);
        let base_amount = self.rates.convert_to_base(amount, &currency)?;
        let fee = compute_fee(base_amount, self.fee_rate)?;
        let total_debit = base_amount
            .checked_add(fee)
            .ok_or_else(LedgerError::amount_too_large)?;

        Ok(TransferQuote {
            amount,
            currency,
            fx_rate,
            base_amount,
            fee,
            total_debit,
        })
    }

    /// Debit the account: converted amount plus fee.
    pub fn send(&mut self, request: TransferRequest) -> Result<Transaction, LedgerError> {
        let counterpart = required(&request.counterpart, "recipient required")?;
        self.debit(
            counterpart,
            None,
            request.amount,
            request.currency.as_deref(),
            request.note.as_deref(),
        )
    }

    /// Send to a saved beneficiary, recording its id on the transaction.
    pub fn send_to_beneficiary(
        &mut self,
        beneficiary_id: BeneficiaryId,
        amount: Amount,
        currency: Option<&str>,
        note: Option<&str>,
    ) -> Result<Transaction, LedgerError> {
        let beneficiary = self
            .find_beneficiary(beneficiary_id)
            .ok_or_else(|| LedgerError::not_found("Beneficiary", beneficiary_id))?;
        let counterpart = beneficiary.name.clone();

        self.debit(counterpart, Some(beneficiary_id), amount, currency, note)
    }

    /// Credit the account. Receipts carry no fee and can't be refused for
    /// lack of funds.
    pub fn receive(&mut self, request: TransferRequest) -> Result<Transaction, LedgerError> {
        validate_amount(request.amount)?;
        let counterpart = optional(Some(request.counterpart.as_str()))
            .unwrap_or_else(|| UNKNOWN_SENDER.to_string());
        let currency = self.resolve_currency(request.currency.as_deref());
        let fx_rate = self.rates.rate(&currency);
        let base_amount = self.rates.convert_to_base(request.amount, &currency)?;
        let new_balance = self
            .account
            .balance
            .checked_add(base_amount)
            .ok_or_else(LedgerError::amount_too_large)?;

        let transaction = self.build_transaction(
            Direction::Received,
            counterpart,
            None,
            request.amount,
            currency,
            fx_rate,
            Decimal::ZERO,
            optional(request.note.as_deref()),
        );

        self.account.balance = new_balance;
        self.notifications.push(format!(
            "You received {} from {}",
            format_currency(transaction.amount, &transaction.currency),
            transaction.counterpart
        ));
        self.transactions.insert(0, transaction.clone());

        Ok(transaction)
    }

    /// Ask someone for money. Only a notification is recorded; balance and
    /// history are untouched.
    pub fn request_money(
        &mut self,
        counterpart: &str,
        amount: Amount,
        note: Option<&str>,
    ) -> Result<MoneyRequest, LedgerError> {
        let counterpart = required(counterpart, "recipient required")?;
        validate_amount(amount)?;

        let request = MoneyRequest {
            id: Uuid::new_v4(),
            counterpart,
            amount,
            currency: self.account.base_currency.clone(),
            note: optional(note),
        };

        self.notifications.push(format!(
            "Money request ({}) for {} sent to {}",
            request.id,
            format_currency(request.amount, &request.currency),
            request.counterpart
        ));

        Ok(request)
    }

    // ========================
    // Beneficiaries
    // ========================

    pub fn add_beneficiary(
        &mut self,
        name: &str,
        country: &str,
        method: &str,
    ) -> Result<Beneficiary, LedgerError> {
        let beneficiary = Beneficiary::new(self.account.id, name, country, method)?;

        self.notifications
            .push(format!("Beneficiary {} added", beneficiary.name));
        self.beneficiaries.push(beneficiary.clone());

        Ok(beneficiary)
    }

    pub fn set_beneficiary_verified(
        &mut self,
        id: BeneficiaryId,
        verified: bool,
    ) -> Result<Beneficiary, LedgerError> {
        let beneficiary = self
            .beneficiaries
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| LedgerError::not_found("Beneficiary", id))?;

        beneficiary.verified = verified;
        let updated = beneficiary.clone();

        if verified {
            self.notifications
                .push(format!("Beneficiary {} verified", updated.name));
        }

        Ok(updated)
    }

    // ========================
    // Identity verification
    // ========================

    /// Mirror a KYC submission or review onto the account.
    pub fn set_kyc_status(&mut self, status: KycStatus) {
        self.account.kyc_status = status;
        let message = match status {
            KycStatus::Pending => "KYC documents submitted for review".to_string(),
            other => format!("KYC verification {}", other),
        };
        self.notifications.push(message);
    }

    // ========================
    // Audit
    // ========================

    pub fn notify(&mut self, message: impl Into<String>) {
        self.notifications.push(message);
    }

    /// Replay the history on top of the opening balance and compare.
    pub fn verify(&self) -> IntegrityReport {
        let expected_balance = self
            .transactions
            .iter()
            .fold(self.account.opening_balance, |balance, tx| {
                balance.saturating_add(tx.balance_delta())
            });

        let mut sequences: Vec<u64> = self.transactions.iter().map(|t| t.sequence).collect();
        sequences.sort_unstable();
        let has_sequence_gaps = sequences
            .iter()
            .enumerate()
            .any(|(i, seq)| *seq != i as u64 + 1);

        IntegrityReport {
            opening_balance: self.account.opening_balance,
            expected_balance,
            actual_balance: self.account.balance,
            transaction_count: self.transactions.len(),
            has_sequence_gaps,
        }
    }

    // ========================
    // Internals
    // ========================

    fn debit(
        &mut self,
        counterpart: String,
        beneficiary_id: Option<BeneficiaryId>,
        amount: Amount,
        currency: Option<&str>,
        note: Option<&str>,
    ) -> Result<Transaction, LedgerError> {
        let quote = self.quote(amount, currency)?;

        if quote.total_debit > self.account.balance {
            return Err(LedgerError::InsufficientFunds {
                balance: self.account.balance,
                required: quote.total_debit,
            });
        }

        let transaction = self.build_transaction(
            Direction::Sent,
            counterpart,
            beneficiary_id,
            quote.amount,
            quote.currency,
            quote.fx_rate,
            quote.fee,
            optional(note),
        );

        self.account.balance -= quote.total_debit;
        self.notifications.push(format!(
            "You sent {} to {}",
            format_currency(transaction.amount, &transaction.currency),
            transaction.counterpart
        ));
        self.transactions.insert(0, transaction.clone());

        Ok(transaction)
    }

    #[allow(clippy::too_many_arguments)]
    fn build_transaction(
        &self,
        direction: Direction,
        counterpart: String,
        beneficiary_id: Option<BeneficiaryId>,
        amount: Amount,
        currency: String,
        fx_rate: Decimal,
        fee: Amount,
        note: Option<String>,
    ) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            sequence: self.next_sequence(),
            account_id: self.account.id,
            direction,
            counterpart,
            beneficiary_id,
            amount,
            currency,
            fx_rate,
            fee,
            note,
            status: TransactionStatus::Completed,
            timestamp: Utc::now(),
        }
    }

    fn next_sequence(&self) -> u64 {
        self.transactions.first().map_or(0, |t| t.sequence) + 1
    }

    fn resolve_currency(&self, currency: Option<&str>) -> String {
        optional(currency)
            .map(|code| code.to_uppercase())
            .unwrap_or_else(|| self.account.base_currency.clone())
    }
}

fn validate_amount(amount: Amount) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::invalid_amount());
    }
    Ok(())
}

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{
    AccountId, Amount, Direction, FraudAlert, KycStatus, KycSubmission, SupportTicket, Transaction,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityReport {
    pub account_id: AccountId,
    pub from_date: DateTime<Utc>,
    pub to_date: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
    pub transaction_count: usize,
    pub sent_count: usize,
    pub received_count: usize,
    /// Base-currency totals
    pub total_sent: Amount,
    pub total_received: Amount,
    pub total_fees: Amount,
    pub net: Amount,
    pub currencies: Vec<CurrencySummary>,
    pub open_tickets: usize,
    pub pending_kyc: usize,
    pub active_fraud_alerts: usize,
    pub high_risk_alerts: usize,
}

/// Per-currency volumes, in the transaction currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencySummary {
    pub currency: String,
    pub sent: Amount,
    pub received: Amount,
    pub count: usize,
}

impl ActivityReport {
    /// Summarize the transactions timestamped within `[from_date, to_date]`.
    pub fn build(
        account_id: AccountId,
        transactions: &[Transaction],
        tickets: &[SupportTicket],
        from_date: DateTime<Utc>,
        to_date: DateTime<Utc>,
    ) -> Self {
        let mut report = Self {
            account_id,
            from_date,
            to_date,
            generated_at: Utc::now(),
            transaction_count: 0,
            sent_count: 0,
            received_count: 0,
            total_sent: Decimal::ZERO,
            total_received: Decimal::ZERO,
            total_fees: Decimal::ZERO,
            net: Decimal::ZERO,
            currencies: Vec::new(),
            open_tickets: tickets.iter().filter(|t| t.is_open()).count(),
            pending_kyc: 0,
            active_fraud_alerts: 0,
            high_risk_alerts: 0,
        };

        let mut by_currency: BTreeMap<&str, CurrencySummary> = BTreeMap::new();

        for tx in transactions
            .iter()
            .filter(|tx| tx.timestamp >= from_date && tx.timestamp <= to_date)
        {
            report.transaction_count += 1;
            report.net = report.net.saturating_add(tx.balance_delta());

            let summary = by_currency
                .entry(tx.currency.as_str())
                .or_insert_with(|| CurrencySummary {
                    currency: tx.currency.clone(),
                    sent: Decimal::ZERO,
                    received: Decimal::ZERO,
                    count: 0,
                });
            summary.count += 1;

            match tx.direction {
                Direction::Sent => {
                    report.sent_count += 1;
                    report.total_sent = report.total_sent.saturating_add(tx.base_amount());
                    report.total_fees = report.total_fees.saturating_add(tx.fee);
                    summary.sent = summary.sent.saturating_add(tx.amount);
                }
                Direction::Received => {
                    report.received_count += 1;
                    report.total_received = report.total_received.saturating_add(tx.base_amount());
                    summary.received = summary.received.saturating_add(tx.amount);
                }
            }
        }

        report.currencies = by_currency.into_values().collect();
        report
    }

    /// Add the account's open compliance work. Like tickets, these are
    /// counted regardless of the date range.
    pub fn with_compliance(
        mut self,
        submissions: &[KycSubmission],
        alerts: &[FraudAlert],
    ) -> Self {
        self.pending_kyc = submissions
            .iter()
            .filter(|s| s.status == KycStatus::Pending)
            .count();
        let active = alerts.iter().filter(|a| a.is_active());
        self.active_fraud_alerts = active.clone().count();
        self.high_risk_alerts = active.filter(|a| a.is_high_risk()).count();
        self
    }
}

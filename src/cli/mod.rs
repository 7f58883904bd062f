use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::application::{HistoryFilter, LedgerService, LedgerSession};
use crate::config::LedgerConfig;
use crate::domain::{
    format_currency, parse_amount, AgentStatus, AgentUpdate, Direction, FraudAlertStatus,
    KycStatus, TransferRequest,
};

/// SwiftSend - cross-border money transfer ledger
#[derive(Parser)]
#[command(name = "swiftsend")]
#[command(about = "Send, receive and request money across currencies from a local ledger")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "SWIFTSEND_DB", default_value = "swiftsend.db")]
    pub database: String,

    /// Account to act on (id or email); optional when only one account exists
    #[arg(short, long, env = "SWIFTSEND_ACCOUNT", global = true)]
    pub account: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init {
        /// Seed a demo account with a beneficiary
        #[arg(long)]
        demo: bool,
    },

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Send money to a recipient or a saved beneficiary
    Send {
        /// Amount to send (e.g., "100.00" or "100")
        amount: String,

        /// Recipient name
        #[arg(long, required_unless_present = "beneficiary")]
        to: Option<String>,

        /// Saved beneficiary ID
        #[arg(long, conflicts_with = "to")]
        beneficiary: Option<String>,

        /// Currency code (defaults to the account's base currency)
        #[arg(short, long)]
        currency: Option<String>,

        /// Note attached to the transaction
        #[arg(short, long)]
        note: Option<String>,
    },

    /// Record money received
    Receive {
        /// Amount received
        amount: String,

        /// Sender name
        #[arg(long)]
        from: Option<String>,

        /// Currency code (defaults to the account's base currency)
        #[arg(short, long)]
        currency: Option<String>,

        /// Note attached to the transaction
        #[arg(short, long)]
        note: Option<String>,
    },

    /// Request money from someone
    Request {
        /// Amount requested
        amount: String,

        /// Who the request goes to
        #[arg(long)]
        from: String,

        /// Note attached to the request
        #[arg(short, long)]
        note: Option<String>,
    },

    /// Preview the fee and total debit for a send
    Quote {
        amount: String,

        #[arg(short, long)]
        currency: Option<String>,
    },

    /// Beneficiary management commands
    #[command(subcommand)]
    Beneficiary(BeneficiaryCommands),

    /// Show the account balance
    Balance,

    /// List recent transactions
    History {
        /// Filter by direction: sent, received
        #[arg(long)]
        direction: Option<String>,

        /// Filter from date (YYYY-MM-DD)
        #[arg(long)]
        from_date: Option<String>,

        /// Filter to date (YYYY-MM-DD)
        #[arg(long)]
        to_date: Option<String>,

        /// Maximum number of transactions to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show the notification feed
    Notifications,

    /// Show the FX rate table
    Rates,

    /// Verify ledger integrity
    Check,

    /// Activity report for a date range
    Report {
        /// Start date (YYYY-MM-DD), defaults to start of current month
        #[arg(long)]
        from: Option<String>,

        /// End date (YYYY-MM-DD), defaults to now
        #[arg(long)]
        to: Option<String>,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Support ticket commands
    #[command(subcommand)]
    Support(SupportCommands),

    /// Identity verification commands
    #[command(subcommand)]
    Kyc(KycCommands),

    /// Fraud alert commands
    #[command(subcommand)]
    Fraud(FraudCommands),

    /// Cash agent commands
    #[command(subcommand)]
    Agent(AgentCommands),

    /// Export data to CSV or JSON
    Export {
        /// What to export: transactions, full
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Import a full JSON snapshot
    Import {
        /// Input file (stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,

        /// Validate without importing
        #[arg(long)]
        validate: bool,
    },
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Create a new account
    Create {
        /// Account holder name
        name: String,

        #[arg(short, long)]
        email: Option<String>,

        #[arg(short, long)]
        phone: Option<String>,

        /// Opening balance in the base currency
        #[arg(short, long, default_value = "0")]
        opening_balance: String,
    },

    /// List all accounts
    List,

    /// Show account details
    Show,
}

#[derive(Subcommand)]
pub enum BeneficiaryCommands {
    /// Save a new beneficiary
    Add {
        name: String,

        #[arg(long)]
        country: String,

        /// Payout method, e.g. "Bank transfer" or "Mobile wallet"
        #[arg(long)]
        method: String,
    },

    /// List saved beneficiaries
    List,

    /// Mark a beneficiary as verified
    Verify {
        /// Beneficiary ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum SupportCommands {
    /// Submit a support ticket
    Submit {
        message: String,

        /// Contact name (defaults to the account holder)
        #[arg(long)]
        name: Option<String>,

        /// Contact email (defaults to the account email)
        #[arg(long)]
        email: Option<String>,
    },

    /// List this account's tickets
    List,

    /// Mark a ticket as resolved
    Resolve {
        /// Ticket ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum KycCommands {
    /// Submit identity documents for review
    Submit {
        /// Document type, e.g. "passport" or "national id"
        #[arg(long)]
        document_type: String,

        #[arg(long)]
        document_number: String,
    },

    /// List this account's submissions
    List,

    /// Approve or reject a pending submission
    Review {
        /// Submission ID
        id: String,

        /// Decision: approved, rejected
        #[arg(long)]
        status: String,
    },
}

#[derive(Subcommand)]
pub enum FraudCommands {
    /// Flag one of this account's transactions
    Flag {
        /// Transaction ID
        transaction: String,

        /// Alert type, e.g. "velocity" or "unusual location"
        #[arg(long = "type")]
        alert_type: String,

        #[arg(long)]
        description: String,

        /// Risk score from 0 to 100
        #[arg(long, default_value_t = 50)]
        risk: u8,
    },

    /// List fraud alerts (this account's, or every account's with --all)
    List {
        #[arg(long)]
        all: bool,

        /// Only alerts that are not resolved
        #[arg(long)]
        active: bool,
    },

    /// Move an alert along its review workflow
    Update {
        /// Alert ID
        id: String,

        /// New status: under_investigation, resolved
        #[arg(long)]
        status: String,
    },
}

#[derive(Subcommand)]
pub enum AgentCommands {
    /// Register a cash agent
    Add {
        name: String,

        #[arg(long)]
        city: String,

        /// Opening hours, e.g. "08:00-18:00"
        #[arg(long)]
        hours: Option<String>,
    },

    /// List agents
    List,

    /// Update an agent's details
    Update {
        /// Agent ID
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        city: Option<String>,

        #[arg(long)]
        hours: Option<String>,

        /// Total commissions earned
        #[arg(long)]
        commissions: Option<String>,

        /// Status: open, closed
        #[arg(long)]
        status: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = LedgerConfig::from_env();

        match self.command {
            Commands::Init { demo } => {
                let service = LedgerService::init_with_config(&self.database, config).await?;
                println!("Database initialized: {}", self.database);
                if demo {
                    seed_demo(&service).await?;
                }
            }

            Commands::Account(account_cmd) => {
                let service = LedgerService::connect(&self.database, config).await?;
                run_account_command(&service, self.account.as_deref(), account_cmd).await?;
            }

            Commands::Send {
                amount,
                to,
                beneficiary,
                currency,
                note,
            } => {
                let service = LedgerService::connect(&self.database, config).await?;
                let session = open_session(&service, self.account.as_deref()).await?;
                let amount =
                    parse_amount(&amount).context("Invalid amount format. Use '50.00' or '50'")?;

                let tx = match beneficiary {
                    Some(id) => {
                        let id = Uuid::parse_str(&id)
                            .context("Invalid beneficiary ID format (expected UUID)")?;
                        session
                            .send_to_beneficiary(id, amount, currency.as_deref(), note.as_deref())
                            .await?
                    }
                    None => {
                        let mut request =
                            TransferRequest::new(to.unwrap_or_default(), amount);
                        request.currency = currency;
                        request.note = note;
                        session.send(request).await?
                    }
                };

                println!(
                    "Sent {} to {} (fee {}) ({})",
                    format_currency(tx.amount, &tx.currency),
                    tx.counterpart,
                    format_currency(tx.fee, &session.account().await.base_currency),
                    tx.id
                );
                print_balance(&session).await;
            }

            Commands::Receive {
                amount,
                from,
                currency,
                note,
            } => {
                let service = LedgerService::connect(&self.database, config).await?;
                let session = open_session(&service, self.account.as_deref()).await?;
                let amount =
                    parse_amount(&amount).context("Invalid amount format. Use '50.00' or '50'")?;

                let mut request = TransferRequest::new(from.unwrap_or_default(), amount);
                request.currency = currency;
                request.note = note;
                let tx = session.receive(request).await?;

                println!(
                    "Received {} from {} ({})",
                    format_currency(tx.amount, &tx.currency),
                    tx.counterpart,
                    tx.id
                );
                print_balance(&session).await;
            }

            Commands::Request { amount, from, note } => {
                let service = LedgerService::connect(&self.database, config).await?;
                let session = open_session(&service, self.account.as_deref()).await?;
                let amount =
                    parse_amount(&amount).context("Invalid amount format. Use '50.00' or '50'")?;

                let request = session.request_money(&from, amount, note.as_deref()).await?;
                println!(
                    "Requested {} from {} ({})",
                    format_currency(request.amount, &request.currency),
                    request.counterpart,
                    request.id
                );
            }

            Commands::Quote { amount, currency } => {
                let service = LedgerService::connect(&self.database, config).await?;
                let session = open_session(&service, self.account.as_deref()).await?;
                let amount =
                    parse_amount(&amount).context("Invalid amount format. Use '50.00' or '50'")?;

                let quote = session.quote(amount, currency.as_deref()).await?;
                let base = session.account().await.base_currency;
                println!("Amount:      {}", format_currency(quote.amount, &quote.currency));
                println!("Rate:        {}", quote.fx_rate);
                println!("In {}:      {}", base, format_currency(quote.base_amount, &base));
                println!("Fee:         {}", format_currency(quote.fee, &base));
                println!("Total debit: {}", format_currency(quote.total_debit, &base));
            }

            Commands::Beneficiary(beneficiary_cmd) => {
                let service = LedgerService::connect(&self.database, config).await?;
                let session = open_session(&service, self.account.as_deref()).await?;
                run_beneficiary_command(&session, beneficiary_cmd).await?;
            }

            Commands::Balance => {
                let service = LedgerService::connect(&self.database, config).await?;
                let session = open_session(&service, self.account.as_deref()).await?;
                let account = session.account().await;
                println!(
                    "{}: {}",
                    account.name,
                    format_currency(account.balance(), &account.base_currency)
                );
            }

            Commands::History {
                direction,
                from_date,
                to_date,
                limit,
            } => {
                let service = LedgerService::connect(&self.database, config).await?;
                let session = open_session(&service, self.account.as_deref()).await?;
                run_history_command(&session, direction, from_date, to_date, limit).await?;
            }

            Commands::Notifications => {
                let service = LedgerService::connect(&self.database, config).await?;
                let session = open_session(&service, self.account.as_deref()).await?;
                let notifications = session.notifications().await;
                if notifications.is_empty() {
                    println!("No notifications.");
                } else {
                    for message in notifications {
                        println!("- {}", message);
                    }
                }
            }

            Commands::Rates => {
                let rates = &config.rates;
                println!("Base currency: {}", rates.base());
                println!();
                println!("{:<8} {:>12}", "CODE", "RATE");
                println!("{}", "-".repeat(21));
                for (code, rate) in rates.iter() {
                    println!("{:<8} {:>12}", code, rate);
                }
                println!();
                println!("Transfer fee: {}%", config.fee_rate * Decimal::ONE_HUNDRED);
            }

            Commands::Check => {
                let service = LedgerService::connect(&self.database, config).await?;
                let session = open_session(&service, self.account.as_deref()).await?;
                run_check_command(&session).await?;
            }

            Commands::Report { from, to, format } => {
                let service = LedgerService::connect(&self.database, config).await?;
                let session = open_session(&service, self.account.as_deref()).await?;
                run_report_command(&session, from, to, &format).await?;
            }

            Commands::Support(support_cmd) => {
                let service = LedgerService::connect(&self.database, config).await?;
                let session = open_session(&service, self.account.as_deref()).await?;
                run_support_command(&session, support_cmd).await?;
            }

            Commands::Kyc(kyc_cmd) => {
                let service = LedgerService::connect(&self.database, config).await?;
                let session = open_session(&service, self.account.as_deref()).await?;
                run_kyc_command(&session, kyc_cmd).await?;
            }

            Commands::Fraud(fraud_cmd) => {
                let service = LedgerService::connect(&self.database, config).await?;
                run_fraud_command(&service, self.account.as_deref(), fraud_cmd).await?;
            }

            Commands::Agent(agent_cmd) => {
                let service = LedgerService::connect(&self.database, config).await?;
                run_agent_command(&service, agent_cmd).await?;
            }

            Commands::Export {
                export_type,
                output,
            } => {
                let service = LedgerService::connect(&self.database, config).await?;
                run_export_command(
                    &service,
                    self.account.as_deref(),
                    &export_type,
                    output.as_deref(),
                )
                .await?;
            }

            Commands::Import { input, validate } => {
                let service = LedgerService::connect(&self.database, config).await?;
                run_import_command(&service, input.as_deref(), validate).await?;
            }
        }

        Ok(())
    }
}

/// Resolve the account to act on. Without an explicit account, the only
/// account in the store is used.
async fn open_session(service: &LedgerService, account: Option<&str>) -> Result<LedgerSession> {
    let id_or_email = match account {
        Some(account) => account.to_string(),
        None => {
            let accounts = service.list_accounts().await?;
            match accounts.as_slice() {
                [only] => only.id.to_string(),
                [] => anyhow::bail!("No accounts found. Create one with 'swiftsend account create'"),
                _ => anyhow::bail!(
                    "Several accounts exist; choose one with --account or SWIFTSEND_ACCOUNT"
                ),
            }
        }
    };
    Ok(service.open_session(&id_or_email).await?)
}

async fn print_balance(session: &LedgerSession) {
    let account = session.account().await;
    println!(
        "Balance: {}",
        format_currency(account.balance(), &account.base_currency)
    );
}

async fn seed_demo(service: &LedgerService) -> Result<()> {
    let account = service
        .create_account(
            "Alex Morgan",
            Some("alex@swiftsend.app"),
            Some("+1 415 555 0134"),
            Decimal::new(825075, 2),
        )
        .await?;
    let session = service.open_session(&account.id.to_string()).await?;
    let beneficiary = session
        .add_beneficiary("Jamie Lee", "Philippines", "Mobile wallet")
        .await?;

    println!(
        "Created demo account: {} <{}> with {}",
        account.name,
        account.email.as_deref().unwrap_or(""),
        format_currency(account.balance(), &account.base_currency)
    );
    println!("Saved beneficiary: {} ({})", beneficiary.name, beneficiary.id);
    Ok(())
}

async fn run_account_command(
    service: &LedgerService,
    selected: Option<&str>,
    cmd: AccountCommands,
) -> Result<()> {
    match cmd {
        AccountCommands::Create {
            name,
            email,
            phone,
            opening_balance,
        } => {
            let opening = parse_amount(&opening_balance)
                .context("Invalid opening balance. Use '50.00' or '50'")?;
            let account = service
                .create_account(&name, email.as_deref(), phone.as_deref(), opening)
                .await?;
            println!("Created account: {} ({})", account.name, account.id);
        }

        AccountCommands::List => {
            let accounts = service.list_accounts().await?;
            if accounts.is_empty() {
                println!("No accounts found.");
            } else {
                println!("{:<38} {:<20} {:>14}", "ID", "NAME", "BALANCE");
                println!("{}", "-".repeat(74));
                for account in accounts {
                    println!(
                        "{:<38} {:<20} {:>14}",
                        account.id,
                        truncate(&account.name, 20),
                        format_currency(account.balance(), &account.base_currency)
                    );
                }
            }
        }

        AccountCommands::Show => {
            let session = open_session(service, selected).await?;
            let account = session.account().await;
            let transactions = session.transactions().await;
            let beneficiaries = session.beneficiaries().await;

            println!("Account: {}", account.name);
            println!("  ID:             {}", account.id);
            if let Some(email) = &account.email {
                println!("  Email:          {}", email);
            }
            if let Some(phone) = &account.phone {
                println!("  Phone:          {}", phone);
            }
            println!("  Base currency:  {}", account.base_currency);
            println!("  KYC status:     {}", account.kyc_status);
            println!(
                "  Created:        {}",
                account.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            println!();
            println!(
                "  Balance:        {}",
                format_currency(account.balance(), &account.base_currency)
            );
            println!("  Transactions:   {}", transactions.len());
            println!("  Beneficiaries:  {}", beneficiaries.len());
            if let Some(last) = transactions.first() {
                println!("  Last activity:  {}", last.timestamp.format("%Y-%m-%d %H:%M:%S"));
            }
        }
    }
    Ok(())
}

async fn run_beneficiary_command(session: &LedgerSession, cmd: BeneficiaryCommands) -> Result<()> {
    match cmd {
        BeneficiaryCommands::Add {
            name,
            country,
            method,
        } => {
            let beneficiary = session.add_beneficiary(&name, &country, &method).await?;
            println!("Added beneficiary: {} ({})", beneficiary.name, beneficiary.id);
        }

        BeneficiaryCommands::List => {
            let beneficiaries = session.beneficiaries().await;
            if beneficiaries.is_empty() {
                println!("No beneficiaries found.");
            } else {
                println!(
                    "{:<38} {:<20} {:<15} {:<15} VERIFIED",
                    "ID", "NAME", "COUNTRY", "METHOD"
                );
                println!("{}", "-".repeat(98));
                for b in beneficiaries {
                    println!(
                        "{:<38} {:<20} {:<15} {:<15} {}",
                        b.id,
                        truncate(&b.name, 20),
                        truncate(&b.country, 15),
                        truncate(&b.method, 15),
                        if b.verified { "yes" } else { "no" }
                    );
                }
            }
        }

        BeneficiaryCommands::Verify { id } => {
            let id = Uuid::parse_str(&id).context("Invalid beneficiary ID format (expected UUID)")?;
            let beneficiary = session.verify_beneficiary(id).await?;
            println!("Verified beneficiary: {}", beneficiary.name);
        }
    }
    Ok(())
}

async fn run_history_command(
    session: &LedgerSession,
    direction: Option<String>,
    from_date: Option<String>,
    to_date: Option<String>,
    limit: Option<usize>,
) -> Result<()> {
    let direction = direction
        .map(|d| {
            Direction::from_str(&d).ok_or_else(|| {
                anyhow::anyhow!("Invalid direction '{}'. Valid values: sent, received", d)
            })
        })
        .transpose()?;

    let filter = HistoryFilter {
        direction,
        from_date: from_date
            .map(|s| parse_date(&s))
            .transpose()
            .context("Invalid from-date")?,
        to_date: to_date
            .map(|s| parse_date(&s))
            .transpose()
            .context("Invalid to-date")?,
        limit,
    };

    let transactions = session.history(&filter).await;
    if transactions.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }

    println!(
        "{:>4} {:<12} {:<9} {:>14} {:<20} NOTE",
        "SEQ", "DATE", "TYPE", "AMOUNT", "COUNTERPART"
    );
    println!("{}", "-".repeat(80));
    for tx in transactions {
        println!(
            "{:>4} {:<12} {:<9} {:>14} {:<20} {}",
            tx.sequence,
            tx.timestamp.format("%Y-%m-%d"),
            tx.direction,
            format_currency(tx.amount, &tx.currency),
            truncate(&tx.counterpart, 20),
            truncate(tx.note.as_deref().unwrap_or(""), 30)
        );
    }
    Ok(())
}

async fn run_check_command(session: &LedgerSession) -> Result<()> {
    println!("Checking ledger integrity...\n");

    let report = session.check_integrity().await;
    let base = session.account().await.base_currency;

    println!("Transactions:     {}", report.transaction_count);
    println!(
        "Opening balance:  {}",
        format_currency(report.opening_balance, &base)
    );
    println!(
        "Expected balance: {}",
        format_currency(report.expected_balance, &base)
    );
    println!(
        "Actual balance:   {}  {}",
        format_currency(report.actual_balance, &base),
        if report.balance_matches() {
            "OK"
        } else {
            "MISMATCH!"
        }
    );
    println!();

    if report.is_ok() {
        println!("Ledger is consistent.");
    } else {
        println!("Issues found:");
        for issue in report.issues() {
            println!("  - {}", issue);
        }
        anyhow::bail!("Ledger integrity check failed");
    }

    Ok(())
}

async fn run_report_command(
    session: &LedgerSession,
    from: Option<String>,
    to: Option<String>,
    format: &str,
) -> Result<()> {
    let (from_date, to_date) = parse_date_range(from, to)?;
    let report = session.activity_report(from_date, to_date).await?;
    let base = session.account().await.base_currency;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            println!("Activity Report");
            println!(
                "Period: {} to {}",
                from_date.format("%Y-%m-%d"),
                to_date.format("%Y-%m-%d")
            );
            println!();
            println!("{:<20} {:>14}", "Transactions", report.transaction_count);
            println!("{:<20} {:>14}", "  sent", report.sent_count);
            println!("{:<20} {:>14}", "  received", report.received_count);
            println!(
                "{:<20} {:>14}",
                "Total sent",
                format_currency(report.total_sent, &base)
            );
            println!(
                "{:<20} {:>14}",
                "Total received",
                format_currency(report.total_received, &base)
            );
            println!(
                "{:<20} {:>14}",
                "Fees paid",
                format_currency(report.total_fees, &base)
            );
            println!("{}", "-".repeat(35));
            println!("{:<20} {:>14}", "Net", format_currency(report.net, &base));

            if !report.currencies.is_empty() {
                println!();
                println!(
                    "{:<10} {:>14} {:>14} {:>8}",
                    "CURRENCY", "SENT", "RECEIVED", "COUNT"
                );
                println!("{}", "-".repeat(49));
                for c in &report.currencies {
                    println!(
                        "{:<10} {:>14} {:>14} {:>8}",
                        c.currency,
                        format_currency(c.sent, &c.currency),
                        format_currency(c.received, &c.currency),
                        c.count
                    );
                }
            }

            println!();
            println!("Open support tickets: {}", report.open_tickets);
            println!("Pending KYC reviews:  {}", report.pending_kyc);
            println!(
                "Active fraud alerts:  {} ({} high risk)",
                report.active_fraud_alerts, report.high_risk_alerts
            );
        }
    }
    Ok(())
}

async fn run_support_command(session: &LedgerSession, cmd: SupportCommands) -> Result<()> {
    match cmd {
        SupportCommands::Submit {
            message,
            name,
            email,
        } => {
            let account = session.account().await;
            let name = name.unwrap_or_else(|| account.name.clone());
            let email = email
                .or(account.email)
                .context("No contact email; pass --email")?;
            let ticket = session
                .submit_support_ticket(&name, &email, &message)
                .await?;
            println!("Submitted support ticket: {}", ticket.id);
        }

        SupportCommands::List => {
            let tickets = session.list_support_tickets().await?;
            if tickets.is_empty() {
                println!("No support tickets found.");
            } else {
                println!("{:<38} {:<12} {:<10} MESSAGE", "ID", "DATE", "STATUS");
                println!("{}", "-".repeat(90));
                for ticket in tickets {
                    println!(
                        "{:<38} {:<12} {:<10} {}",
                        ticket.id,
                        ticket.created_at.format("%Y-%m-%d"),
                        ticket.status,
                        truncate(&ticket.message, 30)
                    );
                }
            }
        }

        SupportCommands::Resolve { id } => {
            let id = Uuid::parse_str(&id).context("Invalid ticket ID format (expected UUID)")?;
            let ticket = session.resolve_support_ticket(id).await?;
            println!("Resolved support ticket: {}", ticket.id);
        }
    }
    Ok(())
}

async fn run_kyc_command(session: &LedgerSession, cmd: KycCommands) -> Result<()> {
    match cmd {
        KycCommands::Submit {
            document_type,
            document_number,
        } => {
            let submission = session.submit_kyc(&document_type, &document_number).await?;
            println!("Submitted KYC documents: {}", submission.id);
        }

        KycCommands::List => {
            let submissions = session.list_kyc_submissions().await?;
            if submissions.is_empty() {
                println!("No KYC submissions found.");
            } else {
                println!("{:<38} {:<12} {:<16} STATUS", "ID", "DATE", "DOCUMENT");
                println!("{}", "-".repeat(78));
                for submission in submissions {
                    println!(
                        "{:<38} {:<12} {:<16} {}",
                        submission.id,
                        submission.submitted_at.format("%Y-%m-%d"),
                        truncate(&submission.document_type, 16),
                        submission.status
                    );
                }
            }
        }

        KycCommands::Review { id, status } => {
            let id = Uuid::parse_str(&id).context("Invalid submission ID format (expected UUID)")?;
            let decision = KycStatus::from_str(&status).ok_or_else(|| {
                anyhow::anyhow!("Invalid status '{}'. Valid values: approved, rejected", status)
            })?;
            let submission = session.review_kyc(id, decision).await?;
            println!("KYC submission {} {}", submission.id, submission.status);
        }
    }
    Ok(())
}

async fn run_fraud_command(
    service: &LedgerService,
    account: Option<&str>,
    cmd: FraudCommands,
) -> Result<()> {
    match cmd {
        FraudCommands::Flag {
            transaction,
            alert_type,
            description,
            risk,
        } => {
            let session = open_session(service, account).await?;
            let id = Uuid::parse_str(&transaction)
                .context("Invalid transaction ID format (expected UUID)")?;
            let alert = session
                .flag_transaction(id, &alert_type, &description, risk)
                .await?;
            println!("Raised fraud alert: {} (risk {})", alert.id, alert.risk_score);
        }

        FraudCommands::List { all, active } => {
            let mut alerts = if all {
                service.list_fraud_alerts(active).await?
            } else {
                open_session(service, account)
                    .await?
                    .list_fraud_alerts()
                    .await?
            };
            if active {
                alerts.retain(|alert| alert.is_active());
            }

            if alerts.is_empty() {
                println!("No fraud alerts found.");
            } else {
                println!(
                    "{:<38} {:<16} {:>5} {:>14} STATUS",
                    "ID", "TYPE", "RISK", "AMOUNT"
                );
                println!("{}", "-".repeat(96));
                for alert in alerts {
                    println!(
                        "{:<38} {:<16} {:>5} {:>14} {}",
                        alert.id,
                        truncate(&alert.alert_type, 16),
                        alert.risk_score,
                        format_currency(alert.amount, &alert.currency),
                        alert.status
                    );
                }
            }
        }

        FraudCommands::Update { id, status } => {
            let id = Uuid::parse_str(&id).context("Invalid alert ID format (expected UUID)")?;
            let status = FraudAlertStatus::from_str(&status).ok_or_else(|| {
                anyhow::anyhow!(
                    "Invalid status '{}'. Valid values: under_investigation, resolved",
                    status
                )
            })?;
            let alert = service.update_fraud_alert_status(id, status).await?;
            println!("Fraud alert {} is now {}", alert.id, alert.status);
        }
    }
    Ok(())
}

async fn run_agent_command(service: &LedgerService, cmd: AgentCommands) -> Result<()> {
    match cmd {
        AgentCommands::Add { name, city, hours } => {
            let agent = service.add_agent(&name, &city, hours.as_deref()).await?;
            println!("Added agent: {} ({})", agent.name, agent.id);
        }

        AgentCommands::List => {
            let agents = service.list_agents().await?;
            if agents.is_empty() {
                println!("No agents found.");
            } else {
                println!(
                    "{:<38} {:<20} {:<15} {:<12} {:<7} COMMISSIONS",
                    "ID", "NAME", "CITY", "HOURS", "STATUS"
                );
                println!("{}", "-".repeat(108));
                for agent in agents {
                    println!(
                        "{:<38} {:<20} {:<15} {:<12} {:<7} {}",
                        agent.id,
                        truncate(&agent.name, 20),
                        truncate(&agent.city, 15),
                        agent.hours.as_deref().unwrap_or("-"),
                        agent.status,
                        agent.commissions
                    );
                }
            }
        }

        AgentCommands::Update {
            id,
            name,
            city,
            hours,
            commissions,
            status,
        } => {
            let id = Uuid::parse_str(&id).context("Invalid agent ID format (expected UUID)")?;
            let update = AgentUpdate {
                name,
                city,
                hours,
                commissions: commissions
                    .map(|c| parse_amount(&c))
                    .transpose()
                    .context("Invalid commissions amount")?,
                status: status
                    .map(|s| {
                        AgentStatus::from_str(&s).ok_or_else(|| {
                            anyhow::anyhow!("Invalid status '{}'. Valid values: open, closed", s)
                        })
                    })
                    .transpose()?,
            };
            let agent = service.update_agent(id, update).await?;
            println!("Updated agent: {} ({})", agent.name, agent.status);
        }
    }
    Ok(())
}

async fn run_export_command(
    service: &LedgerService,
    account: Option<&str>,
    export_type: &str,
    output: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{stdout, Write};

    let exporter = Exporter::new(service);

    // Determine output writer
    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match export_type {
        "transactions" => {
            let session = open_session(service, account).await?;
            let count = exporter.export_transactions_csv(&session, writer).await?;
            if output.is_some() {
                eprintln!("Exported {} transactions", count);
            }
        }
        "full" => {
            let snapshot = exporter.export_full_json(writer).await?;
            if output.is_some() {
                let total: usize = snapshot.sections.values().map(Vec::len).sum();
                eprintln!(
                    "Exported full database: {} records in {} sections",
                    total,
                    snapshot.sections.len()
                );
            }
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: transactions, full",
                export_type
            );
        }
    }

    Ok(())
}

async fn run_import_command(
    service: &LedgerService,
    input: Option<&str>,
    validate: bool,
) -> Result<()> {
    use crate::io::{ImportOptions, Importer};
    use std::fs::File;
    use std::io::{stdin, Read};

    let importer = Importer::new(service);

    // Determine input reader
    let reader: Box<dyn Read> = match input {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("Failed to open input file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdin()),
    };

    let options = ImportOptions {
        validate_only: validate,
    };
    let result = importer.import_full_json(reader, options).await?;

    if !result.errors.is_empty() {
        println!("Import rejected: {} invalid records", result.errors.len());
        for error in result.errors.iter().take(10) {
            println!("  {}[{}]: {}", error.section, error.index, error.error);
        }
        if result.errors.len() > 10 {
            println!("  ... and {} more errors", result.errors.len() - 10);
        }
        anyhow::bail!("Import failed");
    }

    if validate {
        println!("Validation successful");
    } else {
        println!("Import complete");
        for (section, count) in &result.imported {
            println!("  {:<16} {}", section, count);
        }
    }

    Ok(())
}

fn parse_date_range(
    from: Option<String>,
    to: Option<String>,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    use chrono::Datelike;

    let now = Utc::now();

    // Default to_date is now
    let to_date = match to {
        Some(date_str) => parse_date(&date_str)?,
        None => now,
    };

    // Default from_date is start of current month
    let from_date = match from {
        Some(date_str) => parse_date(&date_str)?,
        None => {
            let start = now
                .date_naive()
                .with_day(1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .ok_or_else(|| anyhow::anyhow!("Invalid date"))?;
            DateTime::from_naive_utc_and_offset(start, Utc)
        }
    };

    if from_date > to_date {
        anyhow::bail!("From date must be before to date");
    }

    Ok((from_date, to_date))
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}

fn parse_date(date_str: &str) -> Result<DateTime<Utc>> {
    use chrono::NaiveDate;

    // Parse YYYY-MM-DD format
    let naive_date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .context("Date must be in YYYY-MM-DD format")?;

    // Convert to UTC datetime at midnight
    let naive_datetime = naive_date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow::anyhow!("Invalid date"))?;

    Ok(DateTime::from_naive_utc_and_offset(naive_datetime, Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        let date = parse_date("2024-03-15").unwrap();
        assert_eq!(date.format("%Y-%m-%d").to_string(), "2024-03-15");
        assert!(parse_date("15/03/2024").is_err());
    }

    #[test]
    fn test_parse_date_range_rejects_inverted() {
        let result = parse_date_range(Some("2024-03-15".into()), Some("2024-03-01".into()));
        assert!(result.is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Jamie Lee", 20), "Jamie Lee");
        assert_eq!(truncate("A very long beneficiary name", 10), "A very ...");
    }

    #[test]
    fn test_cli_parses_send() {
        let cli = Cli::try_parse_from([
            "swiftsend",
            "send",
            "120",
            "--to",
            "Jamie Lee",
            "--currency",
            "EUR",
        ])
        .unwrap();
        match cli.command {
            Commands::Send { amount, to, currency, .. } => {
                assert_eq!(amount, "120");
                assert_eq!(to.as_deref(), Some("Jamie Lee"));
                assert_eq!(currency.as_deref(), Some("EUR"));
            }
            _ => panic!("expected send"),
        }
    }

    #[test]
    fn test_cli_send_requires_recipient() {
        assert!(Cli::try_parse_from(["swiftsend", "send", "120"]).is_err());
    }

    #[test]
    fn test_cli_parses_fraud_flag() {
        let cli = Cli::try_parse_from([
            "swiftsend",
            "fraud",
            "flag",
            "6f9619ff-8b86-d011-b42d-00cf4fc964ff",
            "--type",
            "velocity",
            "--description",
            "Three sends in a minute",
            "--risk",
            "85",
        ])
        .unwrap();
        match cli.command {
            Commands::Fraud(FraudCommands::Flag { alert_type, risk, .. }) => {
                assert_eq!(alert_type, "velocity");
                assert_eq!(risk, 85);
            }
            _ => panic!("expected fraud flag"),
        }
        assert!(Cli::try_parse_from([
            "swiftsend", "fraud", "flag", "x", "--type", "v", "--description", "d", "--risk", "300"
        ])
        .is_err());
    }

    #[test]
    fn test_cli_parses_agent_update() {
        let cli = Cli::try_parse_from([
            "swiftsend", "agent", "update", "some-id", "--status", "closed",
        ])
        .unwrap();
        match cli.command {
            Commands::Agent(AgentCommands::Update { status, city, .. }) => {
                assert_eq!(status.as_deref(), Some("closed"));
                assert!(city.is_none());
            }
            _ => panic!("expected agent update"),
        }
    }
}

mod common;

use anyhow::Result;
use common::{db_path, test_service, DemoAccount};
use rust_decimal_macros::dec;
use swiftsend::application::{AppError, LedgerService};
use swiftsend::config::LedgerConfig;
use swiftsend::domain::{
    AgentStatus, AgentUpdate, FraudAlertStatus, KycStatus, LedgerError, TransferRequest,
};
use uuid::Uuid;

#[tokio::test]
async fn test_kyc_submit_and_approve() -> Result<()> {
    let (service, temp) = test_service().await?;
    let session = DemoAccount::create(&service).await?;
    assert_eq!(session.account().await.kyc_status, KycStatus::Pending);

    let submission = session.submit_kyc("passport", "X1234567").await?;
    assert_eq!(submission.status, KycStatus::Pending);
    assert_eq!(
        session.notifications().await[0],
        "KYC documents submitted for review"
    );

    let reviewed = session.review_kyc(submission.id, KycStatus::Approved).await?;
    assert_eq!(reviewed.status, KycStatus::Approved);
    assert!(reviewed.reviewed_at.is_some());
    assert_eq!(session.account().await.kyc_status, KycStatus::Approved);

    // Both the submission and the account survive a reload
    let reconnected = LedgerService::connect(&db_path(&temp), LedgerConfig::default()).await?;
    let reloaded = reconnected.open_session(DemoAccount::EMAIL).await?;
    assert_eq!(reloaded.account().await.kyc_status, KycStatus::Approved);
    assert_eq!(reloaded.list_kyc_submissions().await?, vec![reviewed]);

    // Verified accounts don't file again
    let err = reloaded.submit_kyc("passport", "X999").await.unwrap_err();
    assert!(matches!(err, AppError::Ledger(LedgerError::Validation(_))));

    Ok(())
}

#[tokio::test]
async fn test_kyc_rejection_allows_resubmission() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let session = DemoAccount::create(&service).await?;

    let first = session.submit_kyc("national id", "A-1").await?;
    session.review_kyc(first.id, KycStatus::Rejected).await?;
    assert_eq!(session.account().await.kyc_status, KycStatus::Rejected);
    assert_eq!(session.notifications().await[0], "KYC verification rejected");

    // A reviewed submission can't be reviewed twice
    let err = session
        .review_kyc(first.id, KycStatus::Approved)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Ledger(LedgerError::Validation(_))));
    assert_eq!(session.account().await.kyc_status, KycStatus::Rejected);

    session.submit_kyc("passport", "P-2").await?;
    assert_eq!(session.account().await.kyc_status, KycStatus::Pending);
    assert_eq!(session.list_kyc_submissions().await?.len(), 2);

    let err = session
        .review_kyc(Uuid::new_v4(), KycStatus::Approved)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::KycSubmissionNotFound(_)));

    Ok(())
}

#[tokio::test]
async fn test_kyc_submissions_scoped_to_account() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let alex = DemoAccount::create(&service).await?;
    service
        .create_account("Jamie Lee", Some("jamie@swiftsend.app"), None, dec!(0))
        .await?;
    let jamie = service.open_session("jamie@swiftsend.app").await?;

    let submission = alex.submit_kyc("passport", "X1").await?;
    assert!(jamie.list_kyc_submissions().await?.is_empty());

    let err = jamie
        .review_kyc(submission.id, KycStatus::Approved)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::KycSubmissionNotFound(_)));
    assert_eq!(alex.account().await.kyc_status, KycStatus::Pending);

    Ok(())
}

#[tokio::test]
async fn test_fraud_alert_workflow() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let session = DemoAccount::create(&service).await?;
    let tx = session
        .send(TransferRequest::new("Jamie", dec!(5000)).with_currency("EUR"))
        .await?;

    let alert = session
        .flag_transaction(tx.id, "velocity", "Large first transfer", 85)
        .await?;
    assert_eq!(alert.status, FraudAlertStatus::PendingReview);
    assert_eq!(alert.amount, dec!(5000));
    assert_eq!(alert.currency, "EUR");
    assert!(alert.is_high_risk());
    assert_eq!(session.list_fraud_alerts().await?, vec![alert.clone()]);

    let investigating = service
        .update_fraud_alert_status(alert.id, FraudAlertStatus::UnderInvestigation)
        .await?;
    assert_eq!(investigating.status, FraudAlertStatus::UnderInvestigation);

    // Alerts don't move backwards, and a refused move writes nothing
    let err = service
        .update_fraud_alert_status(alert.id, FraudAlertStatus::PendingReview)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Ledger(LedgerError::Validation(_))));
    assert_eq!(
        service.list_fraud_alerts(false).await?[0].status,
        FraudAlertStatus::UnderInvestigation
    );

    service
        .update_fraud_alert_status(alert.id, FraudAlertStatus::Resolved)
        .await?;
    assert!(service.list_fraud_alerts(true).await?.is_empty());
    assert_eq!(service.list_fraud_alerts(false).await?.len(), 1);

    let err = service
        .update_fraud_alert_status(Uuid::new_v4(), FraudAlertStatus::Resolved)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::FraudAlertNotFound(_)));

    Ok(())
}

#[tokio::test]
async fn test_flag_requires_own_transaction() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let session = DemoAccount::create(&service).await?;

    let err = session
        .flag_transaction(Uuid::new_v4(), "velocity", "Unknown", 50)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Ledger(LedgerError::NotFound { kind: "Transaction", .. })
    ));

    let tx = session.send(TransferRequest::new("Jamie", dec!(10))).await?;
    let err = session
        .flag_transaction(tx.id, "velocity", "Too risky", 101)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Ledger(LedgerError::Validation(_))));
    assert!(session.list_fraud_alerts().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_report_counts_compliance_work() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let session = DemoAccount::create(&service).await?;
    let tx = session.send(TransferRequest::new("Jamie", dec!(100))).await?;

    session.submit_kyc("passport", "X1").await?;
    session
        .flag_transaction(tx.id, "velocity", "Burst of sends", 90)
        .await?;
    session
        .flag_transaction(tx.id, "location", "New device", 30)
        .await?;

    let from = common::parse_date("2000-01-01");
    let to = chrono::Utc::now();
    let report = session.activity_report(from, to).await?;
    assert_eq!(report.pending_kyc, 1);
    assert_eq!(report.active_fraud_alerts, 2);
    assert_eq!(report.high_risk_alerts, 1);

    Ok(())
}

#[tokio::test]
async fn test_agent_management() -> Result<()> {
    let (service, temp) = test_service().await?;

    let agent = service
        .add_agent("Mama Njeri Shop", "Nairobi", Some("08:00-18:00"))
        .await?;
    assert_eq!(agent.status, AgentStatus::Open);
    assert!(service.add_agent("", "Nairobi", None).await.is_err());

    let updated = service
        .update_agent(
            agent.id,
            AgentUpdate {
                commissions: Some(dec!(125.50)),
                ..AgentUpdate::status(AgentStatus::Closed)
            },
        )
        .await?;
    assert_eq!(updated.status, AgentStatus::Closed);
    assert_eq!(updated.commissions, dec!(125.50));
    assert_eq!(updated.city, "Nairobi");
    assert_eq!(updated.hours.as_deref(), Some("08:00-18:00"));

    let err = service
        .update_agent(agent.id, AgentUpdate::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Ledger(LedgerError::Validation(_))));

    let err = service
        .update_agent(Uuid::new_v4(), AgentUpdate::status(AgentStatus::Open))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AgentNotFound(_)));

    let reconnected = LedgerService::connect(&db_path(&temp), LedgerConfig::default()).await?;
    assert_eq!(reconnected.list_agents().await?, vec![updated]);

    Ok(())
}

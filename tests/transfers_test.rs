mod common;

use anyhow::Result;
use common::{test_service, DemoAccount};
use rust_decimal_macros::dec;
use swiftsend::application::{AppError, HistoryFilter};
use swiftsend::domain::{Direction, LedgerError, TransferRequest};

#[tokio::test]
async fn test_send_to_beneficiary_scenario() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (session, jamie) = DemoAccount::create_with_beneficiary(&service).await?;

    let tx = session
        .send_to_beneficiary(jamie.id, dec!(120), Some("USD"), None)
        .await?;

    assert_eq!(tx.fee, dec!(1.5));
    assert_eq!(tx.counterpart, "Jamie Lee");
    assert_eq!(tx.beneficiary_id, Some(jamie.id));
    assert_eq!(session.balance().await, dec!(8129.25));

    let notifications = session.notifications().await;
    assert_eq!(notifications[0], "You sent $120.00 to Jamie Lee");

    Ok(())
}

#[tokio::test]
async fn test_send_in_foreign_currency_converts_to_base() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let session = DemoAccount::create(&service).await?;

    let tx = session
        .send(TransferRequest::new("Ana", dec!(100)).with_currency("EUR"))
        .await?;

    assert_eq!(tx.fx_rate, dec!(1.08));
    assert_eq!(tx.fee, dec!(1.35));
    assert_eq!(session.balance().await, dec!(8250.75) - dec!(109.35));
    assert_eq!(session.notifications().await[0], "You sent €100.00 to Ana");

    Ok(())
}

#[tokio::test]
async fn test_insufficient_funds_leaves_state_unchanged() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let session = DemoAccount::create(&service).await?;
    let notifications_before = session.notifications().await;

    let err = session
        .send(TransferRequest::new("Jamie Lee", dec!(9000)))
        .await
        .unwrap_err();

    assert_eq!(
        err.as_ledger(),
        Some(&LedgerError::InsufficientFunds {
            balance: dec!(8250.75),
            required: dec!(9112.50),
        })
    );
    assert_eq!(session.balance().await, dec!(8250.75));
    assert!(session.transactions().await.is_empty());
    assert_eq!(session.notifications().await, notifications_before);

    // Nothing reached the store either
    let reloaded = service.open_session(DemoAccount::EMAIL).await?;
    assert_eq!(reloaded.balance().await, dec!(8250.75));

    Ok(())
}

#[tokio::test]
async fn test_exact_balance_can_be_spent() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service
        .create_account("Sam", None, None, dec!(101.25))
        .await?;
    let accounts = service.list_accounts().await?;
    let session = service.open_session(&accounts[0].id.to_string()).await?;

    session.send(TransferRequest::new("Jamie", dec!(100))).await?;
    assert_eq!(session.balance().await, dec!(0));

    Ok(())
}

#[tokio::test]
async fn test_validation_rejections() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (session, _) = DemoAccount::create_with_beneficiary(&service).await?;

    let err = session
        .send(TransferRequest::new("Jamie", dec!(0)))
        .await
        .unwrap_err();
    assert_eq!(err.as_ledger(), Some(&LedgerError::invalid_amount()));

    let err = session
        .send(TransferRequest::new("   ", dec!(10)))
        .await
        .unwrap_err();
    assert_eq!(err.as_ledger(), Some(&LedgerError::recipient_required()));

    let err = session
        .receive(TransferRequest::new("Sam", dec!(-5)))
        .await
        .unwrap_err();
    assert_eq!(err.as_ledger(), Some(&LedgerError::invalid_amount()));

    let err = session
        .add_beneficiary("", "Kenya", "Bank transfer")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Ledger(LedgerError::Validation(_))
    ));

    let err = session
        .send_to_beneficiary(uuid::Uuid::new_v4(), dec!(10), None, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Ledger(LedgerError::NotFound { kind: "Beneficiary", .. })
    ));

    assert_eq!(session.balance().await, dec!(8250.75));
    assert!(session.transactions().await.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_receive_defaults_sender_and_adds_no_fee() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let session = DemoAccount::create(&service).await?;

    let tx = session
        .receive(TransferRequest::new("", dec!(1000)).with_currency("KES"))
        .await?;

    assert_eq!(tx.counterpart, "Unknown Sender");
    assert_eq!(tx.fee, dec!(0));
    assert_eq!(session.balance().await, dec!(8250.75) + dec!(7.8));
    assert_eq!(
        session.notifications().await[0],
        "You received KSh1000.00 from Unknown Sender"
    );

    Ok(())
}

#[tokio::test]
async fn test_request_money_moves_nothing() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let session = DemoAccount::create(&service).await?;

    let request = session.request_money("Jamie Lee", dec!(50), None).await?;

    assert_eq!(request.currency, "USD");
    assert_eq!(session.balance().await, dec!(8250.75));
    assert!(session.transactions().await.is_empty());
    assert_eq!(
        session.notifications().await[0],
        format!("Money request ({}) for $50.00 sent to Jamie Lee", request.id)
    );

    Ok(())
}

#[tokio::test]
async fn test_history_is_most_recent_first() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let session = DemoAccount::create(&service).await?;

    session.send(TransferRequest::new("A", dec!(10))).await?;
    session.receive(TransferRequest::new("B", dec!(20))).await?;
    session.send(TransferRequest::new("C", dec!(30))).await?;

    let history = session.transactions().await;
    let counterparts: Vec<_> = history.iter().map(|t| t.counterpart.as_str()).collect();
    assert_eq!(counterparts, ["C", "B", "A"]);
    let sequences: Vec<_> = history.iter().map(|t| t.sequence).collect();
    assert_eq!(sequences, [3, 2, 1]);

    let received = session
        .history(&HistoryFilter {
            direction: Some(Direction::Received),
            ..Default::default()
        })
        .await;
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].counterpart, "B");

    let limited = session
        .history(&HistoryFilter {
            limit: Some(2),
            ..Default::default()
        })
        .await;
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].counterpart, "C");

    Ok(())
}

#[tokio::test]
async fn test_quote_matches_send() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let session = DemoAccount::create(&service).await?;

    let quote = session.quote(dec!(100), Some("GBP")).await?;
    assert_eq!(quote.base_amount, dec!(127));
    assert_eq!(quote.fee, dec!(1.5875));
    assert_eq!(quote.total_debit, dec!(128.5875));

    session
        .send(TransferRequest::new("Jamie", dec!(100)).with_currency("GBP"))
        .await?;
    assert_eq!(session.balance().await, dec!(8250.75) - quote.total_debit);

    Ok(())
}

#[tokio::test]
async fn test_concurrent_sends_are_serialized() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let session = DemoAccount::create(&service).await?;

    let (a, b) = tokio::join!(
        session.send(TransferRequest::new("A", dec!(100))),
        session.send(TransferRequest::new("B", dec!(100))),
    );
    a?;
    b?;

    assert_eq!(session.balance().await, dec!(8250.75) - dec!(202.50));
    let mut sequences: Vec<_> = session
        .transactions()
        .await
        .iter()
        .map(|t| t.sequence)
        .collect();
    sequences.sort_unstable();
    assert_eq!(sequences, [1, 2]);
    assert!(session.check_integrity().await.is_ok());

    Ok(())
}

#[tokio::test]
async fn test_beneficiary_verification() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (session, jamie) = DemoAccount::create_with_beneficiary(&service).await?;

    assert!(!jamie.verified);
    let verified = session.verify_beneficiary(jamie.id).await?;
    assert!(verified.verified);
    assert_eq!(session.notifications().await[0], "Beneficiary Jamie Lee verified");

    let reloaded = service.open_session(DemoAccount::EMAIL).await?;
    assert!(reloaded.beneficiaries().await[0].verified);

    Ok(())
}

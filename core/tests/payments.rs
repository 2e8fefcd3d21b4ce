//! Cash receipts, online payments and gateway webhook ingestion.

use chrono::NaiveDate;
use ledgerdesk_core::{
    config::LedgerConfig,
    engine::LedgerDesk,
    error::LedgerError,
    gateway::sign_payload,
    instrument::{Denomination, NewCash, NewOnline, OnlineStatus, PaymentKind, PaymentMethod},
    invoice::NewInvoice,
    notify::MemoryNotifier,
    store::{CashFilter, LedgerStore},
};

const SECRET: &str = "whsec_ledger_test";
const NOW: i64 = 1_710_000_000;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn today() -> NaiveDate {
    date(2024, 3, 9)
}

fn desk(config: LedgerConfig) -> LedgerDesk {
    let store = LedgerStore::in_memory().unwrap();
    store.migrate().unwrap();
    LedgerDesk::build(store, config, Box::new(MemoryNotifier::new()), today())
}

fn checkout_body(session: &str, status: &str, amount_minor: i64) -> String {
    format!(
        r#"{{"type":"checkout.session.completed","data":{{"object":{{
            "id":"{session}","payment_intent":"pi_{session}","amount_total":{amount_minor},
            "currency":"inr","payment_status":"{status}",
            "metadata":{{"clientName":"Gupta Electricals","paymentMethod":"UPI"}}}}}}}}"#
    )
}

fn cash(receipt: &str, amount: f64, on: NaiveDate) -> NewCash {
    NewCash {
        client_id: None,
        client_name: "Walk-in".into(),
        receipt_number: receipt.into(),
        amount,
        date: on,
        denominations: vec![Denomination {
            value: 500.0,
            count: (amount / 500.0) as u32,
            total: amount,
        }],
        notes: None,
    }
}

fn online(receipt: &str, amount: f64, status: OnlineStatus) -> NewOnline {
    NewOnline {
        client_id: None,
        client_name: "Gupta".into(),
        receipt_number: receipt.into(),
        method: PaymentMethod::NetBanking,
        amount,
        date: today(),
        status: Some(status),
        verified: true,
        gateway_session_id: None,
        gateway_intent_id: None,
        reference_number: None,
        notes: None,
    }
}

fn invoice(number: &str, amount: f64) -> NewInvoice {
    NewInvoice {
        client_id: None,
        invoice_number: number.into(),
        amount,
        issue_date: date(2024, 2, 10),
        due_date: date(2024, 3, 10),
        description: None,
        items: vec![],
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Gateway
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn signed_webhook_is_recorded_once() {
    let desk = desk(LedgerConfig::default());
    let body = checkout_body("cs_1", "paid", 1_250_000);
    let header = sign_payload(&body, SECRET, NOW).unwrap();

    let first = desk
        .ingest_webhook(&body, &header, SECRET, NOW + 5, today())
        .unwrap()
        .expect("online record");
    assert_eq!(first.amount, 12_500.0);
    assert_eq!(first.method, PaymentMethod::Upi);
    assert_eq!(first.status, OnlineStatus::Success);
    assert_eq!(first.client_name, "Gupta Electricals");

    let replay = desk
        .ingest_webhook(&body, &header, SECRET, NOW + 10, today())
        .unwrap();
    assert!(replay.is_none());
    assert_eq!(desk.store().list_online(None).unwrap().len(), 1);
    assert_eq!(desk.store().event_count("online_recorded").unwrap(), 1);

    let stored = desk.store().find_online_by_session("cs_1").unwrap().unwrap();
    assert_eq!(stored.online_id, first.online_id);
}

#[test]
fn bad_signature_records_nothing() {
    let desk = desk(LedgerConfig::default());
    let body = checkout_body("cs_2", "paid", 500_000);
    let header = sign_payload(&body, "some_other_secret", NOW).unwrap();

    let err = desk.ingest_webhook(&body, &header, SECRET, NOW, today());
    assert!(matches!(err, Err(LedgerError::Signature(_))));
    assert!(desk.store().list_online(None).unwrap().is_empty());
}

#[test]
fn unpaid_session_is_ignored() {
    let desk = desk(LedgerConfig::default());
    let body = checkout_body("cs_3", "unpaid", 500_000);
    let header = sign_payload(&body, SECRET, NOW).unwrap();

    let result = desk.ingest_webhook(&body, &header, SECRET, NOW, today()).unwrap();
    assert!(result.is_none());
    assert!(desk.store().list_online(None).unwrap().is_empty());
}

#[test]
fn online_payments_reconcile_only_when_enabled() {
    let build = |include_online: bool| {
        let mut config = LedgerConfig::default();
        config.reconciliation.include_online = include_online;
        let desk = desk(config);
        desk.create_invoice(invoice("INV-900", 8_000.0), today()).unwrap();
        desk.record_online(online("ONL-1", 8_000.0, OnlineStatus::Success)).unwrap();
        desk
    };

    // Amount + date = 50, exactly the default threshold.
    let off = build(false);
    assert_eq!(off.reconcile(today()).unwrap().matched_count(), 0);

    let on = build(true);
    let report = on.reconcile(today()).unwrap();
    assert_eq!(report.matched_count(), 1);
    assert_eq!(report.matches[0].payment_kind, PaymentKind::Online);
    assert_eq!(report.matches[0].score, 50);
}

#[test]
fn online_verify_and_deposit() {
    let desk = desk(LedgerConfig::default());
    let mut input = online("ONL-20", 6_200.0, OnlineStatus::Success);
    input.verified = false;
    let payment = desk.record_online(input).unwrap();
    assert!(!payment.verified);
    assert!(payment.deposit.is_none());

    let verified = desk.verify_online(&payment.online_id, Some("accounts desk".into())).unwrap();
    assert!(verified.verified);
    assert_eq!(verified.verified_by.as_deref(), Some("accounts desk"));

    desk.record_online_deposit(&payment.online_id, " HDFC BANK ", date(2024, 3, 11))
        .unwrap();
    let stored = desk.store().get_online(&payment.online_id).unwrap();
    assert!(stored.verified);
    assert_eq!(stored.verified_by.as_deref(), Some("accounts desk"));
    let deposit = stored.deposit.expect("deposit recorded");
    assert_eq!(deposit.bank_name, "HDFC BANK");
    assert_eq!(deposit.deposit_date, date(2024, 3, 11));
    assert_eq!(stored.status, OnlineStatus::Success);

    assert!(matches!(
        desk.record_online_deposit(&payment.online_id, "", date(2024, 3, 11)),
        Err(LedgerError::MissingField { .. })
    ));
    assert!(matches!(
        desk.verify_online("missing", None),
        Err(LedgerError::NotFound { .. })
    ));
    assert_eq!(desk.store().event_count("online_verified").unwrap(), 1);
    assert_eq!(desk.store().event_count("online_deposited").unwrap(), 1);
}

#[test]
fn refunded_payment_is_not_reconciled() {
    let mut config = LedgerConfig::default();
    config.reconciliation.include_online = true;
    let desk = desk(config);
    let inv = desk.create_invoice(invoice("INV-901", 8_000.0), today()).unwrap();
    let payment = desk
        .record_online(online("ONL-2", 8_000.0, OnlineStatus::Success))
        .unwrap();

    let refunded = desk.refund_online(&payment.online_id).unwrap();
    assert_eq!(refunded.status, OnlineStatus::Refunded);
    assert_eq!(
        desk.store().get_online(&payment.online_id).unwrap().status,
        OnlineStatus::Refunded
    );

    let report = desk.reconcile(today()).unwrap();
    assert_eq!(report.matched_count(), 0);
    assert_eq!(report.unmatched_count(), 0);
    assert_eq!(desk.store().get_invoice(&inv.invoice_id).unwrap().paid_amount(), 0.0);

    assert!(matches!(
        desk.refund_online(&payment.online_id),
        Err(LedgerError::InvalidTransition { .. })
    ));
    assert_eq!(desk.store().event_count("online_refunded").unwrap(), 1);
}

#[test]
fn only_unreconciled_successful_payments_refund() {
    let mut config = LedgerConfig::default();
    config.reconciliation.include_online = true;
    let desk = desk(config);
    desk.create_invoice(invoice("INV-902", 8_000.0), today()).unwrap();
    let credited = desk
        .record_online(online("ONL-3", 8_000.0, OnlineStatus::Success))
        .unwrap();
    let pending = desk
        .record_online(online("ONL-4", 1_000.0, OnlineStatus::Pending))
        .unwrap();
    assert_eq!(desk.reconcile(today()).unwrap().matched_count(), 1);

    for id in [&credited.online_id, &pending.online_id] {
        assert!(matches!(
            desk.refund_online(id),
            Err(LedgerError::InvalidTransition { .. })
        ));
    }
    assert_eq!(
        desk.store().get_online(&credited.online_id).unwrap().status,
        OnlineStatus::Success
    );
    assert_eq!(
        desk.store().get_online(&pending.online_id).unwrap().status,
        OnlineStatus::Pending
    );
    assert_eq!(desk.store().event_count("online_refunded").unwrap(), 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Cash
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn cash_lifecycle_verify_and_deposit() {
    let desk = desk(LedgerConfig::default());
    let receipt = desk.record_cash(cash("CR-10", 4_500.0, date(2024, 3, 5))).unwrap();
    assert!(!receipt.verified);

    let verified = desk.verify_cash(&receipt.cash_id, Some("head cashier".into())).unwrap();
    assert!(verified.verified);
    assert_eq!(verified.verified_by.as_deref(), Some("head cashier"));

    let deposited = desk
        .record_bank_deposit(&receipt.cash_id, " SBI BANK ", date(2024, 3, 6))
        .unwrap();
    let deposit = deposited.deposit.expect("deposit recorded");
    assert_eq!(deposit.bank_name, "SBI BANK");
    assert_eq!(deposit.deposit_date, date(2024, 3, 6));

    let stored = desk.store().get_cash(&receipt.cash_id).unwrap();
    assert!(stored.verified);
    assert_eq!(stored.denominations.len(), 1);
    assert_eq!(stored.denominations[0].count, 9);
    assert_eq!(
        stored.deposit.map(|d| d.bank_name),
        Some("SBI BANK".to_string())
    );

    assert!(matches!(
        desk.record_bank_deposit(&receipt.cash_id, "  ", date(2024, 3, 6)),
        Err(LedgerError::MissingField { .. })
    ));
}

#[test]
fn cash_filter_by_verification_and_date() {
    let desk = desk(LedgerConfig::default());
    let a = desk.record_cash(cash("CR-1", 1_000.0, date(2024, 3, 1))).unwrap();
    desk.record_cash(cash("CR-2", 2_000.0, date(2024, 3, 4))).unwrap();
    desk.record_cash(cash("CR-3", 3_000.0, date(2024, 3, 8))).unwrap();
    desk.verify_cash(&a.cash_id, None).unwrap();

    let verified = desk
        .store()
        .list_cash(&CashFilter {
            verified: Some(true),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(verified.len(), 1);
    assert_eq!(verified[0].receipt_number, "CR-1");

    let window = desk
        .store()
        .list_cash(&CashFilter {
            verified: None,
            date_from: Some(date(2024, 3, 2)),
            date_to: Some(date(2024, 3, 8)),
        })
        .unwrap();
    let receipts: Vec<&str> = window.iter().map(|c| c.receipt_number.as_str()).collect();
    assert_eq!(receipts, vec!["CR-2", "CR-3"]);
}

#[test]
fn non_positive_cash_is_rejected() {
    let desk = desk(LedgerConfig::default());
    for amount in [0.0, -10.0, f64::INFINITY] {
        assert!(matches!(
            desk.record_cash(cash("CR-X", amount, today())),
            Err(LedgerError::InvalidAmount { .. })
        ));
    }
    assert!(desk.store().all_cash().unwrap().is_empty());
}

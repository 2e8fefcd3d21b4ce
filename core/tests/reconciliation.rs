//! Payment-to-invoice reconciliation: scoring, candidate selection and
//! the persisted settlement.

use chrono::{Duration, NaiveDate};
use ledgerdesk_core::{
    client::NewClient,
    config::{LedgerConfig, MatchStrategy, ReconciliationConfig},
    engine::LedgerDesk,
    error::LedgerError,
    instrument::{ChequeStatus, ChequeStatusUpdate, NewCash, NewCheque, PaymentKind},
    invoice::{Invoice, InvoiceStatus, NewInvoice, ReconciledPayment},
    notify::MemoryNotifier,
    reconciliation::{ConfirmedPayment, Reconciler},
    store::LedgerStore,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn as_of() -> NaiveDate {
    date(2024, 3, 15)
}

fn invoice(number: &str, client_id: Option<&str>, amount: f64, due: NaiveDate) -> Invoice {
    Invoice::new(
        NewInvoice {
            client_id: client_id.map(String::from),
            invoice_number: number.into(),
            amount,
            issue_date: due - Duration::days(30),
            due_date: due,
            description: None,
            items: vec![],
        },
        as_of(),
    )
    .unwrap()
}

fn payment(id: &str, client_id: Option<&str>, name: Option<&str>, amount: f64, on: NaiveDate) -> ConfirmedPayment {
    ConfirmedPayment {
        payment_id: id.into(),
        kind: PaymentKind::Cheque,
        reference: format!("CHQ-{id}"),
        client_id: client_id.map(String::from),
        client_name: name.map(String::from),
        amount,
        reference_date: on,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Matcher
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn client_amount_and_date_score_ninety() {
    let due = date(2024, 3, 20);
    let mut invoices = vec![invoice("INV-1", Some("c-1"), 10_000.0, due)];
    let payments = vec![payment("p-1", Some("c-1"), None, 9_900.0, due - Duration::days(3))];

    let report = Reconciler::default()
        .reconcile(&mut invoices, &payments, as_of())
        .unwrap();

    assert_eq!(report.matched_count(), 1);
    assert_eq!(report.matches[0].score, 90);
    assert_eq!(invoices[0].paid_amount(), 9_900.0);
    assert_eq!(invoices[0].remaining_amount(), 100.0);
    assert_eq!(invoices[0].status(), InvoiceStatus::PartiallyPaid);
    assert_eq!(invoices[0].reconciled_payments().len(), 1);
}

#[test]
fn name_only_match_stays_unmatched() {
    let due = date(2024, 3, 20);
    let mut inv = invoice("INV-2", None, 10_000.0, due);
    inv.client_name = Some("Acme Traders".into());
    let mut invoices = vec![inv];
    let payments = vec![payment("p-2", None, Some("ACME"), 9_500.0, due + Duration::days(10))];

    let report = Reconciler::default()
        .reconcile(&mut invoices, &payments, as_of())
        .unwrap();

    assert_eq!(report.matched_count(), 0);
    assert_eq!(report.unmatched_count(), 1);
    assert_eq!(report.unmatched[0].best_score, Some(10));
    assert_eq!(invoices[0].paid_amount(), 0.0);
}

#[test]
fn paid_invoice_is_never_a_candidate() {
    let due = date(2024, 3, 20);
    let mut paid = invoice("INV-3", Some("c-1"), 5_000.0, due);
    paid.apply_payment(
        ReconciledPayment {
            payment_id: "earlier".into(),
            kind: PaymentKind::Cash,
            amount: 5_000.0,
            date: due,
        },
        as_of(),
    )
    .unwrap();
    assert_eq!(paid.status(), InvoiceStatus::Paid);
    assert_eq!(paid.remaining_amount(), 0.0);

    let mut invoices = vec![paid];
    let payments = vec![payment("p-3", Some("c-1"), None, 5_000.0, due)];
    let report = Reconciler::default()
        .reconcile(&mut invoices, &payments, as_of())
        .unwrap();

    assert_eq!(report.matched_count(), 0);
    assert_eq!(report.unmatched[0].best_score, None);
    assert_eq!(invoices[0].paid_amount(), 5_000.0);
}

#[test]
fn second_qualifying_payment_finds_invoice_settled() {
    let due = date(2024, 3, 20);
    let mut invoices = vec![invoice("INV-4", Some("c-1"), 10_000.0, due)];
    let payments = vec![
        payment("p-a", Some("c-1"), None, 10_000.0, due),
        payment("p-b", Some("c-1"), None, 10_000.0, due),
    ];

    let report = Reconciler::default()
        .reconcile(&mut invoices, &payments, as_of())
        .unwrap();

    assert_eq!(report.matched_count(), 1);
    assert_eq!(report.matches[0].payment_id, "p-a");
    assert_eq!(report.unmatched.len(), 1);
    assert_eq!(report.unmatched[0].payment_id, "p-b");
    assert_eq!(invoices[0].status(), InvoiceStatus::Paid);
}

#[test]
fn second_payment_moves_on_to_next_invoice() {
    let due = date(2024, 3, 20);
    let mut invoices = vec![
        invoice("INV-5", Some("c-1"), 10_000.0, due),
        invoice("INV-6", Some("c-1"), 10_000.0, due),
    ];
    let payments = vec![
        payment("p-a", Some("c-1"), None, 10_000.0, due),
        payment("p-b", Some("c-1"), None, 10_000.0, due),
    ];

    let report = Reconciler::default()
        .reconcile(&mut invoices, &payments, as_of())
        .unwrap();

    let numbers: Vec<&str> = report.matches.iter().map(|m| m.invoice_number.as_str()).collect();
    assert_eq!(numbers, vec!["INV-5", "INV-6"]);
    assert!(invoices.iter().all(|i| i.is_paid()));
}

#[test]
fn first_fit_takes_earliest_and_best_fit_takes_highest() {
    let due = date(2024, 3, 20);
    let build = || {
        vec![
            // client + date = 55
            invoice("INV-LOW", Some("c-1"), 50_000.0, due),
            // client + amount + date = 90
            invoice("INV-HIGH", Some("c-1"), 10_000.0, due),
        ]
    };
    let payments = vec![payment("p-1", Some("c-1"), None, 10_000.0, due)];

    let mut first = build();
    let report = Reconciler::default()
        .reconcile(&mut first, &payments, as_of())
        .unwrap();
    assert_eq!(report.matches[0].invoice_number, "INV-LOW");
    assert_eq!(report.matches[0].score, 55);

    let mut best = build();
    let reconciler = Reconciler::new(ReconciliationConfig {
        strategy: MatchStrategy::BestFit,
        ..Default::default()
    });
    let report = reconciler.reconcile(&mut best, &payments, as_of()).unwrap();
    assert_eq!(report.matches[0].invoice_number, "INV-HIGH");
    assert_eq!(report.matches[0].score, 90);
}

#[test]
fn invalid_payment_amount_leaves_invoices_untouched() {
    let due = date(2024, 3, 20);
    let mut invoices = vec![invoice("INV-7", Some("c-1"), 10_000.0, due)];
    let payments = vec![
        payment("p-ok", Some("c-1"), None, 10_000.0, due),
        payment("p-bad", Some("c-1"), None, f64::NAN, due),
    ];

    let err = Reconciler::default().reconcile(&mut invoices, &payments, as_of());
    assert!(matches!(err, Err(LedgerError::InvalidAmount { .. })));
    assert_eq!(invoices[0].paid_amount(), 0.0);
}

#[test]
fn paid_amount_only_grows() {
    let due = date(2024, 3, 20);
    let mut invoices = vec![invoice("INV-8", Some("c-1"), 30_000.0, due)];
    let reconciler = Reconciler::new(ReconciliationConfig {
        match_threshold: 40,
        ..Default::default()
    });

    let mut last = 0.0;
    for (n, amount) in [7_500.0, 12_000.0, 10_500.0].into_iter().enumerate() {
        let p = payment(&format!("p-{n}"), Some("c-1"), None, amount, due);
        reconciler
            .reconcile(&mut invoices, &[p], as_of())
            .unwrap();
        let paid = invoices[0].paid_amount();
        assert!(paid > last, "paid amount went from {last} to {paid}");
        assert_eq!(paid + invoices[0].remaining_amount(), 30_000.0);
        last = paid;
    }
    assert_eq!(invoices[0].status(), InvoiceStatus::Paid);
}

// ─────────────────────────────────────────────────────────────────────────────
// Through the desk
// ─────────────────────────────────────────────────────────────────────────────

fn desk(config: LedgerConfig) -> LedgerDesk {
    let store = LedgerStore::in_memory().unwrap();
    store.migrate().unwrap();
    LedgerDesk::build(store, config, Box::new(MemoryNotifier::new()), as_of())
}

fn seed_cleared_cheque(desk: &LedgerDesk, client_id: &str, number: &str, amount: f64, due: NaiveDate) {
    let cheque = desk
        .record_cheque(NewCheque {
            client_id: Some(client_id.into()),
            client_name: "Zenith Exports".into(),
            cheque_number: number.into(),
            bank_name: "SBI BANK".into(),
            amount,
            issue_date: due - Duration::days(20),
            due_date: due,
            status: None,
            image_ref: None,
            ocr: None,
            notes: None,
        })
        .unwrap();
    desk.set_cheque_status(
        &cheque.cheque_id,
        ChequeStatusUpdate {
            status: ChequeStatus::Cleared,
            bounce_reason: None,
            clearance_date: Some(due),
        },
        due,
    )
    .unwrap();
}

#[test]
fn desk_reconcile_persists_settlement_and_is_idempotent() {
    let desk = desk(LedgerConfig::default());
    let client = desk
        .register_client(NewClient {
            name: "Zenith Exports".into(),
            email: "accounts@zenith.example".into(),
            phone: "9123456780".into(),
            ..Default::default()
        })
        .unwrap();
    let due = date(2024, 3, 10);
    let inv = desk
        .create_invoice(
            NewInvoice {
                client_id: Some(client.client_id.clone()),
                invoice_number: "INV-100".into(),
                amount: 25_000.0,
                issue_date: date(2024, 2, 10),
                due_date: due,
                description: None,
                items: vec![],
            },
            as_of(),
        )
        .unwrap();
    assert_eq!(inv.client_name.as_deref(), Some("Zenith Exports"));
    seed_cleared_cheque(&desk, &client.client_id, "200001", 25_000.0, due);

    let first = desk.reconcile(as_of()).unwrap();
    assert_eq!(first.matched_count(), 1);
    assert_eq!(first.matches[0].score, 100);

    let stored = desk.store().get_invoice(&inv.invoice_id).unwrap();
    assert_eq!(stored.paid_amount(), 25_000.0);
    assert_eq!(stored.remaining_amount(), 0.0);
    assert_eq!(stored.status(), InvoiceStatus::Paid);
    assert_eq!(stored.reconciled_payments().len(), 1);

    let second = desk.reconcile(as_of()).unwrap();
    assert_eq!(second.matched_count(), 0);
    assert_eq!(second.unmatched_count(), 0);
    let stored = desk.store().get_invoice(&inv.invoice_id).unwrap();
    assert_eq!(stored.paid_amount(), 25_000.0);
    assert_eq!(desk.store().reconciled_payment_count().unwrap(), 1);
    assert_eq!(desk.store().event_count("payment_reconciled").unwrap(), 1);
    assert_eq!(desk.store().event_count("reconciliation_completed").unwrap(), 2);
}

#[test]
fn unverified_cash_waits_for_verification() {
    let desk = desk(LedgerConfig::default());
    let client = desk
        .register_client(NewClient {
            name: "Mehta Stores".into(),
            email: "accounts@mehta.example".into(),
            phone: "9988776655".into(),
            ..Default::default()
        })
        .unwrap();
    desk.create_invoice(
        NewInvoice {
            client_id: Some(client.client_id.clone()),
            invoice_number: "INV-200".into(),
            amount: 4_000.0,
            issue_date: date(2024, 3, 1),
            due_date: date(2024, 3, 14),
            description: None,
            items: vec![],
        },
        as_of(),
    )
    .unwrap();
    let cash = desk
        .record_cash(NewCash {
            client_id: Some(client.client_id.clone()),
            client_name: "Mehta Stores".into(),
            receipt_number: "CR-1".into(),
            amount: 4_000.0,
            date: date(2024, 3, 14),
            denominations: vec![],
            notes: None,
        })
        .unwrap();

    assert_eq!(desk.reconcile(as_of()).unwrap().matched_count(), 0);

    desk.verify_cash(&cash.cash_id, Some("cashier".into())).unwrap();
    let report = desk.reconcile(as_of()).unwrap();
    assert_eq!(report.matched_count(), 1);
    assert_eq!(report.matches[0].payment_kind, PaymentKind::Cash);
}

#[test]
fn overdue_status_refreshes_past_due_date() {
    let desk = desk(LedgerConfig::default());
    let inv = desk
        .create_invoice(
            NewInvoice {
                client_id: None,
                invoice_number: "INV-300".into(),
                amount: 1_000.0,
                issue_date: date(2024, 2, 1),
                due_date: date(2024, 3, 20),
                description: None,
                items: vec![],
            },
            as_of(),
        )
        .unwrap();
    assert_eq!(inv.status(), InvoiceStatus::Unpaid);

    assert_eq!(desk.refresh_invoice_statuses(date(2024, 3, 21)).unwrap(), 1);
    let stored = desk.store().get_invoice(&inv.invoice_id).unwrap();
    assert_eq!(stored.status(), InvoiceStatus::Overdue);
    assert_eq!(desk.refresh_invoice_statuses(date(2024, 3, 22)).unwrap(), 0);
}

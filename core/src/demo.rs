//! Deterministic demo population.
//!
//! Given a seed, builds clients with cheque histories, cash receipts and
//! invoices through the desk, so every record passes the same validation
//! and produces the same events as operator input. Same seed, same start
//! date ⇒ the same records (up to generated ids).

use crate::{
    client::NewClient,
    engine::LedgerDesk,
    error::LedgerResult,
    instrument::{ChequeStatus, ChequeStatusUpdate, Denomination, NewCash, NewCheque},
    invoice::{InvoiceItem, NewInvoice},
    name_generator::NameGenerator,
    rng::{DemoRng, DemoStream},
    types::Money,
};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

const BANKS: &[&str] = &["HDFC", "ICICI", "SBI", "AXIS", "KOTAK", "PNB", "CANARA"];
const BOUNCE_REASONS: &[&str] = &[
    "Insufficient funds",
    "Signature mismatch",
    "Payment stopped by drawer",
    "Account closed",
];
const CREDIT_LIMITS: &[Money] = &[50_000.0, 100_000.0, 250_000.0, 500_000.0];
const NOTE_VALUES: &[Money] = &[2_000.0, 500.0, 200.0, 100.0];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DemoSummary {
    pub clients: usize,
    pub cheques: usize,
    pub cash_receipts: usize,
    pub invoices: usize,
}

pub struct DemoSeeder {
    clients: DemoRng,
    cheques: DemoRng,
    cash: DemoRng,
    invoices: DemoRng,
    seq: u32,
}

impl DemoSeeder {
    pub fn new(seed: u64) -> Self {
        Self {
            clients: DemoRng::new(seed, DemoStream::Clients),
            cheques: DemoRng::new(seed, DemoStream::Cheques),
            cash: DemoRng::new(seed, DemoStream::Cash),
            invoices: DemoRng::new(seed, DemoStream::Invoices),
            seq: 0,
        }
    }

    /// Populate `desk` with `count` clients as of `start`.
    pub fn seed(
        &mut self,
        desk: &LedgerDesk,
        count: usize,
        start: NaiveDate,
    ) -> LedgerResult<DemoSummary> {
        let mut summary = DemoSummary::default();

        for _ in 0..count {
            let company = NameGenerator::company_name(&mut self.clients);
            let client = desk.register_client(NewClient {
                name: company.clone(),
                company_name: Some(company.clone()),
                email: NameGenerator::email_for(&company),
                phone: NameGenerator::phone(&mut self.clients),
                gst_number: None,
                pan_number: None,
                credit_limit: Some(*self.clients.pick(CREDIT_LIMITS)),
            })?;
            summary.clients += 1;

            let cleared = self.seed_cheques(desk, &client.client_id, &company, start, &mut summary)?;
            self.seed_cash(desk, &client.client_id, &company, start, &mut summary)?;
            self.seed_invoices(desk, &client.client_id, &cleared, start, &mut summary)?;
        }

        log::info!(
            "demo seed: {} clients, {} cheques, {} cash receipts, {} invoices",
            summary.clients,
            summary.cheques,
            summary.cash_receipts,
            summary.invoices
        );
        Ok(summary)
    }

    /// Returns (amount, due date) of every cleared cheque.
    fn seed_cheques(
        &mut self,
        desk: &LedgerDesk,
        client_id: &str,
        company: &str,
        start: NaiveDate,
        summary: &mut DemoSummary,
    ) -> LedgerResult<Vec<(Money, NaiveDate)>> {
        let rng = &mut self.cheques;
        let mut cleared = Vec::new();

        for _ in 0..rng.between(2, 8) {
            self.seq += 1;
            let issue_date = start - Duration::days(rng.between(10, 120));
            let due_date = issue_date + Duration::days(rng.between(0, 45));
            let post_dated = due_date > start;

            let cheque = desk.record_cheque(NewCheque {
                client_id: Some(client_id.to_string()),
                client_name: company.to_string(),
                cheque_number: format!("{:06}", 100_000 + self.seq),
                bank_name: format!("{} BANK", rng.pick(BANKS)),
                amount: rng.amount(5_000.0, 150_000.0, 500.0),
                issue_date,
                due_date,
                status: Some(if post_dated {
                    ChequeStatus::PostDated
                } else {
                    ChequeStatus::Pending
                }),
                image_ref: None,
                ocr: None,
                notes: None,
            })?;
            summary.cheques += 1;
            if post_dated {
                continue;
            }

            let roll = rng.next_f64();
            if roll < 0.70 {
                let cleared_on = (due_date + Duration::days(rng.between(0, 10))).min(start);
                desk.set_cheque_status(
                    &cheque.cheque_id,
                    ChequeStatusUpdate {
                        status: ChequeStatus::Cleared,
                        bounce_reason: None,
                        clearance_date: Some(cleared_on),
                    },
                    cleared_on,
                )?;
                cleared.push((cheque.amount, due_date));
            } else if roll < 0.85 {
                let reason = rng.pick(BOUNCE_REASONS).to_string();
                desk.set_cheque_status(
                    &cheque.cheque_id,
                    ChequeStatusUpdate {
                        status: ChequeStatus::Bounced,
                        bounce_reason: Some(reason),
                        clearance_date: None,
                    },
                    due_date,
                )?;
            }
        }
        Ok(cleared)
    }

    fn seed_cash(
        &mut self,
        desk: &LedgerDesk,
        client_id: &str,
        company: &str,
        start: NaiveDate,
        summary: &mut DemoSummary,
    ) -> LedgerResult<()> {
        let rng = &mut self.cash;

        for _ in 0..rng.between(0, 3) {
            self.seq += 1;
            let denominations: Vec<Denomination> = NOTE_VALUES
                .iter()
                .map(|&value| {
                    let count = rng.between(0, 20) as u32;
                    Denomination {
                        value,
                        count,
                        total: value * count as f64,
                    }
                })
                .filter(|d| d.count > 0)
                .collect();
            let amount: Money = denominations.iter().map(|d| d.total).sum();
            if amount <= 0.0 {
                continue;
            }

            let cash = desk.record_cash(NewCash {
                client_id: Some(client_id.to_string()),
                client_name: company.to_string(),
                receipt_number: format!("CR-{:05}", self.seq),
                amount,
                date: start - Duration::days(rng.between(1, 60)),
                denominations,
                notes: None,
            })?;
            summary.cash_receipts += 1;

            if rng.chance(0.8) {
                desk.verify_cash(&cash.cash_id, Some("cashier".into()))?;
            }
        }
        Ok(())
    }

    /// Some invoices mirror a cleared cheque so reconciliation has work to do.
    fn seed_invoices(
        &mut self,
        desk: &LedgerDesk,
        client_id: &str,
        cleared: &[(Money, NaiveDate)],
        start: NaiveDate,
        summary: &mut DemoSummary,
    ) -> LedgerResult<()> {
        let rng = &mut self.invoices;

        for n in 0..rng.between(1, 3) as usize {
            self.seq += 1;
            let (amount, due_date) = match cleared.get(n) {
                Some(&(amount, due)) if rng.chance(0.6) => (amount, due),
                _ => (
                    rng.amount(10_000.0, 200_000.0, 1_000.0),
                    start + Duration::days(rng.between(-30, 30)),
                ),
            };

            desk.create_invoice(
                NewInvoice {
                    client_id: Some(client_id.to_string()),
                    invoice_number: format!("INV-{:05}", self.seq),
                    amount,
                    issue_date: due_date - Duration::days(30),
                    due_date,
                    description: Some("Supply of goods".into()),
                    items: vec![InvoiceItem {
                        description: "Goods as per order".into(),
                        quantity: 1.0,
                        unit_price: amount,
                        total: amount,
                    }],
                },
                start,
            )?;
            summary.invoices += 1;
        }
        Ok(())
    }
}

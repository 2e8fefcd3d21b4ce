//! Payment-to-invoice reconciliation.
//!
//! Greedy and payment-first: payments are taken in input order and each one
//! scans the open invoices in input order. Every candidate is scored out of
//! 100 and the payment is credited to the first invoice reaching the
//! threshold (or, with `MatchStrategy::BestFit`, the highest-scoring one).
//!
//! Scoring (defaults):
//!   +40  same client id (both present)
//!   +35  amount within 2% of the invoice's remaining amount
//!   +15  payment date within 7 days of the invoice due date
//!   +10  client names contain one another (case-insensitive)
//!
//! The matcher keeps no dedup state. Callers must not feed it a payment
//! that was already credited in an earlier run.

use crate::{
    config::{MatchStrategy, ReconciliationConfig},
    error::{ensure_positive, LedgerResult},
    instrument::{Cash, Cheque, ChequeStatus, Online, OnlineStatus, PaymentKind},
    invoice::{Invoice, ReconciledPayment},
    types::{ClientId, Money, RecordId},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A payment the bank or an operator has confirmed, ready to be matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmedPayment {
    pub payment_id: RecordId,
    pub kind: PaymentKind,
    /// Cheque number or receipt number.
    pub reference: String,
    pub client_id: Option<ClientId>,
    pub client_name: Option<String>,
    pub amount: Money,
    /// Cheque due date, or the transaction date for cash and online.
    pub reference_date: NaiveDate,
}

impl ConfirmedPayment {
    /// Only cleared cheques are confirmed.
    pub fn from_cheque(cheque: &Cheque) -> Option<Self> {
        match cheque.status {
            ChequeStatus::Cleared => Some(Self {
                payment_id: cheque.cheque_id.clone(),
                kind: PaymentKind::Cheque,
                reference: cheque.cheque_number.clone(),
                client_id: cheque.client_id.clone(),
                client_name: Some(cheque.client_name.clone()),
                amount: cheque.amount,
                reference_date: cheque.due_date,
            }),
            ChequeStatus::Pending | ChequeStatus::PostDated | ChequeStatus::Bounced => None,
        }
    }

    /// Only verified cash is confirmed.
    pub fn from_cash(cash: &Cash) -> Option<Self> {
        cash.verified.then(|| Self {
            payment_id: cash.cash_id.clone(),
            kind: PaymentKind::Cash,
            reference: cash.receipt_number.clone(),
            client_id: cash.client_id.clone(),
            client_name: Some(cash.client_name.clone()),
            amount: cash.amount,
            reference_date: cash.date,
        })
    }

    /// Only successful online payments are confirmed.
    pub fn from_online(online: &Online) -> Option<Self> {
        match online.status {
            OnlineStatus::Success => Some(Self {
                payment_id: online.online_id.clone(),
                kind: PaymentKind::Online,
                reference: online.receipt_number.clone(),
                client_id: online.client_id.clone(),
                client_name: Some(online.client_name.clone()),
                amount: online.amount,
                reference_date: online.date,
            }),
            OnlineStatus::Pending | OnlineStatus::Failed | OnlineStatus::Refunded => None,
        }
    }
}

/// Which criteria fired for one payment/invoice pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchScore {
    pub client_id: bool,
    pub amount: bool,
    pub date: bool,
    pub name: bool,
    pub total: u32,
}

impl MatchScore {
    /// Human-readable list of the criteria that fired.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if self.client_id {
            parts.push("client id");
        }
        if self.amount {
            parts.push("amount");
        }
        if self.date {
            parts.push("date");
        }
        if self.name {
            parts.push("name");
        }
        if parts.is_empty() {
            format!("{} (no criteria matched)", self.total)
        } else {
            format!("{} ({})", self.total, parts.join(", "))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceMatch {
    pub invoice_id: RecordId,
    pub invoice_number: String,
    pub payment_id: RecordId,
    pub payment_kind: PaymentKind,
    pub payment_reference: String,
    pub amount: Money,
    pub score: u32,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnmatchedPayment {
    pub payment_id: RecordId,
    pub kind: PaymentKind,
    pub reference: String,
    pub amount: Money,
    pub client_label: Option<String>,
    /// Best score any open invoice reached, if any invoice was scanned.
    pub best_score: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub matches: Vec<InvoiceMatch>,
    pub unmatched: Vec<UnmatchedPayment>,
}

impl ReconciliationReport {
    pub fn matched_count(&self) -> usize {
        self.matches.len()
    }

    pub fn unmatched_count(&self) -> usize {
        self.unmatched.len()
    }

    pub fn matched_amount(&self) -> Money {
        self.matches.iter().map(|m| m.amount).sum()
    }
}

pub struct Reconciler {
    config: ReconciliationConfig,
}

impl Reconciler {
    pub fn new(config: ReconciliationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReconciliationConfig {
        &self.config
    }

    /// Score one payment against one invoice.
    pub fn score(&self, payment: &ConfirmedPayment, invoice: &Invoice) -> MatchScore {
        let cfg = &self.config;
        let mut s = MatchScore::default();

        if let (Some(p), Some(i)) = (&payment.client_id, &invoice.client_id) {
            if p == i {
                s.client_id = true;
                s.total += cfg.client_id_points;
            }
        }

        let remaining = invoice.remaining_amount();
        if remaining > 0.0 && (payment.amount - remaining).abs() / remaining <= cfg.amount_tolerance {
            s.amount = true;
            s.total += cfg.amount_points;
        }

        if (payment.reference_date - invoice.due_date).num_days().abs() <= cfg.date_window_days {
            s.date = true;
            s.total += cfg.date_points;
        }

        if let (Some(p), Some(i)) = (&payment.client_name, &invoice.client_name) {
            if names_overlap(p, i) {
                s.name = true;
                s.total += cfg.name_points;
            }
        }

        s
    }

    /// Credit `payments` against `invoices` in place and report the outcome.
    ///
    /// Every payment amount is validated before any invoice is touched.
    /// Invoices already Paid on entry are never candidates.
    pub fn reconcile(
        &self,
        invoices: &mut [Invoice],
        payments: &[ConfirmedPayment],
        as_of: NaiveDate,
    ) -> LedgerResult<ReconciliationReport> {
        for p in payments {
            ensure_positive("payment.amount", p.amount)?;
        }

        let candidates: Vec<usize> = (0..invoices.len())
            .filter(|&i| !invoices[i].is_paid())
            .collect();

        let mut report = ReconciliationReport::default();

        for payment in payments {
            let mut best: Option<(usize, MatchScore)> = None;
            let mut best_seen: Option<u32> = None;

            for &idx in &candidates {
                let invoice = &invoices[idx];
                // May have been settled earlier in this run.
                if invoice.is_paid() {
                    continue;
                }

                let score = self.score(payment, invoice);
                best_seen = Some(best_seen.map_or(score.total, |b| b.max(score.total)));

                if score.total < self.config.match_threshold {
                    continue;
                }
                match self.config.strategy {
                    MatchStrategy::FirstFit => {
                        best = Some((idx, score));
                        break;
                    }
                    MatchStrategy::BestFit => {
                        if best.map_or(true, |(_, b)| score.total > b.total) {
                            best = Some((idx, score));
                        }
                    }
                }
            }

            match best {
                Some((idx, score)) => {
                    let invoice = &mut invoices[idx];
                    invoice.apply_payment(
                        ReconciledPayment {
                            payment_id: payment.payment_id.clone(),
                            kind: payment.kind,
                            amount: payment.amount,
                            date: payment.reference_date,
                        },
                        as_of,
                    )?;
                    log::debug!(
                        "matched {} {} -> invoice {} score {}",
                        payment.kind.as_str(),
                        payment.reference,
                        invoice.invoice_number,
                        score.describe()
                    );
                    report.matches.push(InvoiceMatch {
                        invoice_id: invoice.invoice_id.clone(),
                        invoice_number: invoice.invoice_number.clone(),
                        payment_id: payment.payment_id.clone(),
                        payment_kind: payment.kind,
                        payment_reference: payment.reference.clone(),
                        amount: payment.amount,
                        score: score.total,
                        date: payment.reference_date,
                    });
                }
                None => {
                    report.unmatched.push(UnmatchedPayment {
                        payment_id: payment.payment_id.clone(),
                        kind: payment.kind,
                        reference: payment.reference.clone(),
                        amount: payment.amount,
                        client_label: payment.client_name.clone(),
                        best_score: best_seen,
                    });
                }
            }
        }

        Ok(report)
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(ReconciliationConfig::default())
    }
}

fn names_overlap(a: &str, b: &str) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(&b) || b.contains(&a)
}

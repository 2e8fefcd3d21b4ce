//! Invoices and their derived payment status.
//!
//! RULE: `paid_amount`, `status` and the reconciled-payment list are private.
//! They move only through `apply_payment`, which re-derives the status.
//! The remaining amount is computed, never stored on the record.

use crate::{
    error::{ensure_positive, ensure_present, LedgerResult},
    instrument::PaymentKind,
    types::{new_id, ClientId, Money, RecordId},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvoiceStatus {
    Unpaid,
    #[serde(rename = "Partially Paid")]
    PartiallyPaid,
    Paid,
    Overdue,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unpaid => "Unpaid",
            Self::PartiallyPaid => "Partially Paid",
            Self::Paid => "Paid",
            Self::Overdue => "Overdue",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Unpaid" => Some(Self::Unpaid),
            "Partially Paid" => Some(Self::PartiallyPaid),
            "Paid" => Some(Self::Paid),
            "Overdue" => Some(Self::Overdue),
            _ => None,
        }
    }

    /// Derive a status from the amounts and the due date.
    pub fn derive(amount: Money, paid: Money, due_date: NaiveDate, as_of: NaiveDate) -> Self {
        let status = if paid == 0.0 {
            Self::Unpaid
        } else if paid < amount {
            Self::PartiallyPaid
        } else {
            Self::Paid
        };

        match status {
            Self::Paid => Self::Paid,
            _ if as_of > due_date => Self::Overdue,
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub description: String,
    pub quantity: f64,
    pub unit_price: Money,
    pub total: Money,
}

/// A payment credited to an invoice by reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledPayment {
    pub payment_id: RecordId,
    pub kind: PaymentKind,
    pub amount: Money,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInvoice {
    #[serde(default)]
    pub client_id: Option<ClientId>,
    pub invoice_number: String,
    pub amount: Money,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub items: Vec<InvoiceItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub invoice_id: RecordId,
    /// `None` marks a malformed invoice; it can still match on amount and date.
    pub client_id: Option<ClientId>,
    /// Denormalised client name, filled in by the store.
    pub client_name: Option<String>,
    pub invoice_number: String,
    pub amount: Money,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub description: Option<String>,
    pub items: Vec<InvoiceItem>,
    pub(crate) paid_amount: Money,
    pub(crate) status: InvoiceStatus,
    pub(crate) reconciled_payments: Vec<ReconciledPayment>,
}

impl Invoice {
    pub fn new(input: NewInvoice, as_of: NaiveDate) -> LedgerResult<Self> {
        ensure_present("invoice", "invoice_number", &input.invoice_number)?;
        ensure_positive("invoice.amount", input.amount)?;

        Ok(Self {
            invoice_id: new_id(),
            client_id: input.client_id,
            client_name: None,
            invoice_number: input.invoice_number.trim().to_string(),
            amount: input.amount,
            issue_date: input.issue_date,
            due_date: input.due_date,
            description: input.description,
            items: input.items,
            paid_amount: 0.0,
            status: InvoiceStatus::derive(input.amount, 0.0, input.due_date, as_of),
            reconciled_payments: Vec::new(),
        })
    }

    pub fn paid_amount(&self) -> Money {
        self.paid_amount
    }

    pub fn remaining_amount(&self) -> Money {
        self.amount - self.paid_amount
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn reconciled_payments(&self) -> &[ReconciledPayment] {
        &self.reconciled_payments
    }

    pub fn is_paid(&self) -> bool {
        self.status == InvoiceStatus::Paid
    }

    /// Re-derive the status for `as_of` (e.g. to flag overdue invoices).
    pub fn refresh_status(&mut self, as_of: NaiveDate) -> InvoiceStatus {
        self.status = InvoiceStatus::derive(self.amount, self.paid_amount, self.due_date, as_of);
        self.status
    }

    /// Credit a payment and re-derive the status.
    pub fn apply_payment(&mut self, entry: ReconciledPayment, as_of: NaiveDate) -> LedgerResult<()> {
        ensure_positive("reconciled_payment.amount", entry.amount)?;
        self.paid_amount += entry.amount;
        self.reconciled_payments.push(entry);
        self.refresh_status(as_of);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn invoice(amount: Money) -> Invoice {
        Invoice::new(
            NewInvoice {
                client_id: Some("c-1".into()),
                invoice_number: "INV-1".into(),
                amount,
                issue_date: date(2024, 3, 1),
                due_date: date(2024, 3, 31),
                description: None,
                items: vec![],
            },
            date(2024, 3, 1),
        )
        .unwrap()
    }

    fn payment(amount: Money) -> ReconciledPayment {
        ReconciledPayment {
            payment_id: "p-1".into(),
            kind: PaymentKind::Cash,
            amount,
            date: date(2024, 3, 10),
        }
    }

    #[test]
    fn partial_then_full_payment() {
        let mut inv = invoice(5_000.0);
        assert_eq!(inv.status(), InvoiceStatus::Unpaid);

        inv.apply_payment(payment(2_000.0), date(2024, 3, 10)).unwrap();
        assert_eq!(inv.status(), InvoiceStatus::PartiallyPaid);
        assert_eq!(inv.remaining_amount(), 3_000.0);

        inv.apply_payment(payment(3_000.0), date(2024, 3, 11)).unwrap();
        assert_eq!(inv.status(), InvoiceStatus::Paid);
        assert_eq!(inv.remaining_amount(), 0.0);
        assert_eq!(inv.reconciled_payments().len(), 2);
    }

    #[test]
    fn unpaid_past_due_is_overdue() {
        let mut inv = invoice(1_000.0);
        assert_eq!(inv.refresh_status(date(2024, 4, 1)), InvoiceStatus::Overdue);
        assert_eq!(inv.refresh_status(date(2024, 3, 31)), InvoiceStatus::Unpaid);
    }

    #[test]
    fn paid_invoice_is_never_overdue() {
        let mut inv = invoice(1_000.0);
        inv.apply_payment(payment(1_000.0), date(2024, 5, 1)).unwrap();
        assert_eq!(inv.status(), InvoiceStatus::Paid);
    }

    #[test]
    fn overpayment_still_paid() {
        let mut inv = invoice(1_000.0);
        inv.apply_payment(payment(1_010.0), date(2024, 3, 5)).unwrap();
        assert_eq!(inv.status(), InvoiceStatus::Paid);
        assert_eq!(inv.remaining_amount(), -10.0);
    }
}

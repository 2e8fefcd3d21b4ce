//! The ledger event log.
//!
//! RULE: every state change made through `LedgerDesk` or a scheduled job
//! is recorded as a LedgerEvent and appended to `event_log`.

use crate::{
    instrument::{ChequeStatus, PaymentKind},
    risk::RiskLevel,
    types::{ClientId, Money, RecordId},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Variants are appended over time, never removed or reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    // ── Records ────────────────────────────────────
    ClientRegistered {
        client_id: ClientId,
        name: String,
    },
    ChequeRecorded {
        cheque_id: RecordId,
        cheque_number: String,
        client_id: Option<ClientId>,
        amount: Money,
    },
    ChequeStatusChanged {
        cheque_id: RecordId,
        cheque_number: String,
        from: ChequeStatus,
        to: ChequeStatus,
    },
    CashRecorded {
        cash_id: RecordId,
        receipt_number: String,
        amount: Money,
    },
    CashVerified {
        cash_id: RecordId,
        verified_by: Option<String>,
    },
    CashDeposited {
        cash_id: RecordId,
        bank_name: String,
        deposit_date: NaiveDate,
    },
    OnlineRecorded {
        online_id: RecordId,
        receipt_number: String,
        amount: Money,
        gateway_session_id: Option<String>,
    },
    InvoiceCreated {
        invoice_id: RecordId,
        invoice_number: String,
        amount: Money,
    },
    RecordDeleted {
        kind: String,
        id: RecordId,
    },

    // ── Risk ───────────────────────────────────────
    RiskRecomputed {
        client_id: ClientId,
        risk_score: u8,
        risk_level: RiskLevel,
        outstanding_amount: Money,
    },

    // ── Reconciliation ─────────────────────────────
    PaymentReconciled {
        invoice_id: RecordId,
        invoice_number: String,
        payment_id: RecordId,
        payment_kind: PaymentKind,
        amount: Money,
        score: u32,
    },
    PaymentUnmatched {
        payment_id: RecordId,
        payment_kind: PaymentKind,
        reference: String,
        amount: Money,
    },
    ReconciliationCompleted {
        matched: usize,
        unmatched: usize,
    },

    // ── Notifications ──────────────────────────────
    ReminderSent {
        cheque_id: RecordId,
        recipient: String,
        due_date: NaiveDate,
    },
    BounceNoticeSent {
        cheque_id: RecordId,
        recipient: String,
    },
    NotificationFailed {
        cheque_id: RecordId,
        reason: String,
    },

    // ── Records (continued) ────────────────────────
    OnlineVerified {
        online_id: RecordId,
        verified_by: Option<String>,
    },
    OnlineDeposited {
        online_id: RecordId,
        bank_name: String,
        deposit_date: NaiveDate,
    },
    OnlineRefunded {
        online_id: RecordId,
        amount: Money,
    },
    ClientUpdated {
        client_id: ClientId,
        credit_limit: Money,
    },
}

impl LedgerEvent {
    /// Stable string name, used for the event_type column.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::ClientRegistered { .. } => "client_registered",
            Self::ChequeRecorded { .. } => "cheque_recorded",
            Self::ChequeStatusChanged { .. } => "cheque_status_changed",
            Self::CashRecorded { .. } => "cash_recorded",
            Self::CashVerified { .. } => "cash_verified",
            Self::CashDeposited { .. } => "cash_deposited",
            Self::OnlineRecorded { .. } => "online_recorded",
            Self::InvoiceCreated { .. } => "invoice_created",
            Self::RecordDeleted { .. } => "record_deleted",
            Self::RiskRecomputed { .. } => "risk_recomputed",
            Self::PaymentReconciled { .. } => "payment_reconciled",
            Self::PaymentUnmatched { .. } => "payment_unmatched",
            Self::ReconciliationCompleted { .. } => "reconciliation_completed",
            Self::ReminderSent { .. } => "reminder_sent",
            Self::BounceNoticeSent { .. } => "bounce_notice_sent",
            Self::NotificationFailed { .. } => "notification_failed",
            Self::OnlineVerified { .. } => "online_verified",
            Self::OnlineDeposited { .. } => "online_deposited",
            Self::OnlineRefunded { .. } => "online_refunded",
            Self::ClientUpdated { .. } => "client_updated",
        }
    }
}

/// Persisted event log row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub business_date: NaiveDate,
    /// Component that emitted the event ("desk", "risk_sweep", …).
    pub source: String,
    pub event_type: String,
    pub payload: String,
}

impl EventLogEntry {
    pub fn new(business_date: NaiveDate, source: &str, event: &LedgerEvent) -> serde_json::Result<Self> {
        Ok(Self {
            id: None,
            business_date,
            source: source.to_string(),
            event_type: event.type_name().to_string(),
            payload: serde_json::to_string(event)?,
        })
    }
}

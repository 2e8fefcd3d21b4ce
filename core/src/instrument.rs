//! Payment instruments: cheques, cash receipts and online payments.
//!
//! Every instrument carries an optional client reference plus a free-text
//! client name, a positive amount, a variant-specific status and a date.
//! Constructors validate input; the scorer and matcher assume valid records.

use crate::{
    error::{ensure_positive, ensure_present, LedgerResult},
    types::{new_id, ClientId, Money, RecordId},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which instrument family a payment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentKind {
    Cheque,
    Cash,
    Online,
}

impl PaymentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cheque => "Cheque",
            Self::Cash => "Cash",
            Self::Online => "Online",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Cheque" => Some(Self::Cheque),
            "Cash" => Some(Self::Cash),
            "Online" => Some(Self::Online),
            _ => None,
        }
    }
}

// ── Cheque ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChequeStatus {
    Pending,
    #[serde(rename = "Post-Dated")]
    PostDated,
    Cleared,
    Bounced,
}

impl ChequeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::PostDated => "Post-Dated",
            Self::Cleared => "Cleared",
            Self::Bounced => "Bounced",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Pending" => Some(Self::Pending),
            "Post-Dated" => Some(Self::PostDated),
            "Cleared" => Some(Self::Cleared),
            "Bounced" => Some(Self::Bounced),
            _ => None,
        }
    }

    /// Money the client still owes on this cheque.
    pub fn is_outstanding(&self) -> bool {
        match self {
            Self::Pending | Self::PostDated => true,
            Self::Cleared | Self::Bounced => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_outstanding()
    }
}

/// Fields read off a cheque image by the OCR collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrShadow {
    pub cheque_number: Option<String>,
    pub amount: Option<String>,
    pub date: Option<String>,
    pub bank_name: Option<String>,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCheque {
    #[serde(default)]
    pub client_id: Option<ClientId>,
    pub client_name: String,
    pub cheque_number: String,
    pub bank_name: String,
    pub amount: Money,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub status: Option<ChequeStatus>,
    #[serde(default)]
    pub image_ref: Option<String>,
    #[serde(default)]
    pub ocr: Option<OcrShadow>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cheque {
    pub cheque_id: RecordId,
    pub client_id: Option<ClientId>,
    pub client_name: String,
    pub cheque_number: String,
    pub bank_name: String,
    pub amount: Money,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: ChequeStatus,
    pub image_ref: Option<String>,
    pub ocr: Option<OcrShadow>,
    pub bounce_reason: Option<String>,
    pub bounce_date: Option<NaiveDate>,
    pub clearance_date: Option<NaiveDate>,
    pub reminder_sent: bool,
    pub reminder_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// A status change requested by an operator or a bank feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChequeStatusUpdate {
    pub status: ChequeStatus,
    #[serde(default)]
    pub bounce_reason: Option<String>,
    #[serde(default)]
    pub clearance_date: Option<NaiveDate>,
}

impl Cheque {
    pub fn new(input: NewCheque) -> LedgerResult<Self> {
        ensure_present("cheque", "client_name", &input.client_name)?;
        ensure_present("cheque", "cheque_number", &input.cheque_number)?;
        ensure_present("cheque", "bank_name", &input.bank_name)?;
        ensure_positive("cheque.amount", input.amount)?;

        Ok(Self {
            cheque_id: new_id(),
            client_id: input.client_id,
            client_name: input.client_name.trim().to_string(),
            cheque_number: input.cheque_number.trim().to_string(),
            bank_name: input.bank_name.trim().to_string(),
            amount: input.amount,
            issue_date: input.issue_date,
            due_date: input.due_date,
            status: input.status.unwrap_or(ChequeStatus::Pending),
            image_ref: input.image_ref,
            ocr: input.ocr,
            bounce_reason: None,
            bounce_date: None,
            clearance_date: None,
            reminder_sent: false,
            reminder_date: None,
            notes: input.notes,
        })
    }

    /// Apply a status transition. Returns the previous status.
    ///
    /// Bounced records the reason and a bounce date; Cleared records the
    /// clearance date. Both default to `today` when not supplied.
    pub fn apply_status(&mut self, update: &ChequeStatusUpdate, today: NaiveDate) -> ChequeStatus {
        let previous = self.status;
        if previous.is_terminal() && previous != update.status {
            log::warn!(
                "cheque {} leaving terminal status {} for {}",
                self.cheque_number,
                previous.as_str(),
                update.status.as_str()
            );
        }

        self.status = update.status;
        match update.status {
            ChequeStatus::Bounced => {
                if update.bounce_reason.is_some() {
                    self.bounce_reason = update.bounce_reason.clone();
                }
                self.bounce_date = Some(today);
            }
            ChequeStatus::Cleared => {
                self.clearance_date = Some(update.clearance_date.unwrap_or(today));
            }
            ChequeStatus::Pending | ChequeStatus::PostDated => {}
        }
        previous
    }
}

// ── Cash ───────────────────────────────────────────────────────────

/// One line of a cash count. Display/audit only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Denomination {
    pub value: Money,
    pub count: u32,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankDeposit {
    pub bank_name: String,
    pub deposit_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCash {
    #[serde(default)]
    pub client_id: Option<ClientId>,
    pub client_name: String,
    pub receipt_number: String,
    pub amount: Money,
    pub date: NaiveDate,
    #[serde(default)]
    pub denominations: Vec<Denomination>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cash {
    pub cash_id: RecordId,
    pub client_id: Option<ClientId>,
    pub client_name: String,
    pub receipt_number: String,
    pub amount: Money,
    pub date: NaiveDate,
    pub denominations: Vec<Denomination>,
    pub verified: bool,
    pub verified_by: Option<String>,
    pub deposit: Option<BankDeposit>,
    pub notes: Option<String>,
}

impl Cash {
    pub fn new(input: NewCash) -> LedgerResult<Self> {
        ensure_present("cash", "client_name", &input.client_name)?;
        ensure_present("cash", "receipt_number", &input.receipt_number)?;
        ensure_positive("cash.amount", input.amount)?;

        Ok(Self {
            cash_id: new_id(),
            client_id: input.client_id,
            client_name: input.client_name.trim().to_string(),
            receipt_number: input.receipt_number.trim().to_string(),
            amount: input.amount,
            date: input.date,
            denominations: input.denominations,
            verified: false,
            verified_by: None,
            deposit: None,
            notes: input.notes,
        })
    }
}

// ── Online ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OnlineStatus {
    Pending,
    Success,
    Failed,
    Refunded,
}

impl OnlineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Success => "Success",
            Self::Failed => "Failed",
            Self::Refunded => "Refunded",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Pending" => Some(Self::Pending),
            "Success" => Some(Self::Success),
            "Failed" => Some(Self::Failed),
            "Refunded" => Some(Self::Refunded),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "UPI")]
    Upi,
    Card,
    NetBanking,
    Wallet,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upi => "UPI",
            Self::Card => "Card",
            Self::NetBanking => "NetBanking",
            Self::Wallet => "Wallet",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "UPI" => Some(Self::Upi),
            "Card" => Some(Self::Card),
            "NetBanking" => Some(Self::NetBanking),
            "Wallet" => Some(Self::Wallet),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOnline {
    #[serde(default)]
    pub client_id: Option<ClientId>,
    pub client_name: String,
    pub receipt_number: String,
    pub method: PaymentMethod,
    pub amount: Money,
    pub date: NaiveDate,
    #[serde(default)]
    pub status: Option<OnlineStatus>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub gateway_session_id: Option<String>,
    #[serde(default)]
    pub gateway_intent_id: Option<String>,
    #[serde(default)]
    pub reference_number: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Online {
    pub online_id: RecordId,
    pub client_id: Option<ClientId>,
    pub client_name: String,
    pub receipt_number: String,
    pub method: PaymentMethod,
    pub amount: Money,
    pub date: NaiveDate,
    pub status: OnlineStatus,
    pub verified: bool,
    pub verified_by: Option<String>,
    pub deposit: Option<BankDeposit>,
    pub gateway_session_id: Option<String>,
    pub gateway_intent_id: Option<String>,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
}

impl Online {
    pub fn new(input: NewOnline) -> LedgerResult<Self> {
        ensure_present("online", "client_name", &input.client_name)?;
        ensure_present("online", "receipt_number", &input.receipt_number)?;
        ensure_positive("online.amount", input.amount)?;

        Ok(Self {
            online_id: new_id(),
            client_id: input.client_id,
            client_name: input.client_name.trim().to_string(),
            receipt_number: input.receipt_number.trim().to_string(),
            method: input.method,
            amount: input.amount,
            date: input.date,
            status: input.status.unwrap_or(OnlineStatus::Pending),
            verified: input.verified,
            verified_by: None,
            deposit: None,
            gateway_session_id: input.gateway_session_id,
            gateway_intent_id: input.gateway_intent_id,
            reference_number: input.reference_number,
            notes: input.notes,
        })
    }
}

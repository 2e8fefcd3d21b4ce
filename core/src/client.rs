//! Client records and their derived credit-risk fields.
//!
//! RULE: the risk fields and the outstanding amount are never set by hand.
//! They change only through `apply_risk` and `refresh_outstanding`.

use crate::{
    error::{ensure_present, LedgerError, LedgerResult},
    instrument::Cheque,
    risk::{RiskAssessment, RiskLevel},
    types::{new_id, ClientId, Money},
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CREDIT_LIMIT: Money = 100_000.0;

/// Registration input for a new client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewClient {
    pub name: String,
    #[serde(default)]
    pub company_name: Option<String>,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub gst_number: Option<String>,
    #[serde(default)]
    pub pan_number: Option<String>,
    #[serde(default)]
    pub credit_limit: Option<Money>,
}

/// Profile edits. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub gst_number: Option<String>,
    #[serde(default)]
    pub pan_number: Option<String>,
    #[serde(default)]
    pub credit_limit: Option<Money>,
    #[serde(default)]
    pub kyc_verified: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub client_id: ClientId,
    pub name: String,
    pub company_name: Option<String>,
    pub email: String,
    pub phone: String,
    pub gst_number: Option<String>,
    pub pan_number: Option<String>,
    pub credit_limit: Money,
    pub kyc_verified: bool,
    pub(crate) outstanding_amount: Money,
    pub(crate) risk_score: u8,
    pub(crate) risk_level: RiskLevel,
    pub(crate) bounce_count: u32,
    pub(crate) total_payments: u32,
    pub(crate) avg_payment_delay: u32,
}

impl Client {
    /// Validate and normalise registration input.
    pub fn register(input: NewClient) -> LedgerResult<Self> {
        ensure_present("client", "name", &input.name)?;
        ensure_present("client", "email", &input.email)?;
        ensure_present("client", "phone", &input.phone)?;

        let credit_limit = input.credit_limit.unwrap_or(DEFAULT_CREDIT_LIMIT);
        ensure_credit_limit(credit_limit)?;

        Ok(Self {
            client_id: new_id(),
            name: input.name.trim().to_string(),
            company_name: trimmed(input.company_name),
            email: input.email.trim().to_lowercase(),
            phone: input.phone.trim().to_string(),
            gst_number: trimmed(input.gst_number).map(|s| s.to_uppercase()),
            pan_number: trimmed(input.pan_number).map(|s| s.to_uppercase()),
            credit_limit,
            kyc_verified: false,
            outstanding_amount: 0.0,
            risk_score: 0,
            risk_level: RiskLevel::Low,
            bounce_count: 0,
            total_payments: 0,
            avg_payment_delay: 0,
        })
    }

    /// Apply profile edits. Validation runs before any field changes, so a
    /// rejected update leaves the record untouched.
    pub fn apply_update(&mut self, update: ClientUpdate) -> LedgerResult<()> {
        if let Some(name) = &update.name {
            ensure_present("client", "name", name)?;
        }
        if let Some(email) = &update.email {
            ensure_present("client", "email", email)?;
        }
        if let Some(phone) = &update.phone {
            ensure_present("client", "phone", phone)?;
        }
        if let Some(limit) = update.credit_limit {
            ensure_credit_limit(limit)?;
        }

        if let Some(name) = update.name {
            self.name = name.trim().to_string();
        }
        if update.company_name.is_some() {
            self.company_name = trimmed(update.company_name);
        }
        if let Some(email) = update.email {
            self.email = email.trim().to_lowercase();
        }
        if let Some(phone) = update.phone {
            self.phone = phone.trim().to_string();
        }
        if update.gst_number.is_some() {
            self.gst_number = trimmed(update.gst_number).map(|s| s.to_uppercase());
        }
        if update.pan_number.is_some() {
            self.pan_number = trimmed(update.pan_number).map(|s| s.to_uppercase());
        }
        if let Some(limit) = update.credit_limit {
            self.credit_limit = limit;
        }
        if let Some(kyc) = update.kyc_verified {
            self.kyc_verified = kyc;
        }
        Ok(())
    }

    pub fn outstanding_amount(&self) -> Money {
        self.outstanding_amount
    }

    pub fn risk_score(&self) -> u8 {
        self.risk_score
    }

    pub fn risk_level(&self) -> RiskLevel {
        self.risk_level
    }

    pub fn bounce_count(&self) -> u32 {
        self.bounce_count
    }

    pub fn total_payments(&self) -> u32 {
        self.total_payments
    }

    pub fn avg_payment_delay(&self) -> u32 {
        self.avg_payment_delay
    }

    /// Recompute the outstanding amount from the client's cheque history.
    pub fn refresh_outstanding(&mut self, history: &[Cheque]) -> Money {
        self.outstanding_amount = outstanding_amount(history);
        self.outstanding_amount
    }

    /// Copy a computed assessment onto the record.
    pub fn apply_risk(&mut self, assessment: &RiskAssessment) {
        self.risk_score = assessment.risk_score;
        self.risk_level = assessment.risk_level;
        self.bounce_count = assessment.bounce_count;
        self.total_payments = assessment.total_payments;
        self.avg_payment_delay = assessment.avg_payment_delay;
    }
}

/// Sum of cheques that have not cleared or bounced yet.
pub fn outstanding_amount(history: &[Cheque]) -> Money {
    history
        .iter()
        .filter(|c| c.status.is_outstanding())
        .map(|c| c.amount)
        .sum()
}

fn ensure_credit_limit(limit: Money) -> LedgerResult<()> {
    if limit.is_finite() && limit >= 0.0 {
        Ok(())
    } else {
        Err(LedgerError::InvalidAmount {
            field: "credit_limit",
            value: limit,
        })
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

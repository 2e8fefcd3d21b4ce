//! Outbound notices to clients.
//!
//! Delivery (SMTP or otherwise) sits behind the `Notifier` trait. The core
//! only decides *what* to send and *when*; it never formats transport frames.

use crate::{
    error::{LedgerError, LedgerResult},
    types::Money,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// Sent ahead of a pending or post-dated cheque's due date.
    ChequeReminder {
        recipient: String,
        client_name: String,
        cheque_number: String,
        bank_name: String,
        amount: Money,
        due_date: NaiveDate,
    },
    /// Sent when a cheque is marked bounced.
    BounceNotice {
        recipient: String,
        client_name: String,
        cheque_number: String,
        amount: Money,
        bounce_reason: Option<String>,
        penalty: Money,
    },
}

impl Notice {
    pub fn recipient(&self) -> &str {
        match self {
            Self::ChequeReminder { recipient, .. } | Self::BounceNotice { recipient, .. } => {
                recipient
            }
        }
    }

    pub fn cheque_number(&self) -> &str {
        match self {
            Self::ChequeReminder { cheque_number, .. }
            | Self::BounceNotice { cheque_number, .. } => cheque_number,
        }
    }

    pub fn subject(&self) -> String {
        match self {
            Self::ChequeReminder { cheque_number, .. } => {
                format!("Payment reminder: cheque #{cheque_number}")
            }
            Self::BounceNotice { cheque_number, .. } => {
                format!("Cheque bounced: #{cheque_number}")
            }
        }
    }

    pub fn body(&self) -> String {
        match self {
            Self::ChequeReminder {
                client_name,
                cheque_number,
                bank_name,
                amount,
                due_date,
                ..
            } => format!(
                "Dear {client_name},\n\n\
                 This is a reminder that your cheque #{cheque_number} ({bank_name}) \
                 for {} is due on {}.\n\
                 Please ensure sufficient funds are available in the account.\n",
                format_amount(*amount),
                due_date.format("%d %b %Y"),
            ),
            Self::BounceNotice {
                client_name,
                cheque_number,
                amount,
                bounce_reason,
                penalty,
                ..
            } => format!(
                "Dear {client_name},\n\n\
                 Your cheque #{cheque_number} for {} has been returned unpaid.\n\
                 Reason: {}\n\
                 A bounce charge of {} applies. Please arrange an alternative payment.\n",
                format_amount(*amount),
                bounce_reason.as_deref().unwrap_or("not stated"),
                format_amount(*penalty),
            ),
        }
    }
}

fn format_amount(amount: Money) -> String {
    format!("Rs. {amount:.2}")
}

pub trait Notifier: Send {
    fn send(&self, notice: &Notice) -> LedgerResult<()>;
}

/// Writes each notice to the log. The default sink.
pub struct LogNotifier {
    sender: String,
}

impl LogNotifier {
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
        }
    }
}

impl Notifier for LogNotifier {
    fn send(&self, notice: &Notice) -> LedgerResult<()> {
        log::info!(
            "notice from {} to {}: {}",
            self.sender,
            notice.recipient(),
            notice.subject()
        );
        log::debug!("{}", notice.body());
        Ok(())
    }
}

/// Keeps every notice in memory.
#[derive(Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<Notice>>,
    reject: Option<String>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier that fails every send addressed to `recipient`.
    pub fn rejecting(recipient: impl Into<String>) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            reject: Some(recipient.into()),
        }
    }

    pub fn sent(&self) -> Vec<Notice> {
        self.sent.lock().map(|v| v.clone()).unwrap_or_default()
    }

    /// Remove and return everything collected so far.
    pub fn drain(&self) -> Vec<Notice> {
        self.sent
            .lock()
            .map(|mut v| std::mem::take(&mut *v))
            .unwrap_or_default()
    }
}

impl Notifier for MemoryNotifier {
    fn send(&self, notice: &Notice) -> LedgerResult<()> {
        if self.reject.as_deref() == Some(notice.recipient()) {
            return Err(LedgerError::Notification(format!(
                "mailbox {} unavailable",
                notice.recipient()
            )));
        }
        self.sent
            .lock()
            .map_err(|_| LedgerError::Notification("notice buffer poisoned".into()))?
            .push(notice.clone());
        Ok(())
    }
}

impl<N: Notifier + Sync> Notifier for std::sync::Arc<N> {
    fn send(&self, notice: &Notice) -> LedgerResult<()> {
        (**self).send(notice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reminder(recipient: &str) -> Notice {
        Notice::ChequeReminder {
            recipient: recipient.into(),
            client_name: "Acme Traders".into(),
            cheque_number: "123456".into(),
            bank_name: "HDFC BANK".into(),
            amount: 25_000.0,
            due_date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
        }
    }

    #[test]
    fn reminder_renders_cheque_details() {
        let n = reminder("ops@acme.test");
        assert_eq!(n.subject(), "Payment reminder: cheque #123456");
        let body = n.body();
        assert!(body.contains("Dear Acme Traders"));
        assert!(body.contains("Rs. 25000.00"));
        assert!(body.contains("15 Mar 2024"));
    }

    #[test]
    fn memory_notifier_collects_and_rejects() {
        let sink = MemoryNotifier::rejecting("down@acme.test");
        sink.send(&reminder("ops@acme.test")).unwrap();
        assert!(sink.send(&reminder("down@acme.test")).is_err());
        assert_eq!(sink.sent().len(), 1);
        assert_eq!(sink.drain().len(), 1);
        assert!(sink.sent().is_empty());
    }
}

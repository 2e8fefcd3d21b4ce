//! Post-dated cheque reminders.
//!
//! Each morning, every Pending or Post-Dated cheque falling due within the
//! lead window gets one reminder addressed to its client. A cheque is
//! reminded at most once; a failed send leaves it eligible for the next run.

use crate::{
    clock::add_days_clamped,
    config::ReminderConfig,
    error::LedgerResult,
    event::LedgerEvent,
    instrument::Cheque,
    job::ScheduledJob,
    notify::{Notice, Notifier},
    store::{ChequeFilter, LedgerStore},
};
use chrono::NaiveDate;

pub struct ChequeReminderJob {
    config: ReminderConfig,
}

impl ChequeReminderJob {
    pub fn new(config: ReminderConfig) -> Self {
        Self { config }
    }

    /// Cheques due in `[date, date + lead_days]` with no reminder yet.
    fn due_cheques(&self, date: NaiveDate, store: &LedgerStore) -> LedgerResult<Vec<Cheque>> {
        let until = add_days_clamped(date, self.config.lead_days);
        let cheques = store.list_cheques(&ChequeFilter::outstanding().due_between(date, until))?;
        Ok(cheques.into_iter().filter(|c| !c.reminder_sent).collect())
    }
}

impl ScheduledJob for ChequeReminderJob {
    fn name(&self) -> &'static str {
        "cheque_reminder"
    }

    fn run(
        &mut self,
        date: NaiveDate,
        store: &LedgerStore,
        notifier: &dyn Notifier,
    ) -> LedgerResult<Vec<LedgerEvent>> {
        if !self.config.enabled {
            return Ok(Vec::new());
        }

        let mut events = Vec::new();
        for cheque in self.due_cheques(date, store)? {
            let Some(client_id) = cheque.client_id.as_deref() else {
                continue;
            };
            let client = store.get_client(client_id)?;
            if client.email.trim().is_empty() {
                continue;
            }
            let email = client.email.clone();

            let notice = Notice::ChequeReminder {
                recipient: email.clone(),
                client_name: client.name.clone(),
                cheque_number: cheque.cheque_number.clone(),
                bank_name: cheque.bank_name.clone(),
                amount: cheque.amount,
                due_date: cheque.due_date,
            };

            match notifier.send(&notice) {
                Ok(()) => {
                    store.mark_reminder_sent(&cheque.cheque_id, date)?;
                    events.push(LedgerEvent::ReminderSent {
                        cheque_id: cheque.cheque_id,
                        recipient: email,
                        due_date: cheque.due_date,
                    });
                }
                Err(e) => {
                    log::warn!("reminder for cheque {} failed: {e}", cheque.cheque_number);
                    events.push(LedgerEvent::NotificationFailed {
                        cheque_id: cheque.cheque_id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        log::debug!("cheque reminders {date}: {} events", events.len());
        Ok(events)
    }
}

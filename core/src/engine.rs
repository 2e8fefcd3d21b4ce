//! The ledger desk: the single entry point for every state change.
//!
//! JOB ORDER (fixed, documented, never reordered):
//!   1. Risk sweep        (rescore every client from its cheque history)
//!   2. Cheque reminders  (notify clients of cheques falling due)
//!
//! RULES:
//!   - Only the desk calls the risk scorer and the reconciler and persists
//!     their results.
//!   - Read-modify-write sequences run under the store's write lock.
//!   - Every state change is recorded in the event log.

use crate::{
    analytics::{self, DashboardStats, MonthlySummary, TrendBucket},
    client::{Client, ClientUpdate, NewClient},
    clock::BusinessClock,
    config::LedgerConfig,
    error::{ensure_present, LedgerError, LedgerResult},
    event::{EventLogEntry, LedgerEvent},
    gateway::{self, CheckoutCompleted},
    instrument::{
        BankDeposit, Cash, Cheque, ChequeStatus, ChequeStatusUpdate, NewCash, NewCheque,
        NewOnline, Online, OnlineStatus, PaymentKind,
    },
    invoice::{Invoice, NewInvoice},
    job::ScheduledJob,
    notify::{Notice, Notifier},
    reconciliation::{ReconciliationReport, Reconciler},
    reminder_job::ChequeReminderJob,
    risk::{compute_risk, RiskAssessment},
    risk_sweep_job::RiskSweepJob,
    store::LedgerStore,
};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};

/// Event source for changes made directly through the desk.
const DESK: &str = "desk";

pub struct LedgerDesk {
    pub clock: BusinessClock,
    config: LedgerConfig,
    reconciler: Reconciler,
    notifier: Box<dyn Notifier>,
    jobs: Vec<Box<dyn ScheduledJob>>,
    store: LedgerStore,
}

impl LedgerDesk {
    pub fn new(
        store: LedgerStore,
        config: LedgerConfig,
        notifier: Box<dyn Notifier>,
        today: NaiveDate,
    ) -> Self {
        Self {
            clock: BusinessClock::new(today),
            reconciler: Reconciler::new(config.reconciliation.clone()),
            config,
            notifier,
            jobs: Vec::new(),
            store,
        }
    }

    /// Build a desk with the daily jobs registered in the documented order.
    pub fn build(
        store: LedgerStore,
        config: LedgerConfig,
        notifier: Box<dyn Notifier>,
        today: NaiveDate,
    ) -> Self {
        let mut desk = Self::new(store, config, notifier, today);
        let risk = desk.config.risk.clone();
        let reminders = desk.config.reminders.clone();
        desk.register(Box::new(RiskSweepJob::new(risk)));
        desk.register(Box::new(ChequeReminderJob::new(reminders)));
        desk
    }

    /// Register a job. Call in the documented order.
    pub fn register(&mut self, job: Box<dyn ScheduledJob>) {
        self.jobs.push(job);
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today
    }

    // ── Clients ───────────────────────────────────────────────────

    pub fn register_client(&self, input: NewClient) -> LedgerResult<Client> {
        let client = Client::register(input)?;
        self.store.insert_client(&client)?;
        self.log_event(
            self.today(),
            &LedgerEvent::ClientRegistered {
                client_id: client.client_id.clone(),
                name: client.name.clone(),
            },
        )?;
        Ok(client)
    }

    /// Rescore one client from its full cheque history and persist the result.
    pub fn recompute_client_risk(&self, client_id: &str) -> LedgerResult<RiskAssessment> {
        let cfg = &self.config.risk;
        let today = self.today();
        self.store.with_write_lock(|store| {
            let mut client = store.get_client(client_id)?;
            let history = store.cheques_for_client(client_id)?;
            client.refresh_outstanding(&history);
            let assessment = compute_risk(&client, &history, cfg);
            client.apply_risk(&assessment);
            store.update_client_risk(&client)?;
            store.append_event(&EventLogEntry::new(
                today,
                DESK,
                &LedgerEvent::RiskRecomputed {
                    client_id: client.client_id.clone(),
                    risk_score: assessment.risk_score,
                    risk_level: assessment.risk_level,
                    outstanding_amount: client.outstanding_amount(),
                },
            )?)?;
            Ok(assessment)
        })
    }

    /// Edit a client's profile, then rescore it. The credit limit feeds the
    /// outstanding-ratio term, so a limit change moves the score.
    pub fn update_client(&self, client_id: &str, update: ClientUpdate) -> LedgerResult<Client> {
        let mut client = self.store.get_client(client_id)?;
        client.apply_update(update)?;
        self.store.update_client_profile(&client)?;
        self.log_event(
            self.today(),
            &LedgerEvent::ClientUpdated {
                client_id: client.client_id.clone(),
                credit_limit: client.credit_limit,
            },
        )?;
        self.recompute_client_risk(client_id)?;
        self.store.get_client(client_id)
    }

    pub fn delete_client(&self, client_id: &str) -> LedgerResult<()> {
        self.store.delete_client(client_id)?;
        self.log_deleted("client", client_id)
    }

    // ── Cheques ───────────────────────────────────────────────────

    pub fn record_cheque(&self, input: NewCheque) -> LedgerResult<Cheque> {
        if let Some(client_id) = &input.client_id {
            self.store.get_client(client_id)?;
        }
        let cheque = Cheque::new(input)?;
        self.store.insert_cheque(&cheque)?;
        self.log_event(
            self.today(),
            &LedgerEvent::ChequeRecorded {
                cheque_id: cheque.cheque_id.clone(),
                cheque_number: cheque.cheque_number.clone(),
                client_id: cheque.client_id.clone(),
                amount: cheque.amount,
            },
        )?;
        if let Some(client_id) = &cheque.client_id {
            self.recompute_client_risk(client_id)?;
        }
        Ok(cheque)
    }

    /// Move a cheque to a new status, rescore its client and, on a bounce,
    /// notify the client.
    pub fn set_cheque_status(
        &self,
        cheque_id: &str,
        update: ChequeStatusUpdate,
        today: NaiveDate,
    ) -> LedgerResult<Cheque> {
        let mut cheque = self.store.get_cheque(cheque_id)?;
        let previous = cheque.apply_status(&update, today);
        self.store.update_cheque(&cheque)?;
        self.log_event(
            today,
            &LedgerEvent::ChequeStatusChanged {
                cheque_id: cheque.cheque_id.clone(),
                cheque_number: cheque.cheque_number.clone(),
                from: previous,
                to: cheque.status,
            },
        )?;

        if let Some(client_id) = &cheque.client_id {
            self.recompute_client_risk(client_id)?;
        }

        let newly_bounced =
            cheque.status == ChequeStatus::Bounced && previous != ChequeStatus::Bounced;
        if newly_bounced && self.config.notifications.notify_on_bounce {
            self.send_bounce_notice(&cheque, today)?;
        }
        Ok(cheque)
    }

    pub fn delete_cheque(&self, cheque_id: &str) -> LedgerResult<()> {
        let cheque = self.store.get_cheque(cheque_id)?;
        self.store.delete_cheque(cheque_id)?;
        self.log_deleted("cheque", cheque_id)?;
        if let Some(client_id) = &cheque.client_id {
            self.recompute_client_risk(client_id)?;
        }
        Ok(())
    }

    fn send_bounce_notice(&self, cheque: &Cheque, today: NaiveDate) -> LedgerResult<()> {
        let Some(client_id) = cheque.client_id.as_deref() else {
            return Ok(());
        };
        let client = self.store.get_client(client_id)?;
        let notice = Notice::BounceNotice {
            recipient: client.email.clone(),
            client_name: client.name.clone(),
            cheque_number: cheque.cheque_number.clone(),
            amount: cheque.amount,
            bounce_reason: cheque.bounce_reason.clone(),
            penalty: self.config.notifications.bounce_penalty,
        };
        let event = match self.notifier.send(&notice) {
            Ok(()) => LedgerEvent::BounceNoticeSent {
                cheque_id: cheque.cheque_id.clone(),
                recipient: client.email,
            },
            Err(e) => {
                log::warn!("bounce notice for cheque {} failed: {e}", cheque.cheque_number);
                LedgerEvent::NotificationFailed {
                    cheque_id: cheque.cheque_id.clone(),
                    reason: e.to_string(),
                }
            }
        };
        self.log_event(today, &event)
    }

    // ── Cash ──────────────────────────────────────────────────────

    pub fn record_cash(&self, input: NewCash) -> LedgerResult<Cash> {
        let cash = Cash::new(input)?;
        self.store.insert_cash(&cash)?;
        self.log_event(
            cash.date,
            &LedgerEvent::CashRecorded {
                cash_id: cash.cash_id.clone(),
                receipt_number: cash.receipt_number.clone(),
                amount: cash.amount,
            },
        )?;
        Ok(cash)
    }

    /// Mark a receipt as counted. Only verified cash is reconciled.
    pub fn verify_cash(&self, cash_id: &str, verified_by: Option<String>) -> LedgerResult<Cash> {
        let mut cash = self.store.get_cash(cash_id)?;
        cash.verified = true;
        cash.verified_by = verified_by;
        self.store.update_cash(&cash)?;
        self.log_event(
            self.today(),
            &LedgerEvent::CashVerified {
                cash_id: cash.cash_id.clone(),
                verified_by: cash.verified_by.clone(),
            },
        )?;
        Ok(cash)
    }

    pub fn record_bank_deposit(
        &self,
        cash_id: &str,
        bank_name: &str,
        deposit_date: NaiveDate,
    ) -> LedgerResult<Cash> {
        ensure_present("bank deposit", "bank_name", bank_name)?;
        let mut cash = self.store.get_cash(cash_id)?;
        cash.deposit = Some(BankDeposit {
            bank_name: bank_name.trim().to_string(),
            deposit_date,
        });
        self.store.update_cash(&cash)?;
        self.log_event(
            deposit_date,
            &LedgerEvent::CashDeposited {
                cash_id: cash.cash_id.clone(),
                bank_name: bank_name.trim().to_string(),
                deposit_date,
            },
        )?;
        Ok(cash)
    }

    pub fn delete_cash(&self, cash_id: &str) -> LedgerResult<()> {
        self.store.delete_cash(cash_id)?;
        self.log_deleted("cash", cash_id)
    }

    // ── Online payments ───────────────────────────────────────────

    pub fn record_online(&self, input: NewOnline) -> LedgerResult<Online> {
        let online = Online::new(input)?;
        self.insert_online(&online)?;
        Ok(online)
    }

    /// Record a completed checkout session. Unpaid sessions and sessions
    /// already on file yield `None`.
    pub fn ingest_checkout(
        &self,
        session: &CheckoutCompleted,
        today: NaiveDate,
    ) -> LedgerResult<Option<Online>> {
        if !session.is_paid() {
            log::debug!(
                "checkout {} not paid ({}), ignored",
                session.session_id,
                session.payment_status
            );
            return Ok(None);
        }
        if let Some(existing) = self.store.find_online_by_session(&session.session_id)? {
            log::debug!(
                "checkout {} already recorded as {}",
                session.session_id,
                existing.online_id
            );
            return Ok(None);
        }
        let online = session.into_online(today, self.config.gateway.minor_units)?;
        self.insert_online(&online)?;
        Ok(Some(online))
    }

    /// Verify a signed webhook body and ingest the checkout it carries.
    pub fn ingest_webhook(
        &self,
        payload: &str,
        signature: &str,
        secret: &str,
        now_unix: i64,
        today: NaiveDate,
    ) -> LedgerResult<Option<Online>> {
        gateway::verify_webhook_signature(
            payload,
            signature,
            secret,
            now_unix,
            self.config.gateway.signature_tolerance_secs,
        )?;
        match gateway::parse_checkout_event(payload)? {
            Some(session) => self.ingest_checkout(&session, today),
            None => Ok(None),
        }
    }

    pub fn verify_online(&self, online_id: &str, verified_by: Option<String>) -> LedgerResult<Online> {
        let mut online = self.store.get_online(online_id)?;
        online.verified = true;
        online.verified_by = verified_by;
        self.store.update_online(&online)?;
        self.log_event(
            self.today(),
            &LedgerEvent::OnlineVerified {
                online_id: online.online_id.clone(),
                verified_by: online.verified_by.clone(),
            },
        )?;
        Ok(online)
    }

    pub fn record_online_deposit(
        &self,
        online_id: &str,
        bank_name: &str,
        deposit_date: NaiveDate,
    ) -> LedgerResult<Online> {
        ensure_present("bank deposit", "bank_name", bank_name)?;
        let mut online = self.store.get_online(online_id)?;
        online.deposit = Some(BankDeposit {
            bank_name: bank_name.trim().to_string(),
            deposit_date,
        });
        self.store.update_online(&online)?;
        self.log_event(
            deposit_date,
            &LedgerEvent::OnlineDeposited {
                online_id: online.online_id.clone(),
                bank_name: bank_name.trim().to_string(),
                deposit_date,
            },
        )?;
        Ok(online)
    }

    /// Refund a successful payment. A refunded payment is never offered to
    /// the reconciler again. Payments already credited to an invoice cannot
    /// be refunded, since paid amounts only grow.
    pub fn refund_online(&self, online_id: &str) -> LedgerResult<Online> {
        let today = self.today();
        let online = self.store.with_write_lock(|store| {
            let mut online = store.get_online(online_id)?;
            if online.status != OnlineStatus::Success
                || store.is_payment_reconciled(PaymentKind::Online, online_id)?
            {
                let from = if online.status == OnlineStatus::Success {
                    "Reconciled"
                } else {
                    online.status.as_str()
                };
                return Err(LedgerError::InvalidTransition {
                    kind: "online payment",
                    id: online_id.to_string(),
                    from: from.to_string(),
                    to: OnlineStatus::Refunded.as_str().to_string(),
                });
            }
            online.status = OnlineStatus::Refunded;
            store.update_online(&online)?;
            store.append_event(&EventLogEntry::new(
                today,
                DESK,
                &LedgerEvent::OnlineRefunded {
                    online_id: online.online_id.clone(),
                    amount: online.amount,
                },
            )?)?;
            Ok(online)
        })?;
        log::info!("online payment {} refunded ({:.2})", online.receipt_number, online.amount);
        Ok(online)
    }

    pub fn delete_online(&self, online_id: &str) -> LedgerResult<()> {
        self.store.delete_online(online_id)?;
        self.log_deleted("online", online_id)
    }

    fn insert_online(&self, online: &Online) -> LedgerResult<()> {
        self.store.insert_online(online)?;
        self.log_event(
            online.date,
            &LedgerEvent::OnlineRecorded {
                online_id: online.online_id.clone(),
                receipt_number: online.receipt_number.clone(),
                amount: online.amount,
                gateway_session_id: online.gateway_session_id.clone(),
            },
        )
    }

    // ── Invoices & reconciliation ─────────────────────────────────

    pub fn create_invoice(&self, input: NewInvoice, today: NaiveDate) -> LedgerResult<Invoice> {
        if let Some(client_id) = &input.client_id {
            self.store.get_client(client_id)?;
        }
        let invoice = Invoice::new(input, today)?;
        self.store.insert_invoice(&invoice)?;
        self.log_event(
            today,
            &LedgerEvent::InvoiceCreated {
                invoice_id: invoice.invoice_id.clone(),
                invoice_number: invoice.invoice_number.clone(),
                amount: invoice.amount,
            },
        )?;
        self.store.get_invoice(&invoice.invoice_id)
    }

    /// Re-derive open invoice statuses for `as_of`. Returns how many changed.
    pub fn refresh_invoice_statuses(&self, as_of: NaiveDate) -> LedgerResult<usize> {
        self.store.with_write_lock(|store| {
            let mut changed = 0;
            for mut invoice in store.open_invoices()? {
                let before = invoice.status();
                if invoice.refresh_status(as_of) != before {
                    store.update_invoice_status(&invoice.invoice_id, invoice.status())?;
                    changed += 1;
                }
            }
            Ok(changed)
        })
    }

    pub fn delete_invoice(&self, invoice_id: &str) -> LedgerResult<()> {
        self.store.delete_invoice(invoice_id)?;
        self.log_deleted("invoice", invoice_id)
    }

    /// Match every confirmed, not-yet-credited payment against open invoices.
    ///
    /// Load, match and persist happen in one write transaction, so a payment
    /// is consumed at most once even with concurrent callers.
    pub fn reconcile(&self, as_of: NaiveDate) -> LedgerResult<ReconciliationReport> {
        let include_online = self.config.reconciliation.include_online;
        let report = self.store.with_write_lock(|store| {
            let mut invoices = store.open_invoices()?;
            let payments = store.unreconciled_payments(include_online)?;
            let report = self.reconciler.reconcile(&mut invoices, &payments, as_of)?;

            let touched: HashSet<&str> =
                report.matches.iter().map(|m| m.invoice_id.as_str()).collect();
            for invoice in invoices.iter().filter(|i| touched.contains(i.invoice_id.as_str())) {
                store.save_invoice_settlement(invoice)?;
            }

            for m in &report.matches {
                store.append_event(&EventLogEntry::new(
                    as_of,
                    DESK,
                    &LedgerEvent::PaymentReconciled {
                        invoice_id: m.invoice_id.clone(),
                        invoice_number: m.invoice_number.clone(),
                        payment_id: m.payment_id.clone(),
                        payment_kind: m.payment_kind,
                        amount: m.amount,
                        score: m.score,
                    },
                )?)?;
            }
            for u in &report.unmatched {
                store.append_event(&EventLogEntry::new(
                    as_of,
                    DESK,
                    &LedgerEvent::PaymentUnmatched {
                        payment_id: u.payment_id.clone(),
                        payment_kind: u.kind,
                        reference: u.reference.clone(),
                        amount: u.amount,
                    },
                )?)?;
            }
            store.append_event(&EventLogEntry::new(
                as_of,
                DESK,
                &LedgerEvent::ReconciliationCompleted {
                    matched: report.matched_count(),
                    unmatched: report.unmatched_count(),
                },
            )?)?;
            Ok(report)
        })?;

        log::info!(
            "reconciliation {as_of}: {} matched ({:.2}), {} unmatched",
            report.matched_count(),
            report.matched_amount(),
            report.unmatched_count()
        );
        Ok(report)
    }

    // ── Daily jobs ────────────────────────────────────────────────

    /// Run every registered job for `date`, in registration order.
    pub fn run_day(&mut self, date: NaiveDate) -> LedgerResult<Vec<LedgerEvent>> {
        self.clock.today = date;
        let mut day_events = Vec::new();

        for job in &mut self.jobs {
            let events = job.run(date, &self.store, self.notifier.as_ref())?;
            for event in &events {
                self.store
                    .append_event(&EventLogEntry::new(date, job.name(), event)?)?;
            }
            log::debug!("{date} {}: {} events", job.name(), events.len());
            day_events.extend(events);
        }
        Ok(day_events)
    }

    /// Advance the business clock one day and run that day's jobs.
    pub fn run_next_day(&mut self) -> LedgerResult<Vec<LedgerEvent>> {
        let date = self.clock.advance();
        self.run_day(date)
    }

    // ── Analytics ─────────────────────────────────────────────────

    pub fn dashboard(&self) -> LedgerResult<DashboardStats> {
        Ok(analytics::dashboard(
            &self.store.all_cheques()?,
            &self.store.all_cash()?,
        ))
    }

    pub fn upcoming_cheques(
        &self,
        from: NaiveDate,
        days: i64,
        limit: usize,
    ) -> LedgerResult<Vec<Cheque>> {
        Ok(analytics::upcoming_cheques(
            &self.store.all_cheques()?,
            from,
            days,
            limit,
        ))
    }

    pub fn monthly_summary(&self, year: i32, month: u32) -> LedgerResult<MonthlySummary> {
        Ok(analytics::monthly_summary(
            &self.store.all_cheques()?,
            &self.store.all_cash()?,
            year,
            month,
        ))
    }

    pub fn payment_trends(
        &self,
        as_of: NaiveDate,
        months: u32,
    ) -> LedgerResult<BTreeMap<String, TrendBucket>> {
        Ok(analytics::payment_trends(
            &self.store.all_cheques()?,
            &self.store.all_cash()?,
            as_of,
            months,
        ))
    }

    // ── Event log ─────────────────────────────────────────────────

    fn log_event(&self, date: NaiveDate, event: &LedgerEvent) -> LedgerResult<()> {
        self.store
            .append_event(&EventLogEntry::new(date, DESK, event)?)
    }

    fn log_deleted(&self, kind: &str, id: &str) -> LedgerResult<()> {
        self.log_event(
            self.today(),
            &LedgerEvent::RecordDeleted {
                kind: kind.to_string(),
                id: id.to_string(),
            },
        )
    }
}

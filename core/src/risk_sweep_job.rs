//! Nightly risk sweep.
//!
//! Rescores every client from its full cheque history and persists the
//! derived fields. Runs under the store's write lock so a concurrent
//! facade recompute cannot interleave with the snapshot.

use crate::{
    config::RiskConfig,
    error::LedgerResult,
    event::LedgerEvent,
    job::ScheduledJob,
    notify::Notifier,
    risk::sweep_risk,
    store::LedgerStore,
};
use chrono::NaiveDate;

pub struct RiskSweepJob {
    config: RiskConfig,
}

impl RiskSweepJob {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }
}

impl ScheduledJob for RiskSweepJob {
    fn name(&self) -> &'static str {
        "risk_sweep"
    }

    fn run(
        &mut self,
        date: NaiveDate,
        store: &LedgerStore,
        _notifier: &dyn Notifier,
    ) -> LedgerResult<Vec<LedgerEvent>> {
        store.with_write_lock(|store| {
            let mut snapshot = Vec::new();
            for client in store.all_clients()? {
                let history = store.cheques_for_client(&client.client_id)?;
                snapshot.push((client, history));
            }

            let results = sweep_risk(&snapshot, &self.config);
            let mut events = Vec::new();

            for ((client, history), result) in snapshot.iter_mut().zip(results) {
                let before = (
                    client.risk_score(),
                    client.risk_level(),
                    client.outstanding_amount(),
                    client.total_payments(),
                    client.bounce_count(),
                    client.avg_payment_delay(),
                );
                client.refresh_outstanding(history);
                client.apply_risk(&result.assessment);
                let after = (
                    client.risk_score(),
                    client.risk_level(),
                    client.outstanding_amount(),
                    client.total_payments(),
                    client.bounce_count(),
                    client.avg_payment_delay(),
                );
                if before == after {
                    continue;
                }

                store.update_client_risk(client)?;
                events.push(LedgerEvent::RiskRecomputed {
                    client_id: result.client_id,
                    risk_score: client.risk_score(),
                    risk_level: client.risk_level(),
                    outstanding_amount: client.outstanding_amount(),
                });
            }

            log::debug!(
                "risk sweep {date}: {} clients scanned, {} changed",
                snapshot.len(),
                events.len()
            );
            Ok(events)
        })
    }
}

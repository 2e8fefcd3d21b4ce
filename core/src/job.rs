//! Scheduled job trait.
//!
//! RULE: Every daily job implements ScheduledJob.
//! `LedgerDesk::run_day` calls run() on each registered job
//! in registration order, once per business date.
//! Execution order is fixed and documented in engine.rs.

use crate::{error::LedgerResult, event::LedgerEvent, notify::Notifier, store::LedgerStore};
use chrono::NaiveDate;

pub trait ScheduledJob: Send {
    /// Unique stable name, recorded as the event source.
    fn name(&self) -> &'static str;

    /// Run the job for one business date.
    ///
    /// - `date`:     the business date being processed
    /// - `store`:    read/write access to the ledger
    /// - `notifier`: outbound notice sink
    ///
    /// Returns the events to append to the log for this date.
    fn run(
        &mut self,
        date: NaiveDate,
        store: &LedgerStore,
        notifier: &dyn Notifier,
    ) -> LedgerResult<Vec<LedgerEvent>>;
}

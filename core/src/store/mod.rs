//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The facade and jobs call store methods; they never execute SQL directly.

use crate::{
    error::{LedgerError, LedgerResult},
    event::EventLogEntry,
};
use chrono::NaiveDate;
use rusqlite::{params, types::Type, Connection};
use serde::de::DeserializeOwned;

mod cash;
mod cheque;
mod client;
mod invoice;
mod online;

pub use cash::CashFilter;
pub use cheque::ChequeFilter;

pub struct LedgerStore {
    conn: Connection,
}

impl LedgerStore {
    pub fn open(path: &str) -> LedgerResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> LedgerResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> LedgerResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_clients.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_instruments.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/004_invoices.sql"))?;
        Ok(())
    }

    /// Run `f` under SQLite's write lock (`BEGIN IMMEDIATE`).
    ///
    /// Commits on `Ok`, rolls back on `Err`. Read-modify-write sequences
    /// (risk recompute, reconciliation) go through here so two writers never
    /// work from the same stale snapshot. Calls must not nest.
    pub fn with_write_lock<T>(&self, f: impl FnOnce(&Self) -> LedgerResult<T>) -> LedgerResult<T> {
        self.conn.execute_batch("BEGIN IMMEDIATE;")?;
        match f(self) {
            Ok(value) => {
                self.conn.execute_batch("COMMIT;")?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rb) = self.conn.execute_batch("ROLLBACK;") {
                    log::error!("rollback failed after '{e}': {rb}");
                }
                Err(e)
            }
        }
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> LedgerResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (business_date, source, event_type, payload)
             VALUES (?1, ?2, ?3, ?4)",
            params![entry.business_date, entry.source, entry.event_type, entry.payload],
        )?;
        Ok(())
    }

    pub fn events_for_date(&self, date: NaiveDate) -> LedgerResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, business_date, source, event_type, payload
             FROM event_log WHERE business_date = ?1
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![date], Self::map_event_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn all_events(&self) -> LedgerResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, business_date, source, event_type, payload
             FROM event_log ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map([], Self::map_event_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn event_count(&self, event_type: &str) -> LedgerResult<i64> {
        let n = self.conn.query_row(
            "SELECT COUNT(*) FROM event_log WHERE event_type = ?1",
            params![event_type],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    fn map_event_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EventLogEntry> {
        Ok(EventLogEntry {
            id: Some(row.get(0)?),
            business_date: row.get(1)?,
            source: row.get(2)?,
            event_type: row.get(3)?,
            payload: row.get(4)?,
        })
    }
}

// ── Row helpers ────────────────────────────────────────────────────

/// Decode a status label column, failing the row on unknown values.
pub(crate) fn parse_label<T>(
    idx: usize,
    raw: String,
    parse: fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unknown label '{raw}'").into(),
        )
    })
}

/// Decode a JSON text column.
pub(crate) fn parse_json<T: DeserializeOwned>(idx: usize, raw: &str) -> rusqlite::Result<T> {
    serde_json::from_str(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Map "no rows" onto a typed NotFound error.
pub(crate) fn not_found<T>(
    result: rusqlite::Result<T>,
    kind: &'static str,
    id: &str,
) -> LedgerResult<T> {
    match result {
        Ok(v) => Ok(v),
        Err(rusqlite::Error::QueryReturnedNoRows) => Err(LedgerError::NotFound {
            kind,
            id: id.to_string(),
        }),
        Err(e) => Err(e.into()),
    }
}

/// Turn an UPDATE/DELETE row count into NotFound when nothing matched.
pub(crate) fn expect_row(changed: usize, kind: &'static str, id: &str) -> LedgerResult<()> {
    if changed == 0 {
        Err(LedgerError::NotFound {
            kind,
            id: id.to_string(),
        })
    } else {
        Ok(())
    }
}

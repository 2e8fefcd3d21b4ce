use super::{expect_row, not_found, parse_label, LedgerStore};
use crate::{
    error::LedgerResult,
    instrument::{BankDeposit, Online, OnlineStatus, PaymentMethod},
};
use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};

pub(super) const ONLINE_COLUMNS: &str = "online_id, client_id, client_name, receipt_number, method, amount,
     date, status, verified, verified_by, deposit_bank, deposit_date,
     gateway_session_id, gateway_intent_id, reference_number, notes";

impl LedgerStore {
    // ── Online payments ───────────────────────────────────────────

    pub fn insert_online(&self, o: &Online) -> LedgerResult<()> {
        self.conn.execute(
            "INSERT INTO online_payment (
                online_id, client_id, client_name, receipt_number, method, amount,
                date, status, verified, verified_by, deposit_bank, deposit_date,
                gateway_session_id, gateway_intent_id, reference_number, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                o.online_id,
                o.client_id,
                o.client_name,
                o.receipt_number,
                o.method.as_str(),
                o.amount,
                o.date,
                o.status.as_str(),
                o.verified,
                o.verified_by,
                o.deposit.as_ref().map(|d| d.bank_name.clone()),
                o.deposit.as_ref().map(|d| d.deposit_date),
                o.gateway_session_id,
                o.gateway_intent_id,
                o.reference_number,
                o.notes,
            ],
        )?;
        Ok(())
    }

    pub fn get_online(&self, online_id: &str) -> LedgerResult<Online> {
        let result = self.conn.query_row(
            &format!("SELECT {ONLINE_COLUMNS} FROM online_payment WHERE online_id = ?1"),
            params![online_id],
            Self::map_online_row,
        );
        not_found(result, "online payment", online_id)
    }

    pub fn find_online_by_session(&self, session_id: &str) -> LedgerResult<Option<Online>> {
        let found = self
            .conn
            .query_row(
                &format!(
                    "SELECT {ONLINE_COLUMNS} FROM online_payment WHERE gateway_session_id = ?1"
                ),
                params![session_id],
                Self::map_online_row,
            )
            .optional()?;
        Ok(found)
    }

    /// Online payments, optionally restricted to one status, oldest first.
    pub fn list_online(&self, status: Option<OnlineStatus>) -> LedgerResult<Vec<Online>> {
        let rows = match status {
            Some(s) => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {ONLINE_COLUMNS} FROM online_payment WHERE status = ?1
                     ORDER BY date ASC, rowid ASC"
                ))?;
                let rows = stmt
                    .query_map(params![s.as_str()], Self::map_online_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {ONLINE_COLUMNS} FROM online_payment ORDER BY date ASC, rowid ASC"
                ))?;
                let rows = stmt
                    .query_map([], Self::map_online_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(rows)
    }

    pub fn update_online(&self, o: &Online) -> LedgerResult<()> {
        let changed = self.conn.execute(
            "UPDATE online_payment SET client_id = ?1, client_name = ?2, method = ?3,
                    amount = ?4, date = ?5, status = ?6, verified = ?7, verified_by = ?8,
                    deposit_bank = ?9, deposit_date = ?10, gateway_intent_id = ?11,
                    reference_number = ?12, notes = ?13
             WHERE online_id = ?14",
            params![
                o.client_id,
                o.client_name,
                o.method.as_str(),
                o.amount,
                o.date,
                o.status.as_str(),
                o.verified,
                o.verified_by,
                o.deposit.as_ref().map(|d| d.bank_name.clone()),
                o.deposit.as_ref().map(|d| d.deposit_date),
                o.gateway_intent_id,
                o.reference_number,
                o.notes,
                o.online_id,
            ],
        )?;
        expect_row(changed, "online payment", &o.online_id)
    }

    pub fn delete_online(&self, online_id: &str) -> LedgerResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM online_payment WHERE online_id = ?1",
            params![online_id],
        )?;
        expect_row(changed, "online payment", online_id)
    }

    pub(super) fn map_online_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Online> {
        let deposit_bank: Option<String> = row.get(10)?;
        let deposit_date: Option<NaiveDate> = row.get(11)?;
        let deposit = match (deposit_bank, deposit_date) {
            (Some(bank_name), Some(deposit_date)) => Some(BankDeposit {
                bank_name,
                deposit_date,
            }),
            _ => None,
        };
        Ok(Online {
            online_id: row.get(0)?,
            client_id: row.get(1)?,
            client_name: row.get(2)?,
            receipt_number: row.get(3)?,
            method: parse_label(4, row.get(4)?, PaymentMethod::from_label)?,
            amount: row.get(5)?,
            date: row.get(6)?,
            status: parse_label(7, row.get(7)?, OnlineStatus::from_label)?,
            verified: row.get(8)?,
            verified_by: row.get(9)?,
            deposit,
            gateway_session_id: row.get(12)?,
            gateway_intent_id: row.get(13)?,
            reference_number: row.get(14)?,
            notes: row.get(15)?,
        })
    }
}

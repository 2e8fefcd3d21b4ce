use super::{expect_row, not_found, parse_json, parse_label, LedgerStore};
use crate::{
    error::LedgerResult,
    instrument::{Cheque, ChequeStatus, OcrShadow},
};
use chrono::NaiveDate;
use rusqlite::{params, params_from_iter, types::Value};

pub(super) const CHEQUE_COLUMNS: &str = "cheque_id, client_id, client_name, cheque_number, bank_name, amount,
     issue_date, due_date, status, image_ref, ocr_json, bounce_reason, bounce_date,
     clearance_date, reminder_sent, reminder_date, notes";

/// Predicate for cheque queries. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct ChequeFilter {
    pub statuses: Vec<ChequeStatus>,
    pub client_id: Option<String>,
    pub due_from: Option<NaiveDate>,
    pub due_to: Option<NaiveDate>,
}

impl ChequeFilter {
    pub fn outstanding() -> Self {
        Self {
            statuses: vec![ChequeStatus::Pending, ChequeStatus::PostDated],
            ..Default::default()
        }
    }

    pub fn with_status(status: ChequeStatus) -> Self {
        Self {
            statuses: vec![status],
            ..Default::default()
        }
    }

    pub fn due_between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.due_from = Some(from);
        self.due_to = Some(to);
        self
    }
}

impl LedgerStore {
    // ── Cheque ────────────────────────────────────────────────────

    pub fn insert_cheque(&self, c: &Cheque) -> LedgerResult<()> {
        let ocr_json = c.ocr.as_ref().map(serde_json::to_string).transpose()?;
        self.conn.execute(
            "INSERT INTO cheque (
                cheque_id, client_id, client_name, cheque_number, bank_name, amount,
                issue_date, due_date, status, image_ref, ocr_json, bounce_reason, bounce_date,
                clearance_date, reminder_sent, reminder_date, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            params![
                c.cheque_id,
                c.client_id,
                c.client_name,
                c.cheque_number,
                c.bank_name,
                c.amount,
                c.issue_date,
                c.due_date,
                c.status.as_str(),
                c.image_ref,
                ocr_json,
                c.bounce_reason,
                c.bounce_date,
                c.clearance_date,
                c.reminder_sent,
                c.reminder_date,
                c.notes,
            ],
        )?;
        Ok(())
    }

    pub fn get_cheque(&self, cheque_id: &str) -> LedgerResult<Cheque> {
        let result = self.conn.query_row(
            &format!("SELECT {CHEQUE_COLUMNS} FROM cheque WHERE cheque_id = ?1"),
            params![cheque_id],
            Self::map_cheque_row,
        );
        not_found(result, "cheque", cheque_id)
    }

    /// Full cheque history of one client, any status, oldest first.
    pub fn cheques_for_client(&self, client_id: &str) -> LedgerResult<Vec<Cheque>> {
        self.list_cheques(&ChequeFilter {
            client_id: Some(client_id.to_string()),
            ..Default::default()
        })
    }

    /// Cheques matching `filter`, ordered by due date then insertion.
    pub fn list_cheques(&self, filter: &ChequeFilter) -> LedgerResult<Vec<Cheque>> {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if !filter.statuses.is_empty() {
            let marks = vec!["?"; filter.statuses.len()].join(",");
            clauses.push(format!("status IN ({marks})"));
            values.extend(
                filter
                    .statuses
                    .iter()
                    .map(|s| Value::Text(s.as_str().to_string())),
            );
        }
        if let Some(client_id) = &filter.client_id {
            clauses.push("client_id = ?".into());
            values.push(Value::Text(client_id.clone()));
        }
        if let Some(from) = filter.due_from {
            clauses.push("due_date >= ?".into());
            values.push(Value::Text(from.to_string()));
        }
        if let Some(to) = filter.due_to {
            clauses.push("due_date <= ?".into());
            values.push(Value::Text(to.to_string()));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CHEQUE_COLUMNS} FROM cheque {where_sql} ORDER BY due_date ASC, rowid ASC"
        ))?;
        let rows = stmt
            .query_map(params_from_iter(values), Self::map_cheque_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn all_cheques(&self) -> LedgerResult<Vec<Cheque>> {
        self.list_cheques(&ChequeFilter::default())
    }

    /// Persist every mutable field of a cheque.
    pub fn update_cheque(&self, c: &Cheque) -> LedgerResult<()> {
        let ocr_json = c.ocr.as_ref().map(serde_json::to_string).transpose()?;
        let changed = self.conn.execute(
            "UPDATE cheque SET client_id = ?1, client_name = ?2, bank_name = ?3, amount = ?4,
                    issue_date = ?5, due_date = ?6, status = ?7, image_ref = ?8, ocr_json = ?9,
                    bounce_reason = ?10, bounce_date = ?11, clearance_date = ?12,
                    reminder_sent = ?13, reminder_date = ?14, notes = ?15
             WHERE cheque_id = ?16",
            params![
                c.client_id,
                c.client_name,
                c.bank_name,
                c.amount,
                c.issue_date,
                c.due_date,
                c.status.as_str(),
                c.image_ref,
                ocr_json,
                c.bounce_reason,
                c.bounce_date,
                c.clearance_date,
                c.reminder_sent,
                c.reminder_date,
                c.notes,
                c.cheque_id,
            ],
        )?;
        expect_row(changed, "cheque", &c.cheque_id)
    }

    pub fn mark_reminder_sent(&self, cheque_id: &str, date: NaiveDate) -> LedgerResult<()> {
        let changed = self.conn.execute(
            "UPDATE cheque SET reminder_sent = 1, reminder_date = ?1 WHERE cheque_id = ?2",
            params![date, cheque_id],
        )?;
        expect_row(changed, "cheque", cheque_id)
    }

    pub fn delete_cheque(&self, cheque_id: &str) -> LedgerResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM cheque WHERE cheque_id = ?1", params![cheque_id])?;
        expect_row(changed, "cheque", cheque_id)
    }

    pub(super) fn map_cheque_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Cheque> {
        let ocr_json: Option<String> = row.get(10)?;
        let ocr = match ocr_json {
            Some(raw) => Some(parse_json::<OcrShadow>(10, &raw)?),
            None => None,
        };
        Ok(Cheque {
            cheque_id: row.get(0)?,
            client_id: row.get(1)?,
            client_name: row.get(2)?,
            cheque_number: row.get(3)?,
            bank_name: row.get(4)?,
            amount: row.get(5)?,
            issue_date: row.get(6)?,
            due_date: row.get(7)?,
            status: parse_label(8, row.get(8)?, ChequeStatus::from_label)?,
            image_ref: row.get(9)?,
            ocr,
            bounce_reason: row.get(11)?,
            bounce_date: row.get(12)?,
            clearance_date: row.get(13)?,
            reminder_sent: row.get(14)?,
            reminder_date: row.get(15)?,
            notes: row.get(16)?,
        })
    }
}

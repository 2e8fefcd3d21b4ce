use super::{expect_row, not_found, parse_json, LedgerStore};
use crate::{
    error::LedgerResult,
    instrument::{BankDeposit, Cash},
};
use chrono::NaiveDate;
use rusqlite::{params, params_from_iter, types::Value};

pub(super) const CASH_COLUMNS: &str = "cash_id, client_id, client_name, receipt_number, amount, date,
     denominations_json, verified, verified_by, deposit_bank, deposit_date, notes";

#[derive(Debug, Clone, Default)]
pub struct CashFilter {
    pub verified: Option<bool>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl LedgerStore {
    // ── Cash ──────────────────────────────────────────────────────

    pub fn insert_cash(&self, c: &Cash) -> LedgerResult<()> {
        let denominations = serde_json::to_string(&c.denominations)?;
        self.conn.execute(
            "INSERT INTO cash_receipt (
                cash_id, client_id, client_name, receipt_number, amount, date,
                denominations_json, verified, verified_by, deposit_bank, deposit_date, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                c.cash_id,
                c.client_id,
                c.client_name,
                c.receipt_number,
                c.amount,
                c.date,
                denominations,
                c.verified,
                c.verified_by,
                c.deposit.as_ref().map(|d| d.bank_name.clone()),
                c.deposit.as_ref().map(|d| d.deposit_date),
                c.notes,
            ],
        )?;
        Ok(())
    }

    pub fn get_cash(&self, cash_id: &str) -> LedgerResult<Cash> {
        let result = self.conn.query_row(
            &format!("SELECT {CASH_COLUMNS} FROM cash_receipt WHERE cash_id = ?1"),
            params![cash_id],
            Self::map_cash_row,
        );
        not_found(result, "cash", cash_id)
    }

    /// Cash receipts matching `filter`, oldest first.
    pub fn list_cash(&self, filter: &CashFilter) -> LedgerResult<Vec<Cash>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(verified) = filter.verified {
            clauses.push("verified = ?");
            values.push(Value::Integer(verified as i64));
        }
        if let Some(from) = filter.date_from {
            clauses.push("date >= ?");
            values.push(Value::Text(from.to_string()));
        }
        if let Some(to) = filter.date_to {
            clauses.push("date <= ?");
            values.push(Value::Text(to.to_string()));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CASH_COLUMNS} FROM cash_receipt {where_sql} ORDER BY date ASC, rowid ASC"
        ))?;
        let rows = stmt
            .query_map(params_from_iter(values), Self::map_cash_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn all_cash(&self) -> LedgerResult<Vec<Cash>> {
        self.list_cash(&CashFilter::default())
    }

    pub fn update_cash(&self, c: &Cash) -> LedgerResult<()> {
        let denominations = serde_json::to_string(&c.denominations)?;
        let changed = self.conn.execute(
            "UPDATE cash_receipt SET client_id = ?1, client_name = ?2, amount = ?3, date = ?4,
                    denominations_json = ?5, verified = ?6, verified_by = ?7,
                    deposit_bank = ?8, deposit_date = ?9, notes = ?10
             WHERE cash_id = ?11",
            params![
                c.client_id,
                c.client_name,
                c.amount,
                c.date,
                denominations,
                c.verified,
                c.verified_by,
                c.deposit.as_ref().map(|d| d.bank_name.clone()),
                c.deposit.as_ref().map(|d| d.deposit_date),
                c.notes,
                c.cash_id,
            ],
        )?;
        expect_row(changed, "cash", &c.cash_id)
    }

    pub fn delete_cash(&self, cash_id: &str) -> LedgerResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM cash_receipt WHERE cash_id = ?1", params![cash_id])?;
        expect_row(changed, "cash", cash_id)
    }

    pub(super) fn map_cash_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Cash> {
        let denominations_json: String = row.get(6)?;
        let deposit_bank: Option<String> = row.get(9)?;
        let deposit_date: Option<NaiveDate> = row.get(10)?;
        let deposit = match (deposit_bank, deposit_date) {
            (Some(bank_name), Some(deposit_date)) => Some(BankDeposit {
                bank_name,
                deposit_date,
            }),
            _ => None,
        };
        Ok(Cash {
            cash_id: row.get(0)?,
            client_id: row.get(1)?,
            client_name: row.get(2)?,
            receipt_number: row.get(3)?,
            amount: row.get(4)?,
            date: row.get(5)?,
            denominations: parse_json(6, &denominations_json)?,
            verified: row.get(7)?,
            verified_by: row.get(8)?,
            deposit,
            notes: row.get(11)?,
        })
    }
}

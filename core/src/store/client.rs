use super::{expect_row, not_found, parse_label, LedgerStore};
use crate::{client::Client, error::LedgerResult, risk::RiskLevel};
use rusqlite::params;

const CLIENT_COLUMNS: &str = "client_id, name, company_name, email, phone, gst_number, pan_number,
     credit_limit, kyc_verified, outstanding_amount, risk_score, risk_level,
     bounce_count, total_payments, avg_payment_delay";

impl LedgerStore {
    // ── Client ────────────────────────────────────────────────────

    pub fn insert_client(&self, c: &Client) -> LedgerResult<()> {
        self.conn.execute(
            "INSERT INTO client (
                client_id, name, company_name, email, phone, gst_number, pan_number,
                credit_limit, kyc_verified, outstanding_amount, risk_score, risk_level,
                bounce_count, total_payments, avg_payment_delay
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                c.client_id,
                c.name,
                c.company_name,
                c.email,
                c.phone,
                c.gst_number,
                c.pan_number,
                c.credit_limit,
                c.kyc_verified,
                c.outstanding_amount,
                c.risk_score,
                c.risk_level.as_str(),
                c.bounce_count,
                c.total_payments,
                c.avg_payment_delay,
            ],
        )?;
        Ok(())
    }

    pub fn get_client(&self, client_id: &str) -> LedgerResult<Client> {
        let result = self.conn.query_row(
            &format!("SELECT {CLIENT_COLUMNS} FROM client WHERE client_id = ?1"),
            params![client_id],
            Self::map_client_row,
        );
        not_found(result, "client", client_id)
    }

    /// Every client, in registration order.
    pub fn all_clients(&self) -> LedgerResult<Vec<Client>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {CLIENT_COLUMNS} FROM client ORDER BY rowid ASC"))?;
        let rows = stmt
            .query_map([], Self::map_client_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn clients_by_risk_level(&self, level: RiskLevel) -> LedgerResult<Vec<Client>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CLIENT_COLUMNS} FROM client WHERE risk_level = ?1
             ORDER BY risk_score DESC, rowid ASC"
        ))?;
        let rows = stmt
            .query_map(params![level.as_str()], Self::map_client_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Update identity/profile fields. Derived risk fields are left alone.
    pub fn update_client_profile(&self, c: &Client) -> LedgerResult<()> {
        let changed = self.conn.execute(
            "UPDATE client SET name = ?1, company_name = ?2, email = ?3, phone = ?4,
                    gst_number = ?5, pan_number = ?6, credit_limit = ?7, kyc_verified = ?8
             WHERE client_id = ?9",
            params![
                c.name,
                c.company_name,
                c.email,
                c.phone,
                c.gst_number,
                c.pan_number,
                c.credit_limit,
                c.kyc_verified,
                c.client_id,
            ],
        )?;
        expect_row(changed, "client", &c.client_id)
    }

    /// Persist the derived fields written by risk recompute.
    pub fn update_client_risk(&self, c: &Client) -> LedgerResult<()> {
        let changed = self.conn.execute(
            "UPDATE client SET outstanding_amount = ?1, risk_score = ?2, risk_level = ?3,
                    bounce_count = ?4, total_payments = ?5, avg_payment_delay = ?6
             WHERE client_id = ?7",
            params![
                c.outstanding_amount,
                c.risk_score,
                c.risk_level.as_str(),
                c.bounce_count,
                c.total_payments,
                c.avg_payment_delay,
                c.client_id,
            ],
        )?;
        expect_row(changed, "client", &c.client_id)
    }

    pub fn delete_client(&self, client_id: &str) -> LedgerResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM client WHERE client_id = ?1", params![client_id])?;
        expect_row(changed, "client", client_id)
    }

    pub fn client_count(&self) -> LedgerResult<i64> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM client", [], |row| row.get(0))?;
        Ok(n)
    }

    fn map_client_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Client> {
        Ok(Client {
            client_id: row.get(0)?,
            name: row.get(1)?,
            company_name: row.get(2)?,
            email: row.get(3)?,
            phone: row.get(4)?,
            gst_number: row.get(5)?,
            pan_number: row.get(6)?,
            credit_limit: row.get(7)?,
            kyc_verified: row.get(8)?,
            outstanding_amount: row.get(9)?,
            risk_score: row.get(10)?,
            risk_level: parse_label(11, row.get(11)?, RiskLevel::from_label)?,
            bounce_count: row.get(12)?,
            total_payments: row.get(13)?,
            avg_payment_delay: row.get(14)?,
        })
    }
}

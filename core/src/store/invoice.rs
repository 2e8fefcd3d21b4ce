use super::{
    cash::CASH_COLUMNS, cheque::CHEQUE_COLUMNS, expect_row, not_found, online::ONLINE_COLUMNS,
    parse_json, parse_label, LedgerStore,
};
use crate::{
    error::LedgerResult,
    instrument::PaymentKind,
    invoice::{Invoice, InvoiceStatus, ReconciledPayment},
    reconciliation::ConfirmedPayment,
};
use rusqlite::params;

const INVOICE_SELECT: &str = "SELECT i.invoice_id, i.client_id, c.name, i.invoice_number, i.amount,
            i.issue_date, i.due_date, i.description, i.items_json, i.paid_amount, i.status
     FROM invoice i LEFT JOIN client c ON c.client_id = i.client_id";

impl LedgerStore {
    // ── Invoice ───────────────────────────────────────────────────

    pub fn insert_invoice(&self, inv: &Invoice) -> LedgerResult<()> {
        let items_json = serde_json::to_string(&inv.items)?;
        self.conn.execute(
            "INSERT INTO invoice (
                invoice_id, client_id, invoice_number, amount, issue_date, due_date,
                description, items_json, paid_amount, remaining_amount, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?4 - ?9, ?10)",
            params![
                inv.invoice_id,
                inv.client_id,
                inv.invoice_number,
                inv.amount,
                inv.issue_date,
                inv.due_date,
                inv.description,
                items_json,
                inv.paid_amount,
                inv.status.as_str(),
            ],
        )?;
        self.insert_reconciled_rows(inv)
    }

    pub fn get_invoice(&self, invoice_id: &str) -> LedgerResult<Invoice> {
        let result = self.conn.query_row(
            &format!("{INVOICE_SELECT} WHERE i.invoice_id = ?1"),
            params![invoice_id],
            Self::map_invoice_row,
        );
        let mut inv = not_found(result, "invoice", invoice_id)?;
        inv.reconciled_payments = self.reconciled_payments_for(&inv.invoice_id)?;
        Ok(inv)
    }

    /// Invoices that can still receive payments, in creation order.
    pub fn open_invoices(&self) -> LedgerResult<Vec<Invoice>> {
        self.query_invoices(
            &format!("{INVOICE_SELECT} WHERE i.status != 'Paid' ORDER BY i.rowid ASC"),
            params![],
        )
    }

    pub fn all_invoices(&self) -> LedgerResult<Vec<Invoice>> {
        self.query_invoices(&format!("{INVOICE_SELECT} ORDER BY i.rowid ASC"), params![])
    }

    /// Persist paid amount, status and any newly credited payments.
    ///
    /// A payment already credited to a different invoice violates the
    /// `(payment_kind, payment_id)` uniqueness constraint and fails the write.
    pub fn save_invoice_settlement(&self, inv: &Invoice) -> LedgerResult<()> {
        let changed = self.conn.execute(
            "UPDATE invoice SET paid_amount = ?1, remaining_amount = amount - ?1, status = ?2
             WHERE invoice_id = ?3",
            params![inv.paid_amount, inv.status.as_str(), inv.invoice_id],
        )?;
        expect_row(changed, "invoice", &inv.invoice_id)?;
        self.insert_reconciled_rows(inv)
    }

    pub fn update_invoice_status(&self, invoice_id: &str, status: InvoiceStatus) -> LedgerResult<()> {
        let changed = self.conn.execute(
            "UPDATE invoice SET status = ?1 WHERE invoice_id = ?2",
            params![status.as_str(), invoice_id],
        )?;
        expect_row(changed, "invoice", invoice_id)
    }

    pub fn delete_invoice(&self, invoice_id: &str) -> LedgerResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM invoice WHERE invoice_id = ?1",
            params![invoice_id],
        )?;
        expect_row(changed, "invoice", invoice_id)
    }

    pub fn reconciled_payment_count(&self) -> LedgerResult<i64> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM reconciled_payment", [], |row| row.get(0))?;
        Ok(n)
    }

    /// Whether the payment is already credited to some invoice.
    pub fn is_payment_reconciled(&self, kind: PaymentKind, payment_id: &str) -> LedgerResult<bool> {
        let found: i64 = self.conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM reconciled_payment
                            WHERE payment_kind = ?1 AND payment_id = ?2)",
            params![kind.as_str(), payment_id],
            |row| row.get(0),
        )?;
        Ok(found != 0)
    }

    // ── Reconciliation input ──────────────────────────────────────

    /// Confirmed payments not yet credited to any invoice.
    ///
    /// Cleared cheques first, then verified cash, then (optionally)
    /// successful online payments, each in insertion order.
    pub fn unreconciled_payments(&self, include_online: bool) -> LedgerResult<Vec<ConfirmedPayment>> {
        let mut out = Vec::new();

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CHEQUE_COLUMNS} FROM cheque
             WHERE status = 'Cleared'
               AND NOT EXISTS (SELECT 1 FROM reconciled_payment r
                               WHERE r.payment_kind = 'Cheque' AND r.payment_id = cheque_id)
             ORDER BY rowid ASC"
        ))?;
        let cheques = stmt
            .query_map([], Self::map_cheque_row)?
            .collect::<Result<Vec<_>, _>>()?;
        out.extend(cheques.iter().filter_map(ConfirmedPayment::from_cheque));

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CASH_COLUMNS} FROM cash_receipt
             WHERE verified = 1
               AND NOT EXISTS (SELECT 1 FROM reconciled_payment r
                               WHERE r.payment_kind = 'Cash' AND r.payment_id = cash_id)
             ORDER BY rowid ASC"
        ))?;
        let cash = stmt
            .query_map([], Self::map_cash_row)?
            .collect::<Result<Vec<_>, _>>()?;
        out.extend(cash.iter().filter_map(ConfirmedPayment::from_cash));

        if include_online {
            let mut stmt = self.conn.prepare(&format!(
                "SELECT {ONLINE_COLUMNS} FROM online_payment
                 WHERE status = 'Success'
                   AND NOT EXISTS (SELECT 1 FROM reconciled_payment r
                                   WHERE r.payment_kind = 'Online' AND r.payment_id = online_id)
                 ORDER BY rowid ASC"
            ))?;
            let online = stmt
                .query_map([], Self::map_online_row)?
                .collect::<Result<Vec<_>, _>>()?;
            out.extend(online.iter().filter_map(ConfirmedPayment::from_online));
        }

        Ok(out)
    }

    // ── Helpers ───────────────────────────────────────────────────

    fn query_invoices(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> LedgerResult<Vec<Invoice>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut invoices = stmt
            .query_map(params, Self::map_invoice_row)?
            .collect::<Result<Vec<_>, _>>()?;
        for inv in &mut invoices {
            inv.reconciled_payments = self.reconciled_payments_for(&inv.invoice_id)?;
        }
        Ok(invoices)
    }

    fn reconciled_payments_for(&self, invoice_id: &str) -> LedgerResult<Vec<ReconciledPayment>> {
        let mut stmt = self.conn.prepare(
            "SELECT payment_id, payment_kind, amount, date
             FROM reconciled_payment WHERE invoice_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![invoice_id], |row| {
                Ok(ReconciledPayment {
                    payment_id: row.get(0)?,
                    kind: parse_label(1, row.get(1)?, PaymentKind::from_label)?,
                    amount: row.get(2)?,
                    date: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn insert_reconciled_rows(&self, inv: &Invoice) -> LedgerResult<()> {
        for p in &inv.reconciled_payments {
            self.conn.execute(
                "INSERT INTO reconciled_payment (invoice_id, payment_id, payment_kind, amount, date)
                 SELECT ?1, ?2, ?3, ?4, ?5
                 WHERE NOT EXISTS (SELECT 1 FROM reconciled_payment
                                   WHERE invoice_id = ?1 AND payment_kind = ?3 AND payment_id = ?2)",
                params![inv.invoice_id, p.payment_id, p.kind.as_str(), p.amount, p.date],
            )?;
        }
        Ok(())
    }

    fn map_invoice_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Invoice> {
        let items_json: String = row.get(8)?;
        Ok(Invoice {
            invoice_id: row.get(0)?,
            client_id: row.get(1)?,
            client_name: row.get(2)?,
            invoice_number: row.get(3)?,
            amount: row.get(4)?,
            issue_date: row.get(5)?,
            due_date: row.get(6)?,
            description: row.get(7)?,
            items: parse_json(8, &items_json)?,
            paid_amount: row.get(9)?,
            status: parse_label(10, row.get(10)?, InvoiceStatus::from_label)?,
            reconciled_payments: Vec::new(),
        })
    }
}

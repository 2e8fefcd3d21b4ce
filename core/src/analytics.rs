//! Dashboard figures over cheque and cash records.
//!
//! Pure functions over slices; `LedgerDesk` feeds them from the store.
//! Cheques are bucketed by issue date, cash by transaction date.

use crate::{
    clock::add_days_clamped,
    instrument::{Cash, Cheque, ChequeStatus},
    types::Money,
};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_UPCOMING_DAYS: i64 = 30;
pub const DEFAULT_UPCOMING_LIMIT: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_outstanding: Money,
    pub pending_cheques: usize,
    pub cleared_total: Money,
    /// Percentage of decided cheques that bounced, 2 decimals.
    pub bounce_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub year: i32,
    pub month: u32,
    pub total_cheques: usize,
    pub total_cash: usize,
    pub total_cheque_amount: Money,
    pub total_cash_amount: Money,
    pub cleared_cheques: usize,
    pub bounced_cheques: usize,
    pub bounce_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendBucket {
    pub cheques: usize,
    pub cash: usize,
    pub cheque_amount: Money,
    pub cash_amount: Money,
}

pub fn dashboard(cheques: &[Cheque], cash: &[Cash]) -> DashboardStats {
    let mut stats = DashboardStats::default();
    let mut cleared = 0usize;
    let mut bounced = 0usize;

    for c in cheques {
        match c.status {
            ChequeStatus::Pending | ChequeStatus::PostDated => {
                stats.total_outstanding += c.amount;
                stats.pending_cheques += 1;
            }
            ChequeStatus::Cleared => {
                stats.cleared_total += c.amount;
                cleared += 1;
            }
            ChequeStatus::Bounced => bounced += 1,
        }
    }
    stats.cleared_total += cash.iter().filter(|c| c.verified).map(|c| c.amount).sum::<Money>();
    stats.bounce_rate = percentage(bounced, cleared + bounced);
    stats
}

/// Outstanding cheques due in `[from, from + days]`, soonest first.
pub fn upcoming_cheques(cheques: &[Cheque], from: NaiveDate, days: i64, limit: usize) -> Vec<Cheque> {
    let until = add_days_clamped(from, days);
    let mut due: Vec<Cheque> = cheques
        .iter()
        .filter(|c| c.status.is_outstanding() && c.due_date >= from && c.due_date <= until)
        .cloned()
        .collect();
    due.sort_by_key(|c| c.due_date);
    due.truncate(limit);
    due
}

pub fn monthly_summary(cheques: &[Cheque], cash: &[Cash], year: i32, month: u32) -> MonthlySummary {
    let in_month = |d: NaiveDate| d.year() == year && d.month() == month;

    let month_cheques: Vec<&Cheque> = cheques.iter().filter(|c| in_month(c.issue_date)).collect();
    let month_cash: Vec<&Cash> = cash.iter().filter(|c| in_month(c.date)).collect();
    let bounced = month_cheques
        .iter()
        .filter(|c| c.status == ChequeStatus::Bounced)
        .count();

    MonthlySummary {
        year,
        month,
        total_cheques: month_cheques.len(),
        total_cash: month_cash.len(),
        total_cheque_amount: month_cheques.iter().map(|c| c.amount).sum(),
        total_cash_amount: month_cash.iter().map(|c| c.amount).sum(),
        cleared_cheques: month_cheques
            .iter()
            .filter(|c| c.status == ChequeStatus::Cleared)
            .count(),
        bounced_cheques: bounced,
        bounce_rate: percentage(bounced, month_cheques.len()),
    }
}

/// Longest trend window served, in months.
pub const MAX_TREND_MONTHS: u32 = 120;

/// Per-month activity for the `months` calendar months ending with `as_of`'s
/// month, keyed `YYYY-MM`. Every month in the window has a bucket. Windows
/// longer than `MAX_TREND_MONTHS` are cut to that length.
pub fn payment_trends(
    cheques: &[Cheque],
    cash: &[Cash],
    as_of: NaiveDate,
    months: u32,
) -> BTreeMap<String, TrendBucket> {
    let mut buckets = BTreeMap::new();
    if months == 0 {
        return buckets;
    }

    let end = month_index(as_of);
    let start = end - (months.min(MAX_TREND_MONTHS) as i32 - 1);
    for idx in start..=end {
        buckets.insert(month_key(idx), TrendBucket::default());
    }

    let in_window = |d: NaiveDate| d <= as_of && (start..=end).contains(&month_index(d));

    for c in cheques.iter().filter(|c| in_window(c.issue_date)) {
        if let Some(b) = buckets.get_mut(&month_key(month_index(c.issue_date))) {
            b.cheques += 1;
            b.cheque_amount += c.amount;
        }
    }
    for c in cash.iter().filter(|c| in_window(c.date)) {
        if let Some(b) = buckets.get_mut(&month_key(month_index(c.date))) {
            b.cash += 1;
            b.cash_amount += c.amount;
        }
    }
    buckets
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 100.0 * 100.0).round() / 100.0
}

fn month_index(d: NaiveDate) -> i32 {
    d.year() * 12 + d.month0() as i32
}

fn month_key(idx: i32) -> String {
    format!("{:04}-{:02}", idx.div_euclid(12), idx.rem_euclid(12) + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_rounds_to_two_places() {
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(2, 3), 66.67);
        assert_eq!(percentage(0, 0), 0.0);
    }

    #[test]
    fn huge_windows_do_not_overflow() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(upcoming_cheques(&[], d, i64::MAX / 1000, 10).is_empty());
        assert!(upcoming_cheques(&[], d, i64::MIN, 10).is_empty());

        let trends = payment_trends(&[], &[], d, u32::MAX);
        assert_eq!(trends.len(), MAX_TREND_MONTHS as usize);
        assert!(trends.contains_key("2024-01"));
        assert!(trends.contains_key("2014-02"));
    }

    #[test]
    fn month_keys_wrap_years() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(month_key(month_index(d)), "2024-01");
        assert_eq!(month_key(month_index(d) - 1), "2023-12");
    }
}

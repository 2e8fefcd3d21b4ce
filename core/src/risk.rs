//! Client credit-risk scoring.
//!
//! Pure functions over a client's cheque history. No I/O; persisting the
//! result is the caller's job (see `engine::LedgerDesk::recompute_client_risk`
//! and the daily `RiskSweepJob`).
//!
//! Score (0–100, higher = riskier):
//!   bounce_rate                        × 0.40
//!   min(avg_delay_days × 2, 100)       × 0.30
//!   min(outstanding / limit × 100, 100) × 0.20
//!   (100 − volume_confidence)          × 0.10
//! where volume_confidence saturates at 10 cheques.

use crate::{
    client::{outstanding_amount, Client},
    config::RiskConfig,
    instrument::{Cheque, ChequeStatus},
    types::{ClientId, Money},
};
use serde::{Deserialize, Serialize};

/// Lowest score in the High tier.
pub const HIGH_RISK_FLOOR: u8 = 61;
/// Lowest score in the Medium tier.
pub const MEDIUM_RISK_FLOOR: u8 = 31;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Tier boundaries are inclusive on the lower bound.
    pub fn from_score(score: u8) -> Self {
        if score >= HIGH_RISK_FLOOR {
            Self::High
        } else if score >= MEDIUM_RISK_FLOOR {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Low" => Some(Self::Low),
            "Medium" => Some(Self::Medium),
            "High" => Some(Self::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    pub bounce_count: u32,
    pub total_payments: u32,
    /// Mean clearance delay in whole days.
    pub avg_payment_delay: u32,
}

impl RiskAssessment {
    pub const CLEAN: Self = Self {
        risk_score: 0,
        risk_level: RiskLevel::Low,
        bounce_count: 0,
        total_payments: 0,
        avg_payment_delay: 0,
    };
}

/// Score a client against its full cheque history (any status).
pub fn compute_risk(client: &Client, history: &[Cheque], cfg: &RiskConfig) -> RiskAssessment {
    score_history(client.outstanding_amount(), client.credit_limit, history, cfg)
}

/// One client's result from a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSweepResult {
    pub client_id: ClientId,
    pub outstanding_amount: Money,
    pub assessment: RiskAssessment,
}

/// Recompute every client in an injected snapshot.
///
/// Outstanding amounts are re-derived from each history before scoring,
/// so a stale snapshot value never leaks into the ratio term.
pub fn sweep_risk(snapshot: &[(Client, Vec<Cheque>)], cfg: &RiskConfig) -> Vec<RiskSweepResult> {
    snapshot
        .iter()
        .map(|(client, history)| {
            let outstanding = outstanding_amount(history);
            RiskSweepResult {
                client_id: client.client_id.clone(),
                outstanding_amount: outstanding,
                assessment: score_history(outstanding, client.credit_limit, history, cfg),
            }
        })
        .collect()
}

fn score_history(
    outstanding: Money,
    credit_limit: Money,
    history: &[Cheque],
    cfg: &RiskConfig,
) -> RiskAssessment {
    let total = history.len();
    if total == 0 {
        return RiskAssessment::CLEAN;
    }

    let bounced = history
        .iter()
        .filter(|c| c.status == ChequeStatus::Bounced)
        .count();
    let bounce_rate = bounced as f64 / total as f64 * 100.0;

    let delays: Vec<f64> = history
        .iter()
        .filter_map(|c| {
            c.clearance_date
                .map(|cleared| (cleared - c.due_date).num_days().max(0) as f64)
        })
        .collect();
    let avg_delay = if delays.is_empty() {
        0.0
    } else {
        delays.iter().sum::<f64>() / delays.len() as f64
    };

    let outstanding_ratio = if credit_limit > 0.0 {
        outstanding / credit_limit * 100.0
    } else {
        0.0
    };

    let volume_confidence = (total as f64 / cfg.volume_saturation as f64 * 100.0).min(100.0);

    let raw = bounce_rate * cfg.bounce_weight
        + (avg_delay * cfg.delay_multiplier).min(100.0) * cfg.delay_weight
        + outstanding_ratio.min(100.0) * cfg.outstanding_weight
        + (100.0 - volume_confidence) * cfg.volume_weight;

    // Each weighted term is already in [0,100] and the weights sum to 1.
    let risk_score = raw.round() as u8;

    RiskAssessment {
        risk_score,
        risk_level: RiskLevel::from_score(risk_score),
        bounce_count: bounced as u32,
        total_payments: total as u32,
        avg_payment_delay: avg_delay.round() as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::NewClient;
    use crate::instrument::NewCheque;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn client(limit: Money, outstanding: Money) -> Client {
        let mut c = Client::register(NewClient {
            name: "Asha Traders".into(),
            email: "asha@example.com".into(),
            phone: "9000000000".into(),
            credit_limit: Some(limit),
            ..Default::default()
        })
        .unwrap();
        c.outstanding_amount = outstanding;
        c
    }

    fn cheque(status: ChequeStatus, delay_days: Option<i64>) -> Cheque {
        let due = date(2024, 1, 10);
        let mut c = Cheque::new(NewCheque {
            client_id: None,
            client_name: "Asha Traders".into(),
            cheque_number: "000001".into(),
            bank_name: "SBI".into(),
            amount: 1_000.0,
            issue_date: date(2024, 1, 1),
            due_date: due,
            status: Some(status),
            image_ref: None,
            ocr: None,
            notes: None,
        })
        .unwrap();
        c.clearance_date = delay_days.map(|d| due + chrono::Duration::days(d));
        c
    }

    #[test]
    fn worked_example_scores_fifteen() {
        // 10 cheques, 2 bounced, mean delay 5 days, 20% of limit outstanding.
        let mut history = vec![
            cheque(ChequeStatus::Bounced, None),
            cheque(ChequeStatus::Bounced, None),
        ];
        for d in [0, 10, 5, 5, 2, 8, 4, 6] {
            history.push(cheque(ChequeStatus::Cleared, Some(d)));
        }
        let c = client(100_000.0, 20_000.0);

        let a = compute_risk(&c, &history, &RiskConfig::default());
        assert_eq!(a.risk_score, 15);
        assert_eq!(a.risk_level, RiskLevel::Low);
        assert_eq!(a.bounce_count, 2);
        assert_eq!(a.total_payments, 10);
        assert_eq!(a.avg_payment_delay, 5);
    }

    #[test]
    fn early_clearance_counts_as_zero_delay() {
        let history = vec![cheque(ChequeStatus::Cleared, Some(-4))];
        let a = compute_risk(&client(100_000.0, 0.0), &history, &RiskConfig::default());
        assert_eq!(a.avg_payment_delay, 0);
        // Only the thin-history term contributes: (100 - 10) * 0.10 = 9.
        assert_eq!(a.risk_score, 9);
    }

    #[test]
    fn zero_credit_limit_ignores_outstanding() {
        let history = vec![cheque(ChequeStatus::Pending, None); 10];
        let a = compute_risk(&client(0.0, 50_000.0), &history, &RiskConfig::default());
        assert_eq!(a.risk_score, 0);
    }

    #[test]
    fn tier_boundaries_are_inclusive() {
        assert_eq!(RiskLevel::from_score(30), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(31), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(60), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(61), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(100), RiskLevel::High);
    }
}

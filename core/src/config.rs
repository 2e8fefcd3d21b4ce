use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

// ── Risk scoring ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub bounce_weight: f64,
    pub delay_weight: f64,
    pub outstanding_weight: f64,
    pub volume_weight: f64,
    /// Each day of mean clearance delay adds this many points to the delay term.
    pub delay_multiplier: f64,
    /// Cheque count at which the thin-history term reaches zero.
    pub volume_saturation: u32,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            bounce_weight: 0.40,
            delay_weight: 0.30,
            outstanding_weight: 0.20,
            volume_weight: 0.10,
            delay_multiplier: 2.0,
            volume_saturation: 10,
        }
    }
}

impl RiskConfig {
    pub fn validate(&self) -> LedgerResult<()> {
        let weights = [
            self.bounce_weight,
            self.delay_weight,
            self.outstanding_weight,
            self.volume_weight,
        ];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(LedgerError::InvalidConfig(
                "risk weights must be non-negative".into(),
            ));
        }
        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > 1e-9 {
            return Err(LedgerError::InvalidConfig(format!(
                "risk weights must sum to 1.0 (got {sum})"
            )));
        }
        if self.volume_saturation == 0 {
            return Err(LedgerError::InvalidConfig(
                "risk.volume_saturation must be > 0".into(),
            ));
        }
        if !self.delay_multiplier.is_finite() || self.delay_multiplier < 0.0 {
            return Err(LedgerError::InvalidConfig(
                "risk.delay_multiplier must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

// ── Reconciliation ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Accept the first invoice that clears the threshold.
    FirstFit,
    /// Accept the highest-scoring invoice that clears the threshold; ties go to the earlier one.
    BestFit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    pub client_id_points: u32,
    pub amount_points: u32,
    pub date_points: u32,
    pub name_points: u32,
    /// Relative amount tolerance against the invoice's remaining amount.
    pub amount_tolerance: f64,
    pub date_window_days: i64,
    pub match_threshold: u32,
    pub strategy: MatchStrategy,
    /// Feed successful online payments to the matcher as well.
    pub include_online: bool,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            client_id_points: 40,
            amount_points: 35,
            date_points: 15,
            name_points: 10,
            amount_tolerance: 0.02,
            date_window_days: 7,
            match_threshold: 50,
            strategy: MatchStrategy::FirstFit,
            include_online: false,
        }
    }
}

impl ReconciliationConfig {
    pub fn validate(&self) -> LedgerResult<()> {
        if !self.amount_tolerance.is_finite() || self.amount_tolerance < 0.0 {
            return Err(LedgerError::InvalidConfig(
                "reconciliation.amount_tolerance must be non-negative".into(),
            ));
        }
        if self.date_window_days < 0 {
            return Err(LedgerError::InvalidConfig(
                "reconciliation.date_window_days must be non-negative".into(),
            ));
        }
        let max = self.client_id_points + self.amount_points + self.date_points + self.name_points;
        if self.match_threshold == 0 || self.match_threshold > max {
            return Err(LedgerError::InvalidConfig(format!(
                "reconciliation.match_threshold must be in 1..={max}"
            )));
        }
        Ok(())
    }
}

// ── Scheduled jobs and collaborators ───────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    pub enabled: bool,
    /// Remind for cheques due within this many days (inclusive).
    pub lead_days: i64,
}

/// Upper bound on the reminder window: one year.
pub const MAX_LEAD_DAYS: i64 = 366;

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lead_days: 7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub notify_on_bounce: bool,
    pub sender: String,
    /// Penalty quoted in bounce notices.
    pub bounce_penalty: f64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            notify_on_bounce: true,
            sender: "payments@ledgerdesk.local".into(),
            bounce_penalty: 500.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Minor units per major unit (paise per rupee).
    pub minor_units: u32,
    /// Reject webhook signatures older than this.
    pub signature_tolerance_secs: i64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            minor_units: 100,
            signature_tolerance_secs: 300,
        }
    }
}

// ── Top level ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub risk: RiskConfig,
    pub reconciliation: ReconciliationConfig,
    pub reminders: ReminderConfig,
    pub notifications: NotificationConfig,
    pub gateway: GatewayConfig,
}

impl LedgerConfig {
    /// Load from `<data_dir>/ledger.json`. Missing sections fall back to defaults.
    /// In tests, use `LedgerConfig::default()`.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/ledger.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config = Self::from_json(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config in {path}: {e}"))?;
        log::debug!("loaded config from {path}");
        Ok(config)
    }

    pub fn from_json(content: &str) -> LedgerResult<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> LedgerResult<()> {
        self.risk.validate()?;
        self.reconciliation.validate()?;
        if !(0..=MAX_LEAD_DAYS).contains(&self.reminders.lead_days) {
            return Err(LedgerError::InvalidConfig(format!(
                "reminders.lead_days must be between 0 and {MAX_LEAD_DAYS}"
            )));
        }
        if self.gateway.minor_units == 0 {
            return Err(LedgerError::InvalidConfig(
                "gateway.minor_units must be > 0".into(),
            ));
        }
        Ok(())
    }
}

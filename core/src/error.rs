use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid amount for {field}: {value} (must be a positive, finite number)")]
    InvalidAmount { field: &'static str, value: f64 },

    #[error("{record} is missing required field '{field}'")]
    MissingField {
        record: &'static str,
        field: &'static str,
    },

    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} '{id}' cannot move from {from} to {to}")]
    InvalidTransition {
        kind: &'static str,
        id: String,
        from: String,
        to: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Webhook signature rejected: {0}")]
    Signature(String),

    #[error("Notification failed: {0}")]
    Notification(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Reject amounts that are zero, negative, NaN or infinite.
pub fn ensure_positive(field: &'static str, value: f64) -> LedgerResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(LedgerError::InvalidAmount { field, value })
    }
}

/// Reject blank required text fields.
pub fn ensure_present(record: &'static str, field: &'static str, value: &str) -> LedgerResult<()> {
    if value.trim().is_empty() {
        Err(LedgerError::MissingField { record, field })
    } else {
        Ok(())
    }
}

//! Business clock. Owns the current business date for batch runs.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BusinessClock {
    pub today: NaiveDate,
    pub days_run: u64,
}

impl BusinessClock {
    pub fn new(start: NaiveDate) -> Self {
        Self {
            today: start,
            days_run: 0,
        }
    }

    /// Move to the next calendar day. Returns the new date.
    pub fn advance(&mut self) -> NaiveDate {
        self.today += Duration::days(1);
        self.days_run += 1;
        self.today
    }
}

/// `date + days`, clamped to the representable date range.
pub fn add_days_clamped(date: NaiveDate, days: i64) -> NaiveDate {
    Duration::try_days(days)
        .and_then(|delta| date.checked_add_signed(delta))
        .unwrap_or(if days < 0 { NaiveDate::MIN } else { NaiveDate::MAX })
}

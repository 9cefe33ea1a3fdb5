//! Period identifiers.
//!
//! A period is a fixed-width `YYYY-MM` string, so lexicographic order equals
//! chronological order.

use crate::errors::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

static PERIOD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)] // literal pattern, checked by tests
    Regex::new(r"^[0-9]{4}-(0[1-9]|1[0-2])$").unwrap()
});

/// Returns the current local month as `YYYY-MM`.
#[must_use]
pub fn current_period() -> String {
    chrono::Local::now().format("%Y-%m").to_string()
}

/// Whether `period` is a well-formed `YYYY-MM` string with month 01-12.
#[must_use]
pub fn is_valid_period(period: &str) -> bool {
    PERIOD_PATTERN.is_match(period)
}

/// Fails with [`Error::InvalidPeriod`] unless `period` is well-formed.
pub fn ensure_valid_period(period: &str) -> Result<()> {
    if is_valid_period(period) {
        Ok(())
    } else {
        Err(Error::InvalidPeriod {
            period: period.to_string(),
        })
    }
}

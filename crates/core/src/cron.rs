//! Five-field crontab expressions evaluated in a timezone.
//!
//! Parsing and matching are delegated to `croner`. Fire times are computed
//! from the zone's wall clock, so a `9:59` schedule stays at `9:59` local
//! time across daylight saving changes.

use std::fmt;

use chrono::{DateTime, TimeZone};
use croner::Cron;

use crate::error::ConfigError;

/// A validated five-field crontab expression.
///
/// Day-of-week follows crontab: `0` and `7` are Sunday, `1` is Monday.
/// When both day-of-month and day-of-week are restricted, both must match.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    expression: String,
    cron: Cron,
}

impl CronSchedule {
    /// Parses and validates a crontab expression.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidCron`] if `croner` rejects the expression.
    pub fn parse(expression: &str) -> Result<Self, ConfigError> {
        let expression = expression.trim();
        let cron = Cron::new(expression)
            .with_dom_and_dow()
            .parse()
            .map_err(|e| ConfigError::invalid_cron(expression, e.to_string()))?;

        Ok(Self {
            expression: expression.to_string(),
            cron,
        })
    }

    /// The expression as written in settings.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.expression
    }

    /// First fire time strictly after `after`, in the same zone.
    ///
    /// Returns `None` if no future time matches.
    pub fn next_after<Z: TimeZone>(&self, after: &DateTime<Z>) -> Option<DateTime<Z>> {
        self.cron.find_next_occurrence(after, false).ok()
    }
}

impl fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

impl std::str::FromStr for CronSchedule {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

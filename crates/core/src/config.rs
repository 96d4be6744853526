//! Bot settings and service credentials.

use std::time::Duration;

use chrono_tz::Tz;
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::cron::CronSchedule;
use crate::error::ConfigError;

/// Bot settings loaded once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_bot_name")]
    pub bot_name: String,
    #[serde(default = "default_true")]
    pub paper_trading: bool,
    /// Seconds to wait after an order before refreshing the account.
    #[serde(default = "default_post_trade_delay")]
    pub post_trade_delay: u64,
    pub ticker: String,
    #[serde(alias = "call_option_margin")]
    pub otm_margin_call: Decimal,
    #[serde(alias = "put_option_margin")]
    pub otm_margin_put: Decimal,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(alias = "trade_options_schedule")]
    pub trade_schedule: String,
    #[serde(alias = "check_value_schedule")]
    pub check_schedule: String,
    /// Seconds to wait for an order to fill before reporting it as open.
    #[serde(default = "default_fill_timeout")]
    pub fill_timeout: u64,
    /// Seconds between order status polls.
    #[serde(default = "default_fill_poll_interval")]
    pub fill_poll_interval: u64,
    #[serde(default = "default_true")]
    pub notify_on_trade: bool,
    #[serde(default)]
    pub notify_on_check: bool,
}

fn default_bot_name() -> String {
    "options-bot".to_string()
}

fn default_true() -> bool {
    true
}

fn default_post_trade_delay() -> u64 {
    60
}

fn default_timezone() -> String {
    "America/New_York".to_string()
}

fn default_fill_timeout() -> u64 {
    60
}

fn default_fill_poll_interval() -> u64 {
    2
}

impl Settings {
    /// Checks every field that serde cannot express.
    ///
    /// # Errors
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ticker.trim().is_empty() {
            return Err(ConfigError::invalid_value("ticker", "must not be empty"));
        }

        check_margin("otm_margin_call", self.otm_margin_call)?;
        check_margin("otm_margin_put", self.otm_margin_put)?;

        self.tz()?;
        self.trade_cron()?;
        self.check_cron()?;

        if self.fill_timeout == 0 {
            return Err(ConfigError::invalid_value("fill_timeout", "must be positive"));
        }
        if self.fill_poll_interval == 0 {
            return Err(ConfigError::invalid_value(
                "fill_poll_interval",
                "must be positive",
            ));
        }

        Ok(())
    }

    /// Canonical ticker form: trimmed and uppercase.
    pub fn normalize(&mut self) {
        self.ticker = self.ticker.trim().to_uppercase();
        self.timezone = self.timezone.trim().to_string();
    }

    /// Parsed timezone.
    ///
    /// # Errors
    /// Returns [`ConfigError::UnknownTimezone`] if the name is not an IANA zone.
    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::UnknownTimezone(self.timezone.clone()))
    }

    /// Parsed trade schedule.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidCron`] if the expression is malformed.
    pub fn trade_cron(&self) -> Result<CronSchedule, ConfigError> {
        CronSchedule::parse(&self.trade_schedule)
    }

    /// Parsed check schedule.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidCron`] if the expression is malformed.
    pub fn check_cron(&self) -> Result<CronSchedule, ConfigError> {
        CronSchedule::parse(&self.check_schedule)
    }

    #[must_use]
    pub fn post_trade_delay(&self) -> Duration {
        Duration::from_secs(self.post_trade_delay)
    }

    #[must_use]
    pub fn fill_timeout(&self) -> Duration {
        Duration::from_secs(self.fill_timeout)
    }

    #[must_use]
    pub fn fill_poll_interval(&self) -> Duration {
        Duration::from_secs(self.fill_poll_interval)
    }
}

fn check_margin(field: &'static str, value: Decimal) -> Result<(), ConfigError> {
    if value <= Decimal::ZERO || value >= Decimal::ONE {
        return Err(ConfigError::MarginOutOfRange { field, value });
    }
    Ok(())
}

/// Looks up a required, non-empty variable through `lookup`.
fn required(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).filter(|v| !v.trim().is_empty())
}

/// Alpaca API credentials.
#[derive(Clone)]
pub struct AlpacaEnv {
    pub api_key: String,
    pub api_secret: SecretString,
}

impl std::fmt::Debug for AlpacaEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlpacaEnv")
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

impl AlpacaEnv {
    pub const API_KEY_VAR: &'static str = "ALPACA_API_KEY";
    pub const API_SECRET_VAR: &'static str = "ALPACA_API_SECRET";

    /// Reads credentials from the process environment.
    ///
    /// # Errors
    /// Returns [`ConfigError::MissingEnv`] if either variable is absent or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads credentials through an arbitrary variable lookup.
    ///
    /// # Errors
    /// Returns [`ConfigError::MissingEnv`] if either variable is absent or empty.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        match (
            required(&lookup, Self::API_KEY_VAR),
            required(&lookup, Self::API_SECRET_VAR),
        ) {
            (Some(api_key), Some(api_secret)) => Ok(Self {
                api_key,
                api_secret: SecretString::from(api_secret),
            }),
            _ => Err(ConfigError::MissingEnv(format!(
                "{} and {} must be set",
                Self::API_KEY_VAR,
                Self::API_SECRET_VAR
            ))),
        }
    }
}

/// Telegram bot credentials and destination chat.
#[derive(Clone)]
pub struct TelegramEnv {
    pub bot_token: SecretString,
    pub chat_id: String,
}

impl std::fmt::Debug for TelegramEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramEnv")
            .field("bot_token", &"[REDACTED]")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

impl TelegramEnv {
    pub const BOT_TOKEN_VAR: &'static str = "TELEGRAM_BOT_TOKEN";
    pub const CHAT_ID_VAR: &'static str = "TELEGRAM_CHAT_ID";

    /// Reads credentials from the process environment.
    ///
    /// # Errors
    /// Returns [`ConfigError::MissingEnv`] if either variable is absent or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads credentials through an arbitrary variable lookup.
    ///
    /// # Errors
    /// Returns [`ConfigError::MissingEnv`] if either variable is absent or empty.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        match (
            required(&lookup, Self::BOT_TOKEN_VAR),
            required(&lookup, Self::CHAT_ID_VAR),
        ) {
            (Some(bot_token), Some(chat_id)) => Ok(Self {
                bot_token: SecretString::from(bot_token),
                chat_id,
            }),
            _ => Err(ConfigError::MissingEnv(format!(
                "{} and {} must be set",
                Self::BOT_TOKEN_VAR,
                Self::CHAT_ID_VAR
            ))),
        }
    }
}

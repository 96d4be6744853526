//! Types for covered option trading.

use std::fmt;
use std::time::Duration;

use chrono::NaiveDate;
use chrono_tz::Tz;
use options_bot_core::{ConfigError, OptionContract, OptionType, Order, OrderStatus, Settings};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Trader configuration derived from [`Settings`].
#[derive(Debug, Clone)]
pub struct TraderConfig {
    /// Underlying equity the bot writes options on.
    pub ticker: String,
    /// Fractional distance above the price for call strikes.
    pub otm_margin_call: Decimal,
    /// Fractional distance below the price for put strikes.
    pub otm_margin_put: Decimal,
    /// Timezone used to decide "today" for expiration.
    pub timezone: Tz,
    pub fill_timeout: Duration,
    pub fill_poll_interval: Duration,
    /// Pause after an order before the account is re-read.
    pub post_trade_delay: Duration,
    /// How long a fetched account snapshot is reused.
    pub account_ttl: Duration,
}

impl TraderConfig {
    /// Account snapshots are reused for at most this long.
    pub const DEFAULT_ACCOUNT_TTL: Duration = Duration::from_secs(30);

    /// Builds the trader configuration from validated settings.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the timezone does not parse.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        Ok(Self {
            ticker: settings.ticker.clone(),
            otm_margin_call: settings.otm_margin_call,
            otm_margin_put: settings.otm_margin_put,
            timezone: settings.tz()?,
            fill_timeout: settings.fill_timeout(),
            fill_poll_interval: settings.fill_poll_interval(),
            post_trade_delay: settings.post_trade_delay(),
            account_ttl: Self::DEFAULT_ACCOUNT_TTL,
        })
    }
}

/// A submitted sell order and the contract it sells.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub contract: OptionContract,
    pub order: Order,
    pub quantity: u32,
}

/// Outcome of a trade run that placed an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeResult {
    pub option_type: OptionType,
    /// OCC contract symbol.
    pub symbol: String,
    pub quantity: u32,
    pub strike: Decimal,
    pub expiration: NaiveDate,
    /// Average fill price, if any quantity filled before the timeout.
    pub fill_price: Option<Decimal>,
    pub status: OrderStatus,
}

impl fmt::Display for TradeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sold {} {} {} (strike {}, exp {})",
            self.quantity, self.option_type, self.symbol, self.strike, self.expiration
        )?;
        match self.fill_price {
            Some(price) => write!(f, " @ {price} [{}]", self.status),
            None => write!(f, " [{}]", self.status),
        }
    }
}

/// One line of the positions report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub qty: Decimal,
    pub price: Option<Decimal>,
}

/// Positions report: the cash balance first, then broker positions in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Positions(Vec<Holding>);

impl Positions {
    pub fn new(holdings: Vec<Holding>) -> Self {
        Self(holdings)
    }

    pub fn get(&self, symbol: &str) -> Option<&Holding> {
        self.0.iter().find(|h| h.symbol == symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Holding> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Positions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, h) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match h.price {
                Some(price) => write!(f, "{} {} @ {}", h.symbol, h.qty, price)?,
                None => write!(f, "{} {} @ n/a", h.symbol, h.qty)?,
            }
        }
        Ok(())
    }
}

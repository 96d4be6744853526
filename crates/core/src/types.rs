//! Brokerage domain types shared by the client, the trader, and the scheduler.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Shares covered by one standard US equity option contract.
pub const CONTRACT_MULTIPLIER: u32 = 100;

/// Option contract type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    /// API string representation.
    #[must_use]
    pub fn as_api_str(self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Put => "put",
        }
    }
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_api_str())
    }
}

/// Asset class of a held position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    UsEquity,
    UsOption,
    Crypto,
    #[serde(other)]
    Other,
}

/// Point-in-time view of the trading account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// Settled cash.
    pub cash: Decimal,
    /// Total portfolio value. The broker may omit it.
    pub equity: Option<Decimal>,
    /// Account currency code, e.g. `USD`.
    pub currency: String,
}

/// A held position as reported by the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    /// Signed quantity; negative for short positions.
    pub qty: Decimal,
    pub current_price: Option<Decimal>,
    pub asset_class: AssetClass,
}

impl Position {
    /// Returns true if this is an option position on `underlying`.
    #[must_use]
    pub fn is_option_on(&self, underlying: &str) -> bool {
        self.asset_class == AssetClass::UsOption && self.symbol.starts_with(underlying)
    }
}

/// A listed option contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionContract {
    /// OCC symbol, e.g. `AAPL250926C00210000`.
    pub symbol: String,
    pub underlying: String,
    pub expiration: NaiveDate,
    pub option_type: OptionType,
    pub strike: Decimal,
}

/// Filter for an option contract search.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractQuery {
    pub underlying: String,
    pub expiration: NaiveDate,
    pub option_type: OptionType,
    /// Only contracts with a strike at or above this price.
    pub min_strike: Decimal,
    pub limit: u32,
}

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

/// Time in force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInForce {
    Day,
    Gtc,
}

/// A market order to submit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub qty: u32,
    pub side: OrderSide,
    pub time_in_force: TimeInForce,
}

impl OrderRequest {
    /// Market sell, good for the day.
    pub fn sell_day(symbol: impl Into<String>, qty: u32) -> Self {
        Self {
            symbol: symbol.into(),
            qty,
            side: OrderSide::Sell,
            time_in_force: TimeInForce::Day,
        }
    }
}

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    New,
    Accepted,
    PendingNew,
    PartiallyFilled,
    Filled,
    DoneForDay,
    Canceled,
    Expired,
    Replaced,
    PendingCancel,
    PendingReplace,
    Rejected,
    Suspended,
    Stopped,
    Calculated,
    Held,
    AcceptedForBidding,
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    /// Returns true once any quantity has executed.
    #[must_use]
    pub fn has_fills(self) -> bool {
        matches!(self, Self::Filled | Self::PartiallyFilled)
    }

    /// Returns true if the order can no longer fill.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Filled | Self::Canceled | Self::Expired | Self::Replaced | Self::Rejected
        )
    }

    /// Snake-case name as used by the broker.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Accepted => "accepted",
            Self::PendingNew => "pending_new",
            Self::PartiallyFilled => "partially_filled",
            Self::Filled => "filled",
            Self::DoneForDay => "done_for_day",
            Self::Canceled => "canceled",
            Self::Expired => "expired",
            Self::Replaced => "replaced",
            Self::PendingCancel => "pending_cancel",
            Self::PendingReplace => "pending_replace",
            Self::Rejected => "rejected",
            Self::Suspended => "suspended",
            Self::Stopped => "stopped",
            Self::Calculated => "calculated",
            Self::Held => "held",
            Self::AcceptedForBidding => "accepted_for_bidding",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An order as tracked by the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub symbol: String,
    pub qty: Decimal,
    pub filled_qty: Decimal,
    pub side: OrderSide,
    pub status: OrderStatus,
    pub filled_avg_price: Option<Decimal>,
    pub submitted_at: Option<DateTime<Utc>>,
}

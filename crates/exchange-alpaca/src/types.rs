//! Alpaca wire types and their conversions into core domain types.
//!
//! Alpaca encodes most numeric fields as JSON strings; `Decimal`
//! deserializes from both strings and numbers, so the raw structs use it
//! directly.

use chrono::{DateTime, NaiveDate, Utc};
use options_bot_core::{
    AccountSnapshot, AssetClass, OptionContract, OptionType, Order, OrderRequest, OrderSide,
    OrderStatus, Position, TimeInForce,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Account
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawAccount {
    pub cash: Decimal,
    pub equity: Option<Decimal>,
    pub currency: Option<String>,
}

impl From<RawAccount> for AccountSnapshot {
    fn from(raw: RawAccount) -> Self {
        Self {
            cash: raw.cash,
            equity: raw.equity,
            currency: raw.currency.unwrap_or_else(|| "USD".to_string()),
        }
    }
}

// =============================================================================
// Positions
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawPosition {
    pub symbol: String,
    pub qty: Decimal,
    pub current_price: Option<Decimal>,
    pub asset_class: AssetClass,
}

impl From<RawPosition> for Position {
    fn from(raw: RawPosition) -> Self {
        Self {
            symbol: raw.symbol,
            qty: raw.qty,
            current_price: raw.current_price,
            asset_class: raw.asset_class,
        }
    }
}

// =============================================================================
// Market Data
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawLatestTradeResponse {
    pub trade: Option<RawTrade>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawTrade {
    #[serde(rename = "p")]
    pub price: Decimal,
}

// =============================================================================
// Option Contracts
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawContractsResponse {
    pub option_contracts: Option<Vec<RawContract>>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawContract {
    pub symbol: String,
    pub underlying_symbol: String,
    pub expiration_date: NaiveDate,
    #[serde(rename = "type")]
    pub option_type: OptionType,
    pub strike_price: Decimal,
}

impl From<RawContract> for OptionContract {
    fn from(raw: RawContract) -> Self {
        Self {
            symbol: raw.symbol,
            underlying: raw.underlying_symbol,
            expiration: raw.expiration_date,
            option_type: raw.option_type,
            strike: raw.strike_price,
        }
    }
}

// =============================================================================
// Orders
// =============================================================================

/// Order body for `POST /v2/orders`. Quantity travels as a string.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct RawOrderRequest<'a> {
    pub symbol: &'a str,
    pub qty: String,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: &'static str,
    pub time_in_force: TimeInForce,
}

impl<'a> From<&'a OrderRequest> for RawOrderRequest<'a> {
    fn from(order: &'a OrderRequest) -> Self {
        Self {
            symbol: &order.symbol,
            qty: order.qty.to_string(),
            side: order.side,
            order_type: "market",
            time_in_force: order.time_in_force,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawOrder {
    pub id: String,
    pub symbol: String,
    pub qty: Option<Decimal>,
    pub filled_qty: Option<Decimal>,
    pub side: OrderSide,
    pub status: OrderStatus,
    pub filled_avg_price: Option<Decimal>,
    pub submitted_at: Option<DateTime<Utc>>,
}

impl From<RawOrder> for Order {
    fn from(raw: RawOrder) -> Self {
        Self {
            id: raw.id,
            symbol: raw.symbol,
            qty: raw.qty.unwrap_or_default(),
            filled_qty: raw.filled_qty.unwrap_or_default(),
            side: raw.side,
            status: raw.status,
            filled_avg_price: raw.filled_avg_price,
            submitted_at: raw.submitted_at,
        }
    }
}

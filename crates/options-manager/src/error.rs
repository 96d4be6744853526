//! Trade decision failures.

use chrono::NaiveDate;
use options_bot_core::OptionType;
use rust_decimal::Decimal;
use thiserror::Error;

/// Conditions that abort a single trade or report invocation.
///
/// Raised through `anyhow` so callers can downcast; brokerage transport
/// errors travel alongside them as plain context chains.
#[derive(Debug, Error)]
pub enum TradeError {
    #[error("ticker price is unavailable for {ticker}")]
    PriceUnavailable { ticker: String },

    #[error("portfolio value is unavailable")]
    EquityUnavailable,

    #[error("no {option_type} contracts found for {ticker} expiring {expiration} with strike >= {min_strike}")]
    NoContracts {
        ticker: String,
        option_type: OptionType,
        expiration: NaiveDate,
        min_strike: Decimal,
    },
}

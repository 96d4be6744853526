//! Covered option selling.
//!
//! Each trade run:
//! - Skips if an option on the ticker is already open
//! - Sells covered calls (one per 100 shares held) above the market by the call margin
//! - Otherwise sells cash-secured puts below the market by the put margin
//! - Targets the coming weekly Friday expiration
//! - Polls the order until it fills or the fill timeout elapses

pub mod account;
pub mod error;
pub mod expiration;
pub mod sizing;
pub mod trader;
pub mod types;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use error::TradeError;
pub use trader::OptionsTrader;
pub use types::{Holding, PlacedOrder, Positions, TradeResult, TraderConfig};

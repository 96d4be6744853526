//! Alpaca brokerage integration for the covered options bot.
//!
//! This crate provides:
//! - REST client with rate limiting for the Alpaca trading and market data APIs
//! - Key-header authentication with the secret held in a `SecretString`
//! - Wire types converted into `options-bot-core` domain types
//! - A [`Brokerage`](options_bot_core::Brokerage) implementation
//!
//! # Authentication
//!
//! Set the following environment variables:
//!
//! - `ALPACA_API_KEY`: Your API key ID
//! - `ALPACA_API_SECRET`: Your API secret key
//!
//! # API Endpoints
//!
//! - `GET /v2/account` - Account cash and equity
//! - `GET /v2/positions` - Open positions
//! - `GET /v2/stocks/{symbol}/trades/latest` - Latest trade (market data host)
//! - `GET /v2/options/contracts` - Option contract search
//! - `POST /v2/orders` - Submit order
//! - `GET /v2/orders/{order_id}` - Get order status

pub mod client;
pub mod error;
mod types;

pub use client::{
    AlpacaClient, AlpacaClientConfig, ALPACA_DATA_URL, ALPACA_LIVE_URL, ALPACA_PAPER_URL,
};
pub use error::{AlpacaError, Result};

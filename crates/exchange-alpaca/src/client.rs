//! Alpaca REST API client with rate limiting.
//!
//! Covers the trading API (account, positions, option contracts, orders)
//! and the market data API (latest stock trade). Requests are rate-limited
//! with the governor crate and authenticated with key headers.
//!
//! # Example
//!
//! ```ignore
//! use options_bot_alpaca::{AlpacaClient, AlpacaClientConfig};
//! use options_bot_core::AlpacaEnv;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = AlpacaClient::new(AlpacaClientConfig::paper(AlpacaEnv::from_env()?))?;
//!
//!     let account = client.get_account().await?;
//!     println!("Cash: {}", account.cash);
//!
//!     Ok(())
//! }
//! ```

use crate::error::{AlpacaError, Result};
use crate::types::{
    RawAccount, RawContractsResponse, RawLatestTradeResponse, RawOrder, RawOrderRequest,
    RawPosition,
};
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use options_bot_core::{
    AccountSnapshot, AlpacaEnv, Brokerage, ContractQuery, OptionContract, Order, OrderRequest,
    Position,
};
use reqwest::{Client, RequestBuilder};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::num::NonZeroU32;
use std::sync::Arc;

// =============================================================================
// Constants
// =============================================================================

/// Alpaca paper trading API base URL.
pub const ALPACA_PAPER_URL: &str = "https://paper-api.alpaca.markets";

/// Alpaca live trading API base URL.
pub const ALPACA_LIVE_URL: &str = "https://api.alpaca.markets";

/// Alpaca market data API base URL.
pub const ALPACA_DATA_URL: &str = "https://data.alpaca.markets";

const KEY_ID_HEADER: &str = "APCA-API-KEY-ID";
const SECRET_KEY_HEADER: &str = "APCA-API-SECRET-KEY";

/// Upper bound on contract pages fetched for one query.
const MAX_CONTRACT_PAGES: usize = 10;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the Alpaca client.
#[derive(Clone)]
pub struct AlpacaClientConfig {
    /// Trading API base URL.
    pub trading_url: String,

    /// Market data API base URL.
    pub data_url: String,

    /// API key ID.
    pub api_key: String,

    /// API secret key.
    pub api_secret: SecretString,

    /// Requests per minute limit.
    pub requests_per_minute: NonZeroU32,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for AlpacaClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlpacaClientConfig")
            .field("trading_url", &self.trading_url)
            .field("data_url", &self.data_url)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("requests_per_minute", &self.requests_per_minute)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl AlpacaClientConfig {
    /// Creates a configuration for the paper trading environment.
    #[must_use]
    pub fn paper(env: AlpacaEnv) -> Self {
        Self {
            trading_url: ALPACA_PAPER_URL.to_string(),
            data_url: ALPACA_DATA_URL.to_string(),
            api_key: env.api_key,
            api_secret: env.api_secret,
            requests_per_minute: nonzero!(200u32),
            timeout_secs: 30,
        }
    }

    /// Creates a configuration for live trading.
    #[must_use]
    pub fn live(env: AlpacaEnv) -> Self {
        Self {
            trading_url: ALPACA_LIVE_URL.to_string(),
            ..Self::paper(env)
        }
    }

    /// Picks paper or live from the settings flag.
    #[must_use]
    pub fn for_mode(env: AlpacaEnv, paper_trading: bool) -> Self {
        if paper_trading {
            Self::paper(env)
        } else {
            Self::live(env)
        }
    }

    /// Sets the trading API base URL.
    #[must_use]
    pub fn with_trading_url(mut self, url: impl Into<String>) -> Self {
        self.trading_url = url.into();
        self
    }

    /// Sets the market data API base URL.
    #[must_use]
    pub fn with_data_url(mut self, url: impl Into<String>) -> Self {
        self.data_url = url.into();
        self
    }

    /// Sets the rate limit.
    #[must_use]
    pub fn with_rate_limit(mut self, requests_per_minute: NonZeroU32) -> Self {
        self.requests_per_minute = requests_per_minute;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Returns true if orders go to the paper environment.
    #[must_use]
    pub fn is_paper(&self) -> bool {
        self.trading_url == ALPACA_PAPER_URL
    }
}

// =============================================================================
// AlpacaClient
// =============================================================================

/// Alpaca REST API client.
pub struct AlpacaClient {
    config: AlpacaClientConfig,

    http: Client,

    rate_limiter: Arc<
        RateLimiter<
            governor::state::NotKeyed,
            governor::state::InMemoryState,
            governor::clock::DefaultClock,
        >,
    >,
}

impl std::fmt::Debug for AlpacaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlpacaClient")
            .field("trading_url", &self.config.trading_url)
            .field("data_url", &self.config.data_url)
            .field("requests_per_minute", &self.config.requests_per_minute)
            .finish_non_exhaustive()
    }
}

/// Which Alpaca host a request targets.
#[derive(Debug, Clone, Copy)]
enum Api {
    Trading,
    Data,
}

impl AlpacaClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: AlpacaClientConfig) -> Result<Self> {
        if config.api_key.is_empty() || config.api_secret.expose_secret().is_empty() {
            return Err(AlpacaError::Configuration(
                "API key and secret must not be empty".to_string(),
            ));
        }

        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AlpacaError::Configuration(format!("failed to build HTTP client: {e}")))?;

        let quota = Quota::per_minute(config.requests_per_minute);
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Ok(Self {
            config,
            http,
            rate_limiter,
        })
    }

    /// Validates a symbol or order ID before it is placed in a URL path.
    ///
    /// OCC option symbols and order UUIDs are alphanumeric with hyphens;
    /// some equity tickers carry a dot (`BRK.B`).
    fn validate_identifier(id: &str) -> Result<&str> {
        if id.is_empty() {
            return Err(AlpacaError::InvalidSymbol(
                "identifier cannot be empty".to_string(),
            ));
        }

        if id.contains("..") || id.contains('/') || id.contains('\\') {
            return Err(AlpacaError::InvalidSymbol(format!(
                "contains forbidden characters: {id}"
            )));
        }

        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err(AlpacaError::InvalidSymbol(format!(
                "must contain only alphanumeric, hyphen, underscore, or dot: {id}"
            )));
        }

        if id.len() > 64 {
            return Err(AlpacaError::InvalidSymbol(format!(
                "exceeds maximum length of 64: {}",
                id.len()
            )));
        }

        Ok(id)
    }

    fn url(&self, api: Api, path: &str) -> String {
        let base = match api {
            Api::Trading => &self.config.trading_url,
            Api::Data => &self.config.data_url,
        };
        format!("{base}{path}")
    }

    fn authenticated(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Accept", "application/json")
            .header(KEY_ID_HEADER, &self.config.api_key)
            .header(SECRET_KEY_HEADER, self.config.api_secret.expose_secret())
    }

    /// Waits for rate limiter and makes an authenticated GET request.
    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        api: Api,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        self.rate_limiter.until_ready().await;

        let url = self.url(api, path);
        tracing::debug!("GET {}", url);

        let mut request = self.authenticated(self.http.get(&url));
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = request.send().await?;

        self.handle_response(response).await
    }

    /// Waits for rate limiter and makes an authenticated POST request.
    async fn post<T: serde::de::DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.rate_limiter.until_ready().await;

        let url = self.url(Api::Trading, path);
        let body_json = serde_json::to_string(body)?;

        tracing::debug!("POST {} body_len={}", url, body_json.len());

        let response = self
            .authenticated(self.http.post(&url))
            .header("Content-Type", "application/json")
            .body(body_json)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Handles API response, converting errors appropriately.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(AlpacaError::rate_limit(retry_after));
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AlpacaError::api(status.as_u16(), text));
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    // =========================================================================
    // Account Endpoints
    // =========================================================================

    /// Gets the trading account.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn get_account(&self) -> Result<AccountSnapshot> {
        let raw: RawAccount = self.get(Api::Trading, "/v2/account", &[]).await?;
        Ok(raw.into())
    }

    /// Gets all open positions.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn get_positions(&self) -> Result<Vec<Position>> {
        let raw: Vec<RawPosition> = self.get(Api::Trading, "/v2/positions", &[]).await?;
        Ok(raw.into_iter().map(Position::from).collect())
    }

    // =========================================================================
    // Market Data Endpoints
    // =========================================================================

    /// Gets the price of the latest trade for a stock.
    ///
    /// Returns `None` if Alpaca has no trade for the symbol.
    ///
    /// # Errors
    /// Returns error if the symbol is invalid or the API call fails.
    pub async fn get_latest_trade_price(&self, symbol: &str) -> Result<Option<Decimal>> {
        let symbol = Self::validate_identifier(symbol)?;
        let path = format!("/v2/stocks/{symbol}/trades/latest");

        match self
            .get::<RawLatestTradeResponse>(Api::Data, &path, &[])
            .await
        {
            Ok(response) => Ok(response.trade.map(|t| t.price)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    // =========================================================================
    // Option Contract Endpoints
    // =========================================================================

    /// Lists option contracts matching the query, following pagination.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn get_option_contracts(&self, query: &ContractQuery) -> Result<Vec<OptionContract>> {
        let underlying = Self::validate_identifier(&query.underlying)?;
        let expiration = query.expiration.format("%Y-%m-%d").to_string();
        let min_strike = query.min_strike.to_string();
        let limit = query.limit.to_string();

        let mut contracts = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_CONTRACT_PAGES {
            let mut params: Vec<(&str, &str)> = vec![
                ("underlying_symbols", underlying),
                ("expiration_date", expiration.as_str()),
                ("type", query.option_type.as_api_str()),
                ("strike_price_gte", min_strike.as_str()),
                ("limit", limit.as_str()),
            ];
            if let Some(token) = page_token.as_deref() {
                params.push(("page_token", token));
            }

            let response: RawContractsResponse = self
                .get(Api::Trading, "/v2/options/contracts", &params)
                .await?;

            contracts.extend(
                response
                    .option_contracts
                    .unwrap_or_default()
                    .into_iter()
                    .map(OptionContract::from),
            );

            match response.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => return Ok(contracts),
            }
        }

        tracing::warn!(
            underlying,
            pages = MAX_CONTRACT_PAGES,
            "Option contract listing truncated"
        );
        Ok(contracts)
    }

    // =========================================================================
    // Order Endpoints
    // =========================================================================

    /// Submits a market order.
    ///
    /// # Errors
    /// Returns error if the order is rejected or the API call fails.
    pub async fn submit_order(&self, order: &OrderRequest) -> Result<Order> {
        Self::validate_identifier(&order.symbol)?;
        let body = RawOrderRequest::from(order);
        let raw: RawOrder = self.post("/v2/orders", &body).await?;
        Ok(raw.into())
    }

    /// Gets order status.
    ///
    /// # Errors
    /// Returns error if the order is not found.
    pub async fn get_order(&self, order_id: &str) -> Result<Order> {
        let order_id = Self::validate_identifier(order_id)?;
        let path = format!("/v2/orders/{order_id}");

        match self.get::<RawOrder>(Api::Trading, &path, &[]).await {
            Ok(raw) => Ok(raw.into()),
            Err(e) if e.is_not_found() => Err(AlpacaError::order_not_found(order_id)),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Brokerage for AlpacaClient {
    async fn account(&self) -> anyhow::Result<AccountSnapshot> {
        Ok(self.get_account().await?)
    }

    async fn positions(&self) -> anyhow::Result<Vec<Position>> {
        Ok(self.get_positions().await?)
    }

    async fn latest_trade_price(&self, symbol: &str) -> anyhow::Result<Option<Decimal>> {
        Ok(self.get_latest_trade_price(symbol).await?)
    }

    async fn option_contracts(&self, query: &ContractQuery) -> anyhow::Result<Vec<OptionContract>> {
        Ok(self.get_option_contracts(query).await?)
    }

    async fn submit_order(&self, order: &OrderRequest) -> anyhow::Result<Order> {
        Ok(AlpacaClient::submit_order(self, order).await?)
    }

    async fn get_order(&self, order_id: &str) -> anyhow::Result<Order> {
        Ok(AlpacaClient::get_order(self, order_id).await?)
    }
}

//! Covered option selling against the configured ticker.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use options_bot_core::{
    AssetClass, Brokerage, ContractQuery, OptionContract, OptionType, Order, OrderRequest,
    Position,
};
use rust_decimal::Decimal;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::account::AccountCache;
use crate::error::TradeError;
use crate::expiration::{expiration_date, today_in};
use crate::sizing::{
    call_strike, covered_call_lots, covered_put_lots, put_strike, query_floor,
};
use crate::types::{Holding, PlacedOrder, Positions, TradeResult, TraderConfig};

/// Contract search page size.
const CONTRACT_QUERY_LIMIT: u32 = 1000;

/// Sells weekly covered calls or cash-secured puts through a [`Brokerage`].
pub struct OptionsTrader {
    broker: Arc<dyn Brokerage>,
    config: TraderConfig,
    account: AccountCache,
}

impl std::fmt::Debug for OptionsTrader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionsTrader")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OptionsTrader {
    pub fn new(broker: Arc<dyn Brokerage>, config: TraderConfig) -> Self {
        let account = AccountCache::new(config.account_ttl);
        Self {
            broker,
            config,
            account,
        }
    }

    pub fn config(&self) -> &TraderConfig {
        &self.config
    }

    // =========================================================================
    // Account
    // =========================================================================

    /// Cash balance followed by every broker position.
    pub async fn positions(&self) -> Result<Positions> {
        let account = self.account.get(self.broker.as_ref()).await?;
        let held = self.held_positions().await?;

        let mut holdings = Vec::with_capacity(held.len() + 1);
        holdings.push(Holding {
            symbol: account.currency,
            qty: account.cash,
            price: Some(Decimal::new(100, 2)),
        });
        holdings.extend(held.into_iter().map(|p| Holding {
            symbol: p.symbol,
            qty: p.qty,
            price: p.current_price,
        }));

        Ok(Positions::new(holdings))
    }

    /// Account equity. The next account read goes to the broker.
    pub async fn portfolio_value(&self) -> Result<Decimal> {
        let account = self.account.get(self.broker.as_ref()).await?;
        let equity = account.equity.ok_or(TradeError::EquityUnavailable)?;
        self.account.invalidate();
        Ok(equity)
    }

    /// Latest trade price for `ticker`.
    pub async fn ticker_price(&self, ticker: &str) -> Result<Decimal> {
        let price = self
            .broker
            .latest_trade_price(ticker)
            .await
            .with_context(|| format!("failed to fetch latest trade for {ticker}"))?;
        debug!(ticker, price = ?price, "Ticker price");

        Ok(price.ok_or_else(|| TradeError::PriceUnavailable {
            ticker: ticker.to_string(),
        })?)
    }

    /// True if any option on `ticker` is already held.
    pub async fn has_option_contracts(&self, ticker: &str) -> Result<bool> {
        let held = self.held_positions().await?;
        Ok(has_option_position(&held, ticker))
    }

    async fn held_positions(&self) -> Result<Vec<Position>> {
        self.broker
            .positions()
            .await
            .context("failed to fetch positions")
    }

    // =========================================================================
    // Contracts and Orders
    // =========================================================================

    /// Lowest-strike contract at or above `min_strike`.
    pub async fn get_option_contract(
        &self,
        ticker: &str,
        expiration: NaiveDate,
        option_type: OptionType,
        min_strike: Decimal,
    ) -> Result<OptionContract> {
        let query = ContractQuery {
            underlying: ticker.to_string(),
            expiration,
            option_type,
            min_strike: query_floor(min_strike),
            limit: CONTRACT_QUERY_LIMIT,
        };

        let contracts = self
            .broker
            .option_contracts(&query)
            .await
            .with_context(|| format!("failed to list {option_type} contracts for {ticker}"))?;

        let contract = contracts
            .into_iter()
            .filter(|c| c.strike >= min_strike)
            .min_by(|a, b| a.strike.cmp(&b.strike))
            .ok_or_else(|| TradeError::NoContracts {
                ticker: ticker.to_string(),
                option_type,
                expiration,
                min_strike,
            })?;

        debug!(symbol = contract.symbol, strike = %contract.strike, "Selected contract");
        Ok(contract)
    }

    /// Market sell, good for the day.
    pub async fn submit_sell_order(&self, symbol: &str, qty: u32) -> Result<Order> {
        let order = self
            .broker
            .submit_order(&OrderRequest::sell_day(symbol, qty))
            .await
            .with_context(|| format!("failed to submit sell order for {qty} {symbol}"))?;

        info!(
            order_id = order.id,
            symbol,
            qty,
            status = %order.status,
            "Sell order submitted"
        );
        Ok(order)
    }

    /// Sells one call per 100 shares of `ticker` held.
    ///
    /// Returns `None` without touching the broker's order API if fewer than
    /// 100 shares are held.
    pub async fn sell_covered_calls(
        &self,
        ticker: &str,
        expiration: NaiveDate,
        strike: Decimal,
    ) -> Result<Option<PlacedOrder>> {
        let held = self.held_positions().await?;
        let shares = shares_held(&held, ticker);
        let lots = covered_call_lots(shares);

        if lots == 0 {
            info!(ticker, %shares, "Not enough shares to cover a call, skipping");
            return Ok(None);
        }

        let contract = self
            .get_option_contract(ticker, expiration, OptionType::Call, strike)
            .await?;
        let order = self.submit_sell_order(&contract.symbol, lots).await?;

        Ok(Some(PlacedOrder {
            contract,
            order,
            quantity: lots,
        }))
    }

    /// Sells as many puts as cash can secure at `strike`.
    ///
    /// Sizing uses the target strike, not the strike of the contract found.
    pub async fn sell_covered_puts(
        &self,
        ticker: &str,
        expiration: NaiveDate,
        strike: Decimal,
    ) -> Result<Option<PlacedOrder>> {
        let cash = self.account.get(self.broker.as_ref()).await?.cash;
        let lots = covered_put_lots(cash, strike);

        if lots == 0 {
            info!(ticker, %cash, %strike, "Not enough cash to secure a put, skipping");
            return Ok(None);
        }

        let contract = self
            .get_option_contract(ticker, expiration, OptionType::Put, strike)
            .await?;
        let order = self.submit_sell_order(&contract.symbol, lots).await?;

        Ok(Some(PlacedOrder {
            contract,
            order,
            quantity: lots,
        }))
    }

    /// Polls `order` until it fills, reaches a final state, or the fill timeout elapses.
    ///
    /// A timeout is not an error: the last order seen is returned still open.
    pub async fn wait_for_fill(&self, order: Order) -> Result<Order> {
        if is_settled(&order) {
            return Ok(order);
        }

        let deadline = Instant::now() + self.config.fill_timeout;
        let mut last = order;

        loop {
            let now = Instant::now();
            if now >= deadline {
                warn!(
                    order_id = last.id,
                    status = %last.status,
                    timeout_secs = self.config.fill_timeout.as_secs(),
                    "Order not filled before timeout"
                );
                return Ok(last);
            }

            tokio::time::sleep(self.config.fill_poll_interval.min(deadline - now)).await;

            last = self
                .broker
                .get_order(&last.id)
                .await
                .with_context(|| format!("failed to poll order {}", last.id))?;

            if is_settled(&last) {
                debug!(order_id = last.id, status = %last.status, "Order settled");
                return Ok(last);
            }
        }
    }

    // =========================================================================
    // Trade Run
    // =========================================================================

    /// Sells covered calls if shares are held, otherwise cash-secured puts.
    ///
    /// Does nothing while an option on the ticker is still open. Returns
    /// `None` when no order was placed.
    pub async fn trade_options(&self) -> Result<Option<TradeResult>> {
        let ticker = self.config.ticker.as_str();

        let held = self.held_positions().await?;
        if has_option_position(&held, ticker) {
            info!(ticker, "Option position already open, no trade");
            return Ok(None);
        }

        let price = self.ticker_price(ticker).await?;
        let expiration = expiration_date(today_in(self.config.timezone));
        let shares = shares_held(&held, ticker);

        let placed = if shares > Decimal::ZERO {
            let strike = call_strike(price, self.config.otm_margin_call);
            info!(ticker, %price, %strike, %expiration, %shares, "Selling covered calls");
            self.sell_covered_calls(ticker, expiration, strike).await?
        } else {
            let strike = put_strike(price, self.config.otm_margin_put);
            info!(ticker, %price, %strike, %expiration, "Selling covered puts");
            self.sell_covered_puts(ticker, expiration, strike).await?
        };

        let Some(placed) = placed else {
            return Ok(None);
        };

        let order = self.wait_for_fill(placed.order).await?;

        if !self.config.post_trade_delay.is_zero() {
            tokio::time::sleep(self.config.post_trade_delay).await;
        }
        self.account.invalidate();

        let result = TradeResult {
            option_type: placed.contract.option_type,
            symbol: placed.contract.symbol,
            quantity: placed.quantity,
            strike: placed.contract.strike,
            expiration: placed.contract.expiration,
            fill_price: order.filled_avg_price,
            status: order.status,
        };
        info!(%result, "Trade complete");

        Ok(Some(result))
    }
}

fn is_settled(order: &Order) -> bool {
    order.status.has_fills() || order.status.is_terminal()
}

fn has_option_position(held: &[Position], ticker: &str) -> bool {
    held.iter().any(|p| p.is_option_on(ticker))
}

fn shares_held(held: &[Position], ticker: &str) -> Decimal {
    held.iter()
        .filter(|p| p.symbol == ticker && p.asset_class == AssetClass::UsEquity)
        .map(|p| p.qty)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBroker;
    use options_bot_core::OrderStatus;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn config() -> TraderConfig {
        TraderConfig {
            ticker: "AAPL".to_string(),
            otm_margin_call: dec!(0.05),
            otm_margin_put: dec!(0.05),
            timezone: chrono_tz::America::New_York,
            fill_timeout: Duration::from_secs(10),
            fill_poll_interval: Duration::from_secs(2),
            post_trade_delay: Duration::ZERO,
            account_ttl: Duration::from_secs(30),
        }
    }

    fn trader(broker: &Arc<FakeBroker>) -> OptionsTrader {
        OptionsTrader::new(broker.clone(), config())
    }

    fn friday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 26).unwrap()
    }

    // ==================== Account Tests ====================

    #[tokio::test]
    async fn positions_lead_with_cash() {
        let broker = Arc::new(FakeBroker::new().with_shares("AAPL", dec!(300)));
        let positions = trader(&broker).positions().await.unwrap();

        let symbols: Vec<_> = positions.iter().map(|h| h.symbol.as_str()).collect();
        assert_eq!(symbols, ["USD", "AAPL"]);
        assert_eq!(positions.get("USD").unwrap().price, Some(dec!(1.00)));
        assert_eq!(positions.to_string(), "USD 50000 @ 1.00, AAPL 300 @ 200.0");
    }

    #[tokio::test]
    async fn positions_propagate_broker_failure() {
        let broker = Arc::new(FakeBroker::new());
        broker.state.lock().fail_positions = true;

        let err = trader(&broker).positions().await.unwrap_err();
        assert!(format!("{err:#}").contains("failed to fetch positions"));
    }

    #[tokio::test]
    async fn account_is_cached_until_invalidated() {
        let broker = Arc::new(FakeBroker::new());
        let trader = trader(&broker);

        trader.positions().await.unwrap();
        trader.positions().await.unwrap();
        assert_eq!(broker.state.lock().account_calls, 1);

        assert_eq!(trader.portfolio_value().await.unwrap(), dec!(103245.8));
        assert_eq!(broker.state.lock().account_calls, 1);

        trader.positions().await.unwrap();
        assert_eq!(broker.state.lock().account_calls, 2);
    }

    #[tokio::test]
    async fn portfolio_value_missing_equity() {
        let broker = Arc::new(FakeBroker::new());
        broker.state.lock().account.equity = None;

        let err = trader(&broker).portfolio_value().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TradeError>(),
            Some(TradeError::EquityUnavailable)
        ));
    }

    #[tokio::test]
    async fn ticker_price_missing() {
        let broker = Arc::new(FakeBroker::new());
        broker.state.lock().price = None;

        let err = trader(&broker).ticker_price("AAPL").await.unwrap_err();
        assert_eq!(err.to_string(), "ticker price is unavailable for AAPL");
    }

    #[tokio::test]
    async fn option_position_detection() {
        let broker = Arc::new(
            FakeBroker::new()
                .with_shares("AAPL", dec!(100))
                .with_option_position("MSFT250926C00500000"),
        );
        let trader = trader(&broker);
        assert!(!trader.has_option_contracts("AAPL").await.unwrap());
        assert!(trader.has_option_contracts("MSFT").await.unwrap());
    }

    // ==================== Contract Tests ====================

    #[tokio::test]
    async fn contract_lookup_picks_lowest_qualifying_strike() {
        let broker = Arc::new(FakeBroker::new());
        let contract = trader(&broker)
            .get_option_contract("AAPL", friday(), OptionType::Call, dec!(206.5))
            .await
            .unwrap();

        assert_eq!(contract.strike, dec!(210));
        assert_eq!(contract.symbol, "AAPL250926C00210000");

        let query = broker.state.lock().queries[0].clone();
        assert_eq!(query.limit, 1000);
        assert_eq!(query.min_strike, dec!(206.5));
        assert_eq!(query.expiration, friday());
    }

    #[tokio::test]
    async fn contract_lookup_empty_is_error() {
        let broker = Arc::new(FakeBroker::new());
        let err = trader(&broker)
            .get_option_contract("AAPL", friday(), OptionType::Call, dec!(500))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TradeError>(),
            Some(TradeError::NoContracts { .. })
        ));
    }

    // ==================== Sizing Tests ====================

    #[tokio::test]
    async fn covered_calls_sized_by_shares() {
        for (shares, lots) in [(dec!(300), 3), (dec!(200), 2), (dec!(150), 1)] {
            let broker = Arc::new(FakeBroker::new().with_shares("AAPL", shares));
            let placed = trader(&broker)
                .sell_covered_calls("AAPL", friday(), dec!(210))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(placed.quantity, lots);
            assert_eq!(broker.state.lock().submitted[0].qty, lots);
        }
    }

    #[tokio::test]
    async fn covered_calls_skip_under_one_lot() {
        let broker = Arc::new(FakeBroker::new().with_shares("AAPL", dec!(99)));
        let placed = trader(&broker)
            .sell_covered_calls("AAPL", friday(), dec!(210))
            .await
            .unwrap();
        assert!(placed.is_none());
        assert!(broker.state.lock().submitted.is_empty());
        assert!(broker.state.lock().queries.is_empty());
    }

    #[tokio::test]
    async fn covered_puts_sized_by_cash() {
        let broker = Arc::new(FakeBroker::new().with_cash(dec!(50000)));
        let placed = trader(&broker)
            .sell_covered_puts("AAPL", friday(), dec!(190))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(placed.quantity, 2);
        assert_eq!(placed.contract.symbol, "AAPL250926P00190000");
    }

    #[tokio::test]
    async fn covered_puts_skip_without_collateral() {
        let broker = Arc::new(FakeBroker::new().with_cash(dec!(1000)));
        let placed = trader(&broker)
            .sell_covered_puts("AAPL", friday(), dec!(190))
            .await
            .unwrap();
        assert!(placed.is_none());
        assert!(broker.state.lock().submitted.is_empty());
    }

    // ==================== Fill Polling Tests ====================

    async fn submitted_order(trader: &OptionsTrader) -> Order {
        trader
            .submit_sell_order("AAPL250926C00210000", 2)
            .await
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_fill_returns_on_fill() {
        let broker = Arc::new(
            FakeBroker::new().with_statuses(&[OrderStatus::New, OrderStatus::Filled]),
        );
        let trader = trader(&broker);
        let order = submitted_order(&trader).await;

        let filled = trader.wait_for_fill(order).await.unwrap();
        assert_eq!(filled.status, OrderStatus::Filled);
        assert_eq!(filled.filled_avg_price, Some(dec!(1.42)));
        assert_eq!(broker.state.lock().get_order_calls, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_fill_accepts_partial_fill() {
        let broker =
            Arc::new(FakeBroker::new().with_statuses(&[OrderStatus::PartiallyFilled]));
        let trader = trader(&broker);
        let order = submitted_order(&trader).await;

        let order = trader.wait_for_fill(order).await.unwrap();
        assert_eq!(order.status, OrderStatus::PartiallyFilled);
        assert_eq!(broker.state.lock().get_order_calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_fill_stops_on_rejection() {
        let broker = Arc::new(FakeBroker::new().with_statuses(&[OrderStatus::Rejected]));
        let trader = trader(&broker);
        let order = submitted_order(&trader).await;

        let order = trader.wait_for_fill(order).await.unwrap();
        assert_eq!(order.status, OrderStatus::Rejected);
        assert_eq!(order.filled_avg_price, None);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_fill_timeout_returns_open_order() {
        let broker = Arc::new(FakeBroker::new().with_statuses(&[OrderStatus::Accepted]));
        let trader = trader(&broker);
        let order = submitted_order(&trader).await;

        let start = Instant::now();
        let order = trader.wait_for_fill(order).await.unwrap();
        assert_eq!(order.status, OrderStatus::Accepted);
        assert_eq!(broker.state.lock().get_order_calls, 5);
        assert!(start.elapsed() >= Duration::from_secs(10));
    }

    // ==================== Trade Run Tests ====================

    #[tokio::test(start_paused = true)]
    async fn trade_sells_calls_when_shares_held() {
        let broker = Arc::new(FakeBroker::new().with_shares("AAPL", dec!(200)));
        let result = trader(&broker).trade_options().await.unwrap().unwrap();

        assert_eq!(result.option_type, OptionType::Call);
        assert_eq!(result.quantity, 2);
        assert_eq!(result.strike, dec!(210));
        assert_eq!(result.status, OrderStatus::Filled);
        assert_eq!(result.fill_price, Some(dec!(1.42)));

        let query = broker.state.lock().queries[0].clone();
        assert_eq!(query.min_strike, dec!(210));
        assert_eq!(query.option_type, OptionType::Call);
        assert_eq!(query.expiration.format("%a").to_string(), "Fri");
    }

    #[tokio::test(start_paused = true)]
    async fn trade_sells_puts_without_shares() {
        let broker = Arc::new(FakeBroker::new().with_cash(dec!(50000)));
        let result = trader(&broker).trade_options().await.unwrap().unwrap();

        assert_eq!(result.option_type, OptionType::Put);
        assert_eq!(result.strike, dec!(190));
        assert_eq!(result.quantity, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn put_collateral_checked_against_exact_strike() {
        let broker = Arc::new(FakeBroker::new().with_cash(dec!(18999.60)));
        broker.state.lock().price = Some(dec!(199.995));

        let result = trader(&broker).trade_options().await.unwrap().unwrap();
        assert_eq!(result.option_type, OptionType::Put);
        assert_eq!(result.strike, dec!(190));
        assert_eq!(result.quantity, 1);

        let query = broker.state.lock().queries[0].clone();
        assert_eq!(query.min_strike, dec!(189.99));
    }

    #[tokio::test(start_paused = true)]
    async fn trade_skipped_with_open_option() {
        let broker = Arc::new(
            FakeBroker::new()
                .with_shares("AAPL", dec!(300))
                .with_option_position("AAPL250926C00210000"),
        );
        let result = trader(&broker).trade_options().await.unwrap();

        assert!(result.is_none());
        assert!(broker.state.lock().submitted.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn trade_without_collateral_places_nothing() {
        let broker = Arc::new(FakeBroker::new().with_cash(dec!(1000)));
        let result = trader(&broker).trade_options().await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn trade_refreshes_account_after_delay() {
        let broker = Arc::new(FakeBroker::new().with_cash(dec!(50000)));
        let mut config = config();
        config.post_trade_delay = Duration::from_secs(60);
        let trader = OptionsTrader::new(broker.clone(), config);

        let start = Instant::now();
        trader.trade_options().await.unwrap().unwrap();
        assert!(start.elapsed() >= Duration::from_secs(60));

        trader.positions().await.unwrap();
        assert_eq!(broker.state.lock().account_calls, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn trade_open_order_is_reported_not_failed() {
        let broker = Arc::new(
            FakeBroker::new()
                .with_shares("AAPL", dec!(100))
                .with_statuses(&[OrderStatus::New]),
        );
        let result = trader(&broker).trade_options().await.unwrap().unwrap();
        assert_eq!(result.status, OrderStatus::New);
        assert_eq!(result.fill_price, None);
    }
}

use crate::types::{AccountSnapshot, ContractQuery, OptionContract, Order, OrderRequest, Position};
use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Brokerage account, market data, and order access.
#[async_trait]
pub trait Brokerage: Send + Sync {
    async fn account(&self) -> Result<AccountSnapshot>;

    async fn positions(&self) -> Result<Vec<Position>>;

    /// Latest trade price, or `None` if the broker has no trade for `symbol`.
    async fn latest_trade_price(&self, symbol: &str) -> Result<Option<Decimal>>;

    async fn option_contracts(&self, query: &ContractQuery) -> Result<Vec<OptionContract>>;

    async fn submit_order(&self, order: &OrderRequest) -> Result<Order>;

    async fn get_order(&self, order_id: &str) -> Result<Order>;
}

/// Outbound chat notifications.
///
/// Delivery is best effort: implementations log failures and never return them.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_message(&self, msg: &str, silent: bool);
}

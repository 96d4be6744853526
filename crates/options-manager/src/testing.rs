//! In-memory brokerage for tests.
//!
//! Available to other crates through the `test-util` feature.

use std::collections::VecDeque;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use options_bot_core::{
    AccountSnapshot, AssetClass, Brokerage, ContractQuery, OptionContract, OptionType, Order,
    OrderRequest, OrderStatus, Position,
};
use parking_lot::Mutex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[derive(Debug)]
pub struct State {
    pub account: AccountSnapshot,
    pub positions: Vec<Position>,
    pub price: Option<Decimal>,
    pub strikes: Vec<Decimal>,
    /// Statuses returned by successive `get_order` calls; the last one repeats.
    pub order_statuses: VecDeque<OrderStatus>,
    pub fill_price: Decimal,
    pub fail_positions: bool,

    pub submitted: Vec<OrderRequest>,
    pub queries: Vec<ContractQuery>,
    pub account_calls: usize,
    pub get_order_calls: usize,
}

#[derive(Debug)]
pub struct FakeBroker {
    pub state: Mutex<State>,
}

impl Default for FakeBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBroker {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                account: AccountSnapshot {
                    cash: dec!(50000),
                    equity: Some(dec!(103245.8)),
                    currency: "USD".to_string(),
                },
                positions: Vec::new(),
                price: Some(dec!(200.0)),
                strikes: (36..=44).map(|i| Decimal::from(i * 5)).collect(),
                order_statuses: VecDeque::from([OrderStatus::Filled]),
                fill_price: dec!(1.42),
                fail_positions: false,
                submitted: Vec::new(),
                queries: Vec::new(),
                account_calls: 0,
                get_order_calls: 0,
            }),
        }
    }

    pub fn with_shares(self, symbol: &str, qty: Decimal) -> Self {
        self.state.lock().positions.push(Position {
            symbol: symbol.to_string(),
            qty,
            current_price: Some(dec!(200.0)),
            asset_class: AssetClass::UsEquity,
        });
        self
    }

    pub fn with_option_position(self, symbol: &str) -> Self {
        self.state.lock().positions.push(Position {
            symbol: symbol.to_string(),
            qty: dec!(-1),
            current_price: Some(dec!(1.10)),
            asset_class: AssetClass::UsOption,
        });
        self
    }

    pub fn with_cash(self, cash: Decimal) -> Self {
        self.state.lock().account.cash = cash;
        self
    }

    pub fn with_statuses(self, statuses: &[OrderStatus]) -> Self {
        self.state.lock().order_statuses = statuses.iter().copied().collect();
        self
    }

    fn order(&self, id: &str, symbol: &str, qty: u32, status: OrderStatus, fill: Decimal) -> Order {
        Order {
            id: id.to_string(),
            symbol: symbol.to_string(),
            qty: Decimal::from(qty),
            filled_qty: if status.has_fills() {
                Decimal::from(qty)
            } else {
                Decimal::ZERO
            },
            side: options_bot_core::OrderSide::Sell,
            status,
            filled_avg_price: status.has_fills().then_some(fill),
            submitted_at: None,
        }
    }
}

fn occ_symbol(underlying: &str, exp: NaiveDate, option_type: OptionType, strike: Decimal) -> String {
    let kind = match option_type {
        OptionType::Call => 'C',
        OptionType::Put => 'P',
    };
    let mills = (strike * dec!(1000)).trunc().to_u64().unwrap_or_default();
    format!("{underlying}{}{kind}{mills:08}", exp.format("%y%m%d"))
}

#[async_trait]
impl Brokerage for FakeBroker {
    async fn account(&self) -> Result<AccountSnapshot> {
        let mut state = self.state.lock();
        state.account_calls += 1;
        Ok(state.account.clone())
    }

    async fn positions(&self) -> Result<Vec<Position>> {
        let state = self.state.lock();
        if state.fail_positions {
            return Err(anyhow!("API error: 500 - internal error"));
        }
        Ok(state.positions.clone())
    }

    async fn latest_trade_price(&self, _symbol: &str) -> Result<Option<Decimal>> {
        Ok(self.state.lock().price)
    }

    async fn option_contracts(&self, query: &ContractQuery) -> Result<Vec<OptionContract>> {
        let mut state = self.state.lock();
        state.queries.push(query.clone());
        // Highest strike first so callers must pick the minimum themselves.
        Ok(state
            .strikes
            .iter()
            .rev()
            .filter(|s| **s >= query.min_strike)
            .map(|s| OptionContract {
                symbol: occ_symbol(&query.underlying, query.expiration, query.option_type, *s),
                underlying: query.underlying.clone(),
                expiration: query.expiration,
                option_type: query.option_type,
                strike: *s,
            })
            .collect())
    }

    async fn submit_order(&self, order: &OrderRequest) -> Result<Order> {
        let mut state = self.state.lock();
        state.submitted.push(order.clone());
        let fill = state.fill_price;
        drop(state);
        Ok(self.order("order-1", &order.symbol, order.qty, OrderStatus::Accepted, fill))
    }

    async fn get_order(&self, order_id: &str) -> Result<Order> {
        let mut state = self.state.lock();
        state.get_order_calls += 1;
        let status = if state.order_statuses.len() > 1 {
            state.order_statuses.pop_front().unwrap_or(OrderStatus::Accepted)
        } else {
            state
                .order_statuses
                .front()
                .copied()
                .unwrap_or(OrderStatus::Accepted)
        };
        let (symbol, qty) = state
            .submitted
            .last()
            .map(|o| (o.symbol.clone(), o.qty))
            .unwrap_or_default();
        let fill = state.fill_price;
        drop(state);
        Ok(self.order(order_id, &symbol, qty, status, fill))
    }
}

#[cfg(test)]
#[test]
fn occ_symbol_format() {
    let exp = NaiveDate::from_ymd_opt(2025, 9, 26).unwrap();
    assert_eq!(
        occ_symbol("AAPL", exp, OptionType::Call, dec!(210)),
        "AAPL250926C00210000"
    );
    assert_eq!(
        occ_symbol("AAPL", exp, OptionType::Put, dec!(187.5)),
        "AAPL250926P00187500"
    );
}

//! Short-lived cache of the account snapshot.

use std::time::Duration;

use anyhow::{Context, Result};
use options_bot_core::{AccountSnapshot, Brokerage};
use parking_lot::Mutex;
use tokio::time::Instant;

/// Holds the last account snapshot for `ttl`, or until invalidated.
#[derive(Debug)]
pub struct AccountCache {
    ttl: Duration,
    slot: Mutex<Option<(Instant, AccountSnapshot)>>,
}

impl AccountCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// Returns the cached snapshot, fetching a fresh one if stale or absent.
    pub async fn get(&self, broker: &dyn Brokerage) -> Result<AccountSnapshot> {
        let cached = self
            .slot
            .lock()
            .as_ref()
            .filter(|(fetched_at, _)| fetched_at.elapsed() < self.ttl)
            .map(|(_, snapshot)| snapshot.clone());
        if let Some(snapshot) = cached {
            return Ok(snapshot);
        }

        let snapshot = broker
            .account()
            .await
            .context("failed to fetch account")?;
        *self.slot.lock() = Some((Instant::now(), snapshot.clone()));
        Ok(snapshot)
    }

    /// Drops the cached snapshot so the next read hits the broker.
    pub fn invalidate(&self) {
        *self.slot.lock() = None;
    }
}

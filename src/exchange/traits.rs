//! Account data seam used by the front ends.
//!
//! The HTTP server and the Telegram bot only need read access to account
//! state, so they depend on this trait rather than on `BybitClient` directly.

use crate::exchange::client::BybitClient;
use crate::exchange::types::{ClosedPnl, Execution, RawOrder, RawPosition, Ticker, WalletBalance};
use anyhow::{Context, Result};
use async_trait::async_trait;

/// Read-only access to a derivatives account.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountDataProvider: Send + Sync {
    /// Open positions with non-zero size.
    async fn get_positions(&self) -> Result<Vec<RawPosition>>;

    /// Open orders, including untriggered conditional orders.
    async fn get_open_orders(&self) -> Result<Vec<RawOrder>>;

    /// Wallet summary for the trading account.
    async fn get_wallet_balance(&self) -> Result<WalletBalance>;

    /// Closed-position PnL records since `start_time` (ms), at most `limit`.
    async fn get_closed_pnl(&self, start_time: Option<i64>, limit: usize) -> Result<Vec<ClosedPnl>>;

    /// Trade executions since `start_time` (ms).
    async fn get_executions(&self, start_time: i64) -> Result<Vec<Execution>>;

    /// Latest ticker for one symbol, if the exchange lists it.
    async fn get_ticker(&self, symbol: &str) -> Result<Option<Ticker>>;
}

#[async_trait]
impl AccountDataProvider for BybitClient {
    async fn get_positions(&self) -> Result<Vec<RawPosition>> {
        BybitClient::get_positions(self)
            .await
            .context("Failed to fetch positions")
    }

    async fn get_open_orders(&self) -> Result<Vec<RawOrder>> {
        BybitClient::get_open_orders(self)
            .await
            .context("Failed to fetch open orders")
    }

    async fn get_wallet_balance(&self) -> Result<WalletBalance> {
        BybitClient::get_wallet_balance(self)
            .await
            .context("Failed to fetch wallet balance")
    }

    async fn get_closed_pnl(&self, start_time: Option<i64>, limit: usize) -> Result<Vec<ClosedPnl>> {
        BybitClient::get_closed_pnl(self, start_time, limit)
            .await
            .context("Failed to fetch closed PnL")
    }

    async fn get_executions(&self, start_time: i64) -> Result<Vec<Execution>> {
        BybitClient::get_executions(self, start_time)
            .await
            .context("Failed to fetch executions")
    }

    async fn get_ticker(&self, symbol: &str) -> Result<Option<Ticker>> {
        let tickers = self
            .get_tickers(Some(symbol))
            .await
            .with_context(|| format!("Failed to fetch ticker for {symbol}"))?;
        Ok(tickers.into_iter().find(|t| t.symbol == symbol))
    }
}

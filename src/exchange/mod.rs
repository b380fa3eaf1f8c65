//! Bybit exchange integration.
//!
//! Provides both REST API and WebSocket connectivity for:
//! - Account state (positions, open orders, wallet balance)
//! - Trade history (closed PnL, executions)
//! - Market data (tickers)
//! - Private order stream (order status changes)

mod client;
mod error;
mod traits;
mod types;
mod websocket;

pub use client::{canonical_query, sign_payload, BybitClient};
pub use error::{ExchangeError, ExchangeResult};
#[cfg(test)]
pub use traits::MockAccountDataProvider;
pub use traits::AccountDataProvider;
pub use types::*;
pub use websocket::{parse_message, OrderStreamListener, OrderUpdate, WsEvent};

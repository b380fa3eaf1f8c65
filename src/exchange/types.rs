//! Type definitions for Bybit v5 API responses.
//!
//! Numeric fields stay as the exchange's strings; parsing into `Decimal`
//! happens in the analysis layer, where missing values default instead of
//! failing the whole response.

use serde::{Deserialize, Deserializer, Serialize};

/// Standard v5 response envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub ret_code: i64,
    #[serde(default)]
    pub ret_msg: String,
    pub result: Option<T>,
    #[serde(default)]
    pub time: i64,
}

/// Paginated list result (`result.list` + `result.nextPageCursor`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResult<T> {
    #[serde(default = "Vec::new")]
    pub list: Vec<T>,
    #[serde(default)]
    pub next_page_cursor: Option<String>,
}

impl<T> Default for ListResult<T> {
    fn default() -> Self {
        Self {
            list: Vec::new(),
            next_page_cursor: None,
        }
    }
}

/// Accept a JSON string, number, bool or null and keep it as a string.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Open position as returned by `/v5/position/list`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPosition {
    #[serde(default, deserialize_with = "lenient_string")]
    pub symbol: String,
    /// "Buy", "Sell", or "" for an empty one-way position
    #[serde(default, deserialize_with = "lenient_string")]
    pub side: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub size: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub avg_price: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub mark_price: String,
    /// Empty when the position carries no liquidation risk
    #[serde(default, deserialize_with = "lenient_string")]
    pub liq_price: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub leverage: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub unrealised_pnl: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub position_value: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub stop_loss: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub take_profit: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub position_idx: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub updated_time: String,
}

/// Open order as returned by `/v5/order/realtime`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOrder {
    #[serde(default, deserialize_with = "lenient_string")]
    pub symbol: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub side: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub order_type: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub price: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub qty: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub order_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub order_status: String,
    /// "StopLoss", "TakeProfit", "PartialStopLoss", ... or "" for plain orders
    #[serde(default, deserialize_with = "lenient_string")]
    pub stop_order_type: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub trigger_price: String,
    #[serde(default)]
    pub reduce_only: bool,
    #[serde(default, deserialize_with = "lenient_string")]
    pub created_time: String,
}

/// Unified account wallet summary from `/v5/account/wallet-balance`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletBalance {
    #[serde(default, deserialize_with = "lenient_string")]
    pub account_type: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub total_equity: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub total_wallet_balance: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub total_available_balance: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub total_margin_balance: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub total_initial_margin: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub total_maintenance_margin: String,
    #[serde(rename = "totalPerpUPL", default, deserialize_with = "lenient_string")]
    pub total_perp_upl: String,
}

/// Closed position record from `/v5/position/closed-pnl`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosedPnl {
    #[serde(default, deserialize_with = "lenient_string")]
    pub symbol: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub side: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub qty: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub avg_entry_price: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub avg_exit_price: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub closed_pnl: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub order_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub exec_type: String,
    /// Not part of every closed-PnL payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec_fee: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub created_time: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub updated_time: String,
}

/// Trade fill from `/v5/execution/list`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    #[serde(default, deserialize_with = "lenient_string")]
    pub symbol: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub side: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub exec_price: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub exec_qty: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub exec_fee: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub exec_time: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub order_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub exec_type: String,
}

/// Market ticker from `/v5/market/tickers`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker {
    #[serde(default, deserialize_with = "lenient_string")]
    pub symbol: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub last_price: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub mark_price: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub price24h_pcnt: String,
}

//! Account-level summaries: balance and margin usage, daily PnL, trade rows.

use crate::exchange::{ClosedPnl, Execution, RawPosition, WalletBalance};
use crate::utils::{parse_decimal, parse_decimal_or, safe_div};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::collections::HashMap;

/// Margin usage above this is a warning.
const MARGIN_WARNING_PCT: Decimal = dec!(80);

/// Margin usage above this calls for caution.
const MARGIN_CAUTION_PCT: Decimal = dec!(60);

/// Upper bound on closed-PnL records summed for one day.
pub const DAILY_CLOSED_PNL_LIMIT: usize = 500;

/// Closed-PnL records shown in the recent trades table.
pub const RECENT_TRADES_LIMIT: usize = 50;

/// Margin usage health levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarginHealth {
    /// Usage at or below 60%
    Healthy,
    /// Usage above 60%
    Caution,
    /// Usage above 80%
    Warning,
}

impl MarginHealth {
    pub fn from_usage(usage_pct: Decimal) -> Self {
        if usage_pct > MARGIN_WARNING_PCT {
            MarginHealth::Warning
        } else if usage_pct > MARGIN_CAUTION_PCT {
            MarginHealth::Caution
        } else {
            MarginHealth::Healthy
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            MarginHealth::Healthy => "🟢",
            MarginHealth::Caution => "🟡",
            MarginHealth::Warning => "🔴",
        }
    }

    /// Recommended action for this health level.
    pub fn advice(&self) -> &'static str {
        match self {
            MarginHealth::Healthy => "Margin usage is within safe limits.",
            MarginHealth::Caution => "Moderate margin usage. Monitor closely.",
            MarginHealth::Warning => "High margin usage! Consider reducing positions.",
        }
    }
}

/// Parsed wallet balance with derived margin usage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceSummary {
    pub total_equity: Decimal,
    pub available_balance: Decimal,
    pub margin_balance: Decimal,
    pub initial_margin: Decimal,
    pub maintenance_margin: Decimal,
    /// Initial margin as a percentage of margin balance
    pub margin_usage_pct: Decimal,
    pub health: MarginHealth,
}

impl BalanceSummary {
    pub fn from_wallet(wallet: &WalletBalance) -> Self {
        let margin_balance = parse_decimal_or(&wallet.total_margin_balance, Decimal::ZERO);
        let initial_margin = parse_decimal_or(&wallet.total_initial_margin, Decimal::ZERO);
        let margin_usage_pct = if margin_balance > Decimal::ZERO {
            safe_div(initial_margin, margin_balance) * dec!(100)
        } else {
            Decimal::ZERO
        };

        Self {
            total_equity: parse_decimal_or(&wallet.total_equity, Decimal::ZERO),
            available_balance: parse_decimal_or(&wallet.total_available_balance, Decimal::ZERO),
            margin_balance,
            initial_margin,
            maintenance_margin: parse_decimal_or(&wallet.total_maintenance_margin, Decimal::ZERO),
            margin_usage_pct,
            health: MarginHealth::from_usage(margin_usage_pct),
        }
    }
}

/// Realized plus unrealized PnL for the current UTC day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPnl {
    pub realized: Decimal,
    pub unrealized: Decimal,
    pub total: Decimal,
    pub trade_count: usize,
}

/// Milliseconds timestamp of 00:00 UTC on the day of `now`.
pub fn start_of_day_ms(now: DateTime<Utc>) -> i64 {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc().timestamp_millis())
        .unwrap_or_else(|| now.timestamp_millis())
}

/// Sum realized PnL from closed records and unrealized PnL from open positions.
pub fn daily_pnl(closed: &[ClosedPnl], positions: &[RawPosition]) -> DailyPnl {
    let realized: Decimal = closed
        .iter()
        .map(|c| parse_decimal_or(&c.closed_pnl, Decimal::ZERO))
        .sum();
    let unrealized: Decimal = positions
        .iter()
        .map(|p| parse_decimal_or(&p.unrealised_pnl, Decimal::ZERO))
        .sum();

    DailyPnl {
        realized,
        unrealized,
        total: realized + unrealized,
        trade_count: closed.len(),
    }
}

/// Closed-PnL record in the dashboard's trade-table shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRow {
    pub symbol: String,
    pub side: String,
    pub exec_time: String,
    pub exec_price: Decimal,
    pub exec_qty: Decimal,
    pub exec_fee: Decimal,
    pub closed_pnl: Option<Decimal>,
    pub order_id: String,
}

impl From<&ClosedPnl> for TradeRow {
    fn from(record: &ClosedPnl) -> Self {
        Self {
            symbol: record.symbol.clone(),
            side: record.side.clone(),
            exec_time: record.updated_time.clone(),
            exec_price: parse_decimal_or(&record.avg_exit_price, Decimal::ZERO),
            exec_qty: parse_decimal_or(&record.qty, Decimal::ZERO),
            exec_fee: record
                .exec_fee
                .as_deref()
                .map(|fee| parse_decimal_or(fee, Decimal::ZERO))
                .unwrap_or(Decimal::ZERO),
            closed_pnl: parse_decimal(&record.closed_pnl),
            order_id: record.order_id.clone(),
        }
    }
}

/// One execution with the realized PnL of its order, when the order closed a position.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeEntry {
    pub symbol: String,
    pub side: String,
    pub price: Decimal,
    pub qty: Decimal,
    pub exec_time_ms: i64,
    pub pnl: Option<Decimal>,
}

/// Join executions with closed PnL by order id, oldest first.
pub fn match_trades(executions: &[Execution], closed: &[ClosedPnl]) -> Vec<TradeEntry> {
    let pnl_by_order: HashMap<&str, Decimal> = closed
        .iter()
        .filter(|c| !c.order_id.is_empty())
        .map(|c| (c.order_id.as_str(), parse_decimal_or(&c.closed_pnl, Decimal::ZERO)))
        .collect();

    let mut trades: Vec<TradeEntry> = executions
        .iter()
        .map(|e| TradeEntry {
            symbol: e.symbol.clone(),
            side: e.side.clone(),
            price: parse_decimal_or(&e.exec_price, Decimal::ZERO),
            qty: parse_decimal_or(&e.exec_qty, Decimal::ZERO),
            exec_time_ms: e.exec_time.trim().parse().unwrap_or(0),
            pnl: pnl_by_order.get(e.order_id.as_str()).copied(),
        })
        .collect();

    trades.sort_by_key(|t| t.exec_time_ms);
    trades
}

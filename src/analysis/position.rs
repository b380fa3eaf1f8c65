//! Per-position and per-order normalization.
//!
//! Raw exchange records are parsed leniently: a missing or malformed number
//! becomes zero (leverage becomes 1) instead of failing the analysis.

use crate::exchange::{RawOrder, RawPosition};
use crate::utils::{parse_decimal, parse_decimal_or};
use crate::utils::decimal::percentage_diff;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::fmt;

/// Leverage below this is considered safe.
const SAFE_LEVERAGE_LIMIT: Decimal = dec!(5);

/// Leverage above this is considered high risk.
const HIGH_LEVERAGE_LIMIT: Decimal = dec!(10);

/// Distance reported when the exchange gives no liquidation price.
pub const NO_LIQUIDATION_DISTANCE: Decimal = dec!(100);

/// Symbol keyword table, checked in order; the first matching keyword wins.
const CLUSTER_KEYWORDS: &[(Cluster, &[&str])] = &[
    (Cluster::Btc, &["BTC"]),
    (Cluster::Eth, &["ETH"]),
    (
        Cluster::L2,
        &["ARB", "OP", "MATIC", "AVAX", "STRK", "METIS", "IMX", "MANTA"],
    ),
    (
        Cluster::Meme,
        &["DOGE", "SHIB", "PEPE", "WIF", "BONK", "FLOKI", "BRETT"],
    ),
    (Cluster::Ai, &["AGIX", "FET", "RNDR", "GRT", "OCEAN", "NMR", "TAO"]),
];

/// Position or order direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
    Unknown,
}

impl Side {
    /// Parse the exchange's `Buy`/`Sell` (any case); anything else is `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "buy" => Side::Buy,
            "sell" => Side::Sell,
            _ => Side::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
            Side::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Leverage risk bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LeverageRisk {
    /// Below 5x
    Safe,
    /// 5x to 10x inclusive
    Medium,
    /// Above 10x
    High,
}

impl LeverageRisk {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeverageRisk::Safe => "safe",
            LeverageRisk::Medium => "medium",
            LeverageRisk::High => "high",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            LeverageRisk::Safe => "🟢",
            LeverageRisk::Medium => "🟡",
            LeverageRisk::High => "🔴",
        }
    }
}

impl fmt::Display for LeverageRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PnlStatus {
    Profit,
    Loss,
}

impl fmt::Display for PnlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PnlStatus::Profit => f.write_str("profit"),
            PnlStatus::Loss => f.write_str("loss"),
        }
    }
}

/// Market sector a symbol belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Cluster {
    #[serde(rename = "BTC")]
    Btc,
    #[serde(rename = "ETH")]
    Eth,
    L2,
    #[serde(rename = "MEME")]
    Meme,
    #[serde(rename = "AI")]
    Ai,
    #[serde(rename = "OTHER")]
    Other,
}

impl Cluster {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cluster::Btc => "BTC",
            Cluster::Eth => "ETH",
            Cluster::L2 => "L2",
            Cluster::Meme => "MEME",
            Cluster::Ai => "AI",
            Cluster::Other => "OTHER",
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categorize a trading symbol by case-insensitive keyword match.
pub fn categorize_symbol(symbol: &str) -> Cluster {
    let upper = symbol.to_uppercase();

    CLUSTER_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| upper.contains(k)))
        .map(|(cluster, _)| *cluster)
        .unwrap_or(Cluster::Other)
}

/// Bucket a leverage value.
pub fn calculate_leverage_risk(leverage: Decimal) -> LeverageRisk {
    if leverage < SAFE_LEVERAGE_LIMIT {
        LeverageRisk::Safe
    } else if leverage <= HIGH_LEVERAGE_LIMIT {
        LeverageRisk::Medium
    } else {
        LeverageRisk::High
    }
}

/// Analyzed open position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub symbol: String,
    pub side: Side,
    pub size: Decimal,
    pub entry_price: Decimal,
    pub mark_price: Decimal,
    pub liq_price: Decimal,
    pub leverage: Decimal,
    pub unrealized_pnl: Decimal,
    /// |size × mark price| in USDT
    pub exposure_usdt: Decimal,
    /// Distance from mark to liquidation price in percent of mark
    pub liquidation_distance_pct: Decimal,
    pub pnl_status: PnlStatus,
    pub leverage_risk: LeverageRisk,
    pub cluster: Cluster,
    pub has_stop_loss: bool,
}

impl Position {
    /// `100 / liquidation distance × leverage`, or `None` when the distance is zero.
    ///
    /// Saturates at `Decimal::MAX` for vanishingly small distances.
    pub fn risk_score(&self) -> Option<Decimal> {
        if self.liquidation_distance_pct <= Decimal::ZERO {
            return None;
        }
        Some(score(self.liquidation_distance_pct, self.leverage))
    }

    /// Risk score with the distance floored at 0.1%, used for display ordering.
    pub fn display_score(&self) -> Decimal {
        score(self.liquidation_distance_pct.max(dec!(0.1)), self.leverage)
    }
}

fn score(distance_pct: Decimal, leverage: Decimal) -> Decimal {
    dec!(100)
        .checked_div(distance_pct)
        .and_then(|inverse| inverse.checked_mul(leverage))
        .unwrap_or(Decimal::MAX)
}

/// Normalize one raw position and derive its risk metrics.
pub fn analyze_position(raw: &RawPosition) -> Position {
    let size = parse_decimal_or(&raw.size, Decimal::ZERO);
    let entry_price = parse_decimal_or(&raw.avg_price, Decimal::ZERO);
    let mark_price = parse_decimal_or(&raw.mark_price, Decimal::ZERO);
    let liq_price = parse_decimal_or(&raw.liq_price, Decimal::ZERO);
    let leverage = parse_decimal_or(&raw.leverage, Decimal::ONE);
    let unrealized_pnl = parse_decimal_or(&raw.unrealised_pnl, Decimal::ZERO);

    let exposure_usdt = (size * mark_price).abs();

    let liquidation_distance_pct = if liq_price > Decimal::ZERO && mark_price > Decimal::ZERO {
        percentage_diff(liq_price, mark_price)
    } else {
        NO_LIQUIDATION_DISTANCE
    };

    let pnl_status = if unrealized_pnl > Decimal::ZERO {
        PnlStatus::Profit
    } else {
        PnlStatus::Loss
    };

    let has_stop_loss = parse_decimal(&raw.stop_loss)
        .map(|sl| sl > Decimal::ZERO)
        .unwrap_or(false);

    Position {
        symbol: raw.symbol.clone(),
        side: Side::parse(&raw.side),
        size,
        entry_price,
        mark_price,
        liq_price,
        leverage,
        unrealized_pnl,
        exposure_usdt,
        liquidation_distance_pct,
        pnl_status,
        leverage_risk: calculate_leverage_risk(leverage),
        cluster: categorize_symbol(&raw.symbol),
        has_stop_loss,
    }
}

/// Analyzed open order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub symbol: String,
    pub side: Side,
    /// Lowercased order type (`limit`, `market`)
    #[serde(rename = "type")]
    pub order_type: String,
    pub price: Decimal,
    pub qty: Decimal,
    pub order_id: String,
    /// Conditional order that closes a position at a loss trigger
    pub is_stop_loss: bool,
}

/// Normalize raw orders, preserving input order.
pub fn analyze_orders(raw_orders: &[RawOrder]) -> Vec<Order> {
    raw_orders
        .iter()
        .map(|o| Order {
            symbol: o.symbol.clone(),
            side: Side::parse(&o.side),
            order_type: o.order_type.to_lowercase(),
            price: parse_decimal_or(&o.price, Decimal::ZERO),
            qty: parse_decimal_or(&o.qty, Decimal::ZERO),
            order_id: o.order_id.clone(),
            is_stop_loss: matches!(
                o.stop_order_type.as_str(),
                "StopLoss" | "PartialStopLoss" | "TrailingStop"
            ),
        })
        .collect()
}

//! Portfolio-level aggregation over analyzed positions and orders.

use super::position::{
    analyze_orders, analyze_position, Cluster, LeverageRisk, Order, Position, Side,
};
use crate::exchange::{RawOrder, RawPosition};
use crate::utils::safe_div;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

/// Long share of total exposure above which the book is long-biased.
const LONG_BIAS_THRESHOLD: Decimal = dec!(0.6);

/// Long share of total exposure below which the book is short-biased.
const SHORT_BIAS_THRESHOLD: Decimal = dec!(0.4);

/// Positions closer than this (percent) to liquidation are flagged.
pub const CLOSE_LIQUIDATION_PCT: Decimal = dec!(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Bias {
    Long,
    Short,
    Neutral,
}

impl Bias {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bias::Long => "long",
            Bias::Short => "short",
            Bias::Neutral => "neutral",
        }
    }

    /// Direction that would hedge this bias.
    pub fn opposite(&self) -> Bias {
        match self {
            Bias::Long => Bias::Short,
            Bias::Short => Bias::Long,
            Bias::Neutral => Bias::Neutral,
        }
    }
}

impl fmt::Display for Bias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify directional bias from long and total exposure.
pub fn determine_bias(long_exposure: Decimal, total_exposure: Decimal) -> Bias {
    if total_exposure <= Decimal::ZERO {
        return Bias::Neutral;
    }

    let long_share = long_exposure / total_exposure;
    if long_share > LONG_BIAS_THRESHOLD {
        Bias::Long
    } else if long_share < SHORT_BIAS_THRESHOLD {
        Bias::Short
    } else {
        Bias::Neutral
    }
}

/// Share of total exposure held in one cluster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterShare {
    pub cluster: Cluster,
    pub pct: Decimal,
}

/// Serialize cluster shares as a `{"BTC": 48.2, ...}` map in first-seen order.
fn serialize_clusters<S>(clusters: &[ClusterShare], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serializer.serialize_map(Some(clusters.len()))?;
    for share in clusters {
        map.serialize_entry(share.cluster.as_str(), &share.pct)?;
    }
    map.end()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub total_long_exposure: Decimal,
    pub total_short_exposure: Decimal,
    pub net_exposure: Decimal,
    pub bias: Bias,
    #[serde(serialize_with = "serialize_clusters")]
    pub clusters: Vec<ClusterShare>,
    pub total_positions: usize,
    pub total_orders: usize,
    pub total_unrealized_pnl: Decimal,
}

impl PortfolioSummary {
    /// Largest cluster share; the first one seen wins a tie.
    pub fn dominant_cluster(&self) -> Option<ClusterShare> {
        self.clusters.iter().fold(None, |best: Option<ClusterShare>, share| match best {
            Some(b) if b.pct >= share.pct => Some(b),
            _ => Some(*share),
        })
    }

    /// Cluster shares sorted descending by percentage (stable for ties).
    pub fn clusters_by_share(&self) -> Vec<ClusterShare> {
        let mut sorted = self.clusters.clone();
        sorted.sort_by(|a, b| b.pct.cmp(&a.pct));
        sorted
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskSummary {
    /// Position with the greatest risk score
    pub highest_risk_position: Option<Position>,
    pub high_leverage_count: usize,
    pub close_liquidation_count: usize,
    /// Risk score of `highest_risk_position`, zero when none
    pub total_risk_score: Decimal,
    /// Positions with neither a stop-loss price nor a stop-loss order
    pub no_stop_loss_count: usize,
    /// Symbols with both a long and a short position open
    pub hedged_symbols: Vec<String>,
    /// Symbols of positions that are unhedged and lack a stop loss
    pub risky_positions: Vec<String>,
}

/// Complete analysis snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub portfolio: PortfolioSummary,
    pub positions: Vec<Position>,
    pub orders: Vec<Order>,
    pub risks: RiskSummary,
}

impl Analysis {
    pub fn high_risk_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions
            .iter()
            .filter(|p| p.leverage_risk == LeverageRisk::High)
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() && self.orders.is_empty()
    }
}

/// Aggregate analyzed positions and orders into a portfolio snapshot.
pub fn analyze_portfolio(positions: Vec<Position>, orders: Vec<Order>) -> Analysis {
    let mut long_exposure = Decimal::ZERO;
    let mut short_exposure = Decimal::ZERO;
    for pos in &positions {
        match pos.side {
            Side::Buy => long_exposure += pos.exposure_usdt,
            Side::Sell => short_exposure += pos.exposure_usdt,
            Side::Unknown => {}
        }
    }
    let total_exposure = long_exposure + short_exposure;

    // Cluster exposure in first-seen order
    let mut cluster_exposure: Vec<(Cluster, Decimal)> = Vec::new();
    for pos in &positions {
        match cluster_exposure.iter_mut().find(|(c, _)| *c == pos.cluster) {
            Some((_, exposure)) => *exposure += pos.exposure_usdt,
            None => cluster_exposure.push((pos.cluster, pos.exposure_usdt)),
        }
    }
    let clusters = if total_exposure > Decimal::ZERO {
        cluster_exposure
            .into_iter()
            .map(|(cluster, exposure)| ClusterShare {
                cluster,
                pct: safe_div(exposure, total_exposure) * dec!(100),
            })
            .collect()
    } else {
        Vec::new()
    };

    let total_unrealized_pnl = positions.iter().map(|p| p.unrealized_pnl).sum();

    let portfolio = PortfolioSummary {
        total_long_exposure: long_exposure,
        total_short_exposure: short_exposure,
        net_exposure: long_exposure - short_exposure,
        bias: determine_bias(long_exposure, total_exposure),
        clusters,
        total_positions: positions.len(),
        total_orders: orders.len(),
        total_unrealized_pnl,
    };

    let risks = summarize_risks(&positions, &orders);

    Analysis {
        portfolio,
        positions,
        orders,
        risks,
    }
}

fn summarize_risks(positions: &[Position], orders: &[Order]) -> RiskSummary {
    let mut highest: Option<&Position> = None;
    let mut highest_score = Decimal::ZERO;
    for pos in positions {
        if let Some(score) = pos.risk_score() {
            if score > highest_score {
                highest_score = score;
                highest = Some(pos);
            }
        }
    }

    let stop_loss_symbols: HashSet<&str> = orders
        .iter()
        .filter(|o| o.is_stop_loss)
        .map(|o| o.symbol.as_str())
        .collect();
    let protected = |p: &Position| p.has_stop_loss || stop_loss_symbols.contains(p.symbol.as_str());

    let long_symbols: HashSet<&str> = positions
        .iter()
        .filter(|p| p.side == Side::Buy)
        .map(|p| p.symbol.as_str())
        .collect();
    let mut hedged_symbols: Vec<String> = Vec::new();
    for pos in positions.iter().filter(|p| p.side == Side::Sell) {
        if long_symbols.contains(pos.symbol.as_str()) && !hedged_symbols.contains(&pos.symbol) {
            hedged_symbols.push(pos.symbol.clone());
        }
    }

    let risky_positions = positions
        .iter()
        .filter(|p| !protected(p) && !hedged_symbols.contains(&p.symbol))
        .map(|p| p.symbol.clone())
        .collect();

    RiskSummary {
        highest_risk_position: highest.cloned(),
        high_leverage_count: positions
            .iter()
            .filter(|p| p.leverage_risk == LeverageRisk::High)
            .count(),
        close_liquidation_count: positions
            .iter()
            .filter(|p| p.liquidation_distance_pct < CLOSE_LIQUIDATION_PCT)
            .count(),
        total_risk_score: highest_score,
        no_stop_loss_count: positions.iter().filter(|p| !protected(p)).count(),
        hedged_symbols,
        risky_positions,
    }
}

/// Analyze raw positions and orders in one step.
pub fn analyze_positions(raw_positions: &[RawPosition], raw_orders: &[RawOrder]) -> Analysis {
    let positions = raw_positions.iter().map(analyze_position).collect();
    let orders = analyze_orders(raw_orders);
    analyze_portfolio(positions, orders)
}

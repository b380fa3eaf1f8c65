//! Position and portfolio risk analysis.
//!
//! Pure transforms from raw exchange records to analysis snapshots:
//! - `position`: per-position metrics (exposure, liquidation distance, leverage bucket, cluster)
//! - `portfolio`: exposure aggregation, bias, cluster shares, risk summary
//! - `account`: balance/margin usage, daily PnL, trade history rows

pub mod account;
pub mod portfolio;
pub mod position;

pub use account::{
    daily_pnl, match_trades, start_of_day_ms, BalanceSummary, DailyPnl, MarginHealth, TradeEntry,
    TradeRow, DAILY_CLOSED_PNL_LIMIT, RECENT_TRADES_LIMIT,
};
pub use portfolio::{
    analyze_portfolio, analyze_positions, determine_bias, Analysis, Bias, ClusterShare,
    PortfolioSummary, RiskSummary, CLOSE_LIQUIDATION_PCT,
};
pub use position::{
    analyze_orders, analyze_position, calculate_leverage_risk, categorize_symbol, Cluster,
    LeverageRisk, Order, PnlStatus, Position, Side,
};

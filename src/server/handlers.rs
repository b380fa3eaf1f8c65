//! Dashboard API handlers.
//!
//! | Method | Path          | Description                                       |
//! |--------|---------------|---------------------------------------------------|
//! | GET    | `/api/data`   | Balance, positions, orders, daily PnL, suggestions |
//! | GET    | `/api/trades` | Recent closed-PnL records as trade rows           |
//! | GET    | `/api/health` | Liveness probe                                    |

use super::error::ApiError;
use super::AppState;
use crate::advisor::Suggestions;
use crate::analysis::{
    analyze_positions, daily_pnl, start_of_day_ms, Analysis, BalanceSummary, DailyPnl, TradeRow,
    DAILY_CLOSED_PNL_LIMIT, RECENT_TRADES_LIMIT,
};
use crate::exchange::{RawOrder, RawPosition, WalletBalance};
use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

/// Everything the dashboard renders on one poll.
#[derive(Debug, Serialize)]
pub struct DashboardData {
    pub balance: WalletBalance,
    pub margin: BalanceSummary,
    pub positions: Vec<RawPosition>,
    pub orders: Vec<RawOrder>,
    pub pnl: DailyPnl,
    /// Suggestions for the current book
    pub analysis: Suggestions,
    pub risk: Analysis,
}

pub async fn get_data(State(state): State<AppState>) -> Result<Json<DashboardData>, ApiError> {
    let balance = state.provider.get_wallet_balance().await?;
    let positions = state.provider.get_positions().await?;
    let orders = state.provider.get_open_orders().await?;

    let start_time = start_of_day_ms(chrono::Utc::now());
    let closed = state
        .provider
        .get_closed_pnl(Some(start_time), DAILY_CLOSED_PNL_LIMIT)
        .await?;

    let pnl = daily_pnl(&closed, &positions);
    let risk = analyze_positions(&positions, &orders);
    let analysis = state.advisor.suggest(&risk).await;

    debug!(
        positions = positions.len(),
        orders = orders.len(),
        closed = closed.len(),
        "Dashboard data assembled"
    );

    Ok(Json(DashboardData {
        margin: BalanceSummary::from_wallet(&balance),
        balance,
        positions,
        orders,
        pnl,
        analysis,
        risk,
    }))
}

pub async fn get_trades(State(state): State<AppState>) -> Result<Json<Vec<TradeRow>>, ApiError> {
    let closed = state
        .provider
        .get_closed_pnl(None, RECENT_TRADES_LIMIT)
        .await?;

    Ok(Json(closed.iter().map(TradeRow::from).collect()))
}

pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "ok": true,
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

//! Deterministic rule-based suggestions.

use super::Suggestions;
use crate::analysis::{Analysis, Bias, LeverageRisk, PnlStatus, CLOSE_LIQUIDATION_PCT};
use crate::utils::{format_fixed, format_percentage};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Leverage above which a position gets its own "reduce leverage" item.
const REDUCE_LEVERAGE_ABOVE: Decimal = dec!(10);

/// At most this many "reduce leverage" items are emitted.
const MAX_LEVERAGE_ITEMS: usize = 2;

/// Cluster share (percent) that triggers a diversification suggestion.
const CONCENTRATION_PCT: Decimal = dec!(40);

/// Unrealized PnL beyond which a position counts as a notable winner or loser.
const NOTABLE_PNL: Decimal = dec!(100);

/// More high-leverage positions than this triggers a portfolio-wide warning.
const MAX_HIGH_LEVERAGE_POSITIONS: usize = 3;

/// Build suggestions from fixed, ordered checks over the analysis.
pub fn rule_based_suggestions(analysis: &Analysis) -> Suggestions {
    let mut urgent = Vec::new();
    let mut recommended = Vec::new();
    let mut optional = Vec::new();

    let positions = &analysis.positions;
    let portfolio = &analysis.portfolio;

    for pos in positions
        .iter()
        .filter(|p| p.liquidation_distance_pct < CLOSE_LIQUIDATION_PCT)
    {
        urgent.push(format!(
            "Add collateral or reduce {} {} position ({} from liquidation)",
            pos.symbol,
            pos.side.as_str().to_uppercase(),
            format_percentage(pos.liquidation_distance_pct)
        ));
    }

    for pos in positions
        .iter()
        .filter(|p| p.leverage > REDUCE_LEVERAGE_ABOVE)
        .take(MAX_LEVERAGE_ITEMS)
    {
        urgent.push(format!(
            "Reduce leverage on {} (currently {}x)",
            pos.symbol,
            format_fixed(pos.leverage, 1)
        ));
    }

    if let Some(dominant) = portfolio.dominant_cluster() {
        if dominant.pct > CONCENTRATION_PCT {
            recommended.push(format!(
                "Diversify away from {} cluster ({}% of portfolio)",
                dominant.cluster,
                format_fixed(dominant.pct, 1)
            ));
        }
    }

    let winners = positions
        .iter()
        .filter(|p| p.pnl_status == PnlStatus::Profit && p.unrealized_pnl > NOTABLE_PNL)
        .count();
    if winners > 0 {
        recommended.push(format!(
            "Consider taking partial profits on {} profitable position(s)",
            winners
        ));
    }

    if portfolio.bias != Bias::Neutral {
        recommended.push(format!(
            "Portfolio is heavily {} biased - consider {} hedges",
            portfolio.bias.as_str().to_uppercase(),
            portfolio.bias.opposite()
        ));
    }

    if positions
        .iter()
        .any(|p| matches!(p.leverage_risk, LeverageRisk::Medium | LeverageRisk::High))
    {
        optional.push("Set tighter stop losses on high-leverage positions".to_string());
    }

    let losers = positions
        .iter()
        .filter(|p| p.pnl_status == PnlStatus::Loss && p.unrealized_pnl < -NOTABLE_PNL)
        .count();
    if losers > 0 {
        optional.push(format!(
            "Review {} losing position(s) for potential exit",
            losers
        ));
    }

    if analysis.risks.high_leverage_count > MAX_HIGH_LEVERAGE_POSITIONS {
        optional.push("Consider reducing overall portfolio leverage".to_string());
    }

    if urgent.is_empty() && recommended.is_empty() && optional.is_empty() {
        optional.push("Portfolio looks relatively balanced - continue monitoring".to_string());
    }

    Suggestions {
        urgent,
        recommended,
        optional,
    }
    .capped()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze_positions;
    use crate::exchange::RawPosition;

    fn raw(symbol: &str, side: &str, mark: &str, liq: &str, lev: &str, pnl: &str) -> RawPosition {
        RawPosition {
            symbol: symbol.to_string(),
            side: side.to_string(),
            size: "1".to_string(),
            avg_price: mark.to_string(),
            mark_price: mark.to_string(),
            liq_price: liq.to_string(),
            leverage: lev.to_string(),
            unrealised_pnl: pnl.to_string(),
            ..RawPosition::default()
        }
    }

    #[test]
    fn test_empty_portfolio_is_balanced() {
        let suggestions = rule_based_suggestions(&analyze_positions(&[], &[]));
        assert!(suggestions.urgent.is_empty());
        assert!(suggestions.recommended.is_empty());
        assert_eq!(
            suggestions.optional,
            vec!["Portfolio looks relatively balanced - continue monitoring".to_string()]
        );
    }

    #[test]
    fn test_near_liquidation_and_high_leverage() {
        let analysis = analyze_positions(
            &[raw("BTCUSDT", "Buy", "43200", "40000", "12.5", "525")],
            &[],
        );
        let suggestions = rule_based_suggestions(&analysis);

        assert_eq!(
            suggestions.urgent,
            vec![
                "Add collateral or reduce BTCUSDT BUY position (7.41% from liquidation)".to_string(),
                "Reduce leverage on BTCUSDT (currently 12.5x)".to_string(),
            ]
        );
        assert_eq!(
            suggestions.recommended,
            vec![
                "Diversify away from BTC cluster (100.0% of portfolio)".to_string(),
                "Consider taking partial profits on 1 profitable position(s)".to_string(),
                "Portfolio is heavily LONG biased - consider short hedges".to_string(),
            ]
        );
        assert_eq!(
            suggestions.optional,
            vec!["Set tighter stop losses on high-leverage positions".to_string()]
        );
    }

    #[test]
    fn test_suggestion_figures_round_half_up() {
        // 9.999% from liquidation at 12.55x
        let analysis = analyze_positions(
            &[raw("ETHUSDT", "Sell", "10000", "10999.9", "12.55", "0")],
            &[],
        );
        let suggestions = rule_based_suggestions(&analysis);

        assert_eq!(
            suggestions.urgent,
            vec![
                "Add collateral or reduce ETHUSDT SELL position (10.00% from liquidation)".to_string(),
                "Reduce leverage on ETHUSDT (currently 12.6x)".to_string(),
            ]
        );
    }

    #[test]
    fn test_losers_and_portfolio_leverage() {
        let positions: Vec<RawPosition> = ["SOLUSDT", "XRPUSDT", "ADAUSDT", "LINKUSDT"]
            .iter()
            .map(|s| raw(s, "Sell", "100", "", "20", "-150"))
            .collect();
        let suggestions = rule_based_suggestions(&analyze_positions(&positions, &[]));

        // Only the first two high-leverage positions get an item
        assert_eq!(suggestions.urgent.len(), 2);
        assert!(suggestions.urgent[0].contains("SOLUSDT"));
        assert!(suggestions.urgent[1].contains("XRPUSDT"));
        assert_eq!(
            suggestions.optional,
            vec![
                "Set tighter stop losses on high-leverage positions".to_string(),
                "Review 4 losing position(s) for potential exit".to_string(),
                "Consider reducing overall portfolio leverage".to_string(),
            ]
        );
    }

    #[test]
    fn test_lists_are_capped() {
        let positions: Vec<RawPosition> = (0..8)
            .map(|i| raw(&format!("COIN{i}USDT"), "Buy", "100", "95", "3", "0"))
            .collect();
        let suggestions = rule_based_suggestions(&analyze_positions(&positions, &[]));

        assert_eq!(suggestions.urgent.len(), 4);
        assert!(suggestions.recommended.len() <= 4);
        assert!(suggestions.optional.len() <= 4);
    }
}

//! Plain-text terminal report for the CLI.

use crate::advisor::Suggestions;
use crate::analysis::{analyze_orders, analyze_position, Analysis, LeverageRisk, Side};
use crate::exchange::{RawOrder, RawPosition};
use crate::utils::{format_currency, format_fixed, format_percentage};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const WIDTH: usize = 60;

/// Liquidation distance below which a high-leverage position gets a warning line.
const WARN_LIQUIDATION_PCT: Decimal = dec!(15);

fn rule() -> String {
    "=".repeat(WIDTH)
}

fn section_header(title: &str) -> String {
    format!("\n{}\n{:^width$}\n{}\n", rule(), title, rule(), width = WIDTH)
}

/// Portfolio exposure, bias and cluster distribution.
pub fn portfolio_summary(analysis: &Analysis) -> String {
    let p = &analysis.portfolio;
    let mut out = section_header("PORTFOLIO SUMMARY");

    out.push_str(&format!("\nLong Exposure:  ${} USDT\n", format_currency(p.total_long_exposure)));
    out.push_str(&format!("Short Exposure: ${} USDT\n", format_currency(p.total_short_exposure)));
    out.push_str(&format!("Net Exposure:   ${} USDT\n", format_currency(p.net_exposure)));
    out.push_str(&format!("Total PnL:      ${} USDT\n", format_currency(p.total_unrealized_pnl)));
    out.push_str(&format!("Bias:           {}\n", p.bias.as_str().to_uppercase()));
    out.push_str(&format!("Total Positions: {}\n", p.total_positions));

    if !p.clusters.is_empty() {
        out.push_str("\nCluster Distribution:\n");
        for share in p.clusters_by_share() {
            out.push_str(&format!("  {:8} {}\n", share.cluster.as_str(), format_percentage(share.pct)));
        }
    }

    out
}

/// Per-position risk blocks, riskiest first.
pub fn position_risks(analysis: &Analysis) -> String {
    if analysis.positions.is_empty() {
        return "\nNo open positions found.\n".to_string();
    }

    let mut out = section_header("POSITION RISKS");

    let mut sorted: Vec<_> = analysis.positions.iter().collect();
    sorted.sort_by(|a, b| b.display_score().cmp(&a.display_score()));

    for pos in sorted {
        let pnl_sign = if pos.unrealized_pnl >= Decimal::ZERO { "+" } else { "" };

        out.push_str(&format!(
            "\n{} [{} RISK] {} ({})\n",
            pos.leverage_risk.emoji(),
            pos.leverage_risk.as_str().to_uppercase(),
            pos.symbol,
            pos.side.as_str().to_uppercase()
        ));
        out.push_str(&format!(
            "  Size: {} | Entry: ${} | Mark: ${}\n",
            format_fixed(pos.size, 4),
            format_currency(pos.entry_price),
            format_currency(pos.mark_price)
        ));
        out.push_str(&format!(
            "  Leverage: {}x | Liq Price: ${}\n",
            format_fixed(pos.leverage, 1),
            format_currency(pos.liq_price)
        ));
        out.push_str(&format!(
            "  Distance to Liquidation: {}\n",
            format_percentage(pos.liquidation_distance_pct)
        ));
        out.push_str(&format!(
            "  PnL: {}${} ({})\n",
            pnl_sign,
            format_currency(pos.unrealized_pnl),
            pos.pnl_status
        ));
        out.push_str(&format!(
            "  Exposure: ${} USDT | Cluster: {}\n",
            format_currency(pos.exposure_usdt),
            pos.cluster
        ));

        if pos.leverage_risk == LeverageRisk::High
            && pos.liquidation_distance_pct < WARN_LIQUIDATION_PCT
        {
            out.push_str("  ⚠️  HIGH RISK: High leverage + close to liquidation!\n");
        }
    }

    out
}

/// Suggestion lists by urgency.
pub fn suggestions(suggestions: &Suggestions) -> String {
    let mut out = section_header("ACTIONABLE SUGGESTIONS");

    for (label, items) in [
        ("🔴 URGENT:", &suggestions.urgent),
        ("🟡 RECOMMENDED:", &suggestions.recommended),
        ("🟢 OPTIONAL:", &suggestions.optional),
    ] {
        if items.is_empty() {
            continue;
        }
        out.push_str(&format!("\n{}\n", label));
        for item in items {
            out.push_str(&format!("  - {}\n", item));
        }
    }

    out
}

/// Full analysis report.
pub fn analysis_report(analysis: &Analysis, advice: &Suggestions) -> String {
    let mut out = portfolio_summary(analysis);
    out.push_str(&position_risks(analysis));
    out.push_str(&suggestions(advice));
    out.push_str(&format!("\n{}\n✅ Analysis complete!\n{}\n", rule(), rule()));
    out
}

/// Compact listing of open positions with totals.
pub fn positions_list(raw_positions: &[RawPosition]) -> String {
    if raw_positions.is_empty() {
        return "ℹ️  No open positions found.\n".to_string();
    }

    let mut out = section_header("OPEN POSITIONS");
    let mut total_value = Decimal::ZERO;
    let mut total_pnl = Decimal::ZERO;

    for pos in raw_positions.iter().map(analyze_position) {
        total_value += pos.exposure_usdt;
        total_pnl += pos.unrealized_pnl;

        let side_emoji = if pos.side == Side::Buy { "📈" } else { "📉" };
        let pnl_emoji = if pos.unrealized_pnl >= Decimal::ZERO { "🟢" } else { "🔴" };

        out.push_str(&format!("\n{} {} ({})\n", side_emoji, pos.symbol, pos.side.as_str().to_uppercase()));
        out.push_str(&format!(
            "  Size: {} | Entry: ${} | Mark: ${} | Lev: {}x\n",
            format_fixed(pos.size, 4),
            format_fixed(pos.entry_price, 4),
            format_fixed(pos.mark_price, 4),
            pos.leverage
        ));
        out.push_str(&format!("  {} PnL: ${}\n", pnl_emoji, format_fixed(pos.unrealized_pnl, 2)));
    }

    out.push_str(&format!("\n{}\n", rule()));
    out.push_str(&format!("💰 Total Value: ${} USDT\n", format_currency(total_value)));
    out.push_str(&format!("💰 Total PnL: ${} USDT\n", format_currency(total_pnl)));
    out
}

/// Compact listing of open orders.
pub fn orders_list(raw_orders: &[RawOrder]) -> String {
    if raw_orders.is_empty() {
        return "ℹ️  No open orders found.\n".to_string();
    }

    let mut out = section_header("OPEN ORDERS");

    for (order, raw) in analyze_orders(raw_orders).iter().zip(raw_orders) {
        let side_emoji = if order.side == Side::Buy { "📈" } else { "📉" };
        let kind = if raw.stop_order_type.is_empty() {
            raw.order_type.clone()
        } else {
            format!("{} ({})", raw.order_type, raw.stop_order_type)
        };
        let price = if order.price.is_zero() {
            raw.trigger_price.clone()
        } else {
            format_fixed(order.price, 4)
        };

        out.push_str(&format!("\n{} {} ({})\n", side_emoji, order.symbol, order.side.as_str().to_uppercase()));
        out.push_str(&format!("  Type: {}\n", kind));
        out.push_str(&format!("  Price: ${} | Qty: {}\n", price, format_fixed(order.qty, 4)));
        out.push_str(&format!("  Order ID: {}\n", order.order_id));
    }

    out.push_str(&format!("\n✅ {} open order(s)\n", raw_orders.len()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze_positions;

    fn raw(symbol: &str, side: &str, mark: &str, liq: &str, lev: &str) -> RawPosition {
        RawPosition {
            symbol: symbol.to_string(),
            side: side.to_string(),
            size: "1".to_string(),
            avg_price: mark.to_string(),
            mark_price: mark.to_string(),
            liq_price: liq.to_string(),
            leverage: lev.to_string(),
            ..RawPosition::default()
        }
    }

    #[test]
    fn test_portfolio_summary_sorts_clusters() {
        let analysis = analyze_positions(
            &[
                raw("DOGEUSDT", "Buy", "100", "", "2"),
                raw("BTCUSDT", "Sell", "300", "", "2"),
            ],
            &[],
        );

        let text = portfolio_summary(&analysis);
        assert!(text.contains("Long Exposure:  $100.00 USDT"));
        assert!(text.contains("Bias:           SHORT"));
        let btc = text.find("BTC      75.00%").unwrap();
        let meme = text.find("MEME     25.00%").unwrap();
        assert!(btc < meme);
    }

    #[test]
    fn test_position_risks_order_and_warning() {
        let analysis = analyze_positions(
            &[
                raw("XRPUSDT", "Buy", "100", "", "2"),
                raw("SOLUSDT", "Sell", "100", "110", "20"),
            ],
            &[],
        );

        let text = position_risks(&analysis);
        let sol = text.find("SOLUSDT (SELL)").unwrap();
        let xrp = text.find("XRPUSDT (BUY)").unwrap();
        assert!(sol < xrp);
        assert!(text.contains("🔴 [HIGH RISK] SOLUSDT"));
        assert!(text.contains("Distance to Liquidation: 10.00%"));
        assert_eq!(text.matches("HIGH RISK: High leverage").count(), 1);
    }

    #[test]
    fn test_empty_positions_message() {
        let analysis = analyze_positions(&[], &[]);
        assert!(position_risks(&analysis).contains("No open positions found."));
        assert!(positions_list(&[]).contains("No open positions found."));
        assert!(orders_list(&[]).contains("No open orders found."));
    }

    #[test]
    fn test_suggestions_skip_empty_sections() {
        let text = suggestions(&Suggestions {
            urgent: vec!["Add collateral".to_string()],
            recommended: vec![],
            optional: vec!["Keep watching".to_string()],
        });
        assert!(text.contains("🔴 URGENT:\n  - Add collateral"));
        assert!(!text.contains("RECOMMENDED"));
        assert!(text.contains("🟢 OPTIONAL:\n  - Keep watching"));
    }

    #[test]
    fn test_orders_list_shows_trigger_for_conditional() {
        let text = orders_list(&[RawOrder {
            symbol: "BTCUSDT".to_string(),
            side: "Sell".to_string(),
            order_type: "Market".to_string(),
            price: "0".to_string(),
            qty: "0.5".to_string(),
            order_id: "abc-1".to_string(),
            stop_order_type: "StopLoss".to_string(),
            trigger_price: "40000".to_string(),
            ..RawOrder::default()
        }]);

        assert!(text.contains("Type: Market (StopLoss)"));
        assert!(text.contains("Price: $40000 | Qty: 0.5000"));
        assert!(text.contains("Order ID: abc-1"));
    }
}

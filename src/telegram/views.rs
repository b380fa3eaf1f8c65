//! HTML message bodies for the bot.
//!
//! Everything here is a pure function of already-fetched data so the
//! formatting can be tested without a bot or an exchange.

use crate::advisor::Suggestions;
use crate::analysis::{
    analyze_orders, analyze_position, Analysis, BalanceSummary, DailyPnl, MarginHealth, Side,
    TradeEntry,
};
use crate::exchange::{OrderUpdate, RawOrder, RawPosition};
use crate::utils::{
    format_currency, format_fixed, format_percentage, parse_decimal, parse_decimal_or,
};
use chrono::DateTime;
use rust_decimal::Decimal;
use teloxide::utils::html::escape;

/// Telegram's hard limit on message length.
pub const MAX_MESSAGE_LEN: usize = 4096;

/// Trades shown in one `/trades` reply.
pub const TRADES_SHOWN: usize = 20;

/// High-risk positions listed in the analysis view.
const HIGH_RISK_SHOWN: usize = 5;

/// Suggestions listed per urgency in the analysis view.
const SUGGESTIONS_SHOWN: usize = 3;

pub const NO_POSITIONS: &str = "ℹ️ No open positions found.";
pub const NO_ORDERS: &str = "ℹ️ No open orders found.";
pub const NOTHING_TO_ANALYZE: &str = "ℹ️ No open positions or orders to analyze.";
pub const NO_TRADES: &str = "ℹ️ No trades found for today.";

fn heavy_rule(width: usize) -> String {
    "=".repeat(width)
}

fn pnl_emoji(value: Decimal) -> &'static str {
    if value >= Decimal::ZERO {
        "🟢"
    } else {
        "🔴"
    }
}

fn side_emoji(side: Side) -> &'static str {
    if side == Side::Buy {
        "📈"
    } else {
        "📉"
    }
}

pub fn welcome(name: Option<&str>) -> String {
    let greeting = match name {
        Some(n) if !n.trim().is_empty() => format!("👋 Welcome <b>{}</b>!", escape(n)),
        _ => "👋 Welcome!".to_string(),
    };

    format!(
        "{greeting}\n\n\
         🤖 <b>Bybit Position Analysis Bot</b>\n\n\
         I can help you monitor and analyze your Bybit positions.\n\n\
         Choose an option below or use these commands:\n\
         /balance - Show account balance\n\
         /pnl - Show today's PnL\n\
         /list - List all open positions\n\
         /orders - List all open orders\n\
         /trades - Show recent trades\n\
         /analyze - Analyze positions with AI\n\
         /help - Show help message\n"
    )
}

pub fn help(api_url: &str, ai_provider: Option<&str>) -> String {
    format!(
        "🤖 <b>Bybit Position Analysis Bot</b>\n\n\
         <b>Available Commands:</b>\n\n\
         /start - Start the bot and show menu\n\
         /balance - Show account balance and margin\n\
         /pnl - Show today's PnL\n\
         /list - List all open positions\n\
         /orders - List all open orders (limit, SL, TP)\n\
         /trades - Show recent trades\n\
         /analyze - Analyze current positions with AI\n\
         /help - Show this help message\n\n\
         <b>Features:</b>\n\
         • Account balance tracking\n\
         • Real-time position monitoring\n\
         • Trade history\n\
         • Daily PnL calculation\n\
         • Risk analysis and metrics\n\
         • AI-powered suggestions\n\
         • Order tracking\n\n\
         <b>Configuration:</b>\n\
         • API URL: {}\n\
         • AI Provider: {}\n",
        escape(api_url),
        ai_provider.unwrap_or("None")
    )
}

pub fn balance(summary: &BalanceSummary) -> String {
    let mut out = format!("💰 <b>Account Balance</b>\n{}\n\n", heavy_rule(50));

    out.push_str("<b>💵 Balance Overview</b>\n");
    out.push_str(&format!("Total Equity: <b>${}</b> USDT\n", format_currency(summary.total_equity)));
    out.push_str(&format!("Available Balance: <b>${}</b> USDT\n", format_currency(summary.available_balance)));
    out.push_str(&format!("Margin Balance: ${} USDT\n\n", format_currency(summary.margin_balance)));

    out.push_str("<b>📊 Margin Information</b>\n");
    out.push_str(&format!("Initial Margin: ${} USDT\n", format_currency(summary.initial_margin)));
    out.push_str(&format!("Maintenance Margin: ${} USDT\n", format_currency(summary.maintenance_margin)));
    out.push_str(&format!("Margin Usage: <b>{}</b>\n\n", format_percentage(summary.margin_usage_pct)));

    let label = match summary.health {
        MarginHealth::Warning => "WARNING",
        MarginHealth::Caution => "CAUTION",
        MarginHealth::Healthy => "HEALTHY",
    };
    out.push_str(&format!("{} <b>{}:</b> {}\n", summary.health.emoji(), label, summary.health.advice()));

    out
}

pub fn daily_pnl(pnl: &DailyPnl) -> String {
    let mut out = format!("📊 <b>Today's Profit & Loss</b>\n{}\n\n", heavy_rule(30));

    out.push_str("<b>💵 Realized PnL (Today)</b>\n");
    out.push_str(&format!(
        "{} <b>${}</b> ({} trades)\n\n",
        pnl_emoji(pnl.realized),
        format_currency(pnl.realized),
        pnl.trade_count
    ));

    out.push_str("<b>🔓 Unrealized PnL (Open)</b>\n");
    out.push_str(&format!("{} <b>${}</b>\n\n", pnl_emoji(pnl.unrealized), format_currency(pnl.unrealized)));

    out.push_str(&format!("{}\n", heavy_rule(30)));
    out.push_str(&format!(
        "<b>💰 Total PnL: {} ${}</b>\n",
        pnl_emoji(pnl.total),
        format_currency(pnl.total)
    ));

    out
}

/// Open positions with totals; `account` appends available balance and equity when known.
pub fn positions(raw_positions: &[RawPosition], account: Option<&BalanceSummary>) -> String {
    if raw_positions.is_empty() {
        return NO_POSITIONS.to_string();
    }

    let mut out = format!("📋 <b>Bybit Positions List</b>\n{}\n\n", heavy_rule(50));
    out.push_str(&format!("✅ Found {} open position(s)\n\n", raw_positions.len()));

    let mut total_value = Decimal::ZERO;
    let mut total_pnl = Decimal::ZERO;

    for raw in raw_positions {
        let pos = analyze_position(raw);
        total_value += pos.exposure_usdt;
        total_pnl += pos.unrealized_pnl;

        out.push_str(&format!(
            "{} <b>{}</b> ({})\n",
            side_emoji(pos.side),
            escape(&pos.symbol),
            escape(&raw.side)
        ));
        out.push_str(&format!("  Size: {} | Entry: ${}\n", format_fixed(pos.size, 4), format_fixed(pos.entry_price, 4)));
        out.push_str(&format!("  Mark: ${} | Lev: {}x\n", format_fixed(pos.mark_price, 4), pos.leverage));
        out.push_str(&format!("  {} PnL: ${}\n\n", pnl_emoji(pos.unrealized_pnl), format_fixed(pos.unrealized_pnl, 2)));
    }

    out.push_str(&format!("{}\n", heavy_rule(50)));
    out.push_str(&format!("💰 Total Value: ${} USDT\n", format_fixed(total_value, 2)));
    out.push_str(&format!("💰 Total PnL: ${} USDT\n\n", format_fixed(total_pnl, 2)));

    if let Some(account) = account {
        out.push_str("<b>Account Balance:</b>\n");
        out.push_str(&format!("Available: ${} USDT\n", format_currency(account.available_balance)));
        out.push_str(&format!("Total Equity: ${} USDT\n", format_currency(account.total_equity)));
    }

    out
}

pub fn orders(raw_orders: &[RawOrder]) -> String {
    if raw_orders.is_empty() {
        return NO_ORDERS.to_string();
    }

    let mut out = format!("📋 <b>Bybit Open Orders</b>\n{}\n\n", heavy_rule(50));
    out.push_str(&format!("✅ Found {} open order(s)\n\n", raw_orders.len()));

    for (order, raw) in analyze_orders(raw_orders).iter().zip(raw_orders) {
        let kind = if raw.stop_order_type.is_empty() {
            escape(&raw.order_type)
        } else {
            format!("{} ({})", escape(&raw.order_type), escape(&raw.stop_order_type))
        };
        // Conditional orders carry their level in the trigger price.
        let price = if order.price.is_zero() {
            parse_decimal_or(&raw.trigger_price, Decimal::ZERO)
        } else {
            order.price
        };

        out.push_str(&format!("{} <b>{}</b> ({})\n", side_emoji(order.side), escape(&order.symbol), escape(&raw.side)));
        out.push_str(&format!("  Type: {}\n", kind));
        out.push_str(&format!("  Price: ${} | Qty: {}\n", format_fixed(price, 4), format_fixed(order.qty, 4)));
        out.push_str(&format!("  Order ID: <code>{}</code>\n\n", escape(&order.order_id)));
    }

    out
}

pub fn analysis(analysis: &Analysis, suggestions: &Suggestions) -> String {
    let p = &analysis.portfolio;
    let risks = &analysis.risks;

    let mut out = format!("🔍 <b>Position Analysis</b>\n{}\n", heavy_rule(50));
    out.push_str("<i>Risk Tolerance: 4% per day</i>\n\n");

    out.push_str("<b>📊 Portfolio Summary</b>\n");
    out.push_str(&format!("Long Exposure: ${}\n", format_fixed(p.total_long_exposure, 2)));
    out.push_str(&format!("Short Exposure: ${}\n", format_fixed(p.total_short_exposure, 2)));
    out.push_str(&format!("Net Exposure: ${}\n", format_fixed(p.net_exposure, 2)));
    out.push_str(&format!("Total PnL: ${}\n", format_fixed(p.total_unrealized_pnl, 2)));
    out.push_str(&format!("Bias: {}\n", p.bias.as_str().to_uppercase()));
    out.push_str(&format!("Positions: {}\n\n", p.total_positions));

    out.push_str("<b>⚠️ Risk Metrics</b>\n");
    out.push_str(&format!("High Leverage: {}\n", risks.high_leverage_count));
    out.push_str(&format!("Close to Liq: {}\n", risks.close_liquidation_count));
    out.push_str(&format!("No Stop Loss: {}\n", risks.no_stop_loss_count));
    if risks.risky_positions.is_empty() {
        out.push_str("Unhedged & No SL: 0\n");
    } else {
        out.push_str(&format!("🔴 <b>Unhedged & No SL: {}</b>\n", risks.risky_positions.len()));
    }
    out.push_str(&format!("Hedged Symbols: {}\n\n", risks.hedged_symbols.len()));

    let high_risk: Vec<_> = analysis.high_risk_positions().collect();
    if !high_risk.is_empty() {
        out.push_str(&format!("<b>⚠️ High Risk Positions ({})</b>\n", high_risk.len()));
        for pos in high_risk.iter().take(HIGH_RISK_SHOWN) {
            out.push_str(&format!("• {} ({})\n", escape(&pos.symbol), pos.side.as_str().to_uppercase()));
            out.push_str(&format!(
                "  Lev: {}x | Liq: {}\n",
                pos.leverage,
                format_percentage(pos.liquidation_distance_pct)
            ));
        }
        out.push('\n');
    }

    if !suggestions.urgent.is_empty() || !suggestions.recommended.is_empty() {
        out.push_str("<b>💡 Suggestions</b>\n\n");
        for (label, items) in [
            ("🔴 <b>URGENT:</b>", &suggestions.urgent),
            ("🟡 <b>RECOMMENDED:</b>", &suggestions.recommended),
        ] {
            if items.is_empty() {
                continue;
            }
            out.push_str(&format!("{}\n", label));
            for item in items.iter().take(SUGGESTIONS_SHOWN) {
                out.push_str(&format!("• {}\n", escape(item)));
            }
            out.push('\n');
        }
    }

    out
}

fn clock_time(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string())
}

/// Today's executions, most recent `TRADES_SHOWN` in chronological order.
pub fn trades(trades: &[TradeEntry]) -> String {
    if trades.is_empty() {
        return NO_TRADES.to_string();
    }

    let mut out = format!("📈 <b>Today's Trades</b>\n{}\n\n", heavy_rule(30));

    let shown = trades.len().min(TRADES_SHOWN);
    for trade in &trades[trades.len() - shown..] {
        let emoji = if Side::parse(&trade.side) == Side::Buy { "🟢" } else { "🔴" };

        out.push_str(&format!("{} <b>{}</b> ({})\n", emoji, escape(&trade.symbol), escape(&trade.side)));
        out.push_str(&format!("  Price: ${} | Qty: {}\n", format_fixed(trade.price, 4), trade.qty));
        out.push_str(&format!("  Time: {} UTC\n", clock_time(trade.exec_time_ms)));
        if let Some(pnl) = trade.pnl {
            out.push_str(&format!("  {} PnL: <b>${}</b>\n", pnl_emoji(pnl), format_fixed(pnl, 2)));
        }
        out.push('\n');
    }

    if trades.len() > shown {
        out.push_str(&format!("<i>Showing last {} of {} trades today</i>", shown, trades.len()));
    } else {
        out.push_str(&format!("<i>Total {} trades today</i>", trades.len()));
    }

    out
}

fn status_emoji(status: &str) -> &'static str {
    match status {
        "Filled" => "✅",
        "PartiallyFilled" => "⏳",
        "New" | "Untriggered" => "🆕",
        "Triggered" => "⚡",
        "Cancelled" | "PartiallyFilledCanceled" | "Deactivated" => "❌",
        "Rejected" => "🚫",
        _ => "🔔",
    }
}

/// Push notification for one order-stream update.
pub fn order_update(update: &OrderUpdate, last_price: Option<Decimal>) -> String {
    let side = Side::parse(&update.side);

    let mut out = format!(
        "{} <b>Order {}</b>\n\n",
        status_emoji(&update.order_status),
        escape(&update.order_status)
    );
    out.push_str(&format!("{} <b>{}</b> ({})\n", side_emoji(side), escape(&update.symbol), escape(&update.side)));

    let kind = if update.stop_order_type.is_empty() {
        escape(&update.order_type)
    } else {
        format!("{} ({})", escape(&update.order_type), escape(&update.stop_order_type))
    };
    out.push_str(&format!("Type: {}\n", kind));
    if update.reduce_only {
        out.push_str("Reduce only\n");
    }

    let price = parse_decimal(&update.price).filter(|p| !p.is_zero());
    let qty = parse_decimal_or(&update.qty, Decimal::ZERO);
    match price {
        Some(p) => {
            out.push_str(&format!("Price: ${} | Qty: {}\n", format_fixed(p, 4), format_fixed(qty, 4)));
        }
        None => {
            out.push_str(&format!("Price: Market | Qty: {}\n", format_fixed(qty, 4)));
        }
    }

    if let Some(trigger) = parse_decimal(&update.trigger_price).filter(|p| !p.is_zero()) {
        out.push_str(&format!("Trigger: ${}\n", format_fixed(trigger, 4)));
    }

    let filled = parse_decimal_or(&update.cum_exec_qty, Decimal::ZERO);
    if filled > Decimal::ZERO {
        let avg = parse_decimal_or(&update.avg_price, Decimal::ZERO);
        out.push_str(&format!("Filled: {} @ ${}\n", format_fixed(filled, 4), format_fixed(avg, 4)));
    }

    if let Some(last) = last_price {
        out.push_str(&format!("Last Price: ${}\n", format_fixed(last, 4)));
    }

    out.push_str(&format!("Order ID: <code>{}</code>\n", escape(&update.order_id)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze_positions;
    use crate::exchange::WalletBalance;
    use rust_decimal_macros::dec;

    fn raw_position(symbol: &str, side: &str, mark: &str, liq: &str, lev: &str, upnl: &str) -> RawPosition {
        RawPosition {
            symbol: symbol.to_string(),
            side: side.to_string(),
            size: "2".to_string(),
            avg_price: mark.to_string(),
            mark_price: mark.to_string(),
            liq_price: liq.to_string(),
            leverage: lev.to_string(),
            unrealised_pnl: upnl.to_string(),
            ..RawPosition::default()
        }
    }

    #[test]
    fn test_balance_warning_levels() {
        let wallet = WalletBalance {
            total_equity: "12345.678".to_string(),
            total_margin_balance: "10000".to_string(),
            total_initial_margin: "8500".to_string(),
            ..WalletBalance::default()
        };
        let text = balance(&BalanceSummary::from_wallet(&wallet));

        assert!(text.contains("Total Equity: <b>$12,345.68</b> USDT"));
        assert!(text.contains("Margin Usage: <b>85.00%</b>"));
        assert!(text.contains("🔴 <b>WARNING:</b> High margin usage! Consider reducing positions."));
    }

    #[test]
    fn test_daily_pnl_emojis() {
        let text = daily_pnl(&DailyPnl {
            realized: dec!(150),
            unrealized: dec!(-200.5),
            total: dec!(-50.5),
            trade_count: 3,
        });

        assert!(text.contains("🟢 <b>$150.00</b> (3 trades)"));
        assert!(text.contains("🔴 <b>$-200.50</b>"));
        assert!(text.contains("<b>💰 Total PnL: 🔴 $-50.50</b>"));
    }

    #[test]
    fn test_positions_totals_and_account() {
        let raw = vec![
            raw_position("BTCUSDT", "Buy", "100", "", "10", "5"),
            raw_position("ETHUSDT", "Sell", "50", "", "3", "-2.5"),
        ];
        let wallet = WalletBalance {
            total_equity: "5000".to_string(),
            total_available_balance: "4000".to_string(),
            ..WalletBalance::default()
        };

        let text = positions(&raw, Some(&BalanceSummary::from_wallet(&wallet)));
        assert!(text.starts_with("📋 <b>Bybit Positions List</b>"));
        assert!(text.contains("✅ Found 2 open position(s)"));
        assert!(text.contains("📈 <b>BTCUSDT</b> (Buy)"));
        assert!(text.contains("📉 <b>ETHUSDT</b> (Sell)"));
        assert!(text.contains("🔴 PnL: $-2.50"));
        assert!(text.contains("💰 Total Value: $300.00 USDT"));
        assert!(text.contains("💰 Total PnL: $2.50 USDT"));
        assert!(text.contains("Available: $4,000.00 USDT"));

        let without_balance = positions(&raw, None);
        assert!(!without_balance.contains("Account Balance"));

        assert_eq!(positions(&[], None), NO_POSITIONS);
    }

    #[test]
    fn test_figures_are_rounded() {
        let computed = analyze_positions(
            &[raw_position("ETHUSDT", "Sell", "10000", "10999.9", "20", "-2.005")],
            &[],
        );
        let text = analysis(&computed, &Suggestions::default());
        assert!(text.contains("Total PnL: $-2.01"));
        assert!(text.contains("  Lev: 20x | Liq: 10.00%"));

        let text = trades(&[TradeEntry {
            symbol: "SOLUSDT".to_string(),
            side: "Sell".to_string(),
            price: dec!(150.12345),
            qty: dec!(1),
            exec_time_ms: 1_700_000_000_000,
            pnl: Some(dec!(3.335)),
        }]);
        assert!(text.contains("Price: $150.1235"));
        assert!(text.contains("🟢 PnL: <b>$3.34</b>"));
    }

    #[test]
    fn test_orders_use_trigger_price_for_conditionals() {
        let raw = vec![RawOrder {
            symbol: "SOLUSDT".to_string(),
            side: "Sell".to_string(),
            order_type: "Market".to_string(),
            price: "0".to_string(),
            qty: "3".to_string(),
            order_id: "abc<1>".to_string(),
            stop_order_type: "StopLoss".to_string(),
            trigger_price: "95.5".to_string(),
            ..RawOrder::default()
        }];

        let text = orders(&raw);
        assert!(text.contains("Type: Market (StopLoss)"));
        assert!(text.contains("Price: $95.5000 | Qty: 3.0000"));
        assert!(text.contains("Order ID: <code>abc&lt;1&gt;</code>"));
    }

    #[test]
    fn test_analysis_sections() {
        let computed = analyze_positions(
            &[
                raw_position("PEPEUSDT", "Buy", "100", "95", "25", "-10"),
                raw_position("BTCUSDT", "Sell", "100", "", "2", "1"),
            ],
            &[],
        );
        let suggestions = Suggestions {
            urgent: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            recommended: vec![],
            optional: vec!["never shown".into()],
        };

        let text = analysis(&computed, &suggestions);
        assert!(text.contains("<i>Risk Tolerance: 4% per day</i>"));
        assert!(text.contains("Bias: NEUTRAL"));
        assert!(text.contains("High Leverage: 1"));
        assert!(text.contains("🔴 <b>Unhedged & No SL: 2</b>"));
        assert!(text.contains("<b>⚠️ High Risk Positions (1)</b>"));
        assert!(text.contains("• PEPEUSDT (BUY)"));
        assert!(text.contains("  Lev: 25x | Liq: 5.00%"));
        assert!(text.contains("• c\n"));
        assert!(!text.contains("• d\n"));
        assert!(!text.contains("RECOMMENDED"));
        assert!(!text.contains("never shown"));
    }

    #[test]
    fn test_trades_shows_latest_window() {
        let entries: Vec<TradeEntry> = (0..25)
            .map(|i| TradeEntry {
                symbol: format!("T{i}USDT"),
                side: "Buy".to_string(),
                price: dec!(1),
                qty: dec!(1),
                exec_time_ms: 1_700_000_000_000 + i * 1000,
                pnl: (i == 24).then_some(dec!(-1.5)),
            })
            .collect();

        let text = trades(&entries);
        assert!(!text.contains("<b>T4USDT</b>"));
        assert!(text.contains("<b>T5USDT</b>"));
        assert!(text.contains("🔴 PnL: <b>$-1.50</b>"));
        assert!(text.contains("Time: 22:13:44 UTC"));
        assert!(text.ends_with("<i>Showing last 20 of 25 trades today</i>"));

        let few = trades(&entries[..2]);
        assert!(few.ends_with("<i>Total 2 trades today</i>"));
        assert_eq!(trades(&[]), NO_TRADES);
    }

    #[test]
    fn test_order_update_notification() {
        let update = OrderUpdate {
            symbol: "BTCUSDT".to_string(),
            order_id: "o-77".to_string(),
            side: "Sell".to_string(),
            order_type: "Limit".to_string(),
            price: "43000".to_string(),
            qty: "0.01".to_string(),
            order_status: "Filled".to_string(),
            avg_price: "43010.5".to_string(),
            cum_exec_qty: "0.01".to_string(),
            reduce_only: true,
            ..OrderUpdate::default()
        };

        let text = order_update(&update, Some(dec!(43020)));
        assert!(text.starts_with("✅ <b>Order Filled</b>"));
        assert!(text.contains("📉 <b>BTCUSDT</b> (Sell)"));
        assert!(text.contains("Reduce only"));
        assert!(text.contains("Price: $43000.0000 | Qty: 0.0100"));
        assert!(text.contains("Filled: 0.0100 @ $43010.5000"));
        assert!(text.contains("Last Price: $43020.0000"));
        assert!(text.contains("Order ID: <code>o-77</code>"));
    }

    #[test]
    fn test_market_conditional_update() {
        let update = OrderUpdate {
            symbol: "ETHUSDT".to_string(),
            side: "Buy".to_string(),
            order_type: "Market".to_string(),
            price: "0".to_string(),
            qty: "1".to_string(),
            order_status: "Untriggered".to_string(),
            stop_order_type: "TakeProfit".to_string(),
            trigger_price: "2500".to_string(),
            ..OrderUpdate::default()
        };

        let text = order_update(&update, None);
        assert!(text.starts_with("🆕 <b>Order Untriggered</b>"));
        assert!(text.contains("Type: Market (TakeProfit)"));
        assert!(text.contains("Price: Market | Qty: 1.0000"));
        assert!(text.contains("Trigger: $2500.0000"));
        assert!(!text.contains("Filled:"));
        assert!(!text.contains("Last Price"));
    }

    #[test]
    fn test_help_and_welcome() {
        let text = help("https://api.bybit.com", Some("OpenAI"));
        assert!(text.contains("• API URL: https://api.bybit.com"));
        assert!(text.contains("• AI Provider: OpenAI"));
        assert!(help("x", None).contains("• AI Provider: None"));

        assert!(welcome(Some("<Ann>")).starts_with("👋 Welcome <b>&lt;Ann&gt;</b>!"));
        assert!(welcome(None).starts_with("👋 Welcome!"));
    }
}

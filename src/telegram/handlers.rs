//! Command and callback endpoints.

use super::keyboards::{navigation_keyboard, start_keyboard, web_app_url, View};
use super::views::{self, MAX_MESSAGE_LEN};
use super::{BotContext, Command};
use crate::analysis::{
    analyze_positions, daily_pnl, match_trades, start_of_day_ms, BalanceSummary,
    DAILY_CLOSED_PNL_LIMIT,
};
use crate::utils::split_message;
use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, MessageId, ParseMode};
use tracing::{debug, error, warn};

fn progress_text(view: View) -> &'static str {
    match view {
        View::Balance => "💰 Fetching balance from Bybit...",
        View::Pnl => "💰 Calculating today's PnL...",
        View::Positions => "📡 Fetching positions from Bybit...",
        View::Orders => "📡 Fetching orders from Bybit...",
        View::Trades => "📡 Fetching today's trades...",
        View::Analyze => "🔍 Analyzing positions...",
        View::Help => "❓ Loading help...",
    }
}

fn help_text(ctx: &BotContext) -> String {
    let provider = ctx.advisor.provider().map(|p| p.to_string());
    views::help(&ctx.api_url, provider.as_deref())
}

/// Fetch everything a view needs and render its HTML body.
pub async fn render_view(ctx: &BotContext, view: View) -> Result<String> {
    let provider = ctx.provider.as_ref();
    let today = start_of_day_ms(chrono::Utc::now());

    let text = match view {
        View::Help => help_text(ctx),
        View::Balance => {
            let wallet = provider.get_wallet_balance().await?;
            views::balance(&BalanceSummary::from_wallet(&wallet))
        }
        View::Pnl => {
            let closed = provider
                .get_closed_pnl(Some(today), DAILY_CLOSED_PNL_LIMIT)
                .await?;
            let positions = provider.get_positions().await?;
            views::daily_pnl(&daily_pnl(&closed, &positions))
        }
        View::Positions => {
            let positions = provider.get_positions().await?;
            if positions.is_empty() {
                return Ok(views::NO_POSITIONS.to_string());
            }
            let account = match provider.get_wallet_balance().await {
                Ok(wallet) => Some(BalanceSummary::from_wallet(&wallet)),
                Err(e) => {
                    debug!("Skipping balance footer: {:#}", e);
                    None
                }
            };
            views::positions(&positions, account.as_ref())
        }
        View::Orders => views::orders(&provider.get_open_orders().await?),
        View::Trades => {
            let executions = provider.get_executions(today).await?;
            let closed = match provider
                .get_closed_pnl(Some(today), DAILY_CLOSED_PNL_LIMIT)
                .await
            {
                Ok(closed) => closed,
                Err(e) => {
                    warn!("Trades shown without PnL: {:#}", e);
                    Vec::new()
                }
            };
            views::trades(&match_trades(&executions, &closed))
        }
        View::Analyze => {
            let positions = provider.get_positions().await?;
            let orders = provider.get_open_orders().await?;
            if positions.is_empty() && orders.is_empty() {
                return Ok(views::NOTHING_TO_ANALYZE.to_string());
            }
            let analysis = analyze_positions(&positions, &orders);
            let suggestions = ctx.advisor.suggest(&analysis).await;
            views::analysis(&analysis, &suggestions)
        }
    };

    Ok(text)
}

/// Keyboard shown under a rendered view.
fn keyboard_for(view: View) -> InlineKeyboardMarkup {
    match view {
        View::Help => navigation_keyboard(None),
        other => navigation_keyboard(Some(other)),
    }
}

/// Replace `message_id` with the rendered view, spilling long bodies into follow-up messages.
async fn show_view(
    bot: &Bot,
    ctx: &BotContext,
    chat_id: ChatId,
    message_id: MessageId,
    view: View,
) -> ResponseResult<()> {
    match render_view(ctx, view).await {
        Ok(text) => {
            let mut chunks = split_message(&text, MAX_MESSAGE_LEN).into_iter();
            if let Some(first) = chunks.next() {
                bot.edit_message_text(chat_id, message_id, first)
                    .parse_mode(ParseMode::Html)
                    .reply_markup(keyboard_for(view))
                    .await?;
            }
            for chunk in chunks {
                bot.send_message(chat_id, chunk)
                    .parse_mode(ParseMode::Html)
                    .await?;
            }
        }
        Err(e) => {
            error!("Failed to render {:?}: {:#}", view, e);
            bot.edit_message_text(chat_id, message_id, format!("❌ Error: {:#}", e))
                .reply_markup(navigation_keyboard(None))
                .await?;
        }
    }
    Ok(())
}

pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    ctx: Arc<BotContext>,
) -> ResponseResult<()> {
    let chat_id = msg.chat.id;
    ctx.remember_chat(chat_id).await;
    debug!(?cmd, chat_id = chat_id.0, "Command received");

    match cmd.view() {
        None => {
            bot.send_message(chat_id, views::welcome(msg.chat.first_name()))
                .parse_mode(ParseMode::Html)
                .reply_markup(start_keyboard(web_app_url(&ctx.web_app_url)))
                .await?;
        }
        Some(View::Help) => {
            bot.send_message(chat_id, help_text(&ctx))
                .parse_mode(ParseMode::Html)
                .reply_markup(navigation_keyboard(None))
                .await?;
        }
        Some(view) => {
            let placeholder = bot.send_message(chat_id, progress_text(view)).await?;
            show_view(&bot, &ctx, chat_id, placeholder.id, view).await?;
        }
    }

    Ok(())
}

pub async fn handle_callback(
    bot: Bot,
    query: CallbackQuery,
    ctx: Arc<BotContext>,
) -> ResponseResult<()> {
    // Clear the button's loading indicator first.
    bot.answer_callback_query(&query.id).await?;

    let Some(view) = query.data.as_deref().and_then(View::from_callback) else {
        debug!(data = ?query.data, "Ignoring unknown callback");
        return Ok(());
    };
    let Some(message) = query.message.as_ref() else {
        warn!("Callback {:?} without message context", view);
        return Ok(());
    };

    let chat_id = message.chat().id;
    ctx.remember_chat(chat_id).await;

    bot.edit_message_text(chat_id, message.id(), progress_text(view))
        .await?;
    show_view(&bot, &ctx, chat_id, message.id(), view).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::Advisor;
    use crate::config::AiConfig;
    use crate::exchange::{
        ClosedPnl, ExchangeError, Execution, MockAccountDataProvider, RawOrder, RawPosition,
        WalletBalance,
    };
    use anyhow::Context;

    fn context(mock: MockAccountDataProvider) -> BotContext {
        BotContext::new(
            Arc::new(mock),
            Advisor::new(&AiConfig::default()).unwrap(),
            "https://api.bybit.com",
            "",
            None,
        )
    }

    fn position(symbol: &str) -> RawPosition {
        RawPosition {
            symbol: symbol.to_string(),
            side: "Buy".to_string(),
            size: "1".to_string(),
            avg_price: "100".to_string(),
            mark_price: "100".to_string(),
            leverage: "15".to_string(),
            unrealised_pnl: "4".to_string(),
            ..RawPosition::default()
        }
    }

    #[tokio::test]
    async fn test_positions_survive_balance_failure() {
        let mut mock = MockAccountDataProvider::new();
        mock.expect_get_positions()
            .returning(|| Ok(vec![position("BTCUSDT")]));
        mock.expect_get_wallet_balance().returning(|| {
            Err(ExchangeError::MissingCredentials).context("Failed to fetch wallet balance")
        });

        let text = render_view(&context(mock), View::Positions).await.unwrap();
        assert!(text.contains("<b>BTCUSDT</b>"));
        assert!(!text.contains("Account Balance"));
    }

    #[tokio::test]
    async fn test_empty_positions_skip_balance() {
        let mut mock = MockAccountDataProvider::new();
        mock.expect_get_positions().returning(|| Ok(vec![]));
        mock.expect_get_wallet_balance().never();

        let text = render_view(&context(mock), View::Positions).await.unwrap();
        assert_eq!(text, views::NO_POSITIONS);
    }

    #[tokio::test]
    async fn test_pnl_uses_today_window() {
        let mut mock = MockAccountDataProvider::new();
        mock.expect_get_closed_pnl()
            .withf(|start, limit| start.is_some() && *limit == DAILY_CLOSED_PNL_LIMIT)
            .returning(|_, _| {
                Ok(vec![ClosedPnl {
                    closed_pnl: "10".to_string(),
                    ..ClosedPnl::default()
                }])
            });
        mock.expect_get_positions()
            .returning(|| Ok(vec![position("ETHUSDT")]));

        let text = render_view(&context(mock), View::Pnl).await.unwrap();
        assert!(text.contains("🟢 <b>$10.00</b> (1 trades)"));
        assert!(text.contains("<b>💰 Total PnL: 🟢 $14.00</b>"));
    }

    #[tokio::test]
    async fn test_trades_without_closed_pnl() {
        let mut mock = MockAccountDataProvider::new();
        mock.expect_get_executions().returning(|_| {
            Ok(vec![Execution {
                symbol: "SOLUSDT".to_string(),
                side: "Sell".to_string(),
                exec_price: "150".to_string(),
                exec_qty: "2".to_string(),
                exec_time: "1700000000000".to_string(),
                order_id: "x".to_string(),
                ..Execution::default()
            }])
        });
        mock.expect_get_closed_pnl()
            .returning(|_, _| Err(anyhow::anyhow!("timeout")));

        let text = render_view(&context(mock), View::Trades).await.unwrap();
        assert!(text.contains("🔴 <b>SOLUSDT</b> (Sell)"));
        assert!(!text.contains("PnL:"));
        assert!(text.ends_with("<i>Total 1 trades today</i>"));
    }

    #[tokio::test]
    async fn test_analyze_nothing_open() {
        let mut mock = MockAccountDataProvider::new();
        mock.expect_get_positions().returning(|| Ok(vec![]));
        mock.expect_get_open_orders().returning(|| Ok(vec![]));

        let text = render_view(&context(mock), View::Analyze).await.unwrap();
        assert_eq!(text, views::NOTHING_TO_ANALYZE);
    }

    #[tokio::test]
    async fn test_analyze_falls_back_to_rules() {
        let mut mock = MockAccountDataProvider::new();
        mock.expect_get_positions()
            .returning(|| Ok(vec![position("DOGEUSDT")]));
        mock.expect_get_open_orders()
            .returning(|| Ok(vec![RawOrder::default()]));

        let text = render_view(&context(mock), View::Analyze).await.unwrap();
        assert!(text.starts_with("🔍 <b>Position Analysis</b>"));
        assert!(text.contains("High Leverage: 1"));
        assert!(text.contains("<b>💡 Suggestions</b>"));
    }

    #[tokio::test]
    async fn test_balance_error_propagates() {
        let mut mock = MockAccountDataProvider::new();
        mock.expect_get_wallet_balance()
            .returning(|| Err(anyhow::anyhow!("Failed to fetch wallet balance")));

        let err = render_view(&context(mock), View::Balance).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to fetch wallet balance");
    }

    #[tokio::test]
    async fn test_balance_renders() {
        let mut mock = MockAccountDataProvider::new();
        mock.expect_get_wallet_balance().returning(|| {
            Ok(WalletBalance {
                total_equity: "100".to_string(),
                ..WalletBalance::default()
            })
        });

        let text = render_view(&context(mock), View::Balance).await.unwrap();
        assert!(text.contains("🟢 <b>HEALTHY:</b>"));
    }

    #[tokio::test]
    async fn test_help_mentions_api_url() {
        let text = render_view(&context(MockAccountDataProvider::new()), View::Help)
            .await
            .unwrap();
        assert!(text.contains("• API URL: https://api.bybit.com"));
        assert!(text.contains("• AI Provider: None"));
    }
}

//! Telegram bot front end.
//!
//! Mirrors the CLI through chat commands and inline-keyboard buttons, and
//! forwards order-stream updates from the exchange's private WebSocket to the
//! last chat that talked to the bot.
//!
//! ## Module structure
//!
//! ```text
//! telegram/
//! ├── mod.rs        # Commands, shared context, dispatcher
//! ├── handlers.rs   # Command and callback endpoints, view rendering
//! ├── keyboards.rs  # Inline keyboards
//! ├── notifier.rs   # Order-update push notifications
//! └── views.rs      # HTML message bodies
//! ```

mod handlers;
pub mod keyboards;
pub mod notifier;
pub mod views;

pub use handlers::render_view;
pub use keyboards::{navigation_keyboard, start_keyboard, View};

use crate::advisor::Advisor;
use crate::config::Config;
use crate::exchange::{AccountDataProvider, OrderStreamListener};
use anyhow::{Context, Result};
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tokio::sync::{mpsc, RwLock};
use tracing::{info, warn};

/// Buffered order-stream events between the listener and the notifier.
const EVENT_CHANNEL_CAPACITY: usize = 100;

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Bybit position analysis commands:")]
pub enum Command {
    #[command(description = "Start the bot and show menu")]
    Start,
    #[command(description = "Show this help message")]
    Help,
    #[command(description = "Show account balance and margin")]
    Balance,
    #[command(description = "Show today's PnL")]
    Pnl,
    #[command(description = "List all open positions")]
    List,
    #[command(description = "List all open orders (limit, SL, TP)")]
    Orders,
    #[command(description = "Show recent trades")]
    Trades,
    #[command(description = "Analyze current positions with AI")]
    Analyze,
}

impl Command {
    /// View opened by this command; `/start` has its own menu.
    pub fn view(&self) -> Option<View> {
        match self {
            Command::Start => None,
            Command::Help => Some(View::Help),
            Command::Balance => Some(View::Balance),
            Command::Pnl => Some(View::Pnl),
            Command::List => Some(View::Positions),
            Command::Orders => Some(View::Orders),
            Command::Trades => Some(View::Trades),
            Command::Analyze => Some(View::Analyze),
        }
    }
}

/// State shared by every handler and the notifier.
pub struct BotContext {
    pub provider: Arc<dyn AccountDataProvider>,
    pub advisor: Advisor,
    /// Exchange REST URL shown in `/help`
    pub api_url: String,
    /// Dashboard URL for the web-app button
    pub web_app_url: String,
    chat_id: RwLock<Option<ChatId>>,
}

impl BotContext {
    pub fn new(
        provider: Arc<dyn AccountDataProvider>,
        advisor: Advisor,
        api_url: impl Into<String>,
        web_app_url: impl Into<String>,
        chat_id: Option<ChatId>,
    ) -> Self {
        Self {
            provider,
            advisor,
            api_url: api_url.into(),
            web_app_url: web_app_url.into(),
            chat_id: RwLock::new(chat_id),
        }
    }

    /// Chat that receives order notifications.
    pub async fn chat_id(&self) -> Option<ChatId> {
        *self.chat_id.read().await
    }

    /// Remember the chat of the latest incoming update.
    pub async fn remember_chat(&self, chat_id: ChatId) {
        let mut current = self.chat_id.write().await;
        if *current != Some(chat_id) {
            info!(chat_id = chat_id.0, "Order notifications now go to this chat");
            *current = Some(chat_id);
        }
    }
}

/// Parse a configured chat id; blank means "wait for the first message".
pub fn parse_chat_id(raw: &str) -> Option<ChatId> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<i64>() {
        Ok(id) => Some(ChatId(id)),
        Err(e) => {
            warn!("Ignoring invalid TELEGRAM_CHAT_ID {:?}: {}", raw, e);
            None
        }
    }
}

/// Run the bot until Ctrl-C.
pub async fn run_bot(
    config: &Config,
    provider: Arc<dyn AccountDataProvider>,
    advisor: Advisor,
) -> Result<()> {
    anyhow::ensure!(
        !config.telegram.bot_token.trim().is_empty(),
        "TELEGRAM_BOT_TOKEN environment variable is not set"
    );

    let bot = Bot::new(config.telegram.bot_token.trim());
    let me = bot
        .get_me()
        .await
        .context("Failed to connect to Telegram")?;
    info!("🤖 Telegram bot connected as @{}", me.username());

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register bot commands: {}", e);
    }

    let ctx = Arc::new(BotContext::new(
        provider,
        advisor,
        config.bybit.base_url.clone(),
        config.telegram.web_app_url.clone(),
        parse_chat_id(&config.telegram.chat_id),
    ));

    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let listener = OrderStreamListener::new(&config.bybit).spawn(tx);
    let notifier = tokio::spawn(notifier::forward_order_updates(
        bot.clone(),
        Arc::clone(&ctx),
        rx,
    ));

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(handlers::handle_command),
        )
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback));

    info!("Starting Telegram bot...");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![ctx])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    listener.abort();
    notifier.abort();
    info!("👋 Telegram bot stopped");
    Ok(())
}
